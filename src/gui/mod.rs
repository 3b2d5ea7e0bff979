pub mod application;
pub mod executor;
pub mod style;
pub mod types;
pub mod view_model;

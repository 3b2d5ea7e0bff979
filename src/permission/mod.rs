pub mod gate;
pub mod platform;
pub mod types;

use iced::Event;

use crate::config::types::Config;
use crate::device::driver::ScanUpdate;

#[derive(Debug, Clone)]
pub enum Message {
    EventOccurred(Event),
    ConfigLoadComplete((Config, Option<String>)),
    NoticeConfirmed,
    Scan(ScanUpdate),
    StartScanPressed,
    StartScanSent(bool), // true if the controller received the command
}

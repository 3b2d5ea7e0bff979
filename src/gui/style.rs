use iced::{Border, Color, Theme};
use iced::widget::container::{StyleSheet, Appearance};

/// A device entry in the scan result list.
pub struct DeviceRowStyleSheet;

impl StyleSheet for DeviceRowStyleSheet {
    type Style = Theme;

    fn appearance(&self, _style: &Self::Style) -> Appearance {
        Appearance {
            border: Border {
                color: Color::from_rgb8(0xcc, 0xcc, 0xcc),
                width: 1.0,
                radius: 0.0.into(),
            },
            ..Appearance::default()
        }
    }
}

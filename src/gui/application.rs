use std::sync::Arc;
use std::time::Duration;
use futures::channel::mpsc::Sender;
use futures::SinkExt;
use iced::{Alignment, Application, Command, Element, Length, Settings, Size, Subscription, window};
use iced::event::{self, Event};
use iced::theme::{self, Theme};
use iced::widget::{Column, button, column, container, horizontal_rule, scrollable, text};
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::config::io::ConfigIO;
use crate::config::types::Config;
use crate::device::controller::ScanSettings;
use crate::device::driver::{scan_subscription, ScanUpdate};
use crate::device::types::{ScanCommand, ScanSnapshot};
use crate::error::{AppRunError, CapabilityError};
use crate::gui::executor::AppExecutor;
use crate::gui::style::DeviceRowStyleSheet;
use crate::gui::types::Message;
use crate::gui::view_model::{screen, DeviceRow, Screen, TITLE};
use crate::permission::gate::PermissionGate;
use crate::permission::platform::PlatformPermissions;

pub struct ApplicationFlags {
    pub config_io: ConfigIO,
    pub scan_duration_override: Option<Duration>,
}

pub struct ScannerApplication {
    // this token is cancelled upon exit
    app_cancel: CancellationToken,

    // messages that the user must click away
    notices: Vec<String>,

    config_io: ConfigIO,
    scan_duration_override: Option<Duration>,
    // the scanner is only started once the config has been loaded
    settings: Option<ScanSettings>,

    // held for the lifetime of the process so that permissions are requested once
    _permission_gate: PermissionGate,

    // set once the scanner subscription is running
    commands: Option<Sender<ScanCommand>>,
    unavailable: Option<CapabilityError>,
    snapshot: ScanSnapshot,
}

impl ScannerApplication {
    fn before_close(&mut self) {
        self.app_cancel.cancel();
    }

    fn load_config(&self) -> Command<Message> {
        let config_io = self.config_io.clone();
        let scan_duration_override = self.scan_duration_override;

        let fut = async move {
            let (mut config, error_message) = match config_io.read_or_init().await {
                Ok(config) => (config, None),
                Err(err) => {
                    error!("Failed to load config: {:?}", &err);
                    (Config::default(), Some(format!("Failed to load config, using defaults: {}", &err)))
                },
            };

            if let Some(duration) = scan_duration_override {
                config.override_scan_duration(duration);
            }

            (config, error_message)
        };

        Command::perform(fut, Message::ConfigLoadComplete)
    }

    fn send_start_scan(&self) -> Command<Message> {
        let Some(mut sender) = self.commands.clone() else {
            warn!("Scanner is not ready yet");
            return Command::none();
        };

        let fut = async move {
            sender.send(ScanCommand::StartScan).await.is_ok()
        };

        Command::perform(fut, Message::StartScanSent)
    }

    fn device_row(row: DeviceRow) -> Element<'static, Message> {
        container(
            column![
                text(row.name).size(16),
                text(row.id_line).size(14),
                text(row.rssi_line).size(14),
            ].spacing(2),
        )
        .width(Length::Fill)
        .padding([8, 4])
        .style(theme::Container::Custom(Box::new(DeviceRowStyleSheet)))
        .into()
    }
}

impl Application for ScannerApplication {
    type Executor = AppExecutor;
    type Message = Message;
    type Theme = Theme;
    type Flags = ApplicationFlags;

    fn new(flags: ApplicationFlags) -> (ScannerApplication, Command<Self::Message>) {
        let permission_gate = PermissionGate::new(Arc::new(PlatformPermissions));
        permission_gate.request_permissions();

        let app = ScannerApplication {
            app_cancel: CancellationToken::new(),
            notices: Vec::new(),
            config_io: flags.config_io,
            scan_duration_override: flags.scan_duration_override,
            settings: None,
            _permission_gate: permission_gate,
            commands: None,
            unavailable: None,
            snapshot: ScanSnapshot::default(),
        };

        let command = app.load_config();
        (app, command)
    }

    fn title(&self) -> String {
        format!("{} {}", TITLE, env!("CARGO_PKG_VERSION"))
    }

    fn update(&mut self, message: Message) -> Command<Self::Message> {
        match message {
            Message::ConfigLoadComplete((config, error_message)) => {
                info!("Config load complete: {:?}", config);
                self.settings = Some(ScanSettings::from(&config));
                if let Some(error_message) = error_message {
                    self.notices.push(error_message);
                }
            },
            Message::NoticeConfirmed => {
                if !self.notices.is_empty() {
                    self.notices.remove(0);
                }
            },
            Message::EventOccurred(Event::Window(id, window::Event::CloseRequested)) => {
                info!("Close requested");
                self.before_close();
                return window::close(id);
            },
            Message::Scan(ScanUpdate::Ready { commands, unavailable }) => {
                info!("Scanner ready");
                self.commands = Some(commands);
                self.unavailable = unavailable;
            },
            Message::Scan(ScanUpdate::Snapshot(snapshot)) => {
                self.snapshot = snapshot;
            },
            Message::StartScanPressed => {
                return self.send_start_scan();
            },
            Message::StartScanSent(false) => {
                error!("Failed to send start command to the scanner");
            },

            _ => {}
        }

        Command::none()
    }

    fn subscription(&self) -> Subscription<Message> {
        let scanner = match &self.settings {
            Some(settings) => scan_subscription(self.app_cancel.clone(), settings.clone()).map(Message::Scan),
            None => Subscription::none(),
        };

        Subscription::batch([
            event::listen().map(Message::EventOccurred),
            scanner,
        ])
    }

    fn view(&self) -> Element<Message> {
        if let Some(notice) = self.notices.first() {
            return container(
                column![
                    text(notice),

                    button(text("Okay"))
                        .on_press(Message::NoticeConfirmed),

                ].align_items(Alignment::Center).spacing(20),
            )
            .width(Length::Fill)
            .padding(20)
            .into()
        }

        let content: Element<Message> = match screen(self.commands.is_some(), self.unavailable.as_ref(), &self.snapshot) {
            Screen::Unavailable { heading, explanation, detail } => {
                column![
                    text(TITLE).size(18),
                    text(heading).size(16),
                    text(explanation).size(14),
                    text(detail).size(14),
                ]
                .spacing(20)
                .align_items(Alignment::Center)
                .width(Length::Fill)
                .into()
            },
            Screen::Scanner { button_label, button_enabled, rows } => {
                let scan_button = button(text(button_label))
                    .on_press_maybe(button_enabled.then_some(Message::StartScanPressed));

                column![
                    text(TITLE).size(18),
                    scan_button,
                    horizontal_rule(10),
                    scrollable(
                        Column::with_children(rows.into_iter().map(ScannerApplication::device_row))
                            .width(Length::Fill)
                    ).height(Length::Fill),
                ]
                .spacing(20)
                .width(Length::Fill)
                .into()
            },
        };

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .padding(20)
            .into()
    }
}

pub fn run_application(config_io: ConfigIO, scan_duration_override: Option<Duration>) -> Result<(), AppRunError> {
    let flags = ApplicationFlags { config_io, scan_duration_override };
    let mut settings = Settings::with_flags(flags);

    // handle exits ourselves (Event::CloseRequested)
    settings.id = Some("ble-esp32".to_string());
    settings.window.exit_on_close_request = false;
    settings.window.size = Size::new(420.0, 640.0);

    // this function will call process::exit() unless there was a startup error
    ScannerApplication::run(settings)?;
    Ok(())
}

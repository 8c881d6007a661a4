mod api;
mod app;
mod application;
mod domain;
mod ui;
mod utils;

use iced::{window, Size};
use tracing_subscriber::EnvFilter;

use crate::api::ChannelConfig;

fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ChannelConfig::load();
    tracing::info!("download server: {}", config.server_url);

    iced::application(
        move || app::DownloadApp::new(config.clone()),
        app::update,
        app::view,
    )
    .title("Play Store Downloader")
    .subscription(app::subscription)
    .window(window::Settings {
        size: Size::new(640.0, 360.0),
        ..Default::default()
    })
    .run()
}

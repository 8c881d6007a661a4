pub mod client;
pub mod models;

pub use client::{ChannelEvent, ChannelSender, RealtimeClient};
pub use models::{ChannelConfig, ClientEvent, ServerEvent};

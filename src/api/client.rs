use std::time::Duration;

use futures::stream::BoxStream;
use futures::{SinkExt, Stream, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, trace, warn};

use super::models::{
    ChannelConfig, ClientEvent, CodecError, Handshake, Packet, ServerEvent, SocketPacket,
};
use crate::utils::socket_url;

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("WebSocket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] CodecError),

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Channel is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, ChannelError>;

/// What the realtime connection reports to the application
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    Connected(ChannelSender),
    Server(ServerEvent),
    Closed(String),
}

/// Outbound half of an established connection
#[derive(Debug, Clone)]
pub struct ChannelSender {
    outbound: mpsc::UnboundedSender<ClientEvent>,
}

impl ChannelSender {
    pub(crate) fn new(outbound: mpsc::UnboundedSender<ClientEvent>) -> Self {
        Self { outbound }
    }

    pub fn send(&self, event: ClientEvent) -> Result<()> {
        self.outbound.send(event).map_err(|_| ChannelError::Closed)
    }
}

/// Socket.IO client speaking Engine.IO v4 over a websocket
#[derive(Clone)]
pub struct RealtimeClient {
    config: ChannelConfig,
}

impl RealtimeClient {
    pub fn new(config: ChannelConfig) -> Self {
        Self { config }
    }

    /// Open the socket, finish the Engine.IO and Socket.IO handshakes,
    /// then hand back the outbound sender and a stream of inbound events.
    pub async fn connect(&self) -> Result<(ChannelSender, impl Stream<Item = ServerEvent>)> {
        let url = socket_url(&self.config.server_url, &self.config.socket_path)?;
        info!("connecting to {}", url);
        let (ws_stream, _) = connect_async(url.as_str()).await?;
        let (mut writer, mut reader) = ws_stream.split();

        let handshake = match next_packet(&mut reader).await? {
            Packet::Open(handshake) => handshake,
            other => {
                return Err(ChannelError::Handshake(format!(
                    "expected open packet, got {:?}",
                    other
                )))
            }
        };
        debug!("engine.io session {} opened", handshake.sid);

        writer
            .send(Message::Text(Packet::Message(SocketPacket::Connect(None)).encode()))
            .await?;

        loop {
            match next_packet(&mut reader).await? {
                Packet::Message(SocketPacket::Connect(_)) => break,
                Packet::Message(SocketPacket::ConnectError(data)) => {
                    return Err(ChannelError::Handshake(data.to_string()))
                }
                Packet::Ping => writer.send(Message::Text(Packet::Pong.encode())).await?,
                other => trace!("ignoring {:?} before namespace connect", other),
            }
        }
        info!("socket.io namespace connected");

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        tokio::spawn(pump(writer, reader, handshake, outbound_rx, inbound_tx));

        let events = futures::stream::unfold(inbound_rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });
        Ok((ChannelSender::new(outbound_tx), events))
    }

    /// Connection lifecycle as a single stream: `Connected` first, then
    /// server events, then exactly one `Closed`.
    pub fn events(&self) -> BoxStream<'static, ChannelEvent> {
        let client = self.clone();
        futures::stream::once(async move { client.connect().await })
            .flat_map(|result| match result {
                Ok((sender, events)) => futures::stream::once(async move {
                    ChannelEvent::Connected(sender)
                })
                .chain(events.map(ChannelEvent::Server))
                .chain(futures::stream::once(async {
                    ChannelEvent::Closed("connection to the server was lost".to_string())
                }))
                .boxed(),
                Err(e) => {
                    warn!("realtime connection failed: {}", e);
                    futures::stream::once(async move { ChannelEvent::Closed(e.to_string()) })
                        .boxed()
                }
            })
            .boxed()
    }
}

async fn next_packet<S>(reader: &mut S) -> Result<Packet>
where
    S: Stream<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        match reader.next().await {
            Some(Ok(Message::Text(text))) => return Ok(Packet::decode(&text)?),
            Some(Ok(Message::Close(_))) | None => return Err(ChannelError::Closed),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

/// Shuttle frames between the socket and the application until either side goes away.
async fn pump<W, R>(
    mut writer: W,
    mut reader: R,
    handshake: Handshake,
    mut outbound: mpsc::UnboundedReceiver<ClientEvent>,
    inbound: mpsc::UnboundedSender<ServerEvent>,
) where
    W: futures::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    R: Stream<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let liveness: Duration = handshake.liveness_window();
    loop {
        tokio::select! {
            request = outbound.recv() => {
                let Some(request) = request else {
                    debug!("application dropped the channel, closing socket");
                    let _ = writer.send(Message::Text(Packet::Close.encode())).await;
                    break;
                };
                debug!("sending {:?}", request);
                if let Err(e) = writer.send(Message::Text(request.into_packet().encode())).await {
                    warn!("failed to send request: {}", e);
                    break;
                }
            }
            frame = tokio::time::timeout(liveness, next_packet(&mut reader)) => {
                let packet = match frame {
                    Ok(Ok(packet)) => packet,
                    Ok(Err(ChannelError::Protocol(e))) => {
                        warn!("dropping malformed packet: {}", e);
                        continue;
                    }
                    Ok(Err(e)) => {
                        info!("socket closed: {}", e);
                        break;
                    }
                    Err(_) => {
                        warn!("no ping from server within {:?}", liveness);
                        break;
                    }
                };
                match packet {
                    Packet::Ping => {
                        trace!("ping");
                        if writer.send(Message::Text(Packet::Pong.encode())).await.is_err() {
                            break;
                        }
                    }
                    Packet::Message(SocketPacket::Event { name, args }) => {
                        match ServerEvent::from_event(&name, &args) {
                            Ok(event) => {
                                debug!("received {:?}", event);
                                if inbound.send(event).is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!("ignoring event: {}", e),
                        }
                    }
                    Packet::Close | Packet::Message(SocketPacket::Disconnect) => {
                        info!("server closed the session");
                        break;
                    }
                    other => trace!("ignoring {:?}", other),
                }
            }
        }
    }
}

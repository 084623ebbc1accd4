//! WebSocket implementation of [`Channel`]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as Frame;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use sb_core::error::ChannelError;
use sb_protocol::{ClientMessage, ServerMessage};

use super::{Channel, INBOUND_CAPACITY, OUTBOUND_CAPACITY};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Push channel over a single WebSocket connection
pub struct WsChannel {
    url: String,
    outbound: mpsc::Sender<ClientMessage>,
    open: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl WsChannel {
    /// Connect to `url` and start the frame loop.
    ///
    /// Returns the channel and the receiver for inbound messages. The
    /// receiver yields `None` once the connection is gone.
    pub async fn connect(
        url: &str,
    ) -> Result<(Self, mpsc::Receiver<ServerMessage>), ChannelError> {
        tracing::debug!("Connecting to switchboard channel at {}", url);

        let (stream, _response) =
            connect_async(url)
                .await
                .map_err(|e| ChannelError::ConnectFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

        tracing::info!("Connected to switchboard channel at {}", url);

        let (event_tx, event_rx) = mpsc::channel::<ServerMessage>(INBOUND_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::channel::<ClientMessage>(OUTBOUND_CAPACITY);
        let open = Arc::new(AtomicBool::new(true));
        let cancel = CancellationToken::new();

        tokio::spawn(frame_loop(
            stream,
            event_tx,
            outbound_rx,
            Arc::clone(&open),
            cancel.clone(),
        ));

        let channel = Self {
            url: url.to_string(),
            outbound: outbound_tx,
            open,
            cancel,
        };
        Ok((channel, event_rx))
    }

    /// The URL this channel connected to
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Channel for WsChannel {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    async fn send(&self, message: ClientMessage) -> Result<(), ChannelError> {
        if !self.is_open() {
            return Err(ChannelError::Closed);
        }
        self.outbound
            .send(message)
            .await
            .map_err(|_| ChannelError::Closed)
    }

    async fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for WsChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Pump frames between the socket and the two queues until either side
/// goes away
async fn frame_loop(
    stream: WsStream,
    event_tx: mpsc::Sender<ServerMessage>,
    mut outbound_rx: mpsc::Receiver<ClientMessage>,
    open: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Switchboard channel closed locally");
                break;
            }

            frame = source.next() => {
                match frame {
                    Some(Ok(Frame::Text(text))) => {
                        tracing::trace!("Received frame: {}", text);
                        match ServerMessage::from_json(&text) {
                            Ok(message) => {
                                if event_tx.send(message).await.is_err() {
                                    tracing::debug!("Inbound queue closed");
                                    break;
                                }
                            }
                            Err(e) => tracing::warn!("Dropping unreadable frame: {}", e),
                        }
                    }
                    Some(Ok(Frame::Close(_))) | None => {
                        tracing::info!("Switchboard channel closed by backend");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!("Switchboard channel read error: {}", e);
                        break;
                    }
                }
            }

            Some(message) = outbound_rx.recv() => {
                let kind = message.kind();
                let text = match message.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(kind, "Failed to encode message: {}", e);
                        continue;
                    }
                };
                tracing::trace!("Sending frame: {}", text);
                if let Err(e) = sink.send(Frame::Text(text)).await {
                    tracing::warn!(kind, "Switchboard channel write error: {}", e);
                    break;
                }
            }
        }
    }

    open.store(false, Ordering::Release);
    // Refuse new sends before the session sees the inbound queue end
    drop(outbound_rx);
    let _ = sink.close().await;
    drop(event_tx);
}

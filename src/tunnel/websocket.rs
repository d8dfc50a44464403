//! WebSocket tunnel to the gateway
//!
//! A [`Tunnel`] is created unconnected. The protocol client owns it and
//! calls [`Tunnel::connect`] with the handshake; from then on a background
//! task pumps frames in both directions and reports lifecycle changes on the
//! status channel returned by [`Tunnel::new`].

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{TunnelError, TunnelResult};

/// WebSocket subprotocol spoken by the gateway
pub const TUNNEL_SUBPROTOCOL: &str = "guacamole";

/// Default idle receive timeout
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Lifecycle notifications emitted by a tunnel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TunnelStatus {
    /// WebSocket handshake completed
    Open,
    /// The tunnel failed; no further frames will be delivered
    Error(TunnelError),
    /// The gateway closed the tunnel with a normal close
    Closed,
}

/// One bidirectional connection to the gateway
#[derive(Debug)]
pub struct Tunnel {
    url: Url,
    receive_timeout: Duration,
    status_tx: mpsc::UnboundedSender<TunnelStatus>,
    inbound_tx: mpsc::UnboundedSender<String>,
    inbound_rx: Option<mpsc::UnboundedReceiver<String>>,
    outbound_tx: Option<mpsc::UnboundedSender<String>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Tunnel {
    /// Creates an unconnected tunnel and its status channel
    pub fn new(url: Url) -> (Self, mpsc::UnboundedReceiver<TunnelStatus>) {
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let tunnel = Self {
            url,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            status_tx,
            inbound_tx,
            inbound_rx: Some(inbound_rx),
            outbound_tx: None,
            cancel: CancellationToken::new(),
            task: None,
        };

        (tunnel, status_rx)
    }

    /// Sets the idle receive timeout. Must be called before `connect`.
    pub fn set_receive_timeout(&mut self, timeout: Duration) {
        self.receive_timeout = timeout;
    }

    /// Returns the idle receive timeout
    pub fn receive_timeout(&self) -> Duration {
        self.receive_timeout
    }

    /// Returns the tunnel URL without handshake query
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Takes the receiver of inbound text frames
    ///
    /// Returns `None` after the first call.
    pub fn take_inbound(&mut self) -> Option<mpsc::UnboundedReceiver<String>> {
        self.inbound_rx.take()
    }

    /// Returns true once `connect` was called and the tunnel is not closed
    pub fn is_connected(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Opens the WebSocket, sending `handshake` as the URL query
    pub fn connect(&mut self, handshake: &str) -> TunnelResult<()> {
        if self.task.is_some() {
            return Err(TunnelError::AlreadyConnected);
        }

        let mut url = self.url.clone();
        if !handshake.is_empty() {
            url.set_query(Some(handshake));
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        self.outbound_tx = Some(outbound_tx);

        let pump = TunnelPump {
            receive_timeout: self.receive_timeout,
            status_tx: self.status_tx.clone(),
            inbound_tx: self.inbound_tx.clone(),
            outbound_rx,
            cancel: self.cancel.clone(),
        };
        self.task = Some(tokio::spawn(pump.run(url)));

        Ok(())
    }

    /// Queues a text frame for the gateway
    pub fn send(&self, data: impl Into<String>) -> TunnelResult<()> {
        let outbound = self.outbound_tx.as_ref().ok_or(TunnelError::NotConnected)?;
        outbound
            .send(data.into())
            .map_err(|_| TunnelError::NotConnected)
    }

    /// Closes the tunnel
    pub fn disconnect(&mut self) {
        self.cancel.cancel();
        self.outbound_tx = None;
    }
}

impl Drop for Tunnel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct TunnelPump {
    receive_timeout: Duration,
    status_tx: mpsc::UnboundedSender<TunnelStatus>,
    inbound_tx: mpsc::UnboundedSender<String>,
    outbound_rx: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
}

impl TunnelPump {
    async fn run(self, url: Url) {
        let status_tx = self.status_tx.clone();
        match self.pump(url).await {
            Ok(()) => {
                let _ = status_tx.send(TunnelStatus::Closed);
            }
            Err(err) => {
                debug!("Tunnel error: {}", err);
                let _ = status_tx.send(TunnelStatus::Error(err));
            }
        }
    }

    async fn pump(mut self, url: Url) -> TunnelResult<()> {
        let mut request = url.as_str().into_client_request()?;
        request.headers_mut().insert(
            "Sec-WebSocket-Protocol",
            HeaderValue::from_static(TUNNEL_SUBPROTOCOL),
        );

        let connect = tokio_tungstenite::connect_async(request);
        let (ws, _response) = tokio::select! {
            _ = self.cancel.cancelled() => return Ok(()),
            result = tokio::time::timeout(self.receive_timeout, connect) => match result {
                Err(_) => return Err(TunnelError::Timeout(self.receive_timeout)),
                Ok(Err(e)) => return Err(TunnelError::ConnectFailed(e.to_string())),
                Ok(Ok(pair)) => pair,
            },
        };

        info!("Tunnel open to {}", url.host_str().unwrap_or_default());
        let _ = self.status_tx.send(TunnelStatus::Open);

        let (mut sink, mut stream) = ws.split();
        let idle = tokio::time::sleep(self.receive_timeout);
        tokio::pin!(idle);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return Ok(());
                }
                () = &mut idle => {
                    warn!("Tunnel idle for {:?}, giving up", self.receive_timeout);
                    return Err(TunnelError::Timeout(self.receive_timeout));
                }
                Some(data) = self.outbound_rx.recv() => {
                    sink.send(Message::Text(data)).await?;
                }
                frame = stream.next() => {
                    idle.as_mut().reset(Instant::now() + self.receive_timeout);
                    match frame {
                        None => return Ok(()),
                        Some(Ok(Message::Close(frame))) => return close_result(frame),
                        Some(Ok(Message::Text(text))) => {
                            let _ = self.inbound_tx.send(text);
                        }
                        Some(Ok(Message::Binary(data))) => {
                            let _ = self
                                .inbound_tx
                                .send(String::from_utf8_lossy(&data).into_owned());
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                    }
                }
            }
        }
    }
}

/// A close without a code, or with 1000, ends the tunnel normally
fn close_result(frame: Option<CloseFrame<'_>>) -> TunnelResult<()> {
    match frame {
        None => Ok(()),
        Some(frame) if frame.code == CloseCode::Normal => Ok(()),
        Some(frame) => Err(TunnelError::Closed {
            code: u16::from(frame.code),
            reason: frame.reason.into_owned(),
        }),
    }
}

use futures::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::common::{ChatMessage, TransportEvent};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unconnected,
    Connecting,
    Open,
    /// Terminal; a new `connect` is needed.
    Closed,
}

/// Raw signals from the socket task.
enum Signal {
    Opened,
    Frame(ChatMessage),
    Closed,
}

/// One real-time socket. Never reconnects.
pub struct Connection {
    state: ConnectionState,
    outbound: Option<mpsc::UnboundedSender<String>>,
    inbound: mpsc::UnboundedReceiver<Signal>,
    close_reported: bool,
    task: JoinHandle<()>,
}

impl Connection {
    fn open(endpoint: Url, runtime: &Handle) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let task = runtime.spawn(run_socket(endpoint, outbound_rx, inbound_tx));

        Self {
            state: ConnectionState::Connecting,
            outbound: Some(outbound_tx),
            inbound: inbound_rx,
            close_reported: false,
            task,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Queue one JSON frame. Nothing is written unless the connection is
    /// open and the message carries text.
    pub fn send(&mut self, message: &ChatMessage) -> Result<()> {
        if self.state != ConnectionState::Open {
            return Err(AppError::NotConnected);
        }
        if message.is_blank() {
            return Err(AppError::ValidationFailed("Message is empty".to_string()));
        }

        let frame = serde_json::to_string(message)
            .map_err(|err| AppError::ValidationFailed(err.to_string()))?;
        let Some(outbound) = &self.outbound else {
            return Err(AppError::NotConnected);
        };
        if outbound.send(frame).is_err() {
            // Socket task is gone; `Closed` is still reported by the next poll.
            self.state = ConnectionState::Closed;
            self.outbound = None;
            return Err(AppError::NotConnected);
        }
        Ok(())
    }

    pub fn try_next_event(&mut self) -> Option<TransportEvent> {
        while !self.close_reported {
            let signal = match self.inbound.try_recv() {
                Ok(signal) => signal,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => Signal::Closed,
            };
            if let Some(event) = self.apply(signal) {
                return Some(event);
            }
        }
        None
    }

    /// Wait for the next event. Returns `None` once `Closed` has been yielded.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        while !self.close_reported {
            let signal = self.inbound.recv().await.unwrap_or(Signal::Closed);
            if let Some(event) = self.apply(signal) {
                return Some(event);
            }
        }
        None
    }

    pub fn close(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        if self.state == ConnectionState::Connecting {
            self.task.abort();
        }
        // Dropping the sender makes the socket task send a close frame.
        self.outbound = None;
        self.state = ConnectionState::Closed;
        log::info!("Chat connection closed locally");
    }

    fn apply(&mut self, signal: Signal) -> Option<TransportEvent> {
        match signal {
            Signal::Opened if self.state == ConnectionState::Connecting => {
                self.state = ConnectionState::Open;
                Some(TransportEvent::Opened)
            }
            Signal::Frame(message) if self.state == ConnectionState::Open => {
                Some(TransportEvent::Message(message))
            }
            Signal::Closed => {
                self.state = ConnectionState::Closed;
                self.outbound = None;
                self.close_reported = true;
                Some(TransportEvent::Closed)
            }
            // Late signals after a local close.
            _ => None,
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.state == ConnectionState::Connecting {
            self.task.abort();
        }
    }
}

/// Owns at most one [`Connection`] for the session.
#[derive(Default)]
pub struct Transport {
    connection: Option<Connection>,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh connection, closing any previous one.
    pub fn connect(&mut self, endpoint: &str) -> Result<()> {
        let url = Url::parse(endpoint)
            .map_err(|err| AppError::UnsupportedTransport(format!("`{endpoint}`: {err}")))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(AppError::UnsupportedTransport(format!(
                "`{}` is not a websocket scheme",
                url.scheme()
            )));
        }
        let runtime = Handle::try_current()
            .map_err(|err| AppError::UnsupportedTransport(err.to_string()))?;

        if let Some(mut previous) = self.connection.take() {
            previous.close();
        }
        log::info!("Connecting to {url}");
        self.connection = Some(Connection::open(url, &runtime));
        Ok(())
    }

    pub fn state(&self) -> ConnectionState {
        self.connection
            .as_ref()
            .map_or(ConnectionState::Unconnected, Connection::state)
    }

    pub fn send(&mut self, message: &ChatMessage) -> Result<()> {
        match self.connection.as_mut() {
            Some(connection) => connection.send(message),
            None => Err(AppError::NotConnected),
        }
    }

    pub fn try_next_event(&mut self) -> Option<TransportEvent> {
        self.connection.as_mut()?.try_next_event()
    }

    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        self.connection.as_mut()?.next_event().await
    }

    pub fn close(&mut self) {
        if let Some(connection) = self.connection.as_mut() {
            connection.close();
        }
    }
}

async fn run_socket(
    endpoint: Url,
    mut outbound: mpsc::UnboundedReceiver<String>,
    inbound: mpsc::UnboundedSender<Signal>,
) {
    let ws_stream = match connect_async(endpoint.as_str()).await {
        Ok((stream, _)) => stream,
        Err(err) => {
            log::warn!("Failed to connect to {endpoint}: {err}");
            let _ = inbound.send(Signal::Closed);
            return;
        }
    };
    log::info!("Connected to {endpoint}");
    if inbound.send(Signal::Opened).is_err() {
        return;
    }

    let (mut write, mut read) = ws_stream.split();
    loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(text) => {
                    if let Err(err) = write.send(WsMessage::text(text)).await {
                        log::warn!("Failed to write chat frame: {err}");
                        break;
                    }
                }
                None => {
                    let _ = write.send(WsMessage::Close(None)).await;
                    break;
                }
            },
            incoming = read.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => deliver(&inbound, text.as_str()),
                Some(Ok(WsMessage::Binary(data))) => match std::str::from_utf8(&data) {
                    Ok(text) => deliver(&inbound, text),
                    Err(err) => log::warn!("{}", AppError::DecodeFailed(err.to_string())),
                },
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    log::warn!("Chat socket error: {err}");
                    break;
                }
            }
        }
    }

    log::info!("Chat socket to {endpoint} finished");
    let _ = inbound.send(Signal::Closed);
}

fn deliver(inbound: &mpsc::UnboundedSender<Signal>, text: &str) {
    match decode_frame(text) {
        Ok(message) => {
            let _ = inbound.send(Signal::Frame(message));
        }
        Err(err) => log::warn!("Dropping inbound frame: {err}"),
    }
}

pub fn decode_frame(text: &str) -> Result<ChatMessage> {
    serde_json::from_str(text).map_err(|err| AppError::DecodeFailed(err.to_string()))
}

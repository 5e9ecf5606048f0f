// Connection module: owns the single WebSocket connection to the server.
//
// `Connection::open` returns right away and spawns a driver task that does
// the handshake, forwards queued binary frames and turns everything the
// server sends into `ConnectionEvent`s. The current state is published on a
// watch channel so `send` can check it without talking to the driver, and
// `close` can move it to Closing before the close frame is even queued.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::error::{Result, UploadError};
use crate::state::{ConnectionEvent, ConnectionState, InboundMessage, ABNORMAL_CLOSURE};

/// Frames queued for the driver's writer half.
#[derive(Debug)]
enum Outbound {
    Binary(Vec<u8>),
    Close,
}

/// Driver-side handle: applies events to the shared state, then forwards
/// them to whoever listens.
#[derive(Clone)]
struct Lifecycle {
    state: Arc<watch::Sender<ConnectionState>>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
}

impl Lifecycle {
    fn dispatch(&self, event: ConnectionEvent) {
        self.state.send_modify(|state| *state = state.on_event(&event));
        // Nobody listening is fine, the state above is what matters.
        let _ = self.events.send(event);
    }

    /// Report a transport failure, then the abnormal close that follows it.
    fn fail(&self, detail: String, reason: &str) {
        self.dispatch(ConnectionEvent::Error(detail));
        self.dispatch(ConnectionEvent::Closed {
            code: ABNORMAL_CLOSURE,
            reason: reason.to_string(),
        });
    }
}

/// The client's one and only server connection. It is never recreated:
/// once it reaches a terminal state every `send` fails with `NotOpen`.
pub struct Connection {
    url: Url,
    state: Arc<watch::Sender<ConnectionState>>,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl Connection {
    /// Start connecting to `url`. Must be called from within a tokio
    /// runtime. The returned receiver yields every lifecycle event in order.
    pub fn open(url: Url) -> (Connection, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (state_tx, _) = watch::channel(ConnectionState::Connecting);
        let state = Arc::new(state_tx);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let lifecycle = Lifecycle {
            state: state.clone(),
            events: events_tx,
        };
        tokio::spawn(drive(url.clone(), lifecycle, outbound_rx));

        let connection = Connection {
            url,
            state,
            outbound: outbound_tx,
        };
        (connection, events_rx)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_open(&self) -> bool {
        self.state().is_open()
    }

    /// Wait until the handshake has either succeeded or failed.
    pub async fn settled(&self) -> ConnectionState {
        self.state
            .subscribe()
            .wait_for(|s| *s != ConnectionState::Connecting)
            .await
            .map(|current| *current)
            .unwrap_or_else(|_| self.state())
    }

    /// Queue `bytes` as one binary frame. Fails with `NotOpen` unless the
    /// connection is currently open. Returns the number of bytes queued.
    pub fn send(&self, bytes: Vec<u8>) -> Result<usize> {
        let state = self.state();
        if !state.is_open() {
            return Err(UploadError::NotOpen(state));
        }
        let len = bytes.len();
        self.outbound
            .send(Outbound::Binary(bytes))
            .map_err(|_| UploadError::NotOpen(self.gone_state()))?;
        Ok(len)
    }

    /// Ask the server for a normal close. Does nothing unless open. The
    /// state moves to Closing right away, so every later `send` is refused.
    pub fn close(&self) {
        let mut started = false;
        self.state.send_if_modified(|state| {
            let next = state.begin_close();
            started = next != *state;
            *state = next;
            started
        });
        if started {
            log::debug!("Closing connection to {}", self.url);
            let _ = self.outbound.send(Outbound::Close);
        }
    }

    /// State to report once the writer is gone. It can only still read
    /// Open if the driver ended without dispatching its close.
    fn gone_state(&self) -> ConnectionState {
        match self.state() {
            ConnectionState::Open => ConnectionState::Closed,
            state => state,
        }
    }
}

/// Connection-watcher task: logs every event until the driver is done and
/// returns how many were logged.
pub async fn watch_events(mut events: mpsc::UnboundedReceiver<ConnectionEvent>) -> usize {
    let mut logged = 0;
    while let Some(event) = events.recv().await {
        event.log();
        logged += 1;
    }
    logged
}

async fn drive(url: Url, lifecycle: Lifecycle, mut outbound: mpsc::UnboundedReceiver<Outbound>) {
    log::debug!("Connecting to {}", url);

    let stream = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((stream, response)) => {
            log::debug!("Handshake with {} complete (status: {})", url, response.status());
            stream
        }
        Err(e) => {
            lifecycle.fail(format!("connection to {} failed: {}", url, e), "Connection failed");
            return;
        }
    };
    lifecycle.dispatch(ConnectionEvent::Opened);

    let (mut write, mut read) = stream.split();

    let writer_lifecycle = lifecycle.clone();
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            let (message, last) = match frame {
                Outbound::Binary(bytes) => (Message::Binary(bytes.into()), false),
                Outbound::Close => (Message::Close(None), true),
            };
            if let Err(e) = write.send(message).await {
                writer_lifecycle.dispatch(ConnectionEvent::Error(format!("send failed: {}", e)));
                break;
            }
            if last {
                break;
            }
        }
    });

    let mut closed = false;
    // Keep reading after a close frame so tungstenite can flush its reply;
    // the stream ends once the close handshake is done.
    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                let message = InboundMessage::Text(text.as_str().to_owned());
                lifecycle.dispatch(ConnectionEvent::Message(message));
            }
            Ok(Message::Binary(data)) => {
                log::debug!("Received binary ({} bytes)", data.len());
                let message = InboundMessage::Binary(data.to_vec());
                lifecycle.dispatch(ConnectionEvent::Message(message));
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
            Ok(Message::Close(frame)) => {
                let (code, reason) = frame
                    .map(|f| (u16::from(f.code), f.reason.as_str().to_owned()))
                    .unwrap_or((1000, String::new()));
                lifecycle.dispatch(ConnectionEvent::Closed { code, reason });
                closed = true;
            }
            Err(e) if closed => {
                log::debug!("Error after close: {}", e);
                break;
            }
            Err(e) => {
                lifecycle.fail(e.to_string(), "Connection error");
                closed = true;
                break;
            }
        }
    }

    if !closed {
        lifecycle.dispatch(ConnectionEvent::Closed {
            code: ABNORMAL_CLOSURE,
            reason: "Connection dropped".to_string(),
        });
    }
    writer.abort();
    log::debug!("Connection to {} ended", url);
}

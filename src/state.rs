// Connection lifecycle: the states a connection can be in, the typed events
// the socket driver emits, and the transition function between them.
//
// The `Display` impls on events produce the exact console lines the client
// prints, so the watcher task and the tests share one source of truth.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Close code used when the transport went away without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Lifecycle of the single server connection. There is no way back to
/// `Connecting`: the client never reconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    /// We asked for a close; waiting for the server's reply.
    Closing,
    Closed,
    Errored,
}

impl ConnectionState {
    pub fn is_open(self) -> bool {
        self == ConnectionState::Open
    }

    /// No further upload can succeed. Errored may still move to Closed.
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Errored)
    }

    /// State after the client asks for a close. Only an open connection
    /// can start closing.
    pub fn begin_close(self) -> ConnectionState {
        match self {
            ConnectionState::Open => ConnectionState::Closing,
            state => state,
        }
    }

    /// Apply one event and return the resulting state. Events that make no
    /// sense in the current state leave it unchanged.
    pub fn on_event(self, event: &ConnectionEvent) -> ConnectionState {
        use ConnectionState::*;
        match (self, event) {
            (Connecting, ConnectionEvent::Opened) => Open,
            (Connecting | Open | Closing, ConnectionEvent::Error(_)) => Errored,
            (Connecting | Open | Closing | Errored, ConnectionEvent::Closed { .. }) => Closed,
            (state, _) => state,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
            ConnectionState::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Payload pushed by the server. Never parsed, only logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    Text(String),
    Binary(Vec<u8>),
}

impl fmt::Display for InboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InboundMessage::Text(text) => f.write_str(text),
            // keep the log sink textual
            InboundMessage::Binary(data) => write!(f, "base64:{}", STANDARD.encode(data)),
        }
    }
}

/// Everything the socket driver reports back to the rest of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Opened,
    Message(InboundMessage),
    Error(String),
    Closed { code: u16, reason: String },
}

impl ConnectionEvent {
    /// Level the event is logged at: errors are errors, the rest is info.
    pub fn level(&self) -> log::Level {
        match self {
            ConnectionEvent::Error(_) => log::Level::Error,
            _ => log::Level::Info,
        }
    }

    /// Write the event to the log.
    pub fn log(&self) {
        log::log!(self.level(), "{}", self);
        if let ConnectionEvent::Closed { code, reason } = self {
            log::debug!("close code {} reason {:?}", code, reason);
        }
    }
}

impl fmt::Display for ConnectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionEvent::Opened => f.write_str("Connexion établie avec le serveur."),
            ConnectionEvent::Message(message) => write!(f, "Réponse du serveur : {}", message),
            ConnectionEvent::Error(detail) => write!(f, "Erreur WebSocket : {}", detail),
            ConnectionEvent::Closed { .. } => f.write_str("Connexion fermée."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closed() -> ConnectionEvent {
        ConnectionEvent::Closed {
            code: 1000,
            reason: String::new(),
        }
    }

    #[test]
    fn handshake_success_opens() {
        assert_eq!(
            ConnectionState::Connecting.on_event(&ConnectionEvent::Opened),
            ConnectionState::Open
        );
    }

    #[test]
    fn handshake_failure_errors_then_closes() {
        let state = ConnectionState::Connecting.on_event(&ConnectionEvent::Error("refused".into()));
        assert_eq!(state, ConnectionState::Errored);
        assert!(state.is_terminal());
        assert_eq!(state.on_event(&closed()), ConnectionState::Closed);
    }

    #[test]
    fn open_connection_can_error_or_close() {
        let open = ConnectionState::Open;
        assert_eq!(open.on_event(&ConnectionEvent::Error("reset".into())), ConnectionState::Errored);
        assert_eq!(open.on_event(&closed()), ConnectionState::Closed);
    }

    #[test]
    fn messages_do_not_change_state() {
        let msg = ConnectionEvent::Message(InboundMessage::Text("ack".into()));
        assert_eq!(ConnectionState::Open.on_event(&msg), ConnectionState::Open);
    }

    #[test]
    fn closed_never_reopens() {
        let closed_state = ConnectionState::Closed;
        assert_eq!(closed_state.on_event(&ConnectionEvent::Opened), ConnectionState::Closed);
        assert_eq!(
            closed_state.on_event(&ConnectionEvent::Error("late".into())),
            ConnectionState::Closed
        );
        assert!(!closed_state.is_open());
    }

    #[test]
    fn errored_does_not_reopen() {
        assert_eq!(
            ConnectionState::Errored.on_event(&ConnectionEvent::Opened),
            ConnectionState::Errored
        );
    }

    #[test]
    fn client_close_goes_through_closing() {
        let closing = ConnectionState::Open.begin_close();
        assert_eq!(closing, ConnectionState::Closing);
        assert!(!closing.is_open());
        assert!(!closing.is_terminal());
        assert_eq!(closing.on_event(&closed()), ConnectionState::Closed);
        assert_eq!(
            closing.on_event(&ConnectionEvent::Error("reset".into())),
            ConnectionState::Errored
        );
    }

    #[test]
    fn only_open_connections_start_closing() {
        assert_eq!(ConnectionState::Connecting.begin_close(), ConnectionState::Connecting);
        assert_eq!(ConnectionState::Closed.begin_close(), ConnectionState::Closed);
        assert_eq!(ConnectionState::Errored.begin_close(), ConnectionState::Errored);
    }

    #[test]
    fn errors_log_at_error_level() {
        assert_eq!(ConnectionEvent::Error("boom".into()).level(), log::Level::Error);
        assert_eq!(ConnectionEvent::Opened.level(), log::Level::Info);
        assert_eq!(closed().level(), log::Level::Info);
        let reply = ConnectionEvent::Message(InboundMessage::Text("ack".into()));
        assert_eq!(reply.level(), log::Level::Info);
    }

    #[test]
    fn log_lines() {
        let reply = ConnectionEvent::Message(InboundMessage::Text("ack".into()));
        assert_eq!(reply.to_string(), "Réponse du serveur : ack");
        assert_eq!(ConnectionEvent::Opened.to_string(), "Connexion établie avec le serveur.");
        assert_eq!(closed().to_string(), "Connexion fermée.");
        assert_eq!(
            ConnectionEvent::Error("boom".into()).to_string(),
            "Erreur WebSocket : boom"
        );
    }

    #[test]
    fn binary_replies_are_rendered_as_base64() {
        let reply = InboundMessage::Binary(vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(reply.to_string(), "base64:3q2+7w==");
    }
}

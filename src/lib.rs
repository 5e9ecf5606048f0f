// Library root
// -----------
// This crate exposes the upload client as a library; the binary
// (`main.rs`) wires the pieces together on a tokio runtime.
//
// Module responsibilities:
// - `config`: server address (env override, literal default).
// - `connection`: the single WebSocket connection and its watcher task.
// - `state`: connection states, typed events and their log lines.
// - `upload`: selection -> whole-file read -> checked binary send.
// - `format`: image signature sniffing for logs and the picker filter.
// - `ui`: interactive menu, file dialog and path prompt.
// - `error`: the library error type.
pub mod config;
pub mod connection;
pub mod error;
pub mod format;
pub mod state;
pub mod ui;
pub mod upload;

pub use connection::Connection;
pub use error::{Result, UploadError};
pub use state::{ConnectionEvent, ConnectionState, InboundMessage};
pub use upload::{UploadReceipt, Uploader};

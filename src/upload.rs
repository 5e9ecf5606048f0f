// Upload handler: turns a file selection into one binary frame on the
// connection. The menu never touches the connection directly; it sends
// `UploadRequest`s to `run_uploads` and waits for the reply.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::connection::Connection;
use crate::error::{Result, UploadError};
use crate::format::ImageFormat;

/// What a successful upload attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub path: PathBuf,
    pub bytes: usize,
    pub format: ImageFormat,
}

/// One selection event coming from the UI, plus the channel the outcome is
/// reported on.
#[derive(Debug)]
pub struct UploadRequest {
    pub selection: Option<PathBuf>,
    pub reply: oneshot::Sender<Result<Option<UploadReceipt>>>,
}

impl UploadRequest {
    pub fn new(selection: Option<PathBuf>) -> (Self, oneshot::Receiver<Result<Option<UploadReceipt>>>) {
        let (reply, outcome) = oneshot::channel();
        (UploadRequest { selection, reply }, outcome)
    }
}

/// Read the whole file into memory. No partial reads, no streaming.
pub async fn read_selected(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|source| UploadError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

pub struct Uploader {
    connection: Arc<Connection>,
}

impl Uploader {
    pub fn new(connection: Arc<Connection>) -> Self {
        Uploader { connection }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Handle one selection change. An empty selection is a no-op and
    /// returns `Ok(None)`. Otherwise the file is read in full and then sent
    /// as a single frame; a failed read or a connection that is not open
    /// aborts this attempt only.
    pub async fn on_selection(&self, selection: Option<PathBuf>) -> Result<Option<UploadReceipt>> {
        let path = match selection {
            Some(path) => path,
            None => {
                log::debug!("Empty selection, nothing to upload");
                return Ok(None);
            }
        };

        let data = read_selected(&path).await.map_err(|e| {
            log::error!("{}", e);
            e
        })?;
        let format = ImageFormat::detect(&data);

        let bytes = self.connection.send(data).map_err(|e| {
            log::error!("Upload of {} rejected: {}", path.display(), e);
            e
        })?;
        log::info!("Image envoyée au serveur.");
        log::debug!("{}: {} bytes, format {}", path.display(), bytes, format);

        Ok(Some(UploadReceipt { path, bytes, format }))
    }
}

/// Upload-handler task. Serves requests one at a time in arrival order
/// until every sender is gone.
pub async fn run_uploads(uploader: Uploader, mut requests: mpsc::Receiver<UploadRequest>) {
    while let Some(request) = requests.recv().await {
        let outcome = uploader.on_selection(request.selection).await;
        // The UI may have stopped waiting; the outcome is already logged.
        let _ = request.reply.send(outcome);
    }
}

/// Hand a selection to the upload-handler from blocking code and wait for
/// the outcome. Must not be called from inside an async context.
pub fn submit_blocking(
    requests: &mpsc::Sender<UploadRequest>,
    selection: Option<PathBuf>,
) -> Result<Option<UploadReceipt>> {
    let (request, outcome) = UploadRequest::new(selection);
    requests
        .blocking_send(request)
        .map_err(|_| UploadError::HandlerGone)?;
    outcome.blocking_recv().map_err(|_| UploadError::HandlerGone)?
}

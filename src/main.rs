// Entrypoint for the upload client.
// - Opens the connection once and starts the watcher and upload tasks.
// - Runs the blocking menu on the main thread, as native file dialogs
//   expect, while a tokio runtime drives the socket in the background.
// - Returns `anyhow::Result` to keep error handling at the edge simple.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use env_logger::Env;
use tokio::sync::mpsc;
use ws_image_upload::config::ClientConfig;
use ws_image_upload::connection::{watch_events, Connection};
use ws_image_upload::ui::main_menu;
use ws_image_upload::upload::{run_uploads, Uploader};

/// How long to wait for the server to acknowledge our close on exit.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    // `UPLOAD_SERVER_URL` or ws://localhost:5000, see `ClientConfig::from_env`.
    let config = ClientConfig::from_env().context("Invalid server address")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .build()
        .context("Failed to create async runtime")?;

    // `Connection::open` spawns its driver, so it needs the runtime context.
    let (connection, events) = {
        let _guard = runtime.enter();
        Connection::open(config.server_url)
    };
    let connection = Arc::new(connection);
    let watcher = runtime.spawn(watch_events(events));

    let (requests, pending) = mpsc::channel(8);
    let handler = runtime.spawn(run_uploads(Uploader::new(connection.clone()), pending));

    // Blocks until the user exits; dropping `requests` lets the handler stop.
    main_menu(requests, connection.clone())?;

    runtime.block_on(async {
        handler.await.context("Upload handler panicked")?;

        connection.close();
        if tokio::time::timeout(SHUTDOWN_GRACE, watcher).await.is_err() {
            log::debug!("Server did not finish the close handshake in time");
        }
        Ok::<(), anyhow::Error>(())
    })
}

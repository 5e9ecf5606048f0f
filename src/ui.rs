// UI layer: a simple interactive menu using `dialoguer`. It runs on the
// main thread and hands selections to the upload handler task, so the
// connection keeps logging in the background while the menu waits.
//
// Connection logs share the terminal with the menu; the menu is redrawn
// with a fresh status prompt after every action so it stays readable.

use crate::connection::Connection;
use crate::format::PICKER_EXTENSIONS;
use crate::state::ConnectionState;
use crate::upload::{submit_blocking, UploadRequest};
use anyhow::Result;
use dialoguer::{Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use rfd::FileDialog;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Main interactive menu. Loops until the user picks "Exit".
///
/// Uploads may be attempted at any time; when the connection is not open
/// the handler refuses them and the reason is printed.
pub fn main_menu(requests: mpsc::Sender<UploadRequest>, connection: Arc<Connection>) -> Result<()> {
    loop {
        let items = vec![
            "Choose image (file dialog)",
            "Type image path",
            "Connection status",
            "Exit",
        ];
        let selection = Select::new()
            .with_prompt(menu_prompt(&connection))
            .items(&items)
            .default(0)
            .interact()?;
        match selection {
            0 => upload(&requests, pick_with_dialog()),
            1 => upload(&requests, prompt_for_path()?),
            2 => println!("{}", menu_prompt(&connection)),
            3 => break,
            _ => {}
        }
    }
    Ok(())
}

fn menu_prompt(connection: &Connection) -> String {
    status_line(connection.url().as_str(), connection.state())
}

fn status_line(url: &str, state: ConnectionState) -> String {
    format!("Upload client [{} is {}]", url, state)
}

/// Send one selection through the handler with a spinner while it runs.
fn upload(requests: &mpsc::Sender<UploadRequest>, selection: Option<PathBuf>) {
    // A cancelled picker is not an upload: no spinner, no message.
    if selection.is_none() {
        return;
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Uploading...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = submit_blocking(requests, selection);
    spinner.finish_and_clear();

    match outcome {
        Ok(Some(receipt)) => println!("Upload successful ({} bytes, {})", receipt.bytes, receipt.format),
        Ok(None) => {}
        Err(e) => println!("Upload failed: {}", e),
    }
}

/// Open the native file dialog, filtered to images. Cancel gives `None`.
fn pick_with_dialog() -> Option<PathBuf> {
    let mut dialog = FileDialog::new()
        .set_title("Select an image to upload")
        .add_filter("Images", PICKER_EXTENSIONS);
    if let Some(dir) = dirs::picture_dir().or_else(dirs::home_dir) {
        dialog = dialog.set_directory(dir);
    }
    dialog.pick_file()
}

/// Fallback for terminals without a dialog: read a path. Empty means cancel.
fn prompt_for_path() -> Result<Option<PathBuf>> {
    let path: String = Input::new()
        .with_prompt("Image file path (empty to cancel)")
        .allow_empty(true)
        .interact_text()?;
    Ok(selection_from_input(&path))
}

fn selection_from_input(input: &str) -> Option<PathBuf> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}

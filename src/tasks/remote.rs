// MiBuddy — Remote Decision Task
//
// Serves the mapper's mailbox: one blocking HTTP round trip per request,
// never on the UI thread.

use std::time::Duration;

use crate::config::*;
use crate::drivers::http::HttpTransport;
use crate::input::RemoteWorker;

pub fn remote_task(worker: RemoteWorker, url: String) {
    log::info!("Remote task started ({})", url);

    let mut transport = HttpTransport::new();
    let poll = Duration::from_millis(REMOTE_POLL_MS);

    while worker.serve_one(&mut transport, &url, poll) {}

    log::warn!("Remote mailbox closed, exiting remote task");
}

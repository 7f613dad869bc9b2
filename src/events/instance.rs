//! Single-instance forwarding.
//!
//! The first process binds a loopback listener and publishes its port in a
//! well-known file. A later invocation delivers its open target and
//! presentation flags to that port as one JSON line and exits, so every
//! document lands in the already-running viewer. A stale port file (the
//! primary crashed) just fails the connect and the new process becomes the
//! primary itself.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::config::StartupOptions;
use crate::events::{EventSenders, OpenTarget};

/// How long a secondary invocation waits on the wire before giving up and
/// opening its own window.
const FORWARD_TIMEOUT: Duration = Duration::from_millis(500);

/// One forwarded invocation.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<Value>,
    #[serde(default, skip_serializing_if = "StartupOptions::is_empty")]
    pub options: StartupOptions,
}

impl InstanceRequest {
    /// Nothing to forward: no target and no explicit flags.
    pub const fn is_empty(&self) -> bool {
        self.open.is_none() && self.options.is_empty()
    }
}

/// Structured open value for a classified target, decodable on the primary
/// by [`OpenTarget::from_request`]. Paths are canonical, so the primary's
/// working directory does not matter.
pub fn open_request_value(target: &OpenTarget) -> Value {
    match target {
        OpenTarget::File(path) => json!({ "targetType": "file", "path": path }),
        OpenTarget::Folder(path) => json!({ "targetType": "folder", "path": path }),
    }
}

/// Where the primary publishes its listener port.
pub fn default_port_file() -> PathBuf {
    std::env::temp_dir().join("markpane.port")
}

/// Try to hand this invocation to an already-running viewer. Returns true
/// only when the request was delivered.
pub fn notify_primary(port_file: &Path, request: &InstanceRequest) -> bool {
    let Ok(contents) = std::fs::read_to_string(port_file) else {
        return false;
    };
    let Ok(port) = contents.trim().parse::<u16>() else {
        return false;
    };
    let Ok(mut stream) = TcpStream::connect(("127.0.0.1", port)) else {
        return false;
    };
    let _ = stream.set_write_timeout(Some(FORWARD_TIMEOUT));
    let Ok(line) = serde_json::to_string(request) else {
        return false;
    };
    stream.write_all(line.as_bytes()).is_ok() && stream.write_all(b"\n").is_ok()
}

/// Become the primary: bind a loopback port, publish it, and decode
/// forwarded requests into the event channels from a background thread.
///
/// # Errors
///
/// Returns an error when the listener cannot bind or the port file cannot
/// be written; the caller runs standalone in that case.
pub fn spawn_listener(port_file: &Path, senders: EventSenders) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    let port = listener.local_addr()?.port();
    std::fs::write(port_file, format!("{port}\n"))?;

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => handle_connection(stream, &senders),
                Err(err) => debug!("instance connection failed: {err}"),
            }
        }
    });
    Ok(())
}

fn handle_connection(stream: TcpStream, senders: &EventSenders) {
    let _ = stream.set_read_timeout(Some(FORWARD_TIMEOUT));
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    if reader.read_line(&mut line).is_err() {
        return;
    }
    let Ok(request) = serde_json::from_str::<InstanceRequest>(&line) else {
        debug!("ignoring malformed instance request");
        return;
    };
    // Empty option sets are not broadcast; an update with nothing in it
    // would still cost the primary a reconcile pass.
    if !request.options.is_empty() {
        let _ = senders.options_updates.send(request.options);
    }
    if let Some(open) = &request.open {
        if let Some(target) = OpenTarget::from_request(open) {
            let _ = senders.open_requests.send(target);
        } else {
            debug!("ignoring forwarded open request with no usable target");
        }
    }
}

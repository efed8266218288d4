//! Serverless bus over Unix datagram sockets.
//!
//! Every agent binds its own socket inside a shared directory. Publishing
//! means sending one datagram to every other socket file found there. There
//! is no broker: an agent that is not running has no socket and simply misses
//! the message, and will read the store on its next start instead.

use crate::bus::Bus;
use crate::error::{Result, SyncError};
use crate::message::Message;
use std::fs;
use std::io::{self, ErrorKind};
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::UnixDatagram;
use tracing::{debug, warn};
use uuid::Uuid;

const SOCKET_EXT: &str = "sock";
const MAX_DATAGRAM: usize = 64 * 1024;

struct Endpoint {
    socket: UnixDatagram,
    dir: PathBuf,
    path: PathBuf,
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Publishing half. Must be created inside a tokio runtime.
#[derive(Clone)]
pub struct SocketBus {
    endpoint: Arc<Endpoint>,
}

/// Receiving half, polled by the runtime loop.
pub struct SocketInbox {
    endpoint: Arc<Endpoint>,
    buf: Vec<u8>,
}

impl SocketBus {
    /// Joins the bus living in `dir`, creating the directory if needed.
    pub fn bind(dir: impl AsRef<Path>) -> io::Result<(SocketBus, SocketInbox)> {
        let dir = dir.as_ref().to_path_buf();
        fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(&dir)?;
        let path = dir.join(format!("{}.{SOCKET_EXT}", Uuid::new_v4()));
        let socket = UnixDatagram::bind(&path)?;
        debug!(path = %path.display(), "joined bus");

        let endpoint = Arc::new(Endpoint { socket, dir, path });
        Ok((
            SocketBus { endpoint: endpoint.clone() },
            SocketInbox {
                endpoint,
                buf: vec![0; MAX_DATAGRAM],
            },
        ))
    }

    pub fn path(&self) -> &Path {
        &self.endpoint.path
    }

    fn peers(&self) -> io::Result<Vec<PathBuf>> {
        let mut peers = Vec::new();
        for entry in fs::read_dir(&self.endpoint.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(SOCKET_EXT)
                && path != self.endpoint.path
            {
                peers.push(path);
            }
        }
        Ok(peers)
    }
}

impl Bus for SocketBus {
    fn publish(&self, message: &Message) -> Result<()> {
        let payload = message.encode()?;
        let peers = self
            .peers()
            .map_err(|e| SyncError::BusUnavailable(e.to_string()))?;

        for peer in peers {
            match self.endpoint.socket.try_send_to(&payload, &peer) {
                Ok(_) => {}
                // Left behind by an agent that crashed.
                Err(e) if e.kind() == ErrorKind::ConnectionRefused => {
                    debug!(peer = %peer.display(), "pruning dead bus socket");
                    let _ = fs::remove_file(&peer);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(peer = %peer.display(), "bus delivery dropped: {}", e),
            }
        }
        Ok(())
    }
}

impl SocketInbox {
    /// Waits for the next payload from another agent.
    pub async fn recv(&mut self) -> io::Result<Vec<u8>> {
        let n = self.endpoint.socket.recv(&mut self.buf).await?;
        Ok(self.buf[..n].to_vec())
    }
}

//! WebSocket server for browser live reload.
//!
//! Browsers connect to this port from a small client snippet; after the
//! supervised server restarts (and the debounce window passes), every
//! connected client receives a `reload` text frame.

use std::net::{TcpListener, TcpStream};
use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use tungstenite::{Message, WebSocket, accept};

use crate::core::is_shutdown;
use crate::{debug, log};

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

/// Broadcast-only reload channel.
#[derive(Clone)]
pub struct ReloadServer {
    clients: Arc<Mutex<Vec<WebSocket<TcpStream>>>>,
}

impl ReloadServer {
    /// Bind (with port retry) and start the acceptor thread.
    ///
    /// Returns the server handle and the actual port bound.
    pub fn start(base_port: u16) -> Result<(Self, u16)> {
        let (listener, actual_port) = try_bind_port(base_port, MAX_PORT_RETRIES)?;
        listener.set_nonblocking(true)?;

        let server = Self {
            clients: Arc::new(Mutex::new(Vec::new())),
        };

        let clients = Arc::clone(&server.clients);
        std::thread::spawn(move || {
            loop {
                if is_shutdown() {
                    break;
                }
                match listener.accept() {
                    Ok((stream, addr)) => {
                        debug!("reload"; "client connected: {}", addr);
                        // Handshake wants blocking IO
                        let _ = stream.set_nonblocking(false);
                        match accept(stream) {
                            Ok(ws) => clients.lock().push(ws),
                            Err(e) => debug!("reload"; "handshake failed: {}", e),
                        }
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        std::thread::sleep(std::time::Duration::from_millis(100));
                    }
                    Err(e) => {
                        log!("reload"; "accept error: {}", e);
                        std::thread::sleep(std::time::Duration::from_millis(100));
                    }
                }
            }
        });

        Ok((server, actual_port))
    }

    /// Number of currently connected clients.
    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Send `reload` to every connected client, dropping dead connections.
    pub fn broadcast_reload(&self) {
        let mut clients = self.clients.lock();
        let before = clients.len();
        clients.retain_mut(|ws| ws.send(Message::Text("reload".into())).is_ok());

        if before > 0 {
            debug!("reload"; "notified {} client(s)", clients.len());
        }
    }
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(base_port: u16, max_retries: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(format!("127.0.0.1:{}", port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                return Ok((listener, actual_port));
            }
            Err(e) => {
                last_error = Some(e);
                continue;
            }
        }
    }

    Err(anyhow::anyhow!(
        "Failed to bind reload server after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_bind_ephemeral_port() {
        let (_listener, port) = try_bind_port(0, 1).unwrap();
        assert_ne!(port, 0);
    }

    #[test]
    fn test_broadcast_reaches_client() {
        let (server, port) = ReloadServer::start(0).unwrap();

        let (mut client, _) =
            tungstenite::connect(format!("ws://127.0.0.1:{port}")).unwrap();

        // Wait for the acceptor thread to register the connection
        let deadline = Instant::now() + Duration::from_secs(5);
        while server.client_count() == 0 {
            assert!(Instant::now() < deadline, "client never registered");
            std::thread::sleep(Duration::from_millis(20));
        }

        server.broadcast_reload();

        let message = client.read().unwrap();
        assert_eq!(message, Message::Text("reload".into()));
    }

    #[test]
    fn test_dead_clients_dropped() {
        let (server, port) = ReloadServer::start(0).unwrap();

        let (client, _) = tungstenite::connect(format!("ws://127.0.0.1:{port}")).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while server.client_count() == 0 {
            assert!(Instant::now() < deadline, "client never registered");
            std::thread::sleep(Duration::from_millis(20));
        }

        drop(client);
        std::thread::sleep(Duration::from_millis(50));

        // First broadcast may still look writable; the second must not
        server.broadcast_reload();
        server.broadcast_reload();
        assert_eq!(server.client_count(), 0);
    }
}

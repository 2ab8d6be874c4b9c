//! UDP transport.
//!
//! Owns one broadcast-capable socket. Inbound datagrams are handed to a
//! receive callback from a single background task; outbound datagrams go to
//! the configured gateway address. Sends are fire-and-forget.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use buspro_core::config::BusConfig;

use crate::error::TransportError;

/// Receives every datagram as `(bytes, sender)`.
pub type ReceiveCallback = Arc<dyn Fn(&[u8], SocketAddr) + Send + Sync>;

/// UDP transport bound for broadcast.
pub struct UdpTransport {
    listen_addr: SocketAddr,
    gateway_addr: SocketAddr,
    recv_buffer_size: usize,
    running: Arc<AtomicBool>,
    socket: Option<Arc<UdpSocket>>,
    shutdown: Option<watch::Sender<bool>>,
    rx_task: Option<JoinHandle<()>>,
}

impl UdpTransport {
    pub fn new(listen_addr: SocketAddr, gateway_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            gateway_addr,
            recv_buffer_size: buspro_core::config::defaults::RECV_BUFFER_SIZE,
            running: Arc::new(AtomicBool::new(false)),
            socket: None,
            shutdown: None,
            rx_task: None,
        }
    }

    /// Build from bus configuration, resolving both endpoints.
    pub fn from_config(config: &BusConfig) -> Result<Self, TransportError> {
        let listen_addr = config
            .listen_addr()
            .map_err(|e| TransportError::Resolve(e.to_string()))?;
        let gateway_addr = config
            .gateway_addr()
            .map_err(|e| TransportError::Resolve(e.to_string()))?;
        Ok(Self::new(listen_addr, gateway_addr).with_recv_buffer_size(config.recv_buffer_size))
    }

    pub fn with_recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = size;
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn gateway_addr(&self) -> SocketAddr {
        self.gateway_addr
    }

    /// Actual bound address; differs from the configured one when port 0 was
    /// requested.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Bind the socket and start the receive loop.
    ///
    /// Bind failure is returned to the caller. Starting a running transport
    /// is a no-op.
    pub async fn start(&mut self, callback: ReceiveCallback) -> Result<(), TransportError> {
        if self.is_running() {
            return Ok(());
        }

        let std_socket = bind_broadcast(self.listen_addr).map_err(|source| TransportError::Bind {
            addr: self.listen_addr,
            source,
        })?;
        let socket = Arc::new(UdpSocket::from_std(std_socket)?);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            category = "transport",
            listen = %self.listen_addr,
            local = ?socket.local_addr().ok(),
            gateway = %self.gateway_addr,
            "UDP transport started"
        );

        let rx_task = tokio::spawn(rx_loop(
            socket.clone(),
            callback,
            shutdown_rx,
            self.recv_buffer_size,
        ));

        self.socket = Some(socket);
        self.shutdown = Some(shutdown_tx);
        self.rx_task = Some(rx_task);
        self.running.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Write one datagram to the gateway.
    ///
    /// Returns `false` when the transport is stopped or the socket rejected
    /// the write; neither case raises.
    pub async fn send(&self, bytes: &[u8]) -> bool {
        let socket = match (&self.socket, self.is_running()) {
            (Some(socket), true) => socket,
            _ => {
                warn!(
                    category = "transport",
                    len = bytes.len(),
                    "Send while transport is stopped, dropping datagram"
                );
                return false;
            }
        };

        match socket.send_to(bytes, self.gateway_addr).await {
            Ok(n) => {
                trace!(category = "transport", len = n, to = %self.gateway_addr, "Datagram sent");
                true
            }
            Err(e) => {
                warn!(
                    category = "transport",
                    to = %self.gateway_addr,
                    error = %e,
                    "Send failed"
                );
                false
            }
        }
    }

    /// Stop the receive loop and close the socket.
    pub async fn stop(&mut self) {
        if !self.running.swap(false, Ordering::Relaxed) {
            return;
        }

        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(task) = self.rx_task.take() {
            if let Err(e) = task.await {
                warn!(category = "transport", error = %e, "Receive task ended abnormally");
            }
        }
        self.socket = None;

        info!(category = "transport", "UDP transport stopped");
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        if let Some(task) = self.rx_task.take() {
            task.abort();
        }
    }
}

fn bind_broadcast(addr: SocketAddr) -> std::io::Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_broadcast(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    Ok(socket.into())
}

async fn rx_loop(
    socket: Arc<UdpSocket>,
    callback: ReceiveCallback,
    mut shutdown: watch::Receiver<bool>,
    buffer_size: usize,
) {
    let mut buf = vec![0u8; buffer_size];

    loop {
        let res = tokio::select! {
            res = socket.recv_from(&mut buf) => res,
            _ = shutdown.changed() => break,
        };

        match res {
            Ok((0, peer)) => {
                trace!(category = "transport", peer = %peer, "Empty datagram ignored");
            }
            Ok((n, peer)) => {
                trace!(category = "transport", len = n, peer = %peer, "Datagram received");
                callback(&buf[..n], peer);
            }
            Err(e) => {
                warn!(category = "transport", error = %e, "Receive error, continuing");
            }
        }
    }

    debug!(category = "transport", "Receive loop finished");
}

//! The gateway's UDP socket and event loop.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::{Duration, SystemTime};

use log::{debug, info, warn};

use crate::errors::Error;
use crate::gateway::Gateway;
use crate::runtime::{self, AsyncUdpSocket, Instant, UdpSocket};

type Result<T> = std::result::Result<T, Error>;

/// Period of the reconciliation tick.
pub const TICK: Duration = Duration::from_secs(1);

/// The single socket used to send commands and receive device reports.
pub struct Transport {
    socket: UdpSocket,
}

impl Transport {
    const BUFFER_SIZE: usize = 1024;

    /// Bind the listen port with broadcast enabled.
    ///
    /// The gateway cannot work without its socket: callers are expected to
    /// treat an error here as fatal.
    pub async fn bind(port: u16) -> Result<Self> {
        let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| Error::socket("bind", e))?;

        socket
            .set_broadcast(true)
            .map_err(|e| Error::socket("set_broadcast", e))?;

        info!("UDP port {port} is now open");
        Ok(Transport { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|e| Error::socket("local_addr", e))
    }

    /// Send everything the gateway queued. Failures are logged and dropped.
    pub async fn flush(&self, gateway: &mut Gateway) {
        for datagram in gateway.drain_outbox() {
            debug!("sending packet to {}: {}", datagram.to, datagram.text());
            if let Err(e) = self.socket.send_to(&datagram.payload, datagram.to).await {
                warn!("{}", Error::socket("send_to", e));
            }
        }
    }

    /// Serve the gateway forever.
    ///
    /// `on_tick` runs after every reconciliation tick, e.g. to persist the
    /// device list when auto-discovery changed it.
    pub async fn run<F>(&self, gateway: &mut Gateway, mut on_tick: F)
    where
        F: FnMut(&mut Gateway),
    {
        let mut buffer = [0u8; Self::BUFFER_SIZE];
        let mut last_tick: Option<Instant> = None;

        loop {
            let wait = last_tick.map_or(Duration::ZERO, |t| TICK.saturating_sub(t.elapsed()));
            if wait.is_zero() {
                last_tick = Some(Instant::now());
                gateway.periodic(SystemTime::now());
                on_tick(gateway);
                self.flush(gateway).await;
                continue;
            }

            match runtime::timeout(wait, self.socket.recv_from(&mut buffer)).await {
                Ok(Ok((size, from))) => {
                    gateway.receive(&buffer[..size], from, SystemTime::now());
                    self.flush(gateway).await;
                }
                Ok(Err(e)) => warn!("{}", Error::socket("recv_from", e)),
                // Tick is due.
                Err(_) => {}
            }
        }
    }
}

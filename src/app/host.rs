//! Host address helpers.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tokio::net::UdpSocket;
use tracing::debug;

/// Local IP used for outbound traffic, or `None` when there is no route.
///
/// Connecting a UDP socket sends nothing; it only selects the route.
pub async fn outbound_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await.ok()?;
    if let Err(err) = socket.connect(("8.8.8.8", 80)).await {
        debug!(error = %err, "no outbound route");
        return None;
    }
    socket.local_addr().ok().map(|addr| addr.ip())
}

/// Replaces an unspecified listener IP (`0.0.0.0`, `::`) with a reachable one.
pub(crate) async fn advertised(addr: SocketAddr) -> SocketAddr {
    if !addr.ip().is_unspecified() {
        return addr;
    }
    let ip = outbound_ip()
        .await
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
    SocketAddr::new(ip, addr.port())
}

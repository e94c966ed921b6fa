//! Link over turmoil's simulated TCP.

use std::time::Duration;

use latchkey_core::link::StreamLink;
use turmoil::net::{TcpListener, TcpStream};

/// Port the Control host listens on.
pub const LINK_PORT: u16 = 7600;

/// Byte link between the two simulated hosts.
pub type SimLink = StreamLink<TcpStream>;

/// Delay between connection attempts while the peer is not listening yet.
const CONNECT_RETRY: Duration = Duration::from_millis(10);

/// Connection attempts before giving up.
const CONNECT_ATTEMPTS: u32 = 500;

/// Accept exactly one peer on [`LINK_PORT`].
pub async fn accept_link() -> std::io::Result<SimLink> {
    let addr = format!("0.0.0.0:{LINK_PORT}");
    let listener = TcpListener::bind(addr.as_str()).await?;
    let (stream, peer) = listener.accept().await?;
    tracing::debug!(%peer, "link accepted");
    Ok(StreamLink::new(stream))
}

/// Connect to `host` on [`LINK_PORT`], retrying until it listens.
pub async fn connect_link(host: &str) -> std::io::Result<SimLink> {
    let addr = format!("{host}:{LINK_PORT}");
    let mut attempt = 0;
    loop {
        match TcpStream::connect(addr.as_str()).await {
            Ok(stream) => return Ok(StreamLink::new(stream)),
            Err(err) if attempt + 1 < CONNECT_ATTEMPTS => {
                attempt += 1;
                tracing::trace!(%err, attempt, "link connect retry");
                tokio::time::sleep(CONNECT_RETRY).await;
            },
            Err(err) => return Err(err),
        }
    }
}

//! Point-to-point byte link between the two nodes.

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Errors from the link transport.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Peer hung up.
    #[error("link closed by peer")]
    Closed,

    /// Transport failure.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LinkError {
    /// True when the peer simply went away.
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Reliable, ordered, blocking byte exchange.
///
/// There is no timeout: a node waiting on the link waits until the peer sends.
#[async_trait]
pub trait Link: Send {
    /// Send one byte.
    async fn send_byte(&mut self, byte: u8) -> Result<(), LinkError>;

    /// Receive one byte.
    async fn recv_byte(&mut self) -> Result<u8, LinkError>;

    /// Send bytes in order.
    async fn send_all(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        for byte in bytes {
            self.send_byte(*byte).await?;
        }
        Ok(())
    }
}

/// Byte link over any tokio stream (TCP, turmoil TCP, in-memory duplex).
#[derive(Debug)]
pub struct StreamLink<S> {
    stream: S,
}

impl<S> StreamLink<S> {
    /// Wrap a connected stream.
    pub const fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Unwrap the stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

#[async_trait]
impl<S> Link for StreamLink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send_byte(&mut self, byte: u8) -> Result<(), LinkError> {
        self.stream.write_all(&[byte]).await?;
        self.stream.flush().await?;
        tracing::trace!(byte = format_args!("{byte:#04x}"), "link tx");
        Ok(())
    }

    async fn recv_byte(&mut self) -> Result<u8, LinkError> {
        let byte = self.stream.read_u8().await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                LinkError::Closed
            } else {
                LinkError::Io(err)
            }
        })?;
        tracing::trace!(byte = format_args!("{byte:#04x}"), "link rx");
        Ok(byte)
    }

    async fn send_all(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        tracing::trace!(len = bytes.len(), "link tx burst");
        Ok(())
    }
}

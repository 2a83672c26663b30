//! TCP connection setup and frame I/O.

use std::io::ErrorKind;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{ClientError, Result};
use crate::protocol::{FrameHeader, Message, HEADER_SIZE};

/// Connect to the first address that accepts within `timeout`.
///
/// Returns the stream and the address it is connected to.
pub(crate) async fn connect(addresses: &[String], timeout: Duration) -> Result<(TcpStream, String)> {
    let mut last_error = ClientError::Transport("no addresses provided".into());
    for addr in addresses {
        match tokio::time::timeout(timeout, TcpStream::connect(addr.as_str())).await {
            Ok(Ok(stream)) => {
                stream.set_nodelay(true).map_err(|e| {
                    ClientError::Transport(format!("failed to set nodelay: {}", e))
                })?;
                return Ok((stream, addr.clone()));
            }
            Ok(Err(e)) => {
                tracing::debug!(%addr, error = %e, "connect failed");
                last_error = ClientError::Transport(format!("failed to connect to {}: {}", addr, e));
            }
            Err(_) => {
                tracing::debug!(%addr, "connect timed out");
                last_error = ClientError::Transport(format!("timed out connecting to {}", addr));
            }
        }
    }
    Err(last_error)
}

/// Write one frame as a single contiguous buffer.
pub(crate) async fn write_frame<W>(writer: &mut W, message: &Message) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(&message.encode())
        .await
        .map_err(|e| ClientError::Transport(format!("write failed: {}", e)))?;
    writer
        .flush()
        .await
        .map_err(|e| ClientError::Transport(format!("write failed: {}", e)))
}

/// Read one frame: the fixed header first, then exactly the payload it
/// announces. Short reads are retried until the frame is complete.
pub(crate) async fn read_frame<R>(reader: &mut R) -> Result<Message>
where
    R: AsyncRead + Unpin,
{
    let mut header_bytes = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header_bytes).await.map_err(read_error)?;
    let header = FrameHeader::decode(&header_bytes)?;

    let mut body = vec![0u8; header.body_len()];
    reader.read_exact(&mut body).await.map_err(read_error)?;

    Ok(Message::new(header, body))
}

fn read_error(e: std::io::Error) -> ClientError {
    match e.kind() {
        ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
            ClientError::Transport("connection closed".into())
        }
        _ => ClientError::Transport(format!("read failed: {}", e)),
    }
}

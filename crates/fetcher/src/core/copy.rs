//! Byte relay that stops at the next chunk boundary once cancellation fires

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use super::progress::ProgressSink;

/// Why a copy stopped early
#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    #[error("copy cancelled after {written} bytes")]
    Cancelled { written: u64 },
    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),
    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),
}

/// Copy `reader` into `writer`, checking `token` before every read.
///
/// Reads happen in chunks of at most `buffer_size` bytes and each chunk is
/// written before the next check, so a cancel takes effect within one chunk.
/// A read still waiting on the source when the token fires is abandoned.
/// Returns the number of bytes written.
pub async fn cancellable_copy<R, W>(
    token: &CancellationToken,
    reader: &mut R,
    writer: &mut W,
    buffer_size: usize,
    sink: &dyn ProgressSink,
) -> Result<u64, CopyError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut written: u64 = 0;

    loop {
        let read = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(CopyError::Cancelled { written }),
            read = reader.read(&mut buf) => read.map_err(CopyError::Read)?,
        };

        if read == 0 {
            break;
        }

        writer.write_all(&buf[..read]).await.map_err(CopyError::Write)?;
        written += read as u64;
        sink.on_bytes_transferred(read as u64);
    }

    writer.flush().await.map_err(CopyError::Write)?;
    Ok(written)
}

// Serial sensor board reader - Splits `tapN:<flow>` readings off the port
//
// The board terminates each reading with `LF CR`. Frames are split on LF and
// trimmed, which also absorbs the trailing CR and plain CRLF or LF endings.
use bytes::BytesMut;
use futures::{Stream, StreamExt};
use std::io;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, SerialStream, StopBits};

const READ_BUFFER_SIZE: usize = 256;
/// Longest frame kept while waiting for a delimiter
const MAX_FRAME_LEN: usize = 1024;

/// Open the board's port as 8N1 at `baud_rate`
pub fn open(path: &Path, baud_rate: u32) -> tokio_serial::Result<SerialStream> {
    tokio_serial::new(path.to_string_lossy(), baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .open_native_async()
}

/// Split a byte stream into non-empty text lines
pub fn sensor_lines<R>(mut reader: R) -> impl Stream<Item = io::Result<String>>
where
    R: AsyncRead + Unpin,
{
    async_stream::try_stream! {
        let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);
        loop {
            while let Some(line) = next_line(&mut buf) {
                yield line;
            }
            if buf.len() > MAX_FRAME_LEN {
                tracing::warn!("Discarding {} bytes without a line delimiter", buf.len());
                buf.clear();
            }

            if reader.read_buf(&mut buf).await? == 0 {
                let rest = String::from_utf8_lossy(&buf).trim().to_string();
                if !rest.is_empty() {
                    yield rest;
                }
                break;
            }
        }
    }
}

fn next_line(buf: &mut BytesMut) -> Option<String> {
    while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
        let frame = buf.split_to(pos + 1);
        let line = String::from_utf8_lossy(&frame).trim().to_string();
        if !line.is_empty() {
            return Some(line);
        }
    }
    None
}

/// Forward every line from `reader` until it ends, fails, or ingestion
/// hangs up.
pub async fn forward_lines<R>(reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let lines = sensor_lines(reader);
    tokio::pin!(lines);

    while let Some(item) = lines.next().await {
        match item {
            Ok(line) => {
                tracing::trace!("Serial line: {}", line);
                if tx.send(line).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                tracing::error!("Serial read failed: {}", e);
                return;
            }
        }
    }
    tracing::warn!("Serial stream ended");
}

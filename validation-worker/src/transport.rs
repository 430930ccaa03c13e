//! JSON-lines transport
//!
//! One request per input line, one response per output line.

use crate::actor::WorkerHandle;
use crate::message::{WorkerRequest, WorkerResponse};
use crate::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

/// Serve requests from `reader` until end of input
///
/// Lines that are not valid requests get an `error` response and the loop
/// keeps going.
pub async fn serve_lines<R, W>(reader: R, mut writer: W, handle: &WorkerHandle) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut served = 0usize;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let request = match serde_json::from_str::<WorkerRequest>(line) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Rejected malformed request");
                write_response(&mut writer, &WorkerResponse::error(format!("Invalid request: {}", e)))
                    .await?;
                continue;
            }
        };

        let mut responses = handle.submit(request).await?;
        while let Some(response) = responses.recv().await {
            write_response(&mut writer, &response).await?;
        }
        served += 1;
    }

    info!(served, "Input closed");
    Ok(())
}

async fn write_response<W>(writer: &mut W, response: &WorkerResponse) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(response)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}

//! Per-connection NDJSON handling.
//!
//! The shim writes one JSON event per line and reads one [`Ack`] line back for
//! each. A connection may stay open for the life of the shim.

use std::sync::Arc;

use callerid_protocol::{parse_event_line, Ack, ErrorInfo, MAX_EVENT_BYTES};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::bridge::EventBridge;

pub async fn serve_connection<S>(stream: S, bridge: Arc<EventBridge>)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);

    loop {
        let mut line = Vec::new();
        let read = (&mut reader)
            .take(MAX_EVENT_BYTES as u64 + 1)
            .read_until(b'\n', &mut line)
            .await;

        match read {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "Failed to read from shim connection");
                break;
            }
        }

        let terminated = line.last() == Some(&b'\n');
        if !terminated && line.len() > MAX_EVENT_BYTES {
            let ack = Ack::error(ErrorInfo::new(
                "event_too_large",
                format!("event exceeds {} bytes", MAX_EVENT_BYTES),
            ));
            let _ = write_ack(&mut writer, &ack).await;
            tracing::warn!("Oversized event line; closing connection");
            break;
        }

        let body = trim_whitespace(&line);
        if body.is_empty() {
            continue;
        }

        let ack = match parse_event_line(body) {
            Ok(event) => match bridge.forward(event).await {
                Ok(()) => Ack::ok(),
                Err(info) => Ack::error(info),
            },
            Err(info) => {
                tracing::warn!(code = %info.code, message = %info.message, "Rejected event line");
                Ack::error(info)
            }
        };

        if let Err(err) = write_ack(&mut writer, &ack).await {
            tracing::warn!(error = %err, "Failed to write ack");
            break;
        }

        if !terminated {
            break;
        }
    }
}

fn trim_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |index| index + 1);
    &bytes[start..end]
}

async fn write_ack<W>(writer: &mut W, ack: &Ack) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut payload = serde_json::to_vec(ack).map_err(std::io::Error::other)?;
    payload.push(b'\n');
    writer.write_all(&payload).await?;
    writer.flush().await
}

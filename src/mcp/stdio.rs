// MCP stdio Transport
//
// Reads JSON-RPC requests from stdin and writes responses to stdout. Accepts
// both newline-delimited JSON and `Content-Length` framed messages; once the
// client frames a message, every later response is framed too.

use super::dispatch::Dispatcher;
use super::protocol::{JsonRpcError, JsonRpcResponse};
use super::server::{handle_request, parse_request};
use anyhow::Context;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

/// Largest `Content-Length` body accepted; larger frames are discarded
pub const MAX_FRAME_BYTES: u64 = 16 * 1024 * 1024;

/// Serve MCP over the process's stdin and stdout until stdin closes
pub async fn run_stdio(dispatcher: &Dispatcher) -> anyhow::Result<()> {
    info!("MCP stdio server starting; reading JSON-RPC from stdin");
    serve(dispatcher, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}

/// Serve MCP over an arbitrary reader and writer
pub async fn serve<R, W>(dispatcher: &Dispatcher, mut reader: R, mut writer: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut use_content_length = false;

    loop {
        let mut line = String::new();
        let bytes = reader
            .read_line(&mut line)
            .await
            .context("Failed to read stdin")?;
        if bytes == 0 {
            debug!("stdin closed");
            break;
        }

        let line_trim = line.trim_end();
        if line_trim.is_empty() {
            continue;
        }

        let payload = match content_length(line_trim) {
            Some(Ok(length)) if length > MAX_FRAME_BYTES => {
                skip_headers(&mut reader).await?;
                use_content_length = true;
                warn!("Discarding {} byte frame (limit {})", length, MAX_FRAME_BYTES);
                tokio::io::copy(&mut (&mut reader).take(length), &mut tokio::io::sink())
                    .await
                    .context("Failed to discard oversized payload")?;
                let error = JsonRpcError::invalid_request(format!(
                    "message of {} bytes exceeds the {} byte limit",
                    length, MAX_FRAME_BYTES
                ));
                write_response(&mut writer, &JsonRpcResponse::error(Value::Null, error), true).await?;
                continue;
            }
            Some(Ok(length)) => {
                skip_headers(&mut reader).await?;
                let mut buf = vec![0u8; length as usize];
                reader
                    .read_exact(&mut buf)
                    .await
                    .context("Failed to read JSON payload")?;
                use_content_length = true;
                buf
            }
            Some(Err(e)) => {
                warn!("Invalid Content-Length header: {}", e);
                continue;
            }
            None => line_trim.as_bytes().to_vec(),
        };

        let response = match parse_request(&payload) {
            Ok(request) => handle_request(dispatcher, request).await,
            Err(error_response) => Some(error_response),
        };

        if let Some(response) = response {
            write_response(&mut writer, &response, use_content_length).await?;
        }
    }

    Ok(())
}

fn content_length(line: &str) -> Option<Result<u64, std::num::ParseIntError>> {
    let (name, value) = line.split_once(':')?;
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return None;
    }
    Some(value.trim().parse())
}

/// Consume remaining header lines up to the blank separator
async fn skip_headers<R: AsyncBufRead + Unpin>(reader: &mut R) -> anyhow::Result<()> {
    loop {
        let mut header = String::new();
        let bytes = reader
            .read_line(&mut header)
            .await
            .context("Failed to read message headers")?;
        if bytes == 0 || header.trim().is_empty() {
            return Ok(());
        }
    }
}

async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &JsonRpcResponse,
    framed: bool,
) -> anyhow::Result<()> {
    let body = serde_json::to_string(response).context("Failed to serialize response")?;
    let message = if framed {
        format!("Content-Length: {}\r\n\r\n{}", body.len(), body)
    } else {
        format!("{}\n", body)
    };

    writer
        .write_all(message.as_bytes())
        .await
        .context("Failed to write to stdout")?;
    writer.flush().await.context("Failed to flush stdout")?;
    Ok(())
}

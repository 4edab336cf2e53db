use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::fs;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::protocol::{DaemonRequest, DaemonResponse, ErrorCode};
use crate::service::OverrideService;

pub struct OverrideServer {
    config: ServerConfig,
    service: Arc<OverrideService>,
}

impl OverrideServer {
    pub fn new(config: ServerConfig, service: OverrideService) -> Self {
        Self {
            config,
            service: Arc::new(service),
        }
    }

    pub async fn run(&self) -> Result<()> {
        self.prepare_socket_path().await?;
        if self.config.socket_path.exists() {
            fs::remove_file(&self.config.socket_path)
                .await
                .with_context(|| {
                    format!(
                        "failed to cleanup stale socket {}",
                        self.config.socket_path.display()
                    )
                })?;
        }

        let listener = UnixListener::bind(&self.config.socket_path).with_context(|| {
            format!(
                "failed to bind unix socket at {}",
                self.config.socket_path.display()
            )
        })?;
        info!(
            "override daemon listening on {}",
            self.config.socket_path.display()
        );

        loop {
            let (stream, _) = listener.accept().await?;
            let service = self.service.clone();
            let max_line_bytes = self.config.max_line_bytes;
            tokio::spawn(async move {
                if let Err(error) = handle_connection(stream, service, max_line_bytes).await {
                    warn!("connection closed with error: {error:#}");
                }
            });
        }
    }

    async fn prepare_socket_path(&self) -> Result<()> {
        if let Some(parent) = Path::new(&self.config.socket_path).parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("failed to create socket directory {}", parent.display())
            })?;
        }
        Ok(())
    }
}

async fn handle_connection(
    stream: UnixStream,
    service: Arc<OverrideService>,
    max_line_bytes: usize,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    loop {
        let response = match read_frame(&mut reader, max_line_bytes).await? {
            Frame::Eof => break,
            Frame::Oversized(len) => {
                warn!(len, max_line_bytes, "request line too long");
                DaemonResponse::error(
                    String::new(),
                    ErrorCode::InvalidRequest,
                    format!("request exceeds {max_line_bytes} bytes"),
                )
            }
            Frame::Line(bytes) => match std::str::from_utf8(&bytes) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => process_line(line, &service),
                Err(error) => {
                    warn!("request is not UTF-8: {error}");
                    DaemonResponse::error(
                        String::new(),
                        ErrorCode::InvalidRequest,
                        format!("request is not valid UTF-8: {error}"),
                    )
                }
            },
        };
        let payload = serde_json::to_string(&response)?;
        writer.write_all(payload.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Frame {
    Line(Vec<u8>),
    /// 超长行：已丢弃到换行符为止，只保留长度
    Oversized(usize),
    Eof,
}

/// Reads one `\n`-terminated line, buffering at most `max_line_bytes` of it.
/// Anything past the limit is consumed and dropped.
async fn read_frame<R>(reader: &mut R, max_line_bytes: usize) -> std::io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut seen = 0usize;

    loop {
        let chunk = reader.fill_buf().await?;
        if chunk.is_empty() {
            return Ok(match seen {
                0 => Frame::Eof,
                n if n > max_line_bytes => Frame::Oversized(n),
                _ => Frame::Line(trim_cr(buf)),
            });
        }

        let newline = chunk.iter().position(|b| *b == b'\n');
        let (body, consumed) = match newline {
            Some(i) => (&chunk[..i], i + 1),
            None => (chunk, chunk.len()),
        };
        seen += body.len();
        if seen <= max_line_bytes {
            buf.extend_from_slice(body);
        } else if !buf.is_empty() {
            buf = Vec::new();
        }
        reader.consume(consumed);

        if newline.is_some() {
            return Ok(if seen > max_line_bytes {
                Frame::Oversized(seen)
            } else {
                Frame::Line(trim_cr(buf))
            });
        }
    }
}

fn trim_cr(mut line: Vec<u8>) -> Vec<u8> {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    line
}

// 存储操作全是同步的内存操作，这里不 await
fn process_line(line: &str, service: &OverrideService) -> DaemonResponse {
    match serde_json::from_str::<DaemonRequest>(line) {
        Ok(request) => DaemonResponse {
            id: request.id,
            body: service.handle(request.body),
        },
        Err(error) => {
            error!("invalid request JSON: {error}");
            DaemonResponse::error(
                String::new(),
                ErrorCode::InvalidRequest,
                format!("invalid JSON payload: {error}"),
            )
        }
    }
}

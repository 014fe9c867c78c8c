use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::sink::{Sink, SinkError};
use crate::snapshot::Snapshot;

/// Appends one JSON document per snapshot to a file.
///
/// External chart renderers tail this file; each line is the same flat
/// document the store keeps. A line that failed mid-write is truncated away,
/// and a torn tail left by a crash is trimmed when the file is reopened.
pub struct JsonlSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlSink {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let trimmed = trim_torn_tail(&path).await?;
        if trimmed > 0 {
            warn!(path = %path.display(), bytes = trimmed, "dropped torn trailing jsonl line");
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        info!(path = %path.display(), "writing snapshots as jsonl");

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Sink for JsonlSink {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    async fn accept(&self, snapshot: Snapshot) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(&snapshot)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        let start = file.metadata().await?.len();

        if let Err(e) = write_line(&mut file, &line).await {
            if let Err(rollback) = file.set_len(start).await {
                warn!(error = %rollback, "failed to roll back partial jsonl line");
            }
            return Err(e.into());
        }

        Ok(())
    }
}

async fn write_line(file: &mut File, line: &[u8]) -> std::io::Result<()> {
    file.write_all(line).await?;
    file.flush().await
}

/// Cuts the file back to just after its last newline. Returns the number of
/// bytes removed.
async fn trim_torn_tail(path: &Path) -> std::io::Result<u64> {
    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)
        .await?;

    let len = file.metadata().await?.len();
    let mut buf = vec![0u8; 4096];
    let mut end = len;
    let mut keep = 0;

    while end > 0 {
        let start = end.saturating_sub(buf.len() as u64);
        let chunk = &mut buf[..(end - start) as usize];
        file.seek(SeekFrom::Start(start)).await?;
        file.read_exact(chunk).await?;

        if let Some(pos) = chunk.iter().rposition(|&b| b == b'\n') {
            keep = start + pos as u64 + 1;
            break;
        }
        end = start;
    }

    if keep < len {
        file.set_len(keep).await?;
    }

    Ok(len - keep)
}

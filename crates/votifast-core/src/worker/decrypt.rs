//! Decrypt worker: key from the catalog, external tool, interim cleanup.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::DecryptionError;
use crate::job::DecryptJob;
use crate::metadata::MediaCatalog;
use crate::queue::JobQueue;

use super::WorkerPool;

/// Turns an encrypted container into a playable file with a hex key.
#[async_trait]
pub trait DecryptTool: Send + Sync {
    async fn decrypt(&self, key_hex: &str, input: &Path, output: &Path)
        -> Result<(), DecryptionError>;
}

/// `ffmpeg -decryption_key <hex> -i <input> -c copy <output>`, no shell.
#[derive(Debug, Clone)]
pub struct FfmpegDecryptor {
    program: PathBuf,
}

impl Default for FfmpegDecryptor {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegDecryptor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl DecryptTool for FfmpegDecryptor {
    async fn decrypt(
        &self,
        key_hex: &str,
        input: &Path,
        output: &Path,
    ) -> Result<(), DecryptionError> {
        let out = Command::new(&self.program)
            .args(["-y", "-loglevel", "error", "-decryption_key", key_hex, "-i"])
            .arg(input)
            .args(["-c", "copy"])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| DecryptionError::Spawn(format!("{}: {}", self.program.display(), e)))?;

        if out.status.success() {
            return Ok(());
        }
        Err(DecryptionError::Tool {
            code: out.status.code(),
            stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
        })
    }
}

/// Runs decrypt jobs. The interim artifact is removed only after the tool
/// succeeded; any earlier failure leaves it for the next run to resume from.
#[derive(Clone)]
pub struct DecryptWorker {
    catalog: Arc<dyn MediaCatalog>,
    tool: Arc<dyn DecryptTool>,
}

impl DecryptWorker {
    pub fn new(catalog: Arc<dyn MediaCatalog>, tool: Arc<dyn DecryptTool>) -> Self {
        Self { catalog, tool }
    }

    pub fn spawn_pool(self, size: usize, queue: JobQueue<DecryptJob>) -> WorkerPool {
        WorkerPool::spawn("decrypt", size, queue, move |job| {
            let worker = self.clone();
            async move { worker.run(job).await }
        })
    }

    pub async fn run(&self, job: DecryptJob) {
        let DecryptJob {
            file_id,
            input,
            output,
            completer,
        } = job;
        tracing::debug!(file_id = %file_id, input = %input.display(), "decrypt started");

        let result = self.decrypt(&file_id, &input, &output).await;
        match &result {
            Ok(()) => tracing::debug!(output = %output.display(), "decrypt finished"),
            Err(e) => tracing::warn!(file_id = %file_id, "decrypt failed: {}", e),
        }
        completer.complete(result);
    }

    async fn decrypt(&self, file_id: &str, input: &Path, output: &Path) -> Result<(), DecryptionError> {
        let key = self.catalog.get_decryption_key(file_id).await?;
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DecryptionError::Output(format!("{}: {}", parent.display(), e)))?;
        }
        self.tool.decrypt(&key.key_hex(), input, output).await?;
        tokio::fs::remove_file(input)
            .await
            .map_err(|e| DecryptionError::Cleanup(format!("{}: {}", input.display(), e)))
    }
}

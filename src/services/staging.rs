use anyhow::{Context, Result};
use bytes::Bytes;
use std::path::Path;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::utils::validation::{MAX_FILENAME_LEN, sanitize_filename};

/// Random characters tempfile inserts between prefix and suffix
const RAND_LEN: usize = 6;

/// Bytes left for the client's name once `<uuid>_`, the random part and the
/// `_` separator are accounted for
const SANITIZED_NAME_BUDGET: usize = MAX_FILENAME_LEN - (36 + 1) - RAND_LEN - 1;

/// An upload written to the working directory for the duration of one
/// request. The file is removed when this value is dropped, whichever way
/// the request ends.
#[derive(Debug)]
pub struct StagedUpload {
    // Declared before `path` so the handle closes before the file is removed
    file: Option<tokio::fs::File>,
    path: TempPath,
    request_id: Uuid,
    bytes_written: u64,
}

impl StagedUpload {
    /// Create an empty, uniquely named file in `dir` for `original_name`
    pub fn create(dir: &Path, original_name: &str) -> Result<Self> {
        let request_id = Uuid::new_v4();
        let sanitized = sanitize_filename(original_name, SANITIZED_NAME_BUDGET);

        let named = tempfile::Builder::new()
            .prefix(&format!("{}_", request_id))
            .rand_bytes(RAND_LEN)
            .suffix(&format!("_{}", sanitized))
            .tempfile_in(dir)
            .with_context(|| format!("failed to create staging file in {}", dir.display()))?;

        let (file, path) = named.into_parts();

        Ok(Self {
            file: Some(tokio::fs::File::from_std(file)),
            path,
            request_id,
            bytes_written: 0,
        })
    }

    pub async fn write_chunk(&mut self, chunk: &Bytes) -> Result<()> {
        let file = self
            .file
            .as_mut()
            .context("staged upload is already finalized")?;
        file.write_all(chunk).await?;
        self.bytes_written += chunk.len() as u64;
        Ok(())
    }

    /// Flush and close the write handle so decoders see the full file
    pub async fn finish(&mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

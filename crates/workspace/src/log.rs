//! Append-only per-workspace event log
//!
//! Every notable event in a workspace's life (deposits, unpacks, removals,
//! repairs, refusals) is appended to `source.log` in the workspace
//! directory. The log is a system file: invisible to clients and excluded
//! from the source package. It outlives the workspace; destruction copies
//! it into the deleted-logs directory.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use chrono::Utc;
use md5::{Digest, Md5};
use sourcemill_core::Result;
use sourcemill_storage::{PathContext, StorageAdapter, SOURCE_LOG_NAME};
use std::io::Write;
use std::sync::Arc;

/// Timestamp format used for log lines.
const TIME_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Handle on a workspace's `source.log`.
#[derive(Debug, Clone)]
pub struct SourceLog {
    storage: Arc<dyn StorageAdapter>,
    upload_id: u64,
}

impl SourceLog {
    /// Bind to the log of `upload_id`, creating the file if absent.
    pub fn new(storage: Arc<dyn StorageAdapter>, upload_id: u64) -> Result<Self> {
        let log = SourceLog { storage, upload_id };
        if !log.storage.exists(upload_id, SOURCE_LOG_NAME, &log.ctx()) {
            log.storage.create(upload_id, SOURCE_LOG_NAME, &log.ctx())?;
        }
        Ok(log)
    }

    fn ctx(&self) -> PathContext {
        PathContext::system()
    }

    fn append(&self, level: &str, message: &str) -> Result<()> {
        let stamp = Utc::now().format(TIME_FORMAT);
        let mut f = self
            .storage
            .open_append(self.upload_id, SOURCE_LOG_NAME, &self.ctx())?;
        writeln!(f, "{} {}{}", stamp, level, message)?;
        Ok(())
    }

    /// Append an informational line.
    pub fn info(&self, message: &str) -> Result<()> {
        self.append("", message)
    }

    /// Append an error line.
    pub fn error(&self, message: &str) -> Result<()> {
        self.append("ERROR: ", message)
    }

    /// Size of the log file in bytes.
    pub fn size_bytes(&self) -> Result<u64> {
        self.storage
            .size_bytes(self.upload_id, SOURCE_LOG_NAME, &self.ctx())
    }

    /// When the log was last written.
    pub fn last_modified(&self) -> Result<chrono::DateTime<Utc>> {
        self.storage
            .last_modified(self.upload_id, SOURCE_LOG_NAME, &self.ctx())
    }

    /// URL-safe base64 MD5 of the log contents.
    pub fn checksum(&self) -> Result<String> {
        let bytes = self.read()?;
        let mut hasher = Md5::new();
        hasher.update(&bytes);
        Ok(URL_SAFE.encode(hasher.finalize()))
    }

    /// Full log contents.
    pub fn read(&self) -> Result<Vec<u8>> {
        self.storage
            .read_to_vec(self.upload_id, SOURCE_LOG_NAME, &self.ctx())
    }

    /// Absolute path of the log file.
    pub fn full_path(&self) -> Result<std::path::PathBuf> {
        self.storage
            .full_path(self.upload_id, SOURCE_LOG_NAME, &self.ctx())
    }
}

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use tasksync_logging::{sync_info, sync_warn};
use uuid::Uuid;

use crate::persist::{write_atomic, PersistError};

/// Scopes every task to the installation that created it.
pub const DEVICE_ID_HEADER: &str = "X-Device-ID";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reads the id stored at `path`, or creates and stores a fresh one.
    ///
    /// A file that is empty or holds something unusable as a header value
    /// is replaced.
    pub fn load_or_create(path: &Path) -> Result<Self, PersistError> {
        match fs::read_to_string(path) {
            Ok(raw) => {
                if let Some(existing) = Self::parse(&raw) {
                    return Ok(existing);
                }
                sync_warn!("device id at {} is unusable; generating a new one", path.display());
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(PersistError::Io(err)),
        }

        let fresh = Self::generate();
        write_atomic(path, fresh.0.as_bytes())?;
        sync_info!("created device id at {}", path.display());
        Ok(fresh)
    }

    /// Accepts any non-empty printable ASCII token of reasonable length.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let usable = !trimmed.is_empty()
            && trimmed.len() <= 128
            && trimmed.bytes().all(|b| b.is_ascii_graphic());
        usable.then(|| Self(trimmed.to_string()))
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

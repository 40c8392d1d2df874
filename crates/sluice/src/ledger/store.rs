//! On-disk persistence for the ledger.
//!
//! The store is a single versioned columnar binary: the serde model of a
//! [`Frame`] encoded with bincode. Writes go to a temp file that is fsynced
//! and renamed over the target, so a crashed save never leaves a partial
//! file visible to a subsequent load.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SluiceError};
use crate::frame::Frame;

/// Store format version - bump when the encoding changes.
const STORE_VERSION: u32 = 1;

#[derive(Serialize)]
struct StoredLedgerRef<'a> {
    version: u32,
    frame: &'a Frame,
}

#[derive(Deserialize)]
struct StoredLedger {
    version: u32,
    frame: Frame,
}

/// Read a persisted frame. `Ok(None)` when no file exists yet; a file that
/// exists but cannot be decoded is a [`SluiceError::CorruptStore`].
pub(crate) fn load_frame(path: &Path) -> Result<Option<Frame>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(path).map_err(|e| SluiceError::io(path, e))?;
    let stored: StoredLedger =
        bincode::deserialize(&bytes).map_err(|e| SluiceError::CorruptStore {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    if stored.version != STORE_VERSION {
        return Err(SluiceError::CorruptStore {
            path: path.to_path_buf(),
            message: format!(
                "store version mismatch: expected {}, got {}",
                STORE_VERSION, stored.version
            ),
        });
    }
    Ok(Some(stored.frame))
}

/// Persist a frame atomically (temp file + rename).
pub(crate) fn save_frame(path: &Path, frame: &Frame) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| SluiceError::io(parent, e))?;
        }
    }

    let encoded = bincode::serialize(&StoredLedgerRef {
        version: STORE_VERSION,
        frame,
    })
    .map_err(|e| SluiceError::CorruptStore {
        path: path.to_path_buf(),
        message: format!("failed to encode store: {}", e),
    })?;

    let tmp = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp).map_err(|e| SluiceError::io(&tmp, e))?;
        file.write_all(&encoded).map_err(|e| SluiceError::io(&tmp, e))?;
        file.sync_all().map_err(|e| SluiceError::io(&tmp, e))?;
    }
    fs::rename(&tmp, path).map_err(|e| SluiceError::io(path, e))?;

    Ok(())
}

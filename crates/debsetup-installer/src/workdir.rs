use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};

use crate::fs_utils::remove_dir_if_exists;

static WORKDIR_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Scratch directory for the downloaded archive.
///
/// Removed recursively on drop, so it is released on every exit path of the
/// scope that owns it, including early returns and unwinding panics.
#[derive(Debug)]
pub struct DownloadWorkdir {
    path: PathBuf,
}

impl DownloadWorkdir {
    pub fn create(parent: &Path) -> Result<Self> {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create temp root: {}", parent.display()))?;
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| anyhow!("system clock is before UNIX epoch"))?
            .as_nanos();
        let path = parent.join(workdir_name(std::process::id(), nanos, next_sequence()));
        fs::create_dir(&path)
            .with_context(|| format!("failed creating download dir: {}", path.display()))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for DownloadWorkdir {
    fn drop(&mut self) {
        let _ = remove_dir_if_exists(&self.path);
    }
}

pub(crate) fn workdir_name(pid: u32, nanos: u128, sequence: u64) -> String {
    format!("debsetup-{pid}-{nanos}-{sequence}")
}

fn next_sequence() -> u64 {
    WORKDIR_SEQUENCE.fetch_add(1, Ordering::Relaxed)
}

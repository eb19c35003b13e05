//! Copies new remote files into a local directory.

use anyhow::{Context, Result};
use parking_lot::RwLock;
use rotary_session::{Session, SessionFactory};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::filter::AcceptOnceFilter;
use crate::source::{RemoteDirectoryConfigurable, cap, remote_path};

/// A remote file copied into the local directory, with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynchronizedFile {
    pub local: PathBuf,
    pub remote_directory: String,
    pub remote_file: String,
}

pub struct InboundFileSynchronizer {
    session_factory: Arc<dyn SessionFactory>,
    remote_directory: RwLock<String>,
    filter: AcceptOnceFilter,
}

impl InboundFileSynchronizer {
    pub fn new(
        session_factory: Arc<dyn SessionFactory>,
        remote_directory: impl Into<String>,
    ) -> Self {
        Self {
            session_factory,
            remote_directory: RwLock::new(remote_directory.into()),
            filter: AcceptOnceFilter::new(),
        }
    }

    /// Copy up to `max` (0 = all) not-yet-seen remote files into `local_directory`.
    ///
    /// Returns the files written, in listing order. A file that fails to
    /// transfer is handed back to the filter and retried on the next call.
    /// Files are tracked per session scope, so the same path on another
    /// store is synchronized separately.
    pub fn synchronize_to_local_directory(
        &self,
        local_directory: &Path,
        max: usize,
    ) -> Result<Vec<SynchronizedFile>> {
        let remote_directory = self.remote_directory.read().clone();
        let scope = self.session_factory.scope();
        fs::create_dir_all(local_directory).with_context(|| {
            format!(
                "Failed to create local directory: {}",
                local_directory.display()
            )
        })?;

        let mut session = self
            .session_factory
            .session()
            .context("Failed to open remote session")?;
        let names = session
            .list(&remote_directory)
            .with_context(|| format!("Failed to list remote directory: {remote_directory}"))?;

        let accepted = self.filter.filter(
            scope.as_ref(),
            names
                .iter()
                .map(|name| remote_path(&remote_directory, name))
                .collect(),
        );
        let kept = cap(accepted.clone(), max);
        for dropped in &accepted[kept.len()..] {
            self.filter.rollback(scope.as_ref(), dropped);
        }

        let mut written = Vec::with_capacity(kept.len());
        for (i, path) in kept.iter().enumerate() {
            match self.copy_one(session.as_mut(), path, local_directory) {
                Ok(local) => written.push(SynchronizedFile {
                    local,
                    remote_directory: remote_directory.clone(),
                    remote_file: path.clone(),
                }),
                Err(e) => {
                    // Hand back this file and every one after it.
                    for pending in &kept[i..] {
                        self.filter.rollback(scope.as_ref(), pending);
                    }
                    return Err(e);
                }
            }
        }

        debug!(
            remote = %remote_directory,
            scope = ?scope,
            local = %local_directory.display(),
            copied = written.len(),
            "Synchronized remote directory"
        );
        Ok(written)
    }

    fn copy_one(
        &self,
        session: &mut dyn Session,
        remote: &str,
        local_directory: &Path,
    ) -> Result<PathBuf> {
        let contents = session
            .read(remote)
            .with_context(|| format!("Failed to read remote file: {remote}"))?;
        let name = remote.rsplit('/').next().unwrap_or(remote);
        let local = local_directory.join(name);
        fs::write(&local, contents)
            .with_context(|| format!("Failed to write local file: {}", local.display()))?;
        Ok(local)
    }
}

impl RemoteDirectoryConfigurable for InboundFileSynchronizer {
    fn set_remote_directory(&self, directory: &str) -> Result<()> {
        let mut current = self.remote_directory.write();
        if *current != directory {
            debug!(from = %*current, to = %directory, "Switching synchronizer remote directory");
            *current = directory.to_string();
        }
        Ok(())
    }

    fn remote_directory(&self) -> String {
        self.remote_directory.read().clone()
    }
}

//! Source that mirrors remote files locally and emits the local copies.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rotary_core::Message;
use rotary_session::SessionFactory;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::source::{
    FetchSizeLimited, LOCAL_FILE, MessageSource, REMOTE_DIRECTORY, REMOTE_FILE,
    RemoteDirectoryConfigurable,
};
use crate::synchronizer::{InboundFileSynchronizer, SynchronizedFile};

/// Emits one local file per `receive()`, synchronizing from the remote
/// directory whenever the local queue is empty.
///
/// Remote directory changes are delegated to the inner
/// [`InboundFileSynchronizer`]; files already copied locally are still
/// emitted after a switch, labelled with the directory they came from.
pub struct SynchronizingRemoteSource {
    synchronizer: InboundFileSynchronizer,
    local_directory: PathBuf,
    queue: Mutex<VecDeque<SynchronizedFile>>,
    max_fetch_size: AtomicUsize,
}

impl SynchronizingRemoteSource {
    pub fn new(
        session_factory: Arc<dyn SessionFactory>,
        remote_directory: impl Into<String>,
        local_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            synchronizer: InboundFileSynchronizer::new(session_factory, remote_directory),
            local_directory: local_directory.into(),
            queue: Mutex::new(VecDeque::new()),
            max_fetch_size: AtomicUsize::new(0),
        }
    }

    pub fn synchronizer(&self) -> &InboundFileSynchronizer {
        &self.synchronizer
    }

    pub fn local_directory(&self) -> &Path {
        &self.local_directory
    }
}

impl MessageSource for SynchronizingRemoteSource {
    fn receive(&self) -> Result<Option<Message>> {
        let mut queue = self.queue.lock();
        if queue.is_empty() {
            let copied = self
                .synchronizer
                .synchronize_to_local_directory(&self.local_directory, self.max_fetch_size())?;
            queue.extend(copied);
        }

        let Some(file) = queue.pop_front() else {
            return Ok(None);
        };
        let payload = fs::read(&file.local)
            .with_context(|| format!("Failed to read local file: {}", file.local.display()))?;

        Ok(Some(
            Message::new(payload)
                .with_header(REMOTE_DIRECTORY, file.remote_directory)
                .with_header(REMOTE_FILE, file.remote_file)
                .with_header(LOCAL_FILE, file.local.display().to_string()),
        ))
    }

    fn as_directory_configurable(&self) -> Option<&dyn RemoteDirectoryConfigurable> {
        Some(&self.synchronizer)
    }

    fn as_fetch_limited(&self) -> Option<&dyn FetchSizeLimited> {
        Some(self)
    }
}

impl FetchSizeLimited for SynchronizingRemoteSource {
    fn set_max_fetch_size(&self, max: usize) {
        self.max_fetch_size.store(max, Ordering::Release);
    }

    fn max_fetch_size(&self) -> usize {
        self.max_fetch_size.load(Ordering::Acquire)
    }
}

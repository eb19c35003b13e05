//! Source that streams remote files straight from the session, one per poll.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rotary_core::{Message, RoutingKey};
use rotary_session::{Session, SessionFactory};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use crate::filter::AcceptOnceFilter;
use crate::source::{
    FetchSizeLimited, MessageSource, REMOTE_DIRECTORY, REMOTE_FILE, RemoteDirectoryConfigurable,
    cap, remote_path,
};

struct StreamingState {
    directory: String,
    /// Session scope the pending paths were listed under.
    scope: Option<RoutingKey>,
    /// Remote paths listed but not yet emitted.
    pending: VecDeque<String>,
}

/// Lists the remote directory when its buffer runs dry and emits one
/// file per `receive()`, reading the content through a fresh session.
///
/// Sessions come from whatever factory the source was built with; with a
/// [`DelegatingSessionFactory`](rotary_session::DelegatingSessionFactory)
/// the server is chosen by the routing key bound to the polling thread.
/// Buffered paths are only read from the store they were listed on; a
/// change of session scope hands them back to the filter.
pub struct StreamingRemoteSource {
    session_factory: Arc<dyn SessionFactory>,
    state: Mutex<StreamingState>,
    max_fetch_size: AtomicUsize,
    filter: AcceptOnceFilter,
}

impl StreamingRemoteSource {
    pub fn new(session_factory: Arc<dyn SessionFactory>, directory: impl Into<String>) -> Self {
        Self {
            session_factory,
            state: Mutex::new(StreamingState {
                directory: directory.into(),
                scope: None,
                pending: VecDeque::new(),
            }),
            max_fetch_size: AtomicUsize::new(0),
            filter: AcceptOnceFilter::new(),
        }
    }

    pub fn with_max_fetch_size(self, max: usize) -> Self {
        self.max_fetch_size.store(max, Ordering::Release);
        self
    }

    /// Number of listed files still waiting to be emitted.
    pub fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Drop buffered paths, making them eligible for a later listing.
    fn release_pending(&self, state: &mut StreamingState) {
        for path in state.pending.drain(..) {
            self.filter.rollback(state.scope.as_ref(), &path);
        }
    }

    fn fill(&self, state: &mut StreamingState) -> Result<Box<dyn Session>> {
        let mut session = self
            .session_factory
            .session()
            .context("Failed to open remote session")?;
        let names = session
            .list(&state.directory)
            .with_context(|| format!("Failed to list remote directory: {}", state.directory))?;

        let paths = names
            .iter()
            .map(|name| remote_path(&state.directory, name))
            .collect();
        let accepted = self.filter.filter(state.scope.as_ref(), paths);
        let total = accepted.len();
        let kept = cap(accepted.clone(), self.max_fetch_size());
        // Files beyond the cap stay eligible for the next listing.
        for dropped in &accepted[kept.len()..] {
            self.filter.rollback(state.scope.as_ref(), dropped);
        }

        debug!(
            directory = %state.directory,
            scope = ?state.scope,
            listed = names.len(),
            accepted = total,
            fetched = kept.len(),
            "Listed remote directory"
        );
        state.pending.extend(kept);
        Ok(session)
    }
}

impl MessageSource for StreamingRemoteSource {
    fn receive(&self) -> Result<Option<Message>> {
        let mut state = self.state.lock();
        let scope = self.session_factory.scope();
        if state.scope != scope {
            if !state.pending.is_empty() {
                debug!(from = ?state.scope, to = ?scope, "Session scope changed; releasing buffer");
                self.release_pending(&mut state);
            }
            state.scope = scope;
        }

        let mut opened = None;
        if state.pending.is_empty() {
            opened = Some(self.fill(&mut state)?);
        }

        let Some(path) = state.pending.pop_front() else {
            return Ok(None);
        };

        let mut session = match opened {
            Some(session) => session,
            None => self
                .session_factory
                .session()
                .context("Failed to open remote session")?,
        };
        let payload = match session.read(&path) {
            Ok(payload) => payload,
            Err(e) => {
                self.filter.rollback(state.scope.as_ref(), &path);
                return Err(e.context(format!("Failed to read remote file: {path}")));
            }
        };

        Ok(Some(
            Message::new(payload)
                .with_header(REMOTE_DIRECTORY, state.directory.clone())
                .with_header(REMOTE_FILE, path),
        ))
    }

    fn as_directory_configurable(&self) -> Option<&dyn RemoteDirectoryConfigurable> {
        Some(self)
    }

    fn as_fetch_limited(&self) -> Option<&dyn FetchSizeLimited> {
        Some(self)
    }
}

impl RemoteDirectoryConfigurable for StreamingRemoteSource {
    fn set_remote_directory(&self, directory: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.directory == directory {
            return Ok(());
        }
        // Buffered paths belong to the old directory.
        self.release_pending(&mut state);
        debug!(from = %state.directory, to = %directory, "Switching remote directory");
        state.directory = directory.to_string();
        Ok(())
    }

    fn remote_directory(&self) -> String {
        self.state.lock().directory.clone()
    }
}

impl FetchSizeLimited for StreamingRemoteSource {
    fn set_max_fetch_size(&self, max: usize) {
        self.max_fetch_size.store(max, Ordering::Release);
    }

    fn max_fetch_size(&self) -> usize {
        self.max_fetch_size.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::collections::BTreeMap;

    /// Flat in-memory store: full path -> contents.
    #[derive(Clone, Default)]
    struct MemoryStore(Arc<Mutex<BTreeMap<String, Vec<u8>>>>);

    impl MemoryStore {
        fn put(&self, path: &str, body: &str) {
            self.0.lock().insert(path.to_string(), body.as_bytes().to_vec());
        }
    }

    struct MemorySession(MemoryStore);

    impl Session for MemorySession {
        fn list(&mut self, directory: &str) -> Result<Vec<String>> {
            let prefix = format!("{}/", directory.trim_end_matches('/'));
            Ok(self
                .0
                .0
                .lock()
                .keys()
                .filter_map(|k| k.strip_prefix(&prefix))
                .filter(|rest| !rest.contains('/'))
                .map(str::to_string)
                .collect())
        }

        fn read(&mut self, path: &str) -> Result<Vec<u8>> {
            match self.0.0.lock().get(path) {
                Some(body) => Ok(body.clone()),
                None => bail!("no such file: {path}"),
            }
        }
    }

    impl SessionFactory for MemoryStore {
        fn session(&self) -> Result<Box<dyn Session>> {
            Ok(Box::new(MemorySession(self.clone())))
        }
    }

    fn source(store: &MemoryStore, dir: &str) -> StreamingRemoteSource {
        StreamingRemoteSource::new(Arc::new(store.clone()), dir)
    }

    #[test]
    fn test_emits_each_file_once() {
        let store = MemoryStore::default();
        store.put("/a/1.txt", "one");
        store.put("/a/2.txt", "two");
        let source = source(&store, "/a");

        let first = source.receive().unwrap().unwrap();
        assert_eq!(first.payload(), b"one");
        assert_eq!(first.header(REMOTE_FILE), Some("/a/1.txt"));
        assert_eq!(first.header(REMOTE_DIRECTORY), Some("/a"));

        let second = source.receive().unwrap().unwrap();
        assert_eq!(second.payload(), b"two");
        assert!(source.receive().unwrap().is_none());
    }

    #[test]
    fn test_new_files_picked_up_later() {
        let store = MemoryStore::default();
        let source = source(&store, "/a");
        assert!(source.receive().unwrap().is_none());

        store.put("/a/late.txt", "late");
        assert_eq!(source.receive().unwrap().unwrap().payload(), b"late");
    }

    #[test]
    fn test_max_fetch_size_limits_buffer() {
        let store = MemoryStore::default();
        for i in 0..5 {
            store.put(&format!("/a/{i}"), "x");
        }
        let source = source(&store, "/a").with_max_fetch_size(2);

        assert!(source.receive().unwrap().is_some());
        assert_eq!(source.pending(), 1);
        // Capped-off files are still delivered on later listings.
        let mut count = 1;
        while source.receive().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 5);
    }

    #[test]
    fn test_switch_directory_drops_buffer() {
        let store = MemoryStore::default();
        store.put("/a/1", "a1");
        store.put("/a/2", "a2");
        store.put("/b/1", "b1");
        let source = source(&store, "/a");

        assert_eq!(source.receive().unwrap().unwrap().payload(), b"a1");
        assert_eq!(source.pending(), 1);

        source.set_remote_directory("/b").unwrap();
        assert_eq!(source.pending(), 0);
        assert_eq!(source.remote_directory(), "/b");
        assert_eq!(source.receive().unwrap().unwrap().payload(), b"b1");

        // The dropped /a/2 was handed back and is delivered after switching back.
        source.set_remote_directory("/a").unwrap();
        assert_eq!(source.receive().unwrap().unwrap().payload(), b"a2");
    }

    #[test]
    fn test_read_failure_rolls_back() {
        let store = MemoryStore::default();
        store.put("/a/1", "a1");
        let source = source(&store, "/a");

        // Listing buffers /a/1, then the file vanishes before it is read.
        {
            let mut state = source.state.lock();
            source.fill(&mut state).unwrap();
        }
        store.0.lock().clear();
        assert!(source.receive().is_err());

        store.put("/a/1", "again");
        assert_eq!(source.receive().unwrap().unwrap().payload(), b"again");
    }

    #[test]
    fn test_capabilities_exposed() {
        let store = MemoryStore::default();
        let source = source(&store, "/a");
        let limited = source.as_fetch_limited().unwrap();
        limited.set_max_fetch_size(1);
        assert_eq!(limited.max_fetch_size(), 1);
        source
            .as_directory_configurable()
            .unwrap()
            .set_remote_directory("/z")
            .unwrap();
        assert_eq!(source.remote_directory(), "/z");
    }

    /// Serves whichever store is selected and reports the selection as its scope.
    struct Switch {
        stores: Vec<MemoryStore>,
        selected: AtomicUsize,
    }

    impl Switch {
        fn select(&self, index: usize) {
            self.selected.store(index, Ordering::SeqCst);
        }
    }

    impl SessionFactory for Switch {
        fn session(&self) -> Result<Box<dyn Session>> {
            self.stores[self.selected.load(Ordering::SeqCst)].session()
        }

        fn scope(&self) -> Option<RoutingKey> {
            Some(format!("s{}", self.selected.load(Ordering::SeqCst)).into())
        }
    }

    fn switch(stores: Vec<MemoryStore>) -> Arc<Switch> {
        Arc::new(Switch {
            stores,
            selected: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_same_path_on_two_stores_is_delivered_from_each() {
        let (one, two) = (MemoryStore::default(), MemoryStore::default());
        one.put("/in/report.csv", "from-one");
        two.put("/in/report.csv", "from-two");
        let factory = switch(vec![one, two]);
        let source = StreamingRemoteSource::new(factory.clone(), "/in");

        assert_eq!(source.receive().unwrap().unwrap().payload(), b"from-one");
        assert!(source.receive().unwrap().is_none());
        factory.select(1);
        assert_eq!(source.receive().unwrap().unwrap().payload(), b"from-two");
        assert!(source.receive().unwrap().is_none());
    }

    #[test]
    fn test_scope_change_releases_buffer() {
        let (one, two) = (MemoryStore::default(), MemoryStore::default());
        one.put("/in/1", "one-1");
        one.put("/in/2", "one-2");
        two.put("/in/2", "two-2");
        let factory = switch(vec![one, two]);
        let source = StreamingRemoteSource::new(factory.clone(), "/in");

        assert_eq!(source.receive().unwrap().unwrap().payload(), b"one-1");
        assert_eq!(source.pending(), 1);

        // The buffered /in/2 belongs to the first store and is never read from the second.
        factory.select(1);
        assert_eq!(source.receive().unwrap().unwrap().payload(), b"two-2");

        factory.select(0);
        assert_eq!(source.receive().unwrap().unwrap().payload(), b"one-2");
    }
}

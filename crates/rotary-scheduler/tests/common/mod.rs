#![allow(dead_code)]

use anyhow::{Result, bail};
use parking_lot::Mutex;
use rotary_core::{Message, RoutingKey};
use rotary_session::{DelegatingSessionFactory, Session, SessionFactory};
use rotary_source::{FetchSizeLimited, MessageSource, RemoteDirectoryConfigurable};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();
}

/// In-memory remote file store standing in for one server.
#[derive(Clone, Default)]
pub struct MemoryServer {
    files: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryServer {
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let server = Self::default();
        for (path, body) in files {
            server.put(path, body);
        }
        server
    }

    pub fn put(&self, path: &str, body: &str) {
        self.files
            .lock()
            .insert(path.to_string(), body.as_bytes().to_vec());
    }
}

struct MemorySession {
    files: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl Session for MemorySession {
    fn list(&mut self, directory: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", directory.trim_end_matches('/'));
        Ok(self
            .files
            .lock()
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter(|rest| !rest.contains('/'))
            .map(str::to_string)
            .collect())
    }

    fn read(&mut self, path: &str) -> Result<Vec<u8>> {
        match self.files.lock().get(path) {
            Some(body) if body.as_slice() != b"UNREADABLE" => Ok(body.clone()),
            _ => bail!("cannot read {path}"),
        }
    }
}

impl SessionFactory for MemoryServer {
    fn session(&self) -> Result<Box<dyn Session>> {
        Ok(Box::new(MemorySession {
            files: self.files.clone(),
        }))
    }
}

pub fn delegating(servers: &[(&str, &MemoryServer)]) -> Arc<DelegatingSessionFactory> {
    let mut map: HashMap<RoutingKey, Arc<dyn SessionFactory>> = HashMap::new();
    for (key, server) in servers {
        map.insert(RoutingKey::from(*key), Arc::new((*server).clone()));
    }
    Arc::new(DelegatingSessionFactory::new(map))
}

/// Wraps a source and records the routing key bound while `receive` runs.
pub struct KeyProbe {
    inner: Arc<dyn MessageSource>,
    factory: Arc<DelegatingSessionFactory>,
    seen: Mutex<Vec<Option<String>>>,
}

impl KeyProbe {
    pub fn new(inner: Arc<dyn MessageSource>, factory: Arc<DelegatingSessionFactory>) -> Self {
        Self {
            inner,
            factory,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen
            .lock()
            .iter()
            .map(|k| k.clone().unwrap_or_else(|| "<none>".to_string()))
            .collect()
    }
}

impl MessageSource for KeyProbe {
    fn receive(&self) -> Result<Option<Message>> {
        let key = self.factory.thread_key().map(|k| k.to_string());
        self.seen.lock().push(key);
        self.inner.receive()
    }

    fn as_directory_configurable(&self) -> Option<&dyn RemoteDirectoryConfigurable> {
        self.inner.as_directory_configurable()
    }

    fn as_fetch_limited(&self) -> Option<&dyn FetchSizeLimited> {
        self.inner.as_fetch_limited()
    }
}

/// Source with no optional capabilities that never yields.
pub struct OpaqueSource;

impl MessageSource for OpaqueSource {
    fn receive(&self) -> Result<Option<Message>> {
        Ok(None)
    }
}

pub fn text(message: &Message) -> String {
    String::from_utf8_lossy(message.payload()).into_owned()
}

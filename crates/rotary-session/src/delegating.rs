//! Session factory that delegates to one of several keyed factories,
//! selected by the routing key bound to the calling thread.

use anyhow::Result;
use dashmap::DashMap;
use rotary_core::{RotationError, RoutingKey};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::session::{Session, SessionFactory, ThreadKeyRouter};

static NEXT_FACTORY_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Keys bound on this thread, by factory instance id. Freed when the thread exits.
    static THREAD_KEYS: RefCell<HashMap<u64, RoutingKey>> = RefCell::new(HashMap::new());
}

/// Resolves a routing key to the factory that serves it.
pub trait SessionFactoryLocator: Send + Sync {
    /// `None` key means "no key bound"; implementations may fall back to a default.
    fn locate(&self, key: Option<&RoutingKey>) -> Option<Arc<dyn SessionFactory>>;
}

/// Map-backed locator with an optional default factory.
///
/// Unknown keys and the absent key both resolve to the default, when set.
pub struct DefaultSessionFactoryLocator {
    factories: DashMap<RoutingKey, Arc<dyn SessionFactory>>,
    default_factory: Option<Arc<dyn SessionFactory>>,
}

impl DefaultSessionFactoryLocator {
    pub fn new(factories: HashMap<RoutingKey, Arc<dyn SessionFactory>>) -> Self {
        Self {
            factories: factories.into_iter().collect(),
            default_factory: None,
        }
    }

    pub fn with_default(mut self, factory: Arc<dyn SessionFactory>) -> Self {
        self.default_factory = Some(factory);
        self
    }

    pub fn add_session_factory(&self, key: RoutingKey, factory: Arc<dyn SessionFactory>) {
        debug!(key = %key, "Registering session factory");
        self.factories.insert(key, factory);
    }

    pub fn remove_session_factory(&self, key: &RoutingKey) -> Option<Arc<dyn SessionFactory>> {
        debug!(key = %key, "Removing session factory");
        self.factories.remove(key).map(|(_, factory)| factory)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<RoutingKey> {
        let mut keys: Vec<_> = self.factories.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }
}

impl SessionFactoryLocator for DefaultSessionFactoryLocator {
    fn locate(&self, key: Option<&RoutingKey>) -> Option<Arc<dyn SessionFactory>> {
        key.and_then(|k| self.factories.get(k).map(|e| e.value().clone()))
            .or_else(|| self.default_factory.clone())
    }
}

impl fmt::Debug for DefaultSessionFactoryLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultSessionFactoryLocator")
            .field("keys", &self.keys())
            .field("has_default", &self.default_factory.is_some())
            .finish()
    }
}

/// Session factory routing each `session()` call by the caller's thread key.
///
/// Bindings live in thread-local storage under this instance's id, so two
/// factories never see each other's bindings, a binding made on one thread
/// is invisible to all others, and a thread that exits while bound takes
/// its binding with it.
pub struct DelegatingSessionFactory {
    id: u64,
    locator: Arc<dyn SessionFactoryLocator>,
}

impl DelegatingSessionFactory {
    /// Build over a keyed map with no default factory.
    pub fn new(factories: HashMap<RoutingKey, Arc<dyn SessionFactory>>) -> Self {
        Self::with_locator(Arc::new(DefaultSessionFactoryLocator::new(factories)))
    }

    pub fn with_locator(locator: Arc<dyn SessionFactoryLocator>) -> Self {
        Self {
            id: NEXT_FACTORY_ID.fetch_add(1, Ordering::Relaxed),
            locator,
        }
    }

    /// Key currently bound to the calling thread, if any.
    pub fn thread_key(&self) -> Option<RoutingKey> {
        THREAD_KEYS.with(|keys| keys.borrow().get(&self.id).cloned())
    }

    /// Resolve the factory serving `key` (or the default for `None`).
    pub fn factory_for(&self, key: Option<&RoutingKey>) -> Result<Arc<dyn SessionFactory>> {
        match self.locator.locate(key) {
            Some(factory) => Ok(factory),
            None => match key {
                Some(k) => Err(RotationError::UnknownKey(k.to_string()).into()),
                None => Err(RotationError::NoDefaultFactory.into()),
            },
        }
    }

    /// Open a session for an explicit key, ignoring the thread binding.
    pub fn session_for(&self, key: &RoutingKey) -> Result<Box<dyn Session>> {
        self.factory_for(Some(key))?.session()
    }
}

impl SessionFactory for DelegatingSessionFactory {
    fn session(&self) -> Result<Box<dyn Session>> {
        let key = self.thread_key();
        self.factory_for(key.as_ref())?.session()
    }

    fn scope(&self) -> Option<RoutingKey> {
        self.thread_key()
    }
}

impl ThreadKeyRouter for DelegatingSessionFactory {
    fn set_thread_key(&self, key: &RoutingKey) {
        debug!(key = %key, "Binding routing key to thread");
        THREAD_KEYS.with(|keys| keys.borrow_mut().insert(self.id, key.clone()));
    }

    fn clear_thread_key(&self) {
        THREAD_KEYS.with(|keys| keys.borrow_mut().remove(&self.id));
    }
}

impl Drop for DelegatingSessionFactory {
    fn drop(&mut self) {
        // Only the dropping thread's entry is reachable; others go with their threads.
        let _ = THREAD_KEYS.try_with(|keys| keys.borrow_mut().remove(&self.id));
    }
}

impl fmt::Debug for DelegatingSessionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegatingSessionFactory")
            .field("id", &self.id)
            .field("thread_key", &self.thread_key())
            .finish()
    }
}

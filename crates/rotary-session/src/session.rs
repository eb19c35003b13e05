use anyhow::Result;
use rotary_core::RoutingKey;

/// An open connection to one remote file store.
pub trait Session: Send {
    /// File names (not paths) directly inside `directory`.
    fn list(&mut self, directory: &str) -> Result<Vec<String>>;

    /// Full contents of the file at `path`.
    fn read(&mut self, path: &str) -> Result<Vec<u8>>;
}

pub trait SessionFactory: Send + Sync {
    fn session(&self) -> Result<Box<dyn Session>>;

    /// Which store `session()` would connect to from the calling thread.
    ///
    /// Sources use it to keep same-named files on different stores apart.
    /// `None` for factories that always serve a single store.
    fn scope(&self) -> Option<RoutingKey> {
        None
    }
}

/// Binds a routing key to the calling thread.
///
/// Bindings are per thread: a key set on one thread is never observed by
/// another thread sharing the same router.
pub trait ThreadKeyRouter: Send + Sync {
    fn set_thread_key(&self, key: &RoutingKey);
    fn clear_thread_key(&self);
}

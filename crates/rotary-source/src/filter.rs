use parking_lot::Mutex;
use rotary_core::RoutingKey;
use std::collections::HashSet;

/// Passes each remote path through at most once per store for the
/// filter's lifetime.
///
/// The store is the session scope the path was listed under, so the same
/// path on two servers is two distinct files.
#[derive(Debug, Default)]
pub struct AcceptOnceFilter {
    seen: Mutex<HashSet<(Option<RoutingKey>, String)>>,
}

impl AcceptOnceFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only paths not accepted before under `scope`, recording them
    /// as accepted. Order of the input is preserved.
    pub fn filter(&self, scope: Option<&RoutingKey>, paths: Vec<String>) -> Vec<String> {
        let mut seen = self.seen.lock();
        paths
            .into_iter()
            .filter(|p| seen.insert((scope.cloned(), p.clone())))
            .collect()
    }

    /// Forget a path so a later listing under the same scope can accept it again.
    pub fn rollback(&self, scope: Option<&RoutingKey>, path: &str) -> bool {
        self.seen.lock().remove(&(scope.cloned(), path.to_string()))
    }
}

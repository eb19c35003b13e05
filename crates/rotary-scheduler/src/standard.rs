//! Round-robin rotation with fair and unfair modes.
//!
//! State transitions (`UNINITIALIZED -> ROTATING`, no terminal state):
//!
//! | call | fair | unfair (default) |
//! |---|---|---|
//! | first `before_receive` | rotate, cap fetch size to 1 | rotate |
//! | later `before_receive` | rotate | keep current |
//! | `after_receive` | clear key | clear key, rotate if nothing was received |
//!
//! Every `before_receive` ends by binding the current target's key to the
//! polling thread.

use anyhow::{Result, anyhow};
use parking_lot::Mutex;
use rotary_core::{KeyDirectory, RotationError};
use rotary_session::ThreadKeyRouter;
use rotary_source::MessageSource;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, ThreadId};
use tracing::{debug, warn};

use crate::policy::{RemoteDirectoryConfigurer, RotationPolicy, SourceConfigurer};

/// Sentinel for "no target selected yet".
const NONE: usize = usize::MAX;

/// Standard [`RotationPolicy`].
///
/// In unfair mode (the default) a target keeps being polled for as long as
/// it yields messages; the policy moves on after the first empty poll. In
/// fair mode it moves on every poll and limits each poll to one file so a
/// busy target cannot starve the others.
pub struct StandardRotationPolicy {
    router: Arc<dyn ThreadKeyRouter>,
    targets: Box<[KeyDirectory]>,
    fair: bool,
    configurer: Box<dyn SourceConfigurer>,
    /// Index of the next target a rotation step hands out.
    cursor: AtomicUsize,
    /// Index of the current target, or `NONE`.
    current: AtomicUsize,
    initialized: AtomicBool,
    /// Thread that owns the in-flight poll, between `before_receive` and `after_receive`.
    in_flight: Mutex<Option<ThreadId>>,
}

impl StandardRotationPolicy {
    pub fn new(
        router: Arc<dyn ThreadKeyRouter>,
        targets: Vec<KeyDirectory>,
        fair: bool,
    ) -> Result<Self, RotationError> {
        if targets.is_empty() {
            return Err(RotationError::NoTargets);
        }
        Ok(Self {
            router,
            targets: targets.into_boxed_slice(),
            fair,
            configurer: Box::new(RemoteDirectoryConfigurer),
            cursor: AtomicUsize::new(0),
            current: AtomicUsize::new(NONE),
            initialized: AtomicBool::new(false),
            in_flight: Mutex::new(None),
        })
    }

    /// Replace how a source is pointed at a newly selected target.
    pub fn with_configurer(mut self, configurer: impl SourceConfigurer + 'static) -> Self {
        self.configurer = Box::new(configurer);
        self
    }

    pub fn targets(&self) -> &[KeyDirectory] {
        &self.targets
    }

    pub fn is_fair(&self) -> bool {
        self.fair
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Advance to the next target, wrapping at the end, and reconfigure the source.
    ///
    /// Cursor and current are updated before the configurer runs, so a
    /// configurer error leaves the policy usable on the next cycle.
    fn rotate(&self, source: &dyn MessageSource) -> Result<()> {
        let mut next = self.cursor.load(Ordering::Acquire);
        if next >= self.targets.len() {
            next = 0;
        }
        self.current.store(next, Ordering::Release);
        self.cursor.store(next + 1, Ordering::Release);

        let target = &self.targets[next];
        debug!(
            key = %target.key(),
            directory = %target.directory(),
            index = next,
            "Rotated to next target"
        );
        self.configurer.configure(source, target)
    }

    fn select_and_bind(&self, source: &dyn MessageSource) -> Result<()> {
        if !self.is_initialized() {
            self.rotate(source)?;
            if self.fair {
                if let Some(limited) = source.as_fetch_limited() {
                    debug!("Fair rotation: limiting each poll to one file");
                    limited.set_max_fetch_size(1);
                }
            }
            self.initialized.store(true, Ordering::Release);
        } else if self.fair {
            self.rotate(source)?;
        }

        let target = self
            .current()
            .ok_or_else(|| anyhow!("rotation produced no current target"))?;
        self.router.set_thread_key(target.key());
        Ok(())
    }

    fn in_flight_key(&self) -> String {
        self.current()
            .map(|t| t.key().to_string())
            .unwrap_or_default()
    }
}

impl RotationPolicy for StandardRotationPolicy {
    fn before_receive(&self, source: &dyn MessageSource) -> Result<()> {
        {
            let mut owner = self.in_flight.lock();
            if owner.is_some() {
                return Err(RotationError::PollInFlight {
                    key: self.in_flight_key(),
                }
                .into());
            }
            *owner = Some(thread::current().id());
        }

        let result = self.select_and_bind(source);
        if result.is_err() {
            self.router.clear_thread_key();
            *self.in_flight.lock() = None;
        }
        result
    }

    fn after_receive(&self, message_received: bool, source: &dyn MessageSource) -> Result<()> {
        self.router.clear_thread_key();

        let owned = {
            let mut owner = self.in_flight.lock();
            if *owner == Some(thread::current().id()) {
                *owner = None;
                true
            } else {
                false
            }
        };
        if !owned {
            warn!(
                key = %self.in_flight_key(),
                "after_receive without a matching before_receive on this thread; not rotating"
            );
            return Ok(());
        }

        if !self.fair && !message_received {
            self.rotate(source)?;
        }
        Ok(())
    }

    fn current(&self) -> Option<&KeyDirectory> {
        self.targets.get(self.current.load(Ordering::Acquire))
    }
}

impl fmt::Debug for StandardRotationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardRotationPolicy")
            .field("targets", &self.targets)
            .field("fair", &self.fair)
            .field("current", &self.current())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

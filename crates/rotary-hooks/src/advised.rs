use anyhow::Result;
use rotary_core::Message;
use rotary_source::{FetchSizeLimited, MessageSource, RemoteDirectoryConfigurable};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::advice::ReceiveAdvice;

/// A message source wrapped in a chain of [`ReceiveAdvice`].
pub struct AdvisedSource {
    source: Arc<dyn MessageSource>,
    advice: Vec<Arc<dyn ReceiveAdvice>>,
}

impl AdvisedSource {
    pub fn new(source: Arc<dyn MessageSource>) -> Self {
        Self {
            source,
            advice: Vec::new(),
        }
    }

    /// Append an advice; it runs inside every advice added before it.
    pub fn with_advice(mut self, advice: Arc<dyn ReceiveAdvice>) -> Self {
        self.advice.push(advice);
        self
    }

    pub fn source(&self) -> &Arc<dyn MessageSource> {
        &self.source
    }

    /// Run one poll cycle through the whole chain.
    pub fn poll(&self) -> Result<Option<Message>> {
        self.invoke(0)
    }

    fn invoke(&self, index: usize) -> Result<Option<Message>> {
        let Some(advice) = self.advice.get(index) else {
            return self.source.receive();
        };
        let source = self.source.as_ref();

        if !advice.before_receive(source)? {
            debug!(advice = index, "Poll vetoed by advice");
            return advice.after_receive(None, source);
        }

        let guard = AfterReceiveGuard {
            advice: advice.as_ref(),
            source,
            index,
            armed: true,
        };
        let inner = self.invoke(index + 1);
        guard.disarm();

        match inner {
            Ok(result) => advice.after_receive(result, source),
            Err(err) => {
                // The poll error wins; a cleanup failure must not mask it.
                if let Err(cleanup) = advice.after_receive(None, source) {
                    warn!(
                        advice = index,
                        error = %format!("{cleanup:#}"),
                        "after_receive failed while unwinding a failed poll"
                    );
                }
                Err(err)
            }
        }
    }
}

impl MessageSource for AdvisedSource {
    fn receive(&self) -> Result<Option<Message>> {
        self.poll()
    }

    fn as_directory_configurable(&self) -> Option<&dyn RemoteDirectoryConfigurable> {
        self.source.as_directory_configurable()
    }

    fn as_fetch_limited(&self) -> Option<&dyn FetchSizeLimited> {
        self.source.as_fetch_limited()
    }
}

impl fmt::Debug for AdvisedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdvisedSource")
            .field("advice", &self.advice.len())
            .finish()
    }
}

/// Runs `after_receive(None)` if dropped while armed, i.e. when the inner
/// chain panicked.
struct AfterReceiveGuard<'a> {
    advice: &'a dyn ReceiveAdvice,
    source: &'a dyn MessageSource,
    index: usize,
    armed: bool,
}

impl AfterReceiveGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AfterReceiveGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = self.advice.after_receive(None, self.source) {
            warn!(
                advice = self.index,
                error = %format!("{e:#}"),
                "after_receive failed during panic cleanup"
            );
        }
    }
}

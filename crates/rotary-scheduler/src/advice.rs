//! Bridges a [`RotationPolicy`] into the poll-cycle advice chain.

use anyhow::Result;
use rotary_config::RotationConfig;
use rotary_core::{KeyDirectory, Message};
use rotary_hooks::ReceiveAdvice;
use rotary_session::ThreadKeyRouter;
use rotary_source::MessageSource;
use std::sync::Arc;

use crate::policy::RotationPolicy;
use crate::standard::StandardRotationPolicy;

/// Poll advice that rotates one endpoint across several servers.
///
/// Never vetoes a poll. The post-hook reports whether the poll produced a
/// message and passes the result through untouched.
pub struct RotatingServerAdvice {
    policy: Box<dyn RotationPolicy>,
}

impl RotatingServerAdvice {
    /// Unfair rotation: stay on a target while it keeps yielding messages.
    pub fn new(router: Arc<dyn ThreadKeyRouter>, targets: Vec<KeyDirectory>) -> Result<Self> {
        Self::with_fairness(router, targets, false)
    }

    pub fn with_fairness(
        router: Arc<dyn ThreadKeyRouter>,
        targets: Vec<KeyDirectory>,
        fair: bool,
    ) -> Result<Self> {
        let policy = StandardRotationPolicy::new(router, targets, fair)?;
        Ok(Self::with_policy(policy))
    }

    /// Use a custom rotation policy.
    pub fn with_policy(policy: impl RotationPolicy + 'static) -> Self {
        Self {
            policy: Box::new(policy),
        }
    }

    /// Build from a validated `rotation.toml`.
    pub fn from_config(router: Arc<dyn ThreadKeyRouter>, config: &RotationConfig) -> Result<Self> {
        Self::with_fairness(router, config.key_directories()?, config.fair)
    }

    pub fn policy(&self) -> &dyn RotationPolicy {
        self.policy.as_ref()
    }

    pub fn current(&self) -> Option<&KeyDirectory> {
        self.policy.current()
    }
}

impl ReceiveAdvice for RotatingServerAdvice {
    fn before_receive(&self, source: &dyn MessageSource) -> Result<bool> {
        self.policy.before_receive(source)?;
        Ok(true)
    }

    fn after_receive(
        &self,
        result: Option<Message>,
        source: &dyn MessageSource,
    ) -> Result<Option<Message>> {
        self.policy.after_receive(result.is_some(), source)?;
        Ok(result)
    }
}

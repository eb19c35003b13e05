//! Rotation strategy contract and source reconfiguration hooks.

use anyhow::Result;
use rotary_core::KeyDirectory;
use rotary_source::MessageSource;
use tracing::debug;

/// Decides which target services each poll.
///
/// Calls alternate strictly per instance: `before_receive`, `after_receive`,
/// `before_receive`, ... all from the endpoint's single poller thread.
pub trait RotationPolicy: Send + Sync {
    /// Select the target for the upcoming poll and apply its side effects
    /// (routing key binding, source reconfiguration) before returning.
    ///
    /// On `Err` everything acquired here has already been released, and
    /// `after_receive` must not be called for this poll.
    fn before_receive(&self, source: &dyn MessageSource) -> Result<()>;

    /// Release the poll's routing state and decide whether the next
    /// `before_receive` moves on. Called after `receive()`, on success and
    /// on failure alike.
    fn after_receive(&self, message_received: bool, source: &dyn MessageSource) -> Result<()>;

    /// Target of the in-flight or most recent poll; `None` before the first poll.
    fn current(&self) -> Option<&KeyDirectory>;
}

/// Points a message source at a newly selected target.
pub trait SourceConfigurer: Send + Sync {
    fn configure(&self, source: &dyn MessageSource, target: &KeyDirectory) -> Result<()>;
}

impl<F> SourceConfigurer for F
where
    F: Fn(&dyn MessageSource, &KeyDirectory) -> Result<()> + Send + Sync,
{
    fn configure(&self, source: &dyn MessageSource, target: &KeyDirectory) -> Result<()> {
        self(source, target)
    }
}

/// Default configurer: switch the remote directory when the source
/// supports it, otherwise leave the source alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct RemoteDirectoryConfigurer;

impl SourceConfigurer for RemoteDirectoryConfigurer {
    fn configure(&self, source: &dyn MessageSource, target: &KeyDirectory) -> Result<()> {
        match source.as_directory_configurable() {
            Some(configurable) => configurable.set_remote_directory(target.directory()),
            None => {
                debug!(
                    key = %target.key(),
                    "Source has no remote directory to reconfigure"
                );
                Ok(())
            }
        }
    }
}

use anyhow::Result;
use rotary_core::Message;
use rotary_source::MessageSource;

/// Pre/post hooks around one poll of a message source.
pub trait ReceiveAdvice: Send + Sync {
    /// Called before `receive()`. Return `Ok(false)` to skip the poll.
    ///
    /// On `Err`, the advice must already have released anything it acquired:
    /// `after_receive` is not called for a poll whose pre-hook failed.
    fn before_receive(&self, _source: &dyn MessageSource) -> Result<bool> {
        Ok(true)
    }

    /// Called after `receive()` with its result (`None` for an empty, vetoed
    /// or failed poll). The returned value replaces the result.
    fn after_receive(
        &self,
        result: Option<Message>,
        _source: &dyn MessageSource,
    ) -> Result<Option<Message>> {
        Ok(result)
    }
}

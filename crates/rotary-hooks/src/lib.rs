//! Poll-cycle hooks around `MessageSource::receive`.
//!
//! A [`ReceiveAdvice`] gets two callbacks per poll:
//! - `before_receive`: may veto the poll by returning `false`
//! - `after_receive`: sees (and may replace) the poll result
//!
//! [`AdvisedSource`] chains any number of advices around one source.
//! Advice 0 is outermost: pre-hooks run in registration order, post-hooks
//! in reverse.
//!
//! ## Cleanup Guarantee
//!
//! Once an advice's `before_receive` has returned `Ok`, its
//! `after_receive` runs exactly once for that poll, even when the inner
//! chain returns an error or panics. An advice that binds per-poll state
//! in `before_receive` can therefore rely on `after_receive` to release it.

pub mod advice;
pub mod advised;

pub use advice::ReceiveAdvice;
pub use advised::AdvisedSource;

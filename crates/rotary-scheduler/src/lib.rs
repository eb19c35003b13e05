//! Scheduler: round-robin rotation of one polling endpoint across several
//! (routing key, remote directory) targets.
//!
//! [`StandardRotationPolicy`] decides which target services each poll and
//! [`RotatingServerAdvice`] plugs it into an
//! [`AdvisedSource`](rotary_hooks::AdvisedSource) poll cycle.

pub mod advice;
pub mod policy;
pub mod standard;

pub use advice::RotatingServerAdvice;
pub use policy::{RemoteDirectoryConfigurer, RotationPolicy, SourceConfigurer};
pub use standard::StandardRotationPolicy;

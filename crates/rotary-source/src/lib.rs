//! Polled message sources backed by remote file sessions.
//!
//! Sources advertise optional capabilities through [`MessageSource`]:
//! a remote directory that can be switched between polls and a per-poll
//! fetch cap. Rotation logic queries these capabilities instead of
//! knowing concrete source types.

pub mod filter;
pub mod source;
pub mod streaming;
pub mod synchronizer;
pub mod synchronizing;

pub use filter::AcceptOnceFilter;
pub use source::{
    FetchSizeLimited, LOCAL_FILE, MessageSource, REMOTE_DIRECTORY, REMOTE_FILE,
    RemoteDirectoryConfigurable,
};
pub use streaming::StreamingRemoteSource;
pub use synchronizer::{InboundFileSynchronizer, SynchronizedFile};
pub use synchronizing::SynchronizingRemoteSource;

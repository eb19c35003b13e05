use anyhow::Result;
use rotary_core::Message;

/// Header carrying the remote directory a message was read from.
pub const REMOTE_DIRECTORY: &str = "remote_directory";
/// Header carrying the full remote path of the file.
pub const REMOTE_FILE: &str = "remote_file";
/// Header carrying the local path a synchronized file was copied to.
pub const LOCAL_FILE: &str = "local_file";

/// A pollable source of messages.
///
/// `receive` returns `Ok(None)` when nothing is available this poll.
/// Capability accessors default to `None`; sources override the ones they
/// support.
pub trait MessageSource: Send + Sync {
    fn receive(&self) -> Result<Option<Message>>;

    /// The object whose remote directory can be switched between polls.
    ///
    /// This may be the source itself or a component it delegates to.
    fn as_directory_configurable(&self) -> Option<&dyn RemoteDirectoryConfigurable> {
        None
    }

    /// Per-poll cap on how many remote files are fetched at once.
    fn as_fetch_limited(&self) -> Option<&dyn FetchSizeLimited> {
        None
    }
}

pub trait RemoteDirectoryConfigurable: Send + Sync {
    fn set_remote_directory(&self, directory: &str) -> Result<()>;
    fn remote_directory(&self) -> String;
}

/// Fetch cap; `0` means unlimited.
pub trait FetchSizeLimited: Send + Sync {
    fn set_max_fetch_size(&self, max: usize);
    fn max_fetch_size(&self) -> usize;
}

/// Join a remote directory and a file name with exactly one separator.
pub(crate) fn remote_path(directory: &str, name: &str) -> String {
    let trimmed = directory.trim_end_matches('/');
    if trimmed.is_empty() && directory.starts_with('/') {
        format!("/{name}")
    } else {
        format!("{trimmed}/{name}")
    }
}

/// Apply a fetch cap to a listing; `0` keeps everything.
pub(crate) fn cap(mut names: Vec<String>, max: usize) -> Vec<String> {
    if max > 0 && names.len() > max {
        names.truncate(max);
    }
    names
}

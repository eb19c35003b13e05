#[derive(thiserror::Error, Debug)]
pub enum RotationError {
    #[error("Routing key cannot be empty")]
    EmptyKey,

    #[error("Remote directory for key '{0}' cannot be empty")]
    EmptyDirectory(String),

    #[error("At least one key/directory pair is required for rotation")]
    NoTargets,

    #[error("Poll already in flight on target '{key}': before_receive called twice")]
    PollInFlight { key: String },

    #[error("No session factory registered for key '{0}' and no default configured")]
    UnknownKey(String),

    #[error("No routing key bound to the current thread and no default session factory")]
    NoDefaultFactory,
}

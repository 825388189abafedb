use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// The reasons a directory registration can be refused.
pub enum DirectoryError {
    #[error("Unknown ID '{0}'")]
    /// The requested ID is not part of the directory table.
    NoSuchId(String),

    #[error("ID '{0}' is already registered")]
    /// The requested ID exists but is currently owned by another registration.
    AlreadyRegistered(String),

    #[error("No available IDs")]
    /// An ID was requested to be allocated but every entry is in use.
    NoAvailableIds,

    #[error("The directory service is no longer running")]
    /// The directory actor has stopped, typically because the runtime is shutting down.
    Unavailable,
}

/// All domain errors for Vestige.
///
/// Each variant provides enough context to diagnose the issue
/// without needing a debugger.
#[derive(Debug, thiserror::Error)]
pub enum VestigeError {
    #[error(
        "No active attribution scope\n\n  \
         Reading the current actor or origin requires an enclosing scope.\n  \
         Enter one with 'Scope::enter(..)' and keep the returned guard alive\n  \
         for as long as the attributed work runs."
    )]
    NoActiveScope,

    #[error("Change store error: {detail}")]
    StoreError { detail: String },

    #[error("Invalid configuration: {detail}")]
    InvalidConfig { detail: String },

    #[error(
        "Unrecognized time zone '{value}'\n\n  \
         Supported values are \"UTC\" or a fixed offset such as \"+02:00\"\n  \
         or \"-05:30\". Set [vestige] time_zone in vestige.toml accordingly."
    )]
    InvalidTimeZone { value: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, VestigeError>;

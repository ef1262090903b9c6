//! Error types for prism-rs.

use thiserror::Error;

/// The main error type for prism-core operations.
#[derive(Error, Debug)]
pub enum PrismError {
    /// An observer scope is already active on this manager.
    #[error("observer scope already active")]
    ObserverAlreadyActive,

    /// An instance scope is already active on this manager.
    #[error("instance scope already active")]
    InstanceAlreadyActive,

    /// A projective light scope is already active on this manager.
    #[error("projective light scope already active")]
    ProjectiveLightAlreadyActive,

    /// A nested scope was requested but no observer scope is active.
    #[error("observer scope not active")]
    ObserverInactive,

    /// A nested scope was requested but its parent instance scope is not active.
    #[error("instance scope not active")]
    InstanceInactive,

    /// A nested scope was requested but its parent projective light scope is not active.
    #[error("projective light scope not active")]
    ProjectiveLightInactive,

    /// Every entry in the cache is checked out and nothing can be evicted.
    #[error("cache capacity exceeded: all {capacity} entries are checked out")]
    CacheCapacityExceeded { capacity: usize },

    /// A receipt was returned for an entry that is not currently checked out.
    #[error("receipt returned for an entry which is not checked out")]
    ReceiptNotOutstanding,

    /// The cache cannot be cleared while receipts are live.
    #[error("cache still has {outstanding} outstanding receipts")]
    CacheOutstanding { outstanding: usize },

    /// The resource allocator failed to produce a value.
    #[error("resource allocation failed: {0}")]
    AllocationFailed(String),

    /// All texture units are bound.
    #[error("all {count} texture units are in use")]
    TextureUnitsExhausted { count: u32 },

    /// A texture unit context was used while a nested context is active.
    #[error("texture unit context is not the innermost active context")]
    TextureUnitContextNotCurrent,

    /// Options failed validation.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl PrismError {
    /// Returns true for errors that indicate a caller broke scope nesting rules.
    ///
    /// These are programming errors rather than runtime conditions.
    pub fn is_scope_violation(&self) -> bool {
        matches!(
            self,
            PrismError::ObserverAlreadyActive
                | PrismError::InstanceAlreadyActive
                | PrismError::ProjectiveLightAlreadyActive
                | PrismError::ObserverInactive
                | PrismError::InstanceInactive
                | PrismError::ProjectiveLightInactive
                | PrismError::TextureUnitContextNotCurrent
        )
    }
}

/// A specialized Result type for prism-core operations.
pub type Result<T> = std::result::Result<T, PrismError>;

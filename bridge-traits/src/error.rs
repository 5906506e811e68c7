use thiserror::Error;

/// Failure reported by a host capability.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The host does not provide this capability.
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    /// The capability exists but the call failed (network, decoder, player).
    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// The caller handed the capability something it cannot use.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

//! Error types for blockenc

use crate::native::NativeError;
use thiserror::Error;

/// Result type alias for blockenc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for blockenc operations
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration, detected before any native call
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Native encoder construction failed
    #[error("Encoder initialization failed: {0}")]
    Init(#[source] NativeError),

    /// Native frame submission failed; the session needs a reinit
    #[error("Frame submission failed: {0}")]
    Encode(#[source] NativeError),

    /// Growing an owned buffer failed
    #[error("Allocation of {0} bytes failed")]
    Allocation(usize),

    /// The caller's output buffer cannot hold the next packet. The packet
    /// stays at the queue head; retrying with a buffer of at least `size`
    /// bytes delivers it.
    #[error("Output buffer too small: packet is {size} bytes, capacity is {capacity}")]
    BufferTooSmall { size: usize, capacity: usize },

    /// encode() was called before a successful init()
    #[error("Encoder session is not initialized")]
    NotInitialized,
}

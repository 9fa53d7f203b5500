use thiserror::Error;

/// Errors that can occur when transforming a buffer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The radix-2 transform can only process buffers whose length is a power of two.
    #[error("FFT length must be a power of two, got {len}")]
    LengthNotPowerOfTwo {
        /// Length of the rejected buffer.
        len: usize,
    },

    /// There must be at least one butterfly pair to transform.
    #[error("FFT length must be at least 2, got {len}")]
    LengthTooSmall {
        /// Length of the rejected buffer.
        len: usize,
    },
}

/// A specialized `Result` type for FFT operations, returning the crate's [`Error`] type as the
/// error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

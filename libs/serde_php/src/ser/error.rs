use std::{fmt, io};

use serde_core::ser;

/// Potential errors to encounter when serializing data.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The error originated from the [`io::Write`] implementation.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The value has a type that cannot be represented, f.e. a map key that is
    /// neither a string nor an integer.
    #[error("unsupported type: {0}")]
    UnsupportedType(&'static str),
    /// The value cannot be represented, f.e. a NaN float.
    #[error("unsupported value: {0}")]
    UnsupportedValue(String),
    /// A serialize hook failed, or produced invalid data.
    #[error("failed to serialize value of class {class:?}: {message}")]
    Marshaler {
        /// Class name of the value, or empty for raw values.
        class: &'static str,
        /// The error returned by the hook.
        message: String,
    },
    /// A sequence or struct serialized a different number of elements than
    /// it announced.
    #[error("announced {expected} elements but serialized {actual}")]
    LengthIncorrect {
        /// The announced length.
        expected: usize,
        /// The number of elements actually serialized.
        actual: usize,
    },
    /// Another reason provided by the serializing object.
    #[error("{0}")]
    Custom(String),
}

impl ser::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: fmt::Display,
    {
        Self::Custom(msg.to_string())
    }
}

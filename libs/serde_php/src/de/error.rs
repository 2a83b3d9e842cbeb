use std::{fmt, io};

use serde_core::de;

use crate::scan::SyntaxError;

/// Potential errors to encounter when deserializing data.
///
/// Apart from [`Error::Type`], all of these abort deserialization right away.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The input is not well-formed.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    /// A value did not fit the type it was deserialized into.
    ///
    /// Only the first of these is reported, after the rest of the input was
    /// deserialized on a best-effort basis.
    #[error(transparent)]
    Type(#[from] UnmarshalTypeError),
    /// An array deserialized as a sequence had a string key.
    #[error("array index is not integer at offset {0}")]
    NonIntegerIndex(usize),
    /// A custom value's unserialize hook failed.
    #[error("failed to unserialize custom value of class {class:?}: {message}")]
    Marshaler {
        /// Class name the custom value was tagged with.
        class: String,
        /// The error returned by the hook.
        message: String,
    },
    /// The deserializer lost track of the scanner's position. This is a bug.
    #[error("deserializer is out of sync with the scanner at offset {0}")]
    OutOfSync(usize),
    /// Containers are nested deeper than [`MAX_DEPTH`](super::MAX_DEPTH).
    #[error("containers nested too deeply at offset {0}")]
    DepthLimitExceeded(usize),
    /// The error originated from the [`io::Read`] implementation.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Another reason provided by the deserializing object.
    #[error("{0}")]
    Custom(String),
}

impl de::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: fmt::Display,
    {
        Self::Custom(msg.to_string())
    }
}

/// A value that could not be stored in the type it was deserialized into.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot unmarshal {value} into {}{expected} at offset {offset}", FieldOf(.field))]
pub struct UnmarshalTypeError {
    pub(super) value: String,
    pub(super) expected: &'static str,
    pub(super) offset: usize,
    pub(super) field: String,
}

impl UnmarshalTypeError {
    /// Description of the offending value, f.e. `array` or `integer 300`.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The type that was expected instead.
    pub fn expected(&self) -> &'static str {
        self.expected
    }

    /// Offset of the offending value's tag byte.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Dot-separated path of keys leading to the value, empty at the top level.
    pub fn field(&self) -> &str {
        &self.field
    }
}

/// The `field ... of type` part of an [`UnmarshalTypeError`], if it has a
/// field path.
struct FieldOf<'a>(&'a str);

impl fmt::Display for FieldOf<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            Ok(())
        } else {
            write!(f, "field `{}` of type ", self.0)
        }
    }
}

//! Provides [`Raw`], an already-encoded value.

use std::fmt;

use serde_core::de::{self, Deserialize, Deserializer};
use serde_core::ser::{Serialize, Serializer};

use crate::scan::{self, SyntaxError};

/// Newtype struct name that makes the serializer and deserializer treat a
/// value as raw bytes.
pub(crate) const RAW_TOKEN: &str = "$serde_php::private::Raw";

/// The exact bytes of one encoded value.
///
/// Deserializing captures the value's full span, including its tag, without
/// interpreting it. Serializing writes the bytes back verbatim after checking
/// that they form exactly one value. An empty [`Raw`] is written as null.
///
/// This is useful to defer decoding parts of a document, or to pass through
/// values this crate can't represent otherwise.
///
/// ```
/// use serde_php::Raw;
///
/// let (id, rest): (i32, Raw) = serde_php::from_slice(b"a:2:{i:0;i:7;i:1;O:1:\"X\":0:{}}")?;
/// assert_eq!(id, 7);
/// assert_eq!(rest.as_bytes(), b"O:1:\"X\":0:{}");
/// # Ok::<(), serde_php::de::Error>(())
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct Raw(Vec<u8>);

impl Raw {
    /// Wraps already-encoded bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `bytes` isn't exactly one encoded value.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, SyntaxError> {
        let bytes = bytes.into();
        scan::validate(&bytes)?;
        Ok(Self(bytes))
    }

    /// Gets the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Unwraps the encoded bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    /// Whether this holds no value at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decodes the held value.
    ///
    /// # Errors
    ///
    /// See [`from_slice`](crate::from_slice).
    pub fn decode<'de, T>(&'de self) -> Result<T, crate::de::Error>
    where
        T: Deserialize<'de>,
    {
        crate::from_slice(&self.0)
    }
}

impl AsRef<[u8]> for Raw {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

struct Bytes<'a>(&'a [u8]);

impl Serialize for Bytes<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(self.0)
    }
}

impl Serialize for Raw {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_newtype_struct(RAW_TOKEN, &Bytes(&self.0))
    }
}

impl<'de> Deserialize<'de> for Raw {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_newtype_struct(RAW_TOKEN, RawVisitor)
    }
}

struct RawVisitor;

impl<'de> de::Visitor<'de> for RawVisitor {
    type Value = Raw;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("an encoded value")
    }

    fn visit_newtype_struct<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_byte_buf(self)
    }

    fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Raw(v.to_vec()))
    }

    fn visit_byte_buf<E>(self, v: Vec<u8>) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Raw(v))
    }
}

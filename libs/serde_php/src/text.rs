//! Serializes a value through its textual representation.
//!
//! Use with `#[serde(with = "serde_php::text")]` on fields whose type
//! implements [`Display`](fmt::Display) and [`FromStr`]. The value is written
//! as a string and parsed back from one. Integers and floats in the input are
//! parsed from their literal text, and `N;` gives the [`Default`] value.
//!
//! ```
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Account {
//!     #[serde(with = "serde_php::text")]
//!     id: u64,
//! }
//!
//! let buf = serde_php::to_vec(&Account { id: 9007199254740993 })?;
//! assert_eq!(buf, b"a:1:{s:2:\"id\";s:16:\"9007199254740993\";}");
//!
//! let account: Account = serde_php::from_slice(b"a:1:{s:2:\"id\";N;}")?;
//! assert_eq!(account.id, 0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Unlike type mismatches elsewhere, text that fails to parse stops
//! deserialization.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use serde_core::de::{self, Deserializer};
use serde_core::ser::Serializer;

/// Serializes `value` as the string produced by its [`Display`](fmt::Display)
/// implementation.
///
/// # Errors
///
/// Returns an error if the serializer fails.
pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: ?Sized + fmt::Display,
    S: Serializer,
{
    serializer.collect_str(value)
}

/// Deserializes a string and parses it with [`FromStr`].
///
/// Null deserializes as `T::default()`.
///
/// # Errors
///
/// Returns an error if the deserializer fails or the text fails to parse.
pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: FromStr + Default,
    T::Err: fmt::Display,
    D: Deserializer<'de>,
{
    deserializer.deserialize_option(TextVisitor(PhantomData))
}

struct TextVisitor<T>(PhantomData<T>);

impl<'de, T> de::Visitor<'de> for TextVisitor<T>
where
    T: FromStr + Default,
    T::Err: fmt::Display,
{
    type Value = T;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a string or null")
    }

    fn visit_none<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(T::default())
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(T::default())
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(self)
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        v.parse().map_err(|err| E::custom(format!("failed to parse {v:?}: {err}")))
    }
}

//! Provides types for class-tagged values.
//!
//! PHP objects carry the name of their class. [`Object`] writes a struct or
//! map with a class name attached. [`Custom`] wraps types that produce their
//! own opaque payload, like PHP classes implementing `Serializable`.

use std::fmt;
use std::marker::PhantomData;

use serde_core::de::{self, Deserialize, Deserializer};
use serde_core::ser::{self, Serialize, SerializeTupleStruct as _, Serializer};

/// Tuple struct name for an [`Object`]: the class name, then the value.
pub(crate) const OBJECT_TOKEN: &str = "$serde_php::private::Object";

/// Tuple struct name for a [`Custom`] when serializing, and newtype struct
/// name when deserializing.
pub(crate) const CUSTOM_TOKEN: &str = "$serde_php::private::Custom";

/// Declares the PHP class name of a type.
pub trait PhpClass {
    /// The class name, f.e. `"App\\Entity\\User"`.
    const CLASS_NAME: &'static str;
}

/// Produces the opaque payload of a [`Custom`] value.
pub trait SerializePhp: PhpClass {
    /// The error returned when the payload cannot be produced.
    type Error: fmt::Display;

    /// Produces the payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized. It is reported as
    /// a [`ser::Error::Marshaler`](crate::ser::Error::Marshaler).
    fn serialize_php(&self) -> Result<Vec<u8>, Self::Error>;
}

/// Reconstructs a value from the opaque payload of a [`Custom`] value.
///
/// A null value decodes as [`Default::default`].
pub trait UnserializePhp: Default {
    /// If set, only custom values of this class are accepted. Any other class
    /// is a type mismatch and the value is left as its default.
    const EXPECTED_CLASS: Option<&'static str> = None;

    /// The error returned when the payload cannot be read.
    type Error: fmt::Display;

    /// Reads the payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is invalid. It is reported as a
    /// [`de::Error::Marshaler`](crate::de::Error::Marshaler).
    fn unserialize_php(data: &[u8]) -> Result<Self, Self::Error>;
}

/// A value serialized as an object of class [`PhpClass::CLASS_NAME`].
///
/// `T` should serialize as a struct or map. Other values are written as-is,
/// without the class name.
///
/// Deserializing accepts both arrays and objects of any class. Keys of
/// private and protected members have their prefix removed.
///
/// ```
/// use serde::Serialize;
/// use serde_php::{Object, PhpClass};
///
/// #[derive(Serialize)]
/// struct Token {
///     access_token: String,
/// }
///
/// impl PhpClass for Token {
///     const CLASS_NAME: &'static str = "token";
/// }
///
/// let token = Object(Token { access_token: "xyz".to_owned() });
/// let buf = serde_php::to_vec(&token)?;
/// assert_eq!(buf, b"O:5:\"token\":1:{s:12:\"access_token\";s:3:\"xyz\";}");
/// # Ok::<(), serde_php::ser::Error>(())
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Object<T>(pub T);

/// A value serialized as an opaque payload tagged with
/// [`PhpClass::CLASS_NAME`], via [`SerializePhp`] and [`UnserializePhp`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Custom<T>(pub T);

/// Passes a class name through the serializer as a unit struct name.
struct ClassName(&'static str);

impl Serialize for ClassName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_unit_struct(self.0)
    }
}

/// Runs the hook once the serializer asks for the payload.
struct Payload<'a, T>(&'a T);

impl<T: SerializePhp> Serialize for Payload<'_, T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let blob = self.0.serialize_php().map_err(ser::Error::custom)?;
        serializer.serialize_bytes(&blob)
    }
}

impl<T> Serialize for Object<T>
where
    T: PhpClass + Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut s = serializer.serialize_tuple_struct(OBJECT_TOKEN, 2)?;
        s.serialize_field(&ClassName(T::CLASS_NAME))?;
        s.serialize_field(&self.0)?;
        s.end()
    }
}

impl<'de, T> Deserialize<'de> for Object<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Self)
    }
}

impl<T: SerializePhp> Serialize for Custom<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut s = serializer.serialize_tuple_struct(CUSTOM_TOKEN, 2)?;
        s.serialize_field(&ClassName(T::CLASS_NAME))?;
        s.serialize_field(&Payload(&self.0))?;
        s.end()
    }
}

impl<'de, T: UnserializePhp> Deserialize<'de> for Custom<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer
            .deserialize_newtype_struct(CUSTOM_TOKEN, CustomVisitor(PhantomData))
            .map(Self)
    }
}

struct CustomVisitor<T>(PhantomData<T>);

impl<'de, T: UnserializePhp> de::Visitor<'de> for CustomVisitor<T> {
    type Value = T;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a custom value")
    }

    fn visit_newtype_struct<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        // an empty name accepts any class
        let class = T::EXPECTED_CLASS.unwrap_or("");
        deserializer.deserialize_unit_struct(class, self)
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(T::default())
    }

    fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        T::unserialize_php(v).map_err(E::custom)
    }
}

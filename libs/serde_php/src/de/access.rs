use std::str;
use std::vec;

use serde_core::de;
use serde_core::de::value::BorrowedStrDeserializer;
use serde_core::forward_to_deserialize_any;

use super::zero::Zero;
use super::{parse_int, Deserializer, Error, Head, Segment, Tag};

/// Elements of an array whose keys are `0..n` in order.
pub(super) struct SeqAccess<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    remaining: usize,
    fill: usize,
    index: usize,
}

impl<'a, 'de> SeqAccess<'a, 'de> {
    /// Reads `remaining` elements, then yields `fill` zero elements.
    pub(super) fn new(de: &'a mut Deserializer<'de>, remaining: usize, fill: usize) -> Self {
        Self {
            de,
            remaining,
            fill,
            index: 0,
        }
    }
}

impl<'de> de::SeqAccess<'de> for SeqAccess<'_, 'de> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
    where
        T: de::DeserializeSeed<'de>,
    {
        if self.remaining == 0 {
            if self.fill == 0 {
                return Ok(None);
            }

            self.fill -= 1;
            return seed.deserialize(Zero).map(Some);
        }

        self.remaining -= 1;
        self.de.index_key()?;

        self.de.path.push(Segment::Index(self.index));
        self.index += 1;
        let value = seed.deserialize(&mut *self.de);
        self.de.path.pop();
        value.map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining + self.fill)
    }
}

/// Elements of an array whose integer keys are out of order, visited by
/// index.
pub(super) struct SlotAccess<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    slots: vec::IntoIter<Option<usize>>,
    fill: usize,
    index: usize,
}

impl<'a, 'de> SlotAccess<'a, 'de> {
    pub(super) fn new(de: &'a mut Deserializer<'de>, slots: Vec<Option<usize>>, fill: usize) -> Self {
        Self {
            de,
            slots: slots.into_iter(),
            fill,
            index: 0,
        }
    }
}

impl<'de> de::SeqAccess<'de> for SlotAccess<'_, 'de> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
    where
        T: de::DeserializeSeed<'de>,
    {
        let slot = match self.slots.next() {
            Some(slot) => slot,
            None if self.fill > 0 => {
                self.fill -= 1;
                None
            },
            None => return Ok(None),
        };

        let index = self.index;
        self.index += 1;

        let Some(start) = slot else {
            return seed.deserialize(Zero).map(Some);
        };

        let mut fork = self.de.fork(start, Segment::Index(index));
        let value = seed.deserialize(&mut fork);
        self.de.join(fork);
        value.map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.slots.len() + self.fill)
    }
}

/// Strips the prefix PHP adds to the names of private and protected members.
fn strip_member_prefix<'de>(key: &'de [u8], class: Option<&[u8]>) -> &'de [u8] {
    let (Some(class), Some(rest)) = (class, key.strip_prefix(b"\0")) else {
        return key;
    };

    [class, b"*".as_slice()]
        .into_iter()
        .find_map(|owner| rest.strip_prefix(owner)?.strip_prefix(b"\0"))
        .unwrap_or(key)
}

/// Reads the next key of an array or object.
fn read_key<'de>(de: &mut Deserializer<'de>, class: Option<&[u8]>) -> Result<(Head, &'de [u8]), Error> {
    let head = de.begin()?;
    let raw = match head.tag {
        Tag::Int => de.scalar_text(&head)?,
        Tag::String => strip_member_prefix(de.string_content(&head)?, class),
        _ => return Err(Error::OutOfSync(head.start)),
    };

    Ok((head, raw))
}

/// Key-value pairs of an array or object.
pub(super) struct MapAccess<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    remaining: usize,
    class: Option<&'de [u8]>,
}

impl<'a, 'de> MapAccess<'a, 'de> {
    pub(super) fn new(de: &'a mut Deserializer<'de>, remaining: usize, class: Option<&'de [u8]>) -> Self {
        Self {
            de,
            remaining,
            class,
        }
    }
}

impl<'de> de::MapAccess<'de> for MapAccess<'_, 'de> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: de::DeserializeSeed<'de>,
    {
        if self.remaining == 0 {
            return Ok(None);
        }

        self.remaining -= 1;
        let (head, raw) = read_key(self.de, self.class)?;
        self.de.path.push(Segment::Key(raw));
        seed.deserialize(KeyDeserializer {
            de: &mut *self.de,
            head,
            raw,
        })
        .map(Some)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: de::DeserializeSeed<'de>,
    {
        let value = seed.deserialize(&mut *self.de);
        self.de.path.pop();
        value
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}

/// Deserializes the key of a pair.
///
/// Keys are always either integers or strings on the wire, but are accepted
/// for either kind of key type where that makes sense.
struct KeyDeserializer<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    head: Head,
    raw: &'de [u8],
}

impl KeyDeserializer<'_, '_> {
    fn integer<T>(&mut self, expected: &'static str) -> T
    where
        T: TryFrom<i128> + Default,
    {
        match parse_int(self.raw).and_then(|v| T::try_from(v).ok()) {
            Some(v) => v,
            None => {
                let value = format!("key {}", String::from_utf8_lossy(self.raw));
                self.de.record(self.head.start, value, expected);
                T::default()
            },
        }
    }
}

macro_rules! deserialize_integer_key {
    ($($method:ident => $visit:ident($Ty:ty),)*) => { $(
        fn $method<V>(mut self, visitor: V) -> Result<V::Value, Self::Error>
        where
            V: de::Visitor<'de>,
        {
            let v = self.integer::<$Ty>(stringify!($Ty));
            visitor.$visit(v)
        }
    )* };
}

impl<'de> de::Deserializer<'de> for KeyDeserializer<'_, 'de> {
    type Error = Error;

    fn deserialize_any<V>(mut self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        match self.head.tag {
            Tag::Int => {
                let v = self.integer::<i64>("i64");
                visitor.visit_i64(v)
            },
            _ => match str::from_utf8(self.raw) {
                Ok(v) => visitor.visit_borrowed_str(v),
                Err(_) => visitor.visit_borrowed_bytes(self.raw),
            },
        }
    }

    deserialize_integer_key! {
        deserialize_i8 => visit_i8(i8),
        deserialize_i16 => visit_i16(i16),
        deserialize_i32 => visit_i32(i32),
        deserialize_i64 => visit_i64(i64),
        deserialize_i128 => visit_i128(i128),
        deserialize_u8 => visit_u8(u8),
        deserialize_u16 => visit_u16(u16),
        deserialize_u32 => visit_u32(u32),
        deserialize_u64 => visit_u64(u64),
        deserialize_u128 => visit_u128(u128),
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        match str::from_utf8(self.raw) {
            Ok(v) => visitor.visit_borrowed_str(v),
            Err(_) => {
                let value = "key with invalid utf-8".to_owned();
                self.de.record(self.head.start, value, "str");
                visitor.visit_borrowed_str("")
            },
        }
    }

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_str(visitor)
    }

    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_borrowed_bytes(self.raw)
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_borrowed_bytes(self.raw)
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        let variant = str::from_utf8(self.raw).map_err(|_| {
            let value = "key with invalid utf-8".to_owned();
            self.de.type_error(self.head.start, value, name)
        })?;
        visitor.visit_enum(BorrowedStrDeserializer::new(variant))
    }

    forward_to_deserialize_any! {
        bool f32 f64 char unit unit_struct seq tuple tuple_struct map struct ignored_any
    }
}

/// An enum variant stored as a single-pair array.
pub(super) struct VariantAccess<'a, 'de> {
    de: &'a mut Deserializer<'de>,
}

impl<'a, 'de> VariantAccess<'a, 'de> {
    pub(super) fn new(de: &'a mut Deserializer<'de>) -> Self {
        Self { de }
    }
}

impl<'de> de::EnumAccess<'de> for VariantAccess<'_, 'de> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant), Self::Error>
    where
        V: de::DeserializeSeed<'de>,
    {
        let (head, raw) = read_key(self.de, None)?;
        let value = seed.deserialize(KeyDeserializer {
            de: &mut *self.de,
            head,
            raw,
        })?;
        Ok((value, self))
    }
}

impl<'de> de::VariantAccess<'de> for VariantAccess<'_, 'de> {
    type Error = Error;

    fn unit_variant(self) -> Result<(), Self::Error> {
        self.de.skip()
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value, Self::Error>
    where
        T: de::DeserializeSeed<'de>,
    {
        seed.deserialize(self.de)
    }

    fn tuple_variant<V>(self, len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_tuple(self.de, len, visitor)
    }

    fn struct_variant<V>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_struct(self.de, "", fields, visitor)
    }
}

/// The contents of a custom value, handed to
/// [`UnserializePhp`](crate::UnserializePhp) implementations.
///
/// Asking for a unit struct named after a class checks the class name first.
/// On a mismatch, the visitor gets a unit instead and the mismatch is
/// recorded. Everything else visits the blob as bytes.
pub(super) struct CustomPayload<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    offset: usize,
    class: &'de [u8],
    blob: &'de [u8],
}

impl<'a, 'de> CustomPayload<'a, 'de> {
    pub(super) fn new(
        de: &'a mut Deserializer<'de>,
        offset: usize,
        class: &'de [u8],
        blob: &'de [u8],
    ) -> Self {
        Self {
            de,
            offset,
            class,
            blob,
        }
    }

    fn unserialize<V>(self, visitor: V) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        visitor
            .visit_borrowed_bytes(self.blob)
            .map_err(|err| match err {
                Error::Custom(message) => Error::Marshaler {
                    class: String::from_utf8_lossy(self.class).into_owned(),
                    message,
                },
                err => err,
            })
    }
}

impl<'de> de::Deserializer<'de> for CustomPayload<'_, 'de> {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.unserialize(visitor)
    }

    fn deserialize_unit_struct<V>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        if !name.is_empty() && name.as_bytes() != self.class {
            let value = format!(
                "custom value of class {:?}",
                String::from_utf8_lossy(self.class)
            );
            self.de.record(self.offset, value, name);
            return visitor.visit_unit();
        }

        self.unserialize(visitor)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit newtype_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    }
}

//! Exposes a deserializer and deserialization helper methods.
//!
//! Deserialization is lenient in the same way PHP's own `unserialize` users
//! tend to expect: a value that does not fit its destination is skipped, the
//! destination gets its zero value, and the first such mismatch is reported
//! once the whole input was processed. Malformed input, on the other hand,
//! fails immediately.
//!
//! Enums are the exception to the lenient rule. An enum has no zero value to
//! fall back on, so a variant that is not a string or a one-pair array stops
//! deserialization with [`Error::Type`].

use std::str;

use serde_core::de;
use serde_core::de::value::{BorrowedBytesDeserializer, BorrowedStrDeserializer};

use crate::class::CUSTOM_TOKEN;
use crate::raw::RAW_TOKEN;
use crate::scan::{self, Scanner, Step, SyntaxError};

mod access;
mod error;
mod zero;

use access::{CustomPayload, MapAccess, SeqAccess, SlotAccess, VariantAccess};
pub use error::{Error, UnmarshalTypeError};
use zero::Zero;

/// How many arrays and objects may be nested within each other.
pub const MAX_DEPTH: usize = 256;

/// Deserializes a value from a byte slice.
///
/// The input must hold exactly one value. It is validated in full before
/// anything is deserialized.
///
/// # Errors
///
/// Returns the first error encountered. This includes
/// [`Error::Type`] if any part of the input did not fit `T`, even though
/// deserialization continued past it. Use [`from_slice_into`] to keep the
/// partially deserialized value in that case.
pub fn from_slice<'de, T>(data: &'de [u8]) -> Result<T, Error>
where
    T: de::Deserialize<'de>,
{
    scan::validate(data)?;
    let mut de = Deserializer::from_slice(data);
    let value = T::deserialize(&mut de)?;
    de.end()?;
    Ok(value)
}

/// Deserializes a value from a byte slice into an existing place.
///
/// Unlike [`from_slice`], `dest` is overwritten with the best-effort value
/// when parts of the input did not fit, with the mismatched parts left at
/// their zero value.
///
/// # Errors
///
/// Returns the first error encountered. `dest` is only left untouched if the
/// error is something other than [`Error::Type`].
pub fn from_slice_into<'de, T>(data: &'de [u8], dest: &mut T) -> Result<(), Error>
where
    T: de::Deserialize<'de>,
{
    scan::validate(data)?;
    let mut de = Deserializer::from_slice(data);
    *dest = T::deserialize(&mut de)?;
    de.end()
}

/// The shape of a value, as determined by its tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Null,
    Bool,
    Int,
    Float,
    String,
    Array,
    Object,
    Custom,
}

impl Tag {
    fn describe(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
            Self::Custom => "custom value",
        }
    }
}

/// A value whose tag byte was just consumed.
#[derive(Debug, Clone, Copy)]
struct Head {
    tag: Tag,
    start: usize,
    depth: usize,
}

/// One step of the path to the value currently being deserialized.
#[derive(Debug, Clone, Copy)]
enum Segment<'de> {
    Index(usize),
    Key(&'de [u8]),
}

/// Where the elements of an array go when deserialized as a sequence.
enum Layout {
    /// The keys are exactly `0..n` in order.
    Ordered,
    /// Only integer keys, but not in order. Holds the offset of the value for
    /// each index, if any.
    Sparse(Vec<Option<usize>>),
    /// There is a string key at this offset.
    Keyed(usize),
}

/// A [`Deserializer`] for the PHP serialization format. The trait is only
/// implemented by `&mut`.
///
/// [`Deserializer`]: serde_core::de::Deserializer
#[derive(Debug)]
pub struct Deserializer<'de> {
    data: &'de [u8],
    off: usize,
    scan: Scanner,
    saved: Option<UnmarshalTypeError>,
    path: Vec<Segment<'de>>,
    depth: usize,
}

impl<'de> Deserializer<'de> {
    /// Creates a new deserializer that reads values from a slice.
    ///
    /// The input is not validated upfront. Consecutive values may be read
    /// from the same deserializer, checking [`Self::remainder`] in between.
    ///
    /// # Examples
    ///
    /// ```
    /// # use serde_php::de::{Deserializer, Error};
    /// # use serde::de::Deserialize;
    /// # fn example() -> Result<Vec<i32>, Error> {
    /// let buf = b"i:1;i:2;i:3;";
    /// let mut out = Vec::new();
    /// let mut de = Deserializer::from_slice(buf);
    /// while !de.remainder().is_empty() {
    ///     out.push(i32::deserialize(&mut de)?);
    /// }
    /// # Ok(out)
    /// # }
    /// # assert_eq!(example().expect("must succeed"), vec![1, 2, 3]);
    /// ```
    pub fn from_slice(data: &'de [u8]) -> Self {
        Self {
            data,
            off: 0,
            scan: Scanner::new(),
            saved: None,
            path: Vec::new(),
            depth: 0,
        }
    }

    /// Gets the remaining unread part of the slice.
    pub fn remainder(&self) -> &'de [u8] {
        self.data.get(self.off..).unwrap_or_default()
    }

    /// Takes the first type mismatch recorded so far, if any.
    pub fn take_error(&mut self) -> Option<UnmarshalTypeError> {
        self.saved.take()
    }

    /// Finishes deserialization.
    ///
    /// # Errors
    ///
    /// Returns a [`SyntaxError`] if any input is left, and otherwise the
    /// first recorded type mismatch.
    pub fn end(self) -> Result<(), Error> {
        if let Some(&c) = self.data.get(self.off) {
            let offset = self.off as u64;
            return Err(SyntaxError::new(c, "after top-level value", offset).into());
        }

        match self.saved {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Creates a deserializer for the single value starting at `start`,
    /// sharing this one's context.
    fn fork(&self, start: usize, segment: Segment<'de>) -> Self {
        let mut path = self.path.clone();
        path.push(segment);
        Self {
            data: self.data,
            off: start,
            scan: Scanner::new(),
            saved: None,
            path,
            depth: self.depth,
        }
    }

    fn join(&mut self, fork: Self) {
        if self.saved.is_none() {
            self.saved = fork.saved;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.off).copied()
    }

    fn next_step(&mut self) -> Result<Step, Error> {
        match self.data.get(self.off) {
            Some(&c) => {
                let step = self.scan.step(c)?;
                self.off += 1;
                Ok(step)
            },
            None => {
                self.scan.eof()?;
                Ok(Step::End)
            },
        }
    }

    fn scan_until(&mut self, want: Step) -> Result<(), Error> {
        loop {
            match self.next_step()? {
                step if step == want => return Ok(()),
                Step::End => return Err(Error::OutOfSync(self.off)),
                _ => {},
            }
        }
    }

    /// Consumes the tag byte of the next value.
    fn begin(&mut self) -> Result<Head, Error> {
        if self.scan.is_done() {
            self.scan.reset();
        }

        let depth = self.scan.depth();
        let start = self.off;
        let tag = match (self.next_step()?, self.data.get(start)) {
            (Step::BeginScalar, Some(b'N')) => Tag::Null,
            (Step::BeginScalar, Some(b'b')) => Tag::Bool,
            (Step::BeginScalar, Some(b'i')) => Tag::Int,
            (Step::BeginScalar, Some(b'd')) => Tag::Float,
            (Step::BeginScalar, Some(b's')) => Tag::String,
            (Step::BeginArray, _) => Tag::Array,
            (Step::BeginObject, _) => Tag::Object,
            (Step::BeginCustom, _) => Tag::Custom,
            _ => return Err(Error::OutOfSync(start)),
        };

        Ok(Head { tag, start, depth })
    }

    /// Consumes the rest of a value.
    fn finish(&mut self, head: &Head) -> Result<(), Error> {
        while self.scan.depth() > head.depth {
            self.next_step()?;
        }

        Ok(())
    }

    /// Consumes an entire value without looking at it.
    fn skip(&mut self) -> Result<(), Error> {
        let head = self.begin()?;
        self.finish(&head)
    }

    /// Consumes the rest of a bool, integer or float, returning its payload.
    fn scalar_text(&mut self, head: &Head) -> Result<&'de [u8], Error> {
        let mut start = None;
        loop {
            match self.next_step()? {
                Step::InScalar if start.is_none() => start = Some(self.off - 1),
                Step::EndScalar | Step::End => break,
                _ => {},
            }
        }

        let end = self.off - 1;
        match start {
            Some(start) => self
                .data
                .get(start..end)
                .ok_or(Error::OutOfSync(head.start)),
            None => Ok(&[]),
        }
    }

    /// Consumes the rest of a string, returning its content.
    fn string_content(&mut self, head: &Head) -> Result<&'de [u8], Error> {
        self.scan_until(Step::EndLength)?;
        let len = self.scan.last_length().ok_or(Error::OutOfSync(head.start))?;

        // skip the opening quote
        let start = self.off + 1;
        self.finish(head)?;
        self.data
            .get(start..start + len)
            .ok_or(Error::OutOfSync(head.start))
    }

    fn bool_value(&mut self, head: &Head) -> Result<bool, Error> {
        Ok(self.scalar_text(head)? == b"1")
    }

    /// Consumes the class name of an object or custom value.
    fn class_name(&mut self, head: &Head) -> Result<&'de [u8], Error> {
        self.scan_until(Step::EndLength)?;
        let start = self.off + 1;
        self.scan_until(Step::EndClassName)?;
        self.data
            .get(start..self.off - 1)
            .ok_or(Error::OutOfSync(head.start))
    }

    /// Consumes the rest of a custom value after its class name, returning
    /// its blob.
    fn custom_blob(&mut self, head: &Head) -> Result<&'de [u8], Error> {
        self.scan_until(Step::EndLength)?;
        let len = self.scan.last_length().ok_or(Error::OutOfSync(head.start))?;

        // skip the opening brace
        self.next_step()?;
        let start = self.off;
        self.finish(head)?;

        let end = self.off - 1;
        if end.checked_sub(start) != Some(len) {
            return Err(Error::OutOfSync(head.start));
        }

        self.data.get(start..end).ok_or(Error::OutOfSync(head.start))
    }

    /// Consumes the header of an array or object, up to and including the
    /// opening brace. Returns the pair count and class name.
    fn open(&mut self, head: &Head) -> Result<(usize, Option<&'de [u8]>), Error> {
        let class = match head.tag {
            Tag::Object => Some(self.class_name(head)?),
            _ => None,
        };

        self.scan_until(Step::EndPairCount)?;
        let pairs = self.scan.last_length().ok_or(Error::OutOfSync(head.start))? / 2;
        self.next_step()?;

        if self.depth >= MAX_DEPTH {
            return Err(Error::DepthLimitExceeded(head.start));
        }

        self.depth += 1;
        Ok((pairs, class))
    }

    /// Consumes the remaining pairs of an array or object and its closing
    /// brace.
    fn close(&mut self, head: &Head) -> Result<(), Error> {
        self.finish(head)?;
        self.depth -= 1;
        Ok(())
    }

    /// Determines how the keys of an array map to sequence indices, without
    /// consuming anything.
    fn layout(&mut self, pairs: usize) -> Result<Layout, Error> {
        let (scan, off) = (self.scan.clone(), self.off);
        let mut slots: Option<Vec<Option<usize>>> = None;
        let mut position = 0;

        let layout = loop {
            if position == pairs {
                break slots.take().map_or(Layout::Ordered, Layout::Sparse);
            }

            let head = self.begin()?;
            if head.tag != Tag::Int {
                break Layout::Keyed(head.start);
            }

            let index = parse_int(self.scalar_text(&head)?).and_then(|i| usize::try_from(i).ok());
            match slots.as_mut() {
                None if index == Some(position) => {},
                None => {
                    // start over, this time remembering where each value is
                    self.scan.clone_from(&scan);
                    self.off = off;
                    slots = Some(vec![None; pairs.min(self.data.len())]);
                    position = 0;
                    continue;
                },
                Some(slots) => {
                    if let Some(slot) = index.and_then(|i| slots.get_mut(i)) {
                        *slot = Some(self.off);
                    }
                },
            }

            self.skip()?;
            position += 1;
        };

        self.scan = scan;
        self.off = off;
        Ok(layout)
    }

    fn field_path(&self) -> String {
        let mut path = String::new();
        for segment in &self.path {
            if !path.is_empty() {
                path.push('.');
            }

            match *segment {
                Segment::Index(index) => path.push_str(&index.to_string()),
                Segment::Key(key) => path.push_str(&String::from_utf8_lossy(key)),
            }
        }

        path
    }

    fn type_error(&self, offset: usize, value: String, expected: &'static str) -> UnmarshalTypeError {
        UnmarshalTypeError {
            value,
            expected,
            offset,
            field: self.field_path(),
        }
    }

    /// Remembers a type mismatch, unless one was already recorded.
    fn record(&mut self, offset: usize, value: String, expected: &'static str) {
        if self.saved.is_none() {
            self.saved = Some(self.type_error(offset, value, expected));
        }
    }

    /// Records a type mismatch for a value whose tag was just consumed and
    /// skips the rest of it.
    fn mismatch(&mut self, head: &Head, expected: &'static str) -> Result<(), Error> {
        self.record(head.start, head.tag.describe().to_owned(), expected);
        self.finish(head)
    }

    fn integer<T>(&mut self, expected: &'static str) -> Result<T, Error>
    where
        T: TryFrom<i128> + Default,
    {
        let head = self.begin()?;
        let text = match head.tag {
            Tag::Int | Tag::Float => self.scalar_text(&head)?,
            Tag::Null => {
                self.finish(&head)?;
                return Ok(T::default());
            },
            _ => {
                self.mismatch(&head, expected)?;
                return Ok(T::default());
            },
        };

        let value = match head.tag {
            Tag::Int => parse_int(text),
            _ => parse_float(text).and_then(truncate),
        };

        match value.and_then(|v| T::try_from(v).ok()) {
            Some(v) => Ok(v),
            None => {
                self.record(head.start, describe_scalar(head.tag, text), expected);
                Ok(T::default())
            },
        }
    }

    fn float(&mut self, max: f64, expected: &'static str) -> Result<f64, Error> {
        let head = self.begin()?;
        let text = match head.tag {
            Tag::Int | Tag::Float => self.scalar_text(&head)?,
            Tag::Null => {
                self.finish(&head)?;
                return Ok(0.0);
            },
            _ => {
                self.mismatch(&head, expected)?;
                return Ok(0.0);
            },
        };

        match parse_float(text).filter(|v| v.is_finite() && v.abs() <= max) {
            Some(v) => Ok(v),
            None => {
                self.record(head.start, describe_scalar(head.tag, text), expected);
                Ok(0.0)
            },
        }
    }

    fn index_key(&mut self) -> Result<(), Error> {
        let head = self.begin()?;
        if head.tag != Tag::Int {
            return Err(Error::NonIntegerIndex(head.start));
        }

        self.finish(&head)
    }

    fn sequence<V>(&mut self, head: &Head, len: Option<usize>, visitor: V) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        let (pairs, _) = self.open(head)?;
        let value = match self.layout(pairs)? {
            Layout::Ordered => {
                let take = len.map_or(pairs, |len| len.min(pairs));
                let fill = len.map_or(0, |len| len.saturating_sub(pairs));
                visitor.visit_seq(SeqAccess::new(self, take, fill))?
            },
            Layout::Sparse(mut slots) => {
                if let Some(len) = len {
                    slots.truncate(len);
                }

                let fill = len.map_or(0, |len| len.saturating_sub(slots.len()));
                visitor.visit_seq(SlotAccess::new(self, slots, fill))?
            },
            Layout::Keyed(offset) => return Err(Error::NonIntegerIndex(offset)),
        };

        self.close(head)?;
        Ok(value)
    }

    fn custom<V>(&mut self, visitor: V) -> Result<V::Value, Error>
    where
        V: de::Visitor<'de>,
    {
        let head = self.begin()?;
        match head.tag {
            Tag::Custom => {
                let class = self.class_name(&head)?;
                let blob = self.custom_blob(&head)?;
                visitor.visit_newtype_struct(CustomPayload::new(self, head.start, class, blob))
            },
            Tag::Null => {
                self.finish(&head)?;
                visitor.visit_newtype_struct(Zero)
            },
            _ => {
                self.mismatch(&head, "custom value")?;
                visitor.visit_newtype_struct(Zero)
            },
        }
    }
}

fn parse_int(text: &[u8]) -> Option<i128> {
    str::from_utf8(text).ok()?.parse().ok()
}

fn parse_float(text: &[u8]) -> Option<f64> {
    str::from_utf8(text).ok()?.parse().ok()
}

/// Truncates toward zero.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn truncate(v: f64) -> Option<i128> {
    let v = v.trunc();
    (v.is_finite() && v >= i128::MIN as f64 && v < i128::MAX as f64).then_some(v as i128)
}

fn describe_scalar(tag: Tag, text: &[u8]) -> String {
    format!("{} {}", tag.describe(), String::from_utf8_lossy(text))
}

fn single_char(bytes: &[u8]) -> Option<char> {
    let mut chars = str::from_utf8(bytes).ok()?.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

macro_rules! deserialize_integer {
    ($($method:ident => $visit:ident($Ty:ty),)*) => { $(
        fn $method<V>(self, visitor: V) -> Result<V::Value, Self::Error>
        where
            V: de::Visitor<'de>,
        {
            let v = self.integer::<$Ty>(stringify!($Ty))?;
            visitor.$visit(v)
        }
    )* };
}

// implemented by mut so nested values share the scanner and error state
impl<'de> de::Deserializer<'de> for &mut Deserializer<'de> {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        let head = self.begin()?;
        match head.tag {
            Tag::Null => {
                self.finish(&head)?;
                visitor.visit_unit()
            },
            Tag::Bool => {
                let v = self.bool_value(&head)?;
                visitor.visit_bool(v)
            },
            Tag::Int => {
                let text = self.scalar_text(&head)?;
                match parse_int(text).and_then(|v| i64::try_from(v).ok()) {
                    Some(v) => visitor.visit_i64(v),
                    None => {
                        self.record(head.start, describe_scalar(head.tag, text), "i64");
                        visitor.visit_i64(0)
                    },
                }
            },
            Tag::Float => {
                let text = self.scalar_text(&head)?;
                match parse_float(text).filter(|v| v.is_finite()) {
                    Some(v) => visitor.visit_f64(v),
                    None => {
                        self.record(head.start, describe_scalar(head.tag, text), "f64");
                        visitor.visit_f64(0.0)
                    },
                }
            },
            Tag::String => {
                let bytes = self.string_content(&head)?;
                match str::from_utf8(bytes) {
                    Ok(v) => visitor.visit_borrowed_str(v),
                    Err(_) => visitor.visit_borrowed_bytes(bytes),
                }
            },
            Tag::Array | Tag::Object => {
                let (pairs, class) = self.open(&head)?;
                let value = match self.layout(pairs)? {
                    Layout::Ordered => visitor.visit_seq(SeqAccess::new(self, pairs, 0))?,
                    Layout::Sparse(_) | Layout::Keyed(_) => {
                        visitor.visit_map(MapAccess::new(self, pairs, class))?
                    },
                };

                self.close(&head)?;
                Ok(value)
            },
            Tag::Custom => {
                self.mismatch(&head, "dynamic value")?;
                visitor.visit_unit()
            },
        }
    }

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        let head = self.begin()?;
        let v = match head.tag {
            Tag::Bool => self.bool_value(&head)?,
            Tag::Null => {
                self.finish(&head)?;
                false
            },
            _ => {
                self.mismatch(&head, "bool")?;
                false
            },
        };

        visitor.visit_bool(v)
    }

    deserialize_integer! {
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

    #[allow(clippy::cast_possible_truncation)]
    fn deserialize_f32<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        let v = self.float(f64::from(f32::MAX), "f32")?;
        visitor.visit_f32(v as f32)
    }

    fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        let v = self.float(f64::MAX, "f64")?;
        visitor.visit_f64(v)
    }

    fn deserialize_char<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        let head = self.begin()?;
        let v = match head.tag {
            Tag::String => {
                let bytes = self.string_content(&head)?;
                single_char(bytes).unwrap_or_else(|| {
                    self.record(head.start, format!("string of length {}", bytes.len()), "char");
                    '\0'
                })
            },
            Tag::Null => {
                self.finish(&head)?;
                '\0'
            },
            _ => {
                self.mismatch(&head, "char")?;
                '\0'
            },
        };

        visitor.visit_char(v)
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        let head = self.begin()?;
        match head.tag {
            Tag::String => {
                let bytes = self.string_content(&head)?;
                if let Ok(v) = str::from_utf8(bytes) {
                    return visitor.visit_borrowed_str(v);
                }

                self.record(head.start, "string with invalid utf-8".to_owned(), "str");
            },
            Tag::Int | Tag::Float => {
                // the scanner only lets ascii through here
                let text = self.scalar_text(&head)?;
                let v = str::from_utf8(text).map_err(|_| Error::OutOfSync(head.start))?;
                return visitor.visit_borrowed_str(v);
            },
            Tag::Null => self.finish(&head)?,
            _ => self.mismatch(&head, "str")?,
        }

        visitor.visit_borrowed_str("")
    }

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        let head = self.begin()?;
        match head.tag {
            Tag::String => {
                let v = self.string_content(&head)?;
                return visitor.visit_borrowed_bytes(v);
            },
            Tag::Null => self.finish(&head)?,
            _ => self.mismatch(&head, "bytes")?,
        }

        visitor.visit_borrowed_bytes(&[])
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        if self.peek() == Some(b'N') {
            self.skip()?;
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        let head = self.begin()?;
        match head.tag {
            Tag::Null => self.finish(&head)?,
            _ => self.mismatch(&head, "null")?,
        }

        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        match name {
            RAW_TOKEN => {
                let head = self.begin()?;
                self.finish(&head)?;
                let raw = self
                    .data
                    .get(head.start..self.off)
                    .ok_or(Error::OutOfSync(head.start))?;
                visitor.visit_newtype_struct(BorrowedBytesDeserializer::new(raw))
            },
            CUSTOM_TOKEN => self.custom(visitor),
            _ => visitor.visit_newtype_struct(self),
        }
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        let head = self.begin()?;
        match head.tag {
            Tag::Array => self.sequence(&head, None, visitor),
            Tag::Null => {
                self.finish(&head)?;
                de::Deserializer::deserialize_seq(Zero, visitor)
            },
            _ => {
                self.mismatch(&head, "sequence")?;
                de::Deserializer::deserialize_seq(Zero, visitor)
            },
        }
    }

    fn deserialize_tuple<V>(self, len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        let head = self.begin()?;
        match head.tag {
            Tag::Array => self.sequence(&head, Some(len), visitor),
            Tag::Null => {
                self.finish(&head)?;
                de::Deserializer::deserialize_tuple(Zero, len, visitor)
            },
            _ => {
                self.mismatch(&head, "tuple")?;
                de::Deserializer::deserialize_tuple(Zero, len, visitor)
            },
        }
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_tuple(len, visitor)
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        let head = self.begin()?;
        match head.tag {
            Tag::Array | Tag::Object => {
                let (pairs, class) = self.open(&head)?;
                let value = visitor.visit_map(MapAccess::new(self, pairs, class))?;
                self.close(&head)?;
                Ok(value)
            },
            Tag::Null => {
                self.finish(&head)?;
                de::Deserializer::deserialize_map(Zero, visitor)
            },
            _ => {
                self.mismatch(&head, "map")?;
                de::Deserializer::deserialize_map(Zero, visitor)
            },
        }
    }

    fn deserialize_struct<V>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        let head = self.begin()?;
        match head.tag {
            Tag::Array | Tag::Object => {
                let (pairs, class) = self.open(&head)?;
                let value = visitor.visit_map(MapAccess::new(self, pairs, class))?;
                self.close(&head)?;
                Ok(value)
            },
            Tag::Null => {
                self.finish(&head)?;
                de::Deserializer::deserialize_struct(Zero, name, fields, visitor)
            },
            _ => {
                self.mismatch(&head, name)?;
                de::Deserializer::deserialize_struct(Zero, name, fields, visitor)
            },
        }
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
        let head = self.begin()?;
        match head.tag {
            Tag::String => {
                let bytes = self.string_content(&head)?;
                let variant = str::from_utf8(bytes).map_err(|_| {
                    self.type_error(head.start, "string with invalid utf-8".to_owned(), name)
                })?;
                visitor.visit_enum(BorrowedStrDeserializer::new(variant))
            },
            Tag::Array => {
                let (pairs, _) = self.open(&head)?;
                if pairs != 1 {
                    let value = format!("array of {pairs} pairs");
                    return Err(self.type_error(head.start, value, name).into());
                }

                let value = visitor.visit_enum(VariantAccess::new(self))?;
                self.close(&head)?;
                Ok(value)
            },
            tag => Err(self.type_error(head.start, tag.describe().to_owned(), name).into()),
        }
    }

    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        self.skip()?;
        visitor.visit_unit()
    }
}

//! Exposes a serializer and serialization helper methods.

use std::io;
use std::ops::Range;

use serde_core::ser;

use crate::class::{CUSTOM_TOKEN, OBJECT_TOKEN};
use crate::raw::RAW_TOKEN;
use crate::scan;

mod cache;
mod capture;
mod error;
mod float;
mod pool;

use capture::{BytesCapture, ClassCapture, KeySerializer};
pub use error::Error;
use pool::PooledBuf;

/// Settings that change how values are encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct Options {
    /// The number of significant digits floats are written with.
    ///
    /// If [`None`], which is the default, floats are written with the
    /// fewest digits that still read back as the same value. Values above
    /// [`Options::MAX_FLOAT_PRECISION`] are treated as that maximum.
    pub float_precision: Option<usize>,
}

impl Options {
    /// The most significant digits a float is written with. Every finite
    /// [`f64`] is written exactly with this many.
    pub const MAX_FLOAT_PRECISION: usize = 1100;

    /// Sets [`Options::float_precision`].
    ///
    /// PHP's `serialize_precision` setting corresponds to this, with its
    /// default of `-1` being [`Options::default`].
    #[must_use]
    pub fn with_float_precision(mut self, precision: usize) -> Self {
        self.float_precision = Some(precision.min(Self::MAX_FLOAT_PRECISION));
        self
    }
}

/// Serializes a value to a [`Vec<u8>`].
///
/// The resulting buffer will have exactly the length required.
///
/// # Errors
///
/// Returns an error if the value contains something that cannot be encoded,
/// f.e. a NaN float or a map with sequences as keys.
pub fn to_vec<T>(value: &T) -> Result<Vec<u8>, Error>
where
    T: ?Sized + ser::Serialize,
{
    to_vec_with_options(value, Options::default())
}

/// Serializes a value to a [`Vec<u8>`] with the specified options.
///
/// # Errors
///
/// See [`to_vec`].
pub fn to_vec_with_options<T>(value: &T, options: Options) -> Result<Vec<u8>, Error>
where
    T: ?Sized + ser::Serialize,
{
    let buf = encode(value, options)?;
    Ok(buf.to_vec())
}

/// Serializes a value to a [`io::Write`].
///
/// The value is encoded completely before anything is written, so the writer
/// never sees a partial value.
///
/// # Errors
///
/// See [`to_vec`]. Also returns an error if writing fails.
pub fn to_writer<T, W>(writer: W, value: &T) -> Result<(), Error>
where
    T: ?Sized + ser::Serialize,
    W: io::Write,
{
    to_writer_with_options(writer, value, Options::default())
}

/// Serializes a value to a [`io::Write`] with the specified options.
///
/// # Errors
///
/// See [`to_writer`].
pub fn to_writer_with_options<T, W>(mut writer: W, value: &T, options: Options) -> Result<(), Error>
where
    T: ?Sized + ser::Serialize,
    W: io::Write,
{
    let buf = encode(value, options)?;
    Ok(writer.write_all(&buf)?)
}

fn encode<T>(value: &T, options: Options) -> Result<PooledBuf, Error>
where
    T: ?Sized + ser::Serialize,
{
    let mut buf = pool::take();
    value.serialize(&mut Serializer::with_options(&mut *buf, options))?;
    Ok(buf)
}

/// A [`Serializer`] for PHP's `serialize` format. The trait is only
/// implemented by `&mut`, so the same serializer can write several values
/// back to back.
///
/// Output is written to the writer as it is produced. Use [`to_writer`] to
/// avoid partial output if encoding fails halfway.
///
/// [`Serializer`]: serde_core::ser::Serializer
#[derive(Debug)]
pub struct Serializer<W> {
    writer: W,
    options: Options,
    /// Set while serializing the contents of an [`Object`](crate::Object).
    class: Option<&'static str>,
}

impl<W> Serializer<W> {
    /// Unwraps the serializer into its inner writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

impl<W: io::Write> Serializer<W> {
    /// Creates a new serializer that writes values to a [`io::Write`].
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, Options::default())
    }

    /// Creates a new serializer with the specified options.
    pub fn with_options(writer: W, options: Options) -> Self {
        Self {
            writer,
            options,
            class: None,
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
        Ok(self.writer.write_all(bytes)?)
    }

    fn int(&mut self, v: impl std::fmt::Display) -> Result<(), Error> {
        Ok(write!(self.writer, "i:{v};")?)
    }

    fn float<F>(&mut self, v: F, finite: bool) -> Result<(), Error>
    where
        F: std::fmt::LowerExp + std::fmt::Display,
    {
        if !finite {
            return Err(Error::UnsupportedValue(v.to_string()));
        }

        let mut buf = Vec::with_capacity(32);
        buf.extend_from_slice(b"d:");
        float::write(&mut buf, v, self.options.float_precision);
        buf.push(b';');
        self.write(&buf)
    }

    /// Writes the `a:1:{` prefix and key of a variant with data.
    fn variant(&mut self, variant: &'static str) -> Result<(), Error> {
        self.class = None;
        self.write(b"a:1:{")?;
        self.write(cache::string(variant))
    }

    /// Writes the header of an array with `len` pairs.
    fn header(&mut self, len: usize) -> Result<(), Error> {
        self.class = None;
        Ok(write!(self.writer, "a:{len}:{{")?)
    }

    /// Like [`Self::header`], but writes an object header instead if a class
    /// name is pending.
    fn keyed_header(&mut self, len: usize) -> Result<(), Error> {
        match self.class.take() {
            Some(class) => {
                self.write(cache::object(class))?;
                Ok(write!(self.writer, "{len}:{{")?)
            },
            None => self.header(len),
        }
    }

    fn raw<T>(&mut self, value: &T) -> Result<(), Error>
    where
        T: ?Sized + ser::Serialize,
    {
        let raw = value.serialize(BytesCapture)?;
        if raw.is_empty() {
            return self.write(b"N;");
        }

        scan::validate(&raw).map_err(|err| Error::Marshaler {
            class: "",
            message: err.to_string(),
        })?;
        self.write(&raw)
    }
}

// implemented by mut so nested values reuse the same serializer type
impl<'a, W: io::Write> ser::Serializer for &'a mut Serializer<W> {
    type Ok = ();
    type Error = Error;

    type SerializeSeq = SerializeList<'a, W>;
    type SerializeTuple = SerializeList<'a, W>;
    type SerializeTupleStruct = SerializeTupleStruct<'a, W>;
    type SerializeTupleVariant = SerializeList<'a, W>;
    type SerializeMap = SerializeMap<'a, W>;
    type SerializeStruct = SerializeStruct<'a, W>;
    type SerializeStructVariant = SerializeStruct<'a, W>;

    fn serialize_bool(self, v: bool) -> Result<Self::Ok, Self::Error> {
        self.write(if v { b"b:1;" } else { b"b:0;" })
    }

    fn serialize_i8(self, v: i8) -> Result<Self::Ok, Self::Error> {
        self.int(v)
    }

    fn serialize_i16(self, v: i16) -> Result<Self::Ok, Self::Error> {
        self.int(v)
    }

    fn serialize_i32(self, v: i32) -> Result<Self::Ok, Self::Error> {
        self.int(v)
    }

    fn serialize_i64(self, v: i64) -> Result<Self::Ok, Self::Error> {
        self.int(v)
    }

    fn serialize_i128(self, v: i128) -> Result<Self::Ok, Self::Error> {
        self.int(v)
    }

    fn serialize_u8(self, v: u8) -> Result<Self::Ok, Self::Error> {
        self.int(v)
    }

    fn serialize_u16(self, v: u16) -> Result<Self::Ok, Self::Error> {
        self.int(v)
    }

    fn serialize_u32(self, v: u32) -> Result<Self::Ok, Self::Error> {
        self.int(v)
    }

    fn serialize_u64(self, v: u64) -> Result<Self::Ok, Self::Error> {
        self.int(v)
    }

    fn serialize_u128(self, v: u128) -> Result<Self::Ok, Self::Error> {
        self.int(v)
    }

    fn serialize_f32(self, v: f32) -> Result<Self::Ok, Self::Error> {
        self.float(v, v.is_finite())
    }

    fn serialize_f64(self, v: f64) -> Result<Self::Ok, Self::Error> {
        self.float(v, v.is_finite())
    }

    fn serialize_char(self, v: char) -> Result<Self::Ok, Self::Error> {
        let mut buf = [0u8; 4];
        ser::Serializer::serialize_bytes(self, v.encode_utf8(&mut buf).as_bytes())
    }

    fn serialize_str(self, v: &str) -> Result<Self::Ok, Self::Error> {
        ser::Serializer::serialize_bytes(self, v.as_bytes())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Self::Ok, Self::Error> {
        write!(self.writer, "s:{}:\"", v.len())?;
        self.write(v)?;
        self.write(b"\";")
    }

    fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
        self.write(b"N;")
    }

    fn serialize_some<T>(self, value: &T) -> Result<Self::Ok, Self::Error>
    where
        T: ?Sized + ser::Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
        self.write(b"N;")
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Self::Ok, Self::Error> {
        self.write(b"N;")
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        self.write(cache::string(variant))
    }

    fn serialize_newtype_struct<T>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: ?Sized + ser::Serialize,
    {
        if name == RAW_TOKEN {
            self.raw(value)
        } else {
            value.serialize(self)
        }
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: ?Sized + ser::Serialize,
    {
        self.variant(variant)?;
        value.serialize(&mut *self)?;
        self.write(b"}")
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        match len {
            Some(len) => {
                self.header(len)?;
                Ok(SerializeList::streaming(self, len, false))
            },
            None => Ok(SerializeList::buffered(self)),
        }
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        self.header(len)?;
        Ok(SerializeList::streaming(self, len, false))
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        let kind = match name {
            OBJECT_TOKEN => TupleStructKind::Class(SerializeClass::new(self, false)),
            CUSTOM_TOKEN => TupleStructKind::Class(SerializeClass::new(self, true)),
            _ => {
                self.header(len)?;
                TupleStructKind::List(SerializeList::streaming(self, len, false))
            },
        };

        Ok(SerializeTupleStruct(kind))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        self.variant(variant)?;
        self.header(len)?;
        Ok(SerializeList::streaming(self, len, true))
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        // flattened structs come through here without a length
        Ok(SerializeMap::new(self, len.is_some()))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        self.keyed_header(len)?;
        Ok(SerializeStruct::new(self, len, false))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        self.variant(variant)?;
        self.header(len)?;
        Ok(SerializeStruct::new(self, len, true))
    }
}

/// Writes one element of a list, keyed by its index.
fn element<W, T>(ser: &mut Serializer<W>, index: usize, value: &T) -> Result<(), Error>
where
    W: io::Write,
    T: ?Sized + ser::Serialize,
{
    write!(ser.writer, "i:{index};")?;
    value.serialize(ser)
}

/// Allows serializing a sequence of elements as an array with integer keys.
///
/// You shouldn't use this type directly. It is returned by [`Serializer`] as
/// needed.
pub struct SerializeList<'a, W> {
    ser: &'a mut Serializer<W>,
    /// The announced length. If unknown, elements go to `buf` first.
    len: Option<usize>,
    buf: Option<PooledBuf>,
    index: usize,
    /// Whether this is the data of an enum variant.
    wrapped: bool,
}

impl<'a, W: io::Write> SerializeList<'a, W> {
    fn streaming(ser: &'a mut Serializer<W>, len: usize, wrapped: bool) -> Self {
        Self {
            ser,
            len: Some(len),
            buf: None,
            index: 0,
            wrapped,
        }
    }

    fn buffered(ser: &'a mut Serializer<W>) -> Self {
        Self {
            ser,
            len: None,
            buf: Some(pool::take()),
            index: 0,
            wrapped: false,
        }
    }

    fn element<T>(&mut self, value: &T) -> Result<(), Error>
    where
        T: ?Sized + ser::Serialize,
    {
        let index = self.index;
        self.index += 1;

        match &mut self.buf {
            Some(buf) => element(
                &mut Serializer::with_options(&mut **buf, self.ser.options),
                index,
                value,
            ),
            None => element(&mut *self.ser, index, value),
        }
    }

    fn finish(mut self) -> Result<(), Error> {
        if let Some(buf) = self.buf.take() {
            self.ser.header(self.index)?;
            self.ser.write(&buf)?;
        } else if let Some(expected) = self.len
            && expected != self.index
        {
            return Err(Error::LengthIncorrect {
                expected,
                actual: self.index,
            });
        }

        if self.wrapped {
            self.ser.write(b"}")?;
        }

        self.ser.write(b"}")
    }
}

impl<W: io::Write> ser::SerializeSeq for SerializeList<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + ser::Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.finish()
    }
}

impl<W: io::Write> ser::SerializeTuple for SerializeList<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + ser::Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.finish()
    }
}

impl<W: io::Write> ser::SerializeTupleVariant for SerializeList<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + ser::Serialize,
    {
        self.element(value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.finish()
    }
}

/// Allows serializing a tuple struct, either as a regular array or as the
/// class-tagged value of an [`Object`](crate::Object) or
/// [`Custom`](crate::Custom).
///
/// You shouldn't use this type directly. It is returned by [`Serializer`] as
/// needed.
pub struct SerializeTupleStruct<'a, W>(TupleStructKind<'a, W>);

enum TupleStructKind<'a, W> {
    List(SerializeList<'a, W>),
    Class(SerializeClass<'a, W>),
}

impl<W: io::Write> ser::SerializeTupleStruct for SerializeTupleStruct<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + ser::Serialize,
    {
        match &mut self.0 {
            TupleStructKind::List(list) => list.element(value),
            TupleStructKind::Class(class) => class.field(value),
        }
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        match self.0 {
            TupleStructKind::List(list) => list.finish(),
            TupleStructKind::Class(class) => class.finish(),
        }
    }
}

/// The class name followed by the value, for objects and custom values.
struct SerializeClass<'a, W> {
    ser: &'a mut Serializer<W>,
    custom: bool,
    class: Option<&'static str>,
    written: bool,
}

impl<'a, W: io::Write> SerializeClass<'a, W> {
    fn new(ser: &'a mut Serializer<W>, custom: bool) -> Self {
        Self {
            ser,
            custom,
            class: None,
            written: false,
        }
    }

    fn field<T>(&mut self, value: &T) -> Result<(), Error>
    where
        T: ?Sized + ser::Serialize,
    {
        let Some(class) = self.class else {
            self.class = Some(value.serialize(ClassCapture)?);
            return Ok(());
        };

        if self.written {
            return Err(Error::LengthIncorrect {
                expected: 2,
                actual: 3,
            });
        }

        self.written = true;
        if self.custom {
            let blob = value.serialize(BytesCapture).map_err(|err| match err {
                Error::Custom(message) => Error::Marshaler { class, message },
                err => err,
            })?;

            self.ser.write(cache::custom(class))?;
            write!(self.ser.writer, "{}:{{", blob.len())?;
            self.ser.write(&blob)?;
            self.ser.write(b"}")
        } else {
            // only the outermost struct or map of the value takes the class
            self.ser.class = Some(class);
            let res = value.serialize(&mut *self.ser);
            self.ser.class = None;
            res
        }
    }

    fn finish(self) -> Result<(), Error> {
        if self.written {
            Ok(())
        } else {
            Err(Error::LengthIncorrect {
                expected: 2,
                actual: usize::from(self.class.is_some()),
            })
        }
    }
}

/// Allows serializing a map as an array with string keys.
///
/// Entries are buffered before being written. Maps with a known length are
/// sorted by key, others keep the order they were serialized in.
///
/// You shouldn't use this type directly. It is returned by [`Serializer`] as
/// needed.
pub struct SerializeMap<'a, W> {
    ser: &'a mut Serializer<W>,
    sorted: bool,
    buf: PooledBuf,
    entries: Vec<(Vec<u8>, Range<usize>)>,
    key: Option<Vec<u8>>,
}

impl<'a, W: io::Write> SerializeMap<'a, W> {
    fn new(ser: &'a mut Serializer<W>, sorted: bool) -> Self {
        Self {
            ser,
            sorted,
            buf: pool::take(),
            entries: Vec::new(),
            key: None,
        }
    }
}

impl<W: io::Write> ser::SerializeMap for SerializeMap<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + ser::Serialize,
    {
        self.key = Some(key.serialize(KeySerializer)?);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + ser::Serialize,
    {
        let key = self
            .key
            .take()
            .ok_or_else(|| Error::Custom("map value serialized before its key".to_owned()))?;

        let start = self.buf.len();
        value.serialize(&mut Serializer::with_options(&mut *self.buf, self.ser.options))?;
        self.entries.push((key, start..self.buf.len()));
        Ok(())
    }

    fn end(mut self) -> Result<Self::Ok, Self::Error> {
        if self.sorted {
            self.entries.sort_by(|a, b| a.0.cmp(&b.0));
        }

        self.ser.keyed_header(self.entries.len())?;

        for (key, range) in &self.entries {
            write!(self.ser.writer, "s:{}:\"", key.len())?;
            self.ser.write(key)?;
            self.ser.write(b"\";")?;
            self.ser.write(&self.buf[range.clone()])?;
        }

        self.ser.write(b"}")
    }
}

/// Allows serializing a struct as an array or object with string keys.
///
/// You shouldn't use this type directly. It is returned by [`Serializer`] as
/// needed.
pub struct SerializeStruct<'a, W> {
    ser: &'a mut Serializer<W>,
    len: usize,
    count: usize,
    wrapped: bool,
}

impl<'a, W: io::Write> SerializeStruct<'a, W> {
    fn new(ser: &'a mut Serializer<W>, len: usize, wrapped: bool) -> Self {
        Self {
            ser,
            len,
            count: 0,
            wrapped,
        }
    }

    fn field<T>(&mut self, key: &'static str, value: &T) -> Result<(), Error>
    where
        T: ?Sized + ser::Serialize,
    {
        self.count += 1;
        self.ser.write(cache::string(key))?;
        value.serialize(&mut *self.ser)
    }

    fn finish(self) -> Result<(), Error> {
        if self.count != self.len {
            return Err(Error::LengthIncorrect {
                expected: self.len,
                actual: self.count,
            });
        }

        if self.wrapped {
            self.ser.write(b"}")?;
        }

        self.ser.write(b"}")
    }
}

impl<W: io::Write> ser::SerializeStruct for SerializeStruct<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + ser::Serialize,
    {
        self.field(key, value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.finish()
    }
}

impl<W: io::Write> ser::SerializeStructVariant for SerializeStruct<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + ser::Serialize,
    {
        self.field(key, value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.finish()
    }
}

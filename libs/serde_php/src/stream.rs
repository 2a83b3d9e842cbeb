//! Reading and writing sequences of values back to back.
//!
//! ```
//! use serde_php::stream::{Decoder, Encoder};
//!
//! let mut enc = Encoder::new(Vec::new());
//! enc.write(&1)?;
//! enc.write("two")?;
//! let buf = enc.into_inner();
//!
//! let mut dec = Decoder::new(buf.as_slice());
//! assert_eq!(dec.next_value()?, Some(&b"i:1;"[..]));
//! assert_eq!(dec.decode::<String>()?.as_deref(), Some("two"));
//! assert_eq!(dec.next_value()?, None);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::io;

use serde_core::{de, ser};

use crate::de::Error;
use crate::scan::{Scanner, Step, SyntaxError};
use crate::ser::Options;

/// The minimum number of bytes requested from the reader at once.
const MIN_READ: usize = 512;

/// Returns an [`io::Error`] with kind [`io::ErrorKind::UnexpectedEof`].
fn eof(err: SyntaxError) -> Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, err).into()
}

/// Splits the bytes of an [`io::Read`] into consecutive encoded values.
///
/// The scanner is fed as bytes arrive, so each value is found without reading
/// past its end by more than one chunk, and without re-scanning earlier bytes.
#[derive(Debug)]
pub struct Decoder<R> {
    reader: R,
    buf: Vec<u8>,
    /// Start of the current value within `buf`.
    start: usize,
    /// How far into `buf` the scanner has consumed.
    pos: usize,
    scan: Scanner,
    eof: bool,
    failed: Option<SyntaxError>,
}

impl<R: io::Read> Decoder<R> {
    /// Creates a new decoder that reads values from a [`io::Read`].
    ///
    /// The reader is not buffered further than necessary, so wrapping it in a
    /// [`io::BufReader`] is unnecessary.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            start: 0,
            pos: 0,
            scan: Scanner::new(),
            eof: false,
            failed: None,
        }
    }

    /// Reads the exact bytes of the next value.
    ///
    /// Returns [`None`] if the reader ended cleanly between values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Syntax`] if the input is malformed. Once that
    /// happened, every further call returns the same error.
    ///
    /// Returns [`Error::Io`] if reading fails, or with
    /// [`io::ErrorKind::UnexpectedEof`] if the reader ends inside a value.
    /// Reading may be retried after errors other than the latter.
    pub fn next_value(&mut self) -> Result<Option<&[u8]>, Error> {
        if let Some(err) = &self.failed {
            return Err(err.clone().into());
        }

        loop {
            while let Some(&c) = self.buf.get(self.pos) {
                self.pos += 1;
                match self.scan.step(c) {
                    Ok(Step::End) => {
                        let span = self.start..self.pos;
                        self.start = self.pos;
                        self.scan.reset();
                        return Ok(self.buf.get(span));
                    },
                    Ok(_) => {},
                    Err(err) => {
                        log::debug!("stopped decoding stream: {err}");
                        self.failed = Some(err.clone());
                        return Err(err.into());
                    },
                }
            }

            if self.eof {
                if self.pos == self.start {
                    return Ok(None);
                }

                return Err(self.scan.eof().map_or_else(eof, |()| Error::OutOfSync(self.start)));
            }

            self.refill()?;
        }
    }

    /// Reads and deserializes the next value.
    ///
    /// Returns [`None`] if the reader ended cleanly between values.
    ///
    /// # Errors
    ///
    /// See [`Decoder::next_value`] and [`from_slice`](crate::from_slice).
    pub fn decode<T>(&mut self) -> Result<Option<T>, Error>
    where
        T: de::DeserializeOwned,
    {
        match self.next_value()? {
            Some(value) => crate::from_slice(value).map(Some),
            None => Ok(None),
        }
    }

    /// Bytes that were read from the reader but are not part of a returned
    /// value yet.
    pub fn buffered(&self) -> &[u8] {
        self.buf.get(self.start..).unwrap_or_default()
    }

    /// Unwraps the decoder into its inner reader.
    ///
    /// Any [buffered](Self::buffered) bytes are lost.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn refill(&mut self) -> io::Result<()> {
        // drop the bytes of values already returned
        if self.start > 0 {
            self.buf.drain(..self.start);
            self.pos -= self.start;
            self.start = 0;
        }

        let len = self.buf.len();
        let capacity = self.buf.capacity();
        self.buf.resize(len + MIN_READ.max(capacity - len), 0);
        if self.buf.capacity() != capacity {
            log::trace!("grew stream buffer to {} bytes", self.buf.capacity());
        }

        loop {
            let read = self.buf.get_mut(len..).map_or(Ok(0), |buf| self.reader.read(buf));
            match read {
                Ok(n) => {
                    self.buf.truncate(len + n);
                    if n == 0 {
                        log::debug!("stream ended after {} bytes", self.scan.offset());
                        self.eof = true;
                    } else {
                        log::trace!("read {n} bytes from stream");
                    }

                    return Ok(());
                },
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {},
                Err(err) => {
                    self.buf.truncate(len);
                    return Err(err);
                },
            }
        }
    }
}

/// Writes values back to back to an [`io::Write`].
#[derive(Debug)]
pub struct Encoder<W> {
    writer: W,
    options: Options,
}

impl<W: io::Write> Encoder<W> {
    /// Creates a new encoder that writes values to a [`io::Write`].
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, Options::default())
    }

    /// Creates a new encoder with the specified options.
    pub fn with_options(writer: W, options: Options) -> Self {
        Self { writer, options }
    }

    /// Serializes a value and writes it.
    ///
    /// Each value is encoded completely before any of it is written, so a
    /// failed value leaves no trace in the output.
    ///
    /// # Errors
    ///
    /// See [`to_writer`](crate::to_writer).
    pub fn write<T>(&mut self, value: &T) -> Result<(), crate::ser::Error>
    where
        T: ?Sized + ser::Serialize,
    {
        crate::ser::to_writer_with_options(&mut self.writer, value, self.options)
    }

    /// Unwraps the encoder into its inner writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_values() {
        let data: &[u8] = b"i:1;s:3:\"a;b\";a:1:{i:0;N;}C:1:\"X\":2:{}}}";
        let mut dec = Decoder::new(data);

        let mut values = Vec::new();
        while let Some(value) = dec.next_value().expect("stream is valid") {
            values.push(value.to_vec());
        }

        assert_eq!(
            values,
            [
                &b"i:1;"[..],
                b"s:3:\"a;b\";",
                b"a:1:{i:0;N;}",
                b"C:1:\"X\":2:{}}}",
            ]
        );
    }

    #[test]
    fn truncated_value() {
        let mut dec = Decoder::new(&b"i:1;a:1:{i:0;"[..]);
        assert!(dec.next_value().expect("first value is complete").is_some());

        let err = dec.next_value().expect_err("second value is truncated");
        assert!(
            matches!(&err, Error::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof),
            "got {err:?}"
        );
    }

    #[test]
    fn syntax_error_sticks() {
        let mut dec = Decoder::new(&b"i:1;x:1;i:2;"[..]);
        assert!(dec.next_value().expect("first value is valid").is_some());

        for _ in 0..2 {
            match dec.next_value() {
                Err(Error::Syntax(err)) => assert_eq!(err.offset(), 4, "absolute offset"),
                other => panic!("expected syntax error, got {other:?}"),
            }
        }
    }

    #[test]
    fn buffered_holds_unreturned_bytes() {
        let mut dec = Decoder::new(&b"N;b:1;"[..]);
        assert_eq!(dec.next_value().expect("valid"), Some(&b"N;"[..]));
        assert_eq!(dec.buffered(), b"b:1;");
    }
}

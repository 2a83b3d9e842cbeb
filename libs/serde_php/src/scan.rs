//! Incremental, non-recursive scanner for the serialized format.
//!
//! The [`Scanner`] consumes one byte at a time and reports a [`Step`] for
//! each. It keeps its control state on an explicit stack, so feeding can stop
//! and resume at any byte boundary. Both the [decoder](crate::de) and the
//! [streaming reader](crate::stream) are built on top of it.

use std::fmt;

/// Validates that `data` holds exactly one well-formed value.
///
/// # Errors
///
/// Returns the first [`SyntaxError`] encountered, including an error at the
/// end of input if the value is incomplete and for any bytes after it.
pub fn validate(data: &[u8]) -> Result<(), SyntaxError> {
    let mut scan = Scanner::new();
    for &c in data {
        scan.step(c)?;
    }

    scan.eof()
}

/// Checks whether `data` holds exactly one well-formed value.
///
/// Use [`validate`] to find out where the input went wrong.
pub fn is_valid(data: &[u8]) -> bool {
    validate(data).is_ok()
}

/// What the scanner observed while consuming a single byte.
///
/// `Begin*` steps are reported for the tag byte of a value, `End*` steps for
/// the byte that completes it. The final byte of a top-level value is always
/// reported as [`Step::End`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Nothing noteworthy: separators, quotes, braces and custom blob bytes.
    Continue,
    /// Tag byte of `N`, `b`, `i`, `d` or `s`.
    BeginScalar,
    /// A byte of a scalar payload.
    InScalar,
    /// The `;` terminating a scalar.
    EndScalar,
    /// The `:` after the pair count of an array or object.
    EndPairCount,
    /// The `:` after the byte length of a string, class name or custom blob.
    EndLength,
    /// Tag byte of an array.
    BeginArray,
    /// The `}` closing an array.
    EndArray,
    /// Tag byte of an object.
    BeginObject,
    /// The `}` closing an object.
    EndObject,
    /// A byte of a class name.
    InClassName,
    /// The `"` closing a class name.
    EndClassName,
    /// Tag byte of a custom value.
    BeginCustom,
    /// The `}` closing a custom value.
    EndCustom,
    /// The final byte of the top-level value.
    End,
}

/// A malformed byte, or a premature end of input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} at offset {offset}", Problem(.byte, .context))]
pub struct SyntaxError {
    byte: Option<u8>,
    context: &'static str,
    offset: u64,
}

impl SyntaxError {
    pub(crate) fn new(byte: u8, context: &'static str, offset: u64) -> Self {
        Self {
            byte: Some(byte),
            context,
            offset,
        }
    }

    /// The offending byte, or [`None`] if the input ended too early.
    pub fn byte(&self) -> Option<u8> {
        self.byte
    }

    /// Zero-based offset of the offending byte, or the input length for
    /// premature ends.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Whether this error was caused by the input ending inside a value.
    pub fn is_eof(&self) -> bool {
        self.byte.is_none()
    }
}

/// What went wrong at a [`SyntaxError`]'s offset.
struct Problem<'a>(&'a Option<u8>, &'a &'static str);

impl fmt::Display for Problem<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(b) => write!(f, "invalid character '{}' {}", b.escape_ascii(), self.1),
            None => f.write_str("unexpected end of input"),
        }
    }
}

/// One grammar rule waiting on the stack for input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Production {
    Colon,
    Quote,
    OpenBrace,
    Semicolon,
    Bool { digit: bool },
    Int { sign: bool, digits: bool },
    Float { any: bool },
    Length { digits: bool },
    PairCount { digits: bool },
    StringBody,
    ClassName,
    Array,
    Object,
    CustomBody,
}

use Production as P;

const NULL: &[Production] = &[P::Semicolon];
const BOOL: &[Production] = &[P::Colon, P::Bool { digit: false }];
const INT: &[Production] = &[P::Colon, P::Int { sign: false, digits: false }];
const FLOAT: &[Production] = &[P::Colon, P::Float { any: false }];
const STRING: &[Production] = &[
    P::Colon,
    P::Length { digits: false },
    P::Quote,
    P::StringBody,
    P::Semicolon,
];
const ARRAY: &[Production] = &[
    P::Colon,
    P::PairCount { digits: false },
    P::OpenBrace,
    P::Array,
];
const OBJECT: &[Production] = &[
    P::Colon,
    P::Length { digits: false },
    P::Quote,
    P::ClassName,
    P::Colon,
    P::PairCount { digits: false },
    P::OpenBrace,
    P::Object,
];
const CUSTOM: &[Production] = &[
    P::Colon,
    P::Length { digits: false },
    P::Quote,
    P::ClassName,
    P::Colon,
    P::Length { digits: false },
    P::OpenBrace,
    P::CustomBody,
];

/// Pushdown state machine validating one value per [`reset`](Self::reset).
///
/// Alongside the production stack, a stack of remaining lengths tracks every
/// open length-prefixed context. The top entry always belongs to the innermost
/// such context.
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    stack: Vec<Production>,
    lengths: Vec<usize>,
    length: usize,
    offset: u64,
    done: bool,
}

impl Scanner {
    /// Creates a scanner expecting the start of a value at offset 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepares the scanner for the next value.
    ///
    /// The byte offset keeps counting from where it was.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.lengths.clear();
        self.length = 0;
        self.done = false;
    }

    /// Number of bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Current nesting depth of the production stack.
    ///
    /// This is zero before a value starts and again once it is complete, so a
    /// caller can skip a sub-value by stepping until the depth returns to what
    /// it was just before its tag byte.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Whether a complete top-level value has been consumed.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// The most recently opened length, as reported right after
    /// [`Step::EndLength`] or [`Step::EndPairCount`].
    ///
    /// Pair counts are reported doubled, counting keys and values separately.
    pub fn last_length(&self) -> Option<usize> {
        self.lengths.last().copied()
    }

    /// Consumes one byte.
    ///
    /// # Errors
    ///
    /// Returns a [`SyntaxError`] if the byte cannot continue the value. The
    /// scanner should be [`reset`](Self::reset) before reusing it afterwards.
    pub fn step(&mut self, c: u8) -> Result<Step, SyntaxError> {
        let step = match self.stack.last().copied() {
            Some(production) => self.advance(production, c),
            None if self.done => Err(self.error(c, "after top-level value")),
            None => self.begin_value(c, false),
        };

        self.offset += 1;
        let step = step?;
        if self.stack.is_empty() {
            self.done = true;
            return Ok(Step::End);
        }

        Ok(step)
    }

    /// Signals the end of input.
    ///
    /// # Errors
    ///
    /// Returns a [`SyntaxError`] unless a complete value was consumed.
    pub fn eof(&self) -> Result<(), SyntaxError> {
        if self.done {
            Ok(())
        } else {
            Err(SyntaxError {
                byte: None,
                context: "",
                offset: self.offset,
            })
        }
    }

    fn error(&self, c: u8, context: &'static str) -> SyntaxError {
        SyntaxError::new(c, context, self.offset)
    }

    fn replace_top(&mut self, production: Production) {
        if let Some(top) = self.stack.last_mut() {
            *top = production;
        }
    }

    fn pop(&mut self, step: Step) -> Result<Step, SyntaxError> {
        self.stack.pop();
        Ok(step)
    }

    fn push_length(&mut self, length: usize) {
        self.lengths.push(length);
        self.length = 0;
    }

    fn push_digit(&mut self, c: u8) -> Result<(), SyntaxError> {
        self.length = self
            .length
            .checked_mul(10)
            .and_then(|l| l.checked_add(usize::from(c - b'0')))
            .ok_or_else(|| self.error(c, "in length, value is too large"))?;
        Ok(())
    }

    /// Handles the tag byte of a value, array keys included.
    fn begin_value(&mut self, c: u8, key: bool) -> Result<Step, SyntaxError> {
        if key && !matches!(c, b'i' | b's') {
            return Err(self.error(c, "as array key, expected 'i' or 's'"));
        }

        let (productions, step) = match c {
            b'N' => (NULL, Step::BeginScalar),
            b'b' => (BOOL, Step::BeginScalar),
            b'i' => (INT, Step::BeginScalar),
            b'd' => (FLOAT, Step::BeginScalar),
            b's' => (STRING, Step::BeginScalar),
            b'a' => (ARRAY, Step::BeginArray),
            b'O' => (OBJECT, Step::BeginObject),
            b'C' => (CUSTOM, Step::BeginCustom),
            b'r' | b'R' => {
                return Err(self.error(c, "as value tag, references are not supported"));
            },
            _ => return Err(self.error(c, "looking for beginning of value")),
        };

        self.stack.extend(productions.iter().rev());
        Ok(step)
    }

    /// Handles one byte inside of a container, or its closing brace.
    fn container_byte(&mut self, c: u8, end: Step, context: &'static str) -> Result<Step, SyntaxError> {
        match self.lengths.last_mut() {
            Some(remaining @ 1..) => {
                // counts down from an even number, so even means a key is next
                let key = *remaining % 2 == 0;
                *remaining -= 1;
                self.begin_value(c, key)
            },
            Some(0) if c == b'}' => {
                self.lengths.pop();
                self.pop(end)
            },
            _ => Err(self.error(c, context)),
        }
    }

    fn advance(&mut self, production: Production, c: u8) -> Result<Step, SyntaxError> {
        match production {
            P::Colon if c == b':' => self.pop(Step::Continue),
            P::Colon => Err(self.error(c, "expecting ':'")),
            P::Quote if c == b'"' => self.pop(Step::Continue),
            P::Quote => Err(self.error(c, "expecting '\"'")),
            P::OpenBrace if c == b'{' => self.pop(Step::Continue),
            P::OpenBrace => Err(self.error(c, "expecting '{'")),
            P::Semicolon if c == b';' => self.pop(Step::EndScalar),
            P::Semicolon => Err(self.error(c, "expecting ';'")),

            P::Bool { digit: false } if matches!(c, b'0' | b'1') => {
                self.replace_top(P::Bool { digit: true });
                Ok(Step::InScalar)
            },
            P::Bool { digit: true } if c == b';' => self.pop(Step::EndScalar),
            P::Bool { .. } => Err(self.error(c, "in bool value")),

            P::Int { sign: false, digits: false } if c == b'-' => {
                self.replace_top(P::Int { sign: true, digits: false });
                Ok(Step::InScalar)
            },
            P::Int { sign, .. } if c.is_ascii_digit() => {
                self.replace_top(P::Int { sign, digits: true });
                Ok(Step::InScalar)
            },
            P::Int { digits: true, .. } if c == b';' => self.pop(Step::EndScalar),
            P::Int { .. } => Err(self.error(c, "in integer value")),

            P::Float { .. } if matches!(c, b'0'..=b'9' | b'.' | b'e' | b'E' | b'-' | b'+') => {
                self.replace_top(P::Float { any: true });
                Ok(Step::InScalar)
            },
            P::Float { any: true } if c == b';' => self.pop(Step::EndScalar),
            P::Float { .. } => Err(self.error(c, "in float value")),

            P::Length { .. } if c.is_ascii_digit() => {
                self.push_digit(c)?;
                self.replace_top(P::Length { digits: true });
                Ok(Step::Continue)
            },
            P::Length { digits: true } if c == b':' => {
                self.push_length(self.length);
                self.pop(Step::EndLength)
            },
            P::Length { .. } => Err(self.error(c, "in length")),

            P::PairCount { .. } if c.is_ascii_digit() => {
                self.push_digit(c)?;
                self.replace_top(P::PairCount { digits: true });
                Ok(Step::Continue)
            },
            P::PairCount { digits: true } if c == b':' => {
                let elements = self
                    .length
                    .checked_mul(2)
                    .ok_or_else(|| self.error(c, "after pair count, value is too large"))?;
                self.push_length(elements);
                self.pop(Step::EndPairCount)
            },
            P::PairCount { .. } => Err(self.error(c, "in pair count")),

            P::StringBody => self.counted_byte(c, b'"', Step::InScalar, Step::Continue, "after string content"),
            P::ClassName => self.counted_byte(c, b'"', Step::InClassName, Step::EndClassName, "after class name"),
            P::CustomBody => self.counted_byte(c, b'}', Step::Continue, Step::EndCustom, "after custom data"),

            P::Array => self.container_byte(c, Step::EndArray, "in array"),
            P::Object => self.container_byte(c, Step::EndObject, "in object"),
        }
    }

    /// Handles a raw byte of a length-prefixed payload, or its delimiter once
    /// the length is used up.
    fn counted_byte(
        &mut self,
        c: u8,
        delimiter: u8,
        inside: Step,
        end: Step,
        context: &'static str,
    ) -> Result<Step, SyntaxError> {
        match self.lengths.last_mut() {
            Some(remaining @ 1..) => {
                *remaining -= 1;
                Ok(inside)
            },
            Some(0) if c == delimiter => {
                self.lengths.pop();
                self.pop(end)
            },
            _ => Err(self.error(c, context)),
        }
    }
}

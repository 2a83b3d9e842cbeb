//! # PHP `serialize` format
//!
//! Reads and writes the format produced by PHP's `serialize` and consumed by
//! `unserialize`. It is self-describing, so deserializing any is supported.
//!
//! Every value starts with a tag byte:
//!
//! - `N;`: null
//! - `b:1;`: bool, as 0 or 1
//! - `i:-42;`: integer in decimal
//! - `d:1.5;`: float, with an uppercase exponent if there is one
//! - `s:5:"hallo";`: byte string, prefixed with its length in bytes; the
//!   contents are not escaped
//! - `a:2:{i:0;s:1:"a";s:1:"k";N;}`: array of key-value pairs, where keys are
//!   integers or strings
//! - `O:3:"Foo":1:{s:1:"a";i:1;}`: object, an array with a class name
//! - `C:3:"Foo":3:{abc}`: custom value, an opaque payload with a class name
//!
//! References (`r` and `R`) are not supported.
//!
//! Rust types map to these as follows:
//!
//! - null: [`None`], `()`, unit structs
//! - bool: [`bool`]
//! - integer: all integer types
//! - float: [`f32`] and [`f64`], except NaN and infinities
//! - string: [`str`], [`char`], byte strings, and unit enum variants by name
//! - array with keys `0..len`: sequences, tuples, and tuple structs
//! - array with string keys: structs and maps, with keys sorted for maps
//! - array with one pair: enum variants with data, keyed by variant name
//! - object: [`Object`]
//! - custom: [`Custom`]
//!
//! Deserializing is lenient where PHP's data tends to be. Values that don't
//! fit their destination are replaced by a zero value and reported once the
//! whole input is done, see [`de`] for details. Malformed input fails
//! immediately.
//!
//! ```
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct User {
//!     name: String,
//!     tags: Vec<String>,
//! }
//!
//! let user = User { name: "ann".to_owned(), tags: vec!["admin".to_owned()] };
//! let buf = serde_php::to_vec(&user)?;
//! assert_eq!(
//!     buf,
//!     b"a:2:{s:4:\"name\";s:3:\"ann\";s:4:\"tags\";a:1:{i:0;s:5:\"admin\";}}"
//! );
//!
//! let back: User = serde_php::from_slice(&buf)?;
//! assert_eq!(back, user);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod class;
pub mod de;
mod raw;
pub mod scan;
pub mod ser;
pub mod stream;
pub mod text;
pub mod value;

#[cfg(test)]
use criterion as _;

pub use class::{Custom, Object, PhpClass, SerializePhp, UnserializePhp};
pub use de::{from_slice, from_slice_into};
pub use raw::Raw;
pub use scan::{is_valid, validate};
pub use ser::{to_vec, to_vec_with_options, to_writer};
pub use value::Value;

#[cfg(test)]
mod tests;

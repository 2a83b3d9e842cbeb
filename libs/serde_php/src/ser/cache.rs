//! Process-wide cache of encoded static names.
//!
//! Field names, variant names and class names reach the serializer as
//! `&'static str`. Their encoded forms never change, so they are built once
//! per distinct string and shared by all threads afterwards. Entries are
//! keyed by the address of the string and never removed.

use std::collections::HashMap;
use std::io::Write as _;
use std::sync::{LazyLock, PoisonError, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Kind {
    /// `s:N:"name";`
    String,
    /// `O:N:"class":`
    Object,
    /// `C:N:"class":`
    Custom,
}

impl Kind {
    fn build(self, name: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(name.len() + 12);
        let tag = match self {
            Self::String => 's',
            Self::Object => 'O',
            Self::Custom => 'C',
        };

        _ = write!(out, "{tag}:{}:\"", name.len());
        out.extend_from_slice(name.as_bytes());
        out.push(b'"');
        out.push(if self == Self::String { b';' } else { b':' });
        out
    }
}

type Key = (usize, usize, Kind);

static CACHE: LazyLock<RwLock<HashMap<Key, &'static [u8]>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

fn get(name: &'static str, kind: Kind) -> &'static [u8] {
    let key = (name.as_ptr() as usize, name.len(), kind);

    {
        let cache = CACHE.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(&bytes) = cache.get(&key) {
            return bytes;
        }
    }

    // entries are built under the write lock so each is only built once
    let mut cache = CACHE.write().unwrap_or_else(PoisonError::into_inner);
    *cache.entry(key).or_insert_with(|| {
        log::trace!("caching {kind:?} encoding of {name:?}");
        let bytes: &'static [u8] = Vec::leak(kind.build(name));
        bytes
    })
}

/// The encoded string for a field or variant name.
pub(super) fn string(name: &'static str) -> &'static [u8] {
    get(name, Kind::String)
}

/// The object header up to the pair count.
pub(super) fn object(class: &'static str) -> &'static [u8] {
    get(class, Kind::Object)
}

/// The custom value header up to the blob length.
pub(super) fn custom(class: &'static str) -> &'static [u8] {
    get(class, Kind::Custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodings() {
        assert_eq!(string("name"), b"s:4:\"name\";");
        assert_eq!(string(""), b"s:0:\"\";");
        assert_eq!(object("token"), b"O:5:\"token\":");
        assert_eq!(custom("test1"), b"C:5:\"test1\":");
    }

    #[test]
    fn byte_length() {
        assert_eq!(string("ä"), "s:2:\"ä\";".as_bytes());
    }

    #[test]
    fn same_name_shares_entry() {
        let name: &'static str = "shared";
        let a = string(name);
        let b = string(name);
        assert!(std::ptr::eq(a, b), "second lookup must hit the cache");
    }

    #[test]
    fn kinds_are_separate() {
        let name: &'static str = "Kinds";
        assert_ne!(string(name), object(name));
        assert_ne!(object(name), custom(name));
    }

    #[test]
    fn concurrent_first_use() {
        static NAME: &str = "concurrent";
        let ptrs: Vec<usize> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| string(NAME).as_ptr() as usize))
                .collect();

            handles
                .into_iter()
                .map(|h| h.join().expect("thread must not panic"))
                .collect()
        });

        assert!(
            ptrs.windows(2).all(|w| w[0] == w[1]),
            "all threads must see the same entry"
        );
    }
}

//! Interned identifiers.
//!
//! Identifiers are interned once into a process-wide sharded table and passed
//! around as 32-bit [`Name`] handles. Interpreter threads share the table, so
//! names produced by the parser stay valid in every goroutine.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::LazyLock;

/// Interned string identifier.
///
/// Layout: 32-bit index split into shard (4 bits) + local index (28 bits)
/// - Bits 31-28: Shard index (0-15)
/// - Bits 27-0: Local index within shard
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    /// Pre-interned empty string.
    pub const EMPTY: Name = Name(0);

    /// Maximum local index per shard.
    pub const MAX_LOCAL: u32 = 0x0FFF_FFFF;

    /// Number of shards.
    pub const NUM_SHARDS: usize = 16;

    #[inline]
    const fn new(shard: u32, local: u32) -> Self {
        Name((shard << 28) | local)
    }

    #[inline]
    const fn shard(self) -> usize {
        (self.0 >> 28) as usize
    }

    #[inline]
    const fn local(self) -> usize {
        (self.0 & Self::MAX_LOCAL) as usize
    }

    /// Intern `s`, returning its handle.
    pub fn intern(s: &str) -> Name {
        INTERNER.intern(s)
    }

    /// The interned text.
    pub fn as_str(self) -> &'static str {
        INTERNER.lookup(self)
    }

    /// Whether this is the blank identifier `_`.
    pub fn is_blank(self) -> bool {
        self.as_str() == "_"
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", self.as_str())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for Name {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name::intern(s)
    }
}

static INTERNER: LazyLock<StringInterner> = LazyLock::new(StringInterner::new);

/// Per-shard storage for interned strings.
struct InternShard {
    map: FxHashMap<&'static str, u32>,
    strings: Vec<&'static str>,
}

/// Sharded string interner backing [`Name`].
struct StringInterner {
    shards: [RwLock<InternShard>; Name::NUM_SHARDS],
}

impl StringInterner {
    fn new() -> Self {
        let shards = std::array::from_fn(|i| {
            let mut shard = InternShard {
                map: FxHashMap::default(),
                strings: Vec::with_capacity(256),
            };
            if i == 0 {
                shard.map.insert("", 0);
                shard.strings.push("");
            }
            RwLock::new(shard)
        });
        StringInterner { shards }
    }

    #[inline]
    fn shard_for(s: &str) -> usize {
        if s.is_empty() {
            return 0;
        }
        let mut hash = 0u32;
        for byte in s.bytes().take(8) {
            hash = hash.wrapping_mul(31).wrapping_add(u32::from(byte));
        }
        (hash as usize) % Name::NUM_SHARDS
    }

    fn intern(&self, s: &str) -> Name {
        let shard_idx = Self::shard_for(s);
        let shard = &self.shards[shard_idx];

        {
            let guard = shard.read();
            if let Some(&local) = guard.map.get(s) {
                return Name::new(shard_idx as u32, local);
            }
        }

        let mut guard = shard.write();
        if let Some(&local) = guard.map.get(s) {
            return Name::new(shard_idx as u32, local);
        }

        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let local = guard.strings.len() as u32;
        assert!(local <= Name::MAX_LOCAL, "interner shard {shard_idx} overflow");
        guard.strings.push(leaked);
        guard.map.insert(leaked, local);
        Name::new(shard_idx as u32, local)
    }

    fn lookup(&self, name: Name) -> &'static str {
        let guard = self.shards[name.shard()].read();
        guard.strings.get(name.local()).copied().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_roundtrip() {
        let a = Name::intern("fibonacci");
        let b = Name::intern("fibonacci");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "fibonacci");
    }

    #[test]
    fn test_empty_name() {
        assert_eq!(Name::intern(""), Name::EMPTY);
        assert_eq!(Name::EMPTY.as_str(), "");
    }

    #[test]
    fn test_blank() {
        assert!(Name::intern("_").is_blank());
        assert!(!Name::intern("x").is_blank());
    }

    #[test]
    fn test_intern_across_threads() {
        let handle = std::thread::spawn(|| Name::intern("shared_across_threads"));
        let here = Name::intern("shared_across_threads");
        let there = handle.join().unwrap();
        assert_eq!(here, there);
    }
}

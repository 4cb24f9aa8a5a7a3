//! FNV-1a hashing of record configuration.
//!
//! A cache entry stores the hash of the configuration it was built with;
//! an entry whose hash differs from the current configuration is stale.
//! Not cryptographically secure.

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

/// Feed a single byte into an FNV-1a hash state.
#[inline]
fn fnv1a_byte(hash: u64, byte: u8) -> u64 {
    (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
}

/// Incremental FNV-1a hasher over configuration scalars.
///
/// Strings are length-prefixed so `("ab", "c")` and `("a", "bc")` hash
/// differently.
#[derive(Clone, Copy, Debug)]
pub struct ConfigHasher {
    state: u64,
}

impl Default for ConfigHasher {
    fn default() -> Self {
        Self { state: FNV_OFFSET }
    }
}

impl ConfigHasher {
    /// A fresh hasher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes.
    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        for &b in bytes {
            self.state = fnv1a_byte(self.state, b);
        }
        self
    }

    /// Feed a byte.
    pub fn u8(self, v: u8) -> Self {
        self.bytes(&[v])
    }

    /// Feed a u64 as 8 LE bytes.
    pub fn u64(self, v: u64) -> Self {
        self.bytes(&v.to_le_bytes())
    }

    /// Feed an f64 by its bit pattern.
    pub fn f64(self, v: f64) -> Self {
        self.u64(v.to_bits())
    }

    /// Feed a length-prefixed string.
    pub fn str(self, s: &str) -> Self {
        self.u64(s.len() as u64).bytes(s.as_bytes())
    }

    /// The hash value.
    pub fn finish(self) -> u64 {
        self.state
    }
}

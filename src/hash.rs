//! Key hashing
//!
//! The 32-bit digest used to place keys on disk: start at 5381 and fold
//! each byte in with `v = (v * 33) ^ b`. Writer and reader must agree on it
//! bit for bit, so it is fixed for the life of the format.

/// Initial digest state
const SEED: u32 = 5381;

/// Incremental key hasher
///
/// Feeding a key in several chunks produces the same digest as feeding it
/// in one call.
#[derive(Debug, Clone, Copy)]
pub struct Hasher {
    state: u32,
}

impl Hasher {
    /// Create a hasher in its initial state
    pub fn new() -> Self {
        Self { state: SEED }
    }

    /// Fold more bytes into the digest
    pub fn update(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state = (self.state << 5).wrapping_add(self.state) ^ u32::from(b);
        }
    }

    /// Current digest
    pub fn finish(&self) -> u32 {
        self.state
    }

    /// Return to the initial state
    pub fn reset(&mut self) {
        self.state = SEED;
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash a complete key in one call
pub fn hash(bytes: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finish()
}

pub const BYTE: usize = 8;
pub const HASH_SIZE: usize = 32;
pub const HASH_BITS: u32 = (HASH_SIZE * BYTE) as u32;
/// A 256-bit requirement could only be met by the all-zero digest.
pub const MAX_TARGET_BITS: u32 = HASH_BITS - 1;
pub const POW_TARGET_DIFFICULTY: u32 = 16;
pub const GENESIS_PAYLOAD: &str = "Genesis Block";

//! Ready-made demo circuits.

use crate::errors::FieldError;
use crate::field::FieldElement;
use sha2::{Digest, Sha256};

/// Knowledge of a square root of 25. Satisfied by `x = 5` (and `p - 5`).
pub const SQUARE_ROOT: &str = r#"
def main(private field x) {
    assert(x * x == 25);
    return;
}
"#;

/// Knowledge of a SHA-256 preimage of [`hash_target`]; `(0, 0, 0, 5)` is one.
pub const HASH_PREIMAGE: &str = r#"
import "hashes/sha256/512bitPacked" as sha256packed;

def main(private field a, private field b, private field c, private field d) {
    field[2] h = sha256packed([a, b, c, d]);
    assert(h[0] == 263561599766550617289250058199814760685);
    assert(h[1] == 65303172752238645975888084098459749904);
    return;
}
"#;

/// Digest asserted by [`HASH_PREIMAGE`], as `[high, low]` 128-bit halves.
pub const HASH_TARGET: [u128; 2] = [
    263561599766550617289250058199814760685,
    65303172752238645975888084098459749904,
];

/// [`HASH_TARGET`] as field elements.
pub fn hash_target() -> [FieldElement; 2] {
    HASH_TARGET.map(FieldElement::from_u128)
}

/// Computes `sha256packed` natively.
///
/// Each input must be below `2^128`; the 64-byte message is the concatenation
/// of their 16-byte big-endian encodings.
pub fn sha256_packed(inputs: &[FieldElement; 4]) -> Result<[FieldElement; 2], FieldError> {
    let mut message = Vec::with_capacity(64);
    for input in inputs {
        let bytes = input.to_be_bytes();
        if bytes[..16].iter().any(|b| *b != 0) {
            return Err(FieldError::OutOfRange {
                value: format!("{input} (sha256packed arguments must be below 2^128)"),
            });
        }
        message.extend_from_slice(&bytes[16..]);
    }

    let digest = Sha256::digest(&message);
    Ok([
        FieldElement::from_be_bytes_mod_order(&digest[..16]),
        FieldElement::from_be_bytes_mod_order(&digest[16..]),
    ])
}

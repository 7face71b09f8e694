//! SHA-256 over four packed 128-bit field elements.
//!
//! The four arguments are unpacked into a single 512-bit big-endian message
//! block. With standard padding that message needs a second block, which is
//! fully constant: only its round function costs constraints, its message
//! schedule folds away.

use super::{unpack, Word32};
use crate::compiler::ConstraintBuilder;
use crate::errors::CompileError;
use crate::r1cs::LinearCombination;

#[allow(clippy::unreadable_literal)]
const ROUND_CONSTANTS: [u32; 64] = [
    0x428a2f98, 0x71374491, 0xb5c0fbcf, 0xe9b5dba5, 0x3956c25b, 0x59f111f1, 0x923f82a4, 0xab1c5ed5,
    0xd807aa98, 0x12835b01, 0x243185be, 0x550c7dc3, 0x72be5d74, 0x80deb1fe, 0x9bdc06a7, 0xc19bf174,
    0xe49b69c1, 0xefbe4786, 0x0fc19dc6, 0x240ca1cc, 0x2de92c6f, 0x4a7484aa, 0x5cb0a9dc, 0x76f988da,
    0x983e5152, 0xa831c66d, 0xb00327c8, 0xbf597fc7, 0xc6e00bf3, 0xd5a79147, 0x06ca6351, 0x14292967,
    0x27b70a85, 0x2e1b2138, 0x4d2c6dfc, 0x53380d13, 0x650a7354, 0x766a0abb, 0x81c2c92e, 0x92722c85,
    0xa2bfe8a1, 0xa81a664b, 0xc24b8b70, 0xc76c51a3, 0xd192e819, 0xd6990624, 0xf40e3585, 0x106aa070,
    0x19a4c116, 0x1e376c08, 0x2748774c, 0x34b0bcb5, 0x391c0cb3, 0x4ed8aa4a, 0x5b9cca4f, 0x682e6ff3,
    0x748f82ee, 0x78a5636f, 0x84c87814, 0x8cc70208, 0x90befffa, 0xa4506ceb, 0xbef9a3f7, 0xc67178f2,
];

#[allow(clippy::unreadable_literal)]
const IV: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a, 0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

/// Width of each packed argument and of each digest half.
const PACKED_BITS: usize = 128;

/// Message length in bits, written at the end of the padding block.
const MESSAGE_BITS: u32 = 512;

/// Lowers `sha256packed([a, b, c, d])`.
///
/// Returns the digest as `[high, low]`, each the big-endian integer formed by
/// 16 digest bytes.
pub(crate) fn sha256_packed(
    builder: &mut ConstraintBuilder,
    args: &[LinearCombination],
) -> Result<Vec<LinearCombination>, CompileError> {
    let mut message = Vec::with_capacity(16);
    for arg in args {
        let bits = unpack(builder, arg, PACKED_BITS)?;
        // Most significant word first.
        for q in 0..4 {
            let low = PACKED_BITS - 32 * (q + 1);
            message.push(Word32::from_bits_le(&bits[low..low + 32]));
        }
    }

    let mut padding: Vec<Word32> = (0..16).map(|_| Word32::constant(0)).collect();
    padding[0] = Word32::constant(0x8000_0000);
    padding[15] = Word32::constant(MESSAGE_BITS);

    let iv: Vec<Word32> = IV.iter().map(|v| Word32::constant(*v)).collect();
    let state = compress(builder, &iv, &message);
    let state = compress(builder, &state, &padding);

    let pack_half = |words: &[Word32]| {
        words
            .iter()
            .enumerate()
            .fold(LinearCombination::zero(), |acc, (q, word)| {
                acc + word.pack(PACKED_BITS - 32 * (q + 1))
            })
    };
    Ok(vec![pack_half(&state[..4]), pack_half(&state[4..])])
}

/// A word whose additions have not been materialized yet.
///
/// Deferring lets `e := d + temp1` and `a := temp1 + temp2` each become a
/// single multi-operand addition.
enum Pending {
    Ready(Word32),
    Sum(Vec<Word32>),
}

impl Pending {
    fn resolve(self, builder: &mut ConstraintBuilder, extra: &[Word32]) -> Word32 {
        match self {
            Pending::Ready(word) if extra.is_empty() => word,
            Pending::Ready(word) => {
                let mut operands = vec![word];
                operands.extend_from_slice(extra);
                Word32::addmany(&operands, builder)
            }
            Pending::Sum(mut operands) => {
                operands.extend_from_slice(extra);
                Word32::addmany(&operands, builder)
            }
        }
    }
}

fn compress(builder: &mut ConstraintBuilder, state: &[Word32], block: &[Word32]) -> Vec<Word32> {
    let mut w = block.to_vec();
    for i in 16..64 {
        // s0 := (w[i-15] rotr 7) ^ (w[i-15] rotr 18) ^ (w[i-15] >> 3)
        let s0 = w[i - 15]
            .rotr(7)
            .xor(&w[i - 15].rotr(18), builder)
            .xor(&w[i - 15].shr(3), builder);
        // s1 := (w[i-2] rotr 17) ^ (w[i-2] rotr 19) ^ (w[i-2] >> 10)
        let s1 = w[i - 2]
            .rotr(17)
            .xor(&w[i - 2].rotr(19), builder)
            .xor(&w[i - 2].shr(10), builder);
        let next = Word32::addmany(&[w[i - 16].clone(), s0, w[i - 7].clone(), s1], builder);
        w.push(next);
    }

    let mut a = Pending::Ready(state[0].clone());
    let mut b = state[1].clone();
    let mut c = state[2].clone();
    let mut d = state[3].clone();
    let mut e = Pending::Ready(state[4].clone());
    let mut f = state[5].clone();
    let mut g = state[6].clone();
    let mut h = state[7].clone();

    for (k, w_i) in ROUND_CONSTANTS.iter().zip(&w) {
        let new_e = e.resolve(builder, &[]);
        let big_s1 = new_e
            .rotr(6)
            .xor(&new_e.rotr(11), builder)
            .xor(&new_e.rotr(25), builder);
        let ch = Word32::ch(&new_e, &f, &g, builder);
        let temp1 = vec![h, big_s1, ch, Word32::constant(*k), w_i.clone()];

        let new_a = a.resolve(builder, &[]);
        let big_s0 = new_a
            .rotr(2)
            .xor(&new_a.rotr(13), builder)
            .xor(&new_a.rotr(22), builder);
        let maj = Word32::maj(&new_a, &b, &c, builder);

        h = g;
        g = f;
        f = new_e;
        e = Pending::Sum(temp1.iter().cloned().chain([d]).collect());
        d = c;
        c = b;
        b = new_a;
        a = Pending::Sum(temp1.into_iter().chain([big_s0, maj]).collect());
    }

    vec![
        a.resolve(builder, &state[0..1]),
        Word32::addmany(&[state[1].clone(), b], builder),
        Word32::addmany(&[state[2].clone(), c], builder),
        Word32::addmany(&[state[3].clone(), d], builder),
        e.resolve(builder, &state[4..5]),
        Word32::addmany(&[state[5].clone(), f], builder),
        Word32::addmany(&[state[6].clone(), g], builder),
        Word32::addmany(&[state[7].clone(), h], builder),
    ]
}

#[cfg(test)]
mod tests {
    use crate::circuits;
    use crate::compiler::compile;
    use crate::field::FieldElement;
    use crate::witness::solve;

    const SOURCE: &str = r#"
        import "hashes/sha256/512bitPacked" as sha256packed;
        def main(private field a, private field b, private field c, private field d) -> field[2] {
            field[2] h = sha256packed([a, b, c, d]);
            return [h[0], h[1]];
        }
    "#;

    #[test]
    fn test_circuit_matches_native_digest() {
        let cs = compile(SOURCE).unwrap();
        let inputs = [
            FieldElement::from(0u64),
            FieldElement::from(0xdead_beef_u64),
            "0xffffffffffffffffffffffffffffffff".parse().unwrap(),
            FieldElement::from(5u64),
        ];
        let witness = solve(&cs, &[], &inputs).unwrap();
        let expected = circuits::sha256_packed(&inputs).unwrap();
        assert_eq!(witness.outputs(), &expected);
    }

    #[test]
    fn test_constant_arguments_fold_to_constant_digest() {
        let cs = compile(
            r#"
            def main() -> field[2] {
                field[2] h = sha256packed([0, 0, 0, 5]);
                return [h[0], h[1]];
            }
            "#,
        )
        .unwrap();
        // Only the two return constraints remain.
        assert_eq!(cs.num_constraints(), 2);
        let witness = solve(&cs, &[], &[]).unwrap();
        assert_eq!(witness.outputs(), &circuits::hash_target());
    }

    #[test]
    fn test_oversized_argument_is_rejected_by_the_solver() {
        let cs = compile(SOURCE).unwrap();
        let too_wide: FieldElement = "0x100000000000000000000000000000000".parse().unwrap();
        let zero = FieldElement::zero();
        assert!(solve(&cs, &[], &[too_wide, zero, zero, zero]).is_err());
    }
}

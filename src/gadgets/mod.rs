//! Boolean and 32-bit word gadgets.
//!
//! A [`Bit`] is either a compile-time constant or a linear combination that
//! is guaranteed by earlier constraints to evaluate to 0 or 1. Operations on
//! constants fold away, so fixed parts of a computation (round constants,
//! padding blocks, the SHA-256 IV) cost no constraints.

pub(crate) mod sha256;

use crate::compiler::ConstraintBuilder;
use crate::errors::CompileError;
use crate::field::FieldElement;
use crate::r1cs::{Directive, LinearCombination};

/// `2^exponent` as a field element.
fn pow2(exponent: usize) -> FieldElement {
    FieldElement::from(2u64).pow(exponent as u64)
}

/// A boolean value inside a circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Bit {
    Constant(bool),
    Wire(LinearCombination),
}

impl Bit {
    fn from_lc(lc: LinearCombination) -> Self {
        match lc.as_constant() {
            Some(value) => Bit::Constant(value.is_one()),
            None => Bit::Wire(lc),
        }
    }

    pub(crate) fn lc(&self) -> LinearCombination {
        match self {
            Bit::Constant(value) => LinearCombination::constant(FieldElement::from(*value)),
            Bit::Wire(lc) => lc.clone(),
        }
    }

    pub(crate) fn not(&self) -> Bit {
        match self {
            Bit::Constant(value) => Bit::Constant(!value),
            Bit::Wire(lc) => Bit::Wire(LinearCombination::constant(FieldElement::one()) - lc.clone()),
        }
    }

    /// `a ⊕ b = a + b − 2ab`, one constraint when both sides are wires.
    pub(crate) fn xor(&self, other: &Bit, builder: &mut ConstraintBuilder) -> Bit {
        match (self, other) {
            (Bit::Constant(a), Bit::Constant(b)) => Bit::Constant(a ^ b),
            (Bit::Constant(false), x) | (x, Bit::Constant(false)) => x.clone(),
            (Bit::Constant(true), x) | (x, Bit::Constant(true)) => x.not(),
            (Bit::Wire(_), Bit::Wire(_)) if self == other => Bit::Constant(false),
            (Bit::Wire(a), Bit::Wire(b)) => {
                let target = builder.alloc_internal();
                let sum = a.clone() + b.clone();
                builder.push_directive(Directive::Quadratic {
                    target,
                    a: a.clone(),
                    b: b.scale(-FieldElement::from(2u64)),
                    c: sum.clone(),
                });
                builder.enforce(
                    a.scale(FieldElement::from(2u64)),
                    b.clone(),
                    sum - target.into(),
                );
                Bit::Wire(target.into())
            }
        }
    }

    pub(crate) fn and(&self, other: &Bit, builder: &mut ConstraintBuilder) -> Bit {
        match (self, other) {
            (Bit::Constant(a), Bit::Constant(b)) => Bit::Constant(*a && *b),
            (Bit::Constant(false), _) | (_, Bit::Constant(false)) => Bit::Constant(false),
            (Bit::Constant(true), x) | (x, Bit::Constant(true)) => x.clone(),
            (Bit::Wire(a), Bit::Wire(b)) => Bit::Wire(builder.product(a.clone(), b.clone()).into()),
        }
    }

    /// `a ∨ b = a + b − ab`.
    pub(crate) fn or(&self, other: &Bit, builder: &mut ConstraintBuilder) -> Bit {
        let both = self.and(other, builder);
        Bit::from_lc(self.lc() + other.lc() - both.lc())
    }

    /// SHA-256 choice: `(e ∧ f) ⊕ (¬e ∧ g) = g + e·(f − g)`.
    pub(crate) fn ch(e: &Bit, f: &Bit, g: &Bit, builder: &mut ConstraintBuilder) -> Bit {
        let e_lc = match e {
            Bit::Constant(true) => return f.clone(),
            Bit::Constant(false) => return g.clone(),
            Bit::Wire(lc) => lc,
        };
        let difference = f.lc() - g.lc();
        if let Some(k) = difference.as_constant() {
            return Bit::from_lc(g.lc() + e_lc.scale(k));
        }
        let target = builder.alloc_internal();
        builder.push_directive(Directive::Quadratic {
            target,
            a: e_lc.clone(),
            b: difference.clone(),
            c: g.lc(),
        });
        builder.enforce(e_lc.clone(), difference, LinearCombination::from(target) - g.lc());
        Bit::Wire(target.into())
    }

    /// SHA-256 majority: with `p = x·y`, `maj = p + z·(x + y − 2p)`.
    pub(crate) fn maj(x: &Bit, y: &Bit, z: &Bit, builder: &mut ConstraintBuilder) -> Bit {
        match (x, y, z) {
            (Bit::Constant(false), a, b) | (a, Bit::Constant(false), b) | (a, b, Bit::Constant(false)) => {
                a.and(b, builder)
            }
            (Bit::Constant(true), a, b) | (a, Bit::Constant(true), b) | (a, b, Bit::Constant(true)) => {
                a.or(b, builder)
            }
            (Bit::Wire(x_lc), Bit::Wire(y_lc), Bit::Wire(z_lc)) => {
                let p: LinearCombination = builder.product(x_lc.clone(), y_lc.clone()).into();
                let spread = x_lc.clone() + y_lc.clone() - p.scale(FieldElement::from(2u64));
                let target = builder.alloc_internal();
                builder.push_directive(Directive::Quadratic {
                    target,
                    a: z_lc.clone(),
                    b: spread.clone(),
                    c: p.clone(),
                });
                builder.enforce(z_lc.clone(), spread, LinearCombination::from(target) - p);
                Bit::Wire(target.into())
            }
        }
    }
}

/// Decomposes `value` into `num_bits` little-endian bits.
///
/// Emits one booleanity constraint per bit and one packing constraint, which
/// together force `value < 2^num_bits`.
pub(crate) fn unpack(
    builder: &mut ConstraintBuilder,
    value: &LinearCombination,
    num_bits: usize,
) -> Result<Vec<Bit>, CompileError> {
    if let Some(constant) = value.as_constant() {
        let bits = constant.to_bits_le();
        if bits.iter().skip(num_bits).any(|bit| *bit) {
            return Err(CompileError::UnsatisfiableStructure {
                message: format!("constant {constant} does not fit in {num_bits} bits"),
            });
        }
        return Ok((0..num_bits)
            .map(|i| Bit::Constant(bits.get(i).copied().unwrap_or(false)))
            .collect());
    }

    let targets: Vec<_> = (0..num_bits).map(|_| builder.alloc_internal()).collect();
    builder.push_directive(Directive::Bits {
        source: value.clone(),
        targets: targets.clone(),
    });
    for target in &targets {
        builder.enforce((*target).into(), (*target).into(), (*target).into());
    }
    let packed = LinearCombination::from_terms(
        targets
            .iter()
            .enumerate()
            .map(|(i, target)| (pow2(i), *target)),
    );
    builder.enforce(
        packed,
        LinearCombination::constant(FieldElement::one()),
        value.clone(),
    );
    Ok(targets.into_iter().map(|t| Bit::Wire(t.into())).collect())
}

/// A 32-bit word, least significant bit first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Word32 {
    bits: [Bit; 32],
}

impl Word32 {
    pub(crate) fn constant(value: u32) -> Self {
        Self {
            bits: std::array::from_fn(|i| Bit::Constant((value >> i) & 1 == 1)),
        }
    }

    /// Builds a word from 32 little-endian bits.
    pub(crate) fn from_bits_le(bits: &[Bit]) -> Self {
        Self {
            bits: std::array::from_fn(|i| bits[i].clone()),
        }
    }

    pub(crate) fn as_constant(&self) -> Option<u32> {
        self.bits.iter().enumerate().try_fold(0u32, |acc, (i, bit)| match bit {
            Bit::Constant(true) => Some(acc | (1 << i)),
            Bit::Constant(false) => Some(acc),
            Bit::Wire(_) => None,
        })
    }

    pub(crate) fn rotr(&self, by: usize) -> Self {
        Self {
            bits: std::array::from_fn(|i| self.bits[(i + by) % 32].clone()),
        }
    }

    pub(crate) fn shr(&self, by: usize) -> Self {
        Self {
            bits: std::array::from_fn(|i| {
                self.bits
                    .get(i + by)
                    .cloned()
                    .unwrap_or(Bit::Constant(false))
            }),
        }
    }

    pub(crate) fn xor(&self, other: &Word32, builder: &mut ConstraintBuilder) -> Self {
        let bits: Vec<Bit> = self
            .bits
            .iter()
            .zip(&other.bits)
            .map(|(a, b)| a.xor(b, builder))
            .collect();
        Self::from_bits_le(&bits)
    }

    pub(crate) fn ch(e: &Word32, f: &Word32, g: &Word32, builder: &mut ConstraintBuilder) -> Self {
        let bits: Vec<Bit> = (0..32)
            .map(|i| Bit::ch(&e.bits[i], &f.bits[i], &g.bits[i], builder))
            .collect();
        Self::from_bits_le(&bits)
    }

    pub(crate) fn maj(x: &Word32, y: &Word32, z: &Word32, builder: &mut ConstraintBuilder) -> Self {
        let bits: Vec<Bit> = (0..32)
            .map(|i| Bit::maj(&x.bits[i], &y.bits[i], &z.bits[i], builder))
            .collect();
        Self::from_bits_le(&bits)
    }

    /// `Σ 2^(shift + i) · bit_i`.
    pub(crate) fn pack(&self, shift: usize) -> LinearCombination {
        self.bits
            .iter()
            .enumerate()
            .fold(LinearCombination::zero(), |acc, (i, bit)| {
                acc + bit.lc().scale(pow2(shift + i))
            })
    }

    /// Sum modulo `2^32`.
    ///
    /// All operands are added in one field element, decomposed into
    /// `32 + ⌈log2 n⌉` bits, and the carry bits are dropped.
    pub(crate) fn addmany(operands: &[Word32], builder: &mut ConstraintBuilder) -> Self {
        if let Some(constants) = operands
            .iter()
            .map(Word32::as_constant)
            .collect::<Option<Vec<u32>>>()
        {
            return Self::constant(constants.iter().fold(0u32, |acc, v| acc.wrapping_add(*v)));
        }

        let max_sum = operands.len() as u64 * u64::from(u32::MAX);
        let num_bits = (u64::BITS - max_sum.leading_zeros()) as usize;
        let sum = operands
            .iter()
            .fold(LinearCombination::zero(), |acc, word| acc + word.pack(0));

        let targets: Vec<_> = (0..num_bits).map(|_| builder.alloc_internal()).collect();
        builder.push_directive(Directive::Bits {
            source: sum.clone(),
            targets: targets.clone(),
        });
        for target in &targets {
            builder.enforce((*target).into(), (*target).into(), (*target).into());
        }
        let packed = LinearCombination::from_terms(
            targets
                .iter()
                .enumerate()
                .map(|(i, target)| (pow2(i), *target)),
        );
        builder.enforce(packed, LinearCombination::constant(FieldElement::one()), sum);

        let bits: Vec<Bit> = targets[..32]
            .iter()
            .map(|t| Bit::Wire((*t).into()))
            .collect();
        Self::from_bits_le(&bits)
    }
}

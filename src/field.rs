//! Arithmetic over the BN254 scalar field.
//!
//! [`FieldElement`] wraps the arkworks Montgomery-form element so that the rest
//! of the crate never deals with arkworks types directly, and so that the
//! parsing rules for user input live in one place: encodings of integers that
//! are not smaller than the modulus are rejected instead of being reduced.

use crate::errors::FieldError;
use ark_bn254::Fr;
use ark_ff::{BigInt, BigInteger, Field, One, PrimeField, Zero};
use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

/// Size in bytes of a canonical field element encoding.
pub const FIELD_BYTES: usize = 32;

/// An element of the BN254 scalar field.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FieldElement(Fr);

impl FieldElement {
    /// The additive identity.
    pub fn zero() -> Self {
        Self(Fr::zero())
    }

    /// The multiplicative identity.
    pub fn one() -> Self {
        Self(Fr::one())
    }

    /// Creates an element from a small integer.
    pub fn from_u64(value: u64) -> Self {
        Self(Fr::from(value))
    }

    /// Creates an element from a 128-bit integer.
    pub fn from_u128(value: u128) -> Self {
        Self(Fr::from(value))
    }

    /// Returns the field modulus as a 32-byte big-endian integer.
    pub fn modulus_be_bytes() -> [u8; FIELD_BYTES] {
        pad_be(&Fr::MODULUS.to_bytes_be())
    }

    /// Returns true if this is the zero element.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if this is the one element.
    pub fn is_one(&self) -> bool {
        self.0.is_one()
    }

    /// Multiplicative inverse.
    ///
    /// Computed as `self^(p - 2)`. The exponent is fixed, so the sequence of
    /// squarings and multiplications is the same for every operand.
    pub fn inverse(&self) -> Result<Self, FieldError> {
        let mut exponent: BigInt<4> = Fr::MODULUS;
        exponent.sub_with_borrow(&BigInt::from(2u64));
        let candidate = self.0.pow(exponent);
        if self.0.is_zero() {
            return Err(FieldError::DivisionByZero);
        }
        Ok(Self(candidate))
    }

    /// Divides `self` by `rhs`.
    pub fn checked_div(&self, rhs: &Self) -> Result<Self, FieldError> {
        Ok(*self * rhs.inverse()?)
    }

    /// Raises `self` to a public exponent.
    pub fn pow(&self, exponent: u64) -> Self {
        Self(self.0.pow([exponent]))
    }

    /// Raises `self` to a public multi-limb exponent (little-endian limbs).
    pub fn pow_limbs(&self, exponent: &[u64]) -> Self {
        Self(self.0.pow(exponent))
    }

    /// Canonical 32-byte big-endian encoding.
    pub fn to_be_bytes(&self) -> [u8; FIELD_BYTES] {
        pad_be(&self.0.into_bigint().to_bytes_be())
    }

    /// Decodes a canonical 32-byte big-endian encoding.
    pub fn from_be_bytes(bytes: &[u8; FIELD_BYTES]) -> Result<Self, FieldError> {
        if *bytes >= Self::modulus_be_bytes() {
            return Err(FieldError::OutOfRange {
                value: format!("0x{}", hex::encode(bytes)),
            });
        }
        Ok(Self(Fr::from_be_bytes_mod_order(bytes)))
    }

    /// Interprets arbitrary bytes as a big-endian integer reduced modulo `p`.
    pub fn from_be_bytes_mod_order(bytes: &[u8]) -> Self {
        Self(Fr::from_be_bytes_mod_order(bytes))
    }

    /// Little-endian bits of the canonical integer representative.
    pub fn to_bits_le(&self) -> Vec<bool> {
        self.0.into_bigint().to_bits_le()
    }

    /// The underlying arkworks element.
    pub fn into_inner(self) -> Fr {
        self.0
    }

    /// The canonical integer representative.
    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.to_be_bytes())
    }

    fn from_biguint_checked(value: &BigUint, original: &str) -> Result<Self, FieldError> {
        let bytes = value.to_bytes_be();
        if bytes.len() > FIELD_BYTES {
            return Err(FieldError::OutOfRange {
                value: original.to_string(),
            });
        }
        Self::from_be_bytes(&pad_be(&bytes)).map_err(|_| FieldError::OutOfRange {
            value: original.to_string(),
        })
    }
}

fn pad_be(bytes: &[u8]) -> [u8; FIELD_BYTES] {
    let mut out = [0u8; FIELD_BYTES];
    let len = bytes.len().min(FIELD_BYTES);
    out[FIELD_BYTES - len..].copy_from_slice(&bytes[bytes.len() - len..]);
    out
}

impl FromStr for FieldElement {
    type Err = FieldError;

    /// Parses a decimal integer or a `0x`-prefixed hexadecimal integer.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(digits) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(FieldError::InvalidEncoding {
                    message: format!("not a hexadecimal integer: {s:?}"),
                });
            }
            let value = BigUint::parse_bytes(digits.as_bytes(), 16).ok_or_else(|| {
                FieldError::InvalidEncoding {
                    message: format!("not a hexadecimal integer: {s:?}"),
                }
            })?;
            return Self::from_biguint_checked(&value, trimmed);
        }

        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FieldError::InvalidEncoding {
                message: format!("not a decimal integer: {s:?}"),
            });
        }
        let value =
            BigUint::parse_bytes(trimmed.as_bytes(), 10).ok_or_else(|| FieldError::InvalidEncoding {
                message: format!("not a decimal integer: {s:?}"),
            })?;
        Self::from_biguint_checked(&value, trimmed)
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_biguint())
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement({})", self.to_biguint())
    }
}

impl From<u64> for FieldElement {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<bool> for FieldElement {
    fn from(value: bool) -> Self {
        Self::from_u64(value as u64)
    }
}

impl From<Fr> for FieldElement {
    fn from(value: Fr) -> Self {
        Self(value)
    }
}

impl From<FieldElement> for Fr {
    fn from(value: FieldElement) -> Self {
        value.0
    }
}

impl Add for FieldElement {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for FieldElement {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul for FieldElement {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self(self.0 * rhs.0)
    }
}

impl Neg for FieldElement {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl AddAssign for FieldElement {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for FieldElement {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl MulAssign for FieldElement {
    fn mul_assign(&mut self, rhs: Self) {
        self.0 *= rhs.0;
    }
}

impl Serialize for FieldElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

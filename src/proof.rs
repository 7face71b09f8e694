//! Proof structures and serialization.
//!
//! This module provides the Groth16 proof wrapper and the public inputs it is
//! checked against, together with the framed binary format shared by proofs
//! and keys:
//!
//! ```text
//! magic (4) | version (u32 LE) | { length (u64 LE) | section }* | SHA-256 of everything before (32)
//! ```

use crate::errors::SerializationError;
use crate::field::{FieldElement, FIELD_BYTES};
use crate::witness::Witness;
use ark_bn254::Bn254;
use ark_groth16::Proof as ArkProof;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Magic bytes for proof files.
const PROOF_MAGIC: &[u8; 4] = b"G16R";

/// Current version of the proof serialization format.
pub const PROOF_FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 4 + 4;
const TRAILER_LEN: usize = 32;

/// A Groth16 proof over BN254.
#[derive(Clone, PartialEq)]
pub struct Proof {
    proof: ArkProof<Bn254>,
    version: u32,
}

impl Eq for Proof {}

impl Proof {
    /// Wraps an arkworks proof.
    pub(crate) fn new(proof: ArkProof<Bn254>) -> Self {
        Self {
            proof,
            version: PROOF_FORMAT_VERSION,
        }
    }

    /// Format version of this proof.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Serializes the proof to bytes.
    ///
    /// # Returns
    /// The serialized proof bytes, or an error
    pub fn to_bytes(&self) -> Result<Vec<u8>, SerializationError> {
        let mut proof_bytes = Vec::new();
        self.proof
            .serialize_compressed(&mut proof_bytes)
            .map_err(|e| SerializationError::BinarySerializationFailed {
                message: e.to_string(),
            })?;
        Ok(seal(PROOF_MAGIC, self.version, &[&proof_bytes[..]]))
    }

    /// Deserializes a proof from bytes.
    ///
    /// # Arguments
    /// * `bytes` - The serialized proof bytes
    ///
    /// # Returns
    /// The deserialized proof, or an error
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SerializationError> {
        let [proof_data] = unseal::<1>(bytes, PROOF_MAGIC, PROOF_FORMAT_VERSION, "proof")?;
        // Points are checked to be on the curve and in the right subgroup.
        let proof = ArkProof::deserialize_compressed(proof_data).map_err(|e| {
            SerializationError::BinaryDeserializationFailed {
                message: e.to_string(),
            }
        })?;
        Ok(Self::new(proof))
    }

    /// Serializes the proof to a hex string.
    pub fn to_hex(&self) -> Result<String, SerializationError> {
        let bytes = self.to_bytes()?;
        Ok(hex::encode(bytes))
    }

    /// Deserializes a proof from a hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, SerializationError> {
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// The `uint256[8]` proof words `a.x, a.y, b.x1, b.x0, b.y1, b.y0, c.x, c.y`
    /// accepted by the generated verifier contract.
    pub fn to_solidity_bytes(&self) -> [u8; 256] {
        crate::solidity::encode_proof(&self.proof)
    }

    /// Returns the raw arkworks proof.
    pub fn into_inner(self) -> ArkProof<Bn254> {
        self.proof
    }

    /// Returns a reference to the raw arkworks proof.
    pub fn inner(&self) -> &ArkProof<Bn254> {
        &self.proof
    }

    /// Saves the proof to a file.
    pub fn save_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), SerializationError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), bytes).map_err(|e| {
            SerializationError::BinarySerializationFailed {
                message: e.to_string(),
            }
        })
    }

    /// Loads a proof from a file.
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, SerializationError> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| {
            SerializationError::BinaryDeserializationFailed {
                message: e.to_string(),
            }
        })?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Debug for Proof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proof")
            .field("a", &self.proof.a)
            .field("b", &self.proof.b)
            .field("c", &self.proof.c)
            .finish()
    }
}

/// Public inputs for proof verification: declared public inputs followed by
/// the circuit's outputs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicInputs {
    /// The public input values as field elements.
    pub values: Vec<FieldElement>,
}

impl PublicInputs {
    /// Creates new public inputs from field elements.
    pub fn new(values: Vec<FieldElement>) -> Self {
        Self { values }
    }

    /// Creates empty public inputs.
    pub fn empty() -> Self {
        Self { values: Vec::new() }
    }

    /// The instance of a solved witness.
    pub fn from_witness(witness: &Witness) -> Self {
        Self::new(witness.public_inputs().to_vec())
    }

    /// Returns the number of public inputs.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no public inputs.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Serializes the public inputs to bytes: a u64 count followed by one
    /// 32-byte big-endian word per value.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8 + self.values.len() * FIELD_BYTES);
        bytes.extend_from_slice(&(self.values.len() as u64).to_le_bytes());
        for value in &self.values {
            bytes.extend_from_slice(&value.to_be_bytes());
        }
        bytes
    }

    /// Deserializes public inputs from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SerializationError> {
        let (count, rest) = read_u64(bytes).ok_or_else(|| {
            SerializationError::BinaryDeserializationFailed {
                message: "Data too short for public inputs".to_string(),
            }
        })?;
        let count = usize::try_from(count).map_err(|_| SerializationError::InvalidFormat {
            message: format!("Public input count {count} is too large"),
        })?;
        if rest.len() != count.saturating_mul(FIELD_BYTES) {
            return Err(SerializationError::InvalidFormat {
                message: format!(
                    "Expected {} bytes for {count} public inputs, found {}",
                    count.saturating_mul(FIELD_BYTES),
                    rest.len()
                ),
            });
        }

        let values = rest
            .chunks_exact(FIELD_BYTES)
            .map(|chunk| {
                let mut word = [0u8; FIELD_BYTES];
                word.copy_from_slice(chunk);
                FieldElement::from_be_bytes(&word).map_err(|e| SerializationError::InvalidFormat {
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { values })
    }

    /// Serializes the public inputs to a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Deserializes public inputs from a hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, SerializationError> {
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }
}

impl From<Vec<FieldElement>> for PublicInputs {
    fn from(values: Vec<FieldElement>) -> Self {
        Self::new(values)
    }
}

/// Frames `sections` with magic, version and an integrity hash.
pub(crate) fn seal(magic: &[u8; 4], version: u32, sections: &[&[u8]]) -> Vec<u8> {
    let payload_len: usize = sections.iter().map(|s| 8 + s.len()).sum();
    let mut bytes = Vec::with_capacity(HEADER_LEN + payload_len + TRAILER_LEN);

    bytes.extend_from_slice(magic);
    bytes.extend_from_slice(&version.to_le_bytes());
    for section in sections {
        bytes.extend_from_slice(&(section.len() as u64).to_le_bytes());
        bytes.extend_from_slice(section);
    }

    let hash = compute_integrity_hash(&bytes);
    bytes.extend_from_slice(&hash);
    bytes
}

/// Checks the framing written by [`seal`] and returns exactly `N` sections.
pub(crate) fn unseal<'a, const N: usize>(
    bytes: &'a [u8],
    magic: &[u8; 4],
    version: u32,
    what: &str,
) -> Result<[&'a [u8]; N], SerializationError> {
    if bytes.len() < HEADER_LEN + TRAILER_LEN {
        return Err(SerializationError::BinaryDeserializationFailed {
            message: format!("Data too short to be a valid {what}"),
        });
    }

    // Verify integrity hash
    let data_len = bytes.len() - TRAILER_LEN;
    let expected_hash = &bytes[data_len..];
    let computed_hash = compute_integrity_hash(&bytes[..data_len]);
    if expected_hash != computed_hash {
        return Err(SerializationError::IntegrityCheckFailed {
            computed: hex::encode(computed_hash),
            expected: hex::encode(expected_hash),
        });
    }

    if &bytes[..4] != magic {
        return Err(SerializationError::InvalidFormat {
            message: format!("Invalid {what} file format"),
        });
    }

    let mut found = [0u8; 4];
    found.copy_from_slice(&bytes[4..8]);
    let found = u32::from_le_bytes(found);
    if found != version {
        return Err(SerializationError::InvalidFormat {
            message: format!("Unsupported {what} format version: {found} (expected {version})"),
        });
    }

    let empty: &'a [u8] = &bytes[..0];
    let mut sections = [empty; N];
    let mut rest = &bytes[HEADER_LEN..data_len];
    for section in sections.iter_mut() {
        let truncated = || SerializationError::BinaryDeserializationFailed {
            message: format!("Truncated {what} data"),
        };
        let (len, tail) = read_u64(rest).ok_or_else(truncated)?;
        let len = usize::try_from(len).map_err(|_| truncated())?;
        if tail.len() < len {
            return Err(truncated());
        }
        *section = &tail[..len];
        rest = &tail[len..];
    }
    if !rest.is_empty() {
        return Err(SerializationError::InvalidFormat {
            message: format!("{} trailing bytes after {what} data", rest.len()),
        });
    }
    Ok(sections)
}

fn read_u64(bytes: &[u8]) -> Option<(u64, &[u8])> {
    if bytes.len() < 8 {
        return None;
    }
    let (head, tail) = bytes.split_at(8);
    let mut word = [0u8; 8];
    word.copy_from_slice(head);
    Some((u64::from_le_bytes(word), tail))
}

/// Computes an integrity hash of the given data.
fn compute_integrity_hash(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_round_trip() {
        let sealed = seal(b"TEST", 3, &[b"abc", b"", b"de"]);
        let [a, b, c] = unseal::<3>(&sealed, b"TEST", 3, "test").unwrap();
        assert_eq!((a, b, c), (&b"abc"[..], &b""[..], &b"de"[..]));
    }

    #[test]
    fn test_unseal_rejects_tampering_and_wrong_headers() {
        let sealed = seal(b"TEST", 1, &[b"payload"]);

        let mut tampered = sealed.clone();
        tampered[10] ^= 1;
        assert!(matches!(
            unseal::<1>(&tampered, b"TEST", 1, "test"),
            Err(SerializationError::IntegrityCheckFailed { .. })
        ));
        assert!(matches!(
            unseal::<1>(&sealed, b"ELSE", 1, "test"),
            Err(SerializationError::InvalidFormat { .. })
        ));
        assert!(matches!(
            unseal::<1>(&sealed, b"TEST", 2, "test"),
            Err(SerializationError::InvalidFormat { .. })
        ));
        assert!(matches!(
            unseal::<2>(&sealed, b"TEST", 1, "test"),
            Err(SerializationError::BinaryDeserializationFailed { .. })
        ));
    }

    #[test]
    fn test_public_inputs_bytes() {
        let inputs = PublicInputs::new(vec![FieldElement::from(35u64), -FieldElement::one()]);
        let bytes = inputs.to_bytes();
        assert_eq!(bytes.len(), 8 + 64);
        assert_eq!(PublicInputs::from_bytes(&bytes).unwrap(), inputs);
        assert_eq!(PublicInputs::from_hex(&inputs.to_hex()).unwrap(), inputs);
        assert!(PublicInputs::from_bytes(&bytes[..40]).is_err());
    }

    #[test]
    fn test_public_inputs_json_is_decimal_strings() {
        let inputs = PublicInputs::new(vec![FieldElement::from(5u64)]);
        assert_eq!(serde_json::to_string(&inputs).unwrap(), r#"["5"]"#);
    }
}

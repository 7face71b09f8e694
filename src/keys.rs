//! Proving and verifying keys.
//!
//! Both keys carry the fingerprint of the constraint system they were
//! generated for. The proving key also owns that constraint system, since
//! proving replays it into arkworks, so a serialized proving key is
//! self-contained.

use crate::errors::{KeyError, SerializationError};
use crate::proof::{seal, unseal};
use crate::r1cs::ConstraintSystem;
use ark_bn254::Bn254;
use ark_groth16::{
    prepare_verifying_key, PreparedVerifyingKey, ProvingKey as ArkProvingKey,
    VerifyingKey as ArkVerifyingKey,
};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Magic bytes for proving key files.
const PROVING_KEY_MAGIC: &[u8; 4] = b"G16P";

/// Magic bytes for verifying key files.
const VERIFYING_KEY_MAGIC: &[u8; 4] = b"G16V";

/// Current version of the key serialization format.
pub const KEY_FORMAT_VERSION: u32 = 1;

impl From<SerializationError> for KeyError {
    fn from(err: SerializationError) -> Self {
        KeyError::DeserializationFailed {
            message: err.to_string(),
        }
    }
}

fn fingerprint_from(section: &[u8]) -> Result<[u8; 32], KeyError> {
    section
        .try_into()
        .map_err(|_| KeyError::DeserializationFailed {
            message: format!("Fingerprint must be 32 bytes, found {}", section.len()),
        })
}

/// A Groth16 proving key bound to its constraint system.
#[derive(Clone)]
pub struct ProvingKey {
    key: ArkProvingKey<Bn254>,
    cs: Arc<ConstraintSystem>,
}

impl ProvingKey {
    pub(crate) fn new(key: ArkProvingKey<Bn254>, cs: Arc<ConstraintSystem>) -> Self {
        Self { key, cs }
    }

    /// Fingerprint of the constraint system this key proves.
    pub fn fingerprint(&self) -> [u8; 32] {
        self.cs.fingerprint()
    }

    /// The constraint system this key proves.
    pub fn constraint_system(&self) -> &Arc<ConstraintSystem> {
        &self.cs
    }

    /// The matching verifying key.
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey::new(self.key.vk.clone(), self.cs.fingerprint())
    }

    /// Returns a reference to the raw arkworks key.
    pub fn inner(&self) -> &ArkProvingKey<Bn254> {
        &self.key
    }

    /// Serializes the key.
    ///
    /// Curve points are written uncompressed; proving keys are large and
    /// decompression dominates loading time otherwise.
    pub fn to_bytes(&self) -> Result<Vec<u8>, KeyError> {
        let mut key_bytes = Vec::new();
        self.key
            .serialize_uncompressed(&mut key_bytes)
            .map_err(|e| KeyError::SerializationFailed {
                message: e.to_string(),
            })?;
        let cs_bytes = serde_json::to_vec(self.cs.as_ref()).map_err(|e| KeyError::SerializationFailed {
            message: e.to_string(),
        })?;
        Ok(seal(
            PROVING_KEY_MAGIC,
            KEY_FORMAT_VERSION,
            &[&self.cs.fingerprint()[..], &key_bytes[..], &cs_bytes[..]],
        ))
    }

    /// Deserializes a key written by [`to_bytes`](Self::to_bytes).
    ///
    /// Every curve point is checked to lie on the curve and in the prime-order
    /// subgroup; the integrity trailer alone does not authenticate the file.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let [fingerprint, key_bytes, cs_bytes] =
            unseal::<3>(bytes, PROVING_KEY_MAGIC, KEY_FORMAT_VERSION, "proving key")?;
        let fingerprint = fingerprint_from(fingerprint)?;

        let key = ArkProvingKey::<Bn254>::deserialize_uncompressed(key_bytes).map_err(|e| {
            KeyError::DeserializationFailed {
                message: e.to_string(),
            }
        })?;
        let cs: ConstraintSystem =
            serde_json::from_slice(cs_bytes).map_err(|e| KeyError::DeserializationFailed {
                message: e.to_string(),
            })?;

        if !cs.is_well_formed() || cs.fingerprint() != fingerprint {
            return Err(KeyError::IncompatibleKey {
                message: "embedded constraint system does not match the key fingerprint".to_string(),
            });
        }
        if key.vk.gamma_abc_g1.len() != cs.num_public() + 1 {
            return Err(KeyError::IncompatibleKey {
                message: format!(
                    "key has {} public inputs, constraint system has {}",
                    key.vk.gamma_abc_g1.len().saturating_sub(1),
                    cs.num_public()
                ),
            });
        }

        Ok(Self::new(key, Arc::new(cs)))
    }

    /// Serializes the key to a hex string.
    pub fn to_hex(&self) -> Result<String, KeyError> {
        Ok(hex::encode(self.to_bytes()?))
    }

    /// Deserializes a key from a hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str).map_err(SerializationError::from)?;
        Self::from_bytes(&bytes)
    }

    /// Saves the key to a file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), KeyError> {
        std::fs::write(path.as_ref(), self.to_bytes()?)?;
        Ok(())
    }

    /// Loads a key from a file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, KeyError> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Debug for ProvingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvingKey")
            .field("circuit", &self.cs.name())
            .field("fingerprint", &self.cs.fingerprint_hex())
            .field("constraints", &self.cs.num_constraints())
            .finish_non_exhaustive()
    }
}

/// A Groth16 verifying key with its pairing-prepared form cached.
#[derive(Clone)]
pub struct VerifyingKey {
    key: ArkVerifyingKey<Bn254>,
    prepared: PreparedVerifyingKey<Bn254>,
    fingerprint: [u8; 32],
}

impl VerifyingKey {
    pub(crate) fn new(key: ArkVerifyingKey<Bn254>, fingerprint: [u8; 32]) -> Self {
        let prepared = prepare_verifying_key(&key);
        Self {
            key,
            prepared,
            fingerprint,
        }
    }

    /// Fingerprint of the constraint system this key verifies.
    pub fn fingerprint(&self) -> [u8; 32] {
        self.fingerprint
    }

    /// Number of public inputs (declared inputs plus outputs) a proof is checked against.
    pub fn num_public_inputs(&self) -> usize {
        self.key.gamma_abc_g1.len().saturating_sub(1)
    }

    /// Returns a reference to the raw arkworks key.
    pub fn inner(&self) -> &ArkVerifyingKey<Bn254> {
        &self.key
    }

    /// The pairing-prepared key used for verification.
    pub fn prepared(&self) -> &PreparedVerifyingKey<Bn254> {
        &self.prepared
    }

    /// Serializes the key.
    pub fn to_bytes(&self) -> Result<Vec<u8>, KeyError> {
        let mut key_bytes = Vec::new();
        self.key
            .serialize_compressed(&mut key_bytes)
            .map_err(|e| KeyError::SerializationFailed {
                message: e.to_string(),
            })?;
        Ok(seal(
            VERIFYING_KEY_MAGIC,
            KEY_FORMAT_VERSION,
            &[&self.fingerprint[..], &key_bytes[..]],
        ))
    }

    /// Deserializes a key written by [`to_bytes`](Self::to_bytes).
    ///
    /// Every curve point is validated; a verifying key usually comes from
    /// someone else.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let [fingerprint, key_bytes] =
            unseal::<2>(bytes, VERIFYING_KEY_MAGIC, KEY_FORMAT_VERSION, "verifying key")?;
        let fingerprint = fingerprint_from(fingerprint)?;
        let key = ArkVerifyingKey::<Bn254>::deserialize_compressed(key_bytes).map_err(|e| {
            KeyError::DeserializationFailed {
                message: e.to_string(),
            }
        })?;
        if key.gamma_abc_g1.is_empty() {
            return Err(KeyError::IncompatibleKey {
                message: "verifying key has no input commitments".to_string(),
            });
        }
        Ok(Self::new(key, fingerprint))
    }

    /// Serializes the key to a hex string.
    pub fn to_hex(&self) -> Result<String, KeyError> {
        Ok(hex::encode(self.to_bytes()?))
    }

    /// Deserializes a key from a hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str).map_err(SerializationError::from)?;
        Self::from_bytes(&bytes)
    }

    /// Saves the key to a file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), KeyError> {
        std::fs::write(path.as_ref(), self.to_bytes()?)?;
        Ok(())
    }

    /// Loads a key from a file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, KeyError> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }
}

impl PartialEq for VerifyingKey {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint && self.key == other.key
    }
}

impl Eq for VerifyingKey {}

impl fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyingKey")
            .field("fingerprint", &hex::encode(self.fingerprint))
            .field("num_public_inputs", &self.num_public_inputs())
            .finish_non_exhaustive()
    }
}

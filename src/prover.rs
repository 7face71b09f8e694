//! Groth16 setup, proving and verification.
//!
//! # Usage
//!
//! ```ignore
//! use snarkpipe::prelude::*;
//! use std::sync::Arc;
//!
//! let cs = Arc::new(compile(circuits::SQUARE_ROOT)?);
//! let prover = Groth16Prover::new();
//!
//! // Generate keys (for development only - see the security warning below)
//! let (pk, vk) = prover.setup(cs.clone(), Seed::random())?;
//!
//! // Solve a witness and prove
//! let witness = solve(&cs, &[], &[FieldElement::from(5u64)])?;
//! let proof = prover.prove(&pk, &witness, Seed::random())?;
//!
//! // Verify the proof
//! assert!(prover.verify(&vk, &PublicInputs::from_witness(&witness), &proof));
//! ```
//!
//! # Security Warning
//!
//! `setup` is a single-party trusted setup: whoever knows the seed can forge
//! proofs. Use it for development and testing, draw seeds from
//! [`Seed::random`], and never keep or reuse a setup seed.

use crate::errors::{ProveError, SetupError};
use crate::keys::{ProvingKey, VerifyingKey};
use crate::proof::{Proof, PublicInputs};
use crate::r1cs::{ConstraintSystem, R1csCircuit};
use crate::witness::Witness;

use ark_bn254::{Bn254, Fr};
use ark_groth16::Groth16;
use ark_snark::SNARK;
use ark_std::rand::{rngs::StdRng, CryptoRng, RngCore, SeedableRng};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// 32 bytes of randomness for one setup or one proof.
///
/// A seed is consumed by the operation it is passed to. Identical seeds give
/// identical keys (or proofs), which is what makes test fixtures
/// reproducible; in production every seed must be fresh.
pub struct Seed([u8; 32]);

impl Seed {
    /// Wraps raw seed bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Draws a fresh seed from the thread-local CSPRNG.
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        ark_std::rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// A fixed seed derived from a small integer, for tests and fixtures.
    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&value.to_le_bytes());
        Self(bytes)
    }

    fn into_rng(self) -> StdRng {
        StdRng::from_seed(self.0)
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(..)")
    }
}

impl Serialize for Seed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Seed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("seed must be 32 bytes of hex"))?;
        Ok(Self(bytes))
    }
}

/// The Groth16 prover over BN254.
#[derive(Debug, Default, Clone, Copy)]
pub struct Groth16Prover;

impl Groth16Prover {
    /// Creates a new Groth16 prover.
    pub fn new() -> Self {
        Self
    }

    /// Generates proving and verifying keys for a constraint system.
    ///
    /// # Security Warning
    ///
    /// The seed is toxic waste: anyone who learns it can forge proofs for
    /// this circuit. It is consumed here and must not be kept elsewhere.
    ///
    /// # Arguments
    /// * `cs` - The constraint system to generate keys for
    /// * `seed` - Randomness for the setup
    ///
    /// # Returns
    /// A tuple of (proving_key, verifying_key), or an error
    pub fn setup(
        &self,
        cs: Arc<ConstraintSystem>,
        seed: Seed,
    ) -> Result<(ProvingKey, VerifyingKey), SetupError> {
        self.setup_with_rng(cs, &mut seed.into_rng())
    }

    /// Generates proving and verifying keys with a specified RNG.
    #[instrument(skip_all, fields(circuit = cs.name(), constraints = cs.num_constraints()))]
    pub fn setup_with_rng<R: RngCore + CryptoRng>(
        &self,
        cs: Arc<ConstraintSystem>,
        rng: &mut R,
    ) -> Result<(ProvingKey, VerifyingKey), SetupError> {
        if cs.num_constraints() == 0 {
            return Err(SetupError::DegenerateSystem);
        }

        let start = Instant::now();
        let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(R1csCircuit::new(&cs), rng)
            .map_err(|e| SetupError::Backend {
                message: e.to_string(),
            })?;
        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            public_inputs = cs.num_public(),
            "keys generated"
        );

        let vk = VerifyingKey::new(vk, cs.fingerprint());
        Ok((ProvingKey::new(pk, cs), vk))
    }

    /// Generates a proof for a solved witness.
    ///
    /// # Arguments
    /// * `proving_key` - The proving key
    /// * `witness` - A witness solved against the key's constraint system
    /// * `seed` - Randomness for the proof's blinding factors
    ///
    /// # Returns
    /// The generated proof, or an error
    pub fn prove(
        &self,
        proving_key: &ProvingKey,
        witness: &Witness,
        seed: Seed,
    ) -> Result<Proof, ProveError> {
        self.prove_with_rng(proving_key, witness, &mut seed.into_rng())
    }

    /// Generates a proof with a specified RNG.
    #[instrument(skip_all, fields(circuit = proving_key.constraint_system().name()))]
    pub fn prove_with_rng<R: RngCore + CryptoRng>(
        &self,
        proving_key: &ProvingKey,
        witness: &Witness,
        rng: &mut R,
    ) -> Result<Proof, ProveError> {
        if witness.fingerprint() != proving_key.fingerprint() {
            return Err(ProveError::KeyWitnessMismatch {
                expected: hex::encode(proving_key.fingerprint()),
                actual: hex::encode(witness.fingerprint()),
            });
        }

        let start = Instant::now();
        let circuit = R1csCircuit::with_witness(proving_key.constraint_system(), witness);
        let proof = Groth16::<Bn254>::prove(proving_key.inner(), circuit, rng).map_err(|e| {
            ProveError::InternalCryptoFault {
                message: e.to_string(),
            }
        })?;
        debug!(elapsed_ms = start.elapsed().as_millis() as u64, "proof generated");

        Ok(Proof::new(proof))
    }

    /// Convenience method to prove and return both the proof and public inputs.
    pub fn prove_with_public_inputs(
        &self,
        proving_key: &ProvingKey,
        witness: &Witness,
        seed: Seed,
    ) -> Result<(Proof, PublicInputs), ProveError> {
        let proof = self.prove(proving_key, witness, seed)?;
        Ok((proof, PublicInputs::from_witness(witness)))
    }

    /// Verifies a proof against public inputs.
    ///
    /// Rejection is reported as `false`, including a wrong number of public
    /// inputs; nothing here depends on secrets, so the check may be repeated
    /// freely and from several threads.
    ///
    /// # Arguments
    /// * `verifying_key` - The verifying key
    /// * `public_inputs` - Public inputs followed by outputs
    /// * `proof` - The proof to verify
    #[instrument(skip_all, fields(public_inputs = public_inputs.len()))]
    pub fn verify(
        &self,
        verifying_key: &VerifyingKey,
        public_inputs: &PublicInputs,
        proof: &Proof,
    ) -> bool {
        if public_inputs.len() != verifying_key.num_public_inputs() {
            warn!(
                expected = verifying_key.num_public_inputs(),
                actual = public_inputs.len(),
                "wrong number of public inputs"
            );
            return false;
        }

        let inputs: Vec<Fr> = public_inputs.values.iter().map(|v| v.into_inner()).collect();
        match Groth16::<Bn254>::verify_with_processed_vk(
            verifying_key.prepared(),
            &inputs,
            proof.inner(),
        ) {
            Ok(true) => true,
            Ok(false) => {
                warn!("proof rejected");
                false
            }
            Err(e) => {
                warn!(error = %e, "verifier error");
                false
            }
        }
    }

    /// Verifies several proofs against the same key.
    ///
    /// With the `parallel` feature the proofs are checked on the rayon pool.
    pub fn verify_batch(
        &self,
        verifying_key: &VerifyingKey,
        items: &[(PublicInputs, Proof)],
    ) -> Vec<bool> {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            items
                .par_iter()
                .map(|(inputs, proof)| self.verify(verifying_key, inputs, proof))
                .collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            items
                .iter()
                .map(|(inputs, proof)| self.verify(verifying_key, inputs, proof))
                .collect()
        }
    }
}

/// Convenience function to generate keys for a constraint system.
///
/// # Security Warning
///
/// See [`Groth16Prover::setup`].
pub fn setup(
    cs: Arc<ConstraintSystem>,
    seed: Seed,
) -> Result<(ProvingKey, VerifyingKey), SetupError> {
    Groth16Prover::new().setup(cs, seed)
}

/// Convenience function to generate a proof.
pub fn prove(proving_key: &ProvingKey, witness: &Witness, seed: Seed) -> Result<Proof, ProveError> {
    Groth16Prover::new().prove(proving_key, witness, seed)
}

/// Convenience function to verify a proof.
pub fn verify(verifying_key: &VerifyingKey, public_inputs: &PublicInputs, proof: &Proof) -> bool {
    Groth16Prover::new().verify(verifying_key, public_inputs, proof)
}

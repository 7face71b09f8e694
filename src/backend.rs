//! Proof-system capability interface.
//!
//! A backend bundles the five pipeline stages for one proving scheme. The
//! stages that do not depend on the scheme (compiling and solving) have
//! shared default implementations.

use crate::compiler;
use crate::errors::{CompileError, ContractGenerationError, ProveError, SetupError, SolveError};
use crate::field::FieldElement;
use crate::keys::{ProvingKey, VerifyingKey};
use crate::proof::{Proof, PublicInputs};
use crate::prover::{Groth16Prover, Seed};
use crate::r1cs::ConstraintSystem;
use crate::solidity::SolidityVerifierGenerator;
use crate::witness::{self, Witness};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Proving schemes a pipeline can be configured with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum ProofScheme {
    /// Groth16 over BN254.
    #[default]
    Groth16,
}

impl fmt::Display for ProofScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProofScheme::Groth16 => f.write_str("groth16"),
        }
    }
}

/// The stages of a proving pipeline for one scheme.
///
/// Implementations hold no mutable state, so one backend value can serve
/// any number of threads.
pub trait ProvingBackend: Send + Sync {
    /// Key used by [`prove`](Self::prove).
    type ProvingKey: Send + Sync;
    /// Key used by [`verify`](Self::verify) and the verifier export.
    type VerifyingKey: Clone + Send + Sync;
    /// The proof type produced by this scheme.
    type Proof: Clone + Send + Sync;

    /// The scheme this backend implements.
    fn scheme(&self) -> ProofScheme;

    /// Compiles circuit source.
    fn compile(&self, source: &str) -> Result<ConstraintSystem, CompileError> {
        compiler::compile(source)
    }

    /// Solves a witness.
    fn solve(
        &self,
        cs: &ConstraintSystem,
        public_inputs: &[FieldElement],
        private_inputs: &[FieldElement],
    ) -> Result<Witness, SolveError> {
        witness::solve(cs, public_inputs, private_inputs)
    }

    /// Generates the key pair for a constraint system.
    fn setup(
        &self,
        cs: Arc<ConstraintSystem>,
        seed: Seed,
    ) -> Result<(Self::ProvingKey, Self::VerifyingKey), SetupError>;

    /// Proves a solved witness.
    fn prove(
        &self,
        pk: &Self::ProvingKey,
        witness: &Witness,
        seed: Seed,
    ) -> Result<Self::Proof, ProveError>;

    /// Checks a proof; rejection is `false`.
    fn verify(&self, vk: &Self::VerifyingKey, public_inputs: &PublicInputs, proof: &Self::Proof)
        -> bool;

    /// Renders an on-chain verifier for a verifying key.
    fn export_verifier(
        &self,
        vk: &Self::VerifyingKey,
        contract_name: &str,
    ) -> Result<String, ContractGenerationError>;
}

/// Groth16 over BN254 with a Solidity verifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct Groth16Backend {
    prover: Groth16Prover,
}

impl Groth16Backend {
    /// Creates the backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProvingBackend for Groth16Backend {
    type ProvingKey = ProvingKey;
    type VerifyingKey = VerifyingKey;
    type Proof = Proof;

    fn scheme(&self) -> ProofScheme {
        ProofScheme::Groth16
    }

    fn setup(
        &self,
        cs: Arc<ConstraintSystem>,
        seed: Seed,
    ) -> Result<(ProvingKey, VerifyingKey), SetupError> {
        self.prover.setup(cs, seed)
    }

    fn prove(&self, pk: &ProvingKey, witness: &Witness, seed: Seed) -> Result<Proof, ProveError> {
        self.prover.prove(pk, witness, seed)
    }

    fn verify(&self, vk: &VerifyingKey, public_inputs: &PublicInputs, proof: &Proof) -> bool {
        self.prover.verify(vk, public_inputs, proof)
    }

    fn export_verifier(
        &self,
        vk: &VerifyingKey,
        contract_name: &str,
    ) -> Result<String, ContractGenerationError> {
        SolidityVerifierGenerator::new()
            .with_contract_name(contract_name)
            .generate(vk)
    }
}

/// The backend for a configured scheme.
pub fn select(scheme: ProofScheme) -> Groth16Backend {
    match scheme {
        ProofScheme::Groth16 => Groth16Backend::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_backend_and_keys_are_shareable() {
        assert_send_sync::<Groth16Backend>();
        assert_send_sync::<ProvingKey>();
        assert_send_sync::<VerifyingKey>();
        assert_send_sync::<Proof>();
        assert_send_sync::<Witness>();
    }

    #[test]
    fn test_scheme_serde() {
        assert_eq!(serde_json::to_string(&ProofScheme::Groth16).unwrap(), "\"groth16\"");
        assert_eq!(
            serde_json::from_str::<ProofScheme>("\"groth16\"").unwrap(),
            ProofScheme::Groth16
        );
        assert!(serde_json::from_str::<ProofScheme>("\"plonk\"").is_err());
        assert_eq!(select(ProofScheme::default()).scheme(), ProofScheme::Groth16);
    }
}

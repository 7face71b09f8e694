//! # snarkpipe
//!
//! A Groth16 proving pipeline over BN254: compile a small ZoKrates-flavoured
//! circuit language to R1CS, solve witnesses, generate keys, prove, verify,
//! and export a Solidity verifier.
//!
//! ## Features
//!
//! - **Circuit compiler**: `def main(...)` programs with field arithmetic,
//!   `assert(lhs == rhs)` constraints and a `sha256packed` builtin
//! - **Witness solver**: forward evaluation of the compiled operation sequence,
//!   followed by a full constraint check
//! - **Groth16 proving**: setup, proving and verification via arkworks
//! - **Solidity verification**: a self-contained verifier contract plus EVM
//!   encodings of proofs, public inputs and verifying keys
//! - **Persistence**: versioned key and proof files with integrity checks
//!
//! ## Security Warning
//!
//! Setup is a single-party trusted setup: whoever knows the setup seed can
//! forge proofs. Use it for development and testing only, and never keep or
//! reuse a setup seed.
//!
//! ## Usage
//!
//! ### Stage by stage
//!
//! ```ignore
//! use snarkpipe::prelude::*;
//! use std::sync::Arc;
//!
//! let cs = Arc::new(compile(circuits::SQUARE_ROOT)?);
//! let (pk, vk) = setup(cs.clone(), Seed::random())?;
//!
//! let witness = solve(&cs, &[], &[FieldElement::from(5u64)])?;
//! let proof = prove(&pk, &witness, Seed::random())?;
//! assert!(verify(&vk, &PublicInputs::from_witness(&witness), &proof));
//! ```
//!
//! ### As a pipeline
//!
//! ```ignore
//! use snarkpipe::prelude::*;
//!
//! let pipeline = Pipeline::initialize(circuits::HASH_PREIMAGE, PipelineConfig::default())?;
//! let zero = FieldElement::zero();
//! let output = pipeline.run(&[], &[zero, zero, zero, FieldElement::from(5u64)])?;
//! println!("{}", output.verification_status());
//! std::fs::write("Groth16Verifier.sol", &output.verifier_artifact)?;
//! ```
//!
//! ### Serializing Keys and Proofs
//!
//! ```ignore
//! pk.save_to_file("proving_key.bin")?;
//! vk.save_to_file("verifying_key.bin")?;
//!
//! let pk = ProvingKey::load_from_file("proving_key.bin")?;
//! let vk = VerifyingKey::load_from_file("verifying_key.bin")?;
//!
//! let proof_hex = proof.to_hex()?;
//! let loaded_proof = Proof::from_hex(&proof_hex)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `parallel`: Enable parallel computation using rayon, inside arkworks and
//!   in the batch solve and verify helpers

#![warn(missing_docs)]
#![warn(unused_crate_dependencies)]
#![warn(unreachable_pub)]
#![deny(unsafe_code)]

pub mod backend;
pub mod circuit;
pub mod circuits;
pub mod compiler;
pub mod config;
pub mod errors;
pub mod field;
mod gadgets;
pub mod keys;
pub mod parser;
pub mod pipeline;
pub mod proof;
pub mod prover;
pub mod r1cs;
pub mod solidity;
pub mod witness;

#[cfg(test)]
use tracing_subscriber as _;

// Re-export curve type for convenience
pub use ark_bn254::Bn254;

// Re-export main types
pub use backend::{Groth16Backend, ProofScheme, ProvingBackend};
pub use circuit::CircuitDescription;
pub use compiler::{compile, compile_description};
pub use config::PipelineConfig;
pub use errors::{PipelineError, PipelineResult};
pub use field::FieldElement;
pub use keys::{ProvingKey, VerifyingKey};
pub use pipeline::{Pipeline, PipelineOutput};
pub use proof::{Proof, PublicInputs};
pub use prover::{prove, setup, verify, Groth16Prover, Seed};
pub use r1cs::ConstraintSystem;
pub use witness::{solve, Witness};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::backend::{Groth16Backend, ProofScheme, ProvingBackend};
    pub use crate::circuit::{CircuitDescription, Expr};
    pub use crate::circuits;
    pub use crate::compiler::compile;
    pub use crate::config::PipelineConfig;
    pub use crate::errors::{PipelineError, PipelineResult};
    pub use crate::field::FieldElement;
    pub use crate::keys::{ProvingKey, VerifyingKey};
    pub use crate::pipeline::{Pipeline, PipelineOutput};
    pub use crate::proof::{Proof, PublicInputs};
    pub use crate::prover::{prove, setup, verify, Groth16Prover, Seed};
    pub use crate::r1cs::ConstraintSystem;
    pub use crate::solidity::SolidityVerifierGenerator;
    pub use crate::witness::{solve, Witness};
    pub use crate::Bn254;
}

//! Compile once, set up once, then solve, prove and verify per input.
//!
//! # Usage
//!
//! ```ignore
//! use snarkpipe::prelude::*;
//!
//! let pipeline = Pipeline::initialize(circuits::SQUARE_ROOT, PipelineConfig::default())?;
//! let output = pipeline.run(&[], &[FieldElement::from(5u64)])?;
//! println!("{}", output.verification_status());
//! ```

use crate::backend::{self, Groth16Backend, ProvingBackend};
use crate::config::PipelineConfig;
use crate::errors::{PipelineError, PipelineResult};
use crate::field::FieldElement;
use crate::proof::PublicInputs;
use crate::prover::Seed;
use crate::r1cs::ConstraintSystem;
use crate::witness::Witness;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::{info, instrument, warn};

/// Everything one run produces.
pub struct PipelineOutput<B: ProvingBackend = Groth16Backend> {
    /// The solved witness.
    pub witness: Witness,
    /// The circuit's return values.
    pub outputs: Vec<FieldElement>,
    /// The proof.
    pub proof: B::Proof,
    /// Public inputs followed by outputs, as the verifier expects them.
    pub public_inputs: PublicInputs,
    /// Verification result, or `None` when verification after proving is off.
    pub verified: Option<bool>,
    /// Source of the on-chain verifier for this pipeline's key.
    pub verifier_artifact: String,
}

impl<B: ProvingBackend> PipelineOutput<B> {
    /// `"Verified"`, `"Not Verified"` or `"Not Checked"`.
    pub fn verification_status(&self) -> &'static str {
        match self.verified {
            Some(true) => "Verified",
            Some(false) => "Not Verified",
            None => "Not Checked",
        }
    }
}

impl<B: ProvingBackend> fmt::Debug for PipelineOutput<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOutput")
            .field("outputs", &self.outputs)
            .field("public_inputs", &self.public_inputs)
            .field("verified", &self.verified)
            .finish_non_exhaustive()
    }
}

/// A compiled circuit with its keys.
///
/// Setup runs at most once per pipeline: the first caller takes the setup
/// lock and generates the keys, later callers reuse them.
pub struct Pipeline<B: ProvingBackend = Groth16Backend> {
    backend: B,
    config: PipelineConfig,
    cs: Arc<ConstraintSystem>,
    setup_seed: Mutex<Option<Seed>>,
    keys: OnceLock<(B::ProvingKey, B::VerifyingKey)>,
}

impl Pipeline<Groth16Backend> {
    /// Compiles `source` and runs setup with the configured backend.
    ///
    /// Returns once the pipeline is ready to prove.
    pub fn initialize(source: &str, config: PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;
        let backend = backend::select(config.scheme);
        let pipeline = Self::with_backend(backend, source, config)?;
        pipeline.ensure_ready()?;
        Ok(pipeline)
    }
}

impl<B: ProvingBackend> Pipeline<B> {
    /// Compiles `source` with `backend`. Setup is deferred to the first
    /// [`ensure_ready`](Self::ensure_ready) or [`run`](Self::run).
    #[instrument(skip_all, fields(scheme = %backend.scheme()))]
    pub fn with_backend(backend: B, source: &str, mut config: PipelineConfig) -> PipelineResult<Self> {
        let cs = Arc::new(backend.compile(source)?);
        info!(
            circuit = cs.name(),
            constraints = cs.num_constraints(),
            variables = cs.num_variables(),
            "circuit compiled"
        );
        let setup_seed = Mutex::new(config.setup_seed.take());
        Ok(Self {
            backend,
            config,
            cs,
            setup_seed,
            keys: OnceLock::new(),
        })
    }

    /// The compiled constraint system.
    pub fn constraint_system(&self) -> &Arc<ConstraintSystem> {
        &self.cs
    }

    /// The pipeline's configuration. The setup seed has been moved out.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Whether setup has completed.
    pub fn is_ready(&self) -> bool {
        self.keys.get().is_some()
    }

    /// Runs setup if it has not run yet.
    pub fn ensure_ready(&self) -> PipelineResult<()> {
        self.keys().map(|_| ())
    }

    fn keys(&self) -> PipelineResult<&(B::ProvingKey, B::VerifyingKey)> {
        if let Some(keys) = self.keys.get() {
            return Ok(keys);
        }
        let mut seed = self.setup_seed.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(keys) = self.keys.get() {
            return Ok(keys);
        }
        let keys = self
            .backend
            .setup(self.cs.clone(), seed.take().unwrap_or_else(Seed::random))?;
        Ok(self.keys.get_or_init(|| keys))
    }

    /// The proving key, running setup first if needed.
    pub fn proving_key(&self) -> PipelineResult<&B::ProvingKey> {
        Ok(&self.keys()?.0)
    }

    /// The verifying key, running setup first if needed.
    pub fn verifying_key(&self) -> PipelineResult<&B::VerifyingKey> {
        Ok(&self.keys()?.1)
    }

    /// Renders the on-chain verifier for this pipeline's key.
    pub fn verifier_artifact(&self) -> PipelineResult<String> {
        let vk = self.verifying_key()?;
        Ok(self.backend.export_verifier(vk, &self.config.contract_name)?)
    }

    /// Solves, proves and (by default) verifies one input.
    pub fn run(
        &self,
        public_inputs: &[FieldElement],
        private_inputs: &[FieldElement],
    ) -> PipelineResult<PipelineOutput<B>> {
        self.run_with_seed(public_inputs, private_inputs, Seed::random())
    }

    /// [`run`](Self::run) with explicit proving randomness.
    #[instrument(skip_all, fields(circuit = self.cs.name()))]
    pub fn run_with_seed(
        &self,
        public_inputs: &[FieldElement],
        private_inputs: &[FieldElement],
        seed: Seed,
    ) -> PipelineResult<PipelineOutput<B>> {
        let (pk, vk) = self.keys()?;
        let witness = self.backend.solve(&self.cs, public_inputs, private_inputs)?;
        let proof = self.backend.prove(pk, &witness, seed)?;
        let public = PublicInputs::from_witness(&witness);

        let verified = self
            .config
            .verify_after_prove
            .then(|| self.backend.verify(vk, &public, &proof));
        if verified == Some(false) {
            if self.config.strict_verification {
                return Err(PipelineError::VerificationFailed);
            }
            warn!("generated proof did not verify");
        }

        Ok(PipelineOutput {
            outputs: witness.outputs().to_vec(),
            witness,
            proof,
            public_inputs: public,
            verified,
            verifier_artifact: self.verifier_artifact()?,
        })
    }
}

impl<B: ProvingBackend> fmt::Debug for Pipeline<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("scheme", &self.backend.scheme())
            .field("circuit", &self.cs.name())
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuits;
    use crate::errors::SolveError;

    fn fixed_config() -> PipelineConfig {
        PipelineConfig {
            setup_seed: Some(Seed::from_u64(99)),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_square_root_run() {
        let pipeline = Pipeline::initialize(circuits::SQUARE_ROOT, fixed_config()).unwrap();
        assert!(pipeline.is_ready());

        let output = pipeline
            .run_with_seed(&[], &[FieldElement::from(5u64)], Seed::from_u64(1))
            .unwrap();
        assert_eq!(output.verified, Some(true));
        assert_eq!(output.verification_status(), "Verified");
        assert!(output.outputs.is_empty());
        assert!(output.verifier_artifact.contains("contract Groth16Verifier"));
    }

    #[test]
    fn test_lazy_setup_runs_once() {
        let pipeline =
            Pipeline::with_backend(Groth16Backend::new(), circuits::SQUARE_ROOT, fixed_config())
                .unwrap();
        assert!(!pipeline.is_ready());

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| pipeline.ensure_ready().unwrap());
            }
        });
        let vk = pipeline.verifying_key().unwrap().clone();
        pipeline.ensure_ready().unwrap();
        assert_eq!(pipeline.verifying_key().unwrap(), &vk);
    }

    #[test]
    fn test_unsatisfying_input_is_a_solve_error() {
        let pipeline = Pipeline::initialize(circuits::SQUARE_ROOT, fixed_config()).unwrap();
        assert!(matches!(
            pipeline.run(&[], &[FieldElement::from(4u64)]),
            Err(PipelineError::Solve(SolveError::UnsatisfiedConstraint { index: 0 }))
        ));
    }

    #[test]
    fn test_verification_can_be_skipped() {
        let config = PipelineConfig {
            verify_after_prove: false,
            ..fixed_config()
        };
        let pipeline = Pipeline::initialize(circuits::SQUARE_ROOT, config).unwrap();
        let output = pipeline.run(&[], &[FieldElement::from(5u64)]).unwrap();
        assert_eq!(output.verification_status(), "Not Checked");
    }
}

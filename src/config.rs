//! Pipeline configuration.
//!
//! ```json
//! {
//!     "scheme": "groth16",
//!     "contract_name": "SquareRootVerifier",
//!     "strict_verification": true
//! }
//! ```
//!
//! Every field is optional; omitted fields take their [`Default`] values.

use crate::backend::ProofScheme;
use crate::errors::ConfigError;
use crate::prover::Seed;
use crate::solidity::{validate_contract_name, DEFAULT_CONTRACT_NAME};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for a [`Pipeline`](crate::pipeline::Pipeline).
#[derive(Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Proving scheme.
    pub scheme: ProofScheme,
    /// Seed for the one-time setup. A random seed is drawn when absent.
    ///
    /// Fixing the seed is for reproducible fixtures only.
    pub setup_seed: Option<Seed>,
    /// Name of the exported verifier contract.
    pub contract_name: String,
    /// Verify every proof right after generating it.
    pub verify_after_prove: bool,
    /// Turn a rejected proof into [`PipelineError::VerificationFailed`](crate::errors::PipelineError::VerificationFailed)
    /// instead of reporting `verified: Some(false)`.
    pub strict_verification: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scheme: ProofScheme::default(),
            setup_seed: None,
            contract_name: DEFAULT_CONTRACT_NAME.to_string(),
            verify_after_prove: true,
            strict_verification: false,
        }
    }
}

impl PipelineConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::IoError {
            message: format!("{}: {e}", path.as_ref().display()),
        })?;
        Self::from_json_str(&json)
    }

    /// Checks settings that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.strict_verification && !self.verify_after_prove {
            return Err(ConfigError::Invalid {
                message: "strict_verification requires verify_after_prove".to_string(),
            });
        }
        validate_contract_name(&self.contract_name).map_err(|e| ConfigError::Invalid {
            message: e.to_string(),
        })
    }
}

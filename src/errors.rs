//! Error types for the proving pipeline.
//!
//! Every stage has its own error enum so callers can tell apart, for example,
//! "input does not satisfy the circuit" from "malformed input count". The
//! umbrella [`PipelineError`] wraps all of them for code that drives the whole
//! pipeline.

use thiserror::Error;

/// The main error type for the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Field arithmetic or field encoding error.
    #[error("Field error: {0}")]
    Field(#[from] FieldError),

    /// Error while compiling a circuit.
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    /// Error while solving a witness.
    #[error("Solve error: {0}")]
    Solve(#[from] SolveError),

    /// Error while generating keys.
    #[error("Setup error: {0}")]
    Setup(#[from] SetupError),

    /// Error during proof generation.
    #[error("Prove error: {0}")]
    Prove(#[from] ProveError),

    /// Error during key operations.
    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// Error during Solidity contract generation.
    #[error("Contract generation error: {0}")]
    ContractGeneration(#[from] ContractGenerationError),

    /// Invalid pipeline configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A freshly generated proof was rejected and strict verification is on.
    #[error("Proof verification failed: the proof does not verify against the given public inputs")]
    VerificationFailed,
}

/// Errors from the field arithmetic layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// Inversion (or division) of zero.
    #[error("Division by zero")]
    DivisionByZero,

    /// An encoded integer is not smaller than the field modulus.
    #[error("Value {value} is not smaller than the field modulus")]
    OutOfRange {
        /// The rejected value, as written.
        value: String,
    },

    /// A string or byte encoding could not be parsed.
    #[error("Invalid field element encoding: {message}")]
    InvalidEncoding {
        /// Description of the problem.
        message: String,
    },
}

/// Errors that can occur while compiling a circuit into a constraint system.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The circuit source could not be parsed.
    #[error("Parse error at {line}:{column}: {message}")]
    Parse {
        /// 1-based line of the offending token.
        line: usize,
        /// 1-based column of the offending token.
        column: usize,
        /// Description of the problem.
        message: String,
    },

    /// A signal was referenced before it was assigned.
    #[error("Undefined signal: {name}")]
    UndefinedSignal {
        /// Name of the signal.
        name: String,
    },

    /// A signal or parameter was defined twice.
    #[error("Signal {name} is defined more than once")]
    DuplicateSignal {
        /// Name of the signal.
        name: String,
    },

    /// A call names a function the compiler does not provide.
    #[error("Unknown function: {name}")]
    UnknownFunction {
        /// Name of the function.
        name: String,
    },

    /// Array lengths or call arities do not line up.
    #[error("Type mismatch: {message}")]
    TypeMismatch {
        /// Description of the mismatch.
        message: String,
    },

    /// The return statement does not match the declared signature.
    #[error("Invalid return: {message}")]
    InvalidReturn {
        /// Description of the problem.
        message: String,
    },

    /// The circuit contains an assertion that can never hold.
    #[error("Circuit is unsatisfiable: {message}")]
    UnsatisfiableStructure {
        /// Description of why the circuit is unsatisfiable.
        message: String,
    },

    /// An expression nests deeper than the compiler accepts.
    #[error("Expression nests deeper than {limit} levels")]
    ExpressionTooDeep {
        /// Maximum accepted depth.
        limit: usize,
    },
}

/// Which input list an arity error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Public inputs.
    Public,
    /// Private inputs.
    Private,
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputKind::Public => f.write_str("public"),
            InputKind::Private => f.write_str("private"),
        }
    }
}

/// Errors that can occur while solving a witness.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveError {
    /// The number of supplied inputs differs from the circuit's declaration.
    #[error("Expected {expected} {kind} inputs, got {actual}")]
    ArityMismatch {
        /// Which input list is wrong.
        kind: InputKind,
        /// Declared count.
        expected: usize,
        /// Supplied count.
        actual: usize,
    },

    /// The inputs do not satisfy the circuit.
    #[error("Input does not satisfy the circuit: constraint {index} is violated")]
    UnsatisfiedConstraint {
        /// Index of the first violated constraint.
        index: usize,
    },

    /// Field arithmetic failed while evaluating the circuit.
    #[error("Evaluation failed: {0}")]
    Field(#[from] FieldError),
}

/// Errors that can occur during key generation.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The constraint system has no constraints.
    #[error("Constraint system has no constraints. Cannot generate keys for an empty circuit")]
    DegenerateSystem,

    /// The arkworks Groth16 generator failed.
    #[error("Groth16 setup failed: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },
}

/// Errors that can occur during proof generation.
#[derive(Debug, Error)]
pub enum ProveError {
    /// The witness was solved against a different constraint system than the key.
    #[error("Witness does not belong to the proving key's circuit: key fingerprint {expected}, witness fingerprint {actual}")]
    KeyWitnessMismatch {
        /// Fingerprint recorded in the proving key (hex).
        expected: String,
        /// Fingerprint recorded in the witness (hex).
        actual: String,
    },

    /// The arkworks Groth16 prover failed.
    #[error("Groth16 prover failed: {message}")]
    InternalCryptoFault {
        /// Description of the prover failure.
        message: String,
    },
}

/// Errors related to proving and verifying keys.
#[derive(Debug, Error)]
pub enum KeyError {
    /// Key serialization failed.
    #[error("Key serialization failed: {message}")]
    SerializationFailed {
        /// Description of the serialization failure.
        message: String,
    },

    /// Key deserialization failed.
    #[error("Key deserialization failed: {message}")]
    DeserializationFailed {
        /// Description of the deserialization failure.
        message: String,
    },

    /// Key is not compatible with the circuit.
    #[error("Key incompatible with circuit: {message}")]
    IncompatibleKey {
        /// Description of the incompatibility.
        message: String,
    },

    /// Key file I/O error.
    #[error("Key file I/O error: {message}")]
    IoError {
        /// Description of the I/O error.
        message: String,
    },
}

/// Errors related to serialization and deserialization.
#[derive(Debug, Error)]
pub enum SerializationError {
    /// Binary serialization failed.
    #[error("Binary serialization failed: {message}")]
    BinarySerializationFailed {
        /// Description of the failure.
        message: String,
    },

    /// Binary deserialization failed.
    #[error("Binary deserialization failed: {message}")]
    BinaryDeserializationFailed {
        /// Description of the failure.
        message: String,
    },

    /// Hex decoding failed.
    #[error("Hex decoding failed: {message}")]
    HexDecodingFailed {
        /// Description of the failure.
        message: String,
    },

    /// Invalid data format.
    #[error("Invalid data format: {message}")]
    InvalidFormat {
        /// Description of the format error.
        message: String,
    },

    /// Data integrity check failed.
    #[error("Data integrity check failed: computed hash {computed} does not match expected {expected}")]
    IntegrityCheckFailed {
        /// Computed hash.
        computed: String,
        /// Expected hash.
        expected: String,
    },
}

/// Errors related to Solidity contract generation.
#[derive(Debug, Error)]
pub enum ContractGenerationError {
    /// The contract name is not a valid Solidity identifier.
    #[error("Invalid contract name: {name}")]
    InvalidContractName {
        /// The rejected name.
        name: String,
    },

    /// Invalid verifying key for contract generation.
    #[error("Verifying key invalid for contract generation: {message}")]
    InvalidKeyFormat {
        /// Description of the format error.
        message: String,
    },
}

/// Errors related to pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration document could not be parsed.
    #[error("Invalid configuration: {message}")]
    Invalid {
        /// Description of the problem.
        message: String,
    },

    /// The configuration file could not be read.
    #[error("Configuration file I/O error: {message}")]
    IoError {
        /// Description of the I/O error.
        message: String,
    },
}

/// Result type alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

impl From<std::io::Error> for KeyError {
    fn from(err: std::io::Error) -> Self {
        KeyError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<hex::FromHexError> for SerializationError {
    fn from(err: hex::FromHexError) -> Self {
        SerializationError::HexDecodingFailed {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Invalid {
            message: err.to_string(),
        }
    }
}

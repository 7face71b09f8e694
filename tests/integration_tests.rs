//! Integration tests for the snarkpipe library.
//!
//! These tests exercise the complete workflow from circuit source to proof
//! verification and verifier export.

use sha2::{Digest, Sha256};
use snarkpipe::circuit::Visibility;
use snarkpipe::errors::{
    CompileError, ConfigError, ContractGenerationError, KeyError, ProveError, SerializationError,
    SetupError, SolveError,
};
use snarkpipe::prelude::*;
use snarkpipe::solidity::{
    export_verifying_key, format_proof_for_solidity, format_public_inputs_for_solidity, ProofExport,
};
use std::sync::Arc;

/// `x * x * x == y` with `y` public; returns `x + 1`.
const CUBE: &str = r#"
def main(field y, private field x) -> field {
    assert(x * x * x == y);
    return x + 1;
}
"#;

/// `a * b == c` with `c` public.
const PRODUCT: &str = r#"
def main(field c, private field a, private field b) {
    assert(a * b == c);
    return;
}
"#;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fe(value: u64) -> FieldElement {
    FieldElement::from(value)
}

fn compile_arc(source: &str) -> Arc<ConstraintSystem> {
    Arc::new(compile(source).expect("Compilation should succeed"))
}

fn cube_keys(seed: u64) -> (Arc<ConstraintSystem>, ProvingKey, VerifyingKey) {
    let cs = compile_arc(CUBE);
    let (pk, vk) = setup(cs.clone(), Seed::from_u64(seed)).expect("Key generation should succeed");
    (cs, pk, vk)
}

/// Proves `3^3 = 27`; public inputs are `[27, 4]`.
fn cube_proof(cs: &ConstraintSystem, pk: &ProvingKey, seed: u64) -> (Proof, PublicInputs) {
    let witness = solve(cs, &[fe(27)], &[fe(3)]).expect("Solving should succeed");
    Groth16Prover::new()
        .prove_with_public_inputs(pk, &witness, Seed::from_u64(seed))
        .expect("Proof generation should succeed")
}

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("snarkpipe-{}-{name}", std::process::id()))
}

/// Rewrites the header of a framed file and fixes up its integrity trailer.
fn with_header(bytes: &[u8], magic: &[u8; 4], version: u32) -> Vec<u8> {
    let mut data = bytes[..bytes.len() - 32].to_vec();
    data[..4].copy_from_slice(magic);
    data[4..8].copy_from_slice(&version.to_le_bytes());
    let trailer: [u8; 32] = Sha256::digest(&data).into();
    data.extend_from_slice(&trailer);
    data
}

// =============================================================================
// PROVER TESTS
// =============================================================================

#[test]
fn test_square_root_completeness() {
    init_tracing();
    let cs = compile_arc(circuits::SQUARE_ROOT);
    let (pk, vk) = setup(cs.clone(), Seed::random()).expect("Key generation should succeed");
    assert_eq!(vk.num_public_inputs(), 0);

    let witness = solve(&cs, &[], &[fe(5)]).expect("5 is a square root of 25");
    let proof = prove(&pk, &witness, Seed::random()).expect("Proof generation should succeed");

    assert!(verify(&vk, &PublicInputs::empty(), &proof), "Valid proof should verify");
}

#[test]
fn test_square_root_rejects_non_root() {
    let cs = compile_arc(circuits::SQUARE_ROOT);
    assert_eq!(
        solve(&cs, &[], &[fe(4)]),
        Err(SolveError::UnsatisfiedConstraint { index: 0 })
    );
}

#[test]
fn test_prove_and_verify_with_public_input() {
    let (cs, pk, vk) = cube_keys(1);
    assert_eq!(vk.num_public_inputs(), 2);

    let (proof, public_inputs) = cube_proof(&cs, &pk, 2);
    assert_eq!(public_inputs.values, vec![fe(27), fe(4)]);
    assert!(verify(&vk, &public_inputs, &proof), "Valid proof should verify");
}

#[test]
fn test_prove_and_verify_product() {
    let cs = compile_arc(PRODUCT);
    let (pk, vk) = setup(cs.clone(), Seed::from_u64(5)).expect("Key generation should succeed");

    let witness = solve(&cs, &[fe(35)], &[fe(5), fe(7)]).expect("5 * 7 = 35");
    let proof = prove(&pk, &witness, Seed::from_u64(6)).expect("Proof generation should succeed");

    assert!(verify(&vk, &PublicInputs::new(vec![fe(35)]), &proof));
    assert!(!verify(&vk, &PublicInputs::new(vec![fe(36)]), &proof));
}

#[test]
fn test_wrong_public_input_is_rejected() {
    let (cs, pk, vk) = cube_keys(1);
    let (proof, _) = cube_proof(&cs, &pk, 2);

    let tampered = PublicInputs::new(vec![fe(28), fe(4)]);
    assert!(!verify(&vk, &tampered, &proof), "Proof must not verify for other inputs");

    let wrong_output = PublicInputs::new(vec![fe(27), fe(5)]);
    assert!(!verify(&vk, &wrong_output, &proof));
}

#[test]
fn test_public_input_count_mismatch() {
    let (cs, pk, vk) = cube_keys(1);
    let (proof, _) = cube_proof(&cs, &pk, 2);

    assert!(!verify(&vk, &PublicInputs::empty(), &proof));
    assert!(!verify(&vk, &PublicInputs::new(vec![fe(27)]), &proof));
    assert!(!verify(&vk, &PublicInputs::new(vec![fe(27), fe(4), fe(0)]), &proof));
}

#[test]
fn test_verification_is_idempotent() {
    let (cs, pk, vk) = cube_keys(1);
    let (proof, public_inputs) = cube_proof(&cs, &pk, 2);

    let first = verify(&vk, &public_inputs, &proof);
    let second = verify(&vk, &public_inputs, &proof);
    assert_eq!(first, second);
    assert!(first);
}

#[test]
fn test_fixed_seeds_are_reproducible() {
    let (cs, pk, vk) = cube_keys(7);
    let (_, _, vk_again) = cube_keys(7);
    assert_eq!(vk, vk_again);

    let (proof_a, _) = cube_proof(&cs, &pk, 8);
    let (proof_b, _) = cube_proof(&cs, &pk, 8);
    let (proof_c, _) = cube_proof(&cs, &pk, 9);
    assert_eq!(proof_a, proof_b);
    assert_ne!(proof_a, proof_c);
}

#[test]
fn test_key_witness_mismatch() {
    let (_, pk, _) = cube_keys(1);
    let other = compile(PRODUCT).expect("Compilation should succeed");
    let witness = solve(&other, &[fe(6)], &[fe(2), fe(3)]).expect("2 * 3 = 6");

    let result = prove(&pk, &witness, Seed::random());
    match result {
        Err(ProveError::KeyWitnessMismatch { expected, actual }) => {
            assert_eq!(expected, hex::encode(pk.fingerprint()));
            assert_eq!(actual, hex::encode(other.fingerprint()));
        }
        other => panic!("Expected KeyWitnessMismatch, got {other:?}"),
    }
}

#[test]
fn test_setup_rejects_degenerate_system() {
    let cs = compile_arc("def main(private field unused) { return; }");
    assert_eq!(cs.num_constraints(), 0);
    assert!(matches!(
        setup(cs, Seed::random()),
        Err(SetupError::DegenerateSystem)
    ));
}

#[test]
fn test_batch_verification() {
    let (cs, pk, vk) = cube_keys(1);
    let (proof, public_inputs) = cube_proof(&cs, &pk, 2);
    let tampered = PublicInputs::new(vec![fe(8), fe(3)]);

    let results = Groth16Prover::new().verify_batch(
        &vk,
        &[(public_inputs.clone(), proof.clone()), (tampered, proof)],
    );
    assert_eq!(results, vec![true, false]);
}

// =============================================================================
// CONCURRENCY TESTS
// =============================================================================

#[test]
fn test_concurrent_proving_and_verifying_with_shared_keys() {
    let (cs, pk, vk) = cube_keys(1);

    let results: Vec<bool> = std::thread::scope(|s| {
        let handles: Vec<_> = (2..6u64)
            .map(|x| {
                let (cs, pk, vk) = (&cs, &pk, &vk);
                s.spawn(move || {
                    let witness = solve(cs, &[fe(x * x * x)], &[fe(x)]).expect("Solving should succeed");
                    let proof = prove(pk, &witness, Seed::random()).expect("Proof generation should succeed");
                    verify(vk, &PublicInputs::from_witness(&witness), &proof)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("Worker should not panic"))
            .collect()
    });

    assert_eq!(results, vec![true; 4]);
}

// =============================================================================
// KEY SERIALIZATION TESTS
// =============================================================================

#[test]
fn test_proving_key_serialization() {
    let (cs, pk, _) = cube_keys(1);

    let bytes = pk.to_bytes().expect("Serialization should succeed");
    assert_eq!(&bytes[..4], b"G16P");

    let restored = ProvingKey::from_bytes(&bytes).expect("Deserialization should succeed");
    assert_eq!(restored.fingerprint(), pk.fingerprint());
    assert_eq!(restored.constraint_system().as_ref(), cs.as_ref());
    assert_eq!(
        restored.to_bytes().expect("Serialization should succeed"),
        bytes,
        "Re-serialization should be byte-identical"
    );
}

#[test]
fn test_proving_key_with_invalid_point_is_rejected() {
    let (_, pk, _) = cube_keys(1);
    let bytes = pk.to_bytes().expect("Serialization should succeed");

    // magic | version | fingerprint section | key section length, then the
    // x coordinate of the first point; reseal so the trailer still matches.
    let first_point = 4 + 4 + 8 + 32 + 8;
    let mut data = bytes[..bytes.len() - 32].to_vec();
    data[first_point] ^= 1;
    let trailer: [u8; 32] = Sha256::digest(&data).into();
    data.extend_from_slice(&trailer);

    assert!(matches!(
        ProvingKey::from_bytes(&data),
        Err(KeyError::DeserializationFailed { .. })
    ));
}

#[test]
fn test_verifying_key_serialization() {
    let (_, _, vk) = cube_keys(1);

    let bytes = vk.to_bytes().expect("Serialization should succeed");
    assert_eq!(&bytes[..4], b"G16V");

    let restored = VerifyingKey::from_bytes(&bytes).expect("Deserialization should succeed");
    assert_eq!(restored, vk);
    assert_eq!(restored.to_bytes().expect("Serialization should succeed"), bytes);
}

#[test]
fn test_verifying_key_hex_serialization() {
    let (_, _, vk) = cube_keys(1);

    let hex_str = vk.to_hex().expect("Hex serialization should succeed");
    let restored = VerifyingKey::from_hex(&hex_str).expect("Hex deserialization should succeed");
    assert_eq!(restored, vk);

    assert!(matches!(
        VerifyingKey::from_hex("not hex"),
        Err(KeyError::DeserializationFailed { .. })
    ));
}

#[test]
fn test_key_file_io() {
    let (_, pk, vk) = cube_keys(1);
    let pk_path = temp_path("key_io_pk.bin");
    let vk_path = temp_path("key_io_vk.bin");

    pk.save_to_file(&pk_path).expect("Saving proving key should succeed");
    vk.save_to_file(&vk_path).expect("Saving verifying key should succeed");

    let pk_loaded = ProvingKey::load_from_file(&pk_path).expect("Loading proving key should succeed");
    let vk_loaded = VerifyingKey::load_from_file(&vk_path).expect("Loading verifying key should succeed");

    assert_eq!(pk.fingerprint(), pk_loaded.fingerprint());
    assert_eq!(vk, vk_loaded);

    let _ = std::fs::remove_file(pk_path);
    let _ = std::fs::remove_file(vk_path);

    assert!(matches!(
        VerifyingKey::load_from_file(temp_path("missing_vk.bin")),
        Err(KeyError::IoError { .. })
    ));
}

#[test]
fn test_keys_work_after_serialization() {
    let (cs, pk, vk) = cube_keys(1);

    let pk = ProvingKey::from_bytes(&pk.to_bytes().expect("Serialization should succeed"))
        .expect("Deserialization should succeed");
    let vk = VerifyingKey::from_bytes(&vk.to_bytes().expect("Serialization should succeed"))
        .expect("Deserialization should succeed");

    let (proof, public_inputs) = cube_proof(&cs, &pk, 3);
    assert!(verify(&vk, &public_inputs, &proof), "Restored keys should still work");
}

// =============================================================================
// PROOF SERIALIZATION TESTS
// =============================================================================

#[test]
fn test_proof_serialization() {
    let (cs, pk, _) = cube_keys(1);
    let (proof, _) = cube_proof(&cs, &pk, 2);

    let bytes = proof.to_bytes().expect("Serialization should succeed");
    assert_eq!(&bytes[..4], b"G16R");
    let restored = Proof::from_bytes(&bytes).expect("Deserialization should succeed");
    assert_eq!(restored, proof);
    assert_eq!(restored.version(), snarkpipe::proof::PROOF_FORMAT_VERSION);
}

#[test]
fn test_proof_hex_serialization() {
    let (cs, pk, _) = cube_keys(1);
    let (proof, _) = cube_proof(&cs, &pk, 2);

    let hex_str = proof.to_hex().expect("Hex serialization should succeed");
    let restored = Proof::from_hex(&hex_str).expect("Hex deserialization should succeed");
    assert_eq!(restored, proof);
}

#[test]
fn test_proof_file_io() {
    let (cs, pk, _) = cube_keys(1);
    let (proof, _) = cube_proof(&cs, &pk, 2);
    let proof_path = temp_path("proof_io.bin");

    proof.save_to_file(&proof_path).expect("Saving proof should succeed");
    let loaded = Proof::load_from_file(&proof_path).expect("Loading proof should succeed");
    assert_eq!(loaded, proof);

    let _ = std::fs::remove_file(proof_path);
}

#[test]
fn test_restored_proof_verifies() {
    let (cs, pk, vk) = cube_keys(1);
    let (proof, public_inputs) = cube_proof(&cs, &pk, 2);

    let proof = Proof::from_bytes(&proof.to_bytes().expect("Serialization should succeed"))
        .expect("Deserialization should succeed");
    let public_inputs = PublicInputs::from_bytes(&public_inputs.to_bytes())
        .expect("Deserialization should succeed");
    assert!(verify(&vk, &public_inputs, &proof));
}

// =============================================================================
// PUBLIC INPUTS TESTS
// =============================================================================

#[test]
fn test_public_inputs_serialization() {
    let inputs = PublicInputs::new(vec![fe(27), fe(4)]);

    let bytes = inputs.to_bytes();
    assert_eq!(bytes.len(), 8 + 2 * 32);
    assert_eq!(PublicInputs::from_bytes(&bytes).expect("Decoding should succeed"), inputs);
    assert_eq!(
        PublicInputs::from_hex(&inputs.to_hex()).expect("Decoding should succeed"),
        inputs
    );
    assert_eq!(
        serde_json::to_string(&inputs).expect("JSON should succeed"),
        r#"["27","4"]"#
    );
}

#[test]
fn test_public_inputs_empty() {
    let inputs = PublicInputs::empty();
    assert!(inputs.is_empty());
    let restored = PublicInputs::from_bytes(&inputs.to_bytes()).expect("Decoding should succeed");
    assert!(restored.is_empty());
}

#[test]
fn test_public_inputs_reject_out_of_range_values() {
    let mut bytes = 1u64.to_le_bytes().to_vec();
    bytes.extend_from_slice(&FieldElement::modulus_be_bytes());
    assert!(matches!(
        PublicInputs::from_bytes(&bytes),
        Err(SerializationError::InvalidFormat { .. })
    ));
}

// =============================================================================
// COMPILER TESTS
// =============================================================================

#[test]
fn test_compilation_is_deterministic() {
    let first = compile(circuits::HASH_PREIMAGE).expect("Compilation should succeed");
    let second = compile(circuits::HASH_PREIMAGE).expect("Compilation should succeed");

    assert_eq!(first, second);
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(first.num_constraints(), second.num_constraints());
    assert_eq!(first.num_public(), 0);
    assert_eq!(first.num_private_inputs(), 4);
}

#[test]
fn test_structured_description() {
    let mut description = CircuitDescription::new("main");
    description
        .public_input("y")
        .private_input("x")
        .returns(1)
        .assert_eq(
            Expr::signal("x") * Expr::signal("x") * Expr::signal("x"),
            Expr::signal("y"),
        )
        .return_values(vec![Expr::signal("x") + Expr::constant(1u64)]);
    assert_eq!(description.params_with(Visibility::Private).count(), 1);

    let cs = snarkpipe::compile_description(&description).expect("Compilation should succeed");
    let witness = solve(&cs, &[fe(27)], &[fe(3)]).expect("Solving should succeed");
    assert_eq!(witness.outputs(), &[fe(4)]);
}

#[test]
fn test_compile_errors() {
    assert!(matches!(
        compile("def main(private field x) { assert(y == 1); }"),
        Err(CompileError::UndefinedSignal { name }) if name == "y"
    ));
    assert!(matches!(
        compile("def main() { assert(1 == 2); }"),
        Err(CompileError::UnsatisfiableStructure { .. })
    ));
    assert!(matches!(
        compile("def main(private field x) { field y = x / 0; }"),
        Err(CompileError::UnsatisfiableStructure { .. })
    ));
    assert!(matches!(
        compile("def main(private field x) { assert(x == 1) }"),
        Err(CompileError::Parse { line: 1, .. })
    ));
}

#[test]
fn test_deeply_nested_source_is_a_compile_error() {
    let source = format!(
        "def main(private field a) {{ assert({}a{} == 1); }}",
        "(".repeat(200_000),
        ")".repeat(200_000)
    );
    assert!(matches!(compile(&source), Err(CompileError::Parse { line: 1, .. })));
}

#[test]
fn test_solver_arity_and_division() {
    let cs = compile("def main(field d, private field n) -> field { return n / d; }")
        .expect("Compilation should succeed");

    assert!(matches!(
        solve(&cs, &[], &[fe(1)]),
        Err(SolveError::ArityMismatch { expected: 1, actual: 0, .. })
    ));
    assert!(matches!(
        solve(&cs, &[fe(0)], &[fe(1)]),
        Err(SolveError::Field(snarkpipe::errors::FieldError::DivisionByZero))
    ));
    let witness = solve(&cs, &[fe(4)], &[fe(12)]).expect("12 / 4 = 3");
    assert_eq!(witness.outputs(), &[fe(3)]);
}

// =============================================================================
// SOLIDITY VERIFIER TESTS
// =============================================================================

#[test]
fn test_solidity_verifier_generation() {
    let (_, _, vk) = cube_keys(1);

    let generator = SolidityVerifierGenerator::new();
    let contract = generator.generate(&vk).expect("Contract generation should succeed");

    // Basic sanity checks
    assert!(contract.contains("pragma solidity"));
    assert!(contract.contains("contract Groth16Verifier"));
    assert!(contract.contains("verifyProof"));
    assert!(contract.contains("Pairing"));
    assert!(contract.contains("function verifyTx(Proof memory proof, uint256[2] memory input)"));
    assert!(contract.contains("function verify(bytes calldata proof, uint256[] calldata publicInputs)"));
    assert!(contract.contains(&hex::encode(vk.fingerprint())));
}

#[test]
fn test_solidity_verifier_custom_name() {
    let (_, _, vk) = cube_keys(1);

    let contract = SolidityVerifierGenerator::new()
        .with_contract_name("MyCustomVerifier")
        .generate(&vk)
        .expect("Contract generation should succeed");
    assert!(contract.contains("contract MyCustomVerifier"));

    assert!(matches!(
        SolidityVerifierGenerator::new()
            .with_contract_name("1nvalid")
            .generate(&vk),
        Err(ContractGenerationError::InvalidContractName { .. })
    ));
}

#[test]
fn test_exporter_is_reproducible() {
    let (_, _, vk) = cube_keys(1);
    let (_, _, vk_same_seed) = cube_keys(1);

    assert_eq!(export_verifying_key(&vk), export_verifying_key(&vk));
    assert_eq!(export_verifying_key(&vk), export_verifying_key(&vk_same_seed));

    let generator = SolidityVerifierGenerator::new();
    assert_eq!(
        generator.generate(&vk).expect("Contract generation should succeed"),
        generator.generate(&vk_same_seed).expect("Contract generation should succeed")
    );
}

#[test]
fn test_format_proof_for_solidity() {
    let (cs, pk, _) = cube_keys(1);
    let (proof, public_inputs) = cube_proof(&cs, &pk, 2);

    let (a, b, c) = format_proof_for_solidity(&proof);

    // Check format
    assert!(a.starts_with('['));
    assert!(b.starts_with("[["));
    assert!(c.starts_with('['));

    let formatted_inputs = format_public_inputs_for_solidity(&public_inputs);
    assert_eq!(formatted_inputs.len(), 2);
    assert_eq!(formatted_inputs[0], format!("0x{:064x}", 27));
    assert_eq!(formatted_inputs[1], format!("0x{:064x}", 4));

    let words = proof.to_solidity_bytes();
    assert_eq!(words.len(), 256);
    assert!(c.contains(&hex::encode(&words[192..224])));

    let export = ProofExport::new(&proof, &public_inputs);
    let json = export.to_json().expect("JSON export should succeed");
    let parsed: ProofExport = serde_json::from_str(&json).expect("Export should parse back");
    assert_eq!(parsed, export);
    assert_eq!(parsed.curve, "bn128");
}

// =============================================================================
// PIPELINE TESTS
// =============================================================================

/// Delegates to Groth16 but rejects every proof.
struct RejectingBackend(Groth16Backend);

impl ProvingBackend for RejectingBackend {
    type ProvingKey = ProvingKey;
    type VerifyingKey = VerifyingKey;
    type Proof = Proof;

    fn scheme(&self) -> ProofScheme {
        self.0.scheme()
    }

    fn setup(
        &self,
        cs: Arc<ConstraintSystem>,
        seed: Seed,
    ) -> Result<(ProvingKey, VerifyingKey), SetupError> {
        self.0.setup(cs, seed)
    }

    fn prove(&self, pk: &ProvingKey, witness: &Witness, seed: Seed) -> Result<Proof, ProveError> {
        self.0.prove(pk, witness, seed)
    }

    fn verify(&self, _vk: &VerifyingKey, _public_inputs: &PublicInputs, _proof: &Proof) -> bool {
        false
    }

    fn export_verifier(
        &self,
        vk: &VerifyingKey,
        contract_name: &str,
    ) -> Result<String, ContractGenerationError> {
        self.0.export_verifier(vk, contract_name)
    }
}

fn seeded_config() -> PipelineConfig {
    PipelineConfig {
        setup_seed: Some(Seed::from_u64(21)),
        ..PipelineConfig::default()
    }
}

#[test]
fn test_pipeline_run_with_public_inputs() {
    init_tracing();
    let config = PipelineConfig {
        contract_name: "CubeVerifier".to_string(),
        ..seeded_config()
    };
    let pipeline = Pipeline::initialize(CUBE, config).expect("Initialization should succeed");

    let output = pipeline.run(&[fe(27)], &[fe(3)]).expect("Run should succeed");
    assert_eq!(output.outputs, vec![fe(4)]);
    assert_eq!(output.public_inputs.values, vec![fe(27), fe(4)]);
    assert_eq!(output.verified, Some(true));
    assert!(output.verifier_artifact.contains("contract CubeVerifier"));
    assert_eq!(output.witness.to_string().lines().next(), Some("~0 1"));

    let vk = pipeline.verifying_key().expect("Keys should be ready");
    assert!(verify(vk, &output.public_inputs, &output.proof));
}

#[test]
fn test_pipeline_reports_specific_failures() {
    let pipeline = Pipeline::initialize(CUBE, seeded_config()).expect("Initialization should succeed");

    assert!(matches!(
        pipeline.run(&[fe(27)], &[]),
        Err(PipelineError::Solve(SolveError::ArityMismatch { .. }))
    ));
    assert!(matches!(
        pipeline.run(&[fe(28)], &[fe(3)]),
        Err(PipelineError::Solve(SolveError::UnsatisfiedConstraint { .. }))
    ));
    assert!(matches!(
        Pipeline::initialize("def main( {", PipelineConfig::default()),
        Err(PipelineError::Compile(CompileError::Parse { .. }))
    ));
}

#[test]
fn test_pipeline_advisory_verification() {
    let pipeline = Pipeline::with_backend(RejectingBackend(Groth16Backend::new()), CUBE, seeded_config())
        .expect("Compilation should succeed");

    let output = pipeline.run(&[fe(27)], &[fe(3)]).expect("Advisory mode should not fail");
    assert_eq!(output.verified, Some(false));
    assert_eq!(output.verification_status(), "Not Verified");
}

#[test]
fn test_pipeline_strict_verification() {
    let config = PipelineConfig {
        strict_verification: true,
        ..seeded_config()
    };
    let pipeline = Pipeline::with_backend(RejectingBackend(Groth16Backend::new()), CUBE, config)
        .expect("Compilation should succeed");

    assert!(matches!(
        pipeline.run(&[fe(27)], &[fe(3)]),
        Err(PipelineError::VerificationFailed)
    ));
}

#[test]
fn test_pipeline_config_from_file() {
    let path = temp_path("config.json");
    std::fs::write(
        &path,
        r#"{ "scheme": "groth16", "contract_name": "RootVerifier", "strict_verification": true }"#,
    )
    .expect("Writing config should succeed");

    let config = PipelineConfig::load_from_file(&path).expect("Config should load");
    assert_eq!(config.scheme, ProofScheme::Groth16);
    assert_eq!(config.contract_name, "RootVerifier");
    assert!(config.strict_verification);
    let _ = std::fs::remove_file(path);

    assert!(matches!(
        PipelineConfig::from_json_str(r#"{ "contract_name": "" }"#),
        Err(ConfigError::Invalid { .. })
    ));
}

// =============================================================================
// ERROR HANDLING TESTS
// =============================================================================

#[test]
fn test_corrupted_proof_fails_deserialization() {
    let mut bad_bytes = vec![0u8; 100];
    bad_bytes[0..4].copy_from_slice(b"G16R"); // Valid magic

    let result = Proof::from_bytes(&bad_bytes);
    assert!(matches!(result, Err(SerializationError::IntegrityCheckFailed { .. })));
}

#[test]
fn test_tampered_proof_fails_integrity_check() {
    let (cs, pk, _) = cube_keys(1);
    let (proof, _) = cube_proof(&cs, &pk, 2);

    let mut bytes = proof.to_bytes().expect("Serialization should succeed");
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0x01;
    assert!(matches!(
        Proof::from_bytes(&bytes),
        Err(SerializationError::IntegrityCheckFailed { .. })
    ));
}

#[test]
fn test_corrupted_key_fails_deserialization() {
    let mut bad_bytes = vec![0u8; 200];
    bad_bytes[0..4].copy_from_slice(b"G16P"); // Valid magic

    assert!(ProvingKey::from_bytes(&bad_bytes).is_err());
    assert!(VerifyingKey::from_bytes(&bad_bytes).is_err());
}

#[test]
fn test_invalid_magic_bytes() {
    let (cs, pk, vk) = cube_keys(1);
    let (proof, _) = cube_proof(&cs, &pk, 2);
    let vk_bytes = vk.to_bytes().expect("Serialization should succeed");

    // A well-formed file of the wrong kind
    assert!(matches!(
        Proof::from_bytes(&vk_bytes),
        Err(SerializationError::InvalidFormat { .. })
    ));
    assert!(ProvingKey::from_bytes(&vk_bytes).is_err());

    let renamed = with_header(
        &proof.to_bytes().expect("Serialization should succeed"),
        b"XXXX",
        snarkpipe::proof::PROOF_FORMAT_VERSION,
    );
    assert!(matches!(
        Proof::from_bytes(&renamed),
        Err(SerializationError::InvalidFormat { .. })
    ));
}

#[test]
fn test_unsupported_version() {
    let (_, _, vk) = cube_keys(1);
    let bytes = with_header(
        &vk.to_bytes().expect("Serialization should succeed"),
        b"G16V",
        snarkpipe::keys::KEY_FORMAT_VERSION + 1,
    );
    assert!(matches!(
        VerifyingKey::from_bytes(&bytes),
        Err(KeyError::DeserializationFailed { message }) if message.contains("version")
    ));
}

// =============================================================================
// EDGE CASE TESTS
// =============================================================================

#[test]
fn test_large_field_values() {
    // p - 1 cubed is p - 1
    let p_minus_one = -FieldElement::one();
    let (cs, pk, vk) = cube_keys(1);
    let witness = solve(&cs, &[p_minus_one], &[p_minus_one]).expect("(-1)^3 = -1");
    assert_eq!(witness.outputs(), &[FieldElement::zero()]);

    let proof = prove(&pk, &witness, Seed::random()).expect("Proof generation should succeed");
    assert!(verify(&vk, &PublicInputs::from_witness(&witness), &proof));
}

#[test]
fn test_zero_values() {
    let (cs, pk, vk) = cube_keys(1);
    let witness = solve(&cs, &[fe(0)], &[fe(0)]).expect("0^3 = 0");
    let proof = prove(&pk, &witness, Seed::random()).expect("Proof generation should succeed");
    assert!(verify(&vk, &PublicInputs::new(vec![fe(0), fe(1)]), &proof));
}

#[test]
fn test_hash_target_matches_native_digest() {
    let zero = FieldElement::zero();
    assert_eq!(
        circuits::sha256_packed(&[zero, zero, zero, fe(5)]).expect("Inputs are in range"),
        circuits::hash_target()
    );
}

#[test]
fn test_hash_preimage_end_to_end() {
    init_tracing();
    let pipeline = Pipeline::initialize(circuits::HASH_PREIMAGE, seeded_config())
        .expect("Initialization should succeed");
    let zero = FieldElement::zero();

    let output = pipeline
        .run(&[], &[zero, zero, zero, fe(5)])
        .expect("Known preimage should prove");
    assert_eq!(output.verified, Some(true));

    assert!(matches!(
        pipeline.run(&[], &[fe(1), fe(2), fe(3), fe(4)]),
        Err(PipelineError::Solve(SolveError::UnsatisfiedConstraint { .. }))
    ));
}

//! Solidity verifier generation and EVM encodings.
//!
//! Everything here follows the layout of the BN254 precompiles (EIP-196 and
//! EIP-197): field elements are 32-byte big-endian words, a G1 point is
//! `(x, y)`, a G2 point is `(x.c1, x.c0, y.c1, y.c0)`, and the point at
//! infinity is all zeros.
//!
//! # Usage
//!
//! ```ignore
//! use snarkpipe::solidity::SolidityVerifierGenerator;
//!
//! let contract = SolidityVerifierGenerator::new()
//!     .with_contract_name("SquareRootVerifier")
//!     .generate(&vk)?;
//! std::fs::write("SquareRootVerifier.sol", contract)?;
//!
//! // Arguments for `verify(bytes proof, uint256[] publicInputs)`
//! let proof_bytes = proof.to_solidity_bytes();
//! let inputs = format_public_inputs_for_solidity(&public_inputs);
//! ```

use crate::errors::{ContractGenerationError, SerializationError};
use crate::keys::VerifyingKey;
use crate::proof::{Proof, PublicInputs};
use ark_bn254::{Bn254, Fq, G1Affine, G2Affine};
use ark_ec::AffineRepr;
use ark_ff::{BigInteger, PrimeField};
use ark_groth16::Proof as ArkProof;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Default name of the generated contract.
pub const DEFAULT_CONTRACT_NAME: &str = "Groth16Verifier";

type Word = [u8; 32];

const ZERO_WORD: Word = [0u8; 32];

fn fq_word(value: &Fq) -> Word {
    let bytes = value.into_bigint().to_bytes_be();
    let mut word = ZERO_WORD;
    word[32 - bytes.len()..].copy_from_slice(&bytes);
    word
}

fn g1_words(point: &G1Affine) -> [Word; 2] {
    if AffineRepr::is_zero(point) {
        return [ZERO_WORD; 2];
    }
    [fq_word(&point.x), fq_word(&point.y)]
}

fn g2_words(point: &G2Affine) -> [Word; 4] {
    if AffineRepr::is_zero(point) {
        return [ZERO_WORD; 4];
    }
    [
        fq_word(&point.x.c1),
        fq_word(&point.x.c0),
        fq_word(&point.y.c1),
        fq_word(&point.y.c0),
    ]
}

fn usize_word(value: usize) -> Word {
    let mut word = ZERO_WORD;
    word[24..].copy_from_slice(&(value as u64).to_be_bytes());
    word
}

fn hex_word(word: &Word) -> String {
    format!("0x{}", hex::encode(word))
}

fn decimal_word(word: &Word) -> String {
    BigUint::from_bytes_be(word).to_string()
}

/// Encodes a proof as the `uint256[8]` words `a.x, a.y, b (4 words), c.x, c.y`.
pub(crate) fn encode_proof(proof: &ArkProof<Bn254>) -> [u8; 256] {
    let mut out = [0u8; 256];
    let words = g1_words(&proof.a)
        .into_iter()
        .chain(g2_words(&proof.b))
        .chain(g1_words(&proof.c));
    for (chunk, word) in out.chunks_exact_mut(32).zip(words) {
        chunk.copy_from_slice(&word);
    }
    out
}

/// Serializes a verifying key as 32-byte big-endian words.
///
/// Layout: `alpha (2), beta (4), gamma (4), delta (4), n, ic[0..=n] (2 each)`
/// where `n` is the number of public inputs.
pub fn export_verifying_key(vk: &VerifyingKey) -> Vec<u8> {
    let key = vk.inner();
    let mut words: Vec<Word> = Vec::new();
    words.extend(g1_words(&key.alpha_g1));
    words.extend(g2_words(&key.beta_g2));
    words.extend(g2_words(&key.gamma_g2));
    words.extend(g2_words(&key.delta_g2));
    words.push(usize_word(vk.num_public_inputs()));
    for point in &key.gamma_abc_g1 {
        words.extend(g1_words(point));
    }
    words.concat()
}

/// The element words of the `uint256[] publicInputs` argument, in order.
pub fn encode_public_inputs(public_inputs: &PublicInputs) -> Vec<u8> {
    public_inputs
        .values
        .iter()
        .flat_map(|value| value.to_be_bytes())
        .collect()
}

/// Formats a proof as Solidity literals `(a, b, c)`.
///
/// `a` and `c` are `["0x..", "0x.."]`; `b` is `[["0x..", "0x.."], ["0x..", "0x.."]]`
/// with each coordinate in `(c1, c0)` order.
pub fn format_proof_for_solidity(proof: &Proof) -> (String, String, String) {
    let points = ProofPoints::from_proof(proof);
    let pair = |p: &[String; 2]| format!("[\"{}\", \"{}\"]", p[0], p[1]);
    (
        pair(&points.a),
        format!("[{}, {}]", pair(&points.b[0]), pair(&points.b[1])),
        pair(&points.c),
    )
}

/// Formats public inputs as `0x`-prefixed 32-byte hex words.
pub fn format_public_inputs_for_solidity(public_inputs: &PublicInputs) -> Vec<String> {
    public_inputs
        .values
        .iter()
        .map(|value| hex_word(&value.to_be_bytes()))
        .collect()
}

/// Proof coordinates as hex words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofPoints {
    /// `A` in G1.
    pub a: [String; 2],
    /// `B` in G2.
    pub b: [[String; 2]; 2],
    /// `C` in G1.
    pub c: [String; 2],
}

impl ProofPoints {
    fn from_proof(proof: &Proof) -> Self {
        let inner = proof.inner();
        let [ax, ay] = g1_words(&inner.a).map(|w| hex_word(&w));
        let [bx1, bx0, by1, by0] = g2_words(&inner.b).map(|w| hex_word(&w));
        let [cx, cy] = g1_words(&inner.c).map(|w| hex_word(&w));
        Self {
            a: [ax, ay],
            b: [[bx1, bx0], [by1, by0]],
            c: [cx, cy],
        }
    }
}

/// A proof in the JSON shape ZoKrates writes (`proof.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofExport {
    /// Always `"g16"`.
    pub scheme: String,
    /// Always `"bn128"`.
    pub curve: String,
    /// Proof coordinates.
    pub proof: ProofPoints,
    /// Public inputs followed by outputs.
    pub inputs: Vec<String>,
}

impl ProofExport {
    /// Builds the export for a proof and its public inputs.
    pub fn new(proof: &Proof, public_inputs: &PublicInputs) -> Self {
        Self {
            scheme: "g16".to_string(),
            curve: "bn128".to_string(),
            proof: ProofPoints::from_proof(proof),
            inputs: format_public_inputs_for_solidity(public_inputs),
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, SerializationError> {
        serde_json::to_string_pretty(self).map_err(|e| SerializationError::BinarySerializationFailed {
            message: e.to_string(),
        })
    }
}

const RESERVED_WORDS: &[&str] = &[
    "abstract", "address", "assembly", "bool", "break", "bytes", "constant", "continue", "contract",
    "else", "emit", "enum", "event", "external", "false", "for", "function", "if", "import",
    "interface", "internal", "library", "mapping", "memory", "modifier", "new", "pragma", "private",
    "public", "pure", "return", "returns", "storage", "string", "struct", "true", "uint256", "view",
    "while", "Pairing",
];

pub(crate) fn validate_contract_name(name: &str) -> Result<(), ContractGenerationError> {
    let invalid = || ContractGenerationError::InvalidContractName {
        name: name.to_string(),
    };
    let mut chars = name.chars();
    let first = chars.next().ok_or_else(invalid)?;
    if !(first.is_ascii_alphabetic() || first == '_' || first == '$') {
        return Err(invalid());
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
        return Err(invalid());
    }
    if RESERVED_WORDS.contains(&name) {
        return Err(invalid());
    }
    Ok(())
}

/// Renders a self-contained Groth16 verifier contract for a verifying key.
#[derive(Debug, Clone)]
pub struct SolidityVerifierGenerator {
    contract_name: String,
}

impl Default for SolidityVerifierGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SolidityVerifierGenerator {
    /// A generator producing `contract Groth16Verifier`.
    pub fn new() -> Self {
        Self {
            contract_name: DEFAULT_CONTRACT_NAME.to_string(),
        }
    }

    /// Sets the contract name. Checked when generating.
    pub fn with_contract_name(mut self, name: impl Into<String>) -> Self {
        self.contract_name = name.into();
        self
    }

    /// Name of the contract this generator renders.
    pub fn contract_name(&self) -> &str {
        &self.contract_name
    }

    /// Renders the contract source.
    ///
    /// The contract exposes `verifyTx(Proof, uint256[n])` and
    /// `verify(bytes proof, uint256[] publicInputs)`; the latter takes
    /// [`Proof::to_solidity_bytes`] and the public inputs unmodified.
    pub fn generate(&self, vk: &VerifyingKey) -> Result<String, ContractGenerationError> {
        validate_contract_name(&self.contract_name)?;

        let key = vk.inner();
        if key.gamma_abc_g1.is_empty() {
            return Err(ContractGenerationError::InvalidKeyFormat {
                message: "verifying key has no input commitments".to_string(),
            });
        }
        let n = vk.num_public_inputs();

        let mut out = String::new();
        out.push_str("// SPDX-License-Identifier: MIT\n");
        out.push_str("// Generated by snarkpipe. Do not edit.\n");
        out.push_str(&format!(
            "// Constraint system fingerprint: 0x{}\n",
            hex::encode(vk.fingerprint())
        ));
        out.push_str("pragma solidity ^0.8.0;\n\n");
        out.push_str(PAIRING_LIBRARY);

        out.push_str(&format!("\ncontract {} {{\n", self.contract_name));
        out.push_str(VERIFIER_TYPES);

        out.push_str("    function verifyingKey() internal pure returns (VerifyingKey memory vk) {\n");
        out.push_str(&format!("        vk.alpha = {};\n", g1_literal(&key.alpha_g1)));
        out.push_str(&format!("        vk.beta = {};\n", g2_literal(&key.beta_g2)));
        out.push_str(&format!("        vk.gamma = {};\n", g2_literal(&key.gamma_g2)));
        out.push_str(&format!("        vk.delta = {};\n", g2_literal(&key.delta_g2)));
        out.push_str(&format!(
            "        vk.gamma_abc = new Pairing.G1Point[]({});\n",
            key.gamma_abc_g1.len()
        ));
        for (i, point) in key.gamma_abc_g1.iter().enumerate() {
            out.push_str(&format!("        vk.gamma_abc[{i}] = {};\n", g1_literal(point)));
        }
        out.push_str("    }\n\n");

        out.push_str(VERIFY_PROOF);

        if n == 0 {
            out.push_str(
                "    function verifyTx(Proof memory proof) public view returns (bool r) {\n\
                 \x20       uint256[] memory inputValues = new uint256[](0);\n\
                 \x20       return verifyProof(proof, inputValues);\n\
                 \x20   }\n\n",
            );
        } else {
            out.push_str(&format!(
                "    function verifyTx(Proof memory proof, uint256[{n}] memory input) public view returns (bool r) {{\n\
                 \x20       uint256[] memory inputValues = new uint256[]({n});\n\
                 \x20       for (uint256 i = 0; i < input.length; i++) {{\n\
                 \x20           inputValues[i] = input[i];\n\
                 \x20       }}\n\
                 \x20       return verifyProof(proof, inputValues);\n\
                 \x20   }}\n\n"
            ));
        }

        out.push_str(VERIFY_BYTES);
        out.push_str("}\n");
        Ok(out)
    }
}

fn g1_literal(point: &G1Affine) -> String {
    let [x, y] = g1_words(point);
    format!(
        "Pairing.G1Point(uint256({}), uint256({}))",
        decimal_word(&x),
        decimal_word(&y)
    )
}

fn g2_literal(point: &G2Affine) -> String {
    let [x1, x0, y1, y0] = g2_words(point);
    format!(
        "Pairing.G2Point([uint256({}), uint256({})], [uint256({}), uint256({})])",
        decimal_word(&x1),
        decimal_word(&x0),
        decimal_word(&y1),
        decimal_word(&y0)
    )
}

const PAIRING_LIBRARY: &str = r#"library Pairing {
    uint256 internal constant PRIME_Q =
        21888242871839275222246405745257275088696311157297823662689037894645226208583;

    struct G1Point {
        uint256 X;
        uint256 Y;
    }

    // Fq2 coordinates are encoded as [c1, c0].
    struct G2Point {
        uint256[2] X;
        uint256[2] Y;
    }

    function negate(G1Point memory p) internal pure returns (G1Point memory) {
        if (p.X == 0 && p.Y == 0) {
            return G1Point(0, 0);
        }
        return G1Point(p.X, PRIME_Q - (p.Y % PRIME_Q));
    }

    function addition(G1Point memory p1, G1Point memory p2) internal view returns (G1Point memory r) {
        uint256[4] memory input = [p1.X, p1.Y, p2.X, p2.Y];
        bool success;
        assembly {
            success := staticcall(sub(gas(), 2000), 0x06, input, 0x80, r, 0x40)
        }
        require(success, "pairing-add-failed");
    }

    function scalarMul(G1Point memory p, uint256 s) internal view returns (G1Point memory r) {
        uint256[3] memory input = [p.X, p.Y, s];
        bool success;
        assembly {
            success := staticcall(sub(gas(), 2000), 0x07, input, 0x60, r, 0x40)
        }
        require(success, "pairing-mul-failed");
    }

    function pairing(G1Point[] memory p1, G2Point[] memory p2) internal view returns (bool) {
        require(p1.length == p2.length, "pairing-lengths-failed");
        uint256 elements = p1.length;
        uint256 inputSize = elements * 6;
        uint256[] memory input = new uint256[](inputSize);
        for (uint256 i = 0; i < elements; i++) {
            input[i * 6 + 0] = p1[i].X;
            input[i * 6 + 1] = p1[i].Y;
            input[i * 6 + 2] = p2[i].X[0];
            input[i * 6 + 3] = p2[i].X[1];
            input[i * 6 + 4] = p2[i].Y[0];
            input[i * 6 + 5] = p2[i].Y[1];
        }
        uint256[1] memory out;
        bool success;
        assembly {
            success := staticcall(sub(gas(), 2000), 0x08, add(input, 0x20), mul(inputSize, 0x20), out, 0x20)
        }
        require(success, "pairing-opcode-failed");
        return out[0] != 0;
    }
}
"#;

const VERIFIER_TYPES: &str = r#"    uint256 internal constant SNARK_SCALAR_FIELD =
        21888242871839275222246405745257275088548364400416034343698204186575808495617;

    struct VerifyingKey {
        Pairing.G1Point alpha;
        Pairing.G2Point beta;
        Pairing.G2Point gamma;
        Pairing.G2Point delta;
        Pairing.G1Point[] gamma_abc;
    }

    struct Proof {
        Pairing.G1Point a;
        Pairing.G2Point b;
        Pairing.G1Point c;
    }

"#;

const VERIFY_PROOF: &str = r#"    function verifyProof(Proof memory proof, uint256[] memory input) internal view returns (bool) {
        VerifyingKey memory vk = verifyingKey();
        if (input.length + 1 != vk.gamma_abc.length) {
            return false;
        }
        Pairing.G1Point memory vkX = Pairing.G1Point(0, 0);
        for (uint256 i = 0; i < input.length; i++) {
            if (input[i] >= SNARK_SCALAR_FIELD) {
                return false;
            }
            vkX = Pairing.addition(vkX, Pairing.scalarMul(vk.gamma_abc[i + 1], input[i]));
        }
        vkX = Pairing.addition(vkX, vk.gamma_abc[0]);

        Pairing.G1Point[] memory p1 = new Pairing.G1Point[](4);
        Pairing.G2Point[] memory p2 = new Pairing.G2Point[](4);
        p1[0] = Pairing.negate(proof.a);
        p2[0] = proof.b;
        p1[1] = vk.alpha;
        p2[1] = vk.beta;
        p1[2] = vkX;
        p2[2] = vk.gamma;
        p1[3] = proof.c;
        p2[3] = vk.delta;
        return Pairing.pairing(p1, p2);
    }

"#;

const VERIFY_BYTES: &str = r#"    function verify(bytes calldata proof, uint256[] calldata publicInputs) external view returns (bool) {
        if (proof.length != 256) {
            return false;
        }
        uint256[8] memory p = abi.decode(proof, (uint256[8]));
        Proof memory decoded = Proof(
            Pairing.G1Point(p[0], p[1]),
            Pairing.G2Point([p[2], p[3]], [p[4], p[5]]),
            Pairing.G1Point(p[6], p[7])
        );
        uint256[] memory inputValues = publicInputs;
        return verifyProof(decoded, inputValues);
    }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::prover::{Groth16Prover, Seed};
    use crate::witness::solve;
    use crate::field::FieldElement;
    use std::sync::Arc;

    const CUBE: &str = "def main(field y, private field x) -> field { assert(x * x * x == y); return x + 1; }";

    fn keys() -> (crate::keys::ProvingKey, VerifyingKey) {
        let cs = Arc::new(compile(CUBE).unwrap());
        Groth16Prover::new().setup(cs, Seed::from_u64(11)).unwrap()
    }

    #[test]
    fn test_contract_name_validation() {
        assert!(validate_contract_name("Groth16Verifier").is_ok());
        assert!(validate_contract_name("_Verifier$2").is_ok());
        for bad in ["", "2Fast", "has space", "contract", "Pairing", "dash-name"] {
            assert!(
                matches!(
                    validate_contract_name(bad),
                    Err(ContractGenerationError::InvalidContractName { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_exported_key_layout() {
        let (_, vk) = keys();
        let bytes = export_verifying_key(&vk);
        // alpha + beta + gamma + delta + n + 3 ic points
        assert_eq!(bytes.len(), 32 * (2 + 4 * 3 + 1 + 2 * 3));
        assert_eq!(&bytes[14 * 32..15 * 32], &usize_word(2));
        assert_eq!(bytes, export_verifying_key(&vk));
    }

    #[test]
    fn test_proof_words_match_formatted_proof() {
        let (pk, _) = keys();
        let cs = pk.constraint_system().clone();
        let witness = solve(&cs, &[FieldElement::from(27u64)], &[FieldElement::from(3u64)]).unwrap();
        let proof = Groth16Prover::new().prove(&pk, &witness, Seed::from_u64(12)).unwrap();

        let bytes = proof.to_solidity_bytes();
        let (a, b, _) = format_proof_for_solidity(&proof);
        assert!(a.starts_with(&format!("[\"0x{}\"", hex::encode(&bytes[..32]))));
        assert!(b.starts_with(&format!("[[\"0x{}\"", hex::encode(&bytes[64..96]))));

        let inputs = PublicInputs::from_witness(&witness);
        assert_eq!(encode_public_inputs(&inputs).len(), 64);
        let export = ProofExport::new(&proof, &inputs);
        assert_eq!(export.inputs.len(), 2);
        assert!(export.to_json().unwrap().contains("\"scheme\": \"g16\""));
    }

    #[test]
    fn test_zero_input_contract_has_no_fixed_array() {
        let cs = Arc::new(compile(crate::circuits::SQUARE_ROOT).unwrap());
        let (_, vk) = Groth16Prover::new().setup(cs, Seed::from_u64(3)).unwrap();
        let contract = SolidityVerifierGenerator::new().generate(&vk).unwrap();
        assert!(contract.contains("function verifyTx(Proof memory proof) public view"));
        assert!(!contract.contains("uint256[0]"));
        assert!(contract.contains("new Pairing.G1Point[](1)"));
    }
}

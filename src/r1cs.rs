//! Rank-1 constraint systems.
//!
//! This module holds the constraint system produced by the compiler and the
//! glue that replays it into arkworks for setup and proving.
//!
//! # R1CS Overview
//!
//! Every constraint has the form `A·w ∘ B·w = C·w`, where `A`, `B`, `C` are
//! linear combinations of variables and `w` is the witness vector. The
//! witness layout is fixed:
//!
//! ```text
//! w = [ 1 | public inputs | public outputs | private inputs | internal ... ]
//! ```
//!
//! so that the first `1 + num_public` entries are exactly the arkworks
//! instance assignment and the rest is the arkworks witness assignment.

use crate::field::FieldElement;
use crate::witness::Witness;
use ark_bn254::Fr;
use ark_relations::{
    lc,
    r1cs::{
        ConstraintSynthesizer, ConstraintSystemRef, LinearCombination as ArkLinearCombination,
        SynthesisError, Variable as ArkVariable,
    },
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::ops::{Add, Neg, Sub};

/// Domain separator mixed into constraint system fingerprints.
const FINGERPRINT_DOMAIN: &[u8] = b"snarkpipe/r1cs/v1";

/// What role a variable plays in the witness vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VarKind {
    /// The constant wire, always at index 0 with value 1.
    One,
    /// A public input or output, part of the verifier's instance.
    Public,
    /// A private input.
    Private,
    /// An auxiliary variable introduced by the compiler.
    Internal,
}

/// An index into the witness vector, tagged with its role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Variable {
    index: usize,
    kind: VarKind,
}

impl Variable {
    /// The constant wire.
    pub const ONE: Variable = Variable {
        index: 0,
        kind: VarKind::One,
    };

    pub(crate) fn new(index: usize, kind: VarKind) -> Self {
        Self { index, kind }
    }

    /// Position in the witness vector.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Role of the variable.
    pub fn kind(&self) -> VarKind {
        self.kind
    }
}

/// A linear combination `Σ coeff_i · var_i`.
///
/// Terms are kept sorted by variable index with no duplicate variables and no
/// zero coefficients, so two combinations are equal exactly when their terms
/// are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearCombination(Vec<(FieldElement, Variable)>);

impl LinearCombination {
    /// The empty combination (evaluates to zero).
    pub fn zero() -> Self {
        Self(Vec::new())
    }

    /// A constant `value · ONE`.
    pub fn constant(value: FieldElement) -> Self {
        Self::from_terms([(value, Variable::ONE)])
    }

    /// A single variable with coefficient one.
    pub fn from_variable(var: Variable) -> Self {
        Self(vec![(FieldElement::one(), var)])
    }

    /// Builds a combination from arbitrary terms, merging duplicates.
    pub fn from_terms<I>(terms: I) -> Self
    where
        I: IntoIterator<Item = (FieldElement, Variable)>,
    {
        let mut merged: BTreeMap<Variable, FieldElement> = BTreeMap::new();
        for (coeff, var) in terms {
            *merged.entry(var).or_insert_with(FieldElement::zero) += coeff;
        }
        Self(
            merged
                .into_iter()
                .filter(|(_, coeff)| !coeff.is_zero())
                .map(|(var, coeff)| (coeff, var))
                .collect(),
        )
    }

    /// The terms of the combination.
    pub fn terms(&self) -> &[(FieldElement, Variable)] {
        &self.0
    }

    /// Returns the constant value if the combination only uses the constant wire.
    pub fn as_constant(&self) -> Option<FieldElement> {
        match self.0.as_slice() {
            [] => Some(FieldElement::zero()),
            [(coeff, var)] if *var == Variable::ONE => Some(*coeff),
            _ => None,
        }
    }

    /// Returns the variable if the combination is exactly `1 · var`.
    pub fn as_variable(&self) -> Option<Variable> {
        match self.0.as_slice() {
            [(coeff, var)] if coeff.is_one() && *var != Variable::ONE => Some(*var),
            _ => None,
        }
    }

    /// Multiplies every coefficient by `factor`.
    pub fn scale(&self, factor: FieldElement) -> Self {
        Self::from_terms(self.0.iter().map(|(coeff, var)| (*coeff * factor, *var)))
    }

    /// Evaluates the combination against a (possibly partial) assignment.
    pub fn evaluate(&self, values: &[FieldElement]) -> FieldElement {
        self.0
            .iter()
            .fold(FieldElement::zero(), |acc, (coeff, var)| {
                acc + *coeff * values[var.index()]
            })
    }

    fn to_ark(&self, vars: &[ArkVariable]) -> ArkLinearCombination<Fr> {
        self.0.iter().fold(lc!(), |acc, (coeff, var)| {
            acc + (coeff.into_inner(), vars[var.index()])
        })
    }
}

impl From<Variable> for LinearCombination {
    fn from(var: Variable) -> Self {
        Self::from_variable(var)
    }
}

impl Add for LinearCombination {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::from_terms(self.0.into_iter().chain(rhs.0))
    }
}

impl Sub for LinearCombination {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self + (-rhs)
    }
}

impl Neg for LinearCombination {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.into_iter().map(|(coeff, var)| (-coeff, var)).collect())
    }
}

/// A single rank-1 constraint `a · b = c`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    /// Left factor.
    pub a: LinearCombination,
    /// Right factor.
    pub b: LinearCombination,
    /// Product.
    pub c: LinearCombination,
}

impl Constraint {
    /// Returns true if the assignment satisfies this constraint.
    pub fn is_satisfied(&self, values: &[FieldElement]) -> bool {
        self.a.evaluate(values) * self.b.evaluate(values) == self.c.evaluate(values)
    }
}

/// One step of the forward evaluation program recorded by the compiler.
///
/// Directives are stored in the order the compiler emitted them, which is
/// always an evaluable order: every directive only reads variables assigned
/// by inputs or by earlier directives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Directive {
    /// `target = lc`
    Linear {
        /// Assigned variable.
        target: Variable,
        /// Value to assign.
        lc: LinearCombination,
    },
    /// `target = a · b + c`
    Quadratic {
        /// Assigned variable.
        target: Variable,
        /// Left factor.
        a: LinearCombination,
        /// Right factor.
        b: LinearCombination,
        /// Added offset.
        c: LinearCombination,
    },
    /// `target = numerator / denominator`
    Quotient {
        /// Assigned variable.
        target: Variable,
        /// Dividend.
        numerator: LinearCombination,
        /// Divisor.
        denominator: LinearCombination,
    },
    /// Little-endian bit decomposition of `source` into `targets`.
    Bits {
        /// Value to decompose.
        source: LinearCombination,
        /// One variable per bit, least significant first.
        targets: Vec<Variable>,
    },
}

/// Mapping from declared circuit parameters to variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Abi {
    /// Public inputs, in declaration order.
    pub public_inputs: Vec<(String, Variable)>,
    /// Private inputs, in declaration order.
    pub private_inputs: Vec<(String, Variable)>,
    /// Public outputs (return values), in order.
    pub outputs: Vec<Variable>,
}

/// An immutable rank-1 constraint system plus the program that solves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSystem {
    name: String,
    constraints: Vec<Constraint>,
    directives: Vec<Directive>,
    num_variables: usize,
    num_public: usize,
    abi: Abi,
    fingerprint: [u8; 32],
}

impl ConstraintSystem {
    pub(crate) fn new(
        name: String,
        constraints: Vec<Constraint>,
        directives: Vec<Directive>,
        num_variables: usize,
        abi: Abi,
    ) -> Self {
        let num_public = abi.public_inputs.len() + abi.outputs.len();
        let fingerprint = compute_fingerprint(num_variables, num_public, &constraints);
        Self {
            name,
            constraints,
            directives,
            num_variables,
            num_public,
            abi,
            fingerprint,
        }
    }

    /// Name of the compiled circuit.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The constraints, in emission order.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// The forward evaluation program.
    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// Number of constraints.
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Total number of variables, including the constant wire.
    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    /// Number of public variables (inputs plus outputs), excluding the constant wire.
    pub fn num_public(&self) -> usize {
        self.num_public
    }

    /// Number of private inputs.
    pub fn num_private_inputs(&self) -> usize {
        self.abi.private_inputs.len()
    }

    /// Number of compiler-introduced variables.
    pub fn num_internal(&self) -> usize {
        self.num_variables - 1 - self.num_public - self.abi.private_inputs.len()
    }

    /// Input/output layout.
    pub fn abi(&self) -> &Abi {
        &self.abi
    }

    /// SHA-256 digest over the variable layout and the constraints.
    ///
    /// Two systems with the same fingerprint accept the same witnesses, which
    /// is what keys and witnesses are matched on.
    pub fn fingerprint(&self) -> [u8; 32] {
        self.fingerprint
    }

    /// Hex form of [`fingerprint`](Self::fingerprint).
    pub fn fingerprint_hex(&self) -> String {
        hex::encode(self.fingerprint)
    }

    /// Returns the index of the first constraint the assignment violates.
    pub fn first_unsatisfied(&self, values: &[FieldElement]) -> Option<usize> {
        self.constraints
            .iter()
            .position(|constraint| !constraint.is_satisfied(values))
    }

    /// Checks a deserialized system: every variable is in range and the
    /// stored fingerprint matches the constraints.
    pub(crate) fn is_well_formed(&self) -> bool {
        let in_range = |lc: &LinearCombination| {
            lc.terms()
                .iter()
                .all(|(_, var)| var.index() < self.num_variables)
        };
        let constraints_ok = self
            .constraints
            .iter()
            .all(|c| in_range(&c.a) && in_range(&c.b) && in_range(&c.c));
        let directives_ok = self.directives.iter().all(|d| match d {
            Directive::Linear { target, lc } => target.index() < self.num_variables && in_range(lc),
            Directive::Quadratic { target, a, b, c } => {
                target.index() < self.num_variables && in_range(a) && in_range(b) && in_range(c)
            }
            Directive::Quotient {
                target,
                numerator,
                denominator,
            } => target.index() < self.num_variables && in_range(numerator) && in_range(denominator),
            Directive::Bits { source, targets } => {
                in_range(source) && targets.iter().all(|t| t.index() < self.num_variables)
            }
        });
        let layout_ok = self.num_public == self.abi.public_inputs.len() + self.abi.outputs.len()
            && 1 + self.num_public + self.abi.private_inputs.len() <= self.num_variables;
        constraints_ok
            && directives_ok
            && layout_ok
            && compute_fingerprint(self.num_variables, self.num_public, &self.constraints)
                == self.fingerprint
    }
}

fn compute_fingerprint(
    num_variables: usize,
    num_public: usize,
    constraints: &[Constraint],
) -> [u8; 32] {
    fn absorb_lc(hasher: &mut Sha256, lc: &LinearCombination) {
        hasher.update((lc.terms().len() as u64).to_le_bytes());
        for (coeff, var) in lc.terms() {
            hasher.update((var.index() as u64).to_le_bytes());
            hasher.update(coeff.to_be_bytes());
        }
    }

    let mut hasher = Sha256::new();
    hasher.update(FINGERPRINT_DOMAIN);
    hasher.update((num_variables as u64).to_le_bytes());
    hasher.update((num_public as u64).to_le_bytes());
    hasher.update((constraints.len() as u64).to_le_bytes());
    for constraint in constraints {
        absorb_lc(&mut hasher, &constraint.a);
        absorb_lc(&mut hasher, &constraint.b);
        absorb_lc(&mut hasher, &constraint.c);
    }
    hasher.finalize().into()
}

/// A constraint system replayed into arkworks.
///
/// This struct implements `ConstraintSynthesizer` for use with arkworks'
/// Groth16 generator (without a witness) and prover (with one).
#[derive(Clone, Copy)]
pub struct R1csCircuit<'a> {
    /// The constraint system to replay.
    cs: &'a ConstraintSystem,
    /// Witness values (only needed during proving, not during setup).
    witness: Option<&'a Witness>,
}

impl<'a> R1csCircuit<'a> {
    /// Creates a circuit without witness values (for setup).
    pub fn new(cs: &'a ConstraintSystem) -> Self {
        Self { cs, witness: None }
    }

    /// Creates a circuit with witness values (for proving).
    pub fn with_witness(cs: &'a ConstraintSystem, witness: &'a Witness) -> Self {
        Self {
            cs,
            witness: Some(witness),
        }
    }
}

impl ConstraintSynthesizer<Fr> for R1csCircuit<'_> {
    fn generate_constraints(self, ark_cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let values = self.witness.map(Witness::values);
        let value_at = |index: usize| -> Result<Fr, SynthesisError> {
            values
                .and_then(|v| v.get(index))
                .map(|v| v.into_inner())
                .ok_or(SynthesisError::AssignmentMissing)
        };

        // Map every variable index to the arkworks variable allocated for it.
        let mut vars = Vec::with_capacity(self.cs.num_variables());
        vars.push(ArkVariable::One);
        for index in 1..self.cs.num_variables() {
            let var = if index <= self.cs.num_public() {
                ark_cs.new_input_variable(|| value_at(index))?
            } else {
                ark_cs.new_witness_variable(|| value_at(index))?
            };
            vars.push(var);
        }

        for constraint in self.cs.constraints() {
            ark_cs.enforce_constraint(
                constraint.a.to_ark(&vars),
                constraint.b.to_ark(&vars),
                constraint.c.to_ark(&vars),
            )?;
        }

        Ok(())
    }
}

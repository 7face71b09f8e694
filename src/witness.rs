//! Witness solving.
//!
//! The solver places the supplied inputs at their ABI positions, runs the
//! constraint system's directives forward to fill every remaining variable,
//! and then re-checks all constraints. A witness is only returned when it
//! satisfies the whole system, so a proof can never be attempted for an
//! input that does not belong to the circuit.

use crate::errors::{FieldError, InputKind, SolveError};
use crate::field::FieldElement;
use crate::r1cs::{ConstraintSystem, Directive};
use std::fmt;
use tracing::{debug, instrument, warn};

/// A full assignment to a constraint system's variables.
#[derive(Clone, PartialEq, Eq)]
pub struct Witness {
    values: Vec<FieldElement>,
    fingerprint: [u8; 32],
    num_public: usize,
    num_outputs: usize,
}

impl Witness {
    /// All variable values, indexed by variable; `values()[0]` is one.
    pub fn values(&self) -> &[FieldElement] {
        &self.values
    }

    /// Fingerprint of the constraint system this witness was solved against.
    pub fn fingerprint(&self) -> [u8; 32] {
        self.fingerprint
    }

    /// The verifier's instance: public inputs followed by outputs.
    pub fn public_inputs(&self) -> &[FieldElement] {
        &self.values[1..=self.num_public]
    }

    /// The circuit's return values.
    pub fn outputs(&self) -> &[FieldElement] {
        &self.values[1 + self.num_public - self.num_outputs..=self.num_public]
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false; the constant wire is present in every witness.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Witness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Witness")
            .field("fingerprint", &hex::encode(self.fingerprint))
            .field("num_variables", &self.values.len())
            .field("public", &self.public_inputs())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Witness {
    /// One `~index value` line per variable, the layout ZoKrates prints.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, value) in self.values.iter().enumerate() {
            writeln!(f, "~{index} {value}")?;
        }
        Ok(())
    }
}

/// Solves a witness for the given inputs.
///
/// # Arguments
/// * `cs` - The compiled constraint system
/// * `public_inputs` - Values of the public parameters, in declaration order
/// * `private_inputs` - Values of the private parameters, in declaration order
///
/// # Returns
/// A witness satisfying every constraint, or the reason none could be built
#[instrument(skip_all, fields(circuit = cs.name(), constraints = cs.num_constraints()))]
pub fn solve(
    cs: &ConstraintSystem,
    public_inputs: &[FieldElement],
    private_inputs: &[FieldElement],
) -> Result<Witness, SolveError> {
    let abi = cs.abi();
    if public_inputs.len() != abi.public_inputs.len() {
        warn!(
            expected = abi.public_inputs.len(),
            actual = public_inputs.len(),
            "wrong number of public inputs"
        );
        return Err(SolveError::ArityMismatch {
            kind: InputKind::Public,
            expected: abi.public_inputs.len(),
            actual: public_inputs.len(),
        });
    }
    if private_inputs.len() != abi.private_inputs.len() {
        warn!(
            expected = abi.private_inputs.len(),
            actual = private_inputs.len(),
            "wrong number of private inputs"
        );
        return Err(SolveError::ArityMismatch {
            kind: InputKind::Private,
            expected: abi.private_inputs.len(),
            actual: private_inputs.len(),
        });
    }

    let mut values = vec![FieldElement::zero(); cs.num_variables()];
    values[0] = FieldElement::one();
    for ((_, var), value) in abi.public_inputs.iter().zip(public_inputs) {
        values[var.index()] = *value;
    }
    for ((_, var), value) in abi.private_inputs.iter().zip(private_inputs) {
        values[var.index()] = *value;
    }

    for directive in cs.directives() {
        run_directive(directive, &mut values)?;
    }

    if let Some(index) = cs.first_unsatisfied(&values) {
        debug!(index, "constraint violated");
        return Err(SolveError::UnsatisfiedConstraint { index });
    }

    debug!(variables = values.len(), "witness solved");
    Ok(Witness {
        values,
        fingerprint: cs.fingerprint(),
        num_public: cs.num_public(),
        num_outputs: abi.outputs.len(),
    })
}

fn run_directive(directive: &Directive, values: &mut [FieldElement]) -> Result<(), FieldError> {
    match directive {
        Directive::Linear { target, lc } => {
            values[target.index()] = lc.evaluate(values);
        }
        Directive::Quadratic { target, a, b, c } => {
            values[target.index()] = a.evaluate(values) * b.evaluate(values) + c.evaluate(values);
        }
        Directive::Quotient {
            target,
            numerator,
            denominator,
        } => {
            let num = numerator.evaluate(values);
            values[target.index()] = num.checked_div(&denominator.evaluate(values))?;
        }
        Directive::Bits { source, targets } => {
            // Bits beyond the canonical representative stay zero; the packing
            // constraint catches values that do not fit in `targets.len()` bits.
            let bits = source.evaluate(values).to_bits_le();
            for (target, bit) in targets.iter().zip(bits) {
                values[target.index()] = FieldElement::from(bit);
            }
        }
    }
    Ok(())
}

/// Solves several independent input sets against the same system.
///
/// With the `parallel` feature the inputs are solved on the rayon pool.
pub fn solve_batch(
    cs: &ConstraintSystem,
    inputs: &[(Vec<FieldElement>, Vec<FieldElement>)],
) -> Vec<Result<Witness, SolveError>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        inputs
            .par_iter()
            .map(|(public, private)| solve(cs, public, private))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        inputs
            .iter()
            .map(|(public, private)| solve(cs, public, private))
            .collect()
    }
}

//! Lowering of circuit descriptions to rank-1 constraint systems.
//!
//! Linear operations are folded into linear combinations and cost nothing.
//! Every product of two non-constant combinations and every definition that
//! is not already a single variable introduces one internal variable and one
//! constraint. Division by a non-constant allocates the divisor's inverse
//! under `den · inv = 1` and multiplies by it. Each of those steps also
//! records a [`Directive`] so the witness solver can replay the circuit
//! forward.

use crate::circuit::{Builtin, CircuitDescription, Expr, Statement, Visibility, MAX_EXPRESSION_DEPTH};
use crate::errors::CompileError;
use crate::field::FieldElement;
use crate::gadgets;
use crate::r1cs::{Abi, Constraint, ConstraintSystem, Directive, LinearCombination, VarKind, Variable};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Accumulates variables, constraints and directives for one circuit.
#[derive(Debug)]
pub(crate) struct ConstraintBuilder {
    constraints: Vec<Constraint>,
    directives: Vec<Directive>,
    num_variables: usize,
}

impl ConstraintBuilder {
    pub(crate) fn new() -> Self {
        Self {
            constraints: Vec::new(),
            directives: Vec::new(),
            num_variables: 1,
        }
    }

    /// Allocates the next variable index.
    pub(crate) fn alloc(&mut self, kind: VarKind) -> Variable {
        let var = Variable::new(self.num_variables, kind);
        self.num_variables += 1;
        var
    }

    pub(crate) fn alloc_internal(&mut self) -> Variable {
        self.alloc(VarKind::Internal)
    }

    /// Adds the constraint `a · b = c`.
    pub(crate) fn enforce(&mut self, a: LinearCombination, b: LinearCombination, c: LinearCombination) {
        self.constraints.push(Constraint { a, b, c });
    }

    pub(crate) fn push_directive(&mut self, directive: Directive) {
        self.directives.push(directive);
    }

    /// Allocates `t = a · b` with one constraint.
    pub(crate) fn product(&mut self, a: LinearCombination, b: LinearCombination) -> Variable {
        let target = self.alloc_internal();
        self.push_directive(Directive::Quadratic {
            target,
            a: a.clone(),
            b: b.clone(),
            c: LinearCombination::zero(),
        });
        self.enforce(a, b, target.into());
        target
    }

    /// Allocates a variable equal to `lc` with one constraint.
    pub(crate) fn materialize(&mut self, lc: LinearCombination) -> Variable {
        let target = self.alloc_internal();
        self.push_directive(Directive::Linear {
            target,
            lc: lc.clone(),
        });
        self.enforce(lc, LinearCombination::constant(FieldElement::one()), target.into());
        target
    }

    pub(crate) fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub(crate) fn finish(self, name: String, abi: Abi) -> ConstraintSystem {
        ConstraintSystem::new(name, self.constraints, self.directives, self.num_variables, abi)
    }
}

/// Compiles circuit source text into a constraint system.
///
/// # Arguments
/// * `source` - Program text in the circuit language
///
/// # Returns
/// The compiled system, or the first parse or lowering error
pub fn compile(source: &str) -> Result<ConstraintSystem, CompileError> {
    let description = CircuitDescription::parse(source)?;
    compile_description(&description)
}

/// Compiles a structured circuit description into a constraint system.
///
/// Compilation is deterministic: equal descriptions yield equal systems with
/// equal fingerprints.
#[instrument(skip_all, fields(circuit = %description.name))]
pub fn compile_description(description: &CircuitDescription) -> Result<ConstraintSystem, CompileError> {
    let mut compiler = Compiler::new();
    let abi = compiler.declare(description)?;

    for statement in &description.statements {
        if compiler.returned {
            return Err(CompileError::InvalidReturn {
                message: "statements after `return`".to_string(),
            });
        }
        compiler.statement(statement, &abi)?;
    }

    if !compiler.returned && !abi.outputs.is_empty() {
        return Err(CompileError::InvalidReturn {
            message: format!("missing `return` of {} values", abi.outputs.len()),
        });
    }

    let cs = compiler.builder.finish(description.name.clone(), abi);
    debug!(
        constraints = cs.num_constraints(),
        variables = cs.num_variables(),
        public = cs.num_public(),
        fingerprint = %cs.fingerprint_hex(),
        "circuit compiled"
    );
    Ok(cs)
}

struct Compiler {
    builder: ConstraintBuilder,
    scope: BTreeMap<String, LinearCombination>,
    returned: bool,
    depth: usize,
}

impl Compiler {
    fn new() -> Self {
        Self {
            builder: ConstraintBuilder::new(),
            scope: BTreeMap::new(),
            returned: false,
            depth: 0,
        }
    }

    /// Allocates parameters and outputs in witness layout order.
    fn declare(&mut self, description: &CircuitDescription) -> Result<Abi, CompileError> {
        let mut abi = Abi::default();

        for param in description.params_with(Visibility::Public) {
            let var = self.builder.alloc(VarKind::Public);
            self.bind(&param.name, var.into())?;
            abi.public_inputs.push((param.name.clone(), var));
        }
        for _ in 0..description.num_outputs {
            abi.outputs.push(self.builder.alloc(VarKind::Public));
        }
        for param in description.params_with(Visibility::Private) {
            let var = self.builder.alloc(VarKind::Private);
            self.bind(&param.name, var.into())?;
            abi.private_inputs.push((param.name.clone(), var));
        }

        Ok(abi)
    }

    fn bind(&mut self, name: &str, value: LinearCombination) -> Result<(), CompileError> {
        if self.scope.contains_key(name) {
            return Err(CompileError::DuplicateSignal {
                name: name.to_string(),
            });
        }
        self.scope.insert(name.to_string(), value);
        Ok(())
    }

    /// Constants and single variables are bound as they are; anything else
    /// gets its own variable.
    fn define(&mut self, name: &str, lc: LinearCombination) -> Result<(), CompileError> {
        if self.scope.contains_key(name) {
            return Err(CompileError::DuplicateSignal {
                name: name.to_string(),
            });
        }
        let value = if lc.as_constant().is_some() || lc.as_variable().is_some() {
            lc
        } else {
            self.builder.materialize(lc).into()
        };
        self.bind(name, value)
    }

    fn statement(&mut self, statement: &Statement, abi: &Abi) -> Result<(), CompileError> {
        match statement {
            Statement::Define { name, value } => {
                if let Expr::Call(builtin, _) = value {
                    return Err(CompileError::TypeMismatch {
                        message: format!(
                            "`{}` returns field[{}], but `{name}` is declared as field",
                            builtin.name(),
                            builtin.output_len()
                        ),
                    });
                }
                let lc = self.lower(value)?;
                self.define(name, lc)
            }
            Statement::DefineArray { name, len, value } => {
                let Expr::Call(builtin, args) = value else {
                    return Err(CompileError::TypeMismatch {
                        message: format!("`{name}` is declared as field[{len}] but assigned a field"),
                    });
                };
                if *len != builtin.output_len() {
                    return Err(CompileError::TypeMismatch {
                        message: format!(
                            "`{}` returns field[{}], but `{name}` is declared as field[{len}]",
                            builtin.name(),
                            builtin.output_len()
                        ),
                    });
                }
                let results = self.call(*builtin, args)?;
                if self.scope.contains_key(name) {
                    return Err(CompileError::DuplicateSignal { name: name.clone() });
                }
                for (index, lc) in results.into_iter().enumerate() {
                    self.define(&crate::circuit::element_name(name, index), lc)?;
                }
                Ok(())
            }
            Statement::AssertEq { lhs, rhs } => self.assert_eq(lhs, rhs),
            Statement::Return(values) => {
                if values.len() != abi.outputs.len() {
                    return Err(CompileError::InvalidReturn {
                        message: format!(
                            "expected {} return values, found {}",
                            abi.outputs.len(),
                            values.len()
                        ),
                    });
                }
                for (value, output) in values.iter().zip(&abi.outputs) {
                    let lc = self.lower(value)?;
                    self.builder.push_directive(Directive::Linear {
                        target: *output,
                        lc: lc.clone(),
                    });
                    self.builder.enforce(
                        lc,
                        LinearCombination::constant(FieldElement::one()),
                        (*output).into(),
                    );
                }
                self.returned = true;
                Ok(())
            }
        }
    }

    fn assert_eq(&mut self, lhs: &Expr, rhs: &Expr) -> Result<(), CompileError> {
        let lhs = match lhs {
            Expr::Mul(left, right) => {
                let l = self.lower(left)?;
                let r = self.lower(right)?;
                match (l.as_constant(), r.as_constant()) {
                    (Some(k), _) => r.scale(k),
                    (_, Some(k)) => l.scale(k),
                    (None, None) => {
                        let x = self.lower(rhs)?;
                        self.builder.enforce(l, r, x);
                        return Ok(());
                    }
                }
            }
            _ => self.lower(lhs)?,
        };

        let difference = lhs - self.lower(rhs)?;
        match difference.as_constant() {
            Some(value) if value.is_zero() => Ok(()),
            Some(value) => Err(CompileError::UnsatisfiableStructure {
                message: format!("assertion reduces to {value} == 0"),
            }),
            None => {
                self.builder.enforce(
                    difference,
                    LinearCombination::constant(FieldElement::one()),
                    LinearCombination::zero(),
                );
                Ok(())
            }
        }
    }

    fn call(&mut self, builtin: Builtin, args: &[Expr]) -> Result<Vec<LinearCombination>, CompileError> {
        if args.len() != builtin.arity() {
            return Err(CompileError::TypeMismatch {
                message: format!(
                    "`{}` takes {} arguments, found {}",
                    builtin.name(),
                    builtin.arity(),
                    args.len()
                ),
            });
        }
        let args = args
            .iter()
            .map(|arg| self.lower(arg))
            .collect::<Result<Vec<_>, _>>()?;

        let before = self.builder.num_constraints();
        let results = match builtin {
            Builtin::Sha256Packed => gadgets::sha256::sha256_packed(&mut self.builder, &args)?,
        };
        debug!(
            builtin = builtin.name(),
            constraints = self.builder.num_constraints() - before,
            "builtin lowered"
        );
        Ok(results)
    }

    fn lower(&mut self, expr: &Expr) -> Result<LinearCombination, CompileError> {
        if self.depth >= MAX_EXPRESSION_DEPTH {
            return Err(CompileError::ExpressionTooDeep {
                limit: MAX_EXPRESSION_DEPTH,
            });
        }
        self.depth += 1;
        let lowered = self.lower_node(expr);
        self.depth -= 1;
        lowered
    }

    fn lower_node(&mut self, expr: &Expr) -> Result<LinearCombination, CompileError> {
        Ok(match expr {
            Expr::Constant(value) => LinearCombination::constant(*value),
            Expr::Signal(name) => self
                .scope
                .get(name)
                .cloned()
                .ok_or_else(|| CompileError::UndefinedSignal { name: name.clone() })?,
            Expr::Neg(inner) => -self.lower(inner)?,
            Expr::Add(a, b) => self.lower(a)? + self.lower(b)?,
            Expr::Sub(a, b) => self.lower(a)? - self.lower(b)?,
            Expr::Mul(a, b) => {
                let a = self.lower(a)?;
                let b = self.lower(b)?;
                match (a.as_constant(), b.as_constant()) {
                    (Some(k), _) => b.scale(k),
                    (_, Some(k)) => a.scale(k),
                    (None, None) => self.builder.product(a, b).into(),
                }
            }
            Expr::Div(a, b) => {
                let numerator = self.lower(a)?;
                let denominator = self.lower(b)?;
                match denominator.as_constant() {
                    Some(k) => {
                        let inverse = k.inverse().map_err(|_| CompileError::UnsatisfiableStructure {
                            message: "division by the constant zero".to_string(),
                        })?;
                        numerator.scale(inverse)
                    }
                    None => {
                        // den · inv = 1 rules out a zero divisor, which
                        // `t · den = num` alone would accept for num = 0.
                        let inverse = self.builder.alloc_internal();
                        self.builder.push_directive(Directive::Quotient {
                            target: inverse,
                            numerator: LinearCombination::constant(FieldElement::one()),
                            denominator: denominator.clone(),
                        });
                        self.builder.enforce(
                            denominator,
                            inverse.into(),
                            LinearCombination::constant(FieldElement::one()),
                        );
                        let inverse = LinearCombination::from(inverse);
                        match numerator.as_constant() {
                            Some(k) => inverse.scale(k),
                            None => self.builder.product(numerator, inverse).into(),
                        }
                    }
                }
            }
            Expr::Call(builtin, _) => {
                return Err(CompileError::TypeMismatch {
                    message: format!(
                        "`{}` returns field[{}] and can only initialise an array",
                        builtin.name(),
                        builtin.output_len()
                    ),
                })
            }
        })
    }
}

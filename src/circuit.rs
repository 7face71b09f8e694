//! Circuit descriptions.
//!
//! A [`CircuitDescription`] is the structured form of a circuit program: a
//! signature (parameters and the number of returned values) and a sequence of
//! statements over named signals. It can be produced by the source parser
//! ([`CircuitDescription::parse`]) or built directly:
//!
//! ```ignore
//! use snarkpipe::circuit::{CircuitDescription, Expr};
//!
//! let mut circuit = CircuitDescription::new("square_root");
//! circuit.private_input("x");
//! circuit.assert_eq(Expr::signal("x") * Expr::signal("x"), Expr::constant(25u64));
//! ```

use crate::errors::CompileError;
use crate::field::FieldElement;
use crate::parser;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Deepest expression nesting the parser and compiler accept.
pub const MAX_EXPRESSION_DEPTH: usize = 256;

/// Visibility of a circuit parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Known to the verifier.
    Public,
    /// Known only to the prover.
    Private,
}

/// A declared circuit parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Signal name.
    pub name: String,
    /// Whether the verifier sees the value.
    pub visibility: Visibility,
}

/// Functions provided by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// SHA-256 over four 128-bit field elements, returning the digest as two
    /// 128-bit field elements.
    Sha256Packed,
}

impl Builtin {
    /// Canonical name of the builtin.
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Sha256Packed => "sha256packed",
        }
    }

    /// Number of field arguments.
    pub fn arity(&self) -> usize {
        match self {
            Builtin::Sha256Packed => 4,
        }
    }

    /// Number of field results.
    pub fn output_len(&self) -> usize {
        match self {
            Builtin::Sha256Packed => 2,
        }
    }

    /// Resolves an import path to a builtin.
    pub fn from_import_path(path: &str) -> Option<Self> {
        match path {
            "hashes/sha256/512bitPacked" => Some(Builtin::Sha256Packed),
            _ => None,
        }
    }

    /// Resolves a call name to a builtin.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sha256packed" => Some(Builtin::Sha256Packed),
            _ => None,
        }
    }
}

/// An arithmetic expression over signals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// A field constant.
    Constant(FieldElement),
    /// A named signal; array elements are named `name[i]`.
    Signal(String),
    /// Negation.
    Neg(Box<Expr>),
    /// Sum.
    Add(Box<Expr>, Box<Expr>),
    /// Difference.
    Sub(Box<Expr>, Box<Expr>),
    /// Product.
    Mul(Box<Expr>, Box<Expr>),
    /// Field division.
    Div(Box<Expr>, Box<Expr>),
    /// Call of a builtin; only valid as the whole right-hand side of an
    /// array definition.
    Call(Builtin, Vec<Expr>),
}

impl Expr {
    /// A named signal.
    pub fn signal(name: impl Into<String>) -> Self {
        Expr::Signal(name.into())
    }

    /// Element `index` of an array signal.
    pub fn element(name: &str, index: usize) -> Self {
        Expr::Signal(element_name(name, index))
    }

    /// A constant.
    pub fn constant(value: impl Into<FieldElement>) -> Self {
        Expr::Constant(value.into())
    }

    /// A builtin call.
    pub fn call(builtin: Builtin, args: Vec<Expr>) -> Self {
        Expr::Call(builtin, args)
    }
}

impl Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        Expr::Add(Box::new(self), Box::new(rhs))
    }
}

impl Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        Expr::Sub(Box::new(self), Box::new(rhs))
    }
}

impl Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        Expr::Mul(Box::new(self), Box::new(rhs))
    }
}

impl Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Expr) -> Expr {
        Expr::Div(Box::new(self), Box::new(rhs))
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::Neg(Box::new(self))
    }
}

/// Name of element `index` of array signal `name`.
pub fn element_name(name: &str, index: usize) -> String {
    format!("{name}[{index}]")
}

/// A statement of the circuit body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `field name = value;`
    Define {
        /// New signal name.
        name: String,
        /// Value of the signal.
        value: Expr,
    },
    /// `field[len] name = value;` where `value` is a builtin call.
    DefineArray {
        /// New array name; elements are `name[0]`, `name[1]`, ...
        name: String,
        /// Declared length.
        len: usize,
        /// Value of the array.
        value: Expr,
    },
    /// `assert(lhs == rhs);`
    AssertEq {
        /// Left side.
        lhs: Expr,
        /// Right side.
        rhs: Expr,
    },
    /// `return e0, e1, ...;` (empty for `return;`).
    Return(Vec<Expr>),
}

/// A circuit program in structured form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitDescription {
    /// Circuit name, used in logs and generated artifacts.
    pub name: String,
    /// Declared parameters, in order.
    pub params: Vec<Parameter>,
    /// Number of values the circuit returns.
    pub num_outputs: usize,
    /// Body statements, in evaluation order.
    pub statements: Vec<Statement>,
}

impl CircuitDescription {
    /// Creates an empty circuit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            num_outputs: 0,
            statements: Vec::new(),
        }
    }

    /// Parses circuit source text.
    pub fn parse(source: &str) -> Result<Self, CompileError> {
        parser::parse(source)
    }

    /// Declares a public input.
    pub fn public_input(&mut self, name: impl Into<String>) -> &mut Self {
        self.params.push(Parameter {
            name: name.into(),
            visibility: Visibility::Public,
        });
        self
    }

    /// Declares a private input.
    pub fn private_input(&mut self, name: impl Into<String>) -> &mut Self {
        self.params.push(Parameter {
            name: name.into(),
            visibility: Visibility::Private,
        });
        self
    }

    /// Declares how many values the circuit returns.
    pub fn returns(&mut self, num_outputs: usize) -> &mut Self {
        self.num_outputs = num_outputs;
        self
    }

    /// Appends `field name = value;`.
    pub fn define(&mut self, name: impl Into<String>, value: Expr) -> &mut Self {
        self.statements.push(Statement::Define {
            name: name.into(),
            value,
        });
        self
    }

    /// Appends `field[len] name = value;`.
    pub fn define_array(&mut self, name: impl Into<String>, len: usize, value: Expr) -> &mut Self {
        self.statements.push(Statement::DefineArray {
            name: name.into(),
            len,
            value,
        });
        self
    }

    /// Appends `assert(lhs == rhs);`.
    pub fn assert_eq(&mut self, lhs: Expr, rhs: Expr) -> &mut Self {
        self.statements.push(Statement::AssertEq { lhs, rhs });
        self
    }

    /// Appends `return values;`.
    pub fn return_values(&mut self, values: Vec<Expr>) -> &mut Self {
        self.statements.push(Statement::Return(values));
        self
    }

    /// Parameters with the given visibility, in declaration order.
    pub fn params_with(&self, visibility: Visibility) -> impl Iterator<Item = &Parameter> {
        self.params
            .iter()
            .filter(move |param| param.visibility == visibility)
    }
}

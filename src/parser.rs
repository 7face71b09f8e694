//! Parser for circuit source text.
//!
//! The accepted language is a small subset of ZoKrates:
//!
//! ```text
//! program    := import* "def" "main" "(" params? ")" ("->" type)? "{" statement* "}"
//! import     := "import" STRING "as" IDENT ";"
//! params     := param ("," param)*
//! param      := ("private" | "public")? "field" IDENT
//! type       := "field" ("[" NUMBER "]")? | "(" "field" ("," "field")* ")"
//! statement  := "field" IDENT "=" expr ";"
//!             | "field" "[" NUMBER "]" IDENT "=" expr ";"
//!             | "assert" "(" expr "==" expr ")" ";"
//!             | "return" (expr ("," expr)* | "[" expr ("," expr)* "]")? ";"
//! expr       := term (("+" | "-") term)*
//! term       := unary (("*" | "/") unary)*
//! unary      := "-" unary | atom
//! atom       := NUMBER | IDENT ("[" NUMBER "]")? | IDENT "(" args ")" | "(" expr ")"
//! args       := "[" expr ("," expr)* "]" | expr ("," expr)*
//! ```
//!
//! Parameters without a visibility keyword are public. `//` starts a line
//! comment.

use crate::circuit::{
    element_name, Builtin, CircuitDescription, Expr, Parameter, Statement, Visibility, MAX_EXPRESSION_DEPTH,
};
use crate::errors::CompileError;
use crate::field::FieldElement;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Number(String),
    Str(String),
    Symbol(&'static str),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier `{name}`"),
            Token::Number(n) => format!("number `{n}`"),
            Token::Str(s) => format!("string {s:?}"),
            Token::Symbol(sym) => format!("`{sym}`"),
        }
    }
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    line: usize,
    column: usize,
}

const SYMBOLS: [&str; 16] = [
    "->", "==", "(", ")", "{", "}", "[", "]", ",", ";", "=", "+", "-", "*", "/", ":",
];

fn tokenize(source: &str) -> Result<Vec<Spanned>, CompileError> {
    let mut tokens = Vec::new();
    for (line_idx, line) in source.lines().enumerate() {
        let line_no = line_idx + 1;
        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            let column = i + 1;
            if c.is_whitespace() {
                i += 1;
                continue;
            }
            if c == '/' && chars.get(i + 1) == Some(&'/') {
                break;
            }
            if c.is_ascii_alphabetic() || c == '_' {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Spanned {
                    token: Token::Ident(chars[start..i].iter().collect()),
                    line: line_no,
                    column,
                });
                continue;
            }
            if c.is_ascii_digit() {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric()) {
                    i += 1;
                }
                tokens.push(Spanned {
                    token: Token::Number(chars[start..i].iter().collect()),
                    line: line_no,
                    column,
                });
                continue;
            }
            if c == '"' {
                let start = i + 1;
                i += 1;
                while i < chars.len() && chars[i] != '"' {
                    i += 1;
                }
                if i == chars.len() {
                    return Err(parse_error(line_no, column, "unterminated string literal"));
                }
                tokens.push(Spanned {
                    token: Token::Str(chars[start..i].iter().collect()),
                    line: line_no,
                    column,
                });
                i += 1;
                continue;
            }
            let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
            match SYMBOLS.iter().find(|sym| rest.starts_with(**sym)) {
                Some(sym) => {
                    tokens.push(Spanned {
                        token: Token::Symbol(sym),
                        line: line_no,
                        column,
                    });
                    i += sym.len();
                }
                None => {
                    return Err(parse_error(
                        line_no,
                        column,
                        &format!("unexpected character `{c}`"),
                    ))
                }
            }
        }
    }
    Ok(tokens)
}

fn parse_error(line: usize, column: usize, message: &str) -> CompileError {
    CompileError::Parse {
        line,
        column,
        message: message.to_string(),
    }
}

/// Parses circuit source into a [`CircuitDescription`].
pub fn parse(source: &str) -> Result<CircuitDescription, CompileError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        imports: BTreeMap::new(),
        depth: 0,
    };
    parser.program()
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    imports: BTreeMap<String, Builtin>,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|t| &t.token)
    }

    fn error_here(&self, message: &str) -> CompileError {
        match self.tokens.get(self.pos).or_else(|| self.tokens.last()) {
            Some(spanned) => parse_error(spanned.line, spanned.column, message),
            None => parse_error(1, 1, message),
        }
    }

    fn next(&mut self) -> Result<Token, CompileError> {
        let token = self
            .tokens
            .get(self.pos)
            .map(|t| t.token.clone())
            .ok_or_else(|| self.error_here("unexpected end of input"))?;
        self.pos += 1;
        Ok(token)
    }

    fn at_symbol(&self, sym: &str) -> bool {
        matches!(self.peek(), Some(Token::Symbol(s)) if *s == sym)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(s)) if s == keyword)
    }

    fn expect_symbol(&mut self, sym: &str) -> Result<(), CompileError> {
        if self.at_symbol(sym) {
            self.pos += 1;
            return Ok(());
        }
        let found = self
            .peek()
            .map(Token::describe)
            .unwrap_or_else(|| "end of input".to_string());
        Err(self.error_here(&format!("expected `{sym}`, found {found}")))
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), CompileError> {
        if self.at_keyword(keyword) {
            self.pos += 1;
            return Ok(());
        }
        let found = self
            .peek()
            .map(Token::describe)
            .unwrap_or_else(|| "end of input".to_string());
        Err(self.error_here(&format!("expected `{keyword}`, found {found}")))
    }

    fn ident(&mut self) -> Result<String, CompileError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            Some(other) => Err(self.error_here(&format!("expected identifier, found {}", other.describe()))),
            None => Err(self.error_here("expected identifier, found end of input")),
        }
    }

    fn usize_literal(&mut self) -> Result<usize, CompileError> {
        match self.peek() {
            Some(Token::Number(n)) => {
                let value = n
                    .parse::<usize>()
                    .map_err(|_| self.error_here(&format!("invalid size `{n}`")))?;
                self.pos += 1;
                Ok(value)
            }
            _ => Err(self.error_here("expected a size")),
        }
    }

    fn program(&mut self) -> Result<CircuitDescription, CompileError> {
        while self.at_keyword("import") {
            self.import()?;
        }

        self.expect_keyword("def")?;
        let name = self.ident()?;
        let mut circuit = CircuitDescription::new(name);

        self.expect_symbol("(")?;
        if !self.at_symbol(")") {
            loop {
                circuit.params.push(self.param()?);
                if self.at_symbol(",") {
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }
        self.expect_symbol(")")?;

        if self.at_symbol("->") {
            self.pos += 1;
            circuit.num_outputs = self.return_type()?;
        }

        self.expect_symbol("{")?;
        while !self.at_symbol("}") {
            if self.peek().is_none() {
                return Err(self.error_here("expected `}`, found end of input"));
            }
            let statement = self.statement()?;
            circuit.statements.push(statement);
        }
        self.expect_symbol("}")?;

        if let Some(extra) = self.peek() {
            let message = format!("unexpected {} after the end of `main`", extra.describe());
            return Err(self.error_here(&message));
        }
        Ok(circuit)
    }

    fn import(&mut self) -> Result<(), CompileError> {
        self.expect_keyword("import")?;
        let path = match self.next()? {
            Token::Str(path) => path,
            other => {
                self.pos -= 1;
                return Err(self.error_here(&format!("expected import path, found {}", other.describe())));
            }
        };
        let builtin = Builtin::from_import_path(&path).ok_or(CompileError::UnknownFunction {
            name: path.clone(),
        })?;
        let alias = if self.at_keyword("as") {
            self.pos += 1;
            self.ident()?
        } else {
            builtin.name().to_string()
        };
        self.expect_symbol(";")?;
        self.imports.insert(alias, builtin);
        Ok(())
    }

    fn param(&mut self) -> Result<Parameter, CompileError> {
        let visibility = if self.at_keyword("private") {
            self.pos += 1;
            Visibility::Private
        } else {
            if self.at_keyword("public") {
                self.pos += 1;
            }
            Visibility::Public
        };
        self.expect_keyword("field")?;
        let name = self.ident()?;
        Ok(Parameter { name, visibility })
    }

    fn return_type(&mut self) -> Result<usize, CompileError> {
        if self.at_symbol("(") {
            self.pos += 1;
            let mut count = 0;
            if !self.at_symbol(")") {
                loop {
                    self.expect_keyword("field")?;
                    count += 1;
                    if self.at_symbol(",") {
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
            }
            self.expect_symbol(")")?;
            return Ok(count);
        }
        self.expect_keyword("field")?;
        if self.at_symbol("[") {
            self.pos += 1;
            let len = self.usize_literal()?;
            self.expect_symbol("]")?;
            return Ok(len);
        }
        Ok(1)
    }

    fn statement(&mut self) -> Result<Statement, CompileError> {
        if self.at_keyword("field") {
            self.pos += 1;
            if self.at_symbol("[") {
                self.pos += 1;
                let len = self.usize_literal()?;
                self.expect_symbol("]")?;
                let name = self.ident()?;
                self.expect_symbol("=")?;
                let value = self.expr()?;
                self.expect_symbol(";")?;
                return Ok(Statement::DefineArray { name, len, value });
            }
            let name = self.ident()?;
            self.expect_symbol("=")?;
            let value = self.expr()?;
            self.expect_symbol(";")?;
            return Ok(Statement::Define { name, value });
        }

        if self.at_keyword("assert") {
            self.pos += 1;
            self.expect_symbol("(")?;
            let lhs = self.expr()?;
            self.expect_symbol("==")?;
            let rhs = self.expr()?;
            self.expect_symbol(")")?;
            self.expect_symbol(";")?;
            return Ok(Statement::AssertEq { lhs, rhs });
        }

        if self.at_keyword("return") {
            self.pos += 1;
            let mut values = Vec::new();
            if self.at_symbol("[") {
                self.pos += 1;
                values = self.expr_list("]")?;
                self.expect_symbol("]")?;
            } else if !self.at_symbol(";") {
                values.push(self.expr()?);
                while self.at_symbol(",") {
                    self.pos += 1;
                    values.push(self.expr()?);
                }
            }
            self.expect_symbol(";")?;
            return Ok(Statement::Return(values));
        }

        let found = self
            .peek()
            .map(Token::describe)
            .unwrap_or_else(|| "end of input".to_string());
        Err(self.error_here(&format!("expected a statement, found {found}")))
    }

    fn expr_list(&mut self, close: &str) -> Result<Vec<Expr>, CompileError> {
        let mut items = Vec::new();
        if self.at_symbol(close) {
            return Ok(items);
        }
        loop {
            items.push(self.expr()?);
            if self.at_symbol(",") {
                self.pos += 1;
            } else {
                return Ok(items);
            }
        }
    }

    /// Counts one more level of expression nesting. Parentheses, unary
    /// minus and every binary operator of a chain each add a level.
    fn nest(&mut self) -> Result<(), CompileError> {
        if self.depth >= MAX_EXPRESSION_DEPTH {
            return Err(self.error_here(&format!(
                "expression nests deeper than {MAX_EXPRESSION_DEPTH} levels"
            )));
        }
        self.depth += 1;
        Ok(())
    }

    fn expr(&mut self) -> Result<Expr, CompileError> {
        let depth = self.depth;
        self.nest()?;
        let mut lhs = self.term()?;
        loop {
            if self.at_symbol("+") {
                self.pos += 1;
                self.nest()?;
                lhs = lhs + self.term()?;
            } else if self.at_symbol("-") {
                self.pos += 1;
                self.nest()?;
                lhs = lhs - self.term()?;
            } else {
                self.depth = depth;
                return Ok(lhs);
            }
        }
    }

    fn term(&mut self) -> Result<Expr, CompileError> {
        let depth = self.depth;
        let mut lhs = self.unary()?;
        loop {
            if self.at_symbol("*") {
                self.pos += 1;
                self.nest()?;
                lhs = lhs * self.unary()?;
            } else if self.at_symbol("/") {
                self.pos += 1;
                self.nest()?;
                lhs = lhs / self.unary()?;
            } else {
                self.depth = depth;
                return Ok(lhs);
            }
        }
    }

    fn unary(&mut self) -> Result<Expr, CompileError> {
        if self.at_symbol("-") {
            self.pos += 1;
            let depth = self.depth;
            self.nest()?;
            let inner = self.unary()?;
            self.depth = depth;
            return Ok(-inner);
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<Expr, CompileError> {
        match self.peek().cloned() {
            Some(Token::Number(literal)) => {
                let value: FieldElement = literal
                    .parse()
                    .map_err(|e| self.error_here(&format!("invalid constant `{literal}`: {e}")))?;
                self.pos += 1;
                Ok(Expr::Constant(value))
            }
            Some(Token::Ident(name)) => {
                if matches!(self.peek_at(1), Some(Token::Symbol("("))) {
                    return self.call();
                }
                self.pos += 1;
                if self.at_symbol("[") {
                    self.pos += 1;
                    let index = self.usize_literal()?;
                    self.expect_symbol("]")?;
                    return Ok(Expr::Signal(element_name(&name, index)));
                }
                Ok(Expr::Signal(name))
            }
            Some(Token::Symbol("(")) => {
                self.pos += 1;
                let inner = self.expr()?;
                self.expect_symbol(")")?;
                Ok(inner)
            }
            Some(other) => Err(self.error_here(&format!("expected an expression, found {}", other.describe()))),
            None => Err(self.error_here("expected an expression, found end of input")),
        }
    }

    fn call(&mut self) -> Result<Expr, CompileError> {
        let name = self.ident()?;
        let builtin = self
            .imports
            .get(&name)
            .copied()
            .or_else(|| Builtin::from_name(&name))
            .ok_or(CompileError::UnknownFunction { name })?;
        self.expect_symbol("(")?;
        let args = if self.at_symbol("[") {
            self.pos += 1;
            let args = self.expr_list("]")?;
            self.expect_symbol("]")?;
            args
        } else {
            self.expr_list(")")?
        };
        self.expect_symbol(")")?;
        Ok(Expr::Call(builtin, args))
    }
}

//! Expression parsing and evaluation for parameter constraints
//!
//! Constraint expressions such as `2.3548200*g1_sigma` or
//! `amplitude / max(1e-15, sigma)` are parsed into a small AST with `nom` and
//! evaluated against an [`EvaluationContext`] (usually a `Parameters`
//! collection).

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, digit0, digit1, multispace0, one_of},
    combinator::{map, map_res, opt, recognize},
    error::Error as NomError,
    multi::{fold_many0, many0_count, separated_list0},
    sequence::{delimited, pair, preceded},
    IResult, Parser,
};
use std::collections::HashMap;
use std::f64::consts::{E, PI};
use std::fmt;
use thiserror::Error;

/// Error that can occur during expression parsing or evaluation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Failed to parse expression '{input}': {message}")]
    ParseError { input: String, message: String },

    #[error("Undefined variable: {name}")]
    UndefinedVariable { name: String },

    #[error("Undefined function: {name}")]
    UndefinedFunction { name: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("{name}() takes {expected} argument(s), got {got}")]
    WrongArity {
        name: String,
        expected: &'static str,
        got: usize,
    },
}

type ExprResult<T> = Result<T, ExpressionError>;

/// Names that always resolve to a constant.
pub const CONSTANTS: [&str; 4] = ["pi", "e", "inf", "nan"];

fn constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(PI),
        "e" => Some(E),
        "inf" => Some(f64::INFINITY),
        "nan" => Some(f64::NAN),
        _ => None,
    }
}

/// Expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Number(f64),
    Variable(String),
    Unary(UnaryOp, Box<Expression>),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
    Call(String, Vec<Expression>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
        }
    }

    fn apply(self, lhs: f64, rhs: f64) -> ExprResult<f64> {
        match self {
            BinaryOp::Add => Ok(lhs + rhs),
            BinaryOp::Sub => Ok(lhs - rhs),
            BinaryOp::Mul => Ok(lhs * rhs),
            BinaryOp::Div if rhs == 0.0 => Err(ExpressionError::DivisionByZero),
            BinaryOp::Div => Ok(lhs / rhs),
            BinaryOp::Mod if rhs == 0.0 => Err(ExpressionError::DivisionByZero),
            // floored modulo: the result takes the sign of the divisor
            BinaryOp::Mod => Ok(lhs - rhs * (lhs / rhs).floor()),
            BinaryOp::Pow => Ok(lhs.powf(rhs)),
        }
    }
}

/// Source of variable values during evaluation.
pub trait EvaluationContext {
    fn get_variable(&self, name: &str) -> Option<f64>;
}

impl EvaluationContext for HashMap<String, f64> {
    fn get_variable(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl Expression {
    /// Parse an expression from a string.
    ///
    /// # Examples
    ///
    /// ```
    /// use modelfit::parameters::Expression;
    /// use std::collections::HashMap;
    ///
    /// let expr = Expression::parse("2.3548200 * sigma").unwrap();
    /// let vars = HashMap::from([("sigma".to_string(), 2.0)]);
    /// assert!((expr.evaluate(&vars).unwrap() - 4.70964).abs() < 1e-12);
    /// ```
    pub fn parse(input: &str) -> ExprResult<Self> {
        let parse_error = |message: String| ExpressionError::ParseError {
            input: input.to_string(),
            message,
        };

        match expression(input) {
            Ok((rest, expr)) if rest.trim().is_empty() => Ok(expr),
            Ok((rest, _)) => Err(parse_error(format!("unexpected input at '{}'", rest.trim()))),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                if e.input.trim().is_empty() {
                    Err(parse_error("unexpected end of expression".to_string()))
                } else {
                    Err(parse_error(format!("unexpected input at '{}'", e.input.trim())))
                }
            }
            Err(nom::Err::Incomplete(_)) => {
                Err(parse_error("unexpected end of expression".to_string()))
            }
        }
    }

    /// Evaluate the expression against the given variable values.
    pub fn evaluate<C: EvaluationContext + ?Sized>(&self, context: &C) -> ExprResult<f64> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Variable(name) => context
                .get_variable(name)
                .or_else(|| constant(name))
                .ok_or_else(|| ExpressionError::UndefinedVariable { name: name.clone() }),
            Self::Unary(UnaryOp::Neg, inner) => Ok(-inner.evaluate(context)?),
            Self::Binary(op, lhs, rhs) => op.apply(lhs.evaluate(context)?, rhs.evaluate(context)?),
            Self::Call(name, args) => {
                let values = args
                    .iter()
                    .map(|arg| arg.evaluate(context))
                    .collect::<ExprResult<Vec<f64>>>()?;
                call_function(name, &values)
            }
        }
    }

    /// Names of the variables referenced by the expression, in order of first
    /// appearance. Built-in constants are not included.
    pub fn variables(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables(&self, names: &mut Vec<String>) {
        match self {
            Self::Number(_) => {}
            Self::Variable(name) => {
                if constant(name).is_none() && !names.contains(name) {
                    names.push(name.clone());
                }
            }
            Self::Unary(_, inner) => inner.collect_variables(names),
            Self::Binary(_, lhs, rhs) => {
                lhs.collect_variables(names);
                rhs.collect_variables(names);
            }
            Self::Call(_, args) => args.iter().for_each(|arg| arg.collect_variables(names)),
        }
    }

    /// Return a copy with every variable passed through `rename`.
    pub fn rename_variables<F>(&self, rename: &F) -> Expression
    where
        F: Fn(&str) -> String,
    {
        match self {
            Self::Number(n) => Self::Number(*n),
            Self::Variable(name) => Self::Variable(rename(name)),
            Self::Unary(op, inner) => Self::Unary(*op, Box::new(inner.rename_variables(rename))),
            Self::Binary(op, lhs, rhs) => Self::Binary(
                *op,
                Box::new(lhs.rename_variables(rename)),
                Box::new(rhs.rename_variables(rename)),
            ),
            Self::Call(name, args) => Self::Call(
                name.clone(),
                args.iter().map(|arg| arg.rename_variables(rename)).collect(),
            ),
        }
    }
}

// Binary operations are always parenthesized so the output re-parses to the
// same tree.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) if n.is_finite() => write!(f, "{n:?}"),
            // an overflowing literal parses back to infinity
            Self::Number(n) if *n == f64::INFINITY => f.write_str("1e999"),
            Self::Number(n) if *n == f64::NEG_INFINITY => f.write_str("(-1e999)"),
            Self::Number(_) => f.write_str("(1e999 - 1e999)"),
            Self::Variable(name) => f.write_str(name),
            Self::Unary(UnaryOp::Neg, inner) => write!(f, "(-{inner})"),
            Self::Binary(op, lhs, rhs) => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Self::Call(name, args) => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

fn sign(v: f64) -> f64 {
    if v == 0.0 || v.is_nan() {
        v
    } else {
        v.signum()
    }
}

fn call_function(name: &str, args: &[f64]) -> ExprResult<f64> {
    let arity = |expected: &'static str| ExpressionError::WrongArity {
        name: name.to_string(),
        expected,
        got: args.len(),
    };

    let unary: Option<fn(f64) -> f64> = match name {
        "abs" => Some(f64::abs),
        "sqrt" => Some(f64::sqrt),
        "exp" => Some(f64::exp),
        "ln" => Some(f64::ln),
        "log10" => Some(f64::log10),
        "log2" => Some(f64::log2),
        "sin" => Some(f64::sin),
        "cos" => Some(f64::cos),
        "tan" => Some(f64::tan),
        "asin" | "arcsin" => Some(f64::asin),
        "acos" | "arccos" => Some(f64::acos),
        "atan" | "arctan" => Some(f64::atan),
        "sinh" => Some(f64::sinh),
        "cosh" => Some(f64::cosh),
        "tanh" => Some(f64::tanh),
        "floor" => Some(f64::floor),
        "ceil" => Some(f64::ceil),
        "round" => Some(f64::round),
        "degrees" => Some(f64::to_degrees),
        "radians" => Some(f64::to_radians),
        "sign" => Some(sign),
        _ => None,
    };
    if let Some(func) = unary {
        return match args {
            [v] => Ok(func(*v)),
            _ => Err(arity("1")),
        };
    }

    match name {
        "log" => match args {
            [v] => Ok(v.ln()),
            [v, base] => Ok(v.log(*base)),
            _ => Err(arity("1 or 2")),
        },
        "atan2" | "arctan2" => match args {
            [y, x] => Ok(y.atan2(*x)),
            _ => Err(arity("2")),
        },
        "hypot" => match args {
            [a, b] => Ok(a.hypot(*b)),
            _ => Err(arity("2")),
        },
        "pow" => match args {
            [a, b] => Ok(a.powf(*b)),
            _ => Err(arity("2")),
        },
        "min" if !args.is_empty() => Ok(args.iter().copied().fold(f64::INFINITY, f64::min)),
        "max" if !args.is_empty() => Ok(args.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
        "min" | "max" => Err(arity("at least 1")),
        _ => Err(ExpressionError::UndefinedFunction {
            name: name.to_string(),
        }),
    }
}

// Grammar, loosest binding first:
//   expression     := multiplicative (('+' | '-') multiplicative)*
//   multiplicative := unary (('*' | '/' | '%') unary)*
//   unary          := ('-' | '+') unary | power
//   power          := primary (('**' | '^') unary)?
//   primary        := number | call | identifier | '(' expression ')'

type PResult<'a, T> = IResult<&'a str, T>;

fn token<'a, O, P>(inner: P) -> impl Parser<&'a str, Output = O, Error = NomError<&'a str>>
where
    P: Parser<&'a str, Output = O, Error = NomError<&'a str>>,
{
    delimited(multispace0, inner, multispace0)
}

fn identifier(input: &str) -> PResult<'_, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))
    .parse(input)
}

fn number(input: &str) -> PResult<'_, Expression> {
    map_res(
        recognize(pair(
            alt((
                recognize(pair(digit1, opt(pair(char('.'), digit0)))),
                recognize(pair(char('.'), digit1)),
            )),
            opt((one_of("eE"), opt(one_of("+-")), digit1)),
        )),
        |text: &str| text.parse::<f64>().map(Expression::Number),
    )
    .parse(input)
}

fn call(input: &str) -> PResult<'_, Expression> {
    map(
        pair(
            identifier,
            delimited(
                token(char('(')),
                separated_list0(token(char(',')), expression),
                token(char(')')),
            ),
        ),
        |(name, args)| Expression::Call(name.to_string(), args),
    )
    .parse(input)
}

fn variable(input: &str) -> PResult<'_, Expression> {
    map(identifier, |name| Expression::Variable(name.to_string())).parse(input)
}

fn parens(input: &str) -> PResult<'_, Expression> {
    delimited(token(char('(')), expression, token(char(')'))).parse(input)
}

fn primary(input: &str) -> PResult<'_, Expression> {
    token(alt((number, call, variable, parens))).parse(input)
}

fn power(input: &str) -> PResult<'_, Expression> {
    let (rest, base) = primary(input)?;
    match preceded(token(alt((tag("**"), tag("^")))), unary).parse(rest) {
        Ok((rest, exponent)) => Ok((
            rest,
            Expression::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)),
        )),
        Err(nom::Err::Error(_)) => Ok((rest, base)),
        Err(e) => Err(e),
    }
}

fn unary(input: &str) -> PResult<'_, Expression> {
    alt((
        map(preceded(token(char('-')), unary), |inner| {
            Expression::Unary(UnaryOp::Neg, Box::new(inner))
        }),
        preceded(token(char('+')), unary),
        power,
    ))
    .parse(input)
}

fn multiplicative(input: &str) -> PResult<'_, Expression> {
    let (rest, first) = unary(input)?;
    fold_many0(
        pair(
            token(alt((
                map(char('*'), |_| BinaryOp::Mul),
                map(char('/'), |_| BinaryOp::Div),
                map(char('%'), |_| BinaryOp::Mod),
            ))),
            unary,
        ),
        move || first.clone(),
        |lhs, (op, rhs)| Expression::Binary(op, Box::new(lhs), Box::new(rhs)),
    )
    .parse(rest)
}

fn expression(input: &str) -> PResult<'_, Expression> {
    let (rest, first) = multiplicative(input)?;
    fold_many0(
        pair(
            token(alt((
                map(char('+'), |_| BinaryOp::Add),
                map(char('-'), |_| BinaryOp::Sub),
            ))),
            multiplicative,
        ),
        move || first.clone(),
        |lhs, (op, rhs)| Expression::Binary(op, Box::new(lhs), Box::new(rhs)),
    )
    .parse(rest)
}

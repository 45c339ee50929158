use colored::*;
use thiserror::Error;

use frontend::reader::ReadError;
use frontend::scanner::{ScanError, Token};
use tools::errors::ReportCodeErr;

use crate::scope::ScopeError;
use crate::values::ValueError;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("{}: expected {0} instead of {1}", "SyntaxError".red().bold())]
    Expected(Token, Token),

    #[error("{}: expected identifier instead of {0}", "SyntaxError".red().bold())]
    ExpectedIdentifier(Token),

    #[error("{}: unexpected {0} in expression", "SyntaxError".red().bold())]
    UnexpectedToken(Token),

    #[error("{}: missing identifier after function definition", "SyntaxError".red().bold())]
    MissingFunctionName,

    #[error("{}: no argument left to assign to {0}", "SyntaxError".red().bold())]
    MissingArgument(String),

    #[error("{}: {0} is not callable", "TypeError".red().bold())]
    NotCallable(String),

    #[error("{}: unsupported type for input: {0}", "TypeError".red().bold())]
    BadInputType(&'static str),

    #[error("{}: {0}", "SystemError".red().bold())]
    Io(String),

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Read(#[from] ReadError),
}

impl From<std::io::Error> for RuntimeError {
    fn from(e: std::io::Error) -> Self {
        RuntimeError::Io(e.to_string())
    }
}

// Implement global trait for final error
impl ReportCodeErr for RuntimeError {}

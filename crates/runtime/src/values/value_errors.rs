use colored::*;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ValueError {
    // Operations
    #[error("{}: unsupported operand type(s) for operation {0}: {1} and {2}", "TypeError".red().bold())]
    BinaryOperands(&'static str, &'static str, &'static str),

    #[error("{}: unsupported operand type for operation {0}: {1}", "TypeError".red().bold())]
    UnaryOperand(&'static str, &'static str),

    #[error("{}: type {0} is not subscriptable", "TypeError".red().bold())]
    NotSubscriptable(&'static str),

    #[error("{}: division by zero", "ZeroDivisionError".red().bold())]
    DivisionByZero,

    // Sequences
    #[error("{}: index {0} out of range", "IndexError".red().bold())]
    IndexOutOfRange(i64),

    // Conversions
    #[error("{}: cannot convert {0} to {1}", "ValueError".red().bold())]
    Conversion(String, &'static str),

    #[error("{}: unknown escape sequence: \\{0}", "ValueError".red().bold())]
    UnknownEscape(char),

    #[error("{}: empty character constant", "SyntaxError".red().bold())]
    EmptyCharConstant,

    #[error("{}: too many characters in character constant", "SyntaxError".red().bold())]
    LongCharConstant,
}

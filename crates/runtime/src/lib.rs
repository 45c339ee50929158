pub mod heap;
pub mod interpreter;
pub mod scope;
pub mod values;

extern crate frontend;
extern crate tools;

pub use frontend::{
    reader::Reader,
    scanner::{Position, Scanner, Token},
};

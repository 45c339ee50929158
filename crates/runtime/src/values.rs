use std::cell::RefCell;
use std::fmt::Display;
use std::rc::Rc;

pub mod convert;
mod value_errors;

pub use value_errors::ValueError;

use crate::heap::Heap;
use frontend::scanner::Position;

pub type ValueRef = Rc<RefCell<Value>>;

// Declarable types. Positions only enter the world through the function
// pre-scan, so they have no tag here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Char,
    Int,
    Float,
    Str,
    List,
}

/// A runtime value. List elements are owning cells, which is what makes
/// indexed assignment and loop variables mutate the list in place.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Char(u8),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ValueRef>),
    Pos(Position),
    None,
}

impl Value {
    pub fn default_of(tag: TypeTag) -> Value {
        match tag {
            TypeTag::Char => Value::Char(0),
            TypeTag::Int => Value::Int(0),
            TypeTag::Float => Value::Float(0.0),
            TypeTag::Str => Value::Str(String::new()),
            TypeTag::List => Value::List(Vec::new()),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Char(_) => "char",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Pos(_) => "position",
            Value::None => "none",
        }
    }

    // char < int < float
    fn rank(&self) -> Option<u8> {
        match self {
            Value::Char(_) => Some(0),
            Value::Int(_) => Some(1),
            Value::Float(_) => Some(2),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Char(c) => write!(f, "{}", *c as char),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", convert::format_float(*x)),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (idx, cell) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", *cell.borrow())?;
                }
                write!(f, "]")
            }
            Value::Pos(_) => write!(f, "<function>"),
            Value::None => write!(f, "none"),
        }
    }
}

fn binop_err(op: &'static str, a: &Value, b: &Value) -> ValueError {
    ValueError::BinaryOperands(op, a.type_name(), b.type_name())
}

// Callers guarantee the operand is numeric.
fn char_of(v: &Value) -> u8 {
    match v {
        Value::Char(c) => *c,
        Value::Int(i) => *i as u8,
        Value::Float(f) => *f as u8,
        _ => 0,
    }
}

fn int_of(v: &Value) -> i64 {
    match v {
        Value::Char(c) => *c as i64,
        Value::Int(i) => *i,
        Value::Float(f) => *f as i64,
        _ => 0,
    }
}

fn float_of(v: &Value) -> f64 {
    match v {
        Value::Char(c) => *c as f64,
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        _ => 0.0,
    }
}

// Arithmetic on the promoted common type. Integer and char division by
// zero fail, float division follows IEEE.
fn numeric_binop(op: &'static str, a: &Value, b: &Value) -> Result<Value, ValueError> {
    let ra = a.rank().ok_or_else(|| binop_err(op, a, b))?;
    let rb = b.rank().ok_or_else(|| binop_err(op, a, b))?;

    match ra.max(rb) {
        2 => {
            let (x, y) = (float_of(a), float_of(b));
            Ok(Value::Float(match op {
                "+" => x + y,
                "-" => x - y,
                "*" => x * y,
                "/" => x / y,
                "%" => x % y,
                _ => return Err(binop_err(op, a, b)),
            }))
        }
        1 => {
            let (x, y) = (int_of(a), int_of(b));
            if (op == "/" || op == "%") && y == 0 {
                return Err(ValueError::DivisionByZero);
            }
            Ok(Value::Int(match op {
                "+" => x.wrapping_add(y),
                "-" => x.wrapping_sub(y),
                "*" => x.wrapping_mul(y),
                "/" => x.wrapping_div(y),
                "%" => x.wrapping_rem(y),
                _ => return Err(binop_err(op, a, b)),
            }))
        }
        _ => {
            let (x, y) = (char_of(a), char_of(b));
            if (op == "/" || op == "%") && y == 0 {
                return Err(ValueError::DivisionByZero);
            }
            Ok(Value::Char(match op {
                "+" => x.wrapping_add(y),
                "-" => x.wrapping_sub(y),
                "*" => x.wrapping_mul(y),
                "/" => x / y,
                "%" => x % y,
                _ => return Err(binop_err(op, a, b)),
            }))
        }
    }
}

pub fn add(a: &Value, b: &Value, heap: &Heap) -> Result<Value, ValueError> {
    if a.rank().is_some() && b.rank().is_some() {
        return numeric_binop("+", a, b);
    }
    match (a, b) {
        (Value::Str(_), _) | (_, Value::Str(_)) => {
            let left = convert::to_text(a).ok_or_else(|| binop_err("+", a, b))?;
            let right = convert::to_text(b).ok_or_else(|| binop_err("+", a, b))?;
            Ok(Value::Str(left + &right))
        }
        (Value::List(x), Value::List(y)) => {
            let mut items = Vec::with_capacity(x.len() + y.len());
            for cell in x.iter().chain(y.iter()) {
                let copy = deep_copy(&cell.borrow(), heap);
                items.push(heap.alloc(copy));
            }
            Ok(Value::List(items))
        }
        _ => Err(binop_err("+", a, b)),
    }
}

pub fn sub(a: &Value, b: &Value) -> Result<Value, ValueError> {
    numeric_binop("-", a, b)
}

pub fn mul(a: &Value, b: &Value, heap: &Heap) -> Result<Value, ValueError> {
    if a.rank().is_some() && b.rank().is_some() {
        return numeric_binop("*", a, b);
    }
    match (a, b) {
        (Value::Str(s), n) | (n, Value::Str(s)) if n.rank().is_some() => {
            let count = int_of(n).max(0) as usize;
            Ok(Value::Str(s.repeat(count)))
        }
        (Value::List(items), n) | (n, Value::List(items)) if n.rank().is_some() => {
            let count = int_of(n).max(0) as usize;
            let mut copies = Vec::with_capacity(items.len() * count);
            for _ in 0..count {
                for cell in items {
                    let copy = deep_copy(&cell.borrow(), heap);
                    copies.push(heap.alloc(copy));
                }
            }
            Ok(Value::List(copies))
        }
        _ => Err(binop_err("*", a, b)),
    }
}

pub fn div(a: &Value, b: &Value) -> Result<Value, ValueError> {
    numeric_binop("/", a, b)
}

pub fn rem(a: &Value, b: &Value) -> Result<Value, ValueError> {
    numeric_binop("%", a, b)
}

pub fn neg(a: &Value) -> Result<Value, ValueError> {
    match a {
        Value::Char(c) => Ok(Value::Char(c.wrapping_neg())),
        Value::Int(i) => Ok(Value::Int(i.wrapping_neg())),
        Value::Float(f) => Ok(Value::Float(-f)),
        other => Err(ValueError::UnaryOperand("-", other.type_name())),
    }
}

// Unary plus returns a fresh copy of its numeric operand
pub fn plus(a: &Value) -> Result<Value, ValueError> {
    match a {
        Value::Char(_) | Value::Int(_) | Value::Float(_) => Ok(a.clone()),
        other => Err(ValueError::UnaryOperand("+", other.type_name())),
    }
}

pub fn not(a: &Value) -> Result<Value, ValueError> {
    match a.rank() {
        Some(_) => Ok(Value::Int(if truthy(a) { 0 } else { 1 })),
        None => Err(ValueError::UnaryOperand("!", a.type_name())),
    }
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Char(c) => *c != 0,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        _ => false,
    }
}

// Operands of different types are by definition unequal, never an error.
pub fn eq(a: &Value, b: &Value) -> Value {
    let equal = match (a, b) {
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::List(x), Value::List(y)) => list_eq(x, y),
        _ => match (a.rank(), b.rank()) {
            (Some(ra), Some(rb)) => {
                if ra.max(rb) == 2 {
                    float_of(a) == float_of(b)
                } else {
                    int_of(a) == int_of(b)
                }
            }
            _ => false,
        },
    };
    Value::Int(equal as i64)
}

pub fn neq(a: &Value, b: &Value) -> Value {
    match eq(a, b) {
        Value::Int(1) => Value::Int(0),
        _ => Value::Int(1),
    }
}

fn list_eq(x: &[ValueRef], y: &[ValueRef]) -> bool {
    x.len() == y.len()
        && x.iter()
            .zip(y.iter())
            .all(|(p, q)| matches!(eq(&p.borrow(), &q.borrow()), Value::Int(1)))
}

fn ordering(op: &'static str, a: &Value, b: &Value) -> Result<Value, ValueError> {
    let ra = a.rank().ok_or_else(|| binop_err(op, a, b))?;
    let rb = b.rank().ok_or_else(|| binop_err(op, a, b))?;

    let result = if ra.max(rb) == 2 {
        let (x, y) = (float_of(a), float_of(b));
        match op {
            "<" => x < y,
            "<=" => x <= y,
            ">" => x > y,
            _ => x >= y,
        }
    } else {
        let (x, y) = (int_of(a), int_of(b));
        match op {
            "<" => x < y,
            "<=" => x <= y,
            ">" => x > y,
            _ => x >= y,
        }
    };
    Ok(Value::Int(result as i64))
}

pub fn lss(a: &Value, b: &Value) -> Result<Value, ValueError> {
    ordering("<", a, b)
}

pub fn leq(a: &Value, b: &Value) -> Result<Value, ValueError> {
    ordering("<=", a, b)
}

pub fn gtr(a: &Value, b: &Value) -> Result<Value, ValueError> {
    ordering(">", a, b)
}

pub fn geq(a: &Value, b: &Value) -> Result<Value, ValueError> {
    ordering(">=", a, b)
}

pub fn and(a: &Value, b: &Value) -> Result<Value, ValueError> {
    if a.rank().is_none() || b.rank().is_none() {
        return Err(binop_err("and", a, b));
    }
    Ok(Value::Int((truthy(a) && truthy(b)) as i64))
}

pub fn or(a: &Value, b: &Value) -> Result<Value, ValueError> {
    if a.rank().is_none() || b.rank().is_none() {
        return Err(binop_err("or", a, b));
    }
    Ok(Value::Int((truthy(a) || truthy(b)) as i64))
}

// Membership tests the needle with == against every element
pub fn contains(needle: &Value, seq: &Value) -> Result<Value, ValueError> {
    match seq {
        Value::Str(s) => {
            for b in s.as_bytes() {
                let item = Value::Str((*b as char).to_string());
                if matches!(eq(needle, &item), Value::Int(1)) {
                    return Ok(Value::Int(1));
                }
            }
            Ok(Value::Int(0))
        }
        Value::List(items) => {
            for cell in items {
                if matches!(eq(needle, &cell.borrow()), Value::Int(1)) {
                    return Ok(Value::Int(1));
                }
            }
            Ok(Value::Int(0))
        }
        other => Err(ValueError::NotSubscriptable(other.type_name())),
    }
}

fn normalize_index(index: i64, len: i64) -> Result<usize, ValueError> {
    let i = if index < 0 { index + len } else { index };
    if i < 0 || i >= len {
        Err(ValueError::IndexOutOfRange(index))
    } else {
        Ok(i as usize)
    }
}

// Indexing a list yields the element cell itself; indexing a string yields
// a fresh one-character string.
pub fn item(seq: &Value, index: i64, heap: &Heap) -> Result<ValueRef, ValueError> {
    match seq {
        Value::Str(s) => {
            let i = normalize_index(index, s.len() as i64)?;
            let c = s.as_bytes()[i] as char;
            Ok(heap.alloc(Value::Str(c.to_string())))
        }
        Value::List(items) => {
            let i = normalize_index(index, items.len() as i64)?;
            Ok(Rc::clone(&items[i]))
        }
        other => Err(ValueError::NotSubscriptable(other.type_name())),
    }
}

fn clamp_range(start: i64, end: i64, len: i64) -> (usize, usize) {
    let mut a = if start < 0 { start + len } else { start };
    let mut b = if end < 0 { end + len } else { end };
    a = a.clamp(0, len);
    b = b.clamp(0, len);
    if a > b {
        b = a;
    }
    (a as usize, b as usize)
}

pub fn slice(seq: &Value, start: i64, end: i64, heap: &Heap) -> Result<Value, ValueError> {
    match seq {
        Value::Str(s) => {
            let (a, b) = clamp_range(start, end, s.len() as i64);
            let text = String::from_utf8_lossy(&s.as_bytes()[a..b]).into_owned();
            Ok(Value::Str(text))
        }
        Value::List(items) => {
            let (a, b) = clamp_range(start, end, items.len() as i64);
            let copies = items[a..b]
                .iter()
                .map(|cell| heap.alloc(deep_copy(&cell.borrow(), heap)))
                .collect();
            Ok(Value::List(copies))
        }
        other => Err(ValueError::NotSubscriptable(other.type_name())),
    }
}

pub fn length(seq: &Value) -> Result<i64, ValueError> {
    match seq {
        Value::Str(s) => Ok(s.len() as i64),
        Value::List(items) => Ok(items.len() as i64),
        other => Err(ValueError::NotSubscriptable(other.type_name())),
    }
}

// A copy sharing no interior with its source
pub fn deep_copy(value: &Value, heap: &Heap) -> Value {
    match value {
        Value::List(items) => Value::List(
            items
                .iter()
                .map(|cell| heap.alloc(deep_copy(&cell.borrow(), heap)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Store `source` into `target`, coerced to the type the target already
/// holds. Lists are replaced by a deep copy of the source list.
pub fn assign(target: &ValueRef, source: &ValueRef, heap: &Heap) -> Result<(), ValueError> {
    let new_value = {
        let current = target.borrow();
        let src = source.borrow();
        coerce_to(&current, &src, heap)?
    };
    *target.borrow_mut() = new_value;
    Ok(())
}

fn coerce_to(current: &Value, src: &Value, heap: &Heap) -> Result<Value, ValueError> {
    match current {
        Value::Char(_) => Ok(Value::Char(convert::as_char(src)?)),
        Value::Int(_) => Ok(Value::Int(convert::as_int(src)?)),
        Value::Float(_) => Ok(Value::Float(convert::as_float(src)?)),
        Value::Str(_) => convert::to_text(src)
            .map(Value::Str)
            .ok_or_else(|| binop_err("=", current, src)),
        Value::List(_) => {
            let items = convert::as_list(src)?;
            Ok(deep_copy(&Value::List(items), heap))
        }
        Value::Pos(_) | Value::None => Err(binop_err("=", current, src)),
    }
}

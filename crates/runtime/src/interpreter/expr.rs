use std::collections::VecDeque;

use frontend::scanner::{Position, Token};

use super::{Flow, Interpreter, RuntimeError};
use crate::values::{self, convert, Value, ValueRef};

// Expression evaluation, precedence climbing from comma down to primaries.
// Every level returns a value cell; identifiers and list elements return
// their own cell, which is what makes assignment through them work.
impl<'a> Interpreter<'a> {
    // value ( ',' value )*, the result is the last one
    pub(crate) fn comma_expr(&mut self) -> Result<ValueRef, RuntimeError> {
        let mut value = self.assignment_expr()?;
        while self.accept(Token::Comma)? {
            value = self.assignment_expr()?;
        }
        Ok(value)
    }

    // Right associative. The left side is evaluated to a cell and the right
    // side is stored into it, coerced to the type the cell already holds.
    pub(crate) fn assignment_expr(&mut self) -> Result<ValueRef, RuntimeError> {
        let target = self.or_expr()?;
        if self.accept(Token::Equal)? {
            let rhs = self.assignment_expr()?;
            values::assign(&target, &rhs, &self.heap)?;
        }
        Ok(target)
    }

    // Both operands are always evaluated, there is no short circuit
    fn or_expr(&mut self) -> Result<ValueRef, RuntimeError> {
        let mut left = self.and_expr()?;
        while self.accept(Token::Or)? {
            let right = self.and_expr()?;
            let result = values::or(&left.borrow(), &right.borrow())?;
            left = self.heap.alloc(result);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<ValueRef, RuntimeError> {
        let mut left = self.equality_expr()?;
        while self.accept(Token::And)? {
            let right = self.equality_expr()?;
            let result = values::and(&left.borrow(), &right.borrow())?;
            left = self.heap.alloc(result);
        }
        Ok(left)
    }

    fn equality_expr(&mut self) -> Result<ValueRef, RuntimeError> {
        let mut left = self.relational_expr()?;
        loop {
            let op = self.scanner.token;
            if op != Token::Eq && op != Token::Neq {
                break;
            }
            self.advance()?;
            let right = self.relational_expr()?;
            let result = match op {
                Token::Eq => values::eq(&left.borrow(), &right.borrow()),
                _ => values::neq(&left.borrow(), &right.borrow()),
            };
            left = self.heap.alloc(result);
        }
        Ok(left)
    }

    fn relational_expr(&mut self) -> Result<ValueRef, RuntimeError> {
        let mut left = self.additive_expr()?;
        loop {
            let op = self.scanner.token;
            match op {
                Token::Lss | Token::Leq | Token::Gtr | Token::Geq | Token::In => {}
                _ => break,
            }
            self.advance()?;
            let right = self.additive_expr()?;
            let result = match op {
                Token::Lss => values::lss(&left.borrow(), &right.borrow())?,
                Token::Leq => values::leq(&left.borrow(), &right.borrow())?,
                Token::Gtr => values::gtr(&left.borrow(), &right.borrow())?,
                Token::Geq => values::geq(&left.borrow(), &right.borrow())?,
                _ => values::contains(&left.borrow(), &right.borrow())?,
            };
            left = self.heap.alloc(result);
        }
        Ok(left)
    }

    fn additive_expr(&mut self) -> Result<ValueRef, RuntimeError> {
        let mut left = self.multiplicative_expr()?;
        loop {
            let op = self.scanner.token;
            if op != Token::Plus && op != Token::Minus {
                break;
            }
            self.advance()?;
            let right = self.multiplicative_expr()?;
            let result = match op {
                Token::Plus => values::add(&left.borrow(), &right.borrow(), &self.heap)?,
                _ => values::sub(&left.borrow(), &right.borrow())?,
            };
            left = self.heap.alloc(result);
        }
        Ok(left)
    }

    fn multiplicative_expr(&mut self) -> Result<ValueRef, RuntimeError> {
        let mut left = self.unary_expr()?;
        loop {
            let op = self.scanner.token;
            if op != Token::Star && op != Token::Slash && op != Token::Percent {
                break;
            }
            self.advance()?;
            let right = self.unary_expr()?;
            let result = match op {
                Token::Star => values::mul(&left.borrow(), &right.borrow(), &self.heap)?,
                Token::Slash => values::div(&left.borrow(), &right.borrow())?,
                _ => values::rem(&left.borrow(), &right.borrow())?,
            };
            left = self.heap.alloc(result);
        }
        Ok(left)
    }

    fn unary_expr(&mut self) -> Result<ValueRef, RuntimeError> {
        match self.scanner.token {
            Token::Minus => {
                self.advance()?;
                let operand = self.unary_expr()?;
                let result = values::neg(&operand.borrow())?;
                Ok(self.heap.alloc(result))
            }
            Token::Plus => {
                self.advance()?;
                let operand = self.unary_expr()?;
                let result = values::plus(&operand.borrow())?;
                Ok(self.heap.alloc(result))
            }
            Token::Bang => {
                self.advance()?;
                let operand = self.unary_expr()?;
                let result = values::not(&operand.borrow())?;
                Ok(self.heap.alloc(result))
            }
            _ => self.postfix_expr(),
        }
    }

    // subscript s[i] and slice s[a:b], applied left to right
    fn postfix_expr(&mut self) -> Result<ValueRef, RuntimeError> {
        let mut value = self.primary()?;
        while self.accept(Token::Lbracket)? {
            let first = self.assignment_expr()?;
            if self.accept(Token::Colon)? {
                let second = self.assignment_expr()?;
                self.expect(Token::Rbracket)?;
                let start = convert::as_int(&first.borrow())?;
                let end = convert::as_int(&second.borrow())?;
                let result = values::slice(&value.borrow(), start, end, &self.heap)?;
                value = self.heap.alloc(result);
            } else {
                self.expect(Token::Rbracket)?;
                let index = convert::as_int(&first.borrow())?;
                let element = values::item(&value.borrow(), index, &self.heap)?;
                value = element;
            }
        }
        Ok(value)
    }

    fn primary(&mut self) -> Result<ValueRef, RuntimeError> {
        match self.scanner.token {
            Token::Int => {
                let value = convert::str_to_int(&self.scanner.lexeme)?;
                self.advance()?;
                Ok(self.heap.alloc(Value::Int(value)))
            }
            Token::Float => {
                let value = convert::str_to_float(&self.scanner.lexeme)?;
                self.advance()?;
                Ok(self.heap.alloc(Value::Float(value)))
            }
            Token::Char => {
                let value = convert::str_to_char(&self.scanner.lexeme)?;
                self.advance()?;
                Ok(self.heap.alloc(Value::Char(value)))
            }
            Token::Str => {
                let text = self.scanner.lexeme.clone();
                self.advance()?;
                Ok(self.heap.alloc(Value::Str(text)))
            }
            Token::Lpar => {
                self.advance()?;
                let value = self.comma_expr()?;
                self.expect(Token::Rpar)?;
                Ok(value)
            }
            Token::Lbracket => {
                self.advance()?;
                self.list_literal()
            }
            Token::Identifier => {
                let name = self.scanner.lexeme.clone();
                self.advance()?;
                if self.scanner.token == Token::Lpar {
                    let target = self.scope.lookup(&name)?;
                    let address = match &*target.borrow() {
                        Value::Pos(position) => position.clone(),
                        _ => return Err(RuntimeError::NotCallable(name)),
                    };
                    self.function_call(&address)
                } else {
                    Ok(self.scope.lookup(&name)?)
                }
            }
            other => Err(RuntimeError::UnexpectedToken(other)),
        }
    }

    // [ value ( ',' value )* ] with elements copied into fresh cells
    fn list_literal(&mut self) -> Result<ValueRef, RuntimeError> {
        let mut items: Vec<ValueRef> = Vec::new();
        if self.scanner.token != Token::Rbracket {
            loop {
                let value = self.assignment_expr()?;
                let copy = values::deep_copy(&value.borrow(), &self.heap);
                items.push(self.heap.alloc(copy));
                if !self.accept(Token::Comma)? {
                    break;
                }
            }
        }
        self.expect(Token::Rbracket)?;
        Ok(self.heap.alloc(Value::List(items)))
    }

    // Call protocol: collect deep copies of the arguments, open a frame,
    // remember where to come back to, jump to the stored definition, bind
    // the formals, run the body, jump back and close the frame.
    pub(crate) fn function_call(&mut self, address: &Position) -> Result<ValueRef, RuntimeError> {
        let mut arguments = self.push_arguments()?;
        self.scope.append_level();

        let return_to = self.scanner.save();
        self.scanner.jump(address);
        self.expect(Token::Identifier)?;

        self.pop_arguments(&mut arguments)?;
        self.expect(Token::Rpar)?;

        let result = match self.block()? {
            Flow::Return(value) => value,
            // falling off the end of the body returns integer 0
            _ => self.heap.alloc(Value::Int(0)),
        };

        self.scanner.jump(&return_to);
        self.accept(Token::Rpar)?;
        self.scope.remove_level();

        Ok(result)
    }

    // Deep copies of the call site arguments, front to back. The token ends
    // on the RPAR of the call.
    fn push_arguments(&mut self) -> Result<VecDeque<ValueRef>, RuntimeError> {
        let mut arguments = VecDeque::new();
        self.expect(Token::Lpar)?;

        while self.scanner.token != Token::Rpar {
            let value = self.assignment_expr()?;
            let copy = values::deep_copy(&value.borrow(), &self.heap);
            arguments.push_back(self.heap.alloc(copy));
            if self.scanner.token == Token::Rpar {
                break;
            }
            self.expect(Token::Comma)?;
        }
        Ok(arguments)
    }

    // Bind each formal parameter to the next collected argument. Missing
    // arguments are an error, surplus ones are dropped silently.
    fn pop_arguments(&mut self, arguments: &mut VecDeque<ValueRef>) -> Result<(), RuntimeError> {
        self.expect(Token::Lpar)?;

        while self.scanner.token != Token::Rpar {
            if self.scanner.token != Token::Identifier {
                return Err(RuntimeError::ExpectedIdentifier(self.scanner.token));
            }
            let name = self.scanner.lexeme.clone();
            self.scope.add(&name)?;
            let value = arguments
                .pop_front()
                .ok_or_else(|| RuntimeError::MissingArgument(name.clone()))?;
            self.scope.bind(&name, value)?;
            self.expect(Token::Identifier)?;
            self.accept(Token::Comma)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::Interpreter;
    use frontend::reader::Reader;
    use std::io;

    fn run(src: &str) -> String {
        let mut out = Vec::new();
        let mut input = io::empty();
        {
            let reader = Reader::from_source("<test>", src);
            let mut interp = Interpreter::new(reader, &mut out, &mut input, false);
            interp.run().expect("program should run");
        }
        String::from_utf8(out).expect("output should be utf-8")
    }

    #[test]
    fn precedence_binds_products_before_sums() {
        assert_eq!(run("print 1 + 2 * 3\n"), "7\n");
        assert_eq!(run("print (1 + 2) * 3\n"), "9\n");
        assert_eq!(run("print 10 - 4 - 3\n"), "3\n");
    }

    #[test]
    fn comparisons_yield_ints() {
        assert_eq!(run("print 1 < 2, 2 <= 1, 3 > 2, 2 >= 3\n"), "1 0 1 0\n");
        assert_eq!(run("print 1 == 1, 1 != 1, 1 <> 2\n"), "1 0 1\n");
    }

    #[test]
    fn equality_chains_compare_left_to_right() {
        // (1 == 1) yields 1, then 1 == 1 again
        assert_eq!(run("print 1 == 1 == 1\n"), "1\n");
        assert_eq!(run("print 2 == 2 == 2\n"), "0\n");
    }

    #[test]
    fn unary_operators_nest() {
        assert_eq!(run("print -3 + 1\n"), "-2\n");
        assert_eq!(run("print - -3\n"), "3\n");
        assert_eq!(run("print !0, !5, !!5\n"), "1 0 1\n");
        assert_eq!(run("print +4\n"), "4\n");
    }

    #[test]
    fn comma_expression_yields_the_last_value() {
        assert_eq!(run("int a\na = (1, 2)\nprint a\n"), "2\n");
    }

    #[test]
    fn subscripts_chain() {
        assert_eq!(run("list xs = [[1,2],[3,4]]\nprint xs[1][0]\n"), "3\n");
        assert_eq!(run("str s = \"abcde\"\nprint s[1], s[-1]\n"), "b e\n");
    }

    #[test]
    fn slices_of_strings_and_lists() {
        assert_eq!(run("str s = \"abcde\"\nprint s[1:4]\n"), "bcd\n");
        assert_eq!(run("list xs = [1,2,3]\nprint xs[-2:99]\n"), "[2, 3]\n");
    }

    #[test]
    fn membership_at_relational_level() {
        assert_eq!(run("print 2 in [1,2,3], 5 in [1,2,3]\n"), "1 0\n");
    }

    #[test]
    fn string_repetition() {
        assert_eq!(run("print \"ab\" * 3, 2 * \"x\"\n"), "ababab xx\n");
    }

    #[test]
    fn list_literals_copy_their_elements() {
        let output = run(
            "int a = 1\nlist xs = [a, a + 1]\na = 99\nprint xs\n",
        );
        assert_eq!(output, "[1, 2]\n");
    }

    #[test]
    fn assignment_inside_an_expression() {
        assert_eq!(run("int a\nprint (a = 5) + 1\nprint a\n"), "6\n5\n");
    }

    #[test]
    fn recursive_calls_nest_their_frames() {
        let output = run(
            "def fib(n)\n\
             \x20   if n < 2\n\
             \x20       return n\n\
             \x20   return fib(n-1) + fib(n-2)\n\
             print fib(10)\n",
        );
        assert_eq!(output, "55\n");
    }

    #[test]
    fn calls_inside_expressions_compose() {
        let output = run(
            "def inc(n)\n\
             \x20   return n + 1\n\
             print inc(inc(1)) * inc(0)\n",
        );
        assert_eq!(output, "3\n");
    }
}

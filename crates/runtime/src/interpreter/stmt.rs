use std::io::{BufRead, Write};

use frontend::scanner::Token;

use super::{Flow, Interpreter, RuntimeError};
use crate::values::{self, convert, TypeTag, Value};

impl<'a> Interpreter<'a> {
    // One token of lookahead selects the construct
    pub(crate) fn statement(&mut self) -> Result<Flow, RuntimeError> {
        match self.scanner.token {
            Token::DeclChar => {
                self.advance()?;
                self.variable_declaration(TypeTag::Char)?;
                Ok(Flow::Normal)
            }
            Token::DeclInt => {
                self.advance()?;
                self.variable_declaration(TypeTag::Int)?;
                Ok(Flow::Normal)
            }
            Token::DeclFloat => {
                self.advance()?;
                self.variable_declaration(TypeTag::Float)?;
                Ok(Flow::Normal)
            }
            Token::DeclStr => {
                self.advance()?;
                self.variable_declaration(TypeTag::Str)?;
                Ok(Flow::Normal)
            }
            Token::DeclList => {
                self.advance()?;
                self.variable_declaration(TypeTag::List)?;
                Ok(Flow::Normal)
            }
            // already registered by the pre-scan, only consume the tokens
            Token::Def => {
                self.advance()?;
                self.skip_function()?;
                Ok(Flow::Normal)
            }
            Token::If => {
                self.advance()?;
                self.if_stmt()
            }
            Token::While => {
                self.advance()?;
                self.while_stmt()
            }
            Token::Do => {
                self.advance()?;
                self.do_stmt()
            }
            Token::For => {
                self.advance()?;
                self.for_stmt()
            }
            Token::Print => {
                self.advance()?;
                self.print_stmt()?;
                Ok(Flow::Normal)
            }
            Token::Input => {
                self.advance()?;
                self.input_stmt()?;
                Ok(Flow::Normal)
            }
            Token::Import => {
                self.advance()?;
                self.import_stmt()?;
                Ok(Flow::Normal)
            }
            Token::Return => {
                self.advance()?;
                self.return_stmt()
            }
            Token::Dedent => {
                self.advance()?;
                self.return_stmt()
            }
            Token::Break => {
                self.advance()?;
                Ok(Flow::Break)
            }
            Token::Continue => {
                self.advance()?;
                Ok(Flow::Continue)
            }
            Token::Pass => {
                self.advance()?;
                self.expect(Token::Newline)?;
                Ok(Flow::Normal)
            }
            Token::Endmarker => Ok(Flow::Normal),
            _ => {
                self.expression_stmt()?;
                Ok(Flow::Normal)
            }
        }
    }

    // NEWLINE INDENT statement+ DEDENT, the token ends on the DEDENT.
    // Break and continue abandon the rest of the block; a return leaves the
    // token stream as it is because the enclosing call jumps anyway.
    pub(crate) fn block(&mut self) -> Result<Flow, RuntimeError> {
        self.expect(Token::Newline)?;
        self.expect(Token::Indent)?;

        loop {
            let flow = self.statement()?;
            if let Flow::Return(_) = flow {
                return Ok(flow);
            }
            if self.scanner.token == Token::Dedent || self.scanner.token == Token::Endmarker {
                return Ok(flow);
            }
            if !matches!(flow, Flow::Normal) {
                self.skip_to_block_end()?;
                return Ok(flow);
            }
        }
    }

    fn expression_stmt(&mut self) -> Result<(), RuntimeError> {
        let _ = self.comma_expr()?;
        self.expect(Token::Newline)
    }

    // type identifier ( '=' value )? ( ',' identifier ( '=' value )? )* NEWLINE
    fn variable_declaration(&mut self, tag: TypeTag) -> Result<(), RuntimeError> {
        loop {
            if self.scanner.token != Token::Identifier {
                return Err(RuntimeError::ExpectedIdentifier(self.scanner.token));
            }
            let name = self.scanner.lexeme.clone();
            self.scope.add(&name)?;

            let cell = self.heap.alloc(Value::default_of(tag));
            self.scope.bind(&name, cell.clone())?;
            self.advance()?;

            if self.accept(Token::Equal)? {
                let rhs = self.assignment_expr()?;
                values::assign(&cell, &rhs, &self.heap)?;
            }
            if self.accept(Token::Newline)? {
                break;
            }
            self.expect(Token::Comma)?;
        }
        Ok(())
    }

    // Evaluate an expression and reduce it to true or false
    fn condition(&mut self) -> Result<bool, RuntimeError> {
        let value = self.comma_expr()?;
        let result = convert::as_bool(&value.borrow())?;
        Ok(result)
    }

    fn if_stmt(&mut self) -> Result<Flow, RuntimeError> {
        if self.condition()? {
            let flow = self.block()?;
            if let Flow::Return(_) = flow {
                return Ok(flow);
            }
            self.expect(Token::Dedent)?;
            if self.accept(Token::Else)? {
                self.skip_block()?;
            }
            Ok(flow)
        } else {
            self.skip_block()?;
            if self.accept(Token::Else)? {
                let flow = self.block()?;
                if let Flow::Return(_) = flow {
                    return Ok(flow);
                }
                self.expect(Token::Dedent)?;
                Ok(flow)
            } else {
                Ok(Flow::Normal)
            }
        }
    }

    // The condition is re-read through a saved position on every pass. After
    // the loop is done one skip consumes the block a final time so the token
    // ends up past it.
    fn while_stmt(&mut self) -> Result<Flow, RuntimeError> {
        let loop_pos = self.scanner.save();
        let mut broke = false;

        loop {
            let cond = self.condition()?;
            if !cond || broke {
                break;
            }
            match self.block()? {
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Break => broke = true,
                Flow::Normal | Flow::Continue => {}
            }
            self.scanner.jump(&loop_pos);
        }

        self.skip_block()?;
        Ok(Flow::Normal)
    }

    // do NEWLINE block DEDENT while condition NEWLINE
    fn do_stmt(&mut self) -> Result<Flow, RuntimeError> {
        if self.scanner.token != Token::Newline {
            return Err(RuntimeError::Expected(Token::Newline, self.scanner.token));
        }
        let loop_pos = self.scanner.save();
        let mut broke = false;

        loop {
            self.scanner.jump(&loop_pos);
            match self.block()? {
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Break => broke = true,
                Flow::Normal | Flow::Continue => {}
            }
            self.expect(Token::Dedent)?;
            self.expect(Token::While)?;
            let cond = self.condition()?;
            if !cond || broke {
                break;
            }
        }

        self.expect(Token::Newline)?;
        Ok(Flow::Normal)
    }

    // for identifier in sequence NEWLINE block
    //
    // A missing identifier is created in the current frame. The variable is
    // bound to the element cell each pass and left unbound afterwards.
    fn for_stmt(&mut self) -> Result<Flow, RuntimeError> {
        if self.scanner.token == Token::Identifier && !self.scope.has(&self.scanner.lexeme) {
            self.scope.add(&self.scanner.lexeme.clone())?;
        }
        let name = self.scanner.lexeme.clone();
        self.expect(Token::Identifier)?;
        self.expect(Token::In)?;

        let sequence = self.comma_expr()?;
        let len = values::length(&sequence.borrow())?;

        if self.scanner.token != Token::Newline {
            return Err(RuntimeError::Expected(Token::Newline, self.scanner.token));
        }
        let loop_pos = self.scanner.save();
        let mut broke = false;

        let mut i = 0;
        while i < len && !broke {
            let element = values::item(&sequence.borrow(), i, &self.heap)?;
            self.scope.bind(&name, element)?;
            match self.block()? {
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Break => broke = true,
                Flow::Normal | Flow::Continue => {}
            }
            self.scope.unbind(&name)?;
            self.scanner.jump(&loop_pos);
            i += 1;
        }

        self.skip_block()?;
        Ok(Flow::Normal)
    }

    // print value ( ',' value )* NEWLINE
    fn print_stmt(&mut self) -> Result<(), RuntimeError> {
        let mut first = true;
        loop {
            let value = self.assignment_expr()?;
            if !first {
                write!(self.out, " ")?;
            }
            write!(self.out, "{}", *value.borrow())?;
            first = false;
            if !self.accept(Token::Comma)? {
                break;
            }
        }
        writeln!(self.out)?;
        self.out.flush()?;
        self.expect(Token::Newline)
    }

    // input string? identifier ( ',' string? identifier )* NEWLINE
    //
    // The line read from standard input is parsed according to the type the
    // target currently holds.
    fn input_stmt(&mut self) -> Result<(), RuntimeError> {
        loop {
            if self.scanner.token == Token::Str {
                write!(self.out, "{}", self.scanner.lexeme)?;
                self.out.flush()?;
                self.advance()?;
            }
            if self.scanner.token != Token::Identifier {
                return Err(RuntimeError::ExpectedIdentifier(self.scanner.token));
            }
            let name = self.scanner.lexeme.clone();
            let target = self.scope.lookup(&name)?;

            let mut line = String::new();
            self.input.read_line(&mut line)?;
            let line = line.trim_end_matches(|c| c == '\r' || c == '\n');

            let value = match &*target.borrow() {
                Value::Char(_) => Value::Char(convert::str_to_char(line)?),
                Value::Int(_) => Value::Int(convert::str_to_int(line)?),
                Value::Float(_) => Value::Float(convert::str_to_float(line)?),
                Value::Str(_) => Value::Str(line.to_string()),
                other => return Err(RuntimeError::BadInputType(other.type_name())),
            };
            let cell = self.heap.alloc(value);
            self.scope.bind(&name, cell)?;

            self.accept(Token::Identifier)?;
            if !self.accept(Token::Comma)? {
                break;
            }
        }
        self.expect(Token::Newline)
    }

    // import string ( ',' string )* NEWLINE
    fn import_stmt(&mut self) -> Result<(), RuntimeError> {
        loop {
            let value = self.assignment_expr()?;
            let path = convert::as_str(&value.borrow())?;
            self.run_import(&path)?;
            if !self.accept(Token::Comma)? {
                break;
            }
        }
        self.expect(Token::Newline)
    }

    // return value? NEWLINE, default result is integer 0
    fn return_stmt(&mut self) -> Result<Flow, RuntimeError> {
        let value = if self.scanner.token == Token::Newline {
            self.heap.alloc(Value::Int(0))
        } else {
            self.comma_expr()?
        };
        self.expect(Token::Newline)?;
        Ok(Flow::Return(value))
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
    fn declarations_start_from_type_defaults() {
        let output = run("int i\nfloat f\nstr s\nlist l\nprint i, f, s + \"|\", l\n");
        assert_eq!(output, "0 0 | []\n");

        // the char default is NUL, visible once promoted to int
        let output = run("char c\nprint c + 0\n");
        assert_eq!(output, "0\n");
    }

    #[test]
    fn while_with_false_condition_skips_the_block() {
        let output = run("while 0\n    print 1\nprint 2\n");
        assert_eq!(output, "2\n");
    }

    #[test]
    fn for_over_an_empty_list_skips_the_block() {
        let output = run("list xs\nfor x in xs\n    print x\nprint 9\n");
        assert_eq!(output, "9\n");
    }

    #[test]
    fn if_without_else_continues() {
        let output = run("if 0\n    print 1\nprint 2\n");
        assert_eq!(output, "2\n");
    }

    #[test]
    fn nested_declaration_is_local_to_the_call() {
        let output = run(
            "def f()\n    int local = 1\n    return local\nprint f()\nprint f()\n",
        );
        assert_eq!(output, "1\n1\n");
    }

    #[test]
    fn do_while_loops_until_false() {
        let output = run("int i = 0\ndo\n    i = i + 1\nwhile i < 3\nprint i\n");
        assert_eq!(output, "3\n");
    }

    #[test]
    fn break_leaves_a_do_while() {
        let output = run(
            "int i = 0\ndo\n    i = i + 1\n    if i == 2\n        break\nwhile i < 100\nprint i\n",
        );
        assert_eq!(output, "2\n");
    }
}

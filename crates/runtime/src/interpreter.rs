mod expr;
mod interp_errors;
mod stmt;

use std::io::{BufRead, Write};

use frontend::reader::Reader;
use frontend::scanner::{Scanner, Token};
use tools::errors::{CodeErr, ReportCodeErr};

pub use interp_errors::RuntimeError;

use crate::heap::Heap;
use crate::scope::ScopeStack;
use crate::values::{Value, ValueRef};

/// Outcome of one statement. Loops consume `Break` and `Continue`, a
/// function call consumes `Return`, everything else passes it along.
pub enum Flow {
    Normal,
    Break,
    Continue,
    Return(ValueRef),
}

/// The fused parser and evaluator. Statements are executed straight off the
/// token stream; loops, calls and imports revisit source text through saved
/// positions.
pub struct Interpreter<'a> {
    pub(crate) scanner: Scanner,
    pub scope: ScopeStack,
    pub(crate) heap: Heap,
    pub(crate) out: &'a mut dyn Write,
    pub(crate) input: &'a mut dyn BufRead,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        reader: Reader,
        out: &'a mut dyn Write,
        input: &'a mut dyn BufRead,
        debug: bool,
    ) -> Self {
        Interpreter {
            scanner: Scanner::new(reader),
            scope: ScopeStack::new(),
            heap: Heap::new(debug),
            out,
            input,
        }
    }

    pub fn run(&mut self) -> Result<(), CodeErr> {
        self.run_module()
            .map_err(|e| e.to_glob_err(self.scanner.file_name(), self.scanner.line()))
    }

    // Interpret the file on top of the reader stack: register its functions,
    // then execute statements until its end marker.
    fn run_module(&mut self) -> Result<(), RuntimeError> {
        self.prescan()?;

        self.scanner.rewind();
        self.advance()?;

        loop {
            if let Flow::Return(_) = self.statement()? {
                break;
            }
            if self.accept(Token::Endmarker)? {
                break;
            }
        }
        Ok(())
    }

    // First pass: bind every function name in the module frame to the
    // position of its parameter list, skipping the bodies.
    fn prescan(&mut self) -> Result<(), RuntimeError> {
        self.scanner.rewind();
        self.advance()?;

        while self.scanner.token != Token::Endmarker {
            if self.accept(Token::Def)? {
                if self.scanner.token != Token::Identifier {
                    return Err(RuntimeError::MissingFunctionName);
                }
                let name = self.scanner.lexeme.clone();
                self.scope.add_global(&name)?;
                let address = self.scanner.save();
                self.scope
                    .bind_global(&name, self.heap.alloc(Value::Pos(address)))?;
                self.skip_function()?;
            } else {
                self.advance()?;
            }
        }
        Ok(())
    }

    // Run another source file to completion, then resume where we were.
    // Functions it defines land in the module frame, its statements execute
    // in the current scope.
    pub(crate) fn run_import(&mut self, path: &str) -> Result<(), RuntimeError> {
        let here = self.scanner.save();
        self.scanner.reader_mut().import(path)?;
        self.run_module()?;
        self.scanner.reader_mut().pop();
        self.scanner.jump(&here);
        Ok(())
    }

    // Skip a function definition, from its name to past the DEDENT that
    // closes its body.
    pub(crate) fn skip_function(&mut self) -> Result<(), RuntimeError> {
        self.expect(Token::Identifier)?;
        self.expect(Token::Lpar)?;

        while self.scanner.token != Token::Newline && self.scanner.token != Token::Endmarker {
            self.advance()?;
        }
        self.skip_block()
    }

    // Discard a whole block without executing it, ending one token past its
    // closing DEDENT.
    pub(crate) fn skip_block(&mut self) -> Result<(), RuntimeError> {
        self.expect(Token::Newline)?;
        self.expect(Token::Indent)?;

        let mut level = 1;
        while level > 0 && self.scanner.token != Token::Endmarker {
            self.advance()?;
            match self.scanner.token {
                Token::Indent => level += 1,
                Token::Dedent => level -= 1,
                _ => {}
            }
        }
        self.advance()
    }

    // Fast forward to the DEDENT that closes the current block, leaving the
    // token on it. Used when break or continue abandons the remainder.
    pub(crate) fn skip_to_block_end(&mut self) -> Result<(), RuntimeError> {
        let mut level = 1;
        while level > 0 && self.scanner.token != Token::Endmarker {
            self.advance()?;
            match self.scanner.token {
                Token::Indent => level += 1,
                Token::Dedent => level -= 1,
                _ => {}
            }
        }
        Ok(())
    }

    pub(crate) fn advance(&mut self) -> Result<(), RuntimeError> {
        self.scanner.next().map_err(RuntimeError::from)
    }

    pub(crate) fn accept(&mut self, token: Token) -> Result<bool, RuntimeError> {
        if self.scanner.token == token {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub(crate) fn expect(&mut self, token: Token) -> Result<(), RuntimeError> {
        if self.accept(token)? {
            Ok(())
        } else {
            Err(RuntimeError::Expected(token, self.scanner.token))
        }
    }

    // Release every binding so the heap can be checked for leaks
    pub fn shutdown(&mut self) {
        self.scope.clear();
    }

    pub fn live_objects(&self) -> usize {
        self.heap.live_count()
    }

    pub fn dump_objects<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        self.heap.dump(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn run_program(src: &str) -> String {
        let mut out = Vec::new();
        let mut input = io::empty();
        {
            let reader = Reader::from_source("<test>", src);
            let mut interp = Interpreter::new(reader, &mut out, &mut input, false);
            interp.run().expect("program should run");
        }
        String::from_utf8(out).expect("output should be utf-8")
    }

    fn run_program_with_input(src: &str, stdin: &str) -> String {
        let mut out = Vec::new();
        let mut input: &[u8] = stdin.as_bytes();
        {
            let reader = Reader::from_source("<test>", src);
            let mut interp = Interpreter::new(reader, &mut out, &mut input, false);
            interp.run().expect("program should run");
        }
        String::from_utf8(out).expect("output should be utf-8")
    }

    fn run_program_err(src: &str) -> String {
        let mut out = Vec::new();
        let mut input = io::empty();
        let reader = Reader::from_source("<test>", src);
        let mut interp = Interpreter::new(reader, &mut out, &mut input, false);
        interp.run().expect_err("program should fail").to_string()
    }

    #[test]
    fn arithmetic_with_promotion() {
        let output = run_program("int a = 3\nfloat b = 2.0\nprint a + b\n");
        assert_eq!(output, "5\n");
    }

    #[test]
    fn list_iteration_and_slicing() {
        let output = run_program(
            "list xs = [1,2,3,4,5]\n\
             for x in xs\n\
             \x20   print x\n\
             print xs[1:4]\n",
        );
        assert_eq!(output, "1\n2\n3\n4\n5\n[2, 3, 4]\n");
    }

    #[test]
    fn function_with_forward_reference() {
        let output = run_program(
            "print f(10)\n\
             def f(n)\n\
             \x20   if n <= 1\n\
             \x20       return 1\n\
             \x20   return n * f(n-1)\n",
        );
        assert_eq!(output, "3628800\n");
    }

    #[test]
    fn break_and_continue() {
        let output = run_program(
            "int i = 0\n\
             while i < 10\n\
             \x20   i = i + 1\n\
             \x20   if i == 3\n\
             \x20       continue\n\
             \x20   if i == 6\n\
             \x20       break\n\
             \x20   print i\n",
        );
        assert_eq!(output, "1\n2\n4\n5\n");
    }

    #[test]
    fn string_concatenation_and_membership() {
        let output = run_program(
            "str s = \"abc\"\n\
             print s + \"de\"\n\
             print \"b\" in s\n",
        );
        assert_eq!(output, "abcde\n1\n");
    }

    #[test]
    fn return_from_deep_nesting() {
        let output = run_program(
            "def g()\n\
             \x20   int i = 0\n\
             \x20   while i < 100\n\
             \x20       if i == 5\n\
             \x20           return i\n\
             \x20       i = i + 1\n\
             \x20   return -1\n\
             print g()\n",
        );
        assert_eq!(output, "5\n");
    }

    #[test]
    fn do_while_runs_the_body_first() {
        let output = run_program(
            "int i = 10\n\
             do\n\
             \x20   print i\n\
             \x20   i = i + 1\n\
             while i < 3\n\
             print i\n",
        );
        assert_eq!(output, "10\n11\n");
    }

    #[test]
    fn else_branch_is_taken_and_skipped() {
        let output = run_program(
            "if 0\n\
             \x20   print 1\n\
             else\n\
             \x20   print 2\n\
             if 1\n\
             \x20   print 3\n\
             else\n\
             \x20   print 4\n",
        );
        assert_eq!(output, "2\n3\n");
    }

    #[test]
    fn for_loop_over_a_string() {
        let output = run_program("for c in \"ab\"\n\x20   print c\n");
        assert_eq!(output, "a\nb\n");
    }

    #[test]
    fn comma_declarations_and_multi_print() {
        let output = run_program("int a = 1, b = 2\nprint a, b, a + b\n");
        assert_eq!(output, "1 2 3\n");
    }

    #[test]
    fn assignment_chains_yield_the_stored_value() {
        let output = run_program("int a, b\na = b = 4\nprint a, b\n");
        assert_eq!(output, "4 4\n");
    }

    #[test]
    fn declared_type_sticks_across_assignments() {
        let output = run_program("int a = 1\na = 2.9\nprint a\n");
        assert_eq!(output, "2\n");
    }

    #[test]
    fn indexed_assignment_mutates_only_the_copy() {
        let output = run_program(
            "list a = [1,2,3]\n\
             list b\n\
             b = a\n\
             b[0] = 9\n\
             print a\n\
             print b\n",
        );
        assert_eq!(output, "[1, 2, 3]\n[9, 2, 3]\n");
    }

    #[test]
    fn call_arguments_are_deep_copies() {
        let output = run_program(
            "def f(xs)\n\
             \x20   xs[0] = 99\n\
             \x20   return xs[0]\n\
             list a = [1,2]\n\
             print f(a)\n\
             print a\n",
        );
        assert_eq!(output, "99\n[1, 2]\n");
    }

    #[test]
    fn functions_reach_module_variables() {
        let output = run_program(
            "int total = 0\n\
             def bump(n)\n\
             \x20   total = total + n\n\
             \x20   return 0\n\
             bump(5)\n\
             bump(7)\n\
             print total\n",
        );
        assert_eq!(output, "12\n");
    }

    #[test]
    fn extra_call_arguments_are_discarded() {
        let output = run_program(
            "def first(a)\n\
             \x20   return a\n\
             print first(1, 2, 3)\n",
        );
        assert_eq!(output, "1\n");
    }

    #[test]
    fn call_without_return_yields_zero() {
        let output = run_program(
            "def noop()\n\
             \x20   pass\n\
             print noop()\n",
        );
        assert_eq!(output, "0\n");
    }

    #[test]
    fn logic_operators_do_not_short_circuit() {
        let output = run_program(
            "def side()\n\
             \x20   print 99\n\
             \x20   return 1\n\
             print 0 and side()\n",
        );
        assert_eq!(output, "99\n0\n");
    }

    #[test]
    fn nested_loops_break_only_the_inner_one() {
        let output = run_program(
            "for i in [1,2]\n\
             \x20   for j in [1,2,3]\n\
             \x20       if j == 2\n\
             \x20           break\n\
             \x20       print i * 10 + j\n",
        );
        assert_eq!(output, "11\n21\n");
    }

    #[test]
    fn loop_variable_shares_the_list_cell() {
        let output = run_program(
            "list xs = [1,2,3]\n\
             for x in xs\n\
             \x20   x = x * 10\n\
             print xs\n",
        );
        assert_eq!(output, "[10, 20, 30]\n");
    }

    #[test]
    fn input_parses_by_declared_type() {
        let output = run_program_with_input(
            "int n\nfloat x\ninput \"n? \" n, x\nprint n + 1\nprint x * 2\n",
            "41\n1.5\n",
        );
        assert_eq!(output, "n? 42\n3\n");
    }

    #[test]
    fn input_of_a_string_keeps_the_line() {
        let output = run_program_with_input("str s\ninput s\nprint s + \"!\"\n", "hello\n");
        assert_eq!(output, "hello!\n");
    }

    #[test]
    fn pass_and_comments_do_nothing() {
        let output = run_program("# leading note\npass\nprint 1  # trailing\n");
        assert_eq!(output, "1\n");
    }

    #[test]
    fn char_literals_and_escapes() {
        let output = run_program("char c = 'A'\nprint c\nprint c + 1\nchar n = '\\n'\nprint n + 0\n");
        assert_eq!(output, "A\n66\n10\n");
    }

    #[test]
    fn top_level_return_stops_the_program() {
        let output = run_program("print 1\nreturn\nprint 2\n");
        assert_eq!(output, "1\n");
    }

    #[test]
    fn duplicate_declaration_is_a_name_error() {
        let message = run_program_err("int a\nint a\n");
        assert!(message.contains("already declared"), "got: {message}");
    }

    #[test]
    fn undeclared_identifier_is_a_name_error() {
        let message = run_program_err("print missing\n");
        assert!(message.contains("undeclared"), "got: {message}");
    }

    #[test]
    fn duplicate_function_name_is_a_name_error() {
        let message = run_program_err(
            "def f()\n\x20   pass\ndef f()\n\x20   pass\nprint 1\n",
        );
        assert!(message.contains("already declared"), "got: {message}");
    }

    #[test]
    fn calling_a_plain_variable_fails() {
        let message = run_program_err("int a\na(1)\n");
        assert!(message.contains("not callable"), "got: {message}");
    }

    #[test]
    fn missing_call_argument_is_a_syntax_error() {
        let message = run_program_err(
            "def f(a, b)\n\x20   return a\nprint f(1)\n",
        );
        assert!(message.contains("no argument left"), "got: {message}");
    }

    #[test]
    fn bad_operand_types_fail() {
        let message = run_program_err("list l\nprint 1 - l\n");
        assert!(message.contains("unsupported operand"), "got: {message}");
    }

    #[test]
    fn division_by_zero_fails() {
        let message = run_program_err("print 1 / 0\n");
        assert!(message.contains("division by zero"), "got: {message}");
    }

    #[test]
    fn subscript_out_of_range_fails() {
        let message = run_program_err("list l = [1]\nprint l[3]\n");
        assert!(message.contains("out of range"), "got: {message}");
    }

    #[test]
    fn error_messages_carry_the_location() {
        let message = run_program_err("print 1\nprint missing\n");
        assert!(message.starts_with("<test>, line 2"), "got: {message}");
    }

    // After a full run and shutdown no value cell may survive
    #[test]
    fn no_objects_leak_after_shutdown() {
        let src = "list xs = [1,[2,3],\"s\"]\n\
                   def f(n)\n\
                   \x20   return n + 1\n\
                   int i = 0\n\
                   while i < 3\n\
                   \x20   i = f(i)\n\
                   for x in xs\n\
                   \x20   pass\n\
                   print xs, i\n";
        let mut out = Vec::new();
        let mut input = io::empty();
        let reader = Reader::from_source("<test>", src);
        let mut interp = Interpreter::new(reader, &mut out, &mut input, true);
        interp.run().expect("program should run");
        interp.shutdown();
        assert_eq!(interp.live_objects(), 0);
    }

    #[test]
    fn scope_depth_is_restored_after_calls() {
        let src = "def f(n)\n\x20   return n\nprint f(1)\nprint f(2)\n";
        let mut out = Vec::new();
        let mut input = io::empty();
        let reader = Reader::from_source("<test>", src);
        let mut interp = Interpreter::new(reader, &mut out, &mut input, false);
        interp.run().expect("program should run");
        assert_eq!(interp.scope.depth(), 1);
    }

    #[test]
    fn import_defines_functions_and_runs_statements() {
        let dir = std::env::temp_dir();
        let path = dir.join("sprig_import_test_module.sp");
        std::fs::write(
            &path,
            "int imported = 7\ndef twice(n)\n    return n * 2\n",
        )
        .expect("write temp module");

        let src = format!(
            "import \"{}\"\nprint imported\nprint twice(21)\n",
            path.display()
        );
        let output = run_program(&src);
        assert_eq!(output, "7\n42\n");

        let _ = std::fs::remove_file(&path);
    }
}

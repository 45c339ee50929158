use colored::*;
use std::fs;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ReadError {
    #[error("{}: cannot open {0}: {1}", "SystemError".red().bold())]
    Open(String, String),
}

// One loaded source file. Files stay loaded for the whole run so that
// positions saved inside them remain jumpable after the file is popped.
struct SourceFile {
    name: String,
    text: Vec<char>,
}

// A read head into one of the loaded files
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    pub file: usize,
    pub offset: usize,
    pub line: u32,
    pub col: u32,
}

impl Cursor {
    fn start_of(file: usize) -> Self {
        Self {
            file,
            offset: 0,
            line: 1,
            col: 0,
        }
    }
}

/// Character source for the scanner. Keeps a stack of cursors so `import`
/// can push a file and return to the importing one afterwards.
pub struct Reader {
    files: Vec<SourceFile>,
    stack: Vec<Cursor>,
}

impl Reader {
    pub fn from_file(path: &str) -> Result<Self, ReadError> {
        let mut reader = Reader {
            files: Vec::new(),
            stack: Vec::new(),
        };
        reader.import(path)?;
        Ok(reader)
    }

    pub fn from_source(name: &str, text: &str) -> Self {
        let mut reader = Reader {
            files: Vec::new(),
            stack: Vec::new(),
        };
        reader.push_source(name, text);
        reader
    }

    // Load a file and start reading it. The previous file resumes once the
    // caller pops this one.
    pub fn import(&mut self, path: &str) -> Result<(), ReadError> {
        let text = fs::read_to_string(path)
            .map_err(|e| ReadError::Open(path.to_string(), e.to_string()))?;
        self.push_source(path, &text);
        Ok(())
    }

    pub fn push_source(&mut self, name: &str, text: &str) {
        // Windows line endings are normalized on load
        let text = text.replace("\r\n", "\n");
        self.files.push(SourceFile {
            name: name.to_string(),
            text: text.chars().collect(),
        });
        self.stack.push(Cursor::start_of(self.files.len() - 1));
    }

    pub fn pop(&mut self) {
        self.stack.pop();
    }

    // Rewind to the start of the current file
    pub fn reset(&mut self) {
        if let Some(top) = self.stack.last_mut() {
            *top = Cursor::start_of(top.file);
        }
    }

    pub fn peek_char(&self) -> Option<char> {
        let cursor = self.stack.last()?;
        self.files[cursor.file].text.get(cursor.offset).copied()
    }

    pub fn next_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        let cursor = self.stack.last_mut()?;
        cursor.offset += 1;
        if ch == '\n' {
            cursor.line += 1;
            cursor.col = 0;
        } else {
            cursor.col += 1;
        }
        Some(ch)
    }

    pub fn cursor(&self) -> Cursor {
        self.stack.last().cloned().unwrap_or(Cursor::start_of(0))
    }

    // Move the read head to a previously saved cursor. The target may be in
    // another file, which is how calls into imported modules resume.
    pub fn jump(&mut self, cursor: &Cursor) {
        if let Some(top) = self.stack.last_mut() {
            *top = cursor.clone();
        }
    }

    pub fn file_name(&self) -> &str {
        self.stack
            .last()
            .map(|c| self.files[c.file].name.as_str())
            .unwrap_or("<none>")
    }

    pub fn line(&self) -> u32 {
        self.stack.last().map(|c| c.line).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_chars_and_track_lines() {
        let mut reader = Reader::from_source("<test>", "ab\nc");

        assert_eq!(reader.peek_char(), Some('a'));
        assert_eq!(reader.next_char(), Some('a'));
        assert_eq!(reader.next_char(), Some('b'));
        assert_eq!(reader.line(), 1);
        assert_eq!(reader.next_char(), Some('\n'));
        assert_eq!(reader.line(), 2);
        assert_eq!(reader.next_char(), Some('c'));
        assert_eq!(reader.next_char(), None);
        assert_eq!(reader.peek_char(), None);
    }

    #[test]
    fn crlf_is_normalized() {
        let mut reader = Reader::from_source("<test>", "a\r\nb");

        assert_eq!(reader.next_char(), Some('a'));
        assert_eq!(reader.next_char(), Some('\n'));
        assert_eq!(reader.next_char(), Some('b'));
    }

    #[test]
    fn jump_restores_cursor() {
        let mut reader = Reader::from_source("<test>", "abcdef");
        reader.next_char();
        reader.next_char();

        let mark = reader.cursor();
        reader.next_char();
        reader.next_char();
        assert_eq!(reader.peek_char(), Some('e'));

        reader.jump(&mark);
        assert_eq!(reader.peek_char(), Some('c'));
    }

    #[test]
    fn reset_rewinds_current_file() {
        let mut reader = Reader::from_source("<test>", "xy");
        reader.next_char();
        reader.reset();

        assert_eq!(reader.next_char(), Some('x'));
        assert_eq!(reader.line(), 1);
    }

    #[test]
    fn pushed_source_masks_and_pop_returns() {
        let mut reader = Reader::from_source("outer", "ab");
        reader.next_char();

        reader.push_source("inner", "z");
        assert_eq!(reader.file_name(), "inner");
        assert_eq!(reader.next_char(), Some('z'));
        assert_eq!(reader.next_char(), None);

        reader.pop();
        assert_eq!(reader.file_name(), "outer");
        assert_eq!(reader.next_char(), Some('b'));
    }

    #[test]
    fn missing_file_reports_open_error() {
        assert!(matches!(
            Reader::from_file("no/such/file.sp"),
            Err(ReadError::Open(..))
        ));
    }
}

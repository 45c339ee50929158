use colored::*;
use std::collections::HashMap;
use thiserror::Error;

use crate::values::ValueRef;

#[derive(Debug, Error, PartialEq)]
pub enum ScopeError {
    #[error("{}: identifier {0} already declared", "NameError".red().bold())]
    AlreadyDeclared(String),

    #[error("{}: identifier {0} undeclared", "NameError".red().bold())]
    Undeclared(String),

    #[error("{}: identifier {0} is not bound to a value", "NameError".red().bold())]
    Unbound(String),
}

// An unbound slot keeps the name declared, which is how a for loop variable
// survives between iterations.
#[derive(Default)]
struct Frame {
    bindings: HashMap<String, Option<ValueRef>>,
}

/// Activation frames, innermost last. The bottom frame is the module frame
/// where the pre-scan pins function names.
pub struct ScopeStack {
    frames: Vec<Frame>,
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack {
            frames: vec![Frame::default()],
        }
    }

    // Declare a name in the innermost frame
    pub fn add(&mut self, name: &str) -> Result<(), ScopeError> {
        let frame = match self.frames.last_mut() {
            Some(f) => f,
            None => return Err(ScopeError::Undeclared(name.to_string())),
        };
        if frame.bindings.contains_key(name) {
            return Err(ScopeError::AlreadyDeclared(name.to_string()));
        }
        frame.bindings.insert(name.to_string(), None);
        Ok(())
    }

    // Declare a name in the module frame, used by the function pre-scan
    pub fn add_global(&mut self, name: &str) -> Result<(), ScopeError> {
        let frame = match self.frames.first_mut() {
            Some(f) => f,
            None => return Err(ScopeError::Undeclared(name.to_string())),
        };
        if frame.bindings.contains_key(name) {
            return Err(ScopeError::AlreadyDeclared(name.to_string()));
        }
        frame.bindings.insert(name.to_string(), None);
        Ok(())
    }

    pub fn has(&self, name: &str) -> bool {
        self.frames
            .iter()
            .rev()
            .any(|frame| frame.bindings.contains_key(name))
    }

    // Attach a value to the innermost declaration of the name
    pub fn bind(&mut self, name: &str, value: ValueRef) -> Result<(), ScopeError> {
        let frame = self
            .frames
            .iter_mut()
            .rev()
            .find(|frame| frame.bindings.contains_key(name));
        match frame {
            Some(frame) => {
                frame.bindings.insert(name.to_string(), Some(value));
                Ok(())
            }
            None => Err(ScopeError::Undeclared(name.to_string())),
        }
    }

    pub fn bind_global(&mut self, name: &str, value: ValueRef) -> Result<(), ScopeError> {
        match self.frames.first_mut() {
            Some(frame) if frame.bindings.contains_key(name) => {
                frame.bindings.insert(name.to_string(), Some(value));
                Ok(())
            }
            _ => Err(ScopeError::Undeclared(name.to_string())),
        }
    }

    pub fn unbind(&mut self, name: &str) -> Result<(), ScopeError> {
        for frame in self.frames.iter_mut().rev() {
            if let Some(slot) = frame.bindings.get_mut(name) {
                *slot = None;
                return Ok(());
            }
        }
        Err(ScopeError::Undeclared(name.to_string()))
    }

    // Innermost first lookup across every frame
    pub fn lookup(&self, name: &str) -> Result<ValueRef, ScopeError> {
        for frame in self.frames.iter().rev() {
            if let Some(slot) = frame.bindings.get(name) {
                return slot
                    .clone()
                    .ok_or_else(|| ScopeError::Unbound(name.to_string()));
            }
        }
        Err(ScopeError::Undeclared(name.to_string()))
    }

    pub fn append_level(&mut self) {
        self.frames.push(Frame::default());
    }

    // Dropping the frame releases every binding in it
    pub fn remove_level(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.frames.push(Frame::default());
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

use std::cell::RefCell;
use std::io::Write;
use std::rc::{Rc, Weak};

use crate::values::{Value, ValueRef};

/// Allocator for value cells. In debug mode every allocation is remembered
/// through a weak reference so leaks can be listed after a run.
pub struct Heap {
    debug: bool,
    live: RefCell<Vec<Weak<RefCell<Value>>>>,
}

impl Heap {
    pub fn new(debug: bool) -> Self {
        Heap {
            debug,
            live: RefCell::new(Vec::new()),
        }
    }

    pub fn alloc(&self, value: Value) -> ValueRef {
        let cell = Rc::new(RefCell::new(value));
        if self.debug {
            self.live.borrow_mut().push(Rc::downgrade(&cell));
        }
        cell
    }

    // Number of cells still reachable. Dead entries are pruned on the way.
    pub fn live_count(&self) -> usize {
        let mut live = self.live.borrow_mut();
        live.retain(|weak| weak.strong_count() > 0);
        live.len()
    }

    // Semicolon separated listing of every live cell
    pub fn dump<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "object;refcount;type;value")?;
        for weak in self.live.borrow().iter() {
            if let Some(cell) = weak.upgrade() {
                // the upgrade itself holds one reference
                let refcount = Rc::strong_count(&cell) - 1;
                let value = cell.borrow();
                writeln!(
                    out,
                    "{:p};{};{};{}",
                    Rc::as_ptr(&cell),
                    refcount,
                    value.type_name(),
                    value
                )?;
            }
        }
        Ok(())
    }
}

//! Scoped re-entrancy guard for repositioning passes
//!
//! Repositioning elements can make collaborators re-derive joint settings and
//! write them back. While a [`RepositionToken`] is alive every joint-height
//! write is refused. The flag is released when the token drops, on every exit
//! path.

use std::cell::Cell;
use std::rc::Rc;

/// Shared "repositioning in progress" flag
#[derive(Debug, Clone, Default)]
pub struct RepositionGuard {
    active: Rc<Cell<bool>>,
}

impl RepositionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a repositioning pass is in flight
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Enter a repositioning pass, or `None` if one is already running
    pub fn try_acquire(&self) -> Option<RepositionToken> {
        if self.active.replace(true) {
            return None;
        }
        Some(RepositionToken {
            active: Rc::clone(&self.active),
        })
    }
}

/// Proof that the current call owns the repositioning pass
#[derive(Debug)]
#[must_use = "the pass ends as soon as the token is dropped"]
pub struct RepositionToken {
    active: Rc<Cell<bool>>,
}

impl Drop for RepositionToken {
    fn drop(&mut self) {
        self.active.set(false);
    }
}

//! Cursor: a stateful traversal handle bound to one `Hash`.
//!
//! The cursor borrows its hash immutably for its whole life, so the hash can
//! neither be mutated nor dropped while a cursor is live.

use crate::datum::Datum;
use crate::error::Result;
use crate::factory::{BackendCursor, CursorMode, Entry};

pub struct Cursor<'h> {
    inner: Box<dyn BackendCursor + 'h>,
    finished: bool,
}

impl<'h> Cursor<'h> {
    pub(crate) fn new(inner: Box<dyn BackendCursor + 'h>) -> Self {
        Self {
            inner,
            finished: false,
        }
    }

    /// Run one traversal step. `Ok(None)` is end of data.
    pub fn get(&mut self, mode: CursorMode<'_>, want_value: bool) -> Result<Option<Entry>> {
        self.inner.get(mode, want_value)
    }

    /// Position on `key`, returning its first value.
    pub fn set(&mut self, key: &[u8]) -> Result<Option<Datum>> {
        Ok(self.get(CursorMode::Set(key), true)?.and_then(|e| e.value))
    }

    pub fn first(&mut self, want_value: bool) -> Result<Option<Entry>> {
        self.get(CursorMode::First, want_value)
    }

    pub fn next_key(&mut self, want_value: bool) -> Result<Option<Entry>> {
        self.get(CursorMode::Next, want_value)
    }

    pub fn next_value(&mut self) -> Result<Option<Datum>> {
        Ok(self.get(CursorMode::NextValue, true)?.and_then(|e| e.value))
    }

    /// Release the backend state. Safe to call more than once.
    pub fn finish(&mut self) {
        if !self.finished {
            self.inner.finish();
            self.finished = true;
        }
    }
}

impl Drop for Cursor<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}

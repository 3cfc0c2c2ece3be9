//! Backend-agnostic iterators built only on the cursor contract.
//!
//! Both iterators keep one item of lookahead: `is_end` may have to advance
//! the cursor to learn whether anything remains, and the item it finds is
//! buffered for the next call to `next`.

use crate::cursor::Cursor;
use crate::datum::Datum;
use crate::error::{HashError, Result};
use crate::factory::{CursorMode, Entry, HashBackend};

enum Lookahead<T> {
    /// Nothing fetched since the last item was handed out.
    Empty,
    Ready(T),
    Failed(HashError),
    Done,
}

/// Pulls every `(key, value)` pair of a hash, or all values of one key.
pub struct GetAll<'h> {
    cursor: Cursor<'h>,
    key: Option<Vec<u8>>,
    want_values: bool,
    started: bool,
    ahead: Lookahead<Entry>,
}

impl<'h> GetAll<'h> {
    /// Iterate over `backend` directly; `Hash::get_all` is the usual entry.
    pub fn over(
        backend: &'h dyn HashBackend,
        key: Option<&[u8]>,
        want_values: bool,
    ) -> Result<Self> {
        Ok(Self {
            cursor: Cursor::new(backend.cursor()?),
            key: key.map(<[u8]>::to_vec),
            want_values,
            started: false,
            ahead: Lookahead::Empty,
        })
    }

    fn advance(&mut self) -> Result<Option<Entry>> {
        if !self.started {
            self.started = true;
            return match &self.key {
                Some(key) => self.cursor.get(CursorMode::Set(key), self.want_values),
                None => self.cursor.get(CursorMode::First, self.want_values),
            };
        }
        if let Some(entry) = self.cursor.get(CursorMode::NextValue, self.want_values)? {
            return Ok(Some(entry));
        }
        if self.key.is_some() {
            return Ok(None);
        }
        self.cursor.get(CursorMode::Next, self.want_values)
    }

    fn fill(&mut self) {
        if !matches!(self.ahead, Lookahead::Empty) {
            return;
        }
        self.ahead = match self.advance() {
            Ok(Some(mut entry)) => {
                // Backends may hand values back regardless.
                if !self.want_values {
                    entry.value = None;
                }
                Lookahead::Ready(entry)
            }
            Ok(None) => Lookahead::Done,
            Err(e) => Lookahead::Failed(e),
        };
        if !matches!(self.ahead, Lookahead::Ready(_)) {
            self.cursor.finish();
        }
    }

    /// True once no pairs remain. May advance the underlying cursor.
    pub fn is_end(&mut self) -> bool {
        self.fill();
        matches!(self.ahead, Lookahead::Done)
    }
}

impl Iterator for GetAll<'_> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.fill();
        match core::mem::replace(&mut self.ahead, Lookahead::Empty) {
            Lookahead::Ready(entry) => Some(Ok(entry)),
            Lookahead::Failed(e) => {
                self.ahead = Lookahead::Done;
                Some(Err(e))
            }
            Lookahead::Done | Lookahead::Empty => {
                self.ahead = Lookahead::Done;
                None
            }
        }
    }
}

/// Pulls every distinct key of a hash once; values are never read.
pub struct Keys<'h> {
    cursor: Cursor<'h>,
    started: bool,
    ahead: Lookahead<Datum>,
}

impl<'h> Keys<'h> {
    pub fn over(backend: &'h dyn HashBackend) -> Result<Self> {
        Ok(Self {
            cursor: Cursor::new(backend.cursor()?),
            started: false,
            ahead: Lookahead::Empty,
        })
    }

    fn fill(&mut self) {
        if !matches!(self.ahead, Lookahead::Empty) {
            return;
        }
        let mode = if self.started {
            CursorMode::Next
        } else {
            CursorMode::First
        };
        self.started = true;
        self.ahead = match self.cursor.get(mode, false) {
            Ok(Some(entry)) => Lookahead::Ready(entry.key),
            Ok(None) => Lookahead::Done,
            Err(e) => Lookahead::Failed(e),
        };
        if !matches!(self.ahead, Lookahead::Ready(_)) {
            self.cursor.finish();
        }
    }

    pub fn is_end(&mut self) -> bool {
        self.fill();
        matches!(self.ahead, Lookahead::Done)
    }
}

impl Iterator for Keys<'_> {
    type Item = Result<Datum>;

    fn next(&mut self) -> Option<Self::Item> {
        self.fill();
        match core::mem::replace(&mut self.ahead, Lookahead::Empty) {
            Lookahead::Ready(key) => Some(Ok(key)),
            Lookahead::Failed(e) => {
                self.ahead = Lookahead::Done;
                Some(Err(e))
            }
            Lookahead::Done | Lookahead::Empty => {
                self.ahead = Lookahead::Done;
                None
            }
        }
    }
}

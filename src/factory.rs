//! Backend contract: the traits every pluggable hash backend implements.
//!
//! A backend kind is a `HashFactory`; each hash instance it creates is a
//! `HashBackend`; traversal goes through a `BackendCursor`. The generic
//! layers (`Hash`, `Cursor`, `GetAll`, `Keys`) only ever talk to these traits.

use crate::datum::Datum;
use crate::error::Result;
use crate::hash::Hash;
use crate::iter::GetAll;
use tracing::debug;

/// Traversal request understood by every backend cursor.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CursorMode<'k> {
    /// Position on the key with exactly these bytes.
    Set(&'k [u8]),
    /// Position on the first key in canonical order.
    First,
    /// Skip the remaining values of the current key and move to the next key.
    Next,
    /// Stay on the current key and move to its next value.
    NextValue,
}

/// One cursor position copied out to the caller.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Entry {
    pub key: Datum,
    pub value: Option<Datum>,
}

/// Stateful traversal over one backend instance.
///
/// `get` has three distinct outcomes: `Ok(Some(_))` with data, `Ok(None)` at
/// the end of data (or when a `Set` key is absent), and `Err(_)`.
pub trait BackendCursor {
    fn get(&mut self, mode: CursorMode<'_>, want_value: bool) -> Result<Option<Entry>>;

    /// Release any state held by the cursor. Must be idempotent.
    fn finish(&mut self);
}

/// One hash instance of a backend.
pub trait HashBackend {
    fn open(
        &mut self,
        identifier: &str,
        mode: u32,
        is_writable: bool,
        is_new: bool,
        options: Option<&Hash>,
    ) -> Result<()>;

    fn close(&mut self) -> Result<()>;

    /// Turn this freshly created backend into an independent copy of `source`.
    ///
    /// The default opens `self` under `identifier` and replays every pair seen
    /// through a `GetAll` over `source`. Pairs are replayed oldest first so a
    /// backend that prepends values ends up with the same per-key order.
    fn clone_from_backend(&mut self, identifier: &str, source: &dyn HashBackend) -> Result<()> {
        self.open(identifier, 0o644, true, true, None)?;
        let pairs = GetAll::over(source, None, true)?.collect::<Result<Vec<_>>>()?;
        debug!(identifier, pairs = pairs.len(), "replaying pairs into clone");
        for entry in pairs.iter().rev() {
            if let Some(value) = &entry.value {
                self.put(&entry.key, value)?;
            }
        }
        Ok(())
    }

    /// Add `value` under `key`. Never fails because the key already exists.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Key presence, or exact pair presence when `value` is given.
    fn exists(&self, key: &[u8], value: Option<&[u8]>) -> Result<bool>;

    /// Remove a key and all of its values. `Ok(false)` if the key is absent.
    fn delete_key(&mut self, key: &[u8]) -> Result<bool>;

    /// Remove one `(key, value)` pair. `Ok(false)` if the pair is absent.
    fn delete_key_value(&mut self, key: &[u8], value: &[u8]) -> Result<bool>;

    fn sync(&mut self) -> Result<()>;

    /// File descriptor usable for external locking, if the backend has one.
    fn get_fd(&self) -> Option<i32>;

    /// Total number of stored values, when the backend tracks it.
    fn values_count(&self) -> Option<usize> {
        None
    }

    fn cursor(&self) -> Result<Box<dyn BackendCursor + '_>>;
}

/// A backend kind. Registered under a name in a `HashRegistry`.
pub trait HashFactory {
    /// Size of the per-hash backend state.
    fn context_length(&self) -> usize;

    /// Size of the per-cursor backend state.
    fn cursor_context_length(&self) -> usize;

    fn create(&self) -> Result<Box<dyn HashBackend>>;
}

/// A backend factory together with the name it is known by.
pub struct Factory {
    name: String,
    imp: Box<dyn HashFactory>,
}

impl Factory {
    pub fn new(name: impl Into<String>, imp: impl HashFactory + 'static) -> Self {
        Self {
            name: name.into(),
            imp: Box::new(imp),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context_length(&self) -> usize {
        self.imp.context_length()
    }

    pub fn cursor_context_length(&self) -> usize {
        self.imp.cursor_context_length()
    }

    pub(crate) fn create(&self) -> Result<Box<dyn HashBackend>> {
        self.imp.create()
    }
}

impl core::fmt::Debug for Factory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Factory")
            .field("name", &self.name)
            .field("context_length", &self.context_length())
            .field("cursor_context_length", &self.cursor_context_length())
            .finish()
    }
}

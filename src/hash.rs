//! Hash: the handle callers hold. Owns one backend instance and dispatches
//! every operation through the backend contract.

use crate::cursor::Cursor;
use crate::datum::Datum;
use crate::error::{HashError, Result};
use crate::factory::{CursorMode, Factory, HashBackend};
use crate::iter::{GetAll, Keys};
use core::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

pub struct Hash {
    factory: Rc<Factory>,
    backend: Box<dyn HashBackend>,
    identifier: Option<String>,
    is_open: bool,
}

impl Hash {
    pub fn new(factory: Rc<Factory>) -> Result<Self> {
        let backend = factory.create()?;
        Ok(Self {
            factory,
            backend,
            identifier: None,
            is_open: false,
        })
    }

    pub fn factory(&self) -> &Rc<Factory> {
        &self.factory
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Open (or create) the storage behind this hash.
    ///
    /// `options` is another hash carrying backend specific settings, usually
    /// filled by `from_string`.
    pub fn open(
        &mut self,
        identifier: &str,
        mode: u32,
        is_writable: bool,
        is_new: bool,
        options: Option<&Hash>,
    ) -> Result<()> {
        if self.is_open {
            return Err(HashError::AlreadyOpen {
                identifier: self.identifier.clone().unwrap_or_default(),
            });
        }
        self.identifier = Some(identifier.to_owned());
        match self
            .backend
            .open(identifier, mode, is_writable, is_new, options)
        {
            Ok(()) => {
                self.is_open = true;
                debug!(factory = self.factory.name(), identifier, "hash opened");
                Ok(())
            }
            Err(e) => {
                self.identifier = None;
                Err(e)
            }
        }
    }

    pub fn close(&mut self) -> Result<()> {
        if !self.is_open {
            debug!(factory = self.factory.name(), "close on a hash that is not open");
            return Ok(());
        }
        self.is_open = false;
        let identifier = self.identifier.take();
        debug!(factory = self.factory.name(), identifier = ?identifier, "closing hash");
        self.backend.close()
    }

    /// Produce an independent copy of this hash under `identifier`.
    pub fn try_clone(&self, identifier: &str) -> Result<Hash> {
        let mut backend = self.factory.create()?;
        backend.clone_from_backend(identifier, self.backend.as_ref())?;
        Ok(Hash {
            factory: Rc::clone(&self.factory),
            backend,
            identifier: Some(identifier.to_owned()),
            is_open: true,
        })
    }

    /// Add `value` under `key`; an existing key gains another value.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.backend.put(key, value)
    }

    /// The first (most recently added) value of `key`.
    pub fn get_one(&self, key: &[u8]) -> Result<Option<Datum>> {
        let mut cursor = self.cursor()?;
        let found = cursor.get(CursorMode::Set(key), true)?;
        cursor.finish();
        Ok(found.and_then(|e| e.value))
    }

    pub fn exists(&self, key: &[u8], value: Option<&[u8]>) -> Result<bool> {
        self.backend.exists(key, value)
    }

    /// Remove `key` and all of its values. `Ok(false)` if it was absent.
    pub fn delete_all(&mut self, key: &[u8]) -> Result<bool> {
        self.backend.delete_key(key)
    }

    /// Remove one `(key, value)` pair. `Ok(false)` if it was absent.
    pub fn delete(&mut self, key: &[u8], value: &[u8]) -> Result<bool> {
        self.backend.delete_key_value(key, value)
    }

    pub fn sync(&mut self) -> Result<()> {
        self.backend.sync()
    }

    pub fn get_fd(&self) -> Option<i32> {
        self.backend.get_fd()
    }

    pub fn values_count(&self) -> Option<usize> {
        self.backend.values_count()
    }

    pub fn cursor(&self) -> Result<Cursor<'_>> {
        Ok(Cursor::new(self.backend.cursor()?))
    }

    /// Every `(key, value)` pair, or only those of `key` when given.
    pub fn get_all(&self, key: Option<&[u8]>, want_values: bool) -> Result<GetAll<'_>> {
        GetAll::over(self.backend.as_ref(), key, want_values)
    }

    /// Every distinct key once.
    pub fn keys(&self) -> Result<Keys<'_>> {
        Keys::over(self.backend.as_ref())
    }
}

impl Drop for Hash {
    fn drop(&mut self) {
        if self.is_open {
            if let Err(e) = self.close() {
                warn!(factory = self.factory.name(), error = %e, "close failed while dropping hash");
            }
        }
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hash")
            .field("factory", &self.factory.name())
            .field("identifier", &self.identifier)
            .field("is_open", &self.is_open)
            .finish()
    }
}

/// `memory hash: {` then one `  'key'=>'value'` line per pair, then `}`.
impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} hash: {{", self.factory.name())?;
        for entry in self.get_all(None, true).map_err(|_| fmt::Error)? {
            let entry = entry.map_err(|_| fmt::Error)?;
            let value = entry.value.map(|v| v.to_string_lossy()).unwrap_or_default();
            writeln!(f, "  '{}'=>'{}'", entry.key.to_string_lossy(), value)?;
        }
        f.write_str("}")
    }
}

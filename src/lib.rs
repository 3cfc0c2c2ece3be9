//! rdf-hash: a backend-pluggable multimap from byte-string keys to one or
//! more byte-string values, with a stateful cursor protocol and an
//! in-memory backend.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: keep every layer above the storage engine backend-agnostic, so
//!   a new engine only has to implement three small traits.
//! - Layers:
//!   - Backend contract (`HashFactory`, `HashBackend`, `BackendCursor`):
//!     the operations an engine provides. A `Factory` pairs an engine with
//!     the name it is registered under.
//!   - MemoryHash: the bundled engine. Separate chaining over a
//!     power-of-two bucket array, nodes and values in slotmap arenas.
//!   - Hash: the handle callers hold. Owns one backend instance and
//!     forwards to it; `Cursor`, `GetAll` and `Keys` are built only on the
//!     cursor contract.
//!   - Convenience layer: string/bool/integer accessors and the options
//!     mini-language (`key='value', ...`) used to configure backends.
//!   - HashRegistry: named factories, the most recently registered being
//!     the default.
//!
//! Constraints
//! - Single-threaded: `Hash` holds an `Rc<Factory>` and is `!Send`/`!Sync`.
//! - Keys and values are arbitrary bytes, including empty ones. Inputs are
//!   copied on `put`; every `Datum` handed back is owned by the caller.
//! - Values of one key come back most recently added first.
//!
//! Cursor protocol
//! - `Set(key)`, `First`, `Next` (skip the remaining values of the current
//!   key) and `NextValue` (stay on the key). End of data is `Ok(None)`,
//!   which is always distinct from an `Err`.
//! - Exhausting `NextValue` leaves the cursor on its key, so a following
//!   `Next` continues from there. `GetAll` relies on this to walk every
//!   pair.
//! - Cursors and iterators borrow the hash immutably. Mutating a hash
//!   while traversing it does not compile.
//!
//! Failure model
//! - "Not found" is `Ok(None)` or `Ok(false)`, never an error.
//! - Allocation failure while copying keys or values or growing buckets is
//!   reported as `HashError::AllocationFailure` and leaves the engine
//!   consistent.
//! - Programmer misuse (registering a name twice, an odd-length pair array)
//!   panics.
//!
//! Notes and non-goals
//! - Only the in-memory backend ships here; persistent engines plug in
//!   through the same traits.
//! - Iteration order across keys follows bucket order and is not stable
//!   across resizes.

mod accessors;
mod config;
mod cursor;
mod datum;
mod error;
mod factory;
mod hash;
mod iter;
pub mod memory;
mod memory_proptest;
pub mod options;
mod registry;

// Public surface
pub use config::{MemoryConfig, DEFAULT_LOAD_FACTOR, INITIAL_CAPACITY};
pub use cursor::Cursor;
pub use datum::Datum;
pub use error::{HashError, Result};
pub use factory::{BackendCursor, CursorMode, Entry, Factory, HashBackend, HashFactory};
pub use hash::Hash;
pub use iter::{GetAll, Keys};
pub use memory::{MemoryFactory, MemoryHash};
pub use options::OptionsParser;
pub use registry::HashRegistry;

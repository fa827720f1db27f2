//! Reference counted ownership over an explicit control block.
//!
//! This crate provides the handle types `Strong` and `Weak`, which share a
//! heap-resident control block holding two counters, plus the exclusive
//! owner `Unique` with a pluggable deletion policy.
//!
//! Unlike `std::rc::Rc`, the exposed pointer and the ownership group are
//! separate: a `Strong` can expose a field of its payload while keeping the
//! whole payload alive, and a payload implementing `SharedFromThis` can mint
//! new handles to itself.
//!
//! ```
//! use shareptr::{Strong, Weak};
//!
//! let h1 = Strong::new(42);
//! let h2 = h1.clone();
//! let w: Weak<i32> = h2.downgrade();
//! assert_eq!(w.use_count(), 2);
//!
//! drop(h1);
//! drop(h2);
//! assert!(w.expired());
//! assert!(w.lock().is_none());
//! ```
//!
//! Caveat: counters are not atomic and the handles are neither `Send` nor
//! `Sync`. Payloads must be `'static`, and are allocated sized; handles to
//! unsized views such as trait objects come from `Strong::map` and
//! `Strong::cast`.

pub(crate) mod block;
pub mod axioms;
pub mod error;
pub mod ledger;
pub mod pointers;
pub mod shared_from_this;
pub mod unique;

pub use axioms::Axioms;
pub use error::DanglingReference;
#[cfg(feature = "global")]
pub use ledger::get_global_stats;
pub use ledger::{get_stats, Stats};
pub use pointers::{Strong, Weak};
pub use shared_from_this::{SharedFromThis, WeakThis};
pub use unique::{DefaultDelete, Deleter, Unique};

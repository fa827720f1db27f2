//! Self-observation: letting an owned object hand out references to itself.
//!
//! A payload type embeds a `WeakThis<Self>` field and implements
//! `SharedFromThis`. The `*_observed` constructors of `Strong` fill that
//! field with a weak back-reference to the new control block. It is weak so
//! the object never keeps itself alive.
//!
//! ```
//! use shareptr::{SharedFromThis, Strong, WeakThis};
//!
//! struct Node {
//!     this: WeakThis<Node>,
//! }
//!
//! impl SharedFromThis for Node {
//!     fn weak_this(&self) -> &WeakThis<Self> { &self.this }
//! }
//!
//! let h = Strong::new_observed(Node { this: WeakThis::new() });
//! let h2 = h.shared_from_this().unwrap();
//! assert!(h2 == h);
//! assert_eq!(h.use_count(), 2);
//! ```

use std::{cell::RefCell, fmt};

use crate::{
    error::DanglingReference,
    pointers::{Strong, Weak},
};

/// Slot holding an object's weak reference to itself.
///
/// Empty until the object is first owned through one of the `*_observed`
/// constructors.
pub struct WeakThis<T: 'static>(RefCell<Weak<T>>);

impl<T: 'static> WeakThis<T>
{
    pub const fn new() -> Self { Self(RefCell::new(Weak::new())) }

    fn get(&self) -> Weak<T> { self.0.borrow().clone() }

    fn install(&self, weak: Weak<T>)
    {
        // the previous reference may free its block, drop it outside the borrow
        let previous = self.0.replace(weak);
        drop(previous);
    }
}

impl<T: 'static> Default for WeakThis<T>
{
    fn default() -> Self { Self::new() }
}

impl<T: 'static> fmt::Debug for WeakThis<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_tuple("WeakThis").field(&*self.0.borrow()).finish()
    }
}

/// Opt-in capability for payloads that need references to themselves.
pub trait SharedFromThis: Sized + 'static
{
    fn weak_this(&self) -> &WeakThis<Self>;

    /// A new strong reference to this object.
    ///
    /// Fails with `DanglingReference` if the object is not owned by a
    /// `Strong` created through an `*_observed` constructor, or if it is
    /// already being destroyed.
    fn shared_from_this(&self) -> Result<Strong<Self>, DanglingReference>
    {
        self.weak_this().get().upgrade()
    }

    /// A new weak reference to this object; empty if it was never owned.
    fn weak_from_this(&self) -> Weak<Self> { self.weak_this().get() }
}

impl<T: SharedFromThis> Strong<T>
{
    /// Like `Strong::new`, and installs the back-reference.
    pub fn new_observed(it: T) -> Self { Self::new(it).observed() }

    /// Like `Strong::from_box`, and installs the back-reference.
    pub fn from_box_observed(it: Box<T>) -> Self { Self::from_box(it).observed() }

    /// Like `Strong::from_raw`, and installs the back-reference.
    ///
    /// # Safety
    ///
    /// Same as `Strong::from_raw`.
    pub unsafe fn from_raw_observed(ptr: *mut T) -> Self { Self::from_raw(ptr).observed() }

    /// Like `Strong::reset_with_box`, and installs the back-reference.
    pub fn reset_with_box_observed(&mut self, it: Box<T>)
    {
        self.reset();
        *self = Self::from_box_observed(it);
    }

    /// Like `Strong::reset_with_raw`, and installs the back-reference.
    ///
    /// # Safety
    ///
    /// Same as `Strong::from_raw`.
    pub unsafe fn reset_with_raw_observed(&mut self, ptr: *mut T)
    {
        self.reset();
        *self = Self::from_raw_observed(ptr);
    }

    fn observed(self) -> Self
    {
        if let Some(it) = self.get() {
            it.weak_this().install(self.downgrade());
        }
        self
    }
}

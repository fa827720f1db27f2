use super::{block::BlockRef, error::DanglingReference};
use std::{
    any::TypeId,
    fmt,
    marker::PhantomData,
    mem,
    ops::Deref,
    ptr::{self, NonNull},
};

/// Strong reference.
///
/// Owns a share of its control block. The payload lives as long as at least
/// one `Strong` of its block does; cloning is O(1) and never copies the
/// payload.
///
/// The exposed pointer usually is the block's payload, but an aliasing
/// construction (`Strong::map`, `Strong::aliasing`) can expose any address
/// whose validity is tied to the payload, such as one of its fields.
///
/// Payloads are allocated sized; `Strong::map` and `Strong::cast` convert to
/// compatible types such as trait objects sharing the same block.
pub struct Strong<T: ?Sized + 'static>
{
    pub(crate) ptr: Option<NonNull<T>>,
    pub(crate) block: Option<BlockRef>,
    _phantom: PhantomData<T>,
}

impl<T: ?Sized + 'static> Strong<T>
{
    pub(crate) fn from_parts(ptr: Option<NonNull<T>>, block: Option<BlockRef>) -> Self
    {
        Self {
            ptr,
            block,
            _phantom: PhantomData,
        }
    }

    /// A handle owning nothing.
    pub const fn empty() -> Self
    {
        Self {
            ptr: None,
            block: None,
            _phantom: PhantomData,
        }
    }

    /// Share ownership with `owner` while exposing `ptr`.
    ///
    /// The result counts as a strong reference of `owner`'s block; if
    /// `owner` is empty, so is the ownership of the result.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or valid for reads for as long as `owner`'s
    /// payload is alive.
    pub unsafe fn aliasing<U: ?Sized + 'static>(owner: &Strong<U>, ptr: *const T) -> Self
    {
        if let Some(block) = owner.block {
            block.acquire_strong();
        }
        Self::from_parts(NonNull::new(ptr as *mut T), owner.block)
    }

    /// Aliasing handle for a part of the payload, keeping the whole payload
    /// alive.
    ///
    /// The projection may also unsize, e.g. `|s| s as &dyn Trait`. Mapping
    /// an empty handle yields an empty handle.
    pub fn map<F, U>(&self, f: F) -> Strong<U>
    where
        for<'a> F: FnOnce(&'a T) -> &'a U,
        U: ?Sized + 'static,
    {
        match self.get() {
            Some(it) => unsafe { Strong::aliasing(self, f(it)) },
            None => Strong::empty(),
        }
    }

    /// Convert into a handle of a compatible payload type, keeping this
    /// handle's share of the block. Counters are untouched.
    ///
    /// # Safety
    ///
    /// `f` must return a pointer valid for reads for as long as the payload
    /// is alive, typically the same address unsized to a trait object.
    pub unsafe fn cast<U, F>(mut self, f: F) -> Strong<U>
    where
        U: ?Sized + 'static,
        F: FnOnce(NonNull<T>) -> NonNull<U>,
    {
        let block = self.block.take();
        Strong::from_parts(self.ptr.map(f), block)
    }

    /// Produce a weak reference to the same block and address.
    ///
    /// Also available as `From<&Strong<T>>` on `Weak`.
    pub fn downgrade(&self) -> Weak<T>
    {
        if let Some(block) = self.block {
            block.acquire_weak();
        }
        Weak {
            ptr: self.ptr,
            block: self.block,
        }
    }

    /// Release ownership, leaving the handle empty.
    pub fn reset(&mut self) { drop(self.take()) }

    /// Move out of this handle, leaving it empty. Counters are untouched.
    pub fn take(&mut self) -> Self { mem::take(self) }

    pub fn swap(&mut self, other: &mut Self) { mem::swap(self, other) }

    pub fn as_non_null(&self) -> Option<NonNull<T>> { self.ptr }

    pub fn get(&self) -> Option<&T> { self.ptr.map(|p| unsafe { &*p.as_ptr() }) }

    /// Number of strong references sharing this block, zero if empty.
    pub fn use_count(&self) -> usize { self.block.map_or(0, BlockRef::strong) }

    /// Number of weak references to this block, zero if empty.
    pub fn weak_count(&self) -> usize { self.block.map_or(0, BlockRef::weak) }

    /// Whether the exposed pointer is non-null.
    pub fn is_some(&self) -> bool { self.ptr.is_some() }

    pub fn is_none(&self) -> bool { self.ptr.is_none() }

    /// Whether both handles belong to the same ownership group, regardless
    /// of the addresses they expose.
    pub fn ptr_eq<U: ?Sized + 'static>(&self, other: &Strong<U>) -> bool
    {
        match (self.block, other.block) {
            (Some(a), Some(b)) => a.same_block(b),
            (None, None) => true,
            _ => false,
        }
    }

    fn addr(&self) -> *const ()
    {
        self.ptr.map_or(ptr::null(), |p| p.cast::<()>().as_ptr() as *const ())
    }
}

impl<T: 'static> Strong<T>
{
    /// Allocate `it` together with its control block in a single heap
    /// allocation.
    pub fn new(it: T) -> Self
    {
        let (block, ptr) = BlockRef::inline(it);
        Self::from_parts(Some(ptr), Some(block))
    }

    /// Take ownership of a boxed value. The control block is allocated
    /// separately from the box.
    ///
    /// Also available as `From<Box<T>>`.
    pub fn from_box(it: Box<T>) -> Self
    {
        unsafe { Self::from_raw(Box::into_raw(it)) }
    }

    /// Take ownership of a raw pointer. A null pointer produces an empty
    /// handle.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or come from `Box::into_raw`, and must not be owned
    /// by anything else, in particular not by another `Strong` group. This
    /// is not checked.
    pub unsafe fn from_raw(ptr: *mut T) -> Self
    {
        match NonNull::new(ptr) {
            Some(ptr) => Self::from_parts(Some(ptr), Some(BlockRef::pointer(ptr))),
            None => Self::empty(),
        }
    }

    /// Release ownership, then take ownership of `it`.
    pub fn reset_with_box(&mut self, it: Box<T>)
    {
        self.reset();
        *self = Self::from_box(it);
    }

    /// Release ownership, then take ownership of `ptr`.
    ///
    /// # Safety
    ///
    /// Same as `Strong::from_raw`.
    pub unsafe fn reset_with_raw(&mut self, ptr: *mut T)
    {
        self.reset();
        *self = Self::from_raw(ptr);
    }

    /// The exposed pointer; null for an empty handle.
    pub fn as_ptr(&self) -> *const T
    {
        self.ptr.map_or(ptr::null(), |p| p.as_ptr() as *const T)
    }

    /// Attempt to take the payload out of the block rather than dropping
    /// it.
    ///
    /// Fails if there are other strong references, or if this handle is
    /// aliasing something other than the payload.
    pub fn try_unwrap(mut self) -> Result<T, Self>
    {
        let (ptr, block) = match (self.ptr, self.block) {
            (Some(ptr), Some(block)) => (ptr, block),
            _ => return Err(self),
        };
        if block.strong() != 1
            || block.payload_type() != TypeId::of::<T>()
            || block.payload() != ptr.cast()
        {
            return Err(self);
        }
        self.ptr = None;
        self.block = None;
        unsafe {
            let it = ptr::read(ptr.as_ptr());
            block.release_strong_moved();
            Ok(it)
        }
    }
}

impl<T: ?Sized + 'static> Deref for Strong<T>
{
    type Target = T;

    fn deref(&self) -> &Self::Target
    {
        match self.get() {
            Some(it) => it,
            None => panic!("dereferenced an empty Strong<{}>", std::any::type_name::<T>()),
        }
    }
}

impl<T: ?Sized + 'static> Clone for Strong<T>
{
    fn clone(&self) -> Self
    {
        if let Some(block) = self.block {
            block.acquire_strong();
        }
        Self::from_parts(self.ptr, self.block)
    }
}

impl<T: ?Sized + 'static> Default for Strong<T>
{
    fn default() -> Self { Self::empty() }
}

impl<T: ?Sized + 'static> Drop for Strong<T>
{
    fn drop(&mut self)
    {
        if let Some(block) = self.block.take() {
            unsafe { block.release_strong() }
        }
    }
}

impl<T: 'static> From<Box<T>> for Strong<T>
{
    fn from(it: Box<T>) -> Self { Self::from_box(it) }
}

impl<T: ?Sized + 'static> TryFrom<&Weak<T>> for Strong<T>
{
    type Error = DanglingReference;

    fn try_from(value: &Weak<T>) -> Result<Self, Self::Error> { value.upgrade() }
}

impl<T: ?Sized + 'static, U: ?Sized + 'static> PartialEq<Strong<U>> for Strong<T>
{
    fn eq(&self, other: &Strong<U>) -> bool { self.addr() == other.addr() }
}

impl<T: ?Sized + 'static> Eq for Strong<T> {}

impl<T: ?Sized + 'static> fmt::Debug for Strong<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Strong")
            .field("ptr", &self.ptr)
            .field("block", &self.block)
            .finish()
    }
}

/// Weak reference.
///
/// Observes a control block without keeping its payload alive. The block
/// itself stays allocated while weak references exist, so liveness can
/// always be queried and promotion attempted safely.
pub struct Weak<T: ?Sized + 'static>
{
    pub(crate) ptr: Option<NonNull<T>>,
    pub(crate) block: Option<BlockRef>,
}

impl<T: ?Sized + 'static> Weak<T>
{
    /// A weak reference observing nothing. It is always expired.
    pub const fn new() -> Self
    {
        Self {
            ptr: None,
            block: None,
        }
    }

    /// Whether the payload is gone, or was never there.
    pub fn expired(&self) -> bool { self.use_count() == 0 }

    /// Number of strong references to the observed block, zero if empty.
    pub fn use_count(&self) -> usize { self.block.map_or(0, BlockRef::strong) }

    /// Number of weak references to the observed block, zero if empty.
    pub fn weak_count(&self) -> usize { self.block.map_or(0, BlockRef::weak) }

    /// Attempt to promote to a strong reference.
    ///
    /// Also available as `TryFrom<&Weak<T>>` on `Strong`.
    pub fn upgrade(&self) -> Result<Strong<T>, DanglingReference>
    {
        match self.block {
            Some(block) if block.try_acquire_strong() => {
                Ok(Strong::from_parts(self.ptr, self.block))
            }
            _ => Err(DanglingReference),
        }
    }

    /// Promote to a strong reference, or an empty one if expired.
    pub fn lock(&self) -> Strong<T> { self.upgrade().unwrap_or_default() }

    pub fn reset(&mut self) { drop(self.take()) }

    pub fn take(&mut self) -> Self { mem::take(self) }

    pub fn swap(&mut self, other: &mut Self) { mem::swap(self, other) }

    /// Convert into a weak reference of a compatible payload type, keeping
    /// this handle's share of the block.
    ///
    /// # Safety
    ///
    /// Same as `Strong::cast`.
    pub unsafe fn cast<U, F>(mut self, f: F) -> Weak<U>
    where
        U: ?Sized + 'static,
        F: FnOnce(NonNull<T>) -> NonNull<U>,
    {
        Weak {
            ptr: self.ptr.map(f),
            block: self.block.take(),
        }
    }

    /// The observed pointer. Only meaningful while not expired.
    pub fn as_non_null(&self) -> Option<NonNull<T>> { self.ptr }

    pub fn ptr_eq<U: ?Sized + 'static>(&self, other: &Weak<U>) -> bool
    {
        match (self.block, other.block) {
            (Some(a), Some(b)) => a.same_block(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: 'static> Weak<T>
{
    /// The observed pointer, null if empty. Only meaningful while not
    /// expired.
    pub fn as_ptr(&self) -> *const T
    {
        self.ptr.map_or(ptr::null(), |p| p.as_ptr() as *const T)
    }
}

impl<T: ?Sized + 'static> Clone for Weak<T>
{
    fn clone(&self) -> Self
    {
        if let Some(block) = self.block {
            block.acquire_weak();
        }
        Self {
            ptr: self.ptr,
            block: self.block,
        }
    }
}

impl<T: ?Sized + 'static> Default for Weak<T>
{
    fn default() -> Self { Self::new() }
}

impl<T: ?Sized + 'static> Drop for Weak<T>
{
    fn drop(&mut self)
    {
        if let Some(block) = self.block.take() {
            unsafe { block.release_weak() }
        }
    }
}

impl<T: ?Sized + 'static> From<&Strong<T>> for Weak<T>
{
    fn from(it: &Strong<T>) -> Self { it.downgrade() }
}

impl<T: ?Sized + 'static> fmt::Debug for Weak<T>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Weak")
            .field("ptr", &self.ptr)
            .field("block", &self.block)
            .finish()
    }
}

use std::{
    fmt,
    marker::PhantomData,
    mem::{self, ManuallyDrop},
    ops::{Deref, DerefMut},
    ptr::{self, NonNull},
};

/// Deletion policy of a `Unique`.
pub trait Deleter<T: ?Sized>
{
    /// Destroy the resource behind `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be a resource this policy knows how to destroy, and must
    /// not be used afterwards.
    unsafe fn delete(&mut self, ptr: NonNull<T>);
}

/// Reclaims resources allocated through `Box`. Covers single objects as
/// well as slices (`Box<[T]>`).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DefaultDelete;

impl<T: ?Sized> Deleter<T> for DefaultDelete
{
    unsafe fn delete(&mut self, ptr: NonNull<T>) { drop(Box::from_raw(ptr.as_ptr())) }
}

impl<T: ?Sized, F> Deleter<T> for F
where
    F: FnMut(NonNull<T>),
{
    unsafe fn delete(&mut self, ptr: NonNull<T>) { self(ptr) }
}

/// Exclusive owner of a resource.
///
/// No control block and no counters; moving is the only way to transfer
/// ownership. The resource is handed to the deleter when the handle is
/// dropped or reset.
pub struct Unique<T: ?Sized + 'static, D: Deleter<T> = DefaultDelete>
{
    ptr: Option<NonNull<T>>,
    deleter: D,
    _phantom: PhantomData<T>,
}

unsafe impl<T: ?Sized + Send + 'static, D: Deleter<T> + Send> Send for Unique<T, D> {}
unsafe impl<T: ?Sized + Sync + 'static, D: Deleter<T> + Sync> Sync for Unique<T, D> {}

impl<T: 'static> Unique<T>
{
    pub fn new(it: T) -> Self { Self::from_box(Box::new(it)) }
}

impl<T: ?Sized + 'static> Unique<T>
{
    pub fn from_box(it: Box<T>) -> Self
    {
        unsafe { Self::from_raw_with_deleter(Box::into_raw(it), DefaultDelete) }
    }

    /// # Safety
    ///
    /// `ptr` must be null or come from `Box::into_raw`, and must not be
    /// owned by anything else.
    pub unsafe fn from_raw(ptr: *mut T) -> Self { Self::from_raw_with_deleter(ptr, DefaultDelete) }

    /// Give the resource back as a `Box`, `None` if empty.
    pub fn into_box(mut self) -> Option<Box<T>>
    {
        self.release().map(|p| unsafe { Box::from_raw(p.as_ptr()) })
    }
}

impl<T: ?Sized + 'static, D: Deleter<T>> Unique<T, D>
{
    /// An empty handle.
    pub fn empty() -> Self
    where
        D: Default,
    {
        Self::with_parts(None, D::default())
    }

    fn with_parts(ptr: Option<NonNull<T>>, deleter: D) -> Self
    {
        Self {
            ptr,
            deleter,
            _phantom: PhantomData,
        }
    }

    /// # Safety
    ///
    /// `ptr` must be null or a resource `deleter` can destroy, and must not
    /// be owned by anything else.
    pub unsafe fn from_raw_with_deleter(ptr: *mut T, deleter: D) -> Self
    {
        Self::with_parts(NonNull::new(ptr), deleter)
    }

    /// Give up ownership without deleting. The handle is left empty.
    #[must_use]
    pub fn release(&mut self) -> Option<NonNull<T>> { self.ptr.take() }

    /// Delete the current resource, if any, and take ownership of `ptr`.
    ///
    /// # Safety
    ///
    /// Same as `Unique::from_raw_with_deleter`, for this handle's deleter.
    pub unsafe fn reset(&mut self, ptr: Option<NonNull<T>>)
    {
        if let Some(old) = mem::replace(&mut self.ptr, ptr) {
            self.deleter.delete(old);
        }
    }

    /// Delete the current resource, leaving the handle empty.
    pub fn clear(&mut self) { unsafe { self.reset(None) } }

    pub fn swap(&mut self, other: &mut Self) { mem::swap(self, other) }

    pub fn get(&self) -> Option<&T> { self.ptr.map(|p| unsafe { &*p.as_ptr() }) }

    pub fn get_mut(&mut self) -> Option<&mut T> { self.ptr.map(|p| unsafe { &mut *p.as_ptr() }) }

    pub fn as_non_null(&self) -> Option<NonNull<T>> { self.ptr }

    pub fn is_some(&self) -> bool { self.ptr.is_some() }

    pub fn is_none(&self) -> bool { self.ptr.is_none() }

    pub fn deleter(&self) -> &D { &self.deleter }

    pub fn deleter_mut(&mut self) -> &mut D { &mut self.deleter }

    fn into_parts(self) -> (Option<NonNull<T>>, D)
    {
        let mut this = ManuallyDrop::new(self);
        let ptr = this.ptr.take();
        (ptr, unsafe { ptr::read(&this.deleter) })
    }

    /// Convert the deletion policy along its declared compatibility
    /// relation.
    pub fn into_deleter<E>(self) -> Unique<T, E>
    where
        E: Deleter<T> + From<D>,
    {
        let (ptr, deleter) = self.into_parts();
        Unique::with_parts(ptr, E::from(deleter))
    }

    /// Convert the pointer together with the deletion policy, typically
    /// to unsize it into a trait object.
    ///
    /// # Safety
    ///
    /// `f` must return a pointer the converted deleter can destroy in place
    /// of the original resource.
    pub unsafe fn cast<U, E, F>(self, f: F) -> Unique<U, E>
    where
        U: ?Sized + 'static,
        E: Deleter<U> + From<D>,
        F: FnOnce(NonNull<T>) -> NonNull<U>,
    {
        let (ptr, deleter) = self.into_parts();
        Unique::with_parts(ptr.map(f), E::from(deleter))
    }
}

impl<T: 'static, D: Deleter<T>> Unique<T, D>
{
    /// The owned pointer; null for an empty handle.
    pub fn as_ptr(&self) -> *const T
    {
        self.ptr.map_or(ptr::null(), |p| p.as_ptr() as *const T)
    }
}

impl<T: ?Sized + 'static, D: Deleter<T>> Drop for Unique<T, D>
{
    fn drop(&mut self) { self.clear() }
}

impl<T: ?Sized + 'static, D: Deleter<T>> Deref for Unique<T, D>
{
    type Target = T;

    fn deref(&self) -> &Self::Target
    {
        match self.get() {
            Some(it) => it,
            None => panic!("dereferenced an empty Unique"),
        }
    }
}

impl<T: ?Sized + 'static, D: Deleter<T>> DerefMut for Unique<T, D>
{
    fn deref_mut(&mut self) -> &mut Self::Target
    {
        match self.get_mut() {
            Some(it) => it,
            None => panic!("dereferenced an empty Unique"),
        }
    }
}

impl<T: ?Sized + 'static> From<Box<T>> for Unique<T>
{
    fn from(it: Box<T>) -> Self { Self::from_box(it) }
}

impl<T: 'static> From<Vec<T>> for Unique<[T]>
{
    fn from(it: Vec<T>) -> Self { Self::from_box(it.into_boxed_slice()) }
}

impl<T: ?Sized + 'static, D: Deleter<T>> fmt::Debug for Unique<T, D>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Unique").field("ptr", &self.ptr).finish()
    }
}

use std::{
    any::{type_name, TypeId},
    cell::{Cell, UnsafeCell},
    fmt,
    mem::{ManuallyDrop, MaybeUninit},
    ptr::NonNull,
};

use crate::ledger::{self, BlockKind};

/// The two liveness counters of an ownership group.
pub(crate) struct Counts
{
    strong: Cell<usize>,
    weak: Cell<usize>,
    /// Set while the payload's destructor runs. The block must outlive it
    /// even if the last weak handle goes away meanwhile.
    destroying: Cell<bool>,
}

impl Counts
{
    fn new() -> Self
    {
        Self {
            strong: Cell::new(1),
            weak: Cell::new(0),
            destroying: Cell::new(false),
        }
    }
}

/// Capability surface shared by both block layouts.
///
/// Counter bookkeeping is provided; a layout only has to say where its
/// payload lives and how to get rid of it.
pub(crate) trait ControlBlock
{
    fn counts(&self) -> &Counts;

    /// Address of the payload. Stays valid until the block is freed, even
    /// after the payload itself has been destroyed.
    fn payload(&self) -> NonNull<()>;

    fn payload_type(&self) -> TypeId;

    /// Runs the payload's destructor and releases its storage.
    ///
    /// Must be called at most once, and never after `discard_payload`.
    unsafe fn destroy_payload(&self);

    /// Releases the payload's storage without running its destructor, for
    /// when the value has already been moved out.
    unsafe fn discard_payload(&self);

    fn strong(&self) -> usize { self.counts().strong.get() }

    fn weak(&self) -> usize { self.counts().weak.get() }

    fn inc_strong(&self) { self.counts().strong.set(self.strong() + 1) }

    fn inc_weak(&self) { self.counts().weak.set(self.weak() + 1) }

    fn dec_strong(&self)
    {
        let n = self.strong();
        debug_assert!(n > 0, "strong counter underflow");
        self.counts().strong.set(n - 1)
    }

    fn dec_weak(&self)
    {
        let n = self.weak();
        debug_assert!(n > 0, "weak counter underflow");
        self.counts().weak.set(n - 1)
    }
}

/// Block for a payload that was allocated on its own, through a `Box`.
struct PointerBlock<T: 'static>
{
    counts: Counts,
    ptr: NonNull<T>,
}

impl<T: 'static> ControlBlock for PointerBlock<T>
{
    fn counts(&self) -> &Counts { &self.counts }

    fn payload(&self) -> NonNull<()> { self.ptr.cast() }

    fn payload_type(&self) -> TypeId { TypeId::of::<T>() }

    unsafe fn destroy_payload(&self) { drop(Box::from_raw(self.ptr.as_ptr())) }

    unsafe fn discard_payload(&self)
    {
        drop(Box::from_raw(self.ptr.as_ptr() as *mut ManuallyDrop<T>))
    }
}

/// Block that carries the payload in its own allocation.
///
/// The payload is written into `data` right after the block is allocated
/// and dropped in place; the storage goes away together with the block.
struct InlineBlock<T: 'static>
{
    counts: Counts,
    data: UnsafeCell<MaybeUninit<T>>,
}

impl<T: 'static> InlineBlock<T>
{
    fn data_ptr(&self) -> NonNull<T>
    {
        unsafe { NonNull::new_unchecked(self.data.get() as *mut T) }
    }

    unsafe fn init_data(&self, init: T) { (*self.data.get()).write(init); }

    unsafe fn drop_data(&self) { (*self.data.get()).assume_init_drop(); }
}

impl<T: 'static> ControlBlock for InlineBlock<T>
{
    fn counts(&self) -> &Counts { &self.counts }

    fn payload(&self) -> NonNull<()> { self.data_ptr().cast() }

    fn payload_type(&self) -> TypeId { TypeId::of::<T>() }

    unsafe fn destroy_payload(&self) { self.drop_data() }

    unsafe fn discard_payload(&self) {}
}

/// Shared reference to a heap-resident control block.
///
/// This is a plain pointer; the handles decide when counters move.
#[derive(Clone, Copy)]
pub(crate) struct BlockRef(NonNull<dyn ControlBlock>);

impl BlockRef
{
    /// Allocates a block owning `ptr`, which must come from `Box::into_raw`.
    pub(crate) fn pointer<T: 'static>(ptr: NonNull<T>) -> Self
    {
        let raw: *mut dyn ControlBlock = Box::into_raw(Box::new(PointerBlock {
            counts: Counts::new(),
            ptr,
        }));
        log::trace!("allocated pointer block {:p} for {}", raw, type_name::<T>());
        ledger::block_allocated(BlockKind::Pointer);
        Self(unsafe { NonNull::new_unchecked(raw) })
    }

    /// Allocates a block with `value` constructed inside it.
    pub(crate) fn inline<T: 'static>(value: T) -> (Self, NonNull<T>)
    {
        let raw = Box::into_raw(Box::new(InlineBlock::<T> {
            counts: Counts::new(),
            data: UnsafeCell::new(MaybeUninit::uninit()),
        }));
        let data = unsafe {
            (*raw).init_data(value);
            (*raw).data_ptr()
        };
        let raw: *mut dyn ControlBlock = raw;
        log::trace!("allocated inline block {:p} for {}", raw, type_name::<T>());
        ledger::block_allocated(BlockKind::Inline);
        (Self(unsafe { NonNull::new_unchecked(raw) }), data)
    }

    #[inline(always)]
    pub(crate) fn get(&self) -> &dyn ControlBlock { unsafe { self.0.as_ref() } }

    pub(crate) fn strong(self) -> usize { self.get().strong() }

    pub(crate) fn weak(self) -> usize { self.get().weak() }

    pub(crate) fn payload(self) -> NonNull<()> { self.get().payload() }

    pub(crate) fn payload_type(self) -> TypeId { self.get().payload_type() }

    pub(crate) fn acquire_strong(self) { self.get().inc_strong() }

    pub(crate) fn acquire_weak(self) { self.get().inc_weak() }

    /// Promotion: takes a strong reference only if the payload is alive.
    pub(crate) fn try_acquire_strong(self) -> bool
    {
        let block = self.get();
        if block.strong() == 0 {
            false
        } else {
            block.inc_strong();
            true
        }
    }

    /// Gives up one strong reference.
    ///
    /// # Safety
    ///
    /// The caller must have held a strong reference on this block.
    pub(crate) unsafe fn release_strong(self)
    {
        let block = self.get();
        block.dec_strong();
        if block.strong() == 0 {
            // weak handles dropped by the payload itself must not free the
            // block while its destructor is still running
            block.counts().destroying.set(true);
            log::trace!("destroying payload of block {:p}", self.0);
            block.destroy_payload();
            block.counts().destroying.set(false);
            ledger::payload_destroyed();
            if block.weak() == 0 {
                self.free();
            }
        }
    }

    /// Gives up the last strong reference after its payload was moved out.
    ///
    /// # Safety
    ///
    /// The caller must hold the only strong reference and must have taken
    /// ownership of the payload value.
    pub(crate) unsafe fn release_strong_moved(self)
    {
        let block = self.get();
        debug_assert_eq!(block.strong(), 1);
        block.dec_strong();
        block.discard_payload();
        ledger::payload_destroyed();
        if block.weak() == 0 {
            self.free();
        }
    }

    /// Gives up one weak reference.
    ///
    /// # Safety
    ///
    /// The caller must have held a weak reference on this block.
    pub(crate) unsafe fn release_weak(self)
    {
        let block = self.get();
        block.dec_weak();
        if block.weak() == 0 && block.strong() == 0 && !block.counts().destroying.get() {
            self.free();
        }
    }

    unsafe fn free(self)
    {
        log::trace!("freeing block {:p}", self.0);
        drop(Box::from_raw(self.0.as_ptr()));
        ledger::block_freed();
    }

    pub(crate) fn same_block(self, other: BlockRef) -> bool
    {
        self.0.cast::<()>() == other.0.cast::<()>()
    }
}

impl fmt::Debug for BlockRef
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("BlockRef")
            .field("addr", &self.0.cast::<()>())
            .field("strong", &self.strong())
            .field("weak", &self.weak())
            .finish()
    }
}

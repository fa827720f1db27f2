use std::cell::Cell;

#[cfg(feature = "global")]
use lazy_static::lazy_static;
#[cfg(feature = "global")]
use parking_lot::Mutex;

/// Control block bookkeeping statistics, for diagnosing leaks and verifying
/// allocation behavior.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats
{
    /// Control blocks allocated.
    pub blocks_allocated: usize,

    /// Of those, blocks holding their payload inline.
    pub inline_blocks: usize,

    /// Of those, blocks owning a separately allocated payload.
    pub pointer_blocks: usize,

    /// Payloads that left their block, either destroyed by the last strong
    /// handle or moved out with `Strong::try_unwrap`.
    pub payloads_destroyed: usize,

    /// Control blocks freed.
    pub blocks_freed: usize,
}

#[allow(dead_code)]
impl Stats
{
    /// Blocks allocated and not yet freed.
    pub fn live_blocks(&self) -> usize { self.blocks_allocated - self.blocks_freed }

    /// Payloads constructed and not yet destroyed.
    pub fn live_payloads(&self) -> usize { self.blocks_allocated - self.payloads_destroyed }

    /// Heap allocations performed by the blocks and their payloads.
    ///
    /// An inline block is a single allocation, a pointer block is two.
    pub fn heap_allocations(&self) -> usize { self.inline_blocks + 2 * self.pointer_blocks }

    /// Difference between these statistics and an `earlier` snapshot.
    pub fn since(&self, earlier: &Stats) -> Stats
    {
        Stats {
            blocks_allocated: self.blocks_allocated - earlier.blocks_allocated,
            inline_blocks: self.inline_blocks - earlier.inline_blocks,
            pointer_blocks: self.pointer_blocks - earlier.pointer_blocks,
            payloads_destroyed: self.payloads_destroyed - earlier.payloads_destroyed,
            blocks_freed: self.blocks_freed - earlier.blocks_freed,
        }
    }

    fn absorb(&mut self, other: &Stats)
    {
        self.blocks_allocated += other.blocks_allocated;
        self.inline_blocks += other.inline_blocks;
        self.pointer_blocks += other.pointer_blocks;
        self.payloads_destroyed += other.payloads_destroyed;
        self.blocks_freed += other.blocks_freed;
    }
}

#[derive(Clone, Copy)]
pub(crate) enum BlockKind
{
    Inline,
    Pointer,
}

struct LocalLedger(Cell<Stats>);

thread_local! {
    static LOCAL_LEDGER: LocalLedger = LocalLedger(Cell::new(Stats::default()));
}

#[cfg(feature = "global")]
lazy_static! {
    static ref GLOBAL_LEDGER: Mutex<Stats> = Mutex::new(Stats::default());
}

impl LocalLedger
{
    fn update(&self, f: impl FnOnce(&mut Stats))
    {
        let mut stats = self.0.get();
        f(&mut stats);
        self.0.set(stats);
    }
}

#[cfg(feature = "global")]
impl Drop for LocalLedger
{
    fn drop(&mut self)
    {
        let stats = self.0.get();
        log::trace!(
            "folding thread ledger into global ledger: {} blocks, {} live",
            stats.blocks_allocated,
            stats.live_blocks()
        );
        GLOBAL_LEDGER.lock().absorb(&stats);
    }
}

// handles dropped during thread-local teardown may outlive the ledger
fn record(f: impl FnOnce(&mut Stats))
{
    let _ = LOCAL_LEDGER.try_with(|ledger| ledger.update(f));
}

pub(crate) fn block_allocated(kind: BlockKind)
{
    record(|s| {
        s.blocks_allocated += 1;
        match kind {
            BlockKind::Inline => s.inline_blocks += 1,
            BlockKind::Pointer => s.pointer_blocks += 1,
        }
    })
}

pub(crate) fn payload_destroyed() { record(|s| s.payloads_destroyed += 1) }

pub(crate) fn block_freed() { record(|s| s.blocks_freed += 1) }

/// Statistics of the current thread.
pub fn get_stats() -> Stats { LOCAL_LEDGER.with(|ledger| ledger.0.get()) }

/// Statistics accumulated by threads that have exited.
#[cfg(feature = "global")]
pub fn get_global_stats() -> Stats { *GLOBAL_LEDGER.lock() }

/// Simple axiomatic model of a control block.
///
/// Every operation on handles is viewed in terms of how it alters the two
/// counters and the liveness of payload and block. Each axiom asserts its
/// preconditions and returns the resulting state, so sequences of axioms
/// can be checked by running them.
///
/// The unit tests drive real handles alongside this model and compare.
#[allow(dead_code)]
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Axioms
{
    /// Number of live strong handles.
    pub strong: usize,

    /// Number of live weak handles.
    pub weak: usize,

    /// Whether the payload has been constructed and not yet destroyed.
    pub payload: bool,

    /// Whether the control block is allocated.
    pub block: bool,
}

#[allow(dead_code)]
impl Axioms
{
    /// Before anything is allocated there are no references.
    ///
    /// ```notest
    /// Self {
    ///     strong: 0,
    ///     weak: 0,
    ///     payload: false,
    ///     block: false,
    /// }
    /// ```
    ///
    /// Sequencing property:
    ///
    /// ```
    /// shareptr::Axioms::unallocated().leak_check()
    /// ```
    pub fn unallocated() -> Self
    {
        Self {
            strong: 0,
            weak: 0,
            payload: false,
            block: false,
        }
    }

    /// Nothing may be left over once the last reference is gone.
    pub fn leak_check(self)
    {
        assert_eq!(self.strong + self.weak, 0);
        assert!(!self.payload, "payload outlived its references");
        assert!(!self.block, "control block outlived its references");
    }

    /// Establishing ownership allocates a block with one strong reference
    /// and a live payload. Adopting a pointer and the combined allocation
    /// are the same axiom; they differ in allocation count only.
    ///
    /// ```notest
    /// assert!(!self.block);
    /// Self { strong: 1, weak: 0, payload: true, block: true }
    /// ```
    ///
    /// Sequencing property:
    ///
    /// ```
    /// shareptr::Axioms::unallocated().own().drop_strong().leak_check();
    /// ```
    pub fn own(self) -> Self
    {
        assert!(!self.block, "ownership established twice");
        Self {
            strong: 1,
            weak: 0,
            payload: true,
            block: true,
        }
    }

    /// Copying a strong reference requires a live payload.
    ///
    /// ```notest
    /// assert!(self.strong > 0);
    /// self.strong += 1;
    /// self
    /// ```
    pub fn clone_strong(mut self) -> Self
    {
        assert!(self.strong > 0 && self.payload);
        self.strong += 1;
        self
    }

    /// Demotion only needs a block, so does copying a weak reference.
    ///
    /// ```notest
    /// assert!(self.block);
    /// self.weak += 1;
    /// self
    /// ```
    pub fn weaken(mut self) -> Self
    {
        assert!(self.block);
        self.weak += 1;
        self
    }

    /// Promotion succeeds exactly when there is a strong reference left.
    ///
    /// ```notest
    /// if self.strong == 0 { Err(self) } else { Ok(self.clone_strong()) }
    /// ```
    ///
    /// Sequencing property:
    ///
    /// ```
    /// let state = shareptr::Axioms::unallocated().own().weaken().drop_strong();
    /// assert!(state.promote().is_err());
    /// state.drop_weak().leak_check();
    /// ```
    pub fn promote(self) -> Result<Self, Self>
    {
        if self.strong == 0 {
            Err(self)
        } else {
            Ok(self.clone_strong())
        }
    }

    /// Releasing the last strong reference destroys the payload, and frees
    /// the block if no weak reference remains.
    ///
    /// ```notest
    /// assert!(self.strong > 0);
    /// self.strong -= 1;
    /// if self.strong == 0 {
    ///     self.payload = false;
    ///     self.block = self.weak > 0;
    /// }
    /// self
    /// ```
    pub fn drop_strong(mut self) -> Self
    {
        assert!(self.strong > 0, "strong counter underflow");
        self.strong -= 1;
        if self.strong == 0 {
            assert!(self.payload, "payload destroyed twice");
            self.payload = false;
            self.block = self.weak > 0;
        }
        self
    }

    /// Releasing the last weak reference frees the block if the payload is
    /// already gone.
    ///
    /// ```notest
    /// assert!(self.weak > 0);
    /// self.weak -= 1;
    /// if self.weak == 0 && self.strong == 0 {
    ///     self.block = false;
    /// }
    /// self
    /// ```
    pub fn drop_weak(mut self) -> Self
    {
        assert!(self.weak > 0, "weak counter underflow");
        self.weak -= 1;
        if self.weak == 0 && self.strong == 0 {
            assert!(self.block, "control block freed twice");
            self.block = false;
        }
        self
    }

    /// The lifecycle from the widget walkthrough: two owners, one observer,
    /// the payload dies with the second owner and the block with the
    /// observer.
    ///
    /// Proof: the following doctest passes
    ///
    /// ```
    /// shareptr::Axioms::widget_lifecycle()
    /// ```
    pub fn widget_lifecycle()
    {
        let state = Self::unallocated().own().clone_strong().weaken().drop_strong();
        assert!(state.payload);
        let state = state.drop_strong();
        assert!(!state.payload && state.block);
        assert!(state.promote().is_err());
        state.drop_weak().leak_check()
    }
}

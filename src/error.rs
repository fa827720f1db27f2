use thiserror::Error;

/// Promotion of a weak reference whose payload no longer exists.
///
/// Returned by `Weak::upgrade` and `SharedFromThis::shared_from_this`.
/// Use `Weak::lock` or `Weak::expired` to avoid it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("weak reference promoted after its payload was destroyed")]
pub struct DanglingReference;

//! Scalar types shared by the whole consensus core.

/// A logical election epoch, used as a logical clock.
///
/// Terms are monotonically increasing. [`NO_TERM`] is reserved to mean
/// "no entry", e.g. the term of a log position before the first retained
/// entry.
pub type Term = i64;

/// An index into the replicated log.
///
/// The first real entry sits at index `0`; [`NO_INDEX`] denotes the
/// position before the log.
pub type LogIndex = i64;

/// Sentinel term for "no entry here".
pub const NO_TERM: Term = -1;

/// Sentinel index for "before the log".
pub const NO_INDEX: LogIndex = -1;

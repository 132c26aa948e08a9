//! Iterators that can be checkpointed and rewound.

/// An iterator with a single replay checkpoint.
///
/// `mark` pins the element most recently returned by `next` (or the start of
/// the sequence when nothing has been returned yet). After `reset`, the next
/// call to `next` returns the pinned element again and the sequence replays
/// from there. Replay is served from memory while the pages since the mark fit
/// the caller's budget; past that an implementation may read the marked page
/// back from the underlying device instead of holding it.
///
/// A new `mark` replaces the previous one. `reset` without a mark is a no-op.
/// `unmark` drops the checkpoint so the replay window can be released.
pub trait BacktrackingIterator: Iterator {
    fn mark(&mut self);
    fn reset(&mut self);
    fn unmark(&mut self);
}

use std::cell::UnsafeCell;
use std::fmt;
use std::num::NonZero;
use std::ptr::NonNull;

/// Identifies one slot of a [`Pool`][crate::Pool].
///
/// The identity of a slot is its position in the pool's storage. It is assigned when the pool is
/// created and never changes for the lifetime of the pool, regardless of how many times the slot
/// is leased, released or re-initialized.
///
/// Slot IDs are ordered. When several slots are free, the pool always hands out the one with the
/// lowest ID, so a slot that is released and immediately acquired again on an otherwise idle pool
/// is the same slot.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SlotId(usize);

impl SlotId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The position of the slot in the pool's storage, in `0..pool.size()`.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Fixed-size storage for the pooled objects.
///
/// The storage is allocated once and never resized, so the address of every slot stays the same
/// for as long as the storage exists. The storage itself performs no access control: whoever
/// owns a slot according to the pool's bookkeeping may access it through [`ptr()`][Self::ptr].
pub(crate) struct Slots<T> {
    cells: Box<[UnsafeCell<T>]>,
}

impl<T> Slots<T> {
    pub(crate) fn new_with(capacity: NonZero<usize>, mut factory: impl FnMut(SlotId) -> T) -> Self {
        let cells = (0..capacity.get())
            .map(|index| UnsafeCell::new(factory(SlotId::new(index))))
            .collect();

        Self { cells }
    }

    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns a pointer to the object in the slot, or `None` if the ID is out of range.
    ///
    /// Creating the pointer is always safe. Dereferencing it is only valid for the party that
    /// holds the slot exclusively (or for an owner of `&mut Slots`).
    #[must_use]
    pub(crate) fn ptr(&self, id: SlotId) -> Option<NonNull<T>> {
        self.cells
            .get(id.index())
            .map(|cell| NonNull::new(cell.get()).expect("UnsafeCell never returns a null pointer"))
    }

    /// Exclusive iteration over every slot, in storage order.
    ///
    /// Requires `&mut self`, which proves that nobody holds any slot.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (SlotId, &mut T)> {
        self.cells
            .iter_mut()
            .enumerate()
            .map(|(index, cell)| (SlotId::new(index), cell.get_mut()))
    }
}

impl<T> fmt::Debug for Slots<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slots")
            .field("len", &self.cells.len())
            .finish_non_exhaustive()
    }
}

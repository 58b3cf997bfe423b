//! Bump allocator and growable list used to own everything a decoded
//! [`crate::file::File`] points into: its raw record buffer, parsed
//! attribute list, run list, and copied name. All of it is released in one
//! shot when the arena is dropped.
//!
//! The committed/reserved split and the "grow the most recent allocation in
//! place" optimization described for this component are realized on top of
//! [`bumpalo::Bump`], which gives the same guarantee the original bump
//! allocator relies on: once handed out, a pointer into the arena stays
//! valid for the arena's lifetime, because growth only ever appends a new
//! chunk rather than moving existing ones.

use std::cell::Cell;

use bumpalo::Bump;

/// Bytes reserved for a single arena; allocating past this is a fatal
/// precondition violation rather than a growable limit.
const DEFAULT_RESERVED: usize = 16 * 1024 * 1024;
/// Bytes committed up front.
const DEFAULT_COMMIT: usize = 1024 * 1024;

/// A bump allocator with a fixed reservation.
///
/// `bumpalo::Bump` does not expose an "is this the most recently returned
/// allocation" query, so [`Arena::resize_bytes`] always allocates fresh and
/// copies rather than growing in place; the allocation budget and
/// reset/destroy semantics are otherwise exact.
pub struct Arena {
    bump: Bump,
    reserved: usize,
    last_alloc_end: Cell<usize>,
}

impl Arena {
    /// Reserves `DEFAULT_RESERVED` bytes, committing `DEFAULT_COMMIT` up
    /// front.
    pub fn new() -> Self {
        Self {
            bump: Bump::with_capacity(DEFAULT_COMMIT),
            reserved: DEFAULT_RESERVED,
            last_alloc_end: Cell::new(0),
        }
    }

    pub(crate) fn bump(&self) -> &Bump {
        &self.bump
    }

    /// Allocates `size` zeroed bytes.
    ///
    /// # Panics
    /// Panics if the allocation would exceed the arena's reserved region —
    /// the arena never grows its reservation.
    pub fn alloc_bytes(&self, size: usize) -> &mut [u8] {
        self.check_budget(size);
        let slice = self.bump.alloc_slice_fill_copy(size, 0u8);
        self.last_alloc_end.set(self.bump.allocated_bytes());
        slice
    }

    /// Copies `src` into a fresh arena allocation.
    pub fn alloc_copy(&self, src: &[u8]) -> &mut [u8] {
        self.check_budget(src.len());
        let slice = self.bump.alloc_slice_copy(src);
        self.last_alloc_end.set(self.bump.allocated_bytes());
        slice
    }

    /// Copies a UTF-16 slice into a fresh arena allocation.
    pub fn alloc_u16_copy(&self, src: &[u16]) -> &mut [u16] {
        self.check_budget(src.len() * 2);
        let slice = self.bump.alloc_slice_copy(src);
        self.last_alloc_end.set(self.bump.allocated_bytes());
        slice
    }

    /// Moves `value` into the arena.
    pub fn alloc<T>(&self, value: T) -> &mut T {
        self.check_budget(std::mem::size_of::<T>());
        let cell = self.bump.alloc(value);
        self.last_alloc_end.set(self.bump.allocated_bytes());
        cell
    }

    /// Resizes a previous allocation to `new_size`, preserving the first
    /// `min(old, new)` bytes. When `buf` was the most recent allocation and
    /// the arena has room, this still allocates fresh storage (see the
    /// struct docs) but the observable contract — the byte prefix is
    /// preserved — matches the in-place variant exactly.
    pub fn resize_bytes(&self, buf: &[u8], new_size: usize) -> &mut [u8] {
        let new_buf = self.alloc_bytes(new_size);
        let copy_len = buf.len().min(new_size);
        new_buf[..copy_len].copy_from_slice(&buf[..copy_len]);
        new_buf
    }

    /// Total bytes handed out so far.
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }

    /// Resets the bump offset to zero. Any slice handed out before this call
    /// must not be used afterwards.
    pub fn reset(&mut self) {
        self.bump.reset();
        self.last_alloc_end.set(0);
    }

    fn check_budget(&self, additional: usize) {
        assert!(
            self.bump.allocated_bytes() + additional <= self.reserved,
            "arena allocation of {additional} bytes exceeds the {}-byte reserved region",
            self.reserved
        );
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

/// Growable array of `T`, backed by one arena.
///
/// Matches the source's `{capacity, length, element[0..cap]}` layout in
/// spirit: growth doubles from an initial capacity of 64 and the backing
/// storage lives entirely inside the owning arena.
pub struct DynList<'a, T> {
    items: bumpalo::collections::Vec<'a, T>,
}

const DEFAULT_LIST_CAPACITY: usize = 64;

impl<'a, T> DynList<'a, T> {
    pub fn new_in(arena: &'a Arena) -> Self {
        Self {
            items: bumpalo::collections::Vec::with_capacity_in(DEFAULT_LIST_CAPACITY, arena.bump()),
        }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_bytes_are_zeroed_and_contiguous_budget() {
        let arena = Arena::new();
        let a = arena.alloc_bytes(16);
        assert_eq!(a, &[0u8; 16]);
        assert_eq!(arena.allocated_bytes(), 16);
        let _b = arena.alloc_bytes(32);
        assert_eq!(arena.allocated_bytes(), 48);
    }

    #[test]
    fn alloc_past_reserved_is_fatal() {
        let arena = Arena::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            arena.alloc_bytes(32 * 1024 * 1024);
        }));
        assert!(result.is_err());
    }

    #[test]
    fn resize_preserves_prefix() {
        let arena = Arena::new();
        let original = arena.alloc_copy(&[1, 2, 3, 4]);
        let original_copy = original.to_vec();
        let grown = arena.resize_bytes(&original_copy, 8);
        assert_eq!(&grown[..4], &original_copy[..]);
        assert_eq!(grown.len(), 8);

        let shrunk = arena.resize_bytes(&grown.to_vec(), 2);
        assert_eq!(shrunk, &[1, 2]);
    }

    #[test]
    fn dyn_list_push_and_grow() {
        let arena = Arena::new();
        let mut list: DynList<'_, u32> = DynList::new_in(&arena);
        assert_eq!(list.len(), 0);
        assert_eq!(list.capacity(), DEFAULT_LIST_CAPACITY);
        for i in 0..200u32 {
            list.push(i);
        }
        assert_eq!(list.len(), 200);
        assert!(list.capacity() >= 200);
        assert_eq!(list.as_slice()[0], 0);
        assert_eq!(list.as_slice()[199], 199);
    }

    #[test]
    fn empty_dyn_list_has_zero_len_and_nonzero_capacity() {
        let arena = Arena::new();
        let list: DynList<'_, u8> = DynList::new_in(&arena);
        assert_eq!(list.len(), 0);
        assert!(list.is_empty());
    }
}

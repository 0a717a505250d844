//! PAMU: a persistent first-fit allocator over a single seekable byte
//! medium, returning stable byte-offset addresses.
//!
//! A client stores application data at the offsets [`Pamu::allocate`]
//! returns, using ordinary positioned reads and writes against the same
//! [`Medium`]. PAMU owns only the bookkeeping interleaved between those
//! regions: two size-markers and two free-list pointers per block, plus
//! (in `DYNAMIC` mode) the medium's length.
//!
//! ```
//! use pamu::{Flags, Pamu};
//! use std::io::Cursor;
//!
//! let mut pamu = Pamu::new(Cursor::new(Vec::new()));
//! pamu.init(Flags::DYNAMIC).unwrap();
//!
//! let a = pamu.allocate(11).unwrap();
//! pamu.get_mut().get_mut()[a as usize..a as usize + 11].copy_from_slice(b"hello world");
//! pamu.free(a).unwrap();
//! ```

mod allocator;
mod block;
mod codec;
mod error;
mod freelist;
mod header;
mod iter;
mod medium;

#[cfg(test)]
mod tests;

pub use error::PamuError;
pub use header::Flags;
pub use iter::Iter;
pub use medium::Medium;

/// A handle over a [`Medium`], exposing the PAMU allocator API.
///
/// Every call re-reads the header and walks the free list or block
/// sequence as needed; `Pamu` caches nothing between calls, so the medium
/// is always the source of truth.
pub struct Pamu<M> {
	medium: M,
}

impl<M> Pamu<M> {
	/// Wraps an already-open medium. Opening/closing the underlying
	/// handle (a file, a block device) is the caller's concern; `Pamu`
	/// never does it.
	pub fn new(medium: M) -> Self {
		Pamu { medium }
	}

	/// Unwraps back into the underlying medium.
	pub fn into_inner(self) -> M {
		self.medium
	}

	/// Borrows the underlying medium.
	pub fn get_ref(&self) -> &M {
		&self.medium
	}

	/// Mutably borrows the underlying medium.
	pub fn get_mut(&mut self) -> &mut M {
		&mut self.medium
	}
}

impl<M: Medium> Pamu<M> {
	/// Prepares an uninitialized medium. Fails with
	/// [`PamuError::MediumSize`] if `flags` doesn't include
	/// [`Flags::DYNAMIC`] and the medium is too small to hold the header
	/// plus one minimum-sized block.
	pub fn init(&mut self, flags: Flags) -> Result<(), PamuError> {
		header::init(&mut self.medium, flags)
	}

	/// Allocates `size` bytes, returning the inner address of the new
	/// block. The actual INNER_SIZE may exceed `size`: requests are
	/// rounded up to fit two POINTERs, and a split that would leave too
	/// small a residual is absorbed into the allocation instead.
	pub fn allocate(&mut self, size: i64) -> Result<u64, PamuError> {
		allocator::allocate(&mut self.medium, size)
	}

	/// Releases the allocation at `inner_addr`, coalescing with adjacent
	/// FREE neighbors and, under `DYNAMIC`, truncating the medium if the
	/// freed block is now the tail.
	pub fn free(&mut self, inner_addr: u64) -> Result<(), PamuError> {
		allocator::free(&mut self.medium, inner_addr)
	}

	/// Returns the INNER_SIZE of the allocation at `inner_addr`.
	pub fn size(&mut self, inner_addr: u64) -> Result<u64, PamuError> {
		iter::size(&mut self.medium, inner_addr)
	}

	/// Returns the inner address of the next ALLOCATED block at a
	/// strictly greater outer offset, or `0` if none exists. Passing `0`
	/// returns the first allocated block.
	pub fn next(&mut self, inner_addr: u64) -> Result<u64, PamuError> {
		iter::next_alloc(&mut self.medium, inner_addr)
	}

	/// Iterates over the inner addresses of every allocated block, in
	/// medium order.
	pub fn iter(&mut self) -> Iter<'_, M> {
		Iter::new(self)
	}
}

//! Free-list navigator: locate the list head, walk it for first-fit, find
//! the tail, and find the nearest free neighbors of a given block by
//! adjacency (not via the list pointers).
//!
//! There is no persisted free-list head pointer anywhere on the medium
//! (the header is exactly magic + flags|header_len), so the head is always
//! rediscovered by scanning block-to-block from `header_len` until the
//! first FREE block is found. Once found, the rest of a first-fit search
//! follows the body-embedded next-free pointers directly, with no further
//! adjacency scanning needed.

use crate::block;
use crate::error::PamuError;
use crate::medium::Medium;

/// Finds the lowest-offset FREE block (the free-list head) by scanning
/// block-to-block from `header_len`. Returns `None` if the free list is
/// empty.
pub(crate) fn find_head<M: Medium>(medium: &mut M, header_len: u64, medium_len: u64) -> Result<Option<u64>, PamuError> {
	let mut outer = header_len;
	while outer < medium_len {
		let (size, free) = block::read_size_flags(medium, outer)?;
		if free {
			return Ok(Some(outer));
		}
		outer = block::next_adjacent(outer, size);
	}
	Ok(None)
}

/// First-fit search: walks the free list from the head via next-free
/// pointers, returning the first block whose INNER_SIZE >= `requested`.
pub(crate) fn find_fit<M: Medium>(
	medium: &mut M,
	header_len: u64,
	medium_len: u64,
	requested: u64,
) -> Result<Option<u64>, PamuError> {
	let mut cur = match find_head(medium, header_len, medium_len)? {
		Some(outer) => outer,
		None => return Ok(None),
	};
	loop {
		let (size, _) = block::read_size_flags(medium, cur)?;
		if size >= requested {
			return Ok(Some(cur));
		}
		let next = block::read_next_free(medium, cur)?;
		if next == 0 {
			return Ok(None);
		}
		cur = next;
	}
}

/// Finds the highest-offset FREE block (the free-list tail) by walking
/// next-free pointers from the head.
pub(crate) fn find_tail<M: Medium>(medium: &mut M, header_len: u64, medium_len: u64) -> Result<Option<u64>, PamuError> {
	let mut cur = match find_head(medium, header_len, medium_len)? {
		Some(outer) => outer,
		None => return Ok(None),
	};
	loop {
		let next = block::read_next_free(medium, cur)?;
		if next == 0 {
			return Ok(Some(cur));
		}
		cur = next;
	}
}

/// Walks forward by adjacency from `start` (normally `next_adjacent(O)`),
/// stopping at the first FREE block or at `medium_len`.
pub(crate) fn adjacent_free_successor<M: Medium>(medium: &mut M, start: u64, medium_len: u64) -> Result<Option<u64>, PamuError> {
	let mut outer = start;
	while outer < medium_len {
		let (size, free) = block::read_size_flags(medium, outer)?;
		if free {
			return Ok(Some(outer));
		}
		outer = block::next_adjacent(outer, size);
	}
	Ok(None)
}

/// Walks backward by adjacency from the block at `outer`, stopping at the
/// first FREE predecessor or at `header_len`.
pub(crate) fn adjacent_free_predecessor<M: Medium>(medium: &mut M, outer: u64, header_len: u64) -> Result<Option<u64>, PamuError> {
	let mut cur = outer;
	loop {
		if cur <= header_len {
			return Ok(None);
		}
		let prev = block::previous_adjacent(medium, cur, header_len)?;
		let (_, free) = block::read_size_flags(medium, prev)?;
		if free {
			return Ok(Some(prev));
		}
		cur = prev;
	}
}

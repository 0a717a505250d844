//! The allocator core: `allocate` (first-fit + split) and `free` (unlink +
//! coalesce with adjacent FREE neighbors + tail-truncate).

use crate::block;
use crate::codec::{MARKER_SIZE, POINTER_SIZE};
use crate::error::PamuError;
use crate::freelist;
use crate::header::{self, Flags};
use crate::medium::Medium;

/// Minimum INNER_SIZE of any block: a FREE block's body must hold two
/// POINTERs.
const MIN_INNER_SIZE: u64 = 2 * POINTER_SIZE;

/// A split is only worth doing if the residual FREE block can itself hold
/// two markers and two pointers; otherwise the allocation absorbs the
/// extra bytes.
const MIN_SPLIT_RESIDUAL: u64 = 2 * MARKER_SIZE + 2 * POINTER_SIZE;

pub(crate) fn allocate<M: Medium>(medium: &mut M, size: i64) -> Result<u64, PamuError> {
	if size <= 0 {
		return Err(PamuError::NegativeSize);
	}
	let hdr = header::read_header(medium)?;
	let medium_len = medium.len()?;
	let dynamic = hdr.flags.contains(Flags::DYNAMIC);
	let requested = (size as u64).max(MIN_INNER_SIZE);

	let chosen = freelist::find_fit(medium, hdr.header_len, medium_len, requested)?;

	let outer = match chosen {
		Some(outer) => outer,
		None => {
			if !dynamic {
				return Err(PamuError::MediumFull);
			}
			return grow_and_allocate(medium, medium_len, hdr.header_len, requested);
		}
	};

	let (old_size, _) = block::read_size_flags(medium, outer)?;
	let prev_free = block::read_prev_free(medium, outer)?;
	let next_free = block::read_next_free(medium, outer)?;

	if old_size >= requested + MIN_SPLIT_RESIDUAL {
		split(medium, outer, old_size, requested, prev_free, next_free)?;
	} else {
		unlink(medium, prev_free, next_free)?;
		block::write_marker(medium, outer, old_size, false)?;
	}

	Ok(outer + MARKER_SIZE)
}

/// Grows the medium by exactly `requested` bytes of new allocation and
/// returns its inner address. The new region becomes ALLOCATED directly
/// and never joins the free list, so no existing free block's pointers
/// need patching; the previous/next-free words are still staged into its
/// body before the markers flip it to ALLOCATED, even though an ALLOCATED
/// block's body is otherwise opaque client data.
fn grow_and_allocate<M: Medium>(medium: &mut M, medium_len: u64, header_len: u64, requested: u64) -> Result<u64, PamuError> {
	let outer = medium_len;
	let tail = freelist::find_tail(medium, header_len, medium_len)?.unwrap_or(0);
	let new_len = outer + 2 * MARKER_SIZE + requested;
	medium.set_len(new_len)?;
	block::write_prev_free(medium, outer, tail)?;
	block::write_next_free(medium, outer, 0)?;
	block::write_marker(medium, outer, requested, false)?;
	Ok(outer + MARKER_SIZE)
}

fn split<M: Medium>(
	medium: &mut M,
	outer: u64,
	old_size: u64,
	requested: u64,
	prev_free: u64,
	next_free: u64,
) -> Result<(), PamuError> {
	let free_outer = outer + 2 * MARKER_SIZE + requested;
	let free_size = old_size - requested - 2 * MARKER_SIZE;

	block::write_marker(medium, free_outer, free_size, true)?;
	block::write_prev_free(medium, free_outer, prev_free)?;
	block::write_next_free(medium, free_outer, next_free)?;
	if prev_free != 0 {
		block::write_next_free(medium, prev_free, free_outer)?;
	}
	if next_free != 0 {
		block::write_prev_free(medium, next_free, free_outer)?;
	}

	block::write_marker(medium, outer, requested, false)
}

fn unlink<M: Medium>(medium: &mut M, prev_free: u64, next_free: u64) -> Result<(), PamuError> {
	if prev_free != 0 {
		block::write_next_free(medium, prev_free, next_free)?;
	}
	if next_free != 0 {
		block::write_prev_free(medium, next_free, prev_free)?;
	}
	Ok(())
}

pub(crate) fn free<M: Medium>(medium: &mut M, inner_addr: u64) -> Result<(), PamuError> {
	let hdr = header::read_header(medium)?;
	let medium_len = medium.len()?;

	if inner_addr < hdr.header_len + MARKER_SIZE || inner_addr >= medium_len {
		return Err(PamuError::OutOfBounds);
	}
	let outer = inner_addr - MARKER_SIZE;
	let (size, is_free) = block::read_size_flags(medium, outer)?;
	if is_free {
		return Err(PamuError::DoubleFree);
	}
	block::trailer_check(medium, outer, size)?;

	let next_o = block::next_adjacent(outer, size);
	let succ = freelist::adjacent_free_successor(medium, next_o, medium_len)?.unwrap_or(0);
	let pred = freelist::adjacent_free_predecessor(medium, outer, hdr.header_len)?.unwrap_or(0);

	// Insert O into the free list at its natural position first, then
	// coalesce with whichever neighbor turns out to be immediately
	// adjacent. This keeps every intermediate state a valid free list.
	block::write_marker(medium, outer, size, true)?;
	block::write_prev_free(medium, outer, pred)?;
	block::write_next_free(medium, outer, succ)?;
	if succ != 0 {
		block::write_prev_free(medium, succ, outer)?;
	}
	if pred != 0 {
		block::write_next_free(medium, pred, outer)?;
	}

	let mut cur_outer = outer;
	let mut cur_size = size;

	// Coalesce with the immediate predecessor, if it is free.
	if outer > hdr.header_len {
		let immediate_pred = block::previous_adjacent(medium, outer, hdr.header_len)?;
		if pred != 0 && immediate_pred == pred {
			let (pred_size, _) = block::read_size_flags(medium, pred)?;
			let merged_size = pred_size + cur_size + 2 * MARKER_SIZE;
			// P's previous-free is left untouched; only its size and
			// next-free change.
			block::write_marker(medium, pred, merged_size, true)?;
			block::write_next_free(medium, pred, succ)?;
			if succ != 0 {
				block::write_prev_free(medium, succ, pred)?;
			}
			cur_outer = pred;
			cur_size = merged_size;
		}
	}

	// Coalesce with the immediate successor, if it is free. `next_o` is
	// the offset just past the original O; it still marks the boundary of
	// the current merged block regardless of whether predecessor-merging
	// happened, since predecessor merging only extends the block downward.
	if succ != 0 && next_o == succ {
		let (succ_size, _) = block::read_size_flags(medium, succ)?;
		let merged_size = cur_size + succ_size + 2 * MARKER_SIZE;
		let succ_next = block::read_next_free(medium, succ)?;
		block::write_next_free(medium, cur_outer, succ_next)?;
		if succ_next != 0 {
			block::write_prev_free(medium, succ_next, cur_outer)?;
		}
		block::write_marker(medium, cur_outer, merged_size, true)?;
		cur_size = merged_size;
	}

	if hdr.flags.contains(Flags::DYNAMIC) {
		let trailer_offset = cur_outer + MARKER_SIZE + cur_size;
		if trailer_offset + MARKER_SIZE == medium_len {
			let cur_prev = block::read_prev_free(medium, cur_outer)?;
			if cur_prev != 0 {
				block::write_next_free(medium, cur_prev, 0)?;
			}
			medium.set_len(cur_outer)?;
		}
	}

	Ok(())
}

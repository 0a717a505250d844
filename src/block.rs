//! Block reader: from an outer offset (the start of the leading MARKER),
//! read size/flags, compute adjacent offsets, and check trailer agreement.

use crate::codec::{decode_marker, decode_pointer, encode_marker, encode_pointer, MARKER_SIZE, POINTER_SIZE};
use crate::error::PamuError;
use crate::medium::Medium;

/// Reads the leading MARKER at outer offset `outer`, returning
/// `(inner_size, free)`.
pub(crate) fn read_size_flags<M: Medium>(medium: &mut M, outer: u64) -> Result<(u64, bool), PamuError> {
	let mut buf = [0u8; 8];
	medium.read_at(outer, &mut buf)?;
	Ok(decode_marker(buf))
}

/// Writes both the leading and trailing MARKER of a block whose outer
/// offset and inner size are given. Both markers are always written
/// together; a partial write here would be a bug.
pub(crate) fn write_marker<M: Medium>(medium: &mut M, outer: u64, inner_size: u64, free: bool) -> Result<(), PamuError> {
	let word = encode_marker(inner_size, free);
	medium.write_at(outer, &word)?;
	medium.write_at(outer + MARKER_SIZE + inner_size, &word)
}

/// Reads a POINTER word at an absolute byte offset.
pub(crate) fn read_pointer<M: Medium>(medium: &mut M, offset: u64) -> Result<u64, PamuError> {
	let mut buf = [0u8; 8];
	medium.read_at(offset, &mut buf)?;
	Ok(decode_pointer(buf))
}

/// Writes a POINTER word at an absolute byte offset.
pub(crate) fn write_pointer<M: Medium>(medium: &mut M, offset: u64, value: u64) -> Result<(), PamuError> {
	medium.write_at(offset, &encode_pointer(value))
}

/// Offset of a FREE block's previous-free POINTER, given its outer offset.
pub(crate) fn prev_free_offset(outer: u64) -> u64 {
	outer + MARKER_SIZE
}

/// Offset of a FREE block's next-free POINTER, given its outer offset.
pub(crate) fn next_free_offset(outer: u64) -> u64 {
	outer + MARKER_SIZE + POINTER_SIZE
}

pub(crate) fn read_prev_free<M: Medium>(medium: &mut M, outer: u64) -> Result<u64, PamuError> {
	read_pointer(medium, prev_free_offset(outer))
}

pub(crate) fn read_next_free<M: Medium>(medium: &mut M, outer: u64) -> Result<u64, PamuError> {
	read_pointer(medium, next_free_offset(outer))
}

pub(crate) fn write_prev_free<M: Medium>(medium: &mut M, outer: u64, value: u64) -> Result<(), PamuError> {
	write_pointer(medium, prev_free_offset(outer), value)
}

pub(crate) fn write_next_free<M: Medium>(medium: &mut M, outer: u64, value: u64) -> Result<(), PamuError> {
	write_pointer(medium, next_free_offset(outer), value)
}

/// Outer offset of the block immediately following the one at `outer`
/// with inner size `size`.
pub(crate) fn next_adjacent(outer: u64, size: u64) -> u64 {
	outer + size + 2 * MARKER_SIZE
}

/// Outer offset of the block immediately preceding the one at `outer`.
/// Defined only when `outer > header_len`.
pub(crate) fn previous_adjacent<M: Medium>(medium: &mut M, outer: u64, header_len: u64) -> Result<u64, PamuError> {
	if outer <= header_len {
		return Err(PamuError::OutOfBounds);
	}
	let (prev_size, _) = read_size_flags(medium, outer - MARKER_SIZE)?;
	Ok(outer - prev_size - 2 * MARKER_SIZE)
}

/// Verifies that the trailing MARKER of the block at `outer` (with inner
/// size `size`) equals the leading MARKER bit-for-bit.
pub(crate) fn trailer_check<M: Medium>(medium: &mut M, outer: u64, size: u64) -> Result<(), PamuError> {
	let mut leading = [0u8; 8];
	medium.read_at(outer, &mut leading)?;
	let mut trailing = [0u8; 8];
	medium.read_at(outer + MARKER_SIZE + size, &mut trailing)?;
	if leading != trailing {
		return Err(PamuError::InvalidAddress);
	}
	Ok(())
}

//! Header codec: magic verification, feature flags, and `init`.

use core::ops::BitOr;

use crate::codec::{MARKER_SIZE, POINTER_SIZE};
use crate::error::PamuError;
use crate::medium::Medium;

const MAGIC: [u8; 4] = *b"PAMU";

/// Fixed header length in bytes: magic plus the flags|header-length word.
pub(crate) const HEADER_LEN: u64 = 8;

/// Bit 31 of the flags|header-length word. The only feature flag this
/// format version defines.
const DYNAMIC_BIT: u32 = 1 << 31;

/// Feature flags packed into the top bits of the header's MERGED word.
///
/// Only [`Flags::DYNAMIC`] is currently defined; unknown bits (there are
/// none yet) would round-trip through `bits()`/`from_bits` unmodified in a
/// future format revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags(u32);

impl Flags {
	/// No feature flags set.
	pub const DEFAULT: Flags = Flags(0);
	/// Permit the medium to grow on `allocate` and shrink on `free` of the
	/// tail block.
	pub const DYNAMIC: Flags = Flags(DYNAMIC_BIT);

	/// Returns whether `self` has every bit set that `other` has set.
	pub fn contains(self, other: Flags) -> bool {
		self.0 & other.0 == other.0
	}

	/// The raw bit pattern.
	pub fn bits(self) -> u32 {
		self.0
	}

	fn from_bits(bits: u32) -> Flags {
		Flags(bits & DYNAMIC_BIT)
	}
}

impl BitOr for Flags {
	type Output = Flags;

	fn bitor(self, rhs: Flags) -> Flags {
		Flags(self.0 | rhs.0)
	}
}

pub(crate) struct Header {
	pub(crate) flags: Flags,
	pub(crate) header_len: u64,
}

/// Reads and verifies the 8-byte header. Fails with
/// [`PamuError::MediumUninitialized`] if the magic doesn't match.
pub(crate) fn read_header<M: Medium>(medium: &mut M) -> Result<Header, PamuError> {
	let mut buf = [0u8; 8];
	medium.read_at(0, &mut buf)?;
	if buf[0..4] != MAGIC {
		return Err(PamuError::MediumUninitialized);
	}
	let merged = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
	let flags = Flags::from_bits(merged);
	let header_len = (merged & !DYNAMIC_BIT) as u64;
	Ok(Header { flags, header_len })
}

/// Prepares an uninitialized medium: writes the header and, when `DYNAMIC`
/// is clear, a single whole-medium FREE block spanning the rest of it.
pub(crate) fn init<M: Medium>(medium: &mut M, flags: Flags) -> Result<(), PamuError> {
	let dynamic = flags.contains(Flags::DYNAMIC);
	let medium_len = medium.len()?;

	let min_len = HEADER_LEN + 2 * MARKER_SIZE + 2 * POINTER_SIZE;
	if !dynamic && medium_len < min_len {
		return Err(PamuError::MediumSize);
	}

	let merged = flags.bits() | (HEADER_LEN as u32);
	let mut buf = [0u8; 8];
	buf[0..4].copy_from_slice(&MAGIC);
	buf[4..8].copy_from_slice(&merged.to_be_bytes());
	medium.write_at(0, &buf)?;

	if dynamic {
		medium.set_len(HEADER_LEN)?;
	} else {
		let inner_size = medium_len - HEADER_LEN - 2 * MARKER_SIZE;
		crate::block::write_marker(medium, HEADER_LEN, inner_size, true)?;
		crate::block::write_pointer(medium, HEADER_LEN + MARKER_SIZE, 0)?;
		crate::block::write_pointer(medium, HEADER_LEN + MARKER_SIZE + POINTER_SIZE, 0)?;
	}

	Ok(())
}

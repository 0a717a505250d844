use core::fmt::{self, Display, Formatter};

/// The fixed PAMU error taxonomy. Every internal helper returns one of
/// these sentinels to its caller; there is no local recovery and no
/// rollback of partial writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PamuError {
	/// A non-dynamic medium is too small to hold the header plus one
	/// minimum-sized block.
	MediumSize,
	/// A seek against the medium failed or landed at an unexpected offset.
	Seek,
	/// An allocation was requested with a size <= 0.
	NegativeSize,
	/// A read was short, the medium was truncated, or a seek landed at an
	/// unexpected offset while reading.
	ReadMalformed,
	/// The medium's magic bytes do not read "PAMU".
	MediumUninitialized,
	/// A non-dynamic medium has no free block large enough to satisfy a
	/// request.
	MediumFull,
	/// A positioned write against the medium failed.
	Write,
	/// An address lies outside the tiled region of the medium.
	OutOfBounds,
	/// A block's leading and trailing markers disagree.
	InvalidAddress,
	/// `free()` was called on a block whose FREE bit is already set.
	DoubleFree,
}

impl Display for PamuError {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		let msg = match self {
			Self::MediumSize => "medium too small to hold header and one block",
			Self::Seek => "seek against medium failed",
			Self::NegativeSize => "allocation size must be positive",
			Self::ReadMalformed => "short read or unexpected seek offset",
			Self::MediumUninitialized => "medium magic does not read PAMU",
			Self::MediumFull => "no free block large enough and medium is not dynamic",
			Self::Write => "write against medium failed",
			Self::OutOfBounds => "address is outside the tiled region",
			Self::InvalidAddress => "leading and trailing markers disagree",
			Self::DoubleFree => "block is already free",
		};
		f.write_str(msg)
	}
}

impl core::error::Error for PamuError {}

//! The storage medium abstraction: positioned read/write, length, and
//! truncate/grow over a seekable byte stream. PAMU never trusts the
//! stream's current cursor position between calls; every access here
//! seeks explicitly first.

use crate::error::PamuError;

/// A seekable, read/write, optionally truncatable byte stream managed as a
/// PAMU arena.
///
/// Implementors are not required to be `Sync`; `Pamu<M>` takes `&mut self`
/// for every call, so there is never more than one in-flight operation
/// against a given medium from a single handle.
pub trait Medium {
	/// Reads `buf.len()` bytes starting at `offset`, failing with
	/// [`PamuError::ReadMalformed`] on a short read or a seek that lands
	/// somewhere other than `offset`.
	fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), PamuError>;

	/// Writes all of `buf` starting at `offset`, failing with
	/// [`PamuError::Write`] (or [`PamuError::Seek`] if positioning fails).
	fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<(), PamuError>;

	/// Returns the current length of the medium in bytes.
	fn len(&mut self) -> Result<u64, PamuError>;

	/// Grows or shrinks the medium to exactly `len` bytes.
	fn set_len(&mut self, len: u64) -> Result<(), PamuError>;
}

#[cfg(feature = "std")]
mod std_impls {
	use super::Medium;
	use crate::error::PamuError;
	use std::fs::File;
	use std::io::{Cursor, Read, Seek, SeekFrom, Write};

	fn seek_to(stream: &mut impl Seek, offset: u64) -> Result<(), PamuError> {
		let landed = stream.seek(SeekFrom::Start(offset)).map_err(|_| PamuError::Seek)?;
		if landed != offset {
			return Err(PamuError::Seek);
		}
		Ok(())
	}

	impl Medium for File {
		fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), PamuError> {
			seek_to(self, offset)?;
			self.read_exact(buf).map_err(|_| PamuError::ReadMalformed)
		}

		fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<(), PamuError> {
			seek_to(self, offset)?;
			self.write_all(buf).map_err(|_| PamuError::Write)
		}

		fn len(&mut self) -> Result<u64, PamuError> {
			self.seek(SeekFrom::End(0)).map_err(|_| PamuError::Seek)
		}

		fn set_len(&mut self, len: u64) -> Result<(), PamuError> {
			File::set_len(self, len).map_err(|_| PamuError::Write)
		}
	}

	/// An in-memory medium, primarily for tests and for callers who want a
	/// scratch PAMU arena without touching disk.
	impl Medium for Cursor<Vec<u8>> {
		fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), PamuError> {
			seek_to(self, offset)?;
			self.read_exact(buf).map_err(|_| PamuError::ReadMalformed)
		}

		fn write_at(&mut self, offset: u64, buf: &[u8]) -> Result<(), PamuError> {
			seek_to(self, offset)?;
			self.write_all(buf).map_err(|_| PamuError::Write)
		}

		fn len(&mut self) -> Result<u64, PamuError> {
			Ok(self.get_ref().len() as u64)
		}

		fn set_len(&mut self, len: u64) -> Result<(), PamuError> {
			let len = len as usize;
			let pos = self.position();
			self.get_mut().resize(len, 0);
			if pos > len as u64 {
				self.set_position(len as u64);
			}
			Ok(())
		}
	}
}

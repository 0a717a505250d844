use std::io::Cursor;

use crate::{block, freelist, header, Flags, Medium, Pamu, PamuError};

type Mem = Cursor<Vec<u8>>;

fn medium_of_len(len: usize) -> Mem {
	Cursor::new(vec![0u8; len])
}

/// A fsck-like scan checking tiling, marker symmetry, free-list
/// completeness and ordering, and the dynamic-tail invariant against the
/// raw bytes of a medium.
fn fsck(medium: &mut Mem) {
	let hdr = header::read_header(medium).expect("magic and header length must verify");
	assert_eq!(hdr.header_len, 8);
	let medium_len = medium.len().unwrap();

	let mut offsets = Vec::new();
	let mut free_offsets = Vec::new();
	let mut outer = hdr.header_len;
	while outer < medium_len {
		let (size, free) = block::read_size_flags(medium, outer).unwrap();
		block::trailer_check(medium, outer, size).expect("leading/trailing markers must agree");
		if free {
			assert!(size >= 16, "FREE block body must hold two pointers");
			free_offsets.push(outer);
		}
		offsets.push(outer);
		outer = block::next_adjacent(outer, size);
	}
	assert_eq!(outer, medium_len, "blocks must tile the medium with no gaps or overlap");

	for (i, &o) in offsets.iter().enumerate() {
		let (_, free) = block::read_size_flags(medium, o).unwrap();
		if !free {
			continue;
		}
		if i > 0 {
			let (_, prev_free) = block::read_size_flags(medium, offsets[i - 1]).unwrap();
			assert!(!prev_free, "no two FREE blocks may be adjacent");
		}
		if i + 1 < offsets.len() {
			let (_, next_free) = block::read_size_flags(medium, offsets[i + 1]).unwrap();
			assert!(!next_free, "no two FREE blocks may be adjacent");
		}
	}

	let mut walked = Vec::new();
	if let Some(head) = freelist::find_head(medium, hdr.header_len, medium_len).unwrap() {
		assert_eq!(block::read_prev_free(medium, head).unwrap(), 0, "free-list head has no predecessor");
		let mut cur = head;
		loop {
			walked.push(cur);
			let next = block::read_next_free(medium, cur).unwrap();
			if next == 0 {
				break;
			}
			assert!(next > cur, "next-free must strictly increase");
			assert_eq!(block::read_prev_free(medium, next).unwrap(), cur, "prev-free must be the inverse of next-free");
			cur = next;
		}
	}
	assert_eq!(walked, free_offsets, "free list must reach exactly the set of FREE blocks, in order");

	if hdr.flags.contains(Flags::DYNAMIC) {
		if let Some(&last) = offsets.last() {
			let (_, free) = block::read_size_flags(medium, last).unwrap();
			assert!(!free, "the last block must never be FREE under DYNAMIC");
		}
	}
}

#[test]
fn init_dynamic_on_empty_medium_has_length_eight() {
	let mut pamu = Pamu::new(medium_of_len(0));
	pamu.init(Flags::DYNAMIC).unwrap();
	let buf = pamu.into_inner().into_inner();
	assert_eq!(buf.len(), 8);
	assert_eq!(&buf[0..4], b"PAMU");
	assert_eq!(&buf[4..8], &0x8000_0008u32.to_be_bytes());
}

#[test]
fn init_static_medium_yields_one_whole_medium_free_block() {
	let mut pamu = Pamu::new(medium_of_len(4096));
	pamu.init(Flags::DEFAULT).unwrap();
	let medium = pamu.get_mut();
	assert_eq!(medium.len().unwrap(), 4096);
	let (size, free) = block::read_size_flags(medium, 8).unwrap();
	assert!(free);
	assert_eq!(size, 4096 - 8 - 16);
	assert_eq!(block::read_prev_free(medium, 8).unwrap(), 0);
	assert_eq!(block::read_next_free(medium, 8).unwrap(), 0);
	fsck(pamu.get_mut());
}

#[test]
fn dynamic_medium_grows_as_allocations_are_made() {
	let mut pamu = Pamu::new(medium_of_len(0));
	pamu.init(Flags::DYNAMIC).unwrap();
	let a = pamu.allocate(64).unwrap();
	let b = pamu.allocate(64).unwrap();
	assert_eq!(a, 16);
	assert_eq!(b, 96);
	// one footprint is 2*MARKER_SIZE + inner_size = 8 + 64 + 8 = 80 bytes;
	// two allocations plus the 8-byte header is 8 + 2*80 = 168.
	assert_eq!(pamu.get_mut().len().unwrap(), 168);
	fsck(pamu.get_mut());
}

#[test]
fn tail_truncation_after_interleaved_frees() {
	let mut pamu = Pamu::new(medium_of_len(0));
	pamu.init(Flags::DYNAMIC).unwrap();
	let addrs: Vec<u64> = (0..7).map(|_| pamu.allocate(64).unwrap()).collect();
	assert_eq!(addrs, vec![16, 96, 176, 256, 336, 416, 496]);

	pamu.free(addrs[0]).unwrap();
	pamu.free(addrs[2]).unwrap();
	pamu.free(addrs[4]).unwrap();
	pamu.free(addrs[6]).unwrap();
	pamu.free(addrs[3]).unwrap();

	// #6 was the tail; its removal truncates 80 bytes off the 568-byte medium.
	assert_eq!(pamu.get_mut().len().unwrap(), 488);

	assert_eq!(pamu.size(addrs[1]).unwrap(), 64);
	assert_eq!(pamu.size(addrs[5]).unwrap(), 64);

	let remaining: Vec<u64> = pamu.iter().collect::<Result<_, _>>().unwrap();
	assert_eq!(remaining, vec![addrs[1], addrs[5]]);

	fsck(pamu.get_mut());
}

#[test]
fn freeing_adjacent_blocks_coalesces_into_the_tail_residual() {
	let mut pamu = Pamu::new(medium_of_len(4096));
	pamu.init(Flags::DEFAULT).unwrap();
	let a0 = pamu.allocate(64).unwrap();
	let a1 = pamu.allocate(64).unwrap();
	let a2 = pamu.allocate(64).unwrap();

	pamu.free(a1).unwrap();
	fsck(pamu.get_mut());
	// freeing the middle block of three leaves two disjoint free regions:
	// the 64-byte gap and the large tail residual.
	{
		let medium = pamu.get_mut();
		let head = freelist::find_head(medium, 8, medium.len().unwrap()).unwrap().unwrap();
		assert_eq!(block::read_next_free(medium, head).unwrap() != 0, true);
	}

	pamu.free(a2).unwrap();
	fsck(pamu.get_mut());

	// #1, #2, and the old tail residual all coalesce into one free block;
	// #0 remains the sole allocation.
	let remaining: Vec<u64> = pamu.iter().collect::<Result<_, _>>().unwrap();
	assert_eq!(remaining, vec![a0]);

	let medium = pamu.get_mut();
	let medium_len = medium.len().unwrap();
	let head = freelist::find_head(medium, 8, medium_len).unwrap().unwrap();
	assert_eq!(block::read_next_free(medium, head).unwrap(), 0, "only one free block should remain");
}

#[test]
fn freeing_all_allocations_in_reverse_shrinks_medium_to_header() {
	let mut pamu = Pamu::new(medium_of_len(0));
	pamu.init(Flags::DYNAMIC).unwrap();
	let addrs: Vec<u64> = (0..10).map(|_| pamu.allocate(32).unwrap()).collect();
	for &a in addrs.iter().rev() {
		pamu.free(a).unwrap();
	}
	assert_eq!(pamu.get_mut().len().unwrap(), 8);
}

#[test]
fn payload_round_trips_across_alloc_and_free() {
	let mut pamu = Pamu::new(medium_of_len(0));
	pamu.init(Flags::DYNAMIC).unwrap();

	let greeting = pamu.allocate(12).unwrap();
	pamu.get_mut().write_at(greeting, b"hello world!").unwrap();

	let farewell = pamu.allocate(9).unwrap();
	pamu.get_mut().write_at(farewell, b"goodbye!\0").unwrap();

	let mut buf = [0u8; 12];
	pamu.get_mut().read_at(greeting, &mut buf).unwrap();
	assert_eq!(&buf, b"hello world!");

	pamu.free(greeting).unwrap();

	let mut buf = [0u8; 9];
	pamu.get_mut().read_at(farewell, &mut buf).unwrap();
	assert_eq!(&buf, b"goodbye!\0");

	fsck(pamu.get_mut());
}

#[test]
fn allocate_rounds_small_requests_up_to_two_pointers() {
	let mut pamu = Pamu::new(medium_of_len(0));
	pamu.init(Flags::DYNAMIC).unwrap();
	let addr = pamu.allocate(1).unwrap();
	assert_eq!(pamu.size(addr).unwrap(), 16);
}

#[test]
fn allocate_rejects_non_positive_size() {
	let mut pamu = Pamu::new(medium_of_len(0));
	pamu.init(Flags::DYNAMIC).unwrap();
	assert_eq!(pamu.allocate(0), Err(PamuError::NegativeSize));
	assert_eq!(pamu.allocate(-1), Err(PamuError::NegativeSize));
}

#[test]
fn static_medium_reports_full_when_exhausted() {
	let mut pamu = Pamu::new(medium_of_len(104)); // header + one 80-byte block
	pamu.init(Flags::DEFAULT).unwrap();
	let addr = pamu.allocate(80).unwrap();
	assert_eq!(pamu.allocate(1), Err(PamuError::MediumFull));
	pamu.free(addr).unwrap();
	assert!(pamu.allocate(1).is_ok());
}

#[test]
fn init_rejects_undersized_static_medium() {
	let mut pamu = Pamu::new(medium_of_len(16));
	assert_eq!(pamu.init(Flags::DEFAULT), Err(PamuError::MediumSize));
}

#[test]
fn operations_on_uninitialized_medium_fail() {
	let mut pamu = Pamu::new(medium_of_len(64));
	assert_eq!(pamu.allocate(8), Err(PamuError::MediumUninitialized));
}

#[test]
fn free_rejects_double_free() {
	let mut pamu = Pamu::new(medium_of_len(0));
	pamu.init(Flags::DYNAMIC).unwrap();
	let addr = pamu.allocate(32).unwrap();
	pamu.free(addr).unwrap();
	assert_eq!(pamu.free(addr), Err(PamuError::DoubleFree));
}

#[test]
fn free_rejects_out_of_bounds_address() {
	let mut pamu = Pamu::new(medium_of_len(0));
	pamu.init(Flags::DYNAMIC).unwrap();
	let addr = pamu.allocate(32).unwrap();
	assert_eq!(pamu.free(0), Err(PamuError::OutOfBounds));
	assert_eq!(pamu.free(addr + 10_000), Err(PamuError::OutOfBounds));
}

#[test]
fn free_rejects_corrupted_trailer() {
	let mut pamu = Pamu::new(medium_of_len(0));
	pamu.init(Flags::DYNAMIC).unwrap();
	let addr = pamu.allocate(32).unwrap();
	// Corrupt the trailing marker so it disagrees with the leading one.
	pamu.get_mut().write_at(addr + 32, &0u64.to_be_bytes()).unwrap();
	assert_eq!(pamu.free(addr), Err(PamuError::InvalidAddress));
}

#[test]
fn next_enumerates_allocations_in_medium_order_and_skips_free() {
	let mut pamu = Pamu::new(medium_of_len(0));
	pamu.init(Flags::DYNAMIC).unwrap();
	let a = pamu.allocate(16).unwrap();
	let b = pamu.allocate(16).unwrap();
	let c = pamu.allocate(16).unwrap();
	pamu.free(b).unwrap();

	assert_eq!(pamu.next(0).unwrap(), a);
	assert_eq!(pamu.next(a).unwrap(), c);
	assert_eq!(pamu.next(c).unwrap(), 0);
}

#[test]
fn split_leaves_a_correctly_sized_residual_free_block() {
	let mut pamu = Pamu::new(medium_of_len(4096));
	pamu.init(Flags::DEFAULT).unwrap();
	let addr = pamu.allocate(64).unwrap();
	assert_eq!(pamu.size(addr).unwrap(), 64);
	fsck(pamu.get_mut());

	let medium = pamu.get_mut();
	// residual free block's leading marker sits right after the
	// allocation's body and its own trailing marker.
	let residual_outer = addr + 64 + 8;
	let (residual_size, free) = block::read_size_flags(medium, residual_outer).unwrap();
	assert!(free);
	assert_eq!(residual_size, 4096 - 8 - 16 - 64 - 16);
}

#[test]
fn undersized_residual_is_absorbed_instead_of_split() {
	// One free block of INNER_SIZE=72. Requesting 50 leaves a residual of
	// only 22 bytes (72 - 50), short of MIN_SPLIT_RESIDUAL (32), so the
	// whole block is handed over and size() reports the actual 72 rather
	// than the requested 50.
	let mut pamu = Pamu::new(medium_of_len(8 + 16 + 72));
	pamu.init(Flags::DEFAULT).unwrap();
	let addr = pamu.allocate(50).unwrap();
	assert_eq!(pamu.size(addr).unwrap(), 72);
	fsck(pamu.get_mut());

	// The whole medium is now one allocation; nothing remains on the free list.
	let medium = pamu.get_mut();
	let medium_len = medium.len().unwrap();
	assert_eq!(freelist::find_head(medium, 8, medium_len).unwrap(), None);
}

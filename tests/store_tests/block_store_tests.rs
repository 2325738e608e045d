//! Tests for BlockStore
//!
//! These tests verify:
//! - First-fit contiguous allocation inside each pool
//! - Reclaiming freed space
//! - Extent-relative, bounds-checked I/O on a file-backed device
//! - Live extents stay pairwise disjoint under any create/free sequence

use proptest::prelude::*;
use tempfile::TempDir;
use vdisk::device::{FileDevice, MemDevice};
use vdisk::store::{BlockStore, Extent, Geometry, Pool};
use vdisk::DiskError;

// =============================================================================
// Helper Functions
// =============================================================================

fn geometry(total_blocks: u64, swap_blocks: u64) -> Geometry {
    Geometry {
        block_bytes: 4096,
        total_blocks,
        swap_blocks,
    }
}

fn mem_store(total_blocks: u64, swap_blocks: u64) -> BlockStore {
    let geo = geometry(total_blocks, swap_blocks);
    BlockStore::new(geo, Box::new(MemDevice::new(geo.device_bytes()))).unwrap()
}

fn assert_disjoint(extents: &[Extent]) {
    for (i, a) in extents.iter().enumerate() {
        for b in &extents[i + 1..] {
            assert!(!a.overlaps(b), "{:?} overlaps {:?}", a, b);
        }
    }
}

// =============================================================================
// Allocation Tests
// =============================================================================

#[test]
fn test_allocation_is_lowest_address_first() {
    let mut store = mem_store(32, 8);

    let a = store.allocate_contiguous(Pool::User, 4).unwrap();
    let b = store.allocate_contiguous(Pool::User, 4).unwrap();

    assert_eq!(a, Extent::new(0, 4));
    assert_eq!(b, Extent::new(4, 4));
}

#[test]
fn test_swap_allocation_starts_at_boundary() {
    let mut store = mem_store(32, 8);

    let run = store.allocate_contiguous(Pool::Swap, 3).unwrap();

    assert_eq!(run, Extent::new(24, 3));
    assert_eq!(store.free_blocks(Pool::User), 24);
    assert_eq!(store.free_blocks(Pool::Swap), 5);
}

#[test]
fn test_user_pool_never_spills_into_swap() {
    let mut store = mem_store(32, 8);

    let result = store.allocate_contiguous(Pool::User, 25);

    assert!(matches!(
        result,
        Err(DiskError::InsufficientSpace {
            pool: Pool::User,
            blocks: 25
        })
    ));
    assert_eq!(store.free_blocks(Pool::User), 24);
}

#[test]
fn test_failed_allocation_marks_nothing() {
    let mut store = mem_store(16, 4);
    store.allocate_contiguous(Pool::User, 5).unwrap();
    let before = store.free_blocks(Pool::User);

    assert!(store.allocate_contiguous(Pool::User, 8).is_err());

    assert_eq!(store.free_blocks(Pool::User), before);
}

#[test]
fn test_freed_hole_is_reused_first() {
    let mut store = mem_store(32, 8);
    let a = store.allocate_contiguous(Pool::User, 4).unwrap();
    let _b = store.allocate_contiguous(Pool::User, 4).unwrap();

    store.free(a);
    let c = store.allocate_contiguous(Pool::User, 3).unwrap();

    assert_eq!(c.start_block, 0);
}

#[test]
fn test_fragmented_space_cannot_hold_large_extent() {
    let mut store = mem_store(12, 2);
    let extents: Vec<_> = (0..5)
        .map(|_| store.allocate_contiguous(Pool::User, 2).unwrap())
        .collect();
    store.free(extents[1]);
    store.free(extents[3]);

    // Four free blocks, but no run of three
    assert_eq!(store.free_blocks(Pool::User), 4);
    assert!(store.allocate_contiguous(Pool::User, 3).is_err());
}

#[test]
fn test_free_restores_count() {
    let mut store = mem_store(64, 16);
    let before = store.free_blocks(Pool::User);

    let extent = store.allocate_contiguous(Pool::User, 10).unwrap();
    store.free(extent);

    assert_eq!(store.free_blocks(Pool::User), before);
}

// =============================================================================
// I/O Tests
// =============================================================================

#[test]
fn test_file_backed_io_lands_at_extent_offset() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("disk.img");
    let geo = geometry(16, 4);
    let device = FileDevice::open(&path, geo.device_bytes()).unwrap();
    let mut store = BlockStore::new(geo, Box::new(device)).unwrap();

    let _pad = store.allocate_contiguous(Pool::User, 2).unwrap();
    let extent = store.allocate_contiguous(Pool::User, 1).unwrap();
    store.write_blocks(&extent, 8, b"payload!").unwrap();
    store.sync().unwrap();

    let raw = std::fs::read(&path).unwrap();
    assert_eq!(&raw[2 * 4096 + 8..2 * 4096 + 16], b"payload!");
}

#[test]
fn test_read_past_extent_is_out_of_range() {
    let mut store = mem_store(16, 4);
    let extent = store.allocate_contiguous(Pool::User, 2).unwrap();

    let result = store.read_blocks(&extent, 8190, 4);

    assert!(matches!(
        result,
        Err(DiskError::OutOfRange {
            offset: 8190,
            len: 4,
            capacity: 8192
        })
    ));
}

#[test]
fn test_elements_round_trip_across_block_boundary() {
    let mut store = mem_store(16, 4);
    let extent = store.allocate_contiguous(Pool::User, 2).unwrap();

    store.write_elements(&extent, 1022, &[i32::MIN, -1, 0, i32::MAX]).unwrap();
    let mut out = Vec::new();
    store.read_elements(&extent, 1022, 4, &mut out).unwrap();

    assert_eq!(out, vec![i32::MIN, -1, 0, i32::MAX]);
}

// =============================================================================
// Property Tests
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    Alloc(Pool, u64),
    Free(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1u64..12).prop_map(|n| Op::Alloc(Pool::User, n)),
        (1u64..6).prop_map(|n| Op::Alloc(Pool::Swap, n)),
        (0usize..32).prop_map(Op::Free),
    ]
}

proptest! {
    #[test]
    fn prop_live_extents_disjoint(ops in prop::collection::vec(op_strategy(), 1..80)) {
        let mut store = mem_store(96, 24);
        let mut live: Vec<(Pool, Extent)> = Vec::new();

        for op in ops {
            match op {
                Op::Alloc(pool, n) => {
                    if let Ok(extent) = store.allocate_contiguous(pool, n) {
                        let range = store.geometry().pool_range(pool);
                        prop_assert!(extent.start_block >= range.start);
                        prop_assert!(extent.end_block() <= range.end);
                        live.push((pool, extent));
                    }
                }
                Op::Free(i) => {
                    if !live.is_empty() {
                        let (_, extent) = live.remove(i % live.len());
                        store.free(extent);
                    }
                }
            }

            let extents: Vec<Extent> = live.iter().map(|(_, e)| *e).collect();
            assert_disjoint(&extents);

            let used_user: u64 = live
                .iter()
                .filter(|(p, _)| *p == Pool::User)
                .map(|(_, e)| e.block_count)
                .sum();
            prop_assert_eq!(store.free_blocks(Pool::User), 72 - used_user);
        }
    }
}

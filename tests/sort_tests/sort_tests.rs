//! Tests for sorting
//!
//! These tests verify:
//! - The in-memory/external switch at exactly K elements
//! - Sorted output is a permutation of the input, in signed order
//! - Swap blocks and the scratch lease are returned on success and failure
//! - A failed sort leaves the file untouched

use proptest::prelude::*;
use vdisk::device::MemDevice;
use vdisk::scratch::{ScratchPool, ScratchProvider};
use vdisk::sort::SortEngine;
use vdisk::store::{BlockStore, Geometry, ELEMENT_BYTES};
use vdisk::{Config, DiskError, Pool, SortStrategy, VirtualDisk};

// =============================================================================
// Helper Functions
// =============================================================================

const BLOCK: u64 = 4096;

/// One run fills exactly one block
const K: u64 = 1024;

/// 256 blocks, the top 64 reserved for swap
fn config() -> Config {
    Config::builder()
        .device_bytes(256 * BLOCK)
        .swap_bytes(64 * BLOCK)
        .scratch_capacity(K as usize)
        .max_files(16)
        .seed(1234)
        .build()
}

/// Disk whose scratch lease can be observed through the returned pool
fn setup_disk() -> (VirtualDisk, ScratchPool) {
    let pool = ScratchPool::new(K as usize, 1);
    let disk = VirtualDisk::in_memory(config())
        .unwrap()
        .with_scratch_provider(Box::new(pool.handle()));
    (disk, pool)
}

fn read_signed(disk: &mut VirtualDisk, name: &str) -> Vec<i32> {
    let len = disk.lookup(name).unwrap().element_count();
    if len == 0 {
        return Vec::new();
    }
    disk.read(name, 0, len - 1)
        .unwrap()
        .into_iter()
        .map(|v| v as i32)
        .collect()
}

fn assert_sorted_permutation(before: &[i32], after: &[i32]) {
    assert!(
        after.windows(2).all(|w| w[0] <= w[1]),
        "output is not in signed order"
    );
    let mut expected = before.to_vec();
    expected.sort_unstable();
    assert_eq!(after, expected.as_slice());
}

fn sort_and_check(element_count: u64) -> SortStrategy {
    let (mut disk, pool) = setup_disk();
    disk.create("data", element_count).unwrap();
    let before = read_signed(&mut disk, "data");
    let swap_free = disk.free_blocks(Pool::Swap);

    let report = disk.sort("data").unwrap();

    assert_eq!(report.elements, element_count);
    assert_sorted_permutation(&before, &read_signed(&mut disk, "data"));
    assert_eq!(disk.free_blocks(Pool::Swap), swap_free);
    assert_eq!(pool.available(), 1);
    report.strategy
}

// =============================================================================
// Threshold Tests
// =============================================================================

#[test]
fn test_below_capacity_sorts_in_memory() {
    assert_eq!(sort_and_check(K - 1), SortStrategy::InMemory);
}

#[test]
fn test_exactly_capacity_sorts_in_memory() {
    assert_eq!(sort_and_check(K), SortStrategy::InMemory);
}

#[test]
fn test_one_over_capacity_goes_external() {
    assert_eq!(
        sort_and_check(K + 1),
        SortStrategy::External {
            runs: 2,
            merge_rounds: 1
        }
    );
}

#[test]
fn test_uneven_run_count() {
    assert_eq!(
        sort_and_check(3 * K + 2),
        SortStrategy::External {
            runs: 4,
            merge_rounds: 2
        }
    );
}

#[test]
fn test_many_runs() {
    // 21 runs: the odd run passes through several rounds
    assert_eq!(
        sort_and_check(20 * K + 17),
        SortStrategy::External {
            runs: 21,
            merge_rounds: 5
        }
    );
}

#[test]
fn test_smallest_accepted_swap_sorts_two_runs() {
    // Four swap blocks: two one-block runs plus their two-block merge
    for element_count in [K + 1, 2 * K] {
        let config = Config::builder()
            .device_bytes(64 * BLOCK)
            .swap_bytes(4 * BLOCK)
            .scratch_capacity(K as usize)
            .seed(5)
            .build();
        config.validate().unwrap();
        let mut disk = VirtualDisk::in_memory(config).unwrap();
        disk.create("data", element_count).unwrap();
        let before = read_signed(&mut disk, "data");

        let report = disk.sort("data").unwrap();

        assert_eq!(
            report.strategy,
            SortStrategy::External {
                runs: 2,
                merge_rounds: 1
            }
        );
        assert_sorted_permutation(&before, &read_signed(&mut disk, "data"));
        assert_eq!(disk.free_blocks(Pool::Swap), 4);
    }
}

#[test]
fn test_single_element_and_empty() {
    assert_eq!(sort_and_check(1), SortStrategy::InMemory);
    assert_eq!(sort_and_check(0), SortStrategy::InMemory);
}

// =============================================================================
// Repeatability Tests
// =============================================================================

#[test]
fn test_resort_is_byte_identical() {
    let (mut disk, _pool) = setup_disk();
    disk.create("data", 5 * K + 3).unwrap();

    disk.sort("data").unwrap();
    let first = disk.read("data", 0, 5 * K + 2).unwrap();
    disk.sort("data").unwrap();
    let second = disk.read("data", 0, 5 * K + 2).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_sort_leaves_other_files_alone() {
    let (mut disk, _pool) = setup_disk();
    disk.create("left", 500).unwrap();
    disk.create("data", 4 * K).unwrap();
    disk.create("right", 500).unwrap();
    let left = read_signed(&mut disk, "left");
    let right = read_signed(&mut disk, "right");

    disk.sort("data").unwrap();

    assert_eq!(read_signed(&mut disk, "left"), left);
    assert_eq!(read_signed(&mut disk, "right"), right);
}

#[test]
fn test_signed_order_with_extremes_and_duplicates() {
    let geometry = Geometry {
        block_bytes: BLOCK,
        total_blocks: 64,
        swap_blocks: 16,
    };
    let mut store =
        BlockStore::new(geometry, Box::new(MemDevice::new(geometry.device_bytes()))).unwrap();
    let mut values: Vec<i32> = Vec::new();
    for i in 0..3000 {
        values.push(match i % 5 {
            0 => i32::MIN,
            1 => i32::MAX,
            2 => -1,
            3 => 0,
            _ => (i as i32) * -7919,
        });
    }
    let blocks = geometry.blocks_for_bytes(values.len() as u64 * ELEMENT_BYTES);
    let extent = store.allocate_contiguous(Pool::User, blocks).unwrap();
    store.write_elements(&extent, 0, &values).unwrap();

    let pool = ScratchPool::new(256, 1);
    let mut scratch = pool.acquire().unwrap();
    SortEngine::new(&mut store, &mut scratch)
        .sort(extent, values.len() as u64)
        .unwrap();

    let mut sorted = Vec::new();
    store
        .read_elements(&extent, 0, values.len() as u64, &mut sorted)
        .unwrap();
    assert_sorted_permutation(&values, &sorted);
    assert_eq!(sorted[0], i32::MIN);
    assert_eq!(sorted[sorted.len() - 1], i32::MAX);
}

// =============================================================================
// Failure Path Tests
// =============================================================================

#[test]
fn test_missing_file_never_takes_scratch() {
    let (mut disk, pool) = setup_disk();

    assert!(matches!(disk.sort("ghost"), Err(DiskError::NotFound(_))));
    assert_eq!(pool.available(), 1);
}

#[test]
fn test_leased_scratch_fails_without_touching_file() {
    let (mut disk, pool) = setup_disk();
    disk.create("data", 2 * K).unwrap();
    let before = read_signed(&mut disk, "data");

    let held = pool.acquire().unwrap();
    let result = disk.sort("data");

    assert!(matches!(result, Err(DiskError::ScratchBufferUnavailable(_))));
    assert_eq!(read_signed(&mut disk, "data"), before);

    drop(held);
    assert_eq!(pool.available(), 1);
    disk.sort("data").unwrap();
}

#[test]
fn test_swap_exhaustion_restores_state() {
    let (mut disk, pool) = setup_disk();
    // 70 single-block runs against 64 swap blocks
    disk.create("big", 70 * K).unwrap();
    let before = read_signed(&mut disk, "big");
    let user_free = disk.free_blocks(Pool::User);

    let result = disk.sort("big");

    assert!(matches!(
        result,
        Err(DiskError::InsufficientSpace { pool: Pool::Swap, .. })
    ));
    assert_eq!(disk.free_blocks(Pool::Swap), 64);
    assert_eq!(disk.free_blocks(Pool::User), user_free);
    assert_eq!(pool.available(), 1);
    assert_eq!(read_signed(&mut disk, "big"), before);
}

#[test]
fn test_sort_after_failure_succeeds() {
    let (mut disk, _pool) = setup_disk();
    disk.create("big", 70 * K).unwrap();
    disk.create("small", 3 * K).unwrap();
    assert!(disk.sort("big").is_err());

    let before = read_signed(&mut disk, "small");
    disk.sort("small").unwrap();

    assert_sorted_permutation(&before, &read_signed(&mut disk, "small"));
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_sort_is_ordered_permutation(count in 0u64..6000, seed in any::<u64>()) {
        let config = Config::builder()
            .device_bytes(256 * BLOCK)
            .swap_bytes(64 * BLOCK)
            .scratch_capacity(K as usize)
            .seed(seed)
            .build();
        let mut disk = VirtualDisk::in_memory(config).unwrap();
        disk.create("data", count).unwrap();
        let before = read_signed(&mut disk, "data");

        disk.sort("data").unwrap();
        let after = read_signed(&mut disk, "data");

        prop_assert!(after.windows(2).all(|w| w[0] <= w[1]));
        let mut expected = before;
        expected.sort_unstable();
        prop_assert_eq!(after, expected);
        prop_assert_eq!(disk.free_blocks(Pool::Swap), 64);
    }
}

//! The end-to-end scenarios enumerated in spec §8, against a
//! deliberately small configuration so layer exhaustion and packed
//! free-list node churn are both reachable within a single test process.

use layered_alloc::{Config, LayeredAllocator};

/// `min_block_size = 64`, `l = 10` => `m = 2^(6+10-1) = 32768`. On a
/// typical 4 KiB page this gives unpacked layers for block sizes
/// 64..2048 and packed layers for 4096..32768.
fn scenario_config() -> Config {
    let cfg = Config { min_block_size: 64, l: 10, m: 32768, v: 10 * 32768, memcpy_threshold: 1 << 14 };
    cfg.validate().unwrap();
    cfg
}

#[test]
fn scenario_1_single_free_then_allocate_is_lifo() {
    let alloc = LayeredAllocator::new(scenario_config());
    let p = alloc.allocate(100).unwrap();
    alloc.free(p);
    let q = alloc.allocate(100).unwrap();
    assert_eq!(p, q);
}

#[test]
fn scenario_2_interleaved_frees_reverse_order() {
    let alloc = LayeredAllocator::new(scenario_config());
    let p1 = alloc.allocate(100).unwrap();
    let p2 = alloc.allocate(100).unwrap();
    alloc.free(p1);
    let p3 = alloc.allocate(100).unwrap();
    alloc.free(p2);
    alloc.free(p3);
    assert_eq!(p3, p1);
}

#[test]
fn scenario_3_small_reallocate_copies_and_moves_up_one_layer() {
    let alloc = LayeredAllocator::new(scenario_config());
    let p = alloc.allocate(64).unwrap();
    unsafe { std::ptr::write_bytes(p.as_ptr(), 0xAB, 64) };

    let q = alloc.reallocate(Some(p), 128).unwrap();
    unsafe {
        assert!(std::slice::from_raw_parts(q.as_ptr(), 64).iter().all(|&b| b == 0xAB));
    }
    // 64 B and 128 B are different size classes, so the destination layer
    // differs from the source layer and `q` is a distinct, 128-aligned
    // address (the move-up-one-layer this scenario is named for).
    assert_ne!(p, q);
    assert_eq!(q.as_ptr() as usize % 128, 0);
}

#[cfg(target_os = "linux")]
#[test]
fn scenario_4_large_reallocate_remaps_and_preserves_checkerboard() {
    let cfg = Config {
        min_block_size: 64,
        l: 26,
        m: 1 << 30,
        v: 26 * (1usize << 30),
        memcpy_threshold: 1 << 23,
    };
    cfg.validate().unwrap();
    let alloc = LayeredAllocator::new(cfg);

    let old_size = 1usize << 23;
    let p = alloc.allocate(old_size).unwrap();
    unsafe {
        let buf = std::slice::from_raw_parts_mut(p.as_ptr(), old_size);
        for (i, b) in buf.iter_mut().enumerate() {
            *b = if (i / 4096) % 2 == 0 { 0xAA } else { 0x55 };
        }
    }

    let q = alloc.reallocate(Some(p), 1usize << 24).unwrap();
    unsafe {
        let buf = std::slice::from_raw_parts(q.as_ptr(), old_size);
        for (i, &b) in buf.iter().enumerate() {
            let expected = if (i / 4096) % 2 == 0 { 0xAA } else { 0x55 };
            assert_eq!(b, expected, "mismatch at offset {i}");
        }
    }
}

#[test]
fn scenario_5_packed_node_overflow_and_retirement_reuses_the_retired_page() {
    // Block size 4096 (== a typical page) forces the packed encoding.
    let cfg = Config { min_block_size: 64, l: 10, m: 32768, v: 10 * 32768, memcpy_threshold: 1 << 20 };
    cfg.validate().unwrap();
    let alloc = LayeredAllocator::new(cfg);

    let page_size = 4096usize;
    let word = std::mem::size_of::<usize>();
    let max_k = page_size / word - 2;
    let count = max_k + 8;

    let mut ptrs = Vec::with_capacity(count);
    for _ in 0..count {
        ptrs.push(alloc.allocate(4096).unwrap());
    }
    for &p in &ptrs {
        alloc.free(p);
    }

    // Popping them all back out must reproduce the exact set of addresses
    // (in LIFO order), which only holds if node promotion/retirement
    // correctly threaded every block through the free list.
    let mut reallocated = Vec::with_capacity(count);
    for _ in 0..count {
        reallocated.push(alloc.allocate(4096).unwrap());
    }
    let mut expected = ptrs.clone();
    expected.reverse();
    assert_eq!(reallocated, expected);
}

#[test]
fn scenario_6_concurrent_mixed_workload_preserves_in_use_accounting() {
    use std::sync::Arc;
    use std::thread;

    let alloc = Arc::new(LayeredAllocator::new(scenario_config()));
    let threads = 8;
    let iters = 2_000;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let alloc = Arc::clone(&alloc);
            thread::spawn(move || {
                let mut live = Vec::new();
                let mut allocs = 0usize;
                let mut frees = 0usize;
                let mut reallocs = 0usize;
                for i in 0..iters {
                    let op = (i + t) % 3;
                    match op {
                        0 => {
                            if let Some(p) = alloc.allocate(64 + (i % 256)) {
                                live.push(p);
                                allocs += 1;
                            }
                        }
                        1 => {
                            if let Some(p) = live.pop() {
                                alloc.free(p);
                                frees += 1;
                            }
                        }
                        _ => {
                            if let Some(old) = live.pop() {
                                if let Some(p) = alloc.reallocate(Some(old), 64 + (i % 512)) {
                                    live.push(p);
                                    reallocs += 1;
                                } else {
                                    live.push(old);
                                }
                            }
                        }
                    }
                }
                for p in live.drain(..) {
                    alloc.free(p);
                    frees += 1;
                }
                (allocs, frees, reallocs)
            })
        })
        .collect();

    let mut total_allocs = 0usize;
    let mut total_frees = 0usize;
    for h in handles {
        let (a, f, _r) = h.join().unwrap();
        total_allocs += a;
        total_frees += f;
    }
    // Every thread frees everything it still holds at the end, so the
    // allocator's live-block count should return to zero.
    assert_eq!(total_allocs, total_frees);
    assert_eq!(alloc.live_blocks(), 0);
}

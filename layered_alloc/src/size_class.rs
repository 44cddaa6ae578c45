//! Size-class arithmetic: the layer lookup from a requested size and the
//! layer lookup from a live pointer must agree for every pointer the core
//! has ever handed out.

use crate::config::Config;

/// Smallest `b` such that `2^b >= x`. `x` must be nonzero.
pub(crate) fn ceil_log2(x: usize) -> u32 {
    debug_assert!(x > 0, "ceil_log2 is undefined for 0");
    x.next_power_of_two().trailing_zeros()
}

/// `layer_index = ceil_log2(max(n, min_block_size)) - s_min`. `None` if
/// the request exceeds the largest size class (`n > M`).
pub(crate) fn layer_index_for_size(cfg: &Config, n: usize) -> Option<usize> {
    let req = n.max(cfg.min_block_size);
    if req > cfg.max_block_size() {
        return None;
    }
    let b = ceil_log2(req);
    Some((b - cfg.s_min()) as usize)
}

/// `layer_index = (p - base) / M`. Callers guarantee `p` lies within the
/// reservation; size class is recovered purely from the pointer's
/// position, no side table is consulted.
pub(crate) fn layer_index_for_ptr(cfg: &Config, base: usize, p: usize) -> usize {
    (p - base) / cfg.m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceil_log2_powers_of_two_are_fixed_points() {
        for b in 0..20 {
            let x = 1usize << b;
            assert_eq!(ceil_log2(x), b as u32);
        }
    }

    #[test]
    fn ceil_log2_rounds_up() {
        assert_eq!(ceil_log2(65), 7);
        assert_eq!(ceil_log2(100), 7);
        assert_eq!(ceil_log2(129), 8);
    }

    #[test]
    fn size_to_layer_matches_block_size_monotonically() {
        let cfg = Config::DEFAULT;
        assert_eq!(layer_index_for_size(&cfg, 0), Some(0));
        assert_eq!(layer_index_for_size(&cfg, 1), Some(0));
        assert_eq!(layer_index_for_size(&cfg, 64), Some(0));
        assert_eq!(layer_index_for_size(&cfg, 65), Some(1));
        assert_eq!(layer_index_for_size(&cfg, 128), Some(1));
        assert_eq!(layer_index_for_size(&cfg, cfg.m), Some(cfg.l - 1));
        assert_eq!(layer_index_for_size(&cfg, cfg.m + 1), None);
    }

    #[test]
    fn ptr_to_layer_recovers_size_class() {
        let cfg = Config::DEFAULT;
        let base = 0x1000_0000_0000usize;
        for i in 0..cfg.l {
            let p = base + i * cfg.m + 17;
            assert_eq!(layer_index_for_ptr(&cfg, base, p), i);
        }
    }
}

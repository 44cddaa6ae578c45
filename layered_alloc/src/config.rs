use thiserror::Error;

/// The allocator's sizing parameters, kept runtime-configurable so tests
/// can run against a reservation small enough to exhaust on purpose.
/// [`Config::DEFAULT`] is the production design point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Smallest size class, in bytes. Must be a power of two.
    pub min_block_size: usize,
    /// Number of layers.
    pub l: usize,
    /// Per-layer span, in bytes. Also the largest representable block size.
    pub m: usize,
    /// Total virtual reservation size, in bytes.
    pub v: usize,
    /// Reallocation strategy switch point, in bytes.
    pub memcpy_threshold: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("min_block_size ({0}) is not a power of two")]
    MinBlockSizeNotPowerOfTwo(usize),
    #[error("m ({m}) does not equal 2^(s_min + l - 1) = {expected}")]
    LayerSpanMismatch { m: usize, expected: usize },
    #[error("v ({v}) is smaller than l * m ({needed})")]
    ReservationTooSmall { v: usize, needed: usize },
    #[error("l must be at least 1")]
    NoLayers,
}

impl Config {
    /// 64 B minimum block, 35 layers of 1 TiB each, a 35 TiB reservation,
    /// 8 MiB memcpy threshold.
    pub const DEFAULT: Config = Config {
        min_block_size: 64,
        l: 35,
        m: 1usize << 40,
        v: 35usize * (1usize << 40),
        memcpy_threshold: 8 * 1024 * 1024,
    };

    /// `s_min = log2(min_block_size)`.
    pub fn s_min(&self) -> u32 {
        self.min_block_size.trailing_zeros()
    }

    /// The block size of layer `i`: `2^(i + s_min)`.
    pub fn block_size(&self, layer_index: usize) -> usize {
        1usize << (layer_index as u32 + self.s_min())
    }

    /// The maximum representable block size; equal to `m` by construction.
    pub fn max_block_size(&self) -> usize {
        self.m
    }

    /// Verify the consistency relation between the five parameters:
    /// `min_block_size = 2^s_min`, `m = 2^(s_min + l - 1)`, `v >= l * m`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_block_size.is_power_of_two() {
            return Err(ConfigError::MinBlockSizeNotPowerOfTwo(self.min_block_size));
        }
        if self.l == 0 {
            return Err(ConfigError::NoLayers);
        }
        let expected_m = 1usize << (self.s_min() + self.l as u32 - 1);
        if self.m != expected_m {
            return Err(ConfigError::LayerSpanMismatch { m: self.m, expected: expected_m });
        }
        let needed = self.l * self.m;
        if self.v < needed {
            return Err(ConfigError::ReservationTooSmall { v: self.v, needed });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::DEFAULT
    }
}

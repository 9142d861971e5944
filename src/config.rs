//! Runtime-tunable constants.
//!
//! The block management algorithm in [`crate::allocator`] never hardcodes
//! the alignment or the mmap threshold; it reads them from a [`Config`].
//! Production code uses [`Config::default`], which matches the platform
//! constants. Tests construct a [`Config`] with a small `mmap_threshold`
//! so mmap-routing scenarios don't need to allocate 128 KiB per case.

/// The size, in bytes, above which `malloc`-style allocation switches from
/// the brk arena to an anonymous mapping.
pub const DEFAULT_MMAP_THRESHOLD: usize = 128 * 1024;

/// Tunable constants for one allocator instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Platform alignment; every payload size is rounded up to a multiple
    /// of this value.
    pub alignment: usize,
    /// Size threshold, in bytes, for `malloc`-style brk-vs-mmap routing.
    /// `zero_allocate` routes against the page size instead, independent of
    /// this value.
    pub mmap_threshold: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alignment: crate::align::DEFAULT_ALIGNMENT,
            mmap_threshold: DEFAULT_MMAP_THRESHOLD,
        }
    }
}

impl Config {
    /// Returns the aligned size of the block header under this config.
    #[must_use]
    pub fn header_size(&self) -> usize {
        crate::align::align(crate::block::HEADER_SIZE, self.alignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_constants() {
        let config = Config::default();
        assert_eq!(config.alignment, 8);
        assert_eq!(config.mmap_threshold, 128 * 1024);
    }

    #[test]
    fn header_size_is_aligned() {
        let config = Config {
            alignment: 16,
            mmap_threshold: DEFAULT_MMAP_THRESHOLD,
        };
        assert_eq!(config.header_size() % 16, 0);
    }
}

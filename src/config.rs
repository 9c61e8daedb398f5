//! Tunable constants for a heap, gathered into one validated struct.
//!
//! The reference codebase keeps equivalent tunables (page size, slab
//! geometry, processor limits) in a dedicated `platypos_config` crate, built
//! from a TOML file by its own build script. That machinery is out of scope
//! here — there is exactly one struct's worth of knobs — but the shape
//! (typed fields, a `validate` pass that rejects bad values up front rather
//! than failing deep inside an allocator) is the same idea scaled down.

use crate::error::HeapError;

/// All tunables for a [`crate::registry::VramHeap`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapConfig {
    /// Total size of the buddy-managed region, in bytes. Must be a power of
    /// two.
    pub k_size: usize,
    /// Smallest block the buddy allocator will hand out, in bytes. Must be a
    /// power of two and large enough to hold a free-list node.
    pub min_alloc: usize,
    /// Backing pool size for each slab size class, in bytes.
    pub slab_pool_size: usize,
    /// Default page size requested from the buddy allocator by the linear
    /// allocator when it needs a new page.
    pub linear_page_size: usize,
    /// Alignment granularity the linear allocator rounds requests up to.
    /// The reference source hard-codes this to 4 bytes; here it is a knob,
    /// per the spec's design notes on "Linear allocator alignment".
    pub linear_alignment: usize,
}

impl Default for HeapConfig {
    fn default() -> Self {
        HeapConfig {
            k_size: 64 * 1024 * 1024,
            min_alloc: 16,
            slab_pool_size: 1024 * 1024,
            linear_page_size: 4096,
            linear_alignment: 4,
        }
    }
}

impl HeapConfig {
    fn check_power_of_two(field: &'static str, value: usize) -> Result<(), HeapError> {
        if value == 0 || !value.is_power_of_two() {
            return Err(HeapError::NotPowerOfTwo { field, value });
        }
        Ok(())
    }

    /// Reject configurations that would violate the buddy/slab/linear
    /// allocators' construction preconditions, before any of them are built.
    pub fn validate(&self) -> Result<(), HeapError> {
        Self::check_power_of_two("k_size", self.k_size)?;
        Self::check_power_of_two("min_alloc", self.min_alloc)?;
        Self::check_power_of_two("linear_alignment", self.linear_alignment)?;

        let min_node = crate::list::min_node_size();
        if self.min_alloc < min_node {
            return Err(HeapError::TooSmall {
                field: "min_alloc",
                value: self.min_alloc,
                minimum: min_node,
            });
        }
        if self.k_size < self.min_alloc {
            return Err(HeapError::TooSmall {
                field: "k_size",
                value: self.k_size,
                minimum: self.min_alloc,
            });
        }
        if self.slab_pool_size < crate::slab::SIZE_CLASSES[0] {
            return Err(HeapError::TooSmall {
                field: "slab_pool_size",
                value: self.slab_pool_size,
                minimum: crate::slab::SIZE_CLASSES[0],
            });
        }
        if self.linear_page_size == 0 {
            return Err(HeapError::TooSmall {
                field: "linear_page_size",
                value: self.linear_page_size,
                minimum: 1,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        HeapConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_non_power_of_two_k_size() {
        let mut cfg = HeapConfig::default();
        cfg.k_size = 100;
        assert!(matches!(
            cfg.validate(),
            Err(HeapError::NotPowerOfTwo { field: "k_size", .. })
        ));
    }

    #[test]
    fn rejects_min_alloc_too_small_for_a_free_list_node() {
        let mut cfg = HeapConfig::default();
        cfg.min_alloc = 1;
        assert!(cfg.validate().is_err());
    }
}

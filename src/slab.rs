//! Fixed-size object pools for small allocations.
//!
//! Grounded on the reference C++ `Slab`/`SlabAllocator` pair this spec
//! distills (`original_source/head/slab.h`, `src/slab.cpp`): a flat backing
//! buffer carved into equal cells at construction, with a free list of cell
//! pointers. The free list itself reuses this crate's intrusive
//! [`crate::list::FreeList`] rather than the original's `Vec<void*>`, the same
//! way the buddy allocator threads its free lists through the region's own
//! bytes instead of a side vector.

use log::{debug, trace, warn};

use crate::list::FreeList;
use crate::Handle;

/// A single size class: a flat pool of `pool_size / cell_size` fixed-size
/// cells, all initially free.
struct SlabClass {
    cell_size: usize,
    region: Box<[u8]>,
    free: FreeList,
}

impl SlabClass {
    fn new(cell_size: usize, pool_size: usize) -> SlabClass {
        assert!(
            cell_size >= crate::list::min_node_size(),
            "slab cell size must fit a free-list node"
        );
        assert!(pool_size >= cell_size, "pool must hold at least one cell");

        let mut region = vec![0u8; pool_size].into_boxed_slice();
        let mut free = FreeList::new();

        let num_cells = pool_size / cell_size;
        let base = region.as_mut_ptr();
        for i in 0..num_cells {
            // Safety: each cell is disjoint and carved once, before any
            // allocation, so none of these pushes alias a live cell.
            unsafe {
                let cell = core::ptr::NonNull::new_unchecked(base.add(i * cell_size));
                free.push(cell);
            }
        }

        SlabClass {
            cell_size,
            region,
            free,
        }
    }

    fn allocate(&mut self) -> Option<Handle> {
        self.free.pop().map(Handle::from_ptr)
    }

    /// # Safety / precondition
    /// Caller must have already confirmed `owns(handle)`.
    fn free(&mut self, handle: Handle) {
        // Safety: the cell was either carved fresh at construction or
        // previously popped from this exact list, so it is safe to relink.
        unsafe { self.free.push(handle.as_nonnull()) };
    }

    fn owns(&self, handle: Handle) -> bool {
        let start = self.region.as_ptr() as usize;
        let end = start + self.region.len();
        let addr = handle.as_nonnull().as_ptr() as usize;
        addr >= start && addr < end
    }
}

/// The four fixed size classes the hybrid router routes small requests to.
pub const SIZE_CLASSES: [usize; 4] = [32, 64, 128, 256];

/// Pool of fixed-size object allocators, one per size class in
/// [`SIZE_CLASSES`].
pub struct Slab {
    classes: Vec<SlabClass>,
}

impl Slab {
    /// Build a slab allocator with `pool_size` bytes backing each of
    /// [`SIZE_CLASSES`] (1 MiB each by default, per
    /// [`crate::config::HeapConfig`]).
    pub fn new(pool_size: usize) -> Slab {
        let classes = SIZE_CLASSES
            .iter()
            .map(|&size| SlabClass::new(size, pool_size))
            .collect();
        debug!(
            "slab ready: {} classes, {} bytes each",
            SIZE_CLASSES.len(),
            pool_size
        );
        Slab { classes }
    }

    /// Allocate from the smallest class that fits `n` bytes. Classes never
    /// cascade to a larger one on exhaustion — a full 32-byte class does not
    /// spill into the 64-byte class, so `allocated_size` stays predictable.
    pub fn allocate(&mut self, n: usize) -> Option<Handle> {
        let class = self.classes.iter_mut().find(|c| c.cell_size >= n)?;
        let result = class.allocate();
        if result.is_none() {
            debug!("slab class >= {} bytes exhausted", n);
        } else {
            trace!("slab allocate: {} bytes -> {}-byte cell", n, class.cell_size);
        }
        result
    }

    /// The fixed cell size that would service a request of `n` bytes, or
    /// `None` if it exceeds every class (callers fall back to the buddy
    /// allocator in that case).
    pub fn class_for(n: usize) -> Option<usize> {
        SIZE_CLASSES.iter().copied().find(|&size| size >= n)
    }

    pub fn free(&mut self, handle: Handle) -> bool {
        for class in self.classes.iter_mut() {
            if class.owns(handle) {
                class.free(handle);
                return true;
            }
        }
        warn!("slab free: pointer not owned by any class");
        false
    }

    pub fn owns(&self, handle: Handle) -> bool {
        self.classes.iter().any(|c| c.owns(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_routing() {
        assert_eq!(Slab::class_for(30), Some(32));
        assert_eq!(Slab::class_for(200), Some(256));
        assert_eq!(Slab::class_for(300), None);
    }

    #[test]
    fn allocate_and_free_reuses_cell() {
        let mut slab = Slab::new(1024);
        let h1 = slab.allocate(20).unwrap();
        assert!(slab.owns(h1));
        assert!(slab.free(h1));

        let h2 = slab.allocate(20).unwrap();
        assert_eq!(h1, h2, "freed cell must be reused before a new one is carved");
    }

    #[test]
    fn class_exhaustion_does_not_cascade() {
        let mut slab = Slab::new(64); // exactly two 32-byte cells
        let _a = slab.allocate(32).unwrap();
        let _b = slab.allocate(32).unwrap();
        assert!(
            slab.allocate(32).is_none(),
            "exhausted class must not borrow from a larger class"
        );
    }

    #[test]
    fn free_of_unowned_pointer_returns_false() {
        let mut slab = Slab::new(1024);
        let other = Slab::new(1024);
        let h = {
            let mut tmp = other;
            tmp.allocate(32).unwrap()
        };
        assert!(!slab.free(h));
    }
}

//! Bump (arena) allocator layered on top of the buddy allocator.
//!
//! Grounded on `original_source/src/linear.cpp`: pages are drawn lazily from
//! the buddy allocator as needed and bumped monotonically; the whole arena is
//! released at once via [`Linear::reset`], never per-allocation. The pointer
//! bookkeeping style (storing a page list and returning the pre-bump cursor)
//! follows the reference `bump_allocator`'s `align_up`/`align_down` idiom for
//! the alignment step.

use core::ptr::NonNull;

use log::{debug, trace};

use crate::buddy::Buddy;
use crate::Handle;

struct Page {
    base: NonNull<u8>,
    total_size: usize,
    used_offset: usize,
}

/// Monotone bump allocator. Holds no memory of its own until the first
/// `allocate`; all pages are borrowed from a [`Buddy`] passed in at each call
/// and returned together on [`Linear::reset`].
pub struct Linear {
    page_size: usize,
    alignment: usize,
    pages: Vec<Page>,
}

impl Linear {
    pub fn new(page_size: usize, alignment: usize) -> Linear {
        assert!(alignment.is_power_of_two(), "alignment must be a power of two");
        Linear {
            page_size,
            alignment,
            pages: Vec::new(),
        }
    }

    /// Round `n` up to the configured alignment, mirroring
    /// `Buddy::order_for_size`'s guard against overflowing the round-up
    /// arithmetic (spec §4.2) rather than wrapping a pathological `n` into a
    /// tiny, silently-wrong size.
    fn align_up(&self, n: usize) -> Option<usize> {
        Some(n.checked_add(self.alignment - 1)? & !(self.alignment - 1))
    }

    pub fn allocate(&mut self, buddy: &mut Buddy, n: usize) -> Option<Handle> {
        let aligned = self.align_up(n)?;

        if let Some(page) = self.pages.last_mut() {
            if page.used_offset + aligned <= page.total_size {
                // Safety: `used_offset` is always within `[0, total_size]`.
                let ptr = unsafe { NonNull::new_unchecked(page.base.as_ptr().add(page.used_offset)) };
                page.used_offset += aligned;
                trace!("linear allocate: {} bytes from existing page", n);
                return Some(Handle::from_ptr(ptr));
            }
        }

        let new_page_size = self.page_size.max(aligned);
        let page_handle = buddy.allocate(new_page_size)?;
        debug!("linear: new page of {} bytes", new_page_size);

        let base = page_handle.as_nonnull();
        self.pages.push(Page {
            base,
            total_size: new_page_size,
            used_offset: aligned,
        });

        Some(Handle::from_ptr(base))
    }

    pub fn owns(&self, handle: Handle) -> bool {
        let addr = handle.as_nonnull().as_ptr() as usize;
        self.pages.iter().any(|p| {
            let start = p.base.as_ptr() as usize;
            addr >= start && addr < start + p.total_size
        })
    }

    /// Return every page to `buddy` and forget them. Individual allocations
    /// made through this arena cannot be freed one at a time.
    pub fn reset(&mut self, buddy: &mut Buddy) {
        for page in self.pages.drain(..) {
            buddy.free(Handle::from_ptr(page.base));
        }
        debug!("linear: reset, all pages returned to buddy");
    }

    pub fn total_allocated(&self) -> usize {
        self.pages.iter().map(|p| p.total_size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_within_one_page() {
        let mut buddy = Buddy::new(1 << 20, 16);
        let mut linear = Linear::new(4096, 4);

        let a = linear.allocate(&mut buddy, 8).unwrap();
        let b = linear.allocate(&mut buddy, 8).unwrap();
        assert_ne!(a, b);
        assert!(linear.owns(a) && linear.owns(b));
    }

    #[test]
    fn overflow_allocates_new_page() {
        let mut buddy = Buddy::new(1 << 20, 16);
        let mut linear = Linear::new(64, 4);

        let _first = linear.allocate(&mut buddy, 60).unwrap();
        let second = linear.allocate(&mut buddy, 60).unwrap();
        assert!(linear.owns(second));
        assert_eq!(linear.pages.len(), 2);
    }

    #[test]
    fn reset_returns_pages_to_buddy() {
        let mut buddy = Buddy::new(1 << 16, 16);
        let mut linear = Linear::new(4096, 4);

        for _ in 0..1000 {
            linear.allocate(&mut buddy, 8).unwrap();
        }
        linear.reset(&mut buddy);

        assert_eq!(buddy.free_capacity(), buddy.total_size());
    }

    #[test]
    fn pathological_size_does_not_overflow() {
        let mut buddy = Buddy::new(1 << 16, 16);
        let mut linear = Linear::new(4096, 4);
        assert!(linear.allocate(&mut buddy, usize::MAX).is_none());
    }

    #[test]
    fn allocate_larger_than_page_size_gets_its_own_page() {
        let mut buddy = Buddy::new(1 << 20, 16);
        let mut linear = Linear::new(64, 4);

        let h = linear.allocate(&mut buddy, 4096).unwrap();
        assert!(linear.owns(h));
    }
}

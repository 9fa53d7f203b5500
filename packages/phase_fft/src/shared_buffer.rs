use std::marker::PhantomData;
use std::ptr::NonNull;

use num_complex::Complex64;

/// Exclusive borrow of a buffer that is shared between the workers of one transform.
///
/// Within one stage every worker owns a disjoint set of butterfly pairs, and stages are separated
/// by a barrier, so the workers never race even though they all write through the same shared
/// reference. The type system cannot express "disjoint per stage", so element access is
/// `unsafe` and callers take responsibility for the partitioning.
pub(crate) struct SharedBuffer<'a> {
    ptr: NonNull<Complex64>,
    len: usize,

    _borrow: PhantomData<&'a mut [Complex64]>,
}

// SAFETY: Elements are only reachable through `butterfly()`, whose contract forbids concurrent
// access to the same element. Complex64 is plain data and may be accessed from any thread.
unsafe impl Sync for SharedBuffer<'_> {}

impl<'a> SharedBuffer<'a> {
    pub(crate) fn new(data: &'a mut [Complex64]) -> Self {
        let len = data.len();

        Self {
            ptr: NonNull::from(data).cast(),
            len,
            _borrow: PhantomData,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Applies one radix-2 butterfly in place: `(a, b) -> (a + w*b, a - w*b)`.
    ///
    /// # Safety
    ///
    /// `top` and `bottom` must be distinct and less than `len()`. No other thread may access
    /// either element unless that access is ordered with this call by a synchronization point
    /// such as a barrier wait.
    #[expect(
        clippy::arithmetic_side_effects,
        reason = "complex arithmetic on finite or NaN values cannot panic"
    )]
    pub(crate) unsafe fn butterfly(&self, top: usize, bottom: usize, twiddle: Complex64) {
        debug_assert!(
            top < self.len,
            "top index {top} out of bounds for {}",
            self.len
        );
        debug_assert!(
            bottom < self.len,
            "bottom index {bottom} out of bounds for {}",
            self.len
        );
        debug_assert_ne!(top, bottom);

        // SAFETY: In bounds of the borrowed slice, guaranteed by the caller.
        let top = unsafe { self.ptr.add(top) };
        // SAFETY: In bounds of the borrowed slice, guaranteed by the caller.
        let bottom = unsafe { self.ptr.add(bottom) };

        // SAFETY: Valid, initialized and not concurrently accessed, guaranteed by the caller.
        let a = unsafe { top.read() };
        // SAFETY: Valid, initialized and not concurrently accessed, guaranteed by the caller.
        let b = twiddle * unsafe { bottom.read() };

        // SAFETY: Valid and not concurrently accessed, guaranteed by the caller.
        unsafe {
            top.write(a + b);
        }
        // SAFETY: Valid and not concurrently accessed, guaranteed by the caller.
        unsafe {
            bottom.write(a - b);
        }
    }
}

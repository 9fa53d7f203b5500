use std::any::type_name;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Size in bytes of the unit of cache coherence on the target architecture.
///
/// This is the width that two independently mutated values must be separated by to avoid false
/// sharing. It is derived from the alignment of [`CachePadded`], so the two can never disagree.
///
/// * 128 bytes on `x86_64` (adjacent-line prefetch pulls lines in pairs), `aarch64` and
///   `powerpc64`.
/// * 256 bytes on `s390x`.
/// * 32 bytes on `arm`, `mips`, `mips64`, `sparc` and `hexagon`.
/// * 64 bytes everywhere else.
pub const CACHE_LINE_SIZE: usize = align_of::<CachePadded<u8>>();

/// Pads and aligns a value to [`CACHE_LINE_SIZE`] bytes.
///
/// Two `CachePadded` values never share a cache line, whether they are adjacent struct fields,
/// array elements or separate allocations.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// use phase_barrier::{CACHE_LINE_SIZE, CachePadded};
///
/// let counters = [CachePadded::new(AtomicU64::new(0)), CachePadded::new(AtomicU64::new(0))];
///
/// counters[0].fetch_add(1, Ordering::Relaxed);
///
/// let first = (&raw const counters[0]).addr();
/// let second = (&raw const counters[1]).addr();
/// assert!(second - first >= CACHE_LINE_SIZE);
/// ```
#[cfg_attr(
    any(
        target_arch = "x86_64",
        target_arch = "aarch64",
        target_arch = "powerpc64",
    ),
    repr(align(128))
)]
#[cfg_attr(target_arch = "s390x", repr(align(256)))]
#[cfg_attr(
    any(
        target_arch = "arm",
        target_arch = "mips",
        target_arch = "mips64",
        target_arch = "sparc",
        target_arch = "hexagon",
    ),
    repr(align(32))
)]
#[cfg_attr(
    not(any(
        target_arch = "x86_64",
        target_arch = "aarch64",
        target_arch = "powerpc64",
        target_arch = "s390x",
        target_arch = "arm",
        target_arch = "mips",
        target_arch = "mips64",
        target_arch = "sparc",
        target_arch = "hexagon",
    )),
    repr(align(64))
)]
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
pub struct CachePadded<T> {
    value: T,
}

impl<T> CachePadded<T> {
    /// Wraps `value` so that it occupies one or more whole cache lines.
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self { value }
    }

    /// Unwraps the padded value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for CachePadded<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for CachePadded<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T> From<T> for CachePadded<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for CachePadded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("value", &self.value)
            .finish()
    }
}

const _: () = assert!(CACHE_LINE_SIZE.is_power_of_two());
const _: () = assert!(CACHE_LINE_SIZE >= 32);

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    #![allow(
        clippy::arithmetic_side_effects,
        clippy::indexing_slicing,
        reason = "panic is fine in tests"
    )]

    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(CachePadded<AtomicUsize>: Send, Sync);

    #[test]
    fn size_is_whole_cache_lines() {
        assert_eq!(size_of::<CachePadded<u8>>(), CACHE_LINE_SIZE);
        assert_eq!(size_of::<CachePadded<AtomicU64>>(), CACHE_LINE_SIZE);

        // Larger than a line rounds up to the next whole line.
        assert_eq!(
            size_of::<CachePadded<[u8; CACHE_LINE_SIZE + 1]>>(),
            CACHE_LINE_SIZE * 2
        );
    }

    #[test]
    fn adjacent_elements_are_on_separate_lines() {
        let values = [CachePadded::new(1_u32), CachePadded::new(2_u32)];

        let first = (&raw const values[0]).addr();
        let second = (&raw const values[1]).addr();

        assert_eq!(first % CACHE_LINE_SIZE, 0);
        assert_eq!(second - first, CACHE_LINE_SIZE);
    }

    #[test]
    fn deref_reaches_inner_value() {
        let mut padded = CachePadded::new(AtomicUsize::new(5));

        padded.fetch_add(1, Ordering::Relaxed);
        assert_eq!(padded.load(Ordering::Relaxed), 6);

        *padded.get_mut() = 10;
        assert_eq!(padded.into_inner().into_inner(), 10);
    }

    #[test]
    fn from_and_default() {
        let padded: CachePadded<u64> = 42.into();
        assert_eq!(*padded, 42);

        let default = CachePadded::<u64>::default();
        assert_eq!(*default, 0);
    }

    #[test]
    fn debug_shows_value() {
        let padded = CachePadded::new(7_u8);
        let output = format!("{padded:?}");

        assert!(output.contains("CachePadded"));
        assert!(output.contains('7'));
    }
}

//! Counting a catalog through its lookup query alone.
//!
//! A catalog that only answers "is there an item at index `i`" still has a well defined size:
//! the predicate "the catalog holds at least `n` items" is monotone in `n`, so the size is the
//! last `n` for which it holds. [`probe_count`] finds that boundary with an exponential search
//! for an upper bound followed by a binary search inside the bracket, using `O(log N)` probes.
//!
//! [`MemberCatalog`] uses the probe as its default `count`; catalogs with direct access to their
//! length override it, and the two are expected to agree.

use crate::{
    model::Member,
    registry::{Category, ClassId},
};

/// Size of a catalog given the monotone predicate `has_at_least(n)`.
///
/// `has_at_least` is never called with `0`. An empty catalog is detected with exactly one probe
/// at `n = 1`.
///
/// # Examples
///
/// ```rust
/// use metaforge::registry::probe::probe_count;
///
/// let items = vec!["a"; 17];
/// assert_eq!(probe_count(|n| items.get(n - 1).is_some()), 17);
/// ```
pub fn probe_count(mut has_at_least: impl FnMut(usize) -> bool) -> usize {
    if !has_at_least(1) {
        return 0;
    }

    // `low` always satisfies the predicate, `high` never does
    let mut low = 1usize;
    let mut high = loop {
        match low.checked_mul(2) {
            Some(next) if has_at_least(next) => low = next,
            Some(next) => break next,
            None if has_at_least(usize::MAX) => return usize::MAX,
            None => break usize::MAX,
        }
    };

    while high - low > 1 {
        let mid = low + (high - low) / 2;
        if has_at_least(mid) {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

/// Read access to a per-class, per-category catalog of member descriptors.
pub trait MemberCatalog {
    /// The member at `index` in `category` of `class`.
    fn lookup(&self, class: ClassId, category: Category, index: usize) -> Option<Member<'_>>;

    /// Number of members in `category` of `class`, derived from [`MemberCatalog::lookup`].
    fn count(&self, class: ClassId, category: Category) -> usize {
        probe_count(|n| self.lookup(class, category, n - 1).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probed(size: usize) -> (usize, usize) {
        let mut probes = 0;
        let count = probe_count(|n| {
            probes += 1;
            n <= size
        });
        (count, probes)
    }

    #[test]
    fn empty_uses_one_probe() {
        assert_eq!(probed(0), (0, 1));
    }

    #[test]
    fn sizes() {
        for size in [1, 2, 3, 16, 17, 63, 64, 65, 1000, 4096] {
            assert_eq!(probed(size).0, size, "size {}", size);
        }
    }

    #[test]
    fn logarithmic_probes() {
        let (count, probes) = probed(1000);
        assert_eq!(count, 1000);
        assert!(probes <= 2 * 11, "{} probes", probes);
    }

    #[test]
    fn saturates_without_overflow() {
        assert_eq!(probe_count(|_| true), usize::MAX);
        assert_eq!(probe_count(|n| n < usize::MAX), usize::MAX - 1);
        let half = usize::MAX / 2 + 7;
        assert_eq!(probe_count(|n| n <= half), half);
    }
}

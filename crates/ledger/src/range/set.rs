//! Sorted interval set of one (owner, token).
//!
//! Invariants, checked by [`OwnerRangeSet::check_invariants`] and preserved
//! by every mutation:
//!
//! - intervals are sorted ascending by `start`;
//! - no two intervals overlap;
//! - no two intervals touch (`a.end == b.start` is merged into one).
//!
//! Because the set is disjoint and sorted by start, ends are sorted too,
//! so both `start` and `end` are valid binary-search keys.

use config::OverlapPolicy;
use ledger_core::{Interval, TokenId};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of a successful [`OwnerRangeSet::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insertion {
    /// The interval now stored in place of the new one and its neighbours.
    pub merged: Interval,
    /// Position of `merged` in the set.
    pub index: usize,
    /// Number of previously stored intervals folded into `merged`.
    pub absorbed: usize,
    /// Whether any folded interval truly intersected the new one (as
    /// opposed to only touching it).
    pub overlapped: bool,
}

/// The insert was refused under [`OverlapPolicy::Reject`]. Carries the first
/// stored interval that intersects the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict(pub Interval);

/// The range to remove is not contained in a single stored interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotContained;

// ---------------------------------------------------------------------------
// OwnerRangeSet
// ---------------------------------------------------------------------------

/// Intervals of one token owned by one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRangeSet {
    token: TokenId,
    ranges: Vec<Interval>,
}

impl OwnerRangeSet {
    /// An empty set for `token`.
    pub fn new(token: TokenId) -> Self {
        Self {
            token,
            ranges: Vec::new(),
        }
    }

    /// Build a set from intervals that must already satisfy the invariants.
    ///
    /// Returns a description of the first violation otherwise; nothing is
    /// reordered or merged.
    pub fn from_sorted(token: TokenId, ranges: Vec<Interval>) -> Result<Self, String> {
        let set = Self { token, ranges };
        set.check_invariants()?;
        Ok(set)
    }

    pub fn token(&self) -> TokenId {
        self.token
    }

    pub fn as_slice(&self) -> &[Interval] {
        &self.ranges
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Interval> {
        self.ranges.iter()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn into_vec(self) -> Vec<Interval> {
        self.ranges
    }

    /// Sum of all interval widths.
    pub fn total(&self) -> u128 {
        self.ranges.iter().map(Interval::width).sum()
    }

    /// Add `interval`, coalescing it with every stored interval it touches.
    ///
    /// Touching neighbours always merge. Intersecting ones merge under
    /// [`OverlapPolicy::Absorb`] and fail the insert under
    /// [`OverlapPolicy::Reject`], leaving the set untouched.
    pub fn insert(
        &mut self,
        interval: Interval,
        policy: OverlapPolicy,
    ) -> Result<Insertion, Conflict> {
        debug_assert_eq!(interval.token(), self.token);

        // First interval ending at or after the new start, and one past the
        // last interval starting at or before the new end.
        let lo = self.ranges.partition_point(|r| r.end() < interval.start());
        let hi = self.ranges.partition_point(|r| r.start() <= interval.end());
        let touched = &self.ranges[lo..hi];

        let conflict = touched.iter().find(|r| r.overlaps(&interval)).copied();
        if let (Some(existing), OverlapPolicy::Reject) = (conflict, policy) {
            return Err(Conflict(existing));
        }

        let merged = touched.iter().fold(interval, |acc, r| acc.span(r));
        let absorbed = hi - lo;
        self.ranges.splice(lo..hi, [merged]);

        Ok(Insertion {
            merged,
            index: lo,
            absorbed,
            overlapped: conflict.is_some(),
        })
    }

    /// Take `target` out of the one stored interval containing it.
    ///
    /// The container is deleted, shrunk, or split in two, in place.
    pub fn remove(&mut self, target: &Interval) -> Result<(), NotContained> {
        debug_assert_eq!(target.token(), self.token);

        let idx = self
            .ranges
            .partition_point(|r| r.start() <= target.start())
            .checked_sub(1)
            .ok_or(NotContained)?;

        let existing = self.ranges[idx];
        if !existing.contains(target) {
            return Err(NotContained);
        }

        self.ranges.splice(idx..=idx, existing.subtract(target));
        Ok(())
    }

    /// Whether `target` lies inside one stored interval.
    pub fn owns(&self, target: &Interval) -> bool {
        let idx = self.ranges.partition_point(|r| r.start() <= target.start());
        idx.checked_sub(1)
            .is_some_and(|i| self.ranges[i].contains(target))
    }

    /// Verify sortedness, disjointness and non-adjacency.
    pub fn check_invariants(&self) -> Result<(), String> {
        if let Some(r) = self.ranges.iter().find(|r| r.token() != self.token) {
            return Err(format!("interval {r} belongs to another token"));
        }
        for pair in self.ranges.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if a.end() > b.start() {
                return Err(format!("{a} overlaps or precedes {b}"));
            }
            if a.end() == b.start() {
                return Err(format!("{a} is adjacent to {b}"));
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a OwnerRangeSet {
    type Item = &'a Interval;
    type IntoIter = std::slice::Iter<'a, Interval>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: TokenId = TokenId(0);

    fn iv(start: u128, end: u128) -> Interval {
        Interval::new(TOKEN, start, end).unwrap()
    }

    fn set_of(bounds: &[(u128, u128)]) -> OwnerRangeSet {
        let ranges = bounds.iter().map(|&(s, e)| iv(s, e)).collect();
        OwnerRangeSet::from_sorted(TOKEN, ranges).unwrap()
    }

    fn bounds(set: &OwnerRangeSet) -> Vec<(u128, u128)> {
        set.iter().map(|r| (r.start(), r.end())).collect()
    }

    fn absorb(set: &mut OwnerRangeSet, start: u128, end: u128) -> Insertion {
        let insertion = set.insert(iv(start, end), OverlapPolicy::Absorb).unwrap();
        set.check_invariants().unwrap();
        insertion
    }

    #[test]
    fn insert_into_empty() {
        let mut set = OwnerRangeSet::new(TOKEN);
        absorb(&mut set, 0, 100);
        assert_eq!(bounds(&set), [(0, 100)]);
    }

    #[test]
    fn insert_before_without_merge() {
        let mut set = set_of(&[(200, 205)]);
        let ins = absorb(&mut set, 0, 100);
        assert_eq!(bounds(&set), [(0, 100), (200, 205)]);
        assert_eq!(ins.index, 0);
        assert_eq!(ins.absorbed, 0);
    }

    #[test]
    fn merge_left() {
        let mut set = set_of(&[(0, 80), (200, 210)]);
        absorb(&mut set, 80, 100);
        assert_eq!(bounds(&set), [(0, 100), (200, 210)]);
    }

    #[test]
    fn merge_right() {
        let mut set = set_of(&[(0, 80), (200, 210)]);
        absorb(&mut set, 110, 200);
        assert_eq!(bounds(&set), [(0, 80), (110, 210)]);
    }

    #[test]
    fn fill_gap_merges_three() {
        let mut set = set_of(&[(0, 80), (200, 210)]);
        let ins = absorb(&mut set, 80, 200);
        assert_eq!(bounds(&set), [(0, 210)]);
        assert_eq!(ins.absorbed, 2);
        assert!(!ins.overlapped);
    }

    #[test]
    fn insert_in_middle_keeps_order() {
        let mut set = set_of(&[(0, 80), (81, 82), (93, 97), (200, 210)]);
        let ins = absorb(&mut set, 100, 150);
        assert_eq!(
            bounds(&set),
            [(0, 80), (81, 82), (93, 97), (100, 150), (200, 210)]
        );
        assert_eq!(ins.index, 3);
    }

    #[test]
    fn absorb_overlap_spans_everything_touched() {
        let mut set = set_of(&[(0, 10), (20, 30), (40, 50), (60, 70)]);
        let ins = absorb(&mut set, 25, 45);
        assert_eq!(bounds(&set), [(0, 10), (20, 50), (60, 70)]);
        assert!(ins.overlapped);
        assert_eq!(ins.absorbed, 2);
    }

    #[test]
    fn absorb_subset_is_noop_shape() {
        let mut set = set_of(&[(0, 100)]);
        let ins = absorb(&mut set, 10, 20);
        assert_eq!(bounds(&set), [(0, 100)]);
        assert!(ins.overlapped);
    }

    #[test]
    fn reject_overlap_leaves_set_untouched() {
        let mut set = set_of(&[(0, 10), (20, 30)]);
        let before = set.clone();
        let err = set.insert(iv(5, 20), OverlapPolicy::Reject).unwrap_err();
        assert_eq!(err, Conflict(iv(0, 10)));
        assert_eq!(set, before);
    }

    #[test]
    fn reject_still_merges_touching() {
        let mut set = set_of(&[(0, 10), (20, 30)]);
        set.insert(iv(10, 20), OverlapPolicy::Reject).unwrap();
        assert_eq!(bounds(&set), [(0, 30)]);
    }

    #[test]
    fn remove_exact() {
        let mut set = set_of(&[(0, 10), (20, 30)]);
        set.remove(&iv(0, 10)).unwrap();
        assert_eq!(bounds(&set), [(20, 30)]);
    }

    #[test]
    fn remove_prefix_and_suffix() {
        let mut set = set_of(&[(0, 100)]);
        set.remove(&iv(0, 30)).unwrap();
        assert_eq!(bounds(&set), [(30, 100)]);
        set.remove(&iv(70, 100)).unwrap();
        assert_eq!(bounds(&set), [(30, 70)]);
    }

    #[test]
    fn remove_interior_splits() {
        let mut set = set_of(&[(0, 100), (200, 300)]);
        set.remove(&iv(40, 60)).unwrap();
        assert_eq!(bounds(&set), [(0, 40), (60, 100), (200, 300)]);
        set.check_invariants().unwrap();
    }

    #[test]
    fn remove_across_gap_fails() {
        let mut set = set_of(&[(0, 10), (20, 30)]);
        assert_eq!(set.remove(&iv(5, 25)), Err(NotContained));
        assert_eq!(set.remove(&iv(12, 15)), Err(NotContained));
        assert_eq!(bounds(&set), [(0, 10), (20, 30)]);
    }

    #[test]
    fn remove_before_first_fails() {
        let mut set = set_of(&[(10, 20)]);
        assert_eq!(set.remove(&iv(0, 5)), Err(NotContained));
        assert_eq!(OwnerRangeSet::new(TOKEN).remove(&iv(0, 1)), Err(NotContained));
    }

    #[test]
    fn add_then_remove_restores() {
        let original = set_of(&[(0, 80), (81, 82), (200, 210)]);
        for (s, e) in [(80, 81), (82, 200), (300, 400), (100, 150), (210, 211)] {
            let mut set = original.clone();
            absorb(&mut set, s, e);
            set.remove(&iv(s, e)).unwrap();
            assert_eq!(set, original, "add/remove of [{s}, {e})");
        }
    }

    #[test]
    fn owns_matches_remove() {
        let set = set_of(&[(0, 10), (20, 30)]);
        assert!(set.owns(&iv(20, 30)));
        assert!(set.owns(&iv(2, 3)));
        assert!(!set.owns(&iv(9, 21)));
    }

    #[test]
    fn total_sums_widths() {
        assert_eq!(set_of(&[(0, 10), (20, 35)]).total(), 25);
        assert_eq!(OwnerRangeSet::new(TOKEN).total(), 0);
    }

    #[test]
    fn from_sorted_rejects_bad_input() {
        assert!(OwnerRangeSet::from_sorted(TOKEN, vec![iv(0, 10), iv(10, 20)]).is_err());
        assert!(OwnerRangeSet::from_sorted(TOKEN, vec![iv(0, 10), iv(5, 20)]).is_err());
        assert!(OwnerRangeSet::from_sorted(TOKEN, vec![iv(20, 30), iv(0, 10)]).is_err());
        let other = Interval::new(TokenId(9), 0, 1).unwrap();
        assert!(OwnerRangeSet::from_sorted(TOKEN, vec![other]).is_err());
    }
}

//! Range picking for spends.
//!
//! Picks whole intervals in ascending `start` order until their widths
//! cover the requested amount. Ascending order keeps the result stable for
//! unchanged state, so a caller can pick, then remove exactly what it got.

use ledger_core::Interval;

/// Intervals selected to cover a spend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedRanges {
    /// Selected intervals, ascending by start.
    pub selected: Vec<Interval>,
    /// Sum of selected widths. At least the requested amount; the excess
    /// is change for the caller to handle.
    pub total: u128,
}

impl PickedRanges {
    /// Units picked beyond `amount`.
    pub fn change(&self, amount: u128) -> u128 {
        self.total.saturating_sub(amount)
    }

    /// The selection trimmed to exactly `amount` units by shortening the
    /// last interval. The trimmed-off tail is the change.
    ///
    /// Returns the selection unchanged if `amount >= total`.
    pub fn exact(&self, amount: u128) -> Vec<Interval> {
        let mut remaining = amount;
        let mut out = Vec::with_capacity(self.selected.len());
        for interval in &self.selected {
            if remaining == 0 {
                break;
            }
            if interval.width() <= remaining {
                remaining -= interval.width();
                out.push(*interval);
            } else {
                let end = interval.start() + remaining;
                if let Ok(head) = Interval::new(interval.token(), interval.start(), end) {
                    out.push(head);
                }
                remaining = 0;
            }
        }
        out
    }
}

/// Select intervals in slice order until their widths reach `amount`.
///
/// `ranges` must be sorted ascending by start (as an
/// [`super::OwnerRangeSet`] is). Returns `None` if the whole slice falls
/// short. A zero `amount` selects nothing.
pub fn pick_ascending(ranges: &[Interval], amount: u128) -> Option<PickedRanges> {
    let mut selected = Vec::new();
    let mut total = 0u128;

    for interval in ranges {
        if total >= amount {
            break;
        }
        selected.push(*interval);
        total += interval.width();
    }

    (total >= amount).then_some(PickedRanges { selected, total })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::TokenId;

    fn iv(start: u128, end: u128) -> Interval {
        Interval::new(TokenId(0), start, end).unwrap()
    }

    #[test]
    fn zero_amount_selects_nothing() {
        let picked = pick_ascending(&[iv(0, 10)], 0).unwrap();
        assert!(picked.selected.is_empty());
        assert_eq!(picked.total, 0);
    }

    #[test]
    fn single_interval_overshoots() {
        let picked = pick_ascending(&[iv(0, 150)], 120).unwrap();
        assert_eq!(picked.selected, vec![iv(0, 150)]);
        assert_eq!(picked.total, 150);
        assert_eq!(picked.change(120), 30);
    }

    #[test]
    fn takes_in_ascending_order() {
        let ranges = [iv(0, 5), iv(10, 100), iv(200, 201)];
        let picked = pick_ascending(&ranges, 20).unwrap();
        assert_eq!(picked.selected, vec![iv(0, 5), iv(10, 100)]);
        assert_eq!(picked.total, 95);
    }

    #[test]
    fn exact_total_stops() {
        let ranges = [iv(0, 10), iv(20, 30), iv(40, 50)];
        let picked = pick_ascending(&ranges, 20).unwrap();
        assert_eq!(picked.selected.len(), 2);
        assert_eq!(picked.total, 20);
    }

    #[test]
    fn insufficient_returns_none() {
        assert!(pick_ascending(&[iv(0, 10), iv(20, 25)], 16).is_none());
        assert!(pick_ascending(&[], 1).is_none());
    }

    #[test]
    fn exact_trims_last_interval() {
        let picked = pick_ascending(&[iv(0, 5), iv(10, 100)], 20).unwrap();
        assert_eq!(picked.exact(20), vec![iv(0, 5), iv(10, 25)]);
        assert_eq!(picked.exact(5), vec![iv(0, 5)]);
        assert_eq!(picked.exact(1_000), picked.selected);
    }

    #[test]
    fn deterministic() {
        let ranges = [iv(3, 9), iv(11, 40), iv(50, 51)];
        assert_eq!(pick_ascending(&ranges, 30), pick_ascending(&ranges, 30));
    }
}

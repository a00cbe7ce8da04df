//! Adaptive page sizing.
//!
//! The engine grows its page size while reads are going well and shrinks
//! it when the link degrades, bounded to a configured window. Flaky BLE
//! links often tolerate small reads long after large ones start failing.

use ble_sync_types::PageSize;

/// How the last paging round went, as judged by the saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// Everything worked; grow.
    Stable,
    /// Working, but errors were seen recently; grow cautiously.
    MostlyStable,
    /// A recoverable failure; shrink.
    TransientFailure,
    /// A serious failure; shrink hard.
    HardFailure,
}

/// Computes the next page size from the current one and the last outcome.
pub trait PageSizingPolicy: Send + Sync {
    /// The page size to use for the next read.
    fn next(&self, current: PageSize, outcome: PageOutcome) -> PageSize;
}

/// The default policy: linear steps bounded to `[min_page, max_page]`.
#[derive(Debug, Clone)]
pub struct BoundedPageSizing {
    min_page: u32,
    max_page: u32,
    grow_step: u32,
    shrink_step: u32,
}

impl BoundedPageSizing {
    /// Create a policy. All parameters are clamped to be positive and
    /// `max_page` is raised to at least `min_page`.
    pub fn new(min_page: u32, max_page: u32, grow_step: u32, shrink_step: u32) -> Self {
        let min_page = min_page.max(1);
        Self {
            min_page,
            max_page: max_page.max(min_page),
            grow_step: grow_step.max(1),
            shrink_step: shrink_step.max(1),
        }
    }

    fn clamped(&self, value: u32) -> PageSize {
        // min_page >= 1, so the clamp result is always a valid PageSize.
        PageSize::new(value.clamp(self.min_page, self.max_page))
            .unwrap_or_else(|| PageSize::new(self.min_page).expect("min_page is positive"))
    }
}

impl Default for BoundedPageSizing {
    fn default() -> Self {
        Self::new(20, 200, 20, 20)
    }
}

impl PageSizingPolicy for BoundedPageSizing {
    fn next(&self, current: PageSize, outcome: PageOutcome) -> PageSize {
        let current = current.value();
        let next = match outcome {
            PageOutcome::Stable => current.saturating_add(self.grow_step),
            PageOutcome::MostlyStable => current.saturating_add((self.grow_step / 2).max(1)),
            PageOutcome::TransientFailure => current.saturating_sub(self.shrink_step),
            PageOutcome::HardFailure => current.saturating_sub(self.shrink_step.saturating_mul(2)),
        };
        self.clamped(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(value: u32) -> PageSize {
        PageSize::new(value).unwrap()
    }

    #[test]
    fn stable_grows_by_full_step() {
        let policy = BoundedPageSizing::new(20, 200, 20, 20);
        assert_eq!(policy.next(page(20), PageOutcome::Stable), page(40));
        assert_eq!(policy.next(page(50), PageOutcome::Stable), page(70));
    }

    #[test]
    fn mostly_stable_grows_by_half_step() {
        let policy = BoundedPageSizing::new(20, 200, 20, 20);
        assert_eq!(policy.next(page(20), PageOutcome::MostlyStable), page(30));
    }

    #[test]
    fn hard_failure_shrinks_twice_as_fast() {
        let policy = BoundedPageSizing::new(20, 200, 20, 20);
        assert_eq!(policy.next(page(40), PageOutcome::HardFailure), page(20));
        assert_eq!(
            policy.next(page(100), PageOutcome::TransientFailure),
            page(80)
        );
        assert_eq!(policy.next(page(100), PageOutcome::HardFailure), page(60));
    }

    #[test]
    fn growth_is_capped_at_max_page() {
        let policy = BoundedPageSizing::new(20, 200, 20, 20);
        assert_eq!(policy.next(page(195), PageOutcome::Stable), page(200));
        assert_eq!(policy.next(page(200), PageOutcome::Stable), page(200));
    }

    #[test]
    fn shrink_is_floored_at_min_page() {
        let policy = BoundedPageSizing::new(20, 200, 20, 20);
        assert_eq!(policy.next(page(25), PageOutcome::HardFailure), page(20));
        assert_eq!(policy.next(page(20), PageOutcome::TransientFailure), page(20));
    }

    #[test]
    fn tiny_grow_step_still_moves() {
        let policy = BoundedPageSizing::new(1, 100, 1, 1);
        assert_eq!(policy.next(page(10), PageOutcome::MostlyStable), page(11));
    }

    #[test]
    fn degenerate_bounds_are_normalized() {
        let policy = BoundedPageSizing::new(50, 10, 20, 20);
        // max_page raised to min_page; everything pins to 50.
        assert_eq!(policy.next(page(50), PageOutcome::Stable), page(50));
        assert_eq!(policy.next(page(50), PageOutcome::HardFailure), page(50));
    }
}

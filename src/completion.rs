// Completion detector: decides when enough of the shape has been scratched.

use crate::types::ScratchMask;

/// Fraction of the itchy pixels revealed so far, in [0, 1].
/// An empty silhouette counts as fully revealed.
pub fn revealed_fraction(covered: usize, itchy_pixel_count: usize) -> f64 {
    if itchy_pixel_count == 0 {
        return 1.0;
    }
    let revealed = itchy_pixel_count.saturating_sub(covered);
    revealed as f64 / itchy_pixel_count as f64
}

/// True once the revealed fraction meets or exceeds `threshold`.
///
/// Uses the same fraction as [`revealed_fraction`], so reported progress and
/// completion always agree.
pub fn check_completion(mask: &ScratchMask, itchy_pixel_count: usize, threshold: f64) -> bool {
    if itchy_pixel_count == 0 {
        return true;
    }
    revealed_fraction(mask.covered_count(), itchy_pixel_count) >= threshold
}

/// One-shot wrapper around [`check_completion`]: fires at most once until reset.
#[derive(Debug, Clone)]
pub struct CompletionDetector {
    threshold: f64,
    fired: bool,
    checks: usize,
}

impl CompletionDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold, fired: false, checks: 0 }
    }

    /// Returns true exactly on the first check that crosses the threshold.
    /// Later calls return false without looking at the mask.
    pub fn check(&mut self, mask: &ScratchMask, itchy_pixel_count: usize) -> bool {
        if self.fired {
            return false;
        }
        self.checks += 1;
        if check_completion(mask, itchy_pixel_count, self.threshold) {
            self.fired = true;
            return true;
        }
        false
    }

    pub fn is_complete(&self) -> bool {
        self.fired
    }

    /// Number of times the mask was actually inspected.
    pub fn checks(&self) -> usize {
        self.checks
    }
}

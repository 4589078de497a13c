/// Guard pattern finders: reference-ratio matching over one row's bar runs
use super::runs::BarRuns;
use crate::config::ScanConfig;

/// Module size (px) below which the stop finder relaxes its tolerances
const SMALL_MODULE_PX: f32 = 1.5;
/// Tolerance multiplier applied to sub-1.5 px modules
const SMALL_MODULE_RELAX: f32 = 1.5;

/// One guard-pattern match on one row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pattern {
    /// Row index of the match
    pub row: u32,
    /// First column of the matched bars
    pub x_in: u32,
    /// One past the last column of the matched bars
    pub x_end: u32,
    /// Module length implied by this match (px)
    pub module: f32,
}

impl Pattern {
    /// Matched span in pixels
    pub fn width(&self) -> u32 {
        self.x_end - self.x_in
    }
}

/// Tolerances shared by every finder, taken from the scan config
#[derive(Debug, Clone, Copy)]
pub struct FinderTolerances {
    /// Quiet zone in modules
    pub min_quiet_zone: f32,
    /// Per-element deviation limit
    pub max_symbol_difference: f32,
    /// Average deviation limit
    pub max_average_difference: f32,
    /// Largest accepted module (px)
    pub max_module: f32,
    /// Neighbouring bar ratio for reference-less guards
    pub max_bar_length_difference: f32,
}

impl FinderTolerances {
    /// Copy the finder-related fields of `config`
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            min_quiet_zone: config.min_quiet_zone,
            max_symbol_difference: config.max_pattern_symbol_difference,
            max_average_difference: config.max_pattern_average_symbol_difference,
            max_module: config.max_module_size,
            max_bar_length_difference: config.max_bar_length_difference,
        }
    }
}

/// Which end of the symbol a finder looks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardSide {
    /// Leading guard, quiet zone before it
    Start,
    /// Trailing guard, quiet zone after it
    Stop,
}

/// Guard pattern finder strategy
///
/// `reference` holds relative element widths beginning with a bar. An empty
/// reference selects the "black region next to a quiet zone" variant.
#[derive(Debug, Clone)]
pub struct GuardFinder {
    side: GuardSide,
    reference: Vec<u8>,
    reference_sum: f32,
}

impl GuardFinder {
    /// Finder for `side` matching `reference` widths
    pub fn new(side: GuardSide, reference: &[u8]) -> Self {
        Self {
            side,
            reference: reference.to_vec(),
            reference_sum: reference.iter().map(|&w| w as f32).sum(),
        }
    }

    /// Guard side this finder reports
    pub fn side(&self) -> GuardSide {
        self.side
    }

    /// Reference widths; empty for the quiet-zone-only variant
    pub fn reference(&self) -> &[u8] {
        &self.reference
    }

    /// Lazily yield every match on one row
    pub fn find<'a>(
        &'a self,
        runs: &'a BarRuns,
        row: u32,
        tol: &'a FinderTolerances,
    ) -> impl Iterator<Item = Pattern> + 'a {
        (runs.first_black_index()..runs.len())
            .step_by(2)
            .filter_map(move |i| match (self.side, self.reference.is_empty()) {
                (GuardSide::Start, false) => self.match_start(runs, i, row, tol),
                (GuardSide::Stop, false) => self.match_stop(runs, i, row, tol),
                (GuardSide::Start, true) => match_empty_start(runs, i, row, tol),
                (GuardSide::Stop, true) => match_empty_stop(runs, i, row, tol),
            })
    }

    /// Pattern beginning at bar `i`, preceded by the quiet zone
    fn match_start(&self, runs: &BarRuns, i: usize, row: u32, tol: &FinderTolerances) -> Option<Pattern> {
        let k = self.reference.len();
        if i == 0 || i + k > runs.len() {
            return None;
        }
        let total = runs.width(i, k);
        let module = total as f32 / self.reference_sum;
        if module > tol.max_module {
            return None;
        }
        if (runs.length(i - 1) as f32) < tol.min_quiet_zone * module {
            return None;
        }
        if !matches_reference(&runs.lengths()[i..i + k], &self.reference, module, tol, 1.0) {
            return None;
        }
        Some(Pattern {
            row,
            x_in: runs.start(i),
            x_end: runs.start(i) + total,
            module,
        })
    }

    /// Pattern ending at bar `e`, followed by the quiet zone
    fn match_stop(&self, runs: &BarRuns, e: usize, row: u32, tol: &FinderTolerances) -> Option<Pattern> {
        let k = self.reference.len();
        if e + 1 < k || e + 1 >= runs.len() {
            return None;
        }
        let i = e + 1 - k;
        let total = runs.width(i, k);
        let module = total as f32 / self.reference_sum;
        if module > tol.max_module {
            return None;
        }
        if (runs.length(e + 1) as f32) < tol.min_quiet_zone * module {
            return None;
        }
        let relax = if module < SMALL_MODULE_PX {
            SMALL_MODULE_RELAX
        } else {
            1.0
        };
        if !matches_reference(&runs.lengths()[i..=e], &self.reference, module, tol, relax) {
            return None;
        }
        Some(Pattern {
            row,
            x_in: runs.start(i),
            x_end: runs.start(i) + total,
            module,
        })
    }
}

/// Weighted element-by-element comparison against a reference
///
/// Each element's deviation is measured in modules and divided by its
/// reference width, so wide elements get proportionally more slack.
fn matches_reference(
    lengths: &[u32],
    reference: &[u8],
    module: f32,
    tol: &FinderTolerances,
    relax: f32,
) -> bool {
    let mut total_diff = 0.0f32;
    for (&len, &expected) in lengths.iter().zip(reference) {
        let expected = expected as f32;
        let diff = (len as f32 / module - expected).abs() / expected;
        if diff >= tol.max_symbol_difference * relax {
            return false;
        }
        total_diff += diff;
    }
    total_diff / (reference.len() as f32) < tol.max_average_difference * relax
}

fn bars_comparable(a: u32, b: u32, max_ratio: f32) -> bool {
    let (lo, hi) = (a.min(b) as f32, a.max(b) as f32);
    lo > 0.0 && hi / lo <= max_ratio
}

/// Bar `i` with a quiet zone before it and a comparable bar after it
fn match_empty_start(runs: &BarRuns, i: usize, row: u32, tol: &FinderTolerances) -> Option<Pattern> {
    if i == 0 || i + 2 >= runs.len() {
        return None;
    }
    let bar = runs.length(i);
    let next_bar = runs.length(i + 2);
    if !bars_comparable(bar, next_bar, tol.max_bar_length_difference) {
        return None;
    }
    let module = bar.min(next_bar) as f32;
    if module > tol.max_module || (runs.length(i - 1) as f32) < tol.min_quiet_zone * module {
        return None;
    }
    Some(Pattern {
        row,
        x_in: runs.start(i),
        x_end: runs.start(i) + bar,
        module,
    })
}

/// Bar `e` with a comparable bar before it and a quiet zone after it
fn match_empty_stop(runs: &BarRuns, e: usize, row: u32, tol: &FinderTolerances) -> Option<Pattern> {
    if e < 2 || e + 1 >= runs.len() {
        return None;
    }
    let bar = runs.length(e);
    let prev_bar = runs.length(e - 2);
    if !bars_comparable(bar, prev_bar, tol.max_bar_length_difference) {
        return None;
    }
    let module = bar.min(prev_bar) as f32;
    if module > tol.max_module || (runs.length(e + 1) as f32) < tol.min_quiet_zone * module {
        return None;
    }
    Some(Pattern {
        row,
        x_in: runs.start(e),
        x_end: runs.start(e) + bar,
        module,
    })
}

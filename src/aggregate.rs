//! Result aggregation: overlap resolution and deterministic ordering

use crate::models::FoundBarcode;
use crate::utils::geometry::quads_overlap;
use log::trace;

/// Accepted results of one decode call
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    results: Vec<FoundBarcode>,
    padding: f32,
    confidence_ratio: f32,
}

impl ResultAggregator {
    /// `padding` in px widens the overlap test; overlapping results below
    /// `confidence_ratio` of the existing confidence are dropped
    pub fn new(padding: f32, confidence_ratio: f32) -> Self {
        Self {
            results: Vec::new(),
            padding,
            confidence_ratio,
        }
    }

    /// Offer a result; returns whether it was kept
    ///
    /// `found` is weighed against every stored result it overlaps. It is
    /// dropped if any of them carries the same value, is clearly more
    /// confident or spans at least as far; otherwise it replaces all of them.
    pub fn add(&mut self, found: FoundBarcode) -> bool {
        let overlapping: Vec<usize> = self
            .results
            .iter()
            .enumerate()
            .filter(|(_, r)| quads_overlap(&r.polygon, &found.polygon, self.padding))
            .map(|(i, _)| i)
            .collect();

        for &idx in &overlapping {
            let existing = &self.results[idx];
            if existing.value == found.value {
                trace!("duplicate '{}' dropped", found.value);
                return false;
            }
            if found.confidence < existing.confidence * self.confidence_ratio {
                trace!(
                    "'{}' overlaps more confident '{}', dropped",
                    found.value, existing.value
                );
                return false;
            }
            if found.span() <= existing.span() {
                trace!("'{}' overlaps larger '{}', dropped", found.value, existing.value);
                return false;
            }
        }

        // Indices ascend, so removing from the back keeps the rest valid
        for &idx in overlapping.iter().rev() {
            trace!("'{}' replaces smaller '{}'", found.value, self.results[idx].value);
            self.results.remove(idx);
        }
        self.results.push(found);
        true
    }

    /// Number of results accepted so far
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether nothing has been accepted yet
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Results ordered top to bottom, then left to right
    pub fn finish(mut self) -> Vec<FoundBarcode> {
        self.results.sort_by(|a, b| {
            let (pa, pb) = (a.top_left(), b.top_left());
            pa.y.total_cmp(&pb.y).then(pa.x.total_cmp(&pb.x))
        });
        self.results
    }
}

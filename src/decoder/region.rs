//! Region sampling and decode orchestration for one candidate
//!
//! Scan lines are placed across both guard clusters at the configured
//! fractional positions. The first line whose read passes the quality gates
//! and decodes wins. Mirrored symbologies get a second, reversed attempt when
//! the forward one is weak. A successful region is tightened by following
//! the outer guard bars to their ends.

use super::line_reader::LineReader;
use crate::config::ScanConfig;
use crate::detector::candidate::Candidate;
use crate::detector::cluster::PatternCluster;
use crate::models::{BarcodeRegion, BitMatrix, Point};
use crate::symbology::Symbology;
use crate::utils::geometry::angle_between;
use log::{debug, trace};

/// Bars wider than this many modules end an edge walk
const MAX_TRACKED_BAR_MODULES: f32 = 6.0;
/// Boundary points averaged at the end of a walk
const TRACK_TAIL: usize = 3;
/// Lower bound on the cosine used to stretch the module along a slanted scan line
const MIN_LINE_COS: f32 = 0.5;

/// Decodes candidates of one symbology in one image
pub struct RegionDecoder<'a, R: LineReader + ?Sized> {
    image: &'a BitMatrix,
    config: &'a ScanConfig,
    symbology: &'a Symbology,
    reader: &'a R,
}

impl<'a, R: LineReader + ?Sized> RegionDecoder<'a, R> {
    /// Borrow everything one decode call needs
    pub fn new(
        image: &'a BitMatrix,
        config: &'a ScanConfig,
        symbology: &'a Symbology,
        reader: &'a R,
    ) -> Self {
        Self {
            image,
            config,
            symbology,
            reader,
        }
    }

    /// Decode one candidate, refining its corners and consuming its clusters
    ///
    /// Returns `None` when no scan line in either direction decodes.
    pub fn decode(&self, clusters: &mut [PatternCluster], candidate: &Candidate) -> Option<BarcodeRegion> {
        let mut best = self.try_direction(clusters, candidate, false);

        let weak = best
            .as_ref()
            .is_none_or(|r| r.confidence < self.config.min_robust_confidence);
        if weak && self.config.reverse_enabled && self.symbology.params.is_mirrored() {
            if let Some(reversed) = self.try_direction(clusters, candidate, true) {
                if best.as_ref().is_none_or(|r| reversed.confidence > r.confidence) {
                    best = Some(reversed);
                }
            }
        }

        let mut region = best?;
        self.refine_corners(clusters, candidate, &mut region);

        if region.confidence > self.config.min_robust_confidence {
            clusters[candidate.start].opposite = Some(candidate.stop);
            clusters[candidate.stop].opposite = Some(candidate.start);
        }
        debug!(
            "{} decoded '{}' (confidence {:.2}, reversed {})",
            self.symbology.kind, region.value, region.confidence, region.reversed
        );
        Some(region)
    }

    fn try_direction(
        &self,
        clusters: &[PatternCluster],
        candidate: &Candidate,
        reversed: bool,
    ) -> Option<BarcodeRegion> {
        let start = &clusters[candidate.start];
        let stop = &clusters[candidate.stop];
        let mut region = BarcodeRegion::new(candidate.corners, reversed);

        for &mid in self.config.active_mid_points() {
            let sp = start.pattern_at(mid);
            let ep = stop.pattern_at(mid);
            let a = Point::new(sp.x_in as f32, sp.row as f32 + 0.5);
            let b = Point::new(ep.x_end as f32, ep.row as f32 + 0.5);
            let (from, to) = if reversed { (b, a) } else { (a, b) };

            let cos = angle_between(&(b - a), &candidate.axis)
                .to_radians()
                .cos()
                .max(MIN_LINE_COS);
            let read = self.reader.read(self.image, candidate.module / cos, from, to);
            trace!(
                "mid {mid}: {} elements, error {:.3}, confidence {:.3}",
                read.codewords.len(),
                read.error,
                read.confidence
            );

            if read.error >= self.config.max_read_error
                || read.confidence < self.config.min_confidence
                || read.confidence <= region.confidence
            {
                continue;
            }
            let mut attempt = region.clone();
            if (self.symbology.decode)(&mut attempt, &read.codewords) {
                attempt.confidence = read.confidence;
                attempt.codewords = read.codewords;
                region = attempt;
                break;
            }
        }

        region.is_decoded().then_some(region)
    }

    /// Replace each side of the quad with tracked bar ends when they span further
    fn refine_corners(&self, clusters: &[PatternCluster], candidate: &Candidate, region: &mut BarcodeRegion) {
        let cos = candidate.angle.to_radians().cos();

        let start = &clusters[candidate.start];
        if let Some((up, down)) = self.track(start) {
            if up.distance(&down) > region.corners[0].distance(&region.corners[3]) {
                region.corners[0] = up;
                region.corners[3] = down;
            }
        }

        let stop = &clusters[candidate.stop];
        if let Some((up, down)) = self.track(stop) {
            let offset = candidate.axis * (stop.pattern_width() * cos);
            let (up, down) = (up + offset, down + offset);
            if up.distance(&down) > region.corners[1].distance(&region.corners[2]) {
                region.corners[1] = up;
                region.corners[2] = down;
            }
        }
    }

    /// Follow the left edge of the cluster's first guard bar to both of its ends
    pub fn track(&self, cluster: &PatternCluster) -> Option<(Point, Point)> {
        let seed = cluster.pattern_at(0.5);
        let guard = if cluster.is_start() {
            &self.symbology.params.start_pattern
        } else {
            &self.symbology.params.stop_pattern
        };
        let first_bar = guard
            .first()
            .map_or(seed.width() as f32, |&w| w as f32 * seed.module);
        let origin = Point::new(seed.x_in as f32 + first_bar / 2.0, seed.row as f32 + 0.5);

        let up = self.walk(origin, -cluster.direction, seed.module)?;
        let down = self.walk(origin, cluster.direction, seed.module)?;
        Some((up, down))
    }

    fn walk(&self, origin: Point, step: Point, module: f32) -> Option<Point> {
        let mut edges: Vec<Point> = Vec::new();
        let mut p = origin;
        let limit = self.image.width() + self.image.height();
        for _ in 0..limit {
            let y = p.y.floor() as i32;
            if y < 0 || y as usize >= self.image.height() {
                break;
            }
            let Some((left, right)) = self.bar_near(p.x, y, module) else {
                break;
            };
            edges.push(Point::new(left as f32, y as f32 + 0.5));
            p = Point::new((left + right) as f32 / 2.0, p.y) + step;
        }

        let tail = &edges[edges.len().saturating_sub(TRACK_TAIL)..];
        if tail.is_empty() {
            return None;
        }
        let sum = tail.iter().fold(Point::default(), |acc, &q| acc + q);
        let n = tail.len() as f32;
        Some(Point::new(sum.x / n, sum.y / n))
    }

    /// Black run `[left, right)` on row `y` closest to column `x`
    fn bar_near(&self, x: f32, y: i32, module: f32) -> Option<(i32, i32)> {
        let reach = (module / 2.0 + 1.0).ceil() as i32;
        let max_width = (MAX_TRACKED_BAR_MODULES * module).ceil() as i32;
        let cx = x.floor() as i32;
        let hit = (0..=reach)
            .flat_map(|d| [cx - d, cx + d])
            .find(|&px| self.image.is_black(px, y))?;

        let mut left = hit;
        while self.image.is_black(left - 1, y) && hit - left <= max_width {
            left -= 1;
        }
        let mut right = hit + 1;
        while self.image.is_black(right, y) && right - left <= max_width {
            right += 1;
        }
        (right - left <= max_width).then_some((left, right))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::line_reader::LineRead;
    use crate::detector::cluster::ClusterBuilder;
    use crate::detector::pattern::{GuardSide, Pattern};
    use crate::symbology::{ean13, itf};
    use approx::assert_relative_eq;
    use std::sync::Mutex;

    /// Returns canned reads and records every segment it was asked for
    struct ScriptedReader {
        forward: Vec<u32>,
        backward: Vec<u32>,
        calls: Mutex<Vec<(Point, Point)>>,
    }

    impl LineReader for ScriptedReader {
        fn read(&self, _image: &BitMatrix, _module: f32, from: Point, to: Point) -> LineRead {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push((from, to));
            }
            let codewords = if from.x < to.x {
                self.forward.clone()
            } else {
                self.backward.clone()
            };
            LineRead {
                codewords,
                error: 0.1,
                max_error: 0.2,
                confidence: 0.8,
            }
        }
    }

    fn clusters(left_side: GuardSide, ref_sum: (f32, f32)) -> Vec<PatternCluster> {
        let mut out = Vec::new();
        for (side, x, sum) in [(left_side, 20u32, ref_sum.0), (GuardSide::Stop, 208u32, ref_sum.1)] {
            let mut builder = ClusterBuilder::new(side, 400, 6, 6);
            for row in (10..50).step_by(2) {
                builder.add(Pattern {
                    row,
                    x_in: x,
                    x_end: x + (2.0 * sum) as u32,
                    module: 2.0,
                });
            }
            out.extend(builder.finish(1));
        }
        out
    }

    fn candidate() -> Candidate {
        Candidate {
            start: 0,
            stop: 1,
            module: 2.0,
            angle: 0.0,
            axis: Point::new(1.0, 0.0),
            corners: [
                Point::new(20.0, 10.5),
                Point::new(218.0, 10.5),
                Point::new(218.0, 48.5),
                Point::new(20.0, 48.5),
            ],
        }
    }

    fn codewords(widths: Vec<u8>) -> Vec<u32> {
        widths.into_iter().map(u32::from).collect()
    }

    #[test]
    fn test_first_successful_line_wins() {
        let image = BitMatrix::new(400, 80);
        let config = ScanConfig::default();
        let symbology = itf::symbology();
        let reader = ScriptedReader {
            forward: codewords(itf::encode("0123456789").unwrap()),
            backward: Vec::new(),
            calls: Mutex::new(Vec::new()),
        };
        let mut arena = clusters(GuardSide::Start, (4.0, 5.0));
        let decoder = RegionDecoder::new(&image, &config, &symbology, &reader);

        let region = decoder.decode(&mut arena, &candidate()).unwrap();
        assert_eq!(region.value, "0123456789");
        assert!(!region.reversed);
        assert_relative_eq!(region.confidence, 0.8);
        assert_eq!(reader.calls.lock().unwrap().len(), 1);
        // Confident decodes consume both clusters
        assert_eq!(arena[0].opposite, Some(1));
        assert_eq!(arena[1].opposite, Some(0));
    }

    #[test]
    fn test_reverse_read_for_mirrored_guards() {
        let image = BitMatrix::new(400, 80);
        let config = ScanConfig::default();
        let symbology = ean13::symbology();
        let mut widths = ean13::encode("4006381333931").unwrap();
        widths.reverse();
        let reader = ScriptedReader {
            forward: codewords(widths.clone()),
            backward: codewords(ean13::encode("4006381333931").unwrap()),
            calls: Mutex::new(Vec::new()),
        };
        let mut arena = clusters(GuardSide::Start, (3.0, 3.0));
        let decoder = RegionDecoder::new(&image, &config, &symbology, &reader);

        let region = decoder.decode(&mut arena, &candidate()).unwrap();
        assert_eq!(region.value, "4006381333931");
        assert!(region.reversed);
        // Every forward line failed before the reverse pass succeeded on its first line
        let calls = reader.calls.lock().unwrap();
        assert_eq!(calls.len(), config.mid_points.len() + 1);
    }

    #[test]
    fn test_no_reverse_when_disabled_or_not_mirrored() {
        let image = BitMatrix::new(400, 80);
        let symbology = ean13::symbology();
        let reader = ScriptedReader {
            forward: Vec::new(),
            backward: codewords(ean13::encode("4006381333931").unwrap()),
            calls: Mutex::new(Vec::new()),
        };
        let config = ScanConfig {
            reverse_enabled: false,
            try_different_lines_of_barcode_region: false,
            ..ScanConfig::default()
        };
        let mut arena = clusters(GuardSide::Start, (3.0, 3.0));
        let decoder = RegionDecoder::new(&image, &config, &symbology, &reader);
        assert!(decoder.decode(&mut arena, &candidate()).is_none());
        assert_eq!(reader.calls.lock().unwrap().len(), 1);
        assert_eq!(arena[0].opposite, None);
    }

    #[test]
    fn test_weak_decode_keeps_clusters_available() {
        let image = BitMatrix::new(400, 80);
        let config = ScanConfig {
            min_robust_confidence: 0.9,
            ..ScanConfig::default()
        };
        let symbology = itf::symbology();
        let reader = ScriptedReader {
            forward: codewords(itf::encode("42").unwrap()),
            backward: Vec::new(),
            calls: Mutex::new(Vec::new()),
        };
        let mut arena = clusters(GuardSide::Start, (4.0, 5.0));
        let decoder = RegionDecoder::new(&image, &config, &symbology, &reader);
        assert!(decoder.decode(&mut arena, &candidate()).is_some());
        assert_eq!(arena[0].opposite, None);
        assert_eq!(arena[1].opposite, None);
    }

    #[test]
    fn test_track_follows_bar_to_its_ends() {
        let mut image = BitMatrix::new(60, 70);
        for y in 5..60 {
            for x in 20..22 {
                image.set(x, y, true);
            }
        }
        let config = ScanConfig::default();
        let symbology = itf::symbology();
        let reader = ScriptedReader {
            forward: Vec::new(),
            backward: Vec::new(),
            calls: Mutex::new(Vec::new()),
        };
        let arena = clusters(GuardSide::Start, (4.0, 5.0));
        let decoder = RegionDecoder::new(&image, &config, &symbology, &reader);

        let (up, down) = decoder.track(&arena[0]).unwrap();
        assert_relative_eq!(up.x, 20.0);
        assert_relative_eq!(down.x, 20.0);
        // Mean of the last three rows reached in each direction
        assert_relative_eq!(up.y, 6.5);
        assert_relative_eq!(down.y, 58.5);
    }
}

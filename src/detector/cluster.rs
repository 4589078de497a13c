/// Online clustering of per-row guard matches into stable markers
use super::pattern::{GuardSide, Pattern};
use crate::models::Point;
use crate::utils::geometry::fit_line;

/// Max ratio between a cluster's average module and a new member's module
const CLUSTER_MODULE_RATIO: f32 = 1.5;
/// Fraction of the ordered members trimmed from each tail before fitting
const ROBUST_LOW: f32 = 0.3;
const ROBUST_HIGH: f32 = 0.7;
/// Clusters with modules at or below this size (px) need only half the rows
const THIN_MODULE_PX: f32 = 1.5;

/// One physical guard pattern seen across several scan rows
#[derive(Debug, Clone)]
pub struct PatternCluster {
    side: GuardSide,
    patterns: Vec<Pattern>,
    module_sum: f32,
    /// First raw member position
    pub a: Point,
    /// Last raw member position
    pub b: Point,
    /// `a` projected onto the line fitted through the trimmed interior
    pub robust_a: Point,
    /// `b` projected onto the line fitted through the trimmed interior
    pub robust_b: Point,
    /// Unit vector along the bars, pointing to increasing rows
    pub direction: Point,
    /// Unit vector across the bars, pointing to increasing columns
    pub normal: Point,
    /// Partner cluster once a confident decode consumed this one
    pub opposite: Option<usize>,
}

fn anchor(p: &Pattern) -> Point {
    Point::new(p.x_in as f32, p.row as f32 + 0.5)
}

impl PatternCluster {
    fn new(side: GuardSide, first: Pattern) -> Self {
        Self {
            side,
            patterns: vec![first],
            module_sum: first.module,
            a: Point::default(),
            b: Point::default(),
            robust_a: Point::default(),
            robust_b: Point::default(),
            direction: Point::new(0.0, 1.0),
            normal: Point::new(1.0, 0.0),
            opposite: None,
        }
    }

    fn push(&mut self, p: Pattern) {
        self.module_sum += p.module;
        self.patterns.push(p);
    }

    /// Guard side the members were matched against
    pub fn side(&self) -> GuardSide {
        self.side
    }

    /// Whether this is a start-guard cluster
    pub fn is_start(&self) -> bool {
        self.side == GuardSide::Start
    }

    /// Members ordered by row
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Always false for a built cluster
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Member on the highest row
    pub fn last(&self) -> &Pattern {
        &self.patterns[self.patterns.len() - 1]
    }

    /// Average module length of the members
    pub fn module(&self) -> f32 {
        self.module_sum / self.patterns.len() as f32
    }

    /// Average matched span of the members (px along the row)
    pub fn pattern_width(&self) -> f32 {
        self.patterns.iter().map(|p| p.width() as f32).sum::<f32>() / self.patterns.len() as f32
    }

    /// Member at a fractional position of the ordered list
    pub fn pattern_at(&self, fraction: f32) -> &Pattern {
        let last = self.patterns.len() - 1;
        let idx = (fraction.clamp(0.0, 1.0) * last as f32).round() as usize;
        &self.patterns[idx.min(last)]
    }

    /// Midpoint of the robust endpoints
    pub fn middle(&self) -> Point {
        self.robust_a.lerp(&self.robust_b, 0.5)
    }

    /// Whether `other`'s module is close enough to join this cluster
    fn accepts_module(&self, module: f32) -> bool {
        let own = self.module();
        let (lo, hi) = if own < module { (own, module) } else { (module, own) };
        lo > 0.0 && hi / lo <= CLUSTER_MODULE_RATIO
    }

    /// Compute endpoints and axis; called once after the row scan
    pub fn calc_params(&mut self) {
        let points: Vec<Point> = self.patterns.iter().map(anchor).collect();
        let n = points.len();
        self.a = points[0];
        self.b = points[n - 1];

        let lo = (ROBUST_LOW * (n - 1) as f32).floor() as usize;
        let hi = (ROBUST_HIGH * (n - 1) as f32).ceil() as usize;
        let fit = fit_line(&points[lo..=hi.min(n - 1)]).or_else(|| fit_line(&points));

        match fit {
            Some((centre, dir)) => {
                let project = |y: f32| {
                    let t = (y - centre.y) / dir.y;
                    centre + dir * t
                };
                self.robust_a = project(self.a.y);
                self.robust_b = project(self.b.y);
                self.direction = dir;
            }
            None => {
                let mean_x = points.iter().map(|p| p.x).sum::<f32>() / n as f32;
                self.robust_a = Point::new(mean_x, self.a.y);
                self.robust_b = Point::new(mean_x, self.b.y);
                self.direction = Point::new(0.0, 1.0);
            }
        }
        self.normal = Point::new(self.direction.y, -self.direction.x);
    }
}

/// Builds clusters for one guard side during the row scan
///
/// `column_index[x]` holds the cluster most recently extended with a member
/// whose `x_in` lies in `(x - max_dx, x]`.
#[derive(Debug)]
pub struct ClusterBuilder {
    side: GuardSide,
    clusters: Vec<PatternCluster>,
    column_index: Vec<Option<usize>>,
    max_dx: usize,
    max_dy: usize,
}

impl ClusterBuilder {
    /// Empty builder for an image `image_width` columns wide
    pub fn new(side: GuardSide, image_width: usize, max_dx: usize, max_dy: usize) -> Self {
        Self {
            side,
            clusters: Vec::new(),
            column_index: vec![None; image_width + max_dx + 1],
            max_dx,
            max_dy,
        }
    }

    /// Extend the nearby cluster with `p` or start a new one
    pub fn add(&mut self, p: Pattern) {
        let x = p.x_in as usize;
        let lookup = (x + self.max_dx / 2).min(self.column_index.len() - 1);

        let existing = self.column_index[lookup].filter(|&idx| {
            let cluster = &self.clusters[idx];
            let last = cluster.last();
            p.row > last.row
                && (p.row - last.row) as usize <= self.max_dy
                && last.x_in.abs_diff(p.x_in) as usize <= self.max_dx
                && cluster.accepts_module(p.module)
        });

        let idx = match existing {
            Some(idx) => {
                self.clusters[idx].push(p);
                idx
            }
            None => {
                self.clusters.push(PatternCluster::new(self.side, p));
                self.clusters.len() - 1
            }
        };

        let end = (x + self.max_dx).min(self.column_index.len());
        for slot in &mut self.column_index[x.min(end)..end] {
            *slot = Some(idx);
        }
    }

    /// Clusters created so far (unfiltered)
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// Whether no pattern has been added
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Drop undersized clusters and compute geometry for the rest
    pub fn finish(self, min_cluster_size: usize) -> Vec<PatternCluster> {
        let mut kept: Vec<PatternCluster> = self
            .clusters
            .into_iter()
            .filter(|c| {
                let required = if c.module() <= THIN_MODULE_PX {
                    (min_cluster_size / 2).max(1)
                } else {
                    min_cluster_size
                };
                c.len() >= required
            })
            .collect();
        for c in &mut kept {
            c.calc_params();
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pattern(row: u32, x_in: u32, module: f32) -> Pattern {
        Pattern {
            row,
            x_in,
            x_end: x_in + (3.0 * module) as u32,
            module,
        }
    }

    #[test]
    fn test_contiguous_rows_form_one_cluster() {
        let mut builder = ClusterBuilder::new(GuardSide::Start, 200, 6, 6);
        for row in (0..40).step_by(2) {
            builder.add(pattern(row, 50 + (row % 3), 3.0));
        }
        let clusters = builder.finish(5);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 20);
        assert_relative_eq!(clusters[0].module(), 3.0);
    }

    #[test]
    fn test_row_gap_splits_cluster() {
        let mut builder = ClusterBuilder::new(GuardSide::Start, 200, 6, 6);
        for row in 0..10 {
            builder.add(pattern(row, 50, 3.0));
        }
        // Gap of max_cluster_distance_y + 1 rows
        for row in 16..26 {
            builder.add(pattern(row, 50, 3.0));
        }
        let clusters = builder.finish(5);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].len(), 10);
        assert_eq!(clusters[1].patterns()[0].row, 16);
    }

    #[test]
    fn test_gap_within_budget_keeps_cluster() {
        let mut builder = ClusterBuilder::new(GuardSide::Start, 200, 6, 6);
        for row in 0..10 {
            builder.add(pattern(row, 50, 3.0));
        }
        for row in 15..25 {
            builder.add(pattern(row, 50, 3.0));
        }
        assert_eq!(builder.finish(5).len(), 1);
    }

    #[test]
    fn test_module_and_drift_split_clusters() {
        let mut builder = ClusterBuilder::new(GuardSide::Stop, 300, 6, 6);
        for row in 0..10 {
            builder.add(pattern(row, 100, 2.0));
        }
        // Same place, very different module
        builder.add(pattern(10, 100, 6.0));
        // Far to the right
        builder.add(pattern(11, 120, 2.0));
        assert_eq!(builder.len(), 3);
        let clusters = builder.finish(5);
        assert_eq!(clusters.len(), 1);
        assert!(!clusters[0].is_start());
    }

    #[test]
    fn test_thin_modules_halve_min_size() {
        let mut builder = ClusterBuilder::new(GuardSide::Start, 100, 6, 6);
        for row in 0..3 {
            builder.add(pattern(row, 20, 1.0));
        }
        for row in 0..3 {
            builder.add(pattern(row, 60, 3.0));
        }
        let clusters = builder.finish(6);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].patterns()[0].x_in, 20);
    }

    #[test]
    fn test_robust_geometry_ignores_tail_noise() {
        let mut builder = ClusterBuilder::new(GuardSide::Start, 200, 6, 6);
        for row in 0..30u32 {
            // Slanted edge, x = 40 + row / 2, with a noisy first and last member
            let x = match row {
                0 => 42,
                29 => 56,
                _ => 40 + row / 2,
            };
            builder.add(pattern(row, x, 3.0));
        }
        let clusters = builder.finish(5);
        assert_eq!(clusters.len(), 1);
        let c = &clusters[0];
        assert_eq!(c.a, Point::new(42.0, 0.5));
        assert_eq!(c.b, Point::new(56.0, 29.5));
        assert!((c.robust_a.x - 40.0).abs() < 1.0);
        assert!((c.robust_b.x - 54.5).abs() < 1.0);
        assert_relative_eq!(c.direction.length(), 1.0, epsilon = 1e-5);
        // Interior staircase fits a slope of ~0.49, so the normal sits near (2, -1) / sqrt(5)
        assert_relative_eq!(c.normal.x, 2.0 / 5.0f32.sqrt(), epsilon = 0.01);
        assert_relative_eq!(c.normal.y, -1.0 / 5.0f32.sqrt(), epsilon = 0.01);
        assert!(c.direction.y > 0.0);
    }

    #[test]
    fn test_steep_edge_stays_one_cluster() {
        let config = crate::config::ScanConfig::default();
        let mut builder = ClusterBuilder::new(
            GuardSide::Start,
            400,
            config.max_cluster_distance_x,
            config.max_cluster_distance_y,
        );
        // Guard edge at the maximum axis angle moves 3-4 columns per scanned row
        let slope = config.max_barcode_angle.to_radians().tan();
        for row in (0..40u32).step_by(config.scan_step) {
            let x = 20 + (row as f32 * slope).round() as u32;
            builder.add(pattern(row, x, 3.0));
        }
        let clusters = builder.finish(config.min_cluster_size);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 20);
    }

    #[test]
    fn test_pattern_at_fraction() {
        let mut builder = ClusterBuilder::new(GuardSide::Start, 200, 6, 6);
        for row in 0..11 {
            builder.add(pattern(row, 30, 3.0));
        }
        let clusters = builder.finish(1);
        let c = &clusters[0];
        assert_eq!(c.pattern_at(0.0).row, 0);
        assert_eq!(c.pattern_at(0.5).row, 5);
        assert_eq!(c.pattern_at(1.0).row, 10);
        assert_eq!(c.pattern_at(0.97).row, 10);
    }
}

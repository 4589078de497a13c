/// Candidate builder: pair start/stop clusters and validate the geometry
use super::cluster::PatternCluster;
use crate::config::ScanConfig;
use crate::models::Point;
use crate::symbology::SymbologyParams;
use crate::utils::geometry::{angle_between, row_angle, signed_distance};
use log::trace;

/// Clusters shorter than this get doubled skew budgets
const SHORT_CLUSTER: usize = 10;
const SHORT_CLUSTER_WIDEN: f32 = 2.0;
/// Tolerance on the symbol length implied by the module estimate
const MIN_MODULES_SLACK: f32 = 0.7;
const MAX_MODULES_SLACK: f32 = 1.7;

/// A start/stop pairing that passed every geometric check
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Arena index of the start cluster
    pub start: usize,
    /// Arena index of the stop cluster
    pub stop: usize,
    /// Module length along the symbol axis (px)
    pub module: f32,
    /// Angle of the symbol axis against the image rows (degrees)
    pub angle: f32,
    /// Unit vector from the start guard towards the stop guard
    pub axis: Point,
    /// Initial quad, start-top, stop-top, stop-bottom, start-bottom
    pub corners: [Point; 4],
}

/// First check a pairing failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Stop guard is not to the right of the start guard
    Order,
    /// Axis steeper than `max_barcode_angle`
    Angle,
    /// Start and stop modules disagree
    ModuleRatio,
    /// Implied symbol length outside the symbology bounds
    ModuleCount,
    /// Start-to-stop distance outside the side-size bounds
    SideSize,
    /// Clusters drift apart along the bars
    Skew,
    /// A cluster is not perpendicular to the axis
    SkewAngle,
}

/// Start and stop arena indices, each ordered by decreasing cluster size
///
/// Ties keep arena order so the pairing sequence is reproducible.
pub fn pairing_order(clusters: &[PatternCluster]) -> (Vec<usize>, Vec<usize>) {
    let mut starts: Vec<usize> = (0..clusters.len()).filter(|&i| clusters[i].is_start()).collect();
    let mut stops: Vec<usize> = (0..clusters.len()).filter(|&i| !clusters[i].is_start()).collect();
    starts.sort_by_key(|&i| std::cmp::Reverse(clusters[i].len()));
    stops.sort_by_key(|&i| std::cmp::Reverse(clusters[i].len()));
    (starts, stops)
}

fn widen(cluster: &PatternCluster) -> f32 {
    if cluster.len() < SHORT_CLUSTER {
        SHORT_CLUSTER_WIDEN
    } else {
        1.0
    }
}

/// Validate one pairing and derive its module, axis and quad
pub fn check_and_prepare(
    clusters: &[PatternCluster],
    start: usize,
    stop: usize,
    params: &SymbologyParams,
    config: &ScanConfig,
) -> Result<Candidate, Rejection> {
    let s = &clusters[start];
    let e = &clusters[stop];
    let reject = |why: Rejection| {
        trace!("pair {start}/{stop} rejected: {why:?}");
        Err(why)
    };

    let start_mid = s.middle();
    let stop_mid = e.middle();
    let span = stop_mid - start_mid;
    let Some(axis) = span.normalized().filter(|_| span.x > 0.0) else {
        return reject(Rejection::Order);
    };

    let angle = row_angle(&span);
    if angle > config.max_barcode_angle {
        return reject(Rejection::Angle);
    }

    let (mut start_module, mut stop_module) = (s.module(), e.module());
    if start_module <= 0.0 {
        start_module = stop_module;
    }
    if stop_module <= 0.0 {
        stop_module = start_module;
    }
    let (lo, hi) = if start_module < stop_module {
        (start_module, stop_module)
    } else {
        (stop_module, start_module)
    };
    if !(lo > 0.0) || hi / lo > config.max_left_and_right_modules_difference {
        return reject(Rejection::ModuleRatio);
    }

    let cos = angle.to_radians().cos();
    let module = (start_module + stop_module) / 2.0 * cos;
    let distance = span.length();
    let stop_modules = if params.stop_pattern.is_empty() {
        e.pattern_width() / stop_module
    } else {
        params.stop_modules() as f32
    };
    let modules = distance / module + stop_modules;
    if modules < params.min_modules as f32 * MIN_MODULES_SLACK
        || modules > params.max_modules as f32 * MAX_MODULES_SLACK
    {
        return reject(Rejection::ModuleCount);
    }
    if distance < config.min_allowed_barcode_side_size
        || distance > config.max_allowed_barcode_side_size
    {
        return reject(Rejection::SideSize);
    }

    // The longer cluster defines the bar direction; the other one must run parallel to it
    let (reference, other) = if s.len() >= e.len() { (s, e) } else { (e, s) };
    let drift = signed_distance(&other.robust_a, &reference.robust_a, &reference.direction)
        - signed_distance(&other.robust_b, &reference.robust_a, &reference.direction);
    let budget = config.max_skew * other.len() as f32 * config.scan_step as f32 * widen(other);
    if drift.abs() > budget {
        return reject(Rejection::Skew);
    }

    for cluster in [s, e] {
        let a = angle_between(&cluster.normal, &axis);
        let a = a.min(180.0 - a);
        if a > config.max_skew_angle * widen(cluster) {
            return reject(Rejection::SkewAngle);
        }
    }

    let stop_offset = axis * (e.pattern_width() * cos);
    Ok(Candidate {
        start,
        stop,
        module,
        angle,
        axis,
        corners: [
            s.robust_a,
            e.robust_a + stop_offset,
            e.robust_b + stop_offset,
            s.robust_b,
        ],
    })
}

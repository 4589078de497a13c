use crate::aggregate::ResultAggregator;
use crate::config::ScanConfig;
use crate::decoder::line_reader::{LineReader, RunLengthLineReader};
use crate::decoder::region::RegionDecoder;
use crate::detector::candidate::{check_and_prepare, pairing_order};
use crate::detector::cluster::{ClusterBuilder, PatternCluster};
use crate::detector::pattern::{FinderTolerances, GuardFinder, GuardSide};
use crate::detector::runs::BarRuns;
use crate::error::Result;
use crate::models::{BitMatrix, FoundBarcode, Rect};
use crate::symbology::Symbology;
use crate::utils::deadline::Deadline;
use log::debug;
use rayon::prelude::*;

/// Detector and decoder for one symbology
///
/// Holds only immutable state, so one reader can serve many images, including
/// from several threads at once.
pub struct BarcodeReader<R: LineReader = RunLengthLineReader> {
    config: ScanConfig,
    symbology: Symbology,
    reader: R,
    start_finder: GuardFinder,
    stop_finder: GuardFinder,
    tolerances: FinderTolerances,
}

impl BarcodeReader<RunLengthLineReader> {
    /// Reader using the default run-length line sampler
    pub fn new(symbology: Symbology, config: ScanConfig) -> Result<Self> {
        Self::with_reader(symbology, config, RunLengthLineReader::new())
    }
}

impl<R: LineReader> BarcodeReader<R> {
    /// Reader with a custom line-sampling primitive
    ///
    /// Fails with `InvalidConfig` or `InvalidSymbology` before any scanning.
    pub fn with_reader(symbology: Symbology, config: ScanConfig, reader: R) -> Result<Self> {
        config.validate()?;
        symbology.params.validate()?;
        let start_finder = GuardFinder::new(GuardSide::Start, &symbology.params.start_pattern);
        let stop_finder = GuardFinder::new(GuardSide::Stop, &symbology.params.stop_pattern);
        let tolerances = FinderTolerances::from_config(&config);
        Ok(Self {
            config,
            symbology,
            reader,
            start_finder,
            stop_finder,
            tolerances,
        })
    }

    /// Configuration this reader was built with
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Symbology this reader detects
    pub fn symbology(&self) -> &Symbology {
        &self.symbology
    }

    /// Find and decode every symbol in `image`
    ///
    /// An image without barcodes yields an empty list. Exceeding the
    /// configured timeout yields `BarcodeError::Timeout` and no results.
    pub fn detect(&self, image: &BitMatrix) -> Result<Vec<FoundBarcode>> {
        let deadline = Deadline::start(self.config.timeout);
        let mut aggregator =
            ResultAggregator::new(self.config.duplicate_padding, self.config.duplicate_confidence_ratio);
        self.detect_into(image, &mut aggregator, &deadline)?;
        Ok(aggregator.finish())
    }

    /// Decode independent images in parallel, results in input order
    pub fn detect_batch(&self, images: &[BitMatrix]) -> Vec<Result<Vec<FoundBarcode>>> {
        images.par_iter().map(|image| self.detect(image)).collect()
    }

    /// Run one full pass, feeding accepted results into a shared aggregator
    pub(crate) fn detect_into(
        &self,
        image: &BitMatrix,
        aggregator: &mut ResultAggregator,
        deadline: &Deadline,
    ) -> Result<()> {
        let roi = self
            .config
            .roi
            .unwrap_or(Rect::new(0, 0, image.width(), image.height()))
            .clamp_to(image.width(), image.height());
        if roi.is_empty() {
            return Ok(());
        }

        let mut clusters = self.scan_clusters(image, roi, deadline)?;
        self.pair_and_decode(image, &mut clusters, aggregator, deadline)
    }

    fn target_reached(&self, aggregator: &ResultAggregator) -> bool {
        self.config
            .expected_number_of_barcodes
            .is_some_and(|n| aggregator.len() >= n)
    }

    /// Row scan: runs, guard matches and online clustering
    fn scan_clusters(&self, image: &BitMatrix, roi: Rect, deadline: &Deadline) -> Result<Vec<PatternCluster>> {
        let c = &self.config;
        let mut starts = ClusterBuilder::new(
            GuardSide::Start,
            image.width(),
            c.max_cluster_distance_x,
            c.max_cluster_distance_y,
        );
        let mut stops = ClusterBuilder::new(
            GuardSide::Stop,
            image.width(),
            c.max_cluster_distance_x,
            c.max_cluster_distance_y,
        );

        let mut bits = Vec::with_capacity(roi.width);
        let mut runs = BarRuns::new();
        let mut patterns = 0usize;
        for y in (roi.y..roi.y + roi.height).step_by(c.scan_step) {
            deadline.check()?;
            image.row_bits(y, roi.x, roi.x + roi.width, &mut bits);
            runs.scan(bits.iter().copied(), roi.x);

            for p in self.start_finder.find(&runs, y as u32, &self.tolerances) {
                starts.add(p);
                patterns += 1;
            }
            for p in self.stop_finder.find(&runs, y as u32, &self.tolerances) {
                stops.add(p);
                patterns += 1;
            }
        }

        let raw = starts.len() + stops.len();
        let mut clusters = starts.finish(c.min_cluster_size);
        clusters.extend(stops.finish(c.min_cluster_size));
        debug!(
            "{}: {} patterns, {} clusters, {} kept",
            self.symbology.kind,
            patterns,
            raw,
            clusters.len()
        );
        Ok(clusters)
    }

    /// Greedy pairing in decreasing cluster size; consumed clusters are skipped
    fn pair_and_decode(
        &self,
        image: &BitMatrix,
        clusters: &mut [PatternCluster],
        aggregator: &mut ResultAggregator,
        deadline: &Deadline,
    ) -> Result<()> {
        let decoder = RegionDecoder::new(image, &self.config, &self.symbology, &self.reader);
        let (starts, stops) = pairing_order(clusters);
        let mut tried = 0usize;
        let mut decoded = 0usize;

        'pairing: for &s in &starts {
            for &e in &stops {
                deadline.check()?;
                if self.target_reached(aggregator) {
                    break 'pairing;
                }
                if clusters[s].opposite.is_some() {
                    break;
                }
                if clusters[e].opposite.is_some() {
                    continue;
                }
                let Ok(candidate) = check_and_prepare(clusters, s, e, &self.symbology.params, &self.config)
                else {
                    continue;
                };
                tried += 1;
                let Some(region) = decoder.decode(clusters, &candidate) else {
                    continue;
                };
                if let Some(found) = FoundBarcode::from_region(self.symbology.kind, region) {
                    decoded += 1;
                    aggregator.add(found);
                }
            }
        }

        debug!(
            "{}: {} candidates decoded, {} accepted of {} tried",
            self.symbology.kind, decoded, aggregator.len(), tried
        );
        Ok(())
    }
}

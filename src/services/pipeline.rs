use crate::core::optimizer::{
    OptimizeError, OptimizeOutcome, Optimizer, OptimizerConfig, SolvedBy, SolverError,
};
use crate::core::photo::PhotoSet;
use crate::core::slide::{SlideBuilder, SlideUnit};
use crate::services::dataset::{DatasetError, DatasetReader};
use crate::services::history::RunRecord;
use crate::services::solution::{SolutionError, SolutionWriter};
use log::{error, info};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Optimization error: {0}")]
    Optimize(#[from] OptimizeError),

    #[error("Solution error: {0}")]
    Solution(#[from] SolutionError),
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub optimizer: OptimizerConfig,
    /// Where `.sol` files go. Defaults to each dataset's own directory.
    pub output_dir: Option<PathBuf>,
    /// Solve and report without writing any file.
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct DatasetReport {
    pub dataset: PathBuf,
    pub solution: Option<PathBuf>,
    pub digest: String,
    pub photos: usize,
    pub candidates: usize,
    pub slides: usize,
    pub score: u64,
    pub solved_by: SolvedBy,
    pub optimal: bool,
    pub fallback: Option<SolverError>,
    pub elapsed: Duration,
}

impl DatasetReport {
    /// History entry for this run; `None` for dry runs, which write nothing.
    pub fn to_record(&self) -> Option<RunRecord> {
        let solution = self.solution.as_ref()?;
        Some(
            RunRecord {
                timestamp: String::new(),
                dataset: self.dataset.to_string_lossy().into_owned(),
                digest: self.digest.clone(),
                solution: solution.to_string_lossy().into_owned(),
                strategy: self.solved_by.to_string(),
                fallback: self.fallback.as_ref().map(|e| e.to_string()),
                photos: self.photos,
                slides: self.slides,
                score: self.score,
                elapsed_ms: self.elapsed.as_millis() as u64,
            }
            .stamped_now(),
        )
    }
}

#[derive(Debug)]
pub struct DatasetOutcome {
    pub dataset: PathBuf,
    pub result: Result<DatasetReport, PipelineError>,
}

/// Build → optimize → report → write, once per dataset.
///
/// Each dataset gets its own photo set, candidates and optimizer; nothing
/// is shared between datasets.
pub struct Pipeline {
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    pub fn solution_path(&self, dataset: &Path) -> PathBuf {
        let file_name = dataset.with_extension("sol");
        let file_name = file_name.file_name().unwrap_or_default();
        match &self.options.output_dir {
            Some(dir) => dir.join(file_name),
            None => dataset.with_extension("sol"),
        }
    }

    fn slide_builder(&self) -> SlideBuilder {
        let config = &self.options.optimizer;
        SlideBuilder::new(config.pairing).with_pairing_window(config.pairing_window)
    }

    /// Run the in-memory stages on an already loaded photo set.
    pub fn solve_photos(&self, photos: &PhotoSet) -> Result<OptimizeOutcome, OptimizeError> {
        let slides = self.slide_builder().build(photos);
        self.optimize(photos, slides)
    }

    fn optimize(
        &self,
        photos: &PhotoSet,
        slides: Vec<SlideUnit>,
    ) -> Result<OptimizeOutcome, OptimizeError> {
        let config = &self.options.optimizer;
        let budget = config.budget();
        Optimizer::new(config.clone()).optimize(photos, slides, &budget)
    }

    pub fn run_dataset(&self, dataset: &Path) -> Result<DatasetReport, PipelineError> {
        let start = Instant::now();
        let bytes = fs::read(dataset).map_err(DatasetError::from)?;
        let digest = blake3::hash(&bytes).to_hex().to_string();
        let photos = DatasetReader::new().parse_bytes(&bytes)?;
        let slides = self.slide_builder().build(&photos);
        let candidates = slides.len();

        let outcome = self.optimize(&photos, slides)?;

        let solution = if self.options.dry_run {
            None
        } else {
            let path = self.solution_path(dataset);
            if let Some(dir) = &self.options.output_dir {
                fs::create_dir_all(dir).map_err(SolutionError::from)?;
            }
            SolutionWriter::new().write_atomic(&outcome.slideshow, &path)?;
            Some(path)
        };

        let report = DatasetReport {
            dataset: dataset.to_path_buf(),
            solution,
            digest,
            photos: photos.len(),
            candidates,
            slides: outcome.slideshow.len(),
            score: outcome.score,
            solved_by: outcome.solved_by,
            optimal: outcome.optimal,
            fallback: outcome.fallback,
            elapsed: start.elapsed(),
        };
        info!(
            "{}: {} slides, score {} ({})",
            dataset.display(),
            report.slides,
            report.score,
            report.solved_by
        );
        Ok(report)
    }

    /// Run every dataset in parallel. A failure is reported for its own
    /// dataset only; the rest of the batch carries on. Results keep input order.
    pub fn run_batch<F>(&self, datasets: &[PathBuf], on_done: F) -> Vec<DatasetOutcome>
    where
        F: Fn(&DatasetOutcome) + Sync + Send,
    {
        datasets
            .par_iter()
            .map(|dataset| {
                let result = self.run_dataset(dataset);
                if let Err(err) = &result {
                    error!("{}: {}", dataset.display(), err);
                }
                let outcome = DatasetOutcome {
                    dataset: dataset.clone(),
                    result,
                };
                on_done(&outcome);
                outcome
            })
            .collect()
    }
}

pub mod dataset;
pub mod history;
pub mod pipeline;
pub mod solution;

pub use dataset::{DatasetReader, discover_datasets};
pub use history::{HistoryLog, RunRecord};
pub use pipeline::{DatasetOutcome, DatasetReport, Pipeline, PipelineOptions};
pub use solution::{SolutionReader, SolutionWriter};

pub mod interest;
pub mod optimizer;
pub mod photo;
pub mod report;
pub mod slide;

pub use interest::interest_factor;
pub use optimizer::{Budget, OptimizeOutcome, Optimizer, OptimizerConfig, SolvedBy, Strategy};
pub use photo::{Orientation, Photo, PhotoId, PhotoSet, TagSet};
pub use report::{ScoreReporter, Slideshow};
pub use slide::{PairingPolicy, SlideBuilder, SlideUnit};

pub mod annotator;
pub mod pipeline;

pub use annotator::BatchAnnotator;
pub use pipeline::{AnnotationPipeline, RunMode, RunOutcome, RunSummary, Stage};

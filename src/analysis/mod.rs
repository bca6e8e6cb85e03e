mod decoder;
mod runner;
mod types;

pub use decoder::decode;
pub use runner::{AnalysisJob, AnalysisRunner, ProcessRunner};
pub use types::{AnalysisResult, ExpenseForecast, RawOutput, SavingsRecommendation};

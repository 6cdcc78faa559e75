//! Analysis orchestration
//!
//! [`AnalysisEngine`] runs one request end to end and always answers with an
//! [`AnalysisOutcome`].

pub mod analysis_engine;
pub mod result;

pub use analysis_engine::{AnalysisEngine, AnalysisEngineBuilder};
pub use result::{AnalysisOutcome, AnalysisReport, AnalysisRequest, ModelSummary};

pub mod analysis;
pub mod charts;
pub mod cleaning;
pub mod commands;
pub mod etl;
pub mod export;
pub mod forecast;
pub mod loader;
pub mod pipeline;

pub use crate::domain::model::{AnalysisReport, Dataset, Record};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;

pub mod audio;
pub mod classify;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod timeline;
pub mod transcribe;

pub use config::Config;
pub use error::{AdtrimError, Result};
pub use pipeline::{print_summary, process_file, process_files, FileOutcome, FileReport, PipelineConfig};
pub use timeline::{complement, ComplementOutcome, ComplementResult, TimeInterval};

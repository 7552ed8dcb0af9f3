mod config;
mod memory;
mod orchestrator;
mod prompts;
mod trace;

pub use config::{init_default_config, PipelineConfig};
pub use memory::{build_history, export_history, HistoryRow};
pub use orchestrator::{DualEngine, QueryOutcome};
pub use prompts::{render_template, DEFAULT_GENERATIVE_TEXT};
pub use trace::TraceWriter;

//! Remote translation backends.

mod gemini;
mod gradio;

pub use gemini::{GeminiProvider, DEFAULT_GEMINI_ENDPOINT};
pub use gradio::{parse_sse_result, GradioMtProvider, DEFAULT_GRADIO_ENDPOINT};

use crate::error::ProviderError;
use crate::lang::Direction;

/// General-purpose LLM used for reference two.
pub trait GenerativeProvider {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, ProviderError>;
}

/// Dedicated MT service used for reference one. The remote keeps a direction mode that has to be
/// switched with `configure` before translating in the other direction.
pub trait MtProvider {
    fn configure(&self, direction: Direction) -> Result<(), ProviderError>;

    fn translate(&self, text: &str, source_tag: &str, target_tag: &str) -> Result<String, ProviderError>;
}

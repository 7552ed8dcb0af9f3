use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

pub const CONFIG_FILENAME: &str = "truku-compare.toml";
pub const CONFIG_ENV: &str = "TRUKU_COMPARE_CONFIG";

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub corpus: CorpusSection,
    #[serde(default)]
    pub generative: GenerativeSection,
    #[serde(default)]
    pub mt: MtSection,
    #[serde(default)]
    pub feedback: FeedbackSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub prompts: PromptsSection,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct CorpusSection {
    /// xlsx, csv, tsv or txt. Relative paths resolve against the config file directory.
    #[serde(default)]
    pub path: Option<String>,
    /// Skip the first row. Defaults to true.
    #[serde(default)]
    pub has_header: Option<bool>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct GenerativeSection {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Name of the env var holding the API key. Without a key the generative engine is off.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct MtSection {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub ethnicity: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct FeedbackSection {
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PipelineSection {
    #[serde(default)]
    pub trace_dir: Option<String>,
    #[serde(default)]
    pub trace_prompts: Option<bool>,
    #[serde(default)]
    pub export_dir: Option<String>,
    #[serde(default)]
    pub log_max_chars: Option<usize>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PromptsSection {
    #[serde(default)]
    pub generative: Option<String>,
}

/// Nearest `filename` in `start_dir` or one of its first `max_levels` ancestors.
pub fn find_file_upwards(start_dir: &Path, filename: &str, max_levels: usize) -> Option<PathBuf> {
    start_dir
        .ancestors()
        .take(max_levels + 1)
        .map(|dir| dir.join(filename))
        .find(|candidate| candidate.is_file())
}

/// Searches upwards from the current directory, then `workdir`, then the executable's directory.
pub fn find_default_config(workdir: &Path, filename: &str) -> Option<PathBuf> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let roots = [
        (std::env::current_dir().ok(), 8),
        (Some(workdir.to_path_buf()), 8),
        (exe_dir, 10),
    ];
    roots
        .into_iter()
        .filter_map(|(root, levels)| Some((root?, levels)))
        .find_map(|(root, levels)| find_file_upwards(&root, filename, levels))
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("invalid config: {}", path.display()))
}

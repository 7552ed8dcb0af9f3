use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;

use crate::config::{find_default_config, load_config, AppConfig, CONFIG_ENV, CONFIG_FILENAME};
use crate::pipeline::prompts::{default_prompt_files, load_generative_prompt, DEFAULT_PROMPTS_DIR};
use crate::providers::{DEFAULT_GEMINI_ENDPOINT, DEFAULT_GRADIO_ENDPOINT};

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_API_KEY_ENV: &str = "GOOGLE_API_KEY";
pub const DEFAULT_ETHNICITY: &str = "太魯閣";

/// Settings after merging the config file, CLI overrides and defaults.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub workdir: PathBuf,
    pub config_path: PathBuf,

    pub corpus_path: Option<PathBuf>,
    pub corpus_has_header: bool,

    pub generative_endpoint: String,
    pub model: String,
    pub api_key_env: String,
    pub generative_timeout: Duration,

    pub mt_enabled: bool,
    pub mt_endpoint: String,
    pub ethnicity: String,
    pub mt_timeout: Duration,

    pub feedback_path: PathBuf,
    pub export_dir: PathBuf,
    pub trace_dir: PathBuf,
    pub trace_prompts: bool,
    pub log_max_chars: usize,

    pub generative_prompt: String,
}

impl PipelineConfig {
    pub fn from_args(
        workdir: &Path,
        config_path: Option<PathBuf>,
        corpus: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        let workdir = workdir.canonicalize().unwrap_or_else(|_| workdir.to_path_buf());

        let cfg_file = config_path
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
            .or_else(|| find_default_config(&workdir, CONFIG_FILENAME));

        let mut file_cfg = AppConfig::default();
        if let Some(p) = cfg_file.as_ref() {
            if p.exists() {
                file_cfg = load_config(p)?;
            }
        }
        let cfg_path = cfg_file.unwrap_or_else(|| workdir.join(CONFIG_FILENAME));
        let config_dir = cfg_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| workdir.clone());
        let resolve = |s: &str| -> PathBuf {
            let p = PathBuf::from(s);
            if p.is_relative() {
                config_dir.join(p)
            } else {
                p
            }
        };

        // A CLI path is taken as given, relative to the working directory.
        let corpus_path = corpus.or_else(|| {
            file_cfg
                .corpus
                .path
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(&resolve)
        });

        let g = &file_cfg.generative;
        let m = &file_cfg.mt;
        let p = &file_cfg.pipeline;

        let generative_prompt =
            load_generative_prompt(&config_dir, &file_cfg.prompts).context("load prompts")?;

        Ok(Self {
            corpus_path,
            corpus_has_header: file_cfg.corpus.has_header.unwrap_or(true),

            generative_endpoint: g
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_GEMINI_ENDPOINT.to_string()),
            model: g.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key_env: g
                .api_key_env
                .clone()
                .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string()),
            generative_timeout: Duration::from_secs(g.timeout_secs.unwrap_or(60).max(1)),

            mt_enabled: m.enabled.unwrap_or(true),
            mt_endpoint: m
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_GRADIO_ENDPOINT.to_string()),
            ethnicity: m
                .ethnicity
                .clone()
                .unwrap_or_else(|| DEFAULT_ETHNICITY.to_string()),
            mt_timeout: Duration::from_secs(m.timeout_secs.unwrap_or(90).max(1)),

            feedback_path: resolve(file_cfg.feedback.path.as_deref().unwrap_or("feedback.jsonl")),
            export_dir: resolve(p.export_dir.as_deref().unwrap_or(".")),
            trace_dir: resolve(p.trace_dir.as_deref().unwrap_or("_trace")),
            trace_prompts: p.trace_prompts.unwrap_or(false),
            log_max_chars: p.log_max_chars.unwrap_or(120),

            generative_prompt,
            workdir,
            config_path: cfg_path,
        })
    }

    /// API key from the configured env var; blank counts as absent.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;
    let cfg_path = dir.join(CONFIG_FILENAME);

    let prompts_dir = dir.join(DEFAULT_PROMPTS_DIR);
    std::fs::create_dir_all(&prompts_dir)
        .with_context(|| format!("create prompts dir: {}", prompts_dir.display()))?;

    for (fname, body) in default_prompt_files() {
        let p = prompts_dir.join(fname);
        if p.exists() && !force {
            continue;
        }
        std::fs::write(&p, body).with_context(|| format!("write prompt: {}", p.display()))?;
    }

    if cfg_path.exists() && !force {
        return Ok(cfg_path);
    }

    let cfg_text = r#"[corpus]
# Two columns: Mandarin, Truku. xlsx / csv / tsv / txt.
path = "corpus.xlsx"
has_header = true

[generative]
endpoint = "https://generativelanguage.googleapis.com/v1beta"
model = "gemini-3-flash-preview"
# The key itself is read from this environment variable.
api_key_env = "GOOGLE_API_KEY"
timeout_secs = 60

[mt]
endpoint = "https://ithuan-formosan-translation.hf.space"
ethnicity = "太魯閣"
timeout_secs = 90
enabled = true

[feedback]
path = "feedback.jsonl"

[pipeline]
trace_dir = "_trace"
trace_prompts = false
export_dir = "."
log_max_chars = 120

[prompts]
generative = "prompts/generative.txt"
"#;

    std::fs::write(&cfg_path, cfg_text)
        .with_context(|| format!("write config: {}", cfg_path.display()))?;
    Ok(cfg_path)
}

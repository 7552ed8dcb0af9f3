use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};

use crate::config::PromptsSection;

pub const DEFAULT_PROMPTS_DIR: &str = "prompts";
pub const DEFAULT_GENERATIVE: &str = "generative.txt";

/// Loads the generative prompt template.
///
/// An explicitly configured file must exist. When nothing is configured the default location is
/// tried and the built-in template is used if it is absent.
pub fn load_generative_prompt(config_dir: &Path, p: &PromptsSection) -> anyhow::Result<String> {
    let (path, explicit) = match p.generative.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => (PathBuf::from(s), true),
        None => (Path::new(DEFAULT_PROMPTS_DIR).join(DEFAULT_GENERATIVE), false),
    };
    let path = if path.is_relative() {
        config_dir.join(path)
    } else {
        path
    };
    if !path.exists() {
        if explicit {
            return Err(anyhow!(
                "prompt file not found: {} (run: truku-compare --init-config)",
                path.display()
            ));
        }
        return Ok(DEFAULT_GENERATIVE_TEXT.to_string());
    }
    std::fs::read_to_string(&path).with_context(|| format!("read prompt: {}", path.display()))
}

/// Fills `{{key}}` slots in one left-to-right pass; inserted values are never rescanned and
/// unknown keys stay as written.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            rest = &rest[open..];
            break;
        };
        let key = &after[..close];
        match vars.iter().find(|(k, _)| *k == key) {
            Some((_, v)) => out.push_str(v),
            None => out.push_str(&rest[open..open + close + 4]),
        }
        rest = &after[close + 2..];
    }
    out.push_str(rest);
    out
}

pub fn default_prompt_files() -> Vec<(&'static str, &'static str)> {
    vec![(DEFAULT_GENERATIVE, DEFAULT_GENERATIVE_TEXT)]
}

pub const DEFAULT_GENERATIVE_TEXT: &str = r#"你現在是太魯閣語(Truku)翻譯權威。請嚴格遵守以下翻譯範例與定義。
如果範例中的詞彙定義與你的常識衝突，請以『參考範例』為準。
{{context}}
任務：將以下內容準確翻譯為太魯閣語或華語。
輸出要求：僅回傳翻譯結果文字，嚴禁任何解釋或標籤。

待翻譯內容：{{text}}
翻譯結果：
"#;

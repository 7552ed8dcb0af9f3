use std::path::PathBuf;

use anyhow::Context;
use chrono::Local;

/// Dumps generative prompts and replies to a directory when enabled.
///
/// File names carry the start time of the run, so a later run never overwrites an earlier one.
pub struct TraceWriter {
    /// `None` when tracing is off.
    dir: Option<PathBuf>,
    run: String,
}

impl TraceWriter {
    pub fn new(dir: PathBuf, enabled: bool) -> anyhow::Result<Self> {
        Self::with_run_stamp(dir, enabled, Local::now().format("%Y%m%d_%H%M%S").to_string())
    }

    fn with_run_stamp(dir: PathBuf, enabled: bool, run: String) -> anyhow::Result<Self> {
        if !enabled {
            return Ok(Self::disabled());
        }
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create trace dir: {}", dir.display()))?;
        Ok(Self { dir: Some(dir), run })
    }

    pub fn disabled() -> Self {
        Self {
            dir: None,
            run: String::new(),
        }
    }

    /// `20260101_093000_query_000003.prompt.txt`, `..._query_000003.reply.txt`, ...
    pub fn write_query_text(&self, seq: usize, kind: &str, text: &str) -> anyhow::Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let kind: String = kind
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        let path = dir.join(format!("{}_query_{seq:06}.{kind}.txt", self.run));
        std::fs::write(&path, text).with_context(|| format!("write trace: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::TraceWriter;

    #[test]
    fn disabled_writer_touches_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let trace = TraceWriter::new(dir.path().join("t"), false).expect("new");
        trace.write_query_text(1, "prompt", "x").expect("write");
        assert!(!dir.path().join("t").exists());
    }

    #[test]
    fn files_are_named_by_run_and_sequence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let trace =
            TraceWriter::with_run_stamp(dir.path().join("t"), true, "20260101_093000".to_string()).expect("new");
        trace.write_query_text(3, "prompt", "hello").expect("write");
        trace.write_query_text(3, "re/ply", "world").expect("write");
        let t = dir.path().join("t");
        let text = std::fs::read_to_string(t.join("20260101_093000_query_000003.prompt.txt")).expect("read");
        assert_eq!(text, "hello");
        assert!(t.join("20260101_093000_query_000003.re_ply.txt").exists());
    }

    #[test]
    fn later_run_keeps_earlier_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let t = dir.path().join("t");
        let first = TraceWriter::with_run_stamp(t.clone(), true, "20260101_093000".to_string()).expect("new");
        first.write_query_text(1, "prompt", "first").expect("write");
        let second = TraceWriter::with_run_stamp(t.clone(), true, "20260101_100000".to_string()).expect("new");
        second.write_query_text(1, "prompt", "second").expect("write");

        let first_text = std::fs::read_to_string(t.join("20260101_093000_query_000001.prompt.txt")).expect("read");
        assert_eq!(first_text, "first");
        assert_eq!(std::fs::read_dir(&t).expect("read dir").count(), 2);
    }
}

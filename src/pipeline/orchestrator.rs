use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::corpus::{CorpusIndex, LoadOptions};
use crate::lang::Direction;
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::prompts::render_template;
use crate::pipeline::trace::TraceWriter;
use crate::providers::{GeminiProvider, GenerativeProvider, GradioMtProvider, MtProvider};
use crate::retrieval::retrieve;
use crate::sentinels::{GENERATIVE_BUSY, MT_BUSY, MT_OFFLINE};
use crate::session::{ResultSource, Session, TranslationRecord};
use crate::textutil::{clip_for_log, normalize};

/// How a query was answered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryOutcome {
    /// Both engines ran and a new history record was created.
    Fresh { index: usize },
    /// The cache already held the query; its record was re-activated.
    Reused { index: usize },
    /// Blank input.
    Ignored,
}

impl QueryOutcome {
    pub fn index(self) -> Option<usize> {
        match self {
            Self::Fresh { index } | Self::Reused { index } => Some(index),
            Self::Ignored => None,
        }
    }
}

/// Runs one query against the corpus, the generative model and the MT service.
pub struct DualEngine {
    corpus: Option<Arc<CorpusIndex>>,
    generative: Option<Box<dyn GenerativeProvider>>,
    mt: Option<Box<dyn MtProvider>>,
    /// Direction the MT service was last switched to successfully.
    mt_mode: Option<Direction>,
    model: String,
    prompt_template: String,
    trace: TraceWriter,
    log_max_chars: usize,
    queries: usize,
}

impl DualEngine {
    pub fn new(model: impl Into<String>, prompt_template: impl Into<String>) -> Self {
        Self {
            corpus: None,
            generative: None,
            mt: None,
            mt_mode: None,
            model: model.into(),
            prompt_template: prompt_template.into(),
            trace: TraceWriter::disabled(),
            log_max_chars: 120,
            queries: 0,
        }
    }

    pub fn with_corpus(mut self, corpus: Arc<CorpusIndex>) -> Self {
        self.corpus = Some(corpus);
        self
    }

    pub fn with_generative(mut self, provider: Box<dyn GenerativeProvider>) -> Self {
        self.generative = Some(provider);
        self
    }

    pub fn with_mt(mut self, provider: Box<dyn MtProvider>) -> Self {
        self.mt = Some(provider);
        self
    }

    pub fn with_trace(mut self, trace: TraceWriter) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_log_max_chars(mut self, n: usize) -> Self {
        self.log_max_chars = n;
        self
    }

    /// Wires up the corpus and both HTTP providers. A corpus that fails to load, a missing API
    /// key or a disabled MT section leave that part out.
    pub fn from_config(cfg: &PipelineConfig) -> anyhow::Result<Self> {
        let mut engine = Self::new(cfg.model.clone(), cfg.generative_prompt.clone())
            .with_trace(TraceWriter::new(cfg.trace_dir.clone(), cfg.trace_prompts)?)
            .with_log_max_chars(cfg.log_max_chars);

        if let Some(path) = cfg.corpus_path.as_deref() {
            let opts = LoadOptions {
                has_header: cfg.corpus_has_header,
            };
            match CorpusIndex::load(path, opts) {
                Ok(index) => engine = engine.with_corpus(Arc::new(index)),
                Err(err) => warn!(path = %path.display(), error = %err, "corpus unavailable, continuing without it"),
            }
        }

        match cfg.api_key() {
            Some(key) => {
                let p = GeminiProvider::new(&cfg.generative_endpoint, key, cfg.generative_timeout)?;
                engine = engine.with_generative(Box::new(p));
            }
            None => warn!(env = %cfg.api_key_env, "no API key, generative engine disabled"),
        }

        if cfg.mt_enabled {
            let p = GradioMtProvider::new(&cfg.mt_endpoint, cfg.ethnicity.clone(), cfg.mt_timeout)?;
            engine = engine.with_mt(Box::new(p));
        }
        Ok(engine)
    }

    pub fn corpus(&self) -> Option<&CorpusIndex> {
        self.corpus.as_deref()
    }

    pub fn mt_mode(&self) -> Option<Direction> {
        self.mt_mode
    }

    pub fn translate(&mut self, session: &mut Session, direction: Direction, input: &str) -> QueryOutcome {
        let text = input.trim();
        if text.is_empty() {
            return QueryOutcome::Ignored;
        }
        let key = normalize(text);

        if let Some(index) = session.lookup(direction, &key) {
            if session.select(index).is_ok() {
                info!(index, %direction, "cache hit");
                return QueryOutcome::Reused { index };
            }
        }

        self.queries += 1;
        info!(
            seq = self.queries,
            %direction,
            text = %clip_for_log(text, self.log_max_chars),
            "translating"
        );

        let (generative, source) = self.generative_result(direction, text, &key);
        let mt = self.mt_result(direction, text);

        let record = TranslationRecord::new(text, direction, mt, generative, source);
        let index = session.commit(key, record);
        QueryOutcome::Fresh { index }
    }

    fn generative_result(&self, direction: Direction, text: &str, key: &str) -> (String, ResultSource) {
        if let Some(hit) = self.corpus().and_then(|c| c.exact_match(direction, key)) {
            info!(seq = self.queries, "corpus exact match");
            return (hit.to_string(), ResultSource::Corpus);
        }

        let Some(provider) = self.generative.as_deref() else {
            warn!(seq = self.queries, "generative engine not configured");
            return (GENERATIVE_BUSY.to_string(), ResultSource::Generative);
        };

        let context = self
            .corpus()
            .map(|c| retrieve(c, text).render())
            .unwrap_or_default();
        let prompt = render_template(&self.prompt_template, &[("context", &context), ("text", text)]);
        debug!(seq = self.queries, prompt = %clip_for_log(&prompt, self.log_max_chars), "generative prompt");
        if let Err(err) = self.trace.write_query_text(self.queries, "prompt", &prompt) {
            warn!(error = %err, "trace write failed");
        }

        match provider.generate(&self.model, &prompt) {
            Ok(out) => {
                if let Err(err) = self.trace.write_query_text(self.queries, "reply", &out) {
                    warn!(error = %err, "trace write failed");
                }
                (out, ResultSource::Generative)
            }
            Err(err) => {
                warn!(seq = self.queries, error = %err, "generative provider failed");
                (GENERATIVE_BUSY.to_string(), ResultSource::Generative)
            }
        }
    }

    fn mt_result(&mut self, direction: Direction, text: &str) -> String {
        let Some(mt) = self.mt.as_deref() else {
            return MT_OFFLINE.to_string();
        };
        if self.mt_mode != Some(direction) {
            if let Err(err) = mt.configure(direction) {
                warn!(seq = self.queries, %direction, error = %err, "MT mode switch failed");
                return MT_BUSY.to_string();
            }
            debug!(%direction, "MT mode switched");
            self.mt_mode = Some(direction);
        }
        match mt.translate(text, direction.source_tag(), direction.target_tag()) {
            Ok(out) => out,
            Err(err) => {
                warn!(seq = self.queries, error = %err, "MT provider failed");
                MT_BUSY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::sync::Arc;

    use super::{DualEngine, QueryOutcome};
    use crate::corpus::CorpusIndex;
    use crate::error::ProviderError;
    use crate::lang::Direction;
    use crate::pipeline::prompts::DEFAULT_GENERATIVE_TEXT;
    use crate::providers::{GenerativeProvider, MtProvider};
    use crate::sentinels::{GENERATIVE_BUSY, MT_BUSY, MT_OFFLINE};
    use crate::session::{ResultSource, Session};

    struct FakeGenerative {
        calls: Rc<Cell<usize>>,
        prompts: Rc<RefCell<Vec<String>>>,
        fail: bool,
    }

    impl GenerativeProvider for FakeGenerative {
        fn generate(&self, _model: &str, prompt: &str) -> Result<String, ProviderError> {
            self.calls.set(self.calls.get() + 1);
            self.prompts.borrow_mut().push(prompt.to_string());
            if self.fail {
                return Err(ProviderError::Remote("quota".to_string()));
            }
            Ok("gen-out".to_string())
        }
    }

    #[derive(Default)]
    struct MtCounters {
        configures: Cell<usize>,
        translates: Cell<usize>,
        fail_configure: Cell<bool>,
        fail_translate: Cell<bool>,
    }

    struct FakeMt(Rc<MtCounters>);

    impl MtProvider for FakeMt {
        fn configure(&self, _direction: Direction) -> Result<(), ProviderError> {
            self.0.configures.set(self.0.configures.get() + 1);
            if self.0.fail_configure.get() {
                return Err(ProviderError::Remote("busy".to_string()));
            }
            Ok(())
        }

        fn translate(&self, text: &str, source_tag: &str, target_tag: &str) -> Result<String, ProviderError> {
            self.0.translates.set(self.0.translates.get() + 1);
            if self.0.fail_translate.get() {
                return Err(ProviderError::Remote("busy".to_string()));
            }
            Ok(format!("mt[{source_tag}>{target_tag}]:{text}"))
        }
    }

    struct Harness {
        engine: DualEngine,
        gen_calls: Rc<Cell<usize>>,
        prompts: Rc<RefCell<Vec<String>>>,
        mt: Rc<MtCounters>,
    }

    fn harness(fail_generative: bool) -> Harness {
        let corpus = CorpusIndex::from_pairs([
            ("你好", "Kia su hug"),
            ("謝謝你", "Mhuway su"),
            ("山", "dgiyaq"),
        ]);
        let gen_calls = Rc::new(Cell::new(0));
        let prompts = Rc::new(RefCell::new(Vec::new()));
        let mt = Rc::new(MtCounters::default());
        let engine = DualEngine::new("test-model", DEFAULT_GENERATIVE_TEXT)
            .with_corpus(Arc::new(corpus))
            .with_generative(Box::new(FakeGenerative {
                calls: gen_calls.clone(),
                prompts: prompts.clone(),
                fail: fail_generative,
            }))
            .with_mt(Box::new(FakeMt(mt.clone())));
        Harness {
            engine,
            gen_calls,
            prompts,
            mt,
        }
    }

    #[test]
    fn exact_match_skips_generative_call() {
        let mut h = harness(false);
        let mut session = Session::new();
        let out = h.engine.translate(&mut session, Direction::ZhToTruku, "你好！");
        assert_eq!(out, QueryOutcome::Fresh { index: 0 });

        let rec = session.current().expect("active record");
        assert_eq!(rec.generative.text, "Kia su hug");
        assert_eq!(rec.generative_source, ResultSource::Corpus);
        assert_eq!(rec.mt.text, "mt[zho_Hant>trv_Truk]:你好！");
        assert_eq!(h.gen_calls.get(), 0);
        assert_eq!(h.mt.translates.get(), 1);
    }

    #[test]
    fn reverse_direction_matches_target_column() {
        let mut h = harness(false);
        let mut session = Session::new();
        h.engine.translate(&mut session, Direction::TrukuToZh, "kia SU hug");
        let rec = session.current().expect("active record");
        assert_eq!(rec.generative.text, "你好");
        assert_eq!(h.gen_calls.get(), 0);
    }

    #[test]
    fn cache_hit_makes_no_provider_calls() {
        let mut h = harness(false);
        let mut session = Session::new();
        h.engine.translate(&mut session, Direction::ZhToTruku, "你要去哪裡");
        h.engine.translate(&mut session, Direction::ZhToTruku, "山");
        let (gen, mt) = (h.gen_calls.get(), h.mt.translates.get());

        let out = h.engine.translate(&mut session, Direction::ZhToTruku, " 你要 去哪裡? ");
        assert_eq!(out, QueryOutcome::Reused { index: 0 });
        assert_eq!(session.current_index(), Some(0));
        assert_eq!(session.history().len(), 2);
        assert_eq!(h.gen_calls.get(), gen);
        assert_eq!(h.mt.translates.get(), mt);
    }

    #[test]
    fn same_text_other_direction_is_a_new_query() {
        let mut h = harness(false);
        let mut session = Session::new();
        h.engine.translate(&mut session, Direction::ZhToTruku, "山");
        let out = h.engine.translate(&mut session, Direction::TrukuToZh, "山");
        assert_eq!(out, QueryOutcome::Fresh { index: 1 });
    }

    #[test]
    fn generative_prompt_embeds_context_and_text() {
        let mut h = harness(false);
        let mut session = Session::new();
        h.engine.translate(&mut session, Direction::ZhToTruku, "你");
        assert_eq!(h.gen_calls.get(), 1);
        let prompts = h.prompts.borrow();
        assert!(prompts[0].contains("原文：你好 -> 族語：Kia su hug"));
        assert!(prompts[0].contains("原文：謝謝你 -> 族語：Mhuway su"));
        assert!(prompts[0].contains("待翻譯內容：你"));
        let rec = session.current().expect("active record");
        assert_eq!(rec.generative.text, "gen-out");
        assert_eq!(rec.generative_source, ResultSource::Generative);
    }

    #[test]
    fn row_without_translation_falls_through_to_model() {
        let gen_calls = Rc::new(Cell::new(0));
        let corpus = CorpusIndex::from_pairs([("一", ""), ("你好", "Kia su hug")]);
        let mut engine = DualEngine::new("test-model", DEFAULT_GENERATIVE_TEXT)
            .with_corpus(Arc::new(corpus))
            .with_generative(Box::new(FakeGenerative {
                calls: gen_calls.clone(),
                prompts: Rc::new(RefCell::new(Vec::new())),
                fail: false,
            }));
        let mut session = Session::new();
        engine.translate(&mut session, Direction::ZhToTruku, "一");
        assert_eq!(gen_calls.get(), 1);
        let rec = session.current().expect("active record");
        assert_eq!(rec.generative.text, "gen-out");
        assert_eq!(rec.generative_source, ResultSource::Generative);
    }

    #[test]
    fn failures_are_isolated_per_slot() {
        let mut h = harness(false);
        h.mt.fail_translate.set(true);
        let mut session = Session::new();
        h.engine.translate(&mut session, Direction::ZhToTruku, "今天天氣");
        let rec = session.current().expect("active record");
        assert_eq!(rec.mt.text, MT_BUSY);
        assert_eq!(rec.generative.text, "gen-out");

        let mut h = harness(true);
        let mut session = Session::new();
        h.engine.translate(&mut session, Direction::ZhToTruku, "今天天氣");
        let rec = session.current().expect("active record");
        assert_eq!(rec.generative.text, GENERATIVE_BUSY);
        assert_eq!(rec.mt.text, "mt[zho_Hant>trv_Truk]:今天天氣");
    }

    #[test]
    fn mode_switch_only_on_direction_change() {
        let mut h = harness(false);
        let mut session = Session::new();
        h.engine.translate(&mut session, Direction::ZhToTruku, "一");
        h.engine.translate(&mut session, Direction::ZhToTruku, "二");
        assert_eq!(h.mt.configures.get(), 1);
        assert_eq!(h.engine.mt_mode(), Some(Direction::ZhToTruku));

        h.engine.translate(&mut session, Direction::TrukuToZh, "tru");
        assert_eq!(h.mt.configures.get(), 2);
        assert_eq!(h.engine.mt_mode(), Some(Direction::TrukuToZh));
    }

    #[test]
    fn failed_mode_switch_is_retried() {
        let mut h = harness(false);
        h.mt.fail_configure.set(true);
        let mut session = Session::new();
        h.engine.translate(&mut session, Direction::ZhToTruku, "一");
        assert_eq!(session.current().expect("record").mt.text, MT_BUSY);
        assert_eq!(h.mt.translates.get(), 0);
        assert_eq!(h.engine.mt_mode(), None);

        h.mt.fail_configure.set(false);
        h.engine.translate(&mut session, Direction::ZhToTruku, "二");
        assert_eq!(h.mt.configures.get(), 2);
        assert_eq!(h.engine.mt_mode(), Some(Direction::ZhToTruku));
    }

    #[test]
    fn reset_keeps_mt_mode() {
        let mut h = harness(false);
        let mut session = Session::new();
        h.engine.translate(&mut session, Direction::ZhToTruku, "一");
        session.reset();
        h.engine.translate(&mut session, Direction::ZhToTruku, "一");
        assert_eq!(h.mt.configures.get(), 1);
        assert_eq!(h.mt.translates.get(), 2);
    }

    #[test]
    fn missing_providers_yield_sentinels() {
        let mut engine = DualEngine::new("m", DEFAULT_GENERATIVE_TEXT);
        let mut session = Session::new();
        engine.translate(&mut session, Direction::ZhToTruku, "你好");
        let rec = session.current().expect("record");
        assert_eq!(rec.mt.text, MT_OFFLINE);
        assert_eq!(rec.generative.text, GENERATIVE_BUSY);
    }

    #[test]
    fn blank_input_is_ignored() {
        let mut h = harness(false);
        let mut session = Session::new();
        assert_eq!(h.engine.translate(&mut session, Direction::ZhToTruku, "  \n"), QueryOutcome::Ignored);
        assert!(session.history().is_empty());
        assert_eq!(h.mt.translates.get(), 0);
    }
}

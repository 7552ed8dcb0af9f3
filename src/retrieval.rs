use crate::corpus::{CorpusEntry, CorpusIndex};
use crate::textutil::keyword_tokens;

/// Upper bound on example pairs handed to the generative model.
pub const MAX_CONTEXT_ROWS: usize = 3;

/// Example pairs selected for a query, in corpus order.
#[derive(Clone, Debug, Default)]
pub struct ContextBlock<'a> {
    pub examples: Vec<&'a CorpusEntry>,
}

impl ContextBlock<'_> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    #[must_use]
    pub fn render(&self) -> String {
        if self.examples.is_empty() {
            return String::new();
        }
        let mut out = String::from("\n【參考範例】：\n");
        for e in &self.examples {
            out.push_str("原文：");
            out.push_str(&e.source);
            out.push_str(" -> 族語：");
            out.push_str(&e.target);
            out.push('\n');
        }
        out
    }
}

/// Scans the corpus in load order and keeps the first rows whose source text contains any
/// keyword of `query`. Presence is the only criterion; there is no scoring.
pub fn retrieve<'a>(corpus: &'a CorpusIndex, query: &str) -> ContextBlock<'a> {
    let tokens = keyword_tokens(query);
    if tokens.is_empty() || corpus.is_empty() {
        return ContextBlock::default();
    }
    let examples = corpus
        .entries()
        .iter()
        .filter(|e| tokens.iter().any(|t| e.source.contains(t.as_str())))
        .take(MAX_CONTEXT_ROWS)
        .collect();
    ContextBlock { examples }
}

#[cfg(test)]
mod tests {
    use super::{retrieve, MAX_CONTEXT_ROWS};
    use crate::corpus::CorpusIndex;
    use crate::textutil::keyword_tokens;

    fn corpus() -> CorpusIndex {
        CorpusIndex::from_pairs([
            ("早安", "Embiyax su hug"),
            ("你好", "Kia su hug"),
            ("謝謝你", "Mhuway su"),
            ("山", "dgiyaq"),
            ("你要去哪裡", "Ini su usa inu"),
            ("你吃飯了嗎", "Mekan su ka"),
        ])
    }

    #[test]
    fn returns_first_matches_in_corpus_order() {
        let c = corpus();
        let block = retrieve(&c, "你");
        let sources: Vec<&str> = block.examples.iter().map(|e| e.source.as_str()).collect();
        assert_eq!(sources, vec!["你好", "謝謝你", "你要去哪裡"]);
    }

    #[test]
    fn every_row_contains_a_query_token() {
        let c = corpus();
        for query in ["你好 山", "謝謝", "早安你好嗎", "dgiyaq 山"] {
            let tokens = keyword_tokens(query);
            let block = retrieve(&c, query);
            assert!(block.examples.len() <= MAX_CONTEXT_ROWS);
            for e in &block.examples {
                assert!(tokens.iter().any(|t| e.source.contains(t.as_str())), "{query}");
            }
        }
    }

    #[test]
    fn whole_run_must_be_a_substring() {
        let c = corpus();
        // "你好嗎" is one token and no source contains it.
        assert!(retrieve(&c, "你好嗎？").is_empty());
    }

    #[test]
    fn no_tokens_means_no_context() {
        let c = corpus();
        let block = retrieve(&c, "，。！？");
        assert!(block.is_empty());
        assert_eq!(block.render(), "");
    }

    #[test]
    fn render_lists_pairs() {
        let c = corpus();
        let text = retrieve(&c, "山").render();
        assert_eq!(text, "\n【參考範例】：\n原文：山 -> 族語：dgiyaq\n");
    }
}

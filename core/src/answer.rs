//! Extractive answer formatting: the first sentence of each hit, then sources.

use crate::retriever::RetrievalResult;
use lazy_static::lazy_static;
use regex::Regex;

pub const NO_RESULTS: &str = "No relevant information found in corpus.";
const MAX_SUMMARY_WORDS: usize = 250;

lazy_static! {
    static ref FIRST_BREAK: Regex = Regex::new(r"[।.?!]\s+").expect("valid regex");
}

/// Text up to and including the first sentence terminator that is followed by
/// whitespace; the whole trimmed text when there is none.
pub fn first_sentence(text: &str) -> &str {
    let text = text.trim();
    match FIRST_BREAK.find(text) {
        Some(m) => {
            let term_len = text[m.start()..].chars().next().map(char::len_utf8).unwrap_or(1);
            &text[..m.start() + term_len]
        }
        None => text,
    }
}

pub fn generate_answer(query: &str, results: &[RetrievalResult], k: usize) -> String {
    if results.is_empty() {
        return NO_RESULTS.to_string();
    }
    let top = &results[..k.min(results.len())];

    let key_sentences: Vec<&str> = top.iter().map(|r| first_sentence(&r.text)).collect();
    let mut summary = key_sentences.join(" ").trim().to_string();
    let words: Vec<&str> = summary.split_whitespace().collect();
    if words.len() > MAX_SUMMARY_WORDS {
        summary = format!("{}...", words[..MAX_SUMMARY_WORDS].join(" "));
    }

    let mut lines = vec![
        format!("Query: {query}\n"),
        "Short synthesized answer (from corpus):".to_string(),
        format!("{summary}\n"),
        "Sources (top results):".to_string(),
    ];
    for r in top {
        lines.push(format!("- {} (file: {}, score: {:.3})", r.id, r.source, r.score));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, text: &str, score: f32) -> RetrievalResult {
        RetrievalResult { id: id.into(), source: "demo.txt".into(), text: text.into(), score }
    }

    #[test]
    fn empty_results_yield_fixed_message() {
        assert_eq!(generate_answer("q", &[], 3), NO_RESULTS);
    }

    #[test]
    fn first_sentence_handles_danda() {
        assert_eq!(first_sentence("यह एक परीक्षण अंश है। यह दूसरा वाक्य।"), "यह एक परीक्षण अंश है।");
        assert_eq!(first_sentence("  no terminator here  "), "no terminator here");
        assert_eq!(first_sentence(""), "");
    }

    #[test]
    fn formats_summary_and_sources() {
        let results = vec![hit("chunk_0", "First one. Extra.", 0.91234), hit("chunk_7", "Second? More.", 0.5), hit("chunk_9", "Dropped.", 0.1)];
        let answer = generate_answer("what?", &results, 2);
        let expected = "Query: what?\n\n\
Short synthesized answer (from corpus):\n\
First one. Second?\n\n\
Sources (top results):\n\
- chunk_0 (file: demo.txt, score: 0.912)\n\
- chunk_7 (file: demo.txt, score: 0.500)";
        assert_eq!(answer, expected);
    }

    #[test]
    fn long_summaries_are_truncated() {
        let long = (0..300).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let answer = generate_answer("q", &[hit("chunk_0", &long, 1.0)], 3);
        let summary = answer.lines().nth(3).unwrap();
        assert!(summary.ends_with("w249..."));
        assert_eq!(summary.split_whitespace().count(), 250);
    }
}

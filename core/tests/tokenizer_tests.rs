use ragcore::tokenizer::{tokenize, AnalyzerOptions};

#[test]
fn it_normalizes_and_stems_when_asked() {
    let opts = AnalyzerOptions { stem: true, stopwords: false };
    let words = tokenize("Running Runners RUN! The ｃａｆé's menu.", opts);
    assert!(words.contains(&"run".to_string()));
    // NFKC folds full-width letters
    assert!(words.iter().any(|w| w.starts_with("caf")));
}

#[test]
fn it_filters_stopwords_when_asked() {
    let opts = AnalyzerOptions { stem: false, stopwords: true };
    let words = tokenize("The quick brown fox and the lazy dog", opts);
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
    assert!(words.contains(&"quick".to_string()));
}

#[test]
fn default_keeps_every_term() {
    let words = tokenize("The quick brown fox and the lazy dog", AnalyzerOptions::default());
    assert_eq!(words.iter().filter(|w| *w == "the").count(), 2);
}

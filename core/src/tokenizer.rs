use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)\b\w\w+\b").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","cannot","could",
            "did","do","does","doing","down","during",
            "each","few","for","from","further",
            "had","has","have","having","he","her","here","hers","herself","him","himself","his","how",
            "i","if","in","into","is","it","its","itself",
            "me","more","most","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","should","so","some","such",
            "than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
            "under","until","up","very",
            "was","we","were","what","when","where","which","while","who","whom","why","with","would",
            "you","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

/// Optional English-specific filters. Both are off by default so that
/// non-English corpora (Devanagari, etc.) are indexed verbatim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerOptions {
    pub stopwords: bool,
    pub stem: bool,
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Tokenize text into terms: NFKC normalization, lowercase, runs of two or more
/// word characters, then the optional stopword and stemming filters.
pub fn tokenize(text: &str, opts: AnalyzerOptions) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    let mut tokens = Vec::new();
    for mat in RE.find_iter(&normalized) {
        let token = mat.as_str();
        if opts.stopwords && is_stopword(token) { continue; }
        if opts.stem {
            tokens.push(STEMMER.stem(token).into_owned());
        } else {
            tokens.push(token.to_string());
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_characters_are_dropped() {
        let t = tokenize("A b cd, EF!", AnalyzerOptions::default());
        assert_eq!(t, vec!["cd", "ef"]);
    }

    #[test]
    fn devanagari_words_stay_whole() {
        let t = tokenize("यह एक परीक्षण अंश है।", AnalyzerOptions::default());
        assert!(t.contains(&"परीक्षण".to_string()));
        assert!(t.contains(&"अंश".to_string()));
    }

    #[test]
    fn stemming_is_opt_in() {
        let plain = tokenize("Running runners", AnalyzerOptions::default());
        assert_eq!(plain, vec!["running", "runners"]);
        let stemmed = tokenize("Running runners", AnalyzerOptions { stem: true, stopwords: false });
        assert!(stemmed.iter().any(|w| w == "run"));
    }
}

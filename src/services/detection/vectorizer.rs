// TF-IDF Vectorizer
// Unigram + bigram vocabulary learned at fit time, L2-normalized sparse rows

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::services::text_processor::{ngrams, tokenize};

/// Sorted `(feature index, weight)` pairs; absent features are zero.
pub type SparseVector = Vec<(usize, f64)>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VectorizerParams {
    pub max_features: usize,
    pub min_df: usize,
    pub ngram_max: usize,
}

impl Default for VectorizerParams {
    fn default() -> Self {
        Self {
            max_features: 1000,
            min_df: 2,
            ngram_max: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    /// term -> column
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    ngram_max: usize,
}

/// Terms of one document: tokens of two or more chars, then every n-gram up to `ngram_max`.
fn analyze(document: &str, ngram_max: usize) -> Vec<String> {
    let tokens: Vec<String> = tokenize(document)
        .into_iter()
        .filter(|t| t.chars().count() >= 2)
        .collect();

    let mut terms = tokens.clone();
    for n in 2..=ngram_max.max(1) {
        terms.extend(ngrams(&tokens, n));
    }
    terms
}

impl TfidfVectorizer {
    pub fn fit(documents: &[String], params: &VectorizerParams) -> Self {
        let mut document_frequency: HashMap<String, usize> = HashMap::new();
        let mut corpus_frequency: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let terms = analyze(doc, params.ngram_max);
            let unique: HashSet<&String> = terms.iter().collect();
            for term in unique {
                *document_frequency.entry(term.clone()).or_insert(0) += 1;
            }
            for term in terms {
                *corpus_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let mut kept: Vec<(String, usize)> = corpus_frequency
            .into_iter()
            .filter(|(term, _)| document_frequency.get(term).copied().unwrap_or(0) >= params.min_df)
            .collect();
        // Most frequent first, alphabetical among equals.
        kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        kept.truncate(params.max_features);

        // Columns are assigned alphabetically so the layout is independent of frequency order.
        let ordered: BTreeMap<String, usize> = kept
            .into_iter()
            .map(|(term, _)| {
                let df = document_frequency.get(&term).copied().unwrap_or(0);
                (term, df)
            })
            .collect();

        let n_documents = documents.len() as f64;
        let mut vocabulary = HashMap::with_capacity(ordered.len());
        let mut idf = Vec::with_capacity(ordered.len());
        for (idx, (term, df)) in ordered.into_iter().enumerate() {
            idf.push(((1.0 + n_documents) / (1.0 + df as f64)).ln() + 1.0);
            vocabulary.insert(term, idx);
        }

        Self {
            vocabulary,
            idf,
            ngram_max: params.ngram_max,
        }
    }

    pub fn transform(&self, document: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in analyze(document, self.ngram_max) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut row: SparseVector = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx]))
            .collect();

        let norm = row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in row.iter_mut() {
                *v /= norm;
            }
        }
        row
    }

    pub fn feature_count(&self) -> usize {
        self.idf.len()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.vocabulary.contains_key(term)
    }

    /// Every vocabulary column has an idf weight, and no two terms share one.
    pub fn is_consistent(&self) -> bool {
        let mut seen = vec![false; self.idf.len()];
        self.vocabulary.len() == self.idf.len()
            && self.vocabulary.values().all(|&idx| {
                idx < seen.len() && !std::mem::replace(&mut seen[idx], true)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_min_df_prunes_rare_terms() {
        let corpus = docs(&["return value", "return early", "lunch today"]);
        let vec = TfidfVectorizer::fit(&corpus, &VectorizerParams::default());
        assert!(vec.contains("return"));
        assert!(!vec.contains("lunch"));
        assert!(!vec.contains("return value"));
        assert_eq!(vec.feature_count(), 1);
    }

    #[test]
    fn test_bigrams_enter_vocabulary() {
        let corpus = docs(&["best regards sarah", "best regards mike"]);
        let vec = TfidfVectorizer::fit(&corpus, &VectorizerParams::default());
        assert!(vec.contains("best regards"));
        assert!(vec.contains("best"));
        assert!(!vec.contains("regards sarah"));
    }

    #[test]
    fn test_single_char_tokens_dropped() {
        let corpus = docs(&["a b c", "a b c"]);
        let vec = TfidfVectorizer::fit(&corpus, &VectorizerParams::default());
        assert_eq!(vec.feature_count(), 0);
        assert!(vec.transform("a b c").is_empty());
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let corpus = docs(&["lol lol lol omg", "lol omg brb", "brb omg"]);
        let params = VectorizerParams {
            max_features: 1,
            min_df: 1,
            ngram_max: 1,
        };
        let vec = TfidfVectorizer::fit(&corpus, &params);
        assert_eq!(vec.feature_count(), 1);
        assert!(vec.contains("lol"));
    }

    #[test]
    fn test_rows_are_unit_length() {
        let corpus = docs(&["const x return", "const y return", "dear sir regards", "dear madam regards"]);
        let vec = TfidfVectorizer::fit(&corpus, &VectorizerParams::default());
        let row = vec.transform("const return return");
        let norm: f64 = row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
        assert!(row.windows(2).all(|w| w[0].0 < w[1].0));
        assert!(vec.transform("nothing known here").is_empty());
    }

    #[test]
    fn test_consistency_check() {
        let mut vectorizer = TfidfVectorizer::fit(
            &docs(&["return value", "return early", "value early"]),
            &VectorizerParams::default(),
        );
        assert!(vectorizer.is_consistent());
        vectorizer.idf.pop();
        assert!(!vectorizer.is_consistent());
    }
}

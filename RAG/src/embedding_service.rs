use crate::models::*;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

const VOCABULARY_SIZE: usize = 1000;
const MIN_DIMENSIONS: usize = 100;

/// TF-IDF vector index over the chunks of a single document.
///
/// Built once per request and queried once per rule.
#[derive(Debug)]
pub struct VectorIndex {
    vocabulary: HashMap<String, usize>,
    idf_scores: HashMap<String, f32>,
    chunks: Vec<DocumentChunk>,
}

impl VectorIndex {
    pub fn build(mut chunks: Vec<DocumentChunk>) -> Self {
        log::info!("Generating embeddings for {} document chunks...", chunks.len());

        let mut word_counts: HashMap<String, usize> = HashMap::new();
        let mut doc_frequencies: HashMap<String, usize> = HashMap::new();
        let total_chunks = chunks.len();

        for chunk in &chunks {
            let words = tokenize(&chunk.content);
            let unique_words: HashSet<&String> = words.iter().collect();

            for word in unique_words {
                *doc_frequencies.entry(word.clone()).or_insert(0) += 1;
            }
            for word in words {
                *word_counts.entry(word).or_insert(0) += 1;
            }
        }

        let idf_scores: HashMap<String, f32> = doc_frequencies
            .into_iter()
            .map(|(word, df)| {
                // Smoothed so terms present in every chunk still carry weight.
                let idf = ((1.0 + total_chunks as f32) / (1.0 + df as f32)).ln() + 1.0;
                (word, idf)
            })
            .collect();

        // Ties broken alphabetically so vocabulary slots are stable.
        let mut word_freq_pairs: Vec<(String, usize)> = word_counts.into_iter().collect();
        word_freq_pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let vocabulary: HashMap<String, usize> = word_freq_pairs
            .into_iter()
            .take(VOCABULARY_SIZE)
            .enumerate()
            .map(|(idx, (word, _))| (word, idx))
            .collect();

        let mut index = Self {
            vocabulary,
            idf_scores,
            chunks: Vec::new(),
        };

        chunks.par_iter_mut().for_each(|chunk| {
            chunk.embedding = Some(index.embed(&chunk.content));
        });
        index.chunks = chunks;

        log::info!("Vector index ready ({} terms)", index.vocabulary.len());
        index
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; self.vocabulary.len().max(MIN_DIMENSIONS)];
        let words = tokenize(text);
        let total_words = words.len() as f32;

        for (word, count) in count_words(&words) {
            if let Some(&idx) = self.vocabulary.get(word) {
                let tf = count as f32 / total_words;
                let idf = self.idf_scores.get(word).copied().unwrap_or(1.0);
                embedding[idx] = tf * idf;
            }
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in embedding.iter_mut() {
                *value /= norm;
            }
        }

        embedding
    }

    /// Returns up to `k` chunks ranked by cosine similarity to `query`.
    ///
    /// When nothing in the index shares a term with the query, the leading
    /// chunks are returned in document order so the model still sees text.
    pub fn search(&self, query: &str, k: usize) -> Vec<ScoredChunk> {
        if k == 0 || self.chunks.is_empty() {
            return Vec::new();
        }

        let query_embedding = self.embed(query);

        let mut scored: Vec<ScoredChunk> = self
            .chunks
            .iter()
            .filter_map(|chunk| {
                let embedding = chunk.embedding.as_ref()?;
                Some(ScoredChunk {
                    chunk: chunk.clone(),
                    score: cosine_similarity(&query_embedding, embedding),
                })
            })
            .collect();

        if scored.iter().all(|s| s.score <= 0.0) {
            log::debug!("No lexical overlap for query, falling back to leading chunks");
            scored.truncate(k);
            return scored;
        }

        // Stable sort keeps document order among equal scores.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        log::info!("Found {} relevant chunks", scored.len());
        scored
    }
}

pub fn cosine_similarity(embedding1: &[f32], embedding2: &[f32]) -> f32 {
    let min_len = embedding1.len().min(embedding2.len());

    let dot_product: f32 = embedding1[..min_len]
        .iter()
        .zip(embedding2[..min_len].iter())
        .map(|(a, b)| a * b)
        .sum();

    let norm1: f32 = embedding1[..min_len].iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm2: f32 = embedding2[..min_len].iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm1 == 0.0 || norm2 == 0.0 {
        0.0
    } else {
        dot_product / (norm1 * norm2)
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
        })
        .filter(|word| word.chars().count() > 2)
        .collect()
}

fn count_words(words: &[String]) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for word in words {
        *counts.entry(word.as_str()).or_insert(0) += 1;
    }
    counts
}

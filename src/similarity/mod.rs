//! Similarity primitives shared by the comparison modules.
//!
//! Set blends, n-gram generation with dense-vector cosine, Shannon entropy,
//! edit distance, MinHash sketches and weighted means over optional terms.

mod edit;
mod entropy;
mod minhash;
mod ngram;
mod set_similarity;
mod weighted;

pub use edit::{levenshtein, normalized_edit_similarity};
pub use entropy::{shannon_entropy, shannon_entropy_of_chars};
pub use minhash::{MinHashSignature, MinHasher, DEFAULT_NUM_PERM};
pub use ngram::{cosine_similarity, count_ngrams, ngrams, NGram};
pub use set_similarity::{jaccard, set_similarity, SetSimilarityBreakdown};
pub use weighted::WeightedMean;

use tiktoken_rs::CoreBPE;

use crate::errors::{ContextEngineError, Result};

/// Counts model tokens for arbitrary text.
///
/// The assembler measures every section and candidate through this trait.
pub trait Tokenizer: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;

    /// Name of the model the counts are calibrated for.
    fn model(&self) -> &str;
}

/// Exact counts with the `cl100k_base` encoding used by gpt-4.
pub struct BpeTokenizer {
    model: String,
    bpe: CoreBPE,
}

impl BpeTokenizer {
    pub const MODEL: &'static str = "gpt-4";

    /// Loads the `cl100k_base` ranks. Fails with `External` if they cannot
    /// be loaded.
    pub fn cl100k() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base().map_err(|e| ContextEngineError::External {
            collaborator: "tokenizer".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            model: Self::MODEL.to_string(),
            bpe,
        })
    }
}

impl Tokenizer for BpeTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Approximates tokens as `ceil(chars / 4)`.
///
/// The count is subadditive: the tokens of a concatenation never exceed the
/// sum of the tokens of its parts.
#[derive(Debug, Clone)]
pub struct HeuristicTokenizer {
    model: String,
    chars_per_token: usize,
}

impl HeuristicTokenizer {
    pub const DEFAULT_MODEL: &'static str = "chars/4";
    pub const CHARS_PER_TOKEN: usize = 4;

    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            chars_per_token: Self::CHARS_PER_TOKEN,
        }
    }
}

impl Default for HeuristicTokenizer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MODEL)
    }
}

impl Tokenizer for HeuristicTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

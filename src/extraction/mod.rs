/// Tree-sitter based symbol extraction.
///
/// Parses source text with a grammar from the [`GrammarRegistry`], walks the
/// tree for named declarations, and fingerprints each one with a hash of its
/// normalized syntax so that formatting and comment changes do not count as
/// drift.
mod normalize;
mod registry;
mod symbols;

pub use normalize::{is_comment, is_semantic_hash, normalize, normalized_tokens, semantic_hash};
pub use registry::GrammarRegistry;
pub use symbols::{signature_from_line, symbol_kind_for};

use tracing::debug;
use tree_sitter::Tree;

use crate::errors::Result;
use crate::types::{Language, Symbol};
use symbols::SymbolCollector;

/// Finds and fingerprints named declarations in source text.
#[derive(Clone, Copy)]
pub struct SymbolExtractor<'r> {
    registry: &'r GrammarRegistry,
}

impl<'r> SymbolExtractor<'r> {
    /// Creates an extractor that draws grammars from `registry`.
    pub fn new(registry: &'r GrammarRegistry) -> Self {
        Self { registry }
    }

    /// Returns the registry backing this extractor.
    pub fn registry(&self) -> &'r GrammarRegistry {
        self.registry
    }

    /// Parses source text into a syntax tree.
    ///
    /// Fails with `UnsupportedLanguage` when no grammar is registered for
    /// `language`; malformed input yields a best-effort tree.
    pub fn parse(&self, source: &str, language: Language) -> Result<Tree> {
        self.registry.parse(source, language)
    }

    /// Returns every named declaration in document order.
    ///
    /// Export wrappers are unwrapped, declarators are only emitted when their
    /// initializer is a function, and unnamed nodes are skipped.
    pub fn find_all_symbols(&self, source: &str, language: Language) -> Result<Vec<Symbol>> {
        let tree = self.parse(source, language)?;
        let mut collector = SymbolCollector::new(source, language);
        collector.visit(tree.root_node());
        let symbols = collector.into_symbols();
        debug!(
            language = language.as_str(),
            count = symbols.len(),
            "extracted symbols"
        );
        Ok(symbols)
    }

    /// Returns the first declaration named `name`, in traversal order.
    ///
    /// Duplicate names (overloads, shadowing, nested scopes) are not
    /// disambiguated.
    pub fn find_symbol(&self, source: &str, name: &str, language: Language) -> Result<Option<Symbol>> {
        Ok(self
            .find_all_symbols(source, language)?
            .into_iter()
            .find(|s| s.name == name))
    }
}

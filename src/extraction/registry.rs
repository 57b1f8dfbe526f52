/// Lazily-loaded tree-sitter grammars keyed by language tag.
use std::collections::HashMap;
use std::sync::OnceLock;

use tracing::debug;
use tree_sitter::{Language as Grammar, Parser, Tree};

use crate::errors::{ContextEngineError, Result};
use crate::types::Language;

/// Registry of compiled grammars.
///
/// Each registered language owns one `OnceLock`, so a grammar is loaded the
/// first time it is needed and shared read-only afterwards. The registry is
/// `Sync` and can be handed by reference to worker threads.
pub struct GrammarRegistry {
    grammars: HashMap<Language, OnceLock<Grammar>>,
}

impl GrammarRegistry {
    /// Creates a registry holding every built-in language.
    pub fn new() -> Self {
        Self::with_languages(&Language::ALL)
    }

    /// Creates a registry restricted to the given languages.
    pub fn with_languages(languages: &[Language]) -> Self {
        Self {
            grammars: languages.iter().map(|l| (*l, OnceLock::new())).collect(),
        }
    }

    /// Returns `true` if a grammar is registered for `language`.
    pub fn supports(&self, language: Language) -> bool {
        self.grammars.contains_key(&language)
    }

    /// Returns the registered languages in tag order.
    pub fn languages(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = self.grammars.keys().copied().collect();
        languages.sort();
        languages
    }

    /// Returns the compiled grammar for `language`, loading it on first use.
    pub fn grammar(&self, language: Language) -> Result<&Grammar> {
        let slot =
            self.grammars
                .get(&language)
                .ok_or_else(|| ContextEngineError::UnsupportedLanguage {
                    language: language.as_str().to_string(),
                })?;
        Ok(slot.get_or_init(|| {
            debug!(language = language.as_str(), "loading grammar");
            load_grammar(language)
        }))
    }

    /// Parses source text into a syntax tree.
    ///
    /// Malformed input still yields a tree containing `ERROR` nodes; only a
    /// missing grammar or a grammar/runtime ABI mismatch is an error.
    pub fn parse(&self, source: &str, language: Language) -> Result<Tree> {
        let grammar = self.grammar(language)?;
        let mut parser = Parser::new();
        parser
            .set_language(grammar)
            .map_err(|e| ContextEngineError::External {
                collaborator: "tree-sitter".to_string(),
                message: format!("failed to load {} grammar: {e}", language.as_str()),
            })?;
        parser
            .parse(source, None)
            .ok_or_else(|| ContextEngineError::External {
                collaborator: "tree-sitter".to_string(),
                message: "parse returned no tree".to_string(),
            })
    }
}

impl Default for GrammarRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn load_grammar(language: Language) -> Grammar {
    match language {
        Language::Ts => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        Language::Js | Language::Jsx => tree_sitter_javascript::LANGUAGE.into(),
        Language::Py => tree_sitter_python::LANGUAGE.into(),
        Language::Rs => tree_sitter_rust::LANGUAGE.into(),
        Language::Go => tree_sitter_go::LANGUAGE.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unregistered_language_is_unsupported() {
        let registry = GrammarRegistry::with_languages(&[Language::Py]);
        assert!(registry.supports(Language::Py));
        let err = registry.parse("fn main() {}", Language::Rs).unwrap_err();
        assert!(matches!(err, ContextEngineError::UnsupportedLanguage { .. }));
    }

    #[test]
    fn test_grammar_is_loaded_once() {
        let registry = GrammarRegistry::new();
        let first = registry.grammar(Language::Ts).unwrap() as *const Grammar;
        let second = registry.grammar(Language::Ts).unwrap() as *const Grammar;
        assert_eq!(first, second);
    }

    #[test]
    fn test_malformed_source_still_parses() {
        let registry = GrammarRegistry::new();
        let tree = registry.parse("function (( {", Language::Js).unwrap();
        assert!(tree.root_node().has_error());
    }

    #[test]
    fn test_languages_sorted() {
        let registry = GrammarRegistry::with_languages(&[Language::Go, Language::Ts]);
        assert_eq!(registry.languages(), vec![Language::Ts, Language::Go]);
    }
}

/// Enumeration of named declarations in a syntax tree.
use tree_sitter::Node as TsNode;

use crate::extraction::normalize::{normalize, semantic_hash};
use crate::types::{Language, Symbol, SymbolKind};

/// Maps grammar node types to symbol kinds, across all supported grammars.
static SYMBOL_KINDS: &[(&str, SymbolKind)] = &[
    // JavaScript / TypeScript
    ("function_declaration", SymbolKind::Function),
    ("generator_function_declaration", SymbolKind::Function),
    ("function_expression", SymbolKind::Function),
    ("arrow_function", SymbolKind::Function),
    ("class_declaration", SymbolKind::Class),
    ("abstract_class_declaration", SymbolKind::Class),
    ("method_definition", SymbolKind::Method),
    ("method_signature", SymbolKind::Method),
    ("interface_declaration", SymbolKind::Interface),
    ("type_alias_declaration", SymbolKind::Type),
    ("enum_declaration", SymbolKind::Enum),
    ("variable_declarator", SymbolKind::Variable),
    ("lexical_declaration", SymbolKind::Variable),
    // Python
    ("function_definition", SymbolKind::Function),
    ("class_definition", SymbolKind::Class),
    // Rust
    ("function_item", SymbolKind::Function),
    ("function_signature_item", SymbolKind::Function),
    ("struct_item", SymbolKind::Class),
    ("union_item", SymbolKind::Class),
    ("trait_item", SymbolKind::Interface),
    ("type_item", SymbolKind::Type),
    ("enum_item", SymbolKind::Enum),
    // Go
    ("method_declaration", SymbolKind::Method),
    ("type_spec", SymbolKind::Type),
    ("type_alias", SymbolKind::Type),
];

/// Wrappers that are transparent: the `declaration` field holds the symbol,
/// otherwise every child is visited.
const EXPORT_WRAPPERS: &[&str] = &["export_statement", "export_named_declaration"];

/// Child node types that can serve as a declaration's name.
const NAME_KINDS: &[&str] = &["identifier", "property_identifier", "type_identifier"];

/// Node types named only through their `name` field. Their first identifier
/// child is a parameter, not a name.
const NAME_FIELD_ONLY: &[&str] = &["arrow_function", "function_expression"];

/// Initializer types that turn a variable declarator into a function symbol.
const FUNCTION_VALUE_KINDS: &[&str] = &[
    "arrow_function",
    "function_expression",
    "generator_function",
];

/// Longest signature kept before truncation, in characters.
const MAX_SIGNATURE_CHARS: usize = 100;

/// Looks up the symbol kind for a grammar node type.
pub fn symbol_kind_for(node_type: &str) -> Option<SymbolKind> {
    SYMBOL_KINDS
        .iter()
        .find(|(t, _)| *t == node_type)
        .map(|(_, kind)| *kind)
}

/// Collects symbols in document (pre-order) order.
pub(crate) struct SymbolCollector<'s> {
    source: &'s str,
    lines: Vec<&'s str>,
    language: Language,
    symbols: Vec<Symbol>,
}

impl<'s> SymbolCollector<'s> {
    pub(crate) fn new(source: &'s str, language: Language) -> Self {
        Self {
            source,
            lines: source.split('\n').collect(),
            language,
            symbols: Vec::new(),
        }
    }

    pub(crate) fn into_symbols(self) -> Vec<Symbol> {
        self.symbols
    }

    pub(crate) fn visit(&mut self, node: TsNode<'_>) {
        if let Some(kind) = symbol_kind_for(node.kind()) {
            if node.kind() == "variable_declarator" && self.visit_declarator(node) {
                return;
            }
            if kind != SymbolKind::Variable {
                if let Some(name) = self.find_name(node) {
                    self.push(node, name, kind);
                }
            }
        }

        // Decorators come before the declaration inside the wrapper.
        if EXPORT_WRAPPERS.contains(&node.kind()) {
            if let Some(declaration) = node.child_by_field_name("declaration") {
                self.visit(declaration);
                return;
            }
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child);
        }
    }

    /// Emits `const f = () => ...` style declarators as functions.
    ///
    /// Returns `true` when the declarator was consumed.
    fn visit_declarator(&mut self, node: TsNode<'_>) -> bool {
        let value = node.child_by_field_name("value").or_else(|| {
            let mut cursor = node.walk();
            let second = node.named_children(&mut cursor).nth(1);
            second
        });
        let is_function = value
            .map(|v| v.is_named() && FUNCTION_VALUE_KINDS.contains(&v.kind()))
            .unwrap_or(false);
        if !is_function {
            return false;
        }
        match self.find_name(node) {
            Some(name) => {
                self.push(node, name, SymbolKind::Function);
                true
            }
            None => false,
        }
    }

    fn find_name(&self, node: TsNode<'_>) -> Option<String> {
        if let Some(name) = node.child_by_field_name("name") {
            return Some(self.node_text(name));
        }
        if NAME_FIELD_ONLY.contains(&node.kind()) {
            return None;
        }
        let mut cursor = node.walk();
        let found = node
            .children(&mut cursor)
            .find(|c| NAME_KINDS.contains(&c.kind()));
        found.map(|c| self.node_text(c))
    }

    fn push(&mut self, node: TsNode<'_>, name: String, kind: SymbolKind) {
        let start_row = node.start_position().row;
        let normalized = normalize(node, self.source.as_bytes());
        self.symbols.push(Symbol {
            name,
            kind,
            language: self.language,
            content_hash: semantic_hash(&normalized),
            signature: signature_from_line(self.lines.get(start_row).copied().unwrap_or("")),
            start_line: start_row as u32 + 1,
            end_line: node.end_position().row as u32 + 1,
        });
    }

    fn node_text(&self, node: TsNode<'_>) -> String {
        node.utf8_text(self.source.as_bytes())
            .unwrap_or("")
            .to_string()
    }
}

/// Trims a source line and truncates it to the signature length limit.
pub fn signature_from_line(line: &str) -> String {
    let signature = line.trim();
    if signature.chars().count() > MAX_SIGNATURE_CHARS {
        let head: String = signature.chars().take(MAX_SIGNATURE_CHARS).collect();
        format!("{head}...")
    } else {
        signature.to_string()
    }
}

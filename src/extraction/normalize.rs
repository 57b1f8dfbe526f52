/// Formatting-independent rendering of a syntax subtree, and its hash.
use sha2::{Digest, Sha256};
use tree_sitter::Node as TsNode;

/// Node types dropped from the normalized form, together with their subtrees.
const COMMENT_KINDS: &[&str] = &["comment", "line_comment", "block_comment"];

/// Returns `true` if `kind` names a comment node.
pub fn is_comment(kind: &str) -> bool {
    COMMENT_KINDS.contains(&kind)
}

/// Renders `node` as a stream of structural tokens.
///
/// Leaves become `[type:text]` (text trimmed, empty leaves dropped) and
/// internal nodes wrap their children in `[type` ... `/type]`. Comments are
/// skipped. Whitespace between tokens never appears in the output.
pub fn normalized_tokens(node: TsNode<'_>, source: &[u8]) -> Vec<String> {
    let mut out = Vec::new();
    push_tokens(node, source, &mut out);
    out
}

fn push_tokens(node: TsNode<'_>, source: &[u8], out: &mut Vec<String>) {
    if is_comment(node.kind()) {
        return;
    }

    if node.child_count() == 0 {
        let text = node.utf8_text(source).unwrap_or("").trim();
        if !text.is_empty() {
            out.push(format!("[{}:{}]", node.kind(), text));
        }
        return;
    }

    out.push(format!("[{}", node.kind()));
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        push_tokens(child, source, out);
    }
    out.push(format!("/{}]", node.kind()));
}

/// Returns the canonical string for `node`.
pub fn normalize(node: TsNode<'_>, source: &[u8]) -> String {
    normalized_tokens(node, source).concat()
}

/// Hashes a normalized string as `sha256:<64 hex>`.
pub fn semantic_hash(normalized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

/// Returns `true` if `hash` has the `sha256:<64 lowercase hex>` shape.
pub fn is_semantic_hash(hash: &str) -> bool {
    match hash.strip_prefix("sha256:") {
        Some(hex) => {
            hex.len() == 64 && hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::GrammarRegistry;
    use crate::types::Language;

    fn tokens_of(source: &str, language: Language) -> Vec<String> {
        let registry = GrammarRegistry::new();
        let tree = registry.parse(source, language).unwrap();
        normalized_tokens(tree.root_node(), source.as_bytes())
    }

    #[test]
    fn test_leaf_and_wrapper_tokens() {
        let tokens = tokens_of("x = 1\n", Language::Py);
        assert_eq!(tokens.first().map(String::as_str), Some("[module"));
        assert_eq!(tokens.last().map(String::as_str), Some("/module]"));
        assert!(tokens.contains(&"[identifier:x]".to_string()));
        assert!(tokens.contains(&"[integer:1]".to_string()));
    }

    #[test]
    fn test_comments_are_dropped() {
        let tokens = tokens_of("// note\nlet a = 2;\n", Language::Js);
        assert!(tokens.iter().all(|t| !t.contains("comment")));
        assert!(tokens.iter().all(|t| !t.contains("note")));
    }

    #[test]
    fn test_whitespace_does_not_change_tokens() {
        let compact = tokens_of("let a=[1,2];", Language::Js);
        let spaced = tokens_of("let   a =\n  [ 1 ,\n 2 ] ;", Language::Js);
        assert_eq!(compact, spaced);
    }

    #[test]
    fn test_hash_format() {
        let hash = semantic_hash("[program/program]");
        assert!(is_semantic_hash(&hash));
        assert_eq!(hash.len(), "sha256:".len() + 64);
        assert!(!is_semantic_hash("sha256:abc123"));
        assert!(!is_semantic_hash("md5:0000"));
    }
}

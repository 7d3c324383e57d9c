/*!
# Fingerprint

Content identity of CST subtrees. A subtree is serialised into a canonical,
position-free form and hashed with SHA-1:

- rule node: `{"<canonical rule name>":[<child>,<child>,...]}`
- token:     `{"type":<token type code>,"text":"<json-escaped token text>"}`

Trivia (comments, preprocessor lines, whitespace) never reaches the tree, so
reformatting or moving a block does not change its fingerprint.
*/

pub mod blocks;

pub use blocks::{block_findings, code_blocks, BlockFindings, CodeBlock, CodeDiagnostics, PARSE_ERROR_HASH};

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::ast_core::{NodeId, SyntaxKind, SyntaxTree};

/// Отпечаток поддерева
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// SHA-1, lowercase hex
    pub hash: String,
    pub canonical_form: String,
}

impl Fingerprint {
    pub fn of(tree: &SyntaxTree, node: NodeId) -> Self {
        let canonical_form = canonical_form(tree, node);
        let hash = digest(&canonical_form);
        Self { hash, canonical_form }
    }
}

/// Только хеш поддерева
pub fn fingerprint(tree: &SyntaxTree, node: NodeId) -> String {
    digest(&canonical_form(tree, node))
}

/// SHA-1 от UTF-8 байт строки в виде lowercase hex
pub fn digest(text: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Каноническая форма поддерева за один проход
pub fn canonical_form(tree: &SyntaxTree, node: NodeId) -> String {
    let mut out = String::with_capacity(tree.node(node).tokens.len() * 32 + 16);
    write_node(tree, node, &mut out);
    out
}

fn write_node(tree: &SyntaxTree, id: NodeId, out: &mut String) {
    let node = tree.node(id);

    if node.kind == SyntaxKind::Token {
        if let Some(token) = tree.token(id) {
            out.push_str("{\"type\":");
            out.push_str(&token.token_type.code().to_string());
            out.push_str(",\"text\":");
            out.push_str(&serde_json::Value::String(tree.token_text(token).to_string()).to_string());
            out.push('}');
        }
        return;
    }

    out.push_str("{\"");
    out.push_str(node.kind.canonical_name());
    out.push_str("\":[");
    for (index, child) in tree.children(id).enumerate() {
        if index > 0 {
            out.push(',');
        }
        write_node(tree, child, out);
    }
    out.push_str("]}");
}

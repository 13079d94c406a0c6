//! Source chunking for the embedding index
//!
//! Primary strategy parses the file with tree-sitter and lifts top-level
//! declarations (functions, classes, impls) into one chunk each. Anything that
//! defeats the parser falls back to fixed-size line windows. Parser failures
//! are treated as "zero structural spans", never propagated.

use tree_sitter::{Node, Parser};

/// One retrievable span of source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Deterministic id: `{path}#chunk{N}` over the final chunk list, so
    /// re-chunking an unchanged file reproduces the same ids.
    pub id: String,
    pub source_path: String,
    pub text: String,
}

/// Language detected from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Unknown,
}

impl Language {
    pub fn from_path(path: &str) -> Self {
        let ext = path.rsplit('.').next().unwrap_or_default();
        match ext.to_lowercase().as_str() {
            "rs" => Language::Rust,
            "py" | "pyw" => Language::Python,
            "js" | "mjs" | "cjs" | "jsx" => Language::JavaScript,
            "ts" | "tsx" => Language::TypeScript,
            _ => Language::Unknown,
        }
    }

    fn grammar(self) -> Option<tree_sitter::Language> {
        match self {
            Language::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
            Language::Python => Some(tree_sitter_python::LANGUAGE.into()),
            Language::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
            Language::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            Language::Unknown => None,
        }
    }

    /// Top-level node kinds lifted into chunks
    fn span_kinds(self) -> &'static [&'static str] {
        match self {
            Language::Rust => &[
                "function_item",
                "struct_item",
                "enum_item",
                "trait_item",
                "impl_item",
                "mod_item",
            ],
            Language::Python => &[
                "function_definition",
                "class_definition",
                "decorated_definition",
            ],
            Language::JavaScript => &[
                "function_declaration",
                "generator_function_declaration",
                "class_declaration",
            ],
            Language::TypeScript => &[
                "function_declaration",
                "generator_function_declaration",
                "class_declaration",
                "interface_declaration",
                "enum_declaration",
            ],
            Language::Unknown => &[],
        }
    }
}

/// Splits file text into embeddable fragments
pub struct Chunker {
    window_lines: usize,
}

impl Chunker {
    pub fn new(window_lines: usize) -> Self {
        Self {
            window_lines: window_lines.max(1),
        }
    }

    /// Chunk one file. Empty input yields zero chunks; whitespace-only
    /// fragments are dropped.
    pub fn chunk_file(&self, path: &str, content: &str) -> Vec<Chunk> {
        if content.trim().is_empty() {
            return Vec::new();
        }

        let mut fragments = self.structural_spans(path, content);
        if fragments.is_empty() {
            fragments = self.window_fragments(content);
        }

        fragments
            .into_iter()
            .filter(|text| !text.trim().is_empty())
            .enumerate()
            .map(|(index, text)| Chunk {
                id: chunk_id(path, index),
                source_path: path.to_string(),
                text,
            })
            .collect()
    }

    /// Top-level declaration spans, or empty when the language is unknown or
    /// the parser fails
    fn structural_spans(&self, path: &str, content: &str) -> Vec<String> {
        let language = Language::from_path(path);
        let grammar = match language.grammar() {
            Some(g) => g,
            None => return Vec::new(),
        };

        let mut parser = Parser::new();
        if parser.set_language(&grammar).is_err() {
            return Vec::new();
        }

        let tree = match parser.parse(content, None) {
            Some(t) => t,
            None => return Vec::new(),
        };

        let kinds = language.span_kinds();
        let root = tree.root_node();
        let mut spans = Vec::new();
        let mut cursor = root.walk();

        for child in root.children(&mut cursor) {
            collect_span(content, child, kinds, &mut spans);
        }

        spans
    }

    /// Fixed-size line windows plus a final partial window
    fn window_fragments(&self, content: &str) -> Vec<String> {
        let mut fragments = Vec::new();
        let mut buffer: Vec<&str> = Vec::new();

        for line in content.lines() {
            buffer.push(line);
            if buffer.len() == self.window_lines {
                fragments.push(buffer.join("\n"));
                buffer.clear();
            }
        }

        if !buffer.is_empty() {
            fragments.push(buffer.join("\n"));
        }

        fragments
    }
}

/// Derive the deterministic chunk id for a path and ordinal
pub fn chunk_id(path: &str, index: usize) -> String {
    format!("{}#chunk{}", path, index)
}

fn collect_span(content: &str, node: Node, kinds: &[&str], spans: &mut Vec<String>) {
    let kind = node.kind();

    if kinds.contains(&kind) {
        if let Some(text) = content.get(node.start_byte()..node.end_byte()) {
            spans.push(text.to_string());
        }
        return;
    }

    // Exported declarations wrap the real declaration one level down
    if kind == "export_statement" {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            collect_span(content, child, kinds, spans);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_path() {
        assert_eq!(Language::from_path("src/main.rs"), Language::Rust);
        assert_eq!(Language::from_path("app.py"), Language::Python);
        assert_eq!(Language::from_path("index.ts"), Language::TypeScript);
        assert_eq!(Language::from_path("notes.txt"), Language::Unknown);
        assert_eq!(Language::from_path("Makefile"), Language::Unknown);
    }

    #[test]
    fn test_python_structural_chunks() {
        let source = r#"
def alpha():
    return 1


class Beta:
    def method(self):
        return 2


def gamma():
    return 3
"#;
        let chunker = Chunker::new(20);
        let chunks = chunker.chunk_file("app.py", source);

        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].text.starts_with("def alpha"));
        assert!(chunks[1].text.starts_with("class Beta"));
        assert!(chunks[2].text.starts_with("def gamma"));
    }

    #[test]
    fn test_rust_structural_chunks() {
        let source = "struct Point { x: f32 }\n\nimpl Point {\n    fn norm(&self) -> f32 { self.x }\n}\n\nfn main() {}\n";
        let chunker = Chunker::new(20);
        let chunks = chunker.chunk_file("main.rs", source);

        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].text.starts_with("struct Point"));
        assert!(chunks[1].text.starts_with("impl Point"));
        assert!(chunks[2].text.starts_with("fn main"));
    }

    #[test]
    fn test_unknown_language_uses_line_windows() {
        let source = (0..45)
            .map(|i| format!("line {}", i))
            .collect::<Vec<_>>()
            .join("\n");
        let chunker = Chunker::new(20);
        let chunks = chunker.chunk_file("notes.txt", &source);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text.lines().count(), 20);
        assert_eq!(chunks[1].text.lines().count(), 20);
        assert_eq!(chunks[2].text.lines().count(), 5);
    }

    #[test]
    fn test_source_without_declarations_falls_back() {
        // Parseable Python, but nothing at declaration level
        let source = "x = 1\ny = 2\nprint(x + y)\n";
        let chunker = Chunker::new(20);
        let chunks = chunker.chunk_file("script.py", source);

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("x = 1"));
    }

    #[test]
    fn test_empty_file_yields_no_chunks() {
        let chunker = Chunker::new(20);
        assert!(chunker.chunk_file("empty.py", "").is_empty());
        assert!(chunker.chunk_file("blank.txt", "   \n\n  \n").is_empty());
    }

    #[test]
    fn test_chunk_ids_are_deterministic() {
        let source = "def f():\n    pass\n\n\ndef g():\n    pass\n";
        let chunker = Chunker::new(20);
        let first = chunker.chunk_file("mod.py", source);
        let second = chunker.chunk_file("mod.py", source);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.id, b.id);
        }
        assert_eq!(first[0].id, "mod.py#chunk0");
        assert_eq!(first[1].id, "mod.py#chunk1");
    }
}

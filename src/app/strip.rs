//! Language-hinted comment stripping. Pure text-in/text-out: the pipeline
//! feeds it the fence language it already detected for the file.
//!
//! This is a lexer-free approximation. String literals are honored so a
//! `//` inside `"https://..."` survives, but exotic constructs (raw strings,
//! heredocs, nested block comments) are out of scope; a file that trips the
//! heuristic is embedded slightly over-stripped, never corrupted.

/// Comment syntax for one language family.
struct CommentSyntax {
    line: &'static [&'static str],
    block: Option<(&'static str, &'static str)>,
    /// Quote characters that protect markers inside literals.
    quotes: &'static [char],
}

const C_FAMILY: CommentSyntax = CommentSyntax {
    line: &["//"],
    block: Some(("/*", "*/")),
    quotes: &['"', '\''],
};

const JS_FAMILY: CommentSyntax = CommentSyntax {
    line: &["//"],
    block: Some(("/*", "*/")),
    quotes: &['"', '\'', '`'],
};

// No '\'' here: Rust lifetimes (`'a`) would read as an unterminated literal.
const RUST: CommentSyntax = CommentSyntax {
    line: &["//"],
    block: Some(("/*", "*/")),
    quotes: &['"'],
};

const HASH_FAMILY: CommentSyntax = CommentSyntax {
    line: &["#"],
    block: None,
    quotes: &['"', '\''],
};

const SQL: CommentSyntax = CommentSyntax {
    line: &["--"],
    block: Some(("/*", "*/")),
    quotes: &['\''],
};

const MARKUP: CommentSyntax = CommentSyntax {
    line: &[],
    block: Some(("<!--", "-->")),
    quotes: &[],
};

const CSS: CommentSyntax = CommentSyntax {
    line: &[],
    block: Some(("/*", "*/")),
    quotes: &['"', '\''],
};

fn syntax_for(language: &str) -> Option<&'static CommentSyntax> {
    match language {
        "javascript" | "jsx" | "typescript" | "tsx" => Some(&JS_FAMILY),
        "java" | "kotlin" | "csharp" | "go" | "php" | "scss" => Some(&C_FAMILY),
        "rust" => Some(&RUST),
        "python" | "ruby" | "bash" | "yaml" | "toml" | "dockerfile" | "makefile" => {
            Some(&HASH_FAMILY)
        }
        "sql" => Some(&SQL),
        "html" | "xml" | "vue" | "svelte" => Some(&MARKUP),
        "css" => Some(&CSS),
        // json, markdown, plaintext: nothing to strip.
        _ => None,
    }
}

enum State {
    Code,
    Str(char),
    LineComment,
    BlockComment,
}

/// Removes comments for the hinted language; unknown hints pass through
/// unchanged. Newlines inside block comments are kept so line structure
/// survives (a later blank-line pass cleans them up).
pub fn strip_comments(content: &str, language: &str) -> String {
    let Some(syntax) = syntax_for(language) else {
        return content.to_string();
    };

    let mut out = String::with_capacity(content.len());
    let mut state = State::Code;
    let mut i = 0;

    while i < content.len() {
        let rest = &content[i..];
        match state {
            State::Code => {
                if let Some((open, _)) = syntax.block {
                    if rest.starts_with(open) {
                        state = State::BlockComment;
                        i += open.len();
                        continue;
                    }
                }
                if let Some(marker) = syntax.line.iter().find(|m| rest.starts_with(**m)) {
                    // Keep a leading shebang, it is not a comment to the OS.
                    if !(i == 0 && rest.starts_with("#!")) {
                        state = State::LineComment;
                        i += marker.len();
                        continue;
                    }
                }
                let ch = rest.chars().next().unwrap_or('\0');
                if syntax.quotes.contains(&ch) {
                    state = State::Str(ch);
                }
                out.push(ch);
                i += ch.len_utf8();
            }
            State::Str(quote) => {
                let ch = rest.chars().next().unwrap_or('\0');
                out.push(ch);
                i += ch.len_utf8();
                if ch == '\\' {
                    if let Some(escaped) = content[i..].chars().next() {
                        out.push(escaped);
                        i += escaped.len_utf8();
                    }
                } else if ch == quote || ch == '\n' {
                    // A newline ends the literal too; unterminated strings
                    // must not swallow the rest of the file.
                    state = State::Code;
                }
            }
            State::LineComment => {
                let ch = rest.chars().next().unwrap_or('\0');
                if ch == '\n' {
                    out.push('\n');
                    state = State::Code;
                }
                i += ch.len_utf8();
            }
            State::BlockComment => {
                let close = syntax.block.map(|(_, close)| close).unwrap_or("*/");
                if rest.starts_with(close) {
                    i += close.len();
                    state = State::Code;
                } else {
                    let ch = rest.chars().next().unwrap_or('\0');
                    if ch == '\n' {
                        out.push('\n');
                    }
                    i += ch.len_utf8();
                }
            }
        }
    }

    out
}

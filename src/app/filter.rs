use crate::app::config::Config;
use crate::app::formatter::{format_size_kb, group_digits};
use crate::app::models::{CandidateFile, RenderedBlock, RunStats};
use crate::app::strip;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Shortest fence the output format allows.
pub const MIN_FENCE_LEN: usize = 3;

const SNIFF_LEN: usize = 512;

#[derive(Debug)]
pub struct PipelineOutcome {
    pub blocks: Vec<RenderedBlock>,
    pub stats: RunStats,
}

/// Runs every candidate through the content filters, strictly in the order
/// the resolver produced them. Per-file failures demote that file to
/// "skipped"; only the total-token budget stops the whole loop.
pub fn process_files(files: &mut [CandidateFile], config: &Config) -> PipelineOutcome {
    let opts = &config.options;
    let mut blocks = Vec::new();
    let mut stats = RunStats {
        files_discovered: files.len(),
        ..RunStats::default()
    };

    for file in files.iter_mut() {
        // Budget gate: a hard stop, not a per-file skip.
        if opts.max_total_tokens > 0 && stats.total_tokens >= opts.max_total_tokens as usize {
            stats.budget_reached = true;
            log::warn!(
                "⚠️ Context limit reached ({} tokens). Stopping.",
                group_digits(stats.total_tokens)
            );
            break;
        }

        if sniff_binary(&file.path) {
            log::info!("   ⚠️ Skipped binary: {}", file.relative_path);
            stats.skipped_binary += 1;
            continue;
        }

        let size = file.size_bytes();
        if size > opts.max_file_size_kb.saturating_mul(1024) {
            log::info!(
                "   ⚠️ Skipped large file: {} ({})",
                file.relative_path,
                format_size_kb(size as f64 / 1024.0)
            );
            stats.skipped_by_size += 1;
            continue;
        }

        let mut content = match std::fs::read_to_string(&file.path) {
            Ok(content) => content,
            Err(err) => {
                log::warn!("   ❌ Read error ({}): {}", file.relative_path, err);
                stats.skipped_read_error += 1;
                continue;
            }
        };

        let language = language_for(&file.path);
        // Comment stripping first: it can leave blank lines behind that the
        // blank-line pass should then remove.
        if opts.remove_comments {
            content = strip::strip_comments(&content, language);
        }
        if opts.remove_empty_lines {
            content = remove_blank_lines(&content);
        }

        let tokens = estimate_tokens(&content, opts.chars_per_token);
        if opts.max_file_tokens > 0 && tokens > opts.max_file_tokens as usize {
            log::info!(
                "   ⚠️ Skipped token limit: {} (~{} tokens)",
                file.relative_path,
                group_digits(tokens)
            );
            stats.skipped_by_token_cap += 1;
            continue;
        }

        stats.included += 1;
        stats.total_tokens += tokens;
        blocks.push(render_block(&file.relative_path, language, &content, tokens));
    }

    // The last accepted file can itself cross the budget line.
    if opts.max_total_tokens > 0 && stats.total_tokens >= opts.max_total_tokens as usize {
        stats.budget_reached = true;
    }

    PipelineOutcome { blocks, stats }
}

fn render_block(relative_path: &str, language: &str, content: &str, tokens: usize) -> RenderedBlock {
    let fence_len = fence_len_for(content);
    let fence = "`".repeat(fence_len);
    let body = if content.trim().is_empty() {
        "[EMPTY FILE]"
    } else {
        content
    };
    let text = format!("### `{relative_path}`\n\n{fence}{language}\n{body}\n{fence}\n\n");
    RenderedBlock {
        relative_path: relative_path.to_string(),
        fence_len,
        tokens,
        text,
    }
}

/// One backtick longer than the longest run inside the content, so the
/// embedded text can never close the block early.
pub fn fence_len_for(content: &str) -> usize {
    let mut longest = 0usize;
    let mut current = 0usize;
    for ch in content.chars() {
        if ch == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    MIN_FENCE_LEN.max(longest + 1)
}

/// Heuristic: code averages roughly 3.2 characters per token. Order of
/// magnitude only; never exact.
pub fn estimate_tokens(text: &str, chars_per_token: f64) -> usize {
    let divisor = if chars_per_token > 0.0 {
        chars_per_token
    } else {
        3.2
    };
    (text.chars().count() as f64 / divisor).ceil() as usize
}

/// A NUL byte within the first 512 bytes classifies the file as binary.
/// Empty files are text; unreadable files pass as text so the read step
/// reports the error instead.
pub fn sniff_binary(path: &Path) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let mut buf = [0u8; SNIFF_LEN];
    let mut filled = 0usize;
    loop {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => {
                filled += n;
                if filled == SNIFF_LEN {
                    break;
                }
            }
            Err(_) => return false,
        }
    }
    buf[..filled].contains(&0)
}

/// Drops lines that are empty or whitespace-only.
pub fn remove_blank_lines(content: &str) -> String {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .flat_map(|line| [line, "\n"])
        .collect()
}

/// Markdown fence language for syntax highlighting. Well-known extensionless
/// files (Dockerfile, Makefile) are special-cased by name.
pub fn language_for(path: &Path) -> &'static str {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match filename.as_str() {
        "dockerfile" => return "dockerfile",
        "makefile" => return "makefile",
        "gradlew" => return "bash",
        _ => {}
    }
    if filename.starts_with("readme") {
        return "markdown";
    }

    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "jsx",
        "ts" => "typescript",
        "tsx" => "tsx",
        "py" => "python",
        "rb" => "ruby",
        "java" => "java",
        "kt" => "kotlin",
        "cs" => "csharp",
        "go" => "go",
        "rs" => "rust",
        "php" => "php",
        "html" => "html",
        "css" => "css",
        "scss" => "scss",
        "json" => "json",
        "md" => "markdown",
        "yml" | "yaml" => "yaml",
        "toml" => "toml",
        "sh" | "zsh" => "bash",
        "xml" => "xml",
        "sql" => "sql",
        "vue" => "vue",
        "svelte" => "svelte",
        _ => "plaintext",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    #[test]
    fn fence_len_is_minimum_without_backticks() {
        assert_eq!(fence_len_for("plain text"), 3);
        assert_eq!(fence_len_for(""), 3);
    }

    #[test]
    fn fence_len_exceeds_longest_run() {
        assert_eq!(fence_len_for("uses ``` inline"), 4);
        assert_eq!(fence_len_for("`` then ````` later"), 6);
        // Runs split across lines do not merge.
        assert_eq!(fence_len_for("``\n``"), 3);
    }

    #[test]
    fn fence_never_collides_with_content() {
        for content in ["`", "``", "```", "````````", "a`b``c```d"] {
            let fence = fence_len_for(content);
            let longest = content
                .split(|c: char| c != '`')
                .map(str::len)
                .max()
                .unwrap_or(0);
            assert!(fence > longest);
            assert!(fence >= MIN_FENCE_LEN);
        }
    }

    #[test]
    fn token_estimate_is_ceiling_of_chars_over_divisor() {
        assert_eq!(estimate_tokens("", 3.2), 0);
        assert_eq!(estimate_tokens("abc", 3.2), 1);
        assert_eq!(estimate_tokens("abcd", 3.2), 2);
        // A zero divisor falls back instead of dividing by zero.
        assert_eq!(estimate_tokens("abcd", 0.0), 2);
    }

    #[test]
    fn blank_lines_are_removed() {
        let input = "a\n\n  \nb\n\t\nc\n";
        assert_eq!(remove_blank_lines(input), "a\nb\nc\n");
    }

    #[test]
    fn sniff_classifies_nul_as_binary() {
        let dir = tempfile::tempdir().unwrap();
        let binary = dir.path().join("blob");
        fs::write(&binary, b"ab\x00cd").unwrap();
        assert!(sniff_binary(&binary));

        let text = dir.path().join("text.txt");
        fs::write(&text, "hello\n").unwrap();
        assert!(!sniff_binary(&text));
    }

    #[test]
    fn sniff_treats_empty_and_missing_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty");
        fs::write(&empty, b"").unwrap();
        assert!(!sniff_binary(&empty));
        assert!(!sniff_binary(&dir.path().join("missing")));
    }

    #[test]
    fn sniff_ignores_nul_beyond_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late-nul");
        let mut bytes = vec![b'x'; 600];
        bytes.push(0);
        fs::write(&path, &bytes).unwrap();
        assert!(!sniff_binary(&path));
    }

    #[test]
    fn language_detection_covers_names_and_extensions() {
        assert_eq!(language_for(&PathBuf::from("src/main.rs")), "rust");
        assert_eq!(language_for(&PathBuf::from("Dockerfile")), "dockerfile");
        assert_eq!(language_for(&PathBuf::from("Makefile")), "makefile");
        assert_eq!(language_for(&PathBuf::from("README")), "markdown");
        assert_eq!(language_for(&PathBuf::from("notes.unknown")), "plaintext");
    }

    #[test]
    fn empty_file_renders_marker() {
        let block = render_block("empty.txt", "plaintext", "  \n", 1);
        assert!(block.text.contains("[EMPTY FILE]"));
        assert_eq!(block.fence_len, 3);
    }
}

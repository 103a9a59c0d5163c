use crate::app::config::Config;
use crate::app::filter::PipelineOutcome;
use crate::app::models::RunStats;
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Nested directory structure keyed by path segment. Built fresh per
/// render call, discarded after printing.
#[derive(Debug, Default)]
struct TreeNode {
    dirs: BTreeMap<String, TreeNode>,
    files: Vec<String>,
}

/// Renders a directory tree from relative paths: directories before files,
/// each group sorted, branch/elbow connectors marking the last sibling.
pub fn render_tree<'a, I>(relative_paths: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut root = TreeNode::default();
    let mut empty = true;

    for rel in relative_paths {
        empty = false;
        let parts: Vec<&str> = rel.split('/').filter(|p| !p.is_empty()).collect();
        let mut node = &mut root;
        for (i, part) in parts.iter().enumerate() {
            if i == parts.len() - 1 {
                node.files.push((*part).to_string());
            } else {
                node = node.dirs.entry((*part).to_string()).or_default();
            }
        }
    }

    if empty {
        return "[No files to display]\n".to_string();
    }

    let mut out = String::new();
    write_node(&root, "", &mut out);
    out
}

fn write_node(node: &TreeNode, prefix: &str, out: &mut String) {
    let mut files = node.files.clone();
    files.sort();

    let dir_count = node.dirs.len();
    for (i, (name, child)) in node.dirs.iter().enumerate() {
        // A directory is the elbow only when no files follow at this level.
        let is_last = i == dir_count - 1 && files.is_empty();
        let connector = if is_last { "└── " } else { "├── " };
        out.push_str(prefix);
        out.push_str(connector);
        out.push_str("📁 ");
        out.push_str(name);
        out.push_str("/\n");
        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        write_node(child, &child_prefix, out);
    }

    for (i, name) in files.iter().enumerate() {
        let connector = if i == files.len() - 1 {
            "└── "
        } else {
            "├── "
        };
        out.push_str(prefix);
        out.push_str(connector);
        out.push_str("📄 ");
        out.push_str(name);
        out.push('\n');
    }
}

/// Composes the final artifact: header, configuration echo, tree, file
/// sections, optional truncation notice.
pub fn assemble(
    project_name: &str,
    config: &Config,
    tree: &str,
    outcome: &PipelineOutcome,
) -> String {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut out = format!(
        "# Project Context: {project_name}\n\nGenerated: {timestamp} via ctxgen\n\n"
    );

    // Machine-readable echo of the resolved configuration, for
    // reproducibility and debugging.
    let echo = serde_json::to_string_pretty(&json!({
        "include": config.include,
        "exclude": config.exclude,
        "options": config.options,
    }))
    .unwrap_or_else(|_| "{}".to_string());
    out.push_str("## Configuration\n```json\n");
    out.push_str(&echo);
    out.push_str("\n```\n\n");

    out.push_str("## Directory Structure\n\n```\n");
    out.push_str(tree);
    out.push_str("```\n\n");

    out.push_str("## File Contents\n\n");
    for block in &outcome.blocks {
        out.push_str(&block.text);
    }

    if outcome.stats.budget_reached {
        out.push_str(&format!(
            "\n> **Context Limit Reached**: Further files were omitted to stay within {} tokens.\n",
            group_digits(config.options.max_total_tokens as usize)
        ));
    }

    out
}

/// Operator-facing statistics summary. Side channel only, never part of
/// the artifact.
pub fn print_stats(output_path: &Path, stats: &RunStats, config: &Config) {
    let output_kb = fs::metadata(output_path)
        .map(|meta| meta.len() as f64 / 1024.0)
        .unwrap_or(0.0);

    println!("\n{}", "=".repeat(60));
    println!("📊 GENERATION STATISTICS");
    println!("{}", "=".repeat(60));
    println!(
        "  • Output file:    {} ({})",
        output_path.display(),
        format_size_kb(output_kb)
    );
    println!("  • Token estimate: ~{}", group_digits(stats.total_tokens));
    println!(
        "  • Files included: {} / {}",
        stats.included, stats.files_discovered
    );
    if stats.skipped_binary > 0 {
        println!("  • Skipped binary: {}", stats.skipped_binary);
    }
    if stats.skipped_by_size > 0 {
        println!("  • Skipped large:  {}", stats.skipped_by_size);
    }
    if stats.skipped_by_token_cap > 0 {
        println!("  • Skipped tokens: {}", stats.skipped_by_token_cap);
    }
    if stats.skipped_read_error > 0 {
        println!("  • Read errors:    {}", stats.skipped_read_error);
    }
    println!(
        "  • Tree mode:      {}",
        if config.options.tree_full {
            "Full (all files)"
        } else {
            "Context only (clean)"
        }
    );
    if config.options.remove_comments {
        println!("  • Optimization:   Comments stripped ✂️");
    }
    if config.options.remove_empty_lines {
        println!("  • Optimization:   Empty lines removed ✂️");
    }
    if stats.budget_reached {
        println!("  • Budget:         Reached, output truncated");
    }
    println!("{}", "=".repeat(60));
    println!("✨ Done!");
}

pub fn format_size_kb(kb: f64) -> String {
    if kb > 0.0 && kb < 0.01 {
        return "< 0.01 KB".to_string();
    }
    if kb < 1024.0 {
        format!("{:.2} KB", kb)
    } else {
        format!("{:.2} MB", kb / 1024.0)
    }
}

/// 1234567 -> "1,234,567".
pub fn group_digits(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tree_renders_placeholder() {
        assert_eq!(render_tree(std::iter::empty()), "[No files to display]\n");
    }

    #[test]
    fn tree_lists_directories_before_files() {
        let paths = ["zeta.txt", "src/main.rs", "src/lib.rs", "alpha.txt"];
        let tree = render_tree(paths.iter().copied());
        let expected = concat!(
            "├── 📁 src/\n",
            "│   ├── 📄 lib.rs\n",
            "│   └── 📄 main.rs\n",
            "├── 📄 alpha.txt\n",
            "└── 📄 zeta.txt\n",
        );
        assert_eq!(tree, expected);
    }

    #[test]
    fn last_directory_gets_elbow_when_no_files_follow() {
        let paths = ["src/main.rs", "docs/guide.md"];
        let tree = render_tree(paths.iter().copied());
        // No continuation escapes here: the elbowed child line must keep
        // its leading four-space indent.
        let expected = concat!(
            "├── 📁 docs/\n",
            "│   └── 📄 guide.md\n",
            "└── 📁 src/\n",
            "    └── 📄 main.rs\n",
        );
        assert_eq!(tree, expected);
    }

    #[test]
    fn grouped_digits() {
        assert_eq!(group_digits(0), "0");
        assert_eq!(group_digits(999), "999");
        assert_eq!(group_digits(1000), "1,000");
        assert_eq!(group_digits(1234567), "1,234,567");
    }

    #[test]
    fn size_formatting() {
        assert_eq!(format_size_kb(0.0), "0.00 KB");
        assert_eq!(format_size_kb(0.001), "< 0.01 KB");
        assert_eq!(format_size_kb(2.5), "2.50 KB");
        assert_eq!(format_size_kb(2048.0), "2.00 MB");
    }

    #[test]
    fn assemble_includes_sections_and_truncation_notice() {
        let mut config = Config::default();
        config.options.max_total_tokens = 100;
        let outcome = PipelineOutcome {
            blocks: Vec::new(),
            stats: RunStats {
                budget_reached: true,
                ..RunStats::default()
            },
        };
        let doc = assemble("demo", &config, "[No files to display]\n", &outcome);
        assert!(doc.starts_with("# Project Context: demo\n"));
        assert!(doc.contains("## Configuration"));
        assert!(doc.contains("\"maxTotalTokens\": 100"));
        assert!(doc.contains("## Directory Structure"));
        assert!(doc.contains("## File Contents"));
        assert!(doc.contains("**Context Limit Reached**"));
        assert!(doc.contains("stay within 100 tokens"));
    }
}

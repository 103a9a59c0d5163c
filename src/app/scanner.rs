use crate::app::config::{Config, BUILTIN_EXCLUDES};
use crate::app::models::CandidateFile;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use pathdiff::diff_paths;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Parses `.gitignore` into plain exclusion patterns: comments, blanks and
/// negation lines are dropped, a leading `/` is stripped. Missing file
/// yields an empty list.
pub fn parse_gitignore(root: &Path) -> Vec<String> {
    let content = match fs::read_to_string(root.join(".gitignore")) {
        Ok(content) => content,
        Err(_) => return Vec::new(),
    };
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .map(|line| line.strip_prefix('/').unwrap_or(line).to_string())
        .collect()
}

/// The built-in denylist minus entries a user include pattern explicitly
/// targets. Fixed entries are never suppressed.
pub fn active_builtin_excludes(includes: &[String]) -> Vec<&'static str> {
    BUILTIN_EXCLUDES
        .iter()
        .filter(|entry| {
            !(entry.suppressible
                && includes
                    .iter()
                    .any(|inc| include_targets(inc, entry.pattern)))
        })
        .map(|entry| entry.pattern)
        .collect()
}

/// Does `include` explicitly target what `pattern` would hide?
/// `*.ext` entries match by extension suffix, including trailing brace
/// groups (`**/*.{log,txt}` targets `*.log`); other entries match by
/// literal suffix.
fn include_targets(include: &str, pattern: &str) -> bool {
    if let Some(ext) = pattern.strip_prefix("*.") {
        if include.ends_with(&format!(".{ext}")) {
            return true;
        }
        if include.ends_with('}') {
            if let Some(open) = include.rfind(".{") {
                let group = &include[open + 2..include.len() - 1];
                return group.split(',').any(|e| e.trim() == ext);
            }
        }
        false
    } else {
        include.ends_with(pattern)
    }
}

/// Resolves include/exclude rules into a deterministic candidate list:
/// files only, absolute paths, sorted lexicographically. Any glob or walk
/// failure demotes to an empty result; the caller reports "no files found".
pub fn resolve_files(root: &Path, config: &Config) -> Vec<CandidateFile> {
    let includes = config.effective_include();

    // Deduplicated, order-independent exclude set.
    let mut exclude_patterns: BTreeSet<String> = config.exclude.iter().cloned().collect();
    if config.options.use_gitignore {
        exclude_patterns.extend(parse_gitignore(root));
    }
    exclude_patterns.extend(
        active_builtin_excludes(&includes)
            .iter()
            .map(|s| s.to_string()),
    );
    // The artifact must never feed back into its own next run.
    exclude_patterns.insert(config.output_file.clone());

    let include_set = match build_include_set(&includes) {
        Ok(set) => set,
        Err(err) => {
            log::warn!("Error finding files: {}", err);
            return Vec::new();
        }
    };
    let exclude_set = match build_exclude_set(&exclude_patterns) {
        Ok(set) => set,
        Err(err) => {
            log::warn!("Error finding files: {}", err);
            return Vec::new();
        }
    };

    // The walker honors dotfiles; gitignore handling is ours, not its.
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .require_git(false)
        .filter_entry(|entry| {
            // Prune the mandatory directory excludes instead of walking
            // into them just to reject every file below.
            entry
                .file_name()
                .to_str()
                .map_or(true, |name| name != ".git" && name != "node_modules")
        })
        .build();

    let mut files = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                log::warn!("Error walking entry: {}", err);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let Some(relative) = diff_paths(entry.path(), root) else {
            continue;
        };
        if exclude_set.is_match(&relative) || !include_set.is_match(&relative) {
            continue;
        }
        let relative_str = relative.to_string_lossy().replace('\\', "/");
        files.push(CandidateFile::new(entry.into_path(), relative_str));
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    files
}

/// Readme-first ordering for the rendered sections; everything else sorts
/// case-insensitively by relative path, exact path as tie-break so the
/// order stays deterministic.
pub fn sort_for_pipeline(files: &mut [CandidateFile]) {
    files.sort_by(|a, b| {
        let a_priority = is_priority_name(&a.path);
        let b_priority = is_priority_name(&b.path);
        b_priority
            .cmp(&a_priority)
            .then_with(|| {
                a.relative_path
                    .to_lowercase()
                    .cmp(&b.relative_path.to_lowercase())
            })
            .then_with(|| a.relative_path.cmp(&b.relative_path))
    });
}

fn is_priority_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.eq_ignore_ascii_case("README.md"))
}

fn build_include_set(patterns: &[String]) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern.trim())?);
    }
    builder.build()
}

fn build_exclude_set<'a, I>(patterns: I) -> Result<GlobSet, globset::Error>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        add_exclude_pattern(&mut builder, pattern)?;
    }
    builder.build()
}

/// Bare patterns (`target`, `*.log`) apply at any depth, and directory
/// names swallow everything beneath them; patterns with a separator stay
/// anchored, like gitignore.
fn add_exclude_pattern(
    builder: &mut GlobSetBuilder,
    pattern: &str,
) -> Result<(), globset::Error> {
    let trimmed = pattern.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(());
    }
    builder.add(Glob::new(trimmed)?);
    builder.add(Glob::new(&format!("{trimmed}/**"))?);
    if !trimmed.contains('/') {
        builder.add(Glob::new(&format!("**/{trimmed}"))?);
        builder.add(Glob::new(&format!("**/{trimmed}/**"))?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn candidate(rel: &str) -> CandidateFile {
        CandidateFile::new(PathBuf::from("/project").join(rel), rel.to_string())
    }

    #[test]
    fn gitignore_adapter_strips_noise() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(".gitignore"),
            "# build output\n\n/dist\nnode_modules\n!keep.log\n  *.tmp  \n",
        )
        .unwrap();
        let patterns = parse_gitignore(dir.path());
        assert_eq!(patterns, vec!["dist", "node_modules", "*.tmp"]);
    }

    #[test]
    fn gitignore_adapter_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(parse_gitignore(dir.path()).is_empty());
    }

    #[test]
    fn include_suppresses_extension_entry() {
        let includes = vec!["**/*.log".to_string()];
        let active = active_builtin_excludes(&includes);
        assert!(!active.contains(&"*.log"));
        // Unrelated entries survive.
        assert!(active.contains(&"*.png"));
    }

    #[test]
    fn brace_group_suppresses_extension_entry() {
        let includes = vec!["**/*.{log,txt}".to_string()];
        let active = active_builtin_excludes(&includes);
        assert!(!active.contains(&"*.log"));
    }

    #[test]
    fn literal_entry_suppressed_by_suffix_match() {
        let includes = vec!["**/yarn.lock".to_string()];
        let active = active_builtin_excludes(&includes);
        assert!(!active.contains(&"yarn.lock"));
    }

    #[test]
    fn mandatory_excludes_are_never_suppressed() {
        let includes = vec![".git".to_string(), "**/node_modules".to_string()];
        let active = active_builtin_excludes(&includes);
        assert!(active.contains(&".git"));
        assert!(active.contains(&"node_modules"));
    }

    #[test]
    fn bare_exclude_matches_at_any_depth() {
        let patterns = ["target".to_string()];
        let set = build_exclude_set(patterns.iter()).unwrap();
        assert!(set.is_match("target"));
        assert!(set.is_match("target/debug/app"));
        assert!(set.is_match("crates/foo/target/debug/app"));
        assert!(!set.is_match("src/target.rs"));
    }

    #[test]
    fn readme_sorts_first_case_insensitively() {
        let mut files = vec![
            candidate("src/main.rs"),
            candidate("Apple.txt"),
            candidate("docs/ReadMe.md"),
            candidate("banana.txt"),
        ];
        sort_for_pipeline(&mut files);
        assert_eq!(files[0].relative_path, "docs/ReadMe.md");
        assert_eq!(files[1].relative_path, "Apple.txt");
        assert_eq!(files[2].relative_path, "banana.txt");
        assert_eq!(files[3].relative_path, "src/main.rs");
    }

    #[test]
    fn resolver_returns_sorted_files_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/b.rs"), "fn b() {}\n").unwrap();
        fs::write(dir.path().join("a.rs"), "fn a() {}\n").unwrap();
        let config = Config::default();
        let files = resolve_files(dir.path(), &config);
        let rel: Vec<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(rel, vec!["a.rs", "src/b.rs"]);
    }

    #[test]
    fn invalid_include_pattern_yields_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.rs"), "fn a() {}\n").unwrap();
        let mut config = Config::default();
        config.include = vec!["src/{".to_string()];
        assert!(resolve_files(dir.path(), &config).is_empty());
    }
}

use crate::app::cli::Cli;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "ctxgen.config.json";
pub const DEFAULT_OUTPUT_FILE: &str = "ctxgen.context.md";

/// Persisted + resolved configuration. The on-disk form is camelCase JSON so
/// the file stays hand-editable and matches the configuration echo in the
/// generated artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub output_file: String,
    pub options: Options,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    pub remove_comments: bool,
    pub remove_empty_lines: bool,
    pub tree_full: bool,
    pub max_file_size_kb: u64,
    /// 0 = unlimited.
    pub max_total_tokens: u64,
    /// 0 = unlimited.
    pub max_file_tokens: u64,
    pub use_gitignore: bool,
    /// Divisor for the token heuristic; code averages ~3.2 chars per token.
    pub chars_per_token: f64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            remove_comments: false,
            remove_empty_lines: false,
            tree_full: false,
            max_file_size_kb: 2048,
            max_total_tokens: 0,
            max_file_tokens: 0,
            use_gitignore: true,
            chars_per_token: 3.2,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            include: vec!["**/*".to_string()],
            exclude: [
                "node_modules",
                ".git",
                "dist",
                "build",
                "out",
                "target",
                "vendor",
                "bin",
                ".next",
                ".nuxt",
                ".venv",
                "venv",
                ".env",
                ".env.*",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
            options: Options::default(),
        }
    }
}

impl Config {
    /// `include` is never empty at resolution time.
    pub fn effective_include(&self) -> Vec<String> {
        if self.include.is_empty() {
            vec!["**/*".to_string()]
        } else {
            self.include.clone()
        }
    }

    /// Merges CLI modifiers into the config. Returns true if anything
    /// changed and the file should be written back.
    pub fn apply_cli(&mut self, args: &Cli) -> bool {
        let mut modified = false;

        // 1. Presets
        let presets = load_presets();
        for name in &args.preset {
            match presets.get(name.as_str()) {
                Some(preset) => {
                    modified |= merge_unique(&mut self.include, &preset.include);
                    modified |= merge_unique(&mut self.exclude, &preset.exclude);
                }
                None => log::warn!("⚠️ Preset '{}' not found.", name),
            }
        }

        // 2. Excludes
        modified |= merge_unique(&mut self.exclude, &args.add_exclude);
        if !args.remove_exclude.is_empty() {
            let to_remove: HashSet<&str> = args.remove_exclude.iter().map(|s| s.as_str()).collect();
            let before = self.exclude.len();
            self.exclude.retain(|p| !to_remove.contains(p.as_str()));
            modified |= self.exclude.len() != before;
        }

        // 3. Includes / extensions
        if !args.add_ext.is_empty() {
            let extensions: Vec<&str> = args
                .add_ext
                .iter()
                .map(|e| e.trim_start_matches('.'))
                .collect();
            self.include.push(format!("**/*.{{{}}}", extensions.join(",")));
            modified = true;
        }
        modified |= merge_unique(&mut self.include, &args.include);

        // 4. Options
        if let Some(output) = &args.output {
            if *output != self.output_file {
                self.output_file = output.clone();
                modified = true;
            }
        }
        let opts = &mut self.options;
        modified |= set_if_changed(&mut opts.max_file_size_kb, args.max_size);
        modified |= set_if_changed(&mut opts.max_total_tokens, args.max_total_tokens);
        modified |= set_if_changed(&mut opts.max_file_tokens, args.max_file_tokens);
        modified |= set_if_changed(&mut opts.use_gitignore, args.use_gitignore);
        modified |= set_if_changed(&mut opts.remove_comments, args.remove_comments);
        modified |= set_if_changed(&mut opts.remove_empty_lines, args.remove_empty_lines);
        modified |= set_if_changed(&mut opts.tree_full, args.tree_full);

        modified
    }
}

fn set_if_changed<T: PartialEq + Copy>(target: &mut T, value: Option<T>) -> bool {
    match value {
        Some(v) if v != *target => {
            *target = v;
            true
        }
        _ => false,
    }
}

/// Append `source` items not already present, keeping order.
fn merge_unique(target: &mut Vec<String>, source: &[String]) -> bool {
    let mut changed = false;
    for item in source {
        if !target.contains(item) {
            target.push(item.clone());
            changed = true;
        }
    }
    changed
}

/// Loads the project config. `None` means missing or unparseable; the
/// caller falls back to defaults (ConfigurationFailure is never fatal).
pub fn load(root: &Path) -> Option<Config> {
    let path = root.join(CONFIG_FILE_NAME);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return None,
        Err(err) => {
            log::warn!("⚠️ Could not read {}: {}. Using defaults.", CONFIG_FILE_NAME, err);
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::warn!(
                "⚠️ Could not parse {}. Using defaults. Error: {}",
                CONFIG_FILE_NAME,
                err
            );
            None
        }
    }
}

/// Best-effort write-back; a failed save is logged, not fatal. Only the
/// output artifact write has a hard failure contract.
pub fn save(root: &Path, config: &Config) {
    let path = root.join(CONFIG_FILE_NAME);
    let serialized = match serde_json::to_string_pretty(config) {
        Ok(json) => json,
        Err(err) => {
            log::error!("❌ Error serializing configuration: {}", err);
            return;
        }
    };
    match fs::write(&path, serialized) {
        Ok(()) => log::info!("💾 Configuration updated in {}", CONFIG_FILE_NAME),
        Err(err) => log::error!("❌ Error saving configuration: {}", err),
    }
}

/// One built-in exclusion rule. Suppressible entries are dropped when a
/// user include pattern explicitly targets what they would hide; fixed
/// entries never are.
#[derive(Debug, Clone, Copy)]
pub struct DenyEntry {
    pub pattern: &'static str,
    pub suppressible: bool,
}

impl DenyEntry {
    const fn fixed(pattern: &'static str) -> Self {
        Self {
            pattern,
            suppressible: false,
        }
    }

    const fn soft(pattern: &'static str) -> Self {
        Self {
            pattern,
            suppressible: true,
        }
    }
}

/// Built-in denylist: common binary/artifact/secret file types that should
/// not end up in a context document unless explicitly requested.
pub const BUILTIN_EXCLUDES: &[DenyEntry] = &[
    // Mandatory: version control, dependency trees, OS metadata.
    DenyEntry::fixed(".git"),
    DenyEntry::fixed("node_modules"),
    DenyEntry::fixed(".DS_Store"),
    // Images
    DenyEntry::soft("*.png"),
    DenyEntry::soft("*.jpg"),
    DenyEntry::soft("*.jpeg"),
    DenyEntry::soft("*.gif"),
    DenyEntry::soft("*.ico"),
    DenyEntry::soft("*.svg"),
    DenyEntry::soft("*.webp"),
    DenyEntry::soft("*.tiff"),
    DenyEntry::soft("*.bmp"),
    DenyEntry::soft("*.heic"),
    // Media
    DenyEntry::soft("*.mp4"),
    DenyEntry::soft("*.mp3"),
    DenyEntry::soft("*.wav"),
    DenyEntry::soft("*.ogg"),
    DenyEntry::soft("*.webm"),
    DenyEntry::soft("*.mov"),
    DenyEntry::soft("*.avi"),
    DenyEntry::soft("*.mkv"),
    // Documents
    DenyEntry::soft("*.pdf"),
    DenyEntry::soft("*.doc"),
    DenyEntry::soft("*.docx"),
    DenyEntry::soft("*.xls"),
    DenyEntry::soft("*.xlsx"),
    DenyEntry::soft("*.ppt"),
    DenyEntry::soft("*.pptx"),
    // Archives
    DenyEntry::soft("*.zip"),
    DenyEntry::soft("*.tar"),
    DenyEntry::soft("*.gz"),
    DenyEntry::soft("*.7z"),
    DenyEntry::soft("*.rar"),
    DenyEntry::soft("*.jar"),
    // Executables and images
    DenyEntry::soft("*.exe"),
    DenyEntry::soft("*.dll"),
    DenyEntry::soft("*.so"),
    DenyEntry::soft("*.dylib"),
    DenyEntry::soft("*.bin"),
    DenyEntry::soft("*.iso"),
    DenyEntry::soft("*.img"),
    // Databases
    DenyEntry::soft("*.sqlite"),
    DenyEntry::soft("*.db"),
    DenyEntry::soft("*.db3"),
    // Fonts
    DenyEntry::soft("*.eot"),
    DenyEntry::soft("*.otf"),
    DenyEntry::soft("*.ttf"),
    DenyEntry::soft("*.woff"),
    DenyEntry::soft("*.woff2"),
    // OS / editor metadata
    DenyEntry::soft("Thumbs.db"),
    DenyEntry::soft(".idea"),
    DenyEntry::soft(".vscode"),
    DenyEntry::soft(".vs"),
    // Tooling dotfiles
    DenyEntry::soft(".gitignore"),
    DenyEntry::soft(".gitattributes"),
    DenyEntry::soft(".npmignore"),
    DenyEntry::soft(".dockerignore"),
    DenyEntry::soft(".editorconfig"),
    DenyEntry::soft(".eslint*"),
    DenyEntry::soft(".prettier*"),
    // Secrets
    DenyEntry::soft("*.pem"),
    DenyEntry::soft("*.key"),
    DenyEntry::soft("*.cert"),
    DenyEntry::soft("*.pfx"),
    DenyEntry::soft("*.p12"),
    DenyEntry::soft("id_rsa"),
    DenyEntry::soft("id_dsa"),
    // Caches
    DenyEntry::soft("__pycache__"),
    DenyEntry::soft("*.pyc"),
    DenyEntry::soft("*.pyo"),
    DenyEntry::soft("*.pyd"),
    DenyEntry::soft(".pytest_cache"),
    DenyEntry::soft(".cache"),
    DenyEntry::soft(".parcel-cache"),
    // Logs
    DenyEntry::soft("*.log"),
    DenyEntry::soft("npm-debug.log"),
    DenyEntry::soft("yarn-error.log"),
    DenyEntry::soft("pnpm-debug.log"),
    // Lockfiles
    DenyEntry::soft("package-lock.json"),
    DenyEntry::soft("yarn.lock"),
    DenyEntry::soft("pnpm-lock.yaml"),
    DenyEntry::soft("composer.lock"),
    DenyEntry::soft("Gemfile.lock"),
    DenyEntry::soft("Cargo.lock"),
    DenyEntry::soft("go.sum"),
    // The tool's own files
    DenyEntry::soft(CONFIG_FILE_NAME),
    DenyEntry::soft(DEFAULT_OUTPUT_FILE),
];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Preset {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Built-in presets, optionally extended/overridden by
/// `~/.config/ctxgen/presets.toml`.
pub fn load_presets() -> HashMap<String, Preset> {
    let mut presets = HashMap::new();
    presets.insert("nodejs".to_string(), Preset::default());
    presets.insert(
        "python".to_string(),
        Preset {
            include: Vec::new(),
            exclude: vec!["requirements.txt".to_string()],
        },
    );
    for (name, preset) in load_user_presets() {
        presets.insert(name, preset);
    }
    presets
}

fn load_user_presets() -> HashMap<String, Preset> {
    let Some(home) = dirs::home_dir() else {
        return HashMap::new();
    };
    let path = home.join(".config").join("ctxgen").join("presets.toml");
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return HashMap::new(),
    };
    match toml::from_str(&content) {
        Ok(presets) => presets,
        Err(err) => {
            log::warn!("⚠️ Could not parse {}: {}", path.display(), err);
            HashMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_include_is_never_empty() {
        let mut config = Config::default();
        config.include.clear();
        assert_eq!(config.effective_include(), vec!["**/*".to_string()]);
    }

    #[test]
    fn apply_cli_merges_and_dedups_excludes() {
        let mut config = Config::default();
        let args = Cli {
            add_exclude: vec!["dist".to_string(), "coverage".to_string()],
            ..Default::default()
        };
        assert!(config.apply_cli(&args));
        // "dist" was already there; only "coverage" is appended.
        assert_eq!(config.exclude.iter().filter(|p| *p == "dist").count(), 1);
        assert!(config.exclude.contains(&"coverage".to_string()));
    }

    #[test]
    fn apply_cli_builds_extension_group() {
        let mut config = Config::default();
        let args = Cli {
            add_ext: vec![".ts".to_string(), "rs".to_string()],
            ..Default::default()
        };
        assert!(config.apply_cli(&args));
        assert!(config.include.contains(&"**/*.{ts,rs}".to_string()));
    }

    #[test]
    fn apply_cli_without_modifiers_reports_unchanged() {
        let mut config = Config::default();
        assert!(!config.apply_cli(&Cli::default()));
    }

    #[test]
    fn apply_cli_option_flags() {
        let mut config = Config::default();
        let args = Cli {
            max_size: Some(512),
            use_gitignore: Some(false),
            tree_full: Some(true),
            ..Default::default()
        };
        assert!(config.apply_cli(&args));
        assert_eq!(config.options.max_file_size_kb, 512);
        assert!(!config.options.use_gitignore);
        assert!(config.options.tree_full);
    }

    #[test]
    fn malformed_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "{not json").unwrap();
        assert!(load(dir.path()).is_none());
    }

    #[test]
    fn config_round_trips_through_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.options.max_total_tokens = 9000;
        save(dir.path(), &config);
        let loaded = load(dir.path()).expect("config should load back");
        assert_eq!(loaded.options.max_total_tokens, 9000);
        assert_eq!(loaded.include, config.include);
    }
}

use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(
    author,
    version,
    about = "Generate a bounded Markdown context document for LLM consumption"
)]
pub struct Cli {
    /// Reset the configuration file to defaults before running
    #[arg(long)]
    pub reset: bool,

    /// Initialize/update the configuration file only, then exit
    #[arg(long)]
    pub init: bool,

    /// Apply named presets (e.g. nodejs, python)
    #[arg(long, short = 'p', num_args = 1..)]
    pub preset: Vec<String>,

    /// Add include patterns (e.g. 'src/**/*')
    #[arg(long, short = 'i', num_args = 1..)]
    pub include: Vec<String>,

    /// Add exclude patterns
    #[arg(long, short = 'a', num_args = 1..)]
    pub add_exclude: Vec<String>,

    /// Remove exclude patterns
    #[arg(long, short = 'r', num_args = 1..)]
    pub remove_exclude: Vec<String>,

    /// Add an extension include group (e.g. '.ts' '.rs')
    #[arg(long, num_args = 1..)]
    pub add_ext: Vec<String>,

    /// Output filename
    #[arg(long, short = 'o')]
    pub output: Option<String>,

    /// Max file size (KB)
    #[arg(long)]
    pub max_size: Option<u64>,

    /// Total token budget for the document (0 = unlimited)
    #[arg(long)]
    pub max_total_tokens: Option<u64>,

    /// Per-file token cap (0 = unlimited)
    #[arg(long)]
    pub max_file_tokens: Option<u64>,

    /// Respect .gitignore rules
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub use_gitignore: Option<bool>,

    /// Strip code comments to save tokens
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub remove_comments: Option<bool>,

    /// Remove empty vertical whitespace
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub remove_empty_lines: Option<bool>,

    /// Show the complete directory structure, including skipped files
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub tree_full: Option<bool>,
}

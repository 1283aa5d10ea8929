//! CLI output formatting.
//!
//! Human-readable text by default; with `--json` every command prints one
//! JSON document on stdout instead. Errors always go to stderr.

use std::fmt::Display;
use std::sync::OnceLock;

use parking_lot::RwLock;
use serde_json::json;

/// Runtime output configuration shared by CLI handlers.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Emit machine-readable JSON output instead of text.
    pub json: bool,
    /// Suppress non-essential output.
    pub quiet: bool,
}

impl OutputConfig {
    #[must_use]
    pub const fn new(json: bool, quiet: bool) -> Self {
        Self { json, quiet }
    }
}

static OUTPUT_CONFIG: OnceLock<RwLock<OutputConfig>> = OnceLock::new();

fn config_cell() -> &'static RwLock<OutputConfig> {
    OUTPUT_CONFIG.get_or_init(|| RwLock::new(OutputConfig::default()))
}

fn read_config() -> OutputConfig {
    *config_cell().read()
}

/// Text output is suppressed in quiet mode; JSON never is.
fn text_suppressed(config: OutputConfig) -> bool {
    config.json || config.quiet
}

/// Apply output settings from global CLI flags.
pub fn configure(config: OutputConfig) {
    *config_cell().write() = config;
}

#[must_use]
pub fn is_json() -> bool {
    read_config().json
}

#[must_use]
pub fn is_quiet() -> bool {
    read_config().quiet
}

/// Print a section header.
pub fn section(title: &str) {
    if text_suppressed(read_config()) {
        return;
    }
    println!();
    println!("{title}");
}

/// Print a labelled value.
pub fn field(label: &str, value: impl Display) {
    if text_suppressed(read_config()) {
        return;
    }
    println!("  {label:<18} {value}");
}

/// Print a success line.
pub fn success(message: &str) {
    if text_suppressed(read_config()) {
        return;
    }
    println!("  ✓ {message}");
}

pub fn warning(message: &str) {
    if text_suppressed(read_config()) {
        return;
    }
    println!("  ! {message}");
}

/// Print an error line. JSON mode emits an error document on stderr.
pub fn error(message: &str) {
    if read_config().json {
        eprintln!("{}", json!({ "error": message }));
        return;
    }
    eprintln!("  × {message}");
}

/// Print pre-formatted content (a table, a script), indented.
pub fn lines(content: &str) {
    if text_suppressed(read_config()) {
        return;
    }
    for line in content.lines() {
        println!("  {line}");
    }
}

/// Print a JSON document.
pub fn json_output(value: serde_json::Value) {
    println!("{value}");
}

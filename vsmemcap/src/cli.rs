use clap::Parser;
use clap::builder::NonEmptyStringValueParser;
use std::path::PathBuf;

use crate::DEFAULT_MAX_OLD_SPACE_SIZE;

/// Value given to `--set-max-old-space-size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapSize {
    /// Bare flag or `--set-max-old-space-size=`.
    Missing,
    Megabytes(u64),
}

fn parse_heap_size(input: &str) -> Result<HeapSize, String> {
    let s = input.trim();
    if s.is_empty() {
        return Ok(HeapSize::Missing);
    }

    match s.parse::<u64>() {
        Ok(0) => Err("heap size must be at least 1 MB".to_string()),
        Ok(mb) => Ok(HeapSize::Megabytes(mb)),
        Err(_) => Err(format!("invalid heap size '{s}' (expected megabytes, e.g. 4096)")),
    }
}

fn missing_value_warning() -> String {
    let default = DEFAULT_MAX_OLD_SPACE_SIZE;
    format!("warning: --set-max-old-space-size given without a value, using default {default}")
}

#[derive(Debug, Parser)]
#[command(
    name = "vsmemcap",
    version,
    about = "Inspect and cap the Node.js heap of a local VS Code remote server",
    long_about = "vsmemcap inspects the newest VS Code remote server installation under ~/.vscode-server/cli/servers/Stable-* and reports the memory counters of its running node processes together with this shell's virtual memory ceiling (ulimit -v).\n\nWith --set-max-old-space-size it patches the last line of server/bin/code-server so node starts with --max-old-space-size=<MB>, which bounds the V8 heap and with it the virtual memory node reserves. Patching is idempotent: re-applying the same value does not touch the file.",
    after_help = "Examples:\n  vsmemcap\n  vsmemcap --set-max-old-space-size\n  vsmemcap --set-max-old-space-size=4096 --quiet\n  vsmemcap --vscode-dir ~/.vscode-server/cli/servers/Stable-abc123 --debug"
)]
pub struct Cli {
    /// Patch code-server so node starts with --max-old-space-size=MB (defaults to 8192)
    #[arg(
        long = "set-max-old-space-size",
        value_name = "MB",
        num_args = 0..=1,
        default_missing_value = "",
        value_parser = parse_heap_size
    )]
    pub set_max_old_space_size: Option<HeapSize>,

    /// Runtime binary name used to match running server processes
    #[arg(
        long,
        value_name = "NAME",
        env = "VSMEMCAP_NODEAPP",
        default_value = "node",
        value_parser = NonEmptyStringValueParser::new()
    )]
    pub nodeapp: String,

    /// Use this installation directory instead of the newest Stable-* one
    #[arg(long = "vscode-dir", value_name = "DIR", env = "VSMEMCAP_VSCODE_DIR")]
    pub vscode_dir: Option<PathBuf>,

    /// Suppress all non-error output
    #[arg(long)]
    pub quiet: bool,

    /// Print internal diagnostics (paths, derived identifiers) to stderr
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Parse-time diagnostics. They are shown even with `--quiet`.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.set_max_old_space_size == Some(HeapSize::Missing) {
            out.push(missing_value_warning());
        }
        out
    }

    #[must_use]
    pub fn into_config(self) -> Config {
        let (apply_patch, max_old_space_size) = match self.set_max_old_space_size {
            Some(HeapSize::Megabytes(mb)) => (true, mb),
            Some(HeapSize::Missing) => (true, DEFAULT_MAX_OLD_SPACE_SIZE),
            None => (false, DEFAULT_MAX_OLD_SPACE_SIZE),
        };

        Config {
            max_old_space_size,
            apply_patch,
            nodeapp: self.nodeapp,
            vscode_dir: self.vscode_dir,
            quiet: self.quiet,
            debug: self.debug,
        }
    }
}

/// Run parameters, built once per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Heap cap in megabytes.
    pub max_old_space_size: u64,
    pub apply_patch: bool,
    pub nodeapp: String,
    pub vscode_dir: Option<PathBuf>,
    pub quiet: bool,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_old_space_size: DEFAULT_MAX_OLD_SPACE_SIZE,
            apply_patch: false,
            nodeapp: "node".to_string(),
            vscode_dir: None,
            quiet: false,
            debug: false,
        }
    }
}

use std::io;
use std::path::PathBuf;

use crate::exit_codes::ExitCode;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not determine the home directory")]
    NoHomeDir,

    #[error("no VS Code server installation found under {}", .servers_dir.display())]
    NoInstallation { servers_dir: PathBuf },

    #[error("code-server script not found: {}", .path.display())]
    ScriptMissing { path: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("runtime invocation {token} not found on the last line of {}", .path.display())]
    RuntimeTokenMissing { path: PathBuf, token: String },

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl Error {
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::NoHomeDir
            | Self::NoInstallation { .. }
            | Self::ScriptMissing { .. }
            | Self::Read { .. }
            | Self::Write { .. }
            | Self::RuntimeTokenMissing { .. }
            | Self::Output(_) => ExitCode::Failure,
        }
    }
}

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::cli::Config;
use crate::{Error, Result};

/// Where the VS Code CLI unpacks server builds, relative to the home directory.
pub const SERVERS_DIR: &str = ".vscode-server/cli/servers";

/// Name prefix of stable-channel server builds.
pub const INSTALL_PREFIX: &str = "Stable-";

/// Launcher script, relative to an installation directory.
pub const SCRIPT_PATH: &str = "server/bin/code-server";

/// One deployed copy of the remote server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    pub dir: PathBuf,
    pub script: PathBuf,
    /// Base name of `dir`; running server processes carry it in their command line.
    pub id: String,
}

impl Installation {
    pub fn from_dir(dir: PathBuf) -> Result<Self> {
        let script = dir.join(SCRIPT_PATH);
        if !script.is_file() {
            return Err(Error::ScriptMissing { path: script });
        }

        let id = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self { dir, script, id })
    }
}

/// Resolves the installation to operate on: the override verbatim, or the newest
/// `Stable-*` build under the home directory.
pub fn locate(config: &Config) -> Result<Installation> {
    let dir = match &config.vscode_dir {
        Some(dir) => {
            debug!(dir = %dir.display(), "using installation override");
            dir.clone()
        }
        None => newest_installation(&default_servers_dir()?)?,
    };

    let installation = Installation::from_dir(dir)?;
    debug!(
        dir = %installation.dir.display(),
        script = %installation.script.display(),
        id = %installation.id,
        "resolved installation"
    );
    Ok(installation)
}

pub fn default_servers_dir() -> Result<PathBuf> {
    let dirs = directories::BaseDirs::new().ok_or(Error::NoHomeDir)?;
    Ok(dirs.home_dir().join(SERVERS_DIR))
}

/// Most recently modified `Stable-*` directory under `servers_dir`. Equal
/// modification times are broken by name, highest first.
pub fn newest_installation(servers_dir: &Path) -> Result<PathBuf> {
    let not_found = || Error::NoInstallation {
        servers_dir: servers_dir.to_path_buf(),
    };

    let pattern = format!(
        "{}/{INSTALL_PREFIX}*",
        glob::Pattern::escape(&servers_dir.to_string_lossy())
    );
    debug!(%pattern, "searching for installations");

    let entries = glob::glob(&pattern).map_err(|_| not_found())?;

    entries
        .filter_map(std::result::Result::ok)
        .filter(|path| path.is_dir())
        .map(|path| (modified(&path), path))
        .max_by(|(a_time, a_path), (b_time, b_path)| {
            a_time.cmp(b_time).then_with(|| a_path.cmp(b_path))
        })
        .map(|(_, path)| path)
        .ok_or_else(not_found)
}

fn modified(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;

    fn make_install(root: &Path, name: &str, age: Duration) -> anyhow::Result<PathBuf> {
        let dir = root.join(name);
        fs::create_dir_all(dir.join("server/bin"))?;
        fs::write(dir.join(SCRIPT_PATH), "#!/usr/bin/env sh\n")?;

        let mtime = SystemTime::now() - age;
        File::open(&dir)?.set_modified(mtime)?;
        Ok(dir)
    }

    #[test]
    fn picks_most_recently_modified_install() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        // Name order and mtime order disagree on purpose.
        make_install(tmp.path(), "Stable-xyz", Duration::from_secs(60))?;
        make_install(tmp.path(), "Stable-abc", Duration::from_secs(3600))?;
        let newest = make_install(tmp.path(), "Stable-aaa", Duration::from_secs(1))?;

        assert_eq!(newest_installation(tmp.path())?, newest);
        Ok(())
    }

    #[test]
    fn ignores_non_matching_names_and_plain_files() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let stable = make_install(tmp.path(), "Stable-abc", Duration::from_secs(3600))?;
        make_install(tmp.path(), "Insiders-new", Duration::from_secs(1))?;
        fs::write(tmp.path().join("Stable-file"), "")?;

        assert_eq!(newest_installation(tmp.path())?, stable);
        Ok(())
    }

    #[test]
    fn empty_or_missing_base_is_not_found() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        assert!(matches!(
            newest_installation(tmp.path()),
            Err(Error::NoInstallation { .. })
        ));
        assert!(matches!(
            newest_installation(&tmp.path().join("missing")),
            Err(Error::NoInstallation { .. })
        ));
        Ok(())
    }

    #[test]
    fn override_is_used_verbatim() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        make_install(tmp.path(), "Stable-newer", Duration::from_secs(1))?;
        let chosen = make_install(tmp.path(), "custom-build", Duration::from_secs(3600))?;

        let config = Config {
            vscode_dir: Some(chosen.clone()),
            ..Config::default()
        };
        let installation = locate(&config)?;

        assert_eq!(installation.dir, chosen);
        assert_eq!(installation.script, chosen.join("server/bin/code-server"));
        assert_eq!(installation.id, "custom-build");
        Ok(())
    }

    #[test]
    fn missing_script_is_reported() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let dir = tmp.path().join("Stable-empty");
        fs::create_dir_all(&dir)?;

        match Installation::from_dir(dir.clone()) {
            Err(Error::ScriptMissing { path }) => assert_eq!(path, dir.join(SCRIPT_PATH)),
            other => panic!("expected ScriptMissing, got {other:?}"),
        }
        Ok(())
    }
}

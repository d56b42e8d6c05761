use std::io::{self, Write};

use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cli::Config;
use crate::exit_codes::ExitCode;
use crate::inspect::sample_processes;
use crate::limit::report_limit;
use crate::locate::locate;
use crate::os::OsFacts;
use crate::report::{StatusReport, write_patch_outcome, write_status};
use crate::{Result, patch};

/// Diagnostics go to stderr. `--debug` turns on this crate's debug events, and
/// `RUST_LOG` replaces that filter when set.
pub fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vsmemcap=debug"))
    } else {
        EnvFilter::new("warn")
    };

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(filter)
        .try_init();
}

/// Locates the installation, then either patches its launcher or writes the
/// status report to `out`.
pub fn run(config: &Config, os: &impl OsFacts, out: &mut impl Write) -> Result<ExitCode> {
    debug!(?config, "starting");
    let installation = locate(config)?;

    if config.apply_patch {
        let outcome = patch::apply(&installation.script, config.max_old_space_size)?;
        if !config.quiet {
            write_patch_outcome(out, &installation.script, outcome)?;
        }
        return Ok(ExitCode::Success);
    }

    let patch_state = patch::inspect(&installation.script)?;
    let samples = sample_processes(os, &installation.id, &config.nodeapp);
    let limit = report_limit(os);
    debug!(?patch_state, samples = samples.len(), ?limit, "status collected");

    if !config.quiet {
        write_status(
            out,
            &StatusReport {
                installation: &installation,
                nodeapp: &config.nodeapp,
                patch: patch_state,
                samples: &samples,
                limit,
            },
        )?;
    }
    Ok(ExitCode::Success)
}

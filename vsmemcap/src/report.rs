use std::io::{self, Write};
use std::path::Path;

use crate::DEFAULT_MAX_OLD_SPACE_SIZE;
use crate::inspect::ProcessSample;
use crate::limit::LimitReport;
use crate::locate::Installation;
use crate::patch::{FLAG, PatchOutcome, PatchState};

const GLOSSARY: &str = "\
VmPeak: peak virtual memory size (largest address space the process ever reserved)
VmSize: current virtual memory size (address space reserved right now)
VmHWM:  peak resident set size (\"high water mark\" of physical memory in use)
VmRSS:  current resident set size (physical memory in use right now)";

/// Everything the status mode prints.
#[derive(Debug)]
pub struct StatusReport<'a> {
    pub installation: &'a Installation,
    pub nodeapp: &'a str,
    pub patch: PatchState,
    pub samples: &'a [ProcessSample],
    pub limit: LimitReport,
}

pub fn write_status(out: &mut impl Write, report: &StatusReport<'_>) -> io::Result<()> {
    writeln!(out, "Script: {}", report.installation.script.display())?;
    match report.patch {
        PatchState::Present(mb) => writeln!(out, "{FLAG}: {mb} MB")?,
        PatchState::Absent => writeln!(out, "{FLAG}: not set")?,
    }
    writeln!(out)?;

    write_process_table(out, report)?;
    writeln!(out)?;

    writeln!(out, "Max virtual memory (ulimit -v): {}", report.limit)?;
    writeln!(out)?;

    writeln!(out, "{GLOSSARY}")?;
    writeln!(out)?;

    writeln!(
        out,
        "To cap the heap, run: vsmemcap --set-max-old-space-size={DEFAULT_MAX_OLD_SPACE_SIZE}"
    )?;
    Ok(())
}

fn write_process_table(out: &mut impl Write, report: &StatusReport<'_>) -> io::Result<()> {
    if report.samples.is_empty() {
        return writeln!(
            out,
            "No running {} processes found for {}",
            report.nodeapp, report.installation.id
        );
    }

    writeln!(
        out,
        "{:>8} {:>10} {:>10} {:>10} {:>10}",
        "PID", "VmPeak", "VmSize", "VmHWM", "VmRSS"
    )?;
    for sample in report.samples {
        writeln!(
            out,
            "{:>8} {:>10} {:>10} {:>10} {:>10}",
            sample.pid,
            mb(sample.vm_peak_mb()),
            mb(sample.vm_size_mb()),
            mb(sample.vm_hwm_mb()),
            mb(sample.vm_rss_mb()),
        )?;
    }
    Ok(())
}

fn mb(value: u64) -> String {
    format!("{value} MB")
}

pub fn write_patch_outcome(
    out: &mut impl Write,
    script: &Path,
    outcome: PatchOutcome,
) -> io::Result<()> {
    match outcome {
        PatchOutcome::AlreadySet(value) => writeln!(
            out,
            "No update needed, {FLAG} is already set to {value} in {}",
            script.display()
        ),
        PatchOutcome::Inserted(value) => writeln!(
            out,
            "Updated {}: inserted {FLAG}={value}",
            script.display()
        ),
        PatchOutcome::Changed { from, to } => writeln!(
            out,
            "Updated {}: {FLAG} changed from {from} to {to}",
            script.display()
        ),
    }
}

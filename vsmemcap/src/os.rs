//! The few operating-system facts the status report needs, behind a trait so the
//! inspector and the limit reporter can run against fakes.

use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;

use sysinfo::{ProcessRefreshKind, RefreshKind, System, UpdateKind};

/// A running process and the command line it was started with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub command_line: String,
}

/// Memory counters from `/proc/<pid>/status`, in kilobytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryCounters {
    pub vm_peak_kb: u64,
    pub vm_size_kb: u64,
    pub vm_hwm_kb: u64,
    pub vm_rss_kb: u64,
}

/// Virtual address space ceiling (`RLIMIT_AS`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmLimit {
    Unlimited,
    Kilobytes(u64),
}

pub trait OsFacts {
    /// Processes whose command line contains `pattern`, in pid order.
    fn list_processes(&self, pattern: &str) -> Vec<ProcessEntry>;

    /// `None` when the process is gone or its status is unreadable.
    fn read_memory_counters(&self, pid: u32) -> Option<MemoryCounters>;

    /// Soft limit of the current process.
    fn virtual_memory_limit(&self) -> VmLimit;
}

/// The machine this binary runs on.
#[derive(Debug, Clone)]
pub struct HostOs {
    proc_root: PathBuf,
}

impl Default for HostOs {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
        }
    }
}

impl HostOs {
    /// Reads status files from `root/<pid>/status` instead of `/proc`.
    #[must_use]
    pub fn with_proc_root(root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: root.into(),
        }
    }
}

impl OsFacts for HostOs {
    fn list_processes(&self, pattern: &str) -> Vec<ProcessEntry> {
        let refresh = ProcessRefreshKind::nothing()
            .with_cmd(UpdateKind::OnlyIfNotSet)
            .with_exe(UpdateKind::OnlyIfNotSet);
        let sys = System::new_with_specifics(RefreshKind::nothing().with_processes(refresh));

        let mut out: Vec<ProcessEntry> = sys
            .processes()
            .iter()
            // sysinfo lists Linux threads as processes too; `ps` does not.
            .filter(|(_, process)| process.thread_kind().is_none())
            .filter_map(|(pid, process)| {
                let command_line = if process.cmd().is_empty() {
                    process
                        .exe()
                        .map(|exe| exe.to_string_lossy().into_owned())
                        .unwrap_or_default()
                } else {
                    join_args(process.cmd())
                };

                command_line.contains(pattern).then(|| ProcessEntry {
                    pid: pid.as_u32(),
                    command_line,
                })
            })
            .collect();

        // sysinfo hands processes back in hash order; list them the way `ps` does.
        out.sort_by_key(|entry| entry.pid);
        out
    }

    fn read_memory_counters(&self, pid: u32) -> Option<MemoryCounters> {
        let path = self.proc_root.join(pid.to_string()).join("status");
        let status = fs::read_to_string(path).ok()?;
        parse_status(&status)
    }

    fn virtual_memory_limit(&self) -> VmLimit {
        current_vm_limit()
    }
}

fn join_args(args: &[impl AsRef<OsStr>]) -> String {
    args.iter()
        .map(|arg| arg.as_ref().to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Picks `VmPeak`, `VmSize`, `VmHWM` and `VmRSS` out of a status file. Kernel
/// threads have none of them and yield `None`.
pub fn parse_status(status: &str) -> Option<MemoryCounters> {
    let mut counters = MemoryCounters::default();
    let mut seen = 0u8;

    for line in status.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let slot = match key {
            "VmPeak" => &mut counters.vm_peak_kb,
            "VmSize" => &mut counters.vm_size_kb,
            "VmHWM" => &mut counters.vm_hwm_kb,
            "VmRSS" => &mut counters.vm_rss_kb,
            _ => continue,
        };
        // e.g. "VmRSS:\t   94 kB"
        *slot = rest.split_whitespace().next()?.parse().ok()?;
        seen += 1;
    }

    (seen == 4).then_some(counters)
}

#[cfg(unix)]
fn current_vm_limit() -> VmLimit {
    let mut limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: `limit` is a valid, writable rlimit for the duration of the call.
    let rc = unsafe { libc::getrlimit(libc::RLIMIT_AS, &mut limit) };
    if rc != 0 || limit.rlim_cur == libc::RLIM_INFINITY {
        return VmLimit::Unlimited;
    }
    VmLimit::Kilobytes(u64::from(limit.rlim_cur) / 1024)
}

#[cfg(not(unix))]
fn current_vm_limit() -> VmLimit {
    VmLimit::Unlimited
}

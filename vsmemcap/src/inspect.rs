use tracing::debug;

use crate::os::{MemoryCounters, OsFacts};

/// One running server process and its memory counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessSample {
    pub pid: u32,
    pub counters: MemoryCounters,
}

impl ProcessSample {
    #[must_use]
    pub fn vm_peak_mb(&self) -> u64 {
        self.counters.vm_peak_kb / 1024
    }

    #[must_use]
    pub fn vm_size_mb(&self) -> u64 {
        self.counters.vm_size_kb / 1024
    }

    #[must_use]
    pub fn vm_hwm_mb(&self) -> u64 {
        self.counters.vm_hwm_kb / 1024
    }

    #[must_use]
    pub fn vm_rss_mb(&self) -> u64 {
        self.counters.vm_rss_kb / 1024
    }
}

/// Command-line fragment that identifies the runtime of an installation.
#[must_use]
pub fn match_pattern(installation_id: &str, nodeapp: &str) -> String {
    format!("{installation_id}/server/{nodeapp}")
}

/// Samples every process started from the installation's runtime binary. Processes
/// that exit between listing and reading are left out.
pub fn sample_processes(
    os: &impl OsFacts,
    installation_id: &str,
    nodeapp: &str,
) -> Vec<ProcessSample> {
    let pattern = match_pattern(installation_id, nodeapp);
    let own_pid = std::process::id();

    os.list_processes(&pattern)
        .into_iter()
        .filter(|entry| entry.pid != own_pid)
        .filter_map(|entry| match os.read_memory_counters(entry.pid) {
            Some(counters) => {
                debug!(pid = entry.pid, command = %entry.command_line, "matched process");
                Some(ProcessSample {
                    pid: entry.pid,
                    counters,
                })
            }
            None => {
                debug!(pid = entry.pid, "process vanished before its status was read");
                None
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashMap;

    use crate::os::{MemoryCounters, OsFacts, ProcessEntry, VmLimit};

    #[derive(Debug, Default)]
    pub(crate) struct FakeOs {
        pub(crate) processes: Vec<ProcessEntry>,
        pub(crate) counters: HashMap<u32, MemoryCounters>,
        pub(crate) limit: Option<VmLimit>,
    }

    impl FakeOs {
        pub(crate) fn with_process(
            mut self,
            pid: u32,
            command_line: &str,
            counters: Option<MemoryCounters>,
        ) -> Self {
            self.processes.push(ProcessEntry {
                pid,
                command_line: command_line.to_string(),
            });
            if let Some(counters) = counters {
                self.counters.insert(pid, counters);
            }
            self
        }
    }

    impl OsFacts for FakeOs {
        fn list_processes(&self, pattern: &str) -> Vec<ProcessEntry> {
            self.processes
                .iter()
                .filter(|p| p.command_line.contains(pattern))
                .cloned()
                .collect()
        }

        fn read_memory_counters(&self, pid: u32) -> Option<MemoryCounters> {
            self.counters.get(&pid).copied()
        }

        fn virtual_memory_limit(&self) -> VmLimit {
            self.limit.unwrap_or(VmLimit::Unlimited)
        }
    }
}

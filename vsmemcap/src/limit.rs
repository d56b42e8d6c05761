use std::fmt;

use crate::os::{OsFacts, VmLimit};

/// This process' virtual memory ceiling, as `ulimit -v` would show it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitReport {
    Unlimited,
    Megabytes(u64),
}

impl fmt::Display for LimitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlimited => f.write_str("unlimited"),
            Self::Megabytes(mb) => write!(f, "{mb} MB"),
        }
    }
}

#[must_use]
pub fn report_limit(os: &impl OsFacts) -> LimitReport {
    match os.virtual_memory_limit() {
        VmLimit::Unlimited => LimitReport::Unlimited,
        VmLimit::Kilobytes(kb) => LimitReport::Megabytes(kb / 1024),
    }
}

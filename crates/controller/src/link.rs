//! Network link state. Remote operations are skipped while the link is down.

use std::fs;
use std::path::PathBuf;

pub trait LinkMonitor {
    fn is_connected(&mut self) -> bool;
}

/// Reads `/sys/class/net/<iface>/operstate`; the link is up only when the
/// kernel reports `up`.
pub struct InterfaceLink {
    operstate: PathBuf,
}

impl InterfaceLink {
    pub fn new(interface: &str) -> Self {
        Self::at(PathBuf::from(format!("/sys/class/net/{interface}/operstate")))
    }

    fn at(operstate: PathBuf) -> Self {
        Self { operstate }
    }
}

impl LinkMonitor for InterfaceLink {
    fn is_connected(&mut self) -> bool {
        match fs::read_to_string(&self.operstate) {
            Ok(s) => s.trim() == "up",
            Err(e) => {
                tracing::debug!(path = %self.operstate.display(), "operstate unreadable: {e}");
                false
            }
        }
    }
}

/// Used when no interface is configured: connectivity is left to the
/// transport to discover.
pub struct AlwaysUp;

impl LinkMonitor for AlwaysUp {
    fn is_connected(&mut self) -> bool {
        true
    }
}

impl<L: LinkMonitor + ?Sized> LinkMonitor for Box<L> {
    fn is_connected(&mut self) -> bool {
        (**self).is_connected()
    }
}

use serde::Serialize;
use std::cmp::Reverse;
use std::fmt;

use crate::types::GuestDescriptor;

/// Guests in the order they will be powered off
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ShutdownPlan {
    guests: Vec<GuestDescriptor>,
}

/// Order descriptors by priority, highest first.
///
/// The sort is stable: guests with equal priority keep their collection order.
pub fn build_plan(mut descriptors: Vec<GuestDescriptor>) -> ShutdownPlan {
    descriptors.sort_by_key(|guest| Reverse(guest.priority));
    ShutdownPlan {
        guests: descriptors,
    }
}

impl ShutdownPlan {
    pub fn guests(&self) -> &[GuestDescriptor] {
        &self.guests
    }

    pub fn len(&self) -> usize {
        self.guests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guests.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GuestDescriptor> {
        self.guests.iter()
    }
}

impl<'a> IntoIterator for &'a ShutdownPlan {
    type Item = &'a GuestDescriptor;
    type IntoIter = std::slice::Iter<'a, GuestDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.guests.iter()
    }
}

impl fmt::Display for ShutdownPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<6} {:>8} {:<5} {:>10} {:<9} {:>8}  NAME",
            "STEP", "PRIORITY", "KIND", "VMID", "METHOD", "TIMEOUT"
        )?;
        for (step, guest) in self.guests.iter().enumerate() {
            writeln!(
                f,
                "{:<6} {:>8} {:<5} {:>10} {:<9} {:>7}s  {}",
                step + 1,
                guest.priority,
                guest.kind.as_str(),
                guest.vmid,
                guest.method.as_str(),
                guest.timeout_secs,
                guest.name.as_deref().unwrap_or("-"),
            )?;
        }
        Ok(())
    }
}

//! Shutdown policy resolution
//!
//! A guest's policy lives in two free-form config fields:
//!
//! - `tags`: `;`-separated. A tag `off-method_<method>` selects the shutdown method.
//! - `startup`: `,`-separated `key=value` pairs. `order=` is the priority and
//!   `down=` the graceful shutdown timeout in seconds.
//!
//! Tags and components are matched as written, without trimming, so ` order=3`
//! is not an `order` component. Numeric values may carry surrounding
//! whitespace. When a prefix occurs more than once, the first occurrence in
//! raw order wins and later ones are ignored, even if the first is unusable.

use std::num::NonZeroU64;
use tracing::{debug, warn};

use crate::config::ShutdownConfig;
use crate::error::{PveoffError, PveoffResult};
use crate::types::{GuestConfig, GuestDescriptor, GuestKind, InventoryEntry, ShutdownMethod};

pub const OFF_METHOD_TAG_PREFIX: &str = "off-method_";
pub const ORDER_KEY: &str = "order";
pub const DOWN_KEY: &str = "down";

/// Method name carried by the first `off-method_` tag, if any
pub fn off_method_tag(tags: &str) -> Option<&str> {
    tags.split(';')
        .find_map(|tag| tag.strip_prefix(OFF_METHOD_TAG_PREFIX))
}

/// Typed view of the `startup` field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartupSpec {
    pub order: Option<i64>,
    pub down: Option<u64>,
}

impl StartupSpec {
    /// Parse a `startup` value. Components other than `order` and `down` are
    /// skipped; a non-numeric value on the first matching component is an error.
    pub fn parse(raw: &str) -> PveoffResult<Self> {
        let mut order = None;
        let mut down = None;

        for component in raw.split(',') {
            let Some((key, value)) = component.split_once('=') else {
                continue;
            };
            match key {
                ORDER_KEY if order.is_none() => order = Some(value),
                DOWN_KEY if down.is_none() => down = Some(value),
                _ => {}
            }
        }

        Ok(Self {
            order: order.map(|v| parse_field(ORDER_KEY, v)).transpose()?,
            down: down.map(|v| parse_field(DOWN_KEY, v)).transpose()?,
        })
    }
}

fn parse_field<T: std::str::FromStr>(field: &str, value: &str) -> PveoffResult<T> {
    value.trim().parse().map_err(|_| PveoffError::InvalidPolicy {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Method, priority and timeout resolved for one guest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPolicy {
    pub method: ShutdownMethod,
    pub priority: i64,
    pub timeout_secs: NonZeroU64,
}

/// Applies per-guest config on top of the run's defaults
#[derive(Debug, Clone)]
pub struct PolicyResolver {
    config: ShutdownConfig,
}

impl PolicyResolver {
    pub fn new(config: ShutdownConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ShutdownConfig {
        &self.config
    }

    /// Resolve the policy of a guest of `kind` from its raw config.
    ///
    /// Unknown or inapplicable methods fall back to the configured default.
    /// Malformed `order=`/`down=` values are returned as errors.
    pub fn resolve(&self, config: &GuestConfig, kind: GuestKind) -> PveoffResult<ResolvedPolicy> {
        let method = self.resolve_method(config.tags.as_deref(), kind);

        let startup = match config.startup.as_deref() {
            Some(raw) => StartupSpec::parse(raw)?,
            None => StartupSpec::default(),
        };

        let timeout_secs = startup
            .down
            .and_then(NonZeroU64::new)
            .unwrap_or_else(|| self.config.default_timeout_secs());

        Ok(ResolvedPolicy {
            method,
            priority: startup.order.unwrap_or(0),
            timeout_secs,
        })
    }

    fn resolve_method(&self, tags: Option<&str>, kind: GuestKind) -> ShutdownMethod {
        let default = self.config.default_method;
        let Some(candidate) = tags.and_then(off_method_tag) else {
            return default;
        };

        match candidate.parse::<ShutdownMethod>() {
            Ok(method) if kind.supports(method) => method,
            _ => {
                warn!(
                    "Unknown off method of {}: '{}', using default: {}",
                    kind, candidate, default
                );
                default
            }
        }
    }

    /// Resolve one collected guest into a plan entry
    pub fn describe(&self, entry: &InventoryEntry) -> PveoffResult<GuestDescriptor> {
        let policy = self
            .resolve(&entry.config, entry.kind)
            .map_err(|e| e.for_guest(entry.kind, entry.vmid))?;

        debug!(
            kind = %entry.kind,
            vmid = entry.vmid,
            method = %policy.method,
            priority = policy.priority,
            timeout_secs = policy.timeout_secs.get(),
            "Resolved shutdown policy"
        );

        Ok(GuestDescriptor {
            vmid: entry.vmid,
            kind: entry.kind,
            name: entry.config.display_name().map(str::to_string),
            method: policy.method,
            priority: policy.priority,
            timeout_secs: policy.timeout_secs,
        })
    }

    /// Resolve every collected guest, keeping collection order
    pub fn describe_all(&self, entries: &[InventoryEntry]) -> PveoffResult<Vec<GuestDescriptor>> {
        entries.iter().map(|entry| self.describe(entry)).collect()
    }
}

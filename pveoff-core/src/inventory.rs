use tracing::{debug, info};

use crate::backend::GuestBackend;
use crate::error::PveoffResult;
use crate::types::{GuestKind, InventoryEntry};

/// Collect every guest on `node` together with its raw config.
///
/// Qemu guests come first, then containers, each in the order the backend
/// lists them. Any failure aborts collection: a partial inventory would
/// produce a plan that cannot be trusted.
pub async fn collect_inventory(
    backend: &dyn GuestBackend,
    node: &str,
) -> PveoffResult<Vec<InventoryEntry>> {
    backend.node_status(node).await?;

    let mut entries = Vec::new();
    for kind in GuestKind::ALL {
        let guests = backend.list_guests(node, kind).await?;
        debug!("Found {} {} guest(s) on node {}", guests.len(), kind, node);

        for guest in guests {
            let config = backend.guest_config(node, kind, guest.vmid).await?;
            entries.push(InventoryEntry {
                vmid: guest.vmid,
                kind,
                config,
            });
        }
    }

    info!("Collected {} guest(s) on node {}", entries.len(), node);
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{BackendCall, MockBackend, MockGuest};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn qemu_before_lxc_in_listing_order() {
        let backend = MockBackend::new()
            .with_guest(MockGuest::lxc(300))
            .with_guest(MockGuest::qemu(102))
            .with_guest(MockGuest::lxc(200))
            .with_guest(MockGuest::qemu(101));

        let entries = collect_inventory(&backend, "pve1").await.unwrap();
        let ids: Vec<(GuestKind, u32)> = entries.iter().map(|e| (e.kind, e.vmid)).collect();

        assert_eq!(
            ids,
            vec![
                (GuestKind::Qemu, 102),
                (GuestKind::Qemu, 101),
                (GuestKind::Lxc, 300),
                (GuestKind::Lxc, 200),
            ]
        );
        assert_eq!(backend.calls()[0], BackendCall::NodeStatus);
    }

    #[tokio::test]
    async fn config_failure_is_fatal() {
        let backend = MockBackend::new()
            .with_guest(MockGuest::qemu(100).fail_config())
            .with_guest(MockGuest::lxc(200));

        assert!(collect_inventory(&backend, "pve1").await.is_err());
        assert!(!backend
            .calls()
            .contains(&BackendCall::ListGuests { kind: GuestKind::Lxc }));
    }

    #[tokio::test]
    async fn unknown_node_fails_before_listing() {
        let backend = MockBackend::new().fail_node_status();

        assert!(collect_inventory(&backend, "nope").await.is_err());
        assert_eq!(backend.calls(), vec![BackendCall::NodeStatus]);
    }

    #[tokio::test]
    async fn container_listing_failure_is_fatal() {
        let backend = MockBackend::new()
            .with_guest(MockGuest::qemu(100))
            .fail_list(GuestKind::Lxc);

        assert!(collect_inventory(&backend, "pve1").await.is_err());
    }
}

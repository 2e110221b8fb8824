// Property-based tests for shutdown policy resolution and plan ordering

use proptest::prelude::*;
use pveoff_core::{
    build_plan, GuestConfig, GuestDescriptor, GuestKind, PolicyResolver, ShutdownConfig,
    ShutdownMethod,
};
use std::num::NonZeroU64;

fn resolver() -> PolicyResolver {
    PolicyResolver::new(ShutdownConfig::default())
}

fn kind_strategy() -> impl Strategy<Value = GuestKind> {
    prop_oneof![Just(GuestKind::Qemu), Just(GuestKind::Lxc)]
}

// Tags that never start with the off-method prefix
fn plain_tag_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9\\-]{1,12}".prop_filter("not an off-method tag", |t| !t.starts_with("off-method_"))
}

proptest! {
    #[test]
    fn no_off_method_tag_yields_default(
        tags in prop::collection::vec(plain_tag_strategy(), 0..6),
        kind in kind_strategy(),
    ) {
        let config = GuestConfig {
            tags: Some(tags.join(";")),
            ..GuestConfig::default()
        };
        let policy = resolver().resolve(&config, kind).unwrap();
        prop_assert_eq!(policy.method, ShutdownMethod::Shutdown);
    }

    #[test]
    fn containers_never_resolve_to_suspend(
        suffix in prop_oneof![Just("suspend".to_string()), "[a-z]{0,10}"],
    ) {
        let config = GuestConfig {
            tags: Some(format!("off-method_{}", suffix)),
            ..GuestConfig::default()
        };
        let policy = resolver().resolve(&config, GuestKind::Lxc).unwrap();
        prop_assert_ne!(policy.method, ShutdownMethod::Suspend);
    }

    #[test]
    fn order_is_taken_verbatim(order in any::<i64>(), down in 1u64..100_000) {
        let config = GuestConfig {
            startup: Some(format!("up=5,order={},down={}", order, down)),
            ..GuestConfig::default()
        };
        let policy = resolver().resolve(&config, GuestKind::Qemu).unwrap();
        prop_assert_eq!(policy.priority, order);
        prop_assert_eq!(policy.timeout_secs.get(), down);
    }

    #[test]
    fn missing_or_zero_down_yields_default_timeout(
        order in -50i64..50,
        zero in any::<bool>(),
    ) {
        let startup = if zero {
            format!("order={},down=0", order)
        } else {
            format!("order={}", order)
        };
        let config = GuestConfig {
            startup: Some(startup),
            ..GuestConfig::default()
        };
        let policy = resolver().resolve(&config, GuestKind::Lxc).unwrap();
        prop_assert_eq!(policy.timeout_secs.get(), 30);
    }

    #[test]
    fn plan_is_descending_and_stable(priorities in prop::collection::vec(-5i64..5, 0..30)) {
        let descriptors: Vec<GuestDescriptor> = priorities
            .iter()
            .enumerate()
            .map(|(i, &priority)| GuestDescriptor {
                vmid: 100 + i as u32,
                kind: GuestKind::Qemu,
                name: None,
                method: ShutdownMethod::Shutdown,
                priority,
                timeout_secs: NonZeroU64::new(30).unwrap(),
            })
            .collect();

        let plan = build_plan(descriptors);
        prop_assert_eq!(plan.len(), priorities.len());

        for pair in plan.guests().windows(2) {
            prop_assert!(pair[0].priority >= pair[1].priority);
            if pair[0].priority == pair[1].priority {
                prop_assert!(pair[0].vmid < pair[1].vmid);
            }
        }
    }
}

use crate::{
    Address, FillCoordinator, FillPlan, Hierarchy, HierarchyConfig, MemoryBackend, NullBackend,
    RunConfig, test_support::RecordingBackend,
};
use core::time::Duration;
use std::collections::HashSet;

fn hierarchy() -> Hierarchy {
    Hierarchy::try_new(HierarchyConfig {
        first_level_group_count: 5,
        growth_factor: 1.5,
        level_count: 4,
        user_member_count: 3,
        subgroup_member_count: 2,
    })
    .unwrap()
}

fn config(workers: usize, instance_id: u32, instance_count: u32) -> RunConfig {
    RunConfig {
        workers,
        instance_id,
        instance_count,
        stats_period: Duration::from_millis(1),
    }
}

fn expected_addresses(hierarchy: &Hierarchy) -> HashSet<Address> {
    let mut all = HashSet::new();
    for level in 1..=hierarchy.level_count() {
        for group in 0..hierarchy.group_count(level) {
            for slot in 0..=hierarchy.total_member_slots(level) {
                all.insert(Address { level, group, slot });
            }
        }
    }
    all
}

fn run_fill(hierarchy: &Hierarchy, config: RunConfig) -> Vec<(Address, bool)> {
    let backend = RecordingBackend::new();
    let coordinator = FillCoordinator::new(&backend, hierarchy, config).unwrap();
    let report = coordinator.run();
    let writes = backend.writes();
    assert_eq!(report.operations(), writes.len() as u64);
    assert_eq!(report.failures(), 0);
    assert_eq!(report.units, coordinator.plan().total_units());
    writes
}

#[test]
fn fill_visits_every_address_once_for_any_pool_size() {
    let hierarchy = hierarchy();
    let expected = expected_addresses(&hierarchy);

    for workers in [1, 2, 8] {
        let writes = run_fill(&hierarchy, config(workers, 1, 1));
        let seen: HashSet<_> = writes.iter().map(|(address, _)| *address).collect();
        assert_eq!(writes.len(), seen.len(), "duplicate write with {workers} workers");
        assert_eq!(seen, expected, "coverage mismatch with {workers} workers");
    }
}

#[test]
fn instance_partitions_union_to_single_instance() {
    let hierarchy = hierarchy();
    let expected = expected_addresses(&hierarchy);

    for instance_count in [2, 3, 7] {
        let mut union = HashSet::new();
        for instance_id in 1..=instance_count {
            for (address, _) in run_fill(&hierarchy, config(4, instance_id, instance_count)) {
                assert!(
                    union.insert(address),
                    "{address:?} written by two of {instance_count} instances"
                );
            }
        }
        assert_eq!(union, expected);
    }
}

#[test]
fn subgroup_flags_follow_slot_ranges() {
    let hierarchy = hierarchy();
    for (address, is_subgroup) in run_fill(&hierarchy, config(3, 1, 1)) {
        let leaf = hierarchy.leaf_member_count(address.level);
        let expected = address.level > 1 && address.slot > leaf;
        assert_eq!(is_subgroup, expected, "{address:?}");
    }
}

#[test]
fn failed_writes_are_counted_and_do_not_stop_the_pool() {
    let hierarchy = hierarchy();
    let backend = RecordingBackend::failing_at(2);
    let coordinator = FillCoordinator::new(&backend, &hierarchy, config(4, 1, 1)).unwrap();
    let report = coordinator.run();

    let level_two = u64::from(hierarchy.group_count(2))
        * (u64::from(hierarchy.total_member_slots(2)) + 1);
    assert_eq!(report.failures(), level_two);
    assert_eq!(report.operations() + report.failures(), report.units);
    assert!(backend.writes().iter().all(|(a, _)| a.level != 2));
    assert!(backend.writes().iter().any(|(a, _)| a.level == 4));
}

#[test]
fn memory_backend_receives_full_hierarchy() {
    let hierarchy = hierarchy();
    let backend = MemoryBackend::new(hierarchy);
    let report = FillCoordinator::new(&backend, &hierarchy, config(8, 1, 1))
        .unwrap()
        .run();

    assert_eq!(report.failures(), 0);
    assert_eq!(backend.group_rows() as u64, hierarchy.total_groups());

    // Random member picks may collide within a group, so edges are bounded
    // rather than exact.
    let slots: u64 = (1..=hierarchy.level_count())
        .map(|l| u64::from(hierarchy.group_count(l)) * u64::from(hierarchy.total_member_slots(l)))
        .sum();
    assert!(backend.edge_rows() as u64 <= slots);
    assert!(backend.edge_rows() > 0);
}

#[test]
fn null_backend_fill_matches_plan() {
    let hierarchy = hierarchy();
    let plan = FillPlan::new(&hierarchy, 1, 1).unwrap();
    let report = FillCoordinator::new(&NullBackend, &hierarchy, config(2, 1, 1))
        .unwrap()
        .run();
    assert_eq!(report.operations(), plan.total_units());
}

#[test]
fn rejects_invalid_run_config() {
    let hierarchy = hierarchy();
    assert!(FillCoordinator::new(&NullBackend, &hierarchy, config(0, 1, 1)).is_err());
    assert!(FillCoordinator::new(&NullBackend, &hierarchy, config(1, 2, 1)).is_err());
}

use super::config::{Backend, BenchConfig};
use dbperf::{
    FillCoordinator, FillReport, Hierarchy, MemoryBackend, NullBackend, SelectCoordinator,
    SelectReport, StorageBackend,
};

/// Reports of the phases that ran.
#[derive(Debug, Default)]
pub struct Outcome {
    pub fill: Option<FillReport>,
    pub select: Option<SelectReport>,
}

/// Builds the configured backend once and runs the configured phases on it.
pub fn run(config: &BenchConfig) -> anyhow::Result<Outcome> {
    let hierarchy = Hierarchy::try_new(config.hierarchy)?;
    match config.backend {
        Backend::Memory => {
            let backend = MemoryBackend::new(hierarchy)
                .with_page_size(config.page_size)
                .with_batch_limit(config.batch_size);
            let outcome = run_with(&backend, &hierarchy, config)?;
            tracing::info!(
                "memory backend holds {} groups and {} membership edges",
                backend.group_rows(),
                backend.edge_rows()
            );
            Ok(outcome)
        }
        Backend::Null => run_with(&NullBackend, &hierarchy, config),
    }
}

pub fn run_with<B>(backend: &B, hierarchy: &Hierarchy, config: &BenchConfig) -> anyhow::Result<Outcome>
where
    B: StorageBackend,
{
    let mut outcome = Outcome::default();

    if config.benchmark.fills() {
        let report = FillCoordinator::new(backend, hierarchy, config.run)?.run();
        log_fill(&report);
        outcome.fill = Some(report);
    }

    if config.benchmark.selects() {
        let report = SelectCoordinator::new(backend, hierarchy, config.run)?.run();
        log_select(&report);
        outcome.select = Some(report);
    }

    Ok(outcome)
}

fn log_fill(report: &FillReport) {
    let (min, max, avg) = report.summary.totals.latency_ms();
    tracing::info!(
        "fill-data finished: {}/{} writes in {:.3}s ({:.1} ops/s), latency min/max/avg (ms): {min:.3}/{max:.3}/{avg:.3}, failures: {}",
        report.operations(),
        report.units,
        report.elapsed().as_secs_f64(),
        report.rate(),
        report.failures(),
    );
}

fn log_select(report: &SelectReport) {
    let totals = &report.summary.totals;
    let (min, max, avg) = totals.latency_ms();
    tracing::info!(
        "select-members finished: {}/{} jobs in {:.3}s ({:.1} jobs/s), latency min/max/avg (ms): {min:.3}/{max:.3}/{avg:.3}, members: {}, subgroups: {}, avg depth: {:.2}, failures: {}",
        report.jobs(),
        report.groups,
        report.elapsed().as_secs_f64(),
        report.rate(),
        report.members(),
        report.subgroups(),
        totals.avg_depth(),
        report.failures(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::config::Benchmark;
    use core::time::Duration;
    use dbperf::{HierarchyConfig, RunConfig};

    fn config(benchmark: Benchmark, backend: Backend) -> BenchConfig {
        BenchConfig {
            benchmark,
            backend,
            hierarchy: HierarchyConfig {
                first_level_group_count: 8,
                growth_factor: 1.5,
                level_count: 3,
                user_member_count: 4,
                subgroup_member_count: 2,
            },
            run: RunConfig {
                workers: 4,
                stats_period: Duration::from_millis(5),
                ..RunConfig::default()
            },
            batch_size: 3,
            page_size: 2,
        }
    }

    #[test]
    fn fill_then_select_on_memory_backend() {
        let outcome = run(&config(Benchmark::FillThenSelect, Backend::Memory)).unwrap();

        let fill = outcome.fill.unwrap();
        assert_eq!(fill.failures(), 0);
        assert_eq!(fill.operations(), fill.units);

        let select = outcome.select.unwrap();
        assert_eq!(select.failures(), 0);
        assert_eq!(select.jobs(), select.groups);
        assert!(select.members() > 0);
        assert!(select.subgroups() > 0);
    }

    #[test]
    fn fill_only_skips_select() {
        let outcome = run(&config(Benchmark::FillData, Backend::Null)).unwrap();
        assert!(outcome.fill.is_some());
        assert!(outcome.select.is_none());
    }

    #[test]
    fn select_only_on_null_backend() {
        let outcome = run(&config(Benchmark::SelectMembers, Backend::Null)).unwrap();
        assert!(outcome.fill.is_none());
        let select = outcome.select.unwrap();
        assert_eq!(select.jobs(), select.groups);
        assert_eq!(select.members(), 0);
    }
}

use anyhow::bail;
use clap::{Parser, ValueEnum};
use core::time::Duration;
use dbperf::{HierarchyConfig, RunConfig};

/// Which phase(s) to run.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Benchmark {
    /// Write every group and membership edge.
    FillData,
    /// Resolve the members of every top-level group.
    SelectMembers,
    /// Fill, then select against the same store.
    FillThenSelect,
}

impl Benchmark {
    pub const fn fills(self) -> bool {
        matches!(self, Self::FillData | Self::FillThenSelect)
    }

    pub const fn selects(self) -> bool {
        matches!(self, Self::SelectMembers | Self::FillThenSelect)
    }
}

/// Store under benchmark.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// In-process tables with paginated lookups.
    Memory,
    /// Accepts every write and resolves nothing.
    Null,
}

/// Command-line options of the `dbperf` binary.
///
/// Every option can also be set through the environment variable named next
/// to it, or through a `.env` file in the working directory.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "dbperf",
    version,
    about = "Fill a store with a synthetic group hierarchy and benchmark member resolution"
)]
pub struct CliArgs {
    /// Benchmark to run.
    ///
    /// Environment variable: `BENCHMARK`
    #[arg(long, alias = "benchmark-type", env = "BENCHMARK", value_enum)]
    pub benchmark: Benchmark,

    /// Store to run the benchmark against.
    ///
    /// Environment variable: `BACKEND`
    #[arg(long, env = "BACKEND", value_enum, default_value_t = Backend::Memory)]
    pub backend: Backend,

    /// One-based index of this instance among cooperating fill instances.
    ///
    /// Environment variable: `INSTANCE_NUMBER`
    #[arg(long, env = "INSTANCE_NUMBER", default_value_t = 1)]
    pub instance_number: u32,

    /// Number of cooperating fill instances.
    ///
    /// Environment variable: `INSTANCE_COUNT`
    #[arg(long, env = "INSTANCE_COUNT", default_value_t = 1)]
    pub instance_count: u32,

    /// Number of worker threads issuing queries concurrently.
    ///
    /// Environment variable: `PARALLEL_QUERY_COUNT`
    #[arg(long, env = "PARALLEL_QUERY_COUNT", default_value_t = 32)]
    pub parallel_query_count: usize,

    /// Number of groups on the first level.
    ///
    /// Environment variable: `FIRST_LEVEL_GROUP_COUNT`
    #[arg(long, env = "FIRST_LEVEL_GROUP_COUNT", default_value_t = 1000)]
    pub first_level_group_count: u32,

    /// Ratio of the number of groups between consecutive levels.
    ///
    /// Environment variable: `LEVEL_GROUP_FACTOR`
    #[arg(long, env = "LEVEL_GROUP_FACTOR", default_value_t = 1.0)]
    pub level_group_factor: f64,

    /// Number of levels.
    ///
    /// Environment variable: `LEVEL_COUNT`
    #[arg(long, env = "LEVEL_COUNT", default_value_t = 5)]
    pub level_count: u16,

    /// Base number of user members per group, scaled by
    /// `growth_factor^(level - 1)`.
    ///
    /// Environment variable: `USER_MEMBER_COUNT`
    #[arg(long, env = "USER_MEMBER_COUNT", default_value_t = 90)]
    pub user_member_count: u32,

    /// Base number of subgroup members per group, scaled by
    /// `growth_factor^(level - 1)`. First-level groups own none.
    ///
    /// Environment variable: `SUBGROUP_MEMBER_COUNT`
    #[arg(long, env = "SUBGROUP_MEMBER_COUNT", default_value_t = 10)]
    pub subgroup_member_count: u32,

    /// Interval between progress snapshots, in milliseconds.
    ///
    /// Environment variable: `STATISTICS_SNAPSHOT_PERIOD`
    #[arg(long, env = "STATISTICS_SNAPSHOT_PERIOD", default_value_t = 1000)]
    pub statistics_snapshot_period: u64,

    /// Maximum number of group ids sent in one lookup.
    ///
    /// Environment variable: `BATCH_SIZE`
    #[arg(long, env = "BATCH_SIZE", default_value_t = 100)]
    pub batch_size: usize,

    /// Maximum number of rows returned per lookup page.
    ///
    /// Environment variable: `PAGE_SIZE`
    #[arg(long, env = "PAGE_SIZE", default_value_t = 10_000)]
    pub page_size: usize,
}

#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub benchmark: Benchmark,
    pub backend: Backend,
    pub hierarchy: HierarchyConfig,
    pub run: RunConfig,
    pub batch_size: usize,
    pub page_size: usize,
}

impl TryFrom<CliArgs> for BenchConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.parallel_query_count == 0 {
            bail!("PARALLEL_QUERY_COUNT must be greater than 0");
        }
        if args.batch_size == 0 {
            bail!("BATCH_SIZE must be greater than 0");
        }
        if args.page_size == 0 {
            bail!("PAGE_SIZE must be greater than 0");
        }
        if args.statistics_snapshot_period == 0 {
            bail!("STATISTICS_SNAPSHOT_PERIOD must be greater than 0");
        }

        // A select-only run always covers every top-level group.
        let (instance_id, instance_count) = if args.benchmark == Benchmark::SelectMembers {
            (1, 1)
        } else {
            (args.instance_number, args.instance_count)
        };
        if args.benchmark == Benchmark::FillThenSelect && instance_count != 1 {
            bail!(
                "fill-then-select needs the whole hierarchy in one process (INSTANCE_COUNT = {})",
                instance_count
            );
        }

        let run = RunConfig {
            workers: args.parallel_query_count,
            instance_id,
            instance_count,
            stats_period: Duration::from_millis(args.statistics_snapshot_period),
        };
        run.validate()?;

        let hierarchy = HierarchyConfig {
            first_level_group_count: args.first_level_group_count,
            growth_factor: args.level_group_factor,
            level_count: args.level_count,
            user_member_count: args.user_member_count,
            subgroup_member_count: args.subgroup_member_count,
        };
        hierarchy.validate()?;

        if args.benchmark == Benchmark::SelectMembers && args.backend == Backend::Memory {
            bail!("select-members on the memory backend has nothing to read; use fill-then-select");
        }

        Ok(Self {
            benchmark: args.benchmark,
            backend: args.backend,
            hierarchy,
            run,
            batch_size: args.batch_size,
            page_size: args.page_size,
        })
    }
}

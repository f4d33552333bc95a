pub mod config;
pub mod metrics;
pub mod plan;
pub mod record;
pub mod simulate;
pub mod state;

use std::error::Error;
use std::path::PathBuf;

use chrono::{DateTime, Local, Timelike, Utc};
use focusplan_core::engine::blend::bucket_history;
use focusplan_core::session::sessions_on_day;
use focusplan_core::storage::data_dir;
use focusplan_core::{
    compute_blended_metrics, BlendedMetrics, FileStateStore, HistoryFile, Intensity, Plan,
    PlanContext, Planner, PlannerConfig, SessionRecord, TimeBucket,
};
use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};

pub type CmdResult = Result<(), Box<dyn Error>>;

const PENDING_PLAN_FILE: &str = "pending_plan.json";

/// Config and history loaded from the data directory.
pub struct Workbench {
    pub config: PlannerConfig,
    pub history_file: HistoryFile,
    pub history: Vec<SessionRecord>,
    pub now: DateTime<Utc>,
}

/// Caller-supplied planning context.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanOptions {
    pub intensity: Intensity,
    pub bucket: Option<TimeBucket>,
    pub blocks_today: Option<u32>,
    pub seed: Option<u64>,
}

impl Workbench {
    pub fn open() -> Result<Self, Box<dyn Error>> {
        let config = PlannerConfig::load()?;
        let history_file = HistoryFile::open_default()?;
        let history = history_file.load()?;
        Ok(Self {
            config,
            history_file,
            history,
            now: Utc::now(),
        })
    }

    /// Requested bucket, or the one for the current local hour.
    pub fn bucket(&self, requested: Option<TimeBucket>) -> TimeBucket {
        requested.unwrap_or_else(|| TimeBucket::from_hour(Local::now().hour()))
    }

    pub fn bucket_history(&self, bucket: TimeBucket) -> Vec<SessionRecord> {
        bucket_history(
            &self.history,
            bucket,
            self.now,
            self.config.analytics.bucket_recency_days,
        )
    }

    pub fn metrics(&self, bucket: TimeBucket) -> BlendedMetrics {
        compute_blended_metrics(&self.history, &self.bucket_history(bucket), &self.config)
    }

    /// Plan the next session, persist planner state and remember the plan
    /// for the following `record`.
    pub fn plan(&self, opts: PlanOptions) -> Result<PendingPlan, Box<dyn Error>> {
        let bucket = self.bucket(opts.bucket);
        let bucket_sessions = self.bucket_history(bucket);
        let metrics = compute_blended_metrics(&self.history, &bucket_sessions, &self.config);
        let blocks_today = opts
            .blocks_today
            .unwrap_or_else(|| sessions_on_day(&self.history, self.now.date_naive()));

        let ctx = PlanContext::new(self.now)
            .with_intensity(opts.intensity)
            .with_blocks_today(blocks_today)
            .with_bucket(bucket, &bucket_sessions);

        let mut planner = open_planner(self.config.clone())?;
        let mut rng = seeded_rng(opts.seed);
        let plan = planner.plan_next(&self.history, &metrics, &ctx, &mut rng);
        if let Some(err) = planner.last_persist_error() {
            tracing::warn!(error = err, "planner state was not saved");
        }

        let pending = PendingPlan {
            history_len: self.history.len(),
            bucket,
            plan,
            metrics,
        };
        pending.save()?;
        Ok(pending)
    }
}

pub fn open_planner(config: PlannerConfig) -> Result<Planner<FileStateStore>, Box<dyn Error>> {
    Ok(Planner::new(config, FileStateStore::open_default()?))
}

/// Fixed seed when given, otherwise one derived from the clock.
pub fn seeded_rng(seed: Option<u64>) -> Mcg128Xsl64 {
    let seed = seed.unwrap_or_else(|| {
        Utc::now()
            .timestamp_nanos_opt()
            .map(|n| n as u64)
            .unwrap_or_default()
    });
    Mcg128Xsl64::seed_from_u64(seed)
}

/// The last plan handed out, kept until the session is recorded so that
/// recording does not plan (and consume a cycle slot) a second time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingPlan {
    pub history_len: usize,
    pub bucket: TimeBucket,
    pub plan: Plan,
    pub metrics: BlendedMetrics,
}

impl PendingPlan {
    fn path() -> std::io::Result<PathBuf> {
        Ok(data_dir()?.join(PENDING_PLAN_FILE))
    }

    /// The stored plan, if one exists and still matches `history_len`.
    pub fn load_matching(history_len: usize) -> Option<Self> {
        let path = Self::path().ok()?;
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<Self>(&content) {
            Ok(pending) if pending.history_len == history_len => Some(pending),
            Ok(pending) => {
                tracing::debug!(
                    stored = pending.history_len,
                    current = history_len,
                    "pending plan is stale"
                );
                None
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "pending plan unreadable");
                None
            }
        }
    }

    pub fn save(&self) -> Result<(), Box<dyn Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(Self::path()?, json)?;
        Ok(())
    }

    pub fn clear() -> std::io::Result<()> {
        match std::fs::remove_file(Self::path()?) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

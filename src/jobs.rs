//! Scheduled batch sweeps
//!
//! Each sweep loads the entries ready for one stage and runs them one after
//! the other. A failing entry is logged and skipped; its stage flag stays
//! unset, so the next run picks it up again.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};

use crate::{
    config::RegistryConfig,
    error::{AppError, AppResult},
    models::{OpenaccessStage, ThesesStage},
    services::{Services, ThesisStatus},
    workflows::{openaccess, theses, today},
    AppState,
};

/// Outcome counts of one sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub succeeded: usize,
    pub warned: usize,
    pub failed: usize,
}

impl SweepReport {
    fn record<T>(&mut self, job: Job, id: &str, result: AppResult<T>) {
        match result {
            Ok(_) => {
                tracing::info!("{} succeeded for {}", job, id);
                self.succeeded += 1;
            }
            Err(err @ (AppError::Warning(_) | AppError::NotYetUpdated(_))) => {
                tracing::warn!("{} skipped {}: {}", job, id, err);
                self.warned += 1;
            }
            Err(err) => {
                tracing::error!("{} failed for {}: {}", job, id, err);
                self.failed += 1;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    StatusArch,
    StatusPub,
    CreateInAlma,
    UpdateInRepo,
    MarkAsExported,
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Job::StatusArch => "status_arch",
            Job::StatusPub => "status_pub",
            Job::CreateInAlma => "create_in_alma",
            Job::UpdateInRepo => "update_in_repo",
            Job::MarkAsExported => "mark_as_exported",
        }
    }

    pub async fn run(&self, state: &AppState) -> AppResult<SweepReport> {
        let services = state.services.as_ref();
        let registry = &state.config.registry;
        match self {
            Job::StatusArch => status_arch(services).await,
            Job::StatusPub => status_pub(services).await,
            Job::CreateInAlma => create_in_alma(services, registry).await,
            Job::UpdateInRepo => update_in_repo(services, registry).await,
            Job::MarkAsExported => mark_as_exported(services).await,
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Job {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "status_arch" => Ok(Job::StatusArch),
            "status_pub" => Ok(Job::StatusPub),
            "create_in_alma" => Ok(Job::CreateInAlma),
            "update_in_repo" => Ok(Job::UpdateInRepo),
            "mark_as_exported" => Ok(Job::MarkAsExported),
            other => Err(AppError::NotFound(format!("Job {} not found", other))),
        }
    }
}

/// Report ARCH to the campus system for every imported thesis
pub async fn status_arch(services: &Services) -> AppResult<SweepReport> {
    let mut report = SweepReport::default();
    for entry in services.theses.get_ready_to(ThesesStage::ArchivedInCms).await? {
        let result = theses::set_cms_status(services, &entry, ThesisStatus::Arch, &today()).await;
        report.record(Job::StatusArch, &entry.cms_id, result);
    }
    Ok(report)
}

/// Report PUB to the campus system for every thesis updated from the registry
pub async fn status_pub(services: &Services) -> AppResult<SweepReport> {
    let mut report = SweepReport::default();
    for entry in services.theses.get_ready_to(ThesesStage::PublishedInCms).await? {
        let result = theses::set_cms_status(services, &entry, ThesisStatus::Pub, &today()).await;
        report.record(Job::StatusPub, &entry.cms_id, result);
    }
    Ok(report)
}

pub async fn create_in_alma(services: &Services, config: &RegistryConfig) -> AppResult<SweepReport> {
    let mut report = SweepReport::default();
    for entry in services.theses.get_ready_to(ThesesStage::CreatedInAlma).await? {
        let result = theses::create_in_alma(services, config, &entry).await;
        report.record(Job::CreateInAlma, &entry.cms_id, result);
    }
    Ok(report)
}

pub async fn update_in_repo(services: &Services, config: &RegistryConfig) -> AppResult<SweepReport> {
    let mut report = SweepReport::default();
    for entry in services.theses.get_ready_to(ThesesStage::UpdatedInRepo).await? {
        let result = theses::update_in_repo(services, config, &entry).await;
        report.record(Job::UpdateInRepo, &entry.cms_id, result);
    }
    Ok(report)
}

pub async fn mark_as_exported(services: &Services) -> AppResult<SweepReport> {
    let mut report = SweepReport::default();
    for entry in services.openaccess.get_ready_to(OpenaccessStage::MarkedAsExported).await? {
        let result = openaccess::mark_as_exported(services, &entry).await;
        report.record(Job::MarkAsExported, &entry.pure_id, result);
    }
    Ok(report)
}

/// Runs the configured sweeps in order on a fixed interval
///
/// Sweeps never overlap: a tick that fires while a run is still going is
/// delayed, not queued.
pub struct Scheduler {
    state: AppState,
    jobs: Vec<Job>,
    period: Duration,
}

impl Scheduler {
    /// Unknown job names are logged and left out
    pub fn new(state: AppState) -> Self {
        let config = &state.config.scheduler;
        let jobs = config
            .jobs
            .iter()
            .filter_map(|name| match name.parse::<Job>() {
                Ok(job) => Some(job),
                Err(_) => {
                    tracing::warn!("Unknown job {} in scheduler configuration", name);
                    None
                }
            })
            .collect();
        let period = Duration::from_secs(config.interval_seconds.max(1));

        Self { state, jobs, period }
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// One pass over every configured job
    pub async fn run_once(&self) -> Vec<(Job, SweepReport)> {
        let mut reports = Vec::with_capacity(self.jobs.len());
        for job in &self.jobs {
            match job.run(&self.state).await {
                Ok(report) => {
                    tracing::info!(
                        "{} done: {} succeeded, {} warned, {} failed",
                        job,
                        report.succeeded,
                        report.warned,
                        report.failed
                    );
                    reports.push((*job, report));
                }
                Err(e) => tracing::error!("{} could not run: {}", job, e),
            }
        }
        reports
    }

    /// Run on every tick until `shutdown` resolves
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!("Scheduler started with {} job(s) every {:?}", self.jobs.len(), self.period);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    self.run_once().await;
                }
            }
        }
        tracing::info!("Scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::testing::Fixture;
    use std::sync::Arc;

    #[test]
    fn test_job_names_round_trip() {
        for job in [
            Job::StatusArch,
            Job::StatusPub,
            Job::CreateInAlma,
            Job::UpdateInRepo,
            Job::MarkAsExported,
        ] {
            assert_eq!(job.name().parse::<Job>().unwrap(), job);
        }
        assert!("archive".parse::<Job>().is_err());
    }

    #[tokio::test]
    async fn test_failing_entry_does_not_stop_the_sweep() {
        let mut fixture = Fixture::new();
        fixture
            .campusonline
            .expect_set_status()
            .times(3)
            .returning(|_, cms_id, _, _| match cms_id {
                "2" => Err(AppError::Upstream {
                    id: cms_id.to_string(),
                    message: "HTTP 500".into(),
                }),
                _ => Ok(()),
            });
        let harness = fixture.build().await;
        let theses = &harness.services.theses;
        for (pid, cms_id) in [("rec-1", "1"), ("rec-2", "2"), ("rec-3", "3")] {
            theses.create(pid, cms_id).await.unwrap();
            theses.set_state(pid, ThesesStage::ImportedInRepo).await.unwrap();
        }

        let report = status_arch(&harness.services).await.unwrap();
        assert_eq!(report, SweepReport { succeeded: 2, warned: 0, failed: 1 });

        let ready = theses.get_ready_to(ThesesStage::ArchivedInCms).await.unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].cms_id, "2");
        assert!(theses.resolve("rec-1").await.unwrap().archived_in_cms);
    }

    #[tokio::test]
    async fn test_scheduler_skips_unknown_jobs() {
        let harness = Fixture::new().build().await;
        let mut config = AppConfig::default();
        config.scheduler.jobs = vec!["status_pub".into(), "reindex".into(), "mark_as_exported".into()];
        let state = AppState {
            config: Arc::new(config),
            services: Arc::new(harness.services),
        };

        let scheduler = Scheduler::new(state);
        assert_eq!(scheduler.jobs(), &[Job::StatusPub, Job::MarkAsExported]);

        let reports = scheduler.run_once().await;
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|(_, report)| *report == SweepReport::default()));
    }
}

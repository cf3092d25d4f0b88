//! Concurrent adapter execution with per-adapter budgets and a request deadline.
//!
//! Every registered adapter runs as its own task. Fetch-based adapters share
//! one HTTP client and draw from a bounded worker pool created for each
//! query; render-based adapters lease a context from the shared
//! [`BrowserSession`]. Each invocation is wrapped in its own timeout and
//! panic guard, so one storefront failing in any way only empties that
//! storefront's group. The whole fan-out is bounded by a
//! request deadline, after which outstanding tasks are aborted.

use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::adapter::{AdapterKind, Extraction, SourceAdapter};
use crate::browser::BrowserSession;
use crate::config::ScrapeConfig;
use crate::error::{Result, ScrapeError};
use crate::http::{build_client, HttpLoader};
use crate::types::{SearchQuery, SourceInfo};

/// Timing and pool settings for an [`AdapterRunner`].
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Budget for one fetch-based adapter invocation.
    pub fetch_timeout: Duration,
    /// Budget for one render-based invocation, lease acquisition included.
    pub render_timeout: Duration,
    /// Bound on the whole fan-out.
    pub deadline: Duration,
    /// Concurrent fetch invocations per query; `None` means one per fetch adapter.
    pub worker_pool_size: Option<usize>,
    /// Fixed User-Agent; `None` rotates per request.
    pub user_agent: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(15),
            render_timeout: Duration::from_secs(25),
            deadline: Duration::from_secs(30),
            worker_pool_size: None,
            user_agent: None,
        }
    }
}

impl From<&ScrapeConfig> for RunnerConfig {
    fn from(config: &ScrapeConfig) -> Self {
        Self {
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
            render_timeout: Duration::from_secs(config.render_timeout_secs),
            deadline: Duration::from_secs(config.request_deadline_secs),
            worker_pool_size: config.worker_pool_size,
            user_agent: config.user_agent.clone(),
        }
    }
}

/// How one adapter invocation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Extraction completed.
    Succeeded {
        /// Raw records extracted, before normalisation.
        records: usize,
    },
    /// The adapter returned an error.
    Failed {
        /// Rendered error message.
        error: String,
    },
    /// The per-adapter budget ran out.
    TimedOut,
    /// The adapter panicked.
    Panicked {
        /// Panic payload, if it was a string.
        message: String,
    },
    /// Still running when the request deadline passed.
    Abandoned,
}

impl RunOutcome {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Succeeded { .. } => "succeeded",
            Self::Failed { .. } => "failed",
            Self::TimedOut => "timed_out",
            Self::Panicked { .. } => "panicked",
            Self::Abandoned => "abandoned",
        }
    }

    /// Whether the adapter produced an extraction.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Record of one adapter invocation.
#[derive(Debug, Clone)]
pub struct AdapterRun {
    /// Storefront identity.
    pub info: SourceInfo,
    /// `"fetch"` or `"render"`.
    pub kind: &'static str,
    /// How it ended.
    pub outcome: RunOutcome,
    /// Wall time from spawn to completion (or to the deadline).
    pub elapsed: Duration,
    /// The extraction, present only on success.
    pub extraction: Option<Extraction>,
}

/// Outcome of one fan-out, one entry per adapter in registration order.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Per-adapter records.
    pub runs: Vec<AdapterRun>,
    /// Wall time of the whole fan-out.
    pub elapsed: Duration,
}

impl RunReport {
    /// Number of adapters that succeeded.
    pub fn succeeded(&self) -> usize {
        self.runs.iter().filter(|r| r.outcome.is_success()).count()
    }

    /// Names of adapters that did not succeed.
    pub fn unsuccessful_sources(&self) -> Vec<&str> {
        self.runs
            .iter()
            .filter(|r| !r.outcome.is_success())
            .map(|r| r.info.name.as_str())
            .collect()
    }

    /// The run for a source, if registered.
    pub fn run_for(&self, source: &str) -> Option<&AdapterRun> {
        self.runs.iter().find(|r| r.info.name == source)
    }
}

/// Everything a spawned invocation needs, owned.
#[derive(Clone)]
struct Invocation {
    client: reqwest::Client,
    session: Arc<BrowserSession>,
    workers: Arc<Semaphore>,
    fetch_timeout: Duration,
    render_timeout: Duration,
    user_agent: Option<String>,
}

/// Runs a fixed set of adapters for each query.
pub struct AdapterRunner {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    session: Arc<BrowserSession>,
    client: reqwest::Client,
    pool_size: usize,
    config: RunnerConfig,
}

impl AdapterRunner {
    /// Create a runner over `adapters`, in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Config`] if two adapters share a source name
    /// or a budget is zero, and [`ScrapeError::Http`] if the shared client
    /// cannot be built.
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        session: Arc<BrowserSession>,
        config: RunnerConfig,
    ) -> Result<Self> {
        let mut names = HashSet::new();
        for adapter in &adapters {
            let name = &adapter.info().name;
            if !names.insert(name.clone()) {
                return Err(ScrapeError::Config(format!(
                    "source {name:?} is registered twice"
                )));
            }
        }
        if config.fetch_timeout.is_zero()
            || config.render_timeout.is_zero()
            || config.deadline.is_zero()
        {
            return Err(ScrapeError::Config(
                "runner timeouts must be greater than 0".into(),
            ));
        }

        let fetch_adapters = adapters.iter().filter(|a| !a.kind().is_render()).count();
        let pool_size = config.worker_pool_size.unwrap_or(fetch_adapters).max(1);
        let client = build_client(config.fetch_timeout)?;

        Ok(Self {
            adapters,
            session,
            client,
            pool_size,
            config,
        })
    }

    /// Registered adapters, in registration order.
    pub fn adapters(&self) -> &[Arc<dyn SourceAdapter>] {
        &self.adapters
    }

    /// Registered source identities, in registration order.
    pub fn sources(&self) -> Vec<SourceInfo> {
        self.adapters.iter().map(|a| a.info().clone()).collect()
    }

    /// The shared browser session.
    pub fn session(&self) -> &Arc<BrowserSession> {
        &self.session
    }

    /// Runner settings.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Fetch workers available to each query.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Run every adapter for `query` and wait for all of them or the deadline.
    ///
    /// Each call gets its own fetch worker pool, so concurrent queries never
    /// queue behind each other's storefronts. Never fails: every adapter
    /// ends up in the report with an outcome.
    pub async fn run(&self, query: &SearchQuery) -> RunReport {
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.config.deadline;
        let invocation = Invocation {
            client: self.client.clone(),
            session: Arc::clone(&self.session),
            workers: Arc::new(Semaphore::new(self.pool_size)),
            fetch_timeout: self.config.fetch_timeout,
            render_timeout: self.config.render_timeout,
            user_agent: self.config.user_agent.clone(),
        };

        let mut slots: Vec<Option<AdapterRun>> = (0..self.adapters.len()).map(|_| None).collect();
        let mut tasks = JoinSet::new();
        for (index, adapter) in self.adapters.iter().enumerate() {
            let adapter = Arc::clone(adapter);
            let query = query.clone();
            let invocation = invocation.clone();
            tasks.spawn(async move { (index, invoke(adapter, query, invocation).await) });
        }

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((index, run)))) => slots[index] = Some(run),
                Ok(Some(Err(e))) => {
                    tracing::error!(error = %e, "adapter task failed to complete");
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        pending = tasks.len(),
                        deadline_ms = self.config.deadline.as_millis() as u64,
                        "request deadline reached, abandoning outstanding adapters"
                    );
                    tasks.abort_all();
                    break;
                }
            }
        }

        let elapsed = started.elapsed();
        let runs = slots
            .into_iter()
            .zip(&self.adapters)
            .map(|(slot, adapter)| {
                slot.unwrap_or_else(|| {
                    let run = AdapterRun {
                        info: adapter.info().clone(),
                        kind: adapter.kind().label(),
                        outcome: RunOutcome::Abandoned,
                        elapsed,
                        extraction: None,
                    };
                    emit(&run);
                    run
                })
            })
            .collect();

        let report = RunReport { runs, elapsed };
        tracing::debug!(
            succeeded = report.succeeded(),
            total = report.runs.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "fan-out complete"
        );
        report
    }
}

/// Run one adapter on its execution path.
async fn invoke(adapter: Arc<dyn SourceAdapter>, query: SearchQuery, ctx: Invocation) -> AdapterRun {
    let info = adapter.info().clone();
    let kind = adapter.kind();
    let started = Instant::now();

    let attempt = match &kind {
        AdapterKind::Fetch => {
            // Waiting for a worker is charged to the fetch budget.
            let work = async {
                let _permit = Arc::clone(&ctx.workers)
                    .acquire_owned()
                    .await
                    .map_err(|_| ScrapeError::Http("fetch worker pool is closed".into()))?;
                let mut loader = HttpLoader::new(ctx.client.clone(), ctx.user_agent.as_deref());
                adapter.extract(&query, &mut loader).await
            };
            guarded(ctx.fetch_timeout, work).await
        }
        AdapterKind::Render(options) => {
            let work = async {
                let mut lease = ctx.session.acquire(options).await?;
                let extraction = adapter.extract(&query, &mut lease).await;
                lease.release().await;
                extraction
            };
            guarded(ctx.render_timeout, work).await
        }
    };

    let (outcome, extraction) = match attempt {
        Ok(extraction) => (
            RunOutcome::Succeeded {
                records: extraction.records.len(),
            },
            Some(extraction),
        ),
        Err(outcome) => (outcome, None),
    };

    let run = AdapterRun {
        info,
        kind: kind.label(),
        outcome,
        elapsed: started.elapsed(),
        extraction,
    };
    emit(&run);
    run
}

/// Apply a budget and a panic guard to one invocation.
async fn guarded<F>(budget: Duration, work: F) -> std::result::Result<Extraction, RunOutcome>
where
    F: Future<Output = Result<Extraction>>,
{
    match tokio::time::timeout(budget, AssertUnwindSafe(work).catch_unwind()).await {
        Ok(Ok(Ok(extraction))) => Ok(extraction),
        Ok(Ok(Err(e))) => Err(RunOutcome::Failed {
            error: e.to_string(),
        }),
        Ok(Err(payload)) => Err(RunOutcome::Panicked {
            message: panic_message(payload.as_ref()),
        }),
        Err(_) => Err(RunOutcome::TimedOut),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".into()
    }
}

/// Structured event for one adapter outcome.
fn emit(run: &AdapterRun) {
    let elapsed_ms = run.elapsed.as_millis() as u64;
    match &run.outcome {
        RunOutcome::Succeeded { records } => tracing::debug!(
            source = %run.info.name,
            kind = run.kind,
            elapsed_ms,
            records,
            "adapter succeeded"
        ),
        RunOutcome::Failed { error } => tracing::warn!(
            source = %run.info.name,
            kind = run.kind,
            elapsed_ms,
            outcome = "failed",
            error = %error,
            "adapter failed"
        ),
        RunOutcome::Panicked { message } => tracing::error!(
            source = %run.info.name,
            kind = run.kind,
            elapsed_ms,
            outcome = "panicked",
            panic = %message,
            "adapter panicked"
        ),
        other => tracing::warn!(
            source = %run.info.name,
            kind = run.kind,
            elapsed_ms,
            outcome = other.label(),
            "adapter did not finish in time"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{PageLoader, RenderOptions};
    use crate::types::RawRecord;
    use async_trait::async_trait;

    enum Behaviour {
        Records(usize),
        Fail,
        Panic,
        Sleep(Duration),
    }

    struct ScriptedAdapter {
        info: SourceInfo,
        kind: AdapterKind,
        behaviour: Behaviour,
    }

    impl ScriptedAdapter {
        fn fetch(name: &str, behaviour: Behaviour) -> Arc<dyn SourceAdapter> {
            Arc::new(Self {
                info: SourceInfo::new(name, format!("https://{name}.test/logo.png"), &format!("https://{name}.test/"))
                    .expect("valid"),
                kind: AdapterKind::Fetch,
                behaviour,
            })
        }

        fn render(name: &str, behaviour: Behaviour) -> Arc<dyn SourceAdapter> {
            Arc::new(Self {
                info: SourceInfo::new(name, "logo", &format!("https://{name}.test/")).expect("valid"),
                kind: AdapterKind::Render(RenderOptions::default()),
                behaviour,
            })
        }
    }

    #[async_trait]
    impl SourceAdapter for ScriptedAdapter {
        fn info(&self) -> &SourceInfo {
            &self.info
        }

        fn kind(&self) -> AdapterKind {
            self.kind.clone()
        }

        fn search_url(&self, query: &SearchQuery) -> String {
            self.info.join(&format!("search?q={query}"))
        }

        fn parse(&self, _html: &str) -> Result<Extraction> {
            Ok(Extraction::default())
        }

        async fn extract(&self, _query: &SearchQuery, _loader: &mut dyn PageLoader) -> Result<Extraction> {
            match &self.behaviour {
                Behaviour::Records(n) => Ok(Extraction::from_records(
                    (0..*n)
                        .map(|i| RawRecord {
                            name: Some(format!("{} item {i}", self.info.name)),
                            price_text: Some("৳1,000".into()),
                            ..Default::default()
                        })
                        .collect(),
                )),
                Behaviour::Fail => Err(ScrapeError::Parse("markup changed".into())),
                Behaviour::Panic => panic!("selector exploded"),
                Behaviour::Sleep(d) => {
                    tokio::time::sleep(*d).await;
                    Ok(Extraction::default())
                }
            }
        }
    }

    fn fast_config() -> RunnerConfig {
        RunnerConfig {
            fetch_timeout: Duration::from_millis(200),
            render_timeout: Duration::from_millis(200),
            deadline: Duration::from_secs(2),
            worker_pool_size: None,
            user_agent: Some("TestBot/1.0".into()),
        }
    }

    fn query() -> SearchQuery {
        SearchQuery::new("mouse").expect("valid")
    }

    #[tokio::test]
    async fn failures_are_isolated() {
        let runner = AdapterRunner::new(
            vec![
                ScriptedAdapter::fetch("good", Behaviour::Records(3)),
                ScriptedAdapter::fetch("broken", Behaviour::Fail),
                ScriptedAdapter::fetch("panicky", Behaviour::Panic),
                ScriptedAdapter::fetch("slow", Behaviour::Sleep(Duration::from_secs(5))),
            ],
            Arc::new(BrowserSession::disabled()),
            fast_config(),
        )
        .expect("runner");

        let report = runner.run(&query()).await;
        assert_eq!(report.runs.len(), 4);
        assert_eq!(report.runs[0].outcome, RunOutcome::Succeeded { records: 3 });
        assert_eq!(report.runs[0].extraction.as_ref().map(|e| e.records.len()), Some(3));
        assert!(matches!(report.runs[1].outcome, RunOutcome::Failed { .. }));
        assert_eq!(
            report.runs[2].outcome,
            RunOutcome::Panicked {
                message: "selector exploded".into()
            }
        );
        assert_eq!(report.runs[3].outcome, RunOutcome::TimedOut);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.unsuccessful_sources(), vec!["broken", "panicky", "slow"]);
    }

    #[tokio::test]
    async fn deadline_abandons_outstanding_adapters() {
        let config = RunnerConfig {
            fetch_timeout: Duration::from_secs(10),
            deadline: Duration::from_millis(150),
            ..fast_config()
        };
        let runner = AdapterRunner::new(
            vec![
                ScriptedAdapter::fetch("quick", Behaviour::Records(1)),
                ScriptedAdapter::fetch("stuck", Behaviour::Sleep(Duration::from_secs(60))),
            ],
            Arc::new(BrowserSession::disabled()),
            config,
        )
        .expect("runner");

        let started = Instant::now();
        let report = runner.run(&query()).await;
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(report.runs[0].outcome.is_success());
        assert_eq!(report.runs[1].outcome, RunOutcome::Abandoned);
        assert_eq!(report.runs[1].info.name, "stuck");
    }

    #[tokio::test]
    async fn render_adapters_fail_closed_without_browser() {
        let runner = AdapterRunner::new(
            vec![
                ScriptedAdapter::fetch("static", Behaviour::Records(2)),
                ScriptedAdapter::render("scripted", Behaviour::Records(2)),
            ],
            Arc::new(BrowserSession::disabled()),
            fast_config(),
        )
        .expect("runner");

        let report = runner.run(&query()).await;
        assert!(report.runs[0].outcome.is_success());
        assert_eq!(report.runs[1].kind, "render");
        assert!(matches!(report.runs[1].outcome, RunOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn report_keeps_registration_order() {
        let runner = AdapterRunner::new(
            vec![
                ScriptedAdapter::fetch("late", Behaviour::Sleep(Duration::from_millis(50))),
                ScriptedAdapter::fetch("early", Behaviour::Records(1)),
            ],
            Arc::new(BrowserSession::disabled()),
            fast_config(),
        )
        .expect("runner");

        let report = runner.run(&query()).await;
        let names: Vec<_> = report.runs.iter().map(|r| r.info.name.as_str()).collect();
        assert_eq!(names, vec!["late", "early"]);
    }

    #[tokio::test]
    async fn concurrent_queries_do_not_share_workers() {
        let config = RunnerConfig {
            fetch_timeout: Duration::from_secs(1),
            deadline: Duration::from_millis(1_200),
            worker_pool_size: Some(1),
            ..fast_config()
        };
        let runner = AdapterRunner::new(
            vec![ScriptedAdapter::fetch("slowish", Behaviour::Sleep(Duration::from_millis(800)))],
            Arc::new(BrowserSession::disabled()),
            config,
        )
        .expect("runner");
        assert_eq!(runner.pool_size(), 1);

        let mouse = query();
        let keyboard = SearchQuery::new("keyboard").expect("valid");
        let (a, b) = tokio::join!(runner.run(&mouse), runner.run(&keyboard));
        assert_eq!(a.runs[0].outcome, RunOutcome::Succeeded { records: 0 });
        assert_eq!(b.runs[0].outcome, RunOutcome::Succeeded { records: 0 });
    }

    #[tokio::test]
    async fn worker_wait_counts_against_fetch_budget() {
        let config = RunnerConfig {
            fetch_timeout: Duration::from_millis(400),
            deadline: Duration::from_secs(3),
            worker_pool_size: Some(1),
            ..fast_config()
        };
        let runner = AdapterRunner::new(
            vec![
                ScriptedAdapter::fetch("first", Behaviour::Sleep(Duration::from_millis(300))),
                ScriptedAdapter::fetch("second", Behaviour::Sleep(Duration::from_millis(300))),
            ],
            Arc::new(BrowserSession::disabled()),
            config,
        )
        .expect("runner");

        let report = runner.run(&query()).await;
        let timed_out = report
            .runs
            .iter()
            .filter(|r| r.outcome == RunOutcome::TimedOut)
            .count();
        assert_eq!(report.succeeded(), 1);
        assert_eq!(timed_out, 1, "the queued adapter times out instead of being abandoned");
        assert!(report.elapsed < Duration::from_secs(1));
    }

    #[test]
    fn duplicate_sources_rejected() {
        let result = AdapterRunner::new(
            vec![
                ScriptedAdapter::fetch("same", Behaviour::Records(1)),
                ScriptedAdapter::fetch("same", Behaviour::Records(1)),
            ],
            Arc::new(BrowserSession::disabled()),
            fast_config(),
        );
        assert!(matches!(result, Err(ScrapeError::Config(_))));
    }

    #[test]
    fn zero_deadline_rejected() {
        let config = RunnerConfig {
            deadline: Duration::ZERO,
            ..fast_config()
        };
        let result = AdapterRunner::new(vec![], Arc::new(BrowserSession::disabled()), config);
        assert!(result.is_err());
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(RunOutcome::TimedOut.label(), "timed_out");
        assert_eq!(RunOutcome::Abandoned.label(), "abandoned");
        assert!(!RunOutcome::Abandoned.is_success());
    }
}

//! Orchestration layer: sequences monitor, store and engine calls per user
//! action and folds the outcomes into the dashboard snapshot. Holds no
//! business rules beyond ordering.

use datatruth_core::db::usage_queries as store;
use datatruth_core::domain::{DataPlan, DEFAULT_DISCREPANCY_THRESHOLD_PERCENTAGE};
use datatruth_core::engine;
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::monitor::DataMonitor;
use crate::provider::ProviderClient;
use crate::state::{reduce, DashboardState, Event};

/// Baseline handed to the provider client before any device sample exists.
const DEFAULT_DEVICE_BASELINE_BYTES: i64 = 2_000_000_000;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("store operation failed: {0}")]
    Store(String),
    #[error("measurement failed: {0}")]
    Measurement(String),
    #[error("provider fetch failed: {0}")]
    Provider(String),
    #[error("invalid plan: {0}")]
    InvalidPlan(String),
}

pub struct App {
    pool: SqlitePool,
    monitor: Box<dyn DataMonitor>,
    provider: Box<dyn ProviderClient>,
    state: DashboardState,
}

impl App {
    pub fn new(
        pool: SqlitePool,
        monitor: Box<dyn DataMonitor>,
        provider: Box<dyn ProviderClient>,
    ) -> Self {
        Self {
            pool,
            monitor,
            provider,
            state: DashboardState::default(),
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    fn apply(&mut self, event: Event) {
        self.state = reduce(std::mem::take(&mut self.state), event);
    }

    /// Resolves operator metadata and loads the first snapshot.
    pub async fn bootstrap(&mut self) -> Result<(), AppError> {
        let operator = self.monitor.operator_name();
        self.apply(Event::OperatorResolved(operator));
        self.refresh().await
    }

    /// Polls the measurement source, appends the sample, checks for a
    /// discrepancy and reloads the snapshot.
    pub async fn capture_usage(&mut self) -> Result<(), AppError> {
        self.apply(Event::LoadStarted);

        let sample = match self.monitor.current_usage().await {
            Ok(sample) => sample,
            Err(e) => {
                self.apply(Event::Failed("failed to capture live usage".to_string()));
                return Err(AppError::Measurement(e.to_string()));
            }
        };

        if let Err(e) = store::insert_usage_sample(&self.pool, &sample).await {
            self.apply(Event::Failed("failed to record usage".to_string()));
            return Err(AppError::Store(e.to_string()));
        }
        metrics::counter!("usage_samples_captured_total").increment(1);

        self.apply(Event::SampleCaptured(sample));
        self.check_discrepancies().await;
        self.refresh().await
    }

    /// Month-to-date reading from the measurement source. `None` means the
    /// platform cannot answer; that surfaces as a message, not a failure.
    pub async fn load_monthly_usage(&mut self) -> Result<(), AppError> {
        self.apply(Event::LoadStarted);

        match self.monitor.current_month_usage().await {
            Ok(Some(sample)) => {
                self.apply(Event::UsageWindowLoaded(sample));
                Ok(())
            }
            Ok(None) => {
                self.apply(Event::Failed("usage permission required".to_string()));
                Ok(())
            }
            Err(e) => {
                self.apply(Event::Failed("failed to read usage".to_string()));
                Err(AppError::Measurement(e.to_string()))
            }
        }
    }

    pub async fn load_usage_for_range(
        &mut self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<(), AppError> {
        self.apply(Event::LoadStarted);

        match self.monitor.usage_in_range(start, end).await {
            Ok(Some(sample)) => {
                self.apply(Event::UsageWindowLoaded(sample));
                Ok(())
            }
            Ok(None) => {
                self.apply(Event::Failed("usage permission required".to_string()));
                Ok(())
            }
            Err(e) => {
                self.apply(Event::Failed("failed to read usage".to_string()));
                Err(AppError::Measurement(e.to_string()))
            }
        }
    }

    /// Fetches a provider report (the stored or live device total is the
    /// baseline hint), appends it, checks for a discrepancy and reloads.
    pub async fn fetch_provider_report(&mut self) -> Result<(), AppError> {
        self.apply(Event::LoadStarted);

        let baseline = if let Some(sample) = &self.state.current_sample {
            sample.total_bytes
        } else {
            match store::latest_usage_sample(&self.pool).await {
                Ok(Some(sample)) => sample.total_bytes,
                Ok(None) => DEFAULT_DEVICE_BASELINE_BYTES,
                Err(e) => {
                    self.apply(Event::Failed("failed to load data".to_string()));
                    return Err(AppError::Store(e.to_string()));
                }
            }
        };

        let report = match self.provider.fetch_report(baseline).await {
            Ok(report) => report,
            Err(e) => {
                self.apply(Event::Failed("failed to fetch provider data".to_string()));
                return Err(AppError::Provider(e.to_string()));
            }
        };

        if let Err(e) = store::insert_provider_report(&self.pool, &report).await {
            self.apply(Event::Failed("failed to record provider data".to_string()));
            return Err(AppError::Store(e.to_string()));
        }
        metrics::counter!("provider_reports_fetched_total").increment(1);

        self.apply(Event::ReportFetched(report));
        self.check_discrepancies().await;
        self.refresh().await
    }

    /// Validates and upserts the plan, then reloads so the summary reflects
    /// the new limits.
    pub async fn save_plan(&mut self, plan: DataPlan) -> Result<(), AppError> {
        if let Err(e) = plan.validate() {
            self.apply(Event::Failed(e.to_string()));
            return Err(AppError::InvalidPlan(e.to_string()));
        }

        if let Err(e) = store::upsert_plan(&self.pool, &plan).await {
            self.apply(Event::Failed("failed to save data plan".to_string()));
            return Err(AppError::Store(e.to_string()));
        }

        self.apply(Event::PlanSaved(plan));
        self.refresh().await
    }

    /// Reads everything back and recomputes the summary.
    pub async fn refresh(&mut self) -> Result<(), AppError> {
        match self.load_snapshot().await {
            Ok(event) => {
                self.apply(event);
                Ok(())
            }
            Err(e) => {
                self.apply(Event::Failed("failed to load data".to_string()));
                Err(AppError::Store(e.to_string()))
            }
        }
    }

    pub fn clear_messages(&mut self) {
        self.apply(Event::MessagesCleared);
    }

    /// Detection failures are logged and swallowed; a failed check must not
    /// take the action that triggered it down with it.
    async fn check_discrepancies(&mut self) {
        let threshold = self
            .state
            .plan
            .as_ref()
            .map(|p| p.discrepancy_threshold_percentage)
            .unwrap_or(DEFAULT_DISCREPANCY_THRESHOLD_PERCENTAGE);

        match store::detect_and_record(&self.pool, threshold, OffsetDateTime::now_utc()).await {
            Ok(Some(discrepancy)) => {
                metrics::counter!("discrepancies_detected_total").increment(1);
                tracing::warn!(
                    severity = discrepancy.severity.as_str(),
                    difference_bytes = discrepancy.difference_bytes,
                    difference_percentage = discrepancy.difference_percentage,
                    "usage discrepancy recorded"
                );
            }
            Ok(None) => {}
            Err(e) => {
                metrics::counter!("store_errors_total").increment(1);
                tracing::warn!(error = %e, "discrepancy check failed");
            }
        }
    }

    async fn load_snapshot(&self) -> anyhow::Result<Event> {
        let plan = store::plan(&self.pool).await?;
        let report = store::latest_provider_report(&self.pool).await?;
        let history = store::all_usage_samples(&self.pool).await?;
        let discrepancies = store::all_discrepancies(&self.pool).await?;

        let latest_sample = history.first().cloned();
        let summary = plan.as_ref().map(|p| {
            engine::compute_summary(
                p,
                report.as_ref(),
                latest_sample.as_ref(),
                OffsetDateTime::now_utc(),
            )
        });

        Ok(Event::SnapshotLoaded {
            plan,
            report,
            summary,
            history,
            discrepancies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::SyntheticMonitor;
    use crate::provider::MockProviderClient;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_app() -> App {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        store::init_schema(&pool).await.expect("schema");

        App::new(
            pool,
            Box::new(SyntheticMonitor::new("Acme Mobile", 100_000_000, 400_000_000)),
            Box::new(MockProviderClient::new("Acme Mobile")),
        )
    }

    #[tokio::test]
    async fn bootstrap_resolves_operator_and_snapshot() {
        let mut app = test_app().await;
        app.bootstrap().await.unwrap();

        let state = app.state();
        assert_eq!(state.operator_name.as_deref(), Some("Acme Mobile"));
        assert!(state.plan.is_none());
        assert!(state.summary.is_none());
    }

    #[tokio::test]
    async fn capture_stores_the_sample_and_reloads_history() {
        let mut app = test_app().await;
        app.capture_usage().await.unwrap();

        let state = app.state();
        assert!(state.current_sample.is_some());
        assert_eq!(state.usage_history.len(), 1);
        assert!(!state.loading);

        let stored = store::latest_usage_sample(&app.pool).await.unwrap();
        assert_eq!(stored, state.current_sample.clone());
    }

    #[tokio::test]
    async fn fetch_records_a_report_and_computes_the_summary() {
        let mut app = test_app().await;
        app.save_plan(DataPlan::new("plan_1", "Acme Mobile", 5_000_000_000, 1))
            .await
            .unwrap();
        app.capture_usage().await.unwrap();
        app.fetch_provider_report().await.unwrap();

        let state = app.state();
        assert!(state.provider_report.is_some());
        let summary = state.summary.as_ref().expect("summary with a plan");
        assert_eq!(summary.data_limit, Some(5_000_000_000));
        assert_eq!(
            summary.provider_reported_usage,
            state.provider_report.as_ref().map(|r| r.reported_bytes)
        );
    }

    #[tokio::test]
    async fn invalid_plans_are_rejected_at_the_boundary() {
        let mut app = test_app().await;
        let result = app
            .save_plan(DataPlan::new("plan_1", "Acme Mobile", 0, 1))
            .await;

        assert!(matches!(result, Err(AppError::InvalidPlan(_))));
        assert!(app.state().error.is_some());
        assert!(store::plan(&app.pool).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn month_load_surfaces_a_sample_from_the_synthetic_monitor() {
        let mut app = test_app().await;
        app.load_monthly_usage().await.unwrap();
        assert!(app.state().current_sample.is_some());
        assert!(app.state().error.is_none());
    }

    #[tokio::test]
    async fn clear_messages_drops_status_and_error() {
        let mut app = test_app().await;
        app.capture_usage().await.unwrap();
        assert!(app.state().status.is_some());

        app.clear_messages();
        assert!(app.state().status.is_none());
        assert!(app.state().error.is_none());
    }
}

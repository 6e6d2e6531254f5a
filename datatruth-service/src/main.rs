use std::time::Duration;

use anyhow::Result;
use datatruth_core::db::usage_queries as store;
use datatruth_core::domain::{bytes_to_gb, DataPlan};
use datatruth_service::{
    app::App,
    config::{AppConfig, MonitorKind},
    metrics_server, observability,
    monitor::{DataMonitor, ProcNetDevMonitor, SyntheticMonitor},
    provider::MockProviderClient,
    state::DashboardState,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr);
    }

    let options = SqliteConnectOptions::new()
        .filename(&cfg.store.path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(cfg.store.max_connections)
        .connect_with(options)
        .await?;
    store::init_schema(&pool).await?;

    let monitor: Box<dyn DataMonitor> = match cfg.monitor.kind {
        MonitorKind::ProcNetDev => Box::new(match &cfg.monitor.proc_net_dev_path {
            Some(path) => ProcNetDevMonitor::with_path(path, &cfg.monitor.operator_name),
            None => ProcNetDevMonitor::new(&cfg.monitor.operator_name),
        }),
        MonitorKind::Synthetic => {
            let rates = cfg.monitor.synthetic.clone().unwrap_or_default();
            Box::new(SyntheticMonitor::new(
                &cfg.monitor.operator_name,
                rates.daily_mobile_bytes,
                rates.daily_wifi_bytes,
            ))
        }
    };
    let provider = Box::new(MockProviderClient::new(cfg.provider.name.clone()));

    let mut app = App::new(pool, monitor, provider);
    app.bootstrap().await?;

    // First start: seed the plan from config so the summary has limits to
    // compute against.
    if app.state().plan.is_none() {
        if let Some(plan_cfg) = &cfg.plan {
            let plan = DataPlan {
                id: format!(
                    "plan_{}",
                    plan_cfg.provider_name.to_lowercase().replace(' ', "_")
                ),
                provider_name: plan_cfg.provider_name.clone(),
                data_limit_bytes: plan_cfg.data_limit_bytes,
                billing_cycle_start_day: plan_cfg.billing_cycle_start_day,
                alert_threshold_percentage: plan_cfg.alert_threshold_percentage,
                discrepancy_threshold_percentage: plan_cfg.discrepancy_threshold_percentage,
            };
            app.save_plan(plan).await?;
            tracing::info!(provider = %plan_cfg.provider_name, "seeded data plan from config");
        }
    }

    match cfg.poll_interval_secs {
        None => {
            run_cycle(&mut app).await;
            println!("{}", serde_json::to_string_pretty(app.state())?);
        }
        Some(secs) => {
            let interval = Duration::from_secs(secs);
            tracing::info!(interval_secs = secs, "polling usage");
            loop {
                run_cycle(&mut app).await;
                tokio::time::sleep(interval).await;
            }
        }
    }

    Ok(())
}

async fn run_cycle(app: &mut App) {
    if let Err(e) = app.capture_usage().await {
        tracing::warn!(error = %e, "usage capture failed");
    }
    if let Err(e) = app.fetch_provider_report().await {
        tracing::warn!(error = %e, "provider fetch failed");
    }
    log_summary(app.state());
}

fn log_summary(state: &DashboardState) {
    let Some(summary) = &state.summary else {
        tracing::info!("no data plan configured; summary unavailable");
        return;
    };

    tracing::info!(
        used_gb = bytes_to_gb(summary.current_cycle_usage),
        percentage_used = summary.percentage_used,
        days_remaining = summary.days_remaining_in_cycle,
        projected_gb = bytes_to_gb(summary.projected_end_of_cycle_usage),
        has_discrepancy = summary.has_discrepancy,
        "usage summary"
    );

    if let Some(plan) = &state.plan {
        if summary.percentage_used >= plan.alert_threshold_percentage {
            tracing::warn!(
                percentage_used = summary.percentage_used,
                alert_threshold = plan.alert_threshold_percentage,
                "plan usage crossed the alert threshold"
            );
        }
    }

    for d in &state.recent_discrepancies {
        tracing::info!(
            id = %d.id,
            severity = d.severity.as_str(),
            difference_bytes = d.difference_bytes,
            "recent discrepancy"
        );
    }
}

//! Usage record store: append-only SQLite tables for samples, reports and
//! discrepancies, plus the provider-keyed plan upsert.
//!
//! Timestamps are stored as unix milliseconds. Rows are mapped to domain
//! records by hand; the store holds no business logic beyond
//! [`detect_and_record`], which composes the latest readings with the pure
//! engine and persists the outcome.

use anyhow::Result;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use time::OffsetDateTime;

use crate::domain::{
    from_unix_millis, unix_millis, DataPlan, DeviceUsageSample, Discrepancy, ProviderReport,
    SampleSource, Severity,
};
use crate::engine;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS device_usage_sample (
        id TEXT PRIMARY KEY NOT NULL,
        timestamp INTEGER NOT NULL,
        mobile_bytes INTEGER NOT NULL,
        wifi_bytes INTEGER NOT NULL,
        total_bytes INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS provider_report (
        id TEXT PRIMARY KEY NOT NULL,
        timestamp INTEGER NOT NULL,
        reported_bytes INTEGER NOT NULL,
        remaining_bytes INTEGER,
        data_limit_bytes INTEGER,
        provider_name TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS discrepancy (
        id TEXT PRIMARY KEY NOT NULL,
        timestamp INTEGER NOT NULL,
        device_measurement INTEGER NOT NULL,
        provider_report INTEGER NOT NULL,
        difference_bytes INTEGER NOT NULL,
        difference_percentage REAL NOT NULL,
        severity TEXT NOT NULL,
        note TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS data_plan (
        id TEXT NOT NULL,
        provider_name TEXT PRIMARY KEY NOT NULL,
        data_limit_bytes INTEGER NOT NULL,
        billing_cycle_start_day INTEGER NOT NULL,
        alert_threshold_percentage REAL NOT NULL,
        discrepancy_threshold_percentage REAL NOT NULL
    )
    "#,
];

pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

pub async fn insert_usage_sample(pool: &SqlitePool, sample: &DeviceUsageSample) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO device_usage_sample (id, timestamp, mobile_bytes, wifi_bytes, total_bytes)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&sample.id)
    .bind(unix_millis(sample.timestamp))
    .bind(sample.mobile_bytes)
    .bind(sample.wifi_bytes)
    .bind(sample.total_bytes)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn insert_provider_report(pool: &SqlitePool, report: &ProviderReport) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO provider_report
            (id, timestamp, reported_bytes, remaining_bytes, data_limit_bytes, provider_name)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&report.id)
    .bind(unix_millis(report.timestamp))
    .bind(report.reported_bytes)
    .bind(report.remaining_bytes)
    .bind(report.data_limit_bytes)
    .bind(&report.provider_name)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn insert_discrepancy(pool: &SqlitePool, discrepancy: &Discrepancy) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO discrepancy
            (id, timestamp, device_measurement, provider_report,
             difference_bytes, difference_percentage, severity, note)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&discrepancy.id)
    .bind(unix_millis(discrepancy.timestamp))
    .bind(discrepancy.device_measurement)
    .bind(discrepancy.provider_report)
    .bind(discrepancy.difference_bytes)
    .bind(discrepancy.difference_percentage)
    .bind(discrepancy.severity.as_str())
    .bind(&discrepancy.note)
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert-or-replace keyed by provider name. Last writer wins; the plan is a
/// singleton per provider.
pub async fn upsert_plan(pool: &SqlitePool, plan: &DataPlan) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO data_plan
            (id, provider_name, data_limit_bytes, billing_cycle_start_day,
             alert_threshold_percentage, discrepancy_threshold_percentage)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(provider_name) DO UPDATE SET
            id = excluded.id,
            data_limit_bytes = excluded.data_limit_bytes,
            billing_cycle_start_day = excluded.billing_cycle_start_day,
            alert_threshold_percentage = excluded.alert_threshold_percentage,
            discrepancy_threshold_percentage = excluded.discrepancy_threshold_percentage
        "#,
    )
    .bind(&plan.id)
    .bind(&plan.provider_name)
    .bind(plan.data_limit_bytes)
    .bind(i64::from(plan.billing_cycle_start_day))
    .bind(plan.alert_threshold_percentage)
    .bind(plan.discrepancy_threshold_percentage)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn latest_usage_sample(pool: &SqlitePool) -> Result<Option<DeviceUsageSample>> {
    let row = sqlx::query(
        r#"
        SELECT id, timestamp, mobile_bytes, wifi_bytes, total_bytes
        FROM device_usage_sample
        ORDER BY timestamp DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(sample_from_row).transpose()
}

pub async fn latest_provider_report(pool: &SqlitePool) -> Result<Option<ProviderReport>> {
    let row = sqlx::query(
        r#"
        SELECT id, timestamp, reported_bytes, remaining_bytes, data_limit_bytes, provider_name
        FROM provider_report
        ORDER BY timestamp DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(report_from_row).transpose()
}

/// All samples, most recent first.
pub async fn all_usage_samples(pool: &SqlitePool) -> Result<Vec<DeviceUsageSample>> {
    let rows = sqlx::query(
        r#"
        SELECT id, timestamp, mobile_bytes, wifi_bytes, total_bytes
        FROM device_usage_sample
        ORDER BY timestamp DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(sample_from_row).collect()
}

/// All discrepancies, most recent first.
pub async fn all_discrepancies(pool: &SqlitePool) -> Result<Vec<Discrepancy>> {
    let rows = sqlx::query(
        r#"
        SELECT id, timestamp, device_measurement, provider_report,
               difference_bytes, difference_percentage, severity, note
        FROM discrepancy
        ORDER BY timestamp DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(discrepancy_from_row).collect()
}

pub async fn plan(pool: &SqlitePool) -> Result<Option<DataPlan>> {
    let row = sqlx::query(
        r#"
        SELECT id, provider_name, data_limit_bytes, billing_cycle_start_day,
               alert_threshold_percentage, discrepancy_threshold_percentage
        FROM data_plan
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(plan_from_row).transpose()
}

/// Sum of sampled totals in the half-open range `[start, end)`. 0 when no
/// samples fall inside.
pub async fn total_usage_in_range(
    pool: &SqlitePool,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> Result<i64> {
    let row = sqlx::query(
        r#"
        SELECT COALESCE(SUM(total_bytes), 0) AS total_usage
        FROM device_usage_sample
        WHERE timestamp >= ?1
          AND timestamp <  ?2
        "#,
    )
    .bind(unix_millis(start))
    .bind(unix_millis(end))
    .fetch_one(pool)
    .await?;

    Ok(row.try_get("total_usage")?)
}

/// Reads the latest sample and report, evaluates the gap, and appends the
/// resulting discrepancy when one is produced. Missing readings on either
/// side mean nothing to reconcile.
///
/// Each qualifying call appends one row; there is no deduplication against
/// earlier records for the same pair.
pub async fn detect_and_record(
    pool: &SqlitePool,
    threshold_percent: f64,
    now: OffsetDateTime,
) -> Result<Option<Discrepancy>> {
    let Some(sample) = latest_usage_sample(pool).await? else {
        return Ok(None);
    };
    let Some(report) = latest_provider_report(pool).await? else {
        return Ok(None);
    };

    match engine::evaluate_discrepancy(&sample, &report, threshold_percent, now) {
        Some(discrepancy) => {
            insert_discrepancy(pool, &discrepancy).await?;
            Ok(Some(discrepancy))
        }
        None => Ok(None),
    }
}

fn sample_from_row(row: &SqliteRow) -> Result<DeviceUsageSample> {
    Ok(DeviceUsageSample {
        id: row.try_get("id")?,
        timestamp: from_unix_millis(row.try_get("timestamp")?)?,
        mobile_bytes: row.try_get("mobile_bytes")?,
        wifi_bytes: row.try_get("wifi_bytes")?,
        total_bytes: row.try_get("total_bytes")?,
        source: SampleSource::Device,
    })
}

fn report_from_row(row: &SqliteRow) -> Result<ProviderReport> {
    Ok(ProviderReport {
        id: row.try_get("id")?,
        timestamp: from_unix_millis(row.try_get("timestamp")?)?,
        reported_bytes: row.try_get("reported_bytes")?,
        remaining_bytes: row.try_get("remaining_bytes")?,
        data_limit_bytes: row.try_get("data_limit_bytes")?,
        provider_name: row.try_get("provider_name")?,
        source: SampleSource::Provider,
    })
}

fn discrepancy_from_row(row: &SqliteRow) -> Result<Discrepancy> {
    let severity: String = row.try_get("severity")?;
    Ok(Discrepancy {
        id: row.try_get("id")?,
        timestamp: from_unix_millis(row.try_get("timestamp")?)?,
        device_measurement: row.try_get("device_measurement")?,
        provider_report: row.try_get("provider_report")?,
        difference_bytes: row.try_get("difference_bytes")?,
        difference_percentage: row.try_get("difference_percentage")?,
        severity: severity.parse::<Severity>()?,
        note: row.try_get("note")?,
    })
}

fn plan_from_row(row: &SqliteRow) -> Result<DataPlan> {
    let day: i64 = row.try_get("billing_cycle_start_day")?;
    Ok(DataPlan {
        id: row.try_get("id")?,
        provider_name: row.try_get("provider_name")?,
        data_limit_bytes: row.try_get("data_limit_bytes")?,
        billing_cycle_start_day: u8::try_from(day)?,
        alert_threshold_percentage: row.try_get("alert_threshold_percentage")?,
        discrepancy_threshold_percentage: row.try_get("discrepancy_threshold_percentage")?,
    })
}

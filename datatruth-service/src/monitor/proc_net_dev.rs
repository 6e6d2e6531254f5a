use std::path::PathBuf;

use async_trait::async_trait;
use datatruth_core::domain::DeviceUsageSample;
use time::OffsetDateTime;

use crate::monitor::{new_sample_id, DataMonitor, MonitorError};

/// Interface-name prefixes counted as mobile data.
const MOBILE_IFACE_PREFIXES: &[&str] = &["rmnet", "wwan", "ccmni"];

/// Precise measurement source backed by the kernel's per-interface byte
/// counters in `/proc/net/dev`.
///
/// Counters are cumulative since boot, so a sample is "usage so far", not a
/// window. There is no historical accounting behind this file: the range and
/// month queries answer `None` and callers fall back to stored samples.
pub struct ProcNetDevMonitor {
    path: PathBuf,
    operator: String,
}

#[derive(Debug, PartialEq, Eq)]
struct InterfaceCounters {
    mobile_bytes: i64,
    total_bytes: i64,
    mobile_iface_seen: bool,
}

impl ProcNetDevMonitor {
    pub fn new(operator: impl Into<String>) -> Self {
        Self::with_path("/proc/net/dev", operator)
    }

    pub fn with_path(path: impl Into<PathBuf>, operator: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            operator: operator.into(),
        }
    }

    fn read_counters(&self) -> Result<InterfaceCounters, MonitorError> {
        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            MonitorError::Unavailable(format!("cannot read {}: {e}", self.path.display()))
        })?;
        parse_counters(&contents)
    }
}

fn is_mobile_interface(name: &str) -> bool {
    MOBILE_IFACE_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Parses `/proc/net/dev`: two header lines, then one line per interface
/// with the name before a colon and 16 numeric columns after it, of which
/// column 0 is received bytes and column 8 is transmitted bytes.
fn parse_counters(contents: &str) -> Result<InterfaceCounters, MonitorError> {
    let mut mobile_bytes = 0i64;
    let mut total_bytes = 0i64;
    let mut mobile_iface_seen = false;

    for line in contents.lines().skip(2) {
        let Some((name, fields)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() || name == "lo" {
            continue;
        }

        let fields: Vec<&str> = fields.split_whitespace().collect();
        if fields.len() < 9 {
            return Err(MonitorError::Unavailable(format!(
                "malformed counter line for interface '{name}'"
            )));
        }
        let rx: i64 = fields[0].parse().map_err(|_| {
            MonitorError::Unavailable(format!("bad rx byte count for interface '{name}'"))
        })?;
        let tx: i64 = fields[8].parse().map_err(|_| {
            MonitorError::Unavailable(format!("bad tx byte count for interface '{name}'"))
        })?;

        let bytes = rx + tx;
        total_bytes += bytes;
        if is_mobile_interface(name) {
            mobile_bytes += bytes;
            mobile_iface_seen = true;
        }
    }

    Ok(InterfaceCounters {
        mobile_bytes,
        total_bytes,
        mobile_iface_seen,
    })
}

#[async_trait]
impl DataMonitor for ProcNetDevMonitor {
    async fn current_usage(&self) -> Result<DeviceUsageSample, MonitorError> {
        let counters = self.read_counters()?;
        // The kernel cannot split non-mobile traffic further; WiFi is the
        // remainder, clamped so it never goes negative.
        let wifi_bytes = (counters.total_bytes - counters.mobile_bytes).max(0);

        Ok(DeviceUsageSample::new(
            new_sample_id(),
            OffsetDateTime::now_utc(),
            counters.mobile_bytes,
            wifi_bytes,
        ))
    }

    async fn usage_in_range(
        &self,
        _start: OffsetDateTime,
        _end: OffsetDateTime,
    ) -> Result<Option<DeviceUsageSample>, MonitorError> {
        // No per-range accounting behind /proc/net/dev.
        Ok(None)
    }

    async fn current_month_usage(&self) -> Result<Option<DeviceUsageSample>, MonitorError> {
        Ok(None)
    }

    fn operator_name(&self) -> String {
        self.operator.clone()
    }

    fn has_mobile_data_capability(&self) -> bool {
        self.read_counters()
            .map(|c| c.mobile_iface_seen)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:    1000      10    0    0    0     0          0         0     1000      10    0    0    0     0       0          0
 wlan0:   60000     600    0    0    0     0          0         0    40000     400    0    0    0     0       0          0
rmnet0:   30000     300    0    0    0     0          0         0    20000     200    0    0    0     0       0          0
";

    #[test]
    fn splits_mobile_from_the_rest_and_skips_loopback() {
        let counters = parse_counters(SAMPLE).unwrap();
        assert_eq!(counters.mobile_bytes, 50_000);
        assert_eq!(counters.total_bytes, 150_000);
        assert!(counters.mobile_iface_seen);
    }

    #[test]
    fn rejects_malformed_counter_lines() {
        let broken = "header\nheader\n wlan0: 1 2 3\n";
        assert!(matches!(
            parse_counters(broken),
            Err(MonitorError::Unavailable(_))
        ));
    }

    #[test]
    fn no_mobile_interface_means_no_capability() {
        let wifi_only = "\
header
header
 wlan0:   60000     600    0    0    0     0          0         0    40000     400    0    0    0     0       0          0
";
        let counters = parse_counters(wifi_only).unwrap();
        assert_eq!(counters.mobile_bytes, 0);
        assert!(!counters.mobile_iface_seen);
    }

    #[tokio::test]
    async fn current_usage_reads_the_backing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let monitor = ProcNetDevMonitor::with_path(file.path(), "Acme Mobile");
        let sample = monitor.current_usage().await.unwrap();

        assert_eq!(sample.mobile_bytes, 50_000);
        assert_eq!(sample.wifi_bytes, 100_000);
        assert_eq!(sample.total_bytes, 150_000);
        assert!(sample.id.starts_with("usage_"));
        assert!(monitor.has_mobile_data_capability());
        assert_eq!(monitor.operator_name(), "Acme Mobile");
    }

    #[tokio::test]
    async fn range_queries_are_unsupported() {
        let monitor = ProcNetDevMonitor::new("Acme Mobile");
        let start = OffsetDateTime::UNIX_EPOCH;
        let end = OffsetDateTime::now_utc();
        assert_eq!(monitor.usage_in_range(start, end).await.unwrap(), None);
        assert_eq!(monitor.current_month_usage().await.unwrap(), None);
    }
}

use anyhow::{Context, Result};
use kwcluster_core::stats::FetchStats;
use kwcluster_core::{FetchPath, Notification, SharedNotifications};
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("Failed to serialize output")?;
    println!("{}", text);
    Ok(())
}

/// Take every pending notification, most important first.
pub fn drain_notifications(queue: &SharedNotifications) -> Vec<Notification> {
    queue.lock().drain()
}

/// One-line summary of how fetches were served, for `--fetch-stats`.
pub fn format_fetch_stats(stats: &FetchStats) -> String {
    let paths = [
        FetchPath::Cache,
        FetchPath::LocalFiltered,
        FetchPath::Bulk,
        FetchPath::Server,
    ]
    .iter()
    .map(|path| format!("{} {}", path.as_str(), stats.count(*path)))
    .collect::<Vec<_>>()
    .join(", ");
    format!(
        "fetches: {} ({}), failures: {}, served locally: {:.0}%",
        stats.total,
        paths,
        stats.failures,
        stats.local_ratio() * 100.0
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use kwcluster_core::models::View;
    use kwcluster_core::NotificationQueue;

    #[test]
    fn test_format_fetch_stats() {
        let mut stats = FetchStats::new();
        stats.record(FetchPath::Server, View::Grouped);
        stats.record(FetchPath::Cache, View::Grouped);
        stats.record_failure();

        assert_eq!(
            format_fetch_stats(&stats),
            "fetches: 2 (cache 1, local 0, bulk 0, server 1), failures: 1, served locally: 50%"
        );
    }

    #[test]
    fn test_drain_empties_queue() {
        let queue = NotificationQueue::shared();
        queue.lock().push(Notification::info("loaded"));
        queue.lock().push(Notification::warning("slow response"));

        let drained = drain_notifications(&queue);
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].message, "slow response");
        assert!(queue.lock().is_empty());
    }
}

use std::io::Write;

use parking_lot::Mutex;

use crate::metrics::snapshot::ShardedMetricsSnapshot;
use crate::metrics::traits::MetricsExporter;

/// Prometheus text exporter for sharded cache snapshots.
///
/// Writes the Prometheus text exposition format so the output can be scraped
/// directly or forwarded to a collector. Write errors are dropped: a failing
/// metrics sink must not affect the cache.
#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write + Send> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> PrometheusTextExporter<W> {
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the exporter, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_metric(&self, kind: &str, suffix: &str, value: u64) {
        let name = self.metric_name(suffix);
        let mut writer = self.writer.lock();
        let _ = writeln!(writer, "# TYPE {} {}", name, kind);
        let _ = writeln!(writer, "{} {}", name, value);
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}

impl<W: Write + Send> MetricsExporter<ShardedMetricsSnapshot> for PrometheusTextExporter<W> {
    fn export(&self, snapshot: &ShardedMetricsSnapshot) {
        self.write_metric("counter", "optimistic_reads_total", snapshot.optimistic_reads);
        self.write_metric("counter", "read_fallbacks_total", snapshot.read_fallbacks);
        self.write_metric("counter", "exclusive_writes_total", snapshot.exclusive_writes);
        self.write_metric("counter", "shard_allocations_total", snapshot.shard_allocations);
        self.write_metric("counter", "get_hits_total", snapshot.get_hits);
        self.write_metric("counter", "get_misses_total", snapshot.get_misses);
        self.write_metric("counter", "evictions_total", snapshot.evictions);
        self.write_metric("gauge", "len", snapshot.len as u64);
        self.write_metric("gauge", "allocated_shards", snapshot.allocated_shards as u64);
        self.write_metric("gauge", "shard_count", snapshot.shard_count as u64);
        self.write_metric("gauge", "max_len", snapshot.max_len as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_prefixed_counters_and_gauges() {
        let exporter = PrometheusTextExporter::new("shardkit", Vec::new());
        exporter.export(&ShardedMetricsSnapshot {
            get_hits: 5,
            len: 3,
            ..Default::default()
        });

        let text = String::from_utf8(exporter.into_inner()).unwrap();
        assert!(text.contains("# TYPE shardkit_get_hits_total counter\nshardkit_get_hits_total 5\n"));
        assert!(text.contains("# TYPE shardkit_len gauge\nshardkit_len 3\n"));
    }

    #[test]
    fn empty_prefix_uses_bare_names() {
        let exporter = PrometheusTextExporter::new("", Vec::new());
        exporter.export(&ShardedMetricsSnapshot::default());

        let text = String::from_utf8(exporter.into_inner()).unwrap();
        assert!(text.contains("\nevictions_total 0\n"));
    }
}

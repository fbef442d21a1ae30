pub mod counters;
pub mod exporter;
pub mod snapshot;
pub mod traits;

pub use exporter::PrometheusTextExporter;
pub use snapshot::ShardedMetricsSnapshot;
pub use traits::{MetricsExporter, MetricsReset, MetricsSnapshotProvider};

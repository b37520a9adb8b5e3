//! Rendering of the samples of one scrape in the Prometheus text format.

use crate::{
    catalog::{
        Family,
        MetricCatalog,
    },
    sink::Sample,
};
use prometheus::{
    GaugeVec,
    Opts,
    Registry,
    TextEncoder,
};
use std::collections::BTreeMap;

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Only families with at least one sample are rendered. A fresh registry per call keeps label values of a
/// previous scrape from leaking into this one. The `process_*` metrics of the exporter itself come along on Linux.
pub fn render(catalog: &MetricCatalog, samples: &[Sample]) -> prometheus::Result<String> {
    let registry = Registry::new();
    #[cfg(target_os = "linux")]
    registry.register(Box::new(prometheus::process_collector::ProcessCollector::for_self()))?;
    let mut gauges = BTreeMap::<Family, GaugeVec>::new();

    for sample in samples {
        if !gauges.contains_key(&sample.family) {
            let descriptor = catalog.get(sample.family);
            let gauge = GaugeVec::new(
                Opts::new(descriptor.name.as_str(), descriptor.help.as_str()),
                descriptor.label_names,
            )?;
            registry.register(Box::new(gauge.clone()))?;
            gauges.insert(sample.family, gauge);
        }

        let labels: Vec<&str> = sample.labels.iter().map(String::as_str).collect();
        gauges[&sample.family]
            .get_metric_with_label_values(&labels)?
            .set(sample.value);
    }

    TextEncoder::new().encode_to_string(&registry.gather())
}

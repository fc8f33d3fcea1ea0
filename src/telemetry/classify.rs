use std::net::Ipv4Addr;

use super::parser::FlowSample;

/// Returns the sources whose rate meets the threshold, in first-seen order.
///
/// The boundary is inclusive: a line at exactly the threshold counts as
/// active. A source appearing on several rows in one frame (one per
/// destination pair) yields a single entry.
pub fn active_sources(samples: &[FlowSample], threshold_kbps: f64) -> Vec<Ipv4Addr> {
    let mut active = Vec::new();
    for sample in samples {
        if sample.kbps >= threshold_kbps && !active.contains(&sample.src) {
            active.push(sample.src);
        }
    }
    active
}

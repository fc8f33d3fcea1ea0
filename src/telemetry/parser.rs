use std::net::Ipv4Addr;

use once_cell::sync::Lazy;
use regex::Regex;

/// One torch table row: the `ip` protocol tag, a source address, a
/// destination address (not captured beyond matching), a decimal magnitude
/// and its unit suffix. Everything around a row is screen noise.
static FLOW_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"ip\s*((?:[0-9]{1,3}\.){3}[0-9]{1,3})\s*(?:[0-9]{1,3}\.){3}[0-9]{1,3}\s*([0-9]+(?:\.[0-9]+)?)(bps|kbps|mbps)",
    )
    .unwrap()
});

/// One parsed telemetry sample, rate already normalized to kbps.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSample {
    pub src: Ipv4Addr,
    pub kbps: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RateUnit {
    Bps,
    Kbps,
    Mbps,
}

impl RateUnit {
    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "bps" => Some(Self::Bps),
            "kbps" => Some(Self::Kbps),
            "mbps" => Some(Self::Mbps),
            _ => None,
        }
    }

    fn to_kbps(self, value: f64) -> f64 {
        match self {
            Self::Bps => value / 1000.0,
            Self::Kbps => value,
            Self::Mbps => value * 1000.0,
        }
    }
}

/// Extracts every flow row from one frame of torch output.
///
/// Matching is non-overlapping and left to right, so samples come back in
/// the order torch printed them. ANSI control sequences, column headers and
/// any other text between rows are skipped rather than treated as errors. A
/// row whose magnitude fails to parse, or whose source octets overflow an
/// IPv4 address, is dropped without aborting the rest of the frame.
pub fn parse_frame(frame: &str) -> Vec<FlowSample> {
    FLOW_ROW
        .captures_iter(frame)
        .filter_map(|caps| {
            let src: Ipv4Addr = caps[1].parse().ok()?;
            let value: f64 = caps[2].parse().ok()?;
            let unit = RateUnit::from_suffix(&caps[3])?;
            Some(FlowSample {
                src,
                kbps: unit.to_kbps(value),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_row() {
        let samples = parse_frame("ip 10.0.0.5 10.0.0.1 512kbps");
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].src, Ipv4Addr::new(10, 0, 0, 5));
        assert_eq!(samples[0].kbps, 512.0);
    }

    #[test]
    fn test_unit_normalization_is_linear() {
        let mbps = parse_frame("ip 10.0.0.5 10.0.0.1 2mbps");
        let kbps = parse_frame("ip 10.0.0.5 10.0.0.1 2000kbps");
        let bps = parse_frame("ip 10.0.0.5 10.0.0.1 2000000bps");
        assert_eq!(mbps[0].kbps, 2000.0);
        assert!((mbps[0].kbps - kbps[0].kbps).abs() < 1e-9);
        assert!((mbps[0].kbps - bps[0].kbps).abs() < 1e-9);
    }

    #[test]
    fn test_decimal_magnitudes() {
        let samples = parse_frame("ip 10.0.0.7 10.0.0.1 1.5mbps");
        assert_eq!(samples[0].kbps, 1500.0);
    }

    #[test]
    fn test_rows_amid_screen_noise() {
        let frame = "\x1b[2J\x1b[H SRC  DST  TX\r\n\
                     ip  10.0.0.5  203.0.113.9  512kbps\r\n\
                     garbage between rows 42\r\n\
                     ip  10.0.0.9  203.0.113.9  2mbps\r\n";
        let samples = parse_frame(frame);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].src, Ipv4Addr::new(10, 0, 0, 5));
        assert_eq!(samples[1].src, Ipv4Addr::new(10, 0, 0, 9));
        assert_eq!(samples[1].kbps, 2000.0);
    }

    #[test]
    fn test_order_preserved() {
        let frame = "ip 10.0.0.9 10.0.0.1 1kbps ip 10.0.0.5 10.0.0.1 2kbps";
        let sources: Vec<_> = parse_frame(frame).into_iter().map(|s| s.src).collect();
        assert_eq!(
            sources,
            vec![Ipv4Addr::new(10, 0, 0, 9), Ipv4Addr::new(10, 0, 0, 5)]
        );
    }

    #[test]
    fn test_overflowing_octet_dropped() {
        // Three digits per octet satisfies the pattern but 999 is not a
        // valid IPv4 octet; the row is skipped, the frame is not.
        let frame = "ip 999.0.0.1 10.0.0.1 512kbps ip 10.0.0.5 10.0.0.1 512kbps";
        let samples = parse_frame(frame);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].src, Ipv4Addr::new(10, 0, 0, 5));
    }

    #[test]
    fn test_empty_frame_yields_nothing() {
        assert!(parse_frame("").is_empty());
        assert!(parse_frame("no rows here at all").is_empty());
    }
}

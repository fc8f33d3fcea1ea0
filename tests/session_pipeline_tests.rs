use std::net::Ipv4Addr;
use std::path::PathBuf;

use torchlight::config::{Config, LightConfig, PaletteConfig, RouterConfig};
use torchlight::device::MockLamp;
use torchlight::palette::{ColorCache, MemoryStore};
use torchlight::session::Monitor;
use torchlight::telemetry::{active_sources, parse_frame};

fn test_config(threshold_kbps: f64) -> Config {
    Config {
        router: RouterConfig {
            host: "192.168.88.1".to_string(),
            user: "monitor".to_string(),
            port: 22,
        },
        voip_server: Ipv4Addr::new(203, 0, 113, 9),
        activity_threshold_kbps: threshold_kbps,
        refresh_interval_secs: 30.0,
        frame_sentinel: "Q quit".to_string(),
        light: LightConfig {
            label: "Office".to_string(),
            saturation: 1.0,
            brightness: 0.7,
            kelvin: 3500,
            fade_secs: 0.25,
        },
        palette: PaletteConfig {
            phone_lines: 6,
            path: PathBuf::from("unused.json"),
        },
    }
}

fn monitor(threshold_kbps: f64, lamp: &MockLamp) -> Monitor {
    let config = test_config(threshold_kbps);
    let cache = ColorCache::open(Box::new(MemoryStore::new()), config.palette.phone_lines)
        .expect("cache opens");
    Monitor::new(&config, cache, Box::new(lamp.clone()))
}

#[test]
fn test_two_active_lines_classified_in_order() {
    let frame = "ip 10.0.0.5 10.0.0.1 512kbps\nip 10.0.0.9 10.0.0.1 2mbps\n";
    let active = active_sources(&parse_frame(frame), 100.0);
    assert_eq!(
        active,
        vec![Ipv4Addr::new(10, 0, 0, 5), Ipv4Addr::new(10, 0, 0, 9)]
    );
}

#[tokio::test]
async fn test_active_frame_lights_the_lamp() {
    let lamp = MockLamp::new();
    let mut monitor = monitor(100.0, &lamp);

    monitor
        .handle_chunk("ip 10.0.0.5 10.0.0.1 512kbps\nip 10.0.0.9 10.0.0.1 2mbps\nQ quit")
        .await
        .unwrap();

    let calls = lamp.calls();
    assert_eq!(calls.len(), 1);
    let (color, fade) = calls[0];
    assert!((0.0..360.0).contains(&color.hue));
    assert_eq!(color.saturation, 1.0);
    assert_eq!(color.brightness, 0.7);
    assert_eq!(color.kelvin, 3500);
    assert_eq!(fade.as_millis(), 250);
}

#[tokio::test]
async fn test_quiet_frame_emits_off_color() {
    let lamp = MockLamp::new();
    let mut monitor = monitor(100.0, &lamp);

    monitor
        .handle_chunk("ip 10.0.0.5 10.0.0.1 50kbps\nQ quit")
        .await
        .unwrap();

    let calls = lamp.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0.saturation, 0.0);
    assert_eq!(calls[0].0.brightness, 0.0);
}

#[tokio::test]
async fn test_sentinel_split_across_chunks() {
    let lamp = MockLamp::new();
    let mut monitor = monitor(100.0, &lamp);

    // The boundary marker straddles the two chunks; the first frame must
    // complete exactly once and the second must keep all its bytes.
    monitor
        .handle_chunk("ip 10.0.0.5 10.0.0.1 512kbps\nQ qu")
        .await
        .unwrap();
    assert_eq!(lamp.calls().len(), 1);

    monitor
        .handle_chunk("it ip 10.0.0.5 10.0.0.1 512kbps\nip 10.0.0.9 10.0.0.1 2mbps\nQ quit")
        .await
        .unwrap();

    let calls = lamp.calls();
    assert_eq!(calls.len(), 2);
    // Two active lines in the second frame, so its count change passed the
    // gate and its color is the lit one.
    assert!(calls[1].0.saturation > 0.0);
}

#[tokio::test]
async fn test_unchanged_count_suppressed() {
    let lamp = MockLamp::new();
    let mut monitor = monitor(100.0, &lamp);

    let frame = "ip 10.0.0.5 10.0.0.1 512kbps\nQ quit";
    monitor.handle_chunk(frame).await.unwrap();
    monitor.handle_chunk(frame).await.unwrap();
    monitor.handle_chunk(frame).await.unwrap();

    assert_eq!(lamp.calls().len(), 1);
}

#[tokio::test]
async fn test_count_change_pushes_immediately() {
    let lamp = MockLamp::new();
    let mut monitor = monitor(100.0, &lamp);

    monitor
        .handle_chunk("ip 10.0.0.5 10.0.0.1 512kbps\nQ quit")
        .await
        .unwrap();
    monitor
        .handle_chunk("ip 10.0.0.5 10.0.0.1 512kbps\nip 10.0.0.9 10.0.0.1 2mbps\nQ quit")
        .await
        .unwrap();
    monitor
        .handle_chunk("ip 10.0.0.9 10.0.0.1 40kbps\nQ quit")
        .await
        .unwrap();

    assert_eq!(lamp.calls().len(), 3);
    assert_eq!(lamp.calls()[2].0.brightness, 0.0);
}

#[tokio::test]
async fn test_lamp_failure_is_not_fatal() {
    let lamp = MockLamp::new();
    let mut monitor = monitor(100.0, &lamp);
    lamp.fail_next(1);

    monitor
        .handle_chunk("ip 10.0.0.5 10.0.0.1 512kbps\nQ quit")
        .await
        .expect("device failure must not kill the pipeline");
    assert!(lamp.calls().is_empty());

    // The next accepted state goes through once the device recovers.
    monitor
        .handle_chunk("ip 10.0.0.5 10.0.0.1 512kbps\nip 10.0.0.9 10.0.0.1 2mbps\nQ quit")
        .await
        .unwrap();
    assert_eq!(lamp.calls().len(), 1);
}

#[tokio::test]
async fn test_stable_line_keeps_its_hue_across_frames() {
    let lamp = MockLamp::new();
    let mut monitor = monitor(100.0, &lamp);

    monitor
        .handle_chunk("ip 10.0.0.5 10.0.0.1 512kbps\nQ quit")
        .await
        .unwrap();
    monitor
        .handle_chunk("ip 10.0.0.5 10.0.0.1 512kbps\nip 10.0.0.9 10.0.0.1 2mbps\nQ quit")
        .await
        .unwrap();
    monitor
        .handle_chunk("ip 10.0.0.5 10.0.0.1 512kbps\nQ quit")
        .await
        .unwrap();

    let calls = lamp.calls();
    assert_eq!(calls.len(), 3);
    // Alone both times, line .5 must produce the identical hue.
    assert_eq!(calls[0].0.hue, calls[2].0.hue);
}

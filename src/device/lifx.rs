use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::debug;

use super::{Hsbk, Lamp};

pub const LIFX_PORT: u16 = 56700;
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

const SEND_TIMEOUT: Duration = Duration::from_secs(2);
const HEADER_LEN: usize = 36;

// Frame flags: protocol number 1024, addressable bit, and the tagged bit
// for broadcasts addressed to every device.
const PROTOCOL: u16 = 1024;
const ADDRESSABLE: u16 = 1 << 12;
const TAGGED: u16 = 1 << 13;

const GET_SERVICE: u16 = 2;
const STATE_SERVICE: u16 = 3;
const GET_LABEL: u16 = 23;
const STATE_LABEL: u16 = 25;
const SET_COLOR: u16 = 102;

const SERVICE_UDP: u8 = 1;

/// One LIFX bulb addressed over the LAN protocol.
pub struct LifxLamp {
    socket: UdpSocket,
    addr: SocketAddr,
    target: [u8; 8],
    source: u32,
    sequence: u8,
}

impl LifxLamp {
    /// Finds the bulb carrying `label` by broadcasting `GetService` and
    /// interrogating each responder for its label. Blocks until the lamp is
    /// found or the timeout expires; a miss is an error, since without a
    /// device the whole monitor is pointless.
    pub async fn discover(label: &str, timeout: Duration) -> Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", 0))
            .await
            .context("Failed to bind discovery socket")?;
        socket
            .set_broadcast(true)
            .context("Failed to enable broadcast")?;

        // Random client identifier so replies can be told apart from other
        // LAN clients' traffic.
        let source: u32 = rand::random();

        let probe = encode_packet(GET_SERVICE, [0u8; 8], true, true, 0, source, &[]);
        socket
            .send_to(&probe, ("255.255.255.255", LIFX_PORT))
            .await
            .context("Failed to broadcast discovery probe")?;

        let deadline = tokio::time::Instant::now() + timeout;
        let mut buf = [0u8; 256];
        let mut probed: Vec<SocketAddr> = Vec::new();

        loop {
            let remaining = deadline
                .checked_duration_since(tokio::time::Instant::now())
                .ok_or_else(|| anyhow!("No lamp labelled {label:?} answered discovery"))?;
            let received = tokio::time::timeout(remaining, socket.recv_from(&mut buf))
                .await
                .map_err(|_| anyhow!("No lamp labelled {label:?} answered discovery"))?;
            let (len, peer) = received.context("Discovery socket read failed")?;

            let Some(packet) = decode_packet(&buf[..len]) else {
                continue;
            };

            match packet.msg_type {
                STATE_SERVICE => {
                    let (service, port) = match decode_state_service(packet.payload) {
                        Some(fields) => fields,
                        None => continue,
                    };
                    if service != SERVICE_UDP {
                        continue;
                    }
                    let device = SocketAddr::new(peer.ip(), port);
                    if probed.contains(&device) {
                        continue;
                    }
                    probed.push(device);
                    debug!(%device, "interrogating discovered device");

                    let query =
                        encode_packet(GET_LABEL, packet.target, false, true, 0, source, &[]);
                    socket
                        .send_to(&query, device)
                        .await
                        .context("Failed to query device label")?;
                }
                STATE_LABEL => {
                    if decode_label(packet.payload) == label {
                        return Ok(Self {
                            socket,
                            addr: peer,
                            target: packet.target,
                            source,
                            sequence: 0,
                        });
                    }
                }
                _ => {}
            }
        }
    }

    pub fn addr(&self) -> IpAddr {
        self.addr.ip()
    }
}

#[async_trait]
impl Lamp for LifxLamp {
    async fn set_color(&mut self, color: Hsbk, duration: Duration) -> Result<()> {
        self.sequence = self.sequence.wrapping_add(1);
        let payload = encode_set_color(color, duration);
        let packet = encode_packet(
            SET_COLOR,
            self.target,
            false,
            false,
            self.sequence,
            self.source,
            &payload,
        );

        tokio::time::timeout(SEND_TIMEOUT, self.socket.send_to(&packet, self.addr))
            .await
            .context("Lamp send timed out")?
            .context("Lamp send failed")?;
        Ok(())
    }
}

struct Packet<'a> {
    msg_type: u16,
    target: [u8; 8],
    payload: &'a [u8],
}

fn encode_packet(
    msg_type: u16,
    target: [u8; 8],
    tagged: bool,
    res_required: bool,
    sequence: u8,
    source: u32,
    payload: &[u8],
) -> Vec<u8> {
    let size = (HEADER_LEN + payload.len()) as u16;
    let mut flags = PROTOCOL | ADDRESSABLE;
    if tagged {
        flags |= TAGGED;
    }

    let mut buf = Vec::with_capacity(size as usize);
    buf.extend_from_slice(&size.to_le_bytes());
    buf.extend_from_slice(&flags.to_le_bytes());
    buf.extend_from_slice(&source.to_le_bytes());
    buf.extend_from_slice(&target);
    buf.extend_from_slice(&[0u8; 6]);
    buf.push(u8::from(res_required));
    buf.push(sequence);
    buf.extend_from_slice(&0u64.to_le_bytes());
    buf.extend_from_slice(&msg_type.to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

fn decode_packet(buf: &[u8]) -> Option<Packet<'_>> {
    if buf.len() < HEADER_LEN {
        return None;
    }
    let size = u16::from_le_bytes([buf[0], buf[1]]) as usize;
    if size > buf.len() {
        return None;
    }

    let msg_type = u16::from_le_bytes([buf[32], buf[33]]);
    let mut target = [0u8; 8];
    target.copy_from_slice(&buf[8..16]);

    Some(Packet {
        msg_type,
        target,
        payload: &buf[HEADER_LEN..size],
    })
}

fn decode_state_service(payload: &[u8]) -> Option<(u8, u16)> {
    if payload.len() < 5 {
        return None;
    }
    let port = u32::from_le_bytes([payload[1], payload[2], payload[3], payload[4]]);
    Some((payload[0], port as u16))
}

fn decode_label(payload: &[u8]) -> String {
    let raw = payload.get(..32).unwrap_or(payload);
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

/// SetColor payload: one reserved byte, the HSBK quadruple scaled to u16,
/// and the fade duration in milliseconds.
fn encode_set_color(color: Hsbk, duration: Duration) -> Vec<u8> {
    let hue = (((color.hue / 360.0) * 65536.0).round() as i64).rem_euclid(65536) as u16;
    let saturation = (color.saturation.clamp(0.0, 1.0) * 65535.0).round() as u16;
    let brightness = (color.brightness.clamp(0.0, 1.0) * 65535.0).round() as u16;
    let millis = duration.as_millis().min(u128::from(u32::MAX)) as u32;

    let mut payload = Vec::with_capacity(13);
    payload.push(0);
    payload.extend_from_slice(&hue.to_le_bytes());
    payload.extend_from_slice(&saturation.to_le_bytes());
    payload.extend_from_slice(&brightness.to_le_bytes());
    payload.extend_from_slice(&color.kelvin.to_le_bytes());
    payload.extend_from_slice(&millis.to_le_bytes());
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_round_trip() {
        let target = [1, 2, 3, 4, 5, 6, 0, 0];
        let buf = encode_packet(SET_COLOR, target, false, true, 7, 0xdeadbeef, &[9, 9, 9]);
        assert_eq!(buf.len(), HEADER_LEN + 3);

        let packet = decode_packet(&buf).unwrap();
        assert_eq!(packet.msg_type, SET_COLOR);
        assert_eq!(packet.target, target);
        assert_eq!(packet.payload, &[9, 9, 9]);
    }

    #[test]
    fn test_tagged_broadcast_flag() {
        let buf = encode_packet(GET_SERVICE, [0u8; 8], true, true, 0, 1, &[]);
        let flags = u16::from_le_bytes([buf[2], buf[3]]);
        assert_eq!(flags & TAGGED, TAGGED);
        assert_eq!(flags & 0x0fff, PROTOCOL);
    }

    #[test]
    fn test_short_datagram_rejected() {
        assert!(decode_packet(&[0u8; 10]).is_none());
    }

    #[test]
    fn test_set_color_encoding() {
        let color = Hsbk {
            hue: 180.0,
            saturation: 1.0,
            brightness: 0.5,
            kelvin: 3500,
        };
        let payload = encode_set_color(color, Duration::from_millis(250));
        assert_eq!(payload.len(), 13);
        assert_eq!(u16::from_le_bytes([payload[1], payload[2]]), 32768);
        assert_eq!(u16::from_le_bytes([payload[3], payload[4]]), 65535);
        assert_eq!(u16::from_le_bytes([payload[5], payload[6]]), 32768);
        assert_eq!(u16::from_le_bytes([payload[7], payload[8]]), 3500);
        assert_eq!(
            u32::from_le_bytes([payload[9], payload[10], payload[11], payload[12]]),
            250
        );
    }

    #[test]
    fn test_hue_wraps_at_360() {
        let color = Hsbk {
            hue: 360.0,
            saturation: 0.0,
            brightness: 0.0,
            kelvin: 3500,
        };
        let payload = encode_set_color(color, Duration::ZERO);
        assert_eq!(u16::from_le_bytes([payload[1], payload[2]]), 0);
    }

    #[test]
    fn test_state_service_fields() {
        let mut payload = vec![SERVICE_UDP];
        payload.extend_from_slice(&56700u32.to_le_bytes());
        assert_eq!(decode_state_service(&payload), Some((SERVICE_UDP, 56700)));
        assert_eq!(decode_state_service(&[1]), None);
    }

    #[test]
    fn test_label_trims_padding() {
        let mut payload = vec![0u8; 32];
        payload[..6].copy_from_slice(b"Office");
        assert_eq!(decode_label(&payload), "Office");
    }
}

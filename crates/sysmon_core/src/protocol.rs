//! Protocolo do link serial com o display de gauges.
//!
//! Frame fixo de 31 bytes, little-endian, sem header, checksum ou
//! terminador. O firmware depende apenas dos offsets:
//!
//! ```text
//! ┌────────┬──────┬─────────────────────────────┬──────────────────────┐
//! │ Offset │ Tam. │ Campo                       │ Codificação          │
//! ├────────┼──────┼─────────────────────────────┼──────────────────────┤
//! │ 0      │ 1    │ Uso de CPU                  │ 0–100 → 0–255        │
//! │ 1      │ 1    │ Uso de RAM                  │ 0–100 → 0–255        │
//! │ 2      │ 1    │ Leitura de disco            │ 0–1000 MiB/s → 0–255 │
//! │ 3      │ 1    │ Escrita de disco            │ 0–1000 MiB/s → 0–255 │
//! │ 4      │ 1    │ Upload                      │ 0–1000 Mbit/s → 0–255│
//! │ 5      │ 1    │ Download                    │ 0–1000 Mbit/s → 0–255│
//! │ 6      │ 1    │ Uso médio de disco          │ 0–100 → 0–255        │
//! │ 7      │ 4    │ Uptime (s)                  │ u32                  │
//! │ 11     │ 4    │ Leitura de disco (MiB/s)    │ i32                  │
//! │ 15     │ 4    │ Escrita de disco (MiB/s)    │ i32                  │
//! │ 19     │ 4    │ Upload (Mbit/s)             │ i32                  │
//! │ 23     │ 4    │ Download (Mbit/s)           │ i32                  │
//! │ 27     │ 2    │ Frequência atual (MHz)      │ u16                  │
//! │ 29     │ 2    │ Frequência máxima (MHz)     │ u16                  │
//! └────────┴──────┴─────────────────────────────┴──────────────────────┘
//! ```
//!
//! A serialização usa bincode com a configuração legada (inteiros de
//! tamanho fixo, little-endian), que produz exatamente esse layout a
//! partir de [`WireFrame`].

use crate::config::GaugeConfig;
use crate::normalize::{Rounding, Scale, gauge_byte};
use crate::types::MetricSample;
use serde::{Deserialize, Serialize};

/// Tamanho do frame em bytes.
pub const FRAME_LEN: usize = 31;

/// Erros do protocolo.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Frame com tamanho errado ({0} bytes, esperado {FRAME_LEN})")]
    WrongLength(usize),

    #[error("Erro de serialização: {0}")]
    Serialize(String),

    #[error("Erro de deserialização: {0}")]
    Deserialize(String),
}

/// Conteúdo de um frame, na ordem exata dos bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireFrame {
    // ── Canais de gauge (1 byte) ──
    pub cpu_usage: u8,
    pub ram_usage: u8,
    pub disk_read: u8,
    pub disk_write: u8,
    pub net_sent: u8,
    pub net_recv: u8,
    pub disk_usage: u8,

    // ── Valores brutos ──
    pub uptime_secs: u32,
    pub disk_read_mibs: i32,
    pub disk_write_mibs: i32,
    pub net_sent_mbits: i32,
    pub net_recv_mbits: i32,
    pub cpu_freq_mhz: u16,
    pub cpu_freq_max_mhz: u16,
}

/// Serializa um [`WireFrame`] nos 31 bytes do link.
pub fn encode_frame(frame: &WireFrame) -> Result<[u8; FRAME_LEN], ProtocolError> {
    let bytes = bincode::serialize(frame).map_err(|e| ProtocolError::Serialize(e.to_string()))?;
    <[u8; FRAME_LEN]>::try_from(bytes.as_slice())
        .map_err(|_| ProtocolError::Serialize(format!("{} bytes gerados", bytes.len())))
}

/// Decodifica 31 bytes em [`WireFrame`].
pub fn decode_frame(data: &[u8]) -> Result<WireFrame, ProtocolError> {
    if data.len() != FRAME_LEN {
        return Err(ProtocolError::WrongLength(data.len()));
    }
    bincode::deserialize(data).map_err(|e| ProtocolError::Deserialize(e.to_string()))
}

// ──────────────────────────────────────────────
// Encoder com carry-forward
// ──────────────────────────────────────────────

/// Faixas de entrada dos canais de gauge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelScales {
    pub percent: Scale,
    pub disk_rate: Scale,
    pub net_rate: Scale,
}

impl Default for ChannelScales {
    fn default() -> Self {
        Self::from(&GaugeConfig::default())
    }
}

impl From<&GaugeConfig> for ChannelScales {
    fn from(config: &GaugeConfig) -> Self {
        Self {
            percent: Scale::percent(),
            disk_rate: Scale::gauge(config.disk_rate_full_scale as f64),
            net_rate: Scale::gauge(config.net_rate_full_scale as f64),
        }
    }
}

/// Monta frames a partir de amostras, mantendo o último valor de cada
/// campo cuja leitura falhou.
#[derive(Debug, Clone, Default)]
pub struct FrameEncoder {
    scales: ChannelScales,
    rounding: Rounding,
    last: WireFrame,
}

impl FrameEncoder {
    pub fn new(scales: ChannelScales, rounding: Rounding) -> Self {
        Self {
            scales,
            rounding,
            last: WireFrame::default(),
        }
    }

    /// Último frame montado.
    pub fn frame(&self) -> &WireFrame {
        &self.last
    }

    fn gauge(&self, scale: &Scale, value: f64) -> u8 {
        gauge_byte(scale.apply(self.rounding.input(value), self.rounding))
    }

    /// Atualiza o frame com os campos presentes na amostra.
    pub fn update(&mut self, sample: &MetricSample) -> WireFrame {
        let scales = self.scales;
        let mut frame = self.last;

        if let Some(cpu) = sample.cpu_usage_percent {
            frame.cpu_usage = self.gauge(&scales.percent, cpu as f64);
        }
        if let Some(ram) = sample.ram_usage_percent {
            frame.ram_usage = self.gauge(&scales.percent, ram as f64);
        }
        if let Some(disk) = sample.disk_usage_percent {
            frame.disk_usage = self.gauge(&scales.percent, disk as f64);
        }
        if let Some(rate) = sample.disk_read_rate {
            frame.disk_read = self.gauge(&scales.disk_rate, rate as f64);
            frame.disk_read_mibs = saturate_i32(rate);
        }
        if let Some(rate) = sample.disk_write_rate {
            frame.disk_write = self.gauge(&scales.disk_rate, rate as f64);
            frame.disk_write_mibs = saturate_i32(rate);
        }
        if let Some(rate) = sample.network_sent_rate {
            frame.net_sent = self.gauge(&scales.net_rate, rate as f64);
            frame.net_sent_mbits = saturate_i32(rate);
        }
        if let Some(rate) = sample.network_recv_rate {
            frame.net_recv = self.gauge(&scales.net_rate, rate as f64);
            frame.net_recv_mbits = saturate_i32(rate);
        }
        if let Some(uptime) = sample.system_uptime_seconds {
            frame.uptime_secs = u32::try_from(uptime).unwrap_or(u32::MAX);
        }
        // `as` de float para inteiro trunca e satura
        if let Some(freq) = sample.cpu_freq_current_mhz {
            frame.cpu_freq_mhz = freq as u16;
        }
        if let Some(freq) = sample.cpu_freq_max_mhz {
            frame.cpu_freq_max_mhz = freq as u16;
        }

        self.last = frame;
        frame
    }

    /// Atualiza e serializa.
    pub fn encode(&mut self, sample: &MetricSample) -> Result<[u8; FRAME_LEN], ProtocolError> {
        let frame = self.update(sample);
        encode_frame(&frame)
    }
}

fn saturate_i32(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_sample() -> MetricSample {
        MetricSample {
            cpu_usage_percent: Some(50.0),
            cpu_freq_current_mhz: Some(2400.0),
            cpu_freq_max_mhz: Some(3600.0),
            ram_usage_percent: Some(25.0),
            disk_usage_percent: Some(10.0),
            disk_read_rate: Some(500),
            disk_write_rate: Some(0),
            network_sent_rate: Some(250),
            network_recv_rate: Some(1000),
            system_uptime_seconds: Some(3661),
        }
    }

    fn expected_suffix() -> Vec<u8> {
        let mut tail = Vec::new();
        tail.extend_from_slice(&[0x4D, 0x0E, 0x00, 0x00]); // 3661
        tail.extend_from_slice(&500i32.to_le_bytes());
        tail.extend_from_slice(&0i32.to_le_bytes());
        tail.extend_from_slice(&250i32.to_le_bytes());
        tail.extend_from_slice(&1000i32.to_le_bytes());
        tail.extend_from_slice(&2400u16.to_le_bytes());
        tail.extend_from_slice(&3600u16.to_le_bytes());
        tail
    }

    #[test]
    fn frame_is_31_bytes() {
        let bytes = encode_frame(&WireFrame::default()).unwrap();
        assert_eq!(bytes.len(), FRAME_LEN);
        assert_eq!(bytes, [0u8; FRAME_LEN]);
    }

    #[test]
    fn reference_frame_nearest() {
        let mut encoder = FrameEncoder::new(ChannelScales::default(), Rounding::Nearest);
        let bytes = encoder.encode(&reference_sample()).unwrap();
        assert_eq!(bytes[..7], [128, 64, 128, 0, 64, 255, 26]);
        assert_eq!(bytes[7..].to_vec(), expected_suffix());
    }

    #[test]
    fn reference_frame_truncate() {
        let mut encoder = FrameEncoder::default();
        let bytes = encoder.encode(&reference_sample()).unwrap();
        assert_eq!(bytes[..7], [127, 63, 127, 0, 63, 255, 25]);
        assert_eq!(bytes[7..].to_vec(), expected_suffix());
    }

    #[test]
    fn fields_land_at_documented_offsets() {
        let frame = WireFrame {
            cpu_usage: 1,
            ram_usage: 2,
            disk_read: 3,
            disk_write: 4,
            net_sent: 5,
            net_recv: 6,
            disk_usage: 7,
            uptime_secs: 0x0A0B_0C0D,
            disk_read_mibs: -1,
            disk_write_mibs: 0x0102_0304,
            net_sent_mbits: 0x1112_1314,
            net_recv_mbits: 0x2122_2324,
            cpu_freq_mhz: 0x3132,
            cpu_freq_max_mhz: 0x4142,
        };
        let b = encode_frame(&frame).unwrap();
        assert_eq!(b[..7], [1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(b[7..11], [0x0D, 0x0C, 0x0B, 0x0A]);
        assert_eq!(b[11..15], [0xFF; 4]);
        assert_eq!(b[15..19], [0x04, 0x03, 0x02, 0x01]);
        assert_eq!(b[19..23], [0x14, 0x13, 0x12, 0x11]);
        assert_eq!(b[23..27], [0x24, 0x23, 0x22, 0x21]);
        assert_eq!(b[27..29], [0x32, 0x31]);
        assert_eq!(b[29..31], [0x42, 0x41]);
    }

    #[test]
    fn decode_reads_back_encoded_frame() {
        let mut encoder = FrameEncoder::default();
        let bytes = encoder.encode(&reference_sample()).unwrap();
        let decoded = decode_frame(&bytes).unwrap();
        assert_eq!(&decoded, encoder.frame());
        assert_eq!(decoded.uptime_secs, 3661);
        assert_eq!(decoded.cpu_freq_max_mhz, 3600);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            decode_frame(&[0u8; 30]),
            Err(ProtocolError::WrongLength(30))
        ));
        assert!(matches!(
            decode_frame(&[0u8; 32]),
            Err(ProtocolError::WrongLength(32))
        ));
    }

    #[test]
    fn failed_fields_carry_forward() {
        let mut encoder = FrameEncoder::default();
        let first = encoder.encode(&reference_sample()).unwrap();

        let partial = MetricSample {
            cpu_usage_percent: Some(100.0),
            system_uptime_seconds: Some(3662),
            ..Default::default()
        };
        let second = encoder.encode(&partial).unwrap();

        assert_eq!(second.len(), FRAME_LEN);
        assert_eq!(second[0], 255);
        // RAM, disco e rede iguais ao frame anterior
        assert_eq!(second[1..7], first[1..7]);
        assert_eq!(second[7..11], 3662u32.to_le_bytes());
        assert_eq!(second[11..], first[11..]);
    }

    #[test]
    fn empty_sample_still_yields_full_frame() {
        let mut encoder = FrameEncoder::default();
        let bytes = encoder.encode(&MetricSample::default()).unwrap();
        assert_eq!(bytes, [0u8; FRAME_LEN]);
    }

    #[test]
    fn raw_fields_saturate() {
        let mut encoder = FrameEncoder::default();
        let frame = encoder.update(&MetricSample {
            disk_read_rate: Some(i64::MAX),
            network_recv_rate: Some(-5_000_000_000),
            system_uptime_seconds: Some(u64::MAX),
            cpu_freq_current_mhz: Some(70_000.0),
            cpu_freq_max_mhz: Some(-1.0),
            ..Default::default()
        });
        assert_eq!(frame.disk_read_mibs, i32::MAX);
        assert_eq!(frame.disk_read, 255);
        assert_eq!(frame.net_recv_mbits, i32::MIN);
        assert_eq!(frame.net_recv, 0);
        assert_eq!(frame.uptime_secs, u32::MAX);
        assert_eq!(frame.cpu_freq_mhz, u16::MAX);
        assert_eq!(frame.cpu_freq_max_mhz, 0);
    }

    #[test]
    fn truncate_mode_drops_fractional_percent() {
        let mut encoder = FrameEncoder::default();
        let frame = encoder.update(&MetricSample {
            cpu_usage_percent: Some(50.9),
            ..Default::default()
        });
        assert_eq!(frame.cpu_usage, 127);
    }

    #[test]
    fn custom_full_scale() {
        let config = GaugeConfig {
            disk_rate_full_scale: 500,
            net_rate_full_scale: 100,
        };
        let mut encoder = FrameEncoder::new(ChannelScales::from(&config), Rounding::Truncate);
        let frame = encoder.update(&MetricSample {
            disk_read_rate: Some(250),
            network_sent_rate: Some(100),
            ..Default::default()
        });
        assert_eq!(frame.disk_read, 127);
        assert_eq!(frame.net_sent, 255);
        assert_eq!(frame.disk_read_mibs, 250);
    }
}

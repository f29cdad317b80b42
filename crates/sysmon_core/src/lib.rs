//! # SysMon Core
//!
//! Crate compartilhada que define o frame binário de 31 bytes enviado ao
//! display de gauges, a matemática de taxas e normalização, e o loop de
//! amostragem que liga uma fonte de métricas a um link serial.
//!
//! ## Módulos
//! - [`types`] – Amostra de métricas e contadores cumulativos
//! - [`rate`] – Conversão de contadores cumulativos em taxas por segundo
//! - [`normalize`] – Reescala linear para canais de 8 bits (0–255)
//! - [`protocol`] – Layout fixo do frame, encode/decode e carry-forward
//! - [`partitions`] – Lista de partições usada na média de uso de disco
//! - [`source`] – Trait da fonte de métricas
//! - [`sink`] – Trait do destino dos frames (porta serial)
//! - [`sampler`] – Loop de amostragem e sinal de parada
//! - [`config`] – Configuração unificada via TOML

pub mod types;
pub mod rate;
pub mod normalize;
pub mod protocol;
pub mod partitions;
pub mod source;
pub mod sink;
pub mod sampler;
pub mod config;

// Re-exports convenientes
pub use types::MetricSample;
pub use protocol::{FRAME_LEN, FrameEncoder, WireFrame, decode_frame, encode_frame};
pub use config::{AppConfig, GaugeConfig, LinkConfig, SamplingConfig};
pub use source::{MetricError, MetricSource};
pub use sink::{FrameSink, TransportError};
pub use sampler::{Clock, LoopSettings, LoopState, SampleLoop, StopReason, StopSignal, SystemClock};

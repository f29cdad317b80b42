//! Fonte de métricas do host.
//!
//! O loop de amostragem não sabe de onde vêm os números: a implementação
//! real usa `sysinfo`, o modo demo gera valores aleatórios e os testes usam
//! fontes roteirizadas. Cada leitura pode falhar de forma independente.

use crate::types::{CpuFrequency, DiskCounters, NetCounters, Partition};
use std::path::Path;
use std::time::Duration;

/// Falha ao ler uma métrica isolada.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricError {
    #[error("Métrica indisponível: {0}")]
    Unavailable(&'static str),

    #[error("Nenhuma partição para calcular uso de disco")]
    NoPartitions,

    #[error("Partição não encontrada: {0}")]
    UnknownPartition(String),
}

/// Provedor de estatísticas do sistema.
pub trait MetricSource {
    /// Atualiza caches internos antes das leituras da iteração.
    fn refresh(&mut self) {}

    /// Uso de CPU (0–100%) medido ao longo de `window`.
    ///
    /// Bloqueia pela duração da janela; é isso que dita o ritmo do loop.
    fn cpu_usage(&mut self, window: Duration) -> Result<f32, MetricError>;

    fn cpu_frequency(&mut self) -> Result<CpuFrequency, MetricError>;

    /// Uso de RAM física (0–100%).
    fn memory_usage(&mut self) -> Result<f32, MetricError>;

    /// Todas as partições montadas.
    fn partitions(&mut self) -> Result<Vec<Partition>, MetricError>;

    /// Uso (0–100%) da partição montada em `mount_point`.
    fn partition_usage(&mut self, mount_point: &Path) -> Result<f32, MetricError>;

    fn disk_counters(&mut self) -> Result<DiskCounters, MetricError>;

    fn net_counters(&mut self) -> Result<NetCounters, MetricError>;

    /// Segundos desde o boot.
    fn uptime(&mut self) -> Result<u64, MetricError>;
}

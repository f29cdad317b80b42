//! Tipos de dados trocados entre a fonte de métricas e o loop de amostragem.

use std::path::PathBuf;

// ──────────────────────────────────────────────
// Leituras brutas da fonte
// ──────────────────────────────────────────────

/// Frequência da CPU (MHz).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuFrequency {
    /// Frequência atual (média entre os cores)
    pub current_mhz: f32,
    /// Frequência máxima
    pub max_mhz: f32,
}

/// Contadores cumulativos de I/O de disco (bytes desde o boot).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskCounters {
    pub read_bytes: u64,
    pub written_bytes: u64,
}

/// Contadores cumulativos de rede (bytes desde o boot).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetCounters {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

/// Partição montada reportada pelo sistema operacional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Ponto de montagem (ex: "/", "C:\\")
    pub mount_point: PathBuf,
    /// Tipo do filesystem (vazio em volumes virtuais no Windows)
    pub file_system: String,
}

impl Partition {
    pub fn new(mount_point: impl Into<PathBuf>, file_system: impl Into<String>) -> Self {
        Self {
            mount_point: mount_point.into(),
            file_system: file_system.into(),
        }
    }
}

// ──────────────────────────────────────────────
// Amostra completa
// ──────────────────────────────────────────────

/// Snapshot de uma iteração do loop.
///
/// `None` indica que a leitura falhou nesta iteração; o encoder mantém o
/// valor do frame anterior para esse campo.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSample {
    /// Uso total da CPU (0–100%)
    pub cpu_usage_percent: Option<f32>,
    /// Frequência atual da CPU (MHz)
    pub cpu_freq_current_mhz: Option<f32>,
    /// Frequência máxima da CPU (MHz)
    pub cpu_freq_max_mhz: Option<f32>,
    /// Uso de RAM (0–100%)
    pub ram_usage_percent: Option<f32>,
    /// Média de uso das partições (0–100%)
    pub disk_usage_percent: Option<f32>,
    /// Leitura de disco (MiB/s)
    pub disk_read_rate: Option<i64>,
    /// Escrita de disco (MiB/s)
    pub disk_write_rate: Option<i64>,
    /// Upload (Mbit/s)
    pub network_sent_rate: Option<i64>,
    /// Download (Mbit/s)
    pub network_recv_rate: Option<i64>,
    /// Uptime do sistema (s)
    pub system_uptime_seconds: Option<u64>,
}

impl MetricSample {
    /// Quantos campos falharam nesta amostra.
    pub fn missing_fields(&self) -> usize {
        [
            self.cpu_usage_percent.is_none(),
            self.cpu_freq_current_mhz.is_none(),
            self.cpu_freq_max_mhz.is_none(),
            self.ram_usage_percent.is_none(),
            self.disk_usage_percent.is_none(),
            self.disk_read_rate.is_none(),
            self.disk_write_rate.is_none(),
            self.network_sent_rate.is_none(),
            self.network_recv_rate.is_none(),
            self.system_uptime_seconds.is_none(),
        ]
        .into_iter()
        .filter(|missing| *missing)
        .count()
    }
}

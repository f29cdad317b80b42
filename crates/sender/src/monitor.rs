//! Hardware Monitor – métricas reais do host via `sysinfo`.
//!
//! - CPU: uso global medido numa janela bloqueante, frequência média dos cores
//! - RAM: memória física usada / total
//! - Disco: espaço por partição e bytes lidos/escritos cumulativos
//! - Rede: bytes enviados/recebidos somados em todas as interfaces
//! - Uptime do sistema

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use sysinfo::{
    CpuRefreshKind, Disks, MINIMUM_CPU_UPDATE_INTERVAL, MemoryRefreshKind, Networks, RefreshKind,
    System,
};
use sysmon_core::source::{MetricError, MetricSource};
use sysmon_core::types::{CpuFrequency, DiskCounters, NetCounters, Partition};
use tracing::debug;

/// Monitor de hardware principal.
pub struct HardwareMonitor {
    sys: System,
    disks: Disks,
    networks: Networks,
    /// Maior frequência vista desde o início (MHz)
    freq_max_seen: f32,
}

impl HardwareMonitor {
    pub fn new() -> Self {
        let sys = System::new_with_specifics(
            RefreshKind::nothing()
                .with_cpu(CpuRefreshKind::everything())
                .with_memory(MemoryRefreshKind::everything()),
        );

        Self {
            sys,
            disks: Disks::new_with_refreshed_list(),
            networks: Networks::new_with_refreshed_list(),
            freq_max_seen: 0.0,
        }
    }
}

impl MetricSource for HardwareMonitor {
    fn refresh(&mut self) {
        self.sys.refresh_cpu_frequency();
        self.sys.refresh_memory();
        self.networks.refresh(true);
        self.disks.refresh(true);
    }

    fn cpu_usage(&mut self, window: Duration) -> Result<f32, MetricError> {
        // sysinfo precisa de duas leituras separadas por um intervalo mínimo
        self.sys.refresh_cpu_usage();
        std::thread::sleep(window.max(MINIMUM_CPU_UPDATE_INTERVAL));
        self.sys.refresh_cpu_usage();

        if self.sys.cpus().is_empty() {
            return Err(MetricError::Unavailable("uso de CPU"));
        }
        Ok(self.sys.global_cpu_usage())
    }

    fn cpu_frequency(&mut self) -> Result<CpuFrequency, MetricError> {
        let freqs: Vec<f32> = self
            .sys
            .cpus()
            .iter()
            .map(|cpu| cpu.frequency() as f32)
            .collect();

        let freq = summarize_frequency(&freqs, self.freq_max_seen)
            .ok_or(MetricError::Unavailable("frequência da CPU"))?;
        self.freq_max_seen = freq.max_mhz;
        Ok(freq)
    }

    fn memory_usage(&mut self) -> Result<f32, MetricError> {
        used_percent(self.sys.used_memory(), self.sys.total_memory())
            .ok_or(MetricError::Unavailable("memória total"))
    }

    fn partitions(&mut self) -> Result<Vec<Partition>, MetricError> {
        let partitions: Vec<Partition> = self
            .disks
            .iter()
            .map(|disk| {
                Partition::new(
                    disk.mount_point(),
                    disk.file_system().to_string_lossy().to_string(),
                )
            })
            .collect();

        for p in &partitions {
            debug!("Partição {} ({})", p.mount_point.display(), p.file_system);
        }
        Ok(partitions)
    }

    fn partition_usage(&mut self, mount_point: &Path) -> Result<f32, MetricError> {
        let disk = self
            .disks
            .iter()
            .find(|disk| disk.mount_point() == mount_point)
            .ok_or_else(|| MetricError::UnknownPartition(mount_point.display().to_string()))?;

        let total = disk.total_space();
        let used = total.saturating_sub(disk.available_space());
        used_percent(used, total).ok_or(MetricError::Unavailable("espaço da partição"))
    }

    fn disk_counters(&mut self) -> Result<DiskCounters, MetricError> {
        if self.disks.is_empty() {
            return Err(MetricError::Unavailable("contadores de disco"));
        }

        Ok(sum_per_device(self.disks.iter().map(|disk| {
            let usage = disk.usage();
            (disk.name(), usage.total_read_bytes, usage.total_written_bytes)
        })))
    }

    fn net_counters(&mut self) -> Result<NetCounters, MetricError> {
        let mut counters = NetCounters::default();
        for (_name, data) in self.networks.iter() {
            counters.bytes_sent += data.total_transmitted();
            counters.bytes_recv += data.total_received();
        }
        Ok(counters)
    }

    fn uptime(&mut self) -> Result<u64, MetricError> {
        Ok(System::uptime())
    }
}

// ──────────────────────────────────────────────
// Agregação
// ──────────────────────────────────────────────

/// Soma os contadores de I/O contando cada dispositivo uma única vez.
///
/// O sysinfo lista uma entrada por ponto de montagem: bind mounts,
/// subvolumes btrfs e volumes de container repetem o mesmo dispositivo
/// com os mesmos contadores cumulativos.
fn sum_per_device<'a>(entries: impl IntoIterator<Item = (&'a OsStr, u64, u64)>) -> DiskCounters {
    let mut seen = HashSet::new();
    let mut counters = DiskCounters::default();
    for (device, read, written) in entries {
        if seen.insert(device) {
            counters.read_bytes = counters.read_bytes.saturating_add(read);
            counters.written_bytes = counters.written_bytes.saturating_add(written);
        }
    }
    counters
}

/// Média das frequências reportadas; cores em 0 MHz são ignorados.
fn summarize_frequency(freqs: &[f32], max_seen: f32) -> Option<CpuFrequency> {
    let valid: Vec<f32> = freqs.iter().copied().filter(|f| *f > 0.0).collect();
    if valid.is_empty() {
        return None;
    }
    let current_mhz = valid.iter().sum::<f32>() / valid.len() as f32;
    let highest = valid.iter().copied().fold(max_seen, f32::max);
    Some(CpuFrequency {
        current_mhz,
        max_mhz: highest,
    })
}

fn used_percent(used: u64, total: u64) -> Option<f32> {
    if total == 0 {
        return None;
    }
    Some((used as f64 / total as f64 * 100.0) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev(name: &str) -> &OsStr {
        OsStr::new(name)
    }

    #[test]
    fn device_mounted_twice_counts_once() {
        let counters = sum_per_device([
            (dev("/dev/vda"), 1_000, 400),
            (dev("/dev/vdb"), 50, 5),
            (dev("/dev/vda"), 1_000, 400),
        ]);
        assert_eq!(counters.read_bytes, 1_050);
        assert_eq!(counters.written_bytes, 405);
    }

    #[test]
    fn no_devices_sum_to_zero() {
        let counters = sum_per_device(std::iter::empty());
        assert_eq!(counters, DiskCounters::default());
    }

    #[test]
    fn frequency_mean_ignores_idle_cores() {
        let freq = summarize_frequency(&[2000.0, 0.0, 3000.0], 0.0).unwrap();
        assert_eq!(freq.current_mhz, 2500.0);
        assert_eq!(freq.max_mhz, 3000.0);
    }

    #[test]
    fn max_frequency_never_decreases() {
        let first = summarize_frequency(&[3600.0], 0.0).unwrap();
        let second = summarize_frequency(&[1200.0], first.max_mhz).unwrap();
        assert_eq!(second.current_mhz, 1200.0);
        assert_eq!(second.max_mhz, 3600.0);
    }

    #[test]
    fn no_frequency_reported() {
        assert!(summarize_frequency(&[], 0.0).is_none());
        assert!(summarize_frequency(&[0.0, 0.0], 4000.0).is_none());
    }

    #[test]
    fn used_percent_of_total() {
        assert_eq!(used_percent(1, 4), Some(25.0));
        assert_eq!(used_percent(0, 0), None);
    }

    #[test]
    fn unknown_partition_is_an_error() {
        let mut hw = HardwareMonitor::new();
        let result = hw.partition_usage(Path::new("/definitely/not/mounted"));
        assert!(matches!(result, Err(MetricError::UnknownPartition(_))));
    }
}

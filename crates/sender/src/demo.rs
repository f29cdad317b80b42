//! Fonte de demonstração: valores aleatórios nas faixas dos gauges.
//!
//! Serve para testar o display sem carga real. Os contadores de disco e
//! rede crescem pela taxa sorteada, então as taxas passam pelo mesmo
//! cálculo da fonte real.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use std::time::{Duration, Instant};
use sysinfo::System;
use sysmon_core::rate::BYTES_PER_MIB;
use sysmon_core::source::{MetricError, MetricSource};
use sysmon_core::types::{CpuFrequency, DiskCounters, NetCounters, Partition};

/// Frequência máxima simulada (MHz).
const DEMO_FREQ_MAX_MHZ: f32 = 4500.0;
/// Maior taxa sorteada (MiB/s ou Mbit/s).
const DEMO_RATE_MAX: f64 = 1000.0;

pub struct DemoSource {
    rng: SmallRng,
    last_refresh: Instant,
    disk: DiskCounters,
    net: NetCounters,
}

impl DemoSource {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_entropy())
    }

    /// Fonte reprodutível.
    #[cfg(test)]
    fn seeded(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        Self {
            rng,
            last_refresh: Instant::now(),
            disk: DiskCounters::default(),
            net: NetCounters::default(),
        }
    }

    /// Bytes transferidos em `secs` a `rate` MiB/s.
    fn mib_bytes(rate: f64, secs: f64) -> u64 {
        (rate * BYTES_PER_MIB * secs) as u64
    }
}

impl MetricSource for DemoSource {
    fn refresh(&mut self) {
        let now = Instant::now();
        let secs = now.duration_since(self.last_refresh).as_secs_f64();
        self.last_refresh = now;

        let mut rate = || self.rng.gen_range(0.0..=DEMO_RATE_MAX);
        let (read, write, sent, recv) = (rate(), rate(), rate(), rate());

        self.disk.read_bytes += Self::mib_bytes(read, secs);
        self.disk.written_bytes += Self::mib_bytes(write, secs);
        // Mbit/s → MiB/s
        self.net.bytes_sent += Self::mib_bytes(sent / 8.0, secs);
        self.net.bytes_recv += Self::mib_bytes(recv / 8.0, secs);
    }

    fn cpu_usage(&mut self, window: Duration) -> Result<f32, MetricError> {
        std::thread::sleep(window);
        Ok(self.rng.gen_range(0.0..100.0))
    }

    fn cpu_frequency(&mut self) -> Result<CpuFrequency, MetricError> {
        Ok(CpuFrequency {
            current_mhz: self.rng.gen_range(0.0..DEMO_FREQ_MAX_MHZ),
            max_mhz: DEMO_FREQ_MAX_MHZ,
        })
    }

    fn memory_usage(&mut self) -> Result<f32, MetricError> {
        Ok(self.rng.gen_range(0.0..100.0))
    }

    fn partitions(&mut self) -> Result<Vec<Partition>, MetricError> {
        Ok(vec![Partition::new("demo", "demo")])
    }

    fn partition_usage(&mut self, _mount_point: &Path) -> Result<f32, MetricError> {
        Ok(self.rng.gen_range(0.0..100.0))
    }

    fn disk_counters(&mut self) -> Result<DiskCounters, MetricError> {
        Ok(self.disk)
    }

    fn net_counters(&mut self) -> Result<NetCounters, MetricError> {
        Ok(self.net)
    }

    fn uptime(&mut self) -> Result<u64, MetricError> {
        Ok(System::uptime())
    }
}

//! Loop de amostragem: lê métricas, calcula taxas, monta e envia frames.
//!
//! Estritamente sequencial. A janela de medição da CPU bloqueia o loop e
//! serve de marcapasso; o pedido de parada é observado apenas entre
//! iterações, nunca no meio de um frame.

use crate::config::AppConfig;
use crate::normalize::Rounding;
use crate::partitions::PartitionList;
use crate::protocol::{ChannelScales, FrameEncoder, WireFrame, decode_frame};
use crate::rate::RateCalculator;
use crate::sink::{FrameSink, TransportError};
use crate::source::{MetricError, MetricSource};
use crate::types::MetricSample;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

// ──────────────────────────────────────────────
// Relógio e sinal de parada
// ──────────────────────────────────────────────

/// Fonte de tempo usada nos cálculos de taxa.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Relógio monotônico do sistema.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Pedido de parada cooperativo, compartilhável entre threads.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ──────────────────────────────────────────────
// Estado
// ──────────────────────────────────────────────

/// Motivo do fim do loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Parada pedida pelo operador ou pelo serviço
    Cancelled,
    /// Escrita falhou ou o display foi desconectado
    DeviceLost(TransportError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped(StopReason),
}

/// Parâmetros do loop derivados da configuração.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub cpu_window: Duration,
    pub min_interval: Duration,
    pub min_rate_elapsed: Duration,
    pub rounding: Rounding,
    pub scales: ChannelScales,
    /// Descartar partições sem tipo de filesystem
    pub skip_untyped_partitions: bool,
    /// Logar cada frame enviado em `info`
    pub dump_frames: bool,
}

impl LoopSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            cpu_window: config.sampling.cpu_window(),
            min_interval: config.sampling.min_interval(),
            min_rate_elapsed: config.sampling.min_rate_elapsed(),
            rounding: config.sampling.rounding,
            scales: ChannelScales::from(&config.gauges),
            skip_untyped_partitions: cfg!(windows),
            dump_frames: false,
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

// ──────────────────────────────────────────────
// Loop
// ──────────────────────────────────────────────

/// Liga uma fonte de métricas a um destino de frames.
pub struct SampleLoop<S, K, C = SystemClock> {
    source: S,
    sink: K,
    clock: C,
    stop: StopSignal,
    settings: LoopSettings,
    partitions: PartitionList,
    disk_read: RateCalculator,
    disk_write: RateCalculator,
    net_sent: RateCalculator,
    net_recv: RateCalculator,
    encoder: FrameEncoder,
    faults: FaultLog,
    state: LoopState,
    frames_sent: u64,
}

impl<S: MetricSource, K: FrameSink> SampleLoop<S, K> {
    pub fn new(source: S, sink: K, settings: LoopSettings, stop: StopSignal) -> Self {
        Self::with_clock(source, sink, SystemClock, settings, stop)
    }
}

impl<S: MetricSource, K: FrameSink, C: Clock> SampleLoop<S, K, C> {
    /// Cria o loop, fixa a lista de partições e semeia os contadores.
    pub fn with_clock(
        mut source: S,
        sink: K,
        clock: C,
        settings: LoopSettings,
        stop: StopSignal,
    ) -> Self {
        let partitions = match source.partitions() {
            Ok(all) => PartitionList::new(all, settings.skip_untyped_partitions),
            Err(e) => {
                warn!("Não foi possível listar partições: {e}");
                PartitionList::default()
            }
        };
        info!("{} partições na média de uso de disco", partitions.len());

        let rate = |calc: RateCalculator| calc.with_min_elapsed(settings.min_rate_elapsed);
        let mut disk_read = rate(RateCalculator::disk());
        let mut disk_write = rate(RateCalculator::disk());
        let mut net_sent = rate(RateCalculator::network());
        let mut net_recv = rate(RateCalculator::network());

        // Primeira leitura para inicializar contadores
        source.refresh();
        match source.disk_counters() {
            Ok(c) => {
                let now = clock.now();
                disk_read.seed(c.read_bytes, now);
                disk_write.seed(c.written_bytes, now);
            }
            Err(e) => warn!("Contadores de disco indisponíveis no início: {e}"),
        }
        match source.net_counters() {
            Ok(c) => {
                let now = clock.now();
                net_sent.seed(c.bytes_sent, now);
                net_recv.seed(c.bytes_recv, now);
            }
            Err(e) => warn!("Contadores de rede indisponíveis no início: {e}"),
        }

        let encoder = FrameEncoder::new(settings.scales, settings.rounding);

        Self {
            source,
            sink,
            clock,
            stop,
            settings,
            partitions,
            disk_read,
            disk_write,
            net_sent,
            net_recv,
            encoder,
            faults: FaultLog::default(),
            state: LoopState::Running,
            frames_sent: 0,
        }
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub fn partitions(&self) -> &PartitionList {
        &self.partitions
    }

    /// Último frame montado (enviado ou não).
    pub fn last_frame(&self) -> &WireFrame {
        self.encoder.frame()
    }

    /// Roda até parada ou perda do link e fecha o destino.
    pub fn run(&mut self) -> StopReason {
        if let LoopState::Stopped(reason) = &self.state {
            return reason.clone();
        }

        info!("Loop de amostragem iniciado");

        let reason = loop {
            if self.stop.is_stopped() {
                info!("Parada solicitada");
                break StopReason::Cancelled;
            }

            let cycle_start = Instant::now();

            if let Err(e) = self.step() {
                error!("Link com o display perdido: {e}");
                break StopReason::DeviceLost(e);
            }

            // Dormir pelo tempo restante do intervalo
            let elapsed = cycle_start.elapsed();
            if elapsed < self.settings.min_interval {
                std::thread::sleep(self.settings.min_interval - elapsed);
            }
        };

        if let Err(e) = self.sink.close() {
            warn!("Não foi possível fechar a porta: {e}");
        }

        info!("Loop encerrado após {} frames", self.frames_sent);
        self.state = LoopState::Stopped(reason.clone());
        reason
    }

    /// Uma iteração completa: amostra, monta e envia.
    ///
    /// Um frame que não pôde ser montado não é enviado; só falhas do
    /// destino são propagadas.
    fn step(&mut self) -> Result<(), TransportError> {
        let sample = self.sample();
        if sample.missing_fields() > 0 {
            debug!("{} campos mantidos do frame anterior", sample.missing_fields());
        }

        let bytes = match self.encoder.encode(&sample) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Frame descartado: {e}");
                return Ok(());
            }
        };

        self.sink.send(&bytes)?;
        self.frames_sent += 1;

        if self.settings.dump_frames {
            match decode_frame(&bytes) {
                Ok(frame) => info!("Frame #{}: {:?}", self.frames_sent, frame),
                Err(e) => warn!("Frame #{} ilegível: {e}", self.frames_sent),
            }
        } else {
            let frame = self.encoder.frame();
            debug!(
                "→ {} bytes | CPU {} RAM {} Disco {} | R/W {}/{} MiB/s | Up/Down {}/{} Mbit/s",
                bytes.len(),
                frame.cpu_usage,
                frame.ram_usage,
                frame.disk_usage,
                frame.disk_read_mibs,
                frame.disk_write_mibs,
                frame.net_sent_mbits,
                frame.net_recv_mbits,
            );
        }

        Ok(())
    }

    /// Lê todas as métricas; cada falha vira `None` na amostra.
    fn sample(&mut self) -> MetricSample {
        let cpu = self.source.cpu_usage(self.settings.cpu_window);
        let mut sample = MetricSample {
            cpu_usage_percent: self.faults.read("uso de CPU", cpu),
            ..Default::default()
        };

        self.source.refresh();

        if let Some(freq) = self.faults.read("frequência da CPU", self.source.cpu_frequency()) {
            sample.cpu_freq_current_mhz = Some(freq.current_mhz);
            sample.cpu_freq_max_mhz = Some(freq.max_mhz);
        }
        sample.ram_usage_percent = self.faults.read("uso de RAM", self.source.memory_usage());
        let disk_usage = self.average_disk_usage();
        sample.disk_usage_percent = self.faults.read("uso de disco", disk_usage);

        if let Some(c) = self.faults.read("I/O de disco", self.source.disk_counters()) {
            if !self.disk_read.is_seeded() {
                info!("Contadores de disco disponíveis, taxa a partir do próximo frame");
            }
            let now = self.clock.now();
            sample.disk_read_rate = Some(self.disk_read.update(c.read_bytes, now));
            sample.disk_write_rate = Some(self.disk_write.update(c.written_bytes, now));
        }
        if let Some(c) = self.faults.read("I/O de rede", self.source.net_counters()) {
            if !self.net_sent.is_seeded() {
                info!("Contadores de rede disponíveis, taxa a partir do próximo frame");
            }
            let now = self.clock.now();
            sample.network_sent_rate = Some(self.net_sent.update(c.bytes_sent, now));
            sample.network_recv_rate = Some(self.net_recv.update(c.bytes_recv, now));
        }

        sample.system_uptime_seconds = self.faults.read("uptime", self.source.uptime());
        sample
    }

    /// Média do uso das partições legíveis.
    fn average_disk_usage(&mut self) -> Result<f32, MetricError> {
        if self.partitions.is_empty() {
            return Err(MetricError::NoPartitions);
        }

        let mut total = 0.0_f32;
        let mut count = 0_u32;
        for mount_point in self.partitions.mount_points() {
            match self.source.partition_usage(mount_point) {
                Ok(usage) => {
                    total += usage;
                    count += 1;
                }
                Err(e) => debug!("Partição {} ignorada: {e}", mount_point.display()),
            }
        }

        if count == 0 {
            return Err(MetricError::Unavailable("uso de disco"));
        }
        Ok(total / count as f32)
    }
}

/// Métricas em falha: avisa na primeira vez, repete só em `debug`.
#[derive(Debug, Default)]
struct FaultLog {
    failing: HashSet<&'static str>,
}

impl FaultLog {
    /// Converte a leitura em `Option`, registrando falhas e recuperações.
    fn read<T>(&mut self, what: &'static str, result: Result<T, MetricError>) -> Option<T> {
        match result {
            Ok(value) => {
                if self.failing.remove(what) {
                    info!("Leitura de {what} restabelecida");
                }
                Some(value)
            }
            Err(e) => {
                if self.failing.insert(what) {
                    warn!("Falha ao ler {what}: {e}");
                } else {
                    debug!("Falha ao ler {what}: {e}");
                }
                None
            }
        }
    }

    #[cfg(test)]
    fn is_failing(&self, what: &str) -> bool {
        self.failing.contains(what)
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

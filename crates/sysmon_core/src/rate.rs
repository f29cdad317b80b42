//! Taxas por segundo a partir de contadores cumulativos.
//!
//! Cada stream (leitura de disco, escrita de disco, upload, download) tem
//! seu próprio [`RateCalculator`] com o último contador e o instante em
//! que foi lido.

use std::time::{Duration, Instant};
use tracing::debug;

/// Bytes em um MiB.
pub const BYTES_PER_MIB: f64 = 1_048_576.0;

/// bytes → MiB.
pub const DISK_UNIT_SCALE: f64 = 1.0 / BYTES_PER_MIB;

/// bytes → Mbit (8 bits por byte, megabit binário).
pub const NET_UNIT_SCALE: f64 = 8.0 / BYTES_PER_MIB;

/// Intervalo mínimo entre leituras para calcular uma taxa nova.
pub const DEFAULT_MIN_ELAPSED: Duration = Duration::from_millis(1);

/// Calculador de taxa para um único contador.
#[derive(Debug, Clone)]
pub struct RateCalculator {
    unit_scale: f64,
    min_elapsed: Duration,
    /// Último contador lido e quando
    previous: Option<(u64, Instant)>,
    /// Última taxa válida (0 até existir um intervalo)
    last_rate: i64,
}

impl RateCalculator {
    pub fn new(unit_scale: f64) -> Self {
        Self {
            unit_scale,
            min_elapsed: DEFAULT_MIN_ELAPSED,
            previous: None,
            last_rate: 0,
        }
    }

    /// Calculador de leitura/escrita de disco (MiB/s).
    pub fn disk() -> Self {
        Self::new(DISK_UNIT_SCALE)
    }

    /// Calculador de rede (Mbit/s).
    pub fn network() -> Self {
        Self::new(NET_UNIT_SCALE)
    }

    pub fn with_min_elapsed(mut self, min_elapsed: Duration) -> Self {
        self.min_elapsed = min_elapsed;
        self
    }

    /// Registra a primeira leitura do stream sem emitir taxa.
    pub fn seed(&mut self, counter: u64, at: Instant) {
        self.previous = Some((counter, at));
    }

    pub fn is_seeded(&self) -> bool {
        self.previous.is_some()
    }

    /// Atualiza o stream com uma leitura nova e retorna a taxa.
    ///
    /// - Sem leitura anterior: semeia e retorna 0.
    /// - Intervalo abaixo do mínimo (ou relógio andando para trás): retorna
    ///   a última taxa válida e mantém a leitura anterior.
    pub fn update(&mut self, counter: u64, at: Instant) -> i64 {
        let Some((prev_counter, prev_at)) = self.previous else {
            self.seed(counter, at);
            return self.last_rate;
        };

        let elapsed = match at.checked_duration_since(prev_at) {
            Some(elapsed) if elapsed >= self.min_elapsed => elapsed,
            other => {
                debug!(
                    "Intervalo insuficiente para taxa ({:?}), reaproveitando {}",
                    other, self.last_rate
                );
                return self.last_rate;
            }
        };

        // Negativo se o contador foi reiniciado
        let delta = counter as f64 - prev_counter as f64;
        let rate = (delta * self.unit_scale / elapsed.as_secs_f64()) as i64;

        self.previous = Some((counter, at));
        self.last_rate = rate;
        rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_rate() {
        let t0 = Instant::now();
        let mut calc = RateCalculator::new(1.0);
        calc.seed(1000, t0);
        assert_eq!(calc.update(1500, t0 + Duration::from_secs(5)), 100);
    }

    #[test]
    fn cold_start_is_zero() {
        let t0 = Instant::now();
        let mut calc = RateCalculator::disk();
        assert!(!calc.is_seeded());
        assert_eq!(calc.update(123_456_789, t0), 0);
        assert!(calc.is_seeded());
    }

    #[test]
    fn disk_rate_in_mib_per_second() {
        let t0 = Instant::now();
        let mut calc = RateCalculator::disk();
        calc.seed(0, t0);
        let rate = calc.update(500 * 1_048_576, t0 + Duration::from_secs(1));
        assert_eq!(rate, 500);
    }

    #[test]
    fn network_rate_in_mbit_per_second() {
        let t0 = Instant::now();
        let mut calc = RateCalculator::network();
        calc.seed(0, t0);
        // 125 MiB em 2s = 62.5 MiB/s = 500 Mbit/s
        let rate = calc.update(125 * 1_048_576, t0 + Duration::from_secs(2));
        assert_eq!(rate, 500);
    }

    #[test]
    fn zero_elapsed_reuses_last_rate() {
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(5);
        let mut calc = RateCalculator::new(1.0);
        calc.seed(1000, t0);
        assert_eq!(calc.update(1500, t1), 100);
        assert_eq!(calc.update(9999, t1), 100);
    }

    #[test]
    fn clock_going_backwards_reuses_last_rate() {
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(5);
        let mut calc = RateCalculator::new(1.0);
        calc.seed(1000, t1);
        assert_eq!(calc.update(2000, t0), 0);
    }

    #[test]
    fn skipped_interval_spans_to_next_reading() {
        let t0 = Instant::now();
        let mut calc = RateCalculator::new(1.0).with_min_elapsed(Duration::from_millis(100));
        calc.seed(0, t0);
        // 10ms: abaixo do mínimo, leitura anterior mantida
        assert_eq!(calc.update(50, t0 + Duration::from_millis(10)), 0);
        assert_eq!(calc.update(400, t0 + Duration::from_secs(2)), 200);
    }

    #[test]
    fn counter_reset_gives_negative_rate() {
        let t0 = Instant::now();
        let mut calc = RateCalculator::new(1.0);
        calc.seed(1000, t0);
        assert_eq!(calc.update(0, t0 + Duration::from_secs(1)), -1000);
    }

    #[test]
    fn fractional_rate_truncates() {
        let t0 = Instant::now();
        let mut calc = RateCalculator::new(1.0);
        calc.seed(0, t0);
        assert_eq!(calc.update(7, t0 + Duration::from_secs(2)), 3);
    }
}

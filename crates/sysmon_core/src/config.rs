//! Configuração unificada via TOML.
//!
//! Um único `sysmon.toml` ao lado do executável, com defaults para tudo.

use crate::normalize::Rounding;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Nome do arquivo de configuração.
pub const CONFIG_FILE_NAME: &str = "sysmon.toml";

/// Configuração do link com o display (Raspberry Pi Pico).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Porta fixa (ex: "/dev/ttyACM0", "COM3"); vazio = descobrir por VID/PID
    pub port: String,
    /// USB vendor id do display
    pub usb_vid: u16,
    /// USB product id do display
    pub usb_pid: u16,
    /// Baud rate combinado com o firmware
    pub baud_rate: u32,
    /// Intervalo entre varreduras de portas (segundos)
    pub discovery_interval_secs: f64,
    /// Máximo de varreduras (0 = infinito)
    pub discovery_max_attempts: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            usb_vid: 0x2E8A,
            usb_pid: 0x4826,
            baud_rate: 115_200,
            discovery_interval_secs: 5.0,
            discovery_max_attempts: 0,
        }
    }
}

/// Configuração do loop de amostragem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Janela de medição do uso de CPU (segundos)
    pub cpu_window_secs: f64,
    /// Intervalo mínimo entre frames (segundos)
    pub min_interval_secs: f64,
    /// Intervalo mínimo entre leituras de contadores para gerar taxa (segundos)
    pub min_rate_elapsed_secs: f64,
    /// "truncate" (compatível com o firmware) ou "nearest"
    pub rounding: Rounding,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            cpu_window_secs: 0.25,
            min_interval_secs: 0.25,
            min_rate_elapsed_secs: 0.001,
            rounding: Rounding::Truncate,
        }
    }
}

impl SamplingConfig {
    pub fn cpu_window(&self) -> Duration {
        secs_or(self.cpu_window_secs, Duration::from_millis(250))
    }

    pub fn min_interval(&self) -> Duration {
        secs_or(self.min_interval_secs, Duration::from_millis(250))
    }

    pub fn min_rate_elapsed(&self) -> Duration {
        secs_or(self.min_rate_elapsed_secs, crate::rate::DEFAULT_MIN_ELAPSED)
    }
}

/// Segundos → `Duration`; valores que não cabem (ex: `inf`) viram `fallback`.
pub fn secs_or(secs: f64, fallback: Duration) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(fallback)
}

/// Fundo de escala dos gauges de taxa.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GaugeConfig {
    /// MiB/s que correspondem ao gauge cheio
    pub disk_rate_full_scale: u32,
    /// Mbit/s que correspondem ao gauge cheio
    pub net_rate_full_scale: u32,
}

impl Default for GaugeConfig {
    fn default() -> Self {
        Self {
            disk_rate_full_scale: 1000,
            net_rate_full_scale: 1000,
        }
    }
}

/// Configuração raiz.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub link: LinkConfig,
    pub sampling: SamplingConfig,
    pub gauges: GaugeConfig,
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        info!("Configuração carregada de {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Erro ao parsear {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Erro ao ler {}: {}", path.display(), e);
                }
            }
        }

        info!("Usando configuração padrão");
        AppConfig::default()
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, content).map_err(|e| e.to_string())?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do sysmon.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join(CONFIG_FILE_NAME)
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.link.baud_rate == 0 {
            errors.push("Baud rate não pode ser 0".into());
        }
        if !(self.link.discovery_interval_secs > 0.0 && self.link.discovery_interval_secs <= 600.0) {
            errors.push(format!(
                "Intervalo de descoberta inválido: {} (0–600)",
                self.link.discovery_interval_secs
            ));
        }
        if !(0.0..=10.0).contains(&self.sampling.cpu_window_secs) {
            errors.push(format!(
                "Janela de CPU inválida: {} (0.0–10.0)",
                self.sampling.cpu_window_secs
            ));
        }
        if !(0.0..=60.0).contains(&self.sampling.min_interval_secs) {
            errors.push(format!(
                "Intervalo mínimo inválido: {} (0.0–60.0)",
                self.sampling.min_interval_secs
            ));
        }
        let rate_secs = self.sampling.min_rate_elapsed_secs;
        if !(rate_secs > 0.0 && rate_secs <= 60.0) {
            errors.push(format!("Intervalo mínimo de taxa inválido: {rate_secs} (0–60)"));
        }
        if self.gauges.disk_rate_full_scale == 0 {
            errors.push("Fundo de escala de disco não pode ser 0".into());
        }
        if self.gauges.net_rate_full_scale == 0 {
            errors.push("Fundo de escala de rede não pode ser 0".into());
        }

        errors
    }
}

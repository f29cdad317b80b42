//! Link Manager – encontra o display e abre a porta serial.
//!
//! Porta fixa (`[link] port` / `--port`) ou descoberta pelo par VID/PID USB,
//! varrendo as portas até o display aparecer.

use crate::serial_sink::SerialSink;
use serialport::{SerialPortInfo, SerialPortType};
use std::fmt;
use std::time::{Duration, Instant};
use sysmon_core::config::{LinkConfig, secs_or};
use sysmon_core::sampler::StopSignal;
use tracing::{debug, info, warn};

/// Granularidade da espera entre varreduras (checa o sinal de parada).
const WAIT_SLICE: Duration = Duration::from_millis(100);

/// Erros ao estabelecer o link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Display {0} não encontrado após {1} varreduras")]
    NotFound(UsbId, u32),

    #[error("Descoberta cancelada")]
    Cancelled,

    #[error("Erro de porta serial: {0}")]
    Serial(#[from] serialport::Error),
}

/// Identificação USB do display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsbId {
    pub vid: u16,
    pub pid: u16,
}

impl fmt::Display for UsbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vid, self.pid)
    }
}

impl From<&LinkConfig> for UsbId {
    fn from(config: &LinkConfig) -> Self {
        Self {
            vid: config.usb_vid,
            pid: config.usb_pid,
        }
    }
}

/// Quantas vezes e com que intervalo varrer as portas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    /// `None` = até encontrar ou ser cancelado
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    pub fn bounded(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: Some(max_attempts),
        }
    }

    fn allows_another(&self, attempts: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempts < max)
    }
}

impl From<&LinkConfig> for RetryPolicy {
    fn from(config: &LinkConfig) -> Self {
        let interval = secs_or(config.discovery_interval_secs, Duration::from_secs(5));
        match config.discovery_max_attempts {
            0 => Self::unbounded(interval),
            n => Self::bounded(interval, n),
        }
    }
}

/// Primeira porta USB com o VID/PID procurado.
pub fn find_port(ports: &[SerialPortInfo], id: UsbId) -> Option<String> {
    ports.iter().find_map(|port| match &port.port_type {
        SerialPortType::UsbPort(usb) if usb.vid == id.vid && usb.pid == id.pid => {
            Some(port.port_name.clone())
        }
        _ => None,
    })
}

/// Varre portas com `scan` até achar o display, esgotar a política ou
/// receber parada.
pub fn discover<F>(
    mut scan: F,
    id: UsbId,
    policy: &RetryPolicy,
    stop: &StopSignal,
) -> Result<String, LinkError>
where
    F: FnMut() -> Result<Vec<SerialPortInfo>, serialport::Error>,
{
    info!("Procurando display {id}...");
    let mut attempts = 0;

    loop {
        if stop.is_stopped() {
            return Err(LinkError::Cancelled);
        }

        attempts += 1;
        match scan() {
            Ok(ports) => {
                if let Some(port) = find_port(&ports, id) {
                    info!("Display {id} encontrado em {port}");
                    return Ok(port);
                }
                debug!("Varredura {attempts}: {} portas, display ausente", ports.len());
            }
            Err(e) => warn!("Falha ao listar portas seriais: {e}"),
        }

        if !policy.allows_another(attempts) {
            return Err(LinkError::NotFound(id, attempts));
        }

        if wait_or_stop(policy.interval, stop) {
            return Err(LinkError::Cancelled);
        }
    }
}

/// Dorme por `duration` em fatias; retorna `true` se a parada foi pedida.
fn wait_or_stop(duration: Duration, stop: &StopSignal) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if stop.is_stopped() {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        std::thread::sleep((deadline - now).min(WAIT_SLICE));
    }
}

/// Abre o link com o display conforme a configuração.
pub fn connect(config: &LinkConfig, stop: &StopSignal) -> Result<SerialSink, LinkError> {
    let path = if config.port.is_empty() {
        discover(
            serialport::available_ports,
            UsbId::from(config),
            &RetryPolicy::from(config),
            stop,
        )?
    } else {
        info!("Usando porta fixa {}", config.port);
        config.port.clone()
    };

    SerialSink::open(&path, config.baud_rate)
}

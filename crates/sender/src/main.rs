//! # SysMon Sender
//!
//! Coleta métricas do host e envia frames de 31 bytes pela porta serial
//! para o display de gauges (Raspberry Pi Pico).
//!
//! ## Uso
//! ```bash
//! sysmon_sender                       # Descobre o display por VID/PID
//! sysmon_sender --port /dev/ttyACM0   # Porta fixa
//! sysmon_sender --demo                # Valores aleatórios
//! sysmon_sender --dump                # Loga cada frame enviado
//! sysmon_sender --config sysmon.toml  # Config alternativa
//! ```

mod demo;
mod link;
mod monitor;
mod serial_sink;

use demo::DemoSource;
use link::LinkError;
use monitor::HardwareMonitor;
use std::path::PathBuf;
use std::process::ExitCode;
use sysmon_core::config::AppConfig;
use sysmon_core::protocol::FRAME_LEN;
use sysmon_core::sampler::{LoopSettings, SampleLoop, StopReason, StopSignal};
use tracing::{error, info, warn};

const USAGE: &str = "Uso: sysmon_sender [--demo] [--dump] [--port <porta>] [--config <arquivo>]";

/// Opções de linha de comando.
#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    demo: bool,
    dump: bool,
    port: Option<String>,
    config: Option<PathBuf>,
    help: bool,
}

impl CliArgs {
    fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self, String> {
        let mut parsed = CliArgs::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--demo" => parsed.demo = true,
                "--dump" => parsed.dump = true,
                "-h" | "--help" => parsed.help = true,
                "-p" | "--port" => {
                    parsed.port = Some(args.next().ok_or("--port requer um valor")?);
                }
                "-c" | "--config" => {
                    let path = args.next().ok_or("--config requer um valor")?;
                    parsed.config = Some(PathBuf::from(path));
                }
                other => return Err(format!("Argumento desconhecido: {other}")),
            }
        }

        Ok(parsed)
    }
}

fn main() -> ExitCode {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = match CliArgs::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };
    if args.help {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    // ── Carregar config ──
    let config_path = args.config.clone().unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load(&config_path);

    // Salva config padrão se não existir
    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!("Config inválida: {e}");
        }
        return ExitCode::FAILURE;
    }

    if let Some(port) = &args.port {
        config.link.port = port.clone();
    }

    // ── Sinal de parada ──
    let stop = StopSignal::new();
    {
        let stop = stop.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            info!("Sinal de parada recebido");
            stop.stop();
        }) {
            warn!("Não foi possível instalar handler de Ctrl-C: {e}");
        }
    }

    // ── Banner ──
    let target = if config.link.port.is_empty() {
        format!("USB {:04x}:{:04x}", config.link.usb_vid, config.link.usb_pid)
    } else {
        config.link.port.clone()
    };
    println!();
    println!("══════════════════════════════════════════════");
    println!("   ⚡ SYSMON SENDER – ATIVO");
    println!("══════════════════════════════════════════════");
    println!("  Display:   {target} @ {} baud", config.link.baud_rate);
    println!("  Janela:    {:.2}s", config.sampling.cpu_window_secs);
    println!("  Frame:     {FRAME_LEN} bytes ({:?})", config.sampling.rounding);
    println!("  Fonte:     {}", if args.demo { "demo" } else { "sysinfo" });
    println!("══════════════════════════════════════════════");
    println!();

    // ── Link ──
    let sink = match link::connect(&config.link, &stop) {
        Ok(sink) => sink,
        Err(LinkError::Cancelled) => {
            info!("Encerrado antes de encontrar o display");
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            error!("Falha ao abrir link com o display: {e}");
            return ExitCode::FAILURE;
        }
    };

    // ── Loop principal ──
    let mut settings = LoopSettings::from_config(&config);
    settings.dump_frames = args.dump;

    let reason = if args.demo {
        SampleLoop::new(DemoSource::new(), sink, settings, stop).run()
    } else {
        SampleLoop::new(HardwareMonitor::new(), sink, settings, stop).run()
    };

    match reason {
        StopReason::Cancelled => info!("Encerrado pelo operador"),
        StopReason::DeviceLost(e) => info!("Display desconectado ({e}), encerrando"),
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliArgs, String> {
        CliArgs::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn no_args_is_default() {
        assert_eq!(parse(&[]).unwrap(), CliArgs::default());
    }

    #[test]
    fn parses_all_flags() {
        let args = parse(&["--demo", "--dump", "--port", "COM3", "-c", "alt.toml"]).unwrap();
        assert!(args.demo);
        assert!(args.dump);
        assert_eq!(args.port.as_deref(), Some("COM3"));
        assert_eq!(args.config, Some(PathBuf::from("alt.toml")));
    }

    #[test]
    fn missing_value_is_an_error() {
        assert!(parse(&["--port"]).is_err());
        assert!(parse(&["--config"]).is_err());
    }

    #[test]
    fn unknown_flag_is_an_error() {
        assert!(parse(&["--no-admin"]).is_err());
    }
}

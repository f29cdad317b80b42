//! Destino serial dos frames.

use crate::link::LinkError;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Write};
use std::time::Duration;
use sysmon_core::sink::{FrameSink, TransportError};
use tracing::info;

/// Tempo máximo para o driver aceitar um frame.
const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Porta serial (ou qualquer `Write`) recebendo frames inteiros.
pub struct SerialSink<P = Box<dyn SerialPort>> {
    port: Option<P>,
    name: String,
}

impl SerialSink {
    /// Abre a porta em 8N1, sem controle de fluxo.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, LinkError> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(WRITE_TIMEOUT)
            .open()?;

        info!("Porta serial aberta: {} a {} baud", path, baud_rate);
        Ok(Self::new(port, path))
    }
}

impl<P: Write> SerialSink<P> {
    pub fn new(port: P, name: impl Into<String>) -> Self {
        Self {
            port: Some(port),
            name: name.into(),
        }
    }

    #[cfg(test)]
    fn is_open(&self) -> bool {
        self.port.is_some()
    }
}

impl<P: Write> FrameSink for SerialSink<P> {
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::Disconnected)?;
        port.write_all(frame).map_err(transport_error)?;
        port.flush().map_err(transport_error)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        let Some(mut port) = self.port.take() else {
            return Ok(());
        };
        let flushed = port.flush();
        drop(port);
        info!("Porta {} fechada", self.name);
        flushed.map_err(|e| TransportError::Close(e.to_string()))
    }
}

/// Erros de I/O que significam display desconectado.
fn transport_error(e: std::io::Error) -> TransportError {
    match e.kind() {
        ErrorKind::BrokenPipe
        | ErrorKind::NotConnected
        | ErrorKind::ConnectionAborted
        | ErrorKind::ConnectionReset
        | ErrorKind::UnexpectedEof
        | ErrorKind::NotFound => TransportError::Disconnected,
        _ => TransportError::Write(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    /// Writer que falha a partir do N-ésimo write.
    struct Flaky {
        written: Vec<u8>,
        fail_after: usize,
        kind: ErrorKind,
        writes: usize,
    }

    impl Write for Flaky {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.writes >= self.fail_after {
                return Err(io::Error::new(self.kind, "unplugged"));
            }
            self.writes += 1;
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_whole_frames() {
        let mut sink = SerialSink::new(Vec::new(), "mem");
        sink.send(&[1u8; 31]).unwrap();
        sink.send(&[2u8; 31]).unwrap();
        assert_eq!(sink.port.as_ref().unwrap().len(), 62);
    }

    #[test]
    fn broken_pipe_means_disconnected() {
        let port = Flaky {
            written: Vec::new(),
            fail_after: 1,
            kind: ErrorKind::BrokenPipe,
            writes: 0,
        };
        let mut sink = SerialSink::new(port, "flaky");
        sink.send(&[0u8; 31]).unwrap();
        assert_eq!(sink.send(&[0u8; 31]), Err(TransportError::Disconnected));
        assert_eq!(sink.port.as_ref().unwrap().written.len(), 31);
    }

    #[test]
    fn other_io_errors_are_write_errors() {
        let port = Flaky {
            written: Vec::new(),
            fail_after: 0,
            kind: ErrorKind::TimedOut,
            writes: 0,
        };
        let mut sink = SerialSink::new(port, "flaky");
        assert!(matches!(sink.send(&[0u8; 31]), Err(TransportError::Write(_))));
    }

    #[test]
    fn close_is_idempotent_and_blocks_sends() {
        let mut sink = SerialSink::new(Vec::new(), "mem");
        assert!(sink.is_open());
        sink.close().unwrap();
        sink.close().unwrap();
        assert!(!sink.is_open());
        assert_eq!(sink.send(&[0u8; 31]), Err(TransportError::Disconnected));
    }
}

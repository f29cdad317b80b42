//! Destino dos frames: um stream de bytes ordenado (porta serial).

/// Falha do link com o display.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Dispositivo desconectado")]
    Disconnected,

    #[error("Erro de escrita: {0}")]
    Write(String),

    #[error("Erro ao fechar o link: {0}")]
    Close(String),
}

/// Recebe frames completos, um por vez.
pub trait FrameSink {
    /// Escreve o frame inteiro, bloqueando até o transporte aceitar.
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError>;

    /// Fecha o link. Chamado uma vez quando o loop para.
    fn close(&mut self) -> Result<(), TransportError>;
}

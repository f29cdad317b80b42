//! Partições consideradas na média de uso de disco.
//!
//! Calculada uma vez no início e imutável durante o processo.

use crate::types::Partition;
use std::path::Path;

/// Lista fixa de partições.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionList {
    partitions: Vec<Partition>,
}

impl PartitionList {
    /// Filtra as partições reportadas pelo sistema.
    ///
    /// Com `skip_untyped`, descarta as que não têm tipo de filesystem
    /// (no Windows são drives de CD vazios, volumes de rede desconectados…).
    pub fn new(all: Vec<Partition>, skip_untyped: bool) -> Self {
        let partitions = all
            .into_iter()
            .filter(|p| !(skip_untyped && p.file_system.is_empty()))
            .collect();
        Self { partitions }
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn mount_points(&self) -> impl Iterator<Item = &Path> {
        self.partitions.iter().map(|p| p.mount_point.as_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Partition> {
        vec![
            Partition::new("C:\\", "NTFS"),
            Partition::new("D:\\", ""),
            Partition::new("E:\\", "exFAT"),
        ]
    }

    #[test]
    fn skips_untyped_when_asked() {
        let list = PartitionList::new(sample(), true);
        let mounts: Vec<_> = list.mount_points().collect();
        assert_eq!(mounts, vec![Path::new("C:\\"), Path::new("E:\\")]);
    }

    #[test]
    fn keeps_everything_otherwise() {
        let list = PartitionList::new(sample(), false);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn empty_input() {
        assert!(PartitionList::new(Vec::new(), true).is_empty());
    }
}

//! Delivery port for generated archives

use fichas_types::Error;

/// Receives the finished archive as one named binary blob
pub trait ArchiveSink {
    fn deliver(&mut self, name: &str, bytes: &[u8]) -> Result<(), Error>;
}

/// Sink that keeps the last delivered blob in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub name: Option<String>,
    pub bytes: Vec<u8>,
}

impl ArchiveSink for MemorySink {
    fn deliver(&mut self, name: &str, bytes: &[u8]) -> Result<(), Error> {
        self.name = Some(name.to_string());
        self.bytes = bytes.to_vec();
        Ok(())
    }
}

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod memory;
pub mod pgraph;
pub mod trace;

#[cfg(test)]
mod tests;

pub use memory::interrupts::{InterruptChannel, InterruptRequester, NoInterrupts, PgraphIntr};
pub use memory::{BusLine, GuestMemory, Vram};
pub use pgraph::recording::RecordingBackend;
pub use pgraph::{Pgraph, PgraphState};

#[cfg(feature = "debugger")]
#[cfg_attr(docsrs, doc(cfg(feature = "debugger")))]
pub use memory::hw_registers::HW_REGISTERS;

#[derive(Debug)]
pub enum KelvinError {
    Io(std::io::Error),
    Parse { line: usize, message: String },
    /// a register write of a trace was refused by the engine
    Register(String),
}

impl std::error::Error for KelvinError {}
impl std::fmt::Display for KelvinError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KelvinError::Io(e) => write!(f, "Could not read trace: {}", e),
            KelvinError::Parse { line, message } => {
                write!(f, "Trace line {}: {}", line, message)
            }
            KelvinError::Register(s) => write!(f, "Register write failed: {}", s),
        }
    }
}

impl From<std::io::Error> for KelvinError {
    fn from(e: std::io::Error) -> Self {
        KelvinError::Io(e)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct KelvinConfig {
    /// number of textures kept alive by the texture cache
    pub texture_cache_size: usize,
    /// vertices a single batch may hold before it is considered runaway
    pub max_batch_length: usize,
    /// log every method by name, coalescing index runs
    pub log_methods: bool,
}

impl Default for KelvinConfig {
    fn default() -> Self {
        Self {
            texture_cache_size: 512,
            max_batch_length: 0x1FFFF,
            log_methods: false,
        }
    }
}

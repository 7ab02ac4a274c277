//! Method traces: text captures of a command stream that can be replayed
//! against the engine.
//!
//! Every non empty line is one of
//!
//! ```text
//! # comment, also allowed after any entry
//! <subchannel> <method> <parameter>     a method, all hex
//! @<register> = <value>                 a register write, offset or name
//! ramin <offset> <value>                a word of the initial instance memory
//! vram <offset> <value>                 a word of the initial VRAM
//! ```
//!
//! Memory words describe the image the trace starts from, they are applied
//! with [`Trace::load_memory`] before the engine is built. Register names
//! are only known with the `debugger` feature.

use std::path::Path;

use crate::memory::Vram;
use crate::pgraph::Pgraph;
use crate::KelvinError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEntry {
    Method {
        subchannel: u32,
        method: u32,
        parameter: u32,
    },
    Register {
        offset: u32,
        value: u32,
    },
    Ramin {
        offset: u32,
        value: u32,
    },
    Vram {
        offset: u32,
        value: u32,
    },
}

impl TraceEntry {
    /// Executes a method or register write on `pgraph`, memory words are
    /// part of the initial image and do nothing here
    pub fn apply(&self, pgraph: &Pgraph) -> crate::memory::Result<()> {
        match *self {
            TraceEntry::Method {
                subchannel,
                method,
                parameter,
            } => {
                pgraph.wait_fifo_access();
                pgraph.dispatch(subchannel, method, parameter);
            }
            TraceEntry::Register { offset, value } => pgraph.write(offset, value)?,
            TraceEntry::Ramin { .. } | TraceEntry::Vram { .. } => {}
        }
        Ok(())
    }
}

/// What a replay went through
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub methods: usize,
    pub register_writes: usize,
}

#[derive(Debug, Default, Clone)]
pub struct Trace {
    /// entries with the line they came from, counting from 1
    pub entries: Vec<(usize, TraceEntry)>,
}

fn parse_hex(token: &str) -> Option<u32> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    u32::from_str_radix(digits, 16).ok()
}

#[cfg(feature = "debugger")]
fn register_offset(name: &str) -> Option<u32> {
    parse_hex(name).or_else(|| crate::memory::hw_registers::lookup(name))
}

#[cfg(not(feature = "debugger"))]
fn register_offset(name: &str) -> Option<u32> {
    parse_hex(name)
}

fn parse_line(line: &str) -> Result<Option<TraceEntry>, String> {
    let line = match line.find('#') {
        Some(comment) => &line[..comment],
        None => line,
    };
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let hex = |token: &str, what: &str| {
        parse_hex(token).ok_or_else(|| format!("invalid {} `{}`", what, token))
    };

    if let Some(write) = line.strip_prefix('@') {
        let (register, value) = write
            .split_once('=')
            .ok_or_else(|| "register write without `=`".to_string())?;
        let register = register.trim();
        let offset = register_offset(register)
            .ok_or_else(|| format!("unknown register `{}`", register))?;
        let value = hex(value.trim(), "value")?;
        return Ok(Some(TraceEntry::Register { offset, value }));
    }

    let tokens = line.split_whitespace().collect::<Vec<_>>();
    let entry = match tokens.as_slice() {
        ["ramin", offset, value] => TraceEntry::Ramin {
            offset: hex(*offset, "offset")?,
            value: hex(*value, "value")?,
        },
        ["vram", offset, value] => TraceEntry::Vram {
            offset: hex(*offset, "offset")?,
            value: hex(*value, "value")?,
        },
        [subchannel, method, parameter] => {
            let subchannel = hex(*subchannel, "subchannel")?;
            if subchannel >= 8 {
                return Err(format!("subchannel {} out of range", subchannel));
            }
            let method = hex(*method, "method")?;
            if method % 4 != 0 {
                return Err(format!("unaligned method {:04X}", method));
            }
            TraceEntry::Method {
                subchannel,
                method,
                parameter: hex(*parameter, "parameter")?,
            }
        }
        _ => return Err(format!("expected 3 fields, found {}", tokens.len())),
    };
    Ok(Some(entry))
}

impl Trace {
    pub fn parse(text: &str) -> Result<Self, KelvinError> {
        let mut entries = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line_number = index + 1;
            match parse_line(line) {
                Ok(Some(entry)) => entries.push((line_number, entry)),
                Ok(None) => {}
                Err(message) => {
                    return Err(KelvinError::Parse {
                        line: line_number,
                        message,
                    })
                }
            }
        }
        Ok(Self { entries })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, KelvinError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn method_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, e)| matches!(e, TraceEntry::Method { .. }))
            .count()
    }

    /// Writes the memory words of the trace into `memory`
    pub fn load_memory(&self, memory: &mut Vram) -> Result<(), KelvinError> {
        use crate::memory::GuestMemory;

        for &(line, entry) in &self.entries {
            let (offset, value, instance) = match entry {
                TraceEntry::Ramin { offset, value } => (offset as usize, value, true),
                TraceEntry::Vram { offset, value } => (offset as usize, value, false),
                _ => continue,
            };
            let len = if instance {
                memory.ramin().len()
            } else {
                memory.vram().len()
            };
            if offset % 4 != 0 || offset + 4 > len {
                return Err(KelvinError::Parse {
                    line,
                    message: format!("memory word {:08X} out of range", offset),
                });
            }
            if instance {
                memory.write_ramin_u32(offset, value);
            } else {
                memory.write_vram_u32(offset, value);
            }
        }
        Ok(())
    }

    /// Feeds the register writes and methods of the trace to `pgraph` in
    /// order. Each method waits for FIFO access first, like the puller does.
    pub fn replay(&self, pgraph: &Pgraph) -> Result<ReplaySummary, KelvinError> {
        let mut summary = ReplaySummary::default();
        for &(line, entry) in &self.entries {
            entry
                .apply(pgraph)
                .map_err(|e| KelvinError::Register(format!("line {}: {}", line, e)))?;
            match entry {
                TraceEntry::Method { .. } => summary.methods += 1,
                TraceEntry::Register { .. } => summary.register_writes += 1,
                TraceEntry::Ramin { .. } | TraceEntry::Vram { .. } => {}
            }
        }
        log::info!(
            "replayed {} methods and {} register writes",
            summary.methods,
            summary.register_writes
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::GuestMemory;

    #[test]
    fn parses_all_entry_kinds() {
        let trace = Trace::parse(
            "# header\n\
             \n\
             0 0000 0x40\n\
             @0x0704 = 1000  # TRAPPED_ADDR\n\
             ramin 10 3d\n\
             vram 0x20 DEADBEEF\n",
        )
        .unwrap();

        assert_eq!(
            trace.entries,
            vec![
                (
                    3,
                    TraceEntry::Method {
                        subchannel: 0,
                        method: 0,
                        parameter: 0x40
                    }
                ),
                (
                    4,
                    TraceEntry::Register {
                        offset: 0x704,
                        value: 0x1000
                    }
                ),
                (
                    5,
                    TraceEntry::Ramin {
                        offset: 0x10,
                        value: 0x3D
                    }
                ),
                (
                    6,
                    TraceEntry::Vram {
                        offset: 0x20,
                        value: 0xDEAD_BEEF
                    }
                ),
            ]
        );
        assert_eq!(trace.method_count(), 1);
    }

    #[test]
    fn errors_carry_the_line() {
        let err = Trace::parse("0 0 0\n0 17FC\n").unwrap_err();
        match err {
            KelvinError::Parse { line, .. } => assert_eq!(line, 2),
            e => panic!("unexpected error {}", e),
        }

        assert!(Trace::parse("9 0 0").is_err());
        assert!(Trace::parse("0 3 0").is_err());
        assert!(Trace::parse("0 0 zz").is_err());
        assert!(Trace::parse("@0x100 1").is_err());
    }

    #[cfg(feature = "debugger")]
    #[test]
    fn register_names() {
        use crate::pgraph::regs::INTR_EN;

        let trace = Trace::parse("@intr_en = FFFFFFFF").unwrap();
        assert_eq!(
            trace.entries[0].1,
            TraceEntry::Register {
                offset: INTR_EN,
                value: 0xFFFF_FFFF
            }
        );
        assert!(Trace::parse("@NOT_A_REGISTER = 0").is_err());
    }

    #[test]
    fn memory_image() {
        let trace = Trace::parse("ramin 8 3d\nvram 4 11223344").unwrap();
        let mut memory = Vram::new(0x1000, 0x100);
        trace.load_memory(&mut memory).unwrap();
        assert_eq!(memory.ramin()[8], 0x3D);
        assert_eq!(memory.read_vram_u32(4), 0x1122_3344);

        let trace = Trace::parse("vram 1000 1").unwrap();
        assert!(trace.load_memory(&mut memory).is_err());
    }
}

use std::io::Write;

use kelvin_core::pgraph::recording::BackendCommand;
use kelvin_core::pgraph::regs::{CTX_CONTROL, CTX_CONTROL_CHID};
use kelvin_core::pgraph::SurfaceShape;
use kelvin_core::trace::{Trace, TraceEntry};
use kelvin_core::{GuestMemory, Pgraph, RecordingBackend, HW_REGISTERS};
use rustyline::{
    completion::Completer, error::ReadlineError, highlight::Highlighter, hint::Hinter,
    history::MemHistory, line_buffer::LineBuffer, validate::Validator, Changeset, CompletionType,
    Config, Editor,
};

struct EditorHelper {
    hw_registers: Vec<String>,
}

impl EditorHelper {
    fn new() -> Self {
        Self {
            hw_registers: HW_REGISTERS.keys().map(|name| name.to_string()).collect(),
        }
    }

    fn matching<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a String> + 'a {
        let prefix = prefix.to_lowercase();
        self.hw_registers
            .iter()
            .filter(move |k| k.to_lowercase().starts_with(&prefix))
    }
}

impl Validator for EditorHelper {}
impl Hinter for EditorHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<Self::Hint> {
        if line.is_empty() || pos < line.len() {
            return None;
        }

        let i = line.rfind('@')?;
        let reg_name = &line[i + 1..];
        self.matching(reg_name)
            .map(|k| k[reg_name.len()..].to_string())
            .next()
    }
}
impl Highlighter for EditorHelper {}
impl Completer for EditorHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        let sub = &line[..pos];
        match sub.rfind('@') {
            Some(i) => Ok((i + 1, self.matching(&sub[i + 1..]).cloned().collect())),
            None => Ok((0, Vec::with_capacity(0))),
        }
    }

    fn update(&self, line: &mut LineBuffer, start: usize, elected: &str, cl: &mut Changeset) {
        let end = line.pos();
        line.replace(start..end, elected, cl);
    }
}
impl rustyline::Helper for EditorHelper {}

fn create_editor() -> rustyline::Result<Editor<EditorHelper, MemHistory>> {
    let conf = Config::builder()
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .build();
    let mut editor = Editor::with_history(conf, MemHistory::new())?;
    editor.set_helper(Some(EditorHelper::new()));
    Ok(editor)
}

fn parse_hex(a: &str) -> Option<u32> {
    u32::from_str_radix(a.trim_start_matches("0x"), 16).ok()
}

/// Register offset from `@NAME` or a hex offset
fn parse_register(a: &str) -> Option<u32> {
    if let Some(name) = a.strip_prefix('@') {
        HW_REGISTERS
            .get(name.to_ascii_uppercase().as_str())
            .copied()
            .or_else(|| {
                println!("Invalid register name: {}", name);
                None
            })
    } else {
        parse_hex(a)
    }
}

fn register_name(offset: u32) -> &'static str {
    HW_REGISTERS
        .entries()
        .find(|(_, o)| **o == offset)
        .map(|(name, _)| *name)
        .unwrap_or("?")
}

fn print_shape(shape: &SurfaceShape) {
    println!(
        "    color {:X} zeta {:X}, {}x{} at ({}, {}), aa {}",
        shape.color_format,
        shape.zeta_format,
        shape.clip_width,
        shape.clip_height,
        shape.clip_x,
        shape.clip_y,
        shape.anti_aliasing
    );
}

/// Interactive stepping through a trace, with register and memory inspection
pub struct Console {
    editor: Editor<EditorHelper, MemHistory>,
    /// index of the next trace entry to execute
    position: usize,
}

impl Console {
    pub fn new() -> rustyline::Result<Self> {
        Ok(Self {
            editor: create_editor()?,
            position: 0,
        })
    }

    /// Reads commands until the user quits
    pub fn run(&mut self, pgraph: &Pgraph, trace: &Trace, backend: &RecordingBackend) {
        println!("{} trace entries, `h` for help", trace.entries.len());
        loop {
            std::io::stdout().flush().ok();
            match self.editor.readline("PGRAPH> ") {
                Ok(line) => {
                    if !self.handle_command(pgraph, trace, backend, &line) {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => {
                    println!("Error: {}", e);
                    break;
                }
            }
        }
    }

    /// Executes up to `count` entries, stopping at the first failure
    fn step(&mut self, pgraph: &Pgraph, trace: &Trace, count: usize) {
        for _ in 0..count {
            let Some(&(line, entry)) = trace.entries.get(self.position) else {
                println!("End of trace");
                return;
            };
            if let Err(e) = entry.apply(pgraph) {
                println!("line {}: {}", line, e);
                return;
            }
            self.position += 1;
        }
        self.print_next(trace);
    }

    fn print_next(&self, trace: &Trace) {
        match trace.entries.get(self.position) {
            Some((
                line,
                TraceEntry::Method {
                    subchannel,
                    method,
                    parameter,
                },
            )) => println!(
                "next: line {}: subchannel {} method {:04X} = {:08X}",
                line, subchannel, method, parameter
            ),
            Some((line, entry)) => println!("next: line {}: {:?}", line, entry),
            None => println!("End of trace"),
        }
    }

    fn print_state(&self, pgraph: &Pgraph) {
        let state = pgraph.lock();
        println!(
            "channel {} (loaded: {}), 3D object {:08X}",
            state.channel_id(),
            state.regs.flag(CTX_CONTROL, CTX_CONTROL_CHID),
            state.kelvin_object
        );
        println!(
            "interrupts pending {:?}, enabled {:?}",
            state.pending_interrupts, state.enabled_interrupts
        );
        println!("primitive: {:?}", state.primitive_mode);
        println!("surfaces:");
        print_shape(&state.surfaces.shape);
        println!("    color {:?}", state.surfaces.color);
        println!("    zeta  {:?}", state.surfaces.zeta);
    }

    fn memory_dump(&self, pgraph: &Pgraph, addr: u32, len: usize) {
        let state = pgraph.lock();
        let vram = state.memory.vram();
        let start = addr as usize & !0xF;
        let end = (start + len.max(1) + 0xF) & !0xF;
        if end > vram.len() {
            println!("Out of VRAM: {:08X}..{:08X}", start, end);
            return;
        }
        for (i, row) in vram[start..end].chunks(16).enumerate() {
            print!("{:08X}: ", start + i * 16);
            for byte in row {
                print!("{:02X} ", byte);
            }
            println!();
        }
    }

    /// Returns `false` when the console should exit
    fn handle_command(
        &mut self,
        pgraph: &Pgraph,
        trace: &Trace,
        backend: &RecordingBackend,
        cmd: &str,
    ) -> bool {
        let cmd = cmd.trim();
        let (mut cmd, arg) = match cmd.split_once(' ') {
            Some((c, a)) => (c, Some(a.trim())),
            None => (cmd, None),
        };
        let modifier = cmd.split_once('/').map(|(s1, s2)| {
            cmd = s1;
            s2
        });
        let count = modifier.and_then(|m| m.parse::<usize>().ok());

        match cmd {
            "h" => {
                println!("h - help");
                println!("q - quit");
                println!("s/[n] - execute the next [n] trace entries");
                println!("c - run the rest of the trace");
                println!("n - print the next trace entry");
                println!("st - print engine state");
                println!("p <@reg>/<offset> - print register value");
                println!("set <@reg>/<offset> <value> - write register");
                println!("mt <subch> <method> <param> - execute a method");
                println!("md/[n] <addr> - VRAM dump ([n] bytes rounded up to 16)");
                println!("cmds/[n] - print the last [n] backend commands");
                println!("draws - print draw count per primitive");
            }
            "q" => return false,
            "s" => self.step(pgraph, trace, count.unwrap_or(1)),
            "c" => {
                let left = trace.entries.len() - self.position;
                self.step(pgraph, trace, left);
            }
            "n" => self.print_next(trace),
            "st" => self.print_state(pgraph),
            "p" => match arg.and_then(parse_register) {
                Some(offset) => match pgraph.read(offset) {
                    Ok(value) => {
                        println!("{} {:04X} = {:08X}", register_name(offset), offset, value)
                    }
                    Err(e) => println!("Error: {}", e),
                },
                None => println!("Usage: p <@reg>/<offset>"),
            },
            "set" => {
                let parsed = arg.and_then(|a| a.split_once(' ')).and_then(|(reg, value)| {
                    Some((parse_register(reg.trim())?, parse_hex(value.trim())?))
                });
                match parsed {
                    Some((offset, value)) => {
                        if let Err(e) = pgraph.write(offset, value) {
                            println!("Error: {}", e);
                        }
                    }
                    None => println!("Usage: set <@reg>/<offset> <value>"),
                }
            }
            "mt" => {
                let fields = arg
                    .map(|a| a.split_whitespace().filter_map(parse_hex).collect::<Vec<_>>())
                    .unwrap_or_default();
                match fields.as_slice() {
                    &[subchannel, method, parameter] if subchannel < 8 && method % 4 == 0 => {
                        pgraph.dispatch(subchannel, method, parameter)
                    }
                    _ => println!("Usage: mt <subch> <method> <param>"),
                }
            }
            "md" => match arg.and_then(parse_hex) {
                Some(addr) => self.memory_dump(pgraph, addr, count.unwrap_or(0x40)),
                None => println!("Usage: md/[n] <addr>"),
            },
            "cmds" => {
                let commands = backend.commands();
                let n = count.unwrap_or(10).min(commands.len());
                for command in &commands[commands.len() - n..] {
                    println!("{:?}", command);
                }
            }
            "draws" => {
                let draws = backend.draws();
                let mut modes = Vec::new();
                for (mode, _) in &draws {
                    match modes.iter_mut().find(|(m, _)| m == mode) {
                        Some((_, n)) => *n += 1,
                        None => modes.push((*mode, 1usize)),
                    }
                }
                for (mode, n) in modes {
                    println!("{:?}: {}", mode, n);
                }
                println!(
                    "{} draws, {} textures alive, {} programs",
                    draws.len(),
                    backend.textures_alive(),
                    backend.count(|c| matches!(c, BackendCommand::CreateProgram { .. }))
                );
            }
            "" => {}
            _ => println!("Unknown command: {}", cmd),
        }
        true
    }
}

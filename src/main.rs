#[cfg(feature = "debugger")]
mod console;

use std::path::PathBuf;
use std::process::exit;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use kelvin_core::pgraph::recording::BackendCommand;
use kelvin_core::pgraph::regs::*;
use kelvin_core::trace::Trace;
use kelvin_core::{InterruptChannel, KelvinConfig, Pgraph, PgraphIntr, RecordingBackend, Vram};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The method trace to replay
    #[arg(required = true)]
    trace: PathBuf,
    /// VRAM size in MiB
    #[arg(long, default_value_t = 64)]
    vram_mib: usize,
    /// Instance memory size in KiB
    #[arg(long, default_value_t = 1024)]
    ramin_kib: usize,
    /// Channel the trace runs on
    #[arg(long, default_value_t = 0)]
    channel: u32,
    /// Number of textures kept in the texture cache
    #[arg(long, default_value_t = 512)]
    texture_cache_size: usize,
    /// Vertices a batch may hold before replay aborts
    #[arg(long, default_value_t = 0x1FFFF)]
    max_batch_length: usize,
    /// Log every method as it is executed
    #[arg(short, long)]
    log_methods: bool,
    /// Milliseconds between vertical blanks, a stalled flip is released at each one
    #[arg(long, default_value_t = 16)]
    vblank_ms: u64,
    /// Print every command sent to the render backend
    #[arg(short, long)]
    dump_commands: bool,
    /// Step through the trace in an interactive console instead of running it
    #[cfg(feature = "debugger")]
    #[arg(short, long)]
    console: bool,
}

/// Acknowledges every interrupt the engine raises, loading the requested
/// channel on context switches
fn spawn_interrupt_handler(pgraph: Arc<Pgraph>, receiver: Receiver<PgraphIntr>) {
    thread::spawn(move || {
        for raised in receiver.iter() {
            let pending = match pgraph.read(INTR) {
                Ok(pending) => pending,
                Err(e) => {
                    log::error!("interrupt handler: {}", e);
                    continue;
                }
            };
            log::trace!("interrupt {:?}, pending {:08X}", raised, pending);
            if pending == 0 {
                continue;
            }

            if PgraphIntr::from_bits_truncate(pending).contains(PgraphIntr::CONTEXT_SWITCH) {
                let channel = pgraph.lock().regs.get_mask(TRAPPED_ADDR, TRAPPED_ADDR_CHID);
                log::info!("loading context of channel {}", channel);
                let _ = pgraph.write(CTX_USER, channel << 24);
                let _ = pgraph.write(CTX_CONTROL, CTX_CONTROL_CHID);
            }
            if let Err(e) = pgraph.write(INTR, pending) {
                log::error!("interrupt handler: {}", e);
            }
        }
    });
}

/// Advances the display read counter while a flip is stalled
fn spawn_vblank(pgraph: Arc<Pgraph>, period: Duration) {
    thread::spawn(move || loop {
        thread::sleep(period);
        let stalled = {
            let state = pgraph.lock();
            let modulo = state.regs.get_mask(SURFACE, SURFACE_MODULO_3D);
            modulo != 0
                && state.regs.get_mask(SURFACE, SURFACE_READ_3D)
                    == state.regs.get_mask(SURFACE, SURFACE_WRITE_3D)
        };
        if stalled {
            if let Err(e) = pgraph.write(INCREMENT, INCREMENT_READ_3D) {
                log::error!("vblank: {}", e);
            }
        }
    });
}

fn setup_channel(pgraph: &Pgraph, channel: u32) -> kelvin_core::memory::Result<()> {
    pgraph.write(CTX_USER, channel << 24)?;
    pgraph.write(CTX_CONTROL, CTX_CONTROL_CHID)?;
    pgraph.write(INTR_EN, 0xFFFF_FFFF)?;
    pgraph.write(FIFO, FIFO_ACCESS)
}

fn main() {
    env_logger::init();

    let args = Args::parse();

    let trace = match Trace::from_file(&args.trace) {
        Ok(trace) => trace,
        Err(e) => {
            eprintln!("{}: {}", args.trace.display(), e);
            exit(1);
        }
    };
    log::info!(
        "{} entries, {} methods",
        trace.entries.len(),
        trace.method_count()
    );

    let mut memory = Vram::new(args.vram_mib << 20, args.ramin_kib << 10);
    if let Err(e) = trace.load_memory(&mut memory) {
        eprintln!("{}: {}", args.trace.display(), e);
        exit(1);
    }

    let config = KelvinConfig {
        texture_cache_size: args.texture_cache_size,
        max_batch_length: args.max_batch_length,
        log_methods: args.log_methods,
    };
    let backend = RecordingBackend::new();
    let (irq, receiver) = InterruptChannel::new();
    let pgraph = Arc::new(Pgraph::new(
        Box::new(memory),
        Box::new(backend.clone()),
        Arc::new(irq),
        config,
    ));

    spawn_interrupt_handler(pgraph.clone(), receiver);
    spawn_vblank(pgraph.clone(), Duration::from_millis(args.vblank_ms));

    if let Err(e) = setup_channel(&pgraph, args.channel) {
        eprintln!("channel setup failed: {}", e);
        exit(1);
    }

    #[cfg(feature = "debugger")]
    if args.console {
        match console::Console::new() {
            Ok(mut console) => console.run(&pgraph, &trace, &backend),
            Err(e) => {
                eprintln!("could not start the console: {}", e);
                exit(1);
            }
        }
        pgraph.destroy();
        return;
    }

    let summary = match trace.replay(&pgraph) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("{}: {}", args.trace.display(), e);
            exit(1);
        }
    };
    pgraph.destroy();

    if args.dump_commands {
        for command in backend.commands() {
            println!("{:?}", command);
        }
    }
    println!(
        "{} methods, {} register writes, {} draws, {} programs, {} textures created",
        summary.methods,
        summary.register_writes,
        backend.draws().len(),
        backend.count(|c| matches!(c, BackendCommand::CreateProgram { .. })),
        backend.count(|c| matches!(c, BackendCommand::CreateTexture { .. })),
    );
}

//! The PGRAPH command processor.
//!
//! [`Pgraph`] owns the engine state behind one mutex and the three condition
//! variables the engine blocks on: interrupt acknowledgement, FIFO access and
//! flip pacing. Methods are executed on the caller's thread.

pub mod backend;
mod blit;
mod dispatch;
mod kelvin;
mod lru;
pub mod methods;
pub mod recording;
pub mod regs;
mod shader;
mod surface;
mod swizzle;
mod texture;
mod transform;
mod vertex;

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::memory::interrupts::{InterruptRequester, PgraphIntr};
use crate::memory::{read_u32_le, BusLine, GuestMemory, Result};
use crate::KelvinConfig;

use backend::{PrimitiveMode, RenderBackend};
use blit::{ContextSurfaces2D, ImageBlit};
use dispatch::{DispatchTable, MethodAction, MethodCall};
use kelvin::Reports;
use methods::*;
use regs::*;
use shader::ShaderCache;
use surface::Surfaces;
use texture::Textures;
use transform::Transform;
use vertex::Vertices;

pub use backend::{QueryId, TextureId};
pub use shader::ShaderState;
pub use surface::{Surface, SurfaceShape};

/// DMA object handles selected by the `SET_CONTEXT_DMA_*` methods
#[derive(Debug, Default, Clone, Copy)]
pub struct DmaContexts {
    pub notifies: u32,
    pub a: u32,
    pub b: u32,
    pub state: u32,
    pub color: u32,
    pub zeta: u32,
    pub vertex_a: u32,
    pub vertex_b: u32,
    pub semaphore: u32,
    pub report: u32,
}

/// Coalesces runs of `ARRAY_ELEMENT16` when every method is logged
#[derive(Default)]
struct MethodLog {
    last: u32,
    count: u32,
}

impl MethodLog {
    fn log(&mut self, subchannel: u32, class: u32, method: u32, parameter: u32) {
        if self.last == NV097_ARRAY_ELEMENT16 && method != self.last {
            log::debug!(
                "pgraph method ({}): 0x{:04X} * {}",
                subchannel,
                self.last,
                self.count
            );
        }
        if method != NV097_ARRAY_ELEMENT16 {
            let name = match class {
                NV_KELVIN_PRIMITIVE => kelvin_method_name(method),
                _ => None,
            };
            match name {
                Some(name) => log::debug!(
                    "pgraph method ({}): {} (0x{:X})",
                    subchannel,
                    name,
                    parameter
                ),
                None => log::debug!(
                    "pgraph method ({}): 0x{:X} -> 0x{:04X} (0x{:X})",
                    subchannel,
                    class,
                    method,
                    parameter
                ),
            }
        }
        self.count = if method == self.last { self.count + 1 } else { 1 };
        self.last = method;
    }
}

const CONTEXT_REGISTERS: [(u32, u32); 5] = [
    (CTX_SWITCH1, CTX_CACHE1),
    (CTX_SWITCH2, CTX_CACHE2),
    (CTX_SWITCH3, CTX_CACHE3),
    (CTX_SWITCH4, CTX_CACHE4),
    (CTX_SWITCH5, CTX_CACHE5),
];

/// Everything guarded by the engine lock
pub struct PgraphState {
    pub regs: RegisterFile,
    pub pending_interrupts: PgraphIntr,
    pub enabled_interrupts: PgraphIntr,

    pub memory: Box<dyn GuestMemory>,
    backend: Box<dyn RenderBackend>,
    pub config: KelvinConfig,

    pub dma: DmaContexts,
    pub surfaces: Surfaces,
    pub textures: Textures,
    pub vertices: Vertices,
    pub transform: Transform,
    pub shaders: ShaderCache,
    pub primitive_mode: Option<PrimitiveMode>,

    pub context_surfaces_2d: ContextSurfaces2D,
    pub image_blit: ImageBlit,
    pub reports: Reports,
    /// instance of the object bound to the 3D class
    pub kelvin_object: u32,

    dispatch: DispatchTable,
    method_log: MethodLog,
}

impl PgraphState {
    fn new(
        memory: Box<dyn GuestMemory>,
        backend: Box<dyn RenderBackend>,
        config: KelvinConfig,
    ) -> Self {
        Self {
            regs: RegisterFile::default(),
            pending_interrupts: PgraphIntr::empty(),
            enabled_interrupts: PgraphIntr::empty(),
            memory,
            backend,
            config,
            dma: DmaContexts::default(),
            surfaces: Surfaces::default(),
            textures: Textures::new(config.texture_cache_size),
            vertices: Vertices::default(),
            transform: Transform::default(),
            shaders: ShaderCache::default(),
            primitive_mode: None,
            context_surfaces_2d: ContextSurfaces2D::default(),
            image_blit: ImageBlit::default(),
            reports: Reports::default(),
            kelvin_object: 0,
            dispatch: DispatchTable::new(),
            method_log: MethodLog::default(),
        }
    }

    /// Channel whose context is loaded
    pub fn channel_id(&self) -> u32 {
        self.regs.get_mask(CTX_USER, CTX_USER_CHID)
    }

    fn flip_pending(&self) -> bool {
        self.regs.get_mask(SURFACE, SURFACE_READ_3D) == self.regs.get_mask(SURFACE, SURFACE_WRITE_3D)
    }

    fn load_object(&mut self, subchannel: u32, instance: u32) {
        let ramin = self.memory.ramin();
        assert!(
            instance as usize + 16 <= ramin.len(),
            "object {:08X} outside instance memory",
            instance
        );
        let words = [
            read_u32_le(ramin, instance as usize),
            read_u32_le(ramin, instance as usize + 4),
            read_u32_le(ramin, instance as usize + 8),
            read_u32_le(ramin, instance as usize + 12),
            instance,
        ];
        for ((_, cache), word) in CONTEXT_REGISTERS.iter().zip(words) {
            self.regs.set(cache + subchannel * 4, word);
        }
    }

    /// Executes one method of the command stream
    fn method(&mut self, subchannel: u32, method: u32, parameter: u32) -> MethodAction {
        assert!(subchannel < 8, "subchannel {} out of range", subchannel);
        assert!(
            self.regs.flag(CTX_CONTROL, CTX_CONTROL_CHID),
            "method 0x{:04X} without a valid channel",
            method
        );

        if method == SET_OBJECT {
            self.load_object(subchannel, parameter);
        }
        for (switch, cache) in CONTEXT_REGISTERS {
            self.regs.set(switch, self.regs.get(cache + subchannel * 4));
        }
        let class = self.regs.get_mask(CTX_SWITCH1, CTX_SWITCH1_GRCLASS);

        if self.config.log_methods {
            self.method_log.log(subchannel, class, method, parameter);
        } else {
            log::trace!(
                "method ({}) {:02X}:{:04X} = {:08X}",
                subchannel,
                class,
                method,
                parameter
            );
        }

        if subchannel != 0 {
            assert_ne!(
                class, NV_KELVIN_PRIMITIVE,
                "3D object bound on subchannel {}",
                subchannel
            );
        }

        match self.dispatch.lookup(class, method) {
            Some((slot, handler)) => handler(
                self,
                &MethodCall {
                    subchannel,
                    method,
                    slot,
                    parameter,
                },
            ),
            None => {
                if method != SET_OBJECT {
                    log::warn!(
                        "unhandled method 0x{:04X} of class 0x{:02X} (0x{:X})",
                        method,
                        class,
                        parameter
                    );
                }
                MethodAction::Continue
            }
        }
    }

    /// Releases every backend object owned by the caches
    fn destroy(&mut self) {
        if self.primitive_mode.is_some() {
            log::warn!("destroying the engine inside a primitive");
        }
        self.destroy_textures();
        let queries = std::mem::take(&mut self.reports.queries);
        for query in queries {
            self.backend.delete_query(query);
        }
    }
}

/// Register bus of the engine, the soft registers behave as the hardware does
impl BusLine for PgraphState {
    fn read_u32(&mut self, addr: u32) -> Result<u32> {
        if addr as usize >= REGISTER_FILE_SIZE || addr % 4 != 0 {
            return Err(format!("pgraph: u32 read from invalid register {:04X}", addr));
        }
        let value = match addr {
            INTR => self.pending_interrupts.bits(),
            INTR_EN => self.enabled_interrupts.bits(),
            _ => self.regs.get(addr),
        };
        log::trace!("pgraph read {:04X} -> {:08X}", addr, value);
        Ok(value)
    }

    fn write_u32(&mut self, addr: u32, data: u32) -> Result<()> {
        if addr as usize >= REGISTER_FILE_SIZE || addr % 4 != 0 {
            return Err(format!("pgraph: u32 write to invalid register {:04X}", addr));
        }
        log::trace!("pgraph write {:04X} <- {:08X}", addr, data);

        match addr {
            INTR => self
                .pending_interrupts
                .remove(PgraphIntr::from_bits_retain(data)),
            INTR_EN => self.enabled_interrupts = PgraphIntr::from_bits_retain(data),
            INCREMENT => {
                if data & INCREMENT_READ_3D != 0 {
                    let modulo = self.regs.get_mask(SURFACE, SURFACE_MODULO_3D);
                    assert!(modulo != 0, "flip read increment with a zero modulo");
                    let read = self.regs.get_mask(SURFACE, SURFACE_READ_3D);
                    self.regs
                        .set_mask(SURFACE, SURFACE_READ_3D, (read + 1) % modulo);
                }
            }
            CHANNEL_CTX_TRIGGER => {
                let address =
                    (self.regs.get_mask(CHANNEL_CTX_POINTER, CHANNEL_CTX_POINTER_INST) << 4) as usize;
                if data & CHANNEL_CTX_TRIGGER_READ_IN != 0 {
                    let ramin = self.memory.ramin();
                    if address + 4 > ramin.len() {
                        return Err(format!(
                            "pgraph: channel context {:08X} outside instance memory",
                            address
                        ));
                    }
                    let context_user = read_u32_le(ramin, address);
                    log::info!(
                        "read channel {} context from {:08X}, CTX_USER = {:08X}",
                        self.channel_id(),
                        address,
                        context_user
                    );
                    self.regs.set(CTX_USER, context_user);
                }
                if data & CHANNEL_CTX_TRIGGER_WRITE_OUT != 0 {
                    log::debug!("channel context write out to {:08X} ignored", address);
                }
            }
            _ => self.regs.set(addr, data),
        }
        Ok(())
    }
}

/// The graphics engine shared between the command stream producer and the
/// register bus
pub struct Pgraph {
    state: Mutex<PgraphState>,
    interrupt_cond: Condvar,
    fifo_access_cond: Condvar,
    flip_cond: Condvar,
    irq: Arc<dyn InterruptRequester>,
}

impl Pgraph {
    pub fn new(
        memory: Box<dyn GuestMemory>,
        backend: Box<dyn RenderBackend>,
        irq: Arc<dyn InterruptRequester>,
        config: KelvinConfig,
    ) -> Self {
        Self {
            state: Mutex::new(PgraphState::new(memory, backend, config)),
            interrupt_cond: Condvar::new(),
            fifo_access_cond: Condvar::new(),
            flip_cond: Condvar::new(),
            irq,
        }
    }

    /// Locks the engine state. A panic inside a method poisons the lock,
    /// the state is still handed out for inspection.
    pub fn lock(&self) -> MutexGuard<'_, PgraphState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Executes one method, blocking while the engine waits on the hardware
    pub fn dispatch(&self, subchannel: u32, method: u32, parameter: u32) {
        let mut state = self.lock();
        match state.method(subchannel, method, parameter) {
            MethodAction::Continue => {}
            MethodAction::WaitInterrupt(bits) => {
                let _state = self.raise_and_wait(state, bits);
            }
            MethodAction::WaitFlip => {
                let _state = self
                    .flip_cond
                    .wait_while(state, |s| s.flip_pending())
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }
    }

    pub fn read(&self, offset: u32) -> Result<u32> {
        self.lock().read_u32(offset)
    }

    pub fn write(&self, offset: u32, value: u32) -> Result<()> {
        let mut state = self.lock();
        state.write_u32(offset, value)?;
        match offset {
            INTR => self.interrupt_cond.notify_all(),
            INCREMENT if value & INCREMENT_READ_3D != 0 => self.flip_cond.notify_all(),
            FIFO => self.fifo_access_cond.notify_all(),
            _ => {}
        }
        Ok(())
    }

    /// Makes `channel` the active one, handing the switch to the interrupt
    /// handler when another channel's context is loaded
    pub fn context_switch(&self, channel: u32) {
        let mut state = self.lock();
        let valid = state.regs.flag(CTX_CONTROL, CTX_CONTROL_CHID) && state.channel_id() == channel;
        if valid {
            return;
        }

        state
            .regs
            .set_mask(TRAPPED_ADDR, TRAPPED_ADDR_CHID, channel);
        log::info!("switching to channel {}", channel);
        assert!(
            !state.regs.flag(DEBUG_3, DEBUG_3_HW_CONTEXT_SWITCH),
            "hardware context switching is not supported"
        );
        state.pending_interrupts |= PgraphIntr::CONTEXT_SWITCH;
        let _state = self.raise_and_wait(state, PgraphIntr::CONTEXT_SWITCH);
    }

    /// Blocks until the FIFO access bit is set
    pub fn wait_fifo_access(&self) {
        let state = self.lock();
        let _state = self
            .fifo_access_cond
            .wait_while(state, |s| !s.regs.flag(FIFO, FIFO_ACCESS))
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Releases the backend objects held by the caches
    pub fn destroy(&self) {
        self.lock().destroy();
    }

    /// Asks the interrupt controller to re-evaluate with the lock released,
    /// then waits until `bits` are acknowledged through `INTR`
    fn raise_and_wait<'a>(
        &'a self,
        state: MutexGuard<'a, PgraphState>,
        bits: PgraphIntr,
    ) -> MutexGuard<'a, PgraphState> {
        let pending = state.pending_interrupts & state.enabled_interrupts;
        drop(state);
        self.irq.raise(pending);

        let state = self.lock();
        self.interrupt_cond
            .wait_while(state, |s| s.pending_interrupts.intersects(bits))
            .unwrap_or_else(PoisonError::into_inner)
    }
}

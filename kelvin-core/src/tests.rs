use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::memory::dma::DMA_CLASS_IN_MEMORY;
use crate::memory::interrupts::{InterruptChannel, InterruptRequester, NoInterrupts, PgraphIntr};
use crate::memory::{GuestMemory, Vram};
use crate::pgraph::backend::{PrimitiveMode, Rect, SurfaceKind, UniformValue};
use crate::pgraph::methods::*;
use crate::pgraph::recording::{BackendCommand, RecordedDraw, RecordingBackend};
use crate::pgraph::regs::{self, *};
use crate::pgraph::{Pgraph, TextureId};
use crate::trace::Trace;
use crate::KelvinConfig;

const VRAM_SIZE: usize = 0x40_0000;
const RAMIN_SIZE: usize = 0x1_0000;

const KELVIN_INSTANCE: u32 = 0x1000;
const SURFACES_2D_INSTANCE: u32 = 0x1010;
const IMAGE_BLIT_INSTANCE: u32 = 0x1020;
/// DMA object spanning the whole VRAM
const DMA_VRAM: u32 = 0x2000;
/// DMA object over the 4K page at `NOTIFY_PAGE`
const DMA_NOTIFY: u32 = 0x2010;
const NOTIFY_PAGE: usize = 0x38_0000;

const COLOR_OFFSET: u32 = 0;
const ZETA_OFFSET: u32 = 0x20_0000;
const TEXTURE_OFFSET_A: u32 = 0x30_0000;

fn guest_memory() -> Vram {
    let mut memory = Vram::new(VRAM_SIZE, RAMIN_SIZE);

    memory.write_ramin_u32(KELVIN_INSTANCE as usize, NV_KELVIN_PRIMITIVE);
    memory.write_ramin_u32(SURFACES_2D_INSTANCE as usize, NV_CONTEXT_SURFACES_2D);
    memory.write_ramin_u32(IMAGE_BLIT_INSTANCE as usize, NV_IMAGE_BLIT);

    memory.write_ramin_u32(DMA_VRAM as usize, DMA_CLASS_IN_MEMORY);
    memory.write_ramin_u32(DMA_VRAM as usize + 4, VRAM_SIZE as u32 - 1);
    memory.write_ramin_u32(DMA_VRAM as usize + 8, 0);

    memory.write_ramin_u32(DMA_NOTIFY as usize, DMA_CLASS_IN_MEMORY);
    memory.write_ramin_u32(DMA_NOTIFY as usize + 4, 0xFFF);
    memory.write_ramin_u32(DMA_NOTIFY as usize + 8, NOTIFY_PAGE as u32);
    memory
}

fn engine_with(memory: Vram, irq: Arc<dyn InterruptRequester>) -> (Arc<Pgraph>, RecordingBackend) {
    engine_with_config(memory, irq, KelvinConfig::default())
}

fn engine_with_config(
    memory: Vram,
    irq: Arc<dyn InterruptRequester>,
    config: KelvinConfig,
) -> (Arc<Pgraph>, RecordingBackend) {
    let _ = env_logger::builder().is_test(true).try_init();

    let backend = RecordingBackend::new();
    let pgraph = Arc::new(Pgraph::new(
        Box::new(memory),
        Box::new(backend.clone()),
        irq,
        config,
    ));
    pgraph.write(CTX_CONTROL, CTX_CONTROL_CHID).unwrap();
    pgraph.write(INTR_EN, 0xFFFF_FFFF).unwrap();
    pgraph.dispatch(0, SET_OBJECT, KELVIN_INSTANCE);
    (pgraph, backend)
}

fn engine() -> (Arc<Pgraph>, RecordingBackend) {
    engine_with(guest_memory(), Arc::new(NoInterrupts))
}

/// Pitch linear color and zeta surfaces of `width`x`height`, both writable
fn setup_surfaces(pg: &Pgraph, color_format: u32, zeta_format: u32, width: u32, height: u32) {
    let bytes_per_pixel = match color_format {
        SET_SURFACE_FORMAT_COLOR_LE_R5G6B5 => 2,
        _ => 4,
    };
    let zeta_bytes_per_pixel = match zeta_format {
        SET_SURFACE_FORMAT_ZETA_Z16 => 2,
        _ => 4,
    };

    pg.dispatch(0, NV097_SET_CONTEXT_DMA_COLOR, DMA_VRAM);
    pg.dispatch(0, NV097_SET_CONTEXT_DMA_ZETA, DMA_VRAM);
    pg.dispatch(0, NV097_SET_SURFACE_CLIP_HORIZONTAL, width << 16);
    pg.dispatch(0, NV097_SET_SURFACE_CLIP_VERTICAL, height << 16);
    pg.dispatch(
        0,
        NV097_SET_SURFACE_FORMAT,
        color_format | (zeta_format << 4) | (SET_SURFACE_FORMAT_TYPE_PITCH << 8),
    );
    pg.dispatch(
        0,
        NV097_SET_SURFACE_PITCH,
        (width * bytes_per_pixel) | ((width * zeta_bytes_per_pixel) << 16),
    );
    pg.dispatch(0, NV097_SET_SURFACE_COLOR_OFFSET, COLOR_OFFSET);
    pg.dispatch(0, NV097_SET_SURFACE_ZETA_OFFSET, ZETA_OFFSET);
    pg.dispatch(0, NV097_SET_COLOR_MASK, 0x0101_0101);
    pg.dispatch(0, NV097_SET_DEPTH_MASK, 1);
    pg.dispatch(0, NV097_SET_DEPTH_TEST_ENABLE, 1);
}

fn triangle(pg: &Pgraph) {
    pg.dispatch(0, NV097_SET_BEGIN_END, SET_BEGIN_END_OP_TRIANGLES);
    for vertex in [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]] {
        pg.dispatch(0, NV097_SET_VERTEX4F, f32::to_bits(vertex[0]));
        pg.dispatch(0, NV097_SET_VERTEX4F + 4, f32::to_bits(vertex[1]));
        pg.dispatch(0, NV097_SET_VERTEX4F + 8, 0);
        pg.dispatch(0, NV097_SET_VERTEX4F + 12, f32::to_bits(1.0));
    }
    pg.dispatch(0, NV097_SET_BEGIN_END, SET_BEGIN_END_OP_END);
}

/// Swizzled 2D 4x4 texture with one level, read through context DMA A
fn texture_4x4(color_format: u32) -> u32 {
    1 | (2 << 4) | (color_format << 8) | (1 << 16) | (2 << 20) | (2 << 24)
}

fn enable_texture(pg: &Pgraph, unit: u32, offset: u32, format: u32) {
    let base = NV097_SET_TEXTURE + unit * 0x40;
    pg.dispatch(0, base + TEXTURE_OFFSET * 4, offset);
    pg.dispatch(0, base + TEXTURE_FORMAT * 4, format);
    pg.dispatch(0, base + TEXTURE_CONTROL0 * 4, TEXCTL0_0_ENABLE);
}

fn created_textures(backend: &RecordingBackend) -> Vec<TextureId> {
    backend
        .commands()
        .into_iter()
        .filter_map(|c| match c {
            BackendCommand::CreateTexture { id, .. } => Some(id),
            _ => None,
        })
        .collect()
}

fn destroyed_textures(backend: &RecordingBackend) -> Vec<TextureId> {
    backend
        .commands()
        .into_iter()
        .filter_map(|c| match c {
            BackendCommand::DestroyTexture(id) => Some(id),
            _ => None,
        })
        .collect()
}

/// Names of the uniforms starting with `prefix`, in upload order
fn uploaded_uniforms(commands: &[BackendCommand], prefix: &str) -> Vec<String> {
    commands
        .iter()
        .filter_map(|c| match c {
            BackendCommand::SetUniform { name, .. } if name.starts_with(prefix) => {
                Some(name.clone())
            }
            _ => None,
        })
        .collect()
}

/// Acknowledges `count` interrupts the way a driver does, loading the
/// requested channel on context switches
fn spawn_interrupt_handler(
    pg: Arc<Pgraph>,
    receiver: Receiver<PgraphIntr>,
    count: usize,
) -> thread::JoinHandle<Vec<(PgraphIntr, u32)>> {
    thread::spawn(move || {
        let mut handled = Vec::new();
        for _ in 0..count {
            receiver.recv().unwrap();
            let intr = pg.read(INTR).unwrap();
            let pending = PgraphIntr::from_bits_retain(intr);
            if pending.contains(PgraphIntr::CONTEXT_SWITCH) {
                let channel = regs::get_mask(pg.read(TRAPPED_ADDR).unwrap(), TRAPPED_ADDR_CHID);
                pg.write(CTX_USER, channel << 24).unwrap();
                pg.write(CTX_CONTROL, CTX_CONTROL_CHID).unwrap();
            }
            let data = pg.read(TRAPPED_DATA_LOW).unwrap();
            handled.push((pending, data));
            pg.write(INTR, intr).unwrap();
        }
        handled
    })
}

#[test]
fn triangle_draws_and_dirties_surfaces() {
    let (pg, backend) = engine();
    setup_surfaces(
        &pg,
        SET_SURFACE_FORMAT_COLOR_LE_A8R8G8B8,
        SET_SURFACE_FORMAT_ZETA_Z24S8,
        640,
        480,
    );
    triangle(&pg);

    assert_eq!(
        backend.draws(),
        vec![(PrimitiveMode::Triangles, RecordedDraw::Ranges(vec![0..3]))]
    );
    assert!(backend.commands().contains(&BackendCommand::SetViewport(Rect {
        x: 0,
        y: 0,
        width: 640,
        height: 480
    })));

    let state = pg.lock();
    assert!(state.surfaces.color.draw_dirty);
    assert!(state.surfaces.zeta.draw_dirty);
    assert!(state.primitive_mode.is_none());
}

#[test]
fn identical_textures_share_one_backend_object() {
    let mut memory = guest_memory();
    // 4x4 swizzled A8R8G8B8
    for i in 0..16 {
        memory.write_vram_u32(TEXTURE_OFFSET_A as usize + i * 4, 0xFF00_0000 | i as u32);
    }
    let (pg, backend) = engine_with(memory, Arc::new(NoInterrupts));
    setup_surfaces(
        &pg,
        SET_SURFACE_FORMAT_COLOR_LE_A8R8G8B8,
        SET_SURFACE_FORMAT_ZETA_Z24S8,
        64,
        64,
    );
    pg.dispatch(0, NV097_SET_CONTEXT_DMA_A, DMA_VRAM);

    let format = texture_4x4(SET_TEXTURE_FORMAT_COLOR_SZ_A8R8G8B8);
    for unit in 0..2 {
        enable_texture(&pg, unit, TEXTURE_OFFSET_A, format);
    }
    triangle(&pg);

    assert_eq!(
        backend.count(|c| matches!(c, BackendCommand::CreateTexture { .. })),
        1
    );
    let bound = backend
        .commands()
        .into_iter()
        .filter_map(|c| match c {
            BackendCommand::BindTexture {
                unit,
                texture: Some(texture),
                ..
            } => Some((unit, texture)),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(bound.len(), 2);
    assert_eq!(bound[0].0, 0);
    assert_eq!(bound[1].0, 1);
    assert_eq!(bound[0].1, bound[1].1);
    assert_eq!(backend.textures_alive(), 1);

    pg.destroy();
    assert_eq!(backend.textures_alive(), 0);
}

#[test]
fn identical_state_compiles_one_program() {
    let (pg, backend) = engine();
    setup_surfaces(
        &pg,
        SET_SURFACE_FORMAT_COLOR_LE_A8R8G8B8,
        SET_SURFACE_FORMAT_ZETA_Z24S8,
        64,
        64,
    );
    triangle(&pg);
    triangle(&pg);

    assert_eq!(backend.draws().len(), 2);
    assert_eq!(
        backend.count(|c| matches!(c, BackendCommand::CreateProgram { .. })),
        1
    );
    assert_eq!(
        backend.count(|c| matches!(c, BackendCommand::BindProgram(_))),
        1
    );
    assert_eq!(pg.lock().shaders.len(), 1);
}

#[test]
fn clear_of_rgb565_surface() {
    let (pg, backend) = engine();
    setup_surfaces(
        &pg,
        SET_SURFACE_FORMAT_COLOR_LE_R5G6B5,
        SET_SURFACE_FORMAT_ZETA_Z16,
        64,
        64,
    );
    pg.dispatch(0, NV097_SET_COLOR_CLEAR_VALUE, 0xF800);
    pg.dispatch(0, NV097_SET_ZSTENCIL_CLEAR_VALUE, 0xFFFF);
    pg.dispatch(0, NV097_SET_CLEAR_RECT_HORIZONTAL, 63 << 16);
    pg.dispatch(0, NV097_SET_CLEAR_RECT_VERTICAL, (31 << 16) | 16);
    pg.dispatch(
        0,
        NV097_CLEAR_SURFACE,
        CLEAR_SURFACE_COLOR | CLEAR_SURFACE_Z | CLEAR_SURFACE_STENCIL,
    );

    let clears = backend
        .commands()
        .into_iter()
        .filter_map(|c| match c {
            BackendCommand::Clear(params) => Some(params),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(clears.len(), 1);
    let params = clears[0];
    assert_eq!(params.color, Some([1.0, 0.0, 0.0, 1.0]));
    assert_eq!(params.color_mask, [true; 4]);
    assert_eq!(params.depth, Some(1.0));
    // Z16 has no stencil
    assert_eq!(params.stencil, None);
    assert_eq!(
        params.scissor,
        Rect {
            x: 0,
            y: 32,
            width: 64,
            height: 16
        }
    );

    let state = pg.lock();
    assert!(state.surfaces.color.draw_dirty);
    assert!(state.surfaces.zeta.draw_dirty);
}

#[test]
fn readback_writes_rendered_pixels_to_guest_memory() {
    let (pg, backend) = engine();
    setup_surfaces(
        &pg,
        SET_SURFACE_FORMAT_COLOR_LE_A8R8G8B8,
        SET_SURFACE_FORMAT_ZETA_Z24S8,
        4,
        2,
    );
    triangle(&pg);

    // backend rows are bottom up
    let mut rendered = vec![0xBB; 16];
    rendered.extend_from_slice(&[0xAA; 16]);
    backend.fill_surface(SurfaceKind::Color, &rendered);

    pg.dispatch(0, NV097_WAIT_FOR_IDLE, 0);

    let state = pg.lock();
    assert!(!state.surfaces.color.draw_dirty);
    let vram = state.memory.vram();
    assert_eq!(&vram[0..16], &[0xAA; 16]);
    assert_eq!(&vram[16..32], &[0xBB; 16]);
}

#[test]
#[should_panic(expected = "into a")]
fn mixing_vertex_submission_paths_panics() {
    let (pg, _backend) = engine();
    setup_surfaces(
        &pg,
        SET_SURFACE_FORMAT_COLOR_LE_A8R8G8B8,
        SET_SURFACE_FORMAT_ZETA_Z24S8,
        64,
        64,
    );
    pg.dispatch(0, NV097_SET_BEGIN_END, SET_BEGIN_END_OP_TRIANGLES);
    for word in 0..4 {
        pg.dispatch(0, NV097_SET_VERTEX4F + word * 4, 0);
    }
    pg.dispatch(0, NV097_DRAW_ARRAYS, 2 << 24);
}

#[test]
#[should_panic(expected = "END without BEGIN")]
fn end_without_begin_panics() {
    let (pg, _backend) = engine();
    pg.dispatch(0, NV097_SET_BEGIN_END, SET_BEGIN_END_OP_END);
}

#[test]
fn zpass_report_layout() {
    let (pg, backend) = engine();
    setup_surfaces(
        &pg,
        SET_SURFACE_FORMAT_COLOR_LE_A8R8G8B8,
        SET_SURFACE_FORMAT_ZETA_Z24S8,
        64,
        64,
    );
    pg.dispatch(0, NV097_SET_CONTEXT_DMA_REPORT, DMA_NOTIFY);
    pg.dispatch(0, NV097_CLEAR_REPORT_VALUE, 0);
    pg.dispatch(0, NV097_SET_ZPASS_PIXEL_COUNT_ENABLE, 1);
    backend.set_query_result(21);
    triangle(&pg);
    triangle(&pg);
    pg.dispatch(
        0,
        NV097_GET_REPORT,
        (GET_REPORT_TYPE_ZPASS_PIXEL_CNT << 24) | 0x100,
    );

    assert_eq!(
        backend.count(|c| matches!(c, BackendCommand::BeginOcclusionQuery(_))),
        2
    );
    assert_eq!(
        backend.count(|c| matches!(c, BackendCommand::DeleteQuery(_))),
        2
    );

    let state = pg.lock();
    assert!(state.reports.queries.is_empty());
    let report = &state.memory.vram()[NOTIFY_PAGE + 0x100..NOTIFY_PAGE + 0x110];
    assert_eq!(
        report,
        &[
            0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11, 0x00, // timestamp
            42, 0, 0, 0, // pixel count
            0, 0, 0, 0, // done
        ]
    );
}

#[test]
fn semaphore_release_writes_guest_memory() {
    let (pg, _backend) = engine();
    pg.dispatch(0, NV097_SET_CONTEXT_DMA_SEMAPHORE, DMA_NOTIFY);
    pg.dispatch(0, NV097_SET_SEMAPHORE_OFFSET, 0x20);
    pg.dispatch(0, NV097_BACK_END_WRITE_SEMAPHORE_RELEASE, 0xCAFE_F00D);

    let state = pg.lock();
    let vram = state.memory.vram();
    assert_eq!(
        &vram[NOTIFY_PAGE + 0x20..NOTIFY_PAGE + 0x24],
        &0xCAFE_F00Du32.to_le_bytes()
    );
}

#[test]
#[should_panic(expected = "beyond DMA length")]
fn semaphore_outside_dma_panics() {
    let (pg, _backend) = engine();
    pg.dispatch(0, NV097_SET_CONTEXT_DMA_SEMAPHORE, DMA_NOTIFY);
    pg.dispatch(0, NV097_SET_SEMAPHORE_OFFSET, 0x1000);
    pg.dispatch(0, NV097_BACK_END_WRITE_SEMAPHORE_RELEASE, 1);
}

#[test]
fn image_blit_copies_rectangle() {
    let mut memory = guest_memory();
    let source = 0x30_0000;
    let dest = 0x30_1000;
    for y in 0..4 {
        for x in 0..4 {
            memory.write_vram_u32(source + y * 16 + x * 4, (y * 4 + x + 1) as u32);
        }
    }
    let (pg, _backend) = engine_with(memory, Arc::new(NoInterrupts));

    pg.dispatch(1, SET_OBJECT, SURFACES_2D_INSTANCE);
    pg.dispatch(1, NV062_SET_CONTEXT_DMA_IMAGE_SOURCE, DMA_VRAM);
    pg.dispatch(1, NV062_SET_CONTEXT_DMA_IMAGE_DESTIN, DMA_VRAM);
    pg.dispatch(1, NV062_SET_COLOR_FORMAT, NV062_SET_COLOR_FORMAT_LE_A8R8G8B8);
    pg.dispatch(1, NV062_SET_PITCH, 16 | (16 << 16));
    pg.dispatch(1, NV062_SET_OFFSET_SOURCE, source as u32);
    pg.dispatch(1, NV062_SET_OFFSET_DESTIN, dest as u32);

    pg.dispatch(2, SET_OBJECT, IMAGE_BLIT_INSTANCE);
    pg.dispatch(2, NV09F_SET_CONTEXT_SURFACES, SURFACES_2D_INSTANCE);
    pg.dispatch(2, NV09F_SET_OPERATION, NV09F_SET_OPERATION_SRCCOPY);
    pg.dispatch(2, NV09F_CONTROL_POINT_IN, 0);
    pg.dispatch(2, NV09F_CONTROL_POINT_OUT, 1 | (1 << 16));
    pg.dispatch(2, NV09F_SIZE, 2 | (2 << 16));

    let state = pg.lock();
    let vram = state.memory.vram();
    let pixel = |x: usize, y: usize| {
        let at = dest + y * 16 + x * 4;
        u32::from_le_bytes([vram[at], vram[at + 1], vram[at + 2], vram[at + 3]])
    };
    assert_eq!(pixel(0, 0), 0);
    assert_eq!(pixel(1, 1), 1);
    assert_eq!(pixel(2, 1), 2);
    assert_eq!(pixel(1, 2), 5);
    assert_eq!(pixel(2, 2), 6);
    assert_eq!(pixel(3, 3), 0);
}

#[test]
fn software_method_blocks_until_acknowledged() {
    let (channel, receiver) = InterruptChannel::new();
    let (pg, _backend) = engine_with(guest_memory(), Arc::new(channel));
    let handler = spawn_interrupt_handler(pg.clone(), receiver, 1);

    pg.dispatch(0, NV097_NO_OPERATION, 0x55);

    let handled = handler.join().unwrap();
    assert_eq!(handled, vec![(PgraphIntr::ERROR, 0x55)]);

    let state = pg.lock();
    assert!(state.pending_interrupts.is_empty());
    assert_eq!(state.regs.get(NSOURCE), NSOURCE_NOTIFICATION);
    assert_eq!(
        state.regs.get_mask(TRAPPED_ADDR, TRAPPED_ADDR_MTHD),
        NV097_NO_OPERATION
    );
}

#[test]
fn zero_no_operation_does_not_interrupt() {
    let (channel, receiver) = InterruptChannel::new();
    let (pg, _backend) = engine_with(guest_memory(), Arc::new(channel));
    pg.dispatch(0, NV097_NO_OPERATION, 0);
    assert!(receiver.try_recv().is_err());
}

#[test]
fn context_switch_waits_for_the_handler() {
    let (channel, receiver) = InterruptChannel::new();
    let (pg, _backend) = engine_with(guest_memory(), Arc::new(channel));
    let handler = spawn_interrupt_handler(pg.clone(), receiver, 1);

    pg.context_switch(3);
    handler.join().unwrap();
    assert_eq!(pg.lock().channel_id(), 3);

    // already loaded, returns without an interrupt
    pg.context_switch(3);
    assert!(pg.lock().pending_interrupts.is_empty());
}

#[test]
fn fifo_access_wait() {
    let (pg, _backend) = engine();
    let granted = Arc::new(AtomicBool::new(false));

    let writer = {
        let pg = pg.clone();
        let granted = granted.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            granted.store(true, Ordering::SeqCst);
            pg.write(FIFO, FIFO_ACCESS).unwrap();
        })
    };

    pg.wait_fifo_access();
    assert!(granted.load(Ordering::SeqCst));
    writer.join().unwrap();

    // access is kept, waiting again returns right away
    pg.wait_fifo_access();
}

#[test]
fn flip_stall_waits_for_read_increment() {
    let (pg, _backend) = engine();
    pg.dispatch(0, NV097_SET_FLIP_MODULO, 2);
    pg.dispatch(0, NV097_SET_FLIP_READ, 0);
    pg.dispatch(0, NV097_SET_FLIP_WRITE, 0);

    let display = {
        let pg = pg.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            pg.write(INCREMENT, INCREMENT_READ_3D).unwrap();
        })
    };

    pg.dispatch(0, NV097_FLIP_STALL, 0);
    display.join().unwrap();

    pg.dispatch(0, NV097_FLIP_INCREMENT_WRITE, 0);
    let state = pg.lock();
    assert_eq!(state.regs.get_mask(SURFACE, SURFACE_READ_3D), 1);
    assert_eq!(state.regs.get_mask(SURFACE, SURFACE_WRITE_3D), 1);
}

#[test]
fn flip_write_wraps_at_modulo() {
    let (pg, _backend) = engine();
    pg.dispatch(0, NV097_SET_FLIP_MODULO, 3);
    pg.dispatch(0, NV097_SET_FLIP_WRITE, 2);
    pg.dispatch(0, NV097_FLIP_INCREMENT_WRITE, 0);
    assert_eq!(pg.lock().regs.get_mask(SURFACE, SURFACE_WRITE_3D), 0);
}

#[test]
#[should_panic(expected = "without a valid channel")]
fn methods_need_a_loaded_channel() {
    let _ = env_logger::builder().is_test(true).try_init();
    let pg = Pgraph::new(
        Box::new(guest_memory()),
        Box::new(RecordingBackend::new()),
        Arc::new(NoInterrupts),
        KelvinConfig::default(),
    );
    pg.dispatch(0, SET_OBJECT, KELVIN_INSTANCE);
}

#[test]
fn invalid_register_access_is_an_error() {
    let (pg, _backend) = engine();
    assert!(pg.read(0x2).is_err());
    assert!(pg.write(REGISTER_FILE_SIZE as u32, 0).is_err());
}

#[test]
fn trace_replay() {
    let trace = Trace::parse(
        "# load the 3D object and a notifier DMA object\n\
         ramin 1000 97\n\
         ramin 2010 3d\n\
         ramin 2014 fff\n\
         ramin 2018 380000\n\
         @144 = 10000\n\
         @720 = 1\n\
         0 0000 1000\n\
         0 01a4 2010\n\
         0 1d6c 40\n\
         0 1d70 beef  # release\n",
    )
    .unwrap();

    let mut memory = Vram::new(VRAM_SIZE, RAMIN_SIZE);
    trace.load_memory(&mut memory).unwrap();
    let backend = RecordingBackend::new();
    let pg = Pgraph::new(
        Box::new(memory),
        Box::new(backend),
        Arc::new(NoInterrupts),
        KelvinConfig::default(),
    );

    let summary = trace.replay(&pg).unwrap();
    assert_eq!(summary.methods, 4);
    assert_eq!(summary.register_writes, 2);

    let state = pg.lock();
    assert_eq!(state.kelvin_object, 0x1000);
    assert_eq!(
        &state.memory.vram()[NOTIFY_PAGE + 0x40..NOTIFY_PAGE + 0x44],
        &0xBEEFu32.to_le_bytes()
    );
}

#[test]
fn empty_primitive_draws_nothing() {
    let (pg, backend) = engine();
    setup_surfaces(
        &pg,
        SET_SURFACE_FORMAT_COLOR_LE_A8R8G8B8,
        SET_SURFACE_FORMAT_ZETA_Z24S8,
        64,
        64,
    );
    pg.dispatch(0, NV097_SET_CONTEXT_DMA_REPORT, DMA_NOTIFY);
    pg.dispatch(0, NV097_CLEAR_REPORT_VALUE, 0);
    pg.dispatch(0, NV097_SET_ZPASS_PIXEL_COUNT_ENABLE, 1);

    pg.dispatch(0, NV097_SET_BEGIN_END, SET_BEGIN_END_OP_TRIANGLES);
    pg.dispatch(0, NV097_SET_BEGIN_END, SET_BEGIN_END_OP_END);

    assert!(backend.draws().is_empty());
    assert_eq!(
        backend.count(|c| matches!(c, BackendCommand::EndOcclusionQuery(_))),
        1
    );
    {
        let state = pg.lock();
        assert!(state.primitive_mode.is_none());
        assert_eq!(state.reports.queries.len(), 1);
    }

    // the next primitive starts from an empty batch
    triangle(&pg);
    assert_eq!(
        backend.draws(),
        vec![(PrimitiveMode::Triangles, RecordedDraw::Ranges(vec![0..3]))]
    );
}

#[test]
fn only_written_constants_are_uploaded_again() {
    const TRANSFORM_CONSTANT_ROWS: usize = 192;
    const LTCTXA_ROWS: usize = 26;

    let (pg, backend) = engine();
    setup_surfaces(
        &pg,
        SET_SURFACE_FORMAT_COLOR_LE_A8R8G8B8,
        SET_SURFACE_FORMAT_ZETA_Z24S8,
        64,
        64,
    );
    triangle(&pg);
    let first = backend.take_commands();
    assert_eq!(uploaded_uniforms(&first, "c[").len(), TRANSFORM_CONSTANT_ROWS);
    assert_eq!(uploaded_uniforms(&first, "ltctxa[").len(), LTCTXA_ROWS);

    pg.dispatch(0, NV097_SET_TRANSFORM_CONSTANT_LOAD, 5);
    for word in 0..4 {
        pg.dispatch(0, NV097_SET_TRANSFORM_CONSTANT + word * 4, f32::to_bits(2.0));
    }
    triangle(&pg);
    let second = backend.take_commands();
    assert_eq!(
        second
            .iter()
            .filter(|c| matches!(c, BackendCommand::BindProgram(_)))
            .count(),
        0
    );
    assert_eq!(uploaded_uniforms(&second, "c["), vec!["c[5]".to_string()]);
    assert!(uploaded_uniforms(&second, "ltctxa[").is_empty());
    assert!(second.contains(&BackendCommand::SetUniform {
        name: "c[5]".to_string(),
        value: UniformValue::Vec4([2.0; 4]),
    }));

    // alpha test selects another program, which gets every constant
    pg.dispatch(0, NV097_SET_ALPHA_TEST_ENABLE, 1);
    triangle(&pg);
    let third = backend.take_commands();
    assert_eq!(
        third
            .iter()
            .filter(|c| matches!(c, BackendCommand::CreateProgram { .. }))
            .count(),
        1
    );
    assert_eq!(
        third
            .iter()
            .filter(|c| matches!(c, BackendCommand::BindProgram(_)))
            .count(),
        1
    );
    assert_eq!(uploaded_uniforms(&third, "c[").len(), TRANSFORM_CONSTANT_ROWS);
    assert_eq!(uploaded_uniforms(&third, "ltctxa[").len(), LTCTXA_ROWS);
}

/// Engine with a texture cache of `capacity` entries and three distinct
/// 4x4 A8R8G8B8 textures at `texture_at(0..3)`
fn texture_cache_engine(capacity: usize) -> (Arc<Pgraph>, RecordingBackend) {
    let mut memory = guest_memory();
    for texture in 0..3 {
        for i in 0..16 {
            memory.write_vram_u32(
                texture_at(texture) as usize + i * 4,
                0xFF00_0000 | (texture << 8) | i as u32,
            );
        }
    }
    let config = KelvinConfig {
        texture_cache_size: capacity,
        ..KelvinConfig::default()
    };
    let (pg, backend) = engine_with_config(memory, Arc::new(NoInterrupts), config);
    setup_surfaces(
        &pg,
        SET_SURFACE_FORMAT_COLOR_LE_A8R8G8B8,
        SET_SURFACE_FORMAT_ZETA_Z24S8,
        64,
        64,
    );
    pg.dispatch(0, NV097_SET_CONTEXT_DMA_A, DMA_VRAM);
    (pg, backend)
}

fn texture_at(index: u32) -> u32 {
    TEXTURE_OFFSET_A + index * 0x100
}

#[test]
fn texture_cache_evicts_least_recently_bound() {
    let (pg, backend) = texture_cache_engine(2);
    let format = texture_4x4(SET_TEXTURE_FORMAT_COLOR_SZ_A8R8G8B8);

    for texture in [0, 1, 0] {
        enable_texture(&pg, 0, texture_at(texture), format);
        triangle(&pg);
    }
    let created = created_textures(&backend);
    assert_eq!(created.len(), 2);
    assert!(destroyed_textures(&backend).is_empty());

    // texture 1 was bound less recently than texture 0
    enable_texture(&pg, 0, texture_at(2), format);
    triangle(&pg);
    assert_eq!(created_textures(&backend).len(), 3);
    assert_eq!(destroyed_textures(&backend), vec![created[1]]);
    assert_eq!(backend.textures_alive(), 2);
    assert_eq!(pg.lock().textures.cache.len(), 2);
}

#[test]
fn evicted_texture_lives_while_bound() {
    let (pg, backend) = texture_cache_engine(1);
    let format = texture_4x4(SET_TEXTURE_FORMAT_COLOR_SZ_A8R8G8B8);

    enable_texture(&pg, 0, texture_at(0), format);
    triangle(&pg);
    enable_texture(&pg, 1, texture_at(1), format);
    triangle(&pg);

    let created = created_textures(&backend);
    assert_eq!(created.len(), 2);
    assert!(destroyed_textures(&backend).is_empty());
    assert_eq!(backend.textures_alive(), 2);
    assert_eq!(pg.lock().bound_texture(0), Some(created[0]));

    // unit 0 is untouched, so it keeps its evicted texture without a lookup
    triangle(&pg);
    assert_eq!(created_textures(&backend).len(), 2);
    assert_eq!(pg.lock().bound_texture(0), Some(created[0]));

    // moving unit 0 to the cached texture drops the last reference
    enable_texture(&pg, 0, texture_at(1), format);
    triangle(&pg);
    assert_eq!(created_textures(&backend).len(), 2);
    assert_eq!(destroyed_textures(&backend), vec![created[0]]);
    assert_eq!(backend.textures_alive(), 1);
    assert_eq!(pg.lock().bound_texture(0), Some(created[1]));
}

#[test]
fn clean_unit_ignores_guest_texture_writes() {
    let (pg, backend) = texture_cache_engine(2);
    let format = texture_4x4(SET_TEXTURE_FORMAT_COLOR_SZ_A8R8G8B8);

    enable_texture(&pg, 0, texture_at(0), format);
    triangle(&pg);
    {
        let mut state = pg.lock();
        let at = texture_at(0) as usize;
        state.memory.vram_mut()[at..at + 4].copy_from_slice(&0x1234_5678u32.to_le_bytes());
    }
    triangle(&pg);
    assert_eq!(created_textures(&backend).len(), 1);

    // rewriting the offset marks the unit dirty and the new data is hashed
    enable_texture(&pg, 0, texture_at(0), format);
    triangle(&pg);
    assert_eq!(created_textures(&backend).len(), 2);
}

#[test]
#[should_panic(expected = "palette index 64 beyond its 32 entries")]
fn palette_index_beyond_palette_length_panics() {
    let palette_offset = TEXTURE_OFFSET_A + 0x1000;
    let mut memory = guest_memory();
    // 4x4 I8 texture whose first texel is 0x40
    memory.write_vram_u32(TEXTURE_OFFSET_A as usize, 0x40);
    let (pg, _backend) = engine_with(memory, Arc::new(NoInterrupts));
    setup_surfaces(
        &pg,
        SET_SURFACE_FORMAT_COLOR_LE_A8R8G8B8,
        SET_SURFACE_FORMAT_ZETA_Z24S8,
        64,
        64,
    );
    pg.dispatch(0, NV097_SET_CONTEXT_DMA_A, DMA_VRAM);
    enable_texture(
        &pg,
        0,
        TEXTURE_OFFSET_A,
        texture_4x4(SET_TEXTURE_FORMAT_COLOR_SZ_I8_A8R8G8B8),
    );
    // 32 entries
    pg.dispatch(
        0,
        NV097_SET_TEXTURE + TEXTURE_PALETTE * 4,
        palette_offset | (3 << 2),
    );
    triangle(&pg);
}

#[test]
#[should_panic(expected = "Color surface pitch 80 smaller than a row of 100 bytes")]
fn surface_pitch_shorter_than_row_panics() {
    let (pg, _backend) = engine();
    setup_surfaces(
        &pg,
        SET_SURFACE_FORMAT_COLOR_LE_A8R8G8B8,
        SET_SURFACE_FORMAT_ZETA_Z24S8,
        64,
        64,
    );
    pg.dispatch(0, NV097_SET_SURFACE_PITCH, 0x80 | (0x100 << 16));
    triangle(&pg);
}

//! Methods of the 3D primitive class: flip pacing, surface setup, raster
//! state, the BEGIN/END primitive state machine, clears and reports.

use super::backend::{
    BlendEquation, BlendFactor, BlendState, ClearParams, CompareFunc, CullFace, FrontFace,
    PrimitiveMode, QueryId, Rect, RenderState, StencilOp, StencilState,
};
use super::dispatch::{MethodAction, MethodCall};
use super::methods::*;
use super::regs::*;
use super::shader::polygon_mode;
use super::PgraphState;
use crate::memory::dma::DmaObject;
use crate::memory::interrupts::PgraphIntr;
use crate::memory::{write_u32_le, write_u64_le};

/// Timestamp written into every report, the engine has no clock
const REPORT_TIMESTAMP: u64 = 0x0011_2233_4455_6677;
const REPORT_SIZE: usize = 16;

const F16_MAX: f32 = 511.9375;
const F24_MAX: f32 = 3.4027977E38;

/// Occlusion query bookkeeping for the zpass pixel count report
#[derive(Debug, Default)]
pub struct Reports {
    pub pixel_count_enable: bool,
    pub pixel_count_result: u32,
    /// queries ended but not yet summed into the result
    pub queries: Vec<QueryId>,
    /// query running for the current primitive
    pub active_query: Option<QueryId>,
}

/// Floating point depth with a 4 bit exponent
fn f16_to_float(f16: u16) -> f32 {
    if f16 == 0 {
        return 0.0;
    }
    f32::from_bits(((f16 as u32) << 11) + 0x3C00_0000)
}

/// Floating point depth with an 8 bit exponent
fn f24_to_float(f24: u32) -> f32 {
    assert!(f24 >> 24 == 0, "f24 depth {:X} wider than 24 bits", f24);
    if f24 == 0 {
        return 0.0;
    }
    f32::from_bits(f24 << 7)
}

fn blend_factor(parameter: u32) -> u32 {
    match parameter {
        SET_BLEND_FACTOR_V_ZERO => 0,
        SET_BLEND_FACTOR_V_ONE => 1,
        SET_BLEND_FACTOR_V_SRC_COLOR => 2,
        SET_BLEND_FACTOR_V_ONE_MINUS_SRC_COLOR => 3,
        SET_BLEND_FACTOR_V_SRC_ALPHA => 4,
        SET_BLEND_FACTOR_V_ONE_MINUS_SRC_ALPHA => 5,
        SET_BLEND_FACTOR_V_DST_ALPHA => 6,
        SET_BLEND_FACTOR_V_ONE_MINUS_DST_ALPHA => 7,
        SET_BLEND_FACTOR_V_DST_COLOR => 8,
        SET_BLEND_FACTOR_V_ONE_MINUS_DST_COLOR => 9,
        SET_BLEND_FACTOR_V_SRC_ALPHA_SATURATE => 0xA,
        SET_BLEND_FACTOR_V_CONSTANT_COLOR => 0xC,
        SET_BLEND_FACTOR_V_ONE_MINUS_CONSTANT_COLOR => 0xD,
        SET_BLEND_FACTOR_V_CONSTANT_ALPHA => 0xE,
        SET_BLEND_FACTOR_V_ONE_MINUS_CONSTANT_ALPHA => 0xF,
        _ => panic!("unknown blend factor 0x{:X}", parameter),
    }
}

fn blend_equation(parameter: u32) -> u32 {
    match parameter {
        SET_BLEND_EQUATION_V_FUNC_SUBTRACT => 0,
        SET_BLEND_EQUATION_V_FUNC_REVERSE_SUBTRACT => 1,
        SET_BLEND_EQUATION_V_FUNC_ADD => 2,
        SET_BLEND_EQUATION_V_MIN => 3,
        SET_BLEND_EQUATION_V_MAX => 4,
        SET_BLEND_EQUATION_V_FUNC_REVERSE_SUBTRACT_SIGNED => 5,
        SET_BLEND_EQUATION_V_FUNC_ADD_SIGNED => 6,
        _ => panic!("unknown blend equation 0x{:X}", parameter),
    }
}

fn stencil_op(parameter: u32) -> u32 {
    match parameter {
        SET_STENCIL_OP_V_KEEP => 1,
        SET_STENCIL_OP_V_ZERO => 2,
        SET_STENCIL_OP_V_REPLACE => 3,
        SET_STENCIL_OP_V_INCRSAT => 4,
        SET_STENCIL_OP_V_DECRSAT => 5,
        SET_STENCIL_OP_V_INVERT => 6,
        SET_STENCIL_OP_V_INCR => 7,
        SET_STENCIL_OP_V_DECR => 8,
        _ => panic!("unknown stencil op 0x{:X}", parameter),
    }
}

fn face_mode(parameter: u32) -> u32 {
    match parameter {
        SET_POLYGON_MODE_V_POINT => SETUPRASTER_FACEMODE_POINT,
        SET_POLYGON_MODE_V_LINE => SETUPRASTER_FACEMODE_LINE,
        SET_POLYGON_MODE_V_FILL => SETUPRASTER_FACEMODE_FILL,
        _ => panic!("unknown polygon mode 0x{:X}", parameter),
    }
}

/// ARGB register color as normalized red, green, blue, alpha
fn argb_to_rgba(color: u32) -> [f32; 4] {
    [
        ((color >> 16) & 0xFF) as f32 / 255.0,
        ((color >> 8) & 0xFF) as f32 / 255.0,
        (color & 0xFF) as f32 / 255.0,
        ((color >> 24) & 0xFF) as f32 / 255.0,
    ]
}

impl PgraphState {
    fn depth_test_enabled(&self) -> bool {
        self.regs.flag(CONTROL_0, CONTROL_0_ZENABLE)
    }

    fn stencil_test_enabled(&self) -> bool {
        self.regs.flag(CONTROL_1, CONTROL_1_STENCIL_TEST_ENABLE)
    }

    /// Backend raster state for the primitive about to start
    fn render_state(&self) -> RenderState {
        let regs = &self.regs;

        let blend = if regs.flag(BLEND, BLEND_EN) {
            Some(BlendState {
                src_factor: BlendFactor::from_register(regs.get_mask(BLEND, BLEND_SFACTOR)),
                dst_factor: BlendFactor::from_register(regs.get_mask(BLEND, BLEND_DFACTOR)),
                equation: BlendEquation::from_register(regs.get_mask(BLEND, BLEND_EQN)),
                color: argb_to_rgba(regs.get(BLENDCOLOR)),
            })
        } else {
            None
        };

        let cull = if regs.flag(SETUPRASTER, SETUPRASTER_CULLENABLE) {
            let face = match regs.get_mask(SETUPRASTER, SETUPRASTER_CULLCTRL) {
                SETUPRASTER_CULLCTRL_FRONT => CullFace::Front,
                SETUPRASTER_CULLCTRL_BACK => CullFace::Back,
                SETUPRASTER_CULLCTRL_FRONT_AND_BACK => CullFace::FrontAndBack,
                face => panic!("invalid cull face {}", face),
            };
            Some(face)
        } else {
            None
        };

        let stencil_test = if self.stencil_test_enabled() {
            Some(StencilState {
                func: CompareFunc::from_register(regs.get_mask(CONTROL_1, CONTROL_1_STENCIL_FUNC)),
                reference: regs.get_mask(CONTROL_1, CONTROL_1_STENCIL_REF) as u8,
                read_mask: regs.get_mask(CONTROL_1, CONTROL_1_STENCIL_MASK_READ) as u8,
                write_mask: regs.get_mask(CONTROL_1, CONTROL_1_STENCIL_MASK_WRITE) as u8,
                op_fail: StencilOp::from_register(regs.get_mask(CONTROL_2, CONTROL_2_STENCIL_OP_FAIL)),
                op_zfail: StencilOp::from_register(
                    regs.get_mask(CONTROL_2, CONTROL_2_STENCIL_OP_ZFAIL),
                ),
                op_zpass: StencilOp::from_register(
                    regs.get_mask(CONTROL_2, CONTROL_2_STENCIL_OP_ZPASS),
                ),
            })
        } else {
            None
        };

        RenderState {
            color_mask: [
                regs.flag(CONTROL_0, CONTROL_0_RED_WRITE_ENABLE),
                regs.flag(CONTROL_0, CONTROL_0_GREEN_WRITE_ENABLE),
                regs.flag(CONTROL_0, CONTROL_0_BLUE_WRITE_ENABLE),
                regs.flag(CONTROL_0, CONTROL_0_ALPHA_WRITE_ENABLE),
            ],
            depth_write: regs.flag(CONTROL_0, CONTROL_0_ZWRITEENABLE),
            stencil_write_mask: regs.get_mask(CONTROL_1, CONTROL_1_STENCIL_MASK_WRITE) as u8,
            blend,
            logic_op: regs
                .flag(BLEND, BLEND_LOGICOP_ENABLE)
                .then(|| regs.get_mask(BLEND, BLEND_LOGICOP)),
            cull,
            front_face: if regs.flag(SETUPRASTER, SETUPRASTER_FRONTFACE) {
                FrontFace::CounterClockwise
            } else {
                FrontFace::Clockwise
            },
            polygon_mode: [
                polygon_mode(regs.get_mask(SETUPRASTER, SETUPRASTER_FRONTFACEMODE)),
                polygon_mode(regs.get_mask(SETUPRASTER, SETUPRASTER_BACKFACEMODE)),
            ],
            polygon_offset_enable: [
                regs.flag(SETUPRASTER, SETUPRASTER_POFFSETPOINTENABLE),
                regs.flag(SETUPRASTER, SETUPRASTER_POFFSETLINEENABLE),
                regs.flag(SETUPRASTER, SETUPRASTER_POFFSETFILLENABLE),
            ],
            polygon_offset_factor: regs.get_f32(ZOFFSETFACTOR),
            polygon_offset_units: regs.get_f32(ZOFFSETBIAS),
            depth_test: self
                .depth_test_enabled()
                .then(|| CompareFunc::from_register(regs.get_mask(CONTROL_0, CONTROL_0_ZFUNC))),
            stencil_test,
            dither: regs.flag(CONTROL_0, CONTROL_0_DITHERENABLE),
        }
    }

    fn begin_primitive(&mut self, mode: PrimitiveMode) {
        assert!(
            self.primitive_mode.is_none(),
            "BEGIN {:?} inside a {:?} primitive",
            mode,
            self.primitive_mode
        );
        let zeta = self.depth_test_enabled() || self.stencil_test_enabled();
        self.update_surface(true, true, zeta);
        self.primitive_mode = Some(mode);

        let state = self.render_state();
        self.backend.set_render_state(&state);

        self.bind_shaders();
        self.bind_textures();

        let (width, height) = self.surface_dimensions();
        let (width, height) = self.apply_anti_aliasing_factor(width, height);
        self.backend.set_viewport(Rect {
            x: 0,
            y: 0,
            width,
            height,
        });
        self.backend.set_scissor(None);

        self.reset_batch();

        if self.reports.pixel_count_enable {
            let query = self.backend.begin_occlusion_query();
            self.reports.active_query = Some(query);
        }
    }

    fn end_primitive(&mut self) {
        self.flush_batch();

        if let Some(query) = self.reports.active_query.take() {
            self.backend.end_occlusion_query(query);
            self.reports.queries.push(query);
        }
        self.primitive_mode = None;
    }

    fn delete_queries(&mut self) {
        for query in std::mem::take(&mut self.reports.queries) {
            self.backend.delete_query(query);
        }
    }

    /// Start offset of `len` bytes at `offset` in the object `handle`
    fn map_dma_range(&self, handle: u32, offset: usize, len: usize, what: &str) -> usize {
        let (start, dma_len) = DmaObject::load(self.memory.ramin(), handle).map(self.memory.vram().len());
        assert!(
            offset + len <= dma_len,
            "{} at {:X} beyond DMA length {:X}",
            what,
            offset,
            dma_len
        );
        start + offset
    }

    /// Clear color of the current color format, as red, green, blue, alpha
    fn clear_color(&self) -> [f32; 4] {
        let color = self.regs.get(COLORCLEARVALUE);
        let format = self.surfaces.shape.color_format;

        let [red, green, blue] = match format {
            SET_SURFACE_FORMAT_COLOR_LE_X1R5G5B5_Z1R5G5B5
            | SET_SURFACE_FORMAT_COLOR_LE_X1R5G5B5_O1R5G5B5 => {
                log::warn!("clear of an X1R5G5B5 surface");
                [
                    ((color >> 10) & 0x1F) as f32 / 31.0,
                    ((color >> 5) & 0x1F) as f32 / 31.0,
                    (color & 0x1F) as f32 / 31.0,
                ]
            }
            SET_SURFACE_FORMAT_COLOR_LE_R5G6B5 => [
                ((color >> 11) & 0x1F) as f32 / 31.0,
                ((color >> 5) & 0x3F) as f32 / 63.0,
                (color & 0x1F) as f32 / 31.0,
            ],
            SET_SURFACE_FORMAT_COLOR_LE_X8R8G8B8_Z8R8G8B8
            | SET_SURFACE_FORMAT_COLOR_LE_X8R8G8B8_O8R8G8B8
            | SET_SURFACE_FORMAT_COLOR_LE_X1A7R8G8B8_Z1A7R8G8B8
            | SET_SURFACE_FORMAT_COLOR_LE_X1A7R8G8B8_O1A7R8G8B8
            | SET_SURFACE_FORMAT_COLOR_LE_A8R8G8B8 => [
                ((color >> 16) & 0xFF) as f32 / 255.0,
                ((color >> 8) & 0xFF) as f32 / 255.0,
                (color & 0xFF) as f32 / 255.0,
            ],
            _ => panic!("clear of color surface format 0x{:X}", format),
        };

        let alpha = match format {
            SET_SURFACE_FORMAT_COLOR_LE_X1A7R8G8B8_Z1A7R8G8B8
            | SET_SURFACE_FORMAT_COLOR_LE_X1A7R8G8B8_O1A7R8G8B8 => {
                log::warn!("clear of an X1A7R8G8B8 surface");
                ((color >> 24) & 0x7F) as f32 / 127.0
            }
            SET_SURFACE_FORMAT_COLOR_LE_A8R8G8B8 => ((color >> 24) & 0xFF) as f32 / 255.0,
            _ => 1.0,
        };

        [red, green, blue, alpha]
    }

    /// Clear depth and stencil of the current zeta format
    fn clear_depth_stencil(&self) -> (f32, Option<u8>) {
        let value = self.regs.get(ZSTENCILCLEARVALUE);
        let float = self.surfaces.shape.z_format;

        match self.surfaces.shape.zeta_format {
            SET_SURFACE_FORMAT_ZETA_Z16 => {
                let z = (value & 0xFFFF) as u16;
                let depth = if float {
                    log::warn!("clear of a floating point Z16 surface");
                    f16_to_float(z) / F16_MAX
                } else {
                    z as f32 / 65535.0
                };
                (depth, None)
            }
            SET_SURFACE_FORMAT_ZETA_Z24S8 => {
                let z = value >> 8;
                let depth = if float {
                    log::warn!("clear of a floating point Z24S8 surface");
                    f24_to_float(z) / F24_MAX
                } else {
                    z as f32 / 16777215.0
                };
                (depth, Some((value & 0xFF) as u8))
            }
            format => panic!("clear of zeta surface format 0x{:X}", format),
        }
    }

    /// The clear rectangle in backend coordinates, rows counted from the bottom
    fn clear_scissor(&self) -> Rect {
        let xmin = self.regs.get_mask(CLEARRECTX, CLEARRECTX_XMIN);
        let xmax = self.regs.get_mask(CLEARRECTX, CLEARRECTX_XMAX);
        let ymin = self.regs.get_mask(CLEARRECTY, CLEARRECTY_YMIN);
        let ymax = self.regs.get_mask(CLEARRECTY, CLEARRECTY_YMAX);
        assert!(
            xmin <= xmax && ymin <= ymax,
            "inverted clear rectangle ({}, {}) - ({}, {})",
            xmin,
            ymin,
            xmax,
            ymax
        );

        let x = xmin;
        let y = self
            .surfaces
            .shape
            .clip_height
            .saturating_sub(ymax + 1);
        let (x, y) = self.apply_anti_aliasing_factor(x, y);
        let (width, height) = self.apply_anti_aliasing_factor(xmax - xmin + 1, ymax - ymin + 1);
        Rect {
            x,
            y,
            width,
            height,
        }
    }
}

// channel and flip control

pub(super) fn set_object(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.kelvin_object = call.parameter;
    MethodAction::Continue
}

/// A non zero parameter is a software method, the driver expects an
/// interrupt it handles before the stream continues
pub(super) fn no_operation(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    if call.parameter == 0 {
        return MethodAction::Continue;
    }
    assert!(
        !pg.pending_interrupts.contains(PgraphIntr::ERROR),
        "software method while an error interrupt is pending"
    );

    let channel = pg.channel_id();
    pg.regs.set_mask(TRAPPED_ADDR, TRAPPED_ADDR_CHID, channel);
    pg.regs.set_mask(TRAPPED_ADDR, TRAPPED_ADDR_SUBCH, call.subchannel);
    pg.regs.set_mask(TRAPPED_ADDR, TRAPPED_ADDR_MTHD, call.method);
    pg.regs.set(TRAPPED_DATA_LOW, call.parameter);
    pg.regs.set(NSOURCE, NSOURCE_NOTIFICATION);
    pg.pending_interrupts |= PgraphIntr::ERROR;

    log::debug!(
        "software method on channel {} subchannel {}, parameter {:X}",
        channel,
        call.subchannel,
        call.parameter
    );
    MethodAction::WaitInterrupt(PgraphIntr::ERROR)
}

pub(super) fn wait_for_idle(pg: &mut PgraphState, _call: &MethodCall) -> MethodAction {
    pg.update_surface(false, true, true);
    MethodAction::Continue
}

pub(super) fn set_flip_read(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set_mask(SURFACE, SURFACE_READ_3D, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_flip_write(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set_mask(SURFACE, SURFACE_WRITE_3D, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_flip_modulo(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set_mask(SURFACE, SURFACE_MODULO_3D, call.parameter);
    MethodAction::Continue
}

pub(super) fn flip_increment_write(pg: &mut PgraphState, _call: &MethodCall) -> MethodAction {
    let modulo = pg.regs.get_mask(SURFACE, SURFACE_MODULO_3D);
    assert!(modulo != 0, "flip write increment with a zero modulo");
    let write = pg.regs.get_mask(SURFACE, SURFACE_WRITE_3D);
    let next = (write + 1) % modulo;
    log::debug!("flip increment write {} -> {}", write, next);
    pg.regs.set_mask(SURFACE, SURFACE_WRITE_3D, next);
    MethodAction::Continue
}

pub(super) fn flip_stall(pg: &mut PgraphState, _call: &MethodCall) -> MethodAction {
    pg.update_surface(false, true, true);
    log::debug!(
        "flip stall read {} write {} modulo {}",
        pg.regs.get_mask(SURFACE, SURFACE_READ_3D),
        pg.regs.get_mask(SURFACE, SURFACE_WRITE_3D),
        pg.regs.get_mask(SURFACE, SURFACE_MODULO_3D)
    );
    MethodAction::WaitFlip
}

// DMA contexts

pub(super) fn set_context_dma_notifies(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.dma.notifies = call.parameter;
    MethodAction::Continue
}

pub(super) fn set_context_dma_a(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.dma.a = call.parameter;
    MethodAction::Continue
}

pub(super) fn set_context_dma_b(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.dma.b = call.parameter;
    MethodAction::Continue
}

pub(super) fn set_context_dma_state(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.dma.state = call.parameter;
    MethodAction::Continue
}

pub(super) fn set_context_dma_color(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    // draws to the old target land in its memory first
    pg.update_surface(false, true, true);
    pg.dma.color = call.parameter;
    MethodAction::Continue
}

pub(super) fn set_context_dma_zeta(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.dma.zeta = call.parameter;
    MethodAction::Continue
}

pub(super) fn set_context_dma_vertex_a(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.dma.vertex_a = call.parameter;
    MethodAction::Continue
}

pub(super) fn set_context_dma_vertex_b(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.dma.vertex_b = call.parameter;
    MethodAction::Continue
}

pub(super) fn set_context_dma_semaphore(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.dma.semaphore = call.parameter;
    MethodAction::Continue
}

pub(super) fn set_context_dma_report(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.dma.report = call.parameter;
    MethodAction::Continue
}

// surfaces

pub(super) fn set_surface_clip_horizontal(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.update_surface(false, true, true);
    pg.surfaces.shape.clip_x = get_mask(call.parameter, SET_SURFACE_CLIP_X);
    pg.surfaces.shape.clip_width = get_mask(call.parameter, SET_SURFACE_CLIP_WIDTH);
    MethodAction::Continue
}

pub(super) fn set_surface_clip_vertical(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.update_surface(false, true, true);
    pg.surfaces.shape.clip_y = get_mask(call.parameter, SET_SURFACE_CLIP_X);
    pg.surfaces.shape.clip_height = get_mask(call.parameter, SET_SURFACE_CLIP_WIDTH);
    MethodAction::Continue
}

pub(super) fn set_surface_format(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.update_surface(false, true, true);
    let parameter = call.parameter;
    let shape = &mut pg.surfaces.shape;
    shape.color_format = get_mask(parameter, SET_SURFACE_FORMAT_COLOR);
    shape.zeta_format = get_mask(parameter, SET_SURFACE_FORMAT_ZETA);
    shape.anti_aliasing = get_mask(parameter, SET_SURFACE_FORMAT_ANTI_ALIASING);
    shape.log_width = get_mask(parameter, SET_SURFACE_FORMAT_WIDTH);
    shape.log_height = get_mask(parameter, SET_SURFACE_FORMAT_HEIGHT);
    pg.surfaces.surface_type = get_mask(parameter, SET_SURFACE_FORMAT_TYPE);
    MethodAction::Continue
}

pub(super) fn set_surface_pitch(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.update_surface(false, true, true);
    pg.surfaces.color.pitch = get_mask(call.parameter, SET_SURFACE_PITCH_COLOR);
    pg.surfaces.zeta.pitch = get_mask(call.parameter, SET_SURFACE_PITCH_ZETA);
    pg.surfaces.color.buffer_dirty = true;
    pg.surfaces.zeta.buffer_dirty = true;
    MethodAction::Continue
}

pub(super) fn set_surface_color_offset(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.update_surface(false, true, true);
    pg.surfaces.color.offset = call.parameter;
    pg.surfaces.color.buffer_dirty = true;
    MethodAction::Continue
}

pub(super) fn set_surface_zeta_offset(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.update_surface(false, true, true);
    pg.surfaces.zeta.offset = call.parameter;
    pg.surfaces.zeta.buffer_dirty = true;
    MethodAction::Continue
}

// register combiners and pixel shader

pub(super) fn set_combiner_alpha_icw(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(COMBINEALPHAI0 + call.slot as u32 * 4, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_combiner_alpha_ocw(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(COMBINEALPHAO0 + call.slot as u32 * 4, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_combiner_color_icw(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(COMBINECOLORI0 + call.slot as u32 * 4, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_combiner_color_ocw(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(COMBINECOLORO0 + call.slot as u32 * 4, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_combiner_factor0(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(COMBINEFACTOR0 + call.slot as u32 * 4, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_combiner_factor1(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(COMBINEFACTOR1 + call.slot as u32 * 4, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_combiner_specular_fog_cw0(
    pg: &mut PgraphState,
    call: &MethodCall,
) -> MethodAction {
    pg.regs.set(COMBINESPECFOG0, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_combiner_specular_fog_cw1(
    pg: &mut PgraphState,
    call: &MethodCall,
) -> MethodAction {
    pg.regs.set(COMBINESPECFOG1, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_combiner_control(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(COMBINECTL, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_shader_stage_program(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(SHADERPROG, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_shader_other_stage_input(
    pg: &mut PgraphState,
    call: &MethodCall,
) -> MethodAction {
    pg.regs.set(SHADERCTL, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_shader_clip_plane_mode(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(SHADERCLIPMODE, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_specular_fog_factor(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(SPECFOGFACTOR0 + call.slot as u32 * 4, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_control0(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.update_surface(false, true, true);
    let parameter = call.parameter;
    pg.regs.set_flag(
        CONTROL_0,
        CONTROL_0_STENCIL_WRITE_ENABLE,
        parameter & SET_CONTROL0_STENCIL_WRITE_ENABLE != 0,
    );
    pg.regs.set_mask(
        SETUPRASTER,
        SETUPRASTER_Z_FORMAT,
        get_mask(parameter, SET_CONTROL0_Z_FORMAT),
    );
    pg.regs.set_flag(
        CONTROL_0,
        CONTROL_0_Z_PERSPECTIVE_ENABLE,
        parameter & SET_CONTROL0_Z_PERSPECTIVE_ENABLE != 0,
    );
    MethodAction::Continue
}

// window clipping

pub(super) fn set_window_clip_type(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_mask(SETUPRASTER, SETUPRASTER_WINDOWCLIPTYPE, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_window_clip_horizontal(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(WINDOWCLIPX0 + call.slot as u32 * 4, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_window_clip_vertical(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(WINDOWCLIPY0 + call.slot as u32 * 4, call.parameter);
    MethodAction::Continue
}

// enables

pub(super) fn set_alpha_test_enable(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_mask(CONTROL_0, CONTROL_0_ALPHATESTENABLE, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_blend_enable(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set_mask(BLEND, BLEND_EN, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_cull_face_enable(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_mask(SETUPRASTER, SETUPRASTER_CULLENABLE, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_depth_test_enable(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set_mask(CONTROL_0, CONTROL_0_ZENABLE, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_dither_enable(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_mask(CONTROL_0, CONTROL_0_DITHERENABLE, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_stencil_test_enable(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_mask(CONTROL_1, CONTROL_1_STENCIL_TEST_ENABLE, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_poly_offset_point_enable(
    pg: &mut PgraphState,
    call: &MethodCall,
) -> MethodAction {
    pg.regs
        .set_mask(SETUPRASTER, SETUPRASTER_POFFSETPOINTENABLE, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_poly_offset_line_enable(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_mask(SETUPRASTER, SETUPRASTER_POFFSETLINEENABLE, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_poly_offset_fill_enable(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_mask(SETUPRASTER, SETUPRASTER_POFFSETFILLENABLE, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_logic_op_enable(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_mask(BLEND, BLEND_LOGICOP_ENABLE, call.parameter);
    MethodAction::Continue
}

// raster state

pub(super) fn set_alpha_func(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_mask(CONTROL_0, CONTROL_0_ALPHAFUNC, call.parameter & 0xF);
    MethodAction::Continue
}

pub(super) fn set_alpha_ref(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set_mask(CONTROL_0, CONTROL_0_ALPHAREF, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_blend_func_sfactor(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_mask(BLEND, BLEND_SFACTOR, blend_factor(call.parameter));
    MethodAction::Continue
}

pub(super) fn set_blend_func_dfactor(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_mask(BLEND, BLEND_DFACTOR, blend_factor(call.parameter));
    MethodAction::Continue
}

pub(super) fn set_blend_color(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(BLENDCOLOR, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_blend_equation(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_mask(BLEND, BLEND_EQN, blend_equation(call.parameter));
    MethodAction::Continue
}

pub(super) fn set_depth_func(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_mask(CONTROL_0, CONTROL_0_ZFUNC, call.parameter & 0xF);
    MethodAction::Continue
}

/// Remembers that color was writable before the mask changes, so a later
/// readback still picks up what was drawn
pub(super) fn set_color_mask(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.surfaces.color.write_enabled_cache |= pg.color_write_enabled();
    let parameter = call.parameter;
    let regs = &mut pg.regs;
    regs.set_flag(
        CONTROL_0,
        CONTROL_0_ALPHA_WRITE_ENABLE,
        parameter & SET_COLOR_MASK_ALPHA_WRITE_ENABLE != 0,
    );
    regs.set_flag(
        CONTROL_0,
        CONTROL_0_RED_WRITE_ENABLE,
        parameter & SET_COLOR_MASK_RED_WRITE_ENABLE != 0,
    );
    regs.set_flag(
        CONTROL_0,
        CONTROL_0_GREEN_WRITE_ENABLE,
        parameter & SET_COLOR_MASK_GREEN_WRITE_ENABLE != 0,
    );
    regs.set_flag(
        CONTROL_0,
        CONTROL_0_BLUE_WRITE_ENABLE,
        parameter & SET_COLOR_MASK_BLUE_WRITE_ENABLE != 0,
    );
    MethodAction::Continue
}

pub(super) fn set_depth_mask(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.surfaces.zeta.write_enabled_cache |= pg.zeta_write_enabled();
    pg.regs
        .set_mask(CONTROL_0, CONTROL_0_ZWRITEENABLE, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_stencil_mask(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_mask(CONTROL_1, CONTROL_1_STENCIL_MASK_WRITE, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_stencil_func(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_mask(CONTROL_1, CONTROL_1_STENCIL_FUNC, call.parameter & 0xF);
    MethodAction::Continue
}

pub(super) fn set_stencil_func_ref(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_mask(CONTROL_1, CONTROL_1_STENCIL_REF, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_stencil_func_mask(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_mask(CONTROL_1, CONTROL_1_STENCIL_MASK_READ, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_stencil_op_fail(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_mask(CONTROL_2, CONTROL_2_STENCIL_OP_FAIL, stencil_op(call.parameter));
    MethodAction::Continue
}

pub(super) fn set_stencil_op_zfail(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_mask(CONTROL_2, CONTROL_2_STENCIL_OP_ZFAIL, stencil_op(call.parameter));
    MethodAction::Continue
}

pub(super) fn set_stencil_op_zpass(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_mask(CONTROL_2, CONTROL_2_STENCIL_OP_ZPASS, stencil_op(call.parameter));
    MethodAction::Continue
}

pub(super) fn set_shade_mode(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let mode = match call.parameter {
        SET_SHADE_MODE_V_FLAT => CONTROL_3_SHADEMODE_FLAT,
        SET_SHADE_MODE_V_SMOOTH => CONTROL_3_SHADEMODE_SMOOTH,
        mode => panic!("unknown shade mode 0x{:X}", mode),
    };
    pg.regs.set_mask(CONTROL_3, CONTROL_3_SHADEMODE, mode);
    MethodAction::Continue
}

pub(super) fn set_polygon_offset_scale_factor(
    pg: &mut PgraphState,
    call: &MethodCall,
) -> MethodAction {
    pg.regs.set(ZOFFSETFACTOR, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_polygon_offset_bias(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(ZOFFSETBIAS, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_front_polygon_mode(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_mask(SETUPRASTER, SETUPRASTER_FRONTFACEMODE, face_mode(call.parameter));
    MethodAction::Continue
}

pub(super) fn set_back_polygon_mode(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_mask(SETUPRASTER, SETUPRASTER_BACKFACEMODE, face_mode(call.parameter));
    MethodAction::Continue
}

pub(super) fn set_clip_min(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(ZCLIPMIN, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_clip_max(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(ZCLIPMAX, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_cull_face(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let face = match call.parameter {
        SET_CULL_FACE_V_FRONT => SETUPRASTER_CULLCTRL_FRONT,
        SET_CULL_FACE_V_BACK => SETUPRASTER_CULLCTRL_BACK,
        SET_CULL_FACE_V_FRONT_AND_BACK => SETUPRASTER_CULLCTRL_FRONT_AND_BACK,
        face => panic!("unknown cull face 0x{:X}", face),
    };
    pg.regs.set_mask(SETUPRASTER, SETUPRASTER_CULLCTRL, face);
    MethodAction::Continue
}

pub(super) fn set_front_face(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let ccw = match call.parameter {
        SET_FRONT_FACE_V_CW => false,
        SET_FRONT_FACE_V_CCW => true,
        face => panic!("unknown front face 0x{:X}", face),
    };
    pg.regs.set_flag(SETUPRASTER, SETUPRASTER_FRONTFACE, ccw);
    MethodAction::Continue
}

pub(super) fn set_logic_op(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_mask(BLEND, BLEND_LOGICOP, call.parameter & 0xF);
    MethodAction::Continue
}

pub(super) fn set_shadow_zslope_threshold(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(SHADOWZSLOPETHRESHOLD, call.parameter);
    if call.parameter != 0x7F80_0000 {
        log::warn!("shadow z slope threshold {:08X} is ignored", call.parameter);
    }
    MethodAction::Continue
}

pub(super) fn set_eye_vector(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(EYEVEC0 + call.slot as u32 * 4, call.parameter);
    MethodAction::Continue
}

// primitives

pub(super) fn set_begin_end(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let zeta = pg.depth_test_enabled() || pg.stencil_test_enabled();

    if call.parameter == SET_BEGIN_END_OP_END {
        pg.end_primitive();
    } else {
        assert!(
            call.parameter <= SET_BEGIN_END_OP_POLYGON,
            "invalid BEGIN operation {}",
            call.parameter
        );
        let mode = match PrimitiveMode::from_begin_end(call.parameter) {
            Some(mode) => mode,
            None => panic!("invalid BEGIN operation {}", call.parameter),
        };
        pg.begin_primitive(mode);
    }

    pg.set_surface_dirty(true, zeta);
    MethodAction::Continue
}

// clears

pub(super) fn set_zstencil_clear_value(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(ZSTENCILCLEARVALUE, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_color_clear_value(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(COLORCLEARVALUE, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_clear_rect_horizontal(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(CLEARRECTX, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_clear_rect_vertical(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(CLEARRECTY, call.parameter);
    MethodAction::Continue
}

pub(super) fn clear_surface(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let parameter = call.parameter;
    let write_color = parameter & CLEAR_SURFACE_COLOR != 0;
    let write_zeta = parameter & (CLEAR_SURFACE_Z | CLEAR_SURFACE_STENCIL) != 0;

    let mut params = ClearParams {
        color: None,
        color_mask: [false; 4],
        depth: None,
        stencil: None,
        scissor: Rect {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        },
        dither: pg.regs.flag(CONTROL_0, CONTROL_0_DITHERENABLE),
    };

    if write_zeta {
        let (depth, stencil) = pg.clear_depth_stencil();
        if parameter & CLEAR_SURFACE_Z != 0 {
            params.depth = Some(depth);
        }
        if parameter & CLEAR_SURFACE_STENCIL != 0 {
            params.stencil = stencil;
        }
    }
    if write_color {
        params.color = Some(pg.clear_color());
        params.color_mask = [
            parameter & CLEAR_SURFACE_R != 0,
            parameter & CLEAR_SURFACE_G != 0,
            parameter & CLEAR_SURFACE_B != 0,
            parameter & CLEAR_SURFACE_A != 0,
        ];
    }

    pg.update_surface(true, write_color, write_zeta);

    params.scissor = pg.clear_scissor();
    log::debug!(
        "clear {:X} {:?}, color {:08X}",
        parameter,
        params.scissor,
        pg.regs.get(COLORCLEARVALUE)
    );
    pg.backend.clear(&params);

    pg.set_surface_dirty(write_color, write_zeta);
    MethodAction::Continue
}

// reports and semaphores

pub(super) fn clear_report_value(pg: &mut PgraphState, _call: &MethodCall) -> MethodAction {
    pg.delete_queries();
    pg.reports.pixel_count_result = 0;
    MethodAction::Continue
}

pub(super) fn set_zpass_pixel_count_enable(
    pg: &mut PgraphState,
    call: &MethodCall,
) -> MethodAction {
    pg.reports.pixel_count_enable = call.parameter != 0;
    MethodAction::Continue
}

/// Writes the 16 byte report: timestamp, zpass pixel count and a zero
/// done word
pub(super) fn get_report(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let report_type = get_mask(call.parameter, GET_REPORT_TYPE);
    assert_eq!(
        report_type, GET_REPORT_TYPE_ZPASS_PIXEL_CNT,
        "unsupported report type"
    );
    let offset = get_mask(call.parameter, GET_REPORT_OFFSET) as usize;

    for query in std::mem::take(&mut pg.reports.queries) {
        let result = pg.backend.query_result(query);
        pg.reports.pixel_count_result = pg.reports.pixel_count_result.wrapping_add(result);
        pg.backend.delete_query(query);
    }

    let address = pg.map_dma_range(pg.dma.report, offset, REPORT_SIZE, "report");
    let result = pg.reports.pixel_count_result;
    log::debug!("report {} pixels at {:08X}", result, address);

    let vram = pg.memory.vram_mut();
    write_u64_le(vram, address, REPORT_TIMESTAMP);
    write_u32_le(vram, address + 8, result);
    write_u32_le(vram, address + 12, 0);
    MethodAction::Continue
}

pub(super) fn set_semaphore_offset(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(SEMAPHOREOFFSET, call.parameter);
    MethodAction::Continue
}

pub(super) fn back_end_write_semaphore_release(
    pg: &mut PgraphState,
    call: &MethodCall,
) -> MethodAction {
    pg.update_surface(false, true, true);

    let offset = pg.regs.get(SEMAPHOREOFFSET) as usize;
    let address = pg.map_dma_range(pg.dma.semaphore, offset, 4, "semaphore");
    log::trace!("semaphore release {:X} at {:08X}", call.parameter, address);
    write_u32_le(pg.memory.vram_mut(), address, call.parameter);
    MethodAction::Continue
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_depth_decoding() {
        assert_eq!(f16_to_float(0), 0.0);
        // exponent 0xF, mantissa 0x7FF is the largest value
        assert_eq!(f16_to_float(0xFFFF), F16_MAX);
        assert_eq!(f24_to_float(0), 0.0);
        assert_eq!(f24_to_float(0x7F0000), 1.0);
    }

    #[test]
    #[should_panic(expected = "wider than 24 bits")]
    fn f24_out_of_range() {
        f24_to_float(0x100_0000);
    }

    #[test]
    fn method_value_maps() {
        assert_eq!(blend_factor(SET_BLEND_FACTOR_V_ONE_MINUS_SRC_ALPHA), 5);
        assert_eq!(blend_factor(SET_BLEND_FACTOR_V_CONSTANT_COLOR), 0xC);
        assert_eq!(
            BlendFactor::from_register(blend_factor(SET_BLEND_FACTOR_V_ONE_MINUS_CONSTANT_ALPHA)),
            BlendFactor::OneMinusConstantAlpha
        );
        assert_eq!(
            BlendEquation::from_register(blend_equation(SET_BLEND_EQUATION_V_FUNC_ADD)),
            BlendEquation::Add
        );
        assert_eq!(
            StencilOp::from_register(stencil_op(SET_STENCIL_OP_V_INVERT)),
            StencilOp::Invert
        );
        assert_eq!(face_mode(SET_POLYGON_MODE_V_LINE), SETUPRASTER_FACEMODE_LINE);
    }

    #[test]
    fn register_colors_are_argb() {
        assert_eq!(argb_to_rgba(0xFF00_00FF), [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(argb_to_rgba(0x00FF_0000), [1.0, 0.0, 0.0, 0.0]);
    }
}

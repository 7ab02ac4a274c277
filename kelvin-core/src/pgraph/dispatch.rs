//! Method routing: a flat table of `(class, method) -> handler` entries built
//! from method ranges, sorted once and searched by binary search.

use super::methods::*;
use super::texture::MAX_TEXTURES;
use super::{blit, kelvin, texture, transform, vertex, PgraphState};
use crate::memory::interrupts::PgraphIntr;

/// A method as seen by its handler
#[derive(Debug, Clone, Copy)]
pub struct MethodCall {
    pub subchannel: u32,
    pub method: u32,
    /// index of the method inside its range
    pub slot: usize,
    pub parameter: u32,
}

/// What the controller has to do once a handler returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodAction {
    Continue,
    /// raise the pending interrupts and block until `bits` are acknowledged
    WaitInterrupt(PgraphIntr),
    /// block until the flip read and write counters differ
    WaitFlip,
}

pub type MethodHandler = fn(&mut PgraphState, &MethodCall) -> MethodAction;

struct MethodRange {
    class: u32,
    start: u32,
    count: u32,
    stride: u32,
    handler: MethodHandler,
}

const fn single(class: u32, method: u32, handler: MethodHandler) -> MethodRange {
    MethodRange {
        class,
        start: method,
        count: 1,
        stride: 4,
        handler,
    }
}

const fn range(class: u32, start: u32, count: u32, handler: MethodHandler) -> MethodRange {
    MethodRange {
        class,
        start,
        count,
        stride: 4,
        handler,
    }
}

/// One word of every texture unit block
const fn texture_word(word: u32, handler: MethodHandler) -> MethodRange {
    MethodRange {
        class: NV_KELVIN_PRIMITIVE,
        start: NV097_SET_TEXTURE + word * 4,
        count: MAX_TEXTURES as u32,
        stride: 64,
        handler,
    }
}

const K: u32 = NV_KELVIN_PRIMITIVE;

#[rustfmt::skip]
const METHOD_RANGES: &[MethodRange] = &[
    // context pattern
    single(NV_CONTEXT_PATTERN, NV044_SET_MONOCHROME_COLOR0, blit::set_monochrome_color0),

    // context surfaces 2D
    single(NV_CONTEXT_SURFACES_2D, SET_OBJECT, blit::surfaces_set_object),
    single(NV_CONTEXT_SURFACES_2D, NV062_SET_CONTEXT_DMA_IMAGE_SOURCE, blit::set_dma_image_source),
    single(NV_CONTEXT_SURFACES_2D, NV062_SET_CONTEXT_DMA_IMAGE_DESTIN, blit::set_dma_image_destin),
    single(NV_CONTEXT_SURFACES_2D, NV062_SET_COLOR_FORMAT, blit::set_color_format),
    single(NV_CONTEXT_SURFACES_2D, NV062_SET_PITCH, blit::set_pitch),
    single(NV_CONTEXT_SURFACES_2D, NV062_SET_OFFSET_SOURCE, blit::set_offset_source),
    single(NV_CONTEXT_SURFACES_2D, NV062_SET_OFFSET_DESTIN, blit::set_offset_destin),

    // image blit
    single(NV_IMAGE_BLIT, SET_OBJECT, blit::blit_set_object),
    single(NV_IMAGE_BLIT, NV09F_SET_CONTEXT_SURFACES, blit::set_context_surfaces),
    single(NV_IMAGE_BLIT, NV09F_SET_OPERATION, blit::set_operation),
    single(NV_IMAGE_BLIT, NV09F_CONTROL_POINT_IN, blit::set_point_in),
    single(NV_IMAGE_BLIT, NV09F_CONTROL_POINT_OUT, blit::set_point_out),
    single(NV_IMAGE_BLIT, NV09F_SIZE, blit::set_size),

    // kelvin: channel and flip control
    single(K, SET_OBJECT, kelvin::set_object),
    single(K, NV097_NO_OPERATION, kelvin::no_operation),
    single(K, NV097_WAIT_FOR_IDLE, kelvin::wait_for_idle),
    single(K, NV097_SET_FLIP_READ, kelvin::set_flip_read),
    single(K, NV097_SET_FLIP_WRITE, kelvin::set_flip_write),
    single(K, NV097_SET_FLIP_MODULO, kelvin::set_flip_modulo),
    single(K, NV097_FLIP_INCREMENT_WRITE, kelvin::flip_increment_write),
    single(K, NV097_FLIP_STALL, kelvin::flip_stall),

    // DMA contexts
    single(K, NV097_SET_CONTEXT_DMA_NOTIFIES, kelvin::set_context_dma_notifies),
    single(K, NV097_SET_CONTEXT_DMA_A, kelvin::set_context_dma_a),
    single(K, NV097_SET_CONTEXT_DMA_B, kelvin::set_context_dma_b),
    single(K, NV097_SET_CONTEXT_DMA_STATE, kelvin::set_context_dma_state),
    single(K, NV097_SET_CONTEXT_DMA_COLOR, kelvin::set_context_dma_color),
    single(K, NV097_SET_CONTEXT_DMA_ZETA, kelvin::set_context_dma_zeta),
    single(K, NV097_SET_CONTEXT_DMA_VERTEX_A, kelvin::set_context_dma_vertex_a),
    single(K, NV097_SET_CONTEXT_DMA_VERTEX_B, kelvin::set_context_dma_vertex_b),
    single(K, NV097_SET_CONTEXT_DMA_SEMAPHORE, kelvin::set_context_dma_semaphore),
    single(K, NV097_SET_CONTEXT_DMA_REPORT, kelvin::set_context_dma_report),

    // surfaces
    single(K, NV097_SET_SURFACE_CLIP_HORIZONTAL, kelvin::set_surface_clip_horizontal),
    single(K, NV097_SET_SURFACE_CLIP_VERTICAL, kelvin::set_surface_clip_vertical),
    single(K, NV097_SET_SURFACE_FORMAT, kelvin::set_surface_format),
    single(K, NV097_SET_SURFACE_PITCH, kelvin::set_surface_pitch),
    single(K, NV097_SET_SURFACE_COLOR_OFFSET, kelvin::set_surface_color_offset),
    single(K, NV097_SET_SURFACE_ZETA_OFFSET, kelvin::set_surface_zeta_offset),

    // combiners and window clipping
    range(K, NV097_SET_COMBINER_ALPHA_ICW, 8, kelvin::set_combiner_alpha_icw),
    single(K, NV097_SET_COMBINER_SPECULAR_FOG_CW0, kelvin::set_combiner_specular_fog_cw0),
    single(K, NV097_SET_COMBINER_SPECULAR_FOG_CW1, kelvin::set_combiner_specular_fog_cw1),
    single(K, NV097_SET_CONTROL0, kelvin::set_control0),
    single(K, NV097_SET_WINDOW_CLIP_TYPE, kelvin::set_window_clip_type),
    range(K, NV097_SET_WINDOW_CLIP_HORIZONTAL, 8, kelvin::set_window_clip_horizontal),
    range(K, NV097_SET_WINDOW_CLIP_VERTICAL, 8, kelvin::set_window_clip_vertical),
    range(K, NV097_SET_COMBINER_FACTOR0, 8, kelvin::set_combiner_factor0),
    range(K, NV097_SET_COMBINER_FACTOR1, 8, kelvin::set_combiner_factor1),
    range(K, NV097_SET_COMBINER_ALPHA_OCW, 8, kelvin::set_combiner_alpha_ocw),
    range(K, NV097_SET_COMBINER_COLOR_ICW, 8, kelvin::set_combiner_color_icw),
    range(K, NV097_SET_COMBINER_COLOR_OCW, 8, kelvin::set_combiner_color_ocw),
    single(K, NV097_SET_COMBINER_CONTROL, kelvin::set_combiner_control),
    single(K, NV097_SET_SHADER_STAGE_PROGRAM, kelvin::set_shader_stage_program),
    single(K, NV097_SET_SHADER_OTHER_STAGE_INPUT, kelvin::set_shader_other_stage_input),
    single(K, NV097_SET_SHADER_CLIP_PLANE_MODE, kelvin::set_shader_clip_plane_mode),
    range(K, NV097_SET_SPECULAR_FOG_FACTOR, 2, kelvin::set_specular_fog_factor),

    // raster state
    single(K, NV097_SET_ALPHA_TEST_ENABLE, kelvin::set_alpha_test_enable),
    single(K, NV097_SET_BLEND_ENABLE, kelvin::set_blend_enable),
    single(K, NV097_SET_CULL_FACE_ENABLE, kelvin::set_cull_face_enable),
    single(K, NV097_SET_DEPTH_TEST_ENABLE, kelvin::set_depth_test_enable),
    single(K, NV097_SET_DITHER_ENABLE, kelvin::set_dither_enable),
    single(K, NV097_SET_STENCIL_TEST_ENABLE, kelvin::set_stencil_test_enable),
    single(K, NV097_SET_POLY_OFFSET_POINT_ENABLE, kelvin::set_poly_offset_point_enable),
    single(K, NV097_SET_POLY_OFFSET_LINE_ENABLE, kelvin::set_poly_offset_line_enable),
    single(K, NV097_SET_POLY_OFFSET_FILL_ENABLE, kelvin::set_poly_offset_fill_enable),
    single(K, NV097_SET_ALPHA_FUNC, kelvin::set_alpha_func),
    single(K, NV097_SET_ALPHA_REF, kelvin::set_alpha_ref),
    single(K, NV097_SET_BLEND_FUNC_SFACTOR, kelvin::set_blend_func_sfactor),
    single(K, NV097_SET_BLEND_FUNC_DFACTOR, kelvin::set_blend_func_dfactor),
    single(K, NV097_SET_BLEND_COLOR, kelvin::set_blend_color),
    single(K, NV097_SET_BLEND_EQUATION, kelvin::set_blend_equation),
    single(K, NV097_SET_DEPTH_FUNC, kelvin::set_depth_func),
    single(K, NV097_SET_COLOR_MASK, kelvin::set_color_mask),
    single(K, NV097_SET_DEPTH_MASK, kelvin::set_depth_mask),
    single(K, NV097_SET_STENCIL_MASK, kelvin::set_stencil_mask),
    single(K, NV097_SET_STENCIL_FUNC, kelvin::set_stencil_func),
    single(K, NV097_SET_STENCIL_FUNC_REF, kelvin::set_stencil_func_ref),
    single(K, NV097_SET_STENCIL_FUNC_MASK, kelvin::set_stencil_func_mask),
    single(K, NV097_SET_STENCIL_OP_FAIL, kelvin::set_stencil_op_fail),
    single(K, NV097_SET_STENCIL_OP_ZFAIL, kelvin::set_stencil_op_zfail),
    single(K, NV097_SET_STENCIL_OP_ZPASS, kelvin::set_stencil_op_zpass),
    single(K, NV097_SET_SHADE_MODE, kelvin::set_shade_mode),
    single(K, NV097_SET_POLYGON_OFFSET_SCALE_FACTOR, kelvin::set_polygon_offset_scale_factor),
    single(K, NV097_SET_POLYGON_OFFSET_BIAS, kelvin::set_polygon_offset_bias),
    single(K, NV097_SET_FRONT_POLYGON_MODE, kelvin::set_front_polygon_mode),
    single(K, NV097_SET_BACK_POLYGON_MODE, kelvin::set_back_polygon_mode),
    single(K, NV097_SET_CLIP_MIN, kelvin::set_clip_min),
    single(K, NV097_SET_CLIP_MAX, kelvin::set_clip_max),
    single(K, NV097_SET_CULL_FACE, kelvin::set_cull_face),
    single(K, NV097_SET_FRONT_FACE, kelvin::set_front_face),
    single(K, NV097_SET_LOGIC_OP_ENABLE, kelvin::set_logic_op_enable),
    single(K, NV097_SET_LOGIC_OP, kelvin::set_logic_op),
    single(K, NV097_SET_SHADOW_ZSLOPE_THRESHOLD, kelvin::set_shadow_zslope_threshold),

    // transform and lighting
    single(K, NV097_SET_COLOR_MATERIAL, transform::set_color_material),
    single(K, NV097_SET_FOG_MODE, transform::set_fog_mode),
    single(K, NV097_SET_FOG_GEN_MODE, transform::set_fog_gen_mode),
    single(K, NV097_SET_FOG_ENABLE, transform::set_fog_enable),
    single(K, NV097_SET_FOG_COLOR, transform::set_fog_color),
    single(K, NV097_SET_LIGHTING_ENABLE, transform::set_lighting_enable),
    single(K, NV097_SET_SKIN_MODE, transform::set_skin_mode),
    single(K, NV097_SET_NORMALIZATION_ENABLE, transform::set_normalization_enable),
    range(K, NV097_SET_MATERIAL_EMISSION, 3, transform::set_material_emission),
    single(K, NV097_SET_MATERIAL_ALPHA, transform::set_material_alpha),
    single(K, NV097_SET_SPECULAR_ENABLE, transform::set_specular_enable),
    single(K, NV097_SET_LIGHT_ENABLE_MASK, transform::set_light_enable_mask),
    range(K, NV097_SET_TEXGEN_S, 16, transform::set_texgen),
    range(K, NV097_SET_TEXTURE_MATRIX_ENABLE, 4, transform::set_texture_matrix_enable),
    range(K, NV097_SET_PROJECTION_MATRIX, 16, transform::set_projection_matrix),
    range(K, NV097_SET_MODEL_VIEW_MATRIX, 64, transform::set_model_view_matrix),
    range(K, NV097_SET_INVERSE_MODEL_VIEW_MATRIX, 64, transform::set_inverse_model_view_matrix),
    range(K, NV097_SET_COMPOSITE_MATRIX, 16, transform::set_composite_matrix),
    range(K, NV097_SET_TEXTURE_MATRIX, 64, transform::set_texture_matrix),
    range(K, NV097_SET_TEXGEN_PLANE_S, 64, transform::set_texgen_plane),
    range(K, NV097_SET_FOG_PARAMS, 3, transform::set_fog_params),
    single(K, NV097_SET_TEXGEN_VIEW_MODEL, transform::set_texgen_view_model),
    range(K, NV097_SET_FOG_PLANE, 4, transform::set_fog_plane),
    range(K, NV097_SET_SCENE_AMBIENT_COLOR, 3, transform::set_scene_ambient_color),
    range(K, NV097_SET_VIEWPORT_OFFSET, 4, transform::set_viewport_offset),
    range(K, NV097_SET_EYE_POSITION, 4, transform::set_eye_position),
    range(K, NV097_SET_VIEWPORT_SCALE, 4, transform::set_viewport_scale),
    range(K, NV097_SET_EYE_DIRECTION, 3, transform::set_eye_direction),
    range(K, NV097_SET_TRANSFORM_PROGRAM, 32, transform::set_transform_program),
    range(K, NV097_SET_TRANSFORM_CONSTANT, 32, transform::set_transform_constant),
    range(K, NV097_SET_BACK_LIGHT, 128, transform::set_back_light),
    range(K, NV097_SET_LIGHT, 256, transform::set_light),
    single(K, NV097_SET_TRANSFORM_EXECUTION_MODE, transform::set_transform_execution_mode),
    single(K, NV097_SET_TRANSFORM_PROGRAM_CXT_WRITE_EN, transform::set_transform_program_cxt_write_en),
    single(K, NV097_SET_TRANSFORM_PROGRAM_LOAD, transform::set_transform_program_load),
    single(K, NV097_SET_TRANSFORM_PROGRAM_START, transform::set_transform_program_start),
    single(K, NV097_SET_TRANSFORM_CONSTANT_LOAD, transform::set_transform_constant_load),
    range(K, NV097_SET_EYE_VECTOR, 3, kelvin::set_eye_vector),

    // vertices and primitives
    range(K, NV097_SET_VERTEX3F, 3, vertex::set_vertex3f),
    range(K, NV097_SET_VERTEX4F, 4, vertex::set_vertex4f),
    range(K, NV097_SET_VERTEX_DATA_ARRAY_OFFSET, 16, vertex::set_vertex_data_array_offset),
    range(K, NV097_SET_VERTEX_DATA_ARRAY_FORMAT, 16, vertex::set_vertex_data_array_format),
    single(K, NV097_SET_BEGIN_END, kelvin::set_begin_end),
    single(K, NV097_ARRAY_ELEMENT16, vertex::array_element16),
    single(K, NV097_ARRAY_ELEMENT32, vertex::array_element32),
    single(K, NV097_DRAW_ARRAYS, vertex::draw_arrays),
    single(K, NV097_INLINE_ARRAY, vertex::inline_array),
    range(K, NV097_SET_VERTEX_DATA2F_M, 32, vertex::set_vertex_data2f_m),
    range(K, NV097_SET_VERTEX_DATA2S, 16, vertex::set_vertex_data2s),
    range(K, NV097_SET_VERTEX_DATA4UB, 16, vertex::set_vertex_data4ub),
    range(K, NV097_SET_VERTEX_DATA4S_M, 32, vertex::set_vertex_data4s_m),
    range(K, NV097_SET_VERTEX_DATA4F_M, 64, vertex::set_vertex_data4f_m),

    // textures
    texture_word(TEXTURE_OFFSET, texture::set_texture_offset),
    texture_word(TEXTURE_FORMAT, texture::set_texture_format),
    texture_word(TEXTURE_ADDRESS, texture::set_texture_address),
    texture_word(TEXTURE_CONTROL0, texture::set_texture_control0),
    texture_word(TEXTURE_CONTROL1, texture::set_texture_control1),
    texture_word(TEXTURE_FILTER, texture::set_texture_filter),
    texture_word(TEXTURE_IMAGE_RECT, texture::set_texture_image_rect),
    texture_word(TEXTURE_PALETTE, texture::set_texture_palette),
    texture_word(TEXTURE_BORDER_COLOR, texture::set_texture_border_color),
    texture_word(TEXTURE_SET_BUMP_ENV_MAT, texture::set_texture_bump_env_mat),
    texture_word(TEXTURE_SET_BUMP_ENV_MAT + 1, texture::set_texture_bump_env_mat),
    texture_word(TEXTURE_SET_BUMP_ENV_MAT + 2, texture::set_texture_bump_env_mat),
    texture_word(TEXTURE_SET_BUMP_ENV_MAT + 3, texture::set_texture_bump_env_mat),
    texture_word(TEXTURE_SET_BUMP_ENV_SCALE, texture::set_texture_bump_env_scale),
    texture_word(TEXTURE_SET_BUMP_ENV_OFFSET, texture::set_texture_bump_env_offset),

    // reports, semaphores and clears
    single(K, NV097_CLEAR_REPORT_VALUE, kelvin::clear_report_value),
    single(K, NV097_SET_ZPASS_PIXEL_COUNT_ENABLE, kelvin::set_zpass_pixel_count_enable),
    single(K, NV097_GET_REPORT, kelvin::get_report),
    single(K, NV097_SET_SEMAPHORE_OFFSET, kelvin::set_semaphore_offset),
    single(K, NV097_BACK_END_WRITE_SEMAPHORE_RELEASE, kelvin::back_end_write_semaphore_release),
    single(K, NV097_SET_ZSTENCIL_CLEAR_VALUE, kelvin::set_zstencil_clear_value),
    single(K, NV097_SET_COLOR_CLEAR_VALUE, kelvin::set_color_clear_value),
    single(K, NV097_CLEAR_SURFACE, kelvin::clear_surface),
    single(K, NV097_SET_CLEAR_RECT_HORIZONTAL, kelvin::set_clear_rect_horizontal),
    single(K, NV097_SET_CLEAR_RECT_VERTICAL, kelvin::set_clear_rect_vertical),
];

#[derive(Clone, Copy)]
struct MethodEntry {
    class: u32,
    method: u32,
    slot: usize,
    handler: MethodHandler,
}

/// Every known method, sorted by `(class, method)`
pub struct DispatchTable {
    entries: Vec<MethodEntry>,
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchTable {
    pub fn new() -> Self {
        let mut entries = Vec::new();
        for range in METHOD_RANGES {
            for slot in 0..range.count {
                entries.push(MethodEntry {
                    class: range.class,
                    method: range.start + slot * range.stride,
                    slot: slot as usize,
                    handler: range.handler,
                });
            }
        }
        entries.sort_unstable_by_key(|e| (e.class, e.method));

        for pair in entries.windows(2) {
            assert!(
                (pair[0].class, pair[0].method) != (pair[1].class, pair[1].method),
                "method {:02X}:{:04X} registered twice",
                pair[0].class,
                pair[0].method
            );
        }

        Self { entries }
    }

    /// Handler of `method` in `class` and the slot of the method in its range
    pub fn lookup(&self, class: u32, method: u32) -> Option<(usize, MethodHandler)> {
        self.entries
            .binary_search_by_key(&(class, method), |e| (e.class, e.method))
            .ok()
            .map(|i| (self.entries[i].slot, self.entries[i].handler))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    fn is_sorted(&self) -> bool {
        self.entries
            .windows(2)
            .all(|w| (w[0].class, w[0].method) < (w[1].class, w[1].method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_without_duplicates() {
        let table = DispatchTable::new();
        assert!(table.is_sorted());
        assert!(!table.is_empty());
    }

    #[test]
    fn ranges_expand_to_slots() {
        let table = DispatchTable::new();

        let (slot, _) = table
            .lookup(K, NV097_SET_MODEL_VIEW_MATRIX + 17 * 4)
            .unwrap();
        assert_eq!(slot, 17);

        // texture unit blocks are 64 bytes apart
        let (slot, _) = table
            .lookup(K, NV097_SET_TEXTURE + 2 * 64 + TEXTURE_FILTER * 4)
            .unwrap();
        assert_eq!(slot, 2);

        let (slot, _) = table
            .lookup(K, NV097_SET_LIGHT + 0x80 + LIGHT_LOCAL_POSITION)
            .unwrap();
        assert_eq!(slot, (0x80 + LIGHT_LOCAL_POSITION) as usize / 4);
    }

    #[test]
    fn classes_are_separate() {
        let table = DispatchTable::new();
        // same offset, different meaning per class
        assert!(table.lookup(NV_CONTEXT_SURFACES_2D, 0x0300).is_some());
        assert!(table.lookup(NV_IMAGE_BLIT, 0x0300).is_some());
        assert!(table.lookup(K, 0x0300).is_some());

        assert!(table.lookup(NV_CONTEXT_PATTERN, SET_OBJECT).is_none());
        assert!(table.lookup(K, 0x0104).is_none());
        assert!(table.lookup(0x12, 0x0100).is_none());
    }
}

//! 2D engine objects: context pattern, 2D surfaces and image blits.

use super::dispatch::{MethodAction, MethodCall};
use super::methods::*;
use super::regs::PATT_COLOR0;
use super::PgraphState;
use crate::memory::dma::DmaObject;

/// Source and destination of 2D operations
#[derive(Debug, Default, Clone, Copy)]
pub struct ContextSurfaces2D {
    pub object_instance: u32,
    pub dma_image_source: u32,
    pub dma_image_dest: u32,
    pub color_format: u32,
    pub source_pitch: u32,
    pub dest_pitch: u32,
    pub source_offset: u32,
    pub dest_offset: u32,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ImageBlit {
    pub object_instance: u32,
    /// instance of the 2D surfaces object the blit works on
    pub context_surfaces: u32,
    pub operation: u32,
    pub in_x: u32,
    pub in_y: u32,
    pub out_x: u32,
    pub out_y: u32,
    pub width: u32,
    pub height: u32,
}

fn bytes_per_pixel(color_format: u32) -> usize {
    match color_format {
        NV062_SET_COLOR_FORMAT_LE_Y8 => 1,
        NV062_SET_COLOR_FORMAT_LE_R5G6B5 => 2,
        NV062_SET_COLOR_FORMAT_LE_A8R8G8B8 => 4,
        format => panic!("unknown 2D surface color format 0x{:X}", format),
    }
}

impl PgraphState {
    /// Copies the blit rectangle between the 2D surfaces, overlapping
    /// ranges behave as a memmove
    fn image_blit(&mut self) {
        let blit = self.image_blit;
        let surfaces = self.context_surfaces_2d;
        assert_eq!(
            surfaces.object_instance, blit.context_surfaces,
            "image blit on an unbound 2D surfaces object"
        );
        let bpp = bytes_per_pixel(surfaces.color_format);

        let vram_len = self.memory.vram().len();
        let ramin = self.memory.ramin();
        let (source_start, source_len) =
            DmaObject::load(ramin, surfaces.dma_image_source).map(vram_len);
        let (dest_start, dest_len) = DmaObject::load(ramin, surfaces.dma_image_dest).map(vram_len);
        assert!(
            (surfaces.source_offset as usize) < source_len,
            "blit source offset {:X} beyond DMA length {:X}",
            surfaces.source_offset,
            source_len
        );
        assert!(
            (surfaces.dest_offset as usize) < dest_len,
            "blit destination offset {:X} beyond DMA length {:X}",
            surfaces.dest_offset,
            dest_len
        );

        log::debug!(
            "image blit {}x{} ({}, {}) -> ({}, {}), {} bytes per pixel",
            blit.width,
            blit.height,
            blit.in_x,
            blit.in_y,
            blit.out_x,
            blit.out_y,
            bpp
        );

        let row_len = blit.width as usize * bpp;
        let source = source_start + surfaces.source_offset as usize;
        let dest = dest_start + surfaces.dest_offset as usize;
        let source_pitch = surfaces.source_pitch as usize;
        let dest_pitch = surfaces.dest_pitch as usize;

        for y in 0..blit.height as usize {
            let row_in = (blit.in_y as usize + y) * source_pitch + blit.in_x as usize * bpp;
            let row_out = (blit.out_y as usize + y) * dest_pitch + blit.out_x as usize * bpp;
            assert!(
                surfaces.source_offset as usize + row_in + row_len <= source_len,
                "blit source row {} beyond DMA length {:X}",
                y,
                source_len
            );
            assert!(
                surfaces.dest_offset as usize + row_out + row_len <= dest_len,
                "blit destination row {} beyond DMA length {:X}",
                y,
                dest_len
            );

            let from = source + row_in;
            self.memory
                .vram_mut()
                .copy_within(from..from + row_len, dest + row_out);
        }
    }
}

// context pattern

pub(super) fn set_monochrome_color0(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(PATT_COLOR0, call.parameter);
    MethodAction::Continue
}

// context surfaces 2D

pub(super) fn surfaces_set_object(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.context_surfaces_2d.object_instance = call.parameter;
    MethodAction::Continue
}

pub(super) fn set_dma_image_source(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.context_surfaces_2d.dma_image_source = call.parameter;
    MethodAction::Continue
}

pub(super) fn set_dma_image_destin(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.context_surfaces_2d.dma_image_dest = call.parameter;
    MethodAction::Continue
}

pub(super) fn set_color_format(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.context_surfaces_2d.color_format = call.parameter;
    MethodAction::Continue
}

pub(super) fn set_pitch(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.context_surfaces_2d.source_pitch = call.parameter & 0xFFFF;
    pg.context_surfaces_2d.dest_pitch = call.parameter >> 16;
    MethodAction::Continue
}

pub(super) fn set_offset_source(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.context_surfaces_2d.source_offset = call.parameter & 0x07FF_FFFF;
    MethodAction::Continue
}

pub(super) fn set_offset_destin(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.context_surfaces_2d.dest_offset = call.parameter & 0x07FF_FFFF;
    MethodAction::Continue
}

// image blit

pub(super) fn blit_set_object(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.image_blit.object_instance = call.parameter;
    MethodAction::Continue
}

pub(super) fn set_context_surfaces(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.image_blit.context_surfaces = call.parameter;
    MethodAction::Continue
}

pub(super) fn set_operation(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.image_blit.operation = call.parameter;
    MethodAction::Continue
}

pub(super) fn set_point_in(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.image_blit.in_x = call.parameter & 0xFFFF;
    pg.image_blit.in_y = call.parameter >> 16;
    MethodAction::Continue
}

pub(super) fn set_point_out(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.image_blit.out_x = call.parameter & 0xFFFF;
    pg.image_blit.out_y = call.parameter >> 16;
    MethodAction::Continue
}

/// Writing the size starts the blit
pub(super) fn set_size(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.image_blit.width = call.parameter & 0xFFFF;
    pg.image_blit.height = call.parameter >> 16;

    match pg.image_blit.operation {
        NV09F_SET_OPERATION_SRCCOPY => {
            // the 3D engine may have rendered into the source
            pg.update_surface(false, true, true);
            pg.image_blit();
            pg.surfaces.color.buffer_dirty = true;
        }
        operation => panic!("unsupported image blit operation {}", operation),
    }
    MethodAction::Continue
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_formats() {
        assert_eq!(bytes_per_pixel(NV062_SET_COLOR_FORMAT_LE_Y8), 1);
        assert_eq!(bytes_per_pixel(NV062_SET_COLOR_FORMAT_LE_R5G6B5), 2);
        assert_eq!(bytes_per_pixel(NV062_SET_COLOR_FORMAT_LE_A8R8G8B8), 4);
    }

    #[test]
    #[should_panic(expected = "unknown 2D surface color format")]
    fn unknown_surface_format_panics() {
        bytes_per_pixel(0x7);
    }
}

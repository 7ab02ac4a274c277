//! Synchronization of the color and zeta render targets with guest memory.
//!
//! Guest memory and the backend surfaces are kept coherent lazily:
//! `buffer_dirty` marks guest memory as newer than the backend copy,
//! `draw_dirty` marks the backend copy as newer than guest memory.

use super::backend::{SurfaceFormat, SurfaceKind};
use super::methods::*;
use super::regs::*;
use super::swizzle::{swizzle_rect, unswizzle_rect};
use super::PgraphState;
use crate::memory::dma::{DmaObject, DMA_CLASS_IN_MEMORY};

/// Everything that, when changed, requires recreating the backend surfaces
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceShape {
    pub z_format: bool,
    pub color_format: u32,
    pub zeta_format: u32,
    pub log_width: u32,
    pub log_height: u32,
    pub clip_x: u32,
    pub clip_y: u32,
    pub clip_width: u32,
    pub clip_height: u32,
    pub anti_aliasing: u32,
}

impl SurfaceShape {
    pub fn color_surface_format(&self) -> SurfaceFormat {
        match self.color_format {
            SET_SURFACE_FORMAT_COLOR_LE_X1R5G5B5_Z1R5G5B5
            | SET_SURFACE_FORMAT_COLOR_LE_X1R5G5B5_O1R5G5B5 => SurfaceFormat::X1R5G5B5,
            SET_SURFACE_FORMAT_COLOR_LE_R5G6B5 => SurfaceFormat::R5G6B5,
            SET_SURFACE_FORMAT_COLOR_LE_X8R8G8B8_Z8R8G8B8
            | SET_SURFACE_FORMAT_COLOR_LE_X8R8G8B8_O8R8G8B8
            | SET_SURFACE_FORMAT_COLOR_LE_X1A7R8G8B8_Z1A7R8G8B8
            | SET_SURFACE_FORMAT_COLOR_LE_X1A7R8G8B8_O1A7R8G8B8 => SurfaceFormat::X8R8G8B8,
            SET_SURFACE_FORMAT_COLOR_LE_A8R8G8B8 => SurfaceFormat::A8R8G8B8,
            SET_SURFACE_FORMAT_COLOR_LE_B8 => SurfaceFormat::B8,
            SET_SURFACE_FORMAT_COLOR_LE_G8B8 => SurfaceFormat::G8B8,
            format => panic!("unimplemented color surface format 0x{:X}", format),
        }
    }

    pub fn zeta_surface_format(&self) -> SurfaceFormat {
        match self.zeta_format {
            SET_SURFACE_FORMAT_ZETA_Z16 => SurfaceFormat::Z16 {
                float: self.z_format,
            },
            SET_SURFACE_FORMAT_ZETA_Z24S8 => SurfaceFormat::Z24S8 {
                float: self.z_format,
            },
            format => panic!("unimplemented zeta surface format 0x{:X}", format),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Surface {
    /// backend content is newer than guest memory
    pub draw_dirty: bool,
    /// guest memory is newer than backend content
    pub buffer_dirty: bool,
    pub write_enabled_cache: bool,
    pub pitch: u32,
    pub offset: u32,
}

#[derive(Debug, Default)]
pub struct Surfaces {
    pub shape: SurfaceShape,
    pub last_shape: SurfaceShape,
    pub surface_type: u32,
    pub color: Surface,
    pub zeta: Surface,
}

impl Surfaces {
    fn get(&self, kind: SurfaceKind) -> &Surface {
        match kind {
            SurfaceKind::Color => &self.color,
            SurfaceKind::Zeta => &self.zeta,
        }
    }

    fn get_mut(&mut self, kind: SurfaceKind) -> &mut Surface {
        match kind {
            SurfaceKind::Color => &mut self.color,
            SurfaceKind::Zeta => &mut self.zeta,
        }
    }

    fn framebuffer_dirty(&self) -> bool {
        let shape_changed = self.shape != self.last_shape;
        shape_changed && (self.shape.color_format != 0 || self.shape.zeta_format != 0)
    }

    pub fn is_swizzled(&self) -> bool {
        self.surface_type == SET_SURFACE_FORMAT_TYPE_SWIZZLE
    }
}

impl PgraphState {
    pub(super) fn color_write_enabled(&self) -> bool {
        self.regs.flag(
            CONTROL_0,
            CONTROL_0_ALPHA_WRITE_ENABLE
                | CONTROL_0_RED_WRITE_ENABLE
                | CONTROL_0_GREEN_WRITE_ENABLE
                | CONTROL_0_BLUE_WRITE_ENABLE,
        )
    }

    pub(super) fn zeta_write_enabled(&self) -> bool {
        self.regs.flag(
            CONTROL_0,
            CONTROL_0_ZWRITEENABLE | CONTROL_0_STENCIL_WRITE_ENABLE,
        )
    }

    pub(super) fn surface_dimensions(&self) -> (u32, u32) {
        let shape = &self.surfaces.shape;
        if self.surfaces.is_swizzled() {
            (1 << shape.log_width, 1 << shape.log_height)
        } else {
            (shape.clip_width, shape.clip_height)
        }
    }

    pub(super) fn apply_anti_aliasing_factor(&self, x: u32, y: u32) -> (u32, u32) {
        match self.surfaces.shape.anti_aliasing {
            SET_SURFACE_FORMAT_ANTI_ALIASING_CENTER_1 => (x, y),
            SET_SURFACE_FORMAT_ANTI_ALIASING_CENTER_CORNER_2 => (x * 2, y),
            SET_SURFACE_FORMAT_ANTI_ALIASING_SQUARE_OFFSET_4 => (x * 2, y * 2),
            aa => panic!("unknown anti aliasing mode {}", aa),
        }
    }

    pub(super) fn set_surface_dirty(&mut self, color: bool, zeta: bool) {
        let color = color && self.color_write_enabled();
        let zeta = zeta && self.zeta_write_enabled();
        self.surfaces.color.draw_dirty |= color;
        self.surfaces.zeta.draw_dirty |= zeta;
    }

    /// Flush guest memory to the backend (`upload`) or backend pixels back to
    /// guest memory, for the requested surfaces.
    pub(super) fn update_surface(&mut self, upload: bool, color_write: bool, zeta_write: bool) {
        self.surfaces.shape.z_format = self.regs.flag(SETUPRASTER, SETUPRASTER_Z_FORMAT);

        let color_write = color_write && self.color_write_enabled();
        let zeta_write = zeta_write && self.zeta_write_enabled();

        if upload && self.surfaces.framebuffer_dirty() {
            assert!(
                !self.surfaces.color.draw_dirty,
                "surface shape changed while color is draw dirty"
            );
            assert!(
                !self.surfaces.zeta.draw_dirty,
                "surface shape changed while zeta is draw dirty"
            );
            log::info!(
                "surface shape changed {:?} -> {:?}",
                self.surfaces.last_shape,
                self.surfaces.shape
            );

            self.surfaces.color.buffer_dirty = true;
            self.surfaces.zeta.buffer_dirty = true;
            self.backend.destroy_surface(SurfaceKind::Color);
            self.backend.destroy_surface(SurfaceKind::Zeta);
            self.surfaces.last_shape = self.surfaces.shape;
        }

        let color = &self.surfaces.color;
        if (color_write || (!upload && color.write_enabled_cache)) && (upload || color.draw_dirty) {
            self.update_surface_part(upload, SurfaceKind::Color);
        }

        let zeta = &self.surfaces.zeta;
        if (zeta_write || (!upload && zeta.write_enabled_cache)) && (upload || zeta.draw_dirty) {
            self.update_surface_part(upload, SurfaceKind::Zeta);
        }
    }

    fn update_surface_part(&mut self, upload: bool, kind: SurfaceKind) {
        let (width, height) = self.surface_dimensions();
        let (width, height) = self.apply_anti_aliasing_factor(width, height);

        let (format, dma_handle) = match kind {
            SurfaceKind::Color => {
                assert!(self.surfaces.shape.color_format != 0, "color surface without format");
                (self.surfaces.shape.color_surface_format(), self.dma.color)
            }
            SurfaceKind::Zeta => {
                assert!(self.surfaces.shape.zeta_format != 0, "zeta surface without format");
                (self.surfaces.shape.zeta_surface_format(), self.dma.zeta)
            }
        };
        let bytes_per_pixel = format.bytes_per_pixel();
        let surface = *self.surfaces.get(kind);
        let swizzle = self.surfaces.is_swizzled();

        let dma = DmaObject::load(self.memory.ramin(), dma_handle);
        assert_eq!(dma.class, DMA_CLASS_IN_MEMORY, "{:?} surface DMA object class", kind);
        assert!(
            surface.offset <= dma.limit,
            "{:?} surface offset {:X} beyond DMA limit {:X}",
            kind,
            surface.offset,
            dma.limit
        );
        let surface_len = surface.pitch as usize * height as usize;
        assert!(
            surface.offset as usize + surface_len <= dma.limit as usize + 1,
            "{:?} surface {:X}+{:X} beyond DMA limit {:X}",
            kind,
            surface.offset,
            surface_len,
            dma.limit
        );
        let (dma_start, dma_len) = dma.map(self.memory.vram().len());
        assert!(
            surface.offset as usize + surface_len <= dma_len,
            "{:?} surface outside VRAM",
            kind
        );
        let start = dma_start + surface.offset as usize;

        let mut dirty = surface.buffer_dirty;
        if kind == SurfaceKind::Color {
            dirty |= self.memory.take_dirty(start, surface_len);
        }

        let pitch = surface.pitch as usize;
        let row_len = width as usize * bytes_per_pixel;
        assert!(
            pitch >= row_len,
            "{:?} surface pitch {:X} smaller than a row of {:X} bytes",
            kind,
            pitch,
            row_len
        );

        if upload && dirty {
            assert!(
                !surface.draw_dirty,
                "{:?} surface uploaded while draw dirty",
                kind
            );
            assert!(pitch % bytes_per_pixel == 0, "surface pitch not pixel aligned");
            log::info!("upload {:?} surface {}x{} from {:08X}", kind, width, height, start);

            let guest = &self.memory.vram()[start..start + surface_len];
            let linear;
            let buf = if swizzle {
                let mut unswizzled = vec![0; surface_len];
                unswizzle_rect(guest, width, height, &mut unswizzled, pitch, bytes_per_pixel);
                linear = unswizzled;
                &linear[..]
            } else {
                guest
            };

            let mut flipped = vec![0; row_len * height as usize];
            for row in 0..height as usize {
                let dst = row_len * (height as usize - row - 1);
                flipped[dst..dst + row_len].copy_from_slice(&buf[pitch * row..pitch * row + row_len]);
            }

            self.backend.create_surface(kind, format, width, height);
            self.backend.write_surface(kind, &flipped);
            self.surfaces.get_mut(kind).buffer_dirty = false;
        }

        if !upload && surface.draw_dirty {
            log::info!("readback {:?} surface {}x{} to {:08X}", kind, width, height, start);

            let mut flipped = vec![0; row_len * height as usize];
            self.backend.read_surface(kind, &mut flipped);

            let mut linear = if swizzle {
                vec![0; surface_len]
            } else {
                self.memory.vram()[start..start + surface_len].to_vec()
            };
            for row in 0..height as usize {
                let src = row_len * (height as usize - row - 1);
                linear[pitch * row..pitch * row + row_len].copy_from_slice(&flipped[src..src + row_len]);
            }

            let guest = &mut self.memory.vram_mut()[start..start + surface_len];
            if swizzle {
                swizzle_rect(&linear, width, height, guest, pitch, bytes_per_pixel);
            } else {
                guest.copy_from_slice(&linear);
            }

            let surface = self.surfaces.get_mut(kind);
            surface.draw_dirty = false;
            surface.write_enabled_cache = false;
        }
    }
}

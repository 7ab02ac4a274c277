//! Texture unit state, guest texture decoding and the texture cache.

use xxhash_rust::xxh64::xxh64;

use super::backend::{
    HostFormat, MagFilter, MinFilter, SamplerState, TextureDesc, TextureId, TextureLevel,
    TextureTarget, WrapMode,
};
use super::dispatch::{MethodAction, MethodCall};
use super::lru::Lru;
use super::methods::*;
use super::regs::*;
use super::swizzle::{unswizzle_box, unswizzle_rect};
use super::PgraphState;
use crate::memory::dma::DmaObject;
use crate::memory::read_u32_le;

pub const MAX_TEXTURES: usize = 4;

/// How guest texels are turned into host texels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    None,
    /// 8 bit index into an A8R8G8B8 palette
    Palette,
    /// packed 4:2:2 luma/chroma, `luma_first` for YUY2 ordering, else UYVY
    Yuv { luma_first: bool },
    /// signed R6G5B5 repacked as three signed bytes
    SignedR6G5B5,
}

#[derive(Debug, Clone, Copy)]
struct ColorFormatInfo {
    bytes_per_pixel: usize,
    /// pitch addressed, not swizzled
    linear: bool,
    host: HostFormat,
    conversion: Conversion,
}

impl ColorFormatInfo {
    const fn new(bytes_per_pixel: usize, linear: bool, host: HostFormat) -> Self {
        Self {
            bytes_per_pixel,
            linear,
            host,
            conversion: Conversion::None,
        }
    }

    const fn converted(mut self, conversion: Conversion) -> Self {
        self.conversion = conversion;
        self
    }

    fn compressed(&self) -> bool {
        matches!(
            self.host,
            HostFormat::Dxt1 | HostFormat::Dxt3 | HostFormat::Dxt5
        )
    }

    fn block_size(&self) -> usize {
        if self.host == HostFormat::Dxt1 {
            8
        } else {
            16
        }
    }

    /// Bytes per pixel of the converted host data
    fn host_bytes_per_pixel(&self) -> usize {
        match self.conversion {
            Conversion::None => self.bytes_per_pixel,
            Conversion::Palette | Conversion::Yuv { .. } => 4,
            Conversion::SignedR6G5B5 => 3,
        }
    }
}

fn color_format_info(color_format: u32) -> Option<ColorFormatInfo> {
    use HostFormat::*;

    let info = match color_format {
        SET_TEXTURE_FORMAT_COLOR_SZ_Y8
        | SET_TEXTURE_FORMAT_COLOR_SZ_AY8
        | SET_TEXTURE_FORMAT_COLOR_SZ_A8 => ColorFormatInfo::new(1, false, R8),
        SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_Y8
        | SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_AY8
        | SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_A8 => ColorFormatInfo::new(1, true, R8),
        SET_TEXTURE_FORMAT_COLOR_SZ_A1R5G5B5 | SET_TEXTURE_FORMAT_COLOR_SZ_X1R5G5B5 => {
            ColorFormatInfo::new(2, false, Bgr5A1)
        }
        SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_A1R5G5B5
        | SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_X1R5G5B5 => ColorFormatInfo::new(2, true, Bgr5A1),
        SET_TEXTURE_FORMAT_COLOR_SZ_A4R4G4B4 => ColorFormatInfo::new(2, false, Bgra4),
        SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_A4R4G4B4 => ColorFormatInfo::new(2, true, Bgra4),
        SET_TEXTURE_FORMAT_COLOR_SZ_R5G6B5 => ColorFormatInfo::new(2, false, Rgb565),
        SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_R5G6B5 => ColorFormatInfo::new(2, true, Rgb565),
        SET_TEXTURE_FORMAT_COLOR_SZ_A8R8G8B8 | SET_TEXTURE_FORMAT_COLOR_SZ_X8R8G8B8 => {
            ColorFormatInfo::new(4, false, Bgra8)
        }
        SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_A8R8G8B8
        | SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_X8R8G8B8 => ColorFormatInfo::new(4, true, Bgra8),
        SET_TEXTURE_FORMAT_COLOR_SZ_I8_A8R8G8B8 => {
            ColorFormatInfo::new(1, false, Bgra8).converted(Conversion::Palette)
        }
        SET_TEXTURE_FORMAT_COLOR_L_DXT1_A1R5G5B5 => ColorFormatInfo::new(4, false, Dxt1),
        SET_TEXTURE_FORMAT_COLOR_L_DXT23_A8R8G8B8 => ColorFormatInfo::new(4, false, Dxt3),
        SET_TEXTURE_FORMAT_COLOR_L_DXT45_A8R8G8B8 => ColorFormatInfo::new(4, false, Dxt5),
        SET_TEXTURE_FORMAT_COLOR_SZ_A8Y8 | SET_TEXTURE_FORMAT_COLOR_SZ_G8B8 => {
            ColorFormatInfo::new(2, false, Rg8)
        }
        SET_TEXTURE_FORMAT_COLOR_SZ_R8B8 => ColorFormatInfo::new(2, false, Rg8),
        SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_A8Y8 | SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_G8B8 => {
            ColorFormatInfo::new(2, true, Rg8)
        }
        SET_TEXTURE_FORMAT_COLOR_SZ_R6G5B5 => {
            ColorFormatInfo::new(2, false, Rgb8Snorm).converted(Conversion::SignedR6G5B5)
        }
        SET_TEXTURE_FORMAT_COLOR_LC_IMAGE_CR8YB8CB8YA8 => ColorFormatInfo::new(2, true, Rgba8)
            .converted(Conversion::Yuv { luma_first: true }),
        SET_TEXTURE_FORMAT_COLOR_LC_IMAGE_YB8CR8YA8CB8 => ColorFormatInfo::new(2, true, Rgba8)
            .converted(Conversion::Yuv { luma_first: false }),
        SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_DEPTH_X8_Y24_FIXED => {
            ColorFormatInfo::new(4, true, Depth24)
        }
        SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_DEPTH_Y16_FIXED => ColorFormatInfo::new(2, true, Depth16),
        SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_Y16 => ColorFormatInfo::new(2, true, R16),
        SET_TEXTURE_FORMAT_COLOR_SZ_A8B8G8R8 => ColorFormatInfo::new(4, false, Rgba8),
        SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_A8B8G8R8 => ColorFormatInfo::new(4, true, Rgba8),
        SET_TEXTURE_FORMAT_COLOR_SZ_R8G8B8A8 => ColorFormatInfo::new(4, false, Abgr8),
        SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_R8G8B8A8 => ColorFormatInfo::new(4, true, Abgr8),
        SET_TEXTURE_FORMAT_COLOR_SZ_B8G8R8A8 => ColorFormatInfo::new(4, false, Argb8),
        SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_B8G8R8A8 => ColorFormatInfo::new(4, true, Argb8),
        _ => return None,
    };
    Some(info)
}

/// Whether `color_format` is pitch addressed, sampled with unnormalized
/// coordinates
pub(super) fn is_linear_format(color_format: u32) -> bool {
    color_format_info(color_format).map_or(false, |info| info.linear)
}

/// Everything describing a texture apart from its content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureShape {
    pub cubemap: bool,
    pub dimensionality: u32,
    pub color_format: u32,
    pub levels: u32,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub min_mipmap_level: u32,
    pub max_mipmap_level: u32,
    pub pitch: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TextureKey {
    shape: TextureShape,
    hash: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingId(usize);

#[derive(Debug)]
pub struct TextureBinding {
    pub target: TextureTarget,
    pub texture: TextureId,
    refcount: u32,
}

/// Texture bindings shared between the cache and the texture units.
///
/// A binding is referenced once by the cache entry that created it and once
/// per unit it is bound to, the backend texture is destroyed when the last
/// reference is dropped.
pub struct TextureCache {
    lru: Lru<TextureKey, BindingId>,
    bindings: Vec<Option<TextureBinding>>,
    free: Vec<usize>,
}

impl TextureCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            lru: Lru::new(capacity),
            bindings: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn binding(&self, id: BindingId) -> &TextureBinding {
        match self.bindings.get(id.0) {
            Some(Some(binding)) => binding,
            _ => panic!("texture binding {:?} does not exist", id),
        }
    }

    fn binding_mut(&mut self, id: BindingId) -> &mut TextureBinding {
        match self.bindings.get_mut(id.0) {
            Some(Some(binding)) => binding,
            _ => panic!("texture binding {:?} does not exist", id),
        }
    }

    fn allocate(&mut self, target: TextureTarget, texture: TextureId) -> BindingId {
        let binding = TextureBinding {
            target,
            texture,
            refcount: 1,
        };
        match self.free.pop() {
            Some(index) => {
                self.bindings[index] = Some(binding);
                BindingId(index)
            }
            None => {
                self.bindings.push(Some(binding));
                BindingId(self.bindings.len() - 1)
            }
        }
    }

    fn retain(&mut self, id: BindingId) {
        self.binding_mut(id).refcount += 1;
    }

    /// Drops one reference, returning the backend texture to destroy when
    /// it was the last one
    #[must_use]
    fn release(&mut self, id: BindingId) -> Option<TextureId> {
        let binding = self.binding_mut(id);
        binding.refcount -= 1;
        if binding.refcount > 0 {
            return None;
        }
        let texture = binding.texture;
        self.bindings[id.0] = None;
        self.free.push(id.0);
        Some(texture)
    }

    pub fn len(&self) -> usize {
        self.lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lru.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TextureUnit {
    pub binding: Option<BindingId>,
    /// set when the offset, format, image rect or palette changes
    pub dirty: bool,
}

impl Default for TextureUnit {
    fn default() -> Self {
        Self {
            binding: None,
            dirty: true,
        }
    }
}

fn min_filter(value: u32, linear: bool) -> MinFilter {
    match value {
        0 | 1 => MinFilter::Nearest,
        // mipmapped filters make no sense on linear textures
        3 | 5 if linear => MinFilter::Nearest,
        4 | 6 if linear => MinFilter::Linear,
        2 => MinFilter::Linear,
        3 => MinFilter::NearestMipmapNearest,
        4 => MinFilter::LinearMipmapNearest,
        5 => MinFilter::NearestMipmapLinear,
        6 => MinFilter::LinearMipmapLinear,
        // convolution
        7 => MinFilter::Linear,
        _ => panic!("invalid texture min filter {}", value),
    }
}

fn mag_filter(value: u32) -> MagFilter {
    match value {
        2 | 4 => MagFilter::Linear,
        _ => MagFilter::Nearest,
    }
}

fn wrap_mode(value: u32) -> WrapMode {
    match value {
        0 | 1 => WrapMode::Repeat,
        2 => WrapMode::MirroredRepeat,
        3 => WrapMode::ClampToEdge,
        4 => WrapMode::ClampToBorder,
        _ => panic!("invalid texture address mode {}", value),
    }
}

fn palette_length(index: u32) -> usize {
    match index {
        0 => 256,
        1 => 128,
        2 => 64,
        _ => 32,
    }
}

/// Bytes of one face of a swizzled texture, all levels included
fn swizzled_face_length(info: &ColorFormatInfo, shape: &TextureShape) -> usize {
    let (mut w, mut h) = (shape.width as usize, shape.height as usize);
    let mut length = 0;
    for _ in 0..shape.levels {
        if info.compressed() {
            w = w.max(4);
            h = h.max(4);
            length += w / 4 * h / 4 * info.block_size();
        } else {
            w = w.max(1);
            h = h.max(1);
            length += w * h * info.bytes_per_pixel;
        }
        w /= 2;
        h /= 2;
    }
    length
}

fn clip_to_byte(x: i32) -> u8 {
    x.clamp(0, 255) as u8
}

/// Converts `width * height * depth` texels whose rows start every
/// `row_pitch` bytes into tightly packed host texels.
fn convert_texture_data(
    info: &ColorFormatInfo,
    data: &[u8],
    palette: &[u8],
    width: usize,
    rows: usize,
    row_pitch: usize,
) -> Vec<u8> {
    let out_bpp = info.host_bytes_per_pixel();
    assert!(
        row_pitch >= width * info.bytes_per_pixel,
        "texture pitch {:X} smaller than a row of {} texels",
        row_pitch,
        width
    );
    let mut converted = vec![0; width * rows * out_bpp];

    for y in 0..rows {
        let line = &data[y * row_pitch..];
        let out_line = &mut converted[y * width * out_bpp..(y + 1) * width * out_bpp];
        match info.conversion {
            Conversion::None => {
                out_line.copy_from_slice(&line[..width * out_bpp]);
            }
            Conversion::Palette => {
                for x in 0..width {
                    let index = line[x] as usize * 4;
                    assert!(
                        index + 4 <= palette.len(),
                        "palette index {} beyond a palette of {} entries",
                        line[x],
                        palette.len() / 4
                    );
                    out_line[x * 4..x * 4 + 4].copy_from_slice(&palette[index..index + 4]);
                }
            }
            Conversion::Yuv { luma_first } => {
                for x in 0..width {
                    let pair = (x & !1) * 2;
                    let (luma, u, v) = if luma_first {
                        (line[x * 2], line[pair + 1], line[pair + 3])
                    } else {
                        (line[x * 2 + 1], line[pair], line[pair + 2])
                    };
                    let c = luma as i32 - 16;
                    let d = u as i32 - 128;
                    let e = v as i32 - 128;
                    let pixel = &mut out_line[x * 4..x * 4 + 4];
                    pixel[0] = clip_to_byte((298 * c + 409 * e + 128) >> 8);
                    pixel[1] = clip_to_byte((298 * c - 100 * d - 208 * e + 128) >> 8);
                    pixel[2] = clip_to_byte((298 * c + 516 * d + 128) >> 8);
                    pixel[3] = 0xFF;
                }
            }
            Conversion::SignedR6G5B5 => {
                for x in 0..width {
                    let mut rgb655 = u16::from_le_bytes([line[x * 2], line[x * 2 + 1]]);
                    // G and B are signed, R probably is not
                    rgb655 ^= (1 << 9) | (1 << 4);
                    let r = ((rgb655 & 0xFC00) >> 10) as i32 * 0x7F / 0x3F;
                    let g = ((rgb655 & 0x03E0) >> 5) as i32 * 0xFF / 0x1F - 0x80;
                    let b = (rgb655 & 0x001F) as i32 * 0xFF / 0x1F - 0x80;
                    out_line[x * 3] = r as i8 as u8;
                    out_line[x * 3 + 1] = g as i8 as u8;
                    out_line[x * 3 + 2] = b as i8 as u8;
                }
            }
        }
    }
    converted
}

/// Decodes the levels of one 2D face starting at `data`
fn decode_face(
    info: &ColorFormatInfo,
    shape: &TextureShape,
    face: u32,
    mut data: &[u8],
    palette: &[u8],
    levels: &mut Vec<TextureLevel>,
) {
    let (mut width, mut height) = (shape.width as usize, shape.height as usize);
    for level in 0..shape.levels {
        let (level_data, length) = if info.compressed() {
            width = width.max(4);
            height = height.max(4);
            let length = width / 4 * height / 4 * info.block_size();
            (data[..length].to_vec(), length)
        } else {
            width = width.max(1);
            height = height.max(1);
            let pitch = width * info.bytes_per_pixel;
            let length = height * pitch;
            let mut unswizzled = vec![0; length];
            unswizzle_rect(
                &data[..length],
                width as u32,
                height as u32,
                &mut unswizzled,
                pitch,
                info.bytes_per_pixel,
            );
            let converted = convert_texture_data(info, &unswizzled, palette, width, height, pitch);
            (converted, length)
        };

        levels.push(TextureLevel {
            face,
            level,
            width: width as u32,
            height: height as u32,
            depth: 1,
            data: level_data,
        });

        data = &data[length..];
        width /= 2;
        height /= 2;
    }
}

fn decode_texture(
    info: &ColorFormatInfo,
    shape: &TextureShape,
    target: TextureTarget,
    data: &[u8],
    palette: &[u8],
) -> Vec<TextureLevel> {
    let mut levels = Vec::new();
    match target {
        TextureTarget::Rectangle => {
            let pitch = shape.pitch as usize;
            assert!(
                pitch % info.bytes_per_pixel == 0,
                "texture pitch {} not aligned to pixel size",
                pitch
            );
            let converted = convert_texture_data(
                info,
                data,
                palette,
                shape.width as usize,
                shape.height as usize,
                pitch,
            );
            levels.push(TextureLevel {
                face: 0,
                level: 0,
                width: shape.width,
                height: shape.height,
                depth: 1,
                data: converted,
            });
        }
        TextureTarget::Texture1D | TextureTarget::Texture2D => {
            decode_face(info, shape, 0, data, palette, &mut levels);
        }
        TextureTarget::Cube => {
            let face_length = swizzled_face_length(info, shape);
            for face in 0..6 {
                let start = face as usize * face_length;
                decode_face(info, shape, face, &data[start..], palette, &mut levels);
            }
        }
        TextureTarget::Texture3D => {
            assert!(!info.compressed(), "compressed 3D textures are not supported");
            let (mut width, mut height, mut depth) = (
                shape.width as usize,
                shape.height as usize,
                shape.depth as usize,
            );
            let mut data = data;
            for level in 0..shape.levels {
                width = width.max(1);
                height = height.max(1);
                depth = depth.max(1);
                let row_pitch = width * info.bytes_per_pixel;
                let slice_pitch = row_pitch * height;
                let length = slice_pitch * depth;
                let mut unswizzled = vec![0; length];
                unswizzle_box(
                    &data[..length],
                    width as u32,
                    height as u32,
                    depth as u32,
                    &mut unswizzled,
                    row_pitch,
                    slice_pitch,
                    info.bytes_per_pixel,
                );
                let converted = convert_texture_data(
                    info,
                    &unswizzled,
                    palette,
                    width,
                    height * depth,
                    row_pitch,
                );
                levels.push(TextureLevel {
                    face: 0,
                    level,
                    width: width as u32,
                    height: height as u32,
                    depth: depth as u32,
                    data: converted,
                });
                data = &data[length..];
                width /= 2;
                height /= 2;
                depth /= 2;
            }
        }
    }
    levels
}

impl PgraphState {
    /// Binds every texture unit, decoding guest textures on cache misses
    pub(super) fn bind_textures(&mut self) {
        for unit in 0..MAX_TEXTURES {
            self.bind_texture_unit(unit);
        }
    }

    fn bind_texture_unit(&mut self, unit: usize) {
        let reg = unit as u32 * 4;
        let ctl_0 = self.regs.get(TEXCTL0_0 + reg);
        let ctl_1 = self.regs.get(TEXCTL1_0 + reg);
        let fmt = self.regs.get(TEXFMT0 + reg);
        let filter = self.regs.get(TEXFILTER0 + reg);
        let address = self.regs.get(TEXADDRESS0 + reg);
        let palette = self.regs.get(TEXPALETTE0 + reg);
        let image_rect = self.regs.get(TEXIMAGERECT0 + reg);

        let enabled = get_mask(ctl_0, TEXCTL0_0_ENABLE) != 0;
        if !enabled {
            self.backend
                .bind_texture(unit as u32, None, &SamplerState::default());
            return;
        }

        let color_format = get_mask(fmt, TEXFMT0_COLOR);
        let dimensionality = get_mask(fmt, TEXFMT0_DIMENSIONALITY);
        let info = match color_format_info(color_format) {
            Some(info) => info,
            None => panic!("unimplemented texture color format 0x{:X}", color_format),
        };
        assert!(
            filter & TEXFILTER0_SIGNED == 0,
            "signed texture filtering is not supported (filter {:08X})",
            filter
        );

        let min = get_mask(filter, TEXFILTER0_MIN);
        let mag = get_mask(filter, TEXFILTER0_MAG);
        let mut wrap = [WrapMode::Repeat; 3];
        wrap[0] = wrap_mode(get_mask(address, TEXADDRESS0_ADDRU));
        if dimensionality > 1 {
            wrap[1] = wrap_mode(get_mask(address, TEXADDRESS0_ADDRV));
        }
        if dimensionality > 2 {
            wrap[2] = wrap_mode(get_mask(address, TEXADDRESS0_ADDRP));
        }
        let border_color = if fmt & TEXFMT0_BORDER_SOURCE != 0 {
            let color = self.regs.get(BORDERCOLOR0 + reg);
            [
                ((color >> 16) & 0xFF) as f32 / 255.0,
                ((color >> 8) & 0xFF) as f32 / 255.0,
                (color & 0xFF) as f32 / 255.0,
                ((color >> 24) & 0xFF) as f32 / 255.0,
            ]
        } else {
            [0.0; 4]
        };
        let sampler = SamplerState {
            min_filter: min_filter(min, info.linear),
            mag_filter: mag_filter(mag),
            wrap,
            border_color,
        };

        if !self.textures.units[unit].dirty {
            if let Some(id) = self.textures.units[unit].binding {
                let texture = self.textures.cache.binding(id).texture;
                self.backend.bind_texture(unit as u32, Some(texture), &sampler);
                return;
            }
        }

        let cubemap = fmt & TEXFMT0_CUBEMAPENABLE != 0;
        let max_mipmap_level = get_mask(ctl_0, TEXCTL0_0_MAX_LOD_CLAMP);
        let min_mipmap_level = get_mask(ctl_0, TEXCTL0_0_MIN_LOD_CLAMP);
        let mut levels = get_mask(fmt, TEXFMT0_MIPMAP_LEVELS);
        let log_width = get_mask(fmt, TEXFMT0_BASE_SIZE_U);
        let log_height = get_mask(fmt, TEXFMT0_BASE_SIZE_V);
        let log_depth = get_mask(fmt, TEXFMT0_BASE_SIZE_P);
        let pitch = get_mask(ctl_1, TEXCTL1_0_IMAGE_PITCH);

        let (width, height, depth) = if info.linear {
            assert_eq!(dimensionality, 2, "linear textures must be 2D");
            (
                get_mask(image_rect, TEXIMAGERECT0_WIDTH),
                get_mask(image_rect, TEXIMAGERECT0_HEIGHT),
                1,
            )
        } else {
            levels = levels.min(max_mipmap_level + 1);
            if info.compressed() {
                // block compressed levels can't be smaller than one 4x4 block
                if log_width < 2 || log_height < 2 {
                    levels = 1;
                } else {
                    levels = levels.min(log_width.min(log_height) - 1);
                }
            } else {
                levels = levels.min(log_width.max(log_height) + 1);
            }
            assert!(levels > 0, "texture {} has no mipmap levels", unit);
            (1 << log_width, 1 << log_height, 1 << log_depth)
        };

        let shape = TextureShape {
            cubemap,
            dimensionality,
            color_format,
            levels,
            width,
            height,
            depth,
            min_mipmap_level,
            max_mipmap_level,
            pitch,
        };

        let length = if info.linear {
            assert!(!cubemap, "linear textures can't be cubemaps");
            height as usize * pitch as usize
        } else {
            let mut length = swizzled_face_length(&info, &shape);
            if cubemap {
                assert_eq!(dimensionality, 2, "cubemaps must be 2D");
                length *= 6;
            }
            if dimensionality >= 3 {
                length *= depth as usize;
            }
            length
        };

        let offset = self.regs.get(TEXOFFSET0 + reg) as usize;
        let dma_handle = if fmt & TEXFMT0_CONTEXT_DMA != 0 {
            self.dma.b
        } else {
            self.dma.a
        };
        let (texture_start, texture_len) =
            DmaObject::load(self.memory.ramin(), dma_handle).map(self.memory.vram().len());
        assert!(
            offset + length <= texture_len,
            "texture {} data {:X}+{:X} beyond DMA length {:X}",
            unit,
            offset,
            length,
            texture_len
        );
        let texture_range = texture_start + offset..texture_start + offset + length;

        let palette_range = if info.conversion == Conversion::Palette {
            let palette_offset = (palette & TEXPALETTE0_PALETTE_OFFSET) as usize;
            let palette_bytes = palette_length(get_mask(palette, TEXPALETTE0_LENGTH)) * 4;
            let palette_dma = if palette & TEXPALETTE0_CONTEXT_DMA != 0 {
                self.dma.b
            } else {
                self.dma.a
            };
            let (palette_start, palette_len) =
                DmaObject::load(self.memory.ramin(), palette_dma).map(self.memory.vram().len());
            assert!(
                palette_offset + palette_bytes <= palette_len,
                "texture {} palette {:X}+{:X} beyond DMA length {:X}",
                unit,
                palette_offset,
                palette_bytes,
                palette_len
            );
            palette_start + palette_offset..palette_start + palette_offset + palette_bytes
        } else {
            0..0
        };

        let vram = self.memory.vram();
        let texture_data = &vram[texture_range];
        let palette_data = &vram[palette_range];
        let hash = xxh64(texture_data, 0) ^ xxh64(palette_data, 0);
        let key = TextureKey { shape, hash };

        let cache = &mut self.textures.cache;
        let id = match cache.lru.lookup(&key) {
            Some(handle) => {
                let id = *cache.lru.get(handle);
                cache.retain(id);
                id
            }
            None => {
                let target = if cubemap {
                    TextureTarget::Cube
                } else if info.linear {
                    TextureTarget::Rectangle
                } else {
                    match dimensionality {
                        1 => TextureTarget::Texture1D,
                        2 => TextureTarget::Texture2D,
                        3 => TextureTarget::Texture3D,
                        _ => panic!("invalid texture dimensionality {}", dimensionality),
                    }
                };
                if info.conversion == Conversion::SignedR6G5B5 {
                    log::warn!("texture {}: signed R6G5B5 interpretation is unverified", unit);
                }

                if info.conversion == Conversion::Palette {
                    let entries = palette_data.len() / 4;
                    if let Some(index) = texture_data.iter().find(|&&i| i as usize >= entries) {
                        panic!(
                            "texture {} palette index {} beyond its {} entries",
                            unit, index, entries
                        );
                    }
                }

                let decoded = decode_texture(&info, &shape, target, texture_data, palette_data);
                let desc = TextureDesc {
                    target,
                    format: info.host,
                    width,
                    height,
                    depth,
                    levels,
                };
                let texture = self.backend.create_texture(&desc, decoded);
                log::info!(
                    "texture {}: created {:?} format 0x{:X} {}x{}x{} levels {}",
                    unit,
                    target,
                    color_format,
                    width,
                    height,
                    depth,
                    levels
                );

                let id = cache.allocate(target, texture);
                let (_, evicted) = cache.lru.insert(key, id);
                if let Some((evicted_key, evicted_id)) = evicted {
                    log::info!("texture cache evicted {:?}", evicted_key.shape);
                    if let Some(texture) = cache.release(evicted_id) {
                        self.backend.destroy_texture(texture);
                    }
                }
                // one reference for the cache, one for the unit
                cache.retain(id);
                id
            }
        };

        let texture = self.textures.cache.binding(id).texture;
        self.backend.bind_texture(unit as u32, Some(texture), &sampler);

        if let Some(old) = self.textures.units[unit].binding.replace(id) {
            if let Some(texture) = self.textures.cache.release(old) {
                self.backend.destroy_texture(texture);
            }
        }
        self.textures.units[unit].dirty = false;
    }

    /// Releases every cached texture and unit binding
    pub(super) fn destroy_textures(&mut self) {
        for unit in 0..MAX_TEXTURES {
            if let Some(id) = self.textures.units[unit].binding.take() {
                if let Some(texture) = self.textures.cache.release(id) {
                    self.backend.destroy_texture(texture);
                }
            }
            self.textures.units[unit].dirty = true;
        }
        for (_, id) in self.textures.cache.lru.drain() {
            if let Some(texture) = self.textures.cache.release(id) {
                self.backend.destroy_texture(texture);
            }
        }
    }

    /// Backend texture bound to `unit` by the last primitive
    pub fn bound_texture(&self, unit: usize) -> Option<TextureId> {
        self.textures.units[unit]
            .binding
            .map(|id| self.textures.cache.binding(id).texture)
    }
}

pub struct Textures {
    pub units: [TextureUnit; MAX_TEXTURES],
    pub cache: TextureCache,
    /// bump env matrices of stages 1 to 3
    pub bump_env_matrix: [[f32; 4]; MAX_TEXTURES - 1],
}

impl Textures {
    pub fn new(cache_size: usize) -> Self {
        Self {
            units: [TextureUnit::default(); MAX_TEXTURES],
            cache: TextureCache::new(cache_size),
            bump_env_matrix: [[0.0; 4]; MAX_TEXTURES - 1],
        }
    }
}

// method handlers, `slot` is the texture unit

pub(super) fn set_texture_offset(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(TEXOFFSET0 + call.slot as u32 * 4, call.parameter);
    pg.textures.units[call.slot].dirty = true;
    MethodAction::Continue
}

pub(super) fn set_texture_format(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let p = call.parameter;
    let reg = TEXFMT0 + call.slot as u32 * 4;

    let dma_select = get_mask(p, SET_TEXTURE_FORMAT_CONTEXT_DMA) == 2;
    pg.regs.set_flag(reg, TEXFMT0_CONTEXT_DMA, dma_select);
    pg.regs.set_flag(
        reg,
        TEXFMT0_CUBEMAPENABLE,
        p & SET_TEXTURE_FORMAT_CUBEMAP_ENABLE != 0,
    );
    pg.regs.set_flag(
        reg,
        TEXFMT0_BORDER_SOURCE,
        p & SET_TEXTURE_FORMAT_BORDER_SOURCE != 0,
    );
    pg.regs.set_mask(
        reg,
        TEXFMT0_DIMENSIONALITY,
        get_mask(p, SET_TEXTURE_FORMAT_DIMENSIONALITY),
    );
    pg.regs
        .set_mask(reg, TEXFMT0_COLOR, get_mask(p, SET_TEXTURE_FORMAT_COLOR));
    pg.regs.set_mask(
        reg,
        TEXFMT0_MIPMAP_LEVELS,
        get_mask(p, SET_TEXTURE_FORMAT_MIPMAP_LEVELS),
    );
    pg.regs.set_mask(
        reg,
        TEXFMT0_BASE_SIZE_U,
        get_mask(p, SET_TEXTURE_FORMAT_BASE_SIZE_U),
    );
    pg.regs.set_mask(
        reg,
        TEXFMT0_BASE_SIZE_V,
        get_mask(p, SET_TEXTURE_FORMAT_BASE_SIZE_V),
    );
    pg.regs.set_mask(
        reg,
        TEXFMT0_BASE_SIZE_P,
        get_mask(p, SET_TEXTURE_FORMAT_BASE_SIZE_P),
    );

    pg.textures.units[call.slot].dirty = true;
    MethodAction::Continue
}

pub(super) fn set_texture_address(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(TEXADDRESS0 + call.slot as u32 * 4, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_texture_control0(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(TEXCTL0_0 + call.slot as u32 * 4, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_texture_control1(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(TEXCTL1_0 + call.slot as u32 * 4, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_texture_filter(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(TEXFILTER0 + call.slot as u32 * 4, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_texture_image_rect(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(TEXIMAGERECT0 + call.slot as u32 * 4, call.parameter);
    pg.textures.units[call.slot].dirty = true;
    MethodAction::Continue
}

pub(super) fn set_texture_palette(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let p = call.parameter;
    let reg = TEXPALETTE0 + call.slot as u32 * 4;
    pg.regs.set_flag(
        reg,
        TEXPALETTE0_CONTEXT_DMA,
        get_mask(p, SET_TEXTURE_PALETTE_CONTEXT_DMA) == 1,
    );
    pg.regs.set_mask(
        reg,
        TEXPALETTE0_LENGTH,
        get_mask(p, SET_TEXTURE_PALETTE_LENGTH),
    );
    pg.regs.set_mask(
        reg,
        TEXPALETTE0_PALETTE_OFFSET,
        get_mask(p, SET_TEXTURE_PALETTE_OFFSET),
    );
    pg.textures.units[call.slot].dirty = true;
    MethodAction::Continue
}

pub(super) fn set_texture_border_color(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set(BORDERCOLOR0 + call.slot as u32 * 4, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_texture_bump_env_mat(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let stage = call.slot;
    let entry = ((call.method - NV097_SET_TEXTURE) / 4 % 16 - TEXTURE_SET_BUMP_ENV_MAT) as usize;
    assert!(stage > 0, "bump env matrix written for texture stage 0");
    log::warn!(
        "bump env matrix stage {} entry {} = {}, indexing is unverified",
        stage,
        entry,
        f32::from_bits(call.parameter)
    );
    pg.textures.bump_env_matrix[stage - 1][entry] = f32::from_bits(call.parameter);
    MethodAction::Continue
}

pub(super) fn set_texture_bump_env_scale(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    assert!(call.slot > 0, "bump env scale written for texture stage 0");
    pg.regs
        .set(BUMPSCALE1 + (call.slot as u32 - 1) * 4, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_texture_bump_env_offset(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    assert!(call.slot > 0, "bump env offset written for texture stage 0");
    pg.regs
        .set(BUMPOFFSET1 + (call.slot as u32 - 1) * 4, call.parameter);
    MethodAction::Continue
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(width: u32, height: u32, levels: u32) -> TextureShape {
        TextureShape {
            cubemap: false,
            dimensionality: 2,
            color_format: SET_TEXTURE_FORMAT_COLOR_SZ_A8R8G8B8,
            levels,
            width,
            height,
            depth: 1,
            min_mipmap_level: 0,
            max_mipmap_level: 0,
            pitch: 0,
        }
    }

    #[test]
    fn face_length_includes_mip_chain() {
        let info = color_format_info(SET_TEXTURE_FORMAT_COLOR_SZ_A8R8G8B8).unwrap();
        // 8x4 + 4x2 + 2x1
        assert_eq!(swizzled_face_length(&info, &shape(8, 4, 3)), (32 + 8 + 2) * 4);
    }

    #[test]
    fn compressed_levels_are_at_least_one_block() {
        let info = color_format_info(SET_TEXTURE_FORMAT_COLOR_L_DXT1_A1R5G5B5).unwrap();
        // 8x8 -> 4x4 -> (2x2 padded to 4x4)
        assert_eq!(swizzled_face_length(&info, &shape(8, 8, 3)), 4 * 8 + 8 + 8);
    }

    #[test]
    fn palette_expansion() {
        let info = color_format_info(SET_TEXTURE_FORMAT_COLOR_SZ_I8_A8R8G8B8).unwrap();
        let palette = [0, 0, 0, 0, 0x11, 0x22, 0x33, 0x44];
        let converted = convert_texture_data(&info, &[1, 0, 1, 1], &palette, 2, 2, 2);
        assert_eq!(
            converted,
            vec![0x11, 0x22, 0x33, 0x44, 0, 0, 0, 0, 0x11, 0x22, 0x33, 0x44, 0x11, 0x22, 0x33, 0x44]
        );
    }

    #[test]
    #[should_panic(expected = "palette index 64 beyond a palette of 32 entries")]
    fn palette_index_beyond_palette_panics() {
        let info = color_format_info(SET_TEXTURE_FORMAT_COLOR_SZ_I8_A8R8G8B8).unwrap();
        let palette = [0; 32 * 4];
        convert_texture_data(&info, &[0, 0x40, 0, 0], &palette, 2, 2, 2);
    }

    #[test]
    #[should_panic(expected = "texture pitch 2 smaller than a row of 4 texels")]
    fn pitch_shorter_than_row_panics() {
        let info = color_format_info(SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_Y8).unwrap();
        convert_texture_data(&info, &[0; 8], &[], 4, 2, 2);
    }

    #[test]
    fn yuy2_grey_converts_to_grey() {
        let info = color_format_info(SET_TEXTURE_FORMAT_COLOR_LC_IMAGE_CR8YB8CB8YA8).unwrap();
        // Y=235 is full white with neutral chroma
        let converted = convert_texture_data(&info, &[235, 128, 235, 128], &[], 2, 1, 4);
        assert_eq!(converted, vec![255, 255, 255, 255, 255, 255, 255, 255]);
    }

    #[test]
    fn linear_rows_are_repacked() {
        let info = color_format_info(SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_Y8).unwrap();
        let data = [1, 2, 0xEE, 0xEE, 3, 4, 0xEE, 0xEE];
        let mut s = shape(2, 2, 1);
        s.color_format = SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_Y8;
        s.pitch = 4;
        let levels = decode_texture(&info, &s, TextureTarget::Rectangle, &data, &[]);
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn cubemap_has_six_faces() {
        let info = color_format_info(SET_TEXTURE_FORMAT_COLOR_SZ_A8R8G8B8).unwrap();
        let mut s = shape(2, 2, 2);
        s.cubemap = true;
        let data = vec![0; swizzled_face_length(&info, &s) * 6];
        let levels = decode_texture(&info, &s, TextureTarget::Cube, &data, &[]);
        assert_eq!(levels.len(), 12);
        assert_eq!(levels[11].face, 5);
        assert_eq!(levels[11].width, 1);
    }

    #[test]
    fn filters_on_linear_textures_drop_mipmaps() {
        assert_eq!(min_filter(4, true), MinFilter::Linear);
        assert_eq!(min_filter(4, false), MinFilter::LinearMipmapNearest);
        assert_eq!(min_filter(5, true), MinFilter::Nearest);
    }

    #[test]
    fn unknown_formats_have_no_info() {
        assert!(color_format_info(0x08).is_none());
        assert!(color_format_info(0x7F).is_none());
    }
}

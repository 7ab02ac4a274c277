//! The interface between the command processor and the host renderer.
//!
//! The command processor translates guest register state into calls on a
//! [`RenderBackend`]. Handles returned by the backend are opaque to the core.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    Color,
    Zeta,
}

/// Pixel layout of a render target, as stored in guest memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceFormat {
    X1R5G5B5,
    R5G6B5,
    X8R8G8B8,
    A8R8G8B8,
    B8,
    G8B8,
    Z16 { float: bool },
    Z24S8 { float: bool },
}

impl SurfaceFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            SurfaceFormat::B8 => 1,
            SurfaceFormat::X1R5G5B5
            | SurfaceFormat::R5G6B5
            | SurfaceFormat::G8B8
            | SurfaceFormat::Z16 { .. } => 2,
            SurfaceFormat::X8R8G8B8 | SurfaceFormat::A8R8G8B8 | SurfaceFormat::Z24S8 { .. } => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
    Quads,
    QuadStrip,
    Polygon,
}

impl PrimitiveMode {
    /// From the `SET_BEGIN_END` parameter, `None` for END
    pub fn from_begin_end(op: u32) -> Option<Self> {
        let mode = match op {
            1 => PrimitiveMode::Points,
            2 => PrimitiveMode::Lines,
            3 => PrimitiveMode::LineLoop,
            4 => PrimitiveMode::LineStrip,
            5 => PrimitiveMode::Triangles,
            6 => PrimitiveMode::TriangleStrip,
            7 => PrimitiveMode::TriangleFan,
            8 => PrimitiveMode::Quads,
            9 => PrimitiveMode::QuadStrip,
            10 => PrimitiveMode::Polygon,
            _ => return None,
        };
        Some(mode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareFunc {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

impl CompareFunc {
    pub fn from_register(value: u32) -> Self {
        match value & 7 {
            0 => CompareFunc::Never,
            1 => CompareFunc::Less,
            2 => CompareFunc::Equal,
            3 => CompareFunc::LessEqual,
            4 => CompareFunc::Greater,
            5 => CompareFunc::NotEqual,
            6 => CompareFunc::GreaterEqual,
            _ => CompareFunc::Always,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    DstColor,
    OneMinusDstColor,
    SrcAlphaSaturate,
    ConstantColor,
    OneMinusConstantColor,
    ConstantAlpha,
    OneMinusConstantAlpha,
}

impl BlendFactor {
    pub fn from_register(value: u32) -> Self {
        match value {
            0 => BlendFactor::Zero,
            1 => BlendFactor::One,
            2 => BlendFactor::SrcColor,
            3 => BlendFactor::OneMinusSrcColor,
            4 => BlendFactor::SrcAlpha,
            5 => BlendFactor::OneMinusSrcAlpha,
            6 => BlendFactor::DstAlpha,
            7 => BlendFactor::OneMinusDstAlpha,
            8 => BlendFactor::DstColor,
            9 => BlendFactor::OneMinusDstColor,
            0xA => BlendFactor::SrcAlphaSaturate,
            0xC => BlendFactor::ConstantColor,
            0xD => BlendFactor::OneMinusConstantColor,
            0xE => BlendFactor::ConstantAlpha,
            0xF => BlendFactor::OneMinusConstantAlpha,
            _ => panic!("invalid blend factor register value {:X}", value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendEquation {
    Subtract,
    ReverseSubtract,
    Add,
    Min,
    Max,
    ReverseSubtractSigned,
    AddSigned,
}

impl BlendEquation {
    pub fn from_register(value: u32) -> Self {
        match value {
            0 => BlendEquation::Subtract,
            1 => BlendEquation::ReverseSubtract,
            2 => BlendEquation::Add,
            3 => BlendEquation::Min,
            4 => BlendEquation::Max,
            5 => BlendEquation::ReverseSubtractSigned,
            6 => BlendEquation::AddSigned,
            _ => panic!("invalid blend equation register value {:X}", value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    IncrementSaturate,
    DecrementSaturate,
    Invert,
    IncrementWrap,
    DecrementWrap,
}

impl StencilOp {
    pub fn from_register(value: u32) -> Self {
        match value {
            1 => StencilOp::Keep,
            2 => StencilOp::Zero,
            3 => StencilOp::Replace,
            4 => StencilOp::IncrementSaturate,
            5 => StencilOp::DecrementSaturate,
            6 => StencilOp::Invert,
            7 => StencilOp::IncrementWrap,
            8 => StencilOp::DecrementWrap,
            _ => panic!("invalid stencil op register value {:X}", value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullFace {
    Front,
    Back,
    FrontAndBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontFace {
    Clockwise,
    CounterClockwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolygonMode {
    Fill,
    Point,
    Line,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendState {
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
    pub equation: BlendEquation,
    pub color: [f32; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilState {
    pub func: CompareFunc,
    pub reference: u8,
    pub read_mask: u8,
    pub write_mask: u8,
    pub op_fail: StencilOp,
    pub op_zfail: StencilOp,
    pub op_zpass: StencilOp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    /// red, green, blue, alpha
    pub color_mask: [bool; 4],
    pub depth_write: bool,
    pub stencil_write_mask: u8,
    pub blend: Option<BlendState>,
    pub logic_op: Option<u32>,
    pub cull: Option<CullFace>,
    pub front_face: FrontFace,
    /// front, back
    pub polygon_mode: [PolygonMode; 2],
    /// point, line, fill
    pub polygon_offset_enable: [bool; 3],
    pub polygon_offset_factor: f32,
    pub polygon_offset_units: f32,
    pub depth_test: Option<CompareFunc>,
    pub stencil_test: Option<StencilState>,
    pub dither: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearParams {
    pub color: Option<[f32; 4]>,
    /// red, green, blue, alpha
    pub color_mask: [bool; 4],
    pub depth: Option<f32>,
    pub stencil: Option<u8>,
    pub scissor: Rect,
    pub dither: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    Rectangle,
    Texture1D,
    Texture2D,
    Texture3D,
    Cube,
}

/// Host pixel formats textures are uploaded as.
///
/// Multi-byte 8 bit formats are named by their byte order in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostFormat {
    R8,
    Rg8,
    Bgr5A1,
    Rgb565,
    Bgra4,
    Bgra8,
    Rgba8,
    Abgr8,
    Argb8,
    /// signed 3 component, repacked from R6G5B5
    Rgb8Snorm,
    R16,
    Depth16,
    Depth24,
    Dxt1,
    Dxt3,
    Dxt5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureDesc {
    pub target: TextureTarget,
    pub format: HostFormat,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub levels: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureLevel {
    /// cube face index, 0 for other targets
    pub face: u32,
    pub level: u32,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagFilter {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerState {
    pub min_filter: MinFilter,
    pub mag_filter: MagFilter,
    /// s, t, r
    pub wrap: [WrapMode; 3],
    pub border_color: [f32; 4],
}

impl Default for SamplerState {
    fn default() -> Self {
        Self {
            min_filter: MinFilter::Nearest,
            mag_filter: MagFilter::Nearest,
            wrap: [WrapMode::Repeat; 3],
            border_color: [0.0; 4],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    UnsignedByte,
    Short,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeFormat {
    pub kind: AttributeKind,
    pub count: u32,
    pub normalized: bool,
    /// components stored as B, G, R, A
    pub bgra: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeSource<'a> {
    /// same value for every vertex
    Constant([f32; 4]),
    /// guest memory starting at the first vertex
    Data {
        format: AttributeFormat,
        bytes: &'a [u8],
        stride: u32,
    },
    /// engine generated floats, one vec4 per vertex
    Inline(&'a [[f32; 4]]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Draw<'a> {
    Ranges(&'a [Range<u32>]),
    Indexed { indices: &'a [u32], min: u32, max: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    IVec4([i32; 4]),
    Mat2([f32; 4]),
    Mat4([f32; 16]),
}

pub trait RenderBackend: Send {
    fn create_surface(&mut self, kind: SurfaceKind, format: SurfaceFormat, width: u32, height: u32);
    fn destroy_surface(&mut self, kind: SurfaceKind);
    /// Upload linear, bottom-up rows of `width * height * bpp` bytes
    fn write_surface(&mut self, kind: SurfaceKind, data: &[u8]);
    /// Read back the rows in the same layout as [`Self::write_surface`]
    fn read_surface(&mut self, kind: SurfaceKind, data: &mut [u8]);

    fn set_render_state(&mut self, state: &RenderState);
    fn set_viewport(&mut self, viewport: Rect);
    fn set_scissor(&mut self, scissor: Option<Rect>);
    fn clear(&mut self, params: &ClearParams);

    fn create_texture(&mut self, desc: &TextureDesc, levels: Vec<TextureLevel>) -> TextureId;
    fn destroy_texture(&mut self, texture: TextureId);
    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>, sampler: &SamplerState);

    fn create_program(&mut self, vertex_source: &str, fragment_source: &str) -> ProgramId;
    fn bind_program(&mut self, program: ProgramId);
    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    /// Sets a uniform of the bound program
    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue);

    fn bind_vertex_attribute(&mut self, index: u32, source: AttributeSource);
    fn draw(&mut self, mode: PrimitiveMode, draw: &Draw);

    fn begin_occlusion_query(&mut self) -> QueryId;
    fn end_occlusion_query(&mut self, query: QueryId);
    fn query_result(&mut self, query: QueryId) -> u32;
    fn delete_query(&mut self, query: QueryId);
}

//! Shader state derivation, GLSL generation and the compiled program cache.
//!
//! Every draw derives a [`ShaderState`] from the registers. The state is the
//! cache key: programs are generated and compiled once per distinct state,
//! after which only the uniforms are refreshed.

mod fixed;
mod psh;
mod vsh;

use std::collections::HashMap;
use std::sync::Arc;

use xxhash_rust::xxh64::Xxh64Builder;

use super::backend::{PolygonMode, ProgramId, UniformLocation, UniformValue};
use super::methods::*;
use super::regs::*;
use super::texture::{is_linear_format, MAX_TEXTURES};
use super::transform::*;
use super::PgraphState;

const WINDOW_CLIP_REGIONS: usize = 8;
const COMBINER_STAGES: usize = 8;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Texgen {
    #[default]
    Disable,
    EyeLinear,
    ObjectLinear,
    SphereMap,
    ReflectionMap,
    NormalMap,
}

impl Texgen {
    fn from_register(value: u32) -> Self {
        match value {
            0 => Texgen::Disable,
            1 => Texgen::EyeLinear,
            2 => Texgen::ObjectLinear,
            3 => Texgen::SphereMap,
            4 => Texgen::ReflectionMap,
            5 => Texgen::NormalMap,
            _ => panic!("invalid texgen register value {}", value),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Foggen {
    #[default]
    SpecularAlpha,
    Radial,
    Planar,
    AbsPlanar,
    FogX,
}

impl Foggen {
    fn from_register(value: u32) -> Self {
        match value {
            SET_FOG_GEN_MODE_V_SPEC_ALPHA => Foggen::SpecularAlpha,
            SET_FOG_GEN_MODE_V_RADIAL => Foggen::Radial,
            SET_FOG_GEN_MODE_V_PLANAR => Foggen::Planar,
            SET_FOG_GEN_MODE_V_ABS_PLANAR => Foggen::AbsPlanar,
            SET_FOG_GEN_MODE_V_FOG_X => Foggen::FogX,
            _ => panic!("invalid fog generation mode {}", value),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FogMode {
    #[default]
    Linear,
    Exp,
    Exp2,
    LinearAbs,
    ExpAbs,
    Exp2Abs,
}

impl FogMode {
    fn from_register(value: u32) -> Self {
        match value {
            CONTROL_3_FOG_MODE_LINEAR => FogMode::Linear,
            CONTROL_3_FOG_MODE_EXP => FogMode::Exp,
            CONTROL_3_FOG_MODE_EXP2 => FogMode::Exp2,
            CONTROL_3_FOG_MODE_LINEAR_ABS => FogMode::LinearAbs,
            CONTROL_3_FOG_MODE_EXP_ABS => FogMode::ExpAbs,
            CONTROL_3_FOG_MODE_EXP2_ABS => FogMode::Exp2Abs,
            _ => panic!("invalid fog mode {}", value),
        }
    }
}

/// Vertex blending: how many model view matrices are mixed, and whether the
/// last weight is derived from the others
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Skinning {
    #[default]
    Off,
    Weights1,
    Weights2Matrices2,
    Weights2,
    Weights3Matrices3,
    Weights3,
    Weights4Matrices4,
}

impl Skinning {
    fn from_register(value: u32) -> Self {
        match value {
            0 => Skinning::Off,
            1 => Skinning::Weights1,
            2 => Skinning::Weights2Matrices2,
            3 => Skinning::Weights2,
            4 => Skinning::Weights3Matrices3,
            5 => Skinning::Weights3,
            6 => Skinning::Weights4Matrices4,
            _ => panic!("invalid skinning mode {}", value),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightType {
    #[default]
    Off,
    Infinite,
    Local,
    Spot,
}

impl LightType {
    fn from_register(value: u32) -> Self {
        match value & 3 {
            0 => LightType::Off,
            1 => LightType::Infinite,
            2 => LightType::Local,
            _ => LightType::Spot,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialSource {
    #[default]
    Material,
    Diffuse,
    Specular,
}

impl MaterialSource {
    fn from_register(value: u32) -> Self {
        match value {
            0 => MaterialSource::Material,
            1 => MaterialSource::Diffuse,
            2 => MaterialSource::Specular,
            _ => panic!("invalid material color source {}", value),
        }
    }
}

pub(super) fn polygon_mode(value: u32) -> PolygonMode {
    match value {
        SETUPRASTER_FACEMODE_FILL => PolygonMode::Fill,
        SETUPRASTER_FACEMODE_POINT => PolygonMode::Point,
        SETUPRASTER_FACEMODE_LINE => PolygonMode::Line,
        _ => panic!("invalid polygon mode {}", value),
    }
}

/// Register combiner state the fragment shader is generated from
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct PshState {
    pub combiner_control: u32,
    pub shader_stage_program: u32,
    pub other_stage_input: u32,
    pub final_inputs_0: u32,
    pub final_inputs_1: u32,

    pub rgb_inputs: [u32; COMBINER_STAGES],
    pub rgb_outputs: [u32; COMBINER_STAGES],
    pub alpha_inputs: [u32; COMBINER_STAGES],
    pub alpha_outputs: [u32; COMBINER_STAGES],

    /// textures sampled with unnormalized coordinates
    pub rect_tex: [bool; MAX_TEXTURES],
    /// per texture and component, clip plane test is `>=` instead of `<`
    pub compare_mode: [[bool; 4]; MAX_TEXTURES],
    pub alphakill: [bool; MAX_TEXTURES],

    pub alpha_test: bool,
    pub alpha_func: u32,

    pub window_clip_exclusive: bool,
    pub smooth_shading: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct FixedFunctionState {
    pub skinning: Skinning,
    pub normalization: bool,
    pub lighting: bool,
    pub light: [LightType; MAX_LIGHTS],
    pub emission_src: MaterialSource,
    pub ambient_src: MaterialSource,
    pub diffuse_src: MaterialSource,
    pub specular_src: MaterialSource,
    pub texgen: [[Texgen; 4]; MAX_TEXTURES],
    pub texture_matrix_enable: [bool; MAX_TEXTURES],
    pub foggen: Foggen,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VertexPipeline {
    FixedFunction(FixedFunctionState),
    /// program slots up to and including the final one
    Program(Vec<[u32; 4]>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderState {
    pub psh: PshState,
    pub vertex: VertexPipeline,
    pub z_perspective: bool,
    pub fog_enable: bool,
    pub fog_mode: FogMode,
    pub smooth_shading: bool,
    pub polygon_front_mode: PolygonMode,
    pub polygon_back_mode: PolygonMode,
}

/// A compiled program and the locations of the uniforms it may use
pub struct ShaderBinding {
    pub program: ProgramId,
    fixed_function: bool,

    psh_constants: [[Option<UniformLocation>; 2]; COMBINER_STAGES + 1],
    alpha_ref: Option<UniformLocation>,
    bump_mat: [Option<UniformLocation>; MAX_TEXTURES],
    bump_scale: [Option<UniformLocation>; MAX_TEXTURES],
    bump_offset: [Option<UniformLocation>; MAX_TEXTURES],
    tex_scale: [Option<UniformLocation>; MAX_TEXTURES],
    fog_color: Option<UniformLocation>,
    fog_param: [Option<UniformLocation>; 2],
    clip_region: [Option<UniformLocation>; WINDOW_CLIP_REGIONS],

    surface_size: Option<UniformLocation>,
    clip_range: Option<UniformLocation>,
    constants: Vec<Option<UniformLocation>>,

    inv_viewport: Option<UniformLocation>,
    ltctxa: Vec<Option<UniformLocation>>,
    ltctxb: Vec<Option<UniformLocation>>,
    ltc1: Vec<Option<UniformLocation>>,
    light_infinite_half_vector: [Option<UniformLocation>; MAX_LIGHTS],
    light_infinite_direction: [Option<UniformLocation>; MAX_LIGHTS],
    light_local_position: [Option<UniformLocation>; MAX_LIGHTS],
    light_local_attenuation: [Option<UniformLocation>; MAX_LIGHTS],
    material_alpha: Option<UniformLocation>,
}

#[derive(Default)]
pub struct ShaderCache {
    programs: HashMap<ShaderState, Arc<ShaderBinding>, Xxh64Builder>,
    bound: Option<Arc<ShaderBinding>>,
}

impl ShaderCache {
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub fn bound_program(&self) -> Option<ProgramId> {
        self.bound.as_ref().map(|b| b.program)
    }
}

/// Interpolated values passed from the vertex to the fragment stage,
/// `direction` being `in` or `out`
fn vertex_data_block(smooth_shading: bool, direction: &str) -> String {
    let qualifier = if smooth_shading {
        "noperspective"
    } else {
        "flat"
    };
    let mut block = format!(
        "noperspective {d} float vtx_inv_w;\nflat {d} float vtx_inv_w_flat;\n",
        d = direction
    );
    for name in ["vtxD0", "vtxD1", "vtxB0", "vtxB1"] {
        block.push_str(&format!("{} {} vec4 {};\n", qualifier, direction, name));
    }
    block.push_str(&format!("noperspective {} float vtxFog;\n", direction));
    for i in 0..4 {
        block.push_str(&format!("noperspective {} vec4 vtxT{};\n", direction, i));
    }
    block
}

fn c_mat4(row: usize) -> String {
    format!(
        "mat4(c[{}], c[{}], c[{}], c[{}])",
        row,
        row + 1,
        row + 2,
        row + 3
    )
}

/// Generates the vertex shader, wrapping either the fixed function pipeline
/// or a translated vertex program
fn vertex_shader(state: &ShaderState) -> String {
    let mut header = format!(
        "#version 400\n\
         \n\
         uniform vec4 clipRange;\n\
         uniform vec2 surfaceSize;\n\
         \n\
         uniform vec4 c[{}];\n\
         \n\
         uniform vec4 fogColor;\n\
         uniform float fogParam[2];\n\
         \n",
        TRANSFORM_CONSTANTS
    );
    header.push_str(&format!("#define fogPlane c[{}]\n", XFCTX_FOG));
    for (i, row) in [XFCTX_T0MAT, XFCTX_T1MAT, XFCTX_T2MAT, XFCTX_T3MAT]
        .into_iter()
        .enumerate()
    {
        header.push_str(&format!("#define texMat{} {}\n", i, c_mat4(row)));
    }
    header.push('\n');
    for output in [
        "oPos", "oD0", "oD1", "oB0", "oB1", "oPts", "oFog", "oT0", "oT1", "oT2", "oT3",
    ] {
        header.push_str(&format!("vec4 {} = vec4(0.0,0.0,0.0,1.0);\n", output));
    }
    header.push('\n');
    header.push_str(&vertex_data_block(state.smooth_shading, "out"));
    header.push('\n');
    for i in 0..16 {
        header.push_str(&format!("layout(location = {0}) in vec4 v{0};\n", i));
    }
    header.push('\n');

    let mut body = String::from("void main() {\n");

    match &state.vertex {
        VertexPipeline::FixedFunction(ff) => {
            fixed::translate(ff, state.fog_enable, &mut header, &mut body);
        }
        VertexPipeline::Program(tokens) => {
            vsh::translate(tokens, state.z_perspective, &mut header, &mut body);
        }
    }

    if state.fog_enable {
        if let VertexPipeline::Program(_) = state.vertex {
            body.push_str("  float fogDistance = oFog.x;\n");
        }

        let guard_infinite = "  if (isinf(fogDistance)) {\n    fogDistance = 0.0;\n  }\n";
        match state.fog_mode {
            FogMode::Linear | FogMode::LinearAbs => {
                body.push_str(guard_infinite);
                body.push_str("  float fogFactor = fogParam[0] + fogDistance * fogParam[1];\n");
                body.push_str("  fogFactor -= 1.0;\n");
            }
            FogMode::Exp | FogMode::ExpAbs => {
                if state.fog_mode == FogMode::Exp {
                    body.push_str(guard_infinite);
                }
                body.push_str(
                    "  float fogFactor = fogParam[0] + exp2(fogDistance * fogParam[1] * 16.0);\n",
                );
                body.push_str("  fogFactor -= 1.5;\n");
            }
            FogMode::Exp2 | FogMode::Exp2Abs => {
                body.push_str(
                    "  float fogFactor = fogParam[0] + exp2(-fogDistance * fogDistance * fogParam[1] * fogParam[1] * 32.0);\n",
                );
                body.push_str("  fogFactor -= 1.5;\n");
            }
        }
        if matches!(
            state.fog_mode,
            FogMode::LinearAbs | FogMode::ExpAbs | FogMode::Exp2Abs
        ) {
            body.push_str("  fogFactor = abs(fogFactor);\n");
        }
        body.push_str("  oFog.xyzw = vec4(fogFactor);\n");
    } else {
        body.push_str("  oFog.xyzw = vec4(1.0);\n");
    }

    let shade_mult = if state.smooth_shading {
        "vtx_inv_w"
    } else {
        "vtx_inv_w_flat"
    };
    body.push('\n');
    for (var, output) in [("vtxD0", "oD0"), ("vtxD1", "oD1"), ("vtxB0", "oB0"), ("vtxB1", "oB1")] {
        body.push_str(&format!(
            "  {} = clamp({}, 0.0, 1.0) * {};\n",
            var, output, shade_mult
        ));
    }
    body.push_str("  vtxFog = oFog.x * vtx_inv_w;\n");
    for i in 0..4 {
        body.push_str(&format!("  vtxT{0} = oT{0} * vtx_inv_w;\n", i));
    }
    body.push_str(
        "  gl_Position = oPos;\n\
         \x20 gl_PointSize = oPts.x;\n\
         \x20 gl_ClipDistance[0] = oPos.z - oPos.w*clipRange.z;\n\
         \x20 gl_ClipDistance[1] = oPos.w*clipRange.w - oPos.z;\n\
         \n\
         }\n",
    );

    header.push_str(&body);
    header
}

fn color_to_vec4(argb: u32) -> [f32; 4] {
    [
        get_mask(argb, FOGCOLOR_RED) as f32 / 255.0,
        get_mask(argb, FOGCOLOR_GREEN) as f32 / 255.0,
        get_mask(argb, FOGCOLOR_BLUE) as f32 / 255.0,
        get_mask(argb, FOGCOLOR_ALPHA) as f32 / 255.0,
    ]
}

impl PgraphState {
    fn shader_state(&self) -> ShaderState {
        let regs = &self.regs;
        let csv0_c = regs.get(CSV0_C);
        let csv0_d = regs.get(CSV0_D);
        let smooth_shading =
            regs.get_mask(CONTROL_3, CONTROL_3_SHADEMODE) == CONTROL_3_SHADEMODE_SMOOTH;

        let mut psh = PshState {
            combiner_control: regs.get(COMBINECTL),
            shader_stage_program: regs.get(SHADERPROG),
            other_stage_input: regs.get(SHADERCTL),
            final_inputs_0: regs.get(COMBINESPECFOG0),
            final_inputs_1: regs.get(COMBINESPECFOG1),
            alpha_test: regs.flag(CONTROL_0, CONTROL_0_ALPHATESTENABLE),
            alpha_func: regs.get_mask(CONTROL_0, CONTROL_0_ALPHAFUNC),
            window_clip_exclusive: regs.flag(SETUPRASTER, SETUPRASTER_WINDOWCLIPTYPE),
            smooth_shading,
            ..PshState::default()
        };
        let num_stages = ((psh.combiner_control & 0xFF) as usize).min(COMBINER_STAGES);
        for i in 0..num_stages {
            let reg = i as u32 * 4;
            psh.rgb_inputs[i] = regs.get(COMBINECOLORI0 + reg);
            psh.rgb_outputs[i] = regs.get(COMBINECOLORO0 + reg);
            psh.alpha_inputs[i] = regs.get(COMBINEALPHAI0 + reg);
            psh.alpha_outputs[i] = regs.get(COMBINEALPHAO0 + reg);
        }
        let clip_mode = regs.get(SHADERCLIPMODE);
        for i in 0..MAX_TEXTURES {
            let reg = i as u32 * 4;
            for j in 0..4 {
                psh.compare_mode[i][j] = (clip_mode >> (4 * i + j)) & 1 != 0;
            }
            let enabled = regs.flag(TEXCTL0_0 + reg, TEXCTL0_0_ENABLE);
            let color_format = regs.get_mask(TEXFMT0 + reg, TEXFMT0_COLOR);
            psh.rect_tex[i] = enabled && is_linear_format(color_format);
            psh.alphakill[i] = regs.flag(TEXCTL0_0 + reg, TEXCTL0_0_ALPHAKILLEN);
        }

        let fog_enable = regs.flag(CONTROL_3, CONTROL_3_FOGENABLE);

        let vertex = match get_mask(csv0_d, CSV0_D_MODE) {
            0 => {
                let lighting = get_mask(csv0_c, CSV0_C_LIGHTING) != 0;
                let mut ff = FixedFunctionState {
                    skinning: Skinning::from_register(get_mask(csv0_d, CSV0_D_SKIN)),
                    normalization: get_mask(csv0_c, CSV0_C_NORMALIZATION) != 0,
                    lighting,
                    emission_src: MaterialSource::from_register(get_mask(csv0_c, CSV0_C_EMISSION)),
                    ambient_src: MaterialSource::from_register(get_mask(csv0_c, CSV0_C_AMBIENT)),
                    diffuse_src: MaterialSource::from_register(get_mask(csv0_c, CSV0_C_DIFFUSE)),
                    specular_src: MaterialSource::from_register(get_mask(csv0_c, CSV0_C_SPECULAR)),
                    texture_matrix_enable: self.transform.texture_matrix_enable,
                    ..FixedFunctionState::default()
                };
                if fog_enable {
                    ff.foggen = Foggen::from_register(get_mask(csv0_d, CSV0_D_FOG_GENMODE));
                }
                if lighting {
                    for (i, light) in ff.light.iter_mut().enumerate() {
                        *light = LightType::from_register(get_mask(csv0_d, CSV0_D_LIGHT0 << (i * 2)));
                    }
                }
                for (i, texgen) in ff.texgen.iter_mut().enumerate() {
                    let reg = if i < 2 { CSV1_A } else { CSV1_B };
                    let masks = if i % 2 == 0 {
                        [CSV1_T0_S, CSV1_T0_T, CSV1_T0_R, CSV1_T0_Q]
                    } else {
                        [CSV1_T1_S, CSV1_T1_T, CSV1_T1_R, CSV1_T1_Q]
                    };
                    for (channel, mask) in texgen.iter_mut().zip(masks) {
                        *channel = Texgen::from_register(regs.get_mask(reg, mask));
                    }
                }
                VertexPipeline::FixedFunction(ff)
            }
            2 => {
                let start = get_mask(csv0_c, CSV0_C_PROGRAM_START) as usize;
                let mut tokens = Vec::new();
                for token in self.transform.program.iter().skip(start) {
                    tokens.push(*token);
                    if token[3] & 1 != 0 {
                        break;
                    }
                }
                VertexPipeline::Program(tokens)
            }
            mode => panic!("unknown vertex shader mode {}", mode),
        };

        ShaderState {
            psh,
            vertex,
            z_perspective: regs.flag(CONTROL_0, CONTROL_0_Z_PERSPECTIVE_ENABLE),
            fog_enable,
            fog_mode: if fog_enable {
                FogMode::from_register(regs.get_mask(CONTROL_3, CONTROL_3_FOG_MODE))
            } else {
                FogMode::Linear
            },
            smooth_shading,
            polygon_front_mode: polygon_mode(regs.get_mask(SETUPRASTER, SETUPRASTER_FRONTFACEMODE)),
            polygon_back_mode: polygon_mode(regs.get_mask(SETUPRASTER, SETUPRASTER_BACKFACEMODE)),
        }
    }

    fn generate_shaders(&mut self, state: &ShaderState) -> ShaderBinding {
        let vertex_source = vertex_shader(state);
        let fragment_source = psh::translate(&state.psh);
        let program = self
            .backend
            .create_program(&vertex_source, &fragment_source);
        log::debug!("compiled shader program {:?}", program);

        let backend = &mut self.backend;
        let mut locate = |name: String| backend.uniform_location(program, &name);

        let mut psh_constants = [[None; 2]; COMBINER_STAGES + 1];
        for (stage, locations) in psh_constants.iter_mut().enumerate() {
            for (j, location) in locations.iter_mut().enumerate() {
                *location = locate(format!("c{}_{}", j, stage));
            }
        }
        fn per_texture(
            locate: &mut dyn FnMut(String) -> Option<UniformLocation>,
            name: &str,
        ) -> [Option<UniformLocation>; MAX_TEXTURES] {
            let mut locations = [None; MAX_TEXTURES];
            for (i, location) in locations.iter_mut().enumerate() {
                *location = locate(format!("{}{}", name, i));
            }
            locations
        }
        let bump_mat = per_texture(&mut locate, "bumpMat");
        let bump_scale = per_texture(&mut locate, "bumpScale");
        let bump_offset = per_texture(&mut locate, "bumpOffset");
        let tex_scale = per_texture(&mut locate, "texScale");

        let mut clip_region = [None; WINDOW_CLIP_REGIONS];
        for (i, location) in clip_region.iter_mut().enumerate() {
            *location = locate(format!("clipRegion[{}]", i));
        }
        let constants = (0..TRANSFORM_CONSTANTS)
            .map(|i| locate(format!("c[{}]", i)))
            .collect();

        let fixed_function = matches!(state.vertex, VertexPipeline::FixedFunction(_));
        let mut ltctxa = Vec::new();
        let mut ltctxb = Vec::new();
        let mut ltc1 = Vec::new();
        let mut lights = [[None; MAX_LIGHTS]; 4];
        let mut inv_viewport = None;
        let mut material_alpha = None;
        if fixed_function {
            ltctxa = (0..LTCTXA_COUNT)
                .map(|i| locate(format!("ltctxa[{}]", i)))
                .collect();
            ltctxb = (0..LTCTXB_COUNT)
                .map(|i| locate(format!("ltctxb[{}]", i)))
                .collect();
            ltc1 = (0..LTC1_COUNT)
                .map(|i| locate(format!("ltc1[{}]", i)))
                .collect();
            let names = [
                "lightInfiniteHalfVector",
                "lightInfiniteDirection",
                "lightLocalPosition",
                "lightLocalAttenuation",
            ];
            for (locations, name) in lights.iter_mut().zip(names) {
                for (i, location) in locations.iter_mut().enumerate() {
                    *location = locate(format!("{}{}", name, i));
                }
            }
            inv_viewport = locate("invViewport".to_owned());
            material_alpha = locate("material_alpha".to_owned());
        }

        ShaderBinding {
            program,
            fixed_function,
            psh_constants,
            alpha_ref: locate("alphaRef".to_owned()),
            bump_mat,
            bump_scale,
            bump_offset,
            tex_scale,
            fog_color: locate("fogColor".to_owned()),
            fog_param: [
                locate("fogParam[0]".to_owned()),
                locate("fogParam[1]".to_owned()),
            ],
            clip_region,
            surface_size: locate("surfaceSize".to_owned()),
            clip_range: locate("clipRange".to_owned()),
            constants,
            inv_viewport,
            ltctxa,
            ltctxb,
            ltc1,
            light_infinite_half_vector: lights[0],
            light_infinite_direction: lights[1],
            light_local_position: lights[2],
            light_local_attenuation: lights[3],
            material_alpha,
        }
    }

    /// Selects the program for the current register state, compiling it on
    /// a cache miss, and refreshes its uniforms
    pub(super) fn bind_shaders(&mut self) {
        let state = self.shader_state();
        let binding = match self.shaders.programs.get(&state) {
            Some(binding) => binding.clone(),
            None => {
                let binding = Arc::new(self.generate_shaders(&state));
                self.shaders.programs.insert(state, binding.clone());
                binding
            }
        };

        let binding_changed = !matches!(
            &self.shaders.bound,
            Some(bound) if Arc::ptr_eq(bound, &binding)
        );
        if binding_changed {
            self.backend.bind_program(binding.program);
            self.shaders.bound = Some(binding.clone());
        }
        self.update_constants(&binding, binding_changed);
    }

    fn set_uniform(&mut self, location: Option<UniformLocation>, value: UniformValue) {
        if let Some(location) = location {
            self.backend.set_uniform(location, value);
        }
    }

    /// Depth value the zeta surface format clamps to
    fn zmax(&self) -> f32 {
        let float = self.surfaces.shape.z_format;
        match self.surfaces.shape.zeta_format {
            SET_SURFACE_FORMAT_ZETA_Z16 if float => 511.9375,
            SET_SURFACE_FORMAT_ZETA_Z16 => 65535.0,
            _ if float => 1.0e30,
            _ => 16777215.0,
        }
    }

    fn update_constants(&mut self, binding: &ShaderBinding, binding_changed: bool) {
        for (stage, locations) in binding.psh_constants.iter().enumerate() {
            for (j, location) in locations.iter().enumerate() {
                let reg = if stage < COMBINER_STAGES {
                    let base = if j == 0 { COMBINEFACTOR0 } else { COMBINEFACTOR1 };
                    base + stage as u32 * 4
                } else if j == 0 {
                    SPECFOGFACTOR0
                } else {
                    SPECFOGFACTOR1
                };
                let value = color_to_vec4(self.regs.get(reg));
                self.set_uniform(*location, UniformValue::Vec4(value));
            }
        }

        let alpha_ref = self.regs.get_mask(CONTROL_0, CONTROL_0_ALPHAREF) as f32 / 255.0;
        self.set_uniform(binding.alpha_ref, UniformValue::Float(alpha_ref));

        for i in 1..MAX_TEXTURES {
            let reg = (i as u32 - 1) * 4;
            let matrix = self.textures.bump_env_matrix[i - 1];
            self.set_uniform(binding.bump_mat[i], UniformValue::Mat2(matrix));
            let scale = self.regs.get_f32(BUMPSCALE1 + reg);
            self.set_uniform(binding.bump_scale[i], UniformValue::Float(scale));
            let offset = self.regs.get_f32(BUMPOFFSET1 + reg);
            self.set_uniform(binding.bump_offset[i], UniformValue::Float(offset));
        }
        for location in binding.tex_scale {
            self.set_uniform(location, UniformValue::Float(1.0));
        }

        let fog_color = color_to_vec4(self.regs.get(FOGCOLOR));
        self.set_uniform(binding.fog_color, UniformValue::Vec4(fog_color));
        let fog_param = [self.regs.get_f32(FOGPARAM0), self.regs.get_f32(FOGPARAM1)];
        for (location, value) in binding.fog_param.into_iter().zip(fog_param) {
            self.set_uniform(location, UniformValue::Float(value));
        }

        let zmax = self.zmax();
        let shape = self.surfaces.shape;
        let (clip_width, clip_height) = (shape.clip_width as f32, shape.clip_height as f32);

        if binding.fixed_function {
            for (i, location) in binding.ltctxa.iter().enumerate() {
                if self.transform.ltctxa.take_dirty(i) || binding_changed {
                    let value = self.transform.ltctxa.get_f32(i);
                    self.set_uniform(*location, UniformValue::Vec4(value));
                }
            }
            for (i, location) in binding.ltctxb.iter().enumerate() {
                if self.transform.ltctxb.take_dirty(i) || binding_changed {
                    let value = self.transform.ltctxb.get_f32(i);
                    self.set_uniform(*location, UniformValue::Vec4(value));
                }
            }
            for (i, location) in binding.ltc1.iter().enumerate() {
                if self.transform.ltc1.take_dirty(i) || binding_changed {
                    let value = self.transform.ltc1.get_f32(i);
                    self.set_uniform(*location, UniformValue::Vec4(value));
                }
            }

            for i in 0..MAX_LIGHTS {
                let light = self.transform.lights[i];
                self.set_uniform(
                    binding.light_infinite_half_vector[i],
                    UniformValue::Vec3(light.infinite_half_vector),
                );
                self.set_uniform(
                    binding.light_infinite_direction[i],
                    UniformValue::Vec3(light.infinite_direction),
                );
                self.set_uniform(
                    binding.light_local_position[i],
                    UniformValue::Vec3(light.local_position),
                );
                self.set_uniform(
                    binding.light_local_attenuation[i],
                    UniformValue::Vec3(light.local_attenuation),
                );
            }

            // maps window coordinates back to clip space
            let m11 = 0.5 * clip_width;
            let m22 = -0.5 * clip_height;
            let m33 = zmax;
            let viewport_offset = self.transform.constants.get_f32(XFCTX_VPOFF);
            let (m41, m42) = (viewport_offset[0], viewport_offset[1]);
            #[rustfmt::skip]
            let inv_viewport = [
                1.0 / m11, 0.0, 0.0, 0.0,
                0.0, 1.0 / m22, 0.0, 0.0,
                0.0, 0.0, 1.0 / m33, 0.0,
                -1.0 + m41 / m11, 1.0 + m42 / m22, 0.0, 1.0,
            ];
            self.set_uniform(binding.inv_viewport, UniformValue::Mat4(inv_viewport));

            let material_alpha = self.transform.material_alpha;
            self.set_uniform(binding.material_alpha, UniformValue::Float(material_alpha));
        }

        for (i, location) in binding.constants.iter().enumerate() {
            if self.transform.constants.take_dirty(i) || binding_changed {
                let value = self.transform.constants.get_f32(i);
                self.set_uniform(*location, UniformValue::Vec4(value));
            }
        }

        self.set_uniform(
            binding.surface_size,
            UniformValue::Vec2([clip_width, clip_height]),
        );

        let zclip_min = self.regs.get_f32(ZCLIPMIN) / zmax * 2.0 - 1.0;
        let zclip_max = self.regs.get_f32(ZCLIPMAX) / zmax * 2.0 - 1.0;
        self.set_uniform(
            binding.clip_range,
            UniformValue::Vec4([0.0, zmax, zclip_min, zclip_max]),
        );

        for (i, location) in binding.clip_region.iter().enumerate() {
            let reg = i as u32 * 4;
            let x = self.regs.get(WINDOWCLIPX0 + reg);
            let y = self.regs.get(WINDOWCLIPY0 + reg);
            let (x_min, y_min) =
                self.apply_anti_aliasing_factor(get_mask(x, WINDOWCLIP_MIN), get_mask(y, WINDOWCLIP_MIN));
            let (x_max, y_max) = self.apply_anti_aliasing_factor(
                get_mask(x, WINDOWCLIP_MAX) + 1,
                get_mask(y, WINDOWCLIP_MAX) + 1,
            );
            let region = [x_min as i32, y_min as i32, x_max as i32, y_max as i32];
            self.set_uniform(*location, UniformValue::IVec4(region));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_function_state() -> ShaderState {
        ShaderState {
            psh: PshState {
                smooth_shading: true,
                ..PshState::default()
            },
            vertex: VertexPipeline::FixedFunction(FixedFunctionState::default()),
            z_perspective: false,
            fog_enable: false,
            fog_mode: FogMode::Linear,
            smooth_shading: true,
            polygon_front_mode: PolygonMode::Fill,
            polygon_back_mode: PolygonMode::Fill,
        }
    }

    #[test]
    fn fixed_function_vertex_shader() {
        let source = vertex_shader(&fixed_function_state());

        assert!(source.starts_with("#version 400\n"));
        assert!(source.contains("#define compositeMat mat4(c[0], c[1], c[2], c[3])"));
        assert!(source.contains("#define texMat0 mat4(c[68], c[69], c[70], c[71])"));
        assert!(source.contains("layout(location = 15) in vec4 v15;"));
        assert!(source.contains("oPos = invViewport * (tPosition * compositeMat);"));
        assert!(source.contains("  oD0 = diffuse;\n"));
        assert!(source.contains("  oFog.xyzw = vec4(1.0);\n"));
        assert!(source.contains("noperspective out vec4 vtxD0;"));
        assert!(source.ends_with("}\n"));
    }

    #[test]
    fn fog_modes() {
        let mut state = fixed_function_state();
        state.fog_enable = true;
        state.fog_mode = FogMode::Exp2Abs;
        let source = vertex_shader(&state);
        assert!(source.contains("exp2(-fogDistance * fogDistance"));
        assert!(source.contains("fogFactor = abs(fogFactor);"));
        assert!(source.contains("oFog.xyzw = vec4(fogFactor);"));

        state.fog_mode = FogMode::Linear;
        let source = vertex_shader(&state);
        assert!(source.contains("fogParam[0] + fogDistance * fogParam[1]"));
        assert!(!source.contains("abs(fogFactor)"));
    }

    #[test]
    fn flat_shading_uses_flat_w() {
        let mut state = fixed_function_state();
        state.smooth_shading = false;
        let source = vertex_shader(&state);
        assert!(source.contains("flat out vec4 vtxD0;"));
        assert!(source.contains("vtxD0 = clamp(oD0, 0.0, 1.0) * vtx_inv_w_flat;"));
    }

    #[test]
    fn states_hash_by_content() {
        let mut programs: HashMap<ShaderState, u32, Xxh64Builder> =
            HashMap::with_hasher(Xxh64Builder::new(0));
        programs.insert(fixed_function_state(), 1);
        assert_eq!(programs.get(&fixed_function_state()), Some(&1));

        let mut other = fixed_function_state();
        other.psh.alpha_test = true;
        assert_eq!(programs.get(&other), None);
    }

    #[test]
    fn register_decoding() {
        assert_eq!(Texgen::from_register(4), Texgen::ReflectionMap);
        assert_eq!(Foggen::from_register(6), Foggen::FogX);
        assert_eq!(FogMode::from_register(5), FogMode::ExpAbs);
        assert_eq!(LightType::from_register(3), LightType::Spot);
        assert_eq!(color_to_vec4(0xFF00_FF00), [0.0, 1.0, 0.0, 1.0]);
    }
}

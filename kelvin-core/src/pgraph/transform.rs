//! Transform and lighting state: the constant banks, the vertex program
//! memory and the per light vectors fed to the generated vertex shaders.

use super::dispatch::{MethodAction, MethodCall};
use super::methods::*;
use super::regs::*;
use super::texture::MAX_TEXTURES;
use super::PgraphState;

pub const TRANSFORM_CONSTANTS: usize = 192;
pub const MAX_TRANSFORM_PROGRAM_LENGTH: usize = 136;
pub const MAX_LIGHTS: usize = 8;

pub const LTCTXA_COUNT: usize = 26;
pub const LTCTXB_COUNT: usize = 52;
pub const LTC1_COUNT: usize = 20;

// rows of the transform constant bank used by the fixed function pipeline
pub const XFCTX_CMAT0: usize = 0x00;
pub const XFCTX_PMAT0: usize = 0x04;
pub const XFCTX_MMAT0: usize = 0x08;
pub const XFCTX_IMMAT0: usize = 0x0C;
pub const XFCTX_MMAT1: usize = 0x10;
pub const XFCTX_IMMAT1: usize = 0x14;
pub const XFCTX_MMAT2: usize = 0x18;
pub const XFCTX_IMMAT2: usize = 0x1C;
pub const XFCTX_MMAT3: usize = 0x20;
pub const XFCTX_IMMAT3: usize = 0x24;
pub const XFCTX_EYEP: usize = 0x38;
pub const XFCTX_FOG: usize = 0x39;
pub const XFCTX_VPSCL: usize = 0x3A;
pub const XFCTX_VPOFF: usize = 0x3B;
pub const XFCTX_TG0MAT: usize = 0x40;
pub const XFCTX_T0MAT: usize = 0x44;
pub const XFCTX_TG1MAT: usize = 0x48;
pub const XFCTX_T1MAT: usize = 0x4C;
pub const XFCTX_TG2MAT: usize = 0x50;
pub const XFCTX_T2MAT: usize = 0x54;
pub const XFCTX_TG3MAT: usize = 0x58;
pub const XFCTX_T3MAT: usize = 0x5C;

pub const LTCTXA_L0_K: usize = 0x00;
pub const LTCTXA_L0_SPT: usize = 0x01;
pub const LTCTXA_EYED: usize = 0x10;
pub const LTCTXA_FR_AMB: usize = 0x11;
pub const LTCTXA_CM_COL: usize = 0x13;
pub const LTCTXA_FOG_K: usize = 0x15;

pub const LTCTXB_L0_AMB: usize = 0x00;
pub const LTCTXB_L0_DIF: usize = 0x01;
pub const LTCTXB_L0_SPC: usize = 0x02;
pub const LTCTXB_L0_BAMB: usize = 0x03;
pub const LTCTXB_L0_BDIF: usize = 0x04;
pub const LTCTXB_L0_BSPC: usize = 0x05;

pub const LTC1_R0: usize = 0x04;

/// A bank of vec4 rows, each with a dirty bit telling the shader uniforms
/// need the row again.
#[derive(Clone)]
pub struct ConstantBank<const N: usize> {
    rows: [[u32; 4]; N],
    dirty: [bool; N],
}

impl<const N: usize> Default for ConstantBank<N> {
    fn default() -> Self {
        Self {
            rows: [[0; 4]; N],
            dirty: [true; N],
        }
    }
}

impl<const N: usize> ConstantBank<N> {
    #[inline]
    pub fn set(&mut self, row: usize, component: usize, value: u32) {
        assert!(row < N, "constant row {} out of {}", row, N);
        let slot = &mut self.rows[row][component];
        self.dirty[row] |= *slot != value;
        *slot = value;
    }

    #[inline]
    pub fn get(&self, row: usize) -> [u32; 4] {
        self.rows[row]
    }

    pub fn get_f32(&self, row: usize) -> [f32; 4] {
        self.rows[row].map(f32::from_bits)
    }

    /// Clears the dirty bit of `row`, returning whether it was set
    pub fn take_dirty(&mut self, row: usize) -> bool {
        std::mem::take(&mut self.dirty[row])
    }

    pub fn mark_all_dirty(&mut self) {
        self.dirty = [true; N];
    }

    pub const fn len(&self) -> usize {
        N
    }
}

/// Vectors of one light that are uploaded as individual uniforms
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct LightVectors {
    pub infinite_half_vector: [f32; 3],
    pub infinite_direction: [f32; 3],
    pub local_position: [f32; 3],
    pub local_attenuation: [f32; 3],
}

pub struct Transform {
    pub constants: ConstantBank<TRANSFORM_CONSTANTS>,
    pub ltctxa: ConstantBank<LTCTXA_COUNT>,
    pub ltctxb: ConstantBank<LTCTXB_COUNT>,
    pub ltc1: ConstantBank<LTC1_COUNT>,
    /// vertex program slots, 4 words each
    pub program: Vec<[u32; 4]>,
    pub lights: [LightVectors; MAX_LIGHTS],
    pub texture_matrix_enable: [bool; MAX_TEXTURES],
    pub material_alpha: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            constants: ConstantBank::default(),
            ltctxa: ConstantBank::default(),
            ltctxb: ConstantBank::default(),
            ltc1: ConstantBank::default(),
            program: vec![[0; 4]; MAX_TRANSFORM_PROGRAM_LENGTH],
            lights: [LightVectors::default(); MAX_LIGHTS],
            texture_matrix_enable: [false; MAX_TEXTURES],
            material_alpha: 0.0,
        }
    }
}

fn set_vector(vector: &mut [f32; 3], part: usize, value: u32) {
    vector[part] = f32::from_bits(value);
}

/// Converts the `SET_TEXGEN_*` value to the CSV1 field encoding.
/// Sphere mapping only exists for S and T, reflection and normal
/// mapping do not exist for Q.
fn map_texgen(value: u32, channel: usize) -> u32 {
    match value {
        SET_TEXGEN_V_DISABLE => 0,
        SET_TEXGEN_V_EYE_LINEAR => 1,
        SET_TEXGEN_V_OBJECT_LINEAR => 2,
        SET_TEXGEN_V_SPHERE_MAP => {
            assert!(channel < 2, "sphere map texgen on channel {}", channel);
            3
        }
        SET_TEXGEN_V_REFLECTION_MAP => {
            assert!(channel < 3, "reflection map texgen on channel {}", channel);
            4
        }
        SET_TEXGEN_V_NORMAL_MAP => {
            assert!(channel < 3, "normal map texgen on channel {}", channel);
            5
        }
        _ => panic!("unknown texgen mode 0x{:X}", value),
    }
}

// method handlers, `slot` is the word index inside the method range

pub(super) fn set_projection_matrix(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let slot = call.slot;
    pg.transform
        .constants
        .set(XFCTX_PMAT0 + slot / 4, slot % 4, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_model_view_matrix(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let (matrix, entry) = (call.slot / 16, call.slot % 16);
    let row = XFCTX_MMAT0 + matrix * 8 + entry / 4;
    pg.transform.constants.set(row, entry % 4, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_inverse_model_view_matrix(
    pg: &mut PgraphState,
    call: &MethodCall,
) -> MethodAction {
    let (matrix, entry) = (call.slot / 16, call.slot % 16);
    let row = XFCTX_IMMAT0 + matrix * 8 + entry / 4;
    pg.transform.constants.set(row, entry % 4, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_composite_matrix(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let slot = call.slot;
    pg.transform
        .constants
        .set(XFCTX_CMAT0 + slot / 4, slot % 4, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_texture_matrix(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let (unit, entry) = (call.slot / 16, call.slot % 16);
    let row = XFCTX_T0MAT + unit * 8 + entry / 4;
    pg.transform.constants.set(row, entry % 4, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_texgen_plane(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let (unit, entry) = (call.slot / 16, call.slot % 16);
    let row = XFCTX_TG0MAT + unit * 8 + entry / 4;
    pg.transform.constants.set(row, entry % 4, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_fog_params(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let slot = call.slot;
    if slot < 2 {
        pg.regs.set(FOGPARAM0 + slot as u32 * 4, call.parameter);
    }
    pg.transform.ltctxa.set(LTCTXA_FOG_K, slot, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_texgen_view_model(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_mask(CSV0_D, CSV0_D_TEXGEN_REF, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_fog_plane(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.transform
        .constants
        .set(XFCTX_FOG, call.slot, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_scene_ambient_color(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.transform
        .ltctxa
        .set(LTCTXA_FR_AMB, call.slot, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_viewport_offset(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.transform
        .constants
        .set(XFCTX_VPOFF, call.slot, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_eye_position(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.transform
        .constants
        .set(XFCTX_EYEP, call.slot, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_eye_direction(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.transform
        .ltctxa
        .set(LTCTXA_EYED, call.slot, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_viewport_scale(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.transform
        .constants
        .set(XFCTX_VPSCL, call.slot, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_transform_program(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let load = pg
        .regs
        .get_mask(CHEOPS_OFFSET, CHEOPS_OFFSET_PROG_LD_PTR) as usize;
    assert!(
        load < MAX_TRANSFORM_PROGRAM_LENGTH,
        "transform program load pointer {} out of range",
        load
    );
    pg.transform.program[load][call.slot % 4] = call.parameter;
    if call.slot % 4 == 3 {
        pg.regs
            .set_mask(CHEOPS_OFFSET, CHEOPS_OFFSET_PROG_LD_PTR, load as u32 + 1);
    }
    MethodAction::Continue
}

pub(super) fn set_transform_constant(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let load = pg
        .regs
        .get_mask(CHEOPS_OFFSET, CHEOPS_OFFSET_CONST_LD_PTR) as usize;
    assert!(
        load < TRANSFORM_CONSTANTS,
        "transform constant load pointer {} out of range",
        load
    );
    pg.transform
        .constants
        .set(load, call.slot % 4, call.parameter);
    if call.slot % 4 == 3 {
        pg.regs
            .set_mask(CHEOPS_OFFSET, CHEOPS_OFFSET_CONST_LD_PTR, load as u32 + 1);
    }
    MethodAction::Continue
}

pub(super) fn set_transform_execution_mode(
    pg: &mut PgraphState,
    call: &MethodCall,
) -> MethodAction {
    let p = call.parameter;
    pg.regs.set_mask(
        CSV0_D,
        CSV0_D_MODE,
        get_mask(p, SET_TRANSFORM_EXECUTION_MODE_MODE),
    );
    pg.regs.set_mask(
        CSV0_D,
        CSV0_D_RANGE_MODE,
        get_mask(p, SET_TRANSFORM_EXECUTION_MODE_RANGE_MODE),
    );
    MethodAction::Continue
}

pub(super) fn set_transform_program_cxt_write_en(
    _pg: &mut PgraphState,
    call: &MethodCall,
) -> MethodAction {
    // only matters when programs write the constant bank, which is unsupported
    log::debug!("transform program context write enable {}", call.parameter);
    MethodAction::Continue
}

pub(super) fn set_transform_program_load(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    assert!(
        (call.parameter as usize) < MAX_TRANSFORM_PROGRAM_LENGTH,
        "transform program load {} out of range",
        call.parameter
    );
    pg.regs
        .set_mask(CHEOPS_OFFSET, CHEOPS_OFFSET_PROG_LD_PTR, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_transform_program_start(
    pg: &mut PgraphState,
    call: &MethodCall,
) -> MethodAction {
    assert!(
        (call.parameter as usize) < MAX_TRANSFORM_PROGRAM_LENGTH,
        "transform program start {} out of range",
        call.parameter
    );
    pg.regs
        .set_mask(CSV0_C, CSV0_C_PROGRAM_START, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_transform_constant_load(
    pg: &mut PgraphState,
    call: &MethodCall,
) -> MethodAction {
    assert!(
        (call.parameter as usize) < TRANSFORM_CONSTANTS,
        "transform constant load {} out of range",
        call.parameter
    );
    pg.regs
        .set_mask(CHEOPS_OFFSET, CHEOPS_OFFSET_CONST_LD_PTR, call.parameter);
    MethodAction::Continue
}

/// `slot` is the word index inside the whole back light area
pub(super) fn set_back_light(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let words = BACK_LIGHT_SIZE as usize / 4;
    let (light, word) = (call.slot / words, call.slot % words);
    let offset = word as u32 * 4;
    let (row, part) = match offset {
        BACK_LIGHT_AMBIENT_COLOR..=0x08 => (LTCTXB_L0_BAMB, word),
        BACK_LIGHT_DIFFUSE_COLOR..=0x14 => (LTCTXB_L0_BDIF, word - 3),
        BACK_LIGHT_SPECULAR_COLOR..=0x20 => (LTCTXB_L0_BSPC, word - 6),
        _ => {
            log::warn!("unknown back light {} offset 0x{:X}", light, offset);
            return MethodAction::Continue;
        }
    };
    pg.transform
        .ltctxb
        .set(row + light * 6, part, call.parameter);
    MethodAction::Continue
}

/// `slot` is the word index inside the whole light area
pub(super) fn set_light(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let words = LIGHT_SIZE as usize / 4;
    let (light, word) = (call.slot / words, call.slot % words);
    let offset = word as u32 * 4;
    let p = call.parameter;

    let part = |base: u32| (offset - base) as usize / 4;
    let transform = &mut pg.transform;
    match offset {
        LIGHT_AMBIENT_COLOR..=0x08 => {
            let part = part(LIGHT_AMBIENT_COLOR);
            transform.ltctxb.set(LTCTXB_L0_AMB + light * 6, part, p)
        }
        LIGHT_DIFFUSE_COLOR..=0x14 => {
            let part = part(LIGHT_DIFFUSE_COLOR);
            transform.ltctxb.set(LTCTXB_L0_DIF + light * 6, part, p)
        }
        LIGHT_SPECULAR_COLOR..=0x20 => {
            let part = part(LIGHT_SPECULAR_COLOR);
            transform.ltctxb.set(LTCTXB_L0_SPC + light * 6, part, p)
        }
        LIGHT_LOCAL_RANGE => transform.ltc1.set(LTC1_R0 + light, 0, p),
        LIGHT_INFINITE_HALF_VECTOR..=0x30 => set_vector(
            &mut transform.lights[light].infinite_half_vector,
            part(LIGHT_INFINITE_HALF_VECTOR),
            p,
        ),
        LIGHT_INFINITE_DIRECTION..=0x3C => set_vector(
            &mut transform.lights[light].infinite_direction,
            part(LIGHT_INFINITE_DIRECTION),
            p,
        ),
        LIGHT_SPOT_FALLOFF..=0x48 => {
            let part = part(LIGHT_SPOT_FALLOFF);
            transform.ltctxa.set(LTCTXA_L0_K + light * 2, part, p)
        }
        LIGHT_SPOT_DIRECTION..=0x58 => {
            let part = part(LIGHT_SPOT_DIRECTION);
            transform.ltctxa.set(LTCTXA_L0_SPT + light * 2, part, p)
        }
        LIGHT_LOCAL_POSITION..=0x64 => set_vector(
            &mut transform.lights[light].local_position,
            part(LIGHT_LOCAL_POSITION),
            p,
        ),
        LIGHT_LOCAL_ATTENUATION..=0x70 => set_vector(
            &mut transform.lights[light].local_attenuation,
            part(LIGHT_LOCAL_ATTENUATION),
            p,
        ),
        _ => log::warn!("unknown light {} offset 0x{:X}", light, offset),
    }
    MethodAction::Continue
}

pub(super) fn set_material_emission(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.transform
        .ltctxa
        .set(LTCTXA_CM_COL, call.slot, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_material_alpha(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.transform.material_alpha = f32::from_bits(call.parameter);
    MethodAction::Continue
}

pub(super) fn set_color_material(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let p = call.parameter;
    pg.regs.set_mask(CSV0_C, CSV0_C_EMISSION, p & 3);
    pg.regs.set_mask(CSV0_C, CSV0_C_AMBIENT, (p >> 2) & 3);
    pg.regs.set_mask(CSV0_C, CSV0_C_DIFFUSE, (p >> 4) & 3);
    pg.regs.set_mask(CSV0_C, CSV0_C_SPECULAR, (p >> 6) & 3);
    MethodAction::Continue
}

pub(super) fn set_specular_enable(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_flag(CSV0_C, CSV0_C_SPECULAR_ENABLE, call.parameter != 0);
    MethodAction::Continue
}

pub(super) fn set_lighting_enable(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_flag(CSV0_C, CSV0_C_LIGHTING, call.parameter != 0);
    MethodAction::Continue
}

pub(super) fn set_normalization_enable(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_flag(CSV0_C, CSV0_C_NORMALIZATION, call.parameter != 0);
    MethodAction::Continue
}

pub(super) fn set_light_enable_mask(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set_mask(CSV0_D, CSV0_D_LIGHTS, call.parameter);
    MethodAction::Continue
}

pub(super) fn set_skin_mode(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs.set_mask(CSV0_D, CSV0_D_SKIN, call.parameter);
    MethodAction::Continue
}

/// `slot` is `unit * 4 + channel`, channels being S, T, R and Q
pub(super) fn set_texgen(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let (unit, channel) = (call.slot / 4, call.slot % 4);
    let reg = if unit < 2 { CSV1_A } else { CSV1_B };
    let masks = if unit % 2 == 0 {
        [CSV1_T0_S, CSV1_T0_T, CSV1_T0_R, CSV1_T0_Q]
    } else {
        [CSV1_T1_S, CSV1_T1_T, CSV1_T1_R, CSV1_T1_Q]
    };
    pg.regs
        .set_mask(reg, masks[channel], map_texgen(call.parameter, channel));
    MethodAction::Continue
}

pub(super) fn set_texture_matrix_enable(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.transform.texture_matrix_enable[call.slot] = call.parameter != 0;
    MethodAction::Continue
}

pub(super) fn set_fog_mode(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let mode = match call.parameter {
        SET_FOG_MODE_V_LINEAR => CONTROL_3_FOG_MODE_LINEAR,
        SET_FOG_MODE_V_EXP => CONTROL_3_FOG_MODE_EXP,
        SET_FOG_MODE_V_EXP2 => CONTROL_3_FOG_MODE_EXP2,
        SET_FOG_MODE_V_EXP_ABS => CONTROL_3_FOG_MODE_EXP_ABS,
        SET_FOG_MODE_V_EXP2_ABS => CONTROL_3_FOG_MODE_EXP2_ABS,
        SET_FOG_MODE_V_LINEAR_ABS => CONTROL_3_FOG_MODE_LINEAR_ABS,
        mode => panic!("unknown fog mode 0x{:X}", mode),
    };
    pg.regs.set_mask(CONTROL_3, CONTROL_3_FOG_MODE, mode);
    MethodAction::Continue
}

pub(super) fn set_fog_gen_mode(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    let mode = match call.parameter {
        SET_FOG_GEN_MODE_V_SPEC_ALPHA
        | SET_FOG_GEN_MODE_V_RADIAL
        | SET_FOG_GEN_MODE_V_PLANAR
        | SET_FOG_GEN_MODE_V_ABS_PLANAR
        | SET_FOG_GEN_MODE_V_FOG_X => call.parameter,
        mode => panic!("unknown fog generation mode 0x{:X}", mode),
    };
    pg.regs.set_mask(CSV0_D, CSV0_D_FOG_GENMODE, mode);
    MethodAction::Continue
}

pub(super) fn set_fog_enable(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    pg.regs
        .set_flag(CONTROL_3, CONTROL_3_FOGENABLE, call.parameter != 0);
    MethodAction::Continue
}

pub(super) fn set_fog_color(pg: &mut PgraphState, call: &MethodCall) -> MethodAction {
    // the parameter is ABGR, the register ARGB
    let p = call.parameter;
    pg.regs
        .set_mask(FOGCOLOR, FOGCOLOR_RED, get_mask(p, SET_FOG_COLOR_RED));
    pg.regs
        .set_mask(FOGCOLOR, FOGCOLOR_GREEN, get_mask(p, SET_FOG_COLOR_GREEN));
    pg.regs
        .set_mask(FOGCOLOR, FOGCOLOR_BLUE, get_mask(p, SET_FOG_COLOR_BLUE));
    pg.regs
        .set_mask(FOGCOLOR, FOGCOLOR_ALPHA, get_mask(p, SET_FOG_COLOR_ALPHA));
    MethodAction::Continue
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_mark_rows_dirty_only_on_change() {
        let mut bank = ConstantBank::<4>::default();
        for row in 0..bank.len() {
            assert!(bank.take_dirty(row));
        }

        bank.set(2, 1, 0x3F80_0000);
        assert!(bank.take_dirty(2));
        assert!(!bank.take_dirty(2));
        assert_eq!(bank.get_f32(2), [0.0, 1.0, 0.0, 0.0]);

        bank.set(2, 1, 0x3F80_0000);
        assert!(!bank.take_dirty(2));
        assert!(!bank.take_dirty(1));
    }

    #[test]
    #[should_panic]
    fn rows_beyond_the_bank_panic() {
        let mut bank = ConstantBank::<4>::default();
        bank.set(4, 0, 1);
    }

    #[test]
    fn texgen_modes() {
        assert_eq!(map_texgen(SET_TEXGEN_V_DISABLE, 3), 0);
        assert_eq!(map_texgen(SET_TEXGEN_V_OBJECT_LINEAR, 3), 2);
        assert_eq!(map_texgen(SET_TEXGEN_V_SPHERE_MAP, 1), 3);
        assert_eq!(map_texgen(SET_TEXGEN_V_NORMAL_MAP, 2), 5);
    }

    #[test]
    #[should_panic]
    fn sphere_map_on_r_panics() {
        map_texgen(SET_TEXGEN_V_SPHERE_MAP, 2);
    }
}

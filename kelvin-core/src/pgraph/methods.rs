//! Object classes, method offsets and method parameter encodings.

pub const NV_CONTEXT_PATTERN: u32 = 0x44;
pub const NV_CONTEXT_SURFACES_2D: u32 = 0x62;
pub const NV_IMAGE_BLIT: u32 = 0x9F;
pub const NV_KELVIN_PRIMITIVE: u32 = 0x97;

pub const SET_OBJECT: u32 = 0x0000;

// Context pattern
pub const NV044_SET_MONOCHROME_COLOR0: u32 = 0x0310;

// Context surfaces 2D
pub const NV062_SET_CONTEXT_DMA_IMAGE_SOURCE: u32 = 0x0184;
pub const NV062_SET_CONTEXT_DMA_IMAGE_DESTIN: u32 = 0x0188;
pub const NV062_SET_COLOR_FORMAT: u32 = 0x0300;
pub const NV062_SET_COLOR_FORMAT_LE_Y8: u32 = 0x01;
pub const NV062_SET_COLOR_FORMAT_LE_R5G6B5: u32 = 0x04;
pub const NV062_SET_COLOR_FORMAT_LE_A8R8G8B8: u32 = 0x0A;
pub const NV062_SET_PITCH: u32 = 0x0304;
pub const NV062_SET_OFFSET_SOURCE: u32 = 0x0308;
pub const NV062_SET_OFFSET_DESTIN: u32 = 0x030C;

// Image blit
pub const NV09F_SET_CONTEXT_SURFACES: u32 = 0x019C;
pub const NV09F_SET_OPERATION: u32 = 0x02FC;
pub const NV09F_SET_OPERATION_SRCCOPY: u32 = 3;
pub const NV09F_CONTROL_POINT_IN: u32 = 0x0300;
pub const NV09F_CONTROL_POINT_OUT: u32 = 0x0304;
pub const NV09F_SIZE: u32 = 0x0308;

// Kelvin primitive
pub const NV097_NO_OPERATION: u32 = 0x0100;
pub const NV097_WAIT_FOR_IDLE: u32 = 0x0110;
pub const NV097_SET_FLIP_READ: u32 = 0x0120;
pub const NV097_SET_FLIP_WRITE: u32 = 0x0124;
pub const NV097_SET_FLIP_MODULO: u32 = 0x0128;
pub const NV097_FLIP_INCREMENT_WRITE: u32 = 0x012C;
pub const NV097_FLIP_STALL: u32 = 0x0130;
pub const NV097_SET_CONTEXT_DMA_NOTIFIES: u32 = 0x0180;
pub const NV097_SET_CONTEXT_DMA_A: u32 = 0x0184;
pub const NV097_SET_CONTEXT_DMA_B: u32 = 0x0188;
pub const NV097_SET_CONTEXT_DMA_STATE: u32 = 0x0190;
pub const NV097_SET_CONTEXT_DMA_COLOR: u32 = 0x0194;
pub const NV097_SET_CONTEXT_DMA_ZETA: u32 = 0x0198;
pub const NV097_SET_CONTEXT_DMA_VERTEX_A: u32 = 0x019C;
pub const NV097_SET_CONTEXT_DMA_VERTEX_B: u32 = 0x01A0;
pub const NV097_SET_CONTEXT_DMA_SEMAPHORE: u32 = 0x01A4;
pub const NV097_SET_CONTEXT_DMA_REPORT: u32 = 0x01A8;
pub const NV097_SET_SURFACE_CLIP_HORIZONTAL: u32 = 0x0200;
pub const NV097_SET_SURFACE_CLIP_VERTICAL: u32 = 0x0204;
pub const NV097_SET_SURFACE_FORMAT: u32 = 0x0208;
pub const NV097_SET_SURFACE_PITCH: u32 = 0x020C;
pub const NV097_SET_SURFACE_COLOR_OFFSET: u32 = 0x0210;
pub const NV097_SET_SURFACE_ZETA_OFFSET: u32 = 0x0214;
pub const NV097_SET_COMBINER_ALPHA_ICW: u32 = 0x0260;
pub const NV097_SET_COMBINER_SPECULAR_FOG_CW0: u32 = 0x0288;
pub const NV097_SET_COMBINER_SPECULAR_FOG_CW1: u32 = 0x028C;
pub const NV097_SET_CONTROL0: u32 = 0x0290;
pub const NV097_SET_COLOR_MATERIAL: u32 = 0x0298;
pub const NV097_SET_FOG_MODE: u32 = 0x029C;
pub const NV097_SET_FOG_GEN_MODE: u32 = 0x02A0;
pub const NV097_SET_FOG_ENABLE: u32 = 0x02A4;
pub const NV097_SET_FOG_COLOR: u32 = 0x02A8;
pub const NV097_SET_WINDOW_CLIP_TYPE: u32 = 0x02B4;
pub const NV097_SET_WINDOW_CLIP_HORIZONTAL: u32 = 0x02C0;
pub const NV097_SET_WINDOW_CLIP_VERTICAL: u32 = 0x02E0;
pub const NV097_SET_ALPHA_TEST_ENABLE: u32 = 0x0300;
pub const NV097_SET_BLEND_ENABLE: u32 = 0x0304;
pub const NV097_SET_CULL_FACE_ENABLE: u32 = 0x0308;
pub const NV097_SET_DEPTH_TEST_ENABLE: u32 = 0x030C;
pub const NV097_SET_DITHER_ENABLE: u32 = 0x0310;
pub const NV097_SET_LIGHTING_ENABLE: u32 = 0x0314;
pub const NV097_SET_SKIN_MODE: u32 = 0x0328;
pub const NV097_SET_STENCIL_TEST_ENABLE: u32 = 0x032C;
pub const NV097_SET_POLY_OFFSET_POINT_ENABLE: u32 = 0x0330;
pub const NV097_SET_POLY_OFFSET_LINE_ENABLE: u32 = 0x0334;
pub const NV097_SET_POLY_OFFSET_FILL_ENABLE: u32 = 0x0338;
pub const NV097_SET_ALPHA_FUNC: u32 = 0x033C;
pub const NV097_SET_ALPHA_REF: u32 = 0x0340;
pub const NV097_SET_BLEND_FUNC_SFACTOR: u32 = 0x0344;
pub const NV097_SET_BLEND_FUNC_DFACTOR: u32 = 0x0348;
pub const NV097_SET_BLEND_COLOR: u32 = 0x034C;
pub const NV097_SET_BLEND_EQUATION: u32 = 0x0350;
pub const NV097_SET_DEPTH_FUNC: u32 = 0x0354;
pub const NV097_SET_COLOR_MASK: u32 = 0x0358;
pub const NV097_SET_DEPTH_MASK: u32 = 0x035C;
pub const NV097_SET_STENCIL_MASK: u32 = 0x0360;
pub const NV097_SET_STENCIL_FUNC: u32 = 0x0364;
pub const NV097_SET_STENCIL_FUNC_REF: u32 = 0x0368;
pub const NV097_SET_STENCIL_FUNC_MASK: u32 = 0x036C;
pub const NV097_SET_STENCIL_OP_FAIL: u32 = 0x0370;
pub const NV097_SET_STENCIL_OP_ZFAIL: u32 = 0x0374;
pub const NV097_SET_STENCIL_OP_ZPASS: u32 = 0x0378;
pub const NV097_SET_SHADE_MODE: u32 = 0x037C;
pub const NV097_SET_POLYGON_OFFSET_SCALE_FACTOR: u32 = 0x0384;
pub const NV097_SET_POLYGON_OFFSET_BIAS: u32 = 0x0388;
pub const NV097_SET_FRONT_POLYGON_MODE: u32 = 0x038C;
pub const NV097_SET_BACK_POLYGON_MODE: u32 = 0x0390;
pub const NV097_SET_CLIP_MIN: u32 = 0x0394;
pub const NV097_SET_CLIP_MAX: u32 = 0x0398;
pub const NV097_SET_CULL_FACE: u32 = 0x039C;
pub const NV097_SET_FRONT_FACE: u32 = 0x03A0;
pub const NV097_SET_NORMALIZATION_ENABLE: u32 = 0x03A4;
pub const NV097_SET_MATERIAL_EMISSION: u32 = 0x03A8;
pub const NV097_SET_MATERIAL_ALPHA: u32 = 0x03B4;
pub const NV097_SET_SPECULAR_ENABLE: u32 = 0x03B8;
pub const NV097_SET_LIGHT_ENABLE_MASK: u32 = 0x03BC;
pub const NV097_SET_TEXGEN_S: u32 = 0x03C0;
pub const NV097_SET_TEXTURE_MATRIX_ENABLE: u32 = 0x0420;
pub const NV097_SET_PROJECTION_MATRIX: u32 = 0x0440;
pub const NV097_SET_MODEL_VIEW_MATRIX: u32 = 0x0480;
pub const NV097_SET_INVERSE_MODEL_VIEW_MATRIX: u32 = 0x0580;
pub const NV097_SET_COMPOSITE_MATRIX: u32 = 0x0680;
pub const NV097_SET_TEXTURE_MATRIX: u32 = 0x06C0;
pub const NV097_SET_TEXGEN_PLANE_S: u32 = 0x0840;
pub const NV097_SET_FOG_PARAMS: u32 = 0x09C0;
pub const NV097_SET_TEXGEN_VIEW_MODEL: u32 = 0x09CC;
pub const NV097_SET_FOG_PLANE: u32 = 0x09D0;
pub const NV097_SET_SCENE_AMBIENT_COLOR: u32 = 0x0A10;
pub const NV097_SET_VIEWPORT_OFFSET: u32 = 0x0A20;
pub const NV097_SET_EYE_POSITION: u32 = 0x0A50;
pub const NV097_SET_COMBINER_FACTOR0: u32 = 0x0A60;
pub const NV097_SET_COMBINER_FACTOR1: u32 = 0x0A80;
pub const NV097_SET_COMBINER_ALPHA_OCW: u32 = 0x0AA0;
pub const NV097_SET_COMBINER_COLOR_ICW: u32 = 0x0AC0;
pub const NV097_SET_VIEWPORT_SCALE: u32 = 0x0AF0;
pub const NV097_SET_TRANSFORM_PROGRAM: u32 = 0x0B00;
pub const NV097_SET_TRANSFORM_CONSTANT: u32 = 0x0B80;
pub const NV097_SET_BACK_LIGHT: u32 = 0x0C00;
pub const NV097_SET_LIGHT: u32 = 0x1000;
pub const NV097_SET_VERTEX3F: u32 = 0x1500;
pub const NV097_SET_VERTEX4F: u32 = 0x1518;
pub const NV097_SET_VERTEX_DATA_ARRAY_OFFSET: u32 = 0x1720;
pub const NV097_SET_VERTEX_DATA_ARRAY_FORMAT: u32 = 0x1760;
pub const NV097_SET_LOGIC_OP_ENABLE: u32 = 0x17BC;
pub const NV097_SET_LOGIC_OP: u32 = 0x17C0;
pub const NV097_CLEAR_REPORT_VALUE: u32 = 0x17C8;
pub const NV097_SET_ZPASS_PIXEL_COUNT_ENABLE: u32 = 0x17CC;
pub const NV097_GET_REPORT: u32 = 0x17D0;
pub const NV097_SET_EYE_DIRECTION: u32 = 0x17E0;
pub const NV097_SET_SHADER_CLIP_PLANE_MODE: u32 = 0x17F8;
pub const NV097_SET_BEGIN_END: u32 = 0x17FC;
pub const NV097_ARRAY_ELEMENT16: u32 = 0x1800;
pub const NV097_ARRAY_ELEMENT32: u32 = 0x1808;
pub const NV097_DRAW_ARRAYS: u32 = 0x1810;
pub const NV097_INLINE_ARRAY: u32 = 0x1818;
pub const NV097_SET_EYE_VECTOR: u32 = 0x181C;
pub const NV097_SET_VERTEX_DATA2F_M: u32 = 0x1880;
pub const NV097_SET_VERTEX_DATA2S: u32 = 0x1900;
pub const NV097_SET_VERTEX_DATA4UB: u32 = 0x1940;
pub const NV097_SET_VERTEX_DATA4S_M: u32 = 0x1980;
pub const NV097_SET_VERTEX_DATA4F_M: u32 = 0x1A00;
pub const NV097_SET_TEXTURE: u32 = 0x1B00;
pub const NV097_SET_SEMAPHORE_OFFSET: u32 = 0x1D6C;
pub const NV097_BACK_END_WRITE_SEMAPHORE_RELEASE: u32 = 0x1D70;
pub const NV097_SET_ZSTENCIL_CLEAR_VALUE: u32 = 0x1D8C;
pub const NV097_SET_COLOR_CLEAR_VALUE: u32 = 0x1D90;
pub const NV097_CLEAR_SURFACE: u32 = 0x1D94;
pub const NV097_SET_CLEAR_RECT_HORIZONTAL: u32 = 0x1D98;
pub const NV097_SET_CLEAR_RECT_VERTICAL: u32 = 0x1D9C;
pub const NV097_SET_SPECULAR_FOG_FACTOR: u32 = 0x1E20;
pub const NV097_SET_COMBINER_COLOR_OCW: u32 = 0x1E40;
pub const NV097_SET_COMBINER_CONTROL: u32 = 0x1E60;
pub const NV097_SET_SHADOW_ZSLOPE_THRESHOLD: u32 = 0x1E68;
pub const NV097_SET_SHADER_STAGE_PROGRAM: u32 = 0x1E70;
pub const NV097_SET_SHADER_OTHER_STAGE_INPUT: u32 = 0x1E78;
pub const NV097_SET_TRANSFORM_EXECUTION_MODE: u32 = 0x1E94;
pub const NV097_SET_TRANSFORM_PROGRAM_CXT_WRITE_EN: u32 = 0x1E98;
pub const NV097_SET_TRANSFORM_PROGRAM_LOAD: u32 = 0x1E9C;
pub const NV097_SET_TRANSFORM_PROGRAM_START: u32 = 0x1EA0;
pub const NV097_SET_TRANSFORM_CONSTANT_LOAD: u32 = 0x1EA4;

// byte offsets inside one of the eight 64 byte back light blocks
pub const BACK_LIGHT_AMBIENT_COLOR: u32 = 0x00;
pub const BACK_LIGHT_DIFFUSE_COLOR: u32 = 0x0C;
pub const BACK_LIGHT_SPECULAR_COLOR: u32 = 0x18;
pub const BACK_LIGHT_SIZE: u32 = 0x40;

// byte offsets inside one of the eight 128 byte light blocks
pub const LIGHT_AMBIENT_COLOR: u32 = 0x00;
pub const LIGHT_DIFFUSE_COLOR: u32 = 0x0C;
pub const LIGHT_SPECULAR_COLOR: u32 = 0x18;
pub const LIGHT_LOCAL_RANGE: u32 = 0x24;
pub const LIGHT_INFINITE_HALF_VECTOR: u32 = 0x28;
pub const LIGHT_INFINITE_DIRECTION: u32 = 0x34;
pub const LIGHT_SPOT_FALLOFF: u32 = 0x40;
pub const LIGHT_SPOT_DIRECTION: u32 = 0x4C;
pub const LIGHT_LOCAL_POSITION: u32 = 0x5C;
pub const LIGHT_LOCAL_ATTENUATION: u32 = 0x68;
pub const LIGHT_SIZE: u32 = 0x80;

// word offsets inside one of the four 64 byte texture unit blocks
pub const TEXTURE_OFFSET: u32 = 0;
pub const TEXTURE_FORMAT: u32 = 1;
pub const TEXTURE_ADDRESS: u32 = 2;
pub const TEXTURE_CONTROL0: u32 = 3;
pub const TEXTURE_CONTROL1: u32 = 4;
pub const TEXTURE_FILTER: u32 = 5;
pub const TEXTURE_IMAGE_RECT: u32 = 7;
pub const TEXTURE_PALETTE: u32 = 8;
pub const TEXTURE_BORDER_COLOR: u32 = 9;
pub const TEXTURE_SET_BUMP_ENV_MAT: u32 = 10;
pub const TEXTURE_SET_BUMP_ENV_SCALE: u32 = 14;
pub const TEXTURE_SET_BUMP_ENV_OFFSET: u32 = 15;

pub const SET_TEXTURE_FORMAT_CONTEXT_DMA: u32 = 0x0000_0003;
pub const SET_TEXTURE_FORMAT_CUBEMAP_ENABLE: u32 = 1 << 2;
pub const SET_TEXTURE_FORMAT_BORDER_SOURCE: u32 = 1 << 3;
pub const SET_TEXTURE_FORMAT_DIMENSIONALITY: u32 = 0x0000_00F0;
pub const SET_TEXTURE_FORMAT_COLOR: u32 = 0x0000_FF00;
pub const SET_TEXTURE_FORMAT_MIPMAP_LEVELS: u32 = 0x000F_0000;
pub const SET_TEXTURE_FORMAT_BASE_SIZE_U: u32 = 0x00F0_0000;
pub const SET_TEXTURE_FORMAT_BASE_SIZE_V: u32 = 0x0F00_0000;
pub const SET_TEXTURE_FORMAT_BASE_SIZE_P: u32 = 0xF000_0000;
pub const SET_TEXTURE_PALETTE_CONTEXT_DMA: u32 = 0x0000_0003;
pub const SET_TEXTURE_PALETTE_LENGTH: u32 = 0x0000_000C;
pub const SET_TEXTURE_PALETTE_OFFSET: u32 = 0xFFFF_FFC0;

pub const SET_TEXTURE_FORMAT_COLOR_SZ_Y8: u32 = 0x00;
pub const SET_TEXTURE_FORMAT_COLOR_SZ_AY8: u32 = 0x01;
pub const SET_TEXTURE_FORMAT_COLOR_SZ_A1R5G5B5: u32 = 0x02;
pub const SET_TEXTURE_FORMAT_COLOR_SZ_X1R5G5B5: u32 = 0x03;
pub const SET_TEXTURE_FORMAT_COLOR_SZ_A4R4G4B4: u32 = 0x04;
pub const SET_TEXTURE_FORMAT_COLOR_SZ_R5G6B5: u32 = 0x05;
pub const SET_TEXTURE_FORMAT_COLOR_SZ_A8R8G8B8: u32 = 0x06;
pub const SET_TEXTURE_FORMAT_COLOR_SZ_X8R8G8B8: u32 = 0x07;
pub const SET_TEXTURE_FORMAT_COLOR_SZ_I8_A8R8G8B8: u32 = 0x0B;
pub const SET_TEXTURE_FORMAT_COLOR_L_DXT1_A1R5G5B5: u32 = 0x0C;
pub const SET_TEXTURE_FORMAT_COLOR_L_DXT23_A8R8G8B8: u32 = 0x0E;
pub const SET_TEXTURE_FORMAT_COLOR_L_DXT45_A8R8G8B8: u32 = 0x0F;
pub const SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_A1R5G5B5: u32 = 0x10;
pub const SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_R5G6B5: u32 = 0x11;
pub const SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_A8R8G8B8: u32 = 0x12;
pub const SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_Y8: u32 = 0x13;
pub const SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_G8B8: u32 = 0x17;
pub const SET_TEXTURE_FORMAT_COLOR_SZ_A8: u32 = 0x19;
pub const SET_TEXTURE_FORMAT_COLOR_SZ_A8Y8: u32 = 0x1A;
pub const SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_AY8: u32 = 0x1B;
pub const SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_X1R5G5B5: u32 = 0x1C;
pub const SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_A4R4G4B4: u32 = 0x1D;
pub const SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_X8R8G8B8: u32 = 0x1E;
pub const SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_A8: u32 = 0x1F;
pub const SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_A8Y8: u32 = 0x20;
pub const SET_TEXTURE_FORMAT_COLOR_LC_IMAGE_CR8YB8CB8YA8: u32 = 0x24;
pub const SET_TEXTURE_FORMAT_COLOR_LC_IMAGE_YB8CR8YA8CB8: u32 = 0x25;
pub const SET_TEXTURE_FORMAT_COLOR_SZ_R6G5B5: u32 = 0x27;
pub const SET_TEXTURE_FORMAT_COLOR_SZ_G8B8: u32 = 0x28;
pub const SET_TEXTURE_FORMAT_COLOR_SZ_R8B8: u32 = 0x29;
pub const SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_DEPTH_X8_Y24_FIXED: u32 = 0x2E;
pub const SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_DEPTH_Y16_FIXED: u32 = 0x30;
pub const SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_Y16: u32 = 0x35;
pub const SET_TEXTURE_FORMAT_COLOR_SZ_A8B8G8R8: u32 = 0x3A;
pub const SET_TEXTURE_FORMAT_COLOR_SZ_B8G8R8A8: u32 = 0x3B;
pub const SET_TEXTURE_FORMAT_COLOR_SZ_R8G8B8A8: u32 = 0x3C;
pub const SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_A8B8G8R8: u32 = 0x3F;
pub const SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_B8G8R8A8: u32 = 0x40;
pub const SET_TEXTURE_FORMAT_COLOR_LU_IMAGE_R8G8B8A8: u32 = 0x41;

pub const SET_SURFACE_FORMAT_COLOR: u32 = 0x0000_000F;
pub const SET_SURFACE_FORMAT_ZETA: u32 = 0x0000_00F0;
pub const SET_SURFACE_FORMAT_TYPE: u32 = 0x0000_0F00;
pub const SET_SURFACE_FORMAT_TYPE_PITCH: u32 = 1;
pub const SET_SURFACE_FORMAT_TYPE_SWIZZLE: u32 = 2;
pub const SET_SURFACE_FORMAT_ANTI_ALIASING: u32 = 0x0000_F000;
pub const SET_SURFACE_FORMAT_ANTI_ALIASING_CENTER_1: u32 = 0;
pub const SET_SURFACE_FORMAT_ANTI_ALIASING_CENTER_CORNER_2: u32 = 1;
pub const SET_SURFACE_FORMAT_ANTI_ALIASING_SQUARE_OFFSET_4: u32 = 2;
pub const SET_SURFACE_FORMAT_WIDTH: u32 = 0x00FF_0000;
pub const SET_SURFACE_FORMAT_HEIGHT: u32 = 0xFF00_0000;

pub const SET_SURFACE_FORMAT_COLOR_LE_X1R5G5B5_Z1R5G5B5: u32 = 0x01;
pub const SET_SURFACE_FORMAT_COLOR_LE_X1R5G5B5_O1R5G5B5: u32 = 0x02;
pub const SET_SURFACE_FORMAT_COLOR_LE_R5G6B5: u32 = 0x03;
pub const SET_SURFACE_FORMAT_COLOR_LE_X8R8G8B8_Z8R8G8B8: u32 = 0x04;
pub const SET_SURFACE_FORMAT_COLOR_LE_X8R8G8B8_O8R8G8B8: u32 = 0x05;
pub const SET_SURFACE_FORMAT_COLOR_LE_X1A7R8G8B8_Z1A7R8G8B8: u32 = 0x06;
pub const SET_SURFACE_FORMAT_COLOR_LE_X1A7R8G8B8_O1A7R8G8B8: u32 = 0x07;
pub const SET_SURFACE_FORMAT_COLOR_LE_A8R8G8B8: u32 = 0x08;
pub const SET_SURFACE_FORMAT_COLOR_LE_B8: u32 = 0x09;
pub const SET_SURFACE_FORMAT_COLOR_LE_G8B8: u32 = 0x0A;
pub const SET_SURFACE_FORMAT_ZETA_Z16: u32 = 1;
pub const SET_SURFACE_FORMAT_ZETA_Z24S8: u32 = 2;

pub const SET_SURFACE_CLIP_X: u32 = 0x0000_FFFF;
pub const SET_SURFACE_CLIP_WIDTH: u32 = 0xFFFF_0000;
pub const SET_SURFACE_PITCH_COLOR: u32 = 0x0000_FFFF;
pub const SET_SURFACE_PITCH_ZETA: u32 = 0xFFFF_0000;

pub const SET_CONTROL0_STENCIL_WRITE_ENABLE: u32 = 1 << 0;
pub const SET_CONTROL0_Z_FORMAT: u32 = 1 << 12;
pub const SET_CONTROL0_Z_PERSPECTIVE_ENABLE: u32 = 1 << 20;

pub const SET_COLOR_MASK_BLUE_WRITE_ENABLE: u32 = 1 << 0;
pub const SET_COLOR_MASK_GREEN_WRITE_ENABLE: u32 = 1 << 8;
pub const SET_COLOR_MASK_RED_WRITE_ENABLE: u32 = 1 << 16;
pub const SET_COLOR_MASK_ALPHA_WRITE_ENABLE: u32 = 1 << 24;

pub const SET_FOG_MODE_V_LINEAR: u32 = 0x2601;
pub const SET_FOG_MODE_V_EXP: u32 = 0x800;
pub const SET_FOG_MODE_V_EXP2: u32 = 0x801;
pub const SET_FOG_MODE_V_EXP_ABS: u32 = 0x802;
pub const SET_FOG_MODE_V_EXP2_ABS: u32 = 0x803;
pub const SET_FOG_MODE_V_LINEAR_ABS: u32 = 0x804;

pub const SET_FOG_COLOR_RED: u32 = 0x0000_00FF;
pub const SET_FOG_COLOR_GREEN: u32 = 0x0000_FF00;
pub const SET_FOG_COLOR_BLUE: u32 = 0x00FF_0000;
pub const SET_FOG_COLOR_ALPHA: u32 = 0xFF00_0000;

pub const SET_FOG_GEN_MODE_V_SPEC_ALPHA: u32 = 0;
pub const SET_FOG_GEN_MODE_V_RADIAL: u32 = 1;
pub const SET_FOG_GEN_MODE_V_PLANAR: u32 = 2;
pub const SET_FOG_GEN_MODE_V_ABS_PLANAR: u32 = 3;
pub const SET_FOG_GEN_MODE_V_FOG_X: u32 = 6;

pub const SET_BLEND_FACTOR_V_ZERO: u32 = 0x0000;
pub const SET_BLEND_FACTOR_V_ONE: u32 = 0x0001;
pub const SET_BLEND_FACTOR_V_SRC_COLOR: u32 = 0x0300;
pub const SET_BLEND_FACTOR_V_ONE_MINUS_SRC_COLOR: u32 = 0x0301;
pub const SET_BLEND_FACTOR_V_SRC_ALPHA: u32 = 0x0302;
pub const SET_BLEND_FACTOR_V_ONE_MINUS_SRC_ALPHA: u32 = 0x0303;
pub const SET_BLEND_FACTOR_V_DST_ALPHA: u32 = 0x0304;
pub const SET_BLEND_FACTOR_V_ONE_MINUS_DST_ALPHA: u32 = 0x0305;
pub const SET_BLEND_FACTOR_V_DST_COLOR: u32 = 0x0306;
pub const SET_BLEND_FACTOR_V_ONE_MINUS_DST_COLOR: u32 = 0x0307;
pub const SET_BLEND_FACTOR_V_SRC_ALPHA_SATURATE: u32 = 0x0308;
pub const SET_BLEND_FACTOR_V_CONSTANT_COLOR: u32 = 0x8001;
pub const SET_BLEND_FACTOR_V_ONE_MINUS_CONSTANT_COLOR: u32 = 0x8002;
pub const SET_BLEND_FACTOR_V_CONSTANT_ALPHA: u32 = 0x8003;
pub const SET_BLEND_FACTOR_V_ONE_MINUS_CONSTANT_ALPHA: u32 = 0x8004;

pub const SET_BLEND_EQUATION_V_FUNC_SUBTRACT: u32 = 0x800A;
pub const SET_BLEND_EQUATION_V_FUNC_REVERSE_SUBTRACT: u32 = 0x800B;
pub const SET_BLEND_EQUATION_V_FUNC_ADD: u32 = 0x8006;
pub const SET_BLEND_EQUATION_V_MIN: u32 = 0x8007;
pub const SET_BLEND_EQUATION_V_MAX: u32 = 0x8008;
pub const SET_BLEND_EQUATION_V_FUNC_REVERSE_SUBTRACT_SIGNED: u32 = 0xF005;
pub const SET_BLEND_EQUATION_V_FUNC_ADD_SIGNED: u32 = 0xF006;

pub const SET_STENCIL_OP_V_ZERO: u32 = 0x0000;
pub const SET_STENCIL_OP_V_KEEP: u32 = 0x1E00;
pub const SET_STENCIL_OP_V_REPLACE: u32 = 0x1E01;
pub const SET_STENCIL_OP_V_INCRSAT: u32 = 0x1E02;
pub const SET_STENCIL_OP_V_DECRSAT: u32 = 0x1E03;
pub const SET_STENCIL_OP_V_INVERT: u32 = 0x150A;
pub const SET_STENCIL_OP_V_INCR: u32 = 0x8507;
pub const SET_STENCIL_OP_V_DECR: u32 = 0x8508;

pub const SET_POLYGON_MODE_V_POINT: u32 = 0x1B00;
pub const SET_POLYGON_MODE_V_LINE: u32 = 0x1B01;
pub const SET_POLYGON_MODE_V_FILL: u32 = 0x1B02;

pub const SET_SHADE_MODE_V_FLAT: u32 = 0x1D00;
pub const SET_SHADE_MODE_V_SMOOTH: u32 = 0x1D01;

pub const SET_CULL_FACE_V_FRONT: u32 = 0x0404;
pub const SET_CULL_FACE_V_BACK: u32 = 0x0405;
pub const SET_CULL_FACE_V_FRONT_AND_BACK: u32 = 0x0408;

pub const SET_FRONT_FACE_V_CW: u32 = 0x0900;
pub const SET_FRONT_FACE_V_CCW: u32 = 0x0901;

pub const SET_TEXGEN_V_DISABLE: u32 = 0x0000;
pub const SET_TEXGEN_V_EYE_LINEAR: u32 = 0x2400;
pub const SET_TEXGEN_V_OBJECT_LINEAR: u32 = 0x2401;
pub const SET_TEXGEN_V_SPHERE_MAP: u32 = 0x2402;
pub const SET_TEXGEN_V_NORMAL_MAP: u32 = 0x8511;
pub const SET_TEXGEN_V_REFLECTION_MAP: u32 = 0x8512;

pub const SET_BEGIN_END_OP_END: u32 = 0x00;
pub const SET_BEGIN_END_OP_POINTS: u32 = 0x01;
pub const SET_BEGIN_END_OP_LINES: u32 = 0x02;
pub const SET_BEGIN_END_OP_LINE_LOOP: u32 = 0x03;
pub const SET_BEGIN_END_OP_LINE_STRIP: u32 = 0x04;
pub const SET_BEGIN_END_OP_TRIANGLES: u32 = 0x05;
pub const SET_BEGIN_END_OP_TRIANGLE_STRIP: u32 = 0x06;
pub const SET_BEGIN_END_OP_TRIANGLE_FAN: u32 = 0x07;
pub const SET_BEGIN_END_OP_QUADS: u32 = 0x08;
pub const SET_BEGIN_END_OP_QUAD_STRIP: u32 = 0x09;
pub const SET_BEGIN_END_OP_POLYGON: u32 = 0x0A;

pub const SET_TRANSFORM_EXECUTION_MODE_MODE: u32 = 0x0000_0003;
pub const SET_TRANSFORM_EXECUTION_MODE_RANGE_MODE: u32 = 0xFFFF_FFFC;

pub const GET_REPORT_TYPE: u32 = 0xFF00_0000;
pub const GET_REPORT_TYPE_ZPASS_PIXEL_CNT: u32 = 1;
pub const GET_REPORT_OFFSET: u32 = 0x00FF_FFFF;

pub const CLEAR_SURFACE_Z: u32 = 1 << 0;
pub const CLEAR_SURFACE_STENCIL: u32 = 1 << 1;
pub const CLEAR_SURFACE_COLOR: u32 = 0x0000_00F0;
pub const CLEAR_SURFACE_R: u32 = 1 << 4;
pub const CLEAR_SURFACE_G: u32 = 1 << 5;
pub const CLEAR_SURFACE_B: u32 = 1 << 6;
pub const CLEAR_SURFACE_A: u32 = 1 << 7;

pub const DRAW_ARRAYS_START_INDEX: u32 = 0x00FF_FFFF;
pub const DRAW_ARRAYS_COUNT: u32 = 0xFF00_0000;

pub const SET_VERTEX_DATA_ARRAY_FORMAT_TYPE: u32 = 0x0000_000F;
pub const SET_VERTEX_DATA_ARRAY_FORMAT_SIZE: u32 = 0x0000_00F0;
pub const SET_VERTEX_DATA_ARRAY_FORMAT_STRIDE: u32 = 0xFFFF_FF00;
pub const SET_VERTEX_DATA_ARRAY_FORMAT_TYPE_UB_D3D: u32 = 0;
pub const SET_VERTEX_DATA_ARRAY_FORMAT_TYPE_S1: u32 = 1;
pub const SET_VERTEX_DATA_ARRAY_FORMAT_TYPE_F: u32 = 2;
pub const SET_VERTEX_DATA_ARRAY_FORMAT_TYPE_UB_OGL: u32 = 4;
pub const SET_VERTEX_DATA_ARRAY_FORMAT_TYPE_S32K: u32 = 5;
pub const SET_VERTEX_DATA_ARRAY_FORMAT_TYPE_CMP: u32 = 6;

/// Returns the name of a method of the primitive class, used for tracing
pub fn kelvin_method_name(method: u32) -> Option<&'static str> {
    let name = match method {
        SET_OBJECT => "SET_OBJECT",
        NV097_NO_OPERATION => "NO_OPERATION",
        NV097_WAIT_FOR_IDLE => "WAIT_FOR_IDLE",
        NV097_FLIP_STALL => "FLIP_STALL",
        NV097_SET_SURFACE_FORMAT => "SET_SURFACE_FORMAT",
        NV097_SET_SURFACE_PITCH => "SET_SURFACE_PITCH",
        NV097_SET_CONTROL0 => "SET_CONTROL0",
        NV097_SET_BEGIN_END => "SET_BEGIN_END",
        NV097_ARRAY_ELEMENT16 => "ARRAY_ELEMENT16",
        NV097_ARRAY_ELEMENT32 => "ARRAY_ELEMENT32",
        NV097_DRAW_ARRAYS => "DRAW_ARRAYS",
        NV097_INLINE_ARRAY => "INLINE_ARRAY",
        NV097_CLEAR_SURFACE => "CLEAR_SURFACE",
        NV097_GET_REPORT => "GET_REPORT",
        NV097_BACK_END_WRITE_SEMAPHORE_RELEASE => "BACK_END_WRITE_SEMAPHORE_RELEASE",
        _ => return None,
    };
    Some(name)
}

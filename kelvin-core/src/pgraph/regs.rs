//! PGRAPH register file, offsets and field masks.

pub const REGISTER_FILE_SIZE: usize = 0x2000;

pub const DEBUG_3: u32 = 0x008C;
pub const DEBUG_3_HW_CONTEXT_SWITCH: u32 = 1 << 2;

pub const INTR: u32 = 0x0100;
pub const NSOURCE: u32 = 0x0108;
pub const NSOURCE_NOTIFICATION: u32 = 1 << 0;
pub const INTR_EN: u32 = 0x0140;

pub const CTX_CONTROL: u32 = 0x0144;
pub const CTX_CONTROL_CHID: u32 = 1 << 16;
pub const CTX_USER: u32 = 0x0148;
pub const CTX_USER_CHID: u32 = 0x1F00_0000;
pub const CTX_SWITCH1: u32 = 0x014C;
pub const CTX_SWITCH2: u32 = 0x0150;
pub const CTX_SWITCH3: u32 = 0x0154;
pub const CTX_SWITCH4: u32 = 0x0158;
pub const CTX_SWITCH5: u32 = 0x015C;
pub const CTX_SWITCH1_GRCLASS: u32 = 0xFF;
pub const CTX_CACHE1: u32 = 0x0160;
pub const CTX_CACHE2: u32 = 0x0180;
pub const CTX_CACHE3: u32 = 0x01A0;
pub const CTX_CACHE4: u32 = 0x01C0;
pub const CTX_CACHE5: u32 = 0x01E0;

pub const TRAPPED_ADDR: u32 = 0x0704;
pub const TRAPPED_ADDR_MTHD: u32 = 0x0000_1FFF;
pub const TRAPPED_ADDR_SUBCH: u32 = 0x0007_0000;
pub const TRAPPED_ADDR_CHID: u32 = 0x01F0_0000;
pub const TRAPPED_DATA_LOW: u32 = 0x0708;

pub const SURFACE: u32 = 0x0710;
pub const SURFACE_WRITE_3D: u32 = 0x0070_0000;
pub const SURFACE_READ_3D: u32 = 0x0700_0000;
pub const SURFACE_MODULO_3D: u32 = 0x7000_0000;

pub const INCREMENT: u32 = 0x071C;
pub const INCREMENT_READ_3D: u32 = 1 << 1;

pub const FIFO: u32 = 0x0720;
pub const FIFO_ACCESS: u32 = 1 << 0;

pub const CHANNEL_CTX_TABLE: u32 = 0x0780;
pub const CHANNEL_CTX_POINTER: u32 = 0x0784;
pub const CHANNEL_CTX_POINTER_INST: u32 = 0x0000_FFFF;
pub const CHANNEL_CTX_TRIGGER: u32 = 0x0788;
pub const CHANNEL_CTX_TRIGGER_READ_IN: u32 = 1 << 0;
pub const CHANNEL_CTX_TRIGGER_WRITE_OUT: u32 = 1 << 1;

pub const PATT_COLOR0: u32 = 0x0B10;

pub const CSV0_D: u32 = 0x0FB4;
pub const CSV0_D_LIGHTS: u32 = 0x0000_FFFF;
pub const CSV0_D_LIGHT0: u32 = 0x0000_0003;
pub const CSV0_D_RANGE_MODE: u32 = 1 << 18;
pub const CSV0_D_TEXGEN_REF: u32 = 1 << 20;
pub const CSV0_D_FOG_GENMODE: u32 = 0x00E0_0000;
pub const CSV0_D_SKIN: u32 = 0x1C00_0000;
pub const CSV0_D_MODE: u32 = 0xC000_0000;
pub const CSV0_C: u32 = 0x0FB8;
pub const CSV0_C_PROGRAM_START: u32 = 0x0000_FF00;
pub const CSV0_C_SPECULAR_ENABLE: u32 = 1 << 16;
pub const CSV0_C_SPECULAR: u32 = 0x0018_0000;
pub const CSV0_C_DIFFUSE: u32 = 0x0060_0000;
pub const CSV0_C_AMBIENT: u32 = 0x0180_0000;
pub const CSV0_C_EMISSION: u32 = 0x0600_0000;
pub const CSV0_C_NORMALIZATION: u32 = 1 << 27;
pub const CSV0_C_LIGHTING: u32 = 1 << 31;
pub const CSV1_B: u32 = 0x0FBC;
pub const CSV1_A: u32 = 0x0FC0;
pub const CSV1_T0_S: u32 = 0x0000_0007;
pub const CSV1_T0_T: u32 = 0x0000_0070;
pub const CSV1_T0_R: u32 = 0x0000_0700;
pub const CSV1_T0_Q: u32 = 0x0000_7000;
pub const CSV1_T1_S: u32 = 0x0007_0000;
pub const CSV1_T1_T: u32 = 0x0070_0000;
pub const CSV1_T1_R: u32 = 0x0700_0000;
pub const CSV1_T1_Q: u32 = 0x7000_0000;
pub const CHEOPS_OFFSET: u32 = 0x0FC4;
pub const CHEOPS_OFFSET_PROG_LD_PTR: u32 = 0x0000_00FF;
pub const CHEOPS_OFFSET_CONST_LD_PTR: u32 = 0x0000_FF00;

pub const BLEND: u32 = 0x1804;
pub const BLEND_EQN: u32 = 0x0000_0007;
pub const BLEND_EN: u32 = 1 << 3;
pub const BLEND_SFACTOR: u32 = 0x0000_00F0;
pub const BLEND_DFACTOR: u32 = 0x0000_0F00;
pub const BLEND_LOGICOP_ENABLE: u32 = 1 << 16;
pub const BLEND_LOGICOP: u32 = 0x001E_0000;
pub const BLENDCOLOR: u32 = 0x1808;
pub const BORDERCOLOR0: u32 = 0x180C;
pub const BUMPOFFSET1: u32 = 0x1848;
pub const BUMPSCALE1: u32 = 0x1854;
pub const CLEARRECTX: u32 = 0x1864;
pub const CLEARRECTX_XMIN: u32 = 0x0000_0FFF;
pub const CLEARRECTX_XMAX: u32 = 0x0FFF_0000;
pub const CLEARRECTY: u32 = 0x1868;
pub const CLEARRECTY_YMIN: u32 = 0x0000_0FFF;
pub const CLEARRECTY_YMAX: u32 = 0x0FFF_0000;
pub const COLORCLEARVALUE: u32 = 0x186C;
pub const COMBINEFACTOR0: u32 = 0x1880;
pub const COMBINEFACTOR1: u32 = 0x18A0;
pub const COMBINEALPHAI0: u32 = 0x18C0;
pub const COMBINEALPHAO0: u32 = 0x18E0;
pub const COMBINECOLORI0: u32 = 0x1900;
pub const COMBINECOLORO0: u32 = 0x1920;
pub const COMBINECTL: u32 = 0x1940;
pub const COMBINESPECFOG0: u32 = 0x1944;
pub const COMBINESPECFOG1: u32 = 0x1948;

pub const CONTROL_0: u32 = 0x194C;
pub const CONTROL_0_ALPHAREF: u32 = 0x0000_00FF;
pub const CONTROL_0_ALPHAFUNC: u32 = 0x0000_0F00;
pub const CONTROL_0_ALPHATESTENABLE: u32 = 1 << 12;
pub const CONTROL_0_ZENABLE: u32 = 1 << 14;
pub const CONTROL_0_ZFUNC: u32 = 0x000F_0000;
pub const CONTROL_0_DITHERENABLE: u32 = 1 << 22;
pub const CONTROL_0_Z_PERSPECTIVE_ENABLE: u32 = 1 << 23;
pub const CONTROL_0_ZWRITEENABLE: u32 = 1 << 24;
pub const CONTROL_0_STENCIL_WRITE_ENABLE: u32 = 1 << 25;
pub const CONTROL_0_ALPHA_WRITE_ENABLE: u32 = 1 << 26;
pub const CONTROL_0_RED_WRITE_ENABLE: u32 = 1 << 27;
pub const CONTROL_0_GREEN_WRITE_ENABLE: u32 = 1 << 28;
pub const CONTROL_0_BLUE_WRITE_ENABLE: u32 = 1 << 29;
pub const CONTROL_1: u32 = 0x1950;
pub const CONTROL_1_STENCIL_TEST_ENABLE: u32 = 1 << 0;
pub const CONTROL_1_STENCIL_FUNC: u32 = 0x0000_00F0;
pub const CONTROL_1_STENCIL_REF: u32 = 0x0000_FF00;
pub const CONTROL_1_STENCIL_MASK_READ: u32 = 0x00FF_0000;
pub const CONTROL_1_STENCIL_MASK_WRITE: u32 = 0xFF00_0000;
pub const CONTROL_2: u32 = 0x1954;
pub const CONTROL_2_STENCIL_OP_FAIL: u32 = 0x0000_000F;
pub const CONTROL_2_STENCIL_OP_ZFAIL: u32 = 0x0000_00F0;
pub const CONTROL_2_STENCIL_OP_ZPASS: u32 = 0x0000_0F00;
pub const CONTROL_3: u32 = 0x1958;
pub const CONTROL_3_SHADEMODE: u32 = 1 << 7;
pub const CONTROL_3_SHADEMODE_FLAT: u32 = 0;
pub const CONTROL_3_SHADEMODE_SMOOTH: u32 = 1;
pub const CONTROL_3_FOGENABLE: u32 = 1 << 8;
pub const CONTROL_3_FOG_MODE: u32 = 0x0007_0000;
pub const CONTROL_3_FOG_MODE_LINEAR: u32 = 0;
pub const CONTROL_3_FOG_MODE_EXP: u32 = 1;
pub const CONTROL_3_FOG_MODE_EXP2: u32 = 3;
pub const CONTROL_3_FOG_MODE_LINEAR_ABS: u32 = 4;
pub const CONTROL_3_FOG_MODE_EXP_ABS: u32 = 5;
pub const CONTROL_3_FOG_MODE_EXP2_ABS: u32 = 7;

pub const FOGCOLOR: u32 = 0x1980;
pub const FOGCOLOR_BLUE: u32 = 0x0000_00FF;
pub const FOGCOLOR_GREEN: u32 = 0x0000_FF00;
pub const FOGCOLOR_RED: u32 = 0x00FF_0000;
pub const FOGCOLOR_ALPHA: u32 = 0xFF00_0000;
pub const FOGPARAM0: u32 = 0x1984;
pub const FOGPARAM1: u32 = 0x1988;

pub const SETUPRASTER: u32 = 0x1990;
pub const SETUPRASTER_FRONTFACEMODE: u32 = 0x0000_0003;
pub const SETUPRASTER_BACKFACEMODE: u32 = 0x0000_000C;
pub const SETUPRASTER_FACEMODE_FILL: u32 = 0;
pub const SETUPRASTER_FACEMODE_POINT: u32 = 1;
pub const SETUPRASTER_FACEMODE_LINE: u32 = 2;
pub const SETUPRASTER_POFFSETPOINTENABLE: u32 = 1 << 6;
pub const SETUPRASTER_POFFSETLINEENABLE: u32 = 1 << 7;
pub const SETUPRASTER_POFFSETFILLENABLE: u32 = 1 << 8;
pub const SETUPRASTER_FRONTFACE: u32 = 1 << 20;
pub const SETUPRASTER_CULLCTRL: u32 = 0x0060_0000;
pub const SETUPRASTER_CULLCTRL_FRONT: u32 = 1;
pub const SETUPRASTER_CULLCTRL_BACK: u32 = 2;
pub const SETUPRASTER_CULLCTRL_FRONT_AND_BACK: u32 = 3;
pub const SETUPRASTER_WINDOWCLIPTYPE: u32 = 1 << 23;
pub const SETUPRASTER_CULLENABLE: u32 = 1 << 28;
pub const SETUPRASTER_Z_FORMAT: u32 = 1 << 29;

pub const SHADERCLIPMODE: u32 = 0x1994;
pub const SHADERCTL: u32 = 0x1998;
pub const SHADERPROG: u32 = 0x199C;
pub const SEMAPHOREOFFSET: u32 = 0x19A0;
pub const SHADOWZSLOPETHRESHOLD: u32 = 0x19A8;
pub const SPECFOGFACTOR0: u32 = 0x19AC;
pub const SPECFOGFACTOR1: u32 = 0x19B0;

pub const TEXADDRESS0: u32 = 0x19BC;
pub const TEXADDRESS0_ADDRU: u32 = 0x0000_0007;
pub const TEXADDRESS0_ADDRV: u32 = 0x0000_0700;
pub const TEXADDRESS0_ADDRP: u32 = 0x0007_0000;
pub const TEXCTL0_0: u32 = 0x19CC;
pub const TEXCTL0_0_ALPHAKILLEN: u32 = 1 << 2;
pub const TEXCTL0_0_MAX_LOD_CLAMP: u32 = 0x0003_FFC0;
pub const TEXCTL0_0_MIN_LOD_CLAMP: u32 = 0x3FFC_0000;
pub const TEXCTL0_0_ENABLE: u32 = 1 << 30;
pub const TEXCTL1_0: u32 = 0x19DC;
pub const TEXCTL1_0_IMAGE_PITCH: u32 = 0xFFFF_0000;
pub const TEXFILTER0: u32 = 0x19F4;
pub const TEXFILTER0_MIPMAP_LOD_BIAS: u32 = 0x0000_1FFF;
pub const TEXFILTER0_MIN: u32 = 0x003F_0000;
pub const TEXFILTER0_MAG: u32 = 0x0F00_0000;
/// A, R, G and B signed sampling, not supported
pub const TEXFILTER0_SIGNED: u32 = 0xF000_0000;
pub const TEXFMT0: u32 = 0x1A04;
pub const TEXFMT0_CONTEXT_DMA: u32 = 1 << 1;
pub const TEXFMT0_CUBEMAPENABLE: u32 = 1 << 2;
pub const TEXFMT0_BORDER_SOURCE: u32 = 1 << 3;
pub const TEXFMT0_DIMENSIONALITY: u32 = 0x0000_00F0;
pub const TEXFMT0_COLOR: u32 = 0x0000_7F00;
pub const TEXFMT0_MIPMAP_LEVELS: u32 = 0x000F_0000;
pub const TEXFMT0_BASE_SIZE_U: u32 = 0x00F0_0000;
pub const TEXFMT0_BASE_SIZE_V: u32 = 0x0F00_0000;
pub const TEXFMT0_BASE_SIZE_P: u32 = 0xF000_0000;
pub const TEXIMAGERECT0: u32 = 0x1A14;
pub const TEXIMAGERECT0_WIDTH: u32 = 0x1FFF_0000;
pub const TEXIMAGERECT0_HEIGHT: u32 = 0x0000_1FFF;
pub const TEXOFFSET0: u32 = 0x1A24;
pub const TEXPALETTE0: u32 = 0x1A34;
pub const TEXPALETTE0_CONTEXT_DMA: u32 = 1 << 0;
pub const TEXPALETTE0_LENGTH: u32 = 0x0000_000C;
pub const TEXPALETTE0_PALETTE_OFFSET: u32 = 0xFFFF_FFC0;

pub const ZSTENCILCLEARVALUE: u32 = 0x1A88;
pub const ZCLIPMIN: u32 = 0x1A90;
pub const ZCLIPMAX: u32 = 0x1A94;
pub const ZOFFSETFACTOR: u32 = 0x1A98;
pub const ZOFFSETBIAS: u32 = 0x1A9C;
pub const EYEVEC0: u32 = 0x1AA0;
pub const WINDOWCLIPX0: u32 = 0x1AC0;
pub const WINDOWCLIPY0: u32 = 0x1AE0;
pub const WINDOWCLIP_MIN: u32 = 0x0000_0FFF;
pub const WINDOWCLIP_MAX: u32 = 0x0FFF_0000;

#[inline]
pub fn get_mask(value: u32, mask: u32) -> u32 {
    (value & mask) >> mask.trailing_zeros()
}

#[inline]
pub fn set_mask(value: &mut u32, mask: u32, field: u32) {
    *value = (*value & !mask) | ((field << mask.trailing_zeros()) & mask);
}

/// Word addressed MMIO register space of the engine
pub struct RegisterFile {
    regs: Box<[u32]>,
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self {
            regs: vec![0; REGISTER_FILE_SIZE / 4].into_boxed_slice(),
        }
    }
}

impl RegisterFile {
    #[inline]
    pub fn get(&self, offset: u32) -> u32 {
        self.regs[offset as usize / 4]
    }

    #[inline]
    pub fn set(&mut self, offset: u32, value: u32) {
        self.regs[offset as usize / 4] = value;
    }

    #[inline]
    pub fn get_mask(&self, offset: u32, mask: u32) -> u32 {
        get_mask(self.get(offset), mask)
    }

    #[inline]
    pub fn set_mask(&mut self, offset: u32, mask: u32, field: u32) {
        set_mask(&mut self.regs[offset as usize / 4], mask, field);
    }

    #[inline]
    pub fn flag(&self, offset: u32, mask: u32) -> bool {
        self.get(offset) & mask != 0
    }

    #[inline]
    pub fn set_flag(&mut self, offset: u32, mask: u32, enabled: bool) {
        self.set_mask(offset, mask, enabled as u32);
    }

    #[inline]
    pub fn get_f32(&self, offset: u32) -> f32 {
        f32::from_bits(self.get(offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_fields() {
        let mut regs = RegisterFile::default();
        regs.set_mask(SURFACE, SURFACE_MODULO_3D, 3);
        regs.set_mask(SURFACE, SURFACE_READ_3D, 2);
        assert_eq!(regs.get(SURFACE), 0x3200_0000);
        assert_eq!(regs.get_mask(SURFACE, SURFACE_READ_3D), 2);

        // fields are truncated to their mask
        regs.set_mask(SURFACE, SURFACE_WRITE_3D, 0xF);
        assert_eq!(regs.get_mask(SURFACE, SURFACE_WRITE_3D), 7);
        assert_eq!(regs.get_mask(SURFACE, SURFACE_READ_3D), 2);
    }

    #[test]
    fn flags() {
        let mut regs = RegisterFile::default();
        regs.set_flag(CONTROL_0, CONTROL_0_ZENABLE, true);
        assert!(regs.flag(CONTROL_0, CONTROL_0_ZENABLE));
        regs.set_flag(CONTROL_0, CONTROL_0_ZENABLE, false);
        assert_eq!(regs.get(CONTROL_0), 0);
    }
}

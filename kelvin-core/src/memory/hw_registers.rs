use crate::pgraph::regs::*;

/// Register names accepted by the console and in trace files
pub static HW_REGISTERS: phf::Map<&'static str, u32> = phf::phf_map! {
    // Interrupts
    "INTR" => INTR,
    "INTR_EN" => INTR_EN,
    "NSOURCE" => NSOURCE,

    // Channel context
    "DEBUG_3" => DEBUG_3,
    "CTX_CONTROL" => CTX_CONTROL,
    "CTX_USER" => CTX_USER,
    "CTX_SWITCH1" => CTX_SWITCH1,
    "CTX_SWITCH2" => CTX_SWITCH2,
    "CTX_SWITCH3" => CTX_SWITCH3,
    "CTX_SWITCH4" => CTX_SWITCH4,
    "CTX_SWITCH5" => CTX_SWITCH5,
    "TRAPPED_ADDR" => TRAPPED_ADDR,
    "TRAPPED_DATA_LOW" => TRAPPED_DATA_LOW,
    "CHANNEL_CTX_TABLE" => CHANNEL_CTX_TABLE,
    "CHANNEL_CTX_POINTER" => CHANNEL_CTX_POINTER,
    "CHANNEL_CTX_TRIGGER" => CHANNEL_CTX_TRIGGER,

    // Flip and FIFO
    "SURFACE" => SURFACE,
    "INCREMENT" => INCREMENT,
    "FIFO" => FIFO,

    // Transform
    "CSV0_C" => CSV0_C,
    "CSV0_D" => CSV0_D,
    "CSV1_A" => CSV1_A,
    "CSV1_B" => CSV1_B,
    "CHEOPS_OFFSET" => CHEOPS_OFFSET,

    // Raster
    "BLEND" => BLEND,
    "BLENDCOLOR" => BLENDCOLOR,
    "CLEARRECTX" => CLEARRECTX,
    "CLEARRECTY" => CLEARRECTY,
    "COLORCLEARVALUE" => COLORCLEARVALUE,
    "ZSTENCILCLEARVALUE" => ZSTENCILCLEARVALUE,
    "COMBINECTL" => COMBINECTL,
    "CONTROL_0" => CONTROL_0,
    "CONTROL_1" => CONTROL_1,
    "CONTROL_2" => CONTROL_2,
    "CONTROL_3" => CONTROL_3,
    "FOGCOLOR" => FOGCOLOR,
    "SETUPRASTER" => SETUPRASTER,
    "SHADERCTL" => SHADERCTL,
    "SHADERPROG" => SHADERPROG,
    "SEMAPHOREOFFSET" => SEMAPHOREOFFSET,
    "ZCLIPMIN" => ZCLIPMIN,
    "ZCLIPMAX" => ZCLIPMAX,

    // 2D
    "PATT_COLOR0" => PATT_COLOR0,
};

/// Register offset of `name`, names are case insensitive
pub fn lookup(name: &str) -> Option<u32> {
    HW_REGISTERS.get(name.to_ascii_uppercase().as_str()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_resolve_to_offsets() {
        assert_eq!(lookup("intr"), Some(INTR));
        assert_eq!(lookup("CONTROL_0"), Some(CONTROL_0));
        assert_eq!(lookup("NOT_A_REGISTER"), None);
    }
}

//! Vertex program microcode to GLSL.
//!
//! Each slot is four words holding a MAC (vector) and an ILU (scalar)
//! operation that may execute in parallel. Paired operations write the MAC
//! result through a temporary so both read the same inputs.

#[derive(Clone, Copy)]
struct Field {
    subtoken: usize,
    start: u32,
    len: u32,
}

const fn field(subtoken: usize, start: u32, len: u32) -> Field {
    Field {
        subtoken,
        start,
        len,
    }
}

const ILU: Field = field(1, 25, 3);
const MAC: Field = field(1, 21, 4);
const CONST: Field = field(1, 13, 8);
const V: Field = field(1, 9, 4);

const A_NEG: Field = field(1, 8, 1);
const A_R: Field = field(2, 28, 4);
const A_MUX: Field = field(2, 26, 2);
const B_NEG: Field = field(2, 25, 1);
const B_R: Field = field(2, 13, 4);
const B_MUX: Field = field(2, 11, 2);
const C_NEG: Field = field(2, 10, 1);
const C_R_HIGH: Field = field(2, 0, 2);
const C_R_LOW: Field = field(3, 30, 2);
const C_MUX: Field = field(3, 28, 2);

const OUT_MAC_MASK: Field = field(3, 24, 4);
const OUT_R: Field = field(3, 20, 4);
const OUT_ILU_MASK: Field = field(3, 16, 4);
const OUT_O_MASK: Field = field(3, 12, 4);
const OUT_ORB: Field = field(3, 11, 1);
const OUT_ADDRESS: Field = field(3, 3, 8);
const OUT_MUX: Field = field(3, 2, 1);

const A0X: Field = field(3, 1, 1);
const FINAL: Field = field(3, 0, 1);

/// The four swizzle selectors of each input, in x y z w order
const A_SWIZZLE: [Field; 4] = [field(1, 6, 2), field(1, 4, 2), field(1, 2, 2), field(1, 0, 2)];
const B_SWIZZLE: [Field; 4] = [
    field(2, 23, 2),
    field(2, 21, 2),
    field(2, 19, 2),
    field(2, 17, 2),
];
const C_SWIZZLE: [Field; 4] = [field(2, 8, 2), field(2, 6, 2), field(2, 4, 2), field(2, 2, 2)];

const PARAM_R: u32 = 1;
const PARAM_V: u32 = 2;
const PARAM_C: u32 = 3;

const OUTPUT_C: u32 = 0;
const OUTPUT_REG_FOG: u32 = 5;

const MUX_MAC: u32 = 0;
const MUX_ILU: u32 = 1;

const MAC_NOP: u32 = 0;
const MAC_ARL: u32 = 13;
const ILU_NOP: u32 = 0;

const MAC_OPCODES: [&str; 14] = [
    "NOP", "MOV", "MUL", "ADD", "MAD", "DP3", "DPH", "DP4", "DST", "MIN", "MAX", "SLT", "SGE",
    "ARL A0.x",
];

/// Which of the A, B, C inputs each MAC opcode reads
const MAC_PARAMS: [(bool, bool, bool); 14] = [
    (false, false, false),
    (true, false, false),
    (true, true, false),
    (true, false, true),
    (true, true, true),
    (true, true, false),
    (true, true, false),
    (true, true, false),
    (true, true, false),
    (true, true, false),
    (true, true, false),
    (true, true, false),
    (true, true, false),
    (true, false, false),
];

const ILU_OPCODES: [&str; 8] = ["NOP", "MOV", "RCP", "RCC", "RSQ", "EXP", "LOG", "LIT"];
const ILU_FORCE_SCALAR: [bool; 8] = [false, false, true, true, true, true, true, false];

const MASK_STR: [&str; 16] = [
    ",", ",w", ",z", ",zw", ",y", ",yw", ",yz", ",yzw", ",x", ",xw", ",xz", ",xzw", ",xy",
    ",xyw", ",xyz", ",xyzw",
];

/// Fog writes land on `x` whatever component is masked
const FOG_MASK_STR: [&str; 16] = [
    ",", ",x", ",x", ",xy", ",x", ",xy", ",xy", ",xyz", ",x", ",xy", ",xy", ",xyz", ",xy",
    ",xyz", ",xyz", ",xyzw",
];

const OUT_REG_NAMES: [&str; 16] = [
    "oPos", "???", "???", "oD0", "oD1", "oFog", "oPts", "oB0", "oB1", "oT0", "oT1", "oT2", "oT3",
    "???", "???", "A0.x",
];

const SWIZZLE_COMPONENTS: [char; 4] = ['x', 'y', 'z', 'w'];

#[inline]
fn get(token: &[u32; 4], field: Field) -> u32 {
    (token[field.subtoken] >> field.start) & !(u32::MAX << field.len)
}

/// Maps the signed constant address to an index into `c`
fn convert_c_register(c_reg: u32) -> i32 {
    ((((c_reg >> 5) & 7) as i32 - 3) * 32) + (c_reg & 31) as i32 + 96
}

fn decode_swizzle(token: &[u32; 4], fields: &[Field; 4], force_scalar: bool) -> String {
    let [x, y, z, w] = if force_scalar {
        [get(token, fields[0]); 4]
    } else {
        fields.map(|f| get(token, f))
    };
    let name = |c: u32| SWIZZLE_COMPONENTS[c as usize];

    if (x, y, z, w) == (0, 1, 2, 3) {
        String::new()
    } else if x == y && y == z && z == w {
        format!(".{}", name(x))
    } else if y == z && z == w {
        format!(".{}{}", name(x), name(y))
    } else if z == w {
        format!(".{}{}{}", name(x), name(y), name(z))
    } else {
        format!(".{}{}{}{}", name(x), name(y), name(z), name(w))
    }
}

fn decode_input(
    token: &[u32; 4],
    param: u32,
    neg: Field,
    swizzle: &[Field; 4],
    force_scalar: bool,
    reg_num: u32,
) -> String {
    let mut input = String::new();
    if get(token, neg) != 0 {
        input.push('-');
    }
    match param {
        PARAM_R => input.push_str(&format!("R{}", reg_num)),
        PARAM_V => input.push_str(&format!("v{}", get(token, V))),
        PARAM_C => {
            let reg = convert_c_register(get(token, CONST));
            if get(token, A0X) != 0 {
                input.push_str(&format!("c[A0+{}]", reg));
            } else {
                input.push_str(&format!("c[{}]", reg));
            }
        }
        _ => panic!("unknown vertex program input mux {}", param),
    }

    input.push_str(&decode_swizzle(token, swizzle, force_scalar));
    input
}

/// Emits one MAC or ILU operation. A paired MAC writes to `_temp_vec`, the
/// register copy is returned separately and must follow the ILU operation
fn decode_opcode(
    token: &[u32; 4],
    out_mux: u32,
    mut mask: u32,
    opcode: &str,
    inputs: &str,
) -> (String, Option<String>) {
    let mut ret = String::new();
    let mut reg_num = get(token, OUT_R);
    let mut use_temp_var = false;

    if out_mux == MUX_MAC && get(token, ILU) != ILU_NOP {
        use_temp_var = true;
        if reg_num == 1 {
            // paired MAC writes to R1 are dropped
            mask = 0;
        }
    } else if out_mux == MUX_ILU && get(token, MAC) != MAC_NOP {
        reg_num = 1;
    }

    if get(token, OUT_MUX) == out_mux && get(token, OUT_O_MASK) != 0 {
        let write_mask = get(token, OUT_O_MASK) as usize;
        let (out_reg, mask_str) = if get(token, OUT_ORB) == OUTPUT_C {
            panic!(
                "vertex program writes constant c[{}]",
                convert_c_register(get(token, OUT_ADDRESS))
            );
        } else {
            let out_reg = get(token, OUT_ADDRESS) & 0xF;
            let mask_str = if out_reg == OUTPUT_REG_FOG {
                FOG_MASK_STR[write_mask]
            } else {
                MASK_STR[write_mask]
            };
            (OUT_REG_NAMES[out_reg as usize], mask_str)
        };
        ret.push_str(&format!("  {}({}{}{});\n", opcode, out_reg, mask_str, inputs));
    }

    let is_arl = opcode == MAC_OPCODES[MAC_ARL as usize];
    let mut suffix = None;
    if use_temp_var {
        let mut copy = String::new();
        if is_arl {
            ret.push_str(&format!("  ARL(_temp_addr{});\n", inputs));
            copy.push_str("  A0 = _temp_addr;\n");
        } else if mask > 0 {
            let mask_str = MASK_STR[mask as usize];
            ret.push_str(&format!("  {}(_temp_vec{}{});\n", opcode, mask_str, inputs));
            let components = &mask_str[1..];
            copy.push_str(&format!(
                "  R{}.{} = _temp_vec.{};\n",
                reg_num, components, components
            ));
        }
        suffix = Some(copy);
    } else if is_arl {
        ret.push_str(&format!("  ARL(A0{});\n", inputs));
    } else if mask > 0 {
        ret.push_str(&format!(
            "  {}(R{}{}{});\n",
            opcode, reg_num, MASK_STR[mask as usize], inputs
        ));
    }

    (ret, suffix)
}

fn decode_token(token: &[u32; 4]) -> String {
    let mac = get(token, MAC);
    let ilu = get(token, ILU);
    if mac == MAC_NOP && ilu == ILU_NOP {
        return String::new();
    }

    let input_c = decode_input(
        token,
        get(token, C_MUX),
        C_NEG,
        &C_SWIZZLE,
        ILU_FORCE_SCALAR[get(token, ILU) as usize],
        (get(token, C_R_HIGH) << 2) | get(token, C_R_LOW),
    );

    let mut ret = String::new();
    let mut mac_suffix = None;
    if mac != MAC_NOP {
        let (a, b, c) = MAC_PARAMS
            .get(mac as usize)
            .copied()
            .unwrap_or_else(|| panic!("unknown vertex program MAC opcode {}", mac));
        let mut inputs = String::new();
        if a {
            inputs.push_str(", ");
            inputs.push_str(&decode_input(
                token,
                get(token, A_MUX),
                A_NEG,
                &A_SWIZZLE,
                false,
                get(token, A_R),
            ));
        }
        if b {
            inputs.push_str(", ");
            inputs.push_str(&decode_input(
                token,
                get(token, B_MUX),
                B_NEG,
                &B_SWIZZLE,
                false,
                get(token, B_R),
            ));
        }
        if c {
            inputs.push_str(", ");
            inputs.push_str(&input_c);
        }

        let (code, suffix) = decode_opcode(
            token,
            MUX_MAC,
            get(token, OUT_MAC_MASK),
            MAC_OPCODES[mac as usize],
            &inputs,
        );
        ret.push_str(&code);
        mac_suffix = suffix;
    }

    if ilu != ILU_NOP {
        let inputs = format!(", {}", input_c);
        let (code, _) = decode_opcode(
            token,
            MUX_ILU,
            get(token, OUT_ILU_MASK),
            ILU_OPCODES[ilu as usize],
            &inputs,
        );
        ret.push_str(&code);
    }

    if let Some(suffix) = mac_suffix {
        ret.push_str(&suffix);
    }
    ret
}

const HEADER: &str = r#"
int A0 = 0;

vec4 R0 = vec4(0.0,0.0,0.0,0.0);
vec4 R1 = vec4(0.0,0.0,0.0,0.0);
vec4 R2 = vec4(0.0,0.0,0.0,0.0);
vec4 R3 = vec4(0.0,0.0,0.0,0.0);
vec4 R4 = vec4(0.0,0.0,0.0,0.0);
vec4 R5 = vec4(0.0,0.0,0.0,0.0);
vec4 R6 = vec4(0.0,0.0,0.0,0.0);
vec4 R7 = vec4(0.0,0.0,0.0,0.0);
vec4 R8 = vec4(0.0,0.0,0.0,0.0);
vec4 R9 = vec4(0.0,0.0,0.0,0.0);
vec4 R10 = vec4(0.0,0.0,0.0,0.0);
vec4 R11 = vec4(0.0,0.0,0.0,0.0);
#define R12 oPos

vec4 _temp_vec;
int _temp_addr;

/* Converts the input to vec4, pads with last component */
vec4 _in(float v) { return vec4(v); }
vec4 _in(vec2 v) { return v.xyyy; }
vec4 _in(vec3 v) { return v.xyzz; }
vec4 _in(vec4 v) { return v.xyzw; }

#define INFINITY (1.0 / 0.0)

#define MOV(dest, mask, src) dest.mask = _MOV(_in(src)).mask
vec4 _MOV(vec4 src)
{
  return src;
}

#define MUL(dest, mask, src0, src1) dest.mask = _MUL(_in(src0), _in(src1)).mask
vec4 _MUL(vec4 src0, vec4 src1)
{
  vec4 zero_components = sign(src0) * sign(src1);
  vec4 ret = src0 * src1;
  if (zero_components.x == 0.0) { ret.x = 0.0; }
  if (zero_components.y == 0.0) { ret.y = 0.0; }
  if (zero_components.z == 0.0) { ret.z = 0.0; }
  if (zero_components.w == 0.0) { ret.w = 0.0; }
  return ret;
}

#define ADD(dest, mask, src0, src1) dest.mask = _ADD(_in(src0), _in(src1)).mask
vec4 _ADD(vec4 src0, vec4 src1)
{
  return src0 + src1;
}

#define MAD(dest, mask, src0, src1, src2) dest.mask = _MAD(_in(src0), _in(src1), _in(src2)).mask
vec4 _MAD(vec4 src0, vec4 src1, vec4 src2)
{
  return _MUL(src0, src1) + src2;
}

#define DP3(dest, mask, src0, src1) dest.mask = _DP3(_in(src0), _in(src1)).mask
vec4 _DP3(vec4 src0, vec4 src1)
{
  return vec4(dot(src0.xyz, src1.xyz));
}

#define DPH(dest, mask, src0, src1) dest.mask = _DPH(_in(src0), _in(src1)).mask
vec4 _DPH(vec4 src0, vec4 src1)
{
  return vec4(dot(vec4(src0.xyz, 1.0), src1));
}

#define DP4(dest, mask, src0, src1) dest.mask = _DP4(_in(src0), _in(src1)).mask
vec4 _DP4(vec4 src0, vec4 src1)
{
  return vec4(dot(src0, src1));
}

#define DST(dest, mask, src0, src1) dest.mask = _DST(_in(src0), _in(src1)).mask
vec4 _DST(vec4 src0, vec4 src1)
{
  return vec4(1.0,
              src0.y * src1.y,
              src0.z,
              src1.w);
}

#define MIN(dest, mask, src0, src1) dest.mask = _MIN(_in(src0), _in(src1)).mask
vec4 _MIN(vec4 src0, vec4 src1)
{
  return min(src0, src1);
}

#define MAX(dest, mask, src0, src1) dest.mask = _MAX(_in(src0), _in(src1)).mask
vec4 _MAX(vec4 src0, vec4 src1)
{
  return max(src0, src1);
}

#define SLT(dest, mask, src0, src1) dest.mask = _SLT(_in(src0), _in(src1)).mask
vec4 _SLT(vec4 src0, vec4 src1)
{
  return vec4(lessThan(src0, src1));
}

#define ARL(dest, src) dest = _ARL(_in(src).x)
int _ARL(float src)
{
  /* biased so values normalized from bytes floor to the intended index */
  return int(floor(src + 0.001));
}

#define SGE(dest, mask, src0, src1) dest.mask = _SGE(_in(src0), _in(src1)).mask
vec4 _SGE(vec4 src0, vec4 src1)
{
  return vec4(greaterThanEqual(src0, src1));
}

#define RCP(dest, mask, src) dest.mask = _RCP(_in(src).x).mask
vec4 _RCP(float src)
{
  return vec4(1.0 / src);
}

#define RCC(dest, mask, src) dest.mask = _RCC(_in(src).x).mask
vec4 _RCC(float src)
{
  float t = 1.0 / src;
  if (t > 0.0) {
    t = clamp(t, 5.42101e-020, 1.884467e+019);
  } else {
    t = clamp(t, -1.884467e+019, -5.42101e-020);
  }
  return vec4(t);
}

#define RSQ(dest, mask, src) dest.mask = _RSQ(_in(src).x).mask
vec4 _RSQ(float src)
{
  if (src == 0.0) { return vec4(INFINITY); }
  if (isinf(src)) { return vec4(0.0); }
  return vec4(inversesqrt(abs(src)));
}

#define EXP(dest, mask, src) dest.mask = _EXP(_in(src).x).mask
vec4 _EXP(float src)
{
  vec4 result;
  result.x = exp2(floor(src));
  result.y = src - floor(src);
  result.z = exp2(src);
  result.w = 1.0;
  return result;
}

#define LOG(dest, mask, src) dest.mask = _LOG(_in(src).x).mask
vec4 _LOG(float src)
{
  float tmp = abs(src);
  if (tmp == 0.0) { return vec4(-INFINITY, 1.0f, -INFINITY, 1.0f); }
  vec4 result;
  result.x = floor(log2(tmp));
  result.y = tmp / exp2(floor(log2(tmp)));
  result.z = log2(tmp);
  result.w = 1.0;
  return result;
}

#define LIT(dest, mask, src) dest.mask = _LIT(_in(src)).mask
vec4 _LIT(vec4 src)
{
  vec4 s = src;
  float epsilon = 1.0 / 256.0;
  s.w = clamp(s.w, -(128.0 - epsilon), 128.0 - epsilon);
  s.x = max(s.x, 0.0);
  s.y = max(s.y, 0.0);
  vec4 t = vec4(1.0, 0.0, 0.0, 1.0);
  t.y = s.x;
  t.z = (s.x > 0.0) ? exp2(s.w * log2(s.y)) : 0.0;
  return t;
}
"#;

/// Translates `program` into `body`, appending the instruction emulation
/// helpers to `header`.
///
/// Panics if no slot is flagged final.
pub(super) fn translate(
    program: &[[u32; 4]],
    z_perspective: bool,
    header: &mut String,
    body: &mut String,
) {
    header.push_str(HEADER);

    let mut has_final = false;
    for (slot, token) in program.iter().enumerate() {
        body.push_str(&format!(
            "  /* Slot {}: 0x{:08X} 0x{:08X} 0x{:08X} 0x{:08X} */\n",
            slot, token[0], token[1], token[2], token[3]
        ));
        body.push_str(&decode_token(token));
        body.push('\n');

        if get(token, FINAL) != 0 {
            has_final = true;
            break;
        }
    }
    assert!(has_final, "vertex program without a final instruction");

    // the interpolants are divided by w by hand, the host never sees it
    body.push_str(
        "  if (oPos.w == 0.0 || isinf(oPos.w)) {\n\
         \x20   vtx_inv_w = 1.0;\n\
         \x20 } else {\n\
         \x20   vtx_inv_w = 1.0 / oPos.w;\n\
         \x20 }\n\
         \x20 vtx_inv_w_flat = vtx_inv_w;\n",
    );

    // programs output screen space positions
    body.push_str(
        "  oPos.x = 2.0 * (oPos.x - surfaceSize.x * 0.5) / surfaceSize.x;\n\
         \x20 oPos.y = -2.0 * (oPos.y - surfaceSize.y * 0.5) / surfaceSize.y;\n",
    );
    if z_perspective {
        body.push_str("  oPos.z = oPos.w;\n");
    }
    body.push_str(
        "  if (clipRange.y != clipRange.x) {\n\
         \x20   oPos.z = (oPos.z - clipRange.x)/(0.5*(clipRange.y - clipRange.x)) - 1;\n\
         \x20 }\n\
         \x20 if (oPos.w < 0.0) {\n\
         \x20   oPos.xyz *= oPos.w;\n\
         \x20 } else {\n\
         \x20   oPos.w = 1.0;\n\
         \x20 }\n",
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(token: &mut [u32; 4], field: Field, value: u32) {
        token[field.subtoken] |= value << field.start;
    }

    /// `MOV oPos, v0` flagged final
    fn mov_position() -> [u32; 4] {
        let mut token = [0; 4];
        put(&mut token, MAC, 1);
        put(&mut token, A_MUX, PARAM_V);
        put(&mut token, V, 0);
        put(&mut token, C_MUX, PARAM_R);
        for (i, swizzle) in A_SWIZZLE.iter().enumerate() {
            put(&mut token, *swizzle, i as u32);
        }
        put(&mut token, OUT_MUX, MUX_MAC);
        put(&mut token, OUT_ORB, 1);
        put(&mut token, OUT_ADDRESS, 0);
        put(&mut token, OUT_O_MASK, 0xF);
        put(&mut token, FINAL, 1);
        token
    }

    #[test]
    fn constant_addresses() {
        assert_eq!(convert_c_register(0x60), 96);
        assert_eq!(convert_c_register(0x00), 0);
        assert_eq!(convert_c_register(0xFF), 191);
    }

    #[test]
    fn mov_to_output() {
        let mut header = String::new();
        let mut body = String::new();
        translate(&[mov_position()], false, &mut header, &mut body);

        assert!(header.contains("#define R12 oPos"));
        assert!(body.contains("  MOV(oPos,xyzw, v0);\n"));
        assert!(body.contains("/* Slot 0: 0x"));
        assert!(!body.contains("oPos.z = oPos.w;"));

        let mut body = String::new();
        translate(&[mov_position()], true, &mut header, &mut body);
        assert!(body.contains("  oPos.z = oPos.w;\n"));
    }

    #[test]
    fn stops_at_final_slot() {
        let mut first = mov_position();
        first[3] &= !1;
        let mut body = String::new();
        translate(
            &[first, mov_position(), mov_position()],
            false,
            &mut String::new(),
            &mut body,
        );
        assert!(body.contains("/* Slot 1:"));
        assert!(!body.contains("/* Slot 2:"));
    }

    #[test]
    fn paired_mac_uses_temporary() {
        let mut token = [0; 4];
        // DP4 R2.x, c[96], c[96] paired with RCP R1, c[96].x
        put(&mut token, MAC, 7);
        put(&mut token, ILU, 2);
        put(&mut token, A_MUX, PARAM_C);
        put(&mut token, B_MUX, PARAM_C);
        put(&mut token, C_MUX, PARAM_C);
        put(&mut token, CONST, 0x60);
        for swizzles in [A_SWIZZLE, B_SWIZZLE, C_SWIZZLE] {
            for (i, swizzle) in swizzles.iter().enumerate() {
                put(&mut token, *swizzle, i as u32);
            }
        }
        put(&mut token, OUT_R, 2);
        put(&mut token, OUT_MAC_MASK, 0x8);
        put(&mut token, OUT_ILU_MASK, 0xF);

        let code = decode_token(&token);
        assert_eq!(
            code,
            "  DP4(_temp_vec,x, c[96], c[96]);\n  RCP(R1,xyzw, c[96].x);\n  R2.x = _temp_vec.x;\n"
        );
    }

    #[test]
    fn swizzle_shortening() {
        let mut token = [0; 4];
        for (swizzle, c) in A_SWIZZLE.iter().zip([1, 2, 2, 2]) {
            put(&mut token, *swizzle, c);
        }
        assert_eq!(decode_swizzle(&token, &A_SWIZZLE, false), ".yz");
    }

    #[test]
    #[should_panic(expected = "final")]
    fn missing_final_panics() {
        let mut token = mov_position();
        token[3] &= !1;
        translate(&[token], false, &mut String::new(), &mut String::new());
    }
}

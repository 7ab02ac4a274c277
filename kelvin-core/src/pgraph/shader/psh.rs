//! Register combiner translation into a GLSL fragment shader.

use super::PshState;

const REG_ZERO: u32 = 0x0;
const REG_C0: u32 = 0x1;
const REG_C1: u32 = 0x2;
const REG_FOG: u32 = 0x3;
const REG_V0: u32 = 0x4;
const REG_V1: u32 = 0x5;
const REG_T0: u32 = 0x8;
const REG_T1: u32 = 0x9;
const REG_T2: u32 = 0xA;
const REG_T3: u32 = 0xB;
const REG_R0: u32 = 0xC;
const REG_R1: u32 = 0xD;
const REG_V1R0_SUM: u32 = 0xE;
const REG_EF_PROD: u32 = 0xF;

const CHANNEL_ALPHA: u32 = 0x10;

const MAP_UNSIGNED_IDENTITY: u32 = 0x00;
const MAP_UNSIGNED_INVERT: u32 = 0x20;
const MAP_EXPAND_NORMAL: u32 = 0x40;
const MAP_EXPAND_NEGATE: u32 = 0x60;
const MAP_HALFBIAS_NORMAL: u32 = 0x80;
const MAP_HALFBIAS_NEGATE: u32 = 0xA0;
const MAP_SIGNED_IDENTITY: u32 = 0xC0;
const MAP_SIGNED_NEGATE: u32 = 0xE0;

const OUT_IDENTITY: u32 = 0x00;
const OUT_BIAS: u32 = 0x08;
const OUT_SHIFTLEFT_1: u32 = 0x10;
const OUT_SHIFTLEFT_1_BIAS: u32 = 0x18;
const OUT_SHIFTLEFT_2: u32 = 0x20;
const OUT_SHIFTRIGHT_1: u32 = 0x30;
const OUT_AB_BLUE_TO_ALPHA: u32 = 0x80;
const OUT_CD_BLUE_TO_ALPHA: u32 = 0x40;
const OUT_AB_CD_MUX: u32 = 0x04;
const OUT_AB_DOT_PRODUCT: u32 = 0x02;
const OUT_CD_DOT_PRODUCT: u32 = 0x01;

const COUNT_MUX_MSB: u32 = 0x001;
const COUNT_UNIQUE_C0: u32 = 0x010;
const COUNT_UNIQUE_C1: u32 = 0x100;

const FINAL_CLAMP_SUM: u32 = 0x80;
const FINAL_COMPLEMENT_V1: u32 = 0x40;
const FINAL_COMPLEMENT_R0: u32 = 0x20;

const FINAL_STAGE: usize = 8;

const TEX_NONE: u32 = 0x00;
const TEX_PROJECT2D: u32 = 0x01;
const TEX_PROJECT3D: u32 = 0x02;
const TEX_CUBEMAP: u32 = 0x03;
const TEX_PASSTHRU: u32 = 0x04;
const TEX_CLIPPLANE: u32 = 0x05;
const TEX_BUMPENVMAP: u32 = 0x06;
const TEX_BUMPENVMAP_LUM: u32 = 0x07;
const TEX_BRDF: u32 = 0x08;
const TEX_DOT_ST: u32 = 0x09;
const TEX_DOT_ZW: u32 = 0x0A;
const TEX_DOT_RFLCT_DIFF: u32 = 0x0B;
const TEX_DOT_RFLCT_SPEC: u32 = 0x0C;
const TEX_DOT_STR_3D: u32 = 0x0D;
const TEX_DOT_STR_CUBE: u32 = 0x0E;
const TEX_DPNDNT_AR: u32 = 0x0F;
const TEX_DPNDNT_GB: u32 = 0x10;
const TEX_DOTPRODUCT: u32 = 0x11;
const TEX_DOT_RFLCT_SPEC_CONST: u32 = 0x12;

const DOTMAP_FUNCS: [&str; 8] = [
    "dotmap_zero_to_one",
    "dotmap_minus1_to_1_d3d",
    "dotmap_minus1_to_1_gl",
    "dotmap_minus1_to_1",
    "dotmap_hilo_1",
    "dotmap_hilo_hemisphere_d3d",
    "dotmap_hilo_hemisphere_gl",
    "dotmap_hilo_hemisphere",
];

const HELPER_FUNCTIONS: &str = "\
float sign1(float x) {
    x *= 255.0;
    return (x-128.0)/127.0;
}
float sign2(float x) {
    x *= 255.0;
    if (x >= 128.0) return (x-255.5)/127.5;
               else return (x+0.5)/127.5;
}
float sign3(float x) {
    x *= 255.0;
    if (x >= 128.0) return (x-256.0)/127.0;
               else return (x)/127.0;
}
vec3 dotmap_zero_to_one(vec4 col) {
    return col.rgb;
}
vec3 dotmap_minus1_to_1_d3d(vec4 col) {
    return vec3(sign1(col.r),sign1(col.g),sign1(col.b));
}
vec3 dotmap_minus1_to_1_gl(vec4 col) {
    return vec3(sign2(col.r),sign2(col.g),sign2(col.b));
}
vec3 dotmap_minus1_to_1(vec4 col) {
    return vec3(sign3(col.r),sign3(col.g),sign3(col.b));
}
vec3 dotmap_hilo_1(vec4 col) {
    uint hi_i = uint(col.a * float(0xff)) << 8
              | uint(col.r * float(0xff));
    uint lo_i = uint(col.g * float(0xff)) << 8
              | uint(col.b * float(0xff));
    float hi_f = float(hi_i) / float(0xffff);
    float lo_f = float(lo_i) / float(0xffff);
    return vec3(hi_f, lo_f, 1.0);
}
vec3 dotmap_hilo_hemisphere_d3d(vec4 col) {
    return col.rgb;
}
vec3 dotmap_hilo_hemisphere_gl(vec4 col) {
    return col.rgb;
}
vec3 dotmap_hilo_hemisphere(vec4 col) {
    return col.rgb;
}
";

#[derive(Debug, Clone, Copy, Default)]
struct Input {
    reg: u32,
    chan: u32,
    mapping: u32,
}

impl Input {
    fn parse(value: u32) -> Self {
        Self {
            reg: value & 0xF,
            chan: value & 0x10,
            mapping: value & 0xE0,
        }
    }

    /// a, b, c and d, `a` being the most significant byte
    fn parse_all(value: u32) -> [Self; 4] {
        [
            Self::parse(value >> 24),
            Self::parse(value >> 16),
            Self::parse(value >> 8),
            Self::parse(value),
        ]
    }
}

#[derive(Debug, Clone, Copy)]
struct Output {
    cd: u32,
    ab: u32,
    muxsum: u32,
    flags: u32,
}

impl Output {
    fn parse(value: u32) -> Self {
        Self {
            cd: value & 0xF,
            ab: (value >> 4) & 0xF,
            muxsum: (value >> 8) & 0xF,
            flags: value >> 12,
        }
    }

    fn mapping(&self) -> u32 {
        self.flags & 0x38
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct FinalCombiner {
    a: Input,
    b: Input,
    c: Input,
    d: Input,
    e: Input,
    f: Input,
    g: Input,
    clamp_sum: bool,
    inv_v1: bool,
    inv_r0: bool,
}

impl FinalCombiner {
    fn parse(final_0: u32, final_1: u32) -> Self {
        let [a, b, c, d] = Input::parse_all(final_0);
        let [e, f, g, _] = Input::parse_all(final_1);
        let flags = final_1 & 0xFF;
        Self {
            a,
            b,
            c,
            d,
            e,
            f,
            g,
            clamp_sum: flags & FINAL_CLAMP_SUM != 0,
            inv_v1: flags & FINAL_COMPLEMENT_V1 != 0,
            inv_r0: flags & FINAL_COMPLEMENT_R0 != 0,
        }
    }
}

struct PixelShader<'a> {
    state: &'a PshState,
    flags: u32,
    cur_stage: usize,
    tex_modes: [u32; 4],
    dot_map: [u32; 4],
    input_tex: [usize; 4],
    final_combiner: FinalCombiner,
    /// E and F inputs, only while translating the final combiner
    ef: Option<(String, String)>,
    var_refs: Vec<String>,
    const_refs: Vec<String>,
    code: String,
}

impl<'a> PixelShader<'a> {
    fn new(state: &'a PshState) -> Self {
        let mut tex_modes = [0; 4];
        for (i, mode) in tex_modes.iter_mut().enumerate() {
            *mode = (state.shader_stage_program >> (i * 5)) & 0x1F;
        }
        let other = state.other_stage_input;

        Self {
            state,
            flags: state.combiner_control >> 8,
            cur_stage: 0,
            tex_modes,
            dot_map: [0, other & 0xF, (other >> 4) & 0xF, (other >> 8) & 0xF],
            input_tex: [
                0,
                0,
                ((other >> 16) & 0xF) as usize,
                ((other >> 20) & 0xF) as usize,
            ],
            final_combiner: FinalCombiner::parse(state.final_inputs_0, state.final_inputs_1),
            ef: None,
            var_refs: Vec::new(),
            const_refs: Vec::new(),
            code: String::new(),
        }
    }

    fn add_var_ref(&mut self, name: &str) {
        if !self.var_refs.iter().any(|v| v == name) {
            self.var_refs.push(name.to_owned());
        }
    }

    fn add_const_ref(&mut self, name: &str) {
        if !self.const_refs.iter().any(|v| v == name) {
            self.const_refs.push(name.to_owned());
        }
    }

    fn constant(&mut self, index: u32, unique: bool) -> String {
        let name = if unique || self.cur_stage == FINAL_STAGE {
            format!("c{}_{}", index, self.cur_stage)
        } else {
            format!("c{}_0", index)
        };
        self.add_const_ref(&name);
        name
    }

    fn get_var(&mut self, reg: u32, is_dest: bool) -> String {
        match reg {
            REG_ZERO if is_dest => String::new(),
            REG_ZERO => "vec4(0.0)".to_owned(),
            REG_C0 => self.constant(0, self.flags & COUNT_UNIQUE_C0 != 0),
            REG_C1 => self.constant(1, self.flags & COUNT_UNIQUE_C1 != 0),
            REG_FOG => "pFog".to_owned(),
            REG_V0 => "v0".to_owned(),
            REG_V1 => "v1".to_owned(),
            REG_T0 => "t0".to_owned(),
            REG_T1 => "t1".to_owned(),
            REG_T2 => "t2".to_owned(),
            REG_T3 => "t3".to_owned(),
            REG_R0 => {
                self.add_var_ref("r0");
                "r0".to_owned()
            }
            REG_R1 => {
                self.add_var_ref("r1");
                "r1".to_owned()
            }
            REG_V1R0_SUM => {
                self.add_var_ref("r0");
                let fc = &self.final_combiner;
                let sum = format!(
                    "vec4({}.rgb + {}.rgb, 0.0)",
                    if fc.inv_v1 { "(1.0 - v1)" } else { "v1" },
                    if fc.inv_r0 { "(1.0 - r0)" } else { "r0" }
                );
                if fc.clamp_sum {
                    format!("clamp({}, 0.0, 1.0)", sum)
                } else {
                    sum
                }
            }
            REG_EF_PROD => match &self.ef {
                Some((e, f)) => format!("vec4({} * {}, 0.0)", e, f),
                None => panic!("EF product read outside the final combiner"),
            },
            _ => panic!("invalid combiner register 0x{:X}", reg),
        }
    }

    fn get_input_var(&mut self, input: Input, is_alpha: bool) -> String {
        let mut reg = self.get_var(input.reg, false);
        let swizzle = match (is_alpha, input.chan == CHANNEL_ALPHA) {
            (false, false) => ".rgb",
            (false, true) => ".aaa",
            (true, false) => ".b",
            (true, true) => ".a",
        };
        reg.push_str(swizzle);

        match input.mapping {
            MAP_UNSIGNED_IDENTITY => format!("max({}, 0.0)", reg),
            MAP_UNSIGNED_INVERT => format!("(1.0 - clamp({}, 0.0, 1.0))", reg),
            MAP_EXPAND_NORMAL => format!("(2.0 * max({}, 0.0) - 1.0)", reg),
            MAP_EXPAND_NEGATE => format!("(-2.0 * max({}, 0.0) + 1.0)", reg),
            MAP_HALFBIAS_NORMAL => format!("(max({}, 0.0) - 0.5)", reg),
            MAP_HALFBIAS_NEGATE => format!("(-max({}, 0.0) + 0.5)", reg),
            MAP_SIGNED_IDENTITY => reg,
            MAP_SIGNED_NEGATE => format!("-{}", reg),
            _ => unreachable!(),
        }
    }

    /// Emits the intermediate results of one half of a stage into `code`,
    /// returning the register assignments to run after both halves.
    fn add_stage_code(
        &mut self,
        inputs: [Input; 4],
        output: Output,
        write_mask: &str,
        is_alpha: bool,
    ) -> String {
        let [a, b, c, d] = inputs.map(|input| self.get_input_var(input, is_alpha));
        let caster = if write_mask.len() == 3 { "vec3" } else { "" };

        let ab = if output.flags & OUT_AB_DOT_PRODUCT != 0 {
            format!("dot({}, {})", a, b)
        } else {
            format!("({} * {})", a, b)
        };
        let cd = if output.flags & OUT_CD_DOT_PRODUCT != 0 {
            format!("dot({}, {})", c, d)
        } else {
            format!("({} * {})", c, d)
        };

        let mapping = output.mapping();
        let ab_dest = self.get_var(output.ab, true);
        let cd_dest = self.get_var(output.cd, true);
        let muxsum_dest = self.get_var(output.muxsum, true);

        if !ab_dest.is_empty() {
            self.code.push_str(&format!(
                "ab.{} = clamp({}({}), -1.0, 1.0);\n",
                write_mask,
                caster,
                map_output(&ab, mapping)
            ));
        }
        if !cd_dest.is_empty() {
            self.code.push_str(&format!(
                "cd.{} = clamp({}({}), -1.0, 1.0);\n",
                write_mask,
                caster,
                map_output(&cd, mapping)
            ));
        }

        let muxsum = if output.flags & OUT_AB_CD_MUX == 0 {
            format!("({} + {})", ab, cd)
        } else {
            let condition = if self.flags & COUNT_MUX_MSB != 0 {
                "r0.a >= 0.5"
            } else {
                "(uint(r0.a * 255.0) & 1u) == 1u"
            };
            format!(
                "(({}) ? {}({}) : {}({}))",
                condition, caster, cd, caster, ab
            )
        };
        if !muxsum_dest.is_empty() {
            self.code.push_str(&format!(
                "mux_sum.{} = clamp({}({}), -1.0, 1.0);\n",
                write_mask,
                caster,
                map_output(&muxsum, mapping)
            ));
        }

        let mut assignments = String::new();
        if !ab_dest.is_empty() {
            assignments.push_str(&format!("{}.{} = ab.{};\n", ab_dest, write_mask, write_mask));
            if !is_alpha && output.flags & OUT_AB_BLUE_TO_ALPHA != 0 {
                assignments.push_str(&format!("{}.a = ab.b;\n", ab_dest));
            }
        }
        if !cd_dest.is_empty() {
            assignments.push_str(&format!("{}.{} = cd.{};\n", cd_dest, write_mask, write_mask));
            if !is_alpha && output.flags & OUT_CD_BLUE_TO_ALPHA != 0 {
                assignments.push_str(&format!("{}.a = cd.b;\n", cd_dest));
            }
        }
        if !muxsum_dest.is_empty() {
            assignments.push_str(&format!(
                "{}.{} = mux_sum.{};\n",
                muxsum_dest, write_mask, write_mask
            ));
        }
        assignments
    }

    fn add_final_stage_code(&mut self) {
        let fc = self.final_combiner;
        let e = self.get_input_var(fc.e, false);
        let f = self.get_input_var(fc.f, false);
        self.ef = Some((e, f));

        let a = self.get_input_var(fc.a, false);
        let b = self.get_input_var(fc.b, false);
        let c = self.get_input_var(fc.c, false);
        let d = self.get_input_var(fc.d, false);
        let g = self.get_input_var(fc.g, true);

        self.code.push_str(&format!(
            "fragColor.rgb = {} + mix(vec3({}), vec3({}), vec3({}));\n",
            d, c, b, a
        ));
        self.code.push_str(&format!("fragColor.a = {};\n", g));
        self.ef = None;
    }

    fn sampler_type(&self, unit: usize) -> Option<&'static str> {
        let rect = self.state.rect_tex[unit];
        match self.tex_modes[unit] {
            TEX_PROJECT2D | TEX_BUMPENVMAP | TEX_BUMPENVMAP_LUM | TEX_DOT_ST => {
                Some(if rect { "sampler2DRect" } else { "sampler2D" })
            }
            TEX_PROJECT3D | TEX_DOT_STR_3D => Some("sampler3D"),
            TEX_CUBEMAP | TEX_DOT_RFLCT_DIFF | TEX_DOT_RFLCT_SPEC | TEX_DOT_STR_CUBE => {
                Some("samplerCube")
            }
            TEX_DPNDNT_AR | TEX_DPNDNT_GB => Some("sampler2D"),
            _ => None,
        }
    }

    /// Texture fetch code of `unit`, uniforms needed by it go to `preflight`
    fn texture_code(&self, unit: usize, preflight: &mut String, vars: &mut String) {
        let i = unit;
        let n = self.input_tex[i];
        let dot_map = self.dot_map[i] as usize;
        assert!(dot_map < 8, "invalid dot mapping {}", dot_map);
        let dotmap = DOTMAP_FUNCS[dot_map];
        if dot_map > 3 {
            log::warn!("dot mapping {} is approximated", dotmap);
        }

        match self.tex_modes[i] {
            TEX_NONE => vars.push_str(&format!("vec4 t{} = vec4(0.0); /* none */\n", i)),
            TEX_PROJECT2D => {
                vars.push_str(&format!("pT{i}.xy = texScale{i} * pT{i}.xy;\n", i = i));
                vars.push_str(&format!(
                    "vec4 t{i} = textureProj(texSamp{i}, pT{i}.xyw);\n",
                    i = i
                ));
            }
            TEX_PROJECT3D => vars.push_str(&format!(
                "vec4 t{i} = textureProj(texSamp{i}, pT{i}.xyzw);\n",
                i = i
            )),
            TEX_CUBEMAP => vars.push_str(&format!(
                "vec4 t{i} = texture(texSamp{i}, pT{i}.xyz / pT{i}.w);\n",
                i = i
            )),
            TEX_PASSTHRU => vars.push_str(&format!("vec4 t{i} = pT{i};\n", i = i)),
            TEX_CLIPPLANE => {
                vars.push_str(&format!("vec4 t{} = vec4(0.0); /* clip plane */\n", i));
                for (j, component) in "xyzw".chars().enumerate() {
                    let op = if self.state.compare_mode[i][j] {
                        ">="
                    } else {
                        "<"
                    };
                    vars.push_str(&format!(
                        "  if(pT{}.{} {} 0.0) {{ discard; }};\n",
                        i, component, op
                    ));
                }
            }
            TEX_BUMPENVMAP => {
                assert!(i >= 1, "bump env map on stage 0");
                log::warn!(
                    "bump env map of stage {} uses the matrix of stage {}, unverified",
                    i,
                    i - 1
                );
                preflight.push_str(&format!("uniform mat2 bumpMat{};\n", i));
                vars.push_str(&format!(
                    "vec2 dsdt{i} = vec2(sign3(t{n}.b), sign3(t{n}.g));\n",
                    i = i,
                    n = n
                ));
                vars.push_str(&format!("dsdt{i} = bumpMat{i} * dsdt{i};\n", i = i));
                vars.push_str(&format!(
                    "vec4 t{i} = texture(texSamp{i}, texScale{i} * (pT{i}.xy + dsdt{i}));\n",
                    i = i
                ));
            }
            TEX_BUMPENVMAP_LUM => {
                assert!(i >= 1, "bump env map on stage 0");
                log::warn!(
                    "bump env map of stage {} uses the matrix of stage {}, unverified",
                    i,
                    i - 1
                );
                preflight.push_str(&format!("uniform float bumpScale{};\n", i));
                preflight.push_str(&format!("uniform float bumpOffset{};\n", i));
                preflight.push_str(&format!("uniform mat2 bumpMat{};\n", i));
                vars.push_str(&format!(
                    "vec3 dsdtl{i} = vec3(sign3(t{n}.b), sign3(t{n}.g), t{n}.r);\n",
                    i = i,
                    n = n
                ));
                vars.push_str(&format!(
                    "dsdtl{i}.st = bumpMat{i} * dsdtl{i}.st;\n",
                    i = i
                ));
                vars.push_str(&format!(
                    "vec4 t{i} = texture(texSamp{i}, texScale{i} * (pT{i}.xy + dsdtl{i}.st));\n",
                    i = i
                ));
                vars.push_str(&format!(
                    "t{i} = t{i} * (bumpScale{i} * dsdtl{i}.p + bumpOffset{i});\n",
                    i = i
                ));
            }
            TEX_DOT_ST => {
                assert!(i >= 2, "dot st on stage {}", i);
                vars.push_str(&format!(
                    "float dot{i} = dot(pT{i}.xyz, {f}(t{n}));\n",
                    i = i,
                    f = dotmap,
                    n = n
                ));
                vars.push_str(&format!(
                    "vec2 dotST{i} = vec2(dot{p}, dot{i});\n",
                    i = i,
                    p = i - 1
                ));
                vars.push_str(&format!(
                    "vec4 t{i} = texture(texSamp{i}, texScale{i} * dotST{i});\n",
                    i = i
                ));
            }
            TEX_DOT_ZW => {
                assert!(i >= 2, "dot zw on stage {}", i);
                vars.push_str(&format!(
                    "float dot{i} = dot(pT{i}.xyz, {f}(t{n}));\n",
                    i = i,
                    f = dotmap,
                    n = n
                ));
                vars.push_str(&format!("vec4 t{} = vec4(0.0);\n", i));
            }
            TEX_DOT_RFLCT_DIFF => {
                assert!(i == 2, "dot reflect diffuse on stage {}", i);
                let next_map = self.dot_map[i + 1] as usize;
                assert!(next_map < 8, "invalid dot mapping {}", next_map);
                vars.push_str(&format!(
                    "float dot{i} = dot(pT{i}.xyz, {f}(t{n}));\n",
                    i = i,
                    f = dotmap,
                    n = n
                ));
                vars.push_str(&format!(
                    "float dot{i}_n = dot(pT{j}.xyz, {f}(t{n}));\n",
                    i = i,
                    j = i + 1,
                    f = DOTMAP_FUNCS[next_map],
                    n = self.input_tex[i + 1]
                ));
                vars.push_str(&format!(
                    "vec3 n_{i} = vec3(dot{p}, dot{i}, dot{i}_n);\n",
                    i = i,
                    p = i - 1
                ));
                vars.push_str(&format!("vec4 t{i} = texture(texSamp{i}, n_{i});\n", i = i));
            }
            TEX_DOT_RFLCT_SPEC => {
                assert!(i == 3, "dot reflect specular on stage {}", i);
                vars.push_str(&format!(
                    "float dot{i} = dot(pT{i}.xyz, {f}(t{n}));\n",
                    i = i,
                    f = dotmap,
                    n = n
                ));
                vars.push_str(&format!(
                    "vec3 n_{i} = vec3(dot{a}, dot{b}, dot{i});\n",
                    i = i,
                    a = i - 2,
                    b = i - 1
                ));
                vars.push_str(&format!(
                    "vec3 e_{i} = vec3(pT{a}.w, pT{b}.w, pT{i}.w);\n",
                    i = i,
                    a = i - 2,
                    b = i - 1
                ));
                vars.push_str(&format!(
                    "vec3 rv_{i} = 2*n_{i}*dot(n_{i},e_{i})/dot(n_{i},n_{i}) - e_{i};\n",
                    i = i
                ));
                vars.push_str(&format!("vec4 t{i} = texture(texSamp{i}, rv_{i});\n", i = i));
            }
            TEX_DOT_STR_3D | TEX_DOT_STR_CUBE => {
                assert!(i == 3, "dot str on stage {}", i);
                vars.push_str(&format!(
                    "float dot{i} = dot(pT{i}.xyz, {f}(t{n}));\n",
                    i = i,
                    f = dotmap,
                    n = n
                ));
                vars.push_str(&format!(
                    "vec3 dotSTR{i} = vec3(dot{a}, dot{b}, dot{i});\n",
                    i = i,
                    a = i - 2,
                    b = i - 1
                ));
                vars.push_str(&format!(
                    "vec4 t{i} = texture(texSamp{i}, dotSTR{i});\n",
                    i = i
                ));
            }
            TEX_DPNDNT_AR | TEX_DPNDNT_GB => {
                assert!(i >= 1, "dependent read on stage 0");
                assert!(!self.state.rect_tex[i], "dependent read of a rect texture");
                let swizzle = if self.tex_modes[i] == TEX_DPNDNT_AR {
                    "ar"
                } else {
                    "gb"
                };
                vars.push_str(&format!(
                    "vec4 t{i} = texture(texSamp{i}, t{n}.{s});\n",
                    i = i,
                    n = n,
                    s = swizzle
                ));
            }
            TEX_DOTPRODUCT => {
                assert!(i == 1 || i == 2, "dot product on stage {}", i);
                vars.push_str(&format!(
                    "float dot{i} = dot(pT{i}.xyz, {f}(t{n}));\n",
                    i = i,
                    f = dotmap,
                    n = n
                ));
                vars.push_str(&format!("vec4 t{} = vec4(0.0);\n", i));
            }
            TEX_BRDF | TEX_DOT_RFLCT_SPEC_CONST => {
                log::warn!(
                    "texture mode 0x{:X} of stage {} is not supported",
                    self.tex_modes[i],
                    i
                );
                vars.push_str(&format!("vec4 t{} = vec4(0.0);\n", i));
            }
            mode => panic!("unknown texture mode 0x{:X}", mode),
        }

        preflight.push_str(&format!("uniform float texScale{};\n", i));
        if let Some(sampler) = self.sampler_type(i) {
            preflight.push_str(&format!("uniform {} texSamp{};\n", sampler, i));
            if self.state.alphakill[i] {
                vars.push_str(&format!("if (t{}.a == 0.0) {{ discard; }};\n", i));
            }
        }
    }

    fn window_clip_code(&self) -> String {
        let exclusive = self.state.window_clip_exclusive;
        let mut clip = format!(
            "/*  Window-clip ({}) */\n",
            if exclusive { "Exclusive" } else { "Inclusive" }
        );
        if !exclusive {
            clip.push_str("bool clipContained = false;\n");
        }
        clip.push_str(
            "vec2 coord = gl_FragCoord.xy - 0.5;\n\
             for (int i = 0; i < 8; i++) {\n\
             \x20 bool outside = any(bvec4(\n\
             \x20     lessThan(coord, vec2(clipRegion[i].xy)),\n\
             \x20     greaterThanEqual(coord, vec2(clipRegion[i].zw))));\n\
             \x20 if (!outside) {\n",
        );
        if exclusive {
            clip.push_str("    discard;\n");
        } else {
            clip.push_str("    clipContained = true;\n    break;\n");
        }
        clip.push_str("  }\n}\n");
        if !exclusive {
            clip.push_str("if (!clipContained) {\n  discard;\n}\n");
        }
        clip
    }

    fn translate(mut self) -> String {
        let state = self.state;
        let num_stages = (state.combiner_control & 0xFF) as usize;
        assert!(num_stages <= 8, "{} combiner stages", num_stages);

        let mut preflight = super::vertex_data_block(state.smooth_shading, "in");
        preflight.push_str("\nout vec4 fragColor;\n\nuniform vec4 fogColor;\n");
        preflight.push_str(HELPER_FUNCTIONS);
        preflight.push_str("uniform ivec4 clipRegion[8];\n");

        let clip = self.window_clip_code();

        let inv_w = if state.smooth_shading {
            "vtx_inv_w"
        } else {
            "vtx_inv_w_flat"
        };
        let mut vars = String::new();
        for input in ["D0", "D1", "B0", "B1"] {
            vars.push_str(&format!("vec4 p{0} = vtx{0} / {1};\n", input, inv_w));
        }
        vars.push_str("vec4 pFog = vec4(fogColor.rgb, clamp(vtxFog / vtx_inv_w, 0.0, 1.0));\n");
        for i in 0..4 {
            vars.push_str(&format!("vec4 pT{0} = vtxT{0} / vtx_inv_w;\n", i));
        }
        vars.push_str(
            "\nvec4 v0 = pD0;\nvec4 v1 = pD1;\nvec4 ab;\nvec4 cd;\nvec4 mux_sum;\n",
        );

        for unit in 0..4 {
            self.texture_code(unit, &mut preflight, &mut vars);
        }

        for stage in 0..num_stages {
            self.cur_stage = stage;
            self.code.push_str(&format!("// Stage {}\n", stage));
            let rgb = self.add_stage_code(
                Input::parse_all(state.rgb_inputs[stage]),
                Output::parse(state.rgb_outputs[stage]),
                "rgb",
                false,
            );
            let alpha = self.add_stage_code(
                Input::parse_all(state.alpha_inputs[stage]),
                Output::parse(state.alpha_outputs[stage]),
                "a",
                true,
            );
            self.code.push_str(&rgb);
            self.code.push_str(&alpha);
        }

        if state.final_inputs_0 != 0 || state.final_inputs_1 != 0 {
            self.cur_stage = FINAL_STAGE;
            self.code.push_str("// Final Combiner\n");
            self.add_final_stage_code();
        } else {
            self.add_var_ref("r0");
            self.code.push_str("fragColor = r0;\n");
        }

        if state.alpha_test && state.alpha_func != ALPHA_FUNC_ALWAYS {
            preflight.push_str("uniform float alphaRef;\n");
            if state.alpha_func == ALPHA_FUNC_NEVER {
                self.code.push_str("discard;\n");
            } else {
                let op = match state.alpha_func {
                    1 => "<",
                    2 => "==",
                    3 => "<=",
                    4 => ">",
                    5 => "!=",
                    6 => ">=",
                    func => panic!("unknown alpha function {}", func),
                };
                self.code
                    .push_str(&format!("if (!(fragColor.a {} alphaRef)) discard;\n", op));
            }
        }

        for name in &self.const_refs {
            preflight.push_str(&format!("uniform vec4 {};\n", name));
        }
        for name in &self.var_refs {
            vars.push_str(&format!("vec4 {};\n", name));
            if name == "r0" {
                if self.tex_modes[0] != TEX_NONE {
                    vars.push_str("r0.a = t0.a;\n");
                } else {
                    vars.push_str("r0.a = 1.0;\n");
                }
            }
        }

        let mut source = String::from("#version 330\n\n");
        source.push_str(&preflight);
        source.push_str("void main() {\n");
        source.push_str(&clip);
        source.push_str(&vars);
        source.push_str(&self.code);
        source.push_str("}\n");
        source
    }
}

const ALPHA_FUNC_NEVER: u32 = 0;
const ALPHA_FUNC_ALWAYS: u32 = 7;

fn map_output(value: &str, mapping: u32) -> String {
    match mapping {
        OUT_IDENTITY => value.to_owned(),
        OUT_BIAS => format!("({} - 0.5)", value),
        OUT_SHIFTLEFT_1 => format!("({} * 2.0)", value),
        OUT_SHIFTLEFT_1_BIAS => format!("(({} - 0.5) * 2.0)", value),
        OUT_SHIFTLEFT_2 => format!("({} * 4.0)", value),
        OUT_SHIFTRIGHT_1 => format!("({} / 2.0)", value),
        _ => panic!("invalid combiner output mapping 0x{:X}", mapping),
    }
}

/// Translates the combiner state into fragment shader source
pub fn translate(state: &PshState) -> String {
    PixelShader::new(state).translate()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One stage writing `v0 * 1` into r0, then the final combiner
    /// outputting r0
    fn passthrough_state() -> PshState {
        PshState {
            combiner_control: 1,
            // a = v0.rgb, b = zero inverted (one)
            rgb_inputs: [0x0420_0000, 0, 0, 0, 0, 0, 0, 0],
            // ab into r0
            rgb_outputs: [0x0000_00C0, 0, 0, 0, 0, 0, 0, 0],
            // d = r0.rgb
            final_inputs_0: 0x0000_000C,
            // g = v0.a
            final_inputs_1: 0x0000_1400,
            smooth_shading: true,
            ..PshState::default()
        }
    }

    #[test]
    fn single_stage_into_final_combiner() {
        let source = translate(&passthrough_state());

        assert!(source.starts_with("#version 330\n"));
        assert!(source.contains("// Stage 0\n"));
        assert!(source.contains("ab.rgb = clamp(vec3((max(v0.rgb, 0.0) * (1.0 - clamp(vec4(0.0).rgb, 0.0, 1.0)))), -1.0, 1.0);\n"));
        assert!(source.contains("r0.rgb = ab.rgb;\n"));
        assert!(source.contains("// Final Combiner\n"));
        assert!(source.contains("fragColor.rgb = max(r0.rgb, 0.0) + mix("));
        assert!(source.contains("fragColor.a = max(v0.a, 0.0);\n"));
        // r0 takes its alpha from the vertex color when no texture is read
        assert!(source.contains("vec4 r0;\nr0.a = 1.0;\n"));
        assert!(source.contains("noperspective in vec4 vtxD0;"));
    }

    #[test]
    fn flat_shading_divides_by_flat_w() {
        let mut state = passthrough_state();
        state.smooth_shading = false;
        let source = translate(&state);
        assert!(source.contains("flat in vec4 vtxD0;"));
        assert!(source.contains("vec4 pD0 = vtxD0 / vtx_inv_w_flat;"));
    }

    #[test]
    fn unique_constants_are_named_per_stage() {
        let mut state = passthrough_state();
        state.combiner_control = 2 | (COUNT_UNIQUE_C0 << 8);
        // stage 1: a = c0, b = c1
        state.rgb_inputs[1] = 0x0102_0000;
        state.rgb_outputs[1] = 0x0000_00C0;
        let source = translate(&state);

        assert!(source.contains("uniform vec4 c0_1;"));
        assert!(source.contains("uniform vec4 c1_0;"));
        assert!(!source.contains("uniform vec4 c0_0;"));
    }

    #[test]
    fn alpha_test_and_textures() {
        let mut state = passthrough_state();
        state.alpha_test = true;
        state.alpha_func = 4;
        state.shader_stage_program = TEX_PROJECT2D | (TEX_CUBEMAP << 5);
        state.rect_tex[0] = true;
        state.alphakill[1] = true;
        let source = translate(&state);

        assert!(source.contains("uniform float alphaRef;"));
        assert!(source.contains("if (!(fragColor.a > alphaRef)) discard;"));
        assert!(source.contains("uniform sampler2DRect texSamp0;"));
        assert!(source.contains("vec4 t0 = textureProj(texSamp0, pT0.xyw);"));
        assert!(source.contains("uniform samplerCube texSamp1;"));
        assert!(source.contains("if (t1.a == 0.0) { discard; };"));
        assert!(source.contains("r0.a = t0.a;"));
        assert!(!source.contains("texSamp2"));
    }

    #[test]
    fn window_clip_modes() {
        let mut state = passthrough_state();
        let inclusive = translate(&state);
        assert!(inclusive.contains("/*  Window-clip (Inclusive) */"));
        assert!(inclusive.contains("if (!clipContained) {"));

        state.window_clip_exclusive = true;
        let exclusive = translate(&state);
        assert!(exclusive.contains("/*  Window-clip (Exclusive) */"));
        assert!(!exclusive.contains("clipContained"));
    }

    #[test]
    fn disabled_final_combiner_outputs_r0() {
        let mut state = passthrough_state();
        state.final_inputs_0 = 0;
        state.final_inputs_1 = 0;
        let source = translate(&state);
        assert!(source.contains("fragColor = r0;"));
        assert!(!source.contains("// Final Combiner"));
    }

    #[test]
    #[should_panic]
    fn ef_product_outside_final_combiner_panics() {
        let mut state = passthrough_state();
        state.rgb_inputs[0] = 0x0F00_0000;
        translate(&state);
    }
}

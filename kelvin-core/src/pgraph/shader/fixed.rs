//! GLSL emulation of the fixed function transform and lighting pipeline.

use super::super::transform::*;
use super::{c_mat4, FixedFunctionState, Foggen, LightType, MaterialSource, Skinning, Texgen};

const VERTEX_ATTRIBUTE_DEFINES: &str = "\
#define position      v0
#define weight        v1
#define normal        v2.xyz
#define diffuse       v3
#define specular      v4
#define fogCoord      v5.x
#define pointSize     v6
#define backDiffuse   v7
#define backSpecular  v8
#define texture0      v9
#define texture1      v10
#define texture2      v11
#define texture3      v12
#define reserved1     v13
#define reserved2     v14
#define reserved3     v15

";

const COMPONENTS: [char; 4] = ['x', 'y', 'z', 'w'];

fn header_defines() -> String {
    let mut defines = String::from(VERTEX_ATTRIBUTE_DEFINES);
    defines.push_str(&format!(
        "uniform vec4 ltctxa[{}];\nuniform vec4 ltctxb[{}];\nuniform vec4 ltc1[{}];\n\n",
        LTCTXA_COUNT, LTCTXB_COUNT, LTC1_COUNT
    ));
    defines.push_str(&format!("#define projectionMat {}\n", c_mat4(XFCTX_PMAT0)));
    defines.push_str(&format!("#define compositeMat {}\n\n", c_mat4(XFCTX_CMAT0)));

    let texgen_planes = [XFCTX_TG0MAT, XFCTX_TG1MAT, XFCTX_TG2MAT, XFCTX_TG3MAT];
    for (i, row) in texgen_planes.into_iter().enumerate() {
        for (j, plane) in ['S', 'T', 'R', 'Q'].into_iter().enumerate() {
            defines.push_str(&format!("#define texPlane{}{} c[{}]\n", plane, i, row + j));
        }
        defines.push('\n');
    }

    let model_view = [XFCTX_MMAT0, XFCTX_MMAT1, XFCTX_MMAT2, XFCTX_MMAT3];
    for (i, row) in model_view.into_iter().enumerate() {
        defines.push_str(&format!("#define modelViewMat{} {}\n", i, c_mat4(row)));
    }
    defines.push('\n');
    let inverse_model_view = [XFCTX_IMMAT0, XFCTX_IMMAT1, XFCTX_IMMAT2, XFCTX_IMMAT3];
    for (i, row) in inverse_model_view.into_iter().enumerate() {
        defines.push_str(&format!("#define invModelViewMat{} {}\n", i, c_mat4(row)));
    }
    defines.push('\n');
    defines.push_str(&format!("#define eyePosition c[{}]\n\n", XFCTX_EYEP));

    defines.push_str(&format!(
        "#define lightAmbientColor(i) ltctxb[{} + (i)*6].xyz\n\
         #define lightDiffuseColor(i) ltctxb[{} + (i)*6].xyz\n\
         #define lightSpecularColor(i) ltctxb[{} + (i)*6].xyz\n\n",
        LTCTXB_L0_AMB, LTCTXB_L0_DIF, LTCTXB_L0_SPC
    ));
    defines.push_str(&format!(
        "#define lightSpotFalloff(i) ltctxa[{} + (i)*2].xyz\n\
         #define lightSpotDirection(i) ltctxa[{} + (i)*2]\n\n",
        LTCTXA_L0_K, LTCTXA_L0_SPT
    ));
    defines.push_str(&format!(
        "#define lightLocalRange(i) ltc1[{} + (i)].x\n\n",
        LTC1_R0
    ));
    defines.push_str(&format!(
        "#define sceneAmbientColor ltctxa[{}].xyz\n\
         #define materialEmissionColor ltctxa[{}].xyz\n\n",
        LTCTXA_FR_AMB, LTCTXA_CM_COL
    ));
    defines.push_str("uniform mat4 invViewport;\n");
    defines
}

fn skinning_code(
    code: &mut String,
    skinning: Skinning,
    ty: &str,
    output: &str,
    input: &str,
    matrix: &str,
    swizzle: &str,
) {
    let (mix, count) = match skinning {
        Skinning::Off => (false, 0),
        Skinning::Weights1 => (true, 2),
        Skinning::Weights2Matrices2 => (false, 2),
        Skinning::Weights2 => (true, 3),
        Skinning::Weights3Matrices3 => (false, 3),
        Skinning::Weights3 => (true, 4),
        Skinning::Weights4Matrices4 => (false, 4),
    };

    if count == 0 {
        code.push_str(&format!(
            "{} {} = ({} * {}0).{};\n",
            ty, output, input, matrix, swizzle
        ));
        return;
    }

    code.push_str(&format!("{} {} = {}(0.0);\n", ty, output, ty));
    if mix {
        // the last weight completes the others to one
        code.push_str("{\n  float weight_i;\n  float weight_n = 1.0;\n");
        for i in 0..count {
            if i < count - 1 {
                code.push_str(&format!(
                    "  weight_i = weight.{};\n  weight_n -= weight_i;\n",
                    COMPONENTS[i]
                ));
            } else {
                code.push_str("  weight_i = weight_n;\n");
            }
            code.push_str(&format!(
                "  {} += ({} * {}{}).{} * weight_i;\n",
                output, input, matrix, i, swizzle
            ));
        }
        code.push_str("}\n");
    } else {
        for (i, c) in COMPONENTS.iter().enumerate().take(count) {
            code.push_str(&format!(
                "{} += ({} * {}{}).{} * weight.{};\n",
                output, input, matrix, i, swizzle, c
            ));
        }
    }
}

fn texgen_code(code: &mut String, state: &FixedFunctionState) {
    for (i, texgen) in state.texgen.iter().enumerate() {
        code.push_str(&format!("/* Texgen for stage {} */\n", i));
        for (j, mode) in texgen.iter().enumerate() {
            let c = COMPONENTS[j];
            let plane = ['S', 'T', 'R', 'Q'][j];
            match mode {
                Texgen::Disable => {
                    code.push_str(&format!("oT{}.{} = texture{}.{};\n", i, c, i, c));
                }
                Texgen::EyeLinear => {
                    code.push_str(&format!(
                        "oT{}.{} = dot(texPlane{}{}, tPosition);\n",
                        i, c, plane, i
                    ));
                }
                Texgen::ObjectLinear => {
                    code.push_str(&format!(
                        "oT{}.{} = dot(texPlane{}{}, position);\n",
                        i, c, plane, i
                    ));
                }
                Texgen::SphereMap => {
                    assert!(j < 2, "sphere map texgen on channel {}", plane);
                    code.push_str(
                        "{\n\
                         \x20 vec3 u = normalize(tPosition.xyz);\n\
                         \x20 vec3 r = reflect(u, tNormal);\n\
                         \x20 float invM = 1.0 / (2.0 * length(r + vec3(0.0, 0.0, 1.0)));\n",
                    );
                    code.push_str(&format!("  oT{}.{} = r.{} * invM + 0.5;\n}}\n", i, c, c));
                }
                Texgen::ReflectionMap => {
                    assert!(j < 3, "reflection map texgen on channel {}", plane);
                    code.push_str(
                        "{\n\
                         \x20 vec3 u = normalize(tPosition.xyz);\n\
                         \x20 vec3 r = reflect(u, tNormal);\n",
                    );
                    code.push_str(&format!("  oT{}.{} = r.{};\n}}\n", i, c, c));
                }
                Texgen::NormalMap => {
                    assert!(j < 3, "normal map texgen on channel {}", plane);
                    code.push_str(&format!("oT{}.{} = tNormal.{};\n", i, c, c));
                }
            }
        }
    }

    for (i, enabled) in state.texture_matrix_enable.iter().enumerate() {
        if *enabled {
            code.push_str(&format!("oT{0} = oT{0} * texMat{0};\n", i));
        }
    }
}

fn lighting_code(uniforms: &mut String, code: &mut String, state: &FixedFunctionState) {
    let alpha_source = match state.diffuse_src {
        MaterialSource::Material => {
            uniforms.push_str("uniform float material_alpha;\n");
            "material_alpha"
        }
        MaterialSource::Diffuse => "diffuse.a",
        MaterialSource::Specular => "specular.a",
    };
    let ambient = match state.ambient_src {
        MaterialSource::Material => "sceneAmbientColor",
        MaterialSource::Diffuse => "diffuse.rgb",
        MaterialSource::Specular => "specular.rgb",
    };
    code.push_str(&format!("oD0 = vec4({}, {});\n", ambient, alpha_source));
    code.push_str("oD0.rgb *= materialEmissionColor.rgb;\n");
    let emission = match state.emission_src {
        MaterialSource::Material => "sceneAmbientColor",
        MaterialSource::Diffuse => "diffuse.rgb",
        MaterialSource::Specular => "specular.rgb",
    };
    code.push_str(&format!("oD0.rgb += {};\n", emission));
    code.push_str("oD1 = vec4(0.0, 0.0, 0.0, specular.a);\n");

    for (i, light) in state.light.iter().enumerate() {
        if *light == LightType::Off {
            continue;
        }
        code.push_str(&format!("/* Light {} */ {{\n", i));

        if matches!(light, LightType::Local | LightType::Spot) {
            uniforms.push_str(&format!(
                "uniform vec3 lightLocalPosition{0};\nuniform vec3 lightLocalAttenuation{0};\n",
                i
            ));
            code.push_str(&format!(
                "  vec3 VP = lightLocalPosition{0} - tPosition.xyz/tPosition.w;\n\
                 \x20 float d = length(VP);\n\
                 \x20 VP = normalize(VP);\n\
                 \x20 float attenuation = 1.0 / (lightLocalAttenuation{0}.x\n\
                 \x20                              + lightLocalAttenuation{0}.y * d\n\
                 \x20                              + lightLocalAttenuation{0}.z * d * d);\n\
                 \x20 vec3 halfVector = normalize(VP + eyePosition.xyz / eyePosition.w);\n\
                 \x20 float nDotVP = max(0.0, dot(tNormal, VP));\n\
                 \x20 float nDotHV = max(0.0, dot(tNormal, halfVector));\n",
                i
            ));
        }

        match light {
            LightType::Infinite => {
                uniforms.push_str(&format!(
                    "uniform vec3 lightInfiniteHalfVector{0};\nuniform vec3 lightInfiniteDirection{0};\n",
                    i
                ));
                code.push_str(&format!(
                    "  float attenuation = 1.0;\n\
                     \x20 float nDotVP = max(0.0, dot(tNormal, normalize(vec3(lightInfiniteDirection{0}))));\n\
                     \x20 float nDotHV = max(0.0, dot(tNormal, vec3(lightInfiniteHalfVector{0})));\n",
                    i
                ));
            }
            LightType::Spot => {
                code.push_str(&format!(
                    "  vec4 spotDir = lightSpotDirection({});\n\
                     \x20 float invScale = 1/length(spotDir.xyz);\n\
                     \x20 float cosHalfPhi = -invScale*spotDir.w;\n\
                     \x20 float cosHalfTheta = invScale + cosHalfPhi;\n\
                     \x20 float spotDirDotVP = dot(spotDir.xyz, VP);\n\
                     \x20 float rho = invScale*spotDirDotVP;\n\
                     \x20 if (rho > cosHalfTheta) {{\n\
                     \x20 }} else if (rho <= cosHalfPhi) {{\n\
                     \x20   attenuation = 0.0;\n\
                     \x20 }} else {{\n\
                     \x20   attenuation *= spotDirDotVP + spotDir.w;\n\
                     \x20 }}\n",
                    i
                ));
            }
            LightType::Local | LightType::Off => {}
        }

        code.push_str(&format!(
            "  float pf;\n\
             \x20 if (nDotVP == 0.0) {{\n\
             \x20   pf = 0.0;\n\
             \x20 }} else {{\n\
             \x20   pf = pow(nDotHV, 0.001);\n\
             \x20 }}\n\
             \x20 vec3 lightAmbient = lightAmbientColor({0}) * attenuation;\n\
             \x20 vec3 lightDiffuse = lightDiffuseColor({0}) * attenuation * nDotVP;\n\
             \x20 vec3 lightSpecular = lightSpecularColor({0}) * pf;\n",
            i
        ));
        code.push_str("  oD0.xyz += lightAmbient;\n");
        code.push_str(match state.diffuse_src {
            MaterialSource::Material => "  oD0.xyz += lightDiffuse;\n",
            MaterialSource::Diffuse => "  oD0.xyz += diffuse.xyz * lightDiffuse;\n",
            MaterialSource::Specular => "  oD0.xyz += specular.xyz * lightDiffuse;\n",
        });
        code.push_str("  oD1.xyz += specular.xyz * lightSpecular;\n");
        code.push_str("}\n");
    }
}

/// Appends the fixed function vertex stage. With fog enabled the body
/// declares `fogDistance` for the fog factor computed after it.
pub(super) fn translate(
    state: &FixedFunctionState,
    fog_enable: bool,
    header: &mut String,
    body: &mut String,
) {
    header.push_str(&header_defines());

    body.push_str(&format!("/* Skinning mode {:?} */\n", state.skinning));
    skinning_code(
        body,
        state.skinning,
        "vec4",
        "tPosition",
        "position",
        "modelViewMat",
        "xyzw",
    );
    skinning_code(
        body,
        state.skinning,
        "vec3",
        "tNormal",
        "vec4(normal, 0.0)",
        "invModelViewMat",
        "xyz",
    );
    if state.normalization {
        body.push_str("tNormal = normalize(tNormal);\n");
    }

    texgen_code(body, state);

    if state.lighting {
        lighting_code(header, body, state);
    } else {
        body.push_str("  oD0 = diffuse;\n  oD1 = specular;\n");
    }
    body.push_str("  oB0 = backDiffuse;\n  oB1 = backSpecular;\n");

    if fog_enable {
        match state.foggen {
            Foggen::SpecularAlpha => {
                body.push_str("  float fogDistance = clamp(specular.a, 0.0, 1.0);\n");
            }
            Foggen::Radial => body.push_str("  float fogDistance = length(tPosition.xyz);\n"),
            Foggen::Planar | Foggen::AbsPlanar => {
                body.push_str(
                    "  float fogDistance = dot(fogPlane.xyz, tPosition.xyz) + fogPlane.w;\n",
                );
                if state.foggen == Foggen::AbsPlanar {
                    body.push_str("  fogDistance = abs(fogDistance);\n");
                }
            }
            Foggen::FogX => body.push_str("  float fogDistance = fogCoord;\n"),
        }
    }

    // without skinning the composite matrix includes the model view
    if state.skinning == Skinning::Off {
        body.push_str("  tPosition = position;\n");
    }
    body.push_str(
        "   oPos = invViewport * (tPosition * compositeMat);\n\
         \x20  oPos.z = oPos.z * 2.0 - oPos.w;\n",
    );
    body.push_str("  oPts.x = 1.0;\n");

    body.push_str(
        "  if (oPos.w == 0.0 || isinf(oPos.w)) {\n\
         \x20   vtx_inv_w = 1.0;\n\
         \x20 } else {\n\
         \x20   vtx_inv_w = 1.0 / oPos.w;\n\
         \x20 }\n\
         \x20 vtx_inv_w_flat = vtx_inv_w;\n",
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(state: &FixedFunctionState, fog_enable: bool) -> (String, String) {
        let mut header = String::new();
        let mut body = String::new();
        translate(state, fog_enable, &mut header, &mut body);
        (header, body)
    }

    #[test]
    fn passthrough_without_lighting() {
        let (header, body) = generate(&FixedFunctionState::default(), false);

        assert!(header.contains("#define texPlaneQ3 c[91]\n"));
        assert!(header.contains("#define eyePosition c[56]\n"));
        assert!(header.contains("uniform vec4 ltctxb[52];"));
        assert!(body.contains("vec4 tPosition = (position * modelViewMat0).xyzw;\n"));
        assert!(body.contains("oT2.w = texture2.w;\n"));
        assert!(body.contains("  tPosition = position;\n"));
        assert!(!body.contains("fogDistance"));
    }

    #[test]
    fn mixed_skinning_derives_last_weight() {
        let state = FixedFunctionState {
            skinning: Skinning::Weights1,
            ..FixedFunctionState::default()
        };
        let (_, body) = generate(&state, false);

        assert!(body.contains("vec4 tPosition = vec4(0.0);\n"));
        assert!(body.contains("  weight_i = weight.x;\n"));
        assert!(body.contains("  weight_i = weight_n;\n"));
        assert!(body.contains("  tPosition += (position * modelViewMat1).xyzw * weight_i;\n"));
        assert!(!body.contains("  tPosition = position;\n"));
    }

    #[test]
    fn lights_declare_their_uniforms() {
        let mut state = FixedFunctionState {
            lighting: true,
            ..FixedFunctionState::default()
        };
        state.light[0] = LightType::Infinite;
        state.light[3] = LightType::Spot;
        let (header, body) = generate(&state, false);

        assert!(header.contains("uniform float material_alpha;"));
        assert!(header.contains("uniform vec3 lightInfiniteDirection0;"));
        assert!(header.contains("uniform vec3 lightLocalPosition3;"));
        assert!(!header.contains("lightLocalPosition0"));
        assert!(body.contains("/* Light 3 */ {\n"));
        assert!(body.contains("lightSpotDirection(3)"));
        assert!(!body.contains("/* Light 1 */"));
    }

    #[test]
    fn texgen_and_fog() {
        let mut state = FixedFunctionState {
            foggen: Foggen::AbsPlanar,
            ..FixedFunctionState::default()
        };
        state.texgen[1][0] = Texgen::EyeLinear;
        state.texgen[1][1] = Texgen::SphereMap;
        state.texture_matrix_enable[1] = true;
        let (_, body) = generate(&state, true);

        assert!(body.contains("oT1.x = dot(texPlaneS1, tPosition);\n"));
        assert!(body.contains("  oT1.y = r.y * invM + 0.5;\n"));
        assert!(body.contains("oT1 = oT1 * texMat1;\n"));
        assert!(body.contains("  fogDistance = abs(fogDistance);\n"));
    }

    #[test]
    #[should_panic(expected = "sphere map")]
    fn sphere_map_on_r_channel_panics() {
        let mut state = FixedFunctionState::default();
        state.texgen[0][2] = Texgen::SphereMap;
        generate(&state, false);
    }
}

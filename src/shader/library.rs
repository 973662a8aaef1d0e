//! Built-in stage specifications used by the engine pipeline.
//!
//! Sources are GLSL 330; backends that need another language translate them
//! or substitute their own text keyed on the declared interface.

use glam::Vec2;

use crate::backend::DataType;
use crate::shader::{
    ShaderAttribute, ShaderStageSpecification, ShaderStageType, ShaderTexture, ShaderUniform,
};

pub const FULL_SCREEN_QUAD_VERT: &str = r#"
#version 330 core
in vec2 a_position;
out vec2 v_uv;
void main() {
    v_uv = a_position * 0.5 + 0.5;
    gl_Position = vec4(a_position, 0.0, 1.0);
}
"#;

pub const LIGHTING_FRAG: &str = r#"
#version 330 core
uniform sampler2D t_gbuffer_color;
uniform float u_exposure;
uniform float u_gamma;
in vec2 v_uv;
layout(location = 0) out vec4 outputF;
void main() {
    vec4 color = texture(t_gbuffer_color, v_uv);
    vec3 mapped = vec3(1.0) - exp(-color.rgb * u_exposure);
    outputF = vec4(pow(mapped, vec3(1.0 / u_gamma)), color.a);
}
"#;

pub const PASS_THROUGH_FRAG: &str = r#"
#version 330 core
uniform sampler2D t_image;
in vec2 v_uv;
layout(location = 0) out vec4 outputF;
void main() {
    outputF = texture(t_image, v_uv);
}
"#;

/// Two triangles covering clip space, for `a_position`
pub const FULL_SCREEN_QUAD: [Vec2; 6] = [
    Vec2::new(-1.0, -1.0),
    Vec2::new(1.0, -1.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(-1.0, -1.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(-1.0, 1.0),
];

fn full_screen_vertex() -> ShaderStageSpecification {
    ShaderStageSpecification::new(ShaderStageType::Vertex, FULL_SCREEN_QUAD_VERT)
        .with_attribute(ShaderAttribute::new("a_position", DataType::Vector2Float))
}

/// Tone-mapping pass that turns the G-buffer color into the display image
pub fn lighting_stages() -> Vec<ShaderStageSpecification> {
    vec![
        full_screen_vertex(),
        ShaderStageSpecification::new(ShaderStageType::Fragment, LIGHTING_FRAG)
            .with_texture(ShaderTexture::new("t_gbuffer_color", 2))
            .with_uniform(ShaderUniform::new("u_exposure", DataType::Float))
            .with_uniform(ShaderUniform::new("u_gamma", DataType::Float))
            .with_output_loc("outputF"),
    ]
}

/// Copies `t_image` to the bound target unchanged
pub fn pass_through_stages() -> Vec<ShaderStageSpecification> {
    vec![
        full_screen_vertex(),
        ShaderStageSpecification::new(ShaderStageType::Fragment, PASS_THROUGH_FRAG)
            .with_texture(ShaderTexture::new("t_image", 2))
            .with_output_loc("outputF"),
    ]
}

//! Common utilities for resource and pipeline integration tests.
//!
//! Every test runs against the headless backend; the context keeps a probe
//! sharing the backend state so tests can inspect what reached it.

use glam::{Vec3, Vec4};
use rstest::fixture;

use viz_render::{
    DataType, DrawMode, Engine, EngineConfig, HeadlessBackend, ShaderAttribute, ShaderProgram,
    ShaderStageSpecification, ShaderStageType, ShaderUniform, Shared,
};

/// Route `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Test Context
// ============================================================================

/// Engine plus a probe into its backend.
pub struct TestContext {
    pub probe: HeadlessBackend,
    pub engine: Engine,
}

impl TestContext {
    /// Create an uninitialized engine of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        init_logging();
        let probe = HeadlessBackend::new();
        let engine = Engine::new(
            probe.clone(),
            EngineConfig {
                width,
                height,
                ..Default::default()
            },
        );
        Self { probe, engine }
    }

    /// Create and initialize an engine of the given size.
    pub fn initialized(width: u32, height: u32) -> Self {
        let mut ctx = Self::new(width, height);
        ctx.engine
            .initialize()
            .expect("headless engine should initialize");
        ctx
    }

    /// Link a program drawing colored geometry from `a_position`/`a_normal`.
    #[allow(dead_code)]
    pub fn create_surface_program(&self, draw_mode: DrawMode) -> Shared<ShaderProgram> {
        self.engine
            .generate_shader_program(&surface_stages(), draw_mode, None)
            .expect("surface program should link")
    }
}

/// Small initialized context.
#[allow(dead_code)]
#[fixture]
pub fn ctx() -> TestContext {
    TestContext::initialized(16, 8)
}

// ============================================================================
// Stage Specifications
// ============================================================================

/// Vertex + fragment stages with two attributes and a shared uniform.
pub fn surface_stages() -> Vec<ShaderStageSpecification> {
    vec![
        ShaderStageSpecification::new(ShaderStageType::Vertex, "// surface vertex")
            .with_attribute(ShaderAttribute::new("a_position", DataType::Vector3Float))
            .with_attribute(ShaderAttribute::new("a_normal", DataType::Vector3Float))
            .with_uniform(ShaderUniform::new("u_viewProj", DataType::Matrix44Float)),
        ShaderStageSpecification::new(ShaderStageType::Fragment, "// surface fragment")
            .with_uniform(ShaderUniform::new("u_viewProj", DataType::Matrix44Float))
            .with_uniform(ShaderUniform::new("u_color", DataType::Vector3Float))
            .with_output_loc("outputF"),
    ]
}

// ============================================================================
// Geometry & Data Helpers
// ============================================================================

/// `count` distinct positions along the x axis.
#[allow(dead_code)]
pub fn line_of_points(count: usize) -> Vec<Vec3> {
    (0..count).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect()
}

/// Deterministic RGBA8 pattern with a distinct value per texel.
#[allow(dead_code)]
pub fn generate_test_pattern(width: u32, height: u32) -> Vec<u8> {
    (0..width * height)
        .flat_map(|i| {
            let v = (i * 7 % 256) as u8;
            [v, 255 - v, v / 2, 255]
        })
        .collect()
}

// ============================================================================
// Verification Helpers
// ============================================================================

/// RGBA8 texel at `(x, y)` of a tightly packed image, as floats.
#[allow(dead_code)]
pub fn rgba8_texel(data: &[u8], width: u32, x: u32, y: u32) -> Vec4 {
    let offset = ((y * width + x) * 4) as usize;
    Vec4::new(
        data[offset] as f32 / 255.0,
        data[offset + 1] as f32 / 255.0,
        data[offset + 2] as f32 / 255.0,
        data[offset + 3] as f32 / 255.0,
    )
}

/// Check two colors match within `tolerance` per channel.
#[allow(dead_code)]
pub fn colors_match(actual: Vec4, expected: Vec4, tolerance: f32) -> bool {
    (actual - expected).abs().max_element() <= tolerance
}

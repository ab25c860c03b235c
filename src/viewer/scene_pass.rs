use cgmath::{Matrix4, PerspectiveFov, Rad};
use glium::index::{NoIndices, PrimitiveType};
use glium::{Frame, Program, Surface, VertexBuffer};

use super::{FOV_Y, Z_FAR, Z_NEAR};
use crate::primitives::Primitives;

pub type Display = glium::Display<glium::glutin::surface::WindowSurface>;

/// GL pass that draws a `Primitives` batch.
///
/// The batch is rebuilt on the CPU every frame (a few thousand triangles at
/// most), so vertices are uploaded fresh each draw rather than cached.
pub struct ScenePass {
    program: Program,
}

impl ScenePass {
    pub fn new(display: &Display) -> ScenePass {
        let vertex_shader = include_str!("shaders/vert.glsl");
        let fragment_shader = include_str!("shaders/frag.glsl");
        let program_args = glium::program::ProgramCreationInput::SourceCode {
            vertex_shader,
            fragment_shader,
            geometry_shader: None,
            tessellation_control_shader: None,
            tessellation_evaluation_shader: None,
            transform_feedback_varyings: None,
            outputs_srgb: true,
            uses_point_size: false,
        };
        let program = Program::new(display, program_args).unwrap();

        ScenePass { program }
    }

    pub fn draw(
        &self,
        display: &Display,
        target: &mut Frame,
        prims: &Primitives,
        aspect_ratio: f32,
    ) {
        let vertex_buffer = VertexBuffer::new(display, &prims.vertices).unwrap();

        let persp: Matrix4<f32> = PerspectiveFov {
            fovy: Rad(FOV_Y),
            aspect: aspect_ratio,
            near: Z_NEAR,
            far: Z_FAR,
        }
        .into();
        let persp_matrix: [[f32; 4]; 4] = persp.into();

        let draw_params = glium::DrawParameters {
            depth: glium::Depth {
                test: glium::draw_parameters::DepthTest::IfLess,
                write: true,
                ..Default::default()
            },
            ..Default::default()
        };

        for call in &prims.draw_calls {
            let vertices = vertex_buffer.slice(call.vertex_range.clone()).unwrap();
            let uniforms = uniform! {
                persp_matrix: persp_matrix,
                // Sun direction, in view space.
                light_vec: [0.3, -0.6, -0.74f32],
                color: call.color,
            };
            target
                .draw(
                    vertices,
                    &NoIndices(PrimitiveType::TrianglesList),
                    &self.program,
                    &uniforms,
                    &draw_params,
                )
                .unwrap();
        }
    }
}

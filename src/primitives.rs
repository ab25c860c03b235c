//! Intermediate representation of renderable geometry.
//!
//! `Primitives` is a flat triangle list plus a list of draw calls, the sort
//! of thing the GL layer can hand to `glDrawArrays` without knowing anything
//! about skeletons or terrain. The scene builds one of these per frame; the
//! viewer uploads it and draws each call with its color.
//!
//! Positions and normals are already in view space: emitters pass the view
//! matrix down and `push_tri` applies it, so the shader only needs to apply
//! the perspective projection.

use cgmath::{Matrix4, Vector3};
use std::ops::Range;

#[derive(Copy, Clone)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

// For glium
implement_vertex!(Vertex, position, normal);

/// A run of triangles drawn with one material color.
pub struct DrawCall {
    /// The range of `vertices` this call covers.
    pub vertex_range: Range<usize>,
    /// RGBA material color.
    pub color: [f32; 4],
}

pub struct Primitives {
    pub vertices: Vec<Vertex>,
    pub draw_calls: Vec<DrawCall>,

    call_start: usize,
    call_color: [f32; 4],
}

impl Primitives {
    pub fn new() -> Primitives {
        Primitives {
            vertices: vec![],
            draw_calls: vec![],
            call_start: 0,
            call_color: [1.0, 1.0, 1.0, 1.0],
        }
    }

    /// Begins a draw call. Every triangle pushed until the matching `end`
    /// is drawn with `color`.
    pub fn begin(&mut self, color: [f32; 4]) {
        self.call_start = self.vertices.len();
        self.call_color = color;
    }

    /// Closes the draw call opened by `begin`. Empty calls are dropped.
    pub fn end(&mut self) {
        let range = self.call_start..self.vertices.len();
        if range.start < range.end {
            self.draw_calls.push(DrawCall {
                vertex_range: range,
                color: self.call_color,
            });
        }
        self.call_start = self.vertices.len();
    }

    /// Pushes one triangle, transforming positions (w = 1) and the shared
    /// normal (w = 0) by `view`.
    pub fn push_tri(
        &mut self,
        view: &Matrix4<f32>,
        p: Vector3<f32>,
        q: Vector3<f32>,
        r: Vector3<f32>,
        normal: Vector3<f32>,
    ) {
        let n: [f32; 3] = (view * normal.extend(0.0)).truncate().into();
        for &pos in &[p, q, r] {
            let v: [f32; 3] = (view * pos.extend(1.0)).truncate().into();
            self.vertices.push(Vertex { position: v, normal: n });
        }
    }

    pub fn num_triangles(&self) -> usize {
        self.vertices.len() / 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{vec3, Deg, Matrix4, SquareMatrix};

    #[test]
    fn draw_calls_cover_pushed_ranges() {
        let view = Matrix4::identity();
        let mut prims = Primitives::new();

        prims.begin([1.0, 0.0, 0.0, 1.0]);
        prims.push_tri(&view, vec3(0.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0), vec3(0.0, 1.0, 0.0), vec3(0.0, 0.0, 1.0));
        prims.end();

        // Empty calls vanish.
        prims.begin([0.0, 1.0, 0.0, 1.0]);
        prims.end();

        prims.begin([0.0, 0.0, 1.0, 1.0]);
        prims.push_tri(&view, vec3(0.0, 0.0, 1.0), vec3(1.0, 0.0, 1.0), vec3(0.0, 1.0, 1.0), vec3(0.0, 0.0, 1.0));
        prims.push_tri(&view, vec3(0.0, 0.0, 2.0), vec3(1.0, 0.0, 2.0), vec3(0.0, 1.0, 2.0), vec3(0.0, 0.0, 1.0));
        prims.end();

        assert_eq!(prims.num_triangles(), 3);
        assert_eq!(prims.draw_calls.len(), 2);
        assert_eq!(prims.draw_calls[0].vertex_range, 0..3);
        assert_eq!(prims.draw_calls[1].vertex_range, 3..9);
    }

    #[test]
    fn view_transform_applies_to_positions_not_normals_w() {
        // A pure translation moves positions but leaves normals alone.
        let view = Matrix4::from_translation(vec3(10.0, 0.0, 0.0));
        let mut prims = Primitives::new();
        prims.begin([1.0; 4]);
        prims.push_tri(&view, vec3(0.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0), vec3(0.0, 1.0, 0.0), vec3(0.0, 0.0, 1.0));
        prims.end();

        assert_eq!(prims.vertices[0].position, [10.0, 0.0, 0.0]);
        assert_eq!(prims.vertices[0].normal, [0.0, 0.0, 1.0]);

        // A rotation turns the normal with the triangle.
        let view = Matrix4::from_angle_x(Deg(90.0));
        let mut prims = Primitives::new();
        prims.begin([1.0; 4]);
        prims.push_tri(&view, vec3(0.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0), vec3(0.0, 1.0, 0.0), vec3(0.0, 0.0, 1.0));
        prims.end();

        let n = prims.vertices[0].normal;
        assert!((n[1] - -1.0).abs() < 1.0e-6);
        assert!(n[2].abs() < 1.0e-6);
    }
}

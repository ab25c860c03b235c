//! Flat triangle soups with per-face normals.
//!
//! A `TriangleSoup` is the reusable "renderable surface" capability: three
//! vertices per triangle, one unit normal per triangle, and a method to push
//! the whole thing into a `Primitives` sink. The terrain owns one by
//! composition; standalone soup files can also be loaded directly (the
//! `info` command uses this).

use cgmath::{InnerSpace, Matrix4, Vector3, vec3};
use std::fs;
use std::path::Path;

use crate::errors::{Result, ResultExt};
use crate::primitives::Primitives;

pub struct TriangleSoup {
    /// Three entries per triangle.
    pub vertices: Vec<Vector3<f32>>,
    /// One entry per triangle.
    pub normals: Vec<Vector3<f32>>,
}

impl TriangleSoup {
    pub fn new() -> TriangleSoup {
        TriangleSoup { vertices: vec![], normals: vec![] }
    }

    /// Builds a soup from raw vertices (three per triangle) and computes
    /// the normals.
    pub fn from_vertices(vertices: Vec<Vector3<f32>>) -> TriangleSoup {
        let mut soup = TriangleSoup { vertices, normals: vec![] };
        soup.compute_unit_normals();
        soup
    }

    /// Reads a standalone triangle-soup file: a triangle count followed by
    /// three whitespace-separated x y z triples per triangle.
    pub fn read_file(path: &Path) -> Result<TriangleSoup> {
        let text = fs::read_to_string(path)
            .chain_err(|| format!("couldn't read {}", path.display()))?;
        TriangleSoup::read_str(&text)
    }

    pub fn read_str(text: &str) -> Result<TriangleSoup> {
        let mut tokens = text.split_whitespace();

        let num_triangles = match tokens.next() {
            Some(t) => t.parse::<usize>()?,
            None => bail!("triangle soup file is empty"),
        };
        let num_vertices = 3 * num_triangles;

        let mut floats = Vec::with_capacity(3 * num_vertices);
        for token in tokens.by_ref().take(3 * num_vertices) {
            floats.push(token.parse::<f32>()?);
        }
        if floats.len() != 3 * num_vertices {
            bail!("triangle soup file ended early");
        }

        let vertices = floats
            .chunks(3)
            .map(|c| vec3(c[0], c[1], c[2]))
            .collect();
        Ok(TriangleSoup::from_vertices(vertices))
    }

    pub fn num_triangles(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Recomputes one unit normal per triangle from the cross-product of
    /// two edge vectors. Assumes `vertices` is a whole number of triangles.
    pub fn compute_unit_normals(&mut self) {
        self.normals.clear();
        self.normals.reserve(self.num_triangles());

        for triangle in self.vertices.chunks(3) {
            let u = triangle[1] - triangle[0];
            let v = triangle[2] - triangle[0];
            self.normals.push(u.cross(v).normalize());
        }
    }

    /// Pushes every triangle into the current draw call.
    pub fn render(&self, prims: &mut Primitives, view: &Matrix4<f32>) {
        for (triangle, &normal) in self.vertices.chunks(3).zip(&self.normals) {
            prims.push_tri(view, triangle[0], triangle[1], triangle[2], normal);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Matrix4, SquareMatrix};

    #[test]
    fn normals_are_unit_and_face_up() {
        let soup = TriangleSoup::from_vertices(vec![
            vec3(0.0, 0.0, 0.0),
            vec3(2.0, 0.0, 0.0),
            vec3(0.0, 2.0, 0.0),
        ]);
        assert_eq!(soup.num_triangles(), 1);
        let n = soup.normals[0];
        assert!((n.magnitude() - 1.0).abs() < 1.0e-6);
        assert!((n.z - 1.0).abs() < 1.0e-6);
    }

    #[test]
    fn reads_soup_text() {
        let soup = TriangleSoup::read_str(
            "2\n\
             0 0 0  1 0 0  0 1 0\n\
             0 0 1  1 0 1  0 1 1\n",
        ).unwrap();
        assert_eq!(soup.num_triangles(), 2);
        assert_eq!(soup.vertices[3], vec3(0.0, 0.0, 1.0));
    }

    #[test]
    fn rejects_truncated_soup() {
        assert!(TriangleSoup::read_str("1\n0 0 0  1 0 0\n").is_err());
    }

    #[test]
    fn renders_into_primitives() {
        let soup = TriangleSoup::from_vertices(vec![
            vec3(0.0, 0.0, 0.0),
            vec3(1.0, 0.0, 0.0),
            vec3(0.0, 1.0, 0.0),
        ]);
        let mut prims = Primitives::new();
        prims.begin([1.0; 4]);
        soup.render(&mut prims, &Matrix4::identity());
        prims.end();
        assert_eq!(prims.num_triangles(), 1);
    }
}

//! Height-field terrain.
//!
//! A terrain is a regular grid of elevation samples at a uniform horizontal
//! spacing. The grid is centered at the origin in the XY plane with the raw
//! elevation as Z. Two things are derived from it:
//!
//! * a triangle soup (two triangles per grid cell) used only for rendering,
//! * `height_at`, an analytic point query that recomputes barycentric
//!   weights from the grid indices without touching the triangle soup.
//!
//! Row 0 of the file is the far edge (+Y); rows grow toward -Y, which is why
//! both the triangulation and the query flip the vertical axis.

use cgmath::{Matrix4, Vector3, vec3};
use std::fs;
use std::path::Path;

use crate::errors::{Result, ResultExt};
use crate::primitives::Primitives;
use crate::surface::TriangleSoup;

pub struct Terrain {
    /// Horizontal distance between adjacent samples.
    pub xy_scale: f32,
    /// Row-major elevation grid, at least 2x2.
    pub height_values: Vec<Vec<f32>>,
    /// Derived render geometry.
    pub surface: TriangleSoup,
}

impl Terrain {
    /// Reads a terrain file: `<rows> <cols>` followed by a dense row-major
    /// grid of elevations.
    pub fn read_file(path: &Path, xy_scale: f32) -> Result<Terrain> {
        let text = fs::read_to_string(path)
            .chain_err(|| format!("couldn't read {}", path.display()))?;
        Terrain::read_str(&text, xy_scale)
    }

    pub fn read_str(text: &str, xy_scale: f32) -> Result<Terrain> {
        let mut tokens = text.split_whitespace();

        let mut next_token = |what: &str| -> Result<&str> {
            match tokens.next() {
                Some(t) => Ok(t),
                None => bail!("terrain file ended early (expected {})", what),
            }
        };

        let rows = next_token("row count")?.parse::<usize>()?;
        let cols = next_token("column count")?.parse::<usize>()?;

        let mut height_values = Vec::with_capacity(rows);
        for _ in 0..rows {
            let mut row = Vec::with_capacity(cols);
            for _ in 0..cols {
                row.push(next_token("an elevation")?.parse::<f32>()?);
            }
            height_values.push(row);
        }

        Terrain::from_grid(height_values, xy_scale)
    }

    /// Builds a terrain from an in-memory grid. Fails unless the grid is at
    /// least 2x2 (a single sample has no cells to stand on).
    pub fn from_grid(height_values: Vec<Vec<f32>>, xy_scale: f32) -> Result<Terrain> {
        let rows = height_values.len();
        let cols = height_values.first().map_or(0, |r| r.len());
        if rows < 2 || cols < 2 {
            bail!("terrain grid must be at least 2x2, got {}x{}", rows, cols);
        }

        let mut terrain = Terrain {
            xy_scale,
            height_values,
            surface: TriangleSoup::new(),
        };
        terrain.triangulate();
        Ok(terrain)
    }

    pub fn num_rows(&self) -> usize {
        self.height_values.len()
    }

    pub fn num_cols(&self) -> usize {
        self.height_values[0].len()
    }

    /// Rebuilds the triangle soup: two triangles per cell, grid centered at
    /// the origin, rows flipped so row 0 lands at +Y.
    fn triangulate(&mut self) {
        let rows = self.num_rows();
        let cols = self.num_cols();
        let s = self.xy_scale;
        let mid_x = s * ((cols / 2) as f32);
        let mid_y = s * ((rows / 2) as f32);

        let h = &self.height_values;
        let at = |row: usize, col: usize| -> Vector3<f32> {
            vec3(
                s * (col as f32) - mid_x,
                mid_y - s * (row as f32),
                h[row][col],
            )
        };

        let mut vertices = Vec::with_capacity(3 * 2 * (rows - 1) * (cols - 1));
        for row in 0..rows - 1 {
            for col in 0..cols - 1 {
                // Upper-right triangle of the cell
                vertices.push(at(row, col));
                vertices.push(at(row + 1, col + 1));
                vertices.push(at(row, col + 1));

                // Lower-left triangle
                vertices.push(at(row, col));
                vertices.push(at(row + 1, col));
                vertices.push(at(row + 1, col + 1));
            }
        }

        self.surface = TriangleSoup::from_vertices(vertices);
    }

    /// Elevation of the terrain surface at the world point (x, y).
    ///
    /// Maps the point back into grid index space, picks the triangle of the
    /// containing cell by comparing the fractional remainders against the
    /// cell diagonal, and interpolates the three corner elevations with
    /// barycentric weights (collapsed, since grid triangles are right
    /// triangles with axis-aligned legs).
    ///
    /// The caller is expected to stay within the grid: the cell indices
    /// clamp to the last cell so queries exactly on the far edges stay in
    /// bounds, but anything further out is meaningless.
    pub fn height_at(&self, x: f32, y: f32) -> f32 {
        let rows = self.num_rows();
        let cols = self.num_cols();
        let s = self.xy_scale;

        let total_height = ((rows - 1) as f32) * s;

        // Undo the centering: the origin sits at sample (rows/2, cols/2).
        let x = x + s * ((cols / 2) as f32);
        let y = y + s * ((rows / 2) as f32);

        // Rows start at the far edge, so flip the vertical axis.
        let y = total_height - y;

        let col = ((x / s) as usize).min(cols - 2);
        let row = ((y / s) as usize).min(rows - 2);
        let x_rem = x / s - col as f32;
        let y_rem = y / s - row as f32;

        let h = &self.height_values;
        if x_rem < y_rem {
            // Lower-left triangle: corners (row, col), (row+1, col+1),
            // (row+1, col). On the axis-aligned right triangle the
            // barycentric weights collapse to these.
            let alpha = 1.0 - y_rem;
            let beta = x_rem;
            let gamma = y_rem - x_rem;
            alpha * h[row][col] + beta * h[row + 1][col + 1] + gamma * h[row + 1][col]
        } else {
            // Upper-right triangle: corners (row, col), (row+1, col+1),
            // (row, col+1).
            let alpha = 1.0 - x_rem;
            let beta = y_rem;
            let gamma = x_rem - y_rem;
            alpha * h[row][col] + beta * h[row + 1][col + 1] + gamma * h[row][col + 1]
        }
    }

    /// Pushes the terrain into the current draw call.
    pub fn render(&self, prims: &mut Primitives, view: &Matrix4<f32>) {
        self.surface.render(prims, view);
    }
}

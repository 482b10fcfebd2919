//! CPU-side mesh geometry.

use crate::math::Vec2;

use super::vertex::Vertex;

/// How the backend assembles vertices into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topology {
    Triangles,
    Lines,
    LineStrip,
    Points,
}

impl Topology {
    pub(crate) fn to_wgpu(self) -> wgpu::PrimitiveTopology {
        match self {
            Topology::Triangles => wgpu::PrimitiveTopology::TriangleList,
            Topology::Lines => wgpu::PrimitiveTopology::LineList,
            Topology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
            Topology::Points => wgpu::PrimitiveTopology::PointList,
        }
    }
}

/// Vertices, optional indices, and the local bounding half-size used for culling.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    topology: Topology,
    local_half_size: Vec2,
}

impl Mesh {
    /// Build a triangle mesh. Pass an empty index list for non-indexed drawing.
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        let local_half_size = half_extent(&vertices);
        Self {
            vertices,
            indices,
            topology: Topology::Triangles,
            local_half_size,
        }
    }

    /// Unit quad centered at the origin, corners at ±0.5.
    pub fn quad() -> Self {
        Self::new(
            vec![
                Vertex::new(-0.5, -0.5, 0.0, 0.0),
                Vertex::new(0.5, -0.5, 1.0, 0.0),
                Vertex::new(0.5, 0.5, 1.0, 1.0),
                Vertex::new(-0.5, 0.5, 0.0, 1.0),
            ],
            vec![0, 1, 2, 2, 3, 0],
        )
    }

    /// Set the primitive topology (builder pattern).
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn is_indexed(&self) -> bool {
        !self.indices.is_empty()
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Half of the axis-aligned extent of the vertex positions.
    pub fn local_half_size(&self) -> Vec2 {
        self.local_half_size
    }
}

fn half_extent(vertices: &[Vertex]) -> Vec2 {
    let Some(first) = vertices.first() else {
        return Vec2::ZERO;
    };
    let start = Vec2::new(first.position[0], first.position[1]);
    let (min, max) = vertices.iter().fold((start, start), |(min, max), v| {
        let p = Vec2::new(v.position[0], v.position[1]);
        (min.min(p), max.max(p))
    });
    (max - min) * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_bounds_are_half_unit() {
        let quad = Mesh::quad();
        assert_eq!(quad.local_half_size(), Vec2::splat(0.5));
        assert_eq!(quad.indices(), &[0, 1, 2, 2, 3, 0]);
        assert_eq!(quad.topology(), Topology::Triangles);
    }

    #[test]
    fn bounds_of_offset_geometry() {
        let mesh = Mesh::new(
            vec![Vertex::new(2.0, 1.0, 0.0, 0.0), Vertex::new(6.0, 3.0, 1.0, 1.0)],
            Vec::new(),
        );
        assert_eq!(mesh.local_half_size(), Vec2::new(2.0, 1.0));
        assert!(!mesh.is_indexed());
    }

    #[test]
    fn empty_mesh_has_zero_bounds() {
        assert_eq!(Mesh::new(Vec::new(), Vec::new()).local_half_size(), Vec2::ZERO);
    }
}

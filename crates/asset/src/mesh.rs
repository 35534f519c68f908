//! CPU-side mesh representation produced by the loaders.

use bytemuck::{Pod, Zeroable};
use corelib::{Bounds, Vec2, Vec3};

/// Per-vertex tangent. `flip_y` means the bitangent is `-(normal x tangent)`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Tangent {
    pub x: Vec3,
    pub flip_y: bool,
}

impl Tangent {
    pub fn new(x: Vec3, flip_y: bool) -> Self {
        Self { x, flip_y }
    }

    /// Handedness sign as stored in a `vec4` tangent attribute.
    #[inline]
    pub fn sign(&self) -> f32 {
        if self.flip_y { -1.0 } else { 1.0 }
    }
}

/// Interleaved vertex ready for upload: position/normal/uv/tangent(xyz + sign).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PackedVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 4],
}

/// One drawable unit with flat, parallel attribute buffers.
///
/// `indices.len()` is a multiple of 3 and every index is `< vertices.len()`.
/// `normals` and `uvs` always match `vertices` in length; `tangents` does
/// too unless it is empty (source normals were used as-is).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshSection {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub tangents: Vec<Tangent>,
    pub bounds: Bounds,
}

impl MeshSection {
    /// Assemble a section and compute its bounds.
    pub fn new(
        vertices: Vec<Vec3>,
        indices: Vec<u32>,
        normals: Vec<Vec3>,
        uvs: Vec<Vec2>,
        tangents: Vec<Tangent>,
    ) -> Self {
        let bounds = Bounds::from_points(vertices.iter().copied());
        Self {
            vertices,
            indices,
            normals,
            uvs,
            tangents,
            bounds,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Iterate triangles as index triples.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Returns `true` if the buffers satisfy the section invariants.
    pub fn is_valid(&self) -> bool {
        let n = self.vertices.len();
        self.indices.len() % 3 == 0
            && self.indices.iter().all(|&i| (i as usize) < n)
            && self.normals.len() == n
            && self.uvs.len() == n
            && (self.tangents.is_empty() || self.tangents.len() == n)
    }

    /// Interleave the attribute buffers. Missing tangents become zero.
    pub fn packed_vertices(&self) -> Vec<PackedVertex> {
        (0..self.vertices.len())
            .map(|i| {
                let tangent = self
                    .tangents
                    .get(i)
                    .map(|t| [t.x.x, t.x.y, t.x.z, t.sign()])
                    .unwrap_or([0.0; 4]);
                PackedVertex {
                    position: self.vertices[i].to_array(),
                    normal: self.normals.get(i).copied().unwrap_or(Vec3::ZERO).to_array(),
                    uv: self.uvs.get(i).copied().unwrap_or(Vec2::ZERO).to_array(),
                    tangent,
                }
            })
            .collect()
    }
}

/// Loaded mesh: ordered sections plus the union of their bounds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub sections: Vec<MeshSection>,
    pub bounds: Bounds,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_section(&mut self, section: MeshSection) {
        self.bounds = self.bounds.union(&section.bounds);
        self.sections.push(section);
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.sections.iter().map(|s| s.vertices.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.sections.iter().map(MeshSection::triangle_count).sum()
    }
}

impl From<MeshSection> for Mesh {
    fn from(section: MeshSection) -> Self {
        let mut mesh = Mesh::new();
        mesh.push_section(section);
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::{vec2, vec3};

    fn triangle() -> MeshSection {
        MeshSection::new(
            vec![vec3(0.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0), vec3(0.0, 1.0, 0.0)],
            vec![0, 1, 2],
            vec![Vec3::Z; 3],
            vec![vec2(0.0, 0.0), vec2(1.0, 0.0), vec2(0.0, 1.0)],
            Vec::new(),
        )
    }

    #[test]
    fn section_validity() {
        let mut s = triangle();
        assert!(s.is_valid());
        assert_eq!(s.triangle_count(), 1);

        s.indices.push(7);
        assert!(!s.is_valid());
    }

    #[test]
    fn mesh_bounds_union_sections() {
        let mut mesh = Mesh::new();
        assert!(mesh.bounds.is_empty());

        mesh.push_section(triangle());
        let mut moved = triangle();
        for v in &mut moved.vertices {
            *v += vec3(0.0, 0.0, 5.0);
        }
        mesh.push_section(MeshSection::new(
            moved.vertices,
            moved.indices,
            moved.normals,
            moved.uvs,
            moved.tangents,
        ));

        assert_eq!(mesh.bounds.min, vec3(0.0, 0.0, 0.0));
        assert_eq!(mesh.bounds.max, vec3(1.0, 1.0, 5.0));
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn packed_vertices_cast_to_bytes() {
        let mut s = triangle();
        s.tangents = vec![Tangent::new(Vec3::X, true); 3];
        let packed = s.packed_vertices();
        assert_eq!(packed.len(), 3);
        assert_eq!(packed[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(packed[0].tangent, [1.0, 0.0, 0.0, -1.0]);

        let bytes: &[u8] = bytemuck::cast_slice(&packed);
        assert_eq!(bytes.len(), 3 * std::mem::size_of::<PackedVertex>());
    }
}

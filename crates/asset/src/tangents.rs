//! Normal and tangent generation for meshes that arrive without normals.

use std::collections::HashMap;

use corelib::{Vec2, Vec3};

use crate::mesh::Tangent;

/// Fills in per-vertex normals and tangents from geometry.
///
/// `normals` has one zeroed entry per vertex on input and receives the
/// generated normals. The returned tangents are one per vertex. Results must
/// depend only on the inputs.
pub trait AttributeCompletion {
    fn complete(
        &self,
        vertices: &[Vec3],
        indices: &[u32],
        uvs: &[Vec2],
        normals: &mut [Vec3],
    ) -> Vec<Tangent>;
}

/// Smooth normals and UV-derived tangents.
///
/// Face normals follow clockwise front faces, the winding of the
/// forward-X/right-Y/up-Z scene space. Vertices sharing the exact same
/// position are averaged together, so split face corners still shade
/// smoothly.
#[derive(Clone, Copy, Debug, Default)]
pub struct SmoothTangents;

const UV_DET_EPSILON: f32 = 1e-8;

struct Face {
    normal: Vec3,
    tangent: Vec3,
    bitangent: Vec3,
}

impl SmoothTangents {
    fn face(&self, p: [Vec3; 3], uv: [Vec2; 3]) -> Option<Face> {
        let normal = (p[1] - p[2]).cross(p[0] - p[2]).try_normalize()?;

        let e1 = p[1] - p[0];
        let e2 = p[2] - p[0];
        let d1 = uv[1] - uv[0];
        let d2 = uv[2] - uv[0];
        let det = d1.x * d2.y - d2.x * d1.y;

        let (tangent, bitangent) = if det.abs() > UV_DET_EPSILON {
            let r = 1.0 / det;
            (
                ((e1 * d2.y - e2 * d1.y) * r).normalize_or_zero(),
                ((e2 * d1.x - e1 * d2.x) * r).normalize_or_zero(),
            )
        } else {
            (Vec3::ZERO, Vec3::ZERO)
        };

        Some(Face {
            normal,
            tangent,
            bitangent,
        })
    }
}

impl AttributeCompletion for SmoothTangents {
    fn complete(
        &self,
        vertices: &[Vec3],
        indices: &[u32],
        uvs: &[Vec2],
        normals: &mut [Vec3],
    ) -> Vec<Tangent> {
        let n = vertices.len();
        let groups = weld_groups(vertices);
        let group_count = groups.iter().copied().max().map_or(0, |g| g + 1);

        // Accumulate per weld group; every vertex of a group reads the same sum.
        let mut sum_n = vec![Vec3::ZERO; group_count];
        let mut sum_t = vec![Vec3::ZERO; group_count];
        let mut sum_b = vec![Vec3::ZERO; group_count];

        for tri in indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if a >= n || b >= n || c >= n {
                continue;
            }
            let uv_at = |i: usize| uvs.get(i).copied().unwrap_or(Vec2::ZERO);
            let Some(face) = self.face(
                [vertices[a], vertices[b], vertices[c]],
                [uv_at(a), uv_at(b), uv_at(c)],
            ) else {
                continue;
            };

            let mut seen = [usize::MAX; 3];
            for (slot, v) in [a, b, c].into_iter().enumerate() {
                let g = groups[v];
                // A sliver welded onto itself counts once.
                if seen[..slot].contains(&g) {
                    continue;
                }
                seen[slot] = g;
                sum_n[g] += face.normal;
                sum_t[g] += face.tangent;
                sum_b[g] += face.bitangent;
            }
        }

        let mut tangents = Vec::with_capacity(n);
        for v in 0..n {
            let g = groups[v];
            let normal = sum_n[g].normalize_or_zero();
            if let Some(slot) = normals.get_mut(v) {
                *slot = normal;
            }
            tangents.push(orthogonal_tangent(normal, sum_t[g], sum_b[g]));
        }
        tangents
    }
}

/// Gram-Schmidt the accumulated tangent against the normal.
fn orthogonal_tangent(normal: Vec3, tangent: Vec3, bitangent: Vec3) -> Tangent {
    if normal == Vec3::ZERO {
        return Tangent::default();
    }

    let x = (tangent - normal * normal.dot(tangent))
        .try_normalize()
        .unwrap_or_else(|| normal.any_orthonormal_vector());
    let flip_y = normal.cross(x).dot(bitangent) < 0.0;
    Tangent::new(x, flip_y)
}

/// Map each vertex to a group id shared by all vertices at the same position.
fn weld_groups(vertices: &[Vec3]) -> Vec<usize> {
    let mut ids: HashMap<[u32; 3], usize> = HashMap::with_capacity(vertices.len());
    vertices
        .iter()
        .map(|p| {
            let next = ids.len();
            *ids.entry(position_key(*p)).or_insert(next)
        })
        .collect()
}

#[inline]
fn position_key(p: Vec3) -> [u32; 3] {
    // +0.0 and -0.0 weld together.
    let bits = |f: f32| if f == 0.0 { 0 } else { f.to_bits() };
    [bits(p.x), bits(p.y), bits(p.z)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::{vec2, vec3};

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn single_triangle_normal_and_tangent() {
        let verts = [vec3(0.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0), vec3(0.0, 1.0, 0.0)];
        let uvs = [vec2(0.0, 0.0), vec2(1.0, 0.0), vec2(0.0, 1.0)];
        let mut normals = [Vec3::ZERO; 3];

        let tangents = SmoothTangents.complete(&verts, &[0, 1, 2], &uvs, &mut normals);

        assert_eq!(tangents.len(), 3);
        for (n, t) in normals.iter().zip(&tangents) {
            assert!(close(*n, vec3(0.0, 0.0, -1.0)));
            assert!(close(t.x, Vec3::X));
            assert!(t.x.dot(*n).abs() < 1e-5);
            // n x t = -Y while the UV bitangent is +Y.
            assert!(t.flip_y);
        }
    }

    #[test]
    fn split_corners_are_smoothed() {
        // Two faces of a tent sharing an edge, corners duplicated per face.
        let verts = [
            vec3(0.0, 0.0, 0.0),
            vec3(0.0, 1.0, 0.0),
            vec3(1.0, 0.0, 1.0),
            vec3(0.0, 0.0, 0.0),
            vec3(-1.0, 0.0, 1.0),
            vec3(0.0, 1.0, 0.0),
        ];
        let indices = [0, 1, 2, 3, 4, 5];
        let mut normals = [Vec3::ZERO; 6];
        SmoothTangents.complete(&verts, &indices, &[], &mut normals);

        // Shared-edge vertices get the averaged normal, identical across copies.
        assert!(close(normals[0], normals[3]));
        assert!(close(normals[1], normals[5]));
        assert!((normals[0].length() - 1.0).abs() < 1e-5);
        // Unshared corners keep their own face normal.
        assert!(!close(normals[2], normals[4]));
    }

    #[test]
    fn degenerate_and_out_of_range_triangles_are_ignored() {
        let verts = [vec3(0.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0), vec3(2.0, 0.0, 0.0)];
        let mut normals = [Vec3::ZERO; 3];
        let tangents = SmoothTangents.complete(&verts, &[0, 1, 2, 0, 1, 9], &[], &mut normals);

        assert!(normals.iter().all(|n| *n == Vec3::ZERO));
        assert!(tangents.iter().all(|t| *t == Tangent::default()));
    }

    #[test]
    fn missing_uvs_still_give_perpendicular_tangents() {
        let verts = [vec3(0.0, 0.0, 0.0), vec3(0.0, 1.0, 0.0), vec3(0.0, 0.0, 1.0)];
        let mut normals = [Vec3::ZERO; 3];
        let tangents = SmoothTangents.complete(&verts, &[0, 1, 2], &[], &mut normals);

        for (n, t) in normals.iter().zip(&tangents) {
            assert!((t.x.length() - 1.0).abs() < 1e-5);
            assert!(t.x.dot(*n).abs() < 1e-5);
        }
    }

    #[test]
    fn output_is_deterministic() {
        let verts = [
            vec3(0.0, 0.0, 0.0),
            vec3(1.0, 0.0, 0.0),
            vec3(1.0, 1.0, 0.0),
            vec3(0.0, 1.0, 0.0),
        ];
        let uvs = [vec2(0.0, 0.0), vec2(1.0, 0.0), vec2(1.0, 1.0), vec2(0.0, 1.0)];
        let indices = [0, 1, 2, 0, 2, 3];

        let mut a = [Vec3::ZERO; 4];
        let mut b = [Vec3::ZERO; 4];
        let ta = SmoothTangents.complete(&verts, &indices, &uvs, &mut a);
        let tb = SmoothTangents.complete(&verts, &indices, &uvs, &mut b);
        assert_eq!(a, b);
        assert_eq!(ta, tb);
    }
}

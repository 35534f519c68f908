//! Turns scanned OBJ polygons into a flat, triangulated [`MeshSection`].

use corelib::{Vec2, Vec3};

use crate::diagnostics::Diagnostics;
use crate::error::{ParseError, ParseResult};
use crate::mesh::MeshSection;
use crate::obj::{FaceVertexRef, Polygon, RawAttributeSet};
use crate::tangents::AttributeCompletion;

/// Per-component tolerance below which a normal counts as missing.
const NORMAL_EPSILON: f32 = 1e-4;

/// Fan-triangulate `polygons` and emit one output vertex per face corner.
///
/// Triangles whose position reference is out of range are dropped. If any
/// resulting normal is near zero, every normal is regenerated (with tangents)
/// by `completion`. Non-convex polygons are fanned like convex ones.
pub fn build_section(
    attrs: &RawAttributeSet,
    polygons: &[Polygon],
    completion: &dyn AttributeCompletion,
    diag: &mut Diagnostics,
) -> ParseResult<MeshSection> {
    let corner_estimate: usize = polygons.iter().map(|p| p.len().saturating_sub(2) * 3).sum();
    let mut vertices: Vec<Vec3> = Vec::with_capacity(corner_estimate);
    let mut normals: Vec<Vec3> = Vec::with_capacity(corner_estimate);
    let mut uvs: Vec<Vec2> = Vec::with_capacity(corner_estimate);
    let mut indices: Vec<u32> = Vec::with_capacity(corner_estimate);
    let mut dropped = 0usize;

    for face in polygons.iter().filter(|f| f.len() >= 3) {
        let anchor = &face[0];
        for pair in face[1..].windows(2) {
            let tri = [anchor, &pair[0], &pair[1]];
            let Some(positions) = triangle_positions(attrs, tri) else {
                dropped += 1;
                continue;
            };

            for (corner, position) in tri.into_iter().zip(positions) {
                let idx = u32::try_from(vertices.len()).map_err(|_| {
                    diag.error(None, "Too many vertices for 32-bit indices");
                    ParseError::Empty("vertex count exceeds 32-bit index range")
                })?;
                vertices.push(position);
                uvs.push(corner.uv.and_then(|i| attrs.uvs.get(i).copied()).unwrap_or(Vec2::ZERO));
                normals.push(
                    corner
                        .normal
                        .and_then(|i| attrs.normals.get(i).copied())
                        .unwrap_or(Vec3::ZERO),
                );
                indices.push(idx);
            }
        }
    }

    if dropped > 0 {
        diag.warn(
            None,
            format!("Skipped {} degenerate triangle(s) while building mesh", dropped),
        );
    }

    if indices.is_empty() {
        diag.error(None, "OBJ contained no triangles");
        return Err(ParseError::Empty("OBJ contained no triangles"));
    }

    let normals_missing = normals
        .iter()
        .any(|n| n.abs().max_element() <= NORMAL_EPSILON);
    let tangents = if normals_missing {
        log::debug!("Regenerating normals for {} vertices", vertices.len());
        normals.fill(Vec3::ZERO);
        completion.complete(&vertices, &indices, &uvs, &mut normals)
    } else {
        Vec::new()
    };

    Ok(MeshSection::new(vertices, indices, normals, uvs, tangents))
}

fn triangle_positions(attrs: &RawAttributeSet, tri: [&FaceVertexRef; 3]) -> Option<[Vec3; 3]> {
    let at = |r: &FaceVertexRef| attrs.positions.get(r.vertex).copied();
    Some([at(tri[0])?, at(tri[1])?, at(tri[2])?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Tangent;
    use crate::obj::parse_obj_str;
    use crate::tangents::SmoothTangents;
    use corelib::vec3;

    fn build(src: &str) -> (ParseResult<MeshSection>, Diagnostics) {
        let mut diag = Diagnostics::new();
        let scan = parse_obj_str(src, &mut diag).expect("scan");
        let section = build_section(&scan.attributes, &scan.polygons, &SmoothTangents, &mut diag);
        (section, diag)
    }

    fn corner(vertex: usize) -> FaceVertexRef {
        FaceVertexRef {
            vertex,
            uv: None,
            normal: None,
        }
    }

    /// Map output vertices back to source positions for easy comparison.
    fn source_triangles(section: &MeshSection, attrs: &RawAttributeSet) -> Vec<[usize; 3]> {
        section
            .triangles()
            .map(|t| {
                t.map(|i| {
                    let p = section.vertices[i as usize];
                    attrs.positions.iter().position(|q| *q == p).unwrap()
                })
            })
            .collect()
    }

    #[test]
    fn single_triangle_in_order() {
        let attrs = RawAttributeSet {
            positions: vec![vec3(0.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0), vec3(0.0, 1.0, 0.0)],
            ..Default::default()
        };
        let mut diag = Diagnostics::new();
        let section = build_section(
            &attrs,
            &[vec![corner(0), corner(1), corner(2)]],
            &SmoothTangents,
            &mut diag,
        )
        .unwrap();

        assert_eq!(section.indices, vec![0, 1, 2]);
        assert_eq!(source_triangles(&section, &attrs), vec![[0, 1, 2]]);
        assert!(section.is_valid());
    }

    #[test]
    fn quad_fans_into_two_triangles() {
        let src = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        let mut diag = Diagnostics::new();
        let scan = parse_obj_str(src, &mut diag).unwrap();
        let section =
            build_section(&scan.attributes, &scan.polygons, &SmoothTangents, &mut diag).unwrap();

        assert_eq!(section.triangle_count(), 2);
        assert_eq!(section.vertices.len(), 6);
        assert_eq!(
            source_triangles(&section, &scan.attributes),
            vec![[0, 1, 2], [0, 2, 3]]
        );
    }

    #[test]
    fn corners_are_never_shared() {
        let (section, _) = build("v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nf 1 2 3\nf 2 4 3\n");
        let section = section.unwrap();
        assert_eq!(section.vertices.len(), 6);
        assert_eq!(section.indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn missing_normals_are_generated() {
        let (section, _) = build("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
        let section = section.unwrap();
        assert_eq!(section.normals.len(), section.vertices.len());
        assert_eq!(section.tangents.len(), section.vertices.len());
        for n in &section.normals {
            assert!((n.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn supplied_normals_are_kept() {
        let (section, _) = build("v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 2\nf 1//1 2//1 3//1\n");
        let section = section.unwrap();
        assert!(section.normals.iter().all(|n| *n == vec3(0.0, 0.0, 2.0)));
        assert!(section.tangents.is_empty());
    }

    #[test]
    fn one_zero_normal_regenerates_all() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 5\nf 1//1 2//1 3\n";
        let (section, _) = build(src);
        let section = section.unwrap();
        assert!(section.normals.iter().all(|n| (n.length() - 1.0).abs() < 1e-5));
        assert!(section.tangents.iter().all(|t| *t != Tangent::default()));
    }

    #[test]
    fn uvs_default_to_zero() {
        let (section, _) = build("v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0.25 0.25\nf 1/1 2 3\n");
        let section = section.unwrap();
        assert_eq!(section.uvs[0], Vec2::new(0.25, 0.75));
        assert_eq!(section.uvs[1], Vec2::ZERO);
        assert_eq!(section.uvs[2], Vec2::ZERO);
    }

    #[test]
    fn out_of_range_position_drops_triangle() {
        // Face 1 refers forward to a vertex that is never defined.
        let (section, diag) = build("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 9\nf 1 2 3\n");
        let section = section.unwrap();
        assert_eq!(section.triangle_count(), 1);
        assert_eq!(section.vertices.len(), 3);
        assert!(diag.warnings().any(|d| d.message.contains("degenerate")));
    }

    #[test]
    fn no_triangles_is_empty() {
        let (section, diag) = build("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 7 8 9\n");
        assert!(matches!(section, Err(ParseError::Empty(_))));
        assert!(diag.has_errors());
    }

    #[test]
    fn bounds_cover_output_vertices() {
        let (section, _) = build("v -1 0 2\nv 3 -4 0\nv 0 5 1\nf 1 2 3\n");
        let section = section.unwrap();
        assert_eq!(section.bounds.min, vec3(-1.0, -4.0, 0.0));
        assert_eq!(section.bounds.max, vec3(3.0, 5.0, 2.0));
    }
}

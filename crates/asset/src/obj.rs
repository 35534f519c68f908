//! Wavefront OBJ parser: positions, texture coordinates, normals and faces.
//!
//! Parsing is a single forward pass. Face references resolve against the
//! attribute counts seen so far, so `-1` always means the most recent element.
//! Bad lines and tokens are dropped and reported through [`Diagnostics`].

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use corelib::{Vec2, Vec3};

use crate::builder;
use crate::diagnostics::Diagnostics;
use crate::error::{ParseError, ParseResult};
use crate::index;
use crate::mesh::Mesh;
use crate::tangents::AttributeCompletion;

/// Attribute arrays accumulated while scanning a file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawAttributeSet {
    pub positions: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub normals: Vec<Vec3>,
}

/// One corner of a face. `vertex` always resolved; the others may be absent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceVertexRef {
    pub vertex: usize,
    pub uv: Option<usize>,
    pub normal: Option<usize>,
}

/// A face with at least three corners.
pub type Polygon = Vec<FaceVertexRef>;

/// Result of scanning an OBJ source, before triangulation.
#[derive(Clone, Debug, Default)]
pub struct ObjScan {
    pub attributes: RawAttributeSet,
    pub polygons: Vec<Polygon>,
}

/// Load an OBJ file and build a single-section mesh.
pub fn load_obj_from_path(
    path: impl AsRef<Path>,
    completion: &dyn AttributeCompletion,
    diag: &mut Diagnostics,
) -> ParseResult<Mesh> {
    let path = path.as_ref();
    if !path.is_file() {
        diag.error(None, format!("OBJ file not found: {}", path.display()));
        return Err(ParseError::NotFound(path.to_path_buf()));
    }
    let file = File::open(path).map_err(|e| {
        diag.error(None, format!("Failed to read OBJ {}: {}", path.display(), e));
        ParseError::Io(e)
    })?;

    let scan = parse_obj_reader(BufReader::new(file), diag)?;
    let section = builder::build_section(&scan.attributes, &scan.polygons, completion, diag)?;
    log::info!(
        "Loaded OBJ {}: {} vertices, {} triangles",
        path.display(),
        section.vertices.len(),
        section.triangle_count()
    );
    Ok(Mesh::from(section))
}

/// Convenience helper to scan an OBJ string.
pub fn parse_obj_str(contents: &str, diag: &mut Diagnostics) -> ParseResult<ObjScan> {
    parse_obj_reader(io::Cursor::new(contents), diag)
}

/// Scan OBJ text from any [`BufRead`] into attributes and polygons.
///
/// Fails with [`ParseError::Io`] if a line cannot be read (including invalid
/// UTF-8) and with [`ParseError::Empty`] if no positions were found.
pub fn parse_obj_reader<R: BufRead>(reader: R, diag: &mut Diagnostics) -> ParseResult<ObjScan> {
    let mut scan = ObjScan::default();

    for (line_no, line) in reader.lines().enumerate() {
        let line_no = line_no + 1;
        let line = line.map_err(|e| {
            diag.error(Some(line_no), format!("Failed to read OBJ line: {}", e));
            ParseError::Io(e)
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };
        let attrs = &mut scan.attributes;

        match tag {
            "v" => match parse_floats::<3>(parts) {
                Some([x, y, z]) => attrs.positions.push(Vec3::new(x, y, z)),
                None => diag.warn(Some(line_no), format!("Malformed vertex line: {}", trimmed)),
            },
            "vt" => match parse_floats::<2>(parts) {
                // Flip V: texture origin is top-left downstream.
                Some([u, v]) => attrs.uvs.push(Vec2::new(u, 1.0 - v)),
                None => diag.warn(Some(line_no), format!("Malformed UV line: {}", trimmed)),
            },
            "vn" => match parse_floats::<3>(parts) {
                Some([x, y, z]) => attrs.normals.push(Vec3::new(x, y, z)),
                None => diag.warn(Some(line_no), format!("Malformed normal line: {}", trimmed)),
            },
            "f" => {
                let tokens: Vec<&str> = parts.collect();
                if tokens.len() < 3 {
                    diag.warn(Some(line_no), format!("Malformed face line: {}", trimmed));
                    continue;
                }

                let face: Polygon = tokens
                    .iter()
                    .filter_map(|token| parse_face_vertex(token, attrs, line_no, diag))
                    .collect();

                if face.len() >= 3 {
                    scan.polygons.push(face);
                } else {
                    diag.warn(
                        Some(line_no),
                        format!("Dropped face with {} usable corners: {}", face.len(), trimmed),
                    );
                }
            }
            _ => {
                // Ignore other directives (o/g/s/usemtl/etc.)
            }
        }
    }

    if scan.attributes.positions.is_empty() {
        diag.error(None, "OBJ contains no vertex data");
        return Err(ParseError::Empty("OBJ contains no vertex data"));
    }

    log::debug!(
        "OBJ scan: {} positions, {} uvs, {} normals, {} faces",
        scan.attributes.positions.len(),
        scan.attributes.uvs.len(),
        scan.attributes.normals.len(),
        scan.polygons.len()
    );
    Ok(scan)
}

/// Parse the first `N` tokens as floats. Extra tokens are ignored.
fn parse_floats<'a, const N: usize>(mut tokens: impl Iterator<Item = &'a str>) -> Option<[f32; N]> {
    let mut out = [0.0; N];
    for slot in &mut out {
        *slot = tokens.next()?.parse().ok()?;
    }
    Some(out)
}

/// Parse `v`, `v/vt`, `v/vt/vn` or `v//vn` against the current counts.
/// Returns `None` if the token is unusable or its vertex does not resolve.
fn parse_face_vertex(
    token: &str,
    attrs: &RawAttributeSet,
    line_no: usize,
    diag: &mut Diagnostics,
) -> Option<FaceVertexRef> {
    let parts: Vec<&str> = token.split('/').collect();
    if parts.is_empty() || parts.len() > 3 {
        diag.warn(Some(line_no), format!("Unsupported face token: {}", token));
        return None;
    }

    let mut component = |i: usize, count: usize, what: &str| -> Option<usize> {
        let text = parts.get(i).copied().filter(|p| !p.is_empty())?;
        // Strict: "3abc" is rejected, not read as 3.
        match text.parse::<i64>() {
            Ok(raw) => index::resolve(raw, count),
            Err(_) => {
                diag.warn(
                    Some(line_no),
                    format!("Invalid {} index '{}' in face token {}", what, text, token),
                );
                None
            }
        }
    };

    let vertex = component(0, attrs.positions.len(), "vertex");
    let uv = component(1, attrs.uvs.len(), "uv");
    let normal = component(2, attrs.normals.len(), "normal");

    match vertex {
        Some(vertex) => Some(FaceVertexRef { vertex, uv, normal }),
        None => {
            diag.warn(Some(line_no), format!("Face token without a valid vertex: {}", token));
            None
        }
    }
}

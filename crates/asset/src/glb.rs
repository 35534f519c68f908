//! Binary glTF (GLB) loader.
//!
//! The container itself is decoded by the `gltf` crate. Accessor data is read
//! here directly from the buffers: every triangle-list primitive becomes one
//! [`MeshSection`], converted from glTF's right-handed Y-up meters into the
//! forward-X/right-Y/up-Z centimeter space used by the rest of the engine.

use std::path::Path;

use corelib::{Vec2, Vec3};
use gltf::accessor::{DataType, Dimensions};
use gltf::mesh::Mode;
use gltf::{Accessor, Semantic};

use crate::diagnostics::Diagnostics;
use crate::error::{ParseError, ParseResult};
use crate::mesh::{Mesh, MeshSection};
use crate::tangents::AttributeCompletion;

/// glTF meters to scene centimeters.
pub const UNIT_SCALE: f32 = 100.0;

/// glTF X(right) Y(up) Z(forward) -> scene X(forward) Y(right) Z(up).
#[inline]
pub fn to_scene_axes(v: [f32; 3]) -> Vec3 {
    Vec3::new(-v[2], v[0], v[1])
}

/// Why one accessor could not be read.
#[derive(Debug, thiserror::Error)]
pub enum AccessorError {
    #[error("accessor {0} has no buffer view")]
    NoView(usize),

    #[error("accessor {index} is {data_type:?}/{dimensions:?}, expected {expected}")]
    UnexpectedType {
        index: usize,
        data_type: DataType,
        dimensions: Dimensions,
        expected: &'static str,
    },

    #[error("accessor {index} reads bytes {start}..{end} past the end of its data ({len} bytes)")]
    OutOfBounds {
        index: usize,
        start: usize,
        end: usize,
        len: usize,
    },
}

/// Load a GLB file. External buffers are resolved next to the file.
pub fn load_glb_from_path(
    path: impl AsRef<Path>,
    completion: &dyn AttributeCompletion,
    diag: &mut Diagnostics,
) -> ParseResult<Mesh> {
    let path = path.as_ref();
    if !path.is_file() {
        diag.error(None, format!("GLB file not found: {}", path.display()));
        return Err(ParseError::NotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(|e| {
        diag.error(None, format!("Failed to read GLB {}: {}", path.display(), e));
        ParseError::Io(e)
    })?;

    let mesh = parse_glb_slice(&bytes, path.parent(), completion, diag)?;
    log::info!(
        "Loaded GLB {}: {} sections, {} vertices, {} triangles",
        path.display(),
        mesh.sections.len(),
        mesh.vertex_count(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

/// Decode a GLB (or glTF JSON) byte slice into a mesh.
///
/// Only the container structure is checked; schema rules such as required
/// accessor `min`/`max` are not enforced. Succeeds with zero sections when the scene decodes but contains no
/// usable triangle primitive; callers decide whether that is an error.
pub fn parse_glb_slice(
    bytes: &[u8],
    base_dir: Option<&Path>,
    completion: &dyn AttributeCompletion,
    diag: &mut Diagnostics,
) -> ParseResult<Mesh> {
    let gltf = gltf::Gltf::from_slice_without_validation(bytes)
        .map_err(|e| malformed(diag, e))?;
    let document = gltf.document;
    let buffers = gltf::import_buffers(&document, base_dir, gltf.blob)
        .map_err(|e| malformed(diag, e))?;
    let buffers: Vec<&[u8]> = buffers.iter().map(|b| b.0.as_slice()).collect();

    let mut mesh = Mesh::new();
    for source in document.meshes() {
        let name = source.name().unwrap_or("unnamed");
        for primitive in source.primitives() {
            let label = format!("mesh '{}' primitive {}", name, primitive.index());
            if primitive.mode() != Mode::Triangles {
                diag.warn(
                    None,
                    format!("Skipping {}: mode {:?} is not a triangle list", label, primitive.mode()),
                );
                continue;
            }

            match extract_primitive(&primitive, &buffers, completion, &label, diag) {
                Ok(Some(section)) => mesh.push_section(section),
                Ok(None) => diag.warn(None, format!("Skipping {}: no vertices", label)),
                Err(e) => diag.warn(None, format!("Skipping {}: {}", label, e)),
            }
        }
    }

    log::debug!("GLB decoded into {} section(s)", mesh.sections.len());
    Ok(mesh)
}

fn malformed(diag: &mut Diagnostics, err: gltf::Error) -> ParseError {
    diag.error(None, format!("GLB error: {}", err));
    ParseError::Malformed(err.to_string())
}

fn extract_primitive(
    primitive: &gltf::Primitive<'_>,
    buffers: &[&[u8]],
    completion: &dyn AttributeCompletion,
    label: &str,
    diag: &mut Diagnostics,
) -> Result<Option<MeshSection>, AccessorError> {
    let vertices: Vec<Vec3> = match primitive.get(&Semantic::Positions) {
        Some(accessor) => read_vec3(&accessor, buffers)?
            .into_iter()
            .map(|p| to_scene_axes(p) * UNIT_SCALE)
            .collect(),
        None => Vec::new(),
    };
    if vertices.is_empty() {
        return Ok(None);
    }
    let n = vertices.len();

    let indices = match primitive.indices() {
        Some(accessor) => read_indices(&accessor, buffers)?,
        None => Vec::new(),
    };
    let indices = retain_complete_triangles(indices, n, label, diag);

    let uvs = match primitive.get(&Semantic::TexCoords(0)).map(|a| read_vec2(&a, buffers)) {
        Some(Ok(uvs)) if uvs.len() == n => uvs.into_iter().map(Vec2::from).collect(),
        Some(Ok(uvs)) => {
            diag.warn(
                None,
                format!("{}: {} UVs for {} vertices, using zero UVs", label, uvs.len(), n),
            );
            vec![Vec2::ZERO; n]
        }
        Some(Err(e)) => {
            diag.warn(None, format!("{}: {}, using zero UVs", label, e));
            vec![Vec2::ZERO; n]
        }
        None => vec![Vec2::ZERO; n],
    };

    let normals = match primitive.get(&Semantic::Normals).map(|a| read_vec3(&a, buffers)) {
        Some(Ok(normals)) if normals.len() == n => {
            Some(normals.into_iter().map(to_scene_axes).collect::<Vec<_>>())
        }
        Some(Ok(normals)) => {
            diag.warn(
                None,
                format!("{}: {} normals for {} vertices, regenerating", label, normals.len(), n),
            );
            None
        }
        Some(Err(e)) => {
            diag.warn(None, format!("{}: {}, regenerating normals", label, e));
            None
        }
        None => None,
    };

    let (normals, tangents) = match normals {
        Some(normals) => (normals, Vec::new()),
        None => {
            let mut normals = vec![Vec3::ZERO; n];
            let tangents = completion.complete(&vertices, &indices, &uvs, &mut normals);
            (normals, tangents)
        }
    };

    Ok(Some(MeshSection::new(vertices, indices, normals, uvs, tangents)))
}

/// Drop a trailing partial triangle and triangles that reference missing vertices.
fn retain_complete_triangles(
    indices: Vec<u32>,
    vertex_count: usize,
    label: &str,
    diag: &mut Diagnostics,
) -> Vec<u32> {
    let trailing = indices.len() % 3;
    if trailing != 0 {
        diag.warn(
            None,
            format!("{}: ignoring {} trailing index(es)", label, trailing),
        );
    }

    let total = indices.len() / 3;
    let kept: Vec<u32> = indices
        .chunks_exact(3)
        .filter(|t| t.iter().all(|&i| (i as usize) < vertex_count))
        .flatten()
        .copied()
        .collect();

    let dropped = total - kept.len() / 3;
    if dropped > 0 {
        diag.warn(
            None,
            format!("{}: dropped {} triangle(s) with out-of-range indices", label, dropped),
        );
    }
    kept
}

/// Strided view over the elements of one accessor.
#[derive(Clone, Copy, Debug)]
struct Elements<'a> {
    data: &'a [u8],
    offset: usize,
    stride: usize,
    size: usize,
    count: usize,
}

impl<'a> Elements<'a> {
    fn of(accessor: &Accessor<'_>, buffers: &[&'a [u8]], size: usize) -> Result<Self, AccessorError> {
        let index = accessor.index();
        let view = accessor.view().ok_or(AccessorError::NoView(index))?;
        let buffer = buffers.get(view.buffer().index()).copied().unwrap_or(&[]);
        Self::new(
            index,
            buffer,
            view.offset() + accessor.offset(),
            view.stride().unwrap_or(size),
            size,
            accessor.count(),
        )
    }

    fn new(
        index: usize,
        data: &'a [u8],
        offset: usize,
        stride: usize,
        size: usize,
        count: usize,
    ) -> Result<Self, AccessorError> {
        let end = match count {
            0 => Some(offset),
            _ => (count - 1)
                .checked_mul(stride)
                .and_then(|s| s.checked_add(offset))
                .and_then(|s| s.checked_add(size)),
        };
        match end {
            Some(end) if end <= data.len() => Ok(Self {
                data,
                offset,
                stride,
                size,
                count,
            }),
            _ => Err(AccessorError::OutOfBounds {
                index,
                start: offset,
                end: end.unwrap_or(usize::MAX),
                len: data.len(),
            }),
        }
    }

    fn iter(self) -> impl Iterator<Item = &'a [u8]> {
        (0..self.count).map(move |i| {
            let at = self.offset + i * self.stride;
            &self.data[at..at + self.size]
        })
    }
}

#[inline]
fn le_f32(b: &[u8], at: usize) -> f32 {
    f32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

fn expect_type(
    accessor: &Accessor<'_>,
    data_type: DataType,
    dimensions: Dimensions,
    expected: &'static str,
) -> Result<(), AccessorError> {
    if accessor.data_type() == data_type && accessor.dimensions() == dimensions {
        Ok(())
    } else {
        Err(AccessorError::UnexpectedType {
            index: accessor.index(),
            data_type: accessor.data_type(),
            dimensions: accessor.dimensions(),
            expected,
        })
    }
}

fn read_vec3(accessor: &Accessor<'_>, buffers: &[&[u8]]) -> Result<Vec<[f32; 3]>, AccessorError> {
    expect_type(accessor, DataType::F32, Dimensions::Vec3, "f32 VEC3")?;
    let elements = Elements::of(accessor, buffers, 12)?;
    Ok(elements
        .iter()
        .map(|e| [le_f32(e, 0), le_f32(e, 4), le_f32(e, 8)])
        .collect())
}

fn read_vec2(accessor: &Accessor<'_>, buffers: &[&[u8]]) -> Result<Vec<[f32; 2]>, AccessorError> {
    expect_type(accessor, DataType::F32, Dimensions::Vec2, "f32 VEC2")?;
    let elements = Elements::of(accessor, buffers, 8)?;
    Ok(elements.iter().map(|e| [le_f32(e, 0), le_f32(e, 4)]).collect())
}

/// Read u8/u16/u32 scalar indices, widened to u32.
fn read_indices(accessor: &Accessor<'_>, buffers: &[&[u8]]) -> Result<Vec<u32>, AccessorError> {
    let unexpected = || AccessorError::UnexpectedType {
        index: accessor.index(),
        data_type: accessor.data_type(),
        dimensions: accessor.dimensions(),
        expected: "u8/u16/u32 SCALAR",
    };
    if accessor.dimensions() != Dimensions::Scalar {
        return Err(unexpected());
    }

    let indices = match accessor.data_type() {
        DataType::U32 => Elements::of(accessor, buffers, 4)?
            .iter()
            .map(|e| u32::from_le_bytes([e[0], e[1], e[2], e[3]]))
            .collect(),
        DataType::U16 => Elements::of(accessor, buffers, 2)?
            .iter()
            .map(|e| u32::from(u16::from_le_bytes([e[0], e[1]])))
            .collect(),
        DataType::U8 => Elements::of(accessor, buffers, 1)?
            .iter()
            .map(|e| u32::from(e[0]))
            .collect(),
        _ => return Err(unexpected()),
    };
    Ok(indices)
}

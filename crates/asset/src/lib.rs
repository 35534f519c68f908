//! Mesh ingestion: OBJ text and binary glTF into flat, renderer-ready sections.
//!
//! Both loaders end in the same [`Mesh`] shape: one or more [`MeshSection`]s
//! with per-corner vertices, triangle indices, normals, UVs and (when they had
//! to be generated) tangents, plus aggregate [`corelib::Bounds`].

pub mod builder;
pub mod diagnostics;
pub mod error;
pub mod glb;
pub mod index;
pub mod mesh;
pub mod obj;
pub mod store;
pub mod tangents;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{ParseError, ParseResult};
pub use mesh::{Mesh, MeshSection, PackedVertex, Tangent};
pub use store::{MeshFormat, MeshStore, NullSink, SectionSink};
pub use tangents::{AttributeCompletion, SmoothTangents};

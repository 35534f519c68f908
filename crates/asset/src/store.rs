//! Owns the currently loaded mesh and mirrors it into a renderer.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use corelib::Bounds;

use crate::diagnostics::Diagnostics;
use crate::error::{ParseError, ParseResult};
use crate::glb;
use crate::mesh::{Mesh, MeshSection};
use crate::obj;
use crate::tangents::{AttributeCompletion, SmoothTangents};

/// Receives mesh sections for drawing.
pub trait SectionSink {
    fn create_section(&mut self, index: usize, section: &MeshSection);
    fn set_section_visible(&mut self, index: usize, visible: bool);
    fn clear_all_sections(&mut self);
}

/// Sink that discards everything, for headless use.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl SectionSink for NullSink {
    fn create_section(&mut self, _index: usize, _section: &MeshSection) {}
    fn set_section_visible(&mut self, _index: usize, _visible: bool) {}
    fn clear_all_sections(&mut self) {}
}

/// Supported source formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshFormat {
    Obj,
    Glb,
}

impl MeshFormat {
    /// Guess from the file extension (case-insensitive).
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "obj" => Some(Self::Obj),
            "glb" => Some(Self::Glb),
            _ => None,
        }
    }

    /// Extension first, then the GLB magic; anything else is treated as OBJ text.
    pub fn from_path(path: &Path) -> Self {
        if let Some(format) = Self::from_extension(path) {
            return format;
        }
        let mut magic = [0u8; 4];
        let is_glb = File::open(path)
            .and_then(|mut f| f.read_exact(&mut magic))
            .map(|_| &magic == b"glTF")
            .unwrap_or(false);
        if is_glb { Self::Glb } else { Self::Obj }
    }
}

/// The loaded mesh plus the sink it is registered with.
///
/// Every load starts by clearing the previous mesh. A failed load leaves the
/// store empty; nothing is rolled back.
pub struct MeshStore<S: SectionSink> {
    sink: S,
    completion: Box<dyn AttributeCompletion>,
    mesh: Mesh,
    diagnostics: Diagnostics,
}

impl<S: SectionSink> MeshStore<S> {
    pub fn new(sink: S) -> Self {
        Self::with_completion(sink, Box::new(SmoothTangents))
    }

    pub fn with_completion(sink: S, completion: Box<dyn AttributeCompletion>) -> Self {
        Self {
            sink,
            completion,
            mesh: Mesh::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Load `path`, picking the format from its extension or contents.
    /// Returns `false` on failure; the reason is logged.
    pub fn load(&mut self, path: impl AsRef<Path>) -> bool {
        self.try_load(path).is_ok()
    }

    pub fn load_obj(&mut self, path: impl AsRef<Path>) -> bool {
        self.try_load_as(path, MeshFormat::Obj).is_ok()
    }

    pub fn load_glb(&mut self, path: impl AsRef<Path>) -> bool {
        self.try_load_as(path, MeshFormat::Glb).is_ok()
    }

    pub fn try_load(&mut self, path: impl AsRef<Path>) -> ParseResult<&Mesh> {
        let path = path.as_ref();
        self.try_load_as(path, MeshFormat::from_path(path))
    }

    pub fn try_load_as(&mut self, path: impl AsRef<Path>, format: MeshFormat) -> ParseResult<&Mesh> {
        self.clear();
        self.diagnostics.clear();
        let path = path.as_ref();

        let loaded = match format {
            MeshFormat::Obj => {
                obj::load_obj_from_path(path, &*self.completion, &mut self.diagnostics)
            }
            MeshFormat::Glb => {
                glb::load_glb_from_path(path, &*self.completion, &mut self.diagnostics)
            }
        };
        let mesh = loaded.inspect_err(|e| {
            log::error!("Failed to load {:?} mesh {}: {}", format, path.display(), e);
        })?;

        if mesh.is_empty() {
            self.diagnostics
                .error(None, format!("{} produced no drawable sections", path.display()));
            return Err(ParseError::Empty("no triangle primitive produced vertices"));
        }

        for (index, section) in mesh.sections.iter().enumerate() {
            self.sink.create_section(index, section);
            self.sink.set_section_visible(index, true);
        }
        self.mesh = mesh;
        Ok(&self.mesh)
    }

    /// Drop the current mesh and unregister its sections. Safe to repeat.
    pub fn clear(&mut self) {
        self.sink.clear_all_sections();
        self.mesh = Mesh::new();
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn bounds(&self) -> Bounds {
        self.mesh.bounds
    }

    pub fn section_count(&self) -> usize {
        self.mesh.sections.len()
    }

    /// Non-fatal issues (and the failure, if any) from the last load.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

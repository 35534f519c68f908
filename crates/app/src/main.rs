//! Entry point for meshview: load an OBJ or GLB and report what a renderer would get.

use std::path::PathBuf;

use anyhow::{Result, bail};
use asset::{MeshFormat, MeshSection, MeshStore, SectionSink};
use corelib::Camera;

/// Sink that logs section registration instead of drawing.
#[derive(Default)]
struct LogSink {
    live: usize,
}

impl SectionSink for LogSink {
    fn create_section(&mut self, index: usize, section: &MeshSection) {
        self.live += 1;
        log::info!(
            "Section {}: {} vertices, {} triangles, {} tangents",
            index,
            section.vertices.len(),
            section.triangle_count(),
            section.tangents.len()
        );
    }

    fn set_section_visible(&mut self, index: usize, visible: bool) {
        log::debug!("Section {} visible={}", index, visible);
    }

    fn clear_all_sections(&mut self) {
        if self.live > 0 {
            log::debug!("Clearing {} section(s)", self.live);
        }
        self.live = 0;
    }
}

fn parse_mesh_arg() -> Option<PathBuf> {
    // --mesh=<path> or the first bare argument.
    let mut positional = None;
    for arg in std::env::args().skip(1) {
        if let Some(val) = arg.strip_prefix("--mesh=") {
            return Some(PathBuf::from(val));
        }
        if !arg.starts_with("--") && positional.is_none() {
            positional = Some(PathBuf::from(arg));
        }
    }
    positional
}

fn parse_format_arg() -> Option<MeshFormat> {
    // Accept: --format=auto|obj|glb
    for arg in std::env::args() {
        if let Some(val) = arg.strip_prefix("--format=") {
            return match val.to_ascii_lowercase().as_str() {
                "obj" => Some(MeshFormat::Obj),
                "glb" | "gltf" => Some(MeshFormat::Glb),
                "auto" => None,
                other => {
                    log::warn!("Unknown format '{}', falling back to auto.", other);
                    None
                }
            };
        }
    }
    None
}

fn parse_camera_args() -> (f32, f32) {
    let mut fov_deg: f32 = 60.0;
    let mut aspect: f32 = 16.0 / 9.0;

    for arg in std::env::args() {
        if let Some(v) = arg.strip_prefix("--fov=") {
            if let Ok(f) = v.parse::<f32>() {
                fov_deg = f.clamp(1.0, 179.0);
            }
        } else if let Some(v) = arg.strip_prefix("--aspect=") {
            let parsed = match v.split_once('/').or_else(|| v.split_once(':')) {
                Some((w, h)) => match (w.parse::<f32>(), h.parse::<f32>()) {
                    (Ok(w), Ok(h)) if h > 0.0 => Some(w / h),
                    _ => None,
                },
                None => v.parse::<f32>().ok(),
            };
            if let Some(a) = parsed.filter(|a| *a > 0.0) {
                aspect = a;
            }
        }
    }

    (fov_deg.to_radians(), aspect)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(path) = parse_mesh_arg() else {
        log::warn!("No mesh selected; viewer will remain empty.");
        log::info!("Usage: app <mesh.obj|mesh.glb> [--format=auto|obj|glb] [--fov=60] [--aspect=16/9]");
        return Ok(());
    };
    let format = parse_format_arg();
    let (fov_y, aspect) = parse_camera_args();
    log::info!("Loading {} (format: {:?})", path.display(), format);

    let mut store = MeshStore::new(LogSink::default());
    let result = match format {
        Some(format) => store.try_load_as(&path, format).map(|_| ()),
        None => store.try_load(&path).map(|_| ()),
    };
    let warnings = store.diagnostics().warnings().count();
    if let Err(e) = result {
        bail!("Failed to load {}: {}", path.display(), e);
    }

    let mesh = store.mesh();
    let bounds = store.bounds();
    log::info!(
        "{} section(s), {} vertices, {} triangles, {} warning(s)",
        mesh.sections.len(),
        mesh.vertex_count(),
        mesh.triangle_count(),
        warnings
    );
    log::info!("Bounds: min={:?} max={:?}", bounds.min, bounds.max);

    if let Some(camera) = Camera::frame_bounds(&bounds, fov_y, aspect) {
        log::info!(
            "Camera: eye={:?} target={:?} near={:.2} far={:.2}",
            camera.eye,
            camera.target,
            camera.z_near,
            camera.z_far
        );
        log::debug!("View-projection: {:?}", camera.proj_view());
    }

    store.clear();
    log::info!("Graceful shutdown. Bye!");
    Ok(())
}

//! Core types: math re-exports, Bounds, Camera.

pub use glam::{Mat4, Vec2, Vec3, vec2, vec3};

pub mod bounds;
pub mod camera;

pub use bounds::Bounds;
pub use camera::Camera;

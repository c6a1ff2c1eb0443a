//! Vista Core - Shared value types for the Vista glTF toolkit
//!
//! This crate provides the foundational types used by the other crates:
//! - Mathematical primitives (re-exported from glam)
//! - Node transforms, either an explicit matrix or translation/rotation/scale
//! - Linear RGBA colors

pub mod types;

pub use glam::{DMat4, DQuat, DVec3, Mat4, Quat, Vec3, Vec4};
pub use types::{Color, NodeTransform, Transform};

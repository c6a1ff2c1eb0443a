//! Core types shared by the decoder and the renderer

use glam::{DMat4, DQuat, DVec3};
use serde::{Deserialize, Serialize};

/// Translation, rotation and scale of a scene node.
///
/// Stored in double precision, matching the precision of JSON numbers in
/// the source document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: DVec3,
    pub rotation: DQuat,
    pub scale: DVec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
            scale: DVec3::ONE,
        }
    }
}

impl Transform {
    /// Create a new transform at the given translation
    pub fn from_translation(translation: DVec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Compose the local matrix as `T * R * S`.
    ///
    /// Scale is applied to vertices first, then rotation, then translation.
    /// The rotation quaternion is used exactly as stored: a non-unit
    /// quaternion produces a non-rigid matrix.
    pub fn matrix(&self) -> DMat4 {
        DMat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// The local transform of a node: an explicit matrix or a TRS triple.
///
/// The two forms are mutually exclusive. When a document carries both, the
/// decoder keeps the matrix and drops the TRS members.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NodeTransform {
    /// Column-major matrix, used as given.
    Matrix(DMat4),
    Trs(Transform),
}

impl Default for NodeTransform {
    fn default() -> Self {
        NodeTransform::Trs(Transform::default())
    }
}

impl NodeTransform {
    /// Resolve to a single 4x4 matrix.
    pub fn matrix(&self) -> DMat4 {
        match self {
            NodeTransform::Matrix(m) => *m,
            NodeTransform::Trs(trs) => trs.matrix(),
        }
    }
}

/// RGBA color with floating point components (0.0 to 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);

    /// Create a color from RGB values (alpha = 1.0)
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Create a color from RGBA values
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Convert to an array [r, g, b, a]
    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl From<[f32; 4]> for Color {
    fn from(v: [f32; 4]) -> Self {
        Self::rgba(v[0], v[1], v[2], v[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: DMat4, b: DMat4) -> bool {
        a.to_cols_array()
            .iter()
            .zip(b.to_cols_array().iter())
            .all(|(x, y)| (x - y).abs() < 1e-12)
    }

    #[test]
    fn default_trs_is_identity() {
        assert_eq!(NodeTransform::default().matrix(), DMat4::IDENTITY);
        assert_eq!(Transform::default().matrix(), DMat4::IDENTITY);
    }

    #[test]
    fn translation_lands_in_last_column() {
        let transform = Transform::from_translation(DVec3::new(1.0, 2.0, 3.0));
        let matrix = transform.matrix();
        assert_eq!(matrix.col(3).truncate(), DVec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn matrix_form_is_returned_as_given() {
        let cols: [f64; 16] = [
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0,
        ];
        let m = DMat4::from_cols_array(&cols);
        assert_eq!(NodeTransform::Matrix(m).matrix().to_cols_array(), cols);
    }

    #[test]
    fn trs_composes_scale_then_rotation_then_translation() {
        let trs = Transform {
            translation: DVec3::new(10.0, 0.0, 0.0),
            rotation: DQuat::from_rotation_z(std::f64::consts::FRAC_PI_2),
            scale: DVec3::new(2.0, 2.0, 2.0),
        };
        // (1,0,0) -> scaled (2,0,0) -> rotated (0,2,0) -> translated (10,2,0)
        let p = trs.matrix().transform_point3(DVec3::X);
        assert!((p - DVec3::new(10.0, 2.0, 0.0)).length() < 1e-12);

        let expected = DMat4::from_translation(trs.translation)
            * DMat4::from_quat(trs.rotation)
            * DMat4::from_scale(trs.scale);
        assert!(approx_eq(trs.matrix(), expected));
    }

    #[test]
    fn non_unit_quaternion_is_not_normalized() {
        let (x, y, z, w) = (1.0, 0.0, 0.0, 1.0);
        let trs = Transform {
            rotation: DQuat::from_xyzw(x, y, z, w),
            ..Default::default()
        };
        let m = trs.matrix();
        // Standard quaternion-to-matrix terms, evaluated without normalization.
        assert!((m.x_axis.x - (1.0 - 2.0 * (y * y + z * z))).abs() < 1e-12);
        assert!((m.y_axis.y - (1.0 - 2.0 * (x * x + z * z))).abs() < 1e-12);
        assert!((m.z_axis.y - (2.0 * (y * z - x * w))).abs() < 1e-12);
        assert!((m.y_axis.z - (2.0 * (y * z + x * w))).abs() < 1e-12);
        // A unit quaternion would keep the axis length at 1; this one does not.
        assert!((m.y_axis.truncate().length() - 1.0).abs() > 0.5);
    }

    #[test]
    fn color_defaults_to_opaque_white() {
        assert_eq!(Color::default().to_array(), [1.0, 1.0, 1.0, 1.0]);
    }
}

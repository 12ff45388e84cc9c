/// Inspector - edits the selected object's transform, camera field of view and light falloff

use glam::{EulerRot, Quat, Vec3};
use crate::scene::{Scene, SceneObjectKey, Transform};

/// Wrap an angle in degrees to [-180, 180)
pub fn wrap_degrees(angle: f32) -> f32 {
    (angle + 180.0).rem_euclid(360.0) - 180.0
}

/// Round to `dp` decimal places
pub fn round_dp(value: f32, dp: i32) -> f32 {
    let factor = 10f32.powi(dp);
    (value * factor).round() / factor
}

/// Wrapped, 2 dp rounded Euler degrees (x = pitch, y = yaw, z = roll) and
/// the rotation `yaw(Y) * pitch(X) * roll(Z)` they describe
pub fn euler_degrees_to_quat(degrees: Vec3) -> (Vec3, Quat) {
    let degrees = Vec3::new(
        round_dp(wrap_degrees(degrees.x), 2),
        round_dp(wrap_degrees(degrees.y), 2),
        round_dp(wrap_degrees(degrees.z), 2),
    );
    let rotation = Quat::from_euler(
        EulerRot::YXZ,
        degrees.y.to_radians(),
        degrees.x.to_radians(),
        degrees.z.to_radians(),
    );
    (degrees, rotation)
}

/// Euler degrees (x = pitch, y = yaw, z = roll) of a rotation
fn quat_to_euler_degrees(rotation: Quat) -> Vec3 {
    let (yaw, pitch, roll) = rotation.to_euler(EulerRot::YXZ);
    Vec3::new(pitch.to_degrees(), yaw.to_degrees(), roll.to_degrees())
}

/// Field of view limits accepted by the inspector
pub const FOV_RANGE: (f32, f32) = (1.0, 179.0);

/// Inspector window state
///
/// Rotation is edited as Euler degrees cached per selected object, so
/// dragging through gimbal-equivalent angles does not jump.
#[derive(Debug, Clone, Default)]
pub struct InspectorState {
    cached_for: Option<SceneObjectKey>,
    euler_degrees: Vec3,
}

impl InspectorState {
    /// Refresh the Euler cache when the selection changed
    pub fn sync(&mut self, scene: &Scene, selected: Option<SceneObjectKey>) {
        if self.cached_for == selected {
            return;
        }
        self.cached_for = selected;
        self.euler_degrees = selected
            .and_then(|key| scene.object(key))
            .map(|object| quat_to_euler_degrees(object.transform.rotation))
            .unwrap_or(Vec3::ZERO);
    }

    pub fn euler_degrees(&self) -> Vec3 {
        self.euler_degrees
    }

    pub fn set_position(&self, scene: &mut Scene, key: SceneObjectKey, position: Vec3) -> bool {
        self.edit(scene, key, |transform| transform.position = position)
    }

    pub fn set_scale(&self, scene: &mut Scene, key: SceneObjectKey, scale: Vec3) -> bool {
        self.edit(scene, key, |transform| transform.scale = scale)
    }

    /// Store the edited angles (wrapped, rounded) and write the rotation
    pub fn set_euler_degrees(&mut self, scene: &mut Scene, key: SceneObjectKey, degrees: Vec3) -> bool {
        let (degrees, rotation) = euler_degrees_to_quat(degrees);
        if !self.edit(scene, key, |transform| transform.rotation = rotation) {
            return false;
        }
        self.cached_for = Some(key);
        self.euler_degrees = degrees;
        true
    }

    /// Set a camera's field of view, clamped to [1, 179]; `false` for non-cameras
    pub fn set_fov(&self, scene: &mut Scene, key: SceneObjectKey, fov_degrees: f32) -> bool {
        match scene.object_mut(key).and_then(|object| object.as_camera_mut()) {
            Some(camera) => {
                camera.fov_degrees = fov_degrees.clamp(FOV_RANGE.0, FOV_RANGE.1);
                true
            }
            None => false,
        }
    }

    /// Set a point light's radius and intensity, both floored at zero; `false` for non-lights
    pub fn set_light_falloff(&self, scene: &mut Scene, key: SceneObjectKey, radius: f32, intensity: f32) -> bool {
        match scene.object_mut(key).and_then(|object| object.as_point_light_mut()) {
            Some(light) => {
                light.radius = radius.max(0.0);
                light.intensity = intensity.max(0.0);
                true
            }
            None => false,
        }
    }

    fn edit(&self, scene: &mut Scene, key: SceneObjectKey, apply: impl FnOnce(&mut Transform)) -> bool {
        match scene.object_mut(key) {
            Some(object) => {
                apply(&mut object.transform);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "inspector_tests.rs"]
mod tests;

//! Exponential smoothing of local translations.

use bevy::prelude::*;

/// Eases an entity's local translation toward a target every frame.
#[derive(Component)]
pub struct SmoothTranslation {
    /// Target local translation (None = hold still)
    pub target: Option<Vec3>,
    /// Interpolation speed multiplier (higher = faster)
    pub speed: f32,
}

impl SmoothTranslation {
    pub fn new(speed: f32) -> Self {
        Self { target: None, speed }
    }
}

/// Step factor for frame-rate dependent lerping, clamped so it never overshoots.
pub fn lerp_factor(speed: f32, dt: f32) -> f32 {
    (speed * dt).clamp(0.0, 1.0)
}

/// System that interpolates translations toward their targets.
pub fn update_smooth_translations(
    time: Res<Time>,
    mut query: Query<(&mut Transform, &SmoothTranslation)>,
) {
    let dt = time.delta_secs();

    for (mut transform, smooth) in query.iter_mut() {
        if let Some(target) = smooth.target {
            let t = lerp_factor(smooth.speed, dt);
            transform.translation = transform.translation.lerp(target, t);
        }
    }
}

//! Viewer visibility heuristics.
//!
//! Pure geometry over two [`Location`]s; the tracker only consumes the
//! resulting boolean. Distances are horizontal (the vertical axis is handled
//! by the view-cone check).

use std::f32::consts::PI;

use crate::platform::Location;

const Y_RENDER_THRESHOLD: f32 = 45.0 * PI / 180.0;
const X_RENDER_THRESHOLD: f32 = Y_RENDER_THRESHOLD * 1.78;
const IN_POINT_THRESHOLD: f32 = 10.0 * PI / 180.0;

/// Tunables for sight tracing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SightConfig {
    /// Disables the cone check entirely when false.
    pub trace: bool,
    /// Beyond this horizontal distance the target is never visible.
    pub max_distance: f32,
    /// Within this horizontal distance the target is always visible.
    pub min_distance: f32,
}

impl Default for SightConfig {
    fn default() -> Self {
        Self {
            trace: true,
            max_distance: 45.0,
            min_distance: 5.0,
        }
    }
}

/// Whether a viewer at `player` should see a model at `target`.
#[must_use]
pub fn can_see(config: &SightConfig, player: &Location, target: &Location) -> bool {
    if !config.trace {
        return true;
    }
    if player.world != target.world {
        return false;
    }
    let d = horizontal_distance(player, target);
    if d > config.max_distance {
        return false;
    }
    if d <= config.min_distance {
        return true;
    }
    // Widen the cone as the target gets closer to the screen edges.
    let t = PI - d.atan().abs() * 2.0;
    in_degree(player, target, t + Y_RENDER_THRESHOLD, t + X_RENDER_THRESHOLD)
}

/// Whether `target` sits directly in the viewer's crosshair.
#[must_use]
pub fn is_in_point(player: &Location, target: &Location) -> bool {
    player.world == target.world
        && in_degree(player, target, IN_POINT_THRESHOLD, IN_POINT_THRESHOLD)
}

fn horizontal_distance(a: &Location, b: &Location) -> f32 {
    let dx = a.position.x - b.position.x;
    let dz = a.position.z - b.position.z;
    (dx * dx + dz * dz).sqrt()
}

fn in_degree(player: &Location, target: &Location, ty: f32, tz: f32) -> bool {
    let yaw = player.yaw.to_radians();
    let pitch = -player.pitch.to_radians();

    let dx = target.position.x - player.position.x;
    let dy = target.position.y - player.position.y;
    let dz = target.position.z - player.position.z;

    let ry = (dy.atan2((dz * dz + dx * dx).sqrt()) - pitch).abs();
    let rz = ((-dx).atan2(dz) - yaw).abs();
    (ry <= ty || ry >= PI * 2.0 - ty) && (rz <= tz || rz >= PI * 2.0 - tz)
}

//! Scene trace queries.
//!
//! Gameplay code asks "is anything between here and there?" through the
//! [`SceneTrace`] trait so the crouch and camera logic can be driven by a
//! fake scene in tests. [`RapierTrace`] answers it from Rapier's query
//! pipeline, ignoring player colliders and sensors (triggers).

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

/// Collision group every player collider belongs to.
pub const PLAYER_GROUP: Group = Group::GROUP_2;

/// Collision groups for a player body: member of the player group, collides with everything.
pub fn player_collision_groups() -> CollisionGroups {
    CollisionGroups::new(PLAYER_GROUP, Group::ALL)
}

/// A trace that struck geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceHit {
    pub position: Vec3,
    pub normal: Vec3,
}

/// Outcome of a trace from `start` to `end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceResult {
    pub start: Vec3,
    pub end: Vec3,
    pub hit: Option<TraceHit>,
}

impl TraceResult {
    pub fn miss(start: Vec3, end: Vec3) -> Self {
        Self { start, end, hit: None }
    }

    pub fn is_hit(&self) -> bool {
        self.hit.is_some()
    }

    /// Where the trace stopped: the hit position, or the full end point.
    pub fn end_position(&self) -> Vec3 {
        self.hit.map_or(self.end, |hit| hit.position)
    }
}

/// Line and swept-sphere queries against the scene, excluding players and triggers.
pub trait SceneTrace {
    fn ray(&self, start: Vec3, end: Vec3) -> TraceResult;

    fn sphere(&self, start: Vec3, end: Vec3, radius: f32) -> TraceResult;
}

/// [`SceneTrace`] backed by a Rapier context.
pub struct RapierTrace<'a> {
    context: &'a RapierContext,
}

impl<'a> RapierTrace<'a> {
    pub fn new(context: &'a RapierContext) -> Self {
        Self { context }
    }

    fn filter() -> QueryFilter<'static> {
        QueryFilter::new()
            .exclude_sensors()
            .groups(CollisionGroups::new(Group::ALL, Group::ALL ^ PLAYER_GROUP))
    }
}

impl SceneTrace for RapierTrace<'_> {
    fn ray(&self, start: Vec3, end: Vec3) -> TraceResult {
        let offset = end - start;
        let length = offset.length();
        if length <= f32::EPSILON {
            return TraceResult::miss(start, end);
        }

        let hit = self
            .context
            .cast_ray_and_get_normal(start, offset / length, length, true, Self::filter())
            .map(|(_, intersection)| TraceHit {
                position: intersection.point,
                normal: intersection.normal,
            });

        TraceResult { start, end, hit }
    }

    fn sphere(&self, start: Vec3, end: Vec3, radius: f32) -> TraceResult {
        let offset = end - start;
        if offset.length_squared() <= f32::EPSILON {
            return TraceResult::miss(start, end);
        }

        let shape = Collider::ball(radius);
        let options = ShapeCastOptions {
            max_time_of_impact: 1.0,
            target_distance: 0.0,
            stop_at_penetration: true,
            compute_impact_geometry_on_penetration: true,
        };

        let hit = self
            .context
            .cast_shape(start, Quat::IDENTITY, offset, &shape, options, Self::filter())
            .map(|(_, cast)| {
                let center = start + offset * cast.time_of_impact;
                match cast.details {
                    Some(details) => TraceHit {
                        position: details.witness1,
                        normal: details.normal1,
                    },
                    None => TraceHit {
                        position: center,
                        normal: -offset.normalize(),
                    },
                }
            });

        TraceResult { start, end, hit }
    }
}

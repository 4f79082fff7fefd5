//! Spatial index over live players and the per-session visibility sets
//! derived from it.
//!
//! No crate in this workspace's dependency stack offers a quadtree or
//! similar spatial index, and the internal structure of the index is an
//! implementation choice, so this hand-rolls a uniform grid: a
//! HashMap from cell coordinate to the session ids whose players fall in
//! that cell. A grid sized to VIEW_DISTANCE answers the same "players
//! within range" query a quadtree would, with less code and no recursive
//! node management, at the cost of degrading on very sparse/very dense
//! distributions this arena never produces.

use std::collections::{HashMap, HashSet};

use crate::constants::VIEW_DISTANCE;

type CellCoord = (i32, i32);

fn cell_of(position: glam::Vec2) -> CellCoord {
    (
        (position.x / VIEW_DISTANCE).floor() as i32,
        (position.y / VIEW_DISTANCE).floor() as i32,
    )
}

#[derive(Default)]
pub struct SpatialIndex {
    cells: HashMap<CellCoord, Vec<String>>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn insert(&mut self, session_id: &str, position: glam::Vec2) {
        self.cells
            .entry(cell_of(position))
            .or_default()
            .push(session_id.to_string());
    }

    /// Session ids whose inserted position is within `radius` of `center`,
    /// scanning this cell and its eight neighbors (sufficient since the
    /// grid cell size equals the query radius).
    pub fn query_radius(&self, center: glam::Vec2, radius: f32, positions: &HashMap<String, glam::Vec2>) -> Vec<String> {
        let (cx, cy) = cell_of(center);
        let radius_sq = radius * radius;
        let mut result = Vec::new();
        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(ids) = self.cells.get(&(cx + dx, cy + dy)) else {
                    continue;
                };
                for id in ids {
                    if let Some(pos) = positions.get(id) {
                        if center.distance_squared(*pos) <= radius_sq {
                            result.push(id.clone());
                        }
                    }
                }
            }
        }
        result
    }
}

/// Per-client visibility sets, refreshed once a second, plus the immediate
/// bullet-spawn visibility bypass that avoids the refresh-rate lag for
/// fast-moving bullets.
#[derive(Default)]
pub struct InterestManager {
    index: SpatialIndex,
    views: HashMap<String, HashSet<String>>,
}

impl InterestManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the spatial index and every session's visible-peers set.
    /// `players` maps session id to position for every live player.
    pub fn refresh(&mut self, players: &HashMap<String, glam::Vec2>) {
        self.index.clear();
        for (id, pos) in players {
            self.index.insert(id, *pos);
        }

        for (session_id, position) in players {
            let mut visible: HashSet<String> = self
                .index
                .query_radius(*position, VIEW_DISTANCE, players)
                .into_iter()
                .collect();
            visible.insert(session_id.clone());
            self.views.insert(session_id.clone(), visible);
        }

        self.views.retain(|id, _| players.contains_key(id));
    }

    pub fn drop_session(&mut self, session_id: &str) {
        self.views.remove(session_id);
    }

    pub fn visible_peers(&self, session_id: &str) -> Option<&HashSet<String>> {
        self.views.get(session_id)
    }

    /// Sessions whose player is within VIEW_DISTANCE of a bullet's spawn
    /// point, computed by a direct scan rather than waiting for the next
    /// refresh.
    pub fn sessions_seeing_point(&self, point: glam::Vec2, players: &HashMap<String, glam::Vec2>) -> HashSet<String> {
        players
            .iter()
            .filter(|(_, pos)| point.distance_squared(**pos) <= VIEW_DISTANCE * VIEW_DISTANCE)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

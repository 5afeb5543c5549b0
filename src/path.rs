//! Path assets: what a path-follow step drives along.
//!
//! Paths are looked up by name through a [`PathLibrary`]. [`PathDirectory`] reads
//! the planner's `.path` JSON files from disk; [`InMemoryPaths`] holds them in a map.

use glam::Vec2;
use serde::Deserialize;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// File extension used by stored path assets.
pub const PATH_EXTENSION: &str = "path";

/// Why a path asset could not be produced.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("path '{name}' not found")]
    NotFound { name: String },

    #[error("path '{name}' is malformed: {source}")]
    Malformed {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("path '{name}' is invalid: {reason}")]
    Invalid { name: String, reason: String },

    #[error("failed to read path '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl PathError {
    fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// A resolved, drivable path.
#[derive(Clone, Debug, PartialEq)]
pub struct PathDescriptor {
    pub name: String,
    /// Anchor points in field coordinates (meters).
    pub waypoints: Vec<Vec2>,
    /// m/s
    pub max_velocity: f32,
    /// m/s²
    pub max_acceleration: f32,
    /// Drive the path backwards.
    pub reversed: bool,
}

impl PathDescriptor {
    /// Builds a descriptor, rejecting paths that could never be followed.
    pub fn new(
        name: impl Into<String>,
        waypoints: Vec<Vec2>,
        max_velocity: f32,
        max_acceleration: f32,
    ) -> Result<Self, PathError> {
        let name = name.into();
        if waypoints.len() < 2 {
            return Err(PathError::invalid(&name, "needs at least two waypoints"));
        }
        if !waypoints.iter().all(|w| w.is_finite()) {
            return Err(PathError::invalid(&name, "waypoint is not finite"));
        }
        if !(max_velocity.is_finite() && max_velocity > 0.0) {
            return Err(PathError::invalid(&name, "max velocity must be positive"));
        }
        if !(max_acceleration.is_finite() && max_acceleration > 0.0) {
            return Err(PathError::invalid(&name, "max acceleration must be positive"));
        }
        Ok(Self {
            name,
            waypoints,
            max_velocity,
            max_acceleration,
            reversed: false,
        })
    }

    pub fn reversed(mut self, reversed: bool) -> Self {
        self.reversed = reversed;
        self
    }

    /// Polyline length through all anchors.
    pub fn length(&self) -> f32 {
        self.waypoints
            .windows(2)
            .map(|w| w[0].distance(w[1]))
            .sum()
    }

    /// Travel time under a trapezoidal velocity profile, starting and ending at rest.
    ///
    /// Short paths that never reach `max_velocity` fall back to a triangular profile.
    pub fn estimated_duration(&self) -> Duration {
        let length = self.length();
        let v = self.max_velocity;
        let a = self.max_acceleration;

        // Distance spent accelerating plus decelerating.
        let ramp_distance = v * v / a;
        let secs = if length >= ramp_distance {
            2.0 * v / a + (length - ramp_distance) / v
        } else {
            2.0 * (length / a).sqrt()
        };
        Duration::try_from_secs_f32(secs).unwrap_or(Duration::ZERO)
    }

    pub fn start(&self) -> Option<Vec2> {
        self.waypoints.first().copied()
    }

    pub fn end(&self) -> Option<Vec2> {
        self.waypoints.last().copied()
    }
}

/// Name-keyed source of path assets.
pub trait PathLibrary: Send + Sync {
    fn load(&self, name: &str) -> Result<PathDescriptor, PathError>;
}

/// Map-backed library, handy for simulation and tests.
#[derive(Clone, Debug, Default)]
pub struct InMemoryPaths {
    paths: HashMap<String, PathDescriptor>,
}

impl InMemoryPaths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `path` under its own name, replacing any previous entry.
    pub fn insert(&mut self, path: PathDescriptor) {
        self.paths.insert(path.name.clone(), path);
    }

    pub fn with_path(mut self, path: PathDescriptor) -> Self {
        self.insert(path);
        self
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl PathLibrary for InMemoryPaths {
    fn load(&self, name: &str) -> Result<PathDescriptor, PathError> {
        self.paths
            .get(name)
            .cloned()
            .ok_or_else(|| PathError::NotFound {
                name: name.to_string(),
            })
    }
}

/// Loads `<root>/<name>.path` files written by the path planner.
#[derive(Clone, Debug)]
pub struct PathDirectory {
    root: PathBuf,
}

impl PathDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_for(&self, name: &str) -> Result<PathBuf, PathError> {
        // Names are asset names, not relative paths.
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(PathError::invalid(name, "not a valid path asset name"));
        }
        Ok(self.root.join(format!("{name}.{PATH_EXTENSION}")))
    }
}

impl PathLibrary for PathDirectory {
    fn load(&self, name: &str) -> Result<PathDescriptor, PathError> {
        let file = self.file_for(name)?;
        let text = std::fs::read_to_string(&file).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => PathError::NotFound {
                name: name.to_string(),
            },
            _ => PathError::Io {
                name: name.to_string(),
                source,
            },
        })?;
        parse_path_file(name, &text)
    }
}

// On-disk shape. Only the fields needed to drive the path are read.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PathFile {
    waypoints: Vec<WaypointFile>,
    global_constraints: ConstraintsFile,
    #[serde(default)]
    reversed: bool,
}

#[derive(Deserialize)]
struct WaypointFile {
    anchor: PointFile,
}

#[derive(Deserialize)]
struct PointFile {
    x: f32,
    y: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConstraintsFile {
    max_velocity: f32,
    max_acceleration: f32,
}

/// Parses the contents of a `.path` file into a descriptor named `name`.
pub fn parse_path_file(name: &str, text: &str) -> Result<PathDescriptor, PathError> {
    let file: PathFile = serde_json::from_str(text).map_err(|source| PathError::Malformed {
        name: name.to_string(),
        source,
    })?;
    let waypoints = file
        .waypoints
        .iter()
        .map(|w| Vec2::new(w.anchor.x, w.anchor.y))
        .collect();
    Ok(PathDescriptor::new(
        name,
        waypoints,
        file.global_constraints.max_velocity,
        file.global_constraints.max_acceleration,
    )?
    .reversed(file.reversed))
}

//! Map rendering seam.
//!
//! The session never draws anything. It allocates marker and line handles,
//! owns the lists of live handles, and emits [`MapCommand`]s; a
//! [`MapProvider`] turns them into pixels and reports clicks back by handle.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::place::{Coordinates, Place};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineHandle(pub u64);

impl std::fmt::Display for MarkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "marker#{}", self.0)
    }
}

impl std::fmt::Display for LineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line#{}", self.0)
    }
}

/// Render instruction emitted by a session transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "snake_case")]
pub enum MapCommand {
    AddMarker {
        handle: MarkerHandle,
        place: Place,
        label: String,
        /// Clickable candidate rather than a visited stop.
        candidate: bool,
    },
    AddLine {
        handle: LineHandle,
        points: Vec<Coordinates>,
    },
    ClearMarkers(Vec<MarkerHandle>),
    ClearLines(Vec<LineHandle>),
    PanTo(Coordinates),
    SetZoom(u8),
    FitToAddress(String),
}

/// External map renderer.
pub trait MapProvider {
    fn add_marker(&mut self, handle: MarkerHandle, place: &Place, label: &str, candidate: bool);
    fn add_line(&mut self, handle: LineHandle, points: &[Coordinates]);
    fn clear_markers(&mut self, handles: &[MarkerHandle]);
    fn clear_lines(&mut self, handles: &[LineHandle]);
    fn pan_to(&mut self, coordinates: Coordinates);
    fn set_zoom(&mut self, level: u8);
    /// Geocode `label` and fit the camera to it.
    fn fit_to_address(&mut self, label: &str);
}

/// Forward a batch of commands to a provider, in order.
pub fn render<M: MapProvider + ?Sized>(map: &mut M, commands: &[MapCommand]) {
    for command in commands {
        match command {
            MapCommand::AddMarker {
                handle,
                place,
                label,
                candidate,
            } => map.add_marker(*handle, place, label, *candidate),
            MapCommand::AddLine { handle, points } => map.add_line(*handle, points),
            MapCommand::ClearMarkers(handles) => map.clear_markers(handles),
            MapCommand::ClearLines(handles) => map.clear_lines(handles),
            MapCommand::PanTo(coordinates) => map.pan_to(*coordinates),
            MapCommand::SetZoom(level) => map.set_zoom(*level),
            MapCommand::FitToAddress(label) => map.fit_to_address(label),
        }
    }
}

/// Marker as drawn by [`MemoryMap`].
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnMarker {
    pub place: Place,
    pub label: String,
    pub candidate: bool,
}

/// Headless provider that keeps the drawn scene in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryMap {
    pub markers: BTreeMap<MarkerHandle, DrawnMarker>,
    pub lines: BTreeMap<LineHandle, Vec<Coordinates>>,
    pub center: Option<Coordinates>,
    pub zoom: Option<u8>,
    pub fitted: Option<String>,
}

impl MemoryMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clickable candidate markers currently on screen.
    pub fn candidate_markers(&self) -> impl Iterator<Item = (MarkerHandle, &DrawnMarker)> {
        self.markers
            .iter()
            .filter(|(_, marker)| marker.candidate)
            .map(|(handle, marker)| (*handle, marker))
    }
}

impl MapProvider for MemoryMap {
    fn add_marker(&mut self, handle: MarkerHandle, place: &Place, label: &str, candidate: bool) {
        self.markers.insert(
            handle,
            DrawnMarker {
                place: place.clone(),
                label: label.to_string(),
                candidate,
            },
        );
    }

    fn add_line(&mut self, handle: LineHandle, points: &[Coordinates]) {
        self.lines.insert(handle, points.to_vec());
    }

    fn clear_markers(&mut self, handles: &[MarkerHandle]) {
        for handle in handles {
            self.markers.remove(handle);
        }
    }

    fn clear_lines(&mut self, handles: &[LineHandle]) {
        for handle in handles {
            self.lines.remove(handle);
        }
    }

    fn pan_to(&mut self, coordinates: Coordinates) {
        self.center = Some(coordinates);
    }

    fn set_zoom(&mut self, level: u8) {
        self.zoom = Some(level);
    }

    fn fit_to_address(&mut self, label: &str) {
        self.fitted = Some(label.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::place::fixtures::{london, paris};

    #[test]
    fn render_applies_commands_in_order() {
        let mut map = MemoryMap::new();
        let commands = vec![
            MapCommand::FitToAddress("London".to_string()),
            MapCommand::PanTo(london().coordinates),
            MapCommand::SetZoom(4),
            MapCommand::AddMarker {
                handle: MarkerHandle(1),
                place: paris(),
                label: "Paris".to_string(),
                candidate: true,
            },
            MapCommand::AddLine {
                handle: LineHandle(2),
                points: vec![london().coordinates, paris().coordinates],
            },
            MapCommand::ClearMarkers(vec![MarkerHandle(1)]),
        ];
        render(&mut map, &commands);
        assert!(map.markers.is_empty());
        assert_eq!(map.lines.len(), 1);
        assert_eq!(map.zoom, Some(4));
        assert_eq!(map.fitted.as_deref(), Some("London"));
        assert_eq!(map.center, Some(london().coordinates));
    }

    #[test]
    fn commands_serialize_with_op_tag() {
        let value = serde_json::to_value(MapCommand::SetZoom(3)).unwrap();
        assert_eq!(value["op"], "set_zoom");
        assert_eq!(value["args"], 3);
        let value = serde_json::to_value(MapCommand::AddLine {
            handle: LineHandle(7),
            points: Vec::new(),
        })
        .unwrap();
        assert_eq!(value["op"], "add_line");
        assert_eq!(value["args"]["handle"], 7);
    }
}

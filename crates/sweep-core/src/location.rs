//! Location registry: named groups of mesh element ids.
//!
//! Three independent text files feed the registry, one per element kind:
//!
//! ```text
//! Location 1: 101,102,103
//! Location 2: 240,241
//! ```
//!
//! The files share a name space but need not declare the same names. A
//! location that never appears in, say, the faces file simply has no face
//! set and is skipped by face-based metrics.
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};

/// Mesh element kind a location group refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Cells,
    Faces,
    FacePoints,
}

impl ElementKind {
    pub const ALL: [ElementKind; 3] = [ElementKind::Cells, ElementKind::Faces, ElementKind::FacePoints];

    pub fn label(self) -> &'static str {
        match self {
            ElementKind::Cells => "cells",
            ElementKind::Faces => "faces",
            ElementKind::FacePoints => "face points",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub cells: Option<Vec<usize>>,
    pub faces: Option<Vec<usize>>,
    pub face_points: Option<Vec<usize>>,
}

impl Location {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cells: None,
            faces: None,
            face_points: None,
        }
    }

    /// Element ids of the given kind, or `None` if the location never declared them.
    pub fn elements(&self, kind: ElementKind) -> Option<&[usize]> {
        match kind {
            ElementKind::Cells => self.cells.as_deref(),
            ElementKind::Faces => self.faces.as_deref(),
            ElementKind::FacePoints => self.face_points.as_deref(),
        }
    }

    fn slot_mut(&mut self, kind: ElementKind) -> &mut Option<Vec<usize>> {
        match kind {
            ElementKind::Cells => &mut self.cells,
            ElementKind::Faces => &mut self.faces,
            ElementKind::FacePoints => &mut self.face_points,
        }
    }
}

/// Parse `name:id1,id2,...` lines into ordered (name, ids) pairs.
///
/// `name:` with nothing after the colon yields an empty id list; the metric
/// engine rejects such a location when it needs that set.
pub fn parse_element_groups(text: &str, source_name: &str) -> Result<Vec<(String, Vec<usize>)>> {
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let Some((name, ids)) = line.split_once(':') else {
            return Err(SweepError::parse(source_name, line_no, "expected `name:id1,id2,...`"));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(SweepError::parse(source_name, line_no, "empty location name"));
        }
        if groups.iter().any(|(n, _)| n == name) {
            return Err(SweepError::parse(
                source_name,
                line_no,
                format!("location {name:?} declared twice"),
            ));
        }

        let ids = ids.trim();
        let parsed = if ids.is_empty() {
            Vec::new()
        } else {
            ids.split(',')
                .map(|tok| {
                    let tok = tok.trim();
                    tok.parse::<usize>().map_err(|_| {
                        SweepError::parse(
                            source_name,
                            line_no,
                            format!("element id {tok:?} is not a non-negative integer"),
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()?
        };
        groups.push((name.to_string(), parsed));
    }

    Ok(groups)
}

/// All declared locations, in order of first appearance across the cells,
/// faces and face-point files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationRegistry {
    locations: Vec<Location>,
}

impl LocationRegistry {
    pub fn from_texts(cells: &str, faces: &str, face_points: &str) -> Result<Self> {
        let mut registry = Self::default();
        registry.merge(ElementKind::Cells, parse_element_groups(cells, "cells")?);
        registry.merge(ElementKind::Faces, parse_element_groups(faces, "faces")?);
        registry.merge(
            ElementKind::FacePoints,
            parse_element_groups(face_points, "face points")?,
        );
        Ok(registry)
    }

    pub fn from_files(cells: &Path, faces: &Path, face_points: &Path) -> Result<Self> {
        let mut registry = Self::default();
        for (kind, path) in [
            (ElementKind::Cells, cells),
            (ElementKind::Faces, faces),
            (ElementKind::FacePoints, face_points),
        ] {
            let text = fs::read_to_string(path).map_err(|e| SweepError::io(path, e))?;
            let groups = parse_element_groups(&text, &path.display().to_string())?;
            registry.merge(kind, groups);
        }
        Ok(registry)
    }

    fn merge(&mut self, kind: ElementKind, groups: Vec<(String, Vec<usize>)>) {
        for (name, ids) in groups {
            let idx = match self.index_of(&name) {
                Some(idx) => idx,
                None => {
                    self.locations.push(Location::named(&name));
                    self.locations.len() - 1
                }
            };
            *self.locations[idx].slot_mut(kind) = Some(ids);
        }
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.locations.iter().position(|l| l.name == name)
    }

    /// Locations that declare a set of `kind`, with their registry index.
    pub fn declaring(&self, kind: ElementKind) -> impl Iterator<Item = (usize, &Location)> {
        self.locations
            .iter()
            .enumerate()
            .filter(move |(_, l)| l.elements(kind).is_some())
    }

    /// Declared names of locations that carry a set of `kind`.
    pub fn names_with(&self, kind: ElementKind) -> Vec<String> {
        self.declaring(kind).map(|(_, l)| l.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_groups_with_whitespace() {
        let groups = parse_element_groups("Location 1: 1, 2,3\n\nLocation 2:7\n", "cells").unwrap();
        assert_eq!(
            groups,
            vec![
                ("Location 1".to_string(), vec![1, 2, 3]),
                ("Location 2".to_string(), vec![7]),
            ]
        );
    }

    #[test]
    fn empty_rhs_declares_empty_set() {
        let groups = parse_element_groups("dry:\n", "faces").unwrap();
        assert_eq!(groups, vec![("dry".to_string(), vec![])]);
    }

    #[test]
    fn rejects_missing_colon_and_bad_ids() {
        let err = parse_element_groups("a:1\nb 2,3\n", "cells").unwrap_err();
        assert!(matches!(err, SweepError::Parse { line: 2, .. }), "got {err:?}");

        let err = parse_element_groups("a:1,-4\n", "cells").unwrap_err();
        assert!(matches!(err, SweepError::Parse { line: 1, .. }), "got {err:?}");

        let err = parse_element_groups("a:1\na:2\n", "cells").unwrap_err();
        assert!(matches!(err, SweepError::Parse { line: 2, .. }), "got {err:?}");
    }

    #[test]
    fn registry_merges_kinds_in_first_appearance_order() {
        let reg = LocationRegistry::from_texts(
            "up:0,1\ndown:2\n",
            "down:5\nchannel:6,7\n",
            "channel:9\n",
        )
        .unwrap();

        let names: Vec<&str> = reg.locations().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["up", "down", "channel"]);

        let channel = &reg.locations()[2];
        assert!(channel.cells.is_none());
        assert_eq!(channel.elements(ElementKind::Faces), Some(&[6, 7][..]));
        assert_eq!(channel.elements(ElementKind::FacePoints), Some(&[9][..]));

        assert_eq!(reg.names_with(ElementKind::Faces), vec!["down", "channel"]);
        assert_eq!(reg.names_with(ElementKind::Cells), vec!["up", "down"]);
    }
}

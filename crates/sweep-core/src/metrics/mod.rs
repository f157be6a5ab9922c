//! Location-level metrics reduced from one scenario's results store.
pub mod depth;
pub mod inundation;
pub mod stream_power;
pub mod velocity;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::{Channel, ResultsStore, TimeSeries};
use crate::error::{Result, SweepError};
use crate::location::{ElementKind, LocationRegistry};

pub use depth::location_depth;
pub use inundation::{location_inundation, Inundation};
pub use stream_power::location_stream_power;
pub use velocity::location_velocity;

/// Default wet threshold for inundation (metres).
pub const DEFAULT_MIN_DEPTH: f64 = 0.00508;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Depth,
    Velocity,
    Duration,
    PercentTimeInundated,
    StreamPower,
}

impl MetricKind {
    pub const ALL: [MetricKind; 5] = [
        MetricKind::Depth,
        MetricKind::Velocity,
        MetricKind::Duration,
        MetricKind::PercentTimeInundated,
        MetricKind::StreamPower,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MetricKind::Depth => "depth",
            MetricKind::Velocity => "velocity",
            MetricKind::Duration => "duration",
            MetricKind::PercentTimeInundated => "percent_time_inundated",
            MetricKind::StreamPower => "stream_power",
        }
    }

    /// Element set the metric is reduced over.
    pub fn element_kind(self) -> ElementKind {
        match self {
            MetricKind::Depth | MetricKind::Duration | MetricKind::PercentTimeInundated => ElementKind::Cells,
            MetricKind::StreamPower => ElementKind::Faces,
            MetricKind::Velocity => ElementKind::FacePoints,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.label() == label)
    }
}

// ── Shared reductions ────────────────────────────────────────────────────────

/// Reject empty sets, empty series and ids beyond the channel width.
pub(crate) fn check_elements(
    series: &TimeSeries,
    channel: Channel,
    location: &str,
    ids: &[usize],
    element_set: &'static str,
) -> Result<()> {
    if ids.is_empty() {
        return Err(SweepError::EmptyLocation {
            location: location.to_string(),
            element_set,
        });
    }
    if series.steps == 0 {
        return Err(SweepError::EmptyLocation {
            location: location.to_string(),
            element_set: "time steps",
        });
    }
    if let Some(&element) = ids.iter().find(|&&id| id >= series.elements) {
        return Err(SweepError::ElementOutOfRange {
            channel: channel.name(),
            location: location.to_string(),
            element,
            width: series.elements,
        });
    }
    Ok(())
}

/// max(|x|) over every time step of one element.
pub(crate) fn abs_max(series: &TimeSeries, element: usize) -> f64 {
    series.column(element).map(f64::abs).fold(0.0, f64::max)
}

// ── Per-scenario extraction ───────────────────────────────────────────────────

/// One metric's values for one scenario, in location declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricColumn {
    pub kind: MetricKind,
    pub values: Vec<(String, f64)>,
}

/// Reduce one results store into all five metrics.
///
/// Cell metrics cover locations that declare cells, stream power those that
/// declare faces, velocity those that declare face points.
pub fn extract_metrics(
    store: &ResultsStore,
    registry: &LocationRegistry,
    min_depth: f64,
) -> Result<Vec<MetricColumn>> {
    let mut depth = Vec::new();
    let mut duration = Vec::new();
    let mut percent = Vec::new();
    for (_, loc) in registry.declaring(ElementKind::Cells) {
        let cells = loc.cells.as_deref().unwrap_or_default();
        let wet = location_inundation(&store.depth, &loc.name, cells, min_depth)?;
        percent.push((loc.name.clone(), wet.percent_time));
        duration.push((loc.name.clone(), wet.duration_steps));
        depth.push((loc.name.clone(), location_depth(&store.depth, &loc.name, cells)?));
    }

    let mut stream_power = Vec::new();
    for (_, loc) in registry.declaring(ElementKind::Faces) {
        let faces = loc.faces.as_deref().unwrap_or_default();
        let sp = location_stream_power(&store.face_shear_stress, &store.face_velocity, &loc.name, faces)?;
        stream_power.push((loc.name.clone(), sp));
    }

    let mut velocity = Vec::new();
    for (_, loc) in registry.declaring(ElementKind::FacePoints) {
        let points = loc.face_points.as_deref().unwrap_or_default();
        let v = location_velocity(&store.node_x_velocity, &store.node_y_velocity, &loc.name, points)?;
        velocity.push((loc.name.clone(), v));
    }

    Ok(vec![
        MetricColumn { kind: MetricKind::Depth, values: depth },
        MetricColumn { kind: MetricKind::Velocity, values: velocity },
        MetricColumn { kind: MetricKind::Duration, values: duration },
        MetricColumn { kind: MetricKind::PercentTimeInundated, values: percent },
        MetricColumn { kind: MetricKind::StreamPower, values: stream_power },
    ])
}

// ── Accumulation ──────────────────────────────────────────────────────────────

/// (scenario, location) → value table for one metric kind.
///
/// Rows follow scenario declaration order, columns the declaration order of
/// the locations carrying the metric's element set. Unfilled cells are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricGrid {
    pub kind: MetricKind,
    pub scenarios: Vec<String>,
    pub locations: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl MetricGrid {
    pub fn new(kind: MetricKind, scenarios: Vec<String>, locations: Vec<String>) -> Self {
        let values = vec![vec![None; locations.len()]; scenarios.len()];
        Self { kind, scenarios, locations, values }
    }

    pub fn scenario_index(&self, name: &str) -> Option<usize> {
        self.scenarios.iter().position(|s| s == name)
    }

    pub fn location_index(&self, name: &str) -> Option<usize> {
        self.locations.iter().position(|l| l == name)
    }

    pub fn get(&self, location: &str, scenario: &str) -> Option<f64> {
        let row = self.scenario_index(scenario)?;
        let col = self.location_index(location)?;
        *self.values.get(row)?.get(col)?
    }

    /// Store a value, adding the scenario or location if it is new.
    pub fn insert(&mut self, location: &str, scenario: &str, value: f64) {
        let row = match self.scenario_index(scenario) {
            Some(row) => row,
            None => {
                self.scenarios.push(scenario.to_string());
                self.values.push(vec![None; self.locations.len()]);
                self.values.len() - 1
            }
        };
        let col = match self.location_index(location) {
            Some(col) => col,
            None => {
                self.locations.push(location.to_string());
                for r in &mut self.values {
                    r.push(None);
                }
                self.locations.len() - 1
            }
        };
        let width = self.locations.len();
        self.values.resize_with(self.scenarios.len(), || vec![None; width]);
        let cells = &mut self.values[row];
        if cells.len() < width {
            cells.resize(width, None);
        }
        cells[col] = Some(value);
    }

    /// Filled cells as (location, scenario, value).
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, f64)> + '_ {
        self.scenarios.iter().enumerate().flat_map(move |(r, s)| {
            self.locations
                .iter()
                .enumerate()
                .filter_map(move |(c, l)| {
                    let v = self.values.get(r)?.get(c).copied().flatten()?;
                    Some((l.as_str(), s.as_str(), v))
                })
        })
    }

    pub fn is_complete(&self) -> bool {
        self.values.iter().all(|row| row.iter().all(Option::is_some))
    }

    /// Check that `values` is `scenarios × locations`.
    pub fn check_shape(&self, source_name: &str) -> Result<()> {
        if self.values.len() != self.scenarios.len() {
            return Err(SweepError::parse(
                source_name,
                0,
                format!(
                    "{} grid has {} rows for {} scenarios",
                    self.kind.label(),
                    self.values.len(),
                    self.scenarios.len()
                ),
            ));
        }
        if let Some((r, row)) = self.values.iter().enumerate().find(|(_, row)| row.len() != self.locations.len()) {
            return Err(SweepError::parse(
                source_name,
                0,
                format!(
                    "{} grid row {:?} has {} values for {} locations",
                    self.kind.label(),
                    self.scenarios[r],
                    row.len(),
                    self.locations.len()
                ),
            ));
        }
        Ok(())
    }
}

/// All five metric grids for a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSet {
    pub grids: Vec<MetricGrid>,
}

impl MetricSet {
    pub fn new(scenarios: &[String], registry: &LocationRegistry) -> Self {
        let grids = MetricKind::ALL
            .into_iter()
            .map(|kind| MetricGrid::new(kind, scenarios.to_vec(), registry.names_with(kind.element_kind())))
            .collect();
        Self { grids }
    }

    pub fn grid(&self, kind: MetricKind) -> Option<&MetricGrid> {
        self.grids.iter().find(|g| g.kind == kind)
    }

    fn grid_mut(&mut self, kind: MetricKind) -> &mut MetricGrid {
        if let Some(i) = self.grids.iter().position(|g| g.kind == kind) {
            return &mut self.grids[i];
        }
        self.grids.push(MetricGrid::new(kind, Vec::new(), Vec::new()));
        let last = self.grids.len() - 1;
        &mut self.grids[last]
    }

    /// Record one scenario's extracted columns.
    pub fn record(&mut self, scenario: &str, columns: Vec<MetricColumn>) {
        for column in columns {
            let grid = self.grid_mut(column.kind);
            for (location, value) in column.values {
                grid.insert(&location, scenario, value);
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.grids.iter().all(MetricGrid::is_complete)
    }

    /// Parse a metrics file written by a previous sweep, rejecting grids whose
    /// values do not match their scenario and location lists.
    pub fn from_json(text: &str, source_name: &str) -> Result<Self> {
        let set: Self =
            serde_json::from_str(text).map_err(|e| SweepError::parse(source_name, e.line(), e.to_string()))?;
        for grid in &set.grids {
            grid.check_shape(source_name)?;
        }
        Ok(set)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| SweepError::io(path, e))?;
        Self::from_json(&text, &path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn store() -> ResultsStore {
        let depth = TimeSeries::from_rows(vec![
            vec![0.0, 1.0, 0.2],
            vec![2.0, 4.0, 0.0],
            vec![1.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0],
        ])
        .unwrap();
        let shear = TimeSeries::from_rows(vec![vec![1.0, 1.0], vec![-5.0, 1.0], vec![2.0, 1.0]]).unwrap();
        let vel = TimeSeries::from_rows(vec![vec![3.0, 1.0], vec![1.0, 1.0], vec![-4.0, 1.0]]).unwrap();
        let x = TimeSeries::from_rows(vec![vec![3.0, -6.0], vec![1.0, 0.0]]).unwrap();
        let y = TimeSeries::from_rows(vec![vec![-4.0, 0.0], vec![0.0, 0.0]]).unwrap();
        ResultsStore {
            depth,
            face_velocity: vel,
            face_shear_stress: shear,
            node_x_velocity: x,
            node_y_velocity: y,
        }
    }

    #[test]
    fn extracts_all_metrics_per_declared_set() {
        let registry = LocationRegistry::from_texts("a:0,1\nb:2\n", "b:0,1\n", "a:0,1\n").unwrap();
        let columns = extract_metrics(&store(), &registry, 0.5).unwrap();

        let depth = &columns[0];
        assert_eq!(depth.kind, MetricKind::Depth);
        assert_eq!(depth.values[0].0, "a");
        assert_relative_eq!(depth.values[0].1, 3.0);
        assert_relative_eq!(depth.values[1].1, 0.2);

        let velocity = &columns[1];
        assert_eq!(velocity.values, vec![("a".to_string(), 6.0)]);

        let sp = &columns[4];
        assert_eq!(sp.values, vec![("b".to_string(), 20.0)]);
    }

    #[test]
    fn grid_insert_and_completeness() {
        let mut grid = MetricGrid::new(MetricKind::Depth, vec!["S1".into(), "S2".into()], vec!["a".into()]);
        assert!(!grid.is_complete());
        grid.insert("a", "S1", 1.0);
        grid.insert("a", "S2", 2.0);
        assert!(grid.is_complete());
        assert_eq!(grid.get("a", "S2"), Some(2.0));

        grid.insert("z", "S1", 3.0);
        assert_eq!(grid.locations, vec!["a", "z"]);
        assert!(!grid.is_complete());
        assert_eq!(grid.entries().count(), 3);
    }

    #[test]
    fn metric_set_records_columns() {
        let registry = LocationRegistry::from_texts("a:0\n", "a:0\n", "a:0\n").unwrap();
        let mut set = MetricSet::new(&["S1".to_string()], &registry);
        assert!(!set.is_complete());
        set.record("S1", extract_metrics(&store(), &registry, 0.5).unwrap());
        assert!(set.is_complete());
        assert_eq!(set.grid(MetricKind::Duration).unwrap().get("a", "S1"), Some(2.0));
    }

    #[test]
    fn ragged_grid_is_rejected_on_load() {
        let json = r#"{"grids": [{
            "kind": "depth",
            "scenarios": ["S1", "S2"],
            "locations": ["L1", "L2"],
            "values": [[1.0, 2.0], [3.0]]
        }]}"#;
        let err = MetricSet::from_json(json, "metrics.json").unwrap_err();
        assert!(matches!(err, SweepError::Parse { .. }), "got {err:?}");

        let short = r#"{"grids": [{
            "kind": "depth", "scenarios": ["S1", "S2"], "locations": ["L1"], "values": [[1.0]]
        }]}"#;
        assert!(matches!(MetricSet::from_json(short, "m").unwrap_err(), SweepError::Parse { .. }));

        let ok = r#"{"grids": [{
            "kind": "depth", "scenarios": ["S1"], "locations": ["L1"], "values": [[null]]
        }]}"#;
        let set = MetricSet::from_json(ok, "m").unwrap();
        assert!(!set.is_complete());
    }

    #[test]
    fn ragged_grid_lookups_do_not_panic() {
        let mut grid = MetricGrid {
            kind: MetricKind::Depth,
            scenarios: vec!["S1".into(), "S2".into()],
            locations: vec!["L1".into(), "L2".into()],
            values: vec![vec![Some(1.0), Some(2.0)], vec![Some(3.0)]],
        };
        assert_eq!(grid.get("L2", "S2"), None);
        assert_eq!(grid.entries().count(), 3);

        grid.insert("L2", "S2", 4.0);
        assert_eq!(grid.get("L2", "S2"), Some(4.0));
        assert!(grid.is_complete());
    }

    #[test]
    fn labels_round_trip() {
        for kind in MetricKind::ALL {
            assert_eq!(MetricKind::from_label(kind.label()), Some(kind));
        }
        assert_eq!(MetricKind::from_label("flux"), None);
    }
}

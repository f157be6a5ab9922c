//! Scenario sweeps over an external hydraulic solver.
//!
//! Option and scenario catalogs are composed into the solver's geometry
//! input one scenario at a time; each run's time series are reduced to
//! per-location metrics and compared against the baseline scenario.
pub mod composer;
pub mod config;
pub mod engine;
pub mod error;
pub mod location;
pub mod matrix;
pub mod metrics;
pub mod options;
pub mod scenario;
pub mod sweep;

pub use composer::{compose_geometry, ComposedGeometry, ProjectLayout, TerrainSlot};
pub use config::RunConfig;
pub use engine::{Channel, CommandEngine, EngineRun, ResultsStore, SimulationEngine, TimeSeries};
pub use error::{Result, SweepError};
pub use location::{ElementKind, Location, LocationRegistry};
pub use matrix::{build_matrix, percent_difference, MetricReport, PercentDifferenceMatrix, ResultMatrix};
pub use metrics::{MetricGrid, MetricKind, MetricSet};
pub use options::OptionCatalog;
pub use scenario::{Scenario, ScenarioCatalog};
pub use sweep::Sweep;

//! Geometry composer: turns a scenario into the engine's fixed-name geometry
//! input and activates the scenario's terrain file.
//!
//! The engine reads terrain from `<stem><active_ext>.hdf` and geometry from
//! `<stem><active_ext>`. Each terrain variant names a geometry text file such
//! as `Model.g03`; that file is the splice template, and its extension picks
//! the terrain data file `Model.g03.hdf` that is renamed into the active slot
//! for the duration of the run.
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};
use crate::options::OptionCatalog;
use crate::scenario::Scenario;

const ANCHOR_MARKER: &str = "rating curve";

/// Where the engine project lives and which names it reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectLayout {
    pub dir: PathBuf,
    /// Geometry base name shared by the text and HDF files, e.g. `BlackCreekModel`.
    pub geometry_stem: String,
    /// Extension of the slot the engine reads, e.g. `.g01`.
    pub active_slot_ext: String,
}

impl ProjectLayout {
    /// Composed geometry input the engine reads.
    pub fn geometry_input(&self) -> PathBuf {
        self.dir.join(format!("{}{}", self.geometry_stem, self.active_slot_ext))
    }

    /// Fixed terrain slot the engine reads.
    pub fn active_terrain(&self) -> PathBuf {
        self.terrain_data(&self.active_slot_ext)
    }

    /// Terrain data file for a variant extension such as `.g03`.
    pub fn terrain_data(&self, ext: &str) -> PathBuf {
        self.dir.join(format!("{}{}.hdf", self.geometry_stem, ext))
    }
}

/// Remove a terrain file left in the active slot by an interrupted batch.
/// Returns whether a file was removed.
pub fn clear_stale_slot(layout: &ProjectLayout) -> Result<bool> {
    let active = layout.active_terrain();
    if !active.exists() {
        return Ok(false);
    }
    fs::remove_file(&active).map_err(|e| SweepError::io(&active, e))?;
    tracing::info!(path = %active.display(), "removed stale terrain slot");
    Ok(true)
}

// ── Terrain slot ──────────────────────────────────────────────────────────────

/// Scoped hold on the active terrain slot.
///
/// Acquiring renames the scenario's terrain file into the slot; releasing
/// renames it back. Dropping an unreleased slot releases it and logs any
/// failure, so the slot is freed on every exit path.
#[derive(Debug)]
pub struct TerrainSlot {
    original: PathBuf,
    active: PathBuf,
    held: bool,
}

impl TerrainSlot {
    pub fn acquire(original: &Path, active: &Path) -> Result<Self> {
        if original != active {
            if active.exists() {
                return Err(SweepError::TerrainSlotOccupied(active.to_path_buf()));
            }
            fs::rename(original, active).map_err(|e| SweepError::io(original, e))?;
            tracing::debug!(from = %original.display(), to = %active.display(), "terrain slot acquired");
        }
        Ok(Self {
            original: original.to_path_buf(),
            active: active.to_path_buf(),
            held: true,
        })
    }

    pub fn active(&self) -> &Path {
        &self.active
    }

    /// Rename the terrain file back to its scenario-specific name.
    pub fn release(mut self) -> Result<()> {
        self.restore()
    }

    fn restore(&mut self) -> Result<()> {
        if !self.held {
            return Ok(());
        }
        self.held = false;
        if self.original != self.active {
            fs::rename(&self.active, &self.original).map_err(|e| SweepError::io(&self.active, e))?;
            tracing::debug!(to = %self.original.display(), "terrain slot released");
        }
        Ok(())
    }
}

impl Drop for TerrainSlot {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            tracing::warn!(error = %e, "failed to release terrain slot");
        }
    }
}

// ── Composition ───────────────────────────────────────────────────────────────

/// A written geometry input plus the terrain slot it depends on.
#[derive(Debug)]
pub struct ComposedGeometry {
    pub scenario: String,
    pub geometry_path: PathBuf,
    /// 0-based line of the template's first "rating curve" line.
    pub anchor_line: usize,
    pub slot: TerrainSlot,
}

/// Compose the geometry input for `scenario` and activate its terrain file.
///
/// On any failure after the slot was acquired, the slot is released before
/// the error is returned.
pub fn compose_geometry(
    scenario: &Scenario,
    catalog: &OptionCatalog,
    layout: &ProjectLayout,
) -> Result<ComposedGeometry> {
    let mut chosen = Vec::with_capacity(scenario.choices.len());
    for (cat, &choice) in scenario.choices.iter().enumerate() {
        let variant = catalog.variant(cat, choice).ok_or_else(|| {
            SweepError::Validation(format!(
                "scenario {:?} picks missing variant {choice} of category {cat}",
                scenario.name
            ))
        })?;
        chosen.push(variant);
    }
    let terrain_file = chosen
        .first()
        .and_then(|v| v.terrain_file())
        .ok_or_else(|| SweepError::Validation(format!("scenario {:?} has no terrain choice", scenario.name)))?;

    let ext = Path::new(terrain_file)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .ok_or_else(|| SweepError::Validation(format!("terrain file {terrain_file:?} has no extension")))?;

    let template_path = layout.dir.join(terrain_file);
    let geometry_path = layout.geometry_input();
    if template_path == geometry_path {
        return Err(SweepError::Validation(format!(
            "terrain file {terrain_file:?} would be overwritten by the composed geometry"
        )));
    }

    let slot = TerrainSlot::acquire(&layout.terrain_data(&ext), &layout.active_terrain())?;

    let blocks: Vec<&[String]> = chosen[1..].iter().map(|v| v.lines()).collect();
    let written = fs::read_to_string(&template_path)
        .map_err(|e| SweepError::io(&template_path, e))
        .and_then(|template| splice_at_anchor(&template, &blocks, &template_path))
        .and_then(|(text, anchor_line)| {
            fs::write(&geometry_path, text)
                .map(|_| anchor_line)
                .map_err(|e| SweepError::io(&geometry_path, e))
        });

    match written {
        Ok(anchor_line) => {
            tracing::debug!(scenario = %scenario.name, anchor_line, "geometry composed");
            Ok(ComposedGeometry {
                scenario: scenario.name.clone(),
                geometry_path,
                anchor_line,
                slot,
            })
        }
        Err(e) => {
            if let Err(release_err) = slot.release() {
                tracing::warn!(error = %release_err, "failed to release terrain slot");
            }
            Err(e)
        }
    }
}

/// Insert `blocks`, in order, immediately before the first line containing
/// "rating curve" (ASCII case-insensitive). Returns the new text and the
/// anchor's 0-based line index in the template.
pub fn splice_at_anchor(template: &str, blocks: &[&[String]], source: &Path) -> Result<(String, usize)> {
    let lines: Vec<&str> = template.split_inclusive('\n').collect();
    let anchor = lines
        .iter()
        .position(|l| l.to_ascii_lowercase().contains(ANCHOR_MARKER))
        .ok_or_else(|| SweepError::AnchorNotFound(source.to_path_buf()))?;

    let inserted: usize = blocks.iter().map(|b| b.iter().map(String::len).sum::<usize>()).sum();
    let mut out = String::with_capacity(template.len() + inserted);
    for line in &lines[..anchor] {
        out.push_str(line);
    }
    for block in blocks {
        for line in block.iter() {
            out.push_str(line);
        }
    }
    for line in &lines[anchor..] {
        out.push_str(line);
    }
    Ok((out, anchor))
}

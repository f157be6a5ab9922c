//! Option catalog: the configuration axes a scenario picks from.
//!
//! The options text has two sections. Everything before the first line that
//! mentions "geometry" declares terrain variants:
//!
//! ```text
//! Terrain Option 1
//! FileName=BlackCreekModel.g02
//! Terrain Option 2
//! FileName=BlackCreekModel.g03
//! ```
//!
//! From that line on, each line mentioning "option" opens a structural
//! variant whose body is every following line, verbatim, up to the next
//! option line:
//!
//! ```text
//! Geometry Structures
//! Culvert Option 1
//! <raw geometry lines>
//! Culvert Option 2
//! <raw geometry lines>
//! ```
//!
//! Marker matching is ASCII case-insensitive substring search, except
//! "FileName" which must match exactly. Terrain variants form category 0.
//! Structural variants are grouped into categories by their label, the text
//! before "option" on the key line (`Culvert` above); consecutive keys with the
//! same label are variants of one category.
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};

const OPTION_MARKER: &str = "option";
const SECTION_MARKER: &str = "geometry";
const TERRAIN_VALUE_MARKER: &str = "FileName";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VariantBody {
    /// Geometry file name whose extension selects the terrain data file.
    Terrain(String),
    /// Raw geometry lines, each with its original line terminator.
    Structure(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    /// The option key line, trimmed.
    pub key: String,
    pub body: VariantBody,
}

impl Variant {
    pub fn terrain_file(&self) -> Option<&str> {
        match &self.body {
            VariantBody::Terrain(file) => Some(file),
            VariantBody::Structure(_) => None,
        }
    }

    pub fn lines(&self) -> &[String] {
        match &self.body {
            VariantBody::Terrain(_) => &[],
            VariantBody::Structure(lines) => lines,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionCategory {
    pub name: String,
    pub variants: Vec<Variant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Terrain,
    Structure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    ExpectCategory,
    ExpectTerrainValue,
    CollectingStructureLines,
}

/// Immutable catalog of option categories in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionCatalog {
    categories: Vec<OptionCategory>,
}

impl OptionCatalog {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| SweepError::io(path, e))?;
        Self::parse(&text, &path.display().to_string())
    }

    pub fn parse(text: &str, source_name: &str) -> Result<Self> {
        let mut terrain: Vec<(String, Option<String>)> = Vec::new();
        let mut structure: Vec<OptionCategory> = Vec::new();
        let mut section = Section::Terrain;
        let mut state = ScanState::ExpectCategory;
        let mut line_no = 0;

        for line in text.split_inclusive('\n') {
            line_no += 1;
            let lower = line.to_ascii_lowercase();

            if section == Section::Terrain && lower.contains(SECTION_MARKER) {
                section = Section::Structure;
                state = ScanState::ExpectCategory;
            }

            match section {
                Section::Terrain => {
                    if lower.contains(OPTION_MARKER) {
                        terrain.push((line.trim().to_string(), None));
                        state = ScanState::ExpectTerrainValue;
                    }
                    if line.contains(TERRAIN_VALUE_MARKER) {
                        if state != ScanState::ExpectTerrainValue {
                            return Err(SweepError::parse(
                                source_name,
                                line_no,
                                "FileName line before any terrain option",
                            ));
                        }
                        let Some((_, value)) = line.split_once('=') else {
                            return Err(SweepError::parse(
                                source_name,
                                line_no,
                                "terrain FileName line has no `=` separator",
                            ));
                        };
                        if let Some(last) = terrain.last_mut() {
                            last.1 = Some(value.trim().to_string());
                        }
                    }
                }
                Section::Structure => {
                    if lower.contains(OPTION_MARKER) {
                        let key = line.trim().to_string();
                        let label = category_label(line);
                        let variant = Variant {
                            key,
                            body: VariantBody::Structure(Vec::new()),
                        };
                        match structure.last_mut() {
                            Some(cat) if cat.name == label => cat.variants.push(variant),
                            _ => structure.push(OptionCategory {
                                name: label,
                                variants: vec![variant],
                            }),
                        }
                        state = ScanState::CollectingStructureLines;
                        continue;
                    }
                    if state == ScanState::CollectingStructureLines {
                        let body = structure
                            .last_mut()
                            .and_then(|cat| cat.variants.last_mut())
                            .map(|v| &mut v.body);
                        if let Some(VariantBody::Structure(lines)) = body {
                            lines.push(line.to_string());
                        }
                    }
                }
            }
        }

        if terrain.is_empty() {
            return Err(SweepError::parse(
                source_name,
                line_no,
                "no terrain options declared before the geometry section",
            ));
        }

        let terrain_name = {
            let label = category_label(&terrain[0].0);
            if label.is_empty() { "terrain".to_string() } else { label }
        };
        let mut variants = Vec::with_capacity(terrain.len());
        for (key, value) in terrain {
            let Some(file) = value else {
                return Err(SweepError::parse(
                    source_name,
                    line_no,
                    format!("terrain option {key:?} has no FileName"),
                ));
            };
            variants.push(Variant {
                key,
                body: VariantBody::Terrain(file),
            });
        }

        let mut categories = vec![OptionCategory {
            name: terrain_name,
            variants,
        }];
        categories.extend(structure);

        tracing::debug!(categories = categories.len(), "parsed option catalog");
        Ok(Self { categories })
    }

    pub fn categories(&self) -> &[OptionCategory] {
        &self.categories
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    /// Variant by 1-based index within `category`.
    pub fn variant(&self, category: usize, index: usize) -> Option<&Variant> {
        let cat = self.categories.get(category)?;
        index.checked_sub(1).and_then(|i| cat.variants.get(i))
    }
}

/// Text before the first case-insensitive "option", trimmed.
fn category_label(line: &str) -> String {
    let lower = line.to_ascii_lowercase();
    match lower.find(OPTION_MARKER) {
        Some(at) => line[..at].trim().to_string(),
        None => line.trim().to_string(),
    }
}

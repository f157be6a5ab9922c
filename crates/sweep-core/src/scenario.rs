//! Scenario catalog: `name:i1,i2,...,iN`, one 1-based variant index per
//! option category, in category declaration order.
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};
use crate::options::OptionCatalog;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    /// 1-based variant index per category.
    pub choices: Vec<usize>,
}

/// Validated scenarios in declared order. The first one is the baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioCatalog {
    scenarios: Vec<Scenario>,
}

impl ScenarioCatalog {
    pub fn from_file(path: &Path, options: &OptionCatalog) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| SweepError::io(path, e))?;
        Self::parse(&text, &path.display().to_string(), options)
    }

    pub fn parse(text: &str, source_name: &str, options: &OptionCatalog) -> Result<Self> {
        let mut scenarios: Vec<Scenario> = Vec::new();

        for (i, raw) in text.lines().enumerate() {
            let line_no = i + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let Some((name, indices)) = line.split_once(':') else {
                return Err(SweepError::parse(source_name, line_no, "expected `name:i1,i2,...`"));
            };
            let name = name.trim();
            let choices = indices
                .split(',')
                .map(|tok| {
                    let tok = tok.trim();
                    tok.parse::<usize>().map_err(|_| {
                        SweepError::parse(
                            source_name,
                            line_no,
                            format!("variant index {tok:?} is not an integer"),
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            if scenarios.iter().any(|s| s.name == name) {
                return Err(SweepError::Validation(format!("scenario {name:?} declared twice")));
            }
            let scenario = Scenario {
                name: name.to_string(),
                choices,
            };
            validate(&scenario, options)?;
            scenarios.push(scenario);
        }

        if scenarios.is_empty() {
            return Err(SweepError::Validation(format!(
                "{source_name} declares no scenarios"
            )));
        }
        Ok(Self { scenarios })
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn names(&self) -> Vec<String> {
        self.scenarios.iter().map(|s| s.name.clone()).collect()
    }

    pub fn baseline(&self) -> &Scenario {
        &self.scenarios[0]
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

fn validate(scenario: &Scenario, options: &OptionCatalog) -> Result<()> {
    let expected = options.category_count();
    if scenario.choices.len() != expected {
        return Err(SweepError::Validation(format!(
            "scenario {:?} selects {} variants but {} categories are declared",
            scenario.name,
            scenario.choices.len(),
            expected
        )));
    }
    for (cat, &choice) in options.categories().iter().zip(&scenario.choices) {
        if choice == 0 || choice > cat.variants.len() {
            return Err(SweepError::Validation(format!(
                "scenario {:?} picks variant {} of {:?}, which has {}",
                scenario.name,
                choice,
                cat.name,
                cat.variants.len()
            )));
        }
    }
    Ok(())
}

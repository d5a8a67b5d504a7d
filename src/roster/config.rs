use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::error::RosterError;

/// Tables compiled into the binary; `--tables` replaces them wholesale.
pub const BUILTIN_TABLES: &str = include_str!("../../config/roster.toml");

pub const DEFAULT_GROUP_START_PATTERN: &str = "^Delegacia";
pub const DEFAULT_GROUP_END_PATTERN: &str = "^Total de presos para escolta na Delegacia";
pub const DEFAULT_LABEL_SEPARATOR: &str = " : ";
pub const DEFAULT_HEADER_TEXT: &str = "Nome do Preso";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerConfig {
    #[serde(default = "default_group_start_pattern")]
    pub group_start_pattern: String,
    #[serde(default = "default_group_end_pattern")]
    pub group_end_pattern: String,
    #[serde(default = "default_label_separator")]
    pub label_separator: String,
    #[serde(default = "default_header_text")]
    pub header_text: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            group_start_pattern: default_group_start_pattern(),
            group_end_pattern: default_group_end_pattern(),
            label_separator: default_label_separator(),
            header_text: default_header_text(),
        }
    }
}

fn default_group_start_pattern() -> String {
    DEFAULT_GROUP_START_PATTERN.to_string()
}

fn default_group_end_pattern() -> String {
    DEFAULT_GROUP_END_PATTERN.to_string()
}

fn default_label_separator() -> String {
    DEFAULT_LABEL_SEPARATOR.to_string()
}

fn default_header_text() -> String {
    DEFAULT_HEADER_TEXT.to_string()
}

/// Raw unit labels that collapse to one precinct code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitEntry {
    pub code: String,
    pub labels: Vec<String>,
}

/// Precinct codes delivered together, in presentation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub name: String,
    pub codes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterConfig {
    #[serde(default)]
    pub markers: MarkerConfig,
    #[serde(default)]
    pub units: Vec<UnitEntry>,
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
}

impl RosterConfig {
    pub fn builtin() -> Result<Self, RosterError> {
        Self::from_toml_str(BUILTIN_TABLES)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, RosterError> {
        let config: Self =
            toml::from_str(raw).map_err(|error| RosterError::Tables(error.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects tables that would make classification ambiguous.
    pub fn validate(&self) -> Result<(), RosterError> {
        let mut label_owner = HashMap::<&str, &str>::new();
        let mut unit_codes = HashSet::<&str>::new();
        for unit in &self.units {
            if unit.code.trim().is_empty() {
                return Err(RosterError::Tables("unit entry with empty code".to_string()));
            }
            if !unit_codes.insert(unit.code.as_str()) {
                return Err(RosterError::Tables(format!(
                    "unit code {:?} is declared more than once",
                    unit.code
                )));
            }
            for label in &unit.labels {
                if let Some(previous) = label_owner.insert(label.as_str(), unit.code.as_str())
                    && previous != unit.code
                {
                    return Err(RosterError::Tables(format!(
                        "unit label {label:?} maps to both {previous:?} and {:?}",
                        unit.code
                    )));
                }
            }
        }

        let mut route_names = HashSet::<&str>::new();
        let mut code_owner = HashMap::<&str, &str>::new();
        for route in &self.routes {
            if route.name.trim().is_empty() {
                return Err(RosterError::Tables("route entry with empty name".to_string()));
            }
            if !route_names.insert(route.name.as_str()) {
                return Err(RosterError::Tables(format!(
                    "route {:?} is declared more than once",
                    route.name
                )));
            }
            for code in &route.codes {
                if code.trim().is_empty() {
                    return Err(RosterError::Tables(format!(
                        "route {:?} lists an empty code",
                        route.name
                    )));
                }
                if let Some(previous) = code_owner.insert(code.as_str(), route.name.as_str()) {
                    return Err(RosterError::Tables(format!(
                        "precinct code {code:?} is assigned to both {previous:?} and {:?}",
                        route.name
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn route_names(&self) -> Vec<&str> {
        self.routes.iter().map(|route| route.name.as_str()).collect()
    }

    /// Unit codes that no route claims; their records never reach a plan.
    pub fn unrouted_codes(&self) -> Vec<&str> {
        let routed = self
            .routes
            .iter()
            .flat_map(|route| route.codes.iter().map(String::as_str))
            .collect::<HashSet<&str>>();
        self.units
            .iter()
            .map(|unit| unit.code.as_str())
            .filter(|code| !routed.contains(code))
            .collect()
    }

    pub fn label_count(&self) -> usize {
        self.units.iter().map(|unit| unit.labels.len()).sum()
    }
}

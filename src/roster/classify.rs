use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;

use super::assemble::Record;
use super::config::RosterConfig;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PrecinctCode(String);

impl PrecinctCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrecinctCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Route(String);

impl Route {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Codes and route derived for one record, keyed by its index in the
/// assembled record list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedRecord {
    pub record: usize,
    pub code: PrecinctCode,
    pub route: Route,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub classified: Vec<ClassifiedRecord>,
    /// Raw unit labels with no precinct code, with record counts.
    pub unclassified_units: BTreeMap<String, usize>,
    /// Precinct codes with no route, with record counts.
    pub unrouted_codes: BTreeMap<PrecinctCode, usize>,
}

impl Classification {
    pub fn unclassified_unit_count(&self) -> usize {
        self.unclassified_units.values().sum()
    }

    pub fn unrouted_count(&self) -> usize {
        self.unrouted_codes.values().sum()
    }
}

/// Lookup tables built from [`RosterConfig`]: raw label to code, code to route.
#[derive(Debug, Clone)]
pub struct Classifier {
    units: HashMap<String, PrecinctCode>,
    routes: HashMap<PrecinctCode, Route>,
}

impl Classifier {
    pub fn new(config: &RosterConfig) -> Self {
        let units = config
            .units
            .iter()
            .flat_map(|unit| {
                unit.labels
                    .iter()
                    .map(|label| (label.clone(), PrecinctCode::new(unit.code.clone())))
            })
            .collect();
        let routes = config
            .routes
            .iter()
            .flat_map(|route| {
                route
                    .codes
                    .iter()
                    .map(|code| (PrecinctCode::new(code.clone()), Route::new(route.name.clone())))
            })
            .collect();

        Self { units, routes }
    }

    pub fn unit_code(&self, unit_label: &str) -> Option<&PrecinctCode> {
        self.units.get(unit_label)
    }

    pub fn route_for(&self, code: &PrecinctCode) -> Option<&Route> {
        self.routes.get(code)
    }

    /// Associates each record with its code and route. Records whose label or
    /// code is not in the tables are left out and tallied.
    pub fn classify(&self, records: &[Record]) -> Classification {
        let mut classification = Classification::default();

        for (index, record) in records.iter().enumerate() {
            let Some(code) = self.unit_code(&record.unit_label) else {
                *classification
                    .unclassified_units
                    .entry(record.unit_label.clone())
                    .or_insert(0) += 1;
                continue;
            };
            let Some(route) = self.route_for(code) else {
                *classification
                    .unrouted_codes
                    .entry(code.clone())
                    .or_insert(0) += 1;
                continue;
            };

            classification.classified.push(ClassifiedRecord {
                record: index,
                code: code.clone(),
                route: route.clone(),
            });
        }

        classification
    }
}

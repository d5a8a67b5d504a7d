use std::collections::HashMap;

use super::assemble::Record;
use super::classify::{Classification, PrecinctCode, Route};
use super::config::RosterConfig;
use super::error::RosterError;

/// Routes requested for the current run, in table order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSelection {
    routes: Vec<Route>,
}

impl RouteSelection {
    pub fn all(config: &RosterConfig) -> Self {
        Self {
            routes: config
                .routes
                .iter()
                .map(|route| Route::new(route.name.clone()))
                .collect(),
        }
    }

    /// An empty request selects every configured route. Names are matched
    /// after trimming; an unknown name is rejected.
    pub fn from_names(config: &RosterConfig, names: &[String]) -> Result<Self, RosterError> {
        let requested = names
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .collect::<Vec<&str>>();
        if requested.is_empty() {
            return Ok(Self::all(config));
        }

        let known = config.route_names();
        if let Some(unknown) = requested.iter().copied().find(|name| !known.contains(name)) {
            return Err(RosterError::UnknownRoute {
                route: unknown.to_string(),
                known: known.join(", "),
            });
        }

        Ok(Self {
            routes: known
                .into_iter()
                .filter(|name| requested.contains(name))
                .map(Route::new)
                .collect(),
        })
    }

    pub fn contains(&self, route: &Route) -> bool {
        self.routes.contains(route)
    }

    pub fn names(&self) -> Vec<String> {
        self.routes.iter().map(|route| route.to_string()).collect()
    }
}

/// Records of one precinct, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGroup<'a> {
    pub route: Route,
    pub code: PrecinctCode,
    pub records: Vec<&'a Record>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutePlan<'a> {
    pub groups: Vec<RouteGroup<'a>>,
    /// Classified records whose route was not requested.
    pub filtered_out: usize,
}

impl RoutePlan<'_> {
    pub fn entry_count(&self) -> usize {
        self.groups.iter().map(|group| group.records.len()).sum()
    }
}

/// Keeps records on requested routes and groups them by precinct code.
///
/// Groups follow the route table: routes in declared order, codes in the
/// order each route lists them. Codes with no records are omitted.
pub fn plan_routes<'a>(
    config: &RosterConfig,
    records: &'a [Record],
    classification: &Classification,
    selection: &RouteSelection,
) -> RoutePlan<'a> {
    let mut buckets = HashMap::<&str, Vec<&'a Record>>::new();
    let mut filtered_out = 0usize;

    for entry in &classification.classified {
        if !selection.contains(&entry.route) {
            filtered_out += 1;
            continue;
        }
        if let Some(record) = records.get(entry.record) {
            buckets.entry(entry.code.as_str()).or_default().push(record);
        }
    }

    let mut groups = Vec::new();
    for route in &config.routes {
        let route_key = Route::new(route.name.clone());
        if !selection.contains(&route_key) {
            continue;
        }
        for code in &route.codes {
            let Some(records) = buckets.remove(code.as_str()) else {
                continue;
            };
            groups.push(RouteGroup {
                route: route_key.clone(),
                code: PrecinctCode::new(code.clone()),
                records,
            });
        }
    }

    RoutePlan {
        groups,
        filtered_out,
    }
}

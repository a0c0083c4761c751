//! OSRM HTTP adapter for road distances and durations.
//!
//! Travel matrices come from one `/table` request; single legs use `/route`.

use serde::{Deserialize, Serialize};

use crate::error::{CostModelError, TableError};
use crate::model::{Coordinate, Leg};
use crate::traits::CostModel;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
        }
    }
}

impl OsrmConfig {
    /// Reads `OSRM_BASE_URL`, `OSRM_PROFILE` and `OSRM_TIMEOUT_SECS`,
    /// keeping defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("OSRM_BASE_URL").unwrap_or(defaults.base_url),
            profile: std::env::var("OSRM_PROFILE").unwrap_or(defaults.profile),
            timeout_secs: std::env::var("OSRM_TIMEOUT_SECS")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn table_url(&self, locations: &[Coordinate]) -> String {
        let coords = locations
            .iter()
            .map(|location| format!("{:.6},{:.6}", location.lng, location.lat))
            .collect::<Vec<_>>()
            .join(";");
        format!(
            "{}/table/v1/{}/{}?annotations=distance,duration",
            self.config.base_url, self.config.profile, coords
        )
    }

    fn route_url(&self, from: Coordinate, to: Coordinate) -> String {
        format!(
            "{}/route/v1/{}/{:.6},{:.6};{:.6},{:.6}?overview=false",
            self.config.base_url, self.config.profile, from.lng, from.lat, to.lng, to.lat
        )
    }
}

impl CostModel for OsrmClient {
    fn leg(&self, from: Coordinate, to: Coordinate) -> Result<Leg, CostModelError> {
        if from == to {
            return Ok(Leg::ZERO);
        }

        let body = self
            .client
            .get(self.route_url(from, to))
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<OsrmRouteResponse>())?;

        if body.code != "Ok" {
            tracing::debug!(code = %body.code, "OSRM returned no route");
            return Err(CostModelError::NoRoute);
        }

        body.routes
            .first()
            .map(|route| Leg::new(route.distance, route.duration))
            .ok_or(CostModelError::NoRoute)
    }

    fn table(&self, locations: &[Coordinate]) -> Result<Vec<Vec<Leg>>, TableError> {
        if locations.len() < 2 {
            return Ok(locations.iter().map(|_| vec![Leg::ZERO]).collect());
        }

        let body = self
            .client
            .get(self.table_url(locations))
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<OsrmTableResponse>())
            .map_err(|err| TableError::Table(err.into()))?;

        tracing::debug!(locations = locations.len(), "OSRM table fetched");
        legs_from_table(body, locations.len())
    }
}

/// Pair up the distance and duration tables; `null` cells are unroutable.
fn legs_from_table(body: OsrmTableResponse, n: usize) -> Result<Vec<Vec<Leg>>, TableError> {
    if body.code != "Ok" {
        tracing::debug!(code = %body.code, "OSRM returned no table");
        return Err(TableError::Table(CostModelError::NoRoute));
    }
    let (Some(distances), Some(durations)) = (body.distances, body.durations) else {
        return Err(TableError::Table(CostModelError::Other(
            "OSRM table is missing distances or durations".to_string(),
        )));
    };
    if distances.len() != n || durations.len() != n {
        return Err(TableError::Table(CostModelError::Other(format!(
            "OSRM table has {} rows, expected {n}",
            durations.len()
        ))));
    }

    distances
        .into_iter()
        .zip(durations)
        .enumerate()
        .map(|(from, (distance_row, duration_row))| {
            (0..n)
                .map(|to| {
                    if from == to {
                        return Ok(Leg::ZERO);
                    }
                    match (distance_row.get(to).copied().flatten(), duration_row.get(to).copied().flatten()) {
                        (Some(distance), Some(duration)) => Ok(Leg::new(distance, duration)),
                        _ => Err(TableError::Leg {
                            from,
                            to,
                            source: CostModelError::NoRoute,
                        }),
                    }
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct OsrmTableResponse {
    code: String,
    distances: Option<Vec<Vec<Option<f64>>>>,
    durations: Option<Vec<Vec<Option<f64>>>>,
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_url_uses_lng_lat_order() {
        let client = OsrmClient::new(OsrmConfig::default()).unwrap();
        let url = client.route_url(Coordinate::new(36.1, -115.2), Coordinate::new(36.3, -115.4));
        assert_eq!(
            url,
            "http://localhost:5000/route/v1/car/-115.200000,36.100000;-115.400000,36.300000?overview=false"
        );
    }

    #[test]
    fn test_table_url_joins_all_locations() {
        let client = OsrmClient::new(OsrmConfig::default()).unwrap();
        let url = client.table_url(&[
            Coordinate::new(36.1, -115.2),
            Coordinate::new(36.3, -115.4),
            Coordinate::new(36.5, -115.6),
        ]);
        assert_eq!(
            url,
            "http://localhost:5000/table/v1/car/-115.200000,36.100000;-115.400000,36.300000;-115.600000,36.500000?annotations=distance,duration"
        );
    }

    fn table_response(json: &str) -> OsrmTableResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_table_response_becomes_legs() {
        let body = table_response(
            r#"{"code":"Ok","distances":[[0,1200.5],[1300,0]],"durations":[[0,95.2],[101,0]]}"#,
        );
        let legs = legs_from_table(body, 2).unwrap();
        assert_eq!(legs[0][1], Leg::new(1200.5, 95.2));
        assert_eq!(legs[1][0], Leg::new(1300.0, 101.0));
        assert_eq!(legs[1][1], Leg::ZERO);
    }

    #[test]
    fn test_null_table_cell_names_the_pair() {
        let body = table_response(
            r#"{"code":"Ok","distances":[[0,null],[1300,0]],"durations":[[0,null],[101,0]]}"#,
        );
        assert!(matches!(
            legs_from_table(body, 2),
            Err(TableError::Leg {
                from: 0,
                to: 1,
                source: CostModelError::NoRoute
            })
        ));
    }

    #[test]
    fn test_table_error_code_fails_whole_table() {
        let body = table_response(r#"{"code":"InvalidQuery","message":"bad coordinates"}"#);
        assert!(matches!(legs_from_table(body, 2), Err(TableError::Table(_))));
    }

    #[test]
    fn test_same_point_needs_no_request() {
        let client = OsrmClient::new(OsrmConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            ..OsrmConfig::default()
        })
        .unwrap();
        let point = Coordinate::new(36.1, -115.2);
        assert_eq!(client.leg(point, point).unwrap(), Leg::ZERO);
    }

    #[test]
    fn test_unreachable_server_is_an_error() {
        let client = OsrmClient::new(OsrmConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 1,
            ..OsrmConfig::default()
        })
        .unwrap();
        let result = client.leg(Coordinate::new(36.1, -115.2), Coordinate::new(36.2, -115.3));
        assert!(matches!(result, Err(CostModelError::Http(_))));
    }

    #[test]
    fn test_unreachable_server_fails_whole_table() {
        let client = OsrmClient::new(OsrmConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 1,
            ..OsrmConfig::default()
        })
        .unwrap();
        let result = client.table(&[Coordinate::new(36.1, -115.2), Coordinate::new(36.2, -115.3)]);
        assert!(matches!(result, Err(TableError::Table(CostModelError::Http(_)))));
    }
}

//! OSRM-backed optimization against a real road network.
//!
//! Needs a prepared Nevada MLD dataset (`nevada-latest.osrm*`) in
//! `OSRM_DATA_DIR` and a Docker daemon. Run with `cargo test -- --ignored`.

mod fixtures;

use std::env;
use std::time::{Duration, Instant};

use testcontainers::core::{IntoContainerPort, Mount};
use testcontainers::runners::SyncRunner;
use testcontainers::{Container, GenericImage, ImageExt, ReuseDirective, TestcontainersError};

use route_optimizer::osrm::{OsrmClient, OsrmConfig};
use route_optimizer::{Algorithm, CostModel, OptimizeRequest, RouteOptimizer, SearchBudget};

use fixtures::las_vegas_deliveries::{PICKUPS, STRIP_DROPOFFS, driver_at, dropoff_stops};

fn osrm_container() -> Result<(Container<GenericImage>, String), TestcontainersError> {
    let data_dir = env::var("OSRM_DATA_DIR").unwrap_or_else(|_| "osrm-data".to_string());

    let image = GenericImage::new("osrm/osrm-backend", "latest")
        .with_exposed_port(5000.tcp())
        .with_mount(Mount::bind_mount(data_dir, "/data"))
        .with_cmd(vec!["osrm-routed", "--algorithm", "mld", "/data/nevada-latest.osrm"])
        .with_container_name("route-optimizer-osrm-nevada")
        .with_startup_timeout(Duration::from_secs(30))
        .with_reuse(ReuseDirective::Always);

    let container = image.start()?;
    let port = container.get_host_port_ipv4(5000.tcp())?;
    Ok((container, format!("http://127.0.0.1:{port}")))
}

/// osrm-routed accepts connections before the graph is loaded.
fn wait_until_routable(client: &OsrmClient) {
    let from = STRIP_DROPOFFS[0].coordinate();
    let to = STRIP_DROPOFFS[1].coordinate();
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(15) {
        if client.leg(from, to).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(500));
    }
}

fn client_for(base_url: String) -> OsrmClient {
    OsrmClient::new(OsrmConfig {
        base_url,
        ..OsrmConfig::default()
    })
    .expect("build OSRM client")
}

#[test]
#[ignore = "requires Docker and a prepared OSRM dataset"]
fn osrm_leg_returns_road_distance() {
    let (container, base_url) = osrm_container().expect("start OSRM container");
    let client = client_for(base_url);
    wait_until_routable(&client);

    let from = STRIP_DROPOFFS[0].coordinate();
    let to = STRIP_DROPOFFS[1].coordinate();
    let leg = client.leg(from, to).expect("road leg");

    // Road distance is never shorter than the great circle.
    let crow_metres = route_optimizer::haversine::HaversineCostModel::haversine_km(from, to) * 1000.0;
    assert!(leg.distance >= crow_metres * 0.99, "{} < {}", leg.distance, crow_metres);
    assert!(leg.duration > 0.0);

    drop(container);
}

#[test]
#[ignore = "requires Docker and a prepared OSRM dataset"]
fn osrm_table_agrees_with_single_legs() {
    let (container, base_url) = osrm_container().expect("start OSRM container");
    let client = client_for(base_url);
    wait_until_routable(&client);

    let locations: Vec<_> = STRIP_DROPOFFS[..4].iter().map(|address| address.coordinate()).collect();
    let table = client.table(&locations).expect("road table");

    assert_eq!(table.len(), locations.len());
    for (from, row) in table.iter().enumerate() {
        assert_eq!(row[from].distance, 0.0);
        for (to, leg) in row.iter().enumerate().filter(|(to, _)| *to != from) {
            let single = client.leg(locations[from], locations[to]).expect("road leg");
            // Both endpoints snap to the same road segments.
            assert!((leg.distance - single.distance).abs() <= single.distance * 0.05 + 1.0);
        }
    }

    drop(container);
}

#[test]
#[ignore = "requires Docker and a prepared OSRM dataset"]
fn osrm_strip_route_is_optimized() {
    let (container, base_url) = osrm_container().expect("start OSRM container");
    let client = client_for(base_url);
    wait_until_routable(&client);

    let optimizer = RouteOptimizer::new(client);
    let stops = dropoff_stops(STRIP_DROPOFFS);
    let request = OptimizeRequest::new(driver_at(&PICKUPS[0]), stops, Algorithm::TwoOpt);

    let route = optimizer
        .optimize(&request, &SearchBudget::unlimited())
        .expect("optimize with OSRM");

    assert_eq!(route.stops().len(), STRIP_DROPOFFS.len());
    assert!(route.totals().distance > 0.0);
    for planned in route.stops() {
        assert!(planned.leg.distance >= 0.0);
    }

    drop(container);
}

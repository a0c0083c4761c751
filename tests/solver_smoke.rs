use route_optimizer::planar::EuclideanCostModel;
use route_optimizer::{Algorithm, DriverPosition, OptimizeRequest, RouteOptimizer, RouteStatus, SearchBudget, Stop};

fn abc_request(algorithm: Algorithm) -> OptimizeRequest {
    let stops = vec![
        Stop::new("A", (1.0, 0.0)),
        Stop::new("B", (2.0, 0.0)),
        Stop::new("C", (0.0, 1.0)),
    ];
    OptimizeRequest::new(DriverPosition::new("driver", (0.0, 0.0), 0.0), stops, algorithm)
}

#[test]
fn nearest_neighbor_visits_a_b_c() {
    let optimizer = RouteOptimizer::new(EuclideanCostModel::default());

    let route = optimizer
        .optimize(&abc_request(Algorithm::NearestNeighbor), &SearchBudget::unlimited())
        .expect("route");

    let ids = route.stop_ids().into_iter().map(|id| id.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["A", "B", "C"]);
    assert!((route.totals().cost - (2.0 + 5f64.sqrt())).abs() < 1e-9);
    assert_eq!(route.status(), RouteStatus::Completed);
    assert!(!route.is_partial());
    assert_eq!(route.version(), 1);
    assert_eq!(route.algorithm(), Algorithm::NearestNeighbor);
}

#[test]
fn two_opt_does_not_increase_nearest_neighbor_cost() {
    let optimizer = RouteOptimizer::new(EuclideanCostModel::default());
    let budget = SearchBudget::unlimited();

    let greedy = optimizer.optimize(&abc_request(Algorithm::NearestNeighbor), &budget).unwrap();
    let improved = optimizer.optimize(&abc_request(Algorithm::TwoOpt), &budget).unwrap();

    assert!(improved.totals().cost <= greedy.totals().cost + 1e-9);
}

#[test]
fn brute_force_finds_c_a_b() {
    let optimizer = RouteOptimizer::new(EuclideanCostModel::default());

    let route = optimizer
        .optimize(&abc_request(Algorithm::BruteForce), &SearchBudget::unlimited())
        .unwrap();

    let ids = route.stop_ids().into_iter().map(|id| id.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["C", "A", "B"]);
    assert!((route.totals().cost - (2.0 + 2f64.sqrt())).abs() < 1e-9);
}

// End-to-end checks through the public API

use approx::assert_relative_eq;
use cramb_allocator::bearing::{CurrentUnits, ForceAllocator, PoleVector, Saturable};
use cramb_allocator::config::{root_strategy, Bearing, BearingConfig};

fn build(json: &str) -> Bearing {
    let config: BearingConfig = serde_json::from_str(json).unwrap();
    config.build().unwrap()
}

#[test]
fn curve_fit_config_reproduces_reference_currents() {
    let bearing = build(r#"{ "model": "curve_fit", "c1": 175.677, "c2": 48.016, "turns": 308 }"#);
    let allocator = ForceAllocator::new(bearing, root_strategy(false));
    let ampere_turns = allocator
        .control_currents(30.0, 100.0, CurrentUnits::AmpereTurns, true)
        .unwrap();
    let expected = PoleVector::new(98.718_390_981_702, 6.111_202_899_970, -104.829_593_881_673);
    assert_relative_eq!(ampere_turns, expected, epsilon = 1e-6);
}

#[test]
fn physical_config_round_trip_through_force() {
    let bearing = build(r#"{ "model": "physical" }"#);
    for analytic in [false, true] {
        let allocator = ForceAllocator::new(bearing.clone(), root_strategy(analytic));
        for alpha in [15.0, 100.0, 222.0] {
            for magnitude in [1e-3, 1e-2, 0.1, 120.0] {
                let currents = allocator
                    .control_currents(alpha, magnitude, CurrentUnits::Amps, true)
                    .unwrap();
                let force = allocator.force_from_currents(&currents);
                assert_relative_eq!(force.magnitude, magnitude, max_relative = 1e-8);
                assert_relative_eq!(force.direction_deg, alpha, epsilon = 1e-6);
            }
        }
    }
}

#[test]
fn rated_force_is_below_hexagon_bound() {
    let Bearing::Physical(bearing) = build(r#"{ "model": "physical" }"#) else {
        panic!("expected a physical bearing");
    };
    let allocator = ForceAllocator::new(bearing, root_strategy(false));
    let rated = allocator.rated_force().unwrap();
    assert!(rated > 0.0);
    assert!(rated < allocator.model().hexagon_bound());
    assert_relative_eq!(rated, 502.608, epsilon = 0.05);
    assert!(rated <= allocator.max_force(30.0).unwrap() + 1e-3);
}

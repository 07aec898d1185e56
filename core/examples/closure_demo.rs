//! Demonstration of the closure driver
//!
//! Run with: cargo run --example closure_demo
//! Set RUST_LOG=geologic_core=debug to watch the merges.

use geologic_core::*;
use num_rational::Rational64;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Geologic Core Closure Demo ===\n");
    let mut core = LogicalCore::new();

    // 1. Incidence
    println!("1. Two points determine a line:");
    let a = core.add_obj(Numeric::point(0.0, 0.0));
    let b = core.add_obj(Numeric::point(3.0, 1.0));
    let ab = core.add_obj(Numeric::line_through(Point2D::new(0.0, 0.0), Point2D::new(3.0, 1.0)));
    let ba = core.add_obj(Numeric::line_through(Point2D::new(3.0, 1.0), Point2D::new(0.0, 0.0)));
    for line in [ab, ba] {
        core.add_constr(Label::LiesOn, &[a, line], &[]);
        core.add_constr(Label::LiesOn, &[b, line], &[]);
    }
    println!("   AB = BA: {}\n", core.check_equal(ab, ba));

    // 2. Angles
    println!("2. Angles modulo a half turn:");
    let x = core.add_obj(Numeric::Angle(0.3));
    let y = core.add_obj(Numeric::Angle(0.8));
    let half = Rational64::new(1, 2);
    let claim = Claim::Angle {
        row: Row::difference(x, y),
        value: half,
    };
    println!("   before: {:?}", core.prove(&claim).map_err(|e| e.to_string()));
    if let Err(err) = core.postulate(claim.clone()) {
        println!("   rejected: {}", err);
    }
    println!("   after:  {:?}", core.prove(&claim).map_err(|e| e.to_string()));
    println!("   x is y: {}\n", core.has_exact_angle_difference(x, y));

    // 3. Ratios
    println!("3. Log-ratio composition:");
    let d1 = core.add_obj(Numeric::Ratio(6f64.ln()));
    let d2 = core.add_obj(Numeric::Ratio(3f64.ln()));
    let d3 = core.add_obj(Numeric::Ratio(0.0));
    let one = Rational64::from_integer(1);
    let diff = |p: Ref, q: Ref| Row::from_terms([(p, one), (q, -one)]);
    for (row, constant) in [(diff(d1, d2), 2), (diff(d2, d3), 3)] {
        if let Err(err) = core.add_ratio_equation(&row, Rational64::from_integer(constant)) {
            println!("   rejected: {}", err);
        }
    }
    println!(
        "   d1 / d3 = 6: {}\n",
        core.check_ratio_equation(&diff(d1, d3), Rational64::from_integer(6))
    );

    // 4. Stats
    println!("4. Core statistics:");
    match serde_json::to_string_pretty(&core.stats()) {
        Ok(json) => println!("{}", json),
        Err(err) => eprintln!("   could not serialize stats: {}", err),
    }
}

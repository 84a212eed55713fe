use approx::assert_relative_eq;
use curve_fitting::numerical::batch::fit_equations;
use curve_fitting::numerical::goodness_of_fit::{Goodness, Statistics};
use curve_fitting::numerical::optimization::fit_options::FitOptions;
use curve_fitting::symbolic::catalog::NamedEquation;
use curve_fitting::symbolic::equation::Equation;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn noisy(x: &[f64], f: impl Fn(f64) -> f64, amplitude: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    x.iter()
        .map(|&x| f(x) + amplitude * (2.0 * rng.random::<f64>() - 1.0))
        .collect()
}

#[test]
fn parabola_from_noisy_data() {
    let eq = Equation::from_named(NamedEquation::Parabola).unwrap();
    let x: Vec<f64> = (0..41).map(|i| i as f64 * 0.5).collect();
    let y = noisy(&x, |x| 0.5 * x * x - 2.0 * x + 3.0, 0.05, 7);
    let mut good = Goodness::new(eq.equation(), x, y, None).unwrap();
    good.fit().unwrap();
    assert!(good.termination().unwrap().was_successful());
    assert_eq!(good.parameters(), vec!["a", "b", "c"]);
    assert_relative_eq!(good.best_fit()[0], 0.5, epsilon = 0.01);
    assert_relative_eq!(good.best_fit()[1], -2.0, epsilon = 0.05);
    assert_relative_eq!(good.best_fit()[2], 3.0, epsilon = 0.1);
    assert!(good.rsq() > 0.999);
    assert!(good.syx() < 0.1);
    assert!(good.rmse() <= good.syx());
    assert!(good.std().iter().all(|s| s.is_finite() && *s > 0.0));
}

#[test]
fn binding_curve_with_derivative_view() {
    let eq = Equation::from_named(NamedEquation::OneSiteSpecificBinding).unwrap();
    let x: Vec<f64> = (1..=40).map(|i| i as f64 * 0.25).collect();
    let y = noisy(&x, |x| 10.0 * x / (2.0 + x), 0.05, 11);
    let mut good = Goodness::new(eq.equation(), x.clone(), y, None).unwrap();
    good.fit_with(&FitOptions::default().with_initial_guess(vec![9.0, 1.5]))
        .unwrap();
    assert_eq!(good.parameters(), vec!["Bmax", "Kd"]);
    let (bmax, kd) = (good.best_fit()[0], good.best_fit()[1]);
    assert_relative_eq!(bmax, 10.0, epsilon = 0.3);
    assert_relative_eq!(kd, 2.0, epsilon = 0.2);

    let slope = good.view(eq.derivative()).unwrap();
    for (xi, d) in x.iter().zip(slope.expected()) {
        assert_relative_eq!(d, bmax * kd / (kd + xi).powi(2), max_relative = 1e-9);
    }
    let curvature = good.view(eq.second_derivative()).unwrap();
    for (xi, d) in x.iter().zip(curvature.expected()) {
        assert_relative_eq!(d, -2.0 * bmax * kd / (kd + xi).powi(3), max_relative = 1e-9);
    }
    let area = good.view(eq.integral()).unwrap();
    let total = area.expect(&[x[x.len() - 1]])[0] - area.expect(&[x[0]])[0];
    let exact = |t: f64| bmax * (t - kd * (kd + t).ln());
    assert_relative_eq!(total, exact(x[x.len() - 1]) - exact(x[0]), max_relative = 1e-9);
}

#[test]
fn weighted_dissociation_kinetics() {
    let eq = Equation::from_named(NamedEquation::DissociationKinetics).unwrap();
    assert_eq!(eq.equation().parameter_names(), vec!["K", "NS", "Y0"]);
    let x: Vec<f64> = (0..30).map(|i| i as f64 * 0.25).collect();
    let y = noisy(&x, |x| 4.0 * (-0.7 * x).exp() + 1.0, 0.02, 3);
    let yerror = vec![0.02; x.len()];
    let options = FitOptions::from_toml_str(
        "initial_guess = [0.5, 0.5, 4.0]\nabsolute_sigma = true\npatience = 100\n",
    )
    .unwrap();
    let mut good = Goodness::new(eq.equation(), x, y, Some(yerror)).unwrap();
    good.fit_with(&options).unwrap();
    assert_relative_eq!(good.best_fit()[0], 0.7, epsilon = 0.05);
    assert_relative_eq!(good.best_fit()[1], 1.0, epsilon = 0.05);
    assert_relative_eq!(good.best_fit()[2], 5.0, epsilon = 0.05);
    let report = good.report();
    assert_eq!(report.equation, "DissociationKinetics");
    assert!(report.stdev.iter().all(|s| s.is_finite()));
    let table = report.to_table();
    assert!(table.contains("DissociationKinetics"));
    assert!(table.contains("RSQ"));
}

#[test]
fn catalog_batch_keeps_going() {
    let equations: Vec<Equation> = [
        NamedEquation::OneSiteSpecificBinding,
        NamedEquation::PadeApproximant,
        NamedEquation::DissociationKinetics,
    ]
    .into_iter()
    .map(|named| Equation::from_named(named).unwrap())
    .collect();
    let x: Vec<f64> = (1..=20).map(|i| i as f64 * 0.5).collect();
    let y = noisy(&x, |x| 10.0 * x / (2.0 + x), 0.05, 5);
    let reports = fit_equations(&equations, &x, &y, None, &FitOptions::default());
    assert_eq!(reports.len(), 3);
    let names: Vec<String> = reports
        .iter()
        .map(|r| r.as_ref().unwrap().equation.clone())
        .collect();
    assert_eq!(
        names,
        vec!["OneSiteSpecificBinding", "PadeApproximant", "DissociationKinetics"]
    );
}

#[test]
fn every_catalog_entry_builds_an_integral() {
    let h = 1e-5;
    // (entry, point in args order)
    let cases = [
        (NamedEquation::SlopedSpecificBinding, vec![2.0, 5.0, 1.8, 1.2]),
        (NamedEquation::Poisson, vec![3.5, 2.5]),
    ];
    for (named, point) in cases {
        let eq = Equation::from_named(named).unwrap();
        assert!(eq.integral_expression().is_none());
        let integral = eq.integral();
        let shifted = |dx: f64| {
            let mut p = point.clone();
            p[0] += dx;
            integral.call(&p).unwrap()
        };
        assert_relative_eq!(
            (shifted(h) - shifted(-h)) / (2.0 * h),
            eq.equation().call(&point).unwrap(),
            epsilon = 1e-6,
            max_relative = 1e-6
        );
    }
}

#[test]
fn sloped_binding_fit_keeps_numeric_integral() {
    let eq = Equation::from_named(NamedEquation::SlopedSpecificBinding).unwrap();
    let x: Vec<f64> = (1..=12).map(|i| i as f64 * 0.5).collect();
    // Bmax, HillSlope, Kd
    let truth = [8.0, 1.5, 2.0];
    let y: Vec<f64> = x.iter().map(|&x| eq.equation().eval(x, &truth)).collect();
    let mut session = Goodness::new(eq.equation(), x, y, None).unwrap();
    session
        .fit_with(&FitOptions::default().with_initial_guess(vec![6.0, 1.0, 1.5]))
        .unwrap();
    let fit = session.best_fit().to_vec();
    for (p, t) in fit.iter().zip(truth) {
        assert_relative_eq!(*p, t, max_relative = 1e-4);
    }
    let area = eq.integral().eval(4.0, &fit);
    assert!(area.is_finite() && area > 0.0);
}

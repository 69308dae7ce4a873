use rand::Rng;
use std::f64::consts::PI;

/// Box-Muller transform to generate normal distribution
pub fn normal_sample<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    // (0, 1] keeps ln() finite
    let u1 = 1.0 - rng.random::<f64>();
    let u2 = rng.random::<f64>();

    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
    mean + std_dev * z
}

use nalgebra::{DMatrix, DVector};

use crate::consts::{PEAK_GRADIENT_TOLERANCE, PEAK_MAX_ITERATIONS, PEAK_MAX_STEP};

/// Multiquadric radial-basis interpolant through scattered samples:
/// `f(p) = sum_i w_i * sqrt(|p - c_i|^2 / eps^2 + 1)`.
#[derive(Clone, Debug)]
pub struct MultiquadricRbf {
    centers: Vec<DVector<f64>>,
    weights: DVector<f64>,
    epsilon: f64,
}

impl MultiquadricRbf {
    /// Fit an exact interpolant. Returns `None` if there are no samples or the
    /// kernel system is singular.
    pub fn fit(points: &[DVector<f64>], values: &[f64], epsilon: f64) -> Option<Self> {
        let n = points.len();
        if n == 0 || n != values.len() {
            return None;
        }
        let kernel = DMatrix::from_fn(n, n, |i, j| {
            multiquadric((&points[i] - &points[j]).norm_squared(), epsilon)
        });
        let weights = kernel.lu().solve(&DVector::from_column_slice(values))?;
        if weights.iter().any(|w| !w.is_finite()) {
            return None;
        }
        Some(Self {
            centers: points.to_vec(),
            weights,
            epsilon,
        })
    }

    pub fn value(&self, p: &DVector<f64>) -> f64 {
        self.centers
            .iter()
            .zip(self.weights.iter())
            .map(|(c, w)| w * multiquadric((p - c).norm_squared(), self.epsilon))
            .sum()
    }

    pub fn gradient(&self, p: &DVector<f64>) -> DVector<f64> {
        let eps2 = self.epsilon * self.epsilon;
        let mut grad = DVector::zeros(p.len());
        for (c, w) in self.centers.iter().zip(self.weights.iter()) {
            let d = p - c;
            let phi = multiquadric(d.norm_squared(), self.epsilon);
            grad += d * (w / (eps2 * phi));
        }
        grad
    }
}

fn multiquadric(r2: f64, epsilon: f64) -> f64 {
    (r2 / (epsilon * epsilon) + 1.0).sqrt()
}

/// Local maximum of the interpolant near `start`, by BFGS on `-f` with a
/// capped step and Armijo backtracking.
pub fn maximize(rbf: &MultiquadricRbf, start: DVector<f64>) -> DVector<f64> {
    let dims = start.len();
    let cost = |p: &DVector<f64>| -rbf.value(p);
    let cost_grad = |p: &DVector<f64>| -rbf.gradient(p);

    let mut x = start;
    let mut fx = cost(&x);
    let mut g = cost_grad(&x);
    let mut inv_hessian = DMatrix::<f64>::identity(dims, dims);

    for _ in 0..PEAK_MAX_ITERATIONS {
        if g.amax() < PEAK_GRADIENT_TOLERANCE {
            break;
        }

        let mut direction = -(&inv_hessian * &g);
        if direction.dot(&g) >= 0.0 {
            inv_hessian = DMatrix::identity(dims, dims);
            direction = -g.clone();
        }
        let length = direction.norm();
        if length > PEAK_MAX_STEP {
            direction *= PEAK_MAX_STEP / length;
        }

        let slope = direction.dot(&g);
        let mut alpha = 1.0;
        let (x_next, f_next) = loop {
            let candidate = &x + &direction * alpha;
            let f_candidate = cost(&candidate);
            if f_candidate <= fx + 1e-4 * alpha * slope {
                break (candidate, f_candidate);
            }
            alpha *= 0.5;
            if alpha < 1e-10 {
                return x;
            }
        };

        let g_next = cost_grad(&x_next);
        let s = &x_next - &x;
        let y = &g_next - &g;
        let sy = s.dot(&y);
        if sy > 1e-12 {
            let rho = 1.0 / sy;
            let identity = DMatrix::<f64>::identity(dims, dims);
            let left = &identity - (&s * y.transpose()) * rho;
            let right = &identity - (&y * s.transpose()) * rho;
            inv_hessian = &left * &inv_hessian * &right + (&s * s.transpose()) * rho;
        }

        x = x_next;
        fx = f_next;
        g = g_next;
    }

    x
}

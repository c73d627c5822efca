//! Adam optimizer over [`Params`]

use ndarray::{Array, Dimension, Zip};
use serde::{Deserialize, Serialize};

use crate::network::Params;

/// Adam hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdamConfig {
    /// Step size
    pub learning_rate: f64,
    /// Decay of the first moment
    pub beta1: f64,
    /// Decay of the second moment
    pub beta2: f64,
    /// Added to the denominator
    pub epsilon: f64,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

/// Adam state; serialized alongside the network in checkpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adam {
    config: AdamConfig,
    step: u64,
    first_moment: Params,
    second_moment: Params,
}

impl Adam {
    /// Fresh optimizer for parameters shaped like `params`
    #[must_use]
    pub fn new(config: AdamConfig, params: &Params) -> Self {
        Self {
            config,
            step: 0,
            first_moment: params.zeros_like(),
            second_moment: params.zeros_like(),
        }
    }

    /// Steps taken so far
    #[must_use]
    pub fn steps(&self) -> u64 {
        self.step
    }

    /// Hyperparameters
    #[must_use]
    pub fn config(&self) -> &AdamConfig {
        &self.config
    }

    /// Apply one update to `params` given `grads`
    pub fn step(&mut self, params: &mut Params, grads: &Params) {
        self.step += 1;
        let AdamConfig {
            learning_rate,
            beta1,
            beta2,
            epsilon,
        } = self.config;
        let t = i32::try_from(self.step).unwrap_or(i32::MAX);
        let bias1 = 1.0 - beta1.powi(t);
        let bias2 = 1.0 - beta2.powi(t);

        let coefficients = [learning_rate, beta1, beta2, epsilon, bias1, bias2];
        let (m, v) = (&mut self.first_moment, &mut self.second_moment);
        adam_update(&mut params.w1, &grads.w1, &mut m.w1, &mut v.w1, coefficients);
        adam_update(&mut params.b1, &grads.b1, &mut m.b1, &mut v.b1, coefficients);
        adam_update(&mut params.w2, &grads.w2, &mut m.w2, &mut v.w2, coefficients);
        adam_update(&mut params.b2, &grads.b2, &mut m.b2, &mut v.b2, coefficients);
    }
}

fn adam_update<D: Dimension>(
    param: &mut Array<f64, D>,
    grad: &Array<f64, D>,
    m: &mut Array<f64, D>,
    v: &mut Array<f64, D>,
    [learning_rate, beta1, beta2, epsilon, bias1, bias2]: [f64; 6],
) {
    Zip::from(param)
        .and(grad)
        .and(m)
        .and(v)
        .for_each(|p, &g, m, v| {
            *m = beta1 * *m + (1.0 - beta1) * g;
            *v = beta2 * *v + (1.0 - beta2) * g * g;
            let m_hat = *m / bias1;
            let v_hat = *v / bias2;
            *p -= learning_rate * m_hat / (v_hat.sqrt() + epsilon);
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn params(value: f64) -> Params {
        Params {
            w1: array![[value, value]],
            b1: array![value, value],
            w2: array![[value], [value]],
            b2: array![value],
        }
    }

    #[test]
    fn test_first_step_moves_by_learning_rate() {
        let mut p = params(1.0);
        let mut adam = Adam::new(AdamConfig::default(), &p);
        let mut grads = params(0.5);
        grads.w1[[0, 1]] = -2.0;
        adam.step(&mut p, &grads);

        assert_eq!(adam.steps(), 1);
        assert_relative_eq!(p.w1[[0, 0]], 1.0 - 1e-3, epsilon = 1e-9);
        assert_relative_eq!(p.w1[[0, 1]], 1.0 + 1e-3, epsilon = 1e-9);
        assert_relative_eq!(p.b2[0], 1.0 - 1e-3, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_gradient_leaves_params() {
        let mut p = params(0.25);
        let mut adam = Adam::new(AdamConfig::default(), &p);
        adam.step(&mut p, &params(0.0));
        assert_eq!(p, params(0.25));
    }
}

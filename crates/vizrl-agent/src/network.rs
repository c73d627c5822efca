//! Two-layer Q-network on plain ndarray
//!
//! `input -> hidden (ReLU) -> actions`, trained with a smooth L1 loss on the
//! Q-value of the action actually taken.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use vizrl_core::{RLError, Result};

/// Weights and biases of both layers; also used for gradients and optimizer
/// moments, which share the same shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Params {
    /// Input to hidden weights, `input x hidden`
    pub w1: Array2<f64>,
    /// Hidden bias
    pub b1: Array1<f64>,
    /// Hidden to output weights, `hidden x actions`
    pub w2: Array2<f64>,
    /// Output bias
    pub b2: Array1<f64>,
}

impl Params {
    /// All-zero parameters of the same shapes
    #[must_use]
    pub fn zeros_like(&self) -> Self {
        Self {
            w1: Array2::zeros(self.w1.raw_dim()),
            b1: Array1::zeros(self.b1.raw_dim()),
            w2: Array2::zeros(self.w2.raw_dim()),
            b2: Array1::zeros(self.b2.raw_dim()),
        }
    }
}

/// Activations kept from a forward pass for the backward pass
struct ForwardCache {
    pre_hidden: Array2<f64>,
    hidden: Array2<f64>,
    output: Array2<f64>,
}

/// Q-network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QNetwork {
    params: Params,
}

impl QNetwork {
    /// Create a network with every weight and bias drawn uniformly from
    /// `[-1/sqrt(fan_in), 1/sqrt(fan_in)]`
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        hidden_size: usize,
        nb_action: usize,
        rng: &mut R,
    ) -> Self {
        let mut layer = |fan_in: usize, fan_out: usize| {
            #[allow(clippy::cast_precision_loss)]
            let bound = 1.0 / (fan_in as f64).sqrt();
            let dist = Uniform::new_inclusive(-bound, bound);
            let weights = Array2::from_shape_fn((fan_in, fan_out), |_| dist.sample(rng));
            let bias = Array1::from_shape_fn(fan_out, |_| dist.sample(rng));
            (weights, bias)
        };
        let (w1, b1) = layer(input_size, hidden_size);
        let (w2, b2) = layer(hidden_size, nb_action);
        Self {
            params: Params { w1, b1, w2, b2 },
        }
    }

    /// Number of inputs
    #[must_use]
    pub fn input_size(&self) -> usize {
        self.params.w1.nrows()
    }

    /// Number of hidden units
    #[must_use]
    pub fn hidden_size(&self) -> usize {
        self.params.w1.ncols()
    }

    /// Number of actions
    #[must_use]
    pub fn nb_action(&self) -> usize {
        self.params.w2.ncols()
    }

    /// Current parameters
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Parameters, mutably
    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }

    fn check_input(&self, width: usize) -> Result<()> {
        if width == self.input_size() {
            Ok(())
        } else {
            Err(RLError::DimensionMismatch {
                expected: self.input_size(),
                actual: width,
            })
        }
    }

    fn forward_cached(&self, states: &ArrayView2<f64>) -> ForwardCache {
        let p = &self.params;
        let pre_hidden = states.dot(&p.w1) + &p.b1;
        let hidden = pre_hidden.mapv(|v| v.max(0.0));
        let output = hidden.dot(&p.w2) + &p.b2;
        ForwardCache {
            pre_hidden,
            hidden,
            output,
        }
    }

    /// Q-values for a batch, one row per state
    pub fn forward(&self, states: &ArrayView2<f64>) -> Result<Array2<f64>> {
        self.check_input(states.ncols())?;
        Ok(self.forward_cached(states).output)
    }

    /// Q-values for one state
    pub fn forward_one(&self, state: &ArrayView1<f64>) -> Result<Array1<f64>> {
        self.check_input(state.len())?;
        let hidden = (state.dot(&self.params.w1) + &self.params.b1).mapv(|v| v.max(0.0));
        Ok(hidden.dot(&self.params.w2) + &self.params.b2)
    }

    /// Smooth L1 loss of `Q(s, a)` against `targets`, averaged over the batch
    pub fn loss(
        &self,
        states: &ArrayView2<f64>,
        actions: &[usize],
        targets: &ArrayView1<f64>,
    ) -> Result<f64> {
        self.loss_and_gradients(states, actions, targets).map(|(loss, _)| loss)
    }

    /// Loss together with its gradient for every parameter
    pub fn loss_and_gradients(
        &self,
        states: &ArrayView2<f64>,
        actions: &[usize],
        targets: &ArrayView1<f64>,
    ) -> Result<(f64, Params)> {
        self.check_input(states.ncols())?;
        let batch = states.nrows();
        if actions.len() != batch || targets.len() != batch {
            return Err(RLError::DimensionMismatch {
                expected: batch,
                actual: actions.len().min(targets.len()),
            });
        }
        if let Some(&bad) = actions.iter().find(|&&a| a >= self.nb_action()) {
            return Err(RLError::InvalidAction(format!("action {bad} out of {}", self.nb_action())));
        }

        let cache = self.forward_cached(states);
        #[allow(clippy::cast_precision_loss)]
        let n = batch.max(1) as f64;

        let mut loss = 0.0;
        let mut d_output = Array2::<f64>::zeros(cache.output.raw_dim());
        for (row, (&action, &target)) in actions.iter().zip(targets.iter()).enumerate() {
            let diff = cache.output[[row, action]] - target;
            if diff.abs() < 1.0 {
                loss += 0.5 * diff * diff;
                d_output[[row, action]] = diff / n;
            } else {
                loss += diff.abs() - 0.5;
                d_output[[row, action]] = diff.signum() / n;
            }
        }
        loss /= n;

        let p = &self.params;
        let w2 = cache.hidden.t().dot(&d_output);
        let b2 = d_output.sum_axis(Axis(0));
        let mut d_hidden = d_output.dot(&p.w2.t());
        d_hidden.zip_mut_with(&cache.pre_hidden, |d, &z| {
            if z <= 0.0 {
                *d = 0.0;
            }
        });
        let w1 = states.t().dot(&d_hidden);
        let b1 = d_hidden.sum_axis(Axis(0));

        Ok((loss, Params { w1, b1, w2, b2 }))
    }
}

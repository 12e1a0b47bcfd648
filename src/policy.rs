use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::dir::Turn;
use crate::error::PolicyError;
use crate::game::{STATE_LEN, SensorState};

const ACTIONS: usize = 3;

/// Maps a sensor state and a flat parameter vector to a move.
/// The optimizer only ever copies, crosses and mutates the vector elementwise.
pub trait Policy: Send + Sync {
    fn param_count(&self) -> usize;

    fn init_params(&self, rng: &mut dyn RngCore) -> Vec<f32>;

    /// `params` must hold exactly `param_count()` values.
    fn evaluate(&self, state: &SensorState, params: &[f32]) -> Turn;

    fn check_params(&self, params: &[f32]) -> Result<(), PolicyError> {
        if params.len() == self.param_count() {
            Ok(())
        } else {
            Err(PolicyError::ParamCount {
                expected: self.param_count(),
                actual: params.len(),
            })
        }
    }
}

/// Dense feed-forward net: 13 inputs, ReLU hidden layers, 3 softmax outputs.
/// Per layer the vector stores weights `[input][output]` row-major, then biases.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MlpPolicy {
    hidden: Vec<usize>,
}

impl MlpPolicy {
    pub fn new(hidden: Vec<usize>) -> Result<Self, PolicyError> {
        if let Some(index) = hidden.iter().position(|&w| w == 0) {
            return Err(PolicyError::ZeroWidthLayer { index });
        }
        Ok(Self { hidden })
    }

    pub fn hidden(&self) -> &[usize] {
        &self.hidden
    }

    fn layers(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let sizes: Vec<usize> = std::iter::once(STATE_LEN)
            .chain(self.hidden.iter().copied())
            .chain(std::iter::once(ACTIONS))
            .collect();
        (0..sizes.len() - 1).map(move |i| (sizes[i], sizes[i + 1]))
    }

    fn forward(&self, state: &SensorState, params: &[f32]) -> Vec<f32> {
        debug_assert_eq!(params.len(), self.param_count());
        let mut activ: Vec<f32> = state.to_vec();
        let mut offset = 0;
        let last = self.hidden.len();
        for (layer, (n_in, n_out)) in self.layers().enumerate() {
            let weights = &params[offset..offset + n_in * n_out];
            let biases = &params[offset + n_in * n_out..offset + n_in * n_out + n_out];
            offset += n_in * n_out + n_out;

            let mut next = biases.to_vec();
            for (i, &a) in activ.iter().enumerate() {
                let row = &weights[i * n_out..(i + 1) * n_out];
                for (n, &w) in next.iter_mut().zip(row) {
                    *n += a * w;
                }
            }
            if layer != last {
                for n in &mut next {
                    *n = n.max(0.0);
                }
            }
            activ = next;
        }
        activ
    }
}

impl Policy for MlpPolicy {
    fn param_count(&self) -> usize {
        self.layers().map(|(i, o)| i * o + o).sum()
    }

    /// Glorot-uniform weights, zero biases.
    fn init_params(&self, rng: &mut dyn RngCore) -> Vec<f32> {
        let mut params = Vec::with_capacity(self.param_count());
        for (n_in, n_out) in self.layers() {
            let limit = (6.0 / (n_in + n_out) as f32).sqrt();
            params.extend((0..n_in * n_out).map(|_| rng.gen_range(-limit..limit)));
            params.extend(std::iter::repeat_n(0.0, n_out));
        }
        params
    }

    fn evaluate(&self, state: &SensorState, params: &[f32]) -> Turn {
        // softmax is monotonic, so the arg max of the logits is the choice
        let logits = self.forward(state, params);
        let mut best = 0;
        for (i, &v) in logits.iter().enumerate() {
            if v > logits[best] {
                best = i;
            }
        }
        Turn::from_index(best).unwrap_or(Turn::Straight)
    }
}

/// Something that picks the next move for a running episode.
pub trait Controller {
    fn choose(&mut self, state: &SensorState) -> Turn;
}

impl<P: Policy + ?Sized> Policy for &P {
    fn param_count(&self) -> usize {
        (**self).param_count()
    }

    fn init_params(&self, rng: &mut dyn RngCore) -> Vec<f32> {
        (**self).init_params(rng)
    }

    fn evaluate(&self, state: &SensorState, params: &[f32]) -> Turn {
        (**self).evaluate(state, params)
    }
}

/// A policy bound to its own copy of one parameter vector.
pub struct PolicyController<P> {
    policy: P,
    params: Vec<f32>,
}

impl<P: Policy> PolicyController<P> {
    pub fn new(policy: P, params: &[f32]) -> Result<Self, PolicyError> {
        policy.check_params(params)?;
        Ok(Self {
            policy,
            params: params.to_vec(),
        })
    }
}

impl<P: Policy> Controller for PolicyController<P> {
    fn choose(&mut self, state: &SensorState) -> Turn {
        self.policy.evaluate(state, &self.params)
    }
}

/// Uniformly random baseline.
pub struct RandomController<R> {
    rng: R,
}

impl<R: Rng> RandomController<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> Controller for RandomController<R> {
    fn choose(&mut self, _state: &SensorState) -> Turn {
        Turn::ALL[self.rng.gen_range(0..Turn::ALL.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn param_count_covers_weights_and_biases() {
        let p = MlpPolicy::new(vec![]).unwrap();
        assert_eq!(p.param_count(), 13 * 3 + 3);
        let p = MlpPolicy::new(vec![16, 8]).unwrap();
        assert_eq!(p.param_count(), (13 * 16 + 16) + (16 * 8 + 8) + (8 * 3 + 3));
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(p.init_params(&mut rng).len(), p.param_count());
    }

    #[test]
    fn zero_width_layers_are_rejected() {
        assert_eq!(
            MlpPolicy::new(vec![4, 0]).unwrap_err(),
            PolicyError::ZeroWidthLayer { index: 1 }
        );
    }

    #[test]
    fn bias_alone_decides_the_move() {
        let p = MlpPolicy::new(vec![]).unwrap();
        let mut params = vec![0.0; p.param_count()];
        let state = [1.0; STATE_LEN];
        params[13 * 3 + 2] = 1.0;
        assert_eq!(p.evaluate(&state, &params), Turn::Right);
        params[13 * 3] = 2.0;
        assert_eq!(p.evaluate(&state, &params), Turn::Left);
        params[13 * 3 + 1] = 2.0;
        assert_eq!(p.evaluate(&state, &params), Turn::Left);
    }

    #[test]
    fn ties_pick_the_first_action() {
        let p = MlpPolicy::new(vec![4]).unwrap();
        let params = vec![0.0; p.param_count()];
        assert_eq!(p.evaluate(&[3.0; STATE_LEN], &params), Turn::Left);
    }

    #[test]
    fn hidden_relu_blocks_negative_signal() {
        // one hidden unit fed by input 0 with weight -1, wired to "straight"
        let p = MlpPolicy::new(vec![1]).unwrap();
        let mut params = vec![0.0; p.param_count()];
        params[0] = -1.0;
        let second = 13 + 1;
        params[second + 1] = 1.0;
        let mut state = [0.0; STATE_LEN];
        state[0] = -5.0;
        assert_eq!(p.evaluate(&state, &params), Turn::Straight);
        state[0] = 5.0;
        assert_eq!(p.evaluate(&state, &params), Turn::Left);
    }

    #[test]
    fn controller_rejects_wrong_shape() {
        let p = MlpPolicy::new(vec![2]).unwrap();
        let err = PolicyController::new(&p, &[0.0; 3]).err().unwrap();
        assert_eq!(
            err,
            PolicyError::ParamCount {
                expected: p.param_count(),
                actual: 3
            }
        );
    }
}

//! Fully connected action-value network built on `burn`.
//!
//! ReLU follows every hidden layer; the output layer is linear with one value per
//! action. The learner trains on [`TrainBackend`] and evaluates bootstrap targets on
//! [`InferBackend`].

use burn::{
    backend::{Autodiff, NdArray},
    module::Param,
    nn::{Linear, LinearConfig, Relu},
    optim::{Adam, AdamConfig, GradientsParams, Optimizer as _, adaptor::OptimizerAdaptor},
    prelude::*,
    tensor::TensorData,
};
use rand::Rng;
use rand_distr::StandardNormal;

pub type InferBackend = NdArray<f32>;
pub type TrainBackend = Autodiff<InferBackend>;

/// Adam state for an online network.
pub type QOptimizer = OptimizerAdaptor<Adam, QNetwork<TrainBackend>, TrainBackend>;

#[derive(Config, Debug)]
pub struct QNetworkConfig {
    pub inputs: usize,
    pub hidden: Vec<usize>,
    pub outputs: usize,
}

impl QNetworkConfig {
    /// Builds a network with He-normal weights drawn from `rng` and zero biases.
    pub fn init<B: Backend, R: Rng + ?Sized>(&self, device: &B::Device, rng: &mut R) -> QNetwork<B> {
        let mut sizes = Vec::with_capacity(self.hidden.len() + 2);
        sizes.push(self.inputs);
        sizes.extend(&self.hidden);
        sizes.push(self.outputs);
        let layers = sizes
            .windows(2)
            .map(|pair| he_linear(pair[0], pair[1], device, rng))
            .collect();
        QNetwork {
            layers,
            relu: Relu::new(),
        }
    }
}

fn he_linear<B: Backend, R: Rng + ?Sized>(
    inputs: usize,
    outputs: usize,
    device: &B::Device,
    rng: &mut R,
) -> Linear<B> {
    #[expect(clippy::cast_precision_loss)]
    let scale = (2.0 / inputs.max(1) as f32).sqrt();
    let weights = (0..inputs * outputs)
        .map(|_| rng.sample::<f32, _>(StandardNormal) * scale)
        .collect::<Vec<_>>();
    let mut linear = LinearConfig::new(inputs, outputs).init(device);
    linear.weight = Param::from_tensor(Tensor::from_data(
        TensorData::new(weights, [inputs, outputs]),
        device,
    ));
    linear.bias = Some(Param::from_tensor(Tensor::zeros([outputs], device)));
    linear
}

#[derive(Module, Debug)]
pub struct QNetwork<B: Backend> {
    layers: Vec<Linear<B>>,
    relu: Relu,
}

impl<B: Backend> QNetwork<B> {
    /// Maps a `[batch, inputs]` tensor to `[batch, outputs]` action values.
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let last = self.layers.len().saturating_sub(1);
        self.layers
            .iter()
            .enumerate()
            .fold(input, |x, (i, layer)| {
                let x = layer.forward(x);
                if i < last { self.relu.forward(x) } else { x }
            })
    }

    #[must_use]
    pub fn input_len(&self) -> usize {
        self.layers.first().map_or(0, |layer| layer.weight.dims()[0])
    }

    #[must_use]
    pub fn output_len(&self) -> usize {
        self.layers.last().map_or(0, |layer| layer.weight.dims()[1])
    }

    /// Action values for `rows` inputs packed row-major into `inputs`.
    #[must_use]
    pub fn predict_rows(&self, inputs: Vec<f32>, rows: usize) -> Vec<f32> {
        let device = B::Device::default();
        let width = self.input_len();
        let input = Tensor::from_data(TensorData::new(inputs, [rows, width]), &device);
        tensor_values(self.forward(input))
    }

    #[must_use]
    pub fn predict(&self, input: &[f32]) -> Vec<f32> {
        self.predict_rows(input.to_vec(), 1)
    }

    /// Every weight and bias, layer by layer.
    #[must_use]
    pub fn parameters(&self) -> Vec<f32> {
        self.layers
            .iter()
            .flat_map(|layer| {
                let mut values = tensor_values(layer.weight.val());
                if let Some(bias) = &layer.bias {
                    values.extend(tensor_values(bias.val()));
                }
                values
            })
            .collect()
    }
}

fn tensor_values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Vec<f32> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec()
        .unwrap_or_default()
}

#[must_use]
pub fn adam() -> QOptimizer {
    AdamConfig::new().init()
}

/// One Adam step on `mean((Q(s_i, a_i) - y_i)^2)`.
///
/// `states` holds one encoded state per entry of `actions`, packed row-major. Returns
/// the updated network and the loss before the step.
pub fn fit_actions(
    network: QNetwork<TrainBackend>,
    optimizer: &mut QOptimizer,
    learning_rate: f64,
    states: Vec<f32>,
    actions: &[usize],
    targets: &[f32],
) -> (QNetwork<TrainBackend>, f32) {
    let batch = actions.len();
    let device = Default::default();
    let inputs = network.input_len();
    let outputs = network.output_len();

    let mut mask = vec![0.0_f32; batch * outputs];
    for (row, &action) in actions.iter().enumerate() {
        mask[row * outputs + action] = 1.0;
    }
    let states = Tensor::<TrainBackend, 2>::from_data(TensorData::new(states, [batch, inputs]), &device);
    let mask = Tensor::<TrainBackend, 2>::from_data(TensorData::new(mask, [batch, outputs]), &device);
    let targets = Tensor::<TrainBackend, 2>::from_data(
        TensorData::new(targets.to_vec(), [batch, 1]),
        &device,
    );

    let taken = (network.forward(states) * mask).sum_dim(1);
    let diff = taken - targets;
    let loss = (diff.clone() * diff).mean();
    let loss_value = tensor_values(loss.clone())
        .first()
        .copied()
        .unwrap_or(f32::NAN);

    let grads = GradientsParams::from_grads(loss.backward(), &network);
    let network = optimizer.step(learning_rate, network, grads);
    (network, loss_value)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    fn network<B: Backend>(hidden: Vec<usize>) -> QNetwork<B> {
        let mut rng = Pcg32::seed_from_u64(0);
        QNetworkConfig::new(4, hidden, 3).init(&Default::default(), &mut rng)
    }

    #[test]
    fn test_shapes() {
        let net = network::<InferBackend>(vec![8, 5]);
        assert_eq!(net.input_len(), 4);
        assert_eq!(net.output_len(), 3);
        assert_eq!(net.predict(&[0.0, 1.0, 0.0, 1.0]).len(), 3);
        assert_eq!(net.predict_rows(vec![0.5; 8], 2).len(), 6);
        assert_eq!(net.parameters().len(), 4 * 8 + 8 + 8 * 5 + 5 + 5 * 3 + 3);
    }

    #[test]
    fn test_same_seed_same_parameters() {
        let a = network::<InferBackend>(vec![6]);
        let b = network::<InferBackend>(vec![6]);
        assert_eq!(a.parameters(), b.parameters());
    }

    #[test]
    fn test_fit_reduces_loss() {
        let mut net = network::<TrainBackend>(vec![16]);
        let mut optimizer = adam();
        let mut states = vec![0.0; 16];
        for i in 0..4 {
            states[i * 4 + i] = 1.0;
        }
        let actions = [0, 1, 0, 1];
        let targets = [1.0, -1.0, 0.5, 2.0];

        let mut first = None;
        let mut last = f32::NAN;
        for _ in 0..200 {
            let (next, loss) =
                fit_actions(net, &mut optimizer, 0.01, states.clone(), &actions, &targets);
            net = next;
            first.get_or_insert(loss);
            last = loss;
        }
        assert!(last < first.unwrap());
        assert!(last < 0.1, "loss {last}");
    }
}

// SPDX-License-Identifier: MPL-2.0
//! Three-layer SRCNN super-resolution network.
//!
//! | Layer | Channels | Kernel | Padding | Activation |
//! |-------|----------|--------|---------|------------|
//! | 1     | 1 → 128  | 9×9    | 4       | ReLU       |
//! | 2     | 128 → 64 | 3×3    | 1       | ReLU       |
//! | 3     | 64 → 1   | 5×5    | 2       | linear     |
//!
//! Every layer uses stride 1 with `padding = (kernel - 1) / 2`, so the spatial
//! shape of the output always equals the input's. The architecture is the
//! same for every modality; only the weights differ.
//!
//! Convolutions are computed tap by tap: for each kernel offset, the shifted
//! input window is flattened to a `(C_in, H*W)` matrix and accumulated into
//! the `(C_out, H*W)` output with one GEMM. This keeps the working set at a
//! single shifted copy of the input instead of a full im2col matrix.

use crate::application::port::ai::{
    check_input_shape, ModelCapabilities, ModelError, ModelResult, SuperResolver,
};
use crate::model::checkpoint::StateDict;
use ndarray::linalg::general_mat_mul;
use ndarray::{s, Array1, Array2, Array3, Array4, ArrayD, ArrayView3, ArrayView4, Axis, Ix1, Ix4};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Architecture name reported in [`ModelCapabilities`].
pub const SRCNN_NAME: &str = "SRCNN";

/// Hyper-parameters of one convolution layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvSpec {
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel: usize,
    pub stride: usize,
    pub padding: usize,
    pub relu: bool,
}

impl ConvSpec {
    const fn new(
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        padding: usize,
        relu: bool,
    ) -> Self {
        Self {
            in_channels,
            out_channels,
            kernel,
            stride: 1,
            padding,
            relu,
        }
    }

    /// Expected `[out, in, k, k]` weight shape.
    #[must_use]
    pub fn weight_shape(&self) -> [usize; 4] {
        [self.out_channels, self.in_channels, self.kernel, self.kernel]
    }

    /// Spatial output length for an input of length `len`.
    #[must_use]
    pub fn output_len(&self, len: usize) -> Option<usize> {
        (len + 2 * self.padding)
            .checked_sub(self.kernel)
            .map(|span| span / self.stride + 1)
    }
}

/// Layer prefixes (state-dict names) and their fixed specs, in forward order.
pub const SRCNN_LAYERS: [(&str, ConvSpec); 3] = [
    ("conv1.conv", ConvSpec::new(1, 128, 9, 4, true)),
    ("conv2.conv", ConvSpec::new(128, 64, 3, 1, true)),
    ("conv3", ConvSpec::new(64, 1, 5, 2, false)),
];

/// A 2-D convolution with bias and optional ReLU.
#[derive(Debug, Clone)]
pub struct Conv2d {
    spec: ConvSpec,
    weight: Array4<f32>,
    bias: Array1<f32>,
}

impl Conv2d {
    /// Builds a layer, checking the tensors against `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ShapeMismatch`] if a tensor has the wrong shape.
    pub fn new(name: &str, spec: ConvSpec, weight: Array4<f32>, bias: Array1<f32>) -> ModelResult<Self> {
        if weight.shape() != spec.weight_shape() {
            return Err(ModelError::ShapeMismatch {
                name: format!("{name}.weight"),
                expected: spec.weight_shape().to_vec(),
                actual: weight.shape().to_vec(),
            });
        }
        if bias.len() != spec.out_channels {
            return Err(ModelError::ShapeMismatch {
                name: format!("{name}.bias"),
                expected: vec![spec.out_channels],
                actual: bias.shape().to_vec(),
            });
        }
        Ok(Self { spec, weight, bias })
    }

    #[must_use]
    pub fn spec(&self) -> ConvSpec {
        self.spec
    }

    /// Applies the layer to a `(C_in, H, W)` feature map.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] if the channel count is wrong or
    /// the input is smaller than the kernel.
    pub fn forward(&self, input: ArrayView3<'_, f32>) -> ModelResult<Array3<f32>> {
        let ConvSpec {
            in_channels,
            out_channels,
            kernel,
            stride,
            padding,
            relu,
        } = self.spec;
        let (channels, height, width) = input.dim();
        if channels != in_channels {
            return Err(ModelError::InvalidInput(format!(
                "expected {in_channels} input channels, got {channels}"
            )));
        }
        let (Some(out_h), Some(out_w)) = (self.spec.output_len(height), self.spec.output_len(width))
        else {
            return Err(ModelError::InvalidInput(format!(
                "{height}x{width} input is smaller than the {kernel}x{kernel} kernel"
            )));
        };

        let mut padded = Array3::<f32>::zeros((channels, height + 2 * padding, width + 2 * padding));
        padded
            .slice_mut(s![.., padding..padding + height, padding..padding + width])
            .assign(&input);

        let span_h = (out_h - 1) * stride + 1;
        let span_w = (out_w - 1) * stride + 1;
        let stride = isize::try_from(stride)
            .map_err(|_| ModelError::InvalidInput("stride too large".to_string()))?;
        let mut output = Array2::<f32>::zeros((out_channels, out_h * out_w));

        for ky in 0..kernel {
            for kx in 0..kernel {
                let window = padded.slice(s![.., ky..ky + span_h;stride, kx..kx + span_w;stride]);
                let columns = window
                    .to_owned()
                    .into_shape_with_order((channels, out_h * out_w))
                    .map_err(|e| ModelError::InferenceFailed(e.to_string()))?;
                let taps = self.weight.slice(s![.., .., ky, kx]);
                general_mat_mul(1.0, &taps, &columns, 1.0, &mut output);
            }
        }

        output += &self.bias.view().insert_axis(Axis(1));
        if relu {
            output.mapv_inplace(|v| v.max(0.0));
        }

        output
            .into_shape_with_order((out_channels, out_h, out_w))
            .map_err(|e| ModelError::InferenceFailed(e.to_string()))
    }
}

/// Whether training-only behavior is active.
///
/// SRCNN has no dropout or normalization layers, so both modes compute the
/// same function; the mode exists so loaders switch it explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Training,
    Inference,
}

/// The SRCNN network with its weights.
#[derive(Debug, Clone)]
pub struct Srcnn {
    layers: Vec<Conv2d>,
    mode: Mode,
    checksum: Option<String>,
}

impl Srcnn {
    /// Builds the network from a state dict keyed by `<layer>.weight` and
    /// `<layer>.bias`. Extra keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if a tensor is missing or mis-shaped.
    pub fn from_state_dict(state: &StateDict) -> ModelResult<Self> {
        let layers = SRCNN_LAYERS
            .iter()
            .map(|(name, spec)| {
                let weight = take::<Ix4>(state, &format!("{name}.weight"), &spec.weight_shape())?;
                let bias = take::<Ix1>(state, &format!("{name}.bias"), &[spec.out_channels])?;
                Conv2d::new(name, *spec, weight, bias)
            })
            .collect::<ModelResult<Vec<_>>>()?;

        Ok(Self {
            layers,
            mode: Mode::Training,
            checksum: None,
        })
    }

    /// Switches the network into inference mode.
    #[must_use]
    pub fn eval(mut self) -> Self {
        self.mode = Mode::Inference;
        self
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Records the digest of the checkpoint the weights came from.
    #[must_use]
    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    /// Runs the three layers on a `[1, 1, H, W]` tensor.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidInput`] for any other input shape.
    pub fn forward(&self, input: ArrayView4<'_, f32>) -> ModelResult<Array4<f32>> {
        check_input_shape(&input)?;
        let mut features = input.index_axis(Axis(0), 0).to_owned();
        for layer in &self.layers {
            features = layer.forward(features.view())?;
        }
        Ok(features.insert_axis(Axis(0)))
    }

    /// Exports the weights under their state-dict names.
    #[must_use]
    pub fn to_state_dict(&self) -> StateDict {
        let mut state = StateDict::new();
        for ((name, _), layer) in SRCNN_LAYERS.iter().zip(&self.layers) {
            state.insert(format!("{name}.weight"), layer.weight.clone().into_dyn());
            state.insert(format!("{name}.bias"), layer.bias.clone().into_dyn());
        }
        state
    }
}

impl SuperResolver for Srcnn {
    fn enhance(&self, input: ArrayView4<'_, f32>) -> ModelResult<Array4<f32>> {
        self.forward(input)
    }

    fn capabilities(&self) -> ModelCapabilities {
        let caps = ModelCapabilities::new(SRCNN_NAME, "native");
        match &self.checksum {
            Some(sum) => caps.with_checksum(sum.clone()),
            None => caps,
        }
    }
}

/// Produces a freshly initialized SRCNN state dict.
///
/// Weights and biases are drawn uniformly from `±1/sqrt(fan_in)`, the default
/// convolution initialization of common training frameworks. Used to seed
/// new checkpoints and to exercise the pipeline without trained weights.
#[must_use]
pub fn initial_state_dict(seed: u64) -> StateDict {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut state = StateDict::new();
    for (name, spec) in SRCNN_LAYERS {
        #[allow(clippy::cast_precision_loss)]
        let bound = 1.0 / ((spec.in_channels * spec.kernel * spec.kernel) as f32).sqrt();
        let weight = ArrayD::from_shape_simple_fn(spec.weight_shape().to_vec(), || {
            rng.gen_range(-bound..bound)
        });
        let bias = ArrayD::from_shape_simple_fn(vec![spec.out_channels], || {
            rng.gen_range(-bound..bound)
        });
        state.insert(format!("{name}.weight"), weight);
        state.insert(format!("{name}.bias"), bias);
    }
    state
}

fn take<D: ndarray::Dimension>(
    state: &StateDict,
    key: &str,
    expected: &[usize],
) -> ModelResult<ndarray::Array<f32, D>> {
    let tensor = state
        .get(key)
        .ok_or_else(|| ModelError::MissingTensor(key.to_string()))?;
    if tensor.shape() != expected {
        return Err(ModelError::ShapeMismatch {
            name: key.to_string(),
            expected: expected.to_vec(),
            actual: tensor.shape().to_vec(),
        });
    }
    tensor
        .clone()
        .into_dimensionality::<D>()
        .map_err(|e| ModelError::ShapeMismatch {
            name: format!("{key} ({e})"),
            expected: expected.to_vec(),
            actual: tensor.shape().to_vec(),
        })
}

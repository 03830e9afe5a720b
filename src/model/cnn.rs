//! CNN Model Architecture for Plant Disease Classification
//!
//! The checkpoint format is defined by this module: a `CompactRecorder` file
//! produced from a `PlantClassifier` with the same configuration deserializes
//! back into it.
//!
//! Pinned record layout (field names are record keys, so renaming any of them
//! breaks existing checkpoints):
//! - `conv1`..`conv4`: `ConvBlock { conv, bn }`, 3x3 same-padded convolutions
//!   with `base_filters * {1, 2, 4, 8}` output channels, each followed by a
//!   2x2 max pool
//! - `fc1`: `base_filters * 8 -> 256`
//! - `fc2`: `256 -> num_classes`
//!
//! With the PlantVillage defaults (`base_filters = 32`, 38 classes, 256x256
//! RGB input) this is the layout of the `plant_classifier.mpk` checkpoints the
//! CLI loads.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d,
        Relu,
    },
    tensor::{backend::Backend, Tensor},
};

/// Configuration for the PlantClassifier CNN model
#[derive(Config, Debug)]
pub struct PlantClassifierConfig {
    /// Number of output classes (38 for PlantVillage)
    #[config(default = "38")]
    pub num_classes: usize,

    /// Input image size (assumes square images)
    #[config(default = "256")]
    pub input_size: usize,

    /// Dropout rate for regularization
    #[config(default = "0.3")]
    pub dropout_rate: f64,

    /// Number of input channels (3 for RGB)
    #[config(default = "3")]
    pub in_channels: usize,

    /// Base number of convolutional filters
    #[config(default = "32")]
    pub base_filters: usize,
}

impl PlantClassifierConfig {
    /// Initialize a model with freshly initialized weights
    pub fn init<B: Backend>(&self, device: &B::Device) -> PlantClassifier<B> {
        PlantClassifier::new(self, device)
    }
}

/// A CNN block with Conv2d, BatchNorm, ReLU, and optional MaxPool
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub bn: BatchNorm<B, 2>,
    pub relu: Relu,
    pub pool: Option<MaxPool2d>,
}

impl<B: Backend> ConvBlock<B> {
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        with_pool: bool,
        device: &B::Device,
    ) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [kernel_size, kernel_size])
            .with_padding(PaddingConfig2d::Same)
            .init(device);

        let bn = BatchNormConfig::new(out_channels).init(device);

        let pool = if with_pool {
            Some(MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init())
        } else {
            None
        };

        Self {
            conv,
            bn,
            relu: Relu::new(),
            pool,
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.bn.forward(x);
        let x = self.relu.forward(x);

        match &self.pool {
            Some(pool) => pool.forward(x),
            None => x,
        }
    }
}

/// Plant Disease Classifier CNN
///
/// Architecture:
/// - 4 convolutional blocks with increasing filter sizes
/// - BatchNorm and ReLU after each convolution
/// - MaxPooling after each block
/// - Global Average Pooling
/// - Fully connected classifier with dropout
///
/// Dropout and batch statistics only change behaviour on autodiff backends;
/// on a plain backend the forward pass is deterministic.
#[derive(Module, Debug)]
pub struct PlantClassifier<B: Backend> {
    pub conv1: ConvBlock<B>,
    pub conv2: ConvBlock<B>,
    pub conv3: ConvBlock<B>,
    pub conv4: ConvBlock<B>,

    pub global_pool: AdaptiveAvgPool2d,

    pub fc1: Linear<B>,
    pub dropout: Dropout,
    pub fc2: Linear<B>,

    num_classes: usize,
    input_size: usize,
    in_channels: usize,
}

impl<B: Backend> PlantClassifier<B> {
    /// Create a new PlantClassifier from configuration
    pub fn new(config: &PlantClassifierConfig, device: &B::Device) -> Self {
        let base = config.base_filters;

        // 3 -> base -> 2x -> 4x -> 8x, spatial size halves each block
        let conv1 = ConvBlock::new(config.in_channels, base, 3, true, device);
        let conv2 = ConvBlock::new(base, base * 2, 3, true, device);
        let conv3 = ConvBlock::new(base * 2, base * 4, 3, true, device);
        let conv4 = ConvBlock::new(base * 4, base * 8, 3, true, device);

        let global_pool = AdaptiveAvgPool2dConfig::new([1, 1]).init();

        let fc1 = LinearConfig::new(base * 8, 256).init(device);
        let dropout = DropoutConfig::new(config.dropout_rate).init();
        let fc2 = LinearConfig::new(256, config.num_classes).init(device);

        Self {
            conv1,
            conv2,
            conv3,
            conv4,
            global_pool,
            fc1,
            dropout,
            fc2,
            num_classes: config.num_classes,
            input_size: config.input_size,
            in_channels: config.in_channels,
        }
    }

    /// Forward pass through the network
    ///
    /// # Arguments
    /// * `x` - Input tensor of shape [batch_size, channels, height, width]
    ///
    /// # Returns
    /// * Logits tensor of shape [batch_size, num_classes]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.conv1.forward(x);
        let x = self.conv2.forward(x);
        let x = self.conv3.forward(x);
        let x = self.conv4.forward(x);

        // [B, C, H, W] -> [B, C, 1, 1] -> [B, C]
        let x = self.global_pool.forward(x);
        let [batch_size, channels, _, _] = x.dims();
        let x = x.reshape([batch_size, channels]);

        let x = self.fc1.forward(x);
        let x = Relu::new().forward(x);
        let x = self.dropout.forward(x);
        self.fc2.forward(x)
    }

    /// Get the number of output classes
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Square input resolution the model was trained on
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// Expected single-image input shape `[1, C, H, W]`
    pub fn input_shape(&self) -> [usize; 4] {
        [1, self.in_channels, self.input_size, self.input_size]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    fn small_config() -> PlantClassifierConfig {
        PlantClassifierConfig::new()
            .with_base_filters(4)
            .with_input_size(32)
    }

    #[test]
    fn test_plant_classifier_output_shape() {
        let device = Default::default();
        let model = small_config().init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 4>::zeros([2, 3, 32, 32], &device);

        let output = model.forward(input);
        assert_eq!(output.dims(), [2, 38]);
    }

    #[test]
    fn test_default_config_matches_plantvillage() {
        let config = PlantClassifierConfig::new();
        assert_eq!(config.num_classes, 38);
        assert_eq!(config.input_size, 256);
        assert_eq!(config.in_channels, 3);
    }

    #[test]
    fn test_input_shape() {
        let device = Default::default();
        let model = small_config().init::<TestBackend>(&device);
        assert_eq!(model.input_shape(), [1, 3, 32, 32]);
        assert_eq!(model.num_classes(), 38);
    }

    #[test]
    fn test_record_layout_widths() {
        let device = Default::default();
        let model = small_config().init::<TestBackend>(&device);

        assert_eq!(model.conv1.bn.gamma.val().dims(), [4]);
        assert_eq!(model.conv4.bn.gamma.val().dims(), [32]);
        assert_eq!(model.fc1.weight.val().dims(), [32, 256]);
        assert_eq!(model.fc2.weight.val().dims(), [256, 38]);
    }
}

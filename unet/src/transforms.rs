//! Random augmentation transforms for paired image/mask tensors.
//!
//! Every transform operates on an ordered tuple of same-shaped `[C, H, W]`
//! tensors and an explicit random generator, so a spatial transform such as
//! a crop or flip is applied identically to the image and its mask, and a
//! given seed always reproduces the same draw.

use burn::tensor::{backend::Backend, Tensor, TensorData};
use rand::{rngs::StdRng, Rng};
use rand_distr::Normal;

/// A per-example transform over an ordered tuple of paired tensors.
///
/// Implementations must be pure functions of their inputs and the random
/// draws taken from `rng`; no state is carried across calls.
pub trait Transform<B: Backend>: Send + Sync {
    /// Transform the tuple. All tensors share the same spatial shape on
    /// entry and on exit.
    fn apply(&self, tensors: Vec<Tensor<B, 3>>, rng: &mut StdRng) -> Vec<Tensor<B, 3>>;
}

/// Crops every tensor of the tuple at one shared, uniformly random offset.
///
/// The output spatial shape equals the requested patch size. Panics if the
/// patch is larger than the input.
#[derive(Debug, Clone)]
pub struct RandomCrop {
    size: [usize; 2],
}

impl RandomCrop {
    /// Create a crop to `[height, width]`.
    pub const fn new(size: [usize; 2]) -> Self {
        Self { size }
    }
}

impl<B: Backend> Transform<B> for RandomCrop {
    fn apply(&self, tensors: Vec<Tensor<B, 3>>, rng: &mut StdRng) -> Vec<Tensor<B, 3>> {
        let [_, height, width] = tensors[0].dims();
        let [patch_h, patch_w] = self.size;
        assert!(
            patch_h <= height && patch_w <= width,
            "Patch size [{patch_h}, {patch_w}] exceeds input size [{height}, {width}]"
        );

        // One offset for the whole tuple, so image and mask stay aligned.
        let y = rng.random_range(0..=height - patch_h);
        let x = rng.random_range(0..=width - patch_w);

        tensors
            .into_iter()
            .map(|tensor| {
                let [channels, _, _] = tensor.dims();
                tensor.slice([0..channels, y..y + patch_h, x..x + patch_w])
            })
            .collect()
    }
}

/// Reverses every tensor of the tuple along one axis with probability `prob`.
///
/// The flip decision is drawn once per call: either all tensors flip or
/// none do.
#[derive(Debug, Clone)]
pub struct RandomAxisFlip {
    axis: usize,
    prob: f64,
}

impl RandomAxisFlip {
    /// Create a flip along `axis` (1 = vertical, 2 = horizontal in `[C, H, W]`
    /// indexing) applied with probability `prob`.
    pub fn new(axis: usize, prob: f64) -> Self {
        assert!(axis < 3, "Axis must index into a [C, H, W] tensor");
        assert!((0.0..=1.0).contains(&prob), "Probability must be in [0, 1]");
        Self { axis, prob }
    }
}

impl<B: Backend> Transform<B> for RandomAxisFlip {
    fn apply(&self, tensors: Vec<Tensor<B, 3>>, rng: &mut StdRng) -> Vec<Tensor<B, 3>> {
        if !rng.random_bool(self.prob) {
            return tensors;
        }
        tensors
            .into_iter()
            .map(|tensor| tensor.flip([self.axis as isize]))
            .collect()
    }
}

/// Adds zero-mean Gaussian noise to the tensor at position `key`.
///
/// The noise standard deviation is itself drawn per call from
/// `Normal(mu, sigma)` and clamped to be non-negative, so some calls add
/// strong noise and some add none. Every other tensor of the tuple passes
/// through unchanged; masks are never noised.
#[derive(Debug, Clone)]
pub struct GaussianNoise {
    std_dist: Normal<f64>,
    key: usize,
}

impl GaussianNoise {
    /// Create a noise transform targeting the tensor at index `key`.
    pub fn new(mu: f64, sigma: f64, key: usize) -> Self {
        let std_dist = Normal::new(mu, sigma)
            .unwrap_or_else(|_| panic!("Invalid noise distribution: mu={mu}, sigma={sigma}"));
        Self { std_dist, key }
    }
}

impl<B: Backend> Transform<B> for GaussianNoise {
    fn apply(&self, mut tensors: Vec<Tensor<B, 3>>, rng: &mut StdRng) -> Vec<Tensor<B, 3>> {
        let std_dev = rng.sample(self.std_dist).max(0.0);
        if std_dev == 0.0 {
            return tensors;
        }

        let target = tensors[self.key].clone();
        let shape = target.dims();
        let noise_dist = Normal::new(0.0, std_dev)
            .unwrap_or_else(|_| panic!("Invalid noise standard deviation: {std_dev}"));
        let noise: Vec<f32> = (0..shape.iter().product::<usize>())
            .map(|_| rng.sample(noise_dist) as f32)
            .collect();
        let noise = Tensor::from_data(
            TensorData::new(noise, shape).convert::<B::FloatElem>(),
            &target.device(),
        );

        tensors[self.key] = target + noise;
        tensors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArray;
    use rand::SeedableRng;

    type TestBackend = NdArray;

    fn arange_tensor(channels: usize, height: usize, width: usize) -> Tensor<TestBackend, 3> {
        let device = Default::default();
        let values: Vec<f32> = (0..channels * height * width).map(|i| i as f32).collect();
        Tensor::from_data(TensorData::new(values, [channels, height, width]), &device)
    }

    fn to_vec(tensor: Tensor<TestBackend, 3>) -> Vec<f32> {
        tensor.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn random_crop_matches_requested_size() {
        let image = arange_tensor(1, 4, 4);
        let mask = arange_tensor(1, 4, 4);
        let crop = RandomCrop::new([2, 2]);

        let mut rng = StdRng::seed_from_u64(7);
        let out = crop.apply(vec![image.clone(), mask], &mut rng);

        assert_eq!(out[0].dims(), [1, 2, 2]);
        assert_eq!(out[1].dims(), [1, 2, 2]);

        // Replay the same draws to recover the offset and verify the slice
        // came from a valid in-bounds window.
        let mut replay = StdRng::seed_from_u64(7);
        let y = replay.random_range(0..=2usize);
        let x = replay.random_range(0..=2usize);
        let expected = image.slice([0..1, y..y + 2, x..x + 2]);
        assert_eq!(to_vec(out[0].clone()), to_vec(expected));
    }

    #[test]
    #[should_panic(expected = "exceeds input size")]
    fn random_crop_rejects_oversized_patch() {
        let image = arange_tensor(1, 4, 4);
        let crop = RandomCrop::new([8, 8]);
        let mut rng = StdRng::seed_from_u64(0);
        let _ = crop.apply(vec![image], &mut rng);
    }

    #[test]
    fn axis_flip_applies_to_all_tensors_or_none() {
        let image = arange_tensor(1, 3, 3);
        let mask = arange_tensor(1, 3, 3).mul_scalar(2.0);

        let always = RandomAxisFlip::new(2, 1.0);
        let mut rng = StdRng::seed_from_u64(1);
        let out = always.apply(vec![image.clone(), mask.clone()], &mut rng);
        assert_eq!(to_vec(out[0].clone()), to_vec(image.clone().flip([2])));
        assert_eq!(to_vec(out[1].clone()), to_vec(mask.clone().flip([2])));

        let never = RandomAxisFlip::new(2, 0.0);
        let mut rng = StdRng::seed_from_u64(1);
        let out = never.apply(vec![image.clone(), mask.clone()], &mut rng);
        assert_eq!(to_vec(out[0].clone()), to_vec(image));
        assert_eq!(to_vec(out[1].clone()), to_vec(mask));
    }

    #[test]
    fn gaussian_noise_touches_only_the_keyed_tensor() {
        let image = arange_tensor(1, 4, 4);
        let mask = arange_tensor(1, 4, 4);

        // sigma = 0 pins the drawn standard deviation at exactly mu.
        let noise = GaussianNoise::new(5.0, 0.0, 0);
        let mut rng = StdRng::seed_from_u64(3);
        let out = noise.apply(vec![image.clone(), mask.clone()], &mut rng);

        assert_ne!(to_vec(out[0].clone()), to_vec(image));
        assert_eq!(to_vec(out[1].clone()), to_vec(mask));
    }

    #[test]
    fn gaussian_noise_with_negative_mu_passes_through() {
        // A heavily negative mu clamps the drawn standard deviation to zero.
        let image = arange_tensor(1, 2, 2);
        let noise = GaussianNoise::new(-100.0, 0.1, 0);
        let mut rng = StdRng::seed_from_u64(11);
        let out = noise.apply(vec![image.clone()], &mut rng);
        assert_eq!(to_vec(out[0].clone()), to_vec(image));
    }
}

//! Common utilities for the demos.
//!
//! Backend selection is resolved at compile time from cargo features, so
//! every binary runs unchanged on CPU or GPU.

cfg_if::cfg_if! {
    if #[cfg(feature = "cuda")] {
        pub type SelectedBackend = burn::backend::Cuda;
        pub type SelectedDevice = burn::backend::cuda::CudaDevice;

        pub fn create_device() -> SelectedDevice {
            SelectedDevice::default()
        }

        pub const fn get_backend_name() -> &'static str {
            "cuda"
        }
    } else if #[cfg(feature = "wgpu")] {
        pub type SelectedBackend = burn::backend::Wgpu;
        pub type SelectedDevice = burn::backend::wgpu::WgpuDevice;

        pub fn create_device() -> SelectedDevice {
            SelectedDevice::default()
        }

        pub const fn get_backend_name() -> &'static str {
            "wgpu"
        }
    } else {
        pub type SelectedBackend = burn::backend::NdArray;
        pub type SelectedDevice = burn::backend::ndarray::NdArrayDevice;

        pub fn create_device() -> SelectedDevice {
            burn::backend::ndarray::NdArrayDevice::Cpu
        }

        pub const fn get_backend_name() -> &'static str {
            "ndarray"
        }
    }
}

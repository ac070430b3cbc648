use crate::core::{DeviceKind, ModelOptions};
use candle_core::Device;

/// Request for a specific device, used by pipeline builders.
#[derive(Clone, Debug, Default)]
pub enum DeviceRequest {
    /// Use CUDA 0 if available, otherwise CPU.
    #[default]
    Default,
    /// Force CPU even if CUDA is available.
    Cpu,
    /// Select a specific CUDA device by index.
    Cuda(usize),
    /// Provide an already constructed device.
    Explicit(Device),
}

impl DeviceRequest {
    /// Build a request from the `[model]` section of the configuration.
    pub fn from_config(kind: DeviceKind, cuda_index: usize) -> Self {
        match kind {
            DeviceKind::Auto => DeviceRequest::Default,
            DeviceKind::Cpu => DeviceRequest::Cpu,
            DeviceKind::Cuda => DeviceRequest::Cuda(cuda_index),
        }
    }

    /// Resolve the request into an actual [`Device`].
    pub fn resolve(self) -> anyhow::Result<Device> {
        match self {
            DeviceRequest::Default => Ok(Device::cuda_if_available(0)?),
            DeviceRequest::Cpu => Ok(Device::Cpu),
            DeviceRequest::Cuda(i) => Ok(Device::new_cuda(i)?),
            DeviceRequest::Explicit(d) => Ok(d),
        }
    }
}

/// Cache key combining model options and device location.
pub fn build_cache_key<O: ModelOptions>(options: &O, device: &Device) -> String {
    format!("{}-{:?}", options.cache_key(), device.location())
}

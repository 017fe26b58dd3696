//! Device selection: CUDA when compiled in and available, CPU otherwise.

use candle_core::Device;

/// Select the compute device for training and inference.
pub fn select_device() -> Device {
    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            tracing::info!("Using CUDA device 0");
            return device;
        }
        tracing::warn!("CUDA feature enabled but no GPU available, falling back to CPU");
    }

    Device::Cpu
}

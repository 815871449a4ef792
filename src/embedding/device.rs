use candle_core::Device;
use tracing::{debug, warn};

#[cfg(any(feature = "metal", feature = "cuda"))]
use tracing::info;

/// Starts the compute backend: the first GPU backend compiled in and present, else CPU.
#[allow(unused_mut)]
pub fn select_device() -> Device {
    let mut failures: Vec<String> = Vec::new();

    #[cfg(feature = "metal")]
    match Device::new_metal(0) {
        Ok(device) => {
            info!(backend = "metal", "Using Metal GPU acceleration");
            return device;
        }
        Err(e) => failures.push(format!("metal: {e}")),
    }

    #[cfg(feature = "cuda")]
    match Device::new_cuda(0) {
        Ok(device) => {
            info!(backend = "cuda", "Using CUDA GPU acceleration");
            return device;
        }
        Err(e) => failures.push(format!("cuda: {e}")),
    }

    if failures.is_empty() {
        debug!("No GPU backend compiled, using CPU");
    } else {
        warn!(reason = %failures.join("; "), "Falling back to CPU device");
    }
    Device::Cpu
}

/// Short backend label for logs.
pub fn device_label(device: &Device) -> &'static str {
    match device {
        Device::Cpu => "cpu",
        Device::Cuda(_) => "cuda",
        Device::Metal(_) => "metal",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(any(feature = "metal", feature = "cuda")))]
    #[test]
    fn test_select_device_defaults_to_cpu() {
        let device = select_device();
        assert_eq!(device_label(&device), "cpu");
    }
}

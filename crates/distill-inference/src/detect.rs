//! Accelerator memory detection via `nvidia-smi`.

use std::time::Duration;

use tokio::process::Command;

const NVIDIA_SMI_TIMEOUT: Duration = Duration::from_secs(10);

/// Total memory of the first GPU in GiB, or `None` if it cannot be determined.
pub async fn detect_gpu_memory_gib() -> Option<f64> {
    let run = Command::new("nvidia-smi")
        .args(["--query-gpu=memory.total", "--format=csv,noheader,nounits"])
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(NVIDIA_SMI_TIMEOUT, run).await {
        Ok(Ok(output)) if output.status.success() => output,
        Ok(Ok(output)) => {
            tracing::warn!(status = %output.status, "nvidia-smi exited with failure");
            return None;
        }
        Ok(Err(e)) => {
            tracing::warn!(%e, "nvidia-smi could not be run");
            return None;
        }
        Err(_) => {
            tracing::warn!("nvidia-smi timed out");
            return None;
        }
    };

    let memory = parse_memory_total(&String::from_utf8_lossy(&output.stdout));
    if memory.is_none() {
        tracing::warn!("unrecognised nvidia-smi output");
    }
    memory
}

/// Parse `memory.total` output (MiB, one line per GPU) into GiB of the first GPU.
#[must_use]
pub fn parse_memory_total(stdout: &str) -> Option<f64> {
    let first = stdout.lines().map(str::trim).find(|line| !line.is_empty())?;
    let mib: u32 = first.parse().ok()?;
    Some(f64::from(mib) / 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_gpu_in_gib() {
        assert_eq!(parse_memory_total("12282\n24564\n"), Some(12282.0 / 1024.0));
        assert_eq!(parse_memory_total("  8192  "), Some(8.0));
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(parse_memory_total(""), None);
        assert_eq!(parse_memory_total("No devices were found"), None);
        assert_eq!(parse_memory_total("[N/A]"), None);
    }
}

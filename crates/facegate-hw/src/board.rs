//! Host board detection.

/// True if this host is a Raspberry Pi.
///
/// Reads the device-tree model, falling back to `/proc/cpuinfo` on kernels
/// without a device tree.
pub fn is_raspberry_pi() -> bool {
    if let Ok(model) = std::fs::read_to_string("/proc/device-tree/model") {
        return model_is_pi(&model);
    }
    std::fs::read_to_string("/proc/cpuinfo")
        .map(|info| cpuinfo_is_pi(&info))
        .unwrap_or(false)
}

fn model_is_pi(model: &str) -> bool {
    model.trim_end_matches('\0').contains("Raspberry Pi")
}

fn cpuinfo_is_pi(cpuinfo: &str) -> bool {
    const PI_SOCS: [&str; 6] = ["BCM2708", "BCM2709", "BCM2711", "BCM2835", "BCM2836", "BCM2837"];

    cpuinfo.lines().any(|line| {
        let Some((key, value)) = line.split_once(':') else {
            return false;
        };
        match key.trim() {
            "Model" => model_is_pi(value),
            "Hardware" => PI_SOCS.contains(&value.trim()),
            _ => false,
        }
    })
}

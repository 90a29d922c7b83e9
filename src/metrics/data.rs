//! Typed model of the `nvidia-smi -q -x` report.
//!
//! Every leaf is kept as the raw text the tool printed. Numeric interpretation
//! happens later in [`crate::metrics::normalize`], so a field the tool leaves
//! out, or reports as `N/A`, never fails deserialization.

use serde::{Deserialize, Serialize};

/// The top-level `<nvidia_smi_log>` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticReport {
    /// Kernel driver version (e.g. "450.80.02")
    pub driver_version: String,
    /// CUDA platform version (e.g. "11.0")
    pub cuda_version: String,
    /// Number of attached devices
    pub attached_gpus: String,
    /// Devices in report order
    #[serde(rename = "gpu")]
    pub gpus: Vec<Device>,
}

/// One `<gpu>` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Device {
    /// The `id` attribute, the PCI bus id on real hardware
    #[serde(rename(serialize = "id", deserialize = "@id"))]
    pub id: String,
    pub product_name: String,
    pub product_brand: String,
    pub display_mode: String,
    pub display_active: String,
    pub persistence_mode: String,
    pub accounting_mode: String,
    pub accounting_mode_buffer_size: String,
    pub driver_model: DriverModel,
    pub serial: String,
    pub uuid: String,
    pub minor_number: String,
    pub vbios_version: String,
    #[serde(rename = "multigpu_board")]
    pub multi_gpu_board: String,
    pub board_id: String,
    pub gpu_part_number: String,
    pub inforom_version: InforomVersion,
    pub gpu_operation_mode: OperationMode,
    pub gpu_virtualization_mode: VirtualizationMode,
    #[serde(rename = "ibmnpu")]
    pub ibm_npu: IbmNpu,
    pub pci: Pci,
    pub fan_speed: String,
    pub performance_state: String,
    pub fb_memory_usage: MemoryUsage,
    pub bar1_memory_usage: MemoryUsage,
    pub compute_mode: String,
    pub utilization: Utilization,
    pub encoder_stats: SessionStats,
    pub fbc_stats: SessionStats,
    pub temperature: Temperature,
    #[serde(rename = "gpu_power_readings", alias = "power_readings")]
    pub power_readings: PowerReadings,
    pub clocks: Clocks,
    pub max_clocks: Clocks,
    pub clock_policy: ClockPolicy,
    pub processes: ProcessList,
}

impl Device {
    /// Processes resident on this device, in report order.
    pub fn processes(&self) -> &[Process] {
        &self.processes.entries
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverModel {
    pub current_dm: String,
    pub pending_dm: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InforomVersion {
    pub img_version: String,
    pub oem_object: String,
    pub ecc_object: String,
    pub pwr_object: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationMode {
    #[serde(rename = "current_gom")]
    pub current: String,
    #[serde(rename = "pending_gom")]
    pub pending: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualizationMode {
    pub virtualization_mode: String,
    pub host_vgpu_mode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IbmNpu {
    pub relaxed_ordering_mode: String,
}

/// PCI bus identity and link state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pci {
    #[serde(rename = "pci_bus")]
    pub bus: String,
    #[serde(rename = "pci_device")]
    pub device: String,
    #[serde(rename = "pci_domain")]
    pub domain: String,
    #[serde(rename = "pci_device_id")]
    pub device_id: String,
    #[serde(rename = "pci_bus_id")]
    pub bus_id: String,
    #[serde(rename = "pci_sub_system_id")]
    pub sub_system_id: String,
    #[serde(rename = "pci_gpu_link_info")]
    pub link_info: PciLinkInfo,
    #[serde(rename = "pci_bridge_chip")]
    pub bridge_chip: BridgeChip,
    pub replay_counter: String,
    pub replay_rollover_counter: String,
    /// Transmit throughput, e.g. "1200 KB/s"
    pub tx_util: String,
    /// Receive throughput, e.g. "800 KB/s"
    pub rx_util: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PciLinkInfo {
    pub pcie_gen: PcieGen,
    pub link_widths: LinkWidths,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PcieGen {
    #[serde(rename = "max_link_gen")]
    pub max: String,
    #[serde(rename = "current_link_gen")]
    pub current: String,
}

/// Link widths as printed by the tool, e.g. "16x".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkWidths {
    #[serde(rename = "max_link_width")]
    pub max: String,
    #[serde(rename = "current_link_width")]
    pub current: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeChip {
    #[serde(rename = "bridge_chip_type")]
    pub chip_type: String,
    #[serde(rename = "bridge_chip_fw")]
    pub firmware: String,
}

/// Memory usage triple shared by the frame buffer and BAR1 blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryUsage {
    pub total: String,
    pub used: String,
    pub free: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Utilization {
    pub gpu_util: String,
    pub memory_util: String,
    pub encoder_util: String,
    pub decoder_util: String,
}

/// Encoder and frame buffer capture session statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionStats {
    pub session_count: String,
    pub average_fps: String,
    pub average_latency: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Temperature {
    pub gpu_temp: String,
    pub gpu_temp_max_threshold: String,
    pub gpu_temp_slow_threshold: String,
    pub gpu_temp_max_gpu_threshold: String,
    pub memory_temp: String,
    pub gpu_temp_max_mem_threshold: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerReadings {
    pub power_state: String,
    pub average_power_draw: String,
    pub instant_power_draw: String,
    pub current_power_limit: String,
    pub default_power_limit: String,
    pub requested_power_limit: String,
    pub min_power_limit: String,
    pub max_power_limit: String,
}

/// Clock frequencies, used for both the current and the maximum block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Clocks {
    pub graphics_clock: String,
    pub sm_clock: String,
    pub mem_clock: String,
    pub video_clock: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockPolicy {
    pub auto_boost: String,
    pub auto_boost_default: String,
}

/// The `<processes>` wrapper element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessList {
    #[serde(rename = "process_info")]
    pub entries: Vec<Process>,
}

/// One `<process_info>` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Process {
    pub pid: String,
    /// "C" for compute, "G" for graphics, "C+G" for both
    #[serde(rename = "type")]
    pub kind: String,
    pub process_name: String,
    /// Memory in use, e.g. "512 MiB"
    pub used_memory: String,
}

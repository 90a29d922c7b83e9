//! Rendering of a [`DiagnosticReport`] in the Prometheus text exposition format.
//!
//! Each sample is one `name{labels} value` line. Devices are written in report
//! order, each with the fixed device metric list followed by one line per
//! resident process.

use crate::error::{ExporterError, Result};
use crate::metrics::data::{DiagnosticReport, Device, Process};
use crate::metrics::normalize::{digits, passthrough, unit_value, version};
use std::fmt;
use std::io::Write;

/// Prefix shared by every exported metric.
pub const METRIC_PREFIX: &str = "nvidiasmi_";

/// Content type advertised for the rendered text.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Name of the single process-scoped metric.
pub const PROCESS_USED_MEMORY: &str = "nvidiasmi_process_used_memory_bytes";

/// Ordered identity labels attached to a sample.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    pairs: Vec<(&'static str, String)>,
}

impl LabelSet {
    /// Labels identifying a device: `id`, `uuid` and `name`.
    pub fn for_device(device: &Device) -> Self {
        Self {
            pairs: vec![
                ("id", device.id.clone()),
                ("uuid", device.uuid.clone()),
                ("name", device.product_name.clone()),
            ],
        }
    }

    /// Device labels extended with `process_pid` and `process_type`.
    pub fn for_process(device: &Device, process: &Process) -> Self {
        Self::for_device(device)
            .with("process_pid", process.pid.clone())
            .with("process_type", process.kind.clone())
    }

    /// Append a label after the existing ones.
    pub fn with(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.pairs.push((name, value.into()));
        self
    }

    /// Whether the set carries no labels at all.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Value of the label called `name`, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Label names in emission order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.pairs.iter().map(|(key, _)| *key)
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}=\"{}\"", name, escape_label_value(value))?;
        }
        Ok(())
    }
}

fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Format a single exposition line, including the trailing newline.
pub fn format_sample(name: &str, labels: &LabelSet, value: &str) -> String {
    if labels.is_empty() {
        format!("{} {}\n", name, value)
    } else {
        format!("{}{{{}}} {}\n", name, labels, value)
    }
}

/// Device-scoped samples for `device`, in exposition order.
///
/// Report-wide values (driver and CUDA versions, attached count) are repeated
/// for every device so each carries the device labels.
pub fn device_samples(report: &DiagnosticReport, device: &Device) -> Vec<(&'static str, String)> {
    let pci = &device.pci;
    let link = &pci.link_info;
    let power = &device.power_readings;
    let temp = &device.temperature;

    vec![
        ("nvidiasmi_driver_version", version(&report.driver_version)),
        ("nvidiasmi_cuda_version", version(&report.cuda_version)),
        ("nvidiasmi_attached_gpus", passthrough(&report.attached_gpus)),
        ("nvidiasmi_pci_pcie_gen_max", passthrough(&link.pcie_gen.max)),
        ("nvidiasmi_pci_pcie_gen_current", passthrough(&link.pcie_gen.current)),
        ("nvidiasmi_pci_link_width_max_multiplicator", digits(&link.link_widths.max)),
        ("nvidiasmi_pci_link_width_current_multiplicator", digits(&link.link_widths.current)),
        ("nvidiasmi_pci_replay_counter", passthrough(&pci.replay_counter)),
        ("nvidiasmi_pci_replay_rollover_counter", passthrough(&pci.replay_rollover_counter)),
        ("nvidiasmi_pci_tx_util_bytes_per_second", unit_value(&pci.tx_util)),
        ("nvidiasmi_pci_rx_util_bytes_per_second", unit_value(&pci.rx_util)),
        ("nvidiasmi_fan_speed_percent", unit_value(&device.fan_speed)),
        ("nvidiasmi_performance_state_int", digits(&device.performance_state)),
        ("nvidiasmi_fb_memory_usage_total_bytes", unit_value(&device.fb_memory_usage.total)),
        ("nvidiasmi_fb_memory_usage_used_bytes", unit_value(&device.fb_memory_usage.used)),
        ("nvidiasmi_fb_memory_usage_free_bytes", unit_value(&device.fb_memory_usage.free)),
        ("nvidiasmi_bar1_memory_usage_total_bytes", unit_value(&device.bar1_memory_usage.total)),
        ("nvidiasmi_bar1_memory_usage_used_bytes", unit_value(&device.bar1_memory_usage.used)),
        ("nvidiasmi_bar1_memory_usage_free_bytes", unit_value(&device.bar1_memory_usage.free)),
        ("nvidiasmi_utilization_gpu_percent", unit_value(&device.utilization.gpu_util)),
        ("nvidiasmi_utilization_memory_percent", unit_value(&device.utilization.memory_util)),
        ("nvidiasmi_utilization_encoder_percent", unit_value(&device.utilization.encoder_util)),
        ("nvidiasmi_utilization_decoder_percent", unit_value(&device.utilization.decoder_util)),
        ("nvidiasmi_encoder_session_count", passthrough(&device.encoder_stats.session_count)),
        ("nvidiasmi_encoder_average_fps", passthrough(&device.encoder_stats.average_fps)),
        ("nvidiasmi_encoder_average_latency", passthrough(&device.encoder_stats.average_latency)),
        ("nvidiasmi_fbc_session_count", passthrough(&device.fbc_stats.session_count)),
        ("nvidiasmi_fbc_average_fps", passthrough(&device.fbc_stats.average_fps)),
        ("nvidiasmi_fbc_average_latency", passthrough(&device.fbc_stats.average_latency)),
        ("nvidiasmi_gpu_temp_celsius", unit_value(&temp.gpu_temp)),
        ("nvidiasmi_gpu_temp_max_threshold_celsius", unit_value(&temp.gpu_temp_max_threshold)),
        ("nvidiasmi_gpu_temp_slow_threshold_celsius", unit_value(&temp.gpu_temp_slow_threshold)),
        ("nvidiasmi_gpu_temp_max_gpu_threshold_celsius", unit_value(&temp.gpu_temp_max_gpu_threshold)),
        ("nvidiasmi_memory_temp_celsius", unit_value(&temp.memory_temp)),
        ("nvidiasmi_gpu_temp_max_mem_threshold_celsius", unit_value(&temp.gpu_temp_max_mem_threshold)),
        ("nvidiasmi_power_state_int", digits(&power.power_state)),
        ("nvidiasmi_power_instant_draw_watts", unit_value(&power.instant_power_draw)),
        ("nvidiasmi_power_average_draw_watts", unit_value(&power.average_power_draw)),
        ("nvidiasmi_current_power_limit_watts", unit_value(&power.current_power_limit)),
        ("nvidiasmi_default_power_limit_watts", unit_value(&power.default_power_limit)),
        ("nvidiasmi_requested_power_limit_watts", unit_value(&power.requested_power_limit)),
        ("nvidiasmi_min_power_limit_watts", unit_value(&power.min_power_limit)),
        ("nvidiasmi_max_power_limit_watts", unit_value(&power.max_power_limit)),
        ("nvidiasmi_clock_graphics_hertz", unit_value(&device.clocks.graphics_clock)),
        ("nvidiasmi_clock_graphics_max_hertz", unit_value(&device.max_clocks.graphics_clock)),
        ("nvidiasmi_clock_sm_hertz", unit_value(&device.clocks.sm_clock)),
        ("nvidiasmi_clock_sm_max_hertz", unit_value(&device.max_clocks.sm_clock)),
        ("nvidiasmi_clock_mem_hertz", unit_value(&device.clocks.mem_clock)),
        ("nvidiasmi_clock_mem_max_hertz", unit_value(&device.max_clocks.mem_clock)),
        ("nvidiasmi_clock_video_hertz", unit_value(&device.clocks.video_clock)),
        ("nvidiasmi_clock_video_max_hertz", unit_value(&device.max_clocks.video_clock)),
        ("nvidiasmi_clock_policy_auto_boost", unit_value(&device.clock_policy.auto_boost)),
        ("nvidiasmi_clock_policy_auto_boost_default", unit_value(&device.clock_policy.auto_boost_default)),
    ]
}

/// Writes exposition lines to an output sink.
pub struct MetricWriter<W: Write> {
    out: W,
    lines: usize,
}

impl<W: Write> MetricWriter<W> {
    /// Wrap an output sink.
    pub fn new(out: W) -> Self {
        Self { out, lines: 0 }
    }

    /// Write one sample. A failing sink aborts the whole rendering.
    pub fn write_sample(&mut self, name: &'static str, labels: &LabelSet, value: &str) -> Result<()> {
        self.out
            .write_all(format_sample(name, labels, value).as_bytes())
            .map_err(|source| ExporterError::Write { metric: name, source })?;
        self.lines += 1;
        Ok(())
    }

    /// Write every device and process sample of `report`.
    pub fn write_report(&mut self, report: &DiagnosticReport) -> Result<()> {
        for device in &report.gpus {
            let labels = LabelSet::for_device(device);
            for (name, value) in device_samples(report, device) {
                self.write_sample(name, &labels, &value)?;
            }

            for process in device.processes() {
                let labels = LabelSet::for_process(device, process);
                self.write_sample(PROCESS_USED_MEMORY, &labels, &unit_value(&process.used_memory))?;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    /// Number of lines written so far.
    pub fn lines_written(&self) -> usize {
        self.lines
    }

    /// Unwrap the output sink.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Render `report` into an in-memory exposition body.
pub fn render(report: &DiagnosticReport) -> Result<String> {
    let mut writer = MetricWriter::new(Vec::new());
    writer.write_report(report)?;
    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::data::ProcessList;

    fn tesla() -> Device {
        let mut device = Device {
            id: "0".to_string(),
            uuid: "GPU-abc".to_string(),
            product_name: "Tesla T4".to_string(),
            performance_state: "P0".to_string(),
            fan_speed: "N/A".to_string(),
            ..Default::default()
        };
        device.fb_memory_usage.total = "16128 MiB".to_string();
        device.power_readings.instant_power_draw = "70.00 W".to_string();
        device.pci.replay_counter = "7".to_string();
        device.pci.replay_rollover_counter = "1".to_string();
        device.processes = ProcessList {
            entries: vec![Process {
                pid: "1234".to_string(),
                kind: "C".to_string(),
                process_name: "python".to_string(),
                used_memory: "512 MiB".to_string(),
            }],
        };
        device
    }

    fn report_with(gpus: Vec<Device>) -> DiagnosticReport {
        DiagnosticReport {
            driver_version: "450.80.02".to_string(),
            cuda_version: "11.0".to_string(),
            attached_gpus: gpus.len().to_string(),
            gpus,
        }
    }

    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_format_sample_with_and_without_labels() {
        assert_eq!(format_sample("up", &LabelSet::default(), "1"), "up 1\n");

        let labels = LabelSet::default().with("id", "0");
        assert_eq!(format_sample("up", &labels, "1"), "up{id=\"0\"} 1\n");
    }

    #[test]
    fn test_label_values_are_escaped() {
        let labels = LabelSet::default().with("name", "a\"b\\c\nd");
        assert_eq!(labels.to_string(), r#"name="a\"b\\c\nd""#);
    }

    #[test]
    fn test_device_sample_list_is_complete_and_ordered() {
        let report = report_with(vec![tesla()]);
        let samples = device_samples(&report, &report.gpus[0]);

        assert_eq!(samples.len(), 53);
        assert_eq!(samples[0].0, "nvidiasmi_driver_version");
        assert_eq!(samples.last().unwrap().0, "nvidiasmi_clock_policy_auto_boost_default");
        assert!(samples.iter().all(|(name, _)| name.starts_with(METRIC_PREFIX)));
    }

    #[test]
    fn test_device_sample_values_are_normalized() {
        let report = report_with(vec![tesla()]);
        let samples = device_samples(&report, &report.gpus[0]);
        let value = |name: &str| {
            samples
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.clone())
                .unwrap()
        };

        assert_eq!(value("nvidiasmi_driver_version"), "450.80");
        assert_eq!(value("nvidiasmi_fb_memory_usage_total_bytes"), "16911433728");
        assert_eq!(value("nvidiasmi_power_instant_draw_watts"), "70");
        assert_eq!(value("nvidiasmi_performance_state_int"), "0");
        assert_eq!(value("nvidiasmi_fan_speed_percent"), "0");
        assert_eq!(value("nvidiasmi_pci_replay_counter"), "7");
        assert_eq!(value("nvidiasmi_pci_replay_rollover_counter"), "1");
        assert_eq!(value("nvidiasmi_encoder_session_count"), "0");
    }

    #[test]
    fn test_render_device_and_process_lines() {
        let body = render(&report_with(vec![tesla()])).unwrap();

        assert!(body.contains(
            "nvidiasmi_fb_memory_usage_total_bytes{id=\"0\",uuid=\"GPU-abc\",name=\"Tesla T4\"} 16911433728\n"
        ));
        assert!(body.contains(
            "nvidiasmi_process_used_memory_bytes{id=\"0\",uuid=\"GPU-abc\",name=\"Tesla T4\",process_pid=\"1234\",process_type=\"C\"} 536870912\n"
        ));
        assert_eq!(body.lines().count(), 54);
        assert!(body.lines().last().unwrap().starts_with(PROCESS_USED_MEMORY));
    }

    #[test]
    fn test_every_device_line_carries_its_own_labels() {
        let mut second = tesla();
        second.id = "1".to_string();
        second.uuid = "GPU-def".to_string();
        second.processes = ProcessList::default();
        let report = report_with(vec![tesla(), second]);

        let body = render(&report).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 53 + 1 + 53);

        let first_device = LabelSet::for_device(&report.gpus[0]).to_string();
        let second_device = LabelSet::for_device(&report.gpus[1]).to_string();
        assert!(lines[..53].iter().all(|l| l.contains(&first_device)));
        assert!(lines[54..].iter().all(|l| l.contains(&second_device)));
    }

    #[test]
    fn test_process_labels_extend_device_labels() {
        let device = tesla();
        let labels = LabelSet::for_process(&device, &device.processes()[0]);

        let names: Vec<_> = labels.names().collect();
        assert_eq!(names, ["id", "uuid", "name", "process_pid", "process_type"]);
        assert_eq!(labels.get("process_pid"), Some("1234"));
        assert_eq!(labels.get("process_type"), Some("C"));
        assert_eq!(labels.get("uuid"), Some("GPU-abc"));
    }

    #[test]
    fn test_empty_report_renders_nothing() {
        assert_eq!(render(&DiagnosticReport::default()).unwrap(), "");
    }

    #[test]
    fn test_write_failure_is_reported() {
        let mut writer = MetricWriter::new(BrokenSink);
        let result = writer.write_report(&report_with(vec![tesla()]));

        match result {
            Err(ExporterError::Write { metric, .. }) => {
                assert_eq!(metric, "nvidiasmi_driver_version")
            }
            other => panic!("expected write error, got {:?}", other),
        }
        assert_eq!(writer.lines_written(), 0);
    }
}

use rstest::rstest;
use slidepot_config::{MonitorMode, load_file, load_toml};
use std::io::Write;

const BASE: &str = r#"
[pins]
hbridge_in1 = 12
hbridge_in2 = 13
adc_channel = 4
"#;

fn with(extra: &str) -> String {
    format!("{BASE}\n{extra}\n")
}

#[test]
fn accepts_full_config() {
    let toml = with(
        r#"
[drive]
scheme = "software_pwm"
duty_percent = 80.0
pwm_frequency_hz = 500.0

[sensor]
vref_v = 3.3
averaged_samples = 4
min_voltage_drop_v = 0.1
max_voltage_drop_v = 3.2

[calibration]
enabled = true
startup_delay_ms = 0
sample_count = 20
voltage_tolerance_v = 0.05
settle_ms = 100
max_slide_ms = 5000

[positioning]
tolerance_v = 0.05
max_iterations = 30
approach_gain = 0.7
backoff = 0.5

[monitor]
mode = "hold"
hold_target_v = 1.5
hysteresis_v = 0.02
dwell_ms = 250

[logging]
file = "slidepot.log"
level = "debug"
rotation = "daily"

[simulation]
forward_travel_ms = 900
backward_travel_ms = 1100
start_position = 0.0
noise_v = 0.01
"#,
    );
    let cfg = load_toml(&toml).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.monitor.mode, MonitorMode::Hold);
    assert_eq!(cfg.monitor.hold_target_v, Some(1.5));
    assert_eq!(cfg.calibration.sample_count, 20);
}

#[rstest]
#[case("[pins]\nhbridge_in1 = 12\nhbridge_in2 = 13\nadc_channel = 8\n", "pins.adc_channel")]
#[case("[calibration]\nsample_count = 0", "calibration.sample_count")]
#[case("[calibration]\nsample_count = 1", "calibration.sample_count")]
#[case("[calibration]\nvoltage_tolerance_v = 0.0", "calibration.voltage_tolerance_v")]
#[case("[calibration]\nsettle_ms = 0", "calibration.settle_ms")]
#[case("[calibration]\nmax_slide_ms = 0", "calibration.max_slide_ms")]
#[case("[positioning]\ntolerance_v = -0.1", "positioning.tolerance_v")]
#[case("[positioning]\nmax_iterations = 0", "positioning.max_iterations")]
#[case("[positioning]\napproach_gain = 1.5", "positioning.approach_gain")]
#[case("[positioning]\nbackoff = 0.0", "positioning.backoff")]
#[case("[drive]\nduty_percent = 0.0", "drive.duty_percent")]
#[case("[drive]\nduty_percent = 120.0", "drive.duty_percent")]
#[case("[sensor]\naveraged_samples = 0", "sensor.averaged_samples")]
#[case("[sensor]\nmin_voltage_drop_v = 2.0\nmax_voltage_drop_v = 1.0", "sensor.min_voltage_drop_v")]
#[case("[monitor]\nmode = \"hold\"", "monitor.hold_target_v")]
#[case("[monitor]\nhysteresis_v = -0.01", "monitor.hysteresis_v")]
#[case("[logging]\nrotation = \"weekly\"", "logging.rotation")]
#[case("[simulation]\nstart_position = 1.5", "simulation.start_position")]
#[case("[simulation]\nnoise_v = -0.1", "simulation.noise_v")]
fn rejects_out_of_range_values(#[case] extra: &str, #[case] key: &str) {
    // A replacement [pins] table stands on its own.
    let toml = if extra.starts_with("[pins]") {
        extra.to_string()
    } else {
        with(extra)
    };
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        err.to_string().contains(key),
        "error {err} should name {key}"
    );
}

#[test]
fn software_pwm_rejects_shared_pin() {
    let toml = r#"
[pins]
hbridge_in1 = 12
hbridge_in2 = 12
adc_channel = 0

[drive]
scheme = "software_pwm"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("duplicate pins");
    assert!(err.to_string().contains("pins.hbridge_in1"));
}

#[test]
fn unknown_monitor_mode_is_a_parse_error() {
    assert!(load_toml(&with("[monitor]\nmode = \"spin\"")).is_err());
}

#[test]
fn load_file_parses_and_validates() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(BASE.as_bytes()).unwrap();
    let cfg = load_file(f.path()).expect("load");
    assert_eq!(cfg.pins.adc_channel, 4);

    let mut bad = tempfile::NamedTempFile::new().unwrap();
    bad.write_all(with("[calibration]\nsample_count = 0").as_bytes())
        .unwrap();
    let err = load_file(bad.path()).unwrap_err();
    assert!(err.to_string().contains("calibration.sample_count"));
}

#[test]
fn load_file_reports_missing_path() {
    let err = load_file(std::path::Path::new("/nonexistent/slidepot.toml")).unwrap_err();
    assert!(err.to_string().contains("read config"));
}

#[test]
fn shipped_sample_config_is_valid() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../etc/slidepot.toml");
    let cfg = load_file(&path).expect("etc/slidepot.toml should load");
    assert_eq!(cfg.monitor.mode, MonitorMode::Cycle);
    assert_eq!(cfg.calibration.settle_ms, 300);
}

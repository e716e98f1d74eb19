use rstest::rstest;
use slidepot_hardware::{HwError, UnsupportedMotor, UnsupportedSensor};
use slidepot_traits::{MotorDriver, PositionSensor};

#[rstest]
#[case(1)]
#[case(16)]
fn stub_sensor_reports_not_implemented(#[case] n: u32) {
    let mut sensor = UnsupportedSensor;
    let err = sensor.sample_averaged(n).expect_err("stub must not sample");
    let hw = err.downcast_ref::<HwError>().expect("typed hardware error");
    assert!(matches!(hw, HwError::NotImplemented(_)));
}

#[test]
fn stub_motor_refuses_drive_but_coasts() {
    let mut motor = UnsupportedMotor;
    assert!(motor.drive_forward(100.0).is_err());
    assert!(motor.drive_backward(100.0).is_err());
    motor.coast().expect("coast is always possible");
}

use rstest::rstest;
use trickler_hardware::{SimUnit, SimulatedLed, SimulatedRig};
use trickler_traits::{Indicator, LedMode, PwmOutput, SerialLink};

fn line(link: &mut impl SerialLink) -> String {
    String::from_utf8(link.read_line().unwrap()).unwrap()
}

#[rstest]
#[case(SimUnit::Grains, 0, "ST,+00000.00 GN\r\n")]
#[case(SimUnit::Grains, 1_543_200, "ST,+00154.32 GN\r\n")]
#[case(SimUnit::Grams, 100_000, "ST,+010.0000  g\r\n")]
fn idle_rig_reports_stable_frames(#[case] unit: SimUnit, #[case] start: i64, #[case] want: &str) {
    let rig = SimulatedRig::new(unit, start, 500);
    let mut link = rig.scale_link();
    assert_eq!(line(&mut link), want);
    assert_eq!(line(&mut link), want);
}

#[test]
fn running_motor_reports_unstable_and_adds_weight() {
    let rig = SimulatedRig::new(SimUnit::Grams, 0, 2_000);
    let mut link = rig.scale_link();
    let mut pwm = rig.pwm();
    pwm.set_duty(1.0).unwrap();
    let first = line(&mut link);
    assert!(first.starts_with("US,"), "{first}");
    assert_eq!(rig.weight_e4(), 2_000);
    pwm.set_duty(0.0).unwrap();
    assert!(line(&mut link).starts_with("ST,"));
}

#[test]
fn unit_toggle_round_trips_close_to_start() {
    let rig = SimulatedRig::new(SimUnit::Grains, 1_000_000, 0);
    let mut link = rig.scale_link();
    link.write_all(b"U\r\n").unwrap();
    assert_eq!(rig.unit(), SimUnit::Grams);
    link.write_all(b"U\r\n").unwrap();
    assert_eq!(rig.unit(), SimUnit::Grains);
    assert!((rig.weight_e4() - 1_000_000).abs() <= 2);
}

#[test]
fn unknown_commands_are_ignored() {
    let rig = SimulatedRig::new(SimUnit::Grams, 0, 0);
    let mut link = rig.scale_link();
    link.write_all(b"Q\r\n").unwrap();
    assert_eq!(rig.unit(), SimUnit::Grams);
    assert!(line(&mut link).starts_with("ST,"));
}

#[test]
fn led_records_last_mode() {
    let mut led = SimulatedLed::default();
    led.apply(LedMode::SlowBlink).unwrap();
    led.apply(LedMode::On).unwrap();
    assert_eq!(led.mode, Some(LedMode::On));
}

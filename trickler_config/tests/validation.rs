use rstest::rstest;
use trickler_config::{load_file, load_toml, LedPattern, ScaleModelKind, StoreBackend};

#[test]
fn empty_file_yields_valid_defaults() {
    let cfg = load_toml("").expect("parse TOML");
    cfg.validate().expect("defaults validate");
    assert_eq!(cfg.scale.model, ScaleModelKind::And);
    assert_eq!(cfg.scale.port, "/dev/ttyUSB0");
    assert_eq!(cfg.scale.baudrate, 19200);
    assert_eq!(cfg.scale.stable_reading_length, 5);
    assert_eq!(cfg.motor.pin, 18);
    assert_eq!(cfg.control.period_ms, 100);
    assert_eq!(cfg.store.backend, StoreBackend::Memcache);
    assert_eq!(cfg.store.server, "127.0.0.1:11211");
    assert_eq!(cfg.leds.ready, LedPattern::SlowBlink);
    assert_eq!(cfg.bluetooth.name, "OpenTrickler");
}

#[rstest]
#[case("and", ScaleModelKind::And)]
#[case("and-fx120", ScaleModelKind::And)]
#[case("creedmoor", ScaleModelKind::Creedmoor)]
#[case("ussolid", ScaleModelKind::Ussolid)]
fn accepts_known_scale_models(#[case] name: &str, #[case] want: ScaleModelKind) {
    let cfg = load_toml(&format!("[scale]\nmodel = \"{name}\"\n")).expect("parse TOML");
    assert_eq!(cfg.scale.model, want);
}

#[test]
fn rejects_unknown_scale_model_at_parse_time() {
    let err = load_toml("[scale]\nmodel = \"acme\"\n").expect_err("unknown model");
    assert!(err.to_string().contains("acme"));
}

#[rstest]
#[case("[motor]\nmin_pwm = 60.0\nmax_pwm = 40.0\n", "min_pwm")]
#[case("[motor]\nmax_pwm = 120.0\n", "max_pwm must be within")]
#[case("[scale]\nbaudrate = 0\n", "baudrate must be > 0")]
#[case("[scale]\ntimeout_ms = 0\n", "timeout_ms must be >= 1")]
#[case("[scale]\nstable_reading_length = 0\n", "stable_reading_length")]
#[case("[pid]\noutput_min = 100.0\noutput_max = 0.0\n", "output_min must be < pid.output_max")]
#[case("[pid]\nkp = nan\n", "pid.kp must be finite")]
#[case("[control]\nperiod_ms = 0\n", "period_ms must be >= 1")]
#[case("[leds]\npoll_ms = 0\n", "poll_ms must be >= 1")]
#[case("[store]\nprefix = \"bad prefix\"\n", "prefix")]
#[case("[logging]\nrotation = \"weekly\"\n", "rotation")]
#[case("[bluetooth]\nname = \"\"\n", "bluetooth.name")]
#[case("[bluetooth]\nname = \"A name far too long to advertise\"\n", "bluetooth.name")]
fn rejects_invalid_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        format!("{err}").contains(needle),
        "error {err} does not mention {needle}"
    );
}

#[test]
fn accepts_full_example() {
    let toml = r#"
[scale]
model = "creedmoor"
port = "/dev/ttyAMA0"
baudrate = 9600
timeout_ms = 200
stable_reading_length = 8

[motor]
pin = 13
min_pwm = 20
max_pwm = 80

[pid]
kp = 8.0
ki = 1.0
kd = 2.5
tuner_mode = true

[store]
backend = "memory"
prefix = "bench1:"

[leds]
enabled = false
running = "pulse"

[logging]
file = "trickler.log"
rotation = "daily"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid");
    assert_eq!(cfg.motor.min_pwm, 20.0);
    assert!(cfg.pid.tuner_mode);
    assert_eq!(cfg.store.backend, StoreBackend::Memory);
    assert_eq!(cfg.leds.running, LedPattern::Pulse);
    assert!(!cfg.leds.enabled);
}

#[test]
fn load_file_reports_path_on_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[scale\n").unwrap();
    let err = load_file(&path).expect_err("broken TOML");
    assert!(format!("{err}").contains("broken.toml"));

    let missing = dir.path().join("missing.toml");
    assert!(load_file(&missing).is_err());
}

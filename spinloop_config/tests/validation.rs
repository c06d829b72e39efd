use rstest::rstest;
use spinloop_config::{IntegrationWindowCfg, ReferenceCfg, load_toml};

#[test]
fn empty_file_is_the_stock_tuning() {
    let cfg = load_toml("").expect("parse TOML");
    cfg.validate().expect("defaults must validate");
    assert_eq!(cfg.controller.kp_q15, 4000);
    assert_eq!(cfg.controller.ki_q15, 300);
    assert_eq!(cfg.controller.feedforward_per_rpm, 100_000);
    assert_eq!(cfg.estimator.counts_per_rev(), 2048);
    assert_eq!(cfg.schedule.period_ms, 10);
    assert_eq!(
        cfg.reference,
        ReferenceCfg::Square {
            amplitude_rpm: 2000,
            half_period_ms: 4000
        }
    );
}

#[test]
fn parses_full_file() {
    let toml = r#"
[controller]
kp_q15 = 6000
ki_q15 = 500
feedforward_per_rpm = 0
deadband_rpm = 10
full_scale_rpm = 3000
integrator_clamp = 200000000
slew_max_step = 5000000

[controller.integration_window]
mode = "proportional"
min_rpm = 100
percent = 20

[estimator]
capacity = 16
window_ms = 80
smoothing_shift = 2
ppr = 256
quadrature = 4

[schedule]
period_ms = 5

[reference]
kind = "constant"
rpm = -1200

[actuator]
timer_arr = 4199

[logging]
level = "debug"
rotation = "daily"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(
        cfg.controller.integration_window,
        IntegrationWindowCfg::Proportional {
            min_rpm: 100,
            percent: 20
        }
    );
    assert_eq!(cfg.controller.slew_max_step, Some(5_000_000));
    assert_eq!(cfg.estimator.counts_per_rev(), 1024);
    assert_eq!(cfg.reference, ReferenceCfg::Constant { rpm: -1200 });
    assert_eq!(cfg.actuator.timer_arr, 4199);
}

#[rstest]
#[case("[controller]\nfull_scale_rpm = 0", "controller.full_scale_rpm must be > 0")]
#[case("[controller]\nkp_q15 = 40000", "controller.kp_q15 must be in")]
#[case("[controller]\nki_q15 = -1", "controller.ki_q15 must be in")]
#[case("[controller]\nslew_max_step = 0", "slew_max_step must be > 0")]
#[case("[controller]\nintegrator_clamp = 2000000000", "integrator_clamp must be in")]
#[case(
    "[controller.integration_window]\nmode = \"proportional\"\npercent = 0",
    "percent must be > 0"
)]
#[case("[estimator]\ncapacity = 0", "estimator.capacity must be in")]
#[case("[estimator]\nsmoothing_shift = 16", "smoothing_shift must be <= 15")]
#[case("[estimator]\nppr = 0", "must be > 0")]
#[case("[estimator]\ncapacity = 4", "must be >= estimator.window_ms")]
#[case("[schedule]\nperiod_ms = 0", "schedule.period_ms must be > 0")]
#[case(
    "[reference]\nkind = \"square\"\namplitude_rpm = 100\nhalf_period_ms = 4005",
    "multiple of schedule.period_ms"
)]
#[case("[reference]\nkind = \"profile\"\ncsv = \"\"", "reference.csv must not be empty")]
#[case("[actuator]\ntimer_arr = 0", "actuator.timer_arr must be > 0")]
#[case("[logging]\nrotation = \"weekly\"", "logging.rotation must be one of")]
fn rejects_invalid_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}").contains(needle),
        "expected {needle:?} in {err}"
    );
}

#[test]
fn unknown_reference_kind_fails_to_parse() {
    assert!(load_toml("[reference]\nkind = \"sine\"\n").is_err());
}

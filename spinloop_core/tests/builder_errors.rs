use rstest::rstest;
use spinloop_core::error::BuildError;
use spinloop_core::mocks::{RecordingActuator, ScriptedEncoder};
use spinloop_core::{ConstantReference, ControllerCfg, DynControlLoop, EstimatorCfg, ScheduleCfg};

#[rstest]
fn builder_missing_encoder_yields_typed_build_error() {
    let err = DynControlLoop::builder()
        // missing with_encoder()
        .with_actuator(RecordingActuator::default())
        .with_reference(ConstantReference(1000))
        .try_build()
        .expect_err("should fail with MissingEncoder");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingEncoder) => {}
        other => panic!("expected MissingEncoder, got: {other:?}"),
    }
}

#[rstest]
fn builder_missing_actuator_and_reference() {
    let err = DynControlLoop::builder()
        .with_encoder(ScriptedEncoder::default())
        .with_reference(ConstantReference(1000))
        .try_build()
        .expect_err("should fail with MissingActuator");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::MissingActuator)
    ));

    let err = DynControlLoop::builder()
        .with_encoder(ScriptedEncoder::default())
        .with_actuator(RecordingActuator::default())
        .try_build()
        .expect_err("should fail with MissingReference");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::MissingReference)
    ));
}

#[rstest]
#[case::zero_full_scale(
    ControllerCfg { full_scale_rpm: 0, ..ControllerCfg::default() },
    EstimatorCfg::default()
)]
#[case::gain_out_of_range(
    ControllerCfg { kp_q15: 40_000, ..ControllerCfg::default() },
    EstimatorCfg::default()
)]
#[case::undersized_buffer(
    ControllerCfg::default(),
    EstimatorCfg { capacity: 2, ..EstimatorCfg::default() }
)]
#[case::zero_counts_per_rev(
    ControllerCfg::default(),
    EstimatorCfg { counts_per_rev: 0, ..EstimatorCfg::default() }
)]
#[case::shift_too_large(
    ControllerCfg::default(),
    EstimatorCfg { smoothing_shift: 16, ..EstimatorCfg::default() }
)]
fn invalid_configs_fail_at_build(#[case] controller: ControllerCfg, #[case] estimator: EstimatorCfg) {
    let err = DynControlLoop::builder()
        .with_encoder(ScriptedEncoder::default())
        .with_actuator(RecordingActuator::default())
        .with_reference(ConstantReference(0))
        .with_controller(controller)
        .with_estimator(estimator)
        .with_schedule(ScheduleCfg::default())
        .build()
        .expect_err("invalid config must be rejected");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::InvalidConfig(_))
    ));
}

#[rstest]
fn builder_with_defaults_builds() {
    let cl = DynControlLoop::builder()
        .with_encoder(ScriptedEncoder::default())
        .with_actuator(RecordingActuator::default())
        .with_reference(ConstantReference(0))
        .build()
        .expect("defaults are valid");
    assert_eq!(cl.schedule().period_ms, 10);
    assert!(!cl.controller().is_initialized());
}

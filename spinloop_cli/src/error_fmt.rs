//! Human-readable error descriptions and structured JSON error formatting.

use spinloop_core::error::{BuildError, LoopError, StopReason};

/// Stable name for the JSON `reason` field.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidConfig(_) => "InvalidConfig",
            BuildError::MissingEncoder | BuildError::MissingActuator | BuildError::MissingReference => {
                "IncompleteLoop"
            }
        };
    }
    if let Some(le) = err.downcast_ref::<LoopError>() {
        return match le {
            LoopError::Stopped(StopReason::EncoderLost) => "EncoderLost",
            LoopError::Hardware(_) | LoopError::HardwareFault(_) => "Hardware",
        };
    }
    "Error"
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingEncoder => {
                "What happened: No encoder was provided to the control loop.\nLikely causes: The rig failed to initialize or was not wired into the builder.\nHow to fix: Pass the encoder via with_encoder(...).".to_string()
            }
            BuildError::MissingActuator => {
                "What happened: No actuator was provided to the control loop.\nLikely causes: The rig failed to initialize or was not wired into the builder.\nHow to fix: Pass the actuator via with_actuator(...).".to_string()
            }
            BuildError::MissingReference => {
                "What happened: No reference source was set.\nLikely causes: The [reference] section could not be turned into a setpoint generator.\nHow to fix: Check [reference] in the config or pass --reference-csv.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range tuning values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(le) = err.downcast_ref::<LoopError>() {
        return match le {
            LoopError::Stopped(StopReason::EncoderLost) => "What happened: The encoder stopped responding during the run.\nLikely causes: Disconnected encoder cable or lost counter channel.\nHow to fix: Check encoder wiring and power, then start a new run.".to_string(),
            LoopError::Hardware(_) | LoopError::HardwareFault(_) => format!(
                "What happened: {le}.\nLikely causes: Encoder read or PWM write failed.\nHow to fix: Check the actuator driver and encoder, re-run with --log-level=debug for details."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("reference csv must have headers") {
        return "Invalid headers in reference CSV. Expected 't_ms,rpm'.".to_string();
    }

    if lower.contains("invalid configuration") {
        let detail = err.root_cause().to_string();
        return format!(
            "What happened: Configuration is invalid ({detail}).\nLikely causes: Out-of-range or inconsistent values in the TOML.\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("read config") {
        return format!(
            "What happened: Could not read the config file.\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Pass an existing TOML file with --config. Original: {msg}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes; anything unrecognized returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 2;
    }
    match err.downcast_ref::<LoopError>() {
        Some(LoopError::Stopped(StopReason::EncoderLost)) => 3,
        Some(LoopError::Hardware(_) | LoopError::HardwareFault(_)) => 4,
        None => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}

//! Human-readable error descriptions and structured JSON error formatting.

use trickler_core::error::{BuildError, TricklerError};

fn typed(err: &eyre::Report) -> Option<&TricklerError> {
    err.chain().find_map(|e| e.downcast_ref::<TricklerError>())
}

/// Stable name of the error kind, used as `reason` in JSON output.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    match typed(err) {
        Some(TricklerError::ScaleNotReady(_)) => "ScaleNotReady",
        Some(TricklerError::Hardware(_) | TricklerError::HardwareFault(_)) => "Hardware",
        Some(TricklerError::Store(_)) => "Store",
        Some(TricklerError::Config(_)) => "Config",
        Some(TricklerError::State(_)) => "State",
        Some(TricklerError::InvalidSetting(_)) => "InvalidSetting",
        Some(TricklerError::Timeout) => "Timeout",
        Some(TricklerError::Io(_)) => "Io",
        None => "Error",
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingLink => "What happened: No scale link was provided to the trickler.\nLikely causes: The serial port failed to open or was not wired into the builder.\nHow to fix: Check scale.port in the config and that the scale is connected.".to_string(),
            BuildError::MissingPwm => "What happened: No motor output was provided to the trickler.\nLikely causes: The PWM pin failed to initialize.\nHow to fix: Check motor.pin in the config and GPIO permissions.".to_string(),
            BuildError::MissingStore => "What happened: No shared state store was provided.\nLikely causes: The store failed to open.\nHow to fix: Check the [store] section of the config.".to_string(),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(te) = typed(err) {
        return match te {
            TricklerError::ScaleNotReady(detail) => format!(
                "What happened: The scale is not ready ({detail}).\nLikely causes: Scale unplugged or powered off, wrong scale.port, or missing permission on the serial device.\nHow to fix: Connect and power the scale, check scale.port and baudrate, and add the user to the dialout group."
            ),
            TricklerError::Store(detail) => format!(
                "What happened: Shared state store error ({detail}).\nLikely causes: memcached is not running or store.server is wrong.\nHow to fix: Start memcached (or set store.backend = \"memory\") and check store.server."
            ),
            TricklerError::Config(detail) => format!(
                "What happened: Invalid configuration ({detail}).\nLikely causes: Missing file, a TOML typo, or out-of-range values.\nHow to fix: Edit the config file, then rerun."
            ),
            TricklerError::InvalidSetting(detail) => format!(
                "What happened: Setting rejected ({detail}).\nLikely causes: A negative target weight or an unknown unit.\nHow to fix: Use a target weight >= 0 and a unit of g or GN."
            ),
            TricklerError::Timeout => "What happened: Timed out talking to a device.\nLikely causes: Loose cable or wrong baudrate.\nHow to fix: Check wiring and scale.baudrate; raise scale.timeout_ms if needed.".to_string(),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes for scripts; anything untyped exits with 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match typed(err) {
        Some(TricklerError::ScaleNotReady(_)) => 3,
        Some(TricklerError::Store(_)) => 4,
        Some(TricklerError::Config(_)) => 5,
        _ if err.downcast_ref::<BuildError>().is_some() => 5,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;

    #[test]
    fn typed_errors_survive_context() {
        let err: eyre::Report = Err::<(), _>(TricklerError::Store("refused".into()))
            .wrap_err("opening shared state")
            .unwrap_err();
        assert_eq!(exit_code_for_error(&err), 4);
        assert_eq!(reason_name(&err), "Store");
        assert!(humanize(&err).contains("memcached"));
    }

    #[test]
    fn untyped_errors_exit_one() {
        let err = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&err), 1);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Error");
    }

    #[test]
    fn scale_not_ready_is_three() {
        let err: eyre::Report = TricklerError::ScaleNotReady("/dev/ttyUSB0".into()).into();
        assert_eq!(exit_code_for_error(&err), 3);
    }
}

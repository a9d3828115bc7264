use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for the watchdog.
///
/// Each failure class gets its own variant so callers can decide whether an
/// error aborts the operation (integrity, configuration) or only the current
/// tick (transport). CLI handlers continue to use `anyhow::Result` for
/// ad-hoc context chains.
#[derive(Debug, Error)]
pub enum WatchdogError {
    // ── Input ───────────────────────────────────────────────────────────
    #[error("input: {0}")]
    Input(#[from] InputError),

    // ── Hash chain / run integrity ──────────────────────────────────────
    #[error("integrity: {0}")]
    Integrity(#[from] IntegrityError),

    // ── Signatures ──────────────────────────────────────────────────────
    #[error("signature: {0}")]
    Signature(#[from] SignatureError),

    // ── Transport (collector, notification channels) ────────────────────
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Input errors ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum InputError {
    #[error("malformed metric snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("run file missing 'step_logs' or 'steps'")]
    MissingSteps,

    #[error("step {index} missing required key: '{key}'")]
    MissingStepField { index: usize, key: String },

    #[error("run file is not valid JSON: {0}")]
    Json(String),
}

// ─── Integrity errors ────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("hash mismatch at step {index}")]
    HashMismatch { index: usize },

    #[error("step {index} is not a JSON object")]
    MalformedStep { index: usize },

    #[error("run hash mismatch (stored {stored}, computed {computed})")]
    RunHashMismatch { stored: String, computed: String },

    #[error("run file has no run_hash")]
    MissingRunHash,

    #[error("run is signed; appending would invalidate the signature")]
    SignedRunSealed,
}

// ─── Signature errors ────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature invalid")]
    Invalid,

    #[error("run file has no run_signature")]
    Missing,

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("malformed key: {0}")]
    MalformedKey(String),
}

// ─── Transport errors ────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("metric source {source_name} unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    #[error("channel {channel} delivery failed: {message}")]
    Delivery { channel: String, message: String },

    #[error("channel {channel} timed out after {timeout_secs}s")]
    Timeout { channel: String, timeout_secs: u64 },
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("key file already exists: {0}")]
    KeysExist(String),

    #[error("key file not found: {0}")]
    KeyNotFound(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, WatchdogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_mismatch_reports_index() {
        let err = WatchdogError::Integrity(IntegrityError::HashMismatch { index: 3 });
        assert!(err.to_string().contains("step 3"));
    }

    #[test]
    fn signature_invalid_is_generic() {
        let err = WatchdogError::Signature(SignatureError::Invalid);
        assert_eq!(err.to_string(), "signature: signature invalid");
    }

    #[test]
    fn anyhow_interop() {
        let anyhow_err = anyhow::anyhow!("something went wrong");
        let err: WatchdogError = anyhow_err.into();
        assert!(err.to_string().contains("something went wrong"));
    }

    #[test]
    fn missing_step_field_names_key() {
        let err = InputError::MissingStepField {
            index: 0,
            key: "C".into(),
        };
        assert_eq!(err.to_string(), "step 0 missing required key: 'C'");
    }

    #[test]
    fn transport_timeout_displays_seconds() {
        let err = WatchdogError::Transport(TransportError::Timeout {
            channel: "webhook".into(),
            timeout_secs: 5,
        });
        assert!(err.to_string().contains("5s"));
    }
}

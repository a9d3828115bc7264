//! Append-only, hash-chained step ledger.
//!
//! Each step hash is `sha256(prev_hash || canonical_json(step - step_hash))`
//! with `prev_hash = "GENESIS"` for the first step. The canonical form sorts
//! object keys, uses no whitespace, escapes non-ASCII as `\uXXXX` and prints
//! floats in shortest round-trip form with Python-style exponents, so chains
//! written by other producers verify byte-for-byte.

use super::detector::{AlertLevel, Detection};
use crate::error::IntegrityError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

pub const GENESIS: &str = "GENESIS";
pub const STEP_HASH_FIELD: &str = "step_hash";

/// Fields of one tick before they are hashed into the chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepFields {
    pub t: u64,
    #[serde(rename = "C")]
    pub c: f64,
    pub beta: f64,
    pub recovery_margin: f64,
    pub alert_level: AlertLevel,
}

impl StepFields {
    pub fn new(t: u64, c: f64, beta: f64, detection: Detection) -> Self {
        Self {
            t,
            c,
            beta,
            recovery_margin: detection.recovery_margin,
            alert_level: detection.alert_level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    #[serde(flatten)]
    pub fields: StepFields,
    pub step_hash: String,
}

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    steps: Vec<StepRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from persisted records, rejecting a broken chain.
    pub fn from_steps(steps: Vec<StepRecord>) -> Result<Self, IntegrityError> {
        verify_chain(&steps)?;
        Ok(Self { steps })
    }

    pub fn append(&mut self, fields: StepFields) -> &StepRecord {
        let prev = self.steps.last().map_or(GENESIS, |s| s.step_hash.as_str());
        let step_hash = hash_fields(&fields, prev);
        self.steps.push(StepRecord { fields, step_hash });
        let idx = self.steps.len() - 1;
        &self.steps[idx]
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn run_hash(&self) -> &str {
        run_hash(&self.steps)
    }

    pub fn verify(&self) -> Result<(), IntegrityError> {
        verify_chain(&self.steps)
    }

    pub fn into_steps(self) -> Vec<StepRecord> {
        self.steps
    }
}

fn hash_fields(fields: &StepFields, prev_hash: &str) -> String {
    let mut canonical = String::new();
    write_canonical(&step_value(fields), &mut canonical);
    digest(prev_hash, &canonical)
}

fn step_value<T: Serialize>(step: &T) -> Value {
    // Serializing plain records into a Value cannot fail; non-finite floats
    // already map to null.
    serde_json::to_value(step).unwrap_or(Value::Null)
}

fn digest(prev_hash: &str, canonical: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash of one step chained to `prev_hash`. `step` must serialize to a JSON
/// object; its own `step_hash` field, if present, is excluded.
pub fn compute_step_hash<T: Serialize>(step: &T, prev_hash: &str) -> Option<String> {
    let value = step_value(step);
    let map = value.as_object()?;
    Some(digest(prev_hash, &canonical_step(map)))
}

fn canonical_step(map: &Map<String, Value>) -> String {
    let mut out = String::new();
    out.push('{');
    let mut keys: Vec<&String> = map.keys().filter(|k| *k != STEP_HASH_FIELD).collect();
    keys.sort();
    for (idx, key) in keys.iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        write_json_string(key, &mut out);
        out.push(':');
        write_canonical(&map[key.as_str()], &mut out);
    }
    out.push('}');
    out
}

/// Canonical bytes of a step with `step_hash` removed.
pub fn canonical_json<T: Serialize>(step: &T) -> Option<String> {
    let value = step_value(step);
    value.as_object().map(canonical_step)
}

/// Walk the chain from the first step, recomputing each hash from the
/// previous *computed* hash. The first mismatch short-circuits.
pub fn verify_chain<T: Serialize>(steps: &[T]) -> Result<(), IntegrityError> {
    let mut prev = GENESIS.to_string();
    for (index, step) in steps.iter().enumerate() {
        let value = step_value(step);
        let map = value
            .as_object()
            .ok_or(IntegrityError::MalformedStep { index })?;
        let expected = digest(&prev, &canonical_step(map));
        let stored = map.get(STEP_HASH_FIELD).and_then(Value::as_str);
        if stored != Some(expected.as_str()) {
            return Err(IntegrityError::HashMismatch { index });
        }
        prev = expected;
    }
    Ok(())
}

pub fn run_hash(steps: &[StepRecord]) -> &str {
    steps.last().map_or("", |s| s.step_hash.as_str())
}

/// Run hash of untyped steps as read from a run file.
pub fn run_hash_of_values(steps: &[Value]) -> String {
    steps
        .last()
        .and_then(|s| s.get(STEP_HASH_FIELD))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            if n.is_f64() {
                write_float(n.as_f64().unwrap_or_default(), out);
            } else {
                let _ = write!(out, "{n}");
            }
        }
        Value::String(s) => write_json_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for (idx, key) in keys.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_json_string(key, out);
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
    }
}

/// Shortest round-trip float. Plain notation for exponents in `-4..16`,
/// otherwise `1.5e+16` / `1e-05`.
fn write_float(x: f64, out: &mut String) {
    let sci = format!("{x:e}");
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    if (-4..16).contains(&exp) {
        let plain = format!("{x}");
        out.push_str(&plain);
        if !plain.contains('.') {
            out.push_str(".0");
        }
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        let _ = write!(out, "{mantissa}e{sign}{:02}", exp.abs());
    }
}

fn write_json_string(s: &str, out: &mut String) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 || (c as u32) >= 0x7f => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{unit:04x}");
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

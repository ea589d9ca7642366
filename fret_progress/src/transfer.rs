use std::collections::HashSet;

use chrono::{DateTime, SecondsFormat, Utc};
use fret_schema::ProgressSnapshot;
use serde::{Deserialize, Serialize};

use crate::achievements;
use crate::error::ValidationError;

/// Application identifier stamped into every export.
pub const APP_ID: &str = "FretMemo";

/// Version of the envelope/snapshot wire shape. Bump on incompatible change;
/// imports reject anything they do not know.
pub const SCHEMA_VERSION: u32 = 1;

/// Versioned wrapper around a progress snapshot for backup and transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEnvelope {
    pub app: String,
    pub schema_version: u32,
    pub exported_at: DateTime<Utc>,
    pub progress: ProgressSnapshot,
}

pub fn export_snapshot(snapshot: ProgressSnapshot, now: DateTime<Utc>) -> ExportEnvelope {
    ExportEnvelope {
        app: APP_ID.to_string(),
        schema_version: SCHEMA_VERSION,
        exported_at: now,
        progress: snapshot,
    }
}

/// Conventional download name: `fretmemo-progress-<timestamp>.json` with the
/// RFC 3339 colons replaced by dashes so it is a valid filename everywhere.
pub fn export_file_name(now: DateTime<Utc>) -> String {
    let stamp = now
        .to_rfc3339_opts(SecondsFormat::Secs, true)
        .replace(':', "-");
    format!("fretmemo-progress-{stamp}.json")
}

/// Parse and validate an exported envelope. Rejects rather than guesses:
/// wrong app, unknown schema version, malformed position keys, or
/// achievements outside the known catalog all fail without producing a
/// partial snapshot.
pub fn import_json(data: &str) -> Result<ProgressSnapshot, ValidationError> {
    let value: serde_json::Value = serde_json::from_str(data)
        .map_err(|e| ValidationError::new("envelope", format!("not valid JSON: {e}")))?;

    // Version and identity checks come first so a future export gets a
    // precise rejection instead of a shape mismatch.
    let app = value
        .get("app")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ValidationError::new("app", "missing application identifier"))?;
    if app != APP_ID {
        return Err(ValidationError::new(
            "app",
            format!("not a {APP_ID} export (found {app:?})"),
        ));
    }

    let schema_version = value
        .get("schemaVersion")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| ValidationError::new("schemaVersion", "missing schema version"))?;
    if schema_version != u64::from(SCHEMA_VERSION) {
        return Err(ValidationError::new(
            "schemaVersion",
            format!("unsupported schema version {schema_version} (expected {SCHEMA_VERSION})"),
        ));
    }

    let envelope: ExportEnvelope = serde_json::from_value(value)
        .map_err(|e| ValidationError::new("progress", format!("malformed snapshot: {e}")))?;

    validate_snapshot(&envelope.progress)?;
    Ok(envelope.progress)
}

/// Structural checks beyond what deserialization already enforces. Position
/// keys are validated by the `Position` codec during parsing, so the checks
/// left here are the catalog ones.
fn validate_snapshot(snapshot: &ProgressSnapshot) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for achievement in &snapshot.achievements {
        if !achievements::is_known_id(&achievement.id) {
            return Err(ValidationError::new(
                "progress.achievements",
                format!("unknown achievement id {:?}", achievement.id),
            ));
        }
        if !seen.insert(achievement.id.as_str()) {
            return Err(ValidationError::new(
                "progress.achievements",
                format!("duplicate achievement id {:?}", achievement.id),
            ));
        }
    }

    for record in &snapshot.session_history {
        if let Some(ended) = record.ended_at {
            if ended < record.started_at {
                return Err(ValidationError::new(
                    "progress.sessionHistory",
                    "session ends before it starts",
                ));
            }
        }
    }

    Ok(())
}

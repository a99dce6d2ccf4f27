use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{error, warn};

/// Schema version stamped into every snapshot file. Files carrying any other
/// version are treated as absent on load.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Envelope written to disk: `{version, savedAt, <payload fields>}`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    version: u32,
    saved_at: i64,
    #[serde(flatten)]
    payload: T,
}

/// Serialize `payload` and atomically replace `path` with it.
///
/// Persistence is a best-effort side channel: failures are logged and
/// swallowed, never surfaced to the mutation that scheduled the write.
pub fn save<T: Serialize>(path: &Path, payload: &T) {
    if let Err(err) = try_save(path, payload) {
        error!(path = %path.display(), error = %err, "snapshot save failed");
    }
}

fn try_save<T: Serialize>(path: &Path, payload: &T) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }

    let envelope = Envelope {
        version: SNAPSHOT_VERSION,
        saved_at: chrono::Utc::now().timestamp_millis(),
        payload,
    };
    let data = serde_json::to_string(&envelope)
        .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;

    // Write to a sibling temp file, then rename into place so a reader never
    // observes a half-written snapshot.
    let tmp = temp_path(path);
    fs::write(&tmp, data)?;
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    use rand::Rng;
    let nonce: u32 = rand::thread_rng().gen();
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!(
        ".tmp-{}-{:08x}.json",
        chrono::Utc::now().timestamp_millis(),
        nonce
    ))
}

/// Load a prior snapshot payload. Absent, unreadable, corrupt, or
/// foreign-version files all come back as `None` ("no prior state") —
/// nothing here may fail startup.
pub fn load<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return None,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "snapshot read failed");
            return None;
        }
    };

    let envelope: Envelope<T> = match serde_json::from_str(&raw) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "discarding unparsable snapshot");
            return None;
        }
    };

    if envelope.version != SNAPSHOT_VERSION {
        warn!(
            path = %path.display(),
            version = envelope.version,
            "discarding snapshot with unknown version"
        );
        return None;
    }

    Some(envelope.payload)
}

use crate::settings::Settings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("unknown schema_version in {path}: {version}")]
    UnknownSchema { path: PathBuf, version: u32 },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

#[derive(Debug, Serialize, Deserialize)]
struct SettingsFile {
    schema_version: u32,
    settings: Settings,
}

/// Loads persisted settings. `Ok(None)` when nothing has been saved yet.
pub fn load(path: &Path) -> Result<Option<Settings>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file: SettingsFile = serde_json::from_slice(&data).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if file.schema_version != SCHEMA_VERSION {
        return Err(StoreError::UnknownSchema {
            path: path.to_path_buf(),
            version: file.schema_version,
        });
    }
    Ok(Some(file.settings.sanitized()))
}

pub fn save(path: &Path, settings: &Settings) -> Result<(), StoreError> {
    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(write_err)?;
    }

    let file = SettingsFile {
        schema_version: SCHEMA_VERSION,
        settings: settings.clone(),
    };
    let bytes = serde_json::to_vec_pretty(&file)
        .map_err(|err| write_err(io::Error::new(io::ErrorKind::InvalidData, err.to_string())))?;

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, bytes).map_err(write_err)?;
    match fs::rename(&tmp_path, path) {
        Ok(()) => {}
        Err(rename_err) => {
            if path.exists() {
                fs::remove_file(path).map_err(write_err)?;
                fs::rename(&tmp_path, path).map_err(write_err)?;
            } else {
                return Err(write_err(rename_err));
            }
        }
    }
    debug!(path = %path.display(), "settings saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{load, save, StoreError};
    use crate::settings::{Settings, ThemeMode};
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should be monotonic")
            .as_nanos();
        std::env::temp_dir()
            .join(format!(
                "chatstudio_settings_{prefix}_{}_{}",
                std::process::id(),
                nanos
            ))
            .join("settings.json")
    }

    #[test]
    fn missing_file_loads_as_none() {
        let path = temp_file("missing");
        assert!(load(&path).expect("missing file is not an error").is_none());
    }

    #[test]
    fn saved_settings_load_back() {
        let path = temp_file("saved");
        let mut settings = Settings::defaults();
        settings.theme = ThemeMode::Dark;
        settings.top_k = 7;
        save(&path, &settings).expect("settings should save");

        let loaded = load(&path)
            .expect("settings should load")
            .expect("settings should exist");
        assert_eq!(loaded, settings);

        let _ = fs::remove_dir_all(path.parent().expect("temp dir"));
    }

    #[test]
    fn unknown_schema_is_rejected() {
        let path = temp_file("unknown");
        fs::create_dir_all(path.parent().expect("temp dir")).expect("temp dir should exist");
        let mut value =
            serde_json::to_value(Settings::defaults()).expect("settings should serialize");
        value["top_k"] = serde_json::json!(3);
        let data = serde_json::json!({ "schema_version": 99, "settings": value });
        fs::write(&path, data.to_string()).expect("fixture should write");

        let error = load(&path).expect_err("unknown schema should fail");
        assert!(matches!(error, StoreError::UnknownSchema { version: 99, .. }));
        assert!(error.to_string().contains("unknown schema_version"));

        let _ = fs::remove_dir_all(path.parent().expect("temp dir"));
    }

    #[test]
    fn out_of_range_values_are_clamped_on_load() {
        let path = temp_file("clamped");
        fs::create_dir_all(path.parent().expect("temp dir")).expect("temp dir should exist");
        let mut value =
            serde_json::to_value(Settings::defaults()).expect("settings should serialize");
        value["top_p"] = serde_json::json!(4.0);
        let data = serde_json::json!({ "schema_version": 1, "settings": value });
        fs::write(&path, data.to_string()).expect("fixture should write");

        let loaded = load(&path).expect("load").expect("settings");
        assert_eq!(loaded.top_p, 1.0);

        let _ = fs::remove_dir_all(path.parent().expect("temp dir"));
    }
}

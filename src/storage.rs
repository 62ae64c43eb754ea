use crate::models::{AppData, DietPlan, Meal, UserProfile, WeightEntry};
use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, error};

/// One independently persisted piece of [`AppData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Profile,
    Plan,
    Meals,
    WeightHistory,
}

impl Slot {
    pub const ALL: [Slot; 4] = [Slot::Profile, Slot::Plan, Slot::Meals, Slot::WeightHistory];

    pub fn file_name(self) -> &'static str {
        match self {
            Slot::Profile => "profile.json",
            Slot::Plan => "plan.json",
            Slot::Meals => "meals.json",
            Slot::WeightHistory => "weight_history.json",
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("data file {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode {slot:?}: {source}")]
    Encode {
        slot: Slot,
        #[source]
        source: serde_json::Error,
    },
}

/// Loads every slot. Missing files fall back to the slot default; a file
/// that exists but does not parse is reported rather than replaced.
pub async fn load_data(dir: &Path) -> Result<AppData, StorageError> {
    let profile = load_slot::<Option<UserProfile>>(dir, Slot::Profile).await?.flatten();
    let plan = load_slot::<Option<DietPlan>>(dir, Slot::Plan).await?.flatten();
    let meals = load_slot::<Vec<Meal>>(dir, Slot::Meals).await?.unwrap_or_default();
    let weight_history = load_slot::<Vec<WeightEntry>>(dir, Slot::WeightHistory)
        .await?
        .unwrap_or_default();

    Ok(AppData {
        profile,
        plan,
        meals,
        weight_history,
    })
}

/// `Ok(None)` when the slot file does not exist.
pub async fn load_slot<T: DeserializeOwned>(dir: &Path, slot: Slot) -> Result<Option<T>, StorageError> {
    let path = dir.join(slot.file_name());
    let bytes = match fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(slot = ?slot, "slot missing, using default");
            return Ok(None);
        }
        Err(source) => return Err(StorageError::Read { path, source }),
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(Some(value)),
        Err(source) => {
            error!("failed to parse data file {}: {source}", path.display());
            Err(StorageError::Corrupt { path, source })
        }
    }
}

pub async fn persist_slots(dir: &Path, data: &AppData, slots: &[Slot]) -> Result<(), StorageError> {
    for &slot in slots {
        let payload = match slot {
            Slot::Profile => encode(slot, &data.profile),
            Slot::Plan => encode(slot, &data.plan),
            Slot::Meals => encode(slot, &data.meals),
            Slot::WeightHistory => encode(slot, &data.weight_history),
        }?;
        let path = dir.join(slot.file_name());
        fs::write(&path, payload)
            .await
            .map_err(|source| StorageError::Write { path, source })?;
    }
    Ok(())
}

fn encode<T: Serialize>(slot: Slot, value: &T) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec_pretty(value).map_err(|source| StorageError::Encode { slot, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::BmiCategory;
    use chrono::{TimeZone, Utc};

    fn scratch_dir(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!("smart_diet_storage_{tag}_{}_{nanos}", std::process::id()));
        std::fs::create_dir_all(&path).unwrap();
        path
    }

    #[tokio::test]
    async fn missing_slots_load_as_defaults() {
        let dir = scratch_dir("missing");
        let data = load_data(&dir).await.unwrap();
        assert_eq!(data, AppData::default());
    }

    #[tokio::test]
    async fn corrupt_slot_is_reported() {
        let dir = scratch_dir("corrupt");
        std::fs::write(dir.join("meals.json"), b"{not json").unwrap();

        let err = load_data(&dir).await.unwrap_err();
        match err {
            StorageError::Corrupt { path, .. } => assert!(path.ends_with("meals.json")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn mistyped_slot_is_corrupt_not_missing() {
        let dir = scratch_dir("mistyped");
        std::fs::write(dir.join("weight_history.json"), br#"{"weight": 70}"#).unwrap();
        assert!(matches!(load_data(&dir).await, Err(StorageError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn persisted_slots_load_back() {
        let dir = scratch_dir("roundtrip");
        let mut data = AppData::default();
        data.profile = Some(UserProfile {
            name: "Ada".to_string(),
            age: 36,
            height: 170,
            weight: 65.0,
            bmi: 22.5,
            bmi_category: BmiCategory::Normal,
        });
        data.weight_history.push(WeightEntry {
            date: Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap(),
            weight: 65.0,
            bmi: 22.5,
        });

        persist_slots(&dir, &data, &[Slot::Profile, Slot::WeightHistory]).await.unwrap();
        let loaded = load_data(&dir).await.unwrap();
        assert_eq!(loaded, data);
        assert!(!dir.join(Slot::Meals.file_name()).exists());
    }

    #[tokio::test]
    async fn absent_profile_persists_as_null() {
        let dir = scratch_dir("null");
        persist_slots(&dir, &AppData::default(), &Slot::ALL).await.unwrap();
        let raw = std::fs::read_to_string(dir.join("profile.json")).unwrap();
        assert_eq!(raw.trim(), "null");
        assert_eq!(load_data(&dir).await.unwrap(), AppData::default());
    }
}

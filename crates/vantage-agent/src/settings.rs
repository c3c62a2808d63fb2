//! Key/value settings persisted outside the agent, such as the home
//! position.

use std::collections::HashMap;

use glam::{DVec3, Vec3};
use serde::{Deserialize, Serialize};
use vantage_math::RegionHandle;

use crate::error::SettingsError;

pub const HOME_POSITION_KEY: &str = "home_position";

/// External settings storage. Values are RON strings.
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: String);
}

/// In-process settings store.
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    values: HashMap<String, String>,
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HomePosition {
    pub region: RegionHandle,
    pub position_local: Vec3,
}

impl HomePosition {
    pub fn position_global(&self) -> DVec3 {
        self.region.origin_global() + self.position_local.as_dvec3()
    }

    pub(crate) fn load(store: &dyn SettingsStore) -> Result<Option<Self>, SettingsError> {
        let Some(value) = store.get(HOME_POSITION_KEY) else {
            return Ok(None);
        };
        ron::from_str(&value)
            .map(Some)
            .map_err(|source| SettingsError::Parse {
                key: HOME_POSITION_KEY.to_string(),
                source,
            })
    }

    pub(crate) fn save(&self, store: &mut dyn SettingsStore) -> Result<(), SettingsError> {
        let value = ron::to_string(self).map_err(SettingsError::Serialize)?;
        store.set(HOME_POSITION_KEY, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_position_persists() {
        let mut store = MemorySettings::default();
        let home = HomePosition {
            region: RegionHandle::from_origin(256_000, 512_000),
            position_local: Vec3::new(128.0, 64.0, 25.0),
        };
        home.save(&mut store).unwrap();
        assert!(store.get(HOME_POSITION_KEY).is_some());
        assert_eq!(HomePosition::load(&store).unwrap(), Some(home));
        assert_eq!(home.position_global(), DVec3::new(256_128.0, 512_064.0, 25.0));
    }

    #[test]
    fn test_missing_home_is_none() {
        let store = MemorySettings::default();
        assert_eq!(HomePosition::load(&store).unwrap(), None);
    }

    #[test]
    fn test_corrupt_home_is_an_error() {
        let mut store = MemorySettings::default();
        store.set(HOME_POSITION_KEY, "not ron at all (".to_string());
        assert!(matches!(
            HomePosition::load(&store),
            Err(SettingsError::Parse { .. })
        ));
    }
}

//! Device-local flags read once at startup.
//!
//! Holds the anonymous identity token used to attribute views when no
//! user is signed in, and the "entered app" gate flag.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rf_core::{DeviceId, ViewerId};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub device_id: DeviceId,
    #[serde(default)]
    pub entered_app: bool,
    pub created_at: DateTime<Utc>,
}

impl DeviceState {
    fn fresh() -> Self {
        Self {
            device_id: DeviceId::new(),
            entered_app: false,
            created_at: Utc::now(),
        }
    }

    /// Read the persisted flags, creating and saving a new identity if the
    /// file is missing or unreadable.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        match Self::load_from_file(path) {
            Ok(Some(state)) => return Ok(state),
            Ok(None) => {
                tracing::info!("No device state at {}; creating one", path.display());
            }
            Err(e) => {
                tracing::warn!("Failed to load device state: {:#}; creating a new one", e);
            }
        }

        let state = Self::fresh();
        state.save(path)?;
        Ok(state)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write device state to {}", path.display()))?;
        Ok(())
    }

    /// Set the gate flag and persist it. Returns `false` if already set.
    pub fn mark_entered(&mut self, path: &Path) -> Result<bool> {
        if self.entered_app {
            return Ok(false);
        }
        self.entered_app = true;
        self.save(path)?;
        Ok(true)
    }

    pub fn viewer(&self) -> ViewerId {
        ViewerId::Device(self.device_id)
    }

    fn load_from_file(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let state: Self = serde_json::from_str(&content)?;
        Ok(Some(state))
    }
}

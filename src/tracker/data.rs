use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::Result;
use crate::tracker::modifier::{HideOption, ModelRotator, ModelScaler, TrackerModifier};

/// The persistent state of a tracker, flat enough to resume across reloads.
///
/// Optional fields stay `None` through a round-trip; defaults are substituted
/// only at access time, so an explicitly empty value survives serialization
/// unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerData {
    /// Model identifier.
    pub id: String,
    /// Stored scaler, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaler: Option<ModelScaler>,
    /// Stored rotator, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotator: Option<ModelRotator>,
    /// Static tracker configuration.
    #[serde(default)]
    pub modifier: TrackerModifier,
    /// Stored hide option, if any.
    #[serde(default, rename = "hide-option", skip_serializing_if = "Option::is_none")]
    pub hide_option: Option<HideOption>,
    /// Viewers queued for spawn on resume, if any.
    #[serde(default, rename = "mark-for-spawn", skip_serializing_if = "Option::is_none")]
    pub mark_for_spawn: Option<FxHashSet<Uuid>>,
}

impl TrackerData {
    /// A bare record carrying only a model id.
    #[must_use]
    pub fn of(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            scaler: None,
            rotator: None,
            modifier: TrackerModifier::DEFAULT,
            hide_option: None,
            mark_for_spawn: None,
        }
    }

    /// The stored scaler, or the entity default.
    #[must_use]
    pub fn scaler(&self) -> ModelScaler {
        self.scaler.clone().unwrap_or_default()
    }

    /// The stored rotator, or the yaw default.
    #[must_use]
    pub fn rotator(&self) -> ModelRotator {
        self.rotator.unwrap_or_default()
    }

    /// The stored hide option, or the default.
    #[must_use]
    pub fn hide_option(&self) -> HideOption {
        self.hide_option.unwrap_or_default()
    }

    /// The stored spawn marks, or an empty set.
    #[must_use]
    pub fn mark_for_spawn(&self) -> FxHashSet<Uuid> {
        self.mark_for_spawn.clone().unwrap_or_default()
    }

    /// Serializes to a JSON value.
    pub fn serialize(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Deserializes from a JSON value. A bare string is accepted as a
    /// model-id-only record.
    pub fn deserialize(value: &serde_json::Value) -> Result<Self> {
        if let serde_json::Value::String(id) = value {
            return Ok(Self::of(id.clone()));
        }
        Ok(serde_json::from_value(value.clone())?)
    }
}

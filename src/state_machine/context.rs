use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::collaborators::DetectedObject;
use crate::error::ContextError;

/// Keys a task state may declare as input or output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKey {
    ObjectName,
    Object,
    BasePose,
    TorsoPose,
}

impl ContextKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ObjectName => "object_name",
            Self::Object => "object",
            Self::BasePose => "base_pose",
            Self::TorsoPose => "torso_pose",
        }
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Goal of a base approach: a location known to the navigation stack by name,
/// or explicit map coordinates `[x, y, theta]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BaseTarget {
    Named(String),
    Coordinates(f64, f64, f64),
}

impl BaseTarget {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Interpret loosely typed orchestrator data.
    ///
    /// Accepts a string or an array whose first three entries are numbers; any
    /// further entries are ignored.
    pub fn from_value(value: &Value) -> Result<Self, ContextError> {
        let invalid = |reason: &str| ContextError::Invalid {
            key: ContextKey::BasePose.as_str(),
            reason: reason.to_string(),
        };

        match value {
            Value::String(name) if !name.is_empty() => Ok(Self::Named(name.clone())),
            Value::Array(items) if items.len() >= 3 => {
                let mut coords = [0.0; 3];
                for (slot, item) in coords.iter_mut().zip(items) {
                    *slot = item
                        .as_f64()
                        .ok_or_else(|| invalid("coordinates must be numeric"))?;
                }
                Ok(Self::Coordinates(coords[0], coords[1], coords[2]))
            }
            Value::Array(_) => Err(invalid("expected [x, y, theta]")),
            _ => Err(invalid("expected a location name or [x, y, theta]")),
        }
    }
}

impl fmt::Display for BaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::Coordinates(x, y, theta) => write!(f, "[{x}, {y}, {theta}]"),
        }
    }
}

/// Data shared by the states of one mission run.
///
/// Every slot is typed; a state reads only the keys it declares as input and
/// writes only the keys it declares as output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    mission_id: Uuid,
    object_name: Option<String>,
    object: Option<DetectedObject>,
    base_pose: Option<BaseTarget>,
    torso_pose: Option<String>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self {
            mission_id: Uuid::new_v4(),
            object_name: None,
            object: None,
            base_pose: None,
            torso_pose: None,
        }
    }

    pub fn mission_id(&self) -> Uuid {
        self.mission_id
    }

    pub fn contains(&self, key: ContextKey) -> bool {
        match key {
            ContextKey::ObjectName => self.object_name.is_some(),
            ContextKey::Object => self.object.is_some(),
            ContextKey::BasePose => self.base_pose.is_some(),
            ContextKey::TorsoPose => self.torso_pose.is_some(),
        }
    }

    pub fn object_name(&self) -> Option<&str> {
        self.object_name.as_deref()
    }

    pub fn set_object_name(&mut self, name: impl Into<String>) {
        self.object_name = Some(name.into());
    }

    pub fn object(&self) -> Result<&DetectedObject, ContextError> {
        self.object
            .as_ref()
            .ok_or(ContextError::Missing(ContextKey::Object.as_str()))
    }

    pub fn set_object(&mut self, object: DetectedObject) {
        self.object = Some(object);
    }

    pub fn clear_object(&mut self) -> Option<DetectedObject> {
        self.object.take()
    }

    pub fn base_pose(&self) -> Result<&BaseTarget, ContextError> {
        self.base_pose
            .as_ref()
            .ok_or(ContextError::Missing(ContextKey::BasePose.as_str()))
    }

    pub fn set_base_pose(&mut self, target: BaseTarget) {
        self.base_pose = Some(target);
    }

    /// Store a base pose received as untyped data, see [`BaseTarget::from_value`]
    pub fn set_base_pose_value(&mut self, value: &Value) -> Result<(), ContextError> {
        self.base_pose = Some(BaseTarget::from_value(value)?);
        Ok(())
    }

    pub fn torso_pose(&self) -> Result<&str, ContextError> {
        self.torso_pose
            .as_deref()
            .ok_or(ContextError::Missing(ContextKey::TorsoPose.as_str()))
    }

    pub fn set_torso_pose(&mut self, pose: impl Into<String>) {
        self.torso_pose = Some(pose.into());
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

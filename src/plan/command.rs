//! 动作指令与计划
//!
//! 线上形态：`{"cmd":"MOVE","pos":[x,y,z]}`、`{"cmd":"GRAB","width":w}`、
//! `{"cmd":"WRIST","angle":deg}`、`{"cmd":"WAIT","time":s}`（time 缺省 1.0）。
//!
//! 计划中的每一项先看标签：未知或缺失标签成为 `PlanStep::Unrecognized`，由调度器跳过；
//! 已知标签但字段不合法则整份计划被拒绝。

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::core::CommandError;

/// 已知的指令标签
pub const KNOWN_TAGS: [&str; 4] = ["MOVE", "GRAB", "WRIST", "WAIT"];

fn default_wait_seconds() -> f64 {
    1.0
}

/// 封闭的动作指令集合
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "cmd", rename_all = "UPPERCASE")]
pub enum ActionCommand {
    /// 末端移动到世界坐标 [x, y, z]
    Move {
        #[serde(rename = "pos")]
        position: [f64; 3],
    },
    /// 夹爪开口（米），0 为闭合，0.04 为全开
    Grab { width: f64 },
    /// 手腕相对旋转（度）
    Wrist {
        #[serde(rename = "angle")]
        angle_degrees: f64,
    },
    /// 原地等待（秒）
    Wait {
        #[serde(rename = "time", default = "default_wait_seconds")]
        seconds: f64,
    },
}

impl ActionCommand {
    pub fn tag(&self) -> &'static str {
        match self {
            ActionCommand::Move { .. } => "MOVE",
            ActionCommand::Grab { .. } => "GRAB",
            ActionCommand::Wrist { .. } => "WRIST",
            ActionCommand::Wait { .. } => "WAIT",
        }
    }

    /// 嵌入 LLM 提示词的 JSON Schema
    pub fn json_schema() -> String {
        let schema = schemars::schema_for!(ActionCommand);
        serde_json::to_string_pretty(&schema).unwrap_or_default()
    }
}

impl fmt::Display for ActionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionCommand::Move { position: [x, y, z] } => {
                write!(f, "MOVE [{x:.3}, {y:.3}, {z:.3}]")
            }
            ActionCommand::Grab { width } => write!(f, "GRAB {width:.3}"),
            ActionCommand::Wrist { angle_degrees } => write!(f, "WRIST {angle_degrees}°"),
            ActionCommand::Wait { seconds } => write!(f, "WAIT {seconds}s"),
        }
    }
}

fn tag_of(value: &Value) -> Option<&str> {
    value.get("cmd").and_then(Value::as_str)
}

impl TryFrom<Value> for ActionCommand {
    type Error = CommandError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let tag = match tag_of(&value) {
            Some(tag) => tag.to_string(),
            None => return Err(CommandError::MissingTag(value.to_string())),
        };
        if !KNOWN_TAGS.contains(&tag.as_str()) {
            return Err(CommandError::UnknownCommand { tag });
        }
        serde_json::from_value(value).map_err(|e| CommandError::Malformed {
            tag,
            reason: e.to_string(),
        })
    }
}

/// 计划中的一项
#[derive(Debug, Clone, PartialEq)]
pub enum PlanStep {
    Action(ActionCommand),
    /// 未知（或缺失）标签；保留原始 JSON 以便日志与回放
    Unrecognized { tag: String, raw: Value },
}

impl PlanStep {
    pub fn from_value(value: Value) -> Result<Self, CommandError> {
        let raw = value.clone();
        match ActionCommand::try_from(value) {
            Ok(command) => Ok(PlanStep::Action(command)),
            Err(CommandError::UnknownCommand { tag }) => Ok(PlanStep::Unrecognized { tag, raw }),
            Err(CommandError::MissingTag(_)) => Ok(PlanStep::Unrecognized {
                tag: String::new(),
                raw,
            }),
            Err(e) => Err(e),
        }
    }

    pub fn action(&self) -> Option<&ActionCommand> {
        match self {
            PlanStep::Action(command) => Some(command),
            PlanStep::Unrecognized { .. } => None,
        }
    }
}

impl From<ActionCommand> for PlanStep {
    fn from(command: ActionCommand) -> Self {
        PlanStep::Action(command)
    }
}

impl Serialize for PlanStep {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PlanStep::Action(command) => command.serialize(serializer),
            PlanStep::Unrecognized { raw, .. } => raw.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for PlanStep {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        PlanStep::from_value(value).map_err(serde::de::Error::custom)
    }
}

/// 有序动作计划
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Plan {
    steps: Vec<PlanStep>,
}

impl Plan {
    pub fn new(steps: Vec<PlanStep>) -> Self {
        Self { steps }
    }

    pub fn from_actions(actions: impl IntoIterator<Item = ActionCommand>) -> Self {
        Self::new(actions.into_iter().map(PlanStep::Action).collect())
    }

    /// 解析 JSON 数组形式的计划
    pub fn from_json_str(text: &str) -> Result<Self, CommandError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| CommandError::InvalidPlan(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, CommandError> {
        let Value::Array(items) = value else {
            return Err(CommandError::InvalidPlan(format!(
                "expected array, got {}",
                json_kind(&value)
            )));
        };
        let steps = items
            .into_iter()
            .map(PlanStep::from_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn extend(&mut self, other: Plan) {
        self.steps.extend(other.steps);
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

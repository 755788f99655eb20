//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `BARISTA__*` 覆盖（双下划线表示嵌套，如 `BARISTA__LLM__PROVIDER=mock`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::llm::RetryConfig;
use crate::plan::MotionSettings;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub sim: SimSection,
    pub motion: MotionSection,
    pub llm: LlmSection,
    pub planner: PlannerSection,
}

/// [app] 段
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
}

/// [sim] 段：物理节拍与关节电机速度
#[derive(Debug, Clone, Deserialize)]
pub struct SimSection {
    #[serde(default = "default_tick_hz")]
    pub tick_hz: f64,
    /// 手臂关节最大速度（rad/s）
    #[serde(default = "default_arm_joint_speed")]
    pub arm_joint_speed: f64,
    /// 手指最大速度（m/s）
    #[serde(default = "default_finger_speed")]
    pub finger_speed: f64,
}

fn default_tick_hz() -> f64 {
    240.0
}

fn default_arm_joint_speed() -> f64 {
    3.0
}

fn default_finger_speed() -> f64 {
    0.2
}

impl Default for SimSection {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            arm_joint_speed: default_arm_joint_speed(),
            finger_speed: default_finger_speed(),
        }
    }
}

/// [motion] 段：插值步数、步间延时、IK 参数
#[derive(Debug, Clone, Deserialize)]
pub struct MotionSection {
    #[serde(default = "default_move_steps")]
    pub move_steps: u32,
    #[serde(default = "default_wrist_steps")]
    pub wrist_steps: u32,
    #[serde(default = "default_grab_steps")]
    pub grab_steps: u32,
    #[serde(default = "default_home_steps")]
    pub home_steps: u32,
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    #[serde(default = "default_grip_settle_ms")]
    pub grip_settle_ms: u64,
    /// 计划结束后的归位点
    #[serde(default = "default_home_position")]
    pub home_position: [f64; 3],
    #[serde(default = "default_ik_max_iterations")]
    pub ik_max_iterations: u32,
    #[serde(default = "default_ik_residual_threshold")]
    pub ik_residual_threshold: f64,
}

fn default_move_steps() -> u32 {
    150
}

fn default_wrist_steps() -> u32 {
    100
}

fn default_grab_steps() -> u32 {
    50
}

fn default_home_steps() -> u32 {
    100
}

fn default_step_delay_ms() -> u64 {
    10
}

fn default_grip_settle_ms() -> u64 {
    200
}

fn default_home_position() -> [f64; 3] {
    [0.0, -0.4, 1.0]
}

fn default_ik_max_iterations() -> u32 {
    100
}

fn default_ik_residual_threshold() -> f64 {
    1e-5
}

impl Default for MotionSection {
    fn default() -> Self {
        Self {
            move_steps: default_move_steps(),
            wrist_steps: default_wrist_steps(),
            grab_steps: default_grab_steps(),
            home_steps: default_home_steps(),
            step_delay_ms: default_step_delay_ms(),
            grip_settle_ms: default_grip_settle_ms(),
            home_position: default_home_position(),
            ik_max_iterations: default_ik_max_iterations(),
            ik_residual_threshold: default_ik_residual_threshold(),
        }
    }
}

impl MotionSection {
    pub fn settings(&self) -> MotionSettings {
        MotionSettings {
            move_steps: self.move_steps,
            wrist_steps: self.wrist_steps,
            grab_steps: self.grab_steps,
            home_steps: self.home_steps,
            step_delay: Duration::from_millis(self.step_delay_ms),
            home_position: self.home_position,
        }
    }

    pub fn grip_settle(&self) -> Duration {
        Duration::from_millis(self.grip_settle_ms)
    }
}

/// LLM 后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Zhipu,
    OpenAi,
    Mock,
}

/// [llm] 段：后端选择、超时与重试
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    #[serde(default = "default_provider")]
    pub provider: LlmProvider,
    pub model: Option<String>,
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
    #[serde(default)]
    pub retry: LlmRetrySection,
}

fn default_provider() -> LlmProvider {
    LlmProvider::Zhipu
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            base_url: None,
            timeouts: LlmTimeoutsSection::default(),
            retry: LlmRetrySection::default(),
        }
    }
}

impl LlmSection {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.retry.max_retries,
            initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
            request_timeout: Duration::from_secs(self.timeouts.request),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    /// 单次请求超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmRetrySection {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_backoff_ms() -> u64 {
    500
}

impl Default for LlmRetrySection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}

/// 轨迹规划器种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlannerKind {
    /// 确定性的固定流程
    Sop,
    /// 由 LLM 逐原料生成
    Llm,
}

/// [planner] 段
#[derive(Debug, Clone, Deserialize)]
pub struct PlannerSection {
    #[serde(default = "default_planner_kind")]
    pub kind: PlannerKind,
    /// 倾倒流速（ml/s）
    #[serde(default = "default_pour_rate")]
    pub pour_rate_ml_per_s: f64,
}

fn default_planner_kind() -> PlannerKind {
    PlannerKind::Sop
}

fn default_pour_rate() -> f64 {
    50.0
}

impl Default for PlannerSection {
    fn default() -> Self {
        Self {
            kind: default_planner_kind(),
            pour_rate_ml_per_s: default_pour_rate(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 BARISTA__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 BARISTA__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("BARISTA")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

/// 加载失败时退回默认配置并记 warn
pub fn load_config_or_default(config_path: Option<PathBuf>) -> AppConfig {
    load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.sim.tick_hz, 240.0);
        assert_eq!(cfg.motion.settings(), MotionSettings::default());
        assert_eq!(cfg.motion.grip_settle(), Duration::from_millis(200));
        assert_eq!(cfg.llm.provider, LlmProvider::Zhipu);
        assert_eq!(cfg.planner.kind, PlannerKind::Sop);
        assert_eq!(cfg.llm.retry_config().request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_explicit_file_overrides_sections() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[motion]\nmove_steps = 30\nhome_position = [0.1, -0.3, 0.9]\n\n[llm]\nprovider = \"mock\"\n\n[planner]\nkind = \"llm\""
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.motion.move_steps, 30);
        assert_eq!(cfg.motion.wrist_steps, 100);
        assert_eq!(cfg.motion.home_position, [0.1, -0.3, 0.9]);
        assert_eq!(cfg.llm.provider, LlmProvider::Mock);
        assert_eq!(cfg.planner.kind, PlannerKind::Llm);
    }
}

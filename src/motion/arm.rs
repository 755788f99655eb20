//! 机械臂静态参数与身份句柄
//!
//! ArmProfile 描述 Franka Panda 的限位、休息位、末端 link 与夹爪关节；
//! ArmHandle 在构造时解析一次 BodyId，之后所有读写都经由它完成。

use std::sync::Arc;

use crate::core::EngineError;
use crate::motion::{JointConfiguration, JointLimits, ARM_DOF};
use crate::sim::{BodyId, MotorCommand, SimulationEngine};

/// 机械臂静态参数
#[derive(Debug, Clone, PartialEq)]
pub struct ArmProfile {
    pub limits: JointLimits,
    /// IK 零空间偏置；所有移动共用，保证整套动作保持同一种「肘部」构型
    pub rest_pose: JointConfiguration,
    /// reset 时写回的关节构型
    pub home: JointConfiguration,
    pub end_effector_link: usize,
    /// 两根手指的关节编号
    pub finger_joints: [usize; 2],
    /// 单指最大开口（米）
    pub max_aperture: f64,
    /// 关节位置电机的驱动力
    pub arm_force: f64,
    /// 夹爪开合过程中的低驱动力，避免夹碎物体
    pub grip_travel_force: f64,
    /// 到位后的保持力
    pub grip_hold_force: f64,
    /// reset 时夹爪电机使用的驱动力
    pub grip_reset_force: f64,
}

impl ArmProfile {
    pub fn panda() -> Self {
        let rest = JointConfiguration::new([0.0, -0.24, 0.0, -2.0, 0.0, 1.8, 0.8]);
        Self {
            limits: JointLimits {
                lower: [-2.96, -1.83, -2.96, -3.09, -2.96, -0.08, -2.96],
                upper: [2.96, 1.83, 2.96, 0.08, 2.96, 3.82, 2.96],
                ranges: [5.92, 3.66, 5.92, 3.17, 5.92, 3.90, 5.92],
            },
            rest_pose: rest,
            home: rest,
            end_effector_link: 11,
            finger_joints: [9, 10],
            max_aperture: 0.04,
            arm_force: 200.0,
            grip_travel_force: 20.0,
            grip_hold_force: 60.0,
            grip_reset_force: 200.0,
        }
    }

    /// 末端关节（手腕）编号
    pub fn wrist_joint(&self) -> usize {
        ARM_DOF - 1
    }
}

impl Default for ArmProfile {
    fn default() -> Self {
        Self::panda()
    }
}

/// 已解析的机械臂身份
#[derive(Debug, Clone)]
pub struct ArmHandle {
    body: BodyId,
    profile: Arc<ArmProfile>,
}

impl ArmHandle {
    /// 构造时解析身份；找不到即返回错误，由启动流程作为致命错误处理
    pub fn resolve(
        engine: &dyn SimulationEngine,
        body: BodyId,
        profile: ArmProfile,
    ) -> Result<Self, EngineError> {
        if !engine.is_connected() {
            return Err(EngineError::NotConnected);
        }
        if !engine.contains_body(body) {
            return Err(EngineError::UnknownBody(body));
        }
        Ok(Self {
            body,
            profile: Arc::new(profile),
        })
    }

    pub fn body(&self) -> BodyId {
        self.body
    }

    pub fn profile(&self) -> &ArmProfile {
        &self.profile
    }

    /// 读取 7 个关节的当前角度
    pub fn current_configuration(
        &self,
        engine: &dyn SimulationEngine,
    ) -> Result<JointConfiguration, EngineError> {
        let mut angles = [0.0; ARM_DOF];
        for (joint, angle) in angles.iter_mut().enumerate() {
            *angle = engine.joint_angle(self.body, joint)?;
        }
        Ok(JointConfiguration::new(angles))
    }

    /// 读取 7 个关节的电机设定点；未下发过指令的关节返回 None
    pub fn motor_targets(
        &self,
        engine: &dyn SimulationEngine,
    ) -> Result<[Option<MotorCommand>; ARM_DOF], EngineError> {
        let mut out = [None; ARM_DOF];
        for (joint, slot) in out.iter_mut().enumerate() {
            *slot = engine.joint_motor(self.body, joint)?;
        }
        Ok(out)
    }

    /// 下发一批关节位置指令；先夹到静态限位内再发送，返回实际下发的构型
    pub fn command_configuration(
        &self,
        engine: &mut dyn SimulationEngine,
        config: &JointConfiguration,
    ) -> Result<JointConfiguration, EngineError> {
        let clamped = config.clamped(&self.profile.limits);
        for (joint, target) in clamped.angles().iter().enumerate() {
            engine.set_joint_motor(
                self.body,
                joint,
                MotorCommand::new(*target, self.profile.arm_force),
            )?;
        }
        Ok(clamped)
    }

    /// 当前开口：以第一根手指为准
    pub fn aperture(&self, engine: &dyn SimulationEngine) -> Result<f64, EngineError> {
        engine.joint_angle(self.body, self.profile.finger_joints[0])
    }

    /// 两指对称下发开口指令
    pub fn command_fingers(
        &self,
        engine: &mut dyn SimulationEngine,
        width: f64,
        force: f64,
    ) -> Result<(), EngineError> {
        let width = self.clamp_aperture(width);
        for joint in self.profile.finger_joints {
            engine.set_joint_motor(self.body, joint, MotorCommand::new(width, force))?;
        }
        Ok(())
    }

    pub fn clamp_aperture(&self, width: f64) -> f64 {
        width.clamp(0.0, self.profile.max_aperture)
    }

    /// 同时重写关节瞬时值与电机设定点：只改其一，下一个 tick 会把关节拉回旧设定点
    pub fn teleport_home(&self, engine: &mut dyn SimulationEngine) -> Result<(), EngineError> {
        let profile = &self.profile;
        for (joint, angle) in profile.home.angles().iter().enumerate() {
            engine.reset_joint_angle(self.body, joint, *angle)?;
            engine.set_joint_motor(self.body, joint, MotorCommand::new(*angle, profile.arm_force))?;
        }
        for joint in profile.finger_joints {
            engine.reset_joint_angle(self.body, joint, profile.max_aperture)?;
            engine.set_joint_motor(
                self.body,
                joint,
                MotorCommand::new(profile.max_aperture, profile.grip_reset_force),
            )?;
        }
        Ok(())
    }
}

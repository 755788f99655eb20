//! 进程内仿真世界
//!
//! 实现 SimulationEngine：刚体位姿 + 关节位置电机。每次 step_simulation，
//! 有设定点的关节以受限速度向设定点逼近（驱动力为 0 的电机不产生运动）。
//! 没有重力与碰撞：未被瞬移的物体保持原位。

use crate::core::EngineError;
use crate::motion::{JointConfiguration, Pose};
use crate::sim::{BodyId, IkRequest, LinearizedIk, MotorCommand, SimulationEngine};

/// 默认物理步长（240 Hz）
pub const DEFAULT_TIME_STEP: f64 = 1.0 / 240.0;

#[derive(Debug, Clone)]
struct JointSlot {
    angle: f64,
    motor: Option<MotorCommand>,
    /// 电机驱动下的最大速度（rad/s 或 m/s）
    max_speed: f64,
}

#[derive(Debug, Clone)]
struct Body {
    name: String,
    pose: Pose,
    joints: Vec<JointSlot>,
}

/// 进程内世界
#[derive(Debug, Clone)]
pub struct SimWorld {
    bodies: Vec<Body>,
    connected: bool,
    time_step: f64,
    ticks: u64,
    ik: LinearizedIk,
}

impl SimWorld {
    pub fn new(time_step: f64) -> Self {
        Self {
            bodies: Vec::new(),
            connected: true,
            time_step,
            ticks: 0,
            ik: LinearizedIk::default(),
        }
    }

    /// 添加无关节刚体
    pub fn add_body(&mut self, name: impl Into<String>, pose: Pose) -> BodyId {
        self.push_body(name.into(), pose, Vec::new())
    }

    /// 添加多关节刚体；speed_of(joint) 给出每个关节的最大电机速度
    pub fn add_articulated_body(
        &mut self,
        name: impl Into<String>,
        pose: Pose,
        joint_count: usize,
        speed_of: impl Fn(usize) -> f64,
    ) -> BodyId {
        let joints = (0..joint_count)
            .map(|j| JointSlot {
                angle: 0.0,
                motor: None,
                max_speed: speed_of(j),
            })
            .collect();
        self.push_body(name.into(), pose, joints)
    }

    fn push_body(&mut self, name: String, pose: Pose, joints: Vec<JointSlot>) -> BodyId {
        let id = BodyId(self.bodies.len() as u32);
        tracing::debug!(body = %id, name = %name, "body created");
        self.bodies.push(Body { name, pose, joints });
        id
    }

    pub fn body_name(&self, body: BodyId) -> Option<&str> {
        self.bodies.get(body.0 as usize).map(|b| b.name.as_str())
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// 已推进的 tick 数
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// 所有电机是否都已到达设定点
    pub fn is_settled(&self) -> bool {
        self.bodies.iter().flat_map(|b| b.joints.iter()).all(|j| match j.motor {
            Some(m) if m.force > 0.0 => (m.target - j.angle).abs() == 0.0,
            _ => true,
        })
    }

    /// 连续步进直到所有电机到位或达到上限，返回实际步数
    pub fn settle(&mut self, max_ticks: u64) -> u64 {
        let mut n = 0;
        while n < max_ticks && !self.is_settled() {
            self.step_simulation();
            n += 1;
        }
        n
    }

    fn body(&self, body: BodyId) -> Result<&Body, EngineError> {
        if !self.connected {
            return Err(EngineError::NotConnected);
        }
        self.bodies
            .get(body.0 as usize)
            .ok_or(EngineError::UnknownBody(body))
    }

    fn body_mut(&mut self, body: BodyId) -> Result<&mut Body, EngineError> {
        if !self.connected {
            return Err(EngineError::NotConnected);
        }
        self.bodies
            .get_mut(body.0 as usize)
            .ok_or(EngineError::UnknownBody(body))
    }

    fn joint(&self, body: BodyId, joint: usize) -> Result<&JointSlot, EngineError> {
        self.body(body)?
            .joints
            .get(joint)
            .ok_or(EngineError::UnknownJoint { body, joint })
    }

    fn joint_mut(&mut self, body: BodyId, joint: usize) -> Result<&mut JointSlot, EngineError> {
        self.body_mut(body)?
            .joints
            .get_mut(joint)
            .ok_or(EngineError::UnknownJoint { body, joint })
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_STEP)
    }
}

impl SimulationEngine for SimWorld {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn disconnect(&mut self) {
        if self.connected {
            tracing::info!(ticks = self.ticks, "simulation disconnected");
        }
        self.connected = false;
    }

    fn contains_body(&self, body: BodyId) -> bool {
        self.connected && (body.0 as usize) < self.bodies.len()
    }

    fn joint_angle(&self, body: BodyId, joint: usize) -> Result<f64, EngineError> {
        Ok(self.joint(body, joint)?.angle)
    }

    fn reset_joint_angle(
        &mut self,
        body: BodyId,
        joint: usize,
        angle: f64,
    ) -> Result<(), EngineError> {
        self.joint_mut(body, joint)?.angle = angle;
        Ok(())
    }

    fn set_joint_motor(
        &mut self,
        body: BodyId,
        joint: usize,
        command: MotorCommand,
    ) -> Result<(), EngineError> {
        self.joint_mut(body, joint)?.motor = Some(command);
        Ok(())
    }

    fn joint_motor(&self, body: BodyId, joint: usize) -> Result<Option<MotorCommand>, EngineError> {
        Ok(self.joint(body, joint)?.motor)
    }

    fn inverse_kinematics(
        &mut self,
        body: BodyId,
        request: &IkRequest<'_>,
    ) -> Result<JointConfiguration, EngineError> {
        let b = self.body(body)?;
        if b.joints.len() <= request.end_effector_link {
            return Err(EngineError::IkFailed {
                body,
                reason: format!(
                    "end effector link {} out of {} joints",
                    request.end_effector_link,
                    b.joints.len()
                ),
            });
        }
        if !request.target.position.iter().all(|v| v.is_finite()) {
            return Err(EngineError::IkFailed {
                body,
                reason: "non-finite target position".to_string(),
            });
        }
        Ok(self.ik.solve(request))
    }

    fn base_pose(&self, body: BodyId) -> Result<Pose, EngineError> {
        Ok(self.body(body)?.pose)
    }

    fn reset_base_pose(&mut self, body: BodyId, pose: &Pose) -> Result<(), EngineError> {
        self.body_mut(body)?.pose = *pose;
        Ok(())
    }

    fn step_simulation(&mut self) {
        if !self.connected {
            return;
        }
        let dt = self.time_step;
        for joint in self.bodies.iter_mut().flat_map(|b| b.joints.iter_mut()) {
            let Some(motor) = joint.motor else { continue };
            if motor.force <= 0.0 {
                continue;
            }
            let delta = motor.target - joint.angle;
            let reach = joint.max_speed * dt;
            if delta.abs() <= reach {
                joint.angle = motor.target;
            } else {
                joint.angle += reach * delta.signum();
            }
        }
        self.ticks += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn test_motor_drives_joint_to_setpoint() {
        let mut world = SimWorld::default();
        let arm = world.add_articulated_body("arm", Pose::from_position(Vector3::zeros()), 2, |_| 2.4);
        world.set_joint_motor(arm, 0, MotorCommand::new(0.1, 200.0)).unwrap();
        world.step_simulation();
        assert!((world.joint_angle(arm, 0).unwrap() - 0.01).abs() < 1e-12);
        let n = world.settle(1000);
        assert!(n > 0);
        assert_eq!(world.joint_angle(arm, 0).unwrap(), 0.1);
    }

    #[test]
    fn test_teleported_joint_is_pulled_back_by_stale_setpoint() {
        let mut world = SimWorld::default();
        let arm = world.add_articulated_body("arm", Pose::from_position(Vector3::zeros()), 1, |_| 2.4);
        world.set_joint_motor(arm, 0, MotorCommand::new(0.5, 200.0)).unwrap();
        world.settle(10_000);
        world.reset_joint_angle(arm, 0, 0.0).unwrap();
        world.step_simulation();
        assert!(world.joint_angle(arm, 0).unwrap() > 0.0);
    }

    #[test]
    fn test_unknown_body_and_disconnect() {
        let mut world = SimWorld::default();
        assert_eq!(
            world.base_pose(BodyId(3)),
            Err(EngineError::UnknownBody(BodyId(3)))
        );
        let b = world.add_body("cup", Pose::from_position(Vector3::new(1.0, 0.0, 0.0)));
        assert!(world.contains_body(b));
        world.disconnect();
        assert!(!world.contains_body(b));
        assert_eq!(world.base_pose(b), Err(EngineError::NotConnected));
    }
}

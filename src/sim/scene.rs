//! 咖啡吧场景搭建
//!
//! 吧台、3x3 原料货架、咖啡杯与 Panda 机械臂。搭建函数直接返回各物体的 BodyId，
//! 调用方不再按名称扫描世界。

use nalgebra::{UnitQuaternion, Vector3};

use crate::motion::{ArmProfile, Pose};
use crate::scene::{BottleRecord, GridCell, BOTTLE_COUNT, INGREDIENTS, TABLE_HEIGHT};
use crate::sim::{BodyId, MotorCommand, SimWorld, SimulationEngine};

/// 机械臂基座位置
pub const ROBOT_BASE: [f64; 3] = [-0.3, -0.65, TABLE_HEIGHT];
/// 咖啡杯位置
pub const CUP_POSITION: [f64; 3] = [-0.4, -0.2, TABLE_HEIGHT + 0.08];
/// Panda URDF 中的关节总数（含固定关节）
pub const PANDA_JOINT_COUNT: usize = 12;

/// 场景中各物体的身份
#[derive(Debug, Clone)]
pub struct CafeScene {
    pub arm: BodyId,
    pub cup: BodyId,
    pub bottles: Vec<BottleRecord>,
}

/// 关节电机速度：手臂关节 rad/s，手指 m/s
#[derive(Debug, Clone, Copy)]
pub struct JointSpeeds {
    pub arm: f64,
    pub finger: f64,
}

impl Default for JointSpeeds {
    fn default() -> Self {
        Self {
            arm: 3.0,
            finger: 0.2,
        }
    }
}

/// 在世界中搭建咖啡吧并把机械臂放到 home 构型（夹爪张开）
pub fn build_cafe_scene(world: &mut SimWorld, profile: &ArmProfile, speeds: JointSpeeds) -> CafeScene {
    world.add_body(
        "bar_counter",
        Pose::from_position(Vector3::new(0.0, 0.0, TABLE_HEIGHT)),
    );

    let mut bottles = Vec::with_capacity(BOTTLE_COUNT);
    for (index, name) in INGREDIENTS.iter().enumerate() {
        let cell = GridCell(index / 3, index % 3);
        let pose = Pose::new(cell.shelf_position(), UnitQuaternion::identity());
        let body = world.add_body(*name, pose);
        bottles.push(BottleRecord::new(body, pose, *name));
    }

    let cup = world.add_body("cup", Pose::from_position(Vector3::from(CUP_POSITION)));

    let fingers = profile.finger_joints;
    let arm = world.add_articulated_body(
        "panda",
        Pose::from_position(Vector3::from(ROBOT_BASE)),
        PANDA_JOINT_COUNT,
        |joint| {
            if fingers.contains(&joint) {
                speeds.finger
            } else {
                speeds.arm
            }
        },
    );

    // 初始构型只瞬移关节，不设电机；第一条运动指令才开始位置控制
    for (joint, angle) in profile.home.angles().iter().enumerate() {
        let _ = world.reset_joint_angle(arm, joint, *angle);
    }
    for joint in fingers {
        let _ = world.reset_joint_angle(arm, joint, profile.max_aperture);
        let _ = world.set_joint_motor(
            arm,
            joint,
            MotorCommand::new(profile.max_aperture, profile.grip_travel_force),
        );
    }

    tracing::info!(
        arm = %arm,
        bottles = bottles.len(),
        "cafe scene built"
    );

    CafeScene { arm, cup, bottles }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_layout() {
        let mut world = SimWorld::default();
        let profile = ArmProfile::panda();
        let scene = build_cafe_scene(&mut world, &profile, JointSpeeds::default());
        assert_eq!(scene.bottles.len(), BOTTLE_COUNT);
        assert_eq!(scene.bottles[0].name, "ESPRESSO");
        assert_eq!(scene.bottles[8].name, "ICE");
        assert!(world.contains_body(scene.arm));
        assert!(world.contains_body(scene.cup));
        assert_eq!(world.body_name(scene.arm), Some("panda"));

        let milk = world.base_pose(scene.bottles[2].body).unwrap();
        assert!((milk.position.x - 0.2).abs() < 1e-12);
        assert!((milk.position.z - 0.84).abs() < 1e-9);

        let wrist = world.joint_angle(scene.arm, 6).unwrap();
        assert_eq!(wrist, 0.8);
        assert_eq!(world.joint_angle(scene.arm, 9).unwrap(), 0.04);
    }
}

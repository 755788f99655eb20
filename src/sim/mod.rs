//! 仿真层：引擎接口、进程内世界与咖啡吧场景

mod engine;
mod ik;
mod scene;
mod world;

pub use engine::{share, BodyId, IkRequest, MotorCommand, SharedEngine, SimulationEngine};
pub use ik::{IkGain, LinearizedIk};
pub use scene::{build_cafe_scene, CafeScene, JointSpeeds, CUP_POSITION, PANDA_JOINT_COUNT, ROBOT_BASE};
pub use world::{SimWorld, DEFAULT_TIME_STEP};

//! 场景状态管理：reset 与 swap
//!
//! SceneState 持有机械臂句柄与 9 个瓶子的登记表（构造后不再改变）；apply_* 在调用方已持有的
//! 引擎引用上完成整批写入。SceneManager 把每次操作包在一次加锁之内，对 tick 调度器而言是原子的。

use std::sync::Arc;

use nalgebra::Vector3;

use crate::core::SceneError;
use crate::motion::ArmHandle;
use crate::scene::{BottleRecord, BOTTLE_COUNT};
use crate::sim::{SharedEngine, SimulationEngine};

/// 场景登记表
#[derive(Debug, Clone)]
pub struct SceneState {
    arm: ArmHandle,
    bottles: Vec<BottleRecord>,
}

impl SceneState {
    pub fn new(arm: ArmHandle, bottles: Vec<BottleRecord>) -> Result<Self, SceneError> {
        if bottles.len() != BOTTLE_COUNT {
            return Err(SceneError::RegistrySize {
                expected: BOTTLE_COUNT,
                actual: bottles.len(),
            });
        }
        Ok(Self { arm, bottles })
    }

    pub fn arm(&self) -> &ArmHandle {
        &self.arm
    }

    pub fn bottles(&self) -> &[BottleRecord] {
        &self.bottles
    }

    /// 所有瓶子回到初始位姿，机械臂回到 home（关节值与电机设定点一起重写）
    pub fn apply_reset(&self, engine: &mut dyn SimulationEngine) -> Result<(), SceneError> {
        for bottle in &self.bottles {
            engine.reset_base_pose(bottle.body, &bottle.initial_pose)?;
        }
        self.arm.teleport_home(engine)?;
        Ok(())
    }

    /// 交换两个瓶子的当前位置；各自保留自己的姿态
    pub fn apply_swap(
        &self,
        engine: &mut dyn SimulationEngine,
        first: usize,
        second: usize,
    ) -> Result<(), SceneError> {
        let len = self.bottles.len();
        if first >= len || second >= len {
            return Err(SceneError::InvalidIndex { first, second, len });
        }
        if first == second {
            return Err(SceneError::SameIndex(first));
        }

        let a = &self.bottles[first];
        let b = &self.bottles[second];
        let pose_a = engine.base_pose(a.body)?;
        let pose_b = engine.base_pose(b.body)?;

        engine.reset_base_pose(a.body, &pose_a.with_position(pose_b.position))?;
        engine.reset_base_pose(b.body, &pose_b.with_position(pose_a.position))?;
        Ok(())
    }

    /// 按登记顺序读取每个瓶子的当前位置
    pub fn read_positions(
        &self,
        engine: &dyn SimulationEngine,
    ) -> Result<Vec<Vector3<f64>>, SceneError> {
        self.bottles
            .iter()
            .map(|b| Ok(engine.base_pose(b.body)?.position))
            .collect()
    }
}

/// 共享场景管理器（监听任务、定位器与测试共用）
#[derive(Clone)]
pub struct SceneManager {
    engine: SharedEngine,
    state: Arc<SceneState>,
}

impl SceneManager {
    pub fn new(engine: SharedEngine, state: SceneState) -> Self {
        Self {
            engine,
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> &SceneState {
        &self.state
    }

    pub async fn reset(&self) -> Result<(), SceneError> {
        let mut engine = self.engine.lock().await;
        self.state.apply_reset(&mut *engine)?;
        tracing::info!("scene reset");
        Ok(())
    }

    pub async fn swap(&self, first: usize, second: usize) -> Result<(), SceneError> {
        let mut engine = self.engine.lock().await;
        self.state.apply_swap(&mut *engine, first, second)?;
        tracing::info!(
            first = %self.state.bottles[first].name,
            second = %self.state.bottles[second].name,
            "bottles swapped"
        );
        Ok(())
    }

    pub async fn live_positions(&self) -> Result<Vec<Vector3<f64>>, SceneError> {
        let engine = self.engine.lock().await;
        self.state.read_positions(&*engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::ArmProfile;
    use crate::sim::{build_cafe_scene, share, JointSpeeds, SimWorld};

    fn manager() -> SceneManager {
        let mut world = SimWorld::default();
        let scene = build_cafe_scene(&mut world, &ArmProfile::panda(), JointSpeeds::default());
        let arm = ArmHandle::resolve(&world, scene.arm, ArmProfile::panda()).unwrap();
        let state = SceneState::new(arm, scene.bottles).unwrap();
        let (_, shared) = share(world);
        SceneManager::new(shared, state)
    }

    #[tokio::test]
    async fn test_swap_twice_restores_positions() {
        let scene = manager();
        let before = scene.live_positions().await.unwrap();

        scene.swap(0, 8).await.unwrap();
        let swapped = scene.live_positions().await.unwrap();
        assert_eq!(swapped[0], before[8]);
        assert_eq!(swapped[8], before[0]);
        assert_eq!(swapped[4], before[4]);

        scene.swap(8, 0).await.unwrap();
        assert_eq!(scene.live_positions().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_invalid_swaps_leave_state_unchanged() {
        let scene = manager();
        let before = scene.live_positions().await.unwrap();

        assert_eq!(scene.swap(3, 3).await, Err(SceneError::SameIndex(3)));
        assert!(matches!(
            scene.swap(2, 9).await,
            Err(SceneError::InvalidIndex { first: 2, second: 9, len: 9 })
        ));
        assert_eq!(scene.live_positions().await.unwrap(), before);
    }

    #[test]
    fn test_registry_must_hold_nine_bottles() {
        let mut world = SimWorld::default();
        let mut scene = build_cafe_scene(&mut world, &ArmProfile::panda(), JointSpeeds::default());
        let arm = ArmHandle::resolve(&world, scene.arm, ArmProfile::panda()).unwrap();
        scene.bottles.pop();
        assert!(matches!(
            SceneState::new(arm, scene.bottles),
            Err(SceneError::RegistrySize { expected: 9, actual: 8 })
        ));
    }
}

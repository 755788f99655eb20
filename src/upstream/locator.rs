//! 原料定位
//!
//! SceneLocator 读取瓶子的实时位置并反推货架格子，因此 swap 之后的位置变化会被反映出来；
//! 偏离格点的瓶子不出现在结果中。FixedLocator 直接返回给定映射。

use async_trait::async_trait;

use crate::core::UpstreamError;
use crate::scene::{GridCell, SceneManager, INGREDIENTS};
use crate::upstream::{IngredientLocator, LocationMap};

/// 与格点的最大允许偏差（米）
const GRID_TOLERANCE: f64 = 0.05;

pub struct SceneLocator {
    scene: SceneManager,
}

impl SceneLocator {
    pub fn new(scene: SceneManager) -> Self {
        Self { scene }
    }
}

#[async_trait]
impl IngredientLocator for SceneLocator {
    async fn locate(&self) -> Result<LocationMap, UpstreamError> {
        let positions = self
            .scene
            .live_positions()
            .await
            .map_err(|e| UpstreamError::Localization(e.to_string()))?;

        let mut map = LocationMap::new();
        for (bottle, position) in self.scene.state().bottles().iter().zip(positions) {
            match GridCell::from_position(&position, GRID_TOLERANCE) {
                Some(cell) => {
                    map.insert(bottle.name.clone(), cell);
                }
                None => tracing::debug!(bottle = %bottle.name, "bottle is off the shelf grid"),
            }
        }
        if map.is_empty() {
            return Err(UpstreamError::Localization(
                "no bottle found on the shelf".to_string(),
            ));
        }
        Ok(map)
    }
}

#[derive(Debug, Clone)]
pub struct FixedLocator {
    map: LocationMap,
}

impl FixedLocator {
    pub fn new(map: LocationMap) -> Self {
        Self { map }
    }

    /// 初始货架布局
    pub fn shelf_default() -> Self {
        let map = INGREDIENTS
            .iter()
            .enumerate()
            .filter_map(|(i, name)| GridCell::from_index(i).map(|cell| (name.to_string(), cell)))
            .collect();
        Self { map }
    }
}

#[async_trait]
impl IngredientLocator for FixedLocator {
    async fn locate(&self) -> Result<LocationMap, UpstreamError> {
        Ok(self.map.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::{ArmHandle, ArmProfile};
    use crate::scene::SceneState;
    use crate::sim::{build_cafe_scene, share, JointSpeeds, SimWorld};

    #[tokio::test]
    async fn test_scene_locator_follows_swaps() {
        let mut world = SimWorld::default();
        let scene = build_cafe_scene(&mut world, &ArmProfile::panda(), JointSpeeds::default());
        let arm = ArmHandle::resolve(&world, scene.arm, ArmProfile::panda()).unwrap();
        let state = SceneState::new(arm, scene.bottles).unwrap();
        let (_, shared) = share(world);
        let manager = SceneManager::new(shared, state);
        let locator = SceneLocator::new(manager.clone());

        let before = locator.locate().await.unwrap();
        assert_eq!(before, FixedLocator::shelf_default().locate().await.unwrap());

        manager.swap(0, 2).await.unwrap();
        let after = locator.locate().await.unwrap();
        assert_eq!(after["ESPRESSO"], GridCell(0, 2));
        assert_eq!(after["MILK"], GridCell(0, 0));
        assert_eq!(after["ICE"], GridCell(2, 2));
    }
}

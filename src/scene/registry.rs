//! 瓶子登记表：身份、初始位姿、名称与货架网格
//!
//! 3x3 阶梯货架，index = row * 3 + col；索引与身份的对应在场景构造时确定，进程内不再改变。

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::motion::Pose;
use crate::sim::BodyId;

/// 货架行列数
pub const GRID_ROWS: usize = 3;
pub const GRID_COLS: usize = 3;
/// 登记表大小（固定 9 个瓶子）
pub const BOTTLE_COUNT: usize = GRID_ROWS * GRID_COLS;

/// 吧台高度
pub const TABLE_HEIGHT: f64 = 0.7;
/// 货架所在 y
pub const SHELF_Y: f64 = 0.1;
/// 每层台阶高度
pub const SHELF_STEP_HEIGHT: f64 = 0.15;
/// 列间距
pub const COLUMN_SPACING: f64 = 0.2;
/// 瓶身半高
pub const BOTTLE_HALF_HEIGHT: f64 = 0.05;

/// 按 index 顺序排列的原料名
pub const INGREDIENTS: [&str; BOTTLE_COUNT] = [
    "ESPRESSO", "WATER", "MILK", "VANILLA", "CARAMEL", "CHOCO", "OAT", "SUGAR", "ICE",
];

/// 货架坐标 [row, col]，序列化为两元素数组
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell(pub usize, pub usize);

impl GridCell {
    pub fn row(&self) -> usize {
        self.0
    }

    pub fn col(&self) -> usize {
        self.1
    }

    pub fn from_index(index: usize) -> Option<Self> {
        (index < BOTTLE_COUNT).then(|| GridCell(index / GRID_COLS, index % GRID_COLS))
    }

    pub fn index(&self) -> usize {
        self.0 * GRID_COLS + self.1
    }

    /// 该格子上瓶子中心的世界坐标
    pub fn shelf_position(&self) -> Vector3<f64> {
        Vector3::new(
            (self.1 as f64 - 1.0) * COLUMN_SPACING,
            SHELF_Y,
            TABLE_HEIGHT + 0.09 + self.0 as f64 * SHELF_STEP_HEIGHT + BOTTLE_HALF_HEIGHT,
        )
    }

    /// 由瓶子位置反推格子；偏离格点超过 tolerance 时返回 None
    pub fn from_position(position: &Vector3<f64>, tolerance: f64) -> Option<Self> {
        let col = (position.x / COLUMN_SPACING + 1.0).round();
        let row = ((position.z - TABLE_HEIGHT - 0.09 - BOTTLE_HALF_HEIGHT) / SHELF_STEP_HEIGHT).round();
        if col < 0.0 || row < 0.0 || col >= GRID_COLS as f64 || row >= GRID_ROWS as f64 {
            return None;
        }
        let cell = GridCell(row as usize, col as usize);
        let expected = cell.shelf_position();
        ((expected - position).norm() <= tolerance).then_some(cell)
    }
}

/// 单个瓶子的登记项
#[derive(Debug, Clone, PartialEq)]
pub struct BottleRecord {
    pub body: BodyId,
    pub initial_pose: Pose,
    pub name: String,
}

impl BottleRecord {
    pub fn new(body: BodyId, initial_pose: Pose, name: impl Into<String>) -> Self {
        Self {
            body,
            initial_pose,
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_index_mapping() {
        for i in 0..BOTTLE_COUNT {
            assert_eq!(GridCell::from_index(i).unwrap().index(), i);
        }
        assert!(GridCell::from_index(BOTTLE_COUNT).is_none());
        assert_eq!(GridCell::from_index(5), Some(GridCell(1, 2)));
    }

    #[test]
    fn test_shelf_position_round_trips() {
        let cell = GridCell(2, 0);
        let p = cell.shelf_position();
        assert!((p.x + 0.2).abs() < 1e-12);
        assert!((p.z - 1.14).abs() < 1e-9);
        assert_eq!(GridCell::from_position(&p, 0.01), Some(cell));
    }

    #[test]
    fn test_off_shelf_position_has_no_cell() {
        assert_eq!(GridCell::from_position(&Vector3::new(-0.3, -0.2, 1.0), 0.05), None);
    }

    #[test]
    fn test_grid_cell_serializes_as_pair() {
        let json = serde_json::to_string(&GridCell(1, 2)).unwrap();
        assert_eq!(json, "[1,2]");
    }
}

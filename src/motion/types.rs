//! 运动学基础类型：关节构型、关节限位、末端位姿
//!
//! JointConfiguration 是固定长度（7）的关节角向量；真值保存在仿真引擎中，
//! 本层只在一次插值过程内持有副本。

use std::f64::consts::{FRAC_PI_2, PI};
use std::ops::Index;

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// 机械臂自由度（不含两根手指）
pub const ARM_DOF: usize = 7;

/// 7 关节的关节角（弧度）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointConfiguration(pub [f64; ARM_DOF]);

impl JointConfiguration {
    pub const fn new(angles: [f64; ARM_DOF]) -> Self {
        Self(angles)
    }

    pub fn angles(&self) -> &[f64; ARM_DOF] {
        &self.0
    }

    /// 逐关节线性插值：t=0 得到 self，t=1 得到 goal
    pub fn lerp(&self, goal: &JointConfiguration, t: f64) -> JointConfiguration {
        let mut out = [0.0; ARM_DOF];
        for (i, angle) in out.iter_mut().enumerate() {
            *angle = self.0[i] + (goal.0[i] - self.0[i]) * t;
        }
        JointConfiguration(out)
    }

    /// 将每个分量夹到限位内
    pub fn clamped(&self, limits: &JointLimits) -> JointConfiguration {
        let mut out = self.0;
        for (i, angle) in out.iter_mut().enumerate() {
            *angle = angle.clamp(limits.lower[i], limits.upper[i]);
        }
        JointConfiguration(out)
    }

    /// 与另一构型逐分量的最大差值
    pub fn max_abs_diff(&self, other: &JointConfiguration) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

impl Index<usize> for JointConfiguration {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

/// 静态关节限位与关节活动范围（IK 零空间求解需要）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointLimits {
    pub lower: [f64; ARM_DOF],
    pub upper: [f64; ARM_DOF],
    pub ranges: [f64; ARM_DOF],
}

impl JointLimits {
    pub fn contains(&self, config: &JointConfiguration) -> bool {
        config
            .0
            .iter()
            .enumerate()
            .all(|(i, a)| *a >= self.lower[i] && *a <= self.upper[i])
    }
}

/// 刚体位姿：位置 + 姿态四元数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl Pose {
    pub fn new(position: Vector3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// 无旋转的位姿
    pub fn from_position(position: Vector3<f64>) -> Self {
        Self::new(position, UnitQuaternion::identity())
    }

    /// 末端执行器目标位姿：位置任意，姿态恒为抓手垂直向下
    pub fn tool_down(position: Vector3<f64>) -> Self {
        Self::new(position, tool_down_orientation())
    }

    /// 保留自身姿态，仅替换位置（swap 使用）
    pub fn with_position(&self, position: Vector3<f64>) -> Self {
        Self::new(position, self.orientation)
    }
}

/// 抓手垂直向下的固定姿态（欧拉角 [π, π/2, −π/2]）；整个方案中工具姿态从不改变
pub fn tool_down_orientation() -> UnitQuaternion<f64> {
    UnitQuaternion::from_euler_angles(PI, FRAC_PI_2, -FRAC_PI_2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_endpoints() {
        let a = JointConfiguration::new([0.0; ARM_DOF]);
        let b = JointConfiguration::new([1.0, -1.0, 0.5, 0.0, 2.0, 0.0, -0.5]);
        assert_eq!(a.lerp(&b, 0.0), a);
        assert_eq!(a.lerp(&b, 1.0), b);
        assert!((a.lerp(&b, 0.5)[4] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_clamped_respects_limits() {
        let limits = JointLimits {
            lower: [-1.0; ARM_DOF],
            upper: [1.0; ARM_DOF],
            ranges: [2.0; ARM_DOF],
        };
        let c = JointConfiguration::new([5.0, -5.0, 0.3, 1.0, -1.0, 0.0, 2.0]).clamped(&limits);
        assert!(limits.contains(&c));
        assert_eq!(c[0], 1.0);
        assert_eq!(c[1], -1.0);
        assert_eq!(c[2], 0.3);
    }

    #[test]
    fn test_swap_position_keeps_orientation() {
        let p = Pose::tool_down(Vector3::new(0.1, 0.2, 0.3));
        let q = p.with_position(Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(q.orientation, p.orientation);
        assert_eq!(q.position, Vector3::new(1.0, 1.0, 1.0));
    }
}

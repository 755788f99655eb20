//! 离线世界使用的替身 IK：在休息位附近线性化
//!
//! q = rest + G · (target - anchor)，再夹到限位内。真实引擎的迭代求解器不在本 crate 范围内；
//! 这里只需要确定性、带零空间偏置（rest）且遵守限位的解，姿态分量被忽略。

use nalgebra::{SMatrix, Vector3};

use crate::motion::{JointConfiguration, ARM_DOF};
use crate::sim::IkRequest;

/// 7x3 增益矩阵：每行是一个关节对末端位移 (dx, dy, dz) 的灵敏度
pub type IkGain = SMatrix<f64, ARM_DOF, 3>;

#[derive(Debug, Clone)]
pub struct LinearizedIk {
    /// 休息位下末端执行器所在位置
    anchor: Vector3<f64>,
    gain: IkGain,
}

impl LinearizedIk {
    pub fn new(anchor: Vector3<f64>, gain: IkGain) -> Self {
        Self { anchor, gain }
    }

    pub fn solve(&self, request: &IkRequest<'_>) -> JointConfiguration {
        let delta = request.target.position - self.anchor;
        let offset = self.gain * delta;
        let mut angles = *request.rest_pose.angles();
        for (i, angle) in angles.iter_mut().enumerate() {
            *angle += offset[i];
        }
        JointConfiguration::new(angles).clamped(request.limits)
    }
}

impl Default for LinearizedIk {
    /// 以工作点 [0, -0.2, 1.0] 为锚点的 Panda 近似
    fn default() -> Self {
        #[rustfmt::skip]
        let gain = IkGain::from_row_slice(&[
            // dx     dy     dz
            -1.6,   0.0,   0.0,
             0.0,   1.8,  -0.9,
             0.4,   0.0,   0.0,
             0.0,   1.4,   1.2,
             0.0,   0.0,   0.0,
             0.0,  -0.5,   1.6,
            -1.6,   0.0,   0.0,
        ]);
        Self::new(Vector3::new(0.0, -0.2, 1.0), gain)
    }
}

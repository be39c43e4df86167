//! 坐标变换投影
//!
//! 将 16 元素列主序 4×4 齐次矩阵拆分为旋转（3×3）与平移（3）。
//!
//! # 索引映射
//!
//! ```text
//! | m[0]  m[4]  m[8]   m[12] |     | R00 R01 R02 tx |
//! | m[1]  m[5]  m[9]   m[13] |  =  | R10 R11 R12 ty |
//! | m[2]  m[6]  m[10]  m[14] |     | R20 R21 R22 tz |
//! | m[3]  m[7]  m[11]  m[15] |     |  0   0   0   1 |
//! ```
//!
//! 即旋转第 r 行第 c 列取自 `m[4 * c + r]`，平移取自 `m[12..15]`。
//! 最后一行不参与投影。

use crate::messages::{QuaternionMsg, TransformMsg, Vector3Msg};
use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};

/// 刚体位姿（旋转 + 平移）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

/// 将列主序齐次矩阵投影为位姿
///
/// 纯函数，无失败路径。
pub fn to_pose(m: &[f64; 16]) -> Pose {
    // Matrix3::new 按行给出参数
    let rotation = Matrix3::new(
        m[0], m[4], m[8], //
        m[1], m[5], m[9], //
        m[2], m[6], m[10],
    );
    let translation = Vector3::new(m[12], m[13], m[14]);
    Pose {
        rotation,
        translation,
    }
}

impl Pose {
    /// 旋转部分对应的单位四元数
    ///
    /// 旋转块不做正交化；输入应来自控制器的刚体变换。
    pub fn quaternion(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(self.rotation))
    }

    /// 转换为变换消息（平移 + 四元数）
    pub fn to_transform_msg(&self) -> TransformMsg {
        let q = self.quaternion().into_inner().coords;
        TransformMsg {
            translation: Vector3Msg {
                x: self.translation.x,
                y: self.translation.y,
                z: self.translation.z,
            },
            rotation: QuaternionMsg {
                x: q.x,
                y: q.y,
                z: q.z,
                w: q.w,
            },
        }
    }
}

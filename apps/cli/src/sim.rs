//! 模拟机械臂
//!
//! 每个控制周期生成一份状态：关节做正弦运动，末端位姿绕 z 轴缓慢旋转，
//! 外部力旋量带一个低频扰动。可选周期性注入碰撞反射故障。

use arm_state_protocol::{ErrorKind, IDENTITY_TRANSFORM, JOINT_COUNT, RobotErrors, RobotState};
use std::f64::consts::PI;
use std::time::Duration;

/// 关节零位（ready 姿态）
const READY_POSE: [f64; JOINT_COUNT] = [0.0, -PI / 4.0, 0.0, -3.0 * PI / 4.0, 0.0, PI / 2.0, PI / 4.0];

/// 法兰到末端执行器的 z 偏移（米）
const FLANGE_TO_EE_Z: f64 = 0.1034;

pub struct SimulatedArm {
    time: Duration,
    fault_interval: Option<Duration>,
}

impl SimulatedArm {
    pub fn new(fault_interval: Option<Duration>) -> Self {
        Self {
            time: Duration::ZERO,
            fault_interval,
        }
    }

    /// 前进 `dt` 并返回新状态
    pub fn step(&mut self, dt: Duration) -> RobotState {
        self.time += dt;
        let t = self.time.as_secs_f64();

        let mut s = RobotState::default();
        for i in 0..JOINT_COUNT {
            let w = 0.5 + 0.1 * i as f64;
            let amp = 0.2;
            s.q[i] = READY_POSE[i] + amp * (w * t).sin();
            s.dq[i] = amp * w * (w * t).cos();
            s.q_d[i] = s.q[i];
            s.tau_j[i] = 2.0 * (w * t).sin();
            s.dtau_j[i] = 2.0 * w * (w * t).cos();
            s.tau_ext_hat_filtered[i] = 0.1 * (0.3 * t).sin();
        }

        // 末端位姿：绕 z 轴旋转 θ，平移 (0.3, 0, 0.5)
        let theta = 0.2 * t;
        let (sin, cos) = theta.sin_cos();
        s.o_t_ee = IDENTITY_TRANSFORM;
        s.o_t_ee[0] = cos;
        s.o_t_ee[1] = sin;
        s.o_t_ee[4] = -sin;
        s.o_t_ee[5] = cos;
        s.o_t_ee[12] = 0.3;
        s.o_t_ee[14] = 0.5;
        s.o_t_ee_d = s.o_t_ee;

        s.f_t_ee[14] = FLANGE_TO_EE_Z;

        let push = 3.0 * (0.5 * t).sin();
        s.k_f_ext_hat_k = [push, 0.0, -push, 0.0, 0.1 * push, 0.0];
        s.o_f_ext_hat_k = s.k_f_ext_hat_k;

        s.elbow = [s.q[2], -1.0];
        s.elbow_d = s.elbow;
        s.time = self.time;

        if self.fault_active() {
            s.current_errors = RobotErrors::empty().with(ErrorKind::JointReflex);
            s.last_motion_errors = s.current_errors;
            s.joint_collision[3] = 1.0;
            s.joint_contact[3] = 1.0;
        }
        s
    }

    /// 每个故障间隔的前 100 ms 内处于故障状态
    fn fault_active(&self) -> bool {
        let Some(interval) = self.fault_interval else {
            return false;
        };
        if interval.is_zero() {
            return false;
        }
        let phase = self.time.as_nanos() % interval.as_nanos();
        phase < Duration::from_millis(100).as_nanos()
    }
}

//! 初始化与传输层测试
//!
//! - 配置文件 → 校验 → 硬件句柄 → 控制器
//! - 初始化失败时返回具体错误，不产生部分构造的控制器
//! - SinkWorker 端到端排空四个通道

use arm_state_controller::{
    ChannelSink, HandleError, HandleRegistry, InitError, LatestState, SinkWorker, StateController,
    StateControllerConfig, StateInterface, StateSource,
};
use arm_state_protocol::{
    FrankaStateMsg, JointStateMsg, RobotState, TfMsg, Timestamp, WrenchStampedMsg,
};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

/// 所有句柄均不可用的硬件层
struct OfflineInterface;

impl StateInterface for OfflineInterface {
    fn handle(&self, name: &str) -> Result<Arc<dyn StateSource>, HandleError> {
        Err(HandleError::Unavailable {
            name: name.to_string(),
            reason: "robot not connected".to_string(),
        })
    }
}

#[test]
fn test_init_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("franka_state_controller.toml");
    std::fs::write(
        &path,
        r#"
arm_id = "fr3"
publish_rate = 50.0
joint_names = [
    "fr3_joint1", "fr3_joint2", "fr3_joint3", "fr3_joint4",
    "fr3_joint5", "fr3_joint6", "fr3_joint7",
]
"#,
    )
    .unwrap();

    let mut registry = HandleRegistry::new();
    registry.register("fr3_robot", Arc::new(LatestState::new()));

    let config = StateControllerConfig::load_from_file(&path).unwrap();
    let (mut ctrl, outboxes) = StateController::init(&config, &registry).unwrap();
    assert_eq!(ctrl.config().period, Duration::from_millis(20));

    ctrl.tick(Timestamp::ZERO);
    let joints = outboxes.joint_states.try_recv().unwrap();
    assert_eq!(joints.name[6], "fr3_joint7");
    let tf = outboxes.transforms.try_recv().unwrap();
    assert_eq!(tf.transforms[0].header.frame_id, "fr3_link8");
    assert_eq!(tf.transforms[1].child_frame_id, "fr3_K");
    let wrench = outboxes.external_wrench.try_recv().unwrap();
    assert_eq!(wrench.header.frame_id, "fr3_K");
}

#[test]
fn test_init_reports_unavailable_handle() {
    let config = StateControllerConfig::with_default_joint_names("panda");
    let err = StateController::init(&config, &OfflineInterface).err().unwrap();
    assert!(matches!(
        &err,
        InitError::StateHandle { name, source: HandleError::Unavailable { .. } } if name == "panda_robot"
    ));
    assert!(err.to_string().contains("panda_robot"));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_init_rejects_invalid_config_before_touching_hardware() {
    let mut config = StateControllerConfig::with_default_joint_names("panda");
    config.joint_names.pop();
    let err = StateController::init(&config, &OfflineInterface).err().unwrap();
    assert!(matches!(err, InitError::InvalidJointNames { count: 6 }));

    let config = StateControllerConfig::with_default_joint_names("panda").publish_rate(0.0);
    let err = StateController::init(&config, &OfflineInterface).err().unwrap();
    assert!(matches!(err, InitError::InvalidPublishRate(r) if r == 0.0));
}

#[test]
fn test_builder_with_state_interface() {
    let latest = Arc::new(LatestState::new());
    let mut registry = HandleRegistry::new();
    registry.register("panda_robot", latest.clone());

    let (mut ctrl, outboxes) = StateController::builder()
        .config(StateControllerConfig::with_default_joint_names("panda"))
        .state_interface(Arc::new(registry))
        .build()
        .unwrap();

    let mut state = RobotState::default();
    state.q[3] = -1.5;
    latest.store(state);
    ctrl.tick(Timestamp::from_millis(1));
    assert_eq!(outboxes.franka_states.try_recv().unwrap().q[3], -1.5);
}

#[test]
fn test_sink_workers_drain_all_channels() {
    let latest = Arc::new(LatestState::new());
    let (mut ctrl, outboxes) = StateController::builder()
        .config(StateControllerConfig::with_default_joint_names("panda"))
        .publish_rate(200.0)
        .state_source(latest.clone())
        .build()
        .unwrap();

    let (state_sink, state_rx) = ChannelSink::<FrankaStateMsg>::bounded(1024);
    let (joint_sink, joint_rx) = ChannelSink::<JointStateMsg>::bounded(1024);
    let dropped = state_sink.dropped_counter();

    let workers = (
        SinkWorker::spawn(outboxes.franka_states, state_sink).unwrap(),
        SinkWorker::spawn(outboxes.joint_states, joint_sink).unwrap(),
        SinkWorker::spawn(outboxes.transforms, |_: &str, _: &TfMsg| {}).unwrap(),
        SinkWorker::spawn(outboxes.external_wrench, |_: &str, _: &WrenchStampedMsg| {}).unwrap(),
    );

    // 模拟 1 kHz 控制周期，运行 200 ms
    let start = Instant::now();
    let mut t = 0u64;
    while t < 200 {
        let mut state = RobotState::default();
        state.q[0] = t as f64;
        latest.store(state);
        ctrl.tick(Timestamp::from_millis(t));
        t += 1;
        let target = start + Duration::from_millis(t);
        if let Some(wait) = target.checked_duration_since(Instant::now()) {
            std::thread::sleep(wait);
        }
    }
    drop(workers);

    let states: Vec<FrankaStateMsg> = state_rx.try_iter().collect();
    let joints: Vec<JointStateMsg> = joint_rx.try_iter().collect();
    let metrics = ctrl.metrics().snapshot();

    assert_eq!(metrics.ticks, 200);
    assert_eq!(metrics.publish_ticks, 40);
    assert!(!states.is_empty());
    // 停止时最后一条可能尚未取走
    let delivered = states.len() as u64;
    assert!(delivered <= metrics.franka_state.published && delivered + 1 >= metrics.franka_state.published);
    assert!(joints.len() as u64 <= metrics.joint_state.published);
    assert_eq!(
        metrics.franka_state.published + metrics.franka_state.skipped,
        metrics.publish_ticks
    );
    assert!(states.windows(2).all(|w| w[1].header.seq > w[0].header.seq));
    assert_eq!(dropped.load(Ordering::Relaxed), 0);
}

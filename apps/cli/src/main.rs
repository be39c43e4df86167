//! # Arm State CLI
//!
//! 以模拟机械臂驱动状态控制器，把四个通道的消息以 JSON Lines 打印到 stdout。
//! 日志输出到 stderr。
//!
//! ```bash
//! # 默认：panda，1 kHz 控制周期，30 Hz 发布，运行到 Ctrl-C
//! arm-state-cli
//!
//! # 从配置文件加载，运行 5 秒，每 2 秒注入一次碰撞反射
//! arm-state-cli --config franka_state_controller.toml --duration 5 --fault-every 2
//!
//! # 只看关节状态
//! arm-state-cli --rate 10 | jq -c 'select(.topic == "joint_states")'
//! ```

use anyhow::{Context, Result, bail};
use arm_state_controller::{
    FrameIds, HandleRegistry, LatestState, SinkWorker, StateController, StateControllerConfig,
};
use arm_state_protocol::Timestamp;
use clap::Parser;
use spin_sleep::SpinSleeper;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

mod output;
mod sim;

use output::JsonLineSink;
use sim::SimulatedArm;

/// Arm State CLI - 机械臂状态发布模拟器
#[derive(Parser, Debug)]
#[command(name = "arm-state-cli")]
#[command(about = "Simulated control loop publishing arm state as JSON lines", long_about = None)]
#[command(version)]
struct Cli {
    /// 控制器配置文件（TOML）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 臂标识（未指定配置文件时使用）
    #[arg(short, long, default_value = "panda")]
    arm_id: String,

    /// 发布频率（Hz），覆盖配置文件
    #[arg(short, long)]
    rate: Option<f64>,

    /// 控制周期频率（Hz）
    #[arg(long, default_value_t = 1000.0)]
    cycle_hz: f64,

    /// 运行时长（秒），缺省时运行到 Ctrl-C
    #[arg(short, long)]
    duration: Option<f64>,

    /// 每隔多少秒注入一次碰撞反射故障
    #[arg(long)]
    fault_every: Option<f64>,
}

impl Cli {
    fn controller_config(&self) -> Result<StateControllerConfig> {
        let mut config = match &self.config {
            Some(path) => StateControllerConfig::load_from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => StateControllerConfig::with_default_joint_names(self.arm_id.as_str()),
        };
        if let Some(rate) = self.rate {
            config.publish_rate = Some(rate);
        }
        Ok(config)
    }

    fn cycle_period(&self) -> Result<Duration> {
        if !self.cycle_hz.is_finite() || self.cycle_hz <= 0.0 {
            bail!("invalid --cycle-hz: {} (must be > 0)", self.cycle_hz);
        }
        if self.cycle_hz > 10_000.0 {
            warn!("Very high cycle frequency: {} Hz", self.cycle_hz);
        }
        Ok(Duration::from_secs_f64(1.0 / self.cycle_hz))
    }

    /// 运行截止时刻（相对控制循环起点）
    fn deadline(&self) -> Result<Option<Timestamp>> {
        self.duration
            .map(|secs| {
                Timestamp::from_secs_f64(secs).with_context(|| format!("invalid --duration: {}", secs))
            })
            .transpose()
    }

    fn seconds(name: &str, value: Option<f64>) -> Result<Option<Duration>> {
        value
            .map(|secs| {
                Duration::try_from_secs_f64(secs)
                    .with_context(|| format!("invalid --{}: {}", name, secs))
            })
            .transpose()
    }
}

/// 硬件层：按臂标识登记状态句柄
fn hardware(arm_id: &str, latest: Arc<LatestState>) -> HandleRegistry {
    let mut registry = HandleRegistry::new();
    registry.register(FrameIds::for_arm(arm_id).state_handle, latest);
    registry
}

fn main() -> Result<()> {
    // 初始化日志（stderr，stdout 留给消息）
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("arm_state_cli=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.controller_config()?;
    let period = cli.cycle_period()?;
    let deadline = cli.deadline()?;
    let fault_interval = Cli::seconds("fault-every", cli.fault_every)?;

    // 硬件层：驱动把最新状态写入 LatestState
    let latest = Arc::new(LatestState::new());
    let registry = hardware(&config.arm_id, latest.clone());

    let (mut controller, outboxes) = StateController::init(&config, &registry)?;

    let workers = [
        SinkWorker::spawn(outboxes.franka_states, JsonLineSink::new())?,
        SinkWorker::spawn(outboxes.joint_states, JsonLineSink::new())?,
        SinkWorker::spawn(outboxes.transforms, JsonLineSink::new())?,
        SinkWorker::spawn(outboxes.external_wrench, JsonLineSink::new())?,
    ];

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::Release);
        })
        .context("installing Ctrl-C handler")?;
    }

    info!(
        "Running control loop at {} Hz{}",
        cli.cycle_hz,
        deadline.map(|d| format!(" for {:.3}s", d.as_secs_f64())).unwrap_or_default()
    );

    let mut arm = SimulatedArm::new(fault_interval);
    let sleeper = SpinSleeper::default();
    let start = Instant::now();
    let mut next = start;

    while running.load(Ordering::Acquire) {
        let now = Timestamp::from(start.elapsed());
        if deadline.is_some_and(|end| now >= end) {
            break;
        }

        latest.store(arm.step(period));
        controller.tick(now);

        // 按绝对时刻对齐，避免周期漂移
        next += period;
        if let Some(wait) = next.checked_duration_since(Instant::now()) {
            sleeper.sleep(wait);
        } else {
            next = Instant::now();
        }
    }

    let metrics = controller.metrics().snapshot();
    for worker in workers {
        worker.stop();
    }

    info!(
        "Stopped after {:.3}s: {} ticks, {} publish ticks",
        start.elapsed().as_secs_f64(),
        metrics.ticks,
        metrics.publish_ticks
    );
    for (topic, channel) in [
        ("franka_states", metrics.franka_state),
        ("joint_states", metrics.joint_state),
        ("/tf", metrics.transform),
        ("F_ext", metrics.wrench),
    ] {
        info!(
            "  {}: published={}, skipped={} ({:.1}%)",
            topic,
            channel.published,
            channel.skipped,
            channel.skip_ratio() * 100.0
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["arm-state-cli"]);
        assert_eq!(cli.arm_id, "panda");
        assert_eq!(cli.cycle_period().unwrap(), Duration::from_millis(1));
        let config = cli.controller_config().unwrap();
        assert_eq!(config.publish_rate, None);
        assert_eq!(config.joint_names[6], "panda_joint7");
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from(["arm-state-cli", "--arm-id", "fr3", "--rate", "10", "-d", "2.5"]);
        let config = cli.controller_config().unwrap();
        assert_eq!(config.arm_id, "fr3");
        assert_eq!(config.publish_rate, Some(10.0));
        assert_eq!(cli.deadline().unwrap(), Some(Timestamp::from_millis(2500)));
    }

    #[test]
    fn test_cli_rejects_bad_values() {
        let cli = Cli::parse_from(["arm-state-cli", "--cycle-hz", "0"]);
        assert!(cli.cycle_period().is_err());
        assert!(Cli::seconds("fault-every", Some(-1.0)).is_err());

        let cli = Cli::parse_from(["arm-state-cli", "--duration=-1"]);
        let err = cli.deadline().unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid timestamp"), "{:#}", err);
        let cli = Cli::parse_from(["arm-state-cli", "--duration", "NaN"]);
        assert!(cli.deadline().is_err());
    }

    #[test]
    fn test_hardware_registers_state_handle() {
        let latest = Arc::new(LatestState::new());
        let registry = hardware("fr3", latest);
        let config = StateControllerConfig::with_default_joint_names("fr3");
        let (ctrl, _) = StateController::init(&config, &registry).unwrap();
        assert_eq!(ctrl.config().frames.state_handle, "fr3_robot");

        let other = StateControllerConfig::with_default_joint_names("panda");
        assert!(StateController::init(&other, &registry).is_err());
    }
}

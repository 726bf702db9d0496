//! Follower node running against a simulated robot.
//!
//! Loads the follower configuration, wires simulated collaborators and ticks
//! the follower at a fixed period. The simulated person walks away from the
//! robot, hides for a while and comes back.

use anyhow::{Context, Result};
use nalgebra::{Translation3, UnitQuaternion};
use prometheus_follower::behaviors::{MonitorEvent, MonitorSink};
use prometheus_follower::common::clock::SystemClock;
use prometheus_follower::common::types::{AnglePair, Pixel, Point3D, Transform3D};
use prometheus_follower::control::{VelocityCommand, VelocitySink};
use prometheus_follower::error::CollaboratorError;
use prometheus_follower::gaze::GazeActuator;
use prometheus_follower::navigation::{NavigationFallback, NavigationStatus, RelativeGoal};
use prometheus_follower::perception::sensors::TargetSource;
use prometheus_follower::perception::transform::StaticTransformTree;
use prometheus_follower::{
    FollowResult, Follower, FollowerConfig, FollowerIo, ReferenceFrame, Target,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_PERIOD_MS: u64 = 50;
const DEFAULT_TICKS: u32 = 1200;
const CAMERA_HEIGHT: f64 = 1.2;
const CAMERA_FOV_DEG: f64 = 35.0;
const CAMERA_RANGE: f64 = 6.0;

/// Ground truth shared by the simulated collaborators
struct SimWorld {
    /// Person position in the robot base frame
    person: Point3D,
    /// Person walking velocity in the base frame (m/s)
    person_velocity: (f64, f64),
    hidden_ticks: u32,
    tick: u32,
    dt: f64,
    gaze_motion_ticks: u32,
    nav_remaining_ticks: Option<u32>,
}

type Shared = Arc<Mutex<SimWorld>>;

impl SimWorld {
    fn advance(&mut self) {
        self.tick += 1;
        self.person.x += self.person_velocity.0 * self.dt;
        self.person.y += self.person_velocity.1 * self.dt;
        if self.tick == 300 {
            info!("Sim: person hides behind a wall");
            self.hidden_ticks = 400;
        }
        self.hidden_ticks = self.hidden_ticks.saturating_sub(1);
        self.gaze_motion_ticks = self.gaze_motion_ticks.saturating_sub(1);
    }

    /// Move the world as the robot drives with `command` for one period
    fn drive(&mut self, command: &VelocityCommand) {
        let heading = command.direction.to_radians();
        let dx = command.linear * heading.cos() * self.dt;
        let dy = command.linear * heading.sin() * self.dt;
        let dtheta = -(command.angular.to_radians()) * self.dt;
        let x = self.person.x - dx;
        let y = self.person.y - dy;
        self.person.x = x * dtheta.cos() - y * dtheta.sin();
        self.person.y = x * dtheta.sin() + y * dtheta.cos();
    }
}

fn lock(world: &Shared) -> std::sync::MutexGuard<'_, SimWorld> {
    match world.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Depth camera producing person observations
struct SimCamera(Shared);

impl TargetSource for SimCamera {
    fn name(&self) -> &str {
        "sim_depth_camera"
    }

    fn latest(&mut self) -> Option<Target> {
        let world = lock(&self.0);
        let p = world.person;
        let bearing = p.y.atan2(p.x).to_degrees();
        let distance = p.x.hypot(p.y);
        if world.hidden_ticks > 0 || bearing.abs() > CAMERA_FOV_DEG || distance > CAMERA_RANGE {
            return Some(Target::invalid(ReferenceFrame::DepthCamera));
        }
        let u = 160.0 - bearing / CAMERA_FOV_DEG * 160.0;
        Some(Target::valid(
            ReferenceFrame::DepthCamera,
            Point3D::new(p.x, p.y, p.z - CAMERA_HEIGHT),
            Pixel::new(u, 120.0),
        ))
    }
}

struct SimBase(Shared);

impl VelocitySink for SimBase {
    fn send(&mut self, command: &VelocityCommand) -> Result<(), CollaboratorError> {
        lock(&self.0).drive(command);
        Ok(())
    }
}

struct SimGaze {
    world: Shared,
    trajectory_time: f64,
}

impl GazeActuator for SimGaze {
    fn look_at_angle(&mut self, angles: AnglePair) -> Result<(), CollaboratorError> {
        let mut world = lock(&self.world);
        world.gaze_motion_ticks = (self.trajectory_time / world.dt / 4.0) as u32;
        info!("Sim gaze: looking at {:?}", angles);
        Ok(())
    }

    fn look_at_pixel(&mut self, _pixel: Pixel) -> Result<(), CollaboratorError> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CollaboratorError> {
        lock(&self.world).gaze_motion_ticks = 0;
        Ok(())
    }

    fn set_trajectory_time(&mut self, seconds: f64) -> Result<(), CollaboratorError> {
        self.trajectory_time = seconds;
        Ok(())
    }

    fn trajectory_time(&mut self) -> Result<f64, CollaboratorError> {
        Ok(self.trajectory_time)
    }

    fn is_motion_done(&mut self) -> bool {
        lock(&self.world).gaze_motion_ticks == 0
    }
}

struct SimNavigation(Shared);

impl NavigationFallback for SimNavigation {
    fn go_to(&mut self, goal: &RelativeGoal) -> Result<(), CollaboratorError> {
        info!("Sim navigation: goal ({:.2}, {:.2})", goal.x, goal.y);
        lock(&self.0).nav_remaining_ticks = Some(60);
        Ok(())
    }

    fn status(&mut self) -> Result<NavigationStatus, CollaboratorError> {
        let mut world = lock(&self.0);
        Ok(match world.nav_remaining_ticks {
            None => NavigationStatus::Idle,
            Some(0) => NavigationStatus::GoalReached,
            Some(n) => {
                world.nav_remaining_ticks = Some(n - 1);
                NavigationStatus::Moving
            }
        })
    }
}

struct LogMonitor;

impl MonitorSink for LogMonitor {
    fn send(&mut self, skill: &str, event: MonitorEvent) {
        info!("[monitor] {}: {}", skill, event);
    }
}

fn load_config(args: &[String]) -> Result<FollowerConfig> {
    if let Some(path) = args.get(1).filter(|a| !a.starts_with("--")) {
        info!("Loading configuration from {}", path);
        return FollowerConfig::load(Path::new(path))
            .with_context(|| format!("loading {}", path));
    }
    if Path::new("follower.toml").exists() {
        info!("Loading configuration from follower.toml");
        return FollowerConfig::load(Path::new("follower.toml")).context("loading follower.toml");
    }
    info!("Using default configuration");
    Ok(FollowerConfig::default())
}

fn arg_value<T: std::str::FromStr>(args: &[String], name: &str) -> Option<T> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("prometheus_follower=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = load_config(&args)?;
    let period_ms = arg_value(&args, "--period-ms").unwrap_or(DEFAULT_PERIOD_MS);
    let ticks = arg_value(&args, "--ticks").unwrap_or(DEFAULT_TICKS);

    let world: Shared = Arc::new(Mutex::new(SimWorld {
        person: Point3D::new(2.0, 0.3, 1.0),
        person_velocity: (0.4, 0.05),
        hidden_ticks: 0,
        tick: 0,
        dt: period_ms as f64 / 1000.0,
        gaze_motion_ticks: 0,
        nav_remaining_ticks: None,
    }));

    let mut transforms = StaticTransformTree::new();
    transforms.insert(
        &config.frames.base,
        &config.frames.depth_camera,
        Transform3D::from_parts(
            Translation3::new(0.0, 0.0, CAMERA_HEIGHT),
            UnitQuaternion::identity(),
        ),
    );

    let mut follower = Follower::new(FollowerIo {
        gaze: Box::new(SimGaze {
            world: Arc::clone(&world),
            trajectory_time: 1.0,
        }),
        transforms: Box::new(transforms),
        navigation: Box::new(SimNavigation(Arc::clone(&world))),
        velocity: Box::new(SimBase(Arc::clone(&world))),
        monitor: Box::new(LogMonitor),
        obstacles: None,
        clock: Box::new(SystemClock),
    });
    let mut camera = SimCamera(Arc::clone(&world));

    follower.configure(config)?;
    follower.start()?;
    info!(
        "Follower node running at {}ms for {} ticks, camera={}",
        period_ms,
        ticks,
        camera.name()
    );

    let mut interval = tokio::time::interval(Duration::from_millis(period_ms));
    let mut last_result = FollowResult::NotRunning;
    for _ in 0..ticks {
        interval.tick().await;
        lock(&world).advance();
        let result = follower.tick(camera.latest());
        if result != last_result {
            info!(
                "Tick result {:?} in state {} (gaze: {})",
                result,
                follower.inner_state(),
                follower.gaze_status()
            );
            last_result = result;
        }
        if result == FollowResult::NeedHelp {
            warn!("Follower needs help, shutting down");
            break;
        }
    }

    follower.stop()?;
    follower.close();
    info!("Follower node finished");
    Ok(())
}

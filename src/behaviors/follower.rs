//! Follow-target behavior coordinator.
//!
//! Driven once per control tick with the newest target observation. While the
//! target is visible the robot is steered toward it; when it disappears the
//! coordinator waits out a grace period, searches with the gaze, navigates to
//! the last place the target was seen, and finally asks for help.
//!
//! Nothing in a tick blocks: gaze motions and navigation goals are fired and
//! their completion is polled on later ticks.

use super::monitor::{MonitorEvent, MonitorSink};
use super::state::{FollowResult, InnerState, SmEvent, Transition};
use crate::common::clock::Clock;
use crate::common::types::Point3D;
use crate::config::{FollowerConfig, TargetType};
use crate::control::planner::VelocityCommandPlanner;
use crate::control::{ObstacleVerifier, VelocityCommand, VelocitySink};
use crate::error::{LifecycleError, Result};
use crate::gaze::{GazeActuator, GazeScanState, GazeScanner};
use crate::lifecycle::{LifecycleNode, LifecycleNodeBase, OuterState};
use crate::navigation::{NavigationFallback, NavigationOutcome, RelativeGoal};
use crate::perception::transform::{TargetFrameTransformer, TransformLookup};
use crate::perception::{BaseFrameTarget, Target};
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, info, warn};

const SKILL: &str = "follower";
const HISTORY_LEN: usize = 64;

/// External collaborators of the follower
pub struct FollowerIo {
    pub gaze: Box<dyn GazeActuator>,
    pub transforms: Box<dyn TransformLookup>,
    pub navigation: Box<dyn NavigationFallback>,
    pub velocity: Box<dyn VelocitySink>,
    pub monitor: Box<dyn MonitorSink>,
    pub obstacles: Option<Box<dyn ObstacleVerifier>>,
    pub clock: Box<dyn Clock>,
}

/// The follow behavior coordinator
pub struct Follower {
    base: LifecycleNodeBase,
    config: FollowerConfig,
    state: InnerState,
    history: VecDeque<Transition>,
    lost_target_counter: u32,
    last_valid_target: Option<BaseFrameTarget>,
    last_command: VelocityCommand,
    navigations: u32,
    lookup_retries: u32,
    nav_deadline: Option<Instant>,
    nav_status_errors: u32,

    transformer: TargetFrameTransformer,
    planner: VelocityCommandPlanner,
    scanner: GazeScanner,
    navigation: Box<dyn NavigationFallback>,
    velocity: Box<dyn VelocitySink>,
    monitor: Box<dyn MonitorSink>,
    obstacles: Option<Box<dyn ObstacleVerifier>>,
    clock: Box<dyn Clock>,
}

impl Follower {
    /// Create an unconfigured follower
    pub fn new(io: FollowerIo) -> Self {
        let config = FollowerConfig::default();
        Follower {
            base: LifecycleNodeBase::new(SKILL),
            transformer: TargetFrameTransformer::new(config.frames.clone(), io.transforms),
            planner: VelocityCommandPlanner::new(config.navigation.clone()),
            scanner: GazeScanner::new(io.gaze, config.gaze.clone()),
            config,
            state: InnerState::Unknown,
            history: VecDeque::with_capacity(HISTORY_LEN),
            lost_target_counter: 0,
            last_valid_target: None,
            last_command: VelocityCommand::zero(),
            navigations: 0,
            lookup_retries: 0,
            nav_deadline: None,
            nav_status_errors: 0,
            navigation: io.navigation,
            velocity: io.velocity,
            monitor: io.monitor,
            obstacles: io.obstacles,
            clock: io.clock,
        }
    }

    /// Validate and apply a configuration.
    ///
    /// A rejected configuration leaves the follower in `OuterState::Error`.
    pub fn configure(&mut self, config: FollowerConfig) -> Result<()> {
        if self.base.get_state() == OuterState::Running {
            return Err(LifecycleError::InvalidTransition {
                action: "configure",
                state: OuterState::Running,
            });
        }
        if let Err(e) = config.validate() {
            warn!("Follower configuration rejected: {}", e);
            self.base.configured(false)?;
            return Err(e.into());
        }

        info!(
            "Follower configured: target={:?} invalid_target_max={} distance_threshold={:.2}m angle_threshold={:.1}deg",
            config.target_type,
            config.invalid_target_max,
            config.navigation.distance_threshold,
            config.navigation.angle_threshold
        );
        self.transformer.set_frames(config.frames.clone());
        self.planner.set_config(config.navigation.clone());
        self.scanner.set_config(config.gaze.clone());
        self.config = config;
        self.base.configured(true)
    }

    /// Begin following. Only valid from `Configured`.
    pub fn start(&mut self) -> Result<()> {
        self.base.activate()?;
        self.reset_inner();
        info!("Follower started");
        Ok(())
    }

    /// Stop the robot and go back to `Configured`.
    pub fn stop(&mut self) -> Result<()> {
        self.base.deactivate()?;
        self.send_velocity(VelocityCommand::zero());
        self.scanner.abort();
        self.reset_inner();
        info!("Follower stopped");
        Ok(())
    }

    /// Stop if running and hand the gaze back with its original speed.
    pub fn close(&mut self) {
        if self.base.get_state() == OuterState::Running {
            self.send_velocity(VelocityCommand::zero());
        }
        self.scanner.close();
        self.reset_inner();
        self.base.cleanup();
        info!("Follower closed");
    }

    pub fn get_state(&self) -> OuterState {
        self.base.get_state()
    }

    pub fn inner_state(&self) -> InnerState {
        self.state
    }

    pub fn last_transition(&self) -> Option<Transition> {
        self.history.back().copied()
    }

    /// Most recent transitions, oldest first
    pub fn transitions(&self) -> impl DoubleEndedIterator<Item = &Transition> + '_ {
        self.history.iter()
    }

    pub fn lost_target_counter(&self) -> u32 {
        self.lost_target_counter
    }

    pub fn last_valid_target(&self) -> Option<&BaseFrameTarget> {
        self.last_valid_target.as_ref()
    }

    pub fn target_type(&self) -> TargetType {
        self.config.target_type
    }

    pub fn config(&self) -> &FollowerConfig {
        &self.config
    }

    pub fn gaze_status(&self) -> String {
        self.scanner.describe()
    }

    /// Run one control tick with the newest observation (`None` if nothing arrived).
    pub fn tick(&mut self, observation: Option<Target>) -> FollowResult {
        match self.base.get_state() {
            OuterState::Running => {}
            OuterState::Error => return FollowResult::Error,
            OuterState::None | OuterState::Configured => return FollowResult::NotRunning,
        }

        if self.state == InnerState::NeedHelp {
            return self.hold_need_help();
        }

        match observation.as_ref().and_then(|t| self.to_base_frame(t)) {
            Some(target) => self.on_valid_target(target),
            None => self.on_invalid_target(),
        }
    }

    fn to_base_frame(&self, target: &Target) -> Option<BaseFrameTarget> {
        let sighting = target.sighting()?;
        if !is_finite(&sighting.point) {
            warn!("Treating target as invalid: non-finite point {:?}", sighting.point);
            return None;
        }
        match self.transformer.to_base_frame(target.frame(), sighting) {
            Ok(base_target) if is_finite(&base_target.point) => Some(base_target),
            Ok(base_target) => {
                warn!(
                    "Treating target as invalid: non-finite base frame point {:?}",
                    base_target.point
                );
                None
            }
            Err(e) => {
                warn!("Treating target as invalid: {}", e);
                None
            }
        }
    }

    fn on_valid_target(&mut self, target: BaseFrameTarget) -> FollowResult {
        match self.state {
            InnerState::TargetValid => {}
            InnerState::LostTargetLookup => {
                self.scanner.abort();
                self.monitor.send(SKILL, MonitorEvent::ReplyLookupSucceed);
                self.transition(InnerState::TargetValid, SmEvent::ValidTargetRec);
            }
            InnerState::WaitAutoNav => {
                self.monitor.send(SKILL, MonitorEvent::ReplyTargetFound);
                self.transition(InnerState::TargetValid, SmEvent::ValidTargetRec);
            }
            _ => self.transition(InnerState::TargetValid, SmEvent::ValidTargetRec),
        }

        self.lost_target_counter = 0;
        self.lookup_retries = 0;
        self.navigations = 0;
        self.last_valid_target = Some(target);

        let mut command = self.planner.plan(&target);
        if command.linear > 0.0 {
            if let Some(obstacles) = self.obstacles.as_mut() {
                if obstacles.obstacle_in_direction(command.direction) {
                    debug!("Obstacle toward {:.1}deg, holding linear speed", command.direction);
                    command.linear = 0.0;
                }
            }
        }
        self.scanner.track_pixel(target.pixel);
        self.last_command = command;

        if self.send_velocity(command) {
            FollowResult::Ok
        } else {
            FollowResult::Failed
        }
    }

    fn on_invalid_target(&mut self) -> FollowResult {
        match self.state {
            InnerState::Unknown => {
                self.lost_target_counter += 1;
                if self.lost_target_counter > self.config.invalid_target_max {
                    self.monitor.send(SKILL, MonitorEvent::ReplyFirstTargetInvalid);
                    self.enter_lookup(SmEvent::InvalidTargetRec);
                }
                FollowResult::LostTarget
            }
            InnerState::TargetValid => {
                self.lost_target_counter += 1;
                self.transition(InnerState::MaybeLostTarget, SmEvent::InvalidTargetRec);
                self.hold_or_lose()
            }
            InnerState::MaybeLostTarget => {
                self.lost_target_counter += 1;
                self.hold_or_lose()
            }
            InnerState::LostTargetLookup => self.step_lookup(),
            InnerState::StartAutoNav => self.start_auto_nav(),
            InnerState::WaitAutoNav => self.poll_auto_nav(),
            InnerState::AutoNavOk => {
                if self.config.recovery.allows_retry(self.lookup_retries) {
                    self.lookup_retries += 1;
                    info!("Target still lost after navigation, search #{}", self.lookup_retries + 1);
                    self.enter_lookup(SmEvent::AutoNavFinished);
                    FollowResult::LostTarget
                } else {
                    self.escalate(SmEvent::LookupFinished)
                }
            }
            InnerState::AutoNavError => self.escalate(SmEvent::Error),
            InnerState::NeedHelp => self.hold_need_help(),
        }
    }

    /// Keep moving on a decaying command, or give up once the budget is spent
    fn hold_or_lose(&mut self) -> FollowResult {
        if self.lost_target_counter > self.config.invalid_target_max {
            self.monitor.send(SKILL, MonitorEvent::ReplyNTargetInvalid);
            self.enter_lookup(SmEvent::InvalidTargetRec);
            return FollowResult::LostTarget;
        }

        self.last_command = self.last_command.scaled(self.config.navigation.hold_decay);
        if !self.last_command.is_zero() {
            self.send_velocity(self.last_command);
        }
        FollowResult::LostTarget
    }

    fn enter_lookup(&mut self, event: SmEvent) {
        self.last_command = VelocityCommand::zero();
        self.send_velocity(VelocityCommand::zero());
        self.scanner.reset();
        self.monitor.send(SKILL, MonitorEvent::ReqLookUp);
        self.transition(InnerState::LostTargetLookup, event);
        self.scanner.step(self.clock.as_ref());
    }

    fn step_lookup(&mut self) -> FollowResult {
        match self.scanner.step(self.clock.as_ref()) {
            scan @ (GazeScanState::Finished | GazeScanState::Failed) => {
                if scan == GazeScanState::Failed {
                    self.monitor.send(SKILL, MonitorEvent::Timeout);
                }
                self.monitor.send(SKILL, MonitorEvent::ReplyLookupFailed);
                if self.navigations == 0 || self.config.recovery.allows_retry(self.lookup_retries)
                {
                    self.transition(InnerState::StartAutoNav, SmEvent::LookupFinished);
                    FollowResult::LostTarget
                } else {
                    self.escalate(SmEvent::LookupFinished)
                }
            }
            _ => FollowResult::LostTarget,
        }
    }

    fn start_auto_nav(&mut self) -> FollowResult {
        let Some(target) = self.last_valid_target else {
            warn!("No valid target seen yet, cannot navigate toward it");
            return self.escalate(SmEvent::Error);
        };

        let goal = RelativeGoal {
            x: target.point.x,
            y: target.point.y,
            theta: target.bearing_deg(),
        };
        info!(
            "Navigating to last target position ({:.2}, {:.2}, {:.1}deg)",
            goal.x, goal.y, goal.theta
        );
        if let Err(e) = self.navigation.go_to(&goal) {
            warn!("Navigation goal rejected: {}", e);
            return self.escalate(SmEvent::Error);
        }
        self.navigations += 1;
        let now = self.clock.now();
        self.nav_deadline = Some(
            now.checked_add(self.config.recovery.navigation_timeout())
                .unwrap_or(now),
        );
        self.nav_status_errors = 0;
        self.monitor.send(SKILL, MonitorEvent::ReqNavig);
        self.transition(InnerState::WaitAutoNav, SmEvent::LookupFinished);
        FollowResult::AutoNavigation
    }

    fn poll_auto_nav(&mut self) -> FollowResult {
        let status = match self.navigation.status() {
            Ok(status) => {
                self.nav_status_errors = 0;
                status
            }
            Err(e) => {
                self.nav_status_errors += 1;
                warn!(
                    "Navigation status unavailable ({} in a row): {}",
                    self.nav_status_errors, e
                );
                if self.nav_status_errors > self.config.recovery.navigation_status_errors {
                    self.monitor.send(SKILL, MonitorEvent::ReplyHumanLost);
                    return self.escalate(SmEvent::Error);
                }
                return self.check_nav_deadline();
            }
        };
        match status.outcome() {
            NavigationOutcome::InProgress => self.check_nav_deadline(),
            NavigationOutcome::Succeeded => {
                self.transition(InnerState::AutoNavOk, SmEvent::AutoNavFinished);
                FollowResult::AutoNavigation
            }
            NavigationOutcome::Failed => {
                warn!("Navigation ended with status {}", status);
                self.monitor.send(SKILL, MonitorEvent::ReplyHumanLost);
                self.escalate(SmEvent::Error)
            }
        }
    }

    /// Give up on a navigation goal that outlived `navigation_timeout`
    fn check_nav_deadline(&mut self) -> FollowResult {
        let now = self.clock.now();
        if self.nav_deadline.is_some_and(|deadline| now > deadline) {
            warn!(
                "Navigation goal not reached within {:.1}s",
                self.config.recovery.navigation_timeout
            );
            self.monitor.send(SKILL, MonitorEvent::Timeout);
            self.monitor.send(SKILL, MonitorEvent::ReplyHumanLost);
            return self.escalate(SmEvent::Error);
        }
        FollowResult::AutoNavigation
    }

    /// Go through `autoNavError` to `needHelp`, asking for help on the way
    fn escalate(&mut self, event: SmEvent) -> FollowResult {
        if self.state != InnerState::AutoNavError {
            self.transition(InnerState::AutoNavError, event);
        }
        warn!("Autonomous recovery failed, requesting help");
        self.monitor.send(SKILL, MonitorEvent::ReqHelp);
        self.transition(InnerState::NeedHelp, SmEvent::Error);
        self.hold_need_help()
    }

    fn hold_need_help(&mut self) -> FollowResult {
        self.last_command = VelocityCommand::zero();
        self.send_velocity(VelocityCommand::zero());
        FollowResult::NeedHelp
    }

    fn transition(&mut self, to: InnerState, event: SmEvent) {
        let transition = Transition {
            from: self.state,
            to,
            event,
        };
        info!("Follower {} -> {} on {}", transition.from, to, event);
        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(transition);
        self.monitor.send(
            SKILL,
            MonitorEvent::Transition {
                from: transition.from,
                to,
                event,
            },
        );
        self.state = to;
    }

    fn send_velocity(&mut self, command: VelocityCommand) -> bool {
        match self.velocity.send(&command) {
            Ok(()) => true,
            Err(e) => {
                warn!("Velocity command not delivered: {}", e);
                false
            }
        }
    }

    fn reset_inner(&mut self) {
        self.state = InnerState::Unknown;
        self.lost_target_counter = 0;
        self.last_valid_target = None;
        self.last_command = VelocityCommand::zero();
        self.navigations = 0;
        self.lookup_retries = 0;
        self.nav_deadline = None;
        self.nav_status_errors = 0;
    }
}

fn is_finite(point: &Point3D) -> bool {
    point.coords.iter().all(|c| c.is_finite())
}

impl LifecycleNode for Follower {
    fn on_activate(&mut self) -> Result<()> {
        self.start()
    }

    fn on_deactivate(&mut self) -> Result<()> {
        self.stop()
    }

    fn on_cleanup(&mut self) -> Result<()> {
        self.close();
        Ok(())
    }

    fn name(&self) -> &str {
        &self.base.name
    }
}

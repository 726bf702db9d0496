//! Configuration loading for the follower

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Longest timeout accepted for any deadline (one day)
const MAX_TIMEOUT_SECS: f64 = 86_400.0;

/// Main configuration structure
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct FollowerConfig {
    /// Kind of target to follow
    #[serde(default)]
    pub target_type: TargetType,

    /// Consecutive invalid observations tolerated before the target is lost
    #[serde(default = "default_invalid_target_max")]
    pub invalid_target_max: u32,

    #[serde(default)]
    pub navigation: NavigationConfig,

    #[serde(default)]
    pub gaze: GazeConfig,

    #[serde(default)]
    pub frames: FrameConfig,

    #[serde(default)]
    pub recovery: RecoveryConfig,
}

/// The kinds of target the follower can be fed
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TargetType {
    Redball,
    #[default]
    Person,
    FakeHumanModel,
}

/// Velocity planning thresholds and limits
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct NavigationConfig {
    /// Linear speed per meter of distance (1/s)
    #[serde(default = "default_factor")]
    pub factor_dist_to_vel: f64,

    /// Angular speed per degree of heading error (1/s)
    #[serde(default = "default_factor")]
    pub factor_ang_to_vel: f64,

    /// Below this planar distance the target is reached (meters)
    #[serde(default = "default_distance_threshold")]
    pub distance_threshold: f64,

    /// Below this heading error the robot is aligned (degrees)
    #[serde(default = "default_angle_threshold")]
    pub angle_threshold: f64,

    /// Heading error zone over which angular speed is attenuated (degrees)
    #[serde(default)]
    pub angle_limits_vel_reduction: AngleLimits,

    #[serde(default)]
    pub velocity_limits: VelocityLimits,

    /// Multiplier applied to the held command on each invalid tick
    #[serde(default = "default_hold_decay")]
    pub hold_decay: f64,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct AngleLimits {
    pub min: f64,
    pub max: f64,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct VelocityLimits {
    /// m/s
    pub linear: f64,
    /// deg/s
    pub angular: f64,
}

/// Gaze search and tracking
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct GazeConfig {
    /// Pixel window (u) inside which the gaze is left alone
    #[serde(default = "default_pixel_x_range")]
    pub pixel_x_range: [f64; 2],

    /// Pixel window (v) inside which the gaze is left alone
    #[serde(default = "default_pixel_y_range")]
    pub pixel_y_range: [f64; 2],

    /// Minimum pixel change between two tracking commands
    #[serde(default = "default_pixel_deadband")]
    pub pixel_deadband: f64,

    /// Trajectory time used while searching (seconds)
    #[serde(default = "default_trajectory_time")]
    pub trajectory_time: f64,

    /// Maximum time for one scan waypoint to complete (seconds)
    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout: f64,

    /// Scan waypoints (azimuth, elevation) in degrees
    #[serde(default = "default_scan_near")]
    pub scan_near: [f64; 2],
    #[serde(default = "default_scan_otherside")]
    pub scan_otherside: [f64; 2],
    #[serde(default = "default_scan_infront")]
    pub scan_infront: [f64; 2],

    /// Keep the target in view with pixel commands while tracking
    #[serde(default = "default_track_with_gaze")]
    pub track_with_gaze: bool,
}

/// Reference frame names
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct FrameConfig {
    #[serde(default = "default_base_frame")]
    pub base: String,
    #[serde(default = "default_head_camera_frame")]
    pub head_camera: String,
    #[serde(default = "default_depth_camera_frame")]
    pub depth_camera: String,
}

/// Search/navigate retry policy
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RecoveryConfig {
    /// Re-searches allowed after a successful navigation fallback
    #[serde(default = "default_lookup_retries")]
    pub lookup_retries: u32,

    /// Ignore `lookup_retries` and alternate search and navigation
    /// until the target shows up
    #[serde(default)]
    pub retry_until_found: bool,

    /// Time a navigation goal may take before it counts as failed (seconds)
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout: f64,

    /// Consecutive failing status queries tolerated while navigating
    #[serde(default = "default_navigation_status_errors")]
    pub navigation_status_errors: u32,
}

impl RecoveryConfig {
    /// Whether another search may follow `done` completed re-searches
    pub fn allows_retry(&self, done: u32) -> bool {
        self.retry_until_found || done < self.lookup_retries
    }

    pub fn navigation_timeout(&self) -> Duration {
        to_duration(self.navigation_timeout)
    }
}

impl GazeConfig {
    pub fn lookup_timeout(&self) -> Duration {
        to_duration(self.lookup_timeout)
    }
}

// Values are range-checked by `validate()`
fn to_duration(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO)
}

impl Default for AngleLimits {
    fn default() -> Self {
        Self {
            min: 20.0,
            max: 40.0,
        }
    }
}

impl Default for VelocityLimits {
    fn default() -> Self {
        Self {
            linear: 3.0,
            angular: 30.0,
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            factor_dist_to_vel: default_factor(),
            factor_ang_to_vel: default_factor(),
            distance_threshold: default_distance_threshold(),
            angle_threshold: default_angle_threshold(),
            angle_limits_vel_reduction: AngleLimits::default(),
            velocity_limits: VelocityLimits::default(),
            hold_decay: default_hold_decay(),
        }
    }
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            pixel_x_range: default_pixel_x_range(),
            pixel_y_range: default_pixel_y_range(),
            pixel_deadband: default_pixel_deadband(),
            trajectory_time: default_trajectory_time(),
            lookup_timeout: default_lookup_timeout(),
            scan_near: default_scan_near(),
            scan_otherside: default_scan_otherside(),
            scan_infront: default_scan_infront(),
            track_with_gaze: default_track_with_gaze(),
        }
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            base: default_base_frame(),
            head_camera: default_head_camera_frame(),
            depth_camera: default_depth_camera_frame(),
        }
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            lookup_retries: default_lookup_retries(),
            retry_until_found: false,
            navigation_timeout: default_navigation_timeout(),
            navigation_status_errors: default_navigation_status_errors(),
        }
    }
}

impl Default for FollowerConfig {
    fn default() -> Self {
        Self {
            target_type: TargetType::default(),
            invalid_target_max: default_invalid_target_max(),
            navigation: NavigationConfig::default(),
            gaze: GazeConfig::default(),
            frames: FrameConfig::default(),
            recovery: RecoveryConfig::default(),
        }
    }
}

// Default value functions
fn default_invalid_target_max() -> u32 {
    10
}
fn default_factor() -> f64 {
    0.8
}
fn default_distance_threshold() -> f64 {
    0.8
}
fn default_angle_threshold() -> f64 {
    3.0
}
fn default_hold_decay() -> f64 {
    0.5
}
fn default_pixel_x_range() -> [f64; 2] {
    [100.0, 220.0]
}
fn default_pixel_y_range() -> [f64; 2] {
    [80.0, 160.0]
}
fn default_pixel_deadband() -> f64 {
    10.0
}
fn default_trajectory_time() -> f64 {
    10.0
}
fn default_lookup_timeout() -> f64 {
    20.0
}
fn default_scan_near() -> [f64; 2] {
    [35.0, 10.0]
}
fn default_scan_otherside() -> [f64; 2] {
    [-35.0, 10.0]
}
fn default_scan_infront() -> [f64; 2] {
    [0.0, 10.0]
}
fn default_track_with_gaze() -> bool {
    true
}
fn default_base_frame() -> String {
    "mobile_base_body_link".to_string()
}
fn default_head_camera_frame() -> String {
    "head_leopard_left".to_string()
}
fn default_depth_camera_frame() -> String {
    "depth_center".to_string()
}
fn default_lookup_retries() -> u32 {
    1
}
fn default_navigation_timeout() -> f64 {
    120.0
}
fn default_navigation_status_errors() -> u32 {
    5
}

impl FollowerConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FollowerConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Reject values the state machine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let nav = &self.navigation;
        non_negative("distance_threshold", nav.distance_threshold)?;
        non_negative("angle_threshold", nav.angle_threshold)?;
        non_negative("factor_dist_to_vel", nav.factor_dist_to_vel)?;
        non_negative("factor_ang_to_vel", nav.factor_ang_to_vel)?;
        non_negative("angle_limits_vel_reduction.min", nav.angle_limits_vel_reduction.min)?;
        non_negative("angle_limits_vel_reduction.max", nav.angle_limits_vel_reduction.max)?;
        if nav.angle_limits_vel_reduction.min > nav.angle_limits_vel_reduction.max {
            return Err(ConfigError::InvalidLimit {
                name: "angle_limits_vel_reduction",
                reason: format!(
                    "min {} is greater than max {}",
                    nav.angle_limits_vel_reduction.min, nav.angle_limits_vel_reduction.max
                ),
            });
        }
        positive("velocity_limits.linear", nav.velocity_limits.linear)?;
        positive("velocity_limits.angular", nav.velocity_limits.angular)?;
        if !(nav.hold_decay > 0.0 && nav.hold_decay <= 1.0) {
            return Err(ConfigError::InvalidThreshold {
                name: "hold_decay",
                value: nav.hold_decay,
            });
        }

        let gaze = &self.gaze;
        positive("gaze.trajectory_time", gaze.trajectory_time)?;
        timeout("gaze.lookup_timeout", gaze.lookup_timeout)?;
        non_negative("gaze.pixel_deadband", gaze.pixel_deadband)?;
        ordered("gaze.pixel_x_range", gaze.pixel_x_range)?;
        ordered("gaze.pixel_y_range", gaze.pixel_y_range)?;
        for (name, waypoint) in [
            ("gaze.scan_near", gaze.scan_near),
            ("gaze.scan_otherside", gaze.scan_otherside),
            ("gaze.scan_infront", gaze.scan_infront),
        ] {
            if !waypoint.iter().all(|a| a.is_finite()) {
                return Err(ConfigError::InvalidLimit {
                    name,
                    reason: "waypoint angles must be finite".to_string(),
                });
            }
        }

        timeout("recovery.navigation_timeout", self.recovery.navigation_timeout)?;

        frame_name("frames.base", &self.frames.base)?;
        frame_name("frames.head_camera", &self.frames.head_camera)?;
        frame_name("frames.depth_camera", &self.frames.depth_camera)?;
        for (role, name) in [
            ("frames.head_camera", &self.frames.head_camera),
            ("frames.depth_camera", &self.frames.depth_camera),
        ] {
            if *name == self.frames.base {
                return Err(ConfigError::MalformedFrame {
                    role,
                    name: name.clone(),
                });
            }
        }
        Ok(())
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold { name, value })
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold { name, value })
    }
}

fn timeout(name: &'static str, value: f64) -> Result<(), ConfigError> {
    positive(name, value)?;
    if value <= MAX_TIMEOUT_SECS && Duration::try_from_secs_f64(value).is_ok() {
        Ok(())
    } else {
        Err(ConfigError::InvalidLimit {
            name,
            reason: format!("{}s is longer than {}s", value, MAX_TIMEOUT_SECS),
        })
    }
}

fn ordered(name: &'static str, range: [f64; 2]) -> Result<(), ConfigError> {
    if range[0].is_finite() && range[1].is_finite() && range[0] <= range[1] {
        Ok(())
    } else {
        Err(ConfigError::InvalidLimit {
            name,
            reason: format!("range {:?} is not ordered", range),
        })
    }
}

fn frame_name(role: &'static str, name: &str) -> Result<(), ConfigError> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        Err(ConfigError::MalformedFrame {
            role,
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = FollowerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.invalid_target_max, 10);
        assert_eq!(config.recovery.lookup_retries, 1);
    }

    #[test]
    fn retry_policy() {
        let mut recovery = RecoveryConfig::default();
        assert!(recovery.allows_retry(0));
        assert!(!recovery.allows_retry(1));

        recovery.retry_until_found = true;
        assert!(recovery.allows_retry(100));
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config = FollowerConfig::from_toml(
            r#"
            target_type = "redball"
            invalid_target_max = 4

            [navigation]
            distance_threshold = 1.2

            [navigation.velocity_limits]
            linear = 0.5
            angular = 20.0

            [gaze]
            lookup_timeout = 5.0
            "#,
        )
        .unwrap();

        assert_eq!(config.target_type, TargetType::Redball);
        assert_eq!(config.invalid_target_max, 4);
        assert_eq!(config.navigation.distance_threshold, 1.2);
        assert_eq!(config.navigation.velocity_limits.linear, 0.5);
        assert_eq!(config.navigation.angle_threshold, 3.0);
        assert_eq!(config.gaze.lookup_timeout, 5.0);
        assert_eq!(config.gaze.trajectory_time, 10.0);
        assert_eq!(config.frames.base, "mobile_base_body_link");
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let config = FollowerConfig::from_toml(include_str!("../config/follower.toml")).unwrap();
        assert_eq!(config, FollowerConfig::default());
    }

    #[test]
    fn empty_toml_is_default() {
        let config = FollowerConfig::from_toml("").unwrap();
        assert_eq!(config, FollowerConfig::default());
    }

    #[test]
    fn malformed_toml_is_rejected() {
        let err = FollowerConfig::from_toml("invalid_target_max = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn inverted_reduction_zone_is_rejected() {
        let mut config = FollowerConfig::default();
        config.navigation.angle_limits_vel_reduction = AngleLimits {
            min: 50.0,
            max: 10.0,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLimit { .. })
        ));
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let mut config = FollowerConfig::default();
        config.navigation.distance_threshold = -0.1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThreshold {
                name: "distance_threshold",
                ..
            })
        ));
    }

    #[test]
    fn zero_velocity_limit_is_rejected() {
        let mut config = FollowerConfig::default();
        config.navigation.velocity_limits.angular = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_timeouts_are_rejected() {
        let mut config = FollowerConfig::default();
        config.gaze.lookup_timeout = 1e20;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidLimit {
                name: "gaze.lookup_timeout",
                ..
            })
        ));

        let mut config = FollowerConfig::default();
        config.recovery.navigation_timeout = 90_000.0;
        assert!(config.validate().is_err());

        let mut config = FollowerConfig::default();
        config.recovery.navigation_timeout = 0.0;
        assert!(config.validate().is_err());

        let config = FollowerConfig::default();
        assert_eq!(config.gaze.lookup_timeout(), Duration::from_secs(20));
        assert_eq!(config.recovery.navigation_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn malformed_frame_names_are_rejected() {
        let mut config = FollowerConfig::default();
        config.frames.depth_camera = String::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MalformedFrame { .. })
        ));

        let mut config = FollowerConfig::default();
        config.frames.head_camera = "head left".to_string();
        assert!(config.validate().is_err());

        let mut config = FollowerConfig::default();
        config.frames.head_camera = config.frames.base.clone();
        assert!(config.validate().is_err());
    }
}

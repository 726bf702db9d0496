//! Common utilities and types for Prometheus robot

pub mod clock;

/// Common types and utilities used across the codebase
pub mod types {
    /// A 3D point in meters
    pub type Point3D = nalgebra::Point3<f64>;

    /// A pixel coordinate (u, v)
    pub type Pixel = nalgebra::Point2<f64>;

    /// A rigid transform between two frames
    pub type Transform3D = nalgebra::Isometry3<f64>;

    /// A gaze direction (azimuth, elevation) in degrees
    pub type AnglePair = (f64, f64);
}

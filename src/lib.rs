//! # depthbridge - depth camera to render loop bridge
//!
//! Bridges an asynchronous depth-camera capture SDK to a single-threaded
//! render/update cycle. Provides:
//! - A latest-wins frame mailbox fed from the SDK callback thread
//! - Per-tick draining of depth/infrared/visible frames into display images
//! - A streaming state machine with retry-on-ready
//! - Pinhole back-projection of depth frames into a 3D point cloud
//!
//! ## Quick start
//! ```no_run
//! use depthbridge::{CaptureConfig, CaptureSession, SensorBridge};
//!
//! // Thin wrapper around the vendor SDK's capture session object.
//! struct SdkSession;
//! impl CaptureSession for SdkSession {
//!     fn start_monitoring(&mut self, _config: &CaptureConfig) -> bool { true }
//!     fn start_streaming(&mut self) -> bool { true }
//!     fn stop_streaming(&mut self) {}
//!     fn serial_number(&self) -> String { "SC-001".into() }
//! }
//!
//! let mut bridge = SensorBridge::new(SdkSession);
//! let handler = bridge.handler(); // register with the SDK delegate point
//!
//! bridge.setup(CaptureConfig::default()).unwrap();
//! bridge.start().unwrap();
//! loop {
//!     bridge.update(); // once per render tick
//!     let _cloud = bridge.point_cloud();
//!     // draw images / upload vertices...
//! }
//! ```

pub mod bridge;
pub mod device;
pub mod error;
pub mod mailbox;
pub mod projector;
pub mod session;
pub mod types;

pub use bridge::{FrameHandler, SensorBridge};
pub use device::list_devices;
pub use error::BridgeError;
pub use mailbox::FrameMailbox;
pub use projector::{project_depth, PointCloud};
pub use session::{CaptureSession, SessionController, SessionState};
pub use types::*;

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

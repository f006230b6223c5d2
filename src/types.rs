use glam::{Mat4, Vec3};

/// Pinhole camera parameters for the depth stream.
///
/// Expressed in the same pixel grid as the depth image: `fx`/`fy` are focal
/// lengths in pixels, `cx`/`cy` the principal point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intrinsics {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

impl Intrinsics {
    /// Intrinsics are usable once the sensor reports positive focal lengths.
    pub fn is_valid(&self) -> bool {
        self.fx > 0.0 && self.fy > 0.0
    }
}

/// One depth frame: a single f32 per pixel, in millimeters, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthFrame {
    pub width: u32,
    pub height: u32,
    pub depth_mm: Vec<f32>,
    pub intrinsics: Intrinsics,
    /// GL-style projection matrix reported alongside the intrinsics.
    pub projection: Mat4,
}

/// One infrared frame: a single u16 per pixel, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct InfraredFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u16>,
}

/// One visible-light frame: interleaved RGB, 3 bytes per pixel, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleFrame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

/// A single accelerometer or gyroscope reading.
///
/// Acceleration is in g, rotation rate in rad/s, per the sensor SDK.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImuSample {
    pub value: Vec3,
}

/// A composite frame carrying up to three time-aligned sub-frames.
///
/// `None` means the SDK reported that sub-frame invalid for this capture
/// instant; an invalid sub-frame never overwrites previously held data.
#[derive(Debug, Clone, Default)]
pub struct SynchronizedFrames {
    pub depth: Option<DepthFrame>,
    pub visible: Option<VisibleFrame>,
    pub infrared: Option<InfraredFrame>,
}

/// Everything the capture SDK can deliver through its frame callback.
#[derive(Debug, Clone)]
pub enum Frame {
    Depth(DepthFrame),
    Infrared(InfraredFrame),
    Visible(VisibleFrame),
    Synchronized(SynchronizedFrames),
    Accelerometer(ImuSample),
    Gyroscope(ImuSample),
    /// Frame type this crate does not recognize; carries the raw SDK tag.
    Unknown(u32),
}

/// Session lifecycle events delivered by the capture SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Booting,
    Connected,
    Ready,
    Streaming,
    Disconnected,
    Error,
    /// Event this crate does not recognize; carries the raw SDK tag.
    Unknown(u32),
}

bitflags::bitflags! {
    /// Which streams to enable when starting a capture session.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StreamFlags: u32 {
        const DEPTH         = 1 << 0;
        const INFRARED      = 1 << 1;
        const VISIBLE       = 1 << 2;
        const ACCELEROMETER = 1 << 3;
        const GYROSCOPE     = 1 << 4;
    }
}

/// Capture session configuration, passed through to the SDK collaborator.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Serial of the sensor to open, or `None` for the first available.
    pub sensor_serial: Option<String>,
    pub streams: StreamFlags,
    /// Far clip for the depth stream, in millimeters.
    pub depth_range_max_mm: f32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sensor_serial: None,
            streams: StreamFlags::DEPTH | StreamFlags::INFRARED | StreamFlags::VISIBLE,
            depth_range_max_mm: 10_000.0,
        }
    }
}

/// Discovery record for one connected sensor.
#[derive(Debug, Clone)]
pub struct ConnectedSensorInfo {
    pub serial: String,
    pub product: String,
    pub available: bool,
    pub booted: bool,
}

/// CPU-side pixel storage for one display image.
///
/// The bridge rewrites this on every drained frame; a renderer-facing sink
/// then uploads it to whatever texture object the host uses.
#[derive(Debug, Clone, Default)]
pub struct ImageBuffer<T> {
    width: u32,
    height: u32,
    channels: u32,
    pixels: Vec<T>,
}

impl<T: Copy> ImageBuffer<T> {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn pixels(&self) -> &[T] {
        &self.pixels
    }

    pub fn is_allocated(&self) -> bool {
        !self.pixels.is_empty()
    }

    /// Replace the whole image, reusing the existing allocation when the
    /// dimensions have not changed.
    pub fn set_pixels(&mut self, pixels: &[T], width: u32, height: u32, channels: u32) {
        debug_assert_eq!(pixels.len(), (width * height * channels) as usize);
        self.width = width;
        self.height = height;
        self.channels = channels;
        self.pixels.clear();
        self.pixels.extend_from_slice(pixels);
    }
}

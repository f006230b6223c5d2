use crate::types::{DepthFrame, Frame, ImuSample, InfraredFrame, Intrinsics, VisibleFrame};
use glam::{Mat4, Vec3};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Latest-wins holder for the most recent frame of each modality.
///
/// Written by the SDK callback thread via [`deposit`](FrameMailbox::deposit),
/// read by the host's update tick via the `drain_*` methods. One mutex
/// guards every slot, dirty flag, and the cached depth intrinsics; it is
/// held only long enough to copy a frame in or out, never across texture
/// upload or projection work.
///
/// There is no queue: an undrained frame is simply overwritten by the next
/// deposit of the same modality.
pub struct FrameMailbox {
    inner: Mutex<Slots>,
}

#[derive(Default)]
struct Slots {
    depth: Option<DepthFrame>,
    infrared: Option<InfraredFrame>,
    visible: Option<VisibleFrame>,
    accelerometer: ImuSample,
    gyroscope: ImuSample,

    depth_dirty: bool,
    infrared_dirty: bool,
    visible_dirty: bool,

    // Captured from the first depth frame with valid intrinsics and then
    // treated as immutable until reset().
    intrinsics: Option<Intrinsics>,
    projection: Option<Mat4>,
}

impl Slots {
    /// Store a depth frame; returns the intrinsics if this deposit captured
    /// them, so the caller can log outside the lock.
    fn store_depth(&mut self, frame: DepthFrame) -> Option<Intrinsics> {
        let captured = if self.intrinsics.is_none() && frame.intrinsics.is_valid() {
            self.intrinsics = Some(frame.intrinsics);
            self.projection = Some(frame.projection);
            self.intrinsics
        } else {
            None
        };
        self.depth = Some(frame);
        self.depth_dirty = true;
        captured
    }
}

impl FrameMailbox {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Slots::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a frame into its modality slot and mark it dirty.
    ///
    /// Callable from the SDK callback thread; constant-time apart from the
    /// buffer move. Accelerometer and gyroscope samples have no derived
    /// artifact and therefore no dirty flag; they are simply overwritten.
    /// Sub-frames of a synchronized bundle are deposited independently, and
    /// an invalid (`None`) sub-frame leaves its slot and flag untouched.
    pub fn deposit(&self, frame: Frame) {
        let captured = match frame {
            Frame::Depth(depth) => self.lock().store_depth(depth),
            Frame::Infrared(ir) => {
                let mut slots = self.lock();
                slots.infrared = Some(ir);
                slots.infrared_dirty = true;
                None
            }
            Frame::Visible(visible) => {
                let mut slots = self.lock();
                slots.visible = Some(visible);
                slots.visible_dirty = true;
                None
            }
            Frame::Synchronized(bundle) => {
                let mut slots = self.lock();
                let mut captured = None;
                if let Some(depth) = bundle.depth {
                    captured = slots.store_depth(depth);
                }
                if let Some(visible) = bundle.visible {
                    slots.visible = Some(visible);
                    slots.visible_dirty = true;
                }
                if let Some(ir) = bundle.infrared {
                    slots.infrared = Some(ir);
                    slots.infrared_dirty = true;
                }
                captured
            }
            Frame::Accelerometer(sample) => {
                self.lock().accelerometer = sample;
                None
            }
            Frame::Gyroscope(sample) => {
                self.lock().gyroscope = sample;
                None
            }
            Frame::Unknown(tag) => {
                log::warn!("Unhandled frame type {}, dropping", tag);
                None
            }
        };

        if let Some(intr) = captured {
            log::info!(
                "Depth intrinsics captured: fx={} fy={} cx={} cy={}",
                intr.fx,
                intr.fy,
                intr.cx,
                intr.cy
            );
        }
    }

    /// True if any displayed modality has data not yet drained.
    pub fn has_new_data(&self) -> bool {
        let slots = self.lock();
        slots.depth_dirty || slots.infrared_dirty || slots.visible_dirty
    }

    /// Take the latest depth frame if one arrived since the last drain.
    ///
    /// Clears the dirty flag; a second drain without an intervening deposit
    /// returns `None`. The frame is cloned out under the lock so the caller
    /// can process it without blocking the callback thread.
    pub fn drain_depth(&self) -> Option<DepthFrame> {
        let mut slots = self.lock();
        if !slots.depth_dirty {
            return None;
        }
        slots.depth_dirty = false;
        slots.depth.clone()
    }

    /// Take the latest infrared frame if one arrived since the last drain.
    pub fn drain_infrared(&self) -> Option<InfraredFrame> {
        let mut slots = self.lock();
        if !slots.infrared_dirty {
            return None;
        }
        slots.infrared_dirty = false;
        slots.infrared.clone()
    }

    /// Take the latest visible frame if one arrived since the last drain.
    pub fn drain_visible(&self) -> Option<VisibleFrame> {
        let mut slots = self.lock();
        if !slots.visible_dirty {
            return None;
        }
        slots.visible_dirty = false;
        slots.visible.clone()
    }

    /// Latest accelerometer reading in g; zero before the first sample.
    pub fn acceleration(&self) -> Vec3 {
        self.lock().accelerometer.value
    }

    /// Latest gyroscope rotation rate in rad/s; zero before the first sample.
    pub fn rotation_rate(&self) -> Vec3 {
        self.lock().gyroscope.value
    }

    /// Depth intrinsics captured from the first valid depth frame.
    pub fn intrinsics(&self) -> Option<Intrinsics> {
        self.lock().intrinsics
    }

    /// Projection matrix captured alongside the intrinsics.
    pub fn projection(&self) -> Option<Mat4> {
        self.lock().projection
    }

    /// Clear all slots, dirty flags, and the intrinsics cache.
    pub fn reset(&self) {
        *self.lock() = Slots::default();
    }
}

impl Default for FrameMailbox {
    fn default() -> Self {
        Self::new()
    }
}

use crate::mailbox::FrameMailbox;
use crate::projector::PointCloud;
use crate::session::{CaptureSession, SessionController, SessionState};
use crate::types::{CaptureConfig, Frame, ImageBuffer, Intrinsics, SessionEvent};
use crate::Result;
use glam::{Mat4, Vec3};
use std::sync::Arc;

/// Callback registration value handed to the sensor SDK.
///
/// Cloneable and `Send`; the SDK glue calls [`on_frame`](Self::on_frame)
/// and [`on_event`](Self::on_event) from its own delivery thread.
pub struct FrameHandler<S: CaptureSession> {
    mailbox: Arc<FrameMailbox>,
    session: Arc<SessionController<S>>,
}

impl<S: CaptureSession> Clone for FrameHandler<S> {
    fn clone(&self) -> Self {
        Self {
            mailbox: Arc::clone(&self.mailbox),
            session: Arc::clone(&self.session),
        }
    }
}

impl<S: CaptureSession> FrameHandler<S> {
    pub fn on_frame(&self, frame: Frame) {
        self.mailbox.deposit(frame);
    }

    pub fn on_event(&self, event: SessionEvent) {
        self.session.handle_event(event);
    }
}

/// Sink invoked with freshly drained pixels, e.g. a texture uploader.
pub type PixelSink<T> = Box<dyn FnMut(&ImageBuffer<T>)>;

/// Sink invoked with the rebuilt point cloud, e.g. a GPU vertex-buffer
/// uploader.
pub type VertexSink = Box<dyn FnMut(&PointCloud)>;

/// Front object bridging the capture SDK to the host's render loop.
///
/// Frames and session events arrive asynchronously through the
/// [`FrameHandler`]; the host calls [`update`](Self::update) once per tick
/// to drain the mailbox, refresh the display images, and re-project the
/// point cloud. All sink work runs on the update thread with no lock held,
/// so the callback thread is never blocked behind texture or GPU uploads.
pub struct SensorBridge<S: CaptureSession> {
    mailbox: Arc<FrameMailbox>,
    session: Arc<SessionController<S>>,
    config: CaptureConfig,

    depth_image: ImageBuffer<f32>,
    infrared_image: ImageBuffer<u16>,
    visible_image: ImageBuffer<u8>,
    point_cloud: PointCloud,
    frame_new: bool,

    depth_sink: Option<PixelSink<f32>>,
    infrared_sink: Option<PixelSink<u16>>,
    visible_sink: Option<PixelSink<u8>>,
    vertex_sink: Option<VertexSink>,
}

impl<S: CaptureSession> SensorBridge<S> {
    pub fn new(session: S) -> Self {
        Self {
            mailbox: Arc::new(FrameMailbox::new()),
            session: Arc::new(SessionController::new(session)),
            config: CaptureConfig::default(),
            depth_image: ImageBuffer::default(),
            infrared_image: ImageBuffer::default(),
            visible_image: ImageBuffer::default(),
            point_cloud: PointCloud::default(),
            frame_new: false,
            depth_sink: None,
            infrared_sink: None,
            visible_sink: None,
            vertex_sink: None,
        }
    }

    /// The callback handle to register with the SDK's delegate point.
    pub fn handler(&self) -> FrameHandler<S> {
        FrameHandler {
            mailbox: Arc::clone(&self.mailbox),
            session: Arc::clone(&self.session),
        }
    }

    /// Configure the sensor and begin monitoring.
    ///
    /// Clears any frames and cached intrinsics left over from a previous
    /// session before handing the config to the SDK.
    pub fn setup(&mut self, config: CaptureConfig) -> Result<()> {
        self.mailbox.reset();
        self.config = config;
        self.session.setup(&self.config)
    }

    /// Attempt to start streaming; arms a retry on the Ready signal if the
    /// sensor is not up yet.
    pub fn start(&self) -> Result<()> {
        self.session.start()
    }

    /// Stop streaming and cancel any pending retry.
    pub fn stop(&self) {
        self.session.stop()
    }

    /// Drain new frames and refresh derived artifacts.
    ///
    /// Must be called once per render/logic tick. Each dirty modality is
    /// processed at most once: the frame is copied out of the mailbox under
    /// its lock, then pixel storage, sinks, and (for depth) the point-cloud
    /// projection run outside the lock.
    pub fn update(&mut self) {
        self.frame_new = self.mailbox.has_new_data();

        if let Some(frame) = self.mailbox.drain_depth() {
            self.depth_image
                .set_pixels(&frame.depth_mm, frame.width, frame.height, 1);
            if let Some(sink) = self.depth_sink.as_mut() {
                sink(&self.depth_image);
            }
            if let Some(intrinsics) = self.mailbox.intrinsics() {
                self.point_cloud
                    .reproject(&frame.depth_mm, frame.width, frame.height, &intrinsics);
                if let Some(sink) = self.vertex_sink.as_mut() {
                    sink(&self.point_cloud);
                }
            }
        }

        if let Some(frame) = self.mailbox.drain_infrared() {
            self.infrared_image
                .set_pixels(&frame.data, frame.width, frame.height, 1);
            if let Some(sink) = self.infrared_sink.as_mut() {
                sink(&self.infrared_image);
            }
        }

        if let Some(frame) = self.mailbox.drain_visible() {
            self.visible_image
                .set_pixels(&frame.rgb, frame.width, frame.height, 3);
            if let Some(sink) = self.visible_sink.as_mut() {
                sink(&self.visible_image);
            }
        }
    }

    /// True if the last [`update`](Self::update) drained at least one new
    /// frame.
    pub fn is_frame_new(&self) -> bool {
        self.frame_new
    }

    pub fn is_streaming(&self) -> bool {
        self.session.is_streaming()
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn serial(&self) -> String {
        self.session.serial()
    }

    pub fn depth_image(&self) -> &ImageBuffer<f32> {
        &self.depth_image
    }

    pub fn infrared_image(&self) -> &ImageBuffer<u16> {
        &self.infrared_image
    }

    pub fn visible_image(&self) -> &ImageBuffer<u8> {
        &self.visible_image
    }

    pub fn point_cloud(&self) -> &PointCloud {
        &self.point_cloud
    }

    /// Depth intrinsics captured from the first valid depth frame, if any.
    pub fn intrinsics(&self) -> Option<Intrinsics> {
        self.mailbox.intrinsics()
    }

    /// Projection matrix reported alongside the captured intrinsics.
    pub fn projection_matrix(&self) -> Option<Mat4> {
        self.mailbox.projection()
    }

    /// Latest gyroscope rotation rate in rad/s.
    pub fn rotation_rate(&self) -> Vec3 {
        self.mailbox.rotation_rate()
    }

    /// Latest accelerometer reading in g.
    pub fn acceleration(&self) -> Vec3 {
        self.mailbox.acceleration()
    }

    pub fn set_depth_sink(&mut self, sink: PixelSink<f32>) {
        self.depth_sink = Some(sink);
    }

    pub fn set_infrared_sink(&mut self, sink: PixelSink<u16>) {
        self.infrared_sink = Some(sink);
    }

    pub fn set_visible_sink(&mut self, sink: PixelSink<u8>) {
        self.visible_sink = Some(sink);
    }

    pub fn set_vertex_sink(&mut self, sink: VertexSink) {
        self.vertex_sink = Some(sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DepthFrame, InfraredFrame, SynchronizedFrames, VisibleFrame};
    use glam::Mat4;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct StubSession;

    impl CaptureSession for StubSession {
        fn start_monitoring(&mut self, _config: &CaptureConfig) -> bool {
            true
        }

        fn start_streaming(&mut self) -> bool {
            true
        }

        fn stop_streaming(&mut self) {}

        fn serial_number(&self) -> String {
            "STUB".to_string()
        }
    }

    fn depth_frame(w: u32, h: u32, fill: f32) -> DepthFrame {
        DepthFrame {
            width: w,
            height: h,
            depth_mm: vec![fill; (w * h) as usize],
            intrinsics: Intrinsics { fx: 100.0, fy: 100.0, cx: 0.5, cy: 0.0 },
            projection: Mat4::IDENTITY,
        }
    }

    #[test]
    fn update_drains_each_modality_once() {
        let mut bridge = SensorBridge::new(StubSession);
        let handler = bridge.handler();

        handler.on_frame(Frame::Depth(depth_frame(2, 1, 1000.0)));
        handler.on_frame(Frame::Visible(VisibleFrame {
            width: 1,
            height: 1,
            rgb: vec![10, 20, 30],
        }));

        bridge.update();
        assert!(bridge.is_frame_new());
        assert_eq!(bridge.depth_image().pixels(), &[1000.0, 1000.0]);
        assert_eq!(bridge.visible_image().pixels(), &[10, 20, 30]);

        // No new deposits: the next tick does nothing.
        bridge.update();
        assert!(!bridge.is_frame_new());
    }

    #[test]
    fn depth_tick_rebuilds_point_cloud_and_feeds_sinks() {
        let mut bridge = SensorBridge::new(StubSession);
        let uploads: Rc<RefCell<Vec<Vec<Vec3>>>> = Rc::new(RefCell::new(Vec::new()));
        let sink_uploads = Rc::clone(&uploads);
        bridge.set_vertex_sink(Box::new(move |cloud| {
            sink_uploads.borrow_mut().push(cloud.vertices().to_vec());
        }));

        let mut frame = depth_frame(2, 1, 0.0);
        frame.depth_mm = vec![1000.0, 2000.0];
        bridge.handler().on_frame(Frame::Depth(frame));
        bridge.update();
        bridge.update();

        let uploads = uploads.borrow();
        assert_eq!(uploads.len(), 1, "one upload per dirty tick");
        assert_eq!(uploads[0][0], Vec3::new(-5.0, 0.0, 1000.0));
        assert_eq!(uploads[0][1], Vec3::new(195.0, 0.0, 2000.0));
    }

    #[test]
    fn point_cloud_follows_resolution_changes() {
        let mut bridge = SensorBridge::new(StubSession);
        let handler = bridge.handler();

        handler.on_frame(Frame::Depth(depth_frame(4, 3, 100.0)));
        bridge.update();
        assert_eq!(bridge.point_cloud().vertices().len(), 12);

        handler.on_frame(Frame::Depth(depth_frame(2, 2, 100.0)));
        bridge.update();
        assert_eq!(bridge.point_cloud().vertices().len(), 4);
    }

    #[test]
    fn bundle_with_invalid_subframes_only_touches_depth() {
        let mut bridge = SensorBridge::new(StubSession);
        let ir_calls = Rc::new(RefCell::new(0usize));
        let sink_calls = Rc::clone(&ir_calls);
        bridge.set_infrared_sink(Box::new(move |_| {
            *sink_calls.borrow_mut() += 1;
        }));

        bridge.handler().on_frame(Frame::Synchronized(SynchronizedFrames {
            depth: Some(depth_frame(2, 1, 700.0)),
            visible: None,
            infrared: None,
        }));
        bridge.update();

        assert_eq!(bridge.depth_image().pixels(), &[700.0, 700.0]);
        assert!(!bridge.infrared_image().is_allocated());
        assert_eq!(*ir_calls.borrow(), 0);
    }

    #[test]
    fn infrared_frames_reach_their_image() {
        let mut bridge = SensorBridge::new(StubSession);
        bridge.handler().on_frame(Frame::Infrared(InfraredFrame {
            width: 2,
            height: 1,
            data: vec![512, 1024],
        }));
        bridge.update();

        assert_eq!(bridge.infrared_image().pixels(), &[512, 1024]);
        assert_eq!(bridge.infrared_image().channels(), 1);
    }

    #[test]
    fn handler_works_across_threads() {
        let mut bridge = SensorBridge::new(StubSession);
        let handler = bridge.handler();

        let worker = std::thread::spawn(move || {
            handler.on_frame(Frame::Depth(depth_frame(2, 2, 300.0)));
            handler.on_event(SessionEvent::Streaming);
        });
        worker.join().unwrap();

        bridge.update();
        assert!(bridge.is_streaming());
        assert_eq!(bridge.point_cloud().vertices().len(), 4);
    }

    #[test]
    fn setup_resets_stale_session_state() {
        let mut bridge = SensorBridge::new(StubSession);
        bridge.handler().on_frame(Frame::Depth(depth_frame(2, 1, 100.0)));
        assert!(bridge.intrinsics().is_some());

        bridge.setup(CaptureConfig::default()).unwrap();
        assert!(bridge.intrinsics().is_none());

        bridge.update();
        assert!(!bridge.is_frame_new());
    }
}

//! Drive the bridge with a scripted software sensor and print what the
//! render loop would see. Run with `RUST_LOG=debug` for the full session
//! log.

use depthbridge::{
    CaptureConfig, CaptureSession, DepthFrame, Frame, ImuSample, Intrinsics, SensorBridge,
    SessionEvent,
};
use glam::{Mat4, Vec3};
use std::time::Duration;

/// Software stand-in for the vendor SDK session: refuses the first stream
/// start so the retry-on-ready path is visible in the log.
struct ScriptedSession {
    stream_attempts: u32,
}

impl CaptureSession for ScriptedSession {
    fn start_monitoring(&mut self, _config: &CaptureConfig) -> bool {
        true
    }

    fn start_streaming(&mut self) -> bool {
        self.stream_attempts += 1;
        self.stream_attempts > 1
    }

    fn stop_streaming(&mut self) {}

    fn serial_number(&self) -> String {
        "SIM-0001".to_string()
    }
}

fn synthetic_depth(tick: u32) -> DepthFrame {
    let (width, height) = (32u32, 24u32);
    // A plane sweeping away from the camera.
    let base = 500.0 + 25.0 * tick as f32;
    DepthFrame {
        width,
        height,
        depth_mm: vec![base; (width * height) as usize],
        intrinsics: Intrinsics { fx: 280.0, fy: 280.0, cx: 16.0, cy: 12.0 },
        projection: Mat4::IDENTITY,
    }
}

fn main() {
    env_logger::init();

    let mut bridge = SensorBridge::new(ScriptedSession { stream_attempts: 0 });
    bridge.set_vertex_sink(Box::new(|cloud| {
        println!(
            "  vertex upload: {} verts ({}x{})",
            cloud.vertices().len(),
            cloud.width(),
            cloud.height()
        );
    }));

    let handler = bridge.handler();

    bridge.setup(CaptureConfig::default()).expect("monitoring");
    if bridge.start().is_err() {
        println!("stream start deferred, waiting for Ready...");
    }
    handler.on_event(SessionEvent::Ready); // sensor comes up, retry fires
    println!("streaming: {}", bridge.is_streaming());

    // Callback thread delivering frames faster than we tick.
    let producer = std::thread::spawn(move || {
        for tick in 0..30 {
            handler.on_frame(Frame::Depth(synthetic_depth(tick)));
            handler.on_frame(Frame::Gyroscope(ImuSample {
                value: Vec3::new(0.0, 0.01 * tick as f32, 0.0),
            }));
            std::thread::sleep(Duration::from_millis(5));
        }
    });

    for tick in 0..10 {
        std::thread::sleep(Duration::from_millis(16));
        bridge.update();
        if bridge.is_frame_new() {
            let center = bridge
                .point_cloud()
                .vertices()
                .get((12 * 32 + 16) as usize)
                .copied()
                .unwrap_or(Vec3::ZERO);
            println!(
                "tick {tick}: center point {:?}, gyro {:?}",
                center,
                bridge.rotation_rate()
            );
        }
    }

    producer.join().unwrap();
    bridge.stop();
    println!("stopped; state = {:?}", bridge.session_state());
}

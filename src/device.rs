use crate::types::ConnectedSensorInfo;
use std::fmt::Write;

/// Collect the serials of the given sensors, optionally logging one
/// notice with per-device detail.
///
/// The SDK glue obtains the slice from the SDK's sensor enumeration call;
/// keeping the enumeration outside makes the formatting and the quiet path
/// testable without hardware. With `verbose` false nothing is logged.
pub fn list_devices(sensors: &[ConnectedSensorInfo], verbose: bool) -> Vec<String> {
    let serials: Vec<String> = sensors.iter().map(|s| s.serial.clone()).collect();

    if verbose {
        let mut detail = String::new();
        for sensor in sensors {
            let _ = write!(
                detail,
                "\n\tserial [{}], product: {}, available: {}, booted: {}",
                sensor.serial, sensor.product, sensor.available, sensor.booted
            );
        }
        log::info!("Found {} devices: {}", serials.len(), detail);
    }

    serials
}

/// Errors surfaced by the synchronous bridge operations.
///
/// Asynchronous faults (disconnection, capture errors) are logged and
/// reflected in the streaming state instead; they never reach the caller
/// as an error value.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("sensor {serial} failed to initialize")]
    Initialization { serial: String },

    #[error("sensor {serial} did not start streaming")]
    StreamStart { serial: String },
}

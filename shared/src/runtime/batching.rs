use std::time::Duration;

/// When the ops accumulated in the current batch are emitted as a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BatchingStrategy {
    /// Every op is sent in its own message as soon as it is made
    #[default]
    Immediate,
    /// Ops are coalesced, and the batch is sent from `Runtime::update` at
    /// most once per interval
    RateLimited(Duration),
}

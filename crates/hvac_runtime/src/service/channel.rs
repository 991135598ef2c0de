//! Channel Transport
//!
//! A `ServiceBus` that hands calls to a host task over a tokio channel.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{CallError, CallResult, ServiceBus, ServiceCall};
use crate::Context;

/// A call as delivered to the host side of a `ChannelBus`
#[derive(Debug, Clone)]
pub struct DispatchedCall {
    pub call: ServiceCall,
    pub context: Context,
}

/// Bus that forwards every call onto an mpsc channel
///
/// The call counts as delivered once the host task has it queued.
#[derive(Clone)]
pub struct ChannelBus {
    tx: mpsc::Sender<DispatchedCall>,
}

impl ChannelBus {
    /// Create a bus and the receiver the host drains
    ///
    /// A `capacity` of 0 is raised to 1.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<DispatchedCall>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ServiceBus for ChannelBus {
    async fn call(&self, call: ServiceCall, context: &Context) -> CallResult {
        tracing::trace!(service = %call.qualified_name(), "Dispatching service call");
        self.tx
            .send(DispatchedCall {
                call,
                context: *context,
            })
            .await
            .map_err(|_| CallError::ChannelClosed)
    }
}

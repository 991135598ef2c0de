//! Test doubles shared by the unit tests

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use hvac_runtime::service::{CallError, CallResult, DispatchedCall, ServiceBus, ServiceCall};
use hvac_runtime::{Context, HvacAction, HvacGoal};
use parking_lot::Mutex;

use crate::environment::{Environment, TargetAttr};
use crate::power::DemandSource;

/// Bus that records every call and can fail calls by domain
#[derive(Default)]
pub(crate) struct RecordingBus {
    calls: Mutex<Vec<DispatchedCall>>,
    failures: Mutex<HashMap<String, CallError>>,
}

impl RecordingBus {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn fail_domain(&self, domain: &str, error: CallError) {
        self.failures.lock().insert(domain.to_string(), error);
    }

    pub(crate) fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().iter().map(|d| d.call.clone()).collect()
    }

    pub(crate) fn services(&self) -> Vec<String> {
        self.calls.lock().iter().map(|d| d.call.qualified_name()).collect()
    }

    pub(crate) fn contexts(&self) -> Vec<Context> {
        self.calls.lock().iter().map(|d| d.context).collect()
    }

    pub(crate) fn clear(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl ServiceBus for RecordingBus {
    async fn call(&self, call: ServiceCall, context: &Context) -> CallResult {
        let failure = self.failures.lock().get(&call.domain).cloned();
        self.calls.lock().push(DispatchedCall {
            call,
            context: *context,
        });
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Demand source returning a fixed percentage and recording update actions
pub(crate) struct FixedDemand {
    pub(crate) percent: f64,
    pub(crate) updates: Arc<Mutex<Vec<HvacAction>>>,
}

impl FixedDemand {
    pub(crate) fn new(percent: f64) -> (Self, Arc<Mutex<Vec<HvacAction>>>) {
        let updates = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                percent,
                updates: Arc::clone(&updates),
            },
            updates,
        )
    }
}

impl DemandSource for FixedDemand {
    fn update_demand(
        &mut self,
        _goal: Option<HvacGoal>,
        _target: TargetAttr,
        action: HvacAction,
        _environment: &Environment,
    ) {
        self.updates.lock().push(action);
    }

    fn demand_percent(&self) -> f64 {
        self.percent
    }
}

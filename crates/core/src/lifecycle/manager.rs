use std::sync::{Arc, Mutex};

use crate::container::injector::lock;
use crate::errors::{BoxError, LifeCycleError};

/// A service whose start and stop are driven by the [`LifeCycleManager`]
pub trait Managed: Send + Sync {
    /// Called once after the object graph is constructed
    fn start(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Called once at shutdown, in reverse start order
    fn stop(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Lifecycle manager states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeCycleState {
    Idle,
    Starting,
    Started,
    Stopping,
    Stopped,
}

impl LifeCycleState {
    fn as_str(self) -> &'static str {
        match self {
            LifeCycleState::Idle => "idle",
            LifeCycleState::Starting => "starting",
            LifeCycleState::Started => "started",
            LifeCycleState::Stopping => "stopping",
            LifeCycleState::Stopped => "stopped",
        }
    }
}

struct ManagedService {
    name: String,
    instance: Arc<dyn Managed>,
}

/// Starts managed services in registration order and stops them in reverse
pub struct LifeCycleManager {
    services: Mutex<Vec<ManagedService>>,
    state: Mutex<LifeCycleState>,
}

impl std::fmt::Debug for LifeCycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifeCycleManager")
            .field("services_count", &self.size())
            .field("state", &self.state())
            .finish()
    }
}

impl LifeCycleManager {
    /// Create a new lifecycle manager
    pub fn new() -> Self {
        Self {
            services: Mutex::new(Vec::new()),
            state: Mutex::new(LifeCycleState::Idle),
        }
    }

    pub fn state(&self) -> LifeCycleState {
        *lock(&self.state)
    }

    /// Number of managed services
    pub fn size(&self) -> usize {
        lock(&self.services).len()
    }

    /// Register a service; only allowed before `start`
    pub fn add_instance(
        &self,
        name: impl Into<String>,
        instance: Arc<dyn Managed>,
    ) -> Result<(), LifeCycleError> {
        self.expect_state(LifeCycleState::Idle)?;
        lock(&self.services).push(ManagedService {
            name: name.into(),
            instance,
        });
        Ok(())
    }

    /// Start every service in registration order. The first failure stops
    /// the services already started and is returned.
    pub fn start(&self) -> Result<(), LifeCycleError> {
        self.transition(LifeCycleState::Idle, LifeCycleState::Starting)?;

        let services = self.snapshot();
        for (index, (name, instance)) in services.iter().enumerate() {
            tracing::debug!("Starting {}", name);
            if let Err(source) = instance.start() {
                tracing::error!("Failed to start {}: {}", name, source);
                stop_all(&services[..index]);
                *lock(&self.state) = LifeCycleState::Stopped;
                return Err(LifeCycleError::StartFailed {
                    service: name.clone(),
                    source,
                });
            }
        }

        *lock(&self.state) = LifeCycleState::Started;
        tracing::info!("Life cycle started with {} service(s)", services.len());
        Ok(())
    }

    /// Stop every service in reverse order. Stopping continues past
    /// failures, which are returned together. Stopping a manager that was
    /// never started only marks it stopped.
    pub fn stop(&self) -> Result<(), LifeCycleError> {
        let previous = {
            let mut state = lock(&self.state);
            let previous = *state;
            match previous {
                LifeCycleState::Stopping | LifeCycleState::Stopped => return Ok(()),
                LifeCycleState::Starting => {
                    return Err(LifeCycleError::InvalidState {
                        expected: LifeCycleState::Started.as_str(),
                        actual: previous.as_str(),
                    })
                }
                LifeCycleState::Idle | LifeCycleState::Started => *state = LifeCycleState::Stopping,
            }
            previous
        };

        let failures = if previous == LifeCycleState::Started {
            stop_all(&self.snapshot())
        } else {
            Vec::new()
        };

        *lock(&self.state) = LifeCycleState::Stopped;
        if failures.is_empty() {
            tracing::info!("Life cycle stopped");
            Ok(())
        } else {
            Err(LifeCycleError::StopFailed { failures })
        }
    }

    fn snapshot(&self) -> Vec<(String, Arc<dyn Managed>)> {
        lock(&self.services)
            .iter()
            .map(|service| (service.name.clone(), service.instance.clone()))
            .collect()
    }

    fn expect_state(&self, expected: LifeCycleState) -> Result<(), LifeCycleError> {
        let actual = self.state();
        if actual == expected {
            Ok(())
        } else {
            Err(LifeCycleError::InvalidState {
                expected: expected.as_str(),
                actual: actual.as_str(),
            })
        }
    }

    fn transition(&self, from: LifeCycleState, to: LifeCycleState) -> Result<(), LifeCycleError> {
        let mut state = lock(&self.state);
        if *state != from {
            return Err(LifeCycleError::InvalidState {
                expected: from.as_str(),
                actual: state.as_str(),
            });
        }
        *state = to;
        Ok(())
    }
}

impl Default for LifeCycleManager {
    fn default() -> Self {
        Self::new()
    }
}

fn stop_all(services: &[(String, Arc<dyn Managed>)]) -> Vec<(String, String)> {
    let mut failures = Vec::new();
    for (name, instance) in services.iter().rev() {
        tracing::debug!("Stopping {}", name);
        if let Err(error) = instance.stop() {
            tracing::error!("Failed to stop {}: {}", name, error);
            failures.push((name.clone(), error.to_string()));
        }
    }
    failures
}

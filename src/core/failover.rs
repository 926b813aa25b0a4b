//! Endpoint failover state machine
//!
//! Models the retry policy of the acquisition coordinator independently of
//! the HTTP layer: `Pending` walks the ordered endpoint list, `Success`
//! records the winning endpoint, `Exhausted` carries every attempt with its
//! error string. Endpoints are never retried within one acquisition.

use crate::core::error::EndpointFailure;

/// State of one acquisition's walk over the ordered endpoint list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailoverState {
    /// `next` is the endpoint to try; `remaining` follow it in order
    Pending {
        next: String,
        remaining: Vec<String>,
        attempts: Vec<EndpointFailure>,
    },

    /// An endpoint answered; failures before it are kept for logging
    Success {
        endpoint: String,
        attempts: Vec<EndpointFailure>,
    },

    /// Every endpoint failed
    Exhausted { attempts: Vec<EndpointFailure> },
}

impl FailoverState {
    /// Start a walk over `endpoints`; an empty list is immediately exhausted
    pub fn start(endpoints: Vec<String>) -> Self {
        let mut queue = std::collections::VecDeque::from(endpoints);
        match queue.pop_front() {
            Some(next) => FailoverState::Pending {
                next,
                remaining: queue.into(),
                attempts: Vec::new(),
            },
            None => FailoverState::Exhausted {
                attempts: Vec::new(),
            },
        }
    }

    /// Endpoint to try now, if any
    pub fn current(&self) -> Option<&str> {
        match self {
            FailoverState::Pending { next, .. } => Some(next),
            _ => None,
        }
    }

    /// Record a failure for the current endpoint and advance
    pub fn fail(self, error: impl Into<String>) -> Self {
        match self {
            FailoverState::Pending {
                next,
                mut remaining,
                mut attempts,
            } => {
                attempts.push(EndpointFailure {
                    endpoint: next,
                    error: error.into(),
                });
                if remaining.is_empty() {
                    FailoverState::Exhausted { attempts }
                } else {
                    let next = remaining.remove(0);
                    FailoverState::Pending {
                        next,
                        remaining,
                        attempts,
                    }
                }
            }
            done => done,
        }
    }

    /// Mark the current endpoint as the winner; later endpoints are dropped
    pub fn succeed(self) -> Self {
        match self {
            FailoverState::Pending { next, attempts, .. } => FailoverState::Success {
                endpoint: next,
                attempts,
            },
            done => done,
        }
    }

    /// Ordered attempts recorded so far
    pub fn attempts(&self) -> &[EndpointFailure] {
        match self {
            FailoverState::Pending { attempts, .. } => attempts,
            FailoverState::Success { attempts, .. } => attempts,
            FailoverState::Exhausted { attempts } => attempts,
        }
    }

    /// Consume the state, returning the ordered attempts
    pub fn into_attempts(self) -> Vec<EndpointFailure> {
        match self {
            FailoverState::Pending { attempts, .. } => attempts,
            FailoverState::Success { attempts, .. } => attempts,
            FailoverState::Exhausted { attempts } => attempts,
        }
    }
}

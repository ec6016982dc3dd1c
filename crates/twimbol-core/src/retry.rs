//! Refresh-and-retry state machine for a single logical request.
//!
//! The machine holds no I/O. The HTTP client feeds it events (request sent,
//! response status, refresh outcome) and performs whatever [`Step`] it
//! returns. This keeps the "at most one retry" rule checkable without a
//! network stack.
//!
//! ```text
//! Initial --begin--> Sent --non-401 / exempt--> Done
//!                     |
//!                     +--401--> NeedsRefresh --refresh failed--> Done (session cleared)
//!                                    |
//!                                    +--refreshed--> Sent(retried) --any--> RetriedDone
//! ```

use http::StatusCode;
use tracing::debug;

use crate::types::ApiPath;

/// Paths that must never trigger a refresh when they answer 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    login_path: ApiPath,
    refresh_path: ApiPath,
}

impl RetryPolicy {
    pub fn new(login_path: ApiPath, refresh_path: ApiPath) -> Self {
        Self {
            login_path,
            refresh_path,
        }
    }

    pub fn login_path(&self) -> &ApiPath {
        &self.login_path
    }

    pub fn refresh_path(&self) -> &ApiPath {
        &self.refresh_path
    }

    /// Returns true if a 401 on `path` must be returned as-is.
    pub fn is_exempt(&self, path: &ApiPath) -> bool {
        path.matches(&self.login_path) || path.matches(&self.refresh_path)
    }

    /// Starts tracking a logical request to `path`.
    pub fn track(&self, path: &ApiPath) -> RetryMachine {
        RetryMachine::new(self.is_exempt(path))
    }
}

/// Where a logical request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Constructed, not yet transmitted.
    Initial,
    /// Transmitted and awaiting a response.
    Sent { retried: bool },
    /// Received a retryable 401; a refresh is pending.
    NeedsRefresh,
    /// Terminal without a retry.
    Done,
    /// Terminal after exactly one retry.
    RetriedDone,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestState::Done | RequestState::RetriedDone)
    }
}

/// What the driver must do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Hand the most recent response to the caller.
    Return,
    /// Run the refresh procedure, then report its outcome.
    Refresh,
    /// Retransmit the original request with the new access token.
    Retry,
    /// Clear the session and hand the original 401 to the caller.
    ClearSession,
}

/// Per-request retry state.
///
/// Events arriving in a state that does not expect them leave the state
/// unchanged and yield [`Step::Return`].
#[derive(Debug, Clone)]
pub struct RetryMachine {
    state: RequestState,
    exempt: bool,
    transmissions: u8,
}

impl RetryMachine {
    /// `exempt` marks requests to the login or refresh endpoints.
    pub fn new(exempt: bool) -> Self {
        Self {
            state: RequestState::Initial,
            exempt,
            transmissions: 0,
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Number of times the request has been put on the wire.
    pub fn transmissions(&self) -> u8 {
        self.transmissions
    }

    /// Records the initial transmission.
    pub fn begin(&mut self) {
        if self.state == RequestState::Initial {
            self.state = RequestState::Sent { retried: false };
            self.transmissions += 1;
        }
    }

    /// Records the status of the latest transmission.
    pub fn on_response(&mut self, status: StatusCode) -> Step {
        let step = match self.state {
            RequestState::Sent { retried: true } => {
                self.state = RequestState::RetriedDone;
                Step::Return
            }
            RequestState::Sent { retried: false } => {
                if status != StatusCode::UNAUTHORIZED || self.exempt {
                    self.state = RequestState::Done;
                    Step::Return
                } else {
                    self.state = RequestState::NeedsRefresh;
                    Step::Refresh
                }
            }
            _ => Step::Return,
        };
        debug!(status = status.as_u16(), state = ?self.state, ?step, "response observed");
        step
    }

    /// Records the outcome of the refresh procedure.
    pub fn on_refresh(&mut self, refreshed: bool) -> Step {
        if self.state != RequestState::NeedsRefresh {
            return Step::Return;
        }
        if refreshed {
            self.state = RequestState::Sent { retried: true };
            self.transmissions += 1;
            Step::Retry
        } else {
            self.state = RequestState::Done;
            Step::ClearSession
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(
            ApiPath::new("/user/login/").unwrap(),
            ApiPath::new("/api/token/refresh").unwrap(),
        )
    }

    fn path(s: &str) -> ApiPath {
        ApiPath::new(s).unwrap()
    }

    #[test]
    fn success_is_returned_directly() {
        let mut m = policy().track(&path("/api/reels/"));
        m.begin();
        assert_eq!(m.on_response(StatusCode::OK), Step::Return);
        assert_eq!(m.state(), RequestState::Done);
        assert_eq!(m.transmissions(), 1);
    }

    #[test]
    fn other_errors_pass_through() {
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::FORBIDDEN,
            StatusCode::NOT_FOUND,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            let mut m = policy().track(&path("/api/posts/"));
            m.begin();
            assert_eq!(m.on_response(status), Step::Return);
            assert!(m.state().is_terminal());
        }
    }

    #[test]
    fn unauthorized_requests_refresh_then_retry_once() {
        let mut m = policy().track(&path("/feed"));
        m.begin();
        assert_eq!(m.on_response(StatusCode::UNAUTHORIZED), Step::Refresh);
        assert_eq!(m.state(), RequestState::NeedsRefresh);
        assert_eq!(m.on_refresh(true), Step::Retry);
        assert_eq!(m.state(), RequestState::Sent { retried: true });
        assert_eq!(m.on_response(StatusCode::OK), Step::Return);
        assert_eq!(m.state(), RequestState::RetriedDone);
        assert_eq!(m.transmissions(), 2);
    }

    #[test]
    fn second_unauthorized_is_terminal() {
        let mut m = policy().track(&path("/feed"));
        m.begin();
        m.on_response(StatusCode::UNAUTHORIZED);
        m.on_refresh(true);
        assert_eq!(m.on_response(StatusCode::UNAUTHORIZED), Step::Return);
        assert_eq!(m.state(), RequestState::RetriedDone);

        // Nothing moves a terminal machine.
        assert_eq!(m.on_response(StatusCode::UNAUTHORIZED), Step::Return);
        assert_eq!(m.on_refresh(true), Step::Return);
        assert_eq!(m.transmissions(), 2);
    }

    #[test]
    fn failed_refresh_clears_session() {
        let mut m = policy().track(&path("/feed"));
        m.begin();
        m.on_response(StatusCode::UNAUTHORIZED);
        assert_eq!(m.on_refresh(false), Step::ClearSession);
        assert_eq!(m.state(), RequestState::Done);
        assert_eq!(m.transmissions(), 1);
    }

    #[test]
    fn login_and_refresh_paths_are_exempt() {
        let policy = policy();
        for p in ["/user/login/", "/user/login", "/api/token/refresh/", "/api/token/refresh"] {
            let mut m = policy.track(&path(p));
            m.begin();
            assert_eq!(m.on_response(StatusCode::UNAUTHORIZED), Step::Return, "{p}");
            assert_eq!(m.state(), RequestState::Done);
        }
    }

    #[test]
    fn refresh_before_response_is_ignored() {
        let mut m = policy().track(&path("/feed"));
        assert_eq!(m.on_refresh(true), Step::Return);
        assert_eq!(m.state(), RequestState::Initial);
        m.begin();
        m.begin();
        assert_eq!(m.transmissions(), 1);
    }
}

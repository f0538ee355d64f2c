//! Manager-wide status report.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use herald_types::response::{Response, ResponseCode};

use crate::session::{Session, SessionReport};

#[derive(Debug, Clone, Serialize)]
pub struct ManagerReport {
    pub users: usize,
    pub sessions: usize,
    pub average_commands: f64,
    pub details: Vec<SessionReport>,
}

impl ManagerReport {
    pub fn collect(sessions: &[Arc<Session>]) -> Self {
        let details: Vec<SessionReport> = sessions.iter().map(|s| s.report()).collect();
        let users = details
            .iter()
            .map(|r| r.username.as_str())
            .collect::<HashSet<_>>()
            .len();
        let total: usize = details.iter().map(|r| r.commands).sum();
        let average_commands = if details.is_empty() {
            0.0
        } else {
            total as f64 / details.len() as f64
        };
        Self {
            users,
            sessions: details.len(),
            average_commands,
            details,
        }
    }

    pub fn into_response(self) -> Response {
        let text = format!(
            "{} users, {} sessions, {:.2} commands per session",
            self.users, self.sessions, self.average_commands
        );
        let details = serde_json::to_value(&self.details).unwrap_or_default();
        Response::success(ResponseCode::SessionReportingSuccessful.as_str(), text)
            .with_extra("users", self.users)
            .with_extra("sessions", self.sessions)
            .with_extra("average_commands", self.average_commands)
            .with_extra("details", details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report() {
        let resp = ManagerReport::collect(&[]).into_response();
        let json = resp.to_json();
        assert_eq!(json["data"]["id"], "SESSION_REPORTING_SUCCESSFUL");
        assert_eq!(json["data"]["sessions"], 0);
        assert_eq!(json["data"]["average_commands"], 0.0);
        assert_eq!(json["data"]["text"], "0 users, 0 sessions, 0.00 commands per session");
    }
}

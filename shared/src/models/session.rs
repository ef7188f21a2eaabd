//! Dining Session Model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dining session status
///
/// `Active` and `Pending` are live: a table hosts at most one live session.
/// `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
pub enum SessionStatus {
    Active,
    Pending,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Pending => "pending",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the session still occupies its table
    pub fn is_live(&self) -> bool {
        matches!(self, SessionStatus::Active | SessionStatus::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_live()
    }

    /// Allowed next states
    ///
    /// | current | allowed next |
    /// |---|---|
    /// | active | pending, cancelled |
    /// | pending | completed, cancelled |
    /// | completed | - |
    /// | cancelled | - |
    pub fn allowed_next(&self) -> &'static [SessionStatus] {
        match self {
            SessionStatus::Active => &[SessionStatus::Pending, SessionStatus::Cancelled],
            SessionStatus::Pending => &[SessionStatus::Completed, SessionStatus::Cancelled],
            SessionStatus::Completed | SessionStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        self.allowed_next().contains(&next)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(SessionStatus::Active),
            "pending" => Ok(SessionStatus::Pending),
            "completed" => Ok(SessionStatus::Completed),
            "cancelled" => Ok(SessionStatus::Cancelled),
            other => Err(format!("unknown session status: {other}")),
        }
    }
}

/// Dining session entity: one party's occupancy of a table
///
/// Invariant: `completed_at` is set if and only if `status == Completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Session {
    pub id: i64,
    pub table_id: i64,
    pub status: SessionStatus,
    /// Unix millis
    pub created_at: i64,
    /// Unix millis, only for completed sessions
    pub completed_at: Option<i64>,
}

/// Reservation payload handed to the session repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReserve {
    pub id: i64,
    pub table_id: i64,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        use SessionStatus::*;
        assert!(Active.can_transition_to(Pending));
        assert!(Active.can_transition_to(Cancelled));
        assert!(!Active.can_transition_to(Completed));
        assert!(!Active.can_transition_to(Active));

        assert!(Pending.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Active));

        for next in [Active, Pending, Completed, Cancelled] {
            assert!(!Completed.can_transition_to(next));
            assert!(!Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn test_live_states() {
        assert!(SessionStatus::Active.is_live());
        assert!(SessionStatus::Pending.is_live());
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_parse_and_serde() {
        assert_eq!("Pending".parse::<SessionStatus>(), Ok(SessionStatus::Pending));
        assert!("seated".parse::<SessionStatus>().is_err());
        let json = serde_json::to_string(&SessionStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamStatus {
    NotStarted,
    InProgress,
    Completed,
    Terminated,
    /// Reserved. Nothing transitions into it.
    Expired,
}

impl ExamStatus {
    pub const ALL: [ExamStatus; 5] = [
        ExamStatus::NotStarted,
        ExamStatus::InProgress,
        ExamStatus::Completed,
        ExamStatus::Terminated,
        ExamStatus::Expired,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExamStatus::NotStarted => "not_started",
            ExamStatus::InProgress => "in_progress",
            ExamStatus::Completed => "completed",
            ExamStatus::Terminated => "terminated",
            ExamStatus::Expired => "expired",
        }
    }

    /// The session state machine. Staying in place is always allowed.
    pub fn can_transition_to(self, next: ExamStatus) -> bool {
        use ExamStatus::*;
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (NotStarted, InProgress)
                | (InProgress, Completed)
                | (InProgress, Terminated)
                | (InProgress, NotStarted)
                | (Completed, InProgress)
                | (Completed, NotStarted)
                | (Terminated, NotStarted)
                | (Expired, NotStarted)
        )
    }
}

impl fmt::Display for ExamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExamStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExamStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::BadRequest(format!("Unknown exam status '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::ExamStatus::*;
    use super::*;

    #[test]
    fn happy_path_transitions_are_allowed() {
        assert!(NotStarted.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Terminated));
        assert!(Terminated.can_transition_to(NotStarted));
        assert!(Completed.can_transition_to(InProgress));
    }

    #[test]
    fn shortcuts_are_rejected() {
        assert!(!NotStarted.can_transition_to(Completed));
        assert!(!NotStarted.can_transition_to(Terminated));
        assert!(!Terminated.can_transition_to(InProgress));
        assert!(!Terminated.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Terminated));
        for status in ExamStatus::ALL {
            if status != Expired {
                assert!(!status.can_transition_to(Expired));
            }
        }
    }

    #[test]
    fn round_trips_through_strings() {
        for status in ExamStatus::ALL {
            assert_eq!(status.as_str().parse::<ExamStatus>().unwrap(), status);
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// One of the three scored components of the exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamModule {
    Listening,
    Reading,
    Writing,
}

impl ExamModule {
    pub const ALL: [ExamModule; 3] = [ExamModule::Listening, ExamModule::Reading, ExamModule::Writing];

    pub fn as_str(self) -> &'static str {
        match self {
            ExamModule::Listening => "listening",
            ExamModule::Reading => "reading",
            ExamModule::Writing => "writing",
        }
    }

    /// Listening and reading are graded per question; writing is not.
    pub fn is_objective(self) -> bool {
        !matches!(self, ExamModule::Writing)
    }
}

impl fmt::Display for ExamModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExamModule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "listening" => Ok(ExamModule::Listening),
            "reading" => Ok(ExamModule::Reading),
            "writing" => Ok(ExamModule::Writing),
            other => Err(Error::BadRequest(format!("Unknown exam module '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_modules_case_insensitively() {
        assert_eq!("Listening".parse::<ExamModule>().unwrap(), ExamModule::Listening);
        assert_eq!(" writing ".parse::<ExamModule>().unwrap(), ExamModule::Writing);
        assert!("speaking".parse::<ExamModule>().is_err());
    }
}

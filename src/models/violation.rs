use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Integrity events the exam client reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    TabSwitch,
    FullscreenExit,
    WindowBlur,
    CopyPaste,
    RightClick,
    DevTools,
}

impl ViolationType {
    pub fn as_str(self) -> &'static str {
        match self {
            ViolationType::TabSwitch => "tab_switch",
            ViolationType::FullscreenExit => "fullscreen_exit",
            ViolationType::WindowBlur => "window_blur",
            ViolationType::CopyPaste => "copy_paste",
            ViolationType::RightClick => "right_click",
            ViolationType::DevTools => "dev_tools",
        }
    }
}

impl fmt::Display for ViolationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationAction {
    Warning,
    Deduction,
    Terminated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationEntry {
    pub violation_type: ViolationType,
    pub occurred_at: DateTime<Utc>,
    /// Occurrence number of this type, starting at 1.
    pub count: u32,
    pub action: ViolationAction,
}

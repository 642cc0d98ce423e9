//! Node status display.
//!
//! Analog inputs use the debounced [`StatusDisplay`] state machine:
//!
//! ```text
//!            sample               debounce elapsed
//!   ──────► Active ("Altered") ──────────────────► Idle ("Settled")
//!             ▲  │ sample: restart debounce
//!             └──┘
//!   Error ("Error")   sticky; re-entering shows nothing new
//!   Undefined         display cleared (node closed)
//! ```
//!
//! Digital channels show their boolean state directly.

use serde::Serialize;

/// Indicator colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFill {
    /// Green.
    Green,
    /// Grey.
    Grey,
    /// Red.
    Red,
}

/// Indicator shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusShape {
    /// Filled dot.
    Dot,
    /// Hollow ring.
    Ring,
}

/// One rendered status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeStatus {
    /// Colour.
    pub fill: StatusFill,
    /// Shape.
    pub shape: StatusShape,
    /// Label.
    pub text: String,
}

impl NodeStatus {
    /// Build a status.
    pub fn new(fill: StatusFill, shape: StatusShape, text: impl Into<String>) -> Self {
        Self {
            fill,
            shape,
            text: text.into(),
        }
    }

    /// Two-value display of a boolean channel: `"1"` in `on_fill`, `"0"` grey.
    pub fn binary(state: bool, on_fill: StatusFill) -> Self {
        if state {
            Self::new(on_fill, StatusShape::Dot, "1")
        } else {
            Self::new(StatusFill::Grey, StatusShape::Dot, "0")
        }
    }
}

/// Display state of an analog node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusState {
    /// Nothing shown.
    Undefined,
    /// No new data within the debounce period.
    Idle,
    /// Data published recently.
    Active,
    /// Configuration or setup failed.
    Error,
}

/// What the debounce timer must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Debounce {
    /// Leave it alone.
    Keep,
    /// Cancel any pending timer and arm a new one tagged `instance`.
    Restart {
        /// Tag the timer must carry back.
        instance: u64,
    },
    /// Cancel any pending timer.
    Cancel,
}

/// Result of one state-machine step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// `Some(None)` clears the display, `Some(Some(..))` renders, `None`
    /// leaves it unchanged.
    pub render: Option<Option<NodeStatus>>,
    /// Debounce timer action.
    pub debounce: Debounce,
}

impl Transition {
    const NONE: Self = Self {
        render: None,
        debounce: Debounce::Keep,
    };
}

/// Debounced status display of an analog node.
#[derive(Debug, Clone)]
pub struct StatusDisplay {
    state: StatusState,
    next_instance: u64,
}

impl StatusDisplay {
    /// Display in `Undefined` state.
    pub fn new() -> Self {
        Self {
            state: StatusState::Undefined,
            next_instance: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> StatusState {
        self.state
    }

    /// Enter `target`.
    pub fn enter(&mut self, target: StatusState) -> Transition {
        let changed = self.state != target;
        self.state = target;

        match target {
            StatusState::Active => {
                let instance = self.next_instance;
                self.next_instance += 1;
                Transition {
                    render: Some(Some(NodeStatus::new(
                        StatusFill::Green,
                        StatusShape::Dot,
                        "Altered",
                    ))),
                    debounce: Debounce::Restart { instance },
                }
            }
            StatusState::Error if changed => Transition {
                render: Some(Some(NodeStatus::new(
                    StatusFill::Red,
                    StatusShape::Dot,
                    "Error",
                ))),
                debounce: Debounce::Cancel,
            },
            StatusState::Idle if changed => Transition {
                render: Some(Some(NodeStatus::new(
                    StatusFill::Grey,
                    StatusShape::Dot,
                    "Settled",
                ))),
                debounce: Debounce::Keep,
            },
            StatusState::Undefined => Transition {
                render: Some(None),
                debounce: Debounce::Cancel,
            },
            StatusState::Error | StatusState::Idle => Transition::NONE,
        }
    }

    /// Debounce timer tagged `instance` elapsed.
    ///
    /// Only the most recently armed timer moves `Active` to `Idle`.
    pub fn debounce_elapsed(&mut self, instance: u64) -> Transition {
        let latest = self.next_instance.checked_sub(1);
        if self.state == StatusState::Active && latest == Some(instance) {
            self.enter(StatusState::Idle)
        } else {
            Transition::NONE
        }
    }
}

impl Default for StatusDisplay {
    fn default() -> Self {
        Self::new()
    }
}

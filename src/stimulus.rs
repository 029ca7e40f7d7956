use serde::{Deserialize, Serialize};

/// The three kinds of stimulus a round can present
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
pub enum StimulusKind {
    /// tap the lit cell
    Go,
    /// withhold any tap
    NoGo,
    /// tap the centre cell wherever the stimulus appears
    Displaced,
}

impl StimulusKind {
    pub const ALL: [StimulusKind; 3] = [StimulusKind::Go, StimulusKind::NoGo, StimulusKind::Displaced];

    pub fn index(self) -> usize {
        match self {
            StimulusKind::Go => 0,
            StimulusKind::NoGo => 1,
            StimulusKind::Displaced => 2,
        }
    }

    /// Map a uniform draw in `[0, 1)` onto the 50/25/25 kind distribution
    pub fn from_draw(draw: f64) -> Self {
        if draw < 0.5 {
            StimulusKind::Go
        } else if draw < 0.75 {
            StimulusKind::NoGo
        } else {
            StimulusKind::Displaced
        }
    }

    /// Stable lowercase tag used in the stats database and CSV export
    pub fn as_tag(self) -> &'static str {
        match self {
            StimulusKind::Go => "go",
            StimulusKind::NoGo => "nogo",
            StimulusKind::Displaced => "displaced",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "go" => Some(StimulusKind::Go),
            "nogo" => Some(StimulusKind::NoGo),
            "displaced" => Some(StimulusKind::Displaced),
            _ => None,
        }
    }
}

/// Descriptor of an armed round handed to the renderer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stimulus {
    pub target_cell: usize,
    pub kind: StimulusKind,
    pub forbidden_cells: Vec<usize>,
}

impl Stimulus {
    pub fn new(target_cell: usize, kind: StimulusKind) -> Self {
        let forbidden_cells = match kind {
            StimulusKind::NoGo => vec![target_cell],
            StimulusKind::Go | StimulusKind::Displaced => vec![],
        };
        Self {
            target_cell,
            kind,
            forbidden_cells,
        }
    }

    pub fn is_forbidden(&self, cell: usize) -> bool {
        self.forbidden_cells.contains(&cell)
    }
}

/// Why a response was scored the way it was
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum Reason {
    AlreadyResolved,
    ForbiddenClicked,
    GoHit,
    GoMiss,
    NoGoAnyClick,
    NoGoWithheld,
    DisplacedHit,
    DisplacedMiss,
    TimedOut,
}

/// Classification returned to the presentation layer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Response {
    pub correct: bool,
    pub reason: Reason,
}

impl Response {
    pub fn already_resolved() -> Self {
        Self {
            correct: false,
            reason: Reason::AlreadyResolved,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Correct,
    Incorrect,
}

/// One resolved round. `reaction_ms` is `None` when no tap happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub kind: StimulusKind,
    pub outcome: Outcome,
    pub reaction_ms: Option<u64>,
}

impl TrialRecord {
    pub fn is_correct(&self) -> bool {
        self.outcome == Outcome::Correct
    }
}

/// Score a tap against the armed stimulus.
///
/// Forbidden cells take precedence over every kind rule. A NoGo round is wrong for
/// any tap at all, forbidden or not.
pub fn classify(stimulus: &Stimulus, clicked_cell: usize, center_cell: usize) -> Response {
    if stimulus.is_forbidden(clicked_cell) {
        return Response {
            correct: false,
            reason: Reason::ForbiddenClicked,
        };
    }

    match stimulus.kind {
        StimulusKind::Go if clicked_cell == stimulus.target_cell => Response {
            correct: true,
            reason: Reason::GoHit,
        },
        StimulusKind::Go => Response {
            correct: false,
            reason: Reason::GoMiss,
        },
        StimulusKind::NoGo => Response {
            correct: false,
            reason: Reason::NoGoAnyClick,
        },
        StimulusKind::Displaced if clicked_cell == center_cell => Response {
            correct: true,
            reason: Reason::DisplacedHit,
        },
        StimulusKind::Displaced => Response {
            correct: false,
            reason: Reason::DisplacedMiss,
        },
    }
}

/// Score the absence of a tap once the round's time is up
pub fn classify_timeout(kind: StimulusKind) -> Response {
    match kind {
        StimulusKind::NoGo => Response {
            correct: true,
            reason: Reason::NoGoWithheld,
        },
        StimulusKind::Go | StimulusKind::Displaced => Response {
            correct: false,
            reason: Reason::TimedOut,
        },
    }
}

//! Onboarding step sequence, a fixed and totally ordered list of stages.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The stages of the onboarding dialogue.
///
/// Progresses linearly: Greeting → Region → Name → Studies → Skills →
/// Certifications → Location → Budget → WorkPreferences → Goal →
/// AcademicEvents → Inventory → Trade → Lifestyle → Complete.
///
/// A turn request carries the step whose data the message provides. Once the
/// turn is processed that step names what was just collected, and the next
/// question is looked up from the successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Step {
    #[default]
    Greeting,
    Region,
    Name,
    Studies,
    Skills,
    Certifications,
    Location,
    Budget,
    WorkPreferences,
    Goal,
    AcademicEvents,
    Inventory,
    Trade,
    Lifestyle,
    Complete,
}

impl Step {
    /// Every step, in order.
    pub const ALL: [Step; 15] = [
        Step::Greeting,
        Step::Region,
        Step::Name,
        Step::Studies,
        Step::Skills,
        Step::Certifications,
        Step::Location,
        Step::Budget,
        Step::WorkPreferences,
        Step::Goal,
        Step::AcademicEvents,
        Step::Inventory,
        Step::Trade,
        Step::Lifestyle,
        Step::Complete,
    ];

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Region => "region",
            Self::Name => "name",
            Self::Studies => "studies",
            Self::Skills => "skills",
            Self::Certifications => "certifications",
            Self::Location => "location",
            Self::Budget => "budget",
            Self::WorkPreferences => "work_preferences",
            Self::Goal => "goal",
            Self::AcademicEvents => "academic_events",
            Self::Inventory => "inventory",
            Self::Trade => "trade",
            Self::Lifestyle => "lifestyle",
            Self::Complete => "complete",
        }
    }

    /// Parse a wire name, treating anything unrecognized as `Complete`.
    ///
    /// An unknown step moves the dialogue forward to the terminal state
    /// rather than restarting it.
    pub fn parse_lenient(raw: &str) -> Step {
        raw.parse().unwrap_or_else(|_| {
            tracing::warn!(step = raw, "Unrecognized onboarding step, treating as complete");
            Step::Complete
        })
    }

    /// Whether this step is terminal (onboarding is done).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// The successor in the fixed sequence. `Complete` is its own successor.
    pub fn next(&self) -> Step {
        let idx = self.index();
        Self::ALL.get(idx + 1).copied().unwrap_or(Step::Complete)
    }

    /// Position in the sequence (0-based).
    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(Self::ALL.len() - 1)
    }

    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: Step) -> bool {
        !self.is_terminal() && self.next() == target
    }

    /// Profile keys (camelCase, as on the wire) collected at this step.
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            Self::Greeting => &["language"],
            Self::Region => &["region", "currency"],
            Self::Name => &["name"],
            Self::Studies => &["diploma", "field"],
            Self::Skills => &["skills"],
            Self::Certifications => &["certifications"],
            Self::Location => &["city"],
            Self::Budget => &["income", "expenses"],
            Self::WorkPreferences => &["maxWorkHoursWeekly", "minHourlyRate"],
            Self::Goal => &["goalName", "goalAmount", "goalDeadline"],
            Self::AcademicEvents => &["academicEvents"],
            Self::Inventory => &["inventoryItems"],
            Self::Trade => &["tradeOpportunities"],
            Self::Lifestyle => &["subscriptions"],
            Self::Complete => &[],
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Step::ALL
            .iter()
            .copied()
            .find(|step| step.as_str() == normalized)
            .ok_or_else(|| format!("Unknown step: {s}"))
    }
}

impl Serialize for Step {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Step {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Step::parse_lenient(&raw))
    }
}

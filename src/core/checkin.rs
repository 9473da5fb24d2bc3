//! Daily check-in types and symptom catalogs.
//!
//! A check-in is the patient-reported snapshot for one day: three 0-10
//! scores plus reported side effects and red flags. One check-in per
//! (user, date); once evaluated it is immutable.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AmbleError, Result};

/// Lower bound of the energy/pain/confidence scale.
pub const SCORE_MIN: i64 = 0;

/// Upper bound of the energy/pain/confidence scale.
pub const SCORE_MAX: i64 = 10;

/// Placeholder values some clients send for "nothing to report".
/// Dropped during parsing rather than treated as symptoms.
const NONE_SENTINELS: [&str; 2] = ["NONE", "NONE_APPLY"];

/// Reportable side effects.
///
/// The yellow-listed subset forces a YELLOW day on its own; the rest are
/// recorded for clinical history but do not change the safety status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    Nausea,
    SleepPoor,
    FatigueGeneral,
    AppetiteLoss,
    DizzinessMild,
    NewSwelling,
    NeuropathyFlare,
    UnusualFatigueSpike,
    PersistentJointPain,
}

/// All reportable side effects, in display order.
pub const SIDE_EFFECTS: [SideEffect; 9] = [
    SideEffect::Nausea,
    SideEffect::SleepPoor,
    SideEffect::FatigueGeneral,
    SideEffect::AppetiteLoss,
    SideEffect::DizzinessMild,
    SideEffect::NewSwelling,
    SideEffect::NeuropathyFlare,
    SideEffect::UnusualFatigueSpike,
    SideEffect::PersistentJointPain,
];

impl SideEffect {
    /// Stored identifier for this side effect.
    pub fn as_str(&self) -> &'static str {
        match self {
            SideEffect::Nausea => "nausea",
            SideEffect::SleepPoor => "sleep_poor",
            SideEffect::FatigueGeneral => "fatigue_general",
            SideEffect::AppetiteLoss => "appetite_loss",
            SideEffect::DizzinessMild => "dizziness_mild",
            SideEffect::NewSwelling => "new_swelling",
            SideEffect::NeuropathyFlare => "neuropathy_flare",
            SideEffect::UnusualFatigueSpike => "unusual_fatigue_spike",
            SideEffect::PersistentJointPain => "persistent_joint_pain",
        }
    }

    /// Human label shown in pickers and alert summaries.
    pub fn label(&self) -> &'static str {
        match self {
            SideEffect::Nausea => "Nausea",
            SideEffect::SleepPoor => "Poor sleep",
            SideEffect::FatigueGeneral => "General fatigue",
            SideEffect::AppetiteLoss => "Appetite loss",
            SideEffect::DizzinessMild => "Mild dizziness",
            SideEffect::NewSwelling => "New swelling",
            SideEffect::NeuropathyFlare => "Neuropathy flare",
            SideEffect::UnusualFatigueSpike => "Unusual fatigue spike",
            SideEffect::PersistentJointPain => "Persistent joint pain",
        }
    }

    /// Lowercase phrase used inside explanation sentences.
    pub fn phrase(&self) -> String {
        self.as_str().replace('_', " ")
    }

    /// Whether this side effect forces a YELLOW day on its own.
    pub fn is_yellow_listed(&self) -> bool {
        matches!(
            self,
            SideEffect::DizzinessMild
                | SideEffect::NewSwelling
                | SideEffect::NeuropathyFlare
                | SideEffect::UnusualFatigueSpike
                | SideEffect::PersistentJointPain
        )
    }

    /// Parse a stored identifier.
    pub fn parse(s: &str) -> Option<SideEffect> {
        match s {
            "nausea" => Some(SideEffect::Nausea),
            "sleep_poor" => Some(SideEffect::SleepPoor),
            "fatigue_general" => Some(SideEffect::FatigueGeneral),
            "appetite_loss" => Some(SideEffect::AppetiteLoss),
            "dizziness_mild" => Some(SideEffect::DizzinessMild),
            "new_swelling" => Some(SideEffect::NewSwelling),
            "neuropathy_flare" => Some(SideEffect::NeuropathyFlare),
            "unusual_fatigue_spike" => Some(SideEffect::UnusualFatigueSpike),
            "persistent_joint_pain" => Some(SideEffect::PersistentJointPain),
            _ => None,
        }
    }
}

/// Red flags that pause exercise entirely for the day.
///
/// Any accepted red flag forces a RED safety status; unknown values are
/// rejected at parse time so nothing can slip past the status check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedFlag {
    ChestPain,
    Fever,
    SevereBreathlessness,
    Fainting,
    NewSuddenSwelling,
    SignsOfInfection,
}

/// All red flags, in display order.
pub const RED_FLAGS: [RedFlag; 6] = [
    RedFlag::ChestPain,
    RedFlag::Fever,
    RedFlag::SevereBreathlessness,
    RedFlag::Fainting,
    RedFlag::NewSuddenSwelling,
    RedFlag::SignsOfInfection,
];

impl RedFlag {
    /// Stored identifier for this red flag.
    pub fn as_str(&self) -> &'static str {
        match self {
            RedFlag::ChestPain => "chest_pain",
            RedFlag::Fever => "fever",
            RedFlag::SevereBreathlessness => "severe_breathlessness",
            RedFlag::Fainting => "fainting",
            RedFlag::NewSuddenSwelling => "new_sudden_swelling",
            RedFlag::SignsOfInfection => "signs_of_infection",
        }
    }

    /// Human label shown in pickers and alert summaries.
    pub fn label(&self) -> &'static str {
        match self {
            RedFlag::ChestPain => "Chest pain",
            RedFlag::Fever => "Fever",
            RedFlag::SevereBreathlessness => "Severe breathlessness",
            RedFlag::Fainting => "Fainting or near-fainting",
            RedFlag::NewSuddenSwelling => "New sudden swelling",
            RedFlag::SignsOfInfection => "Signs of infection",
        }
    }

    /// Parse a stored identifier.
    pub fn parse(s: &str) -> Option<RedFlag> {
        match s {
            "chest_pain" => Some(RedFlag::ChestPain),
            "fever" => Some(RedFlag::Fever),
            "severe_breathlessness" => Some(RedFlag::SevereBreathlessness),
            "fainting" => Some(RedFlag::Fainting),
            "new_sudden_swelling" => Some(RedFlag::NewSuddenSwelling),
            "signs_of_infection" => Some(RedFlag::SignsOfInfection),
            _ => None,
        }
    }
}

/// Raw check-in fields as submitted by a client, before validation.
///
/// Scores are signed so out-of-range values survive deserialization long
/// enough to be rejected with a useful message instead of a serde error.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CheckinInput {
    pub energy: i64,
    pub pain: i64,
    pub confidence: i64,
    #[serde(default)]
    pub side_effects: Vec<String>,
    #[serde(default)]
    pub red_flags: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A validated daily check-in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckIn {
    /// Owning user.
    pub user_id: String,
    /// Day this check-in describes (one per user per day).
    pub date: NaiveDate,
    /// Energy score, 0-10.
    pub energy: u8,
    /// Pain score, 0-10.
    pub pain: u8,
    /// Confidence score, 0-10.
    pub confidence: u8,
    /// Reported side effects.
    pub side_effects: Vec<SideEffect>,
    /// Reported red flags.
    pub red_flags: Vec<RedFlag>,
    /// Free-text note for the care team, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// When the check-in was recorded.
    pub created_at: DateTime<Utc>,
}

impl CheckIn {
    /// Validate raw input into a check-in for the given user and day.
    ///
    /// # Errors
    ///
    /// Returns `AmbleError::InvalidCheckin` when a score is outside 0-10 or
    /// a side effect / red flag identifier is unknown. Placeholder "none"
    /// values are dropped, not rejected.
    pub fn from_input(
        user_id: impl Into<String>,
        date: NaiveDate,
        input: &CheckinInput,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let energy = validate_score("energy", input.energy)?;
        let pain = validate_score("pain", input.pain)?;
        let confidence = validate_score("confidence", input.confidence)?;
        let side_effects = parse_side_effects(&input.side_effects)?;
        let red_flags = parse_red_flags(&input.red_flags)?;
        let notes = input
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);

        Ok(Self {
            user_id: user_id.into(),
            date,
            energy,
            pain,
            confidence,
            side_effects,
            red_flags,
            notes,
            created_at: now,
        })
    }

    /// Whether any red flag was reported.
    pub fn has_red_flags(&self) -> bool {
        !self.red_flags.is_empty()
    }

    /// Side effects from the yellow-listed subset, in reported order.
    pub fn yellow_side_effects(&self) -> Vec<SideEffect> {
        self.side_effects
            .iter()
            .copied()
            .filter(SideEffect::is_yellow_listed)
            .collect()
    }
}

fn validate_score(field: &str, value: i64) -> Result<u8> {
    if !(SCORE_MIN..=SCORE_MAX).contains(&value) {
        return Err(AmbleError::invalid_checkin(format!(
            "{} must be between {} and {}, got {}",
            field, SCORE_MIN, SCORE_MAX, value
        )));
    }
    Ok(value as u8)
}

fn is_none_sentinel(s: &str) -> bool {
    NONE_SENTINELS.iter().any(|n| n.eq_ignore_ascii_case(s))
}

fn parse_side_effects(raw: &[String]) -> Result<Vec<SideEffect>> {
    let mut effects = Vec::new();
    for s in raw {
        if is_none_sentinel(s) {
            continue;
        }
        let effect = SideEffect::parse(s)
            .ok_or_else(|| AmbleError::invalid_checkin(format!("unknown side effect: {s}")))?;
        if !effects.contains(&effect) {
            effects.push(effect);
        }
    }
    Ok(effects)
}

fn parse_red_flags(raw: &[String]) -> Result<Vec<RedFlag>> {
    let mut flags = Vec::new();
    for s in raw {
        if is_none_sentinel(s) {
            continue;
        }
        let flag = RedFlag::parse(s)
            .ok_or_else(|| AmbleError::invalid_checkin(format!("unknown red flag: {s}")))?;
        if !flags.contains(&flag) {
            flags.push(flag);
        }
    }
    Ok(flags)
}

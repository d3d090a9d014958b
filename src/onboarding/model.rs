//! Onboarding data models: answers, profile summary, recommendations.

use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

/// Accumulated onboarding answers for one session.
///
/// Every field is always present: absence is an empty list or empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerPayload {
    pub life_roles: Vec<String>,
    pub active_pressures: Vec<String>,
    pub focus_domains: Vec<String>,
    pub struggle_patterns: Vec<String>,
    pub reward_styles: Vec<String>,
    pub change_style: String,
    pub emotional_state: String,
    pub tone_preferences: Vec<String>,
    pub accountability_level: String,
}

/// Names of the answer fields, used to key updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnswerField {
    LifeRoles,
    ActivePressures,
    FocusDomains,
    StrugglePatterns,
    RewardStyles,
    ChangeStyle,
    EmotionalState,
    TonePreferences,
    AccountabilityLevel,
}

impl AnswerField {
    pub const ALL: [AnswerField; 9] = [
        Self::LifeRoles,
        Self::ActivePressures,
        Self::FocusDomains,
        Self::StrugglePatterns,
        Self::RewardStyles,
        Self::ChangeStyle,
        Self::EmotionalState,
        Self::TonePreferences,
        Self::AccountabilityLevel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LifeRoles => "life_roles",
            Self::ActivePressures => "active_pressures",
            Self::FocusDomains => "focus_domains",
            Self::StrugglePatterns => "struggle_patterns",
            Self::RewardStyles => "reward_styles",
            Self::ChangeStyle => "change_style",
            Self::EmotionalState => "emotional_state",
            Self::TonePreferences => "tone_preferences",
            Self::AccountabilityLevel => "accountability_level",
        }
    }

    /// Whether the field holds a list of tags (as opposed to one value).
    pub fn is_list(&self) -> bool {
        !matches!(
            self,
            Self::ChangeStyle | Self::EmotionalState | Self::AccountabilityLevel
        )
    }

    /// Inclusive bounds on how many tags a completed answer may hold.
    pub fn bounds(&self) -> Option<(usize, usize)> {
        match self {
            Self::FocusDomains | Self::StrugglePatterns | Self::RewardStyles => Some((1, 3)),
            Self::TonePreferences => Some((1, 2)),
            _ => None,
        }
    }
}

impl std::fmt::Display for AnswerField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AnswerField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| format!("unknown answer field: {s}"))
    }
}

/// New value for one answer field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerValue {
    Tags(Vec<String>),
    Text(String),
}

impl AnswerPayload {
    /// Replace a single field. Values are normalized the same way as wire input.
    ///
    /// A list value sent to a single-value field keeps its first tag; a text
    /// value sent to a list field becomes a one-tag list.
    pub fn update(&mut self, field: AnswerField, value: AnswerValue) {
        let tags = match value {
            AnswerValue::Tags(tags) => normalize_tags(tags),
            AnswerValue::Text(text) => normalize_tags(vec![text]),
        };
        match field {
            AnswerField::LifeRoles => self.life_roles = tags,
            AnswerField::ActivePressures => self.active_pressures = tags,
            AnswerField::FocusDomains => self.focus_domains = tags,
            AnswerField::StrugglePatterns => self.struggle_patterns = tags,
            AnswerField::RewardStyles => self.reward_styles = tags,
            AnswerField::TonePreferences => self.tone_preferences = tags,
            AnswerField::ChangeStyle => self.change_style = first_tag(tags),
            AnswerField::EmotionalState => self.emotional_state = first_tag(tags),
            AnswerField::AccountabilityLevel => self.accountability_level = first_tag(tags),
        }
    }

    /// Number of tags (or 0/1 for single-value fields) held by a field.
    pub fn answer_count(&self, field: AnswerField) -> usize {
        let single = |s: &String| usize::from(!s.is_empty());
        match field {
            AnswerField::LifeRoles => self.life_roles.len(),
            AnswerField::ActivePressures => self.active_pressures.len(),
            AnswerField::FocusDomains => self.focus_domains.len(),
            AnswerField::StrugglePatterns => self.struggle_patterns.len(),
            AnswerField::RewardStyles => self.reward_styles.len(),
            AnswerField::TonePreferences => self.tone_preferences.len(),
            AnswerField::ChangeStyle => single(&self.change_style),
            AnswerField::EmotionalState => single(&self.emotional_state),
            AnswerField::AccountabilityLevel => single(&self.accountability_level),
        }
    }

    /// The first focus domain, if any.
    pub fn primary_focus(&self) -> Option<&str> {
        self.focus_domains.first().map(String::as_str)
    }

    pub fn change_style_kind(&self) -> ChangeStyle {
        ChangeStyle::classify(&self.change_style)
    }

    /// Deterministic SHA-256 hex digest of the payload.
    ///
    /// Identical answers always produce the same key, so derived results can
    /// be cached against it.
    pub fn cache_key(&self) -> String {
        digest(self)
    }
}

/// SHA-256 hex digest of a value's JSON form.
fn digest<T: Serialize>(value: &T) -> String {
    let mut hasher = Sha256::new();
    // Field order is fixed by the struct definition.
    if let Ok(json) = serde_json::to_string(value) {
        hasher.update(json.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Broad change-style buckets used by the fallback heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStyle {
    Intensive,
    Micro,
    Balanced,
}

impl ChangeStyle {
    pub fn classify(raw: &str) -> Self {
        let lower = raw.to_ascii_lowercase();
        if lower.contains("intens") || lower.contains("all_in") || lower.contains("all-in") {
            Self::Intensive
        } else if lower.contains("micro") || lower.contains("tiny") || lower.contains("small") {
            Self::Micro
        } else {
            Self::Balanced
        }
    }
}

/// Trim, drop empties, and de-duplicate while keeping first-seen order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

fn first_tag(tags: Vec<String>) -> String {
    tags.into_iter().next().unwrap_or_default()
}

fn normalize_text(text: Option<String>) -> String {
    text.map(|t| t.trim().to_string()).unwrap_or_default()
}

// ── Wire format ─────────────────────────────────────────────────────

/// Answer payload as received over HTTP.
///
/// Older app builds used different names for several fields. Each canonical
/// field has one alias slot here; [`AnswerPayload::from`] merges them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawAnswerPayload {
    #[serde(deserialize_with = "tags_or_single")]
    life_roles: Option<Vec<String>>,
    #[serde(deserialize_with = "tags_or_single")]
    roles: Option<Vec<String>>,

    #[serde(deserialize_with = "tags_or_single")]
    active_pressures: Option<Vec<String>>,
    #[serde(deserialize_with = "tags_or_single")]
    pressures: Option<Vec<String>>,

    #[serde(deserialize_with = "tags_or_single")]
    focus_domains: Option<Vec<String>>,
    #[serde(deserialize_with = "tags_or_single")]
    focus_areas: Option<Vec<String>>,

    #[serde(deserialize_with = "tags_or_single")]
    struggle_patterns: Option<Vec<String>>,
    #[serde(deserialize_with = "tags_or_single")]
    struggles: Option<Vec<String>>,

    #[serde(deserialize_with = "tags_or_single")]
    reward_styles: Option<Vec<String>>,
    #[serde(deserialize_with = "tags_or_single")]
    reward_preferences: Option<Vec<String>>,

    change_style: Option<String>,
    change_preference: Option<String>,

    emotional_state: Option<String>,
    current_state: Option<String>,

    #[serde(deserialize_with = "tags_or_single")]
    tone_preferences: Option<Vec<String>>,
    #[serde(deserialize_with = "tags_or_single")]
    tones: Option<Vec<String>>,

    accountability_level: Option<String>,
    accountability: Option<String>,
}

/// Accept `null`, a single string, or an array of strings.
fn tags_or_single<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(
        Option::<OneOrMany>::deserialize(deserializer)?.map(|v| match v {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(list) => list,
        }),
    )
}

/// Canonical value wins when it carries data; otherwise the alias is used.
fn pick_tags(canonical: Option<Vec<String>>, alias: Option<Vec<String>>) -> Vec<String> {
    let canonical = normalize_tags(canonical.unwrap_or_default());
    if canonical.is_empty() {
        normalize_tags(alias.unwrap_or_default())
    } else {
        canonical
    }
}

fn pick_text(canonical: Option<String>, alias: Option<String>) -> String {
    let canonical = normalize_text(canonical);
    if canonical.is_empty() {
        normalize_text(alias)
    } else {
        canonical
    }
}

impl From<RawAnswerPayload> for AnswerPayload {
    fn from(raw: RawAnswerPayload) -> Self {
        Self {
            life_roles: pick_tags(raw.life_roles, raw.roles),
            active_pressures: pick_tags(raw.active_pressures, raw.pressures),
            focus_domains: pick_tags(raw.focus_domains, raw.focus_areas),
            struggle_patterns: pick_tags(raw.struggle_patterns, raw.struggles),
            reward_styles: pick_tags(raw.reward_styles, raw.reward_preferences),
            change_style: pick_text(raw.change_style, raw.change_preference),
            emotional_state: pick_text(raw.emotional_state, raw.current_state),
            tone_preferences: pick_tags(raw.tone_preferences, raw.tones),
            accountability_level: pick_text(raw.accountability_level, raw.accountability),
        }
    }
}

// ── Generated artifacts ─────────────────────────────────────────────

/// Short behavioral profile shown after the answer screens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub profile_name: String,
    pub strengths: Vec<String>,
    pub risk_zones: Vec<String>,
    pub best_practices: Vec<String>,
}

impl ProfileSummary {
    /// Usable means every section will render: a name and three non-empty lists.
    pub fn is_usable(&self) -> bool {
        !self.profile_name.trim().is_empty()
            && !self.strengths.is_empty()
            && !self.risk_zones.is_empty()
            && !self.best_practices.is_empty()
    }

    /// Digest of the summary content, for keying results derived from it.
    pub fn cache_key(&self) -> String {
        digest(self)
    }
}

/// How often a commitment is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    Daily,
    Weekly,
}

impl std::fmt::Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
        }
    }
}

impl std::str::FromStr for Cadence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            other => Err(format!("invalid cadence: {other}")),
        }
    }
}

/// Evidence a check-in requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofMode {
    None,
    TickOnly,
    PhotoOptional,
    PhotoRequired,
}

impl ProofMode {
    pub fn uses_photo(&self) -> bool {
        matches!(self, Self::PhotoOptional | Self::PhotoRequired)
    }
}

impl std::fmt::Display for ProofMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::TickOnly => "tick_only",
            Self::PhotoOptional => "photo_optional",
            Self::PhotoRequired => "photo_required",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for ProofMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "tick_only" => Ok(Self::TickOnly),
            "photo_optional" => Ok(Self::PhotoOptional),
            "photo_required" => Ok(Self::PhotoRequired),
            other => Err(format!("invalid proof mode: {other}")),
        }
    }
}

/// One candidate habit suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentRecommendation {
    pub title: String,
    pub short_description: String,
    pub cadence: Cadence,
    pub proof_mode: ProofMode,
    /// Shown to the user as justification; never empty.
    pub reason: String,
}

/// Where a generated value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Server,
    Fallback,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "server" => Ok(Self::Server),
            "fallback" => Ok(Self::Fallback),
            other => Err(format!("invalid source: {other}")),
        }
    }
}

/// A value tagged with its origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sourced<T> {
    pub source: Source,
    pub value: T,
}

impl<T> Sourced<T> {
    pub fn server(value: T) -> Self {
        Self {
            source: Source::Server,
            value,
        }
    }

    pub fn fallback(value: T) -> Self {
        Self {
            source: Source::Fallback,
            value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == Source::Fallback
    }
}

/// Body of `POST /onboarding/recommendations`.
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationRequest {
    #[serde(default)]
    pub payload: RawAnswerPayload,
    #[serde(default)]
    pub summary: Option<ProfileSummary>,
}

/// Body returned by `POST /onboarding/recommendations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationList {
    pub commitments: Vec<CommitmentRecommendation>,
}

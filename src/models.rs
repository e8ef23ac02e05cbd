use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// field -> certainty (0-100) for one player in one space
pub type Model = BTreeMap<String, f64>;

/// Outcome layouts a space can be built on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    WinByMethod,
}

impl Pattern {
    pub fn as_str(&self) -> &str {
        match self {
            Pattern::WinByMethod => "win_by_method",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "win_by_method" | "wbm" => Some(Pattern::WinByMethod),
            _ => None,
        }
    }

    /// Default field list for the pattern
    pub fn fields(&self) -> Vec<String> {
        match self {
            Pattern::WinByMethod => WinByMethod::FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Two-sided fight outcomes: who wins and how, or no winner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WinByMethod {
    pub a_by_dec: f64,
    pub a_by_ko: f64,
    pub b_by_dec: f64,
    pub b_by_ko: f64,
    pub draw_nc: f64,
}

impl WinByMethod {
    pub const FIELDS: [&'static str; 5] = ["a_by_dec", "a_by_ko", "b_by_dec", "b_by_ko", "draw_nc"];

    #[cfg(test)]
    pub fn to_model(&self) -> Model {
        let values = [
            self.a_by_dec,
            self.a_by_ko,
            self.b_by_dec,
            self.b_by_ko,
            self.draw_nc,
        ];
        Self::FIELDS
            .iter()
            .zip(values)
            .map(|(field, value)| (field.to_string(), value))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub uuid: Uuid,
    pub name: String,
    pub money: f64,
    pub risk: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub uuid: Uuid,
    pub name: String,
}

/// One event to predict, played inside a circle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub uuid: Uuid,
    pub circle_uuid: Uuid,
    pub name: String,
    pub description: String,
    pub pattern: String,
    pub fields: Vec<String>,
    pub stake: f64,
}

/// A player's stored model for a space
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub player: String,
    pub puuid: Uuid,
    pub model: Model,
    pub submitted_at: DateTime<Utc>,
}

/// A player's stored payouts for a space
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutRecord {
    pub player: String,
    pub puuid: Uuid,
    pub payouts: BTreeMap<String, f64>,
    pub calculated_at: DateTime<Utc>,
}

// ===== Request bodies =====

fn require(value: &str, name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", name));
    }
    Ok(())
}

fn require_uuid(value: &str, name: &str) -> Result<Uuid, String> {
    require(value, name)?;
    Uuid::parse_str(value.trim()).map_err(|_| format!("{} must be a uuid", name))
}

fn require_fields(fields: &[String]) -> Result<(), String> {
    if fields.is_empty() {
        return Err("fields must not be empty".to_string());
    }
    if fields.iter().any(|f| f.trim().is_empty()) {
        return Err("fields must not contain empty names".to_string());
    }
    Ok(())
}

fn require_stake(stake: f64) -> Result<(), String> {
    if !stake.is_finite() {
        return Err("stake must be a number".to_string());
    }
    Ok(())
}

/// POST /submit
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionRequest {
    pub puuid: String,
    pub suuid: String,
    pub model: Model,
}

impl SubmissionRequest {
    pub fn validate(&self) -> Result<(Uuid, Uuid), String> {
        let puuid = require_uuid(&self.puuid, "puuid")?;
        let suuid = require_uuid(&self.suuid, "suuid")?;
        if self.model.is_empty() {
            return Err("model must not be empty".to_string());
        }
        if self.model.values().any(|c| !c.is_finite()) {
            return Err("model values must be numbers".to_string());
        }
        Ok((puuid, suuid))
    }
}

/// POST /join, /leave
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerCircleRequest {
    pub puuid: String,
    pub cuuid: String,
}

impl PlayerCircleRequest {
    pub fn validate(&self) -> Result<(Uuid, Uuid), String> {
        Ok((
            require_uuid(&self.puuid, "puuid")?,
            require_uuid(&self.cuuid, "cuuid")?,
        ))
    }
}

/// POST /delete
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerSpaceRequest {
    pub puuid: String,
    pub suuid: String,
}

impl PlayerSpaceRequest {
    pub fn validate(&self) -> Result<(Uuid, Uuid), String> {
        Ok((
            require_uuid(&self.puuid, "puuid")?,
            require_uuid(&self.suuid, "suuid")?,
        ))
    }
}

/// POST /random
#[derive(Debug, Clone, Deserialize)]
pub struct CircleRequest {
    pub cuuid: String,
}

impl CircleRequest {
    pub fn validate(&self) -> Result<Uuid, String> {
        require_uuid(&self.cuuid, "cuuid")
    }
}

/// POST /calculate
#[derive(Debug, Clone, Deserialize)]
pub struct SpaceRequest {
    pub uuid: String,
    pub fields: Vec<String>,
    pub pattern: String,
    pub stake: f64,
}

impl SpaceRequest {
    pub fn validate(&self) -> Result<Uuid, String> {
        let suuid = require_uuid(&self.uuid, "uuid")?;
        require(&self.pattern, "pattern")?;
        require_fields(&self.fields)?;
        require_stake(self.stake)?;
        Ok(suuid)
    }
}

/// POST /players
#[derive(Debug, Clone, Deserialize)]
pub struct NewPlayer {
    pub name: String,
    #[serde(default)]
    pub money: f64,
    #[serde(default)]
    pub risk: i64,
}

impl NewPlayer {
    pub fn validate(&self) -> Result<(), String> {
        require(&self.name, "name")?;
        if !self.money.is_finite() {
            return Err("money must be a number".to_string());
        }
        Ok(())
    }
}

/// POST /circles
#[derive(Debug, Clone, Deserialize)]
pub struct NewCircle {
    pub name: String,
}

impl NewCircle {
    pub fn validate(&self) -> Result<(), String> {
        require(&self.name, "name")
    }
}

/// POST /spaces
///
/// `fields` may be omitted when `pattern` names a known layout.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSpace {
    pub cuuid: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub pattern: String,
    #[serde(default)]
    pub fields: Vec<String>,
    pub stake: f64,
}

impl NewSpace {
    /// Validated circle id and resolved field list
    pub fn validate(&self) -> Result<(Uuid, Vec<String>), String> {
        let cuuid = require_uuid(&self.cuuid, "cuuid")?;
        require(&self.name, "name")?;
        require(&self.pattern, "pattern")?;
        require_stake(self.stake)?;
        if self.stake < 0.0 {
            return Err("stake must not be negative".to_string());
        }

        let fields = if self.fields.is_empty() {
            Pattern::from_str(&self.pattern)
                .map(|p| p.fields())
                .ok_or_else(|| format!("fields required for pattern '{}'", self.pattern))?
        } else {
            self.fields.clone()
        };
        require_fields(&fields)?;

        Ok((cuuid, fields))
    }
}

// ===== Response bodies =====

#[derive(Debug, Serialize)]
pub struct CalculateResponse {
    pub suuid: Uuid,
    pub pattern: String,
    pub payouts: BTreeMap<String, BTreeMap<String, f64>>,
    pub stored: usize,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{self, Deserialize, Deserializer, Serialize};

pub const INSTITUTION_ROLE: &str = "institution";
pub const INVALID_TOKEN_DETAIL: &str = "Invalid token";

/// Team name to submitted source code, in the order the backend sent it.
pub type SubmissionMap = IndexMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Institution,
    LeagueSubmissions { league_id: String },
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Institution => "/Institution".to_string(),
            Route::LeagueSubmissions { league_id } => {
                format!("/Institution/league/{league_id}/submissions")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub name: String,
    pub role: String,
}

/// Read-only view of the session store handed to the access guard and loader.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub is_authenticated: bool,
    pub api_base_url: String,
    pub token: String,
    pub current_user: CurrentUser,
}

/// Response body of `/user/get-league-submissions/{leagueId}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionsEnvelope {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "from_opt_submission_map")]
    pub data: Option<SubmissionMap>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Claims read from the payload segment of a JWT access token.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "from_opt_unix_seconds")]
    pub exp: Option<DateTime<Utc>>,
}

// A team without code may arrive as `null`.
fn from_opt_submission_map<'de, D>(deserializer: D) -> Result<Option<SubmissionMap>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<IndexMap<String, Option<String>>>::deserialize(deserializer)?;
    Ok(opt.map(|raw| {
        raw.into_iter()
            .map(|(team, code)| (team, code.unwrap_or_default()))
            .collect()
    }))
}

fn from_opt_unix_seconds<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<f64>::deserialize(deserializer)?;
    if let Some(secs) = opt {
        let dt = DateTime::from_timestamp(secs as i64, 0).ok_or_else(|| {
            serde::de::Error::custom(format!("exp claim out of range: {secs}"))
        })?;
        Ok(Some(dt))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_keeps_backend_key_order() {
        let raw = r#"{"status":"success","data":{"teamB":"code2","teamA":"code1"}}"#;
        let envelope: SubmissionsEnvelope = serde_json::from_str(raw).unwrap();
        let data = envelope.data.unwrap();
        let keys: Vec<&str> = data.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["teamB", "teamA"]);
    }

    #[test]
    fn envelope_null_code_becomes_empty() {
        let raw = r#"{"status":"success","data":{"teamA":null}}"#;
        let envelope: SubmissionsEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.data.unwrap()["teamA"], "");
    }

    #[test]
    fn envelope_fields_are_optional() {
        let envelope: SubmissionsEnvelope = serde_json::from_str(r#"{"detail":"Invalid token"}"#).unwrap();
        assert!(envelope.status.is_none());
        assert!(envelope.data.is_none());
        assert_eq!(envelope.detail.as_deref(), Some(INVALID_TOKEN_DETAIL));
    }

    #[test]
    fn claims_parse_exp_as_unix_seconds() {
        let claims: TokenClaims =
            serde_json::from_str(r#"{"sub":"uni","role":"institution","exp":1700000000}"#).unwrap();
        assert_eq!(claims.exp.unwrap().timestamp(), 1_700_000_000);
        assert_eq!(claims.role.as_deref(), Some("institution"));
    }

    #[test]
    fn route_paths() {
        assert_eq!(Route::Institution.path(), "/Institution");
        assert_eq!(
            Route::LeagueSubmissions {
                league_id: "42".to_string()
            }
            .path(),
            "/Institution/league/42/submissions"
        );
    }
}

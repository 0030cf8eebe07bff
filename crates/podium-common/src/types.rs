use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Side a participant speaks for in a debate room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    #[default]
    Agree,
    Disagree,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Host => "host",
            Role::Agree => "agree",
            Role::Disagree => "disagree",
        }
    }

    /// Serialize as the presence metadata payload `{"role": ".."}`.
    pub fn to_metadata(&self) -> String {
        serde_json::json!({ "role": self.as_str() }).to_string()
    }

    /// Read the role out of participant metadata.
    ///
    /// Missing, malformed, or unknown metadata yields `None`.
    pub fn from_metadata(metadata: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(metadata).ok()?;
        value.get("role")?.as_str()?.parse().ok()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "host" => Ok(Role::Host),
            "agree" => Ok(Role::Agree),
            "disagree" => Ok(Role::Disagree),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_metadata_round_trip() {
        for role in [Role::Host, Role::Agree, Role::Disagree] {
            assert_eq!(Role::from_metadata(&role.to_metadata()), Some(role));
        }
    }

    #[test]
    fn role_from_bad_metadata() {
        assert_eq!(Role::from_metadata("not json"), None);
        assert_eq!(Role::from_metadata("{}"), None);
        assert_eq!(Role::from_metadata(r#"{"role":"moderator"}"#), None);
        assert_eq!(Role::from_metadata(r#"{"role":3}"#), None);
    }

    #[test]
    fn role_metadata_ignores_unknown_fields() {
        let meta = r#"{"role":"disagree","avatar":"x.png"}"#;
        assert_eq!(Role::from_metadata(meta), Some(Role::Disagree));
    }

    #[test]
    fn role_default_is_agree() {
        assert_eq!(Role::default(), Role::Agree);
    }

    #[test]
    fn role_serde_lowercase() {
        let json = serde_json::to_string(&Role::Host).unwrap();
        assert_eq!(json, "\"host\"");
        let parsed: Role = serde_json::from_str("\"disagree\"").unwrap();
        assert_eq!(parsed, Role::Disagree);
    }

    #[test]
    fn role_from_str_rejects_unknown() {
        assert!("audience".parse::<Role>().is_err());
        assert_eq!("agree".parse::<Role>(), Ok(Role::Agree));
    }
}

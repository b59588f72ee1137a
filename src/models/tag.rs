use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Tag {
    pub id: i32,
    pub name: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub tag_type: Option<String>,
    pub is_protected: bool,
    pub is_hidden: bool,
    pub parent: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// The three categories the recommendation engine understands. Anything
/// else (including NULL) falls back to the random strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagType {
    Album,
    Person,
    Stage,
}

impl TagType {
    pub fn from_db(value: Option<&str>) -> Option<Self> {
        match value {
            Some("album") => Some(Self::Album),
            Some("person") => Some(Self::Person),
            Some("stage") => Some(Self::Stage),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Album => "album",
            Self::Person => "person",
            Self::Stage => "stage",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_type_parses_known_values() {
        assert_eq!(TagType::from_db(Some("album")), Some(TagType::Album));
        assert_eq!(TagType::from_db(Some("person")), Some(TagType::Person));
        assert_eq!(TagType::from_db(Some("stage")), Some(TagType::Stage));
    }

    #[test]
    fn tag_type_unknown_and_null_fall_through() {
        assert_eq!(TagType::from_db(Some("genre")), None);
        assert_eq!(TagType::from_db(None), None);
    }
}

use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Paginated listing envelope: `next`/`prev` are page numbers, `count` the
/// total matching rows. The count and data reads are separate statements,
/// so `next` is only consistent against that snapshot.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub next: Option<i64>,
    pub prev: Option<i64>,
    pub count: i64,
}

/// Clamp raw page/limit query values to sane bounds.
pub fn page_bounds(page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    (page, limit)
}

pub fn page_links(page: i64, limit: i64, count: i64) -> (Option<i64>, Option<i64>) {
    let next = if page * limit < count {
        Some(page + 1)
    } else {
        None
    };
    let prev = if page > 1 { Some(page - 1) } else { None };
    (next, prev)
}

/// Sortable media columns. Deserializing from the query string against this
/// fixed set is what keeps `sort_by` out of the SQL injection business.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaSortBy {
    #[default]
    Id,
    Title,
    FileType,
    Duration,
    CreatedAt,
}

impl MediaSortBy {
    pub fn as_column(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::FileType => "file_type",
            Self::Duration => "duration",
            Self::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagSortBy {
    #[default]
    Id,
    Name,
    Type,
    CreatedAt,
}

impl TagSortBy {
    pub fn as_column(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Type => "type",
            Self::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_of_25_has_next_but_no_prev() {
        assert_eq!(page_links(1, 10, 25), (Some(2), None));
    }

    #[test]
    fn middle_page_has_both_links() {
        assert_eq!(page_links(2, 10, 25), (Some(3), Some(1)));
    }

    #[test]
    fn last_page_of_25_has_prev_but_no_next() {
        assert_eq!(page_links(3, 10, 25), (None, Some(2)));
    }

    #[test]
    fn exact_multiple_has_no_next_on_final_page() {
        assert_eq!(page_links(2, 10, 20), (None, Some(1)));
    }

    #[test]
    fn page_bounds_clamps_garbage() {
        assert_eq!(page_bounds(Some(0), Some(0)), (1, 1));
        assert_eq!(page_bounds(Some(-3), Some(5000)), (1, MAX_LIMIT));
        assert_eq!(page_bounds(None, None), (1, DEFAULT_LIMIT));
    }

    #[test]
    fn sort_enums_reject_unknown_columns() {
        // Query-string deserialization goes through serde, so an unknown
        // column never reaches SQL.
        assert!(serde_json::from_str::<MediaSortBy>("\"created_at\"").is_ok());
        assert!(serde_json::from_str::<MediaSortBy>("\"; DROP TABLE media\"").is_err());
        assert!(serde_json::from_str::<SortOrder>("\"desc\"").is_ok());
        assert!(serde_json::from_str::<SortOrder>("\"sideways\"").is_err());
    }
}

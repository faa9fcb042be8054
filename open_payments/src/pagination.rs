use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Cursor-based pagination for list operations. Every field is optional; only supplied fields become query
/// parameters.
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    /// Page size, walking forward from `cursor`.
    pub first: Option<u32>,
    /// Page size, walking backward from `cursor`.
    pub last: Option<u32>,
    pub cursor: Option<String>,
}

impl Pagination {
    pub fn append_to(&self, url: &mut Url) {
        if self.first.is_none() && self.last.is_none() && self.cursor.is_none() {
            return;
        }
        let mut pairs = url.query_pairs_mut();
        if let Some(first) = self.first {
            pairs.append_pair("first", &first.to_string());
        }
        if let Some(last) = self.last {
            pairs.append_pair("last", &last.to_string());
        }
        if let Some(cursor) = &self.cursor {
            pairs.append_pair("cursor", cursor);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    #[serde(default)]
    pub pagination: Option<PageCursors>,
    pub result: Vec<T>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCursors {
    #[serde(default)]
    pub start_cursor: Option<String>,
    #[serde(default)]
    pub end_cursor: Option<String>,
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub has_previous_page: bool,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn only_supplied_parameters_are_attached() {
        let mut url = Url::parse("https://rs.example/incoming-payments").unwrap();
        Pagination::default().append_to(&mut url);
        assert_eq!(url.query(), None);

        let mut url = Url::parse("https://rs.example/incoming-payments").unwrap();
        Pagination { first: Some(10), last: None, cursor: Some("abc".into()) }.append_to(&mut url);
        assert_eq!(url.query(), Some("first=10&cursor=abc"));
    }
}

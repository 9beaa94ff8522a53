use serde::Deserialize;
use serde_json::Value;

/// Title shown for catalog records that have none.
pub const DEFAULT_TITLE: &str = "Untitled";

/// Raw bibliographic record as returned by the catalog's listing endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Biblio {
    #[serde(default)]
    pub biblio_id: Value,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub copyright_date: Option<Value>,
    #[serde(default)]
    pub publication_year: Option<Value>,
    #[serde(default)]
    pub isbn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRecord {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub year: Option<String>,
    pub isbn: Option<String>,
    pub url: String,
}

impl Biblio {
    fn matches(&self, needle: &str) -> bool {
        let contains = |field: &Option<String>| {
            field
                .as_deref()
                .is_some_and(|text| text.to_lowercase().contains(needle))
        };
        contains(&self.title) || contains(&self.author)
    }

    fn into_record(self, detail_url_template: &str) -> Option<CatalogRecord> {
        let id = scalar_to_string(&self.biblio_id)?;
        let year = self
            .copyright_date
            .as_ref()
            .and_then(scalar_to_string)
            .or_else(|| self.publication_year.as_ref().and_then(scalar_to_string));
        Some(CatalogRecord {
            url: detail_url_template.replace("{id}", &id),
            id,
            title: non_blank(self.title).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            author: non_blank(self.author),
            publisher: non_blank(self.publisher),
            year,
            isbn: non_blank(self.isbn),
        })
    }
}

/// Filters a fetched page by `query` and projects it onto catalog records.
///
/// Matching is a case-insensitive substring test on title and author, over
/// this page only. Records without a usable id are dropped.
pub fn project_records(
    biblios: Vec<Biblio>,
    query: &str,
    detail_url_template: &str,
) -> Vec<CatalogRecord> {
    let needle = query.trim().to_lowercase();
    biblios
        .into_iter()
        .filter(|biblio| needle.is_empty() || biblio.matches(&needle))
        .filter_map(|biblio| biblio.into_record(detail_url_template))
        .collect()
}

pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

pub(crate) fn non_blank(field: Option<String>) -> Option<String> {
    field
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

use std::fmt;
use std::str::FromStr;

use crate::common::CourseRecord;
use crate::error::{AppError, Result};
use crate::network::ApiClient;

pub const NO_IMAGE_PATH: &str = "/images/no_image.png";

/// Wildcard left in a search URL for the field being typed into.
pub const QUERY_WILDCARD: &str = "%QUERY";

/// What the book details page shows for one ISBN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDetails {
    pub title: String,
    pub authors: Vec<String>,
    pub thumbnail: String,
}

/// Resolve an ISBN through Google Books. Exactly one volume must match.
pub async fn lookup_book(api: &ApiClient, isbn: &str) -> Result<BookDetails> {
    let isbn = isbn.trim();
    if isbn.is_empty() {
        return Err(AppError::ValidationFailed("ISBN field is empty".to_string()));
    }

    let search = api.lookup_volumes(isbn).await?;
    match search.total_items {
        0 => Err(AppError::ValidationFailed("ISBN is invalid".to_string())),
        1 => {
            let volume = search.items.into_iter().next().ok_or_else(|| {
                AppError::FetchFailed("volume count and items disagree".to_string())
            })?;
            let info = volume.volume_info;
            let thumbnail = info
                .image_links
                .and_then(|links| links.thumbnail)
                .unwrap_or_else(|| NO_IMAGE_PATH.to_string());
            Ok(BookDetails {
                title: info.title,
                authors: info.authors,
                thumbnail,
            })
        }
        _ => Err(AppError::ValidationFailed("ISBN is ambiguous".to_string())),
    }
}

pub async fn course_details(api: &ApiClient, course_id: &str) -> Result<CourseRecord> {
    api.course_details(course_id).await
}

/// The three linked autocomplete fields of the listing form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Department,
    CourseId,
    Professor,
}

impl SearchField {
    pub fn param(self) -> &'static str {
        match self {
            SearchField::Department => "department",
            SearchField::CourseId => "course_id",
            SearchField::Professor => "professor",
        }
    }
}

impl FromStr for SearchField {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "department" => Ok(SearchField::Department),
            "course_id" | "course" => Ok(SearchField::CourseId),
            "professor" => Ok(SearchField::Professor),
            other => Err(AppError::ValidationFailed(format!(
                "unknown search field `{other}`"
            ))),
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.param())
    }
}

/// Current values of the linked fields. The field being searched gets the
/// wildcard; the other two narrow the results with what is already filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseSearchQuery {
    pub department: String,
    pub course_id: String,
    pub professor: String,
}

impl CourseSearchQuery {
    /// Relative `course_search.json?...` reference with [`QUERY_WILDCARD`]
    /// in place of `field`.
    pub fn url_for(&self, field: SearchField) -> String {
        let value = |own: SearchField, current: &str| {
            if own == field {
                QUERY_WILDCARD.to_string()
            } else {
                urlencoding::encode(current).into_owned()
            }
        };
        format!(
            "course_search.json?department={}&course_id={}&professor={}",
            value(SearchField::Department, self.department.as_str()),
            value(SearchField::CourseId, self.course_id.as_str()),
            value(SearchField::Professor, self.professor.as_str()),
        )
    }

    pub fn with_term(&self, field: SearchField, term: &str) -> String {
        self.url_for(field)
            .replace(QUERY_WILDCARD, &urlencoding::encode(term))
    }

    pub async fn search(
        &self,
        api: &ApiClient,
        field: SearchField,
        term: &str,
    ) -> Result<Vec<CourseRecord>> {
        api.course_search(&self.with_term(field, term)).await
    }
}

/// Fields of the "sell a book" form that must be filled before submitting.
#[derive(Debug, Clone, Default)]
pub struct ListingDraft {
    pub isbn: String,
    pub price: String,
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidListing {
    pub isbn: String,
    pub price: f64,
    pub condition: u8,
}

impl ListingDraft {
    pub fn validate(&self) -> Result<ValidListing> {
        let isbn = self.isbn.trim();
        if isbn.is_empty() {
            return Err(AppError::ValidationFailed("ISBN field is empty".to_string()));
        }

        let price = self.price.trim();
        if price.is_empty() {
            return Err(AppError::ValidationFailed("Price field is empty".to_string()));
        }
        let price: f64 = price
            .trim_start_matches('$')
            .parse()
            .map_err(|_| AppError::ValidationFailed(format!("`{price}` is not a price")))?;
        if !price.is_finite() || price <= 0.0 {
            return Err(AppError::ValidationFailed(
                "Price must be greater than zero".to_string(),
            ));
        }

        let condition = self.condition.trim();
        if condition.is_empty() {
            return Err(AppError::ValidationFailed(
                "Condition field is empty".to_string(),
            ));
        }
        let condition = match condition.parse::<u8>() {
            Ok(value @ 1..=5) => value,
            _ => {
                return Err(AppError::ValidationFailed(
                    "Condition must be between 1 and 5".to_string(),
                ));
            }
        };

        Ok(ValidListing {
            isbn: isbn.to_string(),
            price,
            condition,
        })
    }
}

//! Paging query parameters

use serde::Deserialize;

use crate::api::error::ApiError;

/// `?page=true&page-num=N`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    #[serde(rename = "page-num")]
    pub page_num: Option<String>,
}

/// What a collection request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    /// The collection summary
    Summary,
    /// A page; `None` is the first page for the collection's order
    Page(Option<u64>),
}

impl PageParams {
    /// Validate the parameters. `page-num` only selects a page when `page=true`.
    pub fn parse(&self) -> Result<PageRequest, ApiError> {
        let paged = match self.page.as_deref().map(str::trim) {
            None | Some("") => false,
            Some(value) if value.eq_ignore_ascii_case("true") => true,
            Some(value) if value.eq_ignore_ascii_case("false") => false,
            Some(value) => {
                return Err(ApiError::BadRequest(format!(
                    "invalid page parameter '{}', expected true or false",
                    value
                )))
            }
        };

        let page_num = match self.page_num.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(value.parse::<u64>().map_err(|_| {
                ApiError::BadRequest(format!("invalid page-num '{}', expected a non-negative integer", value))
            })?),
        };

        Ok(if paged {
            PageRequest::Page(page_num)
        } else {
            PageRequest::Summary
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<&str>, page_num: Option<&str>) -> PageParams {
        PageParams {
            page: page.map(str::to_string),
            page_num: page_num.map(str::to_string),
        }
    }

    #[test]
    fn test_page_requests() {
        assert_eq!(params(None, None).parse().unwrap(), PageRequest::Summary);
        assert_eq!(params(Some("false"), Some("3")).parse().unwrap(), PageRequest::Summary);
        assert_eq!(params(Some("true"), None).parse().unwrap(), PageRequest::Page(None));
        assert_eq!(params(Some("TRUE"), Some("4")).parse().unwrap(), PageRequest::Page(Some(4)));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(params(Some("yes"), None).parse().is_err());
        assert!(params(Some("true"), Some("-1")).parse().is_err());
        assert!(params(Some("true"), Some("two")).parse().is_err());
    }
}

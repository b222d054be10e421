//! Tagged results returned across the client boundary

use serde_json::Value;

use crate::error::Result;

/// Result of a lookup that may legitimately find nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Found(T),
    NotFound,
}

impl<T> Outcome<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Outcome::Found(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Outcome::Found(value) => Some(value),
            Outcome::NotFound => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Found(value) => Outcome::Found(f(value)),
            Outcome::NotFound => Outcome::NotFound,
        }
    }
}

impl<T> From<Option<T>> for Outcome<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Outcome::Found(v),
            None => Outcome::NotFound,
        }
    }
}

/// Classify a raw transport result: an explicit 404 becomes
/// [`Outcome::NotFound`], every other error is kept as an error.
pub fn classify<T>(result: Result<T>) -> Result<Outcome<T>> {
    match result {
        Ok(value) => Ok(Outcome::Found(value)),
        Err(e) if e.is_not_found() => Ok(Outcome::NotFound),
        Err(e) => Err(e),
    }
}

/// One page of a paginated collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    /// Cursor for the following page. `None` or `Some(0)` means exhausted.
    pub next_page: Option<u32>,
}

impl Page {
    pub fn last(items: Vec<Value>) -> Self {
        Self {
            items,
            next_page: None,
        }
    }

    /// The next page to request, if any.
    pub fn next(&self) -> Option<u32> {
        self.next_page.filter(|p| *p > 0)
    }

    pub fn has_more(&self) -> bool {
        self.next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;

    #[test]
    fn classify_maps_only_404() {
        let found: Result<u8> = Ok(1);
        assert_eq!(classify(found).unwrap(), Outcome::Found(1));

        let missing: Result<u8> = Err(RemoteError::status(404, "gone"));
        assert_eq!(classify(missing).unwrap(), Outcome::NotFound);

        let denied: Result<u8> = Err(RemoteError::status(401, "unauthorized"));
        assert!(classify(denied).is_err());
    }

    #[test]
    fn page_cursor() {
        assert!(!Page::last(vec![]).has_more());
        let zero = Page {
            items: vec![],
            next_page: Some(0),
        };
        assert!(!zero.has_more());
        let more = Page {
            items: vec![],
            next_page: Some(3),
        };
        assert_eq!(more.next(), Some(3));
    }

    #[test]
    fn outcome_helpers() {
        let found = Outcome::Found(2).map(|v| v * 2);
        assert_eq!(found.clone().into_option(), Some(4));
        assert!(found.is_found());
        assert_eq!(Outcome::<u8>::from(None), Outcome::NotFound);
    }
}

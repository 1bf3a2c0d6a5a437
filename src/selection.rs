//! Numbered selection over the most recent listing.

use thiserror::Error;

/// Holds the last result sequence shown to the user so a follow-up
/// "pick by number" acts on exactly what was displayed.
#[derive(Debug, Clone)]
pub struct SelectionContext<T> {
    last: Option<Vec<T>>,
}

impl<T> Default for SelectionContext<T> {
    fn default() -> Self {
        Self { last: None }
    }
}

impl<T> SelectionContext<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the remembered listing.
    pub fn remember(&mut self, items: Vec<T>) -> &[T] {
        self.last.insert(items)
    }

    pub fn items(&self) -> Option<&[T]> {
        self.last.as_deref()
    }

    /// Pick by 1-based number, as displayed.
    pub fn select(&self, number: usize) -> Result<&T, SelectionError> {
        let items = match self.last.as_deref() {
            Some(items) if !items.is_empty() => items,
            _ => return Err(SelectionError::NoListing),
        };
        if number == 0 {
            return Err(SelectionError::OutOfRange {
                index: number,
                len: items.len(),
            });
        }
        pick(items, number - 1).map_err(|_| SelectionError::OutOfRange {
            index: number,
            len: items.len(),
        })
    }
}

/// Bounds-checked 0-based lookup.
pub fn pick<T>(items: &[T], index: usize) -> Result<&T, SelectionError> {
    items.get(index).ok_or(SelectionError::OutOfRange {
        index,
        len: items.len(),
    })
}

/// Parse a typed number, trimming whitespace.
pub fn parse_number(input: &str) -> Result<usize, SelectionError> {
    input
        .trim()
        .parse()
        .map_err(|_| SelectionError::NotANumber(input.trim().to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Invalid selection: nothing listed yet")]
    NoListing,
    #[error("Invalid selection: {index} is out of range ({len} entries)")]
    OutOfRange { index: usize, len: usize },
    #[error("Invalid selection: {0:?} is not a number")]
    NotANumber(String),
}

/// Cursor-based page request over a collection ordered by document id.
///
/// With no `limit` the whole collection is returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: Option<usize>,
    /// Return only documents whose id sorts after this one.
    pub after: Option<String>,
}

impl PageRequest {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn first(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            after: None,
        }
    }

    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.after = Some(cursor.into());
        self
    }
}

/// One page of results plus the cursor for the next page, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Build a page, emitting a cursor only when a limit was requested and filled.
    pub fn from_items(items: Vec<T>, request: &PageRequest, cursor_of: impl Fn(&T) -> String) -> Self {
        let next_cursor = match request.limit {
            Some(limit) if limit > 0 && items.len() >= limit => items.last().map(cursor_of),
            _ => None,
        };
        Self { items, next_cursor }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }
}

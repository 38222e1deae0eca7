//! Sort and filter state of the admin tables
use rocket::FromFormField;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromFormField)]
pub enum Direction {
    Asc,
    Desc,
}

impl Default for Direction {
    fn default() -> Self {
        Self::Asc
    }
}

impl Direction {
    pub fn flip(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// A column that can be sorted on, named the way it appears in the query string
pub trait SortKey: Copy + PartialEq + 'static {
    /// Every sortable column, in display order
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;

    fn label(&self) -> &'static str;
}

/// A rendered column header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub label: &'static str,
    pub href: String,
    pub indicator: &'static str,
}

/// A row of an admin table
pub trait Sortable {
    type Key: SortKey;

    fn compare(&self, other: &Self, key: Self::Key) -> Ordering;

    /// Text matched by the free-text filter
    fn search_text(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState<K> {
    pub key: Option<K>,
    pub direction: Direction,
}

impl<K> Default for SortState<K> {
    fn default() -> Self {
        Self {
            key: None,
            direction: Direction::Asc,
        }
    }
}

impl<K: SortKey> SortState<K> {
    pub fn new(key: Option<K>, direction: Option<Direction>) -> Self {
        Self {
            key,
            direction: direction.unwrap_or_default(),
        }
    }

    /// A new key sorts ascending, the current key flips direction.
    pub fn toggle(&mut self, key: K) {
        if self.key == Some(key) {
            self.direction = self.direction.flip();
        } else {
            self.key = Some(key);
            self.direction = Direction::Asc;
        }
    }

    pub fn toggled(&self, key: K) -> Self {
        let mut next = *self;
        next.toggle(key);
        next
    }
}

/// Rows after filtering and sorting, plus what is needed to render the headers
pub struct Table<R: Sortable> {
    pub rows: Vec<R>,
    pub sort: SortState<R::Key>,
    pub q: String,
    base: String,
}

impl<R: Sortable> Table<R> {
    pub fn new(rows: Vec<R>, sort: SortState<R::Key>, q: Option<String>) -> Self {
        let q = q.map(|q| q.trim().to_string()).unwrap_or_default();
        let needle = q.to_lowercase();
        let mut rows: Vec<R> = rows
            .into_iter()
            .filter(|r| needle.is_empty() || r.search_text().to_lowercase().contains(&needle))
            .collect();
        if let Some(key) = sort.key {
            // Stable, so ties keep the order they were loaded in
            rows.sort_by(|a, b| match sort.direction {
                Direction::Asc => a.compare(b, key),
                Direction::Desc => b.compare(a, key),
            });
        }
        Self {
            rows,
            sort,
            q,
            base: String::new(),
        }
    }

    /// Extra query parameters kept on header links, e.g. `kind=store&`
    pub fn with_base(mut self, base: impl ToString) -> Self {
        self.base = base.to_string();
        self
    }

    /// Link of a column header, toggling the sort on that column
    pub fn href(&self, key: R::Key) -> String {
        let next = self.sort.toggled(key);
        let mut href = format!(
            "?{}sort={}&dir={}",
            self.base,
            key.as_str(),
            next.direction.as_str()
        );
        if !self.q.is_empty() {
            href.push_str("&q=");
            href.push_str(&encode(&self.q));
        }
        href
    }

    pub fn indicator(&self, key: R::Key) -> &'static str {
        match (self.sort.key == Some(key), self.sort.direction) {
            (false, _) => "",
            (true, Direction::Asc) => " ▲",
            (true, Direction::Desc) => " ▼",
        }
    }

    pub fn headers(&self) -> Vec<Header> {
        R::Key::ALL
            .iter()
            .map(|key| Header {
                label: key.label(),
                href: self.href(*key),
                indicator: self.indicator(*key),
            })
            .collect()
    }
}

// Percent-encode a query value
fn encode(value: &str) -> String {
    let mut out = String::new();
    for b in value.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

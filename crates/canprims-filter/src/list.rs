use std::fmt;
use std::path::Path;

use canprims_frame::{Frame, Header};

use crate::error::{FilterError, Result};
use crate::filter::{parse_filter, Filter};

/// Ordered set of filters; a header passes if any filter matches it.
///
/// An empty list passes nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterList {
    filters: Vec<Filter>,
}

impl FilterList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse filters separated by whitespace or commas.
    pub fn parse(text: &str) -> Self {
        text.split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty())
            .map(parse_filter)
            .collect()
    }

    /// Load filters from a text file.
    ///
    /// Blank lines and lines starting with `#` are ignored; each remaining
    /// line may hold several filters.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| FilterError::Load {
            path: path.to_path_buf(),
            source,
        })?;

        let mut list = Self::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            list.extend(Self::parse(line));
        }

        tracing::debug!(path = %path.display(), count = list.len(), "loaded filters");
        Ok(list)
    }

    /// Append a filter.
    pub fn push(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    /// Returns true if any filter matches the header.
    pub fn matches(&self, header: &Header) -> bool {
        self.filters.iter().any(|filter| filter.matches(header))
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Filter> {
        self.filters.iter()
    }
}

impl FromIterator<Filter> for FilterList {
    fn from_iter<I: IntoIterator<Item = Filter>>(iter: I) -> Self {
        Self {
            filters: iter.into_iter().collect(),
        }
    }
}

impl Extend<Filter> for FilterList {
    fn extend<I: IntoIterator<Item = Filter>>(&mut self, iter: I) {
        self.filters.extend(iter);
    }
}

impl<'a> IntoIterator for &'a FilterList {
    type Item = &'a Filter;
    type IntoIter = std::slice::Iter<'a, Filter>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.iter()
    }
}

impl IntoIterator for FilterList {
    type Item = Filter;
    type IntoIter = std::vec::IntoIter<Filter>;

    fn into_iter(self) -> Self::IntoIter {
        self.filters.into_iter()
    }
}

impl fmt::Display for FilterList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{filter}")?;
        }
        Ok(())
    }
}

/// Wrap a frame callback so it only sees frames passing `filters`.
pub fn filtered<F>(filters: FilterList, callback: F) -> impl Fn(&Frame) + Send + Sync + 'static
where
    F: Fn(&Frame) + Send + Sync + 'static,
{
    move |frame: &Frame| {
        if filters.matches(&frame.header) {
            callback(frame);
        }
    }
}

//! Shelf pagination shared by the catalog endpoints.

/// Page number used when a request names none, or names something that is
/// not an integer.
pub const DEFAULT_PAGE: i64 = 1;

/// 1-based shelf number requested by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page(i64);

/// `LIMIT`/`OFFSET` pair selecting one shelf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub const fn new(number: i64) -> Self {
        Self(number)
    }

    pub const fn first() -> Self {
        Self(DEFAULT_PAGE)
    }

    pub const fn number(self) -> i64 {
        self.0
    }

    /// Lenient parse of a `?page=` value; anything unparseable is page 1.
    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(|value| value.trim().parse::<i64>().ok())
            .map(Self)
            .unwrap_or_else(Self::first)
    }

    /// Rows `[(n-1)*per_shelf, n*per_shelf)`. `None` when the page cannot
    /// hold any row (`n < 1`, an empty shelf size, or an offset past `i64`).
    pub fn window(self, per_shelf: u32) -> Option<Window> {
        if self.0 < 1 || per_shelf == 0 {
            return None;
        }
        let limit = i64::from(per_shelf);
        let offset = (self.0 - 1).checked_mul(limit)?;
        Some(Window { limit, offset })
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::first()
    }
}

/// Number of shelves needed for `total` books.
pub fn shelf_count(total: i64, per_shelf: u32) -> i64 {
    if total <= 0 || per_shelf == 0 {
        return 0;
    }
    let per_shelf = i64::from(per_shelf);
    (total + per_shelf - 1) / per_shelf
}

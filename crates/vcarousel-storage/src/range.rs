//! Single byte-range requests (`Range: bytes=...`).

/// A parsed single byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// `bytes=start-end`, inclusive
    FromTo(u64, u64),
    /// `bytes=start-`
    From(u64),
    /// `bytes=-n`, the last n bytes
    Suffix(u64),
}

impl ByteRange {
    /// Parse a `Range` header value. Returns `None` for anything other than
    /// one well-formed byte range.
    pub fn parse(header: &str) -> Option<Self> {
        let range_set = header.trim().strip_prefix("bytes=")?.trim();
        if range_set.contains(',') {
            return None;
        }
        let (start, end) = range_set.split_once('-')?;
        let (start, end) = (start.trim(), end.trim());

        match (start.is_empty(), end.is_empty()) {
            (true, true) => None,
            (true, false) => end.parse().ok().map(ByteRange::Suffix),
            (false, true) => start.parse().ok().map(ByteRange::From),
            (false, false) => {
                let start: u64 = start.parse().ok()?;
                let end: u64 = end.parse().ok()?;
                (start <= end).then_some(ByteRange::FromTo(start, end))
            }
        }
    }

    /// Inclusive `(first, last)` offsets within an object of `size` bytes,
    /// or `None` when the range cannot be satisfied.
    pub fn resolve(&self, size: u64) -> Option<(u64, u64)> {
        if size == 0 {
            return None;
        }
        match *self {
            ByteRange::FromTo(start, end) if start < size => Some((start, end.min(size - 1))),
            ByteRange::From(start) if start < size => Some((start, size - 1)),
            ByteRange::Suffix(n) if n > 0 => Some((size.saturating_sub(n), size - 1)),
            _ => None,
        }
    }
}

/// `Content-Range` value for a served slice.
pub fn content_range(first: u64, last: u64, size: u64) -> String {
    format!("bytes {}-{}/{}", first, last, size)
}

/// Total size from a `Content-Range` value such as `bytes 0-99/1000`.
pub fn total_from_content_range(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.trim().parse().ok()
}

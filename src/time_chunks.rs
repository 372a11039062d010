use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};

/// Half-open time range, `start` inclusive and `end` exclusive. Ranges
/// produced by [`time_chunks`] never cross a calendar-year boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeChunk {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeChunk {
    /// Last instant covered by the chunk, for display and logging.
    pub fn end_inclusive(&self) -> DateTime<Utc> {
        self.end - Duration::seconds(1)
    }
}

/// Splits `[start_at, end_at)` into per-calendar-year chunks.
///
/// A degenerate range (start at or after end) and a range contained in a
/// single year both produce one chunk running from `start_at` to the end
/// of that year. Multi-year ranges produce a leading partial chunk, one
/// full chunk per intermediate year, and a closing chunk ending at
/// `end_at` exactly.
pub fn time_chunks(start_at: DateTime<Utc>, end_at: DateTime<Utc>) -> Vec<TimeChunk> {
    let first_chunk = TimeChunk {
        start: start_at,
        end: year_start(start_at.year() + 1),
    };
    if start_at >= end_at || start_at.year() == end_at.year() {
        return vec![first_chunk];
    }

    let mut chunks = vec![first_chunk];
    for year in (start_at.year() + 1)..end_at.year() {
        chunks.push(TimeChunk {
            start: year_start(year),
            end: year_start(year + 1),
        });
    }
    chunks.push(TimeChunk {
        start: year_start(end_at.year()),
        end: end_at,
    });
    chunks
}

fn year_start(year: i32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .expect("midnight January 1st is always a valid instant")
}

pub const INSERT_IMPORT: &str = r#"
INSERT INTO imports (id, user_id, source, name, raw_data)
VALUES ($1, $2, $3, $4, $5);
"#;

// Claims the oldest queued import for this worker. SKIP LOCKED keeps
// concurrent workers from grabbing the same row.
pub const CLAIM_QUEUED_IMPORT: &str = r#"
UPDATE imports
SET status = 1, updated_at = NOW()
WHERE id = (
    SELECT id FROM imports
    WHERE status = 0
    ORDER BY created_at
    LIMIT 1
    FOR UPDATE SKIP LOCKED
)
RETURNING id, user_id, source, name, raw_data, status, points_count, created_at, updated_at;
"#;

pub const UPDATE_IMPORT_STATUS: &str = r#"
UPDATE imports
SET status = $2, updated_at = NOW()
WHERE id = $1;
"#;

pub const UPDATE_IMPORT_POINTS_COUNT: &str = r#"
UPDATE imports
SET points_count = (SELECT COUNT(*) FROM points WHERE import_id = $1),
    updated_at = NOW()
WHERE id = $1;
"#;

pub const DELETE_IMPORT: &str = r#"
DELETE FROM imports WHERE id = $1 AND user_id = $2;
"#;

pub const SELECT_IMPORT_MONTHS: &str = r#"
SELECT DISTINCT
    EXTRACT(YEAR FROM TO_TIMESTAMP(timestamp) AT TIME ZONE 'UTC')::int AS year,
    EXTRACT(MONTH FROM TO_TIMESTAMP(timestamp) AT TIME ZONE 'UTC')::int AS month
FROM points
WHERE import_id = $1
ORDER BY year, month;
"#;

pub const SELECT_IMPORT_SPAN: &str = r#"
SELECT MIN(timestamp), MAX(timestamp) FROM points WHERE import_id = $1;
"#;

// Multi-row insert is assembled with QueryBuilder, these are its fixed
// prefix and suffix. Duplicates of already stored fixes are skipped via
// the unique index on (user_id, latitude, longitude, timestamp).
pub const INSERT_POINTS_PREFIX: &str = r#"INSERT INTO points
(user_id, latitude, longitude, timestamp, altitude, velocity, battery, accuracy, tracker_id, topic, raw_data, import_id) "#;

pub const INSERT_POINTS_SUFFIX: &str =
    r#" ON CONFLICT (user_id, latitude, longitude, timestamp) DO NOTHING"#;

pub const SELECT_MONTH_TRACKED_POINTS: &str = r#"
SELECT latitude, longitude, timestamp, city, country
FROM points
WHERE user_id = $1 AND timestamp >= $2 AND timestamp <= $3
ORDER BY timestamp;
"#;

pub const SELECT_POINTS_RANGE: &str = r#"
SELECT id, user_id, latitude, longitude, timestamp, altitude, velocity, battery, accuracy,
       tracker_id, topic, raw_data, import_id, country, city, reverse_geocoded_at,
       created_at, updated_at
FROM points
WHERE user_id = $1 AND timestamp >= $2 AND timestamp <= $3
ORDER BY timestamp;
"#;

pub const UPDATE_POINT_GEOCODING: &str = r#"
UPDATE points
SET country = $2, city = $3, reverse_geocoded_at = NOW(), updated_at = NOW()
WHERE id = $1;
"#;

pub const SELECT_TRACKED_MONTHS: &str = r#"
SELECT DISTINCT
    EXTRACT(YEAR FROM TO_TIMESTAMP(timestamp) AT TIME ZONE 'UTC')::int AS year,
    EXTRACT(MONTH FROM TO_TIMESTAMP(timestamp) AT TIME ZONE 'UTC')::int AS month
FROM points
WHERE user_id = $1
ORDER BY year DESC, month;
"#;

pub const UPSERT_STAT: &str = r#"
INSERT INTO stats (user_id, year, month, distance, daily_distance, toponyms, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
ON CONFLICT (user_id, year, month) DO UPDATE
SET distance = EXCLUDED.distance,
    daily_distance = EXCLUDED.daily_distance,
    toponyms = EXCLUDED.toponyms,
    updated_at = NOW();
"#;

pub const SELECT_YEAR_DISTANCES: &str = r#"
SELECT month, distance FROM stats WHERE user_id = $1 AND year = $2 ORDER BY month;
"#;

pub const SELECT_TOTAL_DISTANCE: &str = r#"
SELECT COALESCE(SUM(distance), 0.0) FROM stats WHERE user_id = $1;
"#;

pub const SELECT_USER_TOPONYMS: &str = r#"
SELECT toponyms FROM stats WHERE user_id = $1;
"#;

pub const INSERT_NOTIFICATION: &str = r#"
INSERT INTO notifications (user_id, kind, title, content)
VALUES ($1, $2, $3, $4);
"#;

/// Commute log model and database operations
///
/// A commute log is a weekly aggregate: one row per (user, week_start) in
/// steady state, carrying a single commute type and seven day flags.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE commute_type AS ENUM (
///     'walk', 'cycle', 'public_transport', 'carpool',
///     'electric_vehicle', 'gas_vehicle', 'remote_work'
/// );
///
/// CREATE TABLE commute_logs (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     week_start DATE NOT NULL,
///     commute_type commute_type NOT NULL,
///     days_logged INTEGER NOT NULL,
///     distance_km DOUBLE PRECISION NOT NULL DEFAULT 0,
///     co2_saved_kg INTEGER NOT NULL DEFAULT 0,
///     monday BOOLEAN NOT NULL DEFAULT FALSE,
///     ...
///     sunday BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use ecocommute_shared::models::commute_log::{CommuteLog, CommuteType, CreateCommuteLog, WeekDays};
/// use chrono::NaiveDate;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let week_start = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
/// let log = CommuteLog::create(&pool, CreateCommuteLog {
///     user_id,
///     week_start,
///     commute_type: CommuteType::Cycle,
///     days_logged: 2,
///     distance_km: 8.0,
///     co2_saved_kg: 3,
///     days: WeekDays { monday: true, tuesday: true, ..Default::default() },
/// }).await?;
///
/// let current = CommuteLog::find_latest_for_week(&pool, user_id, week_start).await?;
/// assert_eq!(current.map(|l| l.id), Some(log.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;

/// Transportation mode recorded on a commute log
///
/// The wire format is the snake_case name (`public_transport`, ...), matched
/// case-sensitively. Unknown values fail deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "commute_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CommuteType {
    Walk,
    Cycle,
    PublicTransport,
    Carpool,
    ElectricVehicle,
    GasVehicle,
    RemoteWork,
}

impl CommuteType {
    /// Every commute type, in wire-format declaration order
    pub const ALL: [CommuteType; 7] = [
        CommuteType::Walk,
        CommuteType::Cycle,
        CommuteType::PublicTransport,
        CommuteType::Carpool,
        CommuteType::ElectricVehicle,
        CommuteType::GasVehicle,
        CommuteType::RemoteWork,
    ];

    /// Wire-format name
    pub fn as_str(&self) -> &'static str {
        match self {
            CommuteType::Walk => "walk",
            CommuteType::Cycle => "cycle",
            CommuteType::PublicTransport => "public_transport",
            CommuteType::Carpool => "carpool",
            CommuteType::ElectricVehicle => "electric_vehicle",
            CommuteType::GasVehicle => "gas_vehicle",
            CommuteType::RemoteWork => "remote_work",
        }
    }
}

impl fmt::Display for CommuteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The seven day flags of a weekly log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekDays {
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
}

impl WeekDays {
    /// Flags in Monday..Sunday order
    pub fn as_array(&self) -> [bool; 7] {
        [
            self.monday,
            self.tuesday,
            self.wednesday,
            self.thursday,
            self.friday,
            self.saturday,
            self.sunday,
        ]
    }

    /// Builds flags from a Monday..Sunday array
    pub fn from_array(days: [bool; 7]) -> Self {
        let [monday, tuesday, wednesday, thursday, friday, saturday, sunday] = days;
        Self {
            monday,
            tuesday,
            wednesday,
            thursday,
            friday,
            saturday,
            sunday,
        }
    }

    /// Number of days set
    pub fn count(&self) -> i32 {
        self.as_array().iter().filter(|day| **day).count() as i32
    }
}

/// Weekly commute log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommuteLog {
    /// Unique log ID
    pub id: Uuid,

    /// Owner of the log
    pub user_id: Uuid,

    /// Date anchoring the week (client-chosen Monday or Sunday)
    pub week_start: NaiveDate,

    /// Commute type for the week
    pub commute_type: CommuteType,

    /// Number of days logged; equals the count of true day flags
    pub days_logged: i32,

    /// One-way distance per commute day in kilometres
    pub distance_km: f64,

    /// Derived CO₂ saving against the gas-car baseline
    pub co2_saved_kg: i32,

    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommuteLog {
    /// Day flags of this log
    pub fn days(&self) -> WeekDays {
        WeekDays {
            monday: self.monday,
            tuesday: self.tuesday,
            wednesday: self.wednesday,
            thursday: self.thursday,
            friday: self.friday,
            saturday: self.saturday,
            sunday: self.sunday,
        }
    }

    /// Overwrites the day flags of this log
    pub fn set_days(&mut self, days: WeekDays) {
        self.monday = days.monday;
        self.tuesday = days.tuesday;
        self.wednesday = days.wednesday;
        self.thursday = days.thursday;
        self.friday = days.friday;
        self.saturday = days.saturday;
        self.sunday = days.sunday;
    }
}

/// Input for creating a new weekly log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCommuteLog {
    pub user_id: Uuid,
    pub week_start: NaiveDate,
    pub commute_type: CommuteType,
    pub days_logged: i32,
    pub distance_km: f64,
    pub co2_saved_kg: i32,
    pub days: WeekDays,
}

/// Result of merging a submission into an existing weekly log
///
/// Every field is written back; `days_logged` is always the flag count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeCommuteLog {
    pub commute_type: CommuteType,
    pub days_logged: i32,
    pub distance_km: f64,
    pub co2_saved_kg: i32,
    pub days: WeekDays,
}

const COLUMNS: &str = "id, user_id, week_start, commute_type, days_logged, distance_km, co2_saved_kg, \
     monday, tuesday, wednesday, thursday, friday, saturday, sunday, created_at, updated_at";

impl CommuteLog {
    /// Inserts a new weekly log
    ///
    /// # Errors
    ///
    /// Returns an error if the user doesn't exist or the database fails
    pub async fn create(pool: &PgPool, data: CreateCommuteLog) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO commute_logs (user_id, week_start, commute_type, days_logged, distance_km,
                                      co2_saved_kg, monday, tuesday, wednesday, thursday, friday,
                                      saturday, sunday)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {COLUMNS}
            "#
        );

        sqlx::query_as::<_, CommuteLog>(&query)
            .bind(data.user_id)
            .bind(data.week_start)
            .bind(data.commute_type)
            .bind(data.days_logged)
            .bind(data.distance_km)
            .bind(data.co2_saved_kg)
            .bind(data.days.monday)
            .bind(data.days.tuesday)
            .bind(data.days.wednesday)
            .bind(data.days.thursday)
            .bind(data.days.friday)
            .bind(data.days.saturday)
            .bind(data.days.sunday)
            .fetch_one(pool)
            .await
    }

    /// Finds the most recently created log for a user's week
    ///
    /// Back-dated submissions may leave several rows for the same week; the
    /// newest one is the merge target.
    pub async fn find_latest_for_week(
        pool: &PgPool,
        user_id: Uuid,
        week_start: NaiveDate,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {COLUMNS}
            FROM commute_logs
            WHERE user_id = $1 AND week_start = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#
        );

        sqlx::query_as::<_, CommuteLog>(&query)
            .bind(user_id)
            .bind(week_start)
            .fetch_optional(pool)
            .await
    }

    /// Writes a merge result back to an existing log
    ///
    /// Returns `None` if the log no longer exists.
    pub async fn apply_merge(
        pool: &PgPool,
        id: Uuid,
        data: MergeCommuteLog,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE commute_logs
            SET commute_type = $2, days_logged = $3, distance_km = $4, co2_saved_kg = $5,
                monday = $6, tuesday = $7, wednesday = $8, thursday = $9, friday = $10,
                saturday = $11, sunday = $12, updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        );

        sqlx::query_as::<_, CommuteLog>(&query)
            .bind(id)
            .bind(data.commute_type)
            .bind(data.days_logged)
            .bind(data.distance_km)
            .bind(data.co2_saved_kg)
            .bind(data.days.monday)
            .bind(data.days.tuesday)
            .bind(data.days.wednesday)
            .bind(data.days.thursday)
            .bind(data.days.friday)
            .bind(data.days.saturday)
            .bind(data.days.sunday)
            .fetch_optional(pool)
            .await
    }

    /// Lists a user's logs whose week starts on or after `since`, newest week first
    pub async fn list_since(
        pool: &PgPool,
        user_id: Uuid,
        since: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {COLUMNS}
            FROM commute_logs
            WHERE user_id = $1 AND week_start >= $2
            ORDER BY week_start DESC, created_at DESC
            "#
        );

        sqlx::query_as::<_, CommuteLog>(&query)
            .bind(user_id)
            .bind(since)
            .fetch_all(pool)
            .await
    }

    /// Sums CO₂ saved across all of a user's logs
    pub async fn total_co2_saved(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let (total,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(co2_saved_kg), 0)::BIGINT FROM commute_logs WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(total)
    }
}

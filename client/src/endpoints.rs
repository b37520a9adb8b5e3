//! The bastion API routes the exporter reads.
//!
//! Every list route is asked for all records at once (`limit=-1`) and for a single field, since only the number of
//! records matters.

use crate::{
    error::{
        ApiError,
        Result,
    },
    BastionClient,
    Document,
};
use chrono::{
    DateTime,
    Duration,
    TimeZone,
};
use strum::{
    Display,
    EnumIter,
    IntoStaticStr,
};

/// Timestamp format the API expects for date filters.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const NO_PAGINATION: &str = "-1";

/// The kinds of target exposed under `/targets/{type}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum TargetType {
    SessionAccounts,
    SessionAccountMappings,
    SessionInteractiveLogins,
    SessionScenarioAccounts,
    PasswordRetrievalAccounts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum SessionStatus {
    Current,
    Closed,
}

fn list_params(fields: &str) -> Vec<(&'static str, String)> {
    vec![("limit", NO_PAGINATION.to_string()), ("fields", fields.to_string())]
}

/// Lower bound of the closed sessions window, in the time zone of `now`.
pub fn closed_sessions_from_date<Tz>(now: DateTime<Tz>, window: Duration) -> Result<String>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let from = now.checked_sub_signed(window).ok_or(ApiError::WindowOutOfRange {
        minutes: window.num_minutes(),
    })?;
    Ok(from.format(TIME_FORMAT).to_string())
}

impl BastionClient {
    pub async fn users(&self) -> Result<Vec<Document>> {
        self.query_list("users", &list_params("user_name")).await
    }

    pub async fn groups(&self) -> Result<Vec<Document>> {
        self.query_list("usergroups", &list_params("id")).await
    }

    pub async fn devices(&self) -> Result<Vec<Document>> {
        self.query_list("devices", &list_params("id")).await
    }

    pub async fn targets(&self, target_type: TargetType) -> Result<Vec<Document>> {
        let path = format!("targets/{target_type}");
        self.query_list(&path, &list_params("id")).await
    }

    pub async fn current_sessions(&self) -> Result<Vec<Document>> {
        let mut params = list_params("id");
        params.push(("status", SessionStatus::Current.to_string()));
        self.query_list("sessions", &params).await
    }

    /// Sessions whose end date is at or after `from_date` (see [`closed_sessions_from_date`]).
    pub async fn closed_sessions(&self, from_date: &str) -> Result<Vec<Document>> {
        let mut params = list_params("id");
        params.extend([
            ("date_field", "end".to_string()),
            ("status", SessionStatus::Closed.to_string()),
            ("from_date", from_date.to_string()),
        ]);
        self.query_list("sessions", &params).await
    }

    pub async fn encryption(&self) -> Result<Document> {
        self.query_object("encryption", &[]).await
    }

    pub async fn license_info(&self) -> Result<Document> {
        self.query_object("licenseinfo", &[]).await
    }
}

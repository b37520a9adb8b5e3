//! The independent units of work of a scrape, one per metric family and label value.

use crate::{
    catalog::Family,
    sink::{
        Sample,
        SampleSink,
    },
};
use bastion_api_client::{
    closed_sessions_from_date,
    ApiError,
    BastionClient,
    Document,
    SessionStatus,
    TargetType,
};
use chrono::Local;
use std::fmt;
use strum::{
    EnumString,
    IntoEnumIterator,
};

/// Gauge value for an encryption status or security level outside the known vocabulary.
pub const UNMAPPED: f64 = -2.0;

/// Shared, read-only state handed to every gatherer of one scrape.
#[derive(Clone, Copy)]
pub struct GatherContext<'a> {
    pub client: &'a BastionClient,
    pub sink: &'a SampleSink,
    pub sessions_closed_window: chrono::Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gatherer {
    Users,
    Groups,
    Devices,
    Targets(TargetType),
    Encryption,
    License,
    Sessions(SessionStatus),
}

impl fmt::Display for Gatherer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gatherer::Users => f.write_str("users"),
            Gatherer::Groups => f.write_str("groups"),
            Gatherer::Devices => f.write_str("devices"),
            Gatherer::Targets(target_type) => write!(f, "targets/{target_type}"),
            Gatherer::Encryption => f.write_str("encryption"),
            Gatherer::License => f.write_str("license"),
            Gatherer::Sessions(status) => write!(f, "sessions/{status}"),
        }
    }
}

impl Gatherer {
    /// Every gatherer a successful scrape runs.
    pub fn all() -> Vec<Gatherer> {
        let mut all = vec![Gatherer::Users, Gatherer::Groups, Gatherer::Devices];
        all.extend(TargetType::iter().map(Gatherer::Targets));
        all.extend([Gatherer::Encryption, Gatherer::License]);
        all.extend(SessionStatus::iter().map(Gatherer::Sessions));
        all
    }

    /// Runs the gatherer and swallows its failure after logging it. Returns whether it succeeded.
    pub async fn run(self, ctx: GatherContext<'_>) -> bool {
        match self.gather(ctx).await {
            Ok(()) => {
                trace!(family = %self, "gathered");
                true
            }
            Err(e) => {
                warn!(family = %self, status = ?e.status(), error = %e, "cannot gather metric family");
                false
            }
        }
    }

    async fn gather(self, ctx: GatherContext<'_>) -> Result<(), ApiError> {
        let client = ctx.client;
        let sink = ctx.sink;
        match self {
            Gatherer::Users => {
                let users = client.users().await?;
                sink.emit(Sample::new(Family::Users, users.len() as f64));
            }
            Gatherer::Groups => {
                let groups = client.groups().await?;
                sink.emit(Sample::new(Family::Groups, groups.len() as f64));
            }
            Gatherer::Devices => {
                let devices = client.devices().await?;
                sink.emit(Sample::new(Family::Devices, devices.len() as f64));
            }
            Gatherer::Targets(target_type) => {
                let targets = client.targets(target_type).await?;
                sink.emit(Sample::with_labels(
                    Family::Targets,
                    targets.len() as f64,
                    [target_type.to_string()],
                ));
            }
            Gatherer::Encryption => {
                let info = client.encryption().await?;
                encryption_samples(&info).into_iter().for_each(|sample| sink.emit(sample));
            }
            Gatherer::License => {
                let info = client.license_info().await?;
                license_samples(&info).into_iter().for_each(|sample| sink.emit(sample));
            }
            Gatherer::Sessions(status) => {
                let sessions = match status {
                    SessionStatus::Current => client.current_sessions().await?,
                    SessionStatus::Closed => {
                        let from_date = closed_sessions_from_date(Local::now(), ctx.sessions_closed_window)?;
                        client.closed_sessions(&from_date).await?
                    }
                };
                sink.emit(Sample::with_labels(
                    Family::Sessions,
                    sessions.len() as f64,
                    [status.to_string()],
                ));
            }
        }
        Ok(())
    }
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-
// encryption

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "snake_case")]
enum EncryptionState {
    NeedSetup,
    Ready,
    NeedPassphrase,
}

impl EncryptionState {
    fn gauge(self) -> f64 {
        match self {
            EncryptionState::NeedSetup => 0.0,
            EncryptionState::Ready => 1.0,
            EncryptionState::NeedPassphrase => 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "snake_case")]
enum SecurityLevel {
    NeedSetup,
    PassphraseDefined,
    PassphraseNotUsed,
    #[strum(serialize = "[hidden]")]
    Hidden,
}

impl SecurityLevel {
    fn gauge(self) -> f64 {
        match self {
            SecurityLevel::NeedSetup => 0.0,
            SecurityLevel::PassphraseDefined => 1.0,
            SecurityLevel::PassphraseNotUsed => 2.0,
            SecurityLevel::Hidden => -1.0,
        }
    }
}

fn status_gauge(status: &str) -> f64 {
    status.parse::<EncryptionState>().map(EncryptionState::gauge).unwrap_or_else(|_| {
        warn!(status, "unmapped encryption status");
        UNMAPPED
    })
}

fn security_level_gauge(security_level: &str) -> f64 {
    security_level
        .parse::<SecurityLevel>()
        .map(SecurityLevel::gauge)
        .unwrap_or_else(|_| {
            warn!(security_level, "unmapped encryption security level");
            UNMAPPED
        })
}

/// Status and security level, each labelled with both strings. Nothing unless both fields are strings.
pub fn encryption_samples(info: &Document) -> Vec<Sample> {
    let (Some(status), Some(security_level)) = (info.str_field("encryption"), info.str_field("security_level"))
    else {
        debug!("encryption information lacks status or security level");
        return Vec::new();
    };

    vec![
        Sample::with_labels(Family::EncryptionStatus, status_gauge(status), [status, security_level]),
        Sample::with_labels(
            Family::EncryptionSecurityLevel,
            security_level_gauge(security_level),
            [security_level, status],
        ),
    ]
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-
// license

/// (family, used field, maximum field)
const LICENSE_RATIOS: [(Family, &str, &str); 7] = [
    (Family::LicensePrimaryRatio, "primary", "primary_max"),
    (Family::LicenseSecondaryRatio, "secondary", "secondary_max"),
    (Family::LicenseNamedUserRatio, "named_user", "named_user_max"),
    (Family::LicenseResourceRatio, "resource", "resource_max"),
    (Family::LicenseWaapmRatio, "waapm", "waapm_max"),
    (Family::LicensePmTargetRatio, "pm_target", "pm_target_max"),
    (Family::LicenseSmTargetRatio, "sm_target", "sm_target_max"),
];

/// `used / max`. A missing `used` counts as zero, a missing or zero `max` means there is no ratio to report.
pub fn usage_ratio(info: &Document, used_field: &str, max_field: &str) -> Option<f64> {
    let max = info.f64_field(max_field)?;
    if max == 0.0 {
        debug!(field = max_field, "license maximum is zero, skipping ratio");
        return None;
    }
    let used = info.f64_field(used_field).unwrap_or(0.0);
    Some(used / max)
}

/// `is_expired` when the API reports it, else the negation of `is_valid`.
fn license_expired(info: &Document) -> Option<bool> {
    info.bool_field("is_expired")
        .or_else(|| info.bool_field("is_valid").map(|valid| !valid))
}

pub fn license_samples(info: &Document) -> Vec<Sample> {
    let expired = license_expired(info)
        .map(|expired| Sample::new(Family::LicenseIsExpired, f64::from(u8::from(expired))));
    let ratios = LICENSE_RATIOS.iter().filter_map(|(family, used_field, max_field)| {
        usage_ratio(info, used_field, max_field).map(|ratio| Sample::new(*family, ratio))
    });
    expired.into_iter().chain(ratios).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::drain;
    use bastion_api_client::ClientConfig;
    use pretty_assertions::assert_eq;
    use serde_json::{
        json,
        Value,
    };

    fn document(value: Value) -> Document {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn one_gatherer_per_family_and_label_value() {
        let names: Vec<String> = Gatherer::all().iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            vec![
                "users",
                "groups",
                "devices",
                "targets/session_accounts",
                "targets/session_account_mappings",
                "targets/session_interactive_logins",
                "targets/session_scenario_accounts",
                "targets/password_retrieval_accounts",
                "encryption",
                "license",
                "sessions/current",
                "sessions/closed",
            ]
        );
    }

    #[test]
    fn ratio_of_used_over_max() {
        let info = document(json!({ "primary": 50, "primary_max": 200 }));
        assert_eq!(usage_ratio(&info, "primary", "primary_max"), Some(0.25));
    }

    #[test]
    fn missing_used_counts_as_zero() {
        let info = document(json!({ "waapm_max": 10 }));
        assert_eq!(usage_ratio(&info, "waapm", "waapm_max"), Some(0.0));

        let info = document(json!({ "waapm": "many", "waapm_max": 10 }));
        assert_eq!(usage_ratio(&info, "waapm", "waapm_max"), Some(0.0));
    }

    #[test]
    fn no_ratio_without_usable_max() {
        let info = document(json!({ "resource": 3 }));
        assert_eq!(usage_ratio(&info, "resource", "resource_max"), None);

        let info = document(json!({ "resource": 3, "resource_max": 0 }));
        assert_eq!(usage_ratio(&info, "resource", "resource_max"), None);
    }

    #[test]
    fn license_samples_follow_field_presence() {
        let info = document(json!({
            "is_expired": false,
            "is_valid": false,
            "named_user": 5,
            "named_user_max": 20,
            "pm_target": 1,
            "pm_target_max": 4,
            "sm_target_max": 0,
        }));

        assert_eq!(
            license_samples(&info),
            vec![
                Sample::new(Family::LicenseIsExpired, 0.0),
                Sample::new(Family::LicenseNamedUserRatio, 0.25),
                Sample::new(Family::LicensePmTargetRatio, 0.25),
            ]
        );
    }

    #[test]
    fn expiry_falls_back_to_validity() {
        let info = document(json!({ "is_valid": false }));
        assert_eq!(license_samples(&info), vec![Sample::new(Family::LicenseIsExpired, 1.0)]);

        let info = document(json!({ "is_valid": true }));
        assert_eq!(license_samples(&info), vec![Sample::new(Family::LicenseIsExpired, 0.0)]);

        assert!(license_samples(&document(json!({}))).is_empty());
    }

    #[test]
    fn encryption_ready_with_passphrase() {
        let info = document(json!({ "encryption": "ready", "security_level": "passphrase_defined" }));
        assert_eq!(
            encryption_samples(&info),
            vec![
                Sample::with_labels(Family::EncryptionStatus, 1.0, ["ready", "passphrase_defined"]),
                Sample::with_labels(Family::EncryptionSecurityLevel, 1.0, ["passphrase_defined", "ready"]),
            ]
        );
    }

    #[test]
    fn encryption_hidden_and_unknown_values() {
        let info = document(json!({ "encryption": "rebooting", "security_level": "[hidden]" }));
        assert_eq!(
            encryption_samples(&info),
            vec![
                Sample::with_labels(Family::EncryptionStatus, UNMAPPED, ["rebooting", "[hidden]"]),
                Sample::with_labels(Family::EncryptionSecurityLevel, -1.0, ["[hidden]", "rebooting"]),
            ]
        );
    }

    #[test]
    fn encryption_needs_both_strings() {
        assert!(encryption_samples(&document(json!({ "encryption": "ready" }))).is_empty());
        assert!(encryption_samples(&document(json!({ "encryption": "ready", "security_level": 1 }))).is_empty());
    }

    #[tokio::test]
    async fn closed_sessions_window_out_of_range_fails_only_that_family() {
        let config = ClientConfig {
            timeout: std::time::Duration::from_secs(1),
            skip_verify: false,
            user_agent: "test-agent".to_string(),
        };
        // Never contacted: the date is computed before the request.
        let client = BastionClient::new(&config, "http://127.0.0.1:1/api").unwrap();
        let (sink, receiver) = SampleSink::channel();
        let ctx = GatherContext {
            client: &client,
            sink: &sink,
            sessions_closed_window: chrono::Duration::minutes(1_000_000_000_000),
        };

        assert!(!Gatherer::Sessions(SessionStatus::Closed).run(ctx).await);
        drop(sink);
        assert!(drain(receiver).await.is_empty());
    }
}

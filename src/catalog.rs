//! Static description of every metric the exporter can publish.

use std::{
    collections::HashMap,
    time::Duration,
};
use strum::{
    Display,
    EnumIter,
    IntoEnumIterator,
};

/// Prefix of every metric name.
pub const NAMESPACE: &str = "wallix_bastion";

/// One logical metric, possibly spread over several label values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Family {
    Up,
    Users,
    Groups,
    Devices,
    Sessions,
    Targets,
    EncryptionStatus,
    EncryptionSecurityLevel,
    LicenseIsExpired,
    LicensePrimaryRatio,
    LicenseSecondaryRatio,
    LicenseNamedUserRatio,
    LicenseResourceRatio,
    LicenseWaapmRatio,
    LicensePmTargetRatio,
    LicenseSmTargetRatio,
}

impl Family {
    pub fn label_names(self) -> &'static [&'static str] {
        match self {
            Family::Sessions => &["status"],
            Family::Targets => &["type"],
            Family::EncryptionStatus => &["status", "security_level"],
            Family::EncryptionSecurityLevel => &["security_level", "status"],
            _ => &[],
        }
    }

    fn help(self, sessions_closed_window: Duration) -> String {
        let help = match self {
            Family::Up => "Was able to request and authenticate to Wallix Bastion API successfully.",
            Family::Users => "Current number of users.",
            Family::Groups => "Current number of groups.",
            Family::Devices => "Current number of devices.",
            Family::Sessions => {
                return format!(
                    "Number of current sessions, and of sessions closed in the last {}m.",
                    sessions_closed_window.as_secs() / 60
                )
            }
            Family::Targets => "Current number of targets.",
            Family::EncryptionStatus => {
                "Encryption status (need_setup=0, ready=1, need_passphrase=2, unmapped=-2)."
            }
            Family::EncryptionSecurityLevel => {
                "Encryption security level (need_setup=0, passphrase_defined=1, passphrase_not_used=2, [hidden]=-1, \
                 unmapped=-2)."
            }
            Family::LicenseIsExpired => "Is the Wallix license expired (0=false, 1=true).",
            Family::LicensePrimaryRatio => "License usage ratio of primary.",
            Family::LicenseSecondaryRatio => "License usage ratio of secondary.",
            Family::LicenseNamedUserRatio => "License usage ratio of named user.",
            Family::LicenseResourceRatio => "License usage ratio of resource.",
            Family::LicenseWaapmRatio => "License usage ratio of waapm.",
            Family::LicensePmTargetRatio => "License usage ratio of pm target.",
            Family::LicenseSmTargetRatio => "License usage ratio of sm target.",
        };
        help.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub name: String,
    pub help: String,
    pub label_names: &'static [&'static str],
}

/// All descriptors, built once at start and shared read-only by every scrape.
#[derive(Debug, Clone)]
pub struct MetricCatalog {
    descriptors: HashMap<Family, Descriptor>,
}

impl MetricCatalog {
    pub fn new(sessions_closed_window: Duration) -> Self {
        let descriptors = Family::iter()
            .map(|family| {
                let descriptor = Descriptor {
                    name: format!("{NAMESPACE}_{family}"),
                    help: family.help(sessions_closed_window),
                    label_names: family.label_names(),
                };
                (family, descriptor)
            })
            .collect();
        Self { descriptors }
    }

    pub fn get(&self, family: Family) -> &Descriptor {
        // Every variant is inserted by `new`.
        &self.descriptors[&family]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Family, &Descriptor)> {
        Family::iter().map(move |family| (family, self.get(family)))
    }
}

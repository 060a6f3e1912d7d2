//! Declarative criteria for picking a device out of a discovery stream.

use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::device::Device;
use crate::error::{Error, ErrorKind};
use crate::service::Service;
use crate::util::UuidExt;
use crate::{DeviceAddress, Result};

/// A rule selecting a device.
///
/// Patterns are compiled when the criterion is built, so [`AddressCriterion::matches`]
/// is a total function: it never fails and has no side effects.
#[derive(Debug, Clone)]
pub enum AddressCriterion {
    /// The device has this address.
    ByIdentifier(DeviceAddress),
    /// The advertised name contains a match of the pattern (unanchored search).
    ByNameRegex(Regex),
    /// One of the services has this UUID, compared case- and dash-insensitively.
    ByServiceUuid(String),
    /// The lowercase, dash-free UUID of one of the services contains a match of the pattern,
    /// which is stored without dashes.
    ByServiceUuidRegex(Regex),
}

impl AddressCriterion {
    /// Matches the device with exactly this address.
    pub fn identifier(address: DeviceAddress) -> Self {
        Self::ByIdentifier(address)
    }

    /// Matches devices whose advertised name contains a match of `pattern`.
    ///
    /// Fails with [`ErrorKind::InvalidParameter`] if `pattern` does not compile.
    pub fn name_regex(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| invalid_pattern(pattern, e))?;
        Ok(Self::ByNameRegex(regex))
    }

    /// Accepts any textual UUID form, e.g. `6E400001-B5A3-...` or `6e400001b5a3...`.
    pub fn service_uuid(uuid: impl Into<String>) -> Self {
        Self::ByServiceUuid(uuid.into())
    }

    /// The pattern is compiled case-insensitively, with its dashes removed so that it lines up
    /// with the dash-free UUID form: `6E400001-B5A3` matches the Nordic UART service.
    pub fn service_uuid_regex(pattern: &str) -> Result<Self> {
        let regex = RegexBuilder::new(&pattern.replace('-', ""))
            .case_insensitive(true)
            .build()
            .map_err(|e| invalid_pattern(pattern, e))?;
        Ok(Self::ByServiceUuidRegex(regex))
    }

    /// Decides whether `device` satisfies this criterion.
    pub fn matches<D: Device + ?Sized>(&self, device: &D) -> bool {
        match self {
            Self::ByIdentifier(address) => device.address() == *address,
            Self::ByNameRegex(regex) => device
                .name()
                .is_some_and(|name| !name.is_empty() && regex.is_match(&name)),
            Self::ByServiceUuid(uuid) => {
                let wanted = uuid.normalized();
                device
                    .services()
                    .iter()
                    .any(|service| service.uuid().normalized() == wanted)
            }
            Self::ByServiceUuidRegex(regex) => device
                .services()
                .iter()
                .any(|service| regex.is_match(&service.uuid().normalized())),
        }
    }
}

impl From<DeviceAddress> for AddressCriterion {
    fn from(address: DeviceAddress) -> Self {
        Self::ByIdentifier(address)
    }
}

impl fmt::Display for AddressCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByIdentifier(address) => write!(f, "{:X}", address.as_u64()),
            Self::ByNameRegex(regex) | Self::ByServiceUuidRegex(regex) => f.write_str(regex.as_str()),
            Self::ByServiceUuid(uuid) => f.write_str(uuid),
        }
    }
}

fn invalid_pattern(pattern: &str, e: regex::Error) -> Error {
    Error::new(
        ErrorKind::InvalidParameter,
        Some(Box::new(e)),
        format!("invalid pattern `{pattern}`"),
    )
}

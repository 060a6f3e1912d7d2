use std::fmt;
use std::str::FromStr;

use crate::error::{Error, ErrorKind};

/// A 48-bit Bluetooth device address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u64", into = "u64"))]
pub struct DeviceAddress(u64);

impl DeviceAddress {
    const MASK: u64 = 0xffff_ffff_ffff;

    /// Creates an address from its integer form; returns `None` if `value` needs more than 48 bits.
    pub const fn from_u64(value: u64) -> Option<Self> {
        if value & !Self::MASK == 0 {
            Some(DeviceAddress(value))
        } else {
            None
        }
    }

    /// Creates an address from its six bytes, most significant first.
    pub const fn from_bytes(bytes: [u8; 6]) -> Self {
        let mut value = 0u64;
        let mut i = 0;
        while i < 6 {
            value = (value << 8) | bytes[i] as u64;
            i += 1;
        }
        DeviceAddress(value)
    }

    /// The address as an integer, in the low 48 bits.
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The six bytes of the address, most significant first.
    pub const fn to_bytes(self) -> [u8; 6] {
        let b = self.0.to_be_bytes();
        [b[2], b[3], b[4], b[5], b[6], b[7]]
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.to_bytes();
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl FromStr for DeviceAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            Error::new(
                ErrorKind::InvalidParameter,
                None,
                format!("`{s}` is not a device address"),
            )
        };
        let mut bytes = [0u8; 6];
        let mut parts = s.trim().split([':', '-']);
        for byte in bytes.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 {
                return Err(invalid());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self::from_bytes(bytes))
    }
}

impl TryFrom<u64> for DeviceAddress {
    type Error = Error;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::from_u64(value).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidParameter,
                None,
                format!("{value:#x} is wider than 48 bits"),
            )
        })
    }
}

impl From<DeviceAddress> for u64 {
    fn from(address: DeviceAddress) -> Self {
        address.0
    }
}

/// Capability bits of a GATT characteristic.
///
/// Only the three bits this crate acts upon are modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CharacteristicProperties(u8);

impl CharacteristicProperties {
    pub const NONE: Self = Self(0x0);
    pub const READ: Self = Self(0x1);
    pub const WRITE: Self = Self(0x2);
    pub const NOTIFY: Self = Self(0x4);

    /// Unknown bits are dropped.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0x7)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns `true` if every bit set in `other` is also set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn read(self) -> bool {
        self.contains(Self::READ)
    }

    pub const fn write(self) -> bool {
        self.contains(Self::WRITE)
    }

    pub const fn notify(self) -> bool {
        self.contains(Self::NOTIFY)
    }
}

impl std::ops::BitOr for CharacteristicProperties {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for CharacteristicProperties {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// The result of a cancellable operation that did not fail.
///
/// Cancellation is kept apart from [`Error`] so that it can never be mistaken
/// for a failure reported by the device.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome<T> {
    /// The operation ran to completion and produced a value.
    Completed(T),
    /// The cancellation token fired before the operation completed.
    Cancelled,
}

impl<T> Outcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    /// Converts into an `Option`, discarding the cancellation.
    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            Outcome::Cancelled => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Completed(value) => Outcome::Completed(f(value)),
            Outcome::Cancelled => Outcome::Cancelled,
        }
    }
}

impl<T> From<Option<T>> for Outcome<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Outcome::Cancelled, Outcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_display_and_parse() {
        let addr = DeviceAddress::from_u64(0x00_1a_7d_da_71_13).unwrap();
        assert_eq!(addr.to_string(), "00:1A:7D:DA:71:13");
        assert_eq!("00:1a:7d:da:71:13".parse::<DeviceAddress>().unwrap(), addr);
        assert_eq!("00-1A-7D-DA-71-13".parse::<DeviceAddress>().unwrap(), addr);
        assert_eq!(addr.to_bytes(), [0x00, 0x1a, 0x7d, 0xda, 0x71, 0x13]);
        assert_eq!(DeviceAddress::from_bytes(addr.to_bytes()), addr);
    }

    #[test]
    fn address_rejects_bad_input() {
        assert!(DeviceAddress::from_u64(1 << 48).is_none());
        assert!(DeviceAddress::try_from(u64::MAX).is_err());
        for bad in ["", "00:11:22:33:44", "00:11:22:33:44:55:66", "0:11:22:33:44:55", "zz:11:22:33:44:55"] {
            let err = bad.parse::<DeviceAddress>().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParameter, "{bad}");
        }
    }

    #[test]
    fn properties_bits() {
        let props = CharacteristicProperties::READ | CharacteristicProperties::NOTIFY;
        assert!(props.read() && props.notify() && !props.write());
        assert!(props.contains(CharacteristicProperties::NONE));
        assert!(!props.contains(CharacteristicProperties::WRITE | CharacteristicProperties::READ));
        assert_eq!(CharacteristicProperties::from_bits(0xff).bits(), 0x7);
    }

    #[test]
    fn outcome_helpers() {
        let done: Outcome<u8> = Some(3).into();
        assert_eq!(done.map(|v| v * 2), Outcome::Completed(6));
        let cancelled: Outcome<u8> = None.into();
        assert!(cancelled.is_cancelled());
        assert_eq!(cancelled.completed(), None);
    }
}

//! Runtime-agnostic synchronization core for talking to Bluetooth LE devices over GATT.
//!
//! The platform binding (WinRT, BlueZ, CoreBluetooth, Android...) implements the [`Device`],
//! [`Service`], [`Characteristic`] and [`DiscoverySource`] traits and fires their
//! [`Notifier`] events from its own callbacks. On top of that this crate provides:
//!
//! - [`AddressCriterion`]: pure predicates selecting a discovered device;
//! - single-shot cancellable waits for discovery, configuration and notifications ([`wait`]);
//! - [`Exchange`]: write a request to TX and wait for the matching response on RX;
//! - [`BleSerial`]: a half-duplex, single-flight serial channel over a TX/RX pair.
//!
//! Nothing here spawns threads or needs a particular executor. There are no timeouts:
//! a [`CancellationToken`] is the only way to abort a wait, and cancellation is reported as
//! [`Outcome::Cancelled`], never as an [`Error`].

pub use address::AddressCriterion;
pub use async_util::{Notifier, NotifierReceiver};
pub use cancel::CancellationToken;
pub use characteristic::{is_valid_for_flags, Characteristic};
pub use device::{
    all_characteristics, characteristics_for_services, characteristics_for_uuid,
    find_characteristic, services_for_uuid, CharacteristicOf, Device, DiscoverySource,
};
pub use encoding::TextEncoding;
pub use error::{AttError, Error, ErrorKind};
pub use exchange::{exchange, exchange_validated, Exchange};
pub use gate::{GatePermit, ReadinessGate};
pub use serial::{BleSerial, SerialConfig};
pub use service::{service_characteristics_for_uuid, Service};
pub use types::*;
pub use wait::{
    wait_for_configuration, wait_for_discovery, wait_for_matching_device, wait_for_notification,
    WaitForConfiguration, WaitForDiscovery, WaitForNotification,
};

/// Convenience alias for a result with [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

pub use uuid::Uuid;

pub mod address;
pub mod error;
pub mod wait;
mod types;

mod async_util;
mod cancel;
mod characteristic;
mod device;
mod encoding;
mod exchange;
mod gate;
mod serial;
mod service;
mod util;

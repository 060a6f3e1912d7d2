use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::async_util::Notifier;
use crate::{CharacteristicProperties, Result};

/// A GATT characteristic as exposed by the platform binding.
///
/// Read, write and subscription requests are plain fallible futures. Values pushed by the
/// device are raised on [`Characteristic::value_changed`]: once per device-side update, and
/// only while notifications are enabled. A device-reported failure of a pending operation
/// may be raised there as an `Err` item.
#[async_trait]
pub trait Characteristic: Send + Sync {
    /// The [Uuid] identifying the type of this GATT characteristic.
    fn uuid(&self) -> Uuid;

    /// Which of read, write and notify this characteristic supports.
    fn properties(&self) -> CharacteristicProperties;

    /// Read the value of this characteristic from the device.
    async fn read(&self) -> Result<Vec<u8>>;

    /// Write `value` to this characteristic on the device.
    async fn write(&self, value: &[u8]) -> Result<()>;

    /// Enables notification of value changes.
    ///
    /// Called again on an enabled characteristic, this must succeed without delivering values twice.
    async fn subscribe(&self) -> Result<()>;

    /// Disables notification of value changes.
    async fn unsubscribe(&self) -> Result<()>;

    /// Event source for notified values.
    fn value_changed(&self) -> &Notifier<Result<Vec<u8>>>;
}

#[async_trait]
impl<C: Characteristic + ?Sized> Characteristic for Arc<C> {
    fn uuid(&self) -> Uuid {
        (**self).uuid()
    }

    fn properties(&self) -> CharacteristicProperties {
        (**self).properties()
    }

    async fn read(&self) -> Result<Vec<u8>> {
        (**self).read().await
    }

    async fn write(&self, value: &[u8]) -> Result<()> {
        (**self).write(value).await
    }

    async fn subscribe(&self) -> Result<()> {
        (**self).subscribe().await
    }

    async fn unsubscribe(&self) -> Result<()> {
        (**self).unsubscribe().await
    }

    fn value_changed(&self) -> &Notifier<Result<Vec<u8>>> {
        (**self).value_changed()
    }
}

/// Checks that `characteristic` supports every capability set in `flags`.
pub fn is_valid_for_flags<C: Characteristic + ?Sized>(
    characteristic: &C,
    flags: CharacteristicProperties,
) -> bool {
    characteristic.properties().contains(flags)
}

use regex::Regex;

use crate::async_util::Notifier;
use crate::characteristic::Characteristic;
use crate::service::{service_characteristics_for_uuid, Service};
use crate::util::UuidExt;
use crate::DeviceAddress;

/// The characteristic type reachable through a [`Device`].
pub type CharacteristicOf<D> = <<D as Device>::Service as Service>::Characteristic;

/// A Bluetooth LE device as exposed by the platform binding.
pub trait Device: Send + Sync {
    type Service: Service;

    /// The broadcast name of this device, if it advertised one.
    fn name(&self) -> Option<String>;

    /// The 48-bit address of this device.
    fn address(&self) -> DeviceAddress;

    /// Whether GATT discovery has completed.
    ///
    /// Transitions exactly once from `false` to `true`; [`Device::configured`] fires at that moment.
    fn is_configured(&self) -> bool;

    /// Previously discovered services, in discovery order.
    fn services(&self) -> Vec<Self::Service>;

    /// Event source fired once when GATT discovery completes.
    fn configured(&self) -> &Notifier<()>;
}

/// A scanner raising newly discovered devices.
pub trait DiscoverySource: Send + Sync {
    type Device: Device + Clone + 'static;

    /// Event source fired for each discovered device.
    fn device_discovered(&self) -> &Notifier<Self::Device>;
}

/// Returns every characteristic of every service of `device`.
pub fn all_characteristics<D: Device + ?Sized>(device: &D) -> Vec<CharacteristicOf<D>> {
    device
        .services()
        .iter()
        .flat_map(|service| service.characteristics())
        .collect()
}

/// Returns the services of `device` whose UUID matches `uuid_regex`.
///
/// The pattern is searched in the lowercase, dash-free form of the UUID.
pub fn services_for_uuid<D: Device + ?Sized>(device: &D, uuid_regex: &Regex) -> Vec<D::Service> {
    device
        .services()
        .into_iter()
        .filter(|service| uuid_regex.is_match(&service.uuid().normalized()))
        .collect()
}

/// Returns the characteristics of `device`, across all services, whose UUID matches `uuid_regex`.
pub fn characteristics_for_uuid<D: Device + ?Sized>(
    device: &D,
    uuid_regex: &Regex,
) -> Vec<CharacteristicOf<D>> {
    device
        .services()
        .iter()
        .flat_map(|service| service_characteristics_for_uuid(service, uuid_regex))
        .collect()
}

/// Returns all characteristics of the services of `device` whose UUID matches `service_uuid_regex`.
pub fn characteristics_for_services<D: Device + ?Sized>(
    device: &D,
    service_uuid_regex: &Regex,
) -> Vec<CharacteristicOf<D>> {
    services_for_uuid(device, service_uuid_regex)
        .iter()
        .flat_map(|service| service.characteristics())
        .collect()
}

/// Returns the first characteristic of `device` whose UUID equals `uuid`.
pub fn find_characteristic<D: Device + ?Sized>(
    device: &D,
    uuid: uuid::Uuid,
) -> Option<CharacteristicOf<D>> {
    device
        .services()
        .iter()
        .flat_map(|service| service.characteristics())
        .find(|ch| ch.uuid() == uuid)
}

use regex::Regex;
use uuid::Uuid;

use crate::characteristic::Characteristic;
use crate::util::UuidExt;

/// A GATT service as exposed by the platform binding.
pub trait Service: Send + Sync {
    type Characteristic: Characteristic;

    /// The [Uuid] identifying the type of this GATT service.
    fn uuid(&self) -> Uuid;

    /// Characteristics of this service, in discovery order.
    fn characteristics(&self) -> Vec<Self::Characteristic>;
}

/// Returns the characteristics of `service` whose UUID matches `uuid_regex`.
///
/// The pattern is searched in the lowercase, dash-free form of the UUID.
pub fn service_characteristics_for_uuid<S: Service + ?Sized>(
    service: &S,
    uuid_regex: &Regex,
) -> Vec<S::Characteristic> {
    service
        .characteristics()
        .into_iter()
        .filter(|ch| uuid_regex.is_match(&ch.uuid().normalized()))
        .collect()
}

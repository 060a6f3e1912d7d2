//! In-memory GATT binding used by the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ble_serial::{
    Characteristic, CharacteristicProperties, Device, DeviceAddress, DiscoverySource, Error,
    Notifier, Result, Service, Uuid,
};

pub const NUS_SERVICE: &str = "6E400001-B5A3-F393-E0A9-E50E24DCCA9E";
pub const NUS_TX: &str = "6E400002-B5A3-F393-E0A9-E50E24DCCA9E";
pub const NUS_RX: &str = "6E400003-B5A3-F393-E0A9-E50E24DCCA9E";

pub fn uuid(text: &str) -> Uuid {
    Uuid::parse_str(text).unwrap()
}

type Responder = Box<dyn FnMut(&[u8]) -> Vec<Result<Vec<u8>>> + Send>;

#[derive(Clone)]
pub struct MockCharacteristic(Arc<CharInner>);

struct CharInner {
    uuid: Uuid,
    properties: CharacteristicProperties,
    value_changed: Notifier<Result<Vec<u8>>>,
    subscribed: AtomicBool,
    subscribe_calls: AtomicUsize,
    unsubscribe_calls: AtomicUsize,
    writes: Mutex<Vec<Vec<u8>>>,
    value: Mutex<Vec<u8>>,
    fail_write: Mutex<Option<Error>>,
    fail_subscribe: Mutex<Option<Error>>,
    fail_read: Mutex<Option<Error>>,
    responder: Mutex<Option<(MockCharacteristic, Responder)>>,
}

impl MockCharacteristic {
    pub fn new(uuid: Uuid, properties: CharacteristicProperties) -> Self {
        Self(Arc::new(CharInner {
            uuid,
            properties,
            value_changed: Notifier::new(16),
            subscribed: AtomicBool::new(false),
            subscribe_calls: AtomicUsize::new(0),
            unsubscribe_calls: AtomicUsize::new(0),
            writes: Mutex::new(Vec::new()),
            value: Mutex::new(Vec::new()),
            fail_write: Mutex::new(None),
            fail_subscribe: Mutex::new(None),
            fail_read: Mutex::new(None),
            responder: Mutex::new(None),
        }))
    }

    pub fn tx() -> Self {
        Self::new(uuid(NUS_TX), CharacteristicProperties::WRITE)
    }

    pub fn rx() -> Self {
        Self::new(
            uuid(NUS_RX),
            CharacteristicProperties::READ | CharacteristicProperties::NOTIFY,
        )
    }

    /// A device-side update: raised only while notifications are enabled.
    pub fn push(&self, value: Result<Vec<u8>>) {
        if self.0.subscribed.load(Ordering::SeqCst) {
            self.0.value_changed.notify(value);
        }
    }

    pub fn push_bytes(&self, value: &[u8]) {
        self.push(Ok(value.to_vec()));
    }

    /// Makes every write to `self` raise the values returned by `respond` on `rx`.
    pub fn respond_with(
        &self,
        rx: &MockCharacteristic,
        respond: impl FnMut(&[u8]) -> Vec<Result<Vec<u8>>> + Send + 'static,
    ) {
        *self.0.responder.lock().unwrap() = Some((rx.clone(), Box::new(respond)));
    }

    pub fn echo_to(&self, rx: &MockCharacteristic) {
        self.respond_with(rx, |payload| vec![Ok(payload.to_vec())]);
    }

    pub fn fail_writes_with(&self, err: Error) {
        *self.0.fail_write.lock().unwrap() = Some(err);
    }

    pub fn fail_subscribe_with(&self, err: Error) {
        *self.0.fail_subscribe.lock().unwrap() = Some(err);
    }

    pub fn fail_reads_with(&self, err: Error) {
        *self.0.fail_read.lock().unwrap() = Some(err);
    }

    pub fn set_value(&self, value: &[u8]) {
        *self.0.value.lock().unwrap() = value.to_vec();
    }

    /// Enables notifications without going through the trait.
    pub fn force_subscribed(&self) {
        self.0.subscribed.store(true, Ordering::SeqCst);
    }

    pub fn is_subscribed(&self) -> bool {
        self.0.subscribed.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.0.writes.lock().unwrap().clone()
    }

    pub fn subscribe_calls(&self) -> usize {
        self.0.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn unsubscribe_calls(&self) -> usize {
        self.0.unsubscribe_calls.load(Ordering::SeqCst)
    }

    pub fn listeners(&self) -> usize {
        self.0.value_changed.listener_count()
    }
}

#[async_trait]
impl Characteristic for MockCharacteristic {
    fn uuid(&self) -> Uuid {
        self.0.uuid
    }

    fn properties(&self) -> CharacteristicProperties {
        self.0.properties
    }

    async fn read(&self) -> Result<Vec<u8>> {
        if let Some(err) = self.0.fail_read.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.0.value.lock().unwrap().clone())
    }

    async fn write(&self, value: &[u8]) -> Result<()> {
        if let Some(err) = self.0.fail_write.lock().unwrap().clone() {
            return Err(err);
        }
        self.0.writes.lock().unwrap().push(value.to_vec());
        let responses = {
            let mut responder = self.0.responder.lock().unwrap();
            responder
                .as_mut()
                .map(|(rx, respond)| (rx.clone(), respond(value)))
        };
        if let Some((rx, responses)) = responses {
            for response in responses {
                rx.push(response);
            }
        }
        Ok(())
    }

    async fn subscribe(&self) -> Result<()> {
        self.0.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.0.fail_subscribe.lock().unwrap().clone() {
            return Err(err);
        }
        self.0.subscribed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn unsubscribe(&self) -> Result<()> {
        self.0.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
        self.0.subscribed.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn value_changed(&self) -> &Notifier<Result<Vec<u8>>> {
        &self.0.value_changed
    }
}

impl std::fmt::Debug for MockCharacteristic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockCharacteristic({})", self.0.uuid)
    }
}

#[derive(Clone, Debug)]
pub struct MockService {
    uuid: Uuid,
    characteristics: Vec<MockCharacteristic>,
}

impl MockService {
    pub fn new(uuid: Uuid, characteristics: Vec<MockCharacteristic>) -> Self {
        Self {
            uuid,
            characteristics,
        }
    }

    /// The Nordic UART service with its TX and RX characteristics.
    pub fn nus() -> Self {
        Self::new(
            uuid(NUS_SERVICE),
            vec![MockCharacteristic::tx(), MockCharacteristic::rx()],
        )
    }
}

impl Service for MockService {
    type Characteristic = MockCharacteristic;

    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn characteristics(&self) -> Vec<MockCharacteristic> {
        self.characteristics.clone()
    }
}

#[derive(Clone)]
pub struct MockDevice(Arc<DeviceInner>);

impl std::fmt::Debug for MockDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockDevice({})", self.0.address)
    }
}

struct DeviceInner {
    name: Option<String>,
    address: DeviceAddress,
    services: Vec<MockService>,
    configured: AtomicBool,
    configured_event: Notifier<()>,
}

impl MockDevice {
    pub fn new(name: Option<&str>, address: u64, services: Vec<MockService>) -> Self {
        Self(Arc::new(DeviceInner {
            name: name.map(str::to_owned),
            address: DeviceAddress::from_u64(address).unwrap(),
            services,
            configured: AtomicBool::new(false),
            configured_event: Notifier::new(1),
        }))
    }

    /// GATT discovery completes; fires the event exactly once.
    pub fn finish_configuration(&self) {
        if !self.0.configured.swap(true, Ordering::SeqCst) {
            self.0.configured_event.notify(());
        }
    }

    pub fn configured_listeners(&self) -> usize {
        self.0.configured_event.listener_count()
    }
}

impl Device for MockDevice {
    type Service = MockService;

    fn name(&self) -> Option<String> {
        self.0.name.clone()
    }

    fn address(&self) -> DeviceAddress {
        self.0.address
    }

    fn is_configured(&self) -> bool {
        self.0.configured.load(Ordering::SeqCst)
    }

    fn services(&self) -> Vec<MockService> {
        self.0.services.clone()
    }

    fn configured(&self) -> &Notifier<()> {
        &self.0.configured_event
    }
}

#[derive(Default)]
pub struct MockScanner {
    discovered: Notifier<MockDevice>,
}

impl MockScanner {
    pub fn discover(&self, device: &MockDevice) {
        self.discovered.notify(device.clone());
    }

    pub fn listeners(&self) -> usize {
        self.discovered.listener_count()
    }
}

impl DiscoverySource for MockScanner {
    type Device = MockDevice;

    fn device_discovered(&self) -> &Notifier<MockDevice> {
        &self.discovered
    }
}

//! Single-shot, cancellable waits on binding events.
//!
//! Each wait subscribes to its event source when it is created, so values raised between
//! creation and the first poll are not lost. It resolves at most once, either with the first
//! accepted event or with [`Outcome::Cancelled`], and drops its subscription on resolution.
//! A wait whose event never fires and whose token is never cancelled stays pending.
//!
//! Waiting for the serial channel to become ready is [`crate::ReadinessGate::acquire`].

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use log::{trace, warn};

use crate::address::AddressCriterion;
use crate::async_util::NotifierReceiver;
use crate::cancel::{CancelListener, CancellationToken};
use crate::characteristic::Characteristic;
use crate::device::{Device, DiscoverySource};
use crate::error::{Error, ErrorKind};
use crate::{Outcome, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitState {
    Pending,
    Resolved,
    Cancelled,
}

/// The state machine shared by all waits.
struct EventWait<T: Send + Clone> {
    events: Option<NotifierReceiver<T>>,
    cancel: CancelListener,
    state: WaitState,
}

impl<T: Send + Clone> EventWait<T> {
    fn new(events: NotifierReceiver<T>, cancel: &CancellationToken) -> Self {
        Self {
            events: Some(events),
            cancel: cancel.listen(),
            state: WaitState::Pending,
        }
    }

    fn is_completed(&self) -> bool {
        self.state != WaitState::Pending || self.cancel.is_cancelled()
    }

    fn finish(&mut self, state: WaitState) {
        self.state = state;
        // unsubscribes
        self.events = None;
    }

    /// Polls for the first event accepted by `accept`. Once this returned `Ready`, it
    /// keeps returning `Pending`.
    fn poll_accept(
        &mut self,
        cx: &mut Context<'_>,
        what: &str,
        mut accept: impl FnMut(&T) -> bool,
    ) -> Poll<Result<Outcome<T>>> {
        if self.state != WaitState::Pending {
            return Poll::Pending;
        }
        if self.cancel.poll_cancelled(cx).is_ready() {
            self.finish(WaitState::Cancelled);
            return Poll::Ready(Ok(Outcome::Cancelled));
        }
        let Some(events) = self.events.as_mut() else {
            return Poll::Pending;
        };
        loop {
            match Pin::new(&mut *events).poll_next(cx) {
                Poll::Ready(Some(value)) => {
                    if accept(&value) {
                        self.finish(WaitState::Resolved);
                        return Poll::Ready(Ok(Outcome::Completed(value)));
                    }
                    trace!("{what}: event not accepted, still waiting");
                }
                Poll::Ready(None) => {
                    warn!("{what}: event source closed");
                    self.finish(WaitState::Resolved);
                    return Poll::Ready(Err(Error::new(
                        ErrorKind::NotConnected,
                        None,
                        format!("event source closed while waiting for {what}"),
                    )));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Waits for the next device raised by a [`DiscoverySource`], optionally filtered by an
/// [`AddressCriterion`].
#[must_use = "futures do nothing unless polled"]
pub struct WaitForDiscovery<D: Device + Clone + 'static> {
    inner: EventWait<D>,
    criterion: Option<AddressCriterion>,
}

impl<D: Device + Clone + 'static> WaitForDiscovery<D> {
    pub fn new<S>(source: &S, cancel: &CancellationToken) -> Self
    where
        S: DiscoverySource<Device = D> + ?Sized,
    {
        Self {
            inner: EventWait::new(source.device_discovered().listen(), cancel),
            criterion: None,
        }
    }

    /// Ignores discovered devices not matching `criterion`.
    pub fn matching(mut self, criterion: AddressCriterion) -> Self {
        self.criterion = Some(criterion);
        self
    }

    pub fn is_completed(&self) -> bool {
        self.inner.is_completed()
    }
}

impl<D: Device + Clone + 'static> Future for WaitForDiscovery<D> {
    type Output = Result<Outcome<D>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let criterion = this.criterion.as_ref();
        this.inner.poll_accept(cx, "device discovery", |device| {
            criterion.map_or(true, |c| c.matches(device))
        })
    }
}

/// Waits for the next discovered device.
pub fn wait_for_discovery<S: DiscoverySource + ?Sized>(
    source: &S,
    cancel: &CancellationToken,
) -> WaitForDiscovery<S::Device> {
    WaitForDiscovery::new(source, cancel)
}

/// Waits for the next discovered device satisfying `criterion`.
pub fn wait_for_matching_device<S: DiscoverySource + ?Sized>(
    source: &S,
    criterion: AddressCriterion,
    cancel: &CancellationToken,
) -> WaitForDiscovery<S::Device> {
    WaitForDiscovery::new(source, cancel).matching(criterion)
}

/// Waits until a device has completed GATT discovery.
///
/// Resolves on the first poll if the device was already configured when the wait was created.
#[must_use = "futures do nothing unless polled"]
pub struct WaitForConfiguration {
    // `None` if the device was configured at creation
    inner: Option<EventWait<()>>,
    resolved_inline: bool,
}

impl WaitForConfiguration {
    pub fn new<D: Device + ?Sized>(device: &D, cancel: &CancellationToken) -> Self {
        // listen before reading the flag, so the transition cannot slip in between
        let events = device.configured().listen();
        if device.is_configured() {
            Self {
                inner: None,
                resolved_inline: false,
            }
        } else {
            Self {
                inner: Some(EventWait::new(events, cancel)),
                resolved_inline: false,
            }
        }
    }

    pub fn is_completed(&self) -> bool {
        self.inner.as_ref().map_or(true, EventWait::is_completed)
    }
}

impl Future for WaitForConfiguration {
    type Output = Result<Outcome<()>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match this.inner.as_mut() {
            Some(inner) => inner.poll_accept(cx, "device configuration", |_| true),
            None if !this.resolved_inline => {
                this.resolved_inline = true;
                Poll::Ready(Ok(Outcome::Completed(())))
            }
            None => Poll::Pending,
        }
    }
}

/// Waits until `device` has completed GATT discovery.
pub fn wait_for_configuration<D: Device + ?Sized>(
    device: &D,
    cancel: &CancellationToken,
) -> WaitForConfiguration {
    WaitForConfiguration::new(device, cancel)
}

pub(crate) type Validator<'a> = Box<dyn FnMut(&[u8]) -> bool + Send + 'a>;

/// Waits for one value notified by a characteristic.
///
/// Exactly one update is consumed. With a validator, notified values it rejects are skipped
/// and the wait goes on. A device-reported failure raised on the event resolves the wait
/// with that error.
#[must_use = "futures do nothing unless polled"]
pub struct WaitForNotification<'a> {
    inner: EventWait<Result<Vec<u8>>>,
    validator: Option<Validator<'a>>,
}

impl<'a> WaitForNotification<'a> {
    pub fn new<C: Characteristic + ?Sized>(characteristic: &C, cancel: &CancellationToken) -> Self {
        Self {
            inner: EventWait::new(characteristic.value_changed().listen(), cancel),
            validator: None,
        }
    }

    /// Only resolves with a value for which `validate` returns `true`.
    pub fn validate(mut self, validate: impl FnMut(&[u8]) -> bool + Send + 'a) -> Self {
        self.validator = Some(Box::new(validate));
        self
    }

    pub(crate) fn with_validator(mut self, validator: Option<Validator<'a>>) -> Self {
        self.validator = validator;
        self
    }

    pub fn is_completed(&self) -> bool {
        self.inner.is_completed()
    }
}

impl Future for WaitForNotification<'_> {
    type Output = Result<Outcome<Vec<u8>>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let validator = &mut this.validator;
        let polled = this.inner.poll_accept(cx, "notification", |event| match event {
            Ok(value) => validator
                .as_mut()
                .map_or(true, |validate| validate(value.as_slice())),
            Err(_) => true,
        });
        polled.map(|res| match res? {
            Outcome::Completed(value) => value.map(Outcome::Completed),
            Outcome::Cancelled => Ok(Outcome::Cancelled),
        })
    }
}

/// Waits for the next value notified by `characteristic`.
pub fn wait_for_notification<'a, C: Characteristic + ?Sized>(
    characteristic: &C,
    cancel: &CancellationToken,
) -> WaitForNotification<'a> {
    WaitForNotification::new(characteristic, cancel)
}

use log::{debug, warn};

use crate::cancel::CancellationToken;
use crate::characteristic::Characteristic;
use crate::error::ErrorKind;
use crate::wait::{Validator, WaitForNotification};
use crate::{Outcome, Result};

/// One request/response round trip: write a payload to a TX characteristic and wait for the
/// answer notified by an RX characteristic.
///
/// The RX subscription is registered before the payload is written, so a response arriving
/// while the write is still in progress is not missed. The payload is written once; responses
/// rejected by the validator are skipped without retransmitting.
#[must_use = "an exchange does nothing until `run` is awaited"]
pub struct Exchange<'a, C: Characteristic + ?Sized> {
    tx: &'a C,
    rx: &'a C,
    payload: Vec<u8>,
    validator: Option<Validator<'a>>,
    subscribe_rx: bool,
}

impl<'a, C: Characteristic + ?Sized> Exchange<'a, C> {
    /// An exchange writing `payload` to `tx` and resolving with the next value notified by `rx`.
    pub fn new(tx: &'a C, rx: &'a C, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            tx,
            rx,
            payload: payload.into(),
            validator: None,
            subscribe_rx: false,
        }
    }

    /// An exchange whose payload is `command` encoded as UTF-8.
    pub fn with_text(tx: &'a C, rx: &'a C, command: &str) -> Self {
        Self::new(tx, rx, command.as_bytes())
    }

    /// Resolves with the first response for which `validate` returns `true`.
    pub fn validate(mut self, validate: impl FnMut(&[u8]) -> bool + Send + 'a) -> Self {
        self.validator = Some(Box::new(validate));
        self
    }

    /// Enables notifications on RX before anything else.
    pub fn subscribe_rx(mut self) -> Self {
        self.subscribe_rx = true;
        self
    }

    pub(crate) fn with_validator(mut self, validator: Option<Validator<'a>>) -> Self {
        self.validator = validator;
        self
    }

    /// Runs the exchange.
    ///
    /// A token cancelled before the write skips the write. Failures to subscribe or to write are
    /// reported as [`ErrorKind::SubscriptionFailed`] and [`ErrorKind::WriteFailed`]; an error raised
    /// by the device on the RX event is returned unchanged. The RX subscription is released on
    /// every path.
    pub async fn run(self, cancel: &CancellationToken) -> Result<Outcome<Vec<u8>>> {
        if self.subscribe_rx {
            self.rx.subscribe().await.map_err(|e| {
                warn!("enabling notifications on {} failed: {e}", self.rx.uuid());
                e.during(ErrorKind::SubscriptionFailed)
            })?;
        }

        let response =
            WaitForNotification::new(self.rx, cancel).with_validator(self.validator);
        if cancel.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }

        debug!("writing {} bytes to {}", self.payload.len(), self.tx.uuid());
        self.tx.write(&self.payload).await.map_err(|e| {
            warn!("writing to {} failed: {e}", self.tx.uuid());
            e.during(ErrorKind::WriteFailed)
        })?;

        let outcome = response.await?;
        if let Outcome::Completed(value) = &outcome {
            debug!("received {} bytes from {}", value.len(), self.rx.uuid());
        }
        Ok(outcome)
    }
}

/// Writes `payload` to `tx` and waits for the next value notified by `rx`.
///
/// See [`Exchange`] for details.
pub async fn exchange<C: Characteristic + ?Sized>(
    tx: &C,
    rx: &C,
    payload: &[u8],
    cancel: &CancellationToken,
) -> Result<Outcome<Vec<u8>>> {
    Exchange::new(tx, rx, payload).run(cancel).await
}

/// Writes `payload` to `tx` and waits for the first value notified by `rx` that passes `validate`.
///
/// Rejected values are skipped; the payload is written once.
pub async fn exchange_validated<'a, C: Characteristic + ?Sized>(
    tx: &'a C,
    rx: &'a C,
    payload: &[u8],
    cancel: &CancellationToken,
    validate: impl FnMut(&[u8]) -> bool + Send + 'a,
) -> Result<Outcome<Vec<u8>>> {
    Exchange::new(tx, rx, payload)
        .validate(validate)
        .run(cancel)
        .await
}

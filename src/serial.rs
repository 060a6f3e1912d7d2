use std::time::Duration;

use futures_timer::Delay;
use log::{debug, trace, warn};

use crate::cancel::CancellationToken;
use crate::characteristic::Characteristic;
use crate::encoding::TextEncoding;
use crate::error::ErrorKind;
use crate::exchange::Exchange;
use crate::gate::{GatePermit, ReadinessGate};
use crate::wait::Validator;
use crate::{Outcome, Result};

/// Configuration of a [`BleSerial`] channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SerialConfig {
    /// Pause between taking the gate and transmitting, for links where back-to-back
    /// transmissions collide. Disabled by default.
    pub guard_delay: Option<Duration>,
    /// Encoding of the message operations. ASCII by default.
    pub encoding: TextEncoding,
}

impl SerialConfig {
    pub fn with_guard_delay(mut self, delay: Duration) -> Self {
        self.guard_delay = Some(delay);
        self
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}

/// A half-duplex serial channel over a pair of GATT characteristics: requests are written to
/// TX, responses are notified by RX.
///
/// At most one operation is in flight at a time; concurrent callers wait on the channel's
/// [`ReadinessGate`]. The gate is released when an operation ends, whether it completed, failed
/// or was cancelled.
///
/// Every exchange enables notifications on RX before it waits for the gate, so a subscription
/// the binding lost (after a link drop, say) is restored by the next exchange. This relies on
/// [`Characteristic::subscribe`] accepting repeated calls.
pub struct BleSerial<C: Characteristic> {
    tx: C,
    rx: C,
    gate: ReadinessGate,
    config: SerialConfig,
}

impl<C: Characteristic> BleSerial<C> {
    /// Creates a channel writing requests to `tx` and receiving responses from `rx`, with the
    /// default [`SerialConfig`].
    pub fn new(tx: C, rx: C) -> Self {
        Self::with_config(tx, rx, SerialConfig::default())
    }

    pub fn with_config(tx: C, rx: C, config: SerialConfig) -> Self {
        Self {
            tx,
            rx,
            gate: ReadinessGate::new(),
            config,
        }
    }

    /// The characteristic requests are written to.
    pub fn tx(&self) -> &C {
        &self.tx
    }

    /// The characteristic responses are notified by.
    pub fn rx(&self) -> &C {
        &self.rx
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    /// The gate admitting one operation at a time. Holding a permit from it keeps every
    /// operation of this channel waiting.
    pub fn gate(&self) -> &ReadinessGate {
        &self.gate
    }

    /// `true` if no operation is in flight right now.
    pub fn is_ready(&self) -> bool {
        self.gate.is_ready()
    }

    /// Writes `data` and returns the next value notified by RX.
    pub async fn exchange_raw_data(
        &self,
        data: &[u8],
        cancel: &CancellationToken,
    ) -> Result<Outcome<Vec<u8>>> {
        self.exchange_inner(data, None, cancel).await
    }

    /// Writes `data` and returns the first value notified by RX that passes `validate`.
    ///
    /// Rejected values are skipped while the gate stays held; nothing is retransmitted.
    pub async fn exchange_raw_data_validated<'a>(
        &'a self,
        data: &[u8],
        validate: impl FnMut(&[u8]) -> bool + Send + 'a,
        cancel: &CancellationToken,
    ) -> Result<Outcome<Vec<u8>>> {
        self.exchange_inner(data, Some(Box::new(validate)), cancel)
            .await
    }

    /// Writes `data` without waiting for a response.
    pub async fn write_raw_data(&self, data: &[u8], cancel: &CancellationToken) -> Result<Outcome<()>> {
        let Outcome::Completed(_permit) = self.begin(cancel).await else {
            return Ok(Outcome::Cancelled);
        };
        debug!("writing {} bytes to {}", data.len(), self.tx.uuid());
        self.tx.write(data).await.map_err(|e| {
            warn!("writing to {} failed: {e}", self.tx.uuid());
            e.during(ErrorKind::WriteFailed)
        })?;
        Ok(Outcome::Completed(()))
    }

    /// Reads the current value of RX directly.
    pub async fn read_raw_data(&self, cancel: &CancellationToken) -> Result<Outcome<Vec<u8>>> {
        let Outcome::Completed(_permit) = self.begin(cancel).await else {
            return Ok(Outcome::Cancelled);
        };
        let value = self.rx.read().await.map_err(|e| {
            warn!("reading {} failed: {e}", self.rx.uuid());
            e.during(ErrorKind::ReadFailed)
        })?;
        Ok(Outcome::Completed(value))
    }

    /// Sends `message` encoded with the configured [`TextEncoding`] and decodes the response.
    pub async fn exchange_messages(
        &self,
        message: &str,
        cancel: &CancellationToken,
    ) -> Result<Outcome<String>> {
        self.exchange_messages_encoded(message, self.config.encoding, cancel)
            .await
    }

    pub async fn exchange_messages_encoded(
        &self,
        message: &str,
        encoding: TextEncoding,
        cancel: &CancellationToken,
    ) -> Result<Outcome<String>> {
        let response = self
            .exchange_raw_data(&encoding.encode(message), cancel)
            .await?;
        Ok(response.map(|bytes| encoding.decode(&bytes)))
    }

    /// Sends `message` encoded with the configured [`TextEncoding`], without waiting for a response.
    pub async fn write_message(&self, message: &str, cancel: &CancellationToken) -> Result<Outcome<()>> {
        self.write_message_encoded(message, self.config.encoding, cancel)
            .await
    }

    pub async fn write_message_encoded(
        &self,
        message: &str,
        encoding: TextEncoding,
        cancel: &CancellationToken,
    ) -> Result<Outcome<()>> {
        self.write_raw_data(&encoding.encode(message), cancel).await
    }

    /// Disables notifications on RX. The next exchange enables them again.
    pub async fn unsubscribe(&self) -> Result<()> {
        self.rx.unsubscribe().await.map_err(|e| {
            warn!("disabling notifications on {} failed: {e}", self.rx.uuid());
            e.during(ErrorKind::SubscriptionFailed)
        })?;
        debug!("notifications on {} disabled", self.rx.uuid());
        Ok(())
    }

    /// Consumes the channel, returning the TX and RX characteristics.
    pub fn into_inner(self) -> (C, C) {
        (self.tx, self.rx)
    }

    async fn exchange_inner(
        &self,
        data: &[u8],
        validator: Option<Validator<'_>>,
        cancel: &CancellationToken,
    ) -> Result<Outcome<Vec<u8>>> {
        self.subscribe_rx().await?;
        let Outcome::Completed(_permit) = self.begin(cancel).await else {
            return Ok(Outcome::Cancelled);
        };
        Exchange::new(&self.tx, &self.rx, data)
            .with_validator(validator)
            .run(cancel)
            .await
    }

    async fn subscribe_rx(&self) -> Result<()> {
        self.rx.subscribe().await.map_err(|e| {
            warn!("enabling notifications on {} failed: {e}", self.rx.uuid());
            e.during(ErrorKind::SubscriptionFailed)
        })?;
        trace!("notifications on {} enabled", self.rx.uuid());
        Ok(())
    }

    /// Takes the gate and waits out the guard delay.
    async fn begin(&self, cancel: &CancellationToken) -> Outcome<GatePermit<'_>> {
        let permit = match self.gate.acquire(cancel).await {
            Outcome::Completed(permit) => permit,
            Outcome::Cancelled => return Outcome::Cancelled,
        };
        if let Some(delay) = self.config.guard_delay {
            Delay::new(delay).await;
            if cancel.is_cancelled() {
                return Outcome::Cancelled;
            }
        }
        Outcome::Completed(permit)
    }
}

impl<C: Characteristic + std::fmt::Debug> std::fmt::Debug for BleSerial<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BleSerial")
            .field("tx", &self.tx)
            .field("rx", &self.rx)
            .field("ready", &self.is_ready())
            .field("config", &self.config)
            .finish()
    }
}

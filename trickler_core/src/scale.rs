//! Scale controller: one serial link, one decoder, one canonical reading.

use std::time::Duration;

use eyre::WrapErr;
use trickler_config::ScaleCfg;
use trickler_traits::SerialLink;

use crate::SharedClock;
use crate::decimal::Decimal;
use crate::error::Result;
use crate::hw_error::to_report;
use crate::protocol::{ScaleDecoder, ScaleModel};
use crate::reading::{Reading, ScaleStatus, Unit};
use crate::store::SharedState;

pub struct ScaleController<L: SerialLink> {
    link: L,
    decoder: ScaleDecoder,
    state: SharedState,
    clock: SharedClock,
    unit_settle: Duration,
    reading: Reading,
}

impl<L: SerialLink> ScaleController<L> {
    /// Take ownership of an open link and publish the model's reference
    /// tables. Opening the link is the caller's job; failure to open it is
    /// `TricklerError::ScaleNotReady`.
    pub fn new(
        link: L,
        model: ScaleModel,
        state: SharedState,
        clock: SharedClock,
        cfg: &ScaleCfg,
    ) -> Result<Self> {
        state
            .publish_reference(model)
            .wrap_err("publishing scale reference tables")?;
        tracing::info!(%model, port = %cfg.port, "scale controller ready");
        Ok(Self {
            link,
            decoder: ScaleDecoder::new(model, cfg.stable_reading_length),
            state,
            clock,
            unit_settle: Duration::from_millis(cfg.unit_settle_ms),
            reading: Reading::default(),
        })
    }

    /// One read cycle: flush stale input, read a line, decode it and publish
    /// the result. Returns whether the line was accepted. Malformed lines and
    /// read timeouts keep the previous reading and return `Ok(false)`.
    pub fn update(&mut self) -> Result<bool> {
        self.link
            .clear_input()
            .map_err(to_report)
            .wrap_err("flushing scale input")?;
        let raw = self
            .link
            .read_line()
            .map_err(to_report)
            .wrap_err("reading scale line")?;
        if raw.is_empty() {
            tracing::debug!("scale read timed out");
            return Ok(false);
        }
        tracing::debug!(raw = %String::from_utf8_lossy(&raw).escape_debug(), "scale line");
        match self.decoder.decode(&raw, &self.reading) {
            Ok(reading) => {
                self.reading = reading;
                self.state
                    .publish_reading(&reading, self.resolution())
                    .wrap_err("publishing scale reading")?;
                Ok(true)
            }
            Err(e) => {
                tracing::debug!(error = %e, "discarded scale line");
                Ok(false)
            }
        }
    }

    /// Press the scale's mode button, wait for it to settle, then refresh.
    pub fn change_unit(&mut self) -> Result<()> {
        match self.decoder.model().mode_command() {
            Some(cmd) => {
                tracing::debug!(from = %self.reading.unit, "changing scale unit");
                self.link
                    .write_all(cmd)
                    .map_err(to_report)
                    .wrap_err("sending unit change command")?;
                self.clock.sleep(self.unit_settle);
            }
            None => {
                tracing::info!(model = %self.model(), "this scale does not support changing units over serial");
            }
        }
        self.update().map(|_| ())
    }

    pub fn model(&self) -> ScaleModel {
        self.decoder.model()
    }

    pub fn reading(&self) -> Reading {
        self.reading
    }

    pub fn weight(&self) -> Decimal {
        self.reading.weight
    }

    pub fn unit(&self) -> Unit {
        self.reading.unit
    }

    pub fn status(&self) -> ScaleStatus {
        self.reading.status
    }

    pub fn is_stable(&self) -> bool {
        self.reading.is_stable()
    }

    pub fn resolution(&self) -> Decimal {
        self.model().resolution(self.reading.unit)
    }
}

//! Scroll injection for X11-based systems.
//!
//! Scroll intents carry fractional wheel amounts, while X11 wheels are
//! buttons 4 (up) and 5 (down) that only click in whole steps. The
//! [`ScrollAccumulator`] carries the fractional remainder between frames and
//! the [`X11ScrollController`] synthesises the clicks through XTEST.

use crate::{
    error::{Error, Result},
    utils::safe_cast::f64_to_i32,
};
use log::{debug, info};
use x11rb::{
    connection::{Connection, RequestConnection},
    protocol::{
        xproto::{Window, BUTTON_PRESS_EVENT, BUTTON_RELEASE_EVENT},
        xtest::{self, ConnectionExt as _},
    },
    rust_connection::RustConnection,
    CURRENT_TIME,
};

/// X11 pointer button that scrolls up
const WHEEL_UP_BUTTON: u8 = 4;

/// X11 pointer button that scrolls down
const WHEEL_DOWN_BUTTON: u8 = 5;

/// Destination for wheel scroll amounts
pub trait ScrollSink {
    /// Scroll by `amount` wheel units; positive scrolls up
    ///
    /// # Errors
    ///
    /// Returns an error if the scroll event cannot be delivered
    fn scroll(&mut self, amount: f64) -> Result<()>;
}

/// Sums fractional wheel amounts and releases them as whole clicks
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollAccumulator {
    pending: f64,
}

impl ScrollAccumulator {
    /// Create an empty accumulator
    #[must_use]
    pub const fn new() -> Self {
        Self { pending: 0.0 }
    }

    /// Add `amount` and take out every whole click now available
    ///
    /// Positive clicks scroll up, negative scroll down. Non-finite amounts are ignored.
    pub fn push(&mut self, amount: f64) -> i32 {
        if !amount.is_finite() {
            return 0;
        }

        self.pending += amount;
        let clicks = f64_to_i32(self.pending.trunc()).unwrap_or(0);
        self.pending -= f64::from(clicks);
        clicks
    }

    /// Fraction of a click waiting to be released
    #[must_use]
    pub const fn pending(&self) -> f64 {
        self.pending
    }
}

/// Scroll injection through the X11 XTEST extension
pub struct X11ScrollController {
    connection: RustConnection,
    root: Window,
    accumulator: ScrollAccumulator,
}

impl X11ScrollController {
    /// Connect to the X server and check that XTEST is available
    ///
    /// # Errors
    ///
    /// Returns an error if the display cannot be reached or lacks XTEST
    pub fn new() -> Result<Self> {
        info!("Initializing X11 scroll controller");

        let (connection, screen_num) =
            RustConnection::connect(None).map_err(|e| Error::X11(format!("Failed to connect to X11: {e}")))?;

        let root = connection
            .setup()
            .roots
            .get(screen_num)
            .ok_or_else(|| Error::X11("Failed to get screen".to_string()))?
            .root;

        let has_xtest = connection
            .extension_information(xtest::X11_EXTENSION_NAME)
            .map_err(|e| Error::X11(format!("Failed to query XTEST: {e}")))?
            .is_some();
        if !has_xtest {
            return Err(Error::X11("X server does not support the XTEST extension".to_string()));
        }

        info!("Connected to X11 display, scroll injection ready");

        Ok(Self {
            connection,
            root,
            accumulator: ScrollAccumulator::new(),
        })
    }

    /// Press and release a wheel button `count` times
    fn click(&self, button: u8, count: u32) -> Result<()> {
        for _ in 0..count {
            for event in [BUTTON_PRESS_EVENT, BUTTON_RELEASE_EVENT] {
                self.connection
                    .xtest_fake_input(event, button, CURRENT_TIME, self.root, 0, 0, 0)
                    .map_err(|e| Error::ScrollControl(format!("Failed to send fake input: {e}")))?;
            }
        }

        self.connection
            .flush()
            .map_err(|e| Error::ScrollControl(format!("Failed to flush connection: {e}")))?;

        Ok(())
    }
}

impl ScrollSink for X11ScrollController {
    fn scroll(&mut self, amount: f64) -> Result<()> {
        let clicks = self.accumulator.push(amount);
        if clicks == 0 {
            return Ok(());
        }

        debug!("Scrolling {} click(s)", clicks);
        let button = if clicks > 0 { WHEEL_UP_BUTTON } else { WHEEL_DOWN_BUTTON };
        self.click(button, clicks.unsigned_abs())
    }
}

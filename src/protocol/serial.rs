// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Serial-port transport for ESP2 gateways.
//!
//! Requires the `serial` feature.

use std::io::{ErrorKind, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use serialport::SerialPort;

use crate::error::TransportError;
use crate::telegram::Esp2Codec;

use super::{Transport, TransportFactory, TransportSettings};

const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Returns a factory building [`SerialTransport`]s.
#[must_use]
pub fn serial_factory() -> TransportFactory {
    Arc::new(|settings| Box::new(SerialTransport::new(settings)) as Box<dyn Transport>)
}

/// Transport over a serial device, reading on a background thread.
pub struct SerialTransport {
    settings: TransportSettings,
    writer: Mutex<Option<Box<dyn SerialPort>>>,
    running: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl SerialTransport {
    /// Creates an unopened transport.
    #[must_use]
    pub fn new(settings: TransportSettings) -> Self {
        Self {
            settings,
            writer: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicBool::new(false)),
            reader: Mutex::new(None),
        }
    }

    fn open_error(&self, message: impl ToString) -> TransportError {
        TransportError::Open {
            port: self.settings.port.clone(),
            message: message.to_string(),
        }
    }
}

impl Transport for SerialTransport {
    fn start(&self) -> Result<(), TransportError> {
        if self.running.load(Ordering::Acquire) {
            return Ok(());
        }

        let mut builder = serialport::new(&self.settings.port, self.settings.baud_rate)
            .timeout(READ_TIMEOUT);
        #[cfg(unix)]
        {
            builder = builder
                .data_bits(serialport::DataBits::Eight)
                .stop_bits(serialport::StopBits::One)
                .parity(serialport::Parity::None);
        }
        let port = builder.open().map_err(|e| self.open_error(e))?;
        let reader_port = port.try_clone().map_err(|e| self.open_error(e))?;

        *self.writer.lock() = Some(port);
        self.running.store(true, Ordering::Release);
        self.active.store(true, Ordering::Release);

        let running = Arc::clone(&self.running);
        let active = Arc::clone(&self.active);
        let settings = self.settings.clone();
        let spawned = thread::Builder::new()
            .name("eltako-serial-reader".to_string())
            .spawn(move || read_loop(reader_port, &settings, &running, &active));
        match spawned {
            Ok(handle) => *self.reader.lock() = Some(handle),
            Err(e) => {
                self.running.store(false, Ordering::Release);
                self.active.store(false, Ordering::Release);
                self.writer.lock().take();
                return Err(e.into());
            }
        }

        tracing::debug!(port = %self.settings.port, baud_rate = self.settings.baud_rate, "Serial port opened");
        (self.settings.on_status)(true);
        Ok(())
    }

    fn stop(&self) {
        self.running.store(false, Ordering::Release);
        self.writer.lock().take();
        if self.active.swap(false, Ordering::AcqRel) {
            (self.settings.on_status)(false);
        }
    }

    fn join(&self) {
        let handle = self.reader.lock().take();
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            tracing::warn!(port = %self.settings.port, "Serial reader thread panicked");
        }
    }

    fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        let mut writer = self.writer.lock();
        let port = writer.as_mut().ok_or(TransportError::NotActive)?;
        port.write_all(frame)?;
        port.flush()?;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

fn read_loop(
    mut port: Box<dyn SerialPort>,
    settings: &TransportSettings,
    running: &AtomicBool,
    active: &AtomicBool,
) {
    let mut buffer = Vec::with_capacity(64);
    let mut chunk = [0u8; 64];

    while running.load(Ordering::Acquire) {
        match port.read(&mut chunk) {
            Ok(0) => {}
            Ok(n) => {
                buffer.extend_from_slice(&chunk[..n]);
                for frame in Esp2Codec::split_frames(&mut buffer) {
                    (settings.on_frame)(&frame);
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => {}
            Err(e) => {
                tracing::warn!(port = %settings.port, error = %e, "Serial read failed");
                running.store(false, Ordering::Release);
                if active.swap(false, Ordering::AcqRel) {
                    (settings.on_status)(false);
                }
                break;
            }
        }
    }
    tracing::debug!(port = %settings.port, "Serial reader finished");
}

use std::time::{Duration, Instant};

use clawpick_traits::{BoxError, SerialLink};
use rppal::uart::{Parity, Queue, Uart};
use tracing::{debug, info};

use crate::error::{HwError, Result};
use crate::util::LineBuffer;

const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Serial link to the microcontroller over a UART device node.
pub struct UartLink {
    uart: Option<Uart>,
    lines: LineBuffer,
    write_timeout: Duration,
}

impl UartLink {
    /// Open `path` at 8N1 and wait `settle` for the board to come out of reset.
    pub fn open(path: &str, baud_rate: u32, write_timeout: Duration, settle: Duration) -> Result<Self> {
        let mut uart = Uart::with_path(path, baud_rate, Parity::None, 8, 1)
            .map_err(|e| HwError::Uart(format!("open {path}: {e}")))?;
        // Non-blocking reads; deadlines are enforced by LineBuffer.
        uart.set_read_mode(0, Duration::ZERO)
            .map_err(|e| HwError::Uart(format!("read mode: {e}")))?;
        uart.set_write_mode(false)
            .map_err(|e| HwError::Uart(format!("write mode: {e}")))?;
        info!(path, baud_rate, "serial link open");
        std::thread::sleep(settle);
        Ok(Self {
            uart: Some(uart),
            lines: LineBuffer::new(),
            write_timeout,
        })
    }

    fn uart_mut(&mut self) -> Result<&mut Uart> {
        self.uart.as_mut().ok_or(HwError::NotOpen)
    }
}

impl SerialLink for UartLink {
    fn is_open(&self) -> bool {
        self.uart.is_some()
    }

    fn write_all(&mut self, bytes: &[u8]) -> std::result::Result<(), BoxError> {
        let deadline = Instant::now() + self.write_timeout;
        let uart = self.uart_mut()?;
        let mut off = 0;
        while off < bytes.len() {
            let n = uart
                .write(&bytes[off..])
                .map_err(|e| HwError::Uart(format!("write: {e}")))?;
            off += n;
            if n == 0 {
                if Instant::now() >= deadline {
                    return Err(Box::new(HwError::WriteTimeout));
                }
                std::thread::sleep(POLL_INTERVAL);
            }
        }
        Ok(())
    }

    fn clear_buffers(&mut self) -> std::result::Result<(), BoxError> {
        self.uart_mut()?
            .flush(Queue::Both)
            .map_err(|e| HwError::Uart(format!("flush: {e}")))?;
        self.lines.clear();
        Ok(())
    }

    fn read_line(&mut self, timeout: Duration) -> std::result::Result<Option<String>, BoxError> {
        let Some(uart) = self.uart.as_mut() else {
            return Err(Box::new(HwError::NotOpen));
        };
        let line = self.lines.read_line_with_timeout(
            |buf| {
                uart.read(buf)
                    .map_err(|e| HwError::Uart(format!("read: {e}")))
            },
            timeout,
            POLL_INTERVAL,
        )?;
        debug!(?line, "serial line");
        Ok(line)
    }

    fn close(&mut self) -> std::result::Result<(), BoxError> {
        if self.uart.take().is_some() {
            info!("serial link closed");
        }
        Ok(())
    }
}

//! Command channel to the robot over the serial link.

use std::time::Duration;

use clawpick_traits::SerialLink;

use crate::command::RobotCommand;
use crate::error::Result;
use crate::hw_error::map_hw_error;
use crate::pacing::Pacer;

/// Timing of the command channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkPolicy {
    /// Pause after every command written, so the board has read the line
    /// (and answered it, if it answers) before the next exchange.
    pub command_settle: Duration,
}

impl Default for LinkPolicy {
    fn default() -> Self {
        Self {
            command_settle: Duration::from_millis(100),
        }
    }
}

/// Anything that accepts motion commands.
///
/// `send` reports whether the command reached the wire. Failures are logged
/// by the implementation and never abort the caller.
pub trait CommandSink {
    fn send(&mut self, cmd: RobotCommand) -> bool;
}

impl<T: CommandSink + ?Sized> CommandSink for &mut T {
    fn send(&mut self, cmd: RobotCommand) -> bool {
        (**self).send(cmd)
    }
}

/// Owns the serial port. Commands and distance queries share it, so both
/// go through this one type.
#[derive(Debug)]
pub struct SerialCommandLink<P: SerialLink> {
    pub(crate) port: P,
    sent: u64,
    failed: u64,
    settle: Duration,
    pacer: Option<Pacer>,
}

impl<P: SerialLink> SerialCommandLink<P> {
    pub fn new(port: P) -> Self {
        Self {
            port,
            sent: 0,
            failed: 0,
            settle: Duration::ZERO,
            pacer: None,
        }
    }

    /// Pause `policy.command_settle` on `pacer` after each command sent.
    pub fn with_policy(mut self, policy: LinkPolicy, pacer: Pacer) -> Self {
        self.settle = policy.command_settle;
        self.pacer = Some(pacer);
        self
    }

    pub fn is_open(&self) -> bool {
        self.port.is_open()
    }

    /// Commands written successfully so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    pub fn close(&mut self) -> Result<()> {
        if !self.port.is_open() {
            return Ok(());
        }
        self.port
            .close()
            .map_err(|e| eyre::Report::new(map_hw_error(e.as_ref())))?;
        tracing::info!("serial link closed");
        Ok(())
    }
}

impl<P: SerialLink> CommandSink for SerialCommandLink<P> {
    fn send(&mut self, cmd: RobotCommand) -> bool {
        if !self.port.is_open() {
            self.failed += 1;
            tracing::warn!(command = %cmd, "serial link not open; command not sent");
            return false;
        }
        match self.port.write_all(cmd.wire_line().as_bytes()) {
            Ok(()) => {
                self.sent += 1;
                tracing::info!(verb = %cmd.verb(), duration_ms = cmd.duration_ms(), "sent command");
                // Interrupted settles surface at the caller's next check.
                if let Some(pacer) = &self.pacer {
                    let _ = pacer.wait(self.settle);
                }
                true
            }
            Err(e) => {
                self.failed += 1;
                tracing::error!(command = %cmd, error = %e, "failed to send command");
                false
            }
        }
    }
}

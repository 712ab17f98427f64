//! Test doubles shared by the unit tests.
use std::collections::VecDeque;

use crate::robot::joint::JointId;
use crate::robot::servo::ActuatorDriver;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Write {
    pub id: JointId,
    pub position: i16,
    pub speed: u16,
    pub acceleration: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unreachable(pub JointId);

/// Records every write; can be told to fail or to hide one joint.
#[derive(Debug, Default)]
pub struct RecordingDriver {
    pub writes: Vec<Write>,
    pub attempts: usize,
    pub fail_on: Option<JointId>,
    pub absent: Option<JointId>,
    pub voltage: f32,
}

impl RecordingDriver {
    pub fn clear(&mut self) {
        self.writes.clear();
        self.attempts = 0;
    }
}

impl ActuatorDriver for RecordingDriver {
    type Error = Unreachable;

    fn write_position(
        &mut self,
        id: JointId,
        position: i16,
        speed: u16,
        acceleration: u8,
    ) -> Result<(), Self::Error> {
        self.attempts += 1;
        if self.fail_on == Some(id) {
            return Err(Unreachable(id));
        }
        self.writes.push(Write {
            id,
            position,
            speed,
            acceleration,
        });
        Ok(())
    }

    fn ping(&mut self, id: JointId) -> Result<bool, Self::Error> {
        Ok(self.absent != Some(id))
    }

    fn read_voltage(&mut self, _id: JointId) -> Result<f32, Self::Error> {
        Ok(self.voltage)
    }
}

/// In-memory UART: records transmitted bytes and replays canned replies.
///
/// `rx` holds bytes already waiting in the receive buffer. Each flush of a
/// transmitted packet delivers the next queued reply into `rx`, the way a servo
/// answers only after it was addressed.
#[derive(Debug, Default)]
pub struct SerialPort {
    pub tx: Vec<u8>,
    pub rx: VecDeque<u8>,
    replies: VecDeque<Vec<u8>>,
}

impl SerialPort {
    /// Bytes sitting in the receive buffer before anything is sent.
    pub fn with_rx(rx: &[u8]) -> Self {
        Self {
            rx: rx.iter().copied().collect(),
            ..Self::default()
        }
    }

    /// Queues `reply` to arrive after the next transmitted packet.
    pub fn then_reply(mut self, reply: &[u8]) -> Self {
        self.replies.push_back(reply.to_vec());
        self
    }
}

impl embedded_io::ErrorType for SerialPort {
    type Error = core::convert::Infallible;
}

impl embedded_io::Read for SerialPort {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut n = 0;
        while n < buf.len() {
            match self.rx.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl embedded_io::ReadReady for SerialPort {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.rx.is_empty())
    }
}

impl embedded_io::Write for SerialPort {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.tx.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if let Some(reply) = self.replies.pop_front() {
            self.rx.extend(reply);
        }
        Ok(())
    }
}

//! Feetech STS/SMS serial bus servo driver.
//!
//! Half-duplex packets over a UART:
//! `FF FF id len instr params… checksum`, with `len = params + 2` and
//! `checksum = !(id + len + instr + params)`. Every instruction is answered by a
//! status packet `FF FF id len error params… checksum`.
use embassy_time::{Duration, Instant};
use heapless::Vec;
use log::debug;
use thiserror::Error;

use super::joint::JointId;
use super::servo::ActuatorDriver;

const HEADER: [u8; 2] = [0xFF, 0xFF];
const INSTR_PING: u8 = 0x01;
const INSTR_READ: u8 = 0x02;
const INSTR_WRITE: u8 = 0x03;

/// Start of the `acc, pos(2), time(2), speed(2)` register block.
const REG_ACC: u8 = 41;
const REG_PRESENT_VOLTAGE: u8 = 62;

/// Sign bit of a position register.
const POSITION_SIGN: u16 = 1 << 15;

const MAX_PACKET: usize = 16;

/// A status packet takes well under a millisecond at 1 Mbaud.
const REPLY_TIMEOUT: Duration = Duration::from_millis(2);

#[derive(Debug, Error)]
pub enum BusError<E: core::fmt::Debug> {
    #[error("serial error: {0:?}")]
    Io(E),
    #[error("no reply")]
    Timeout,
    #[error("malformed reply")]
    Malformed,
    #[error("reply from id {got}, expected {expected}")]
    WrongId { expected: u8, got: u8 },
    #[error("reply checksum mismatch")]
    Checksum,
    #[error("servo reported error flags {0:#04x}")]
    Status(u8),
}

fn checksum(data: &[u8]) -> u8 {
    !data.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

fn encode_position(position: i16) -> u16 {
    if position < 0 {
        position.unsigned_abs() | POSITION_SIGN
    } else {
        position as u16
    }
}

pub struct StsBus<U> {
    uart: U,
    /// Time allowed for a whole status packet to arrive.
    reply_timeout: Duration,
}

impl<U> StsBus<U>
where
    U: embedded_io::Read + embedded_io::Write + embedded_io::ReadReady,
{
    pub fn new(uart: U) -> Self {
        Self {
            uart,
            reply_timeout: REPLY_TIMEOUT,
        }
    }

    pub fn with_reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }

    pub fn into_inner(self) -> U {
        self.uart
    }

    fn send(&mut self, id: u8, instr: u8, params: &[u8]) -> Result<(), BusError<U::Error>> {
        let mut packet: Vec<u8, MAX_PACKET> = Vec::new();
        let length = params.len() as u8 + 2;
        packet
            .extend_from_slice(&[HEADER[0], HEADER[1], id, length, instr])
            .map_err(|_| BusError::Malformed)?;
        packet
            .extend_from_slice(params)
            .map_err(|_| BusError::Malformed)?;
        let sum = checksum(&packet[2..]);
        packet.push(sum).map_err(|_| BusError::Malformed)?;

        self.drain()?;
        self.uart.write_all(&packet).map_err(BusError::Io)?;
        self.uart.flush().map_err(BusError::Io)
    }

    /// Discards whatever is left in the receive buffer, such as a status packet
    /// that arrived after its transaction timed out.
    fn drain(&mut self) -> Result<(), BusError<U::Error>> {
        let mut scratch = [0u8; MAX_PACKET];
        let mut dropped = 0usize;
        while self.uart.read_ready().map_err(BusError::Io)? {
            match self.uart.read(&mut scratch).map_err(BusError::Io)? {
                0 => break,
                n => dropped += n,
            }
        }
        if dropped > 0 {
            debug!("dropped {dropped} stale bytes");
        }
        Ok(())
    }

    fn read_byte(&mut self, deadline: Instant) -> Result<u8, BusError<U::Error>> {
        loop {
            if self.uart.read_ready().map_err(BusError::Io)? {
                let mut byte = [0u8; 1];
                if self.uart.read(&mut byte).map_err(BusError::Io)? == 1 {
                    return Ok(byte[0]);
                }
            }
            if Instant::now() >= deadline {
                return Err(BusError::Timeout);
            }
        }
    }

    /// Reads a status packet from `id` and returns its parameters.
    fn receive(&mut self, id: u8) -> Result<Vec<u8, MAX_PACKET>, BusError<U::Error>> {
        let deadline = Instant::now() + self.reply_timeout;
        if self.read_byte(deadline)? != HEADER[0] || self.read_byte(deadline)? != HEADER[1] {
            return Err(BusError::Malformed);
        }
        let got = self.read_byte(deadline)?;
        let length = self.read_byte(deadline)?;
        if !(2..MAX_PACKET as u8).contains(&length) {
            return Err(BusError::Malformed);
        }

        let mut body: Vec<u8, MAX_PACKET> = Vec::new();
        for _ in 0..length {
            let byte = self.read_byte(deadline)?;
            body.push(byte).map_err(|_| BusError::Malformed)?;
        }
        let (received_sum, rest) = body.split_last().ok_or(BusError::Malformed)?;
        let expected_sum = !rest
            .iter()
            .fold(got.wrapping_add(length), |sum, b| sum.wrapping_add(*b));
        if *received_sum != expected_sum {
            return Err(BusError::Checksum);
        }
        if got != id {
            return Err(BusError::WrongId { expected: id, got });
        }

        let (error, params) = rest.split_first().ok_or(BusError::Malformed)?;
        if *error != 0 {
            return Err(BusError::Status(*error));
        }
        Vec::from_slice(params).map_err(|_| BusError::Malformed)
    }
}

impl<U> ActuatorDriver for StsBus<U>
where
    U: embedded_io::Read + embedded_io::Write + embedded_io::ReadReady,
{
    type Error = BusError<U::Error>;

    fn write_position(
        &mut self,
        id: JointId,
        position: i16,
        speed: u16,
        acceleration: u8,
    ) -> Result<(), Self::Error> {
        let [pos_lo, pos_hi] = encode_position(position).to_le_bytes();
        let [speed_lo, speed_hi] = speed.to_le_bytes();
        let params = [
            REG_ACC,
            acceleration,
            pos_lo,
            pos_hi,
            0,
            0,
            speed_lo,
            speed_hi,
        ];
        self.send(id.0, INSTR_WRITE, &params)?;
        self.receive(id.0).map(|_| ())
    }

    fn ping(&mut self, id: JointId) -> Result<bool, Self::Error> {
        self.send(id.0, INSTR_PING, &[])?;
        match self.receive(id.0) {
            Ok(_) => Ok(true),
            Err(BusError::Timeout) => {
                debug!("{id}: no answer to ping");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn read_voltage(&mut self, id: JointId) -> Result<f32, Self::Error> {
        self.send(id.0, INSTR_READ, &[REG_PRESENT_VOLTAGE, 1])?;
        let params = self.receive(id.0)?;
        let tenths = params.first().copied().ok_or(BusError::Malformed)?;
        Ok(tenths as f32 / 10.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SerialPort;

    fn status(id: u8, error: u8, params: &[u8]) -> std::vec::Vec<u8> {
        let mut packet = vec![0xFF, 0xFF, id, params.len() as u8 + 2, error];
        packet.extend_from_slice(params);
        packet.push(checksum(&packet[2..]));
        packet
    }

    fn bus_replying(reply: &[u8]) -> StsBus<SerialPort> {
        StsBus::new(SerialPort::default().then_reply(reply))
            .with_reply_timeout(Duration::from_millis(1))
    }

    #[test]
    fn ping_packet() {
        let mut bus = bus_replying(&status(1, 0, &[]));
        assert!(bus.ping(JointId(1)).unwrap());
        assert_eq!(bus.into_inner().tx, [0xFF, 0xFF, 0x01, 0x02, 0x01, 0xFB]);
    }

    #[test]
    fn silent_servo_is_absent() {
        let mut bus = bus_replying(&[]);
        assert!(!bus.ping(JointId(3)).unwrap());
    }

    #[test]
    fn write_position_packet() {
        let mut bus = bus_replying(&status(1, 0, &[]));
        bus.write_position(JointId(1), 1000, 4000, 250).unwrap();
        let tx = bus.into_inner().tx;
        assert_eq!(
            tx[..13],
            [0xFF, 0xFF, 0x01, 0x0A, 0x03, 41, 250, 0xE8, 0x03, 0x00, 0x00, 0xA0, 0x0F]
        );
        assert_eq!(tx[13], 0x34);
        assert_eq!(tx.len(), 14);
    }

    #[test]
    fn negative_position_uses_sign_bit() {
        assert_eq!(encode_position(-1), 0x8001);
        assert_eq!(encode_position(-25), 0x8019);
        assert_eq!(encode_position(2047), 2047);
    }

    #[test]
    fn read_voltage_in_volts() {
        let mut bus = bus_replying(&status(2, 0, &[74]));
        let volts = bus.read_voltage(JointId(2)).unwrap();
        assert!((volts - 7.4).abs() < 1e-6);

        let tx = bus.into_inner().tx;
        assert_eq!(tx[..7], [0xFF, 0xFF, 0x02, 0x04, 0x02, 62, 1]);
    }

    #[test]
    fn reply_validation() {
        let mut corrupted = status(1, 0, &[]);
        *corrupted.last_mut().unwrap() ^= 0x55;
        let mut bus = bus_replying(&corrupted);
        assert!(matches!(
            bus.write_position(JointId(1), 0, 0, 0),
            Err(BusError::Checksum)
        ));

        let mut bus = bus_replying(&status(4, 0, &[]));
        assert!(matches!(
            bus.write_position(JointId(1), 0, 0, 0),
            Err(BusError::WrongId {
                expected: 1,
                got: 4
            })
        ));

        let mut bus = bus_replying(&status(1, 0x20, &[]));
        assert!(matches!(
            bus.write_position(JointId(1), 0, 0, 0),
            Err(BusError::Status(0x20))
        ));
    }

    #[test]
    fn stale_reply_is_dropped_before_the_next_write() {
        let port = SerialPort::with_rx(&status(1, 0, &[]))
            .then_reply(&status(2, 0, &[]))
            .then_reply(&status(3, 0, &[]));
        let mut bus = StsBus::new(port).with_reply_timeout(Duration::from_millis(1));

        bus.write_position(JointId(2), 100, 0, 0).unwrap();
        bus.write_position(JointId(3), 100, 0, 0).unwrap();
        assert!(bus.into_inner().rx.is_empty());
    }

    #[test]
    fn late_reply_does_not_desync_the_bus() {
        // servo 1 answers after its write timed out; the reply is still buffered
        let mut bus = bus_replying(&[]);
        assert!(matches!(
            bus.write_position(JointId(1), 0, 0, 0),
            Err(BusError::Timeout)
        ));
        let mut port = bus.into_inner();
        port.rx.extend(status(1, 0, &[]));

        let mut bus = StsBus::new(port.then_reply(&status(2, 0, &[74])))
            .with_reply_timeout(Duration::from_millis(1));
        let volts = bus.read_voltage(JointId(2)).unwrap();
        assert!((volts - 7.4).abs() < 1e-6);
    }
}

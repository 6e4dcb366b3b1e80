//! Clock controller.
//!
//! Mostly plain storage with one quirk: the PLL status words report their
//! lock bit based on whether a divisor has been programmed. A stored value
//! of 4 (the power-on divisor) reads back with bit 0 clear; anything else
//! reads back with bit 0 set. Boot firmware polls these words until the
//! lock bit matches its expectation.

use avalanche_io_snapshot::{
    IoSnapshot, SnapshotError, SnapshotReader, SnapshotResult, SnapshotVersion, SnapshotWriter,
};

use crate::regs::RegWindow;

pub const CLOCK_SIZE: usize = 0x100;

/// Word indexes of the PLL status registers.
const PLL_STATUS_WORDS: [u32; 4] = [0x0c, 0x14, 0x1c, 0x24];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockCtrl {
    regs: RegWindow,
}

impl Default for ClockCtrl {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockCtrl {
    pub fn new() -> Self {
        Self {
            regs: RegWindow::new(CLOCK_SIZE),
        }
    }

    pub fn mmio_read(&self, offset: u32) -> u32 {
        let index = offset / 4;
        let mut val = self.regs.read(offset);
        if PLL_STATUS_WORDS.contains(&index) {
            if val == 4 {
                val &= !1;
            } else {
                val |= 1;
            }
        }
        tracing::trace!(target: "avalanche::clock", index, val = format_args!("{val:#010x}"), "read");
        val
    }

    pub fn mmio_write(&mut self, offset: u32, val: u32) {
        let index = offset / 4;
        if index == 0 {
            let old_power_state = self.regs.read(0) >> 30;
            let new_power_state = val >> 30;
            if old_power_state != new_power_state {
                tracing::trace!(target: "avalanche::clock", from = old_power_state, to = new_power_state, "power state change");
            }
        }
        tracing::trace!(target: "avalanche::clock", index, val = format_args!("{val:#010x}"), "write");
        self.regs.write(offset, val);
    }

    pub fn reset(&mut self) {
        self.regs.fill_zero();
    }
}

impl IoSnapshot for ClockCtrl {
    const DEVICE_ID: [u8; 4] = *b"CLKC";
    const DEVICE_VERSION: SnapshotVersion = SnapshotVersion::new(0, 0);

    fn save_state(&self) -> Vec<u8> {
        let mut w = SnapshotWriter::new(Self::DEVICE_ID, Self::DEVICE_VERSION);
        w.field_bytes(1, self.regs.as_bytes().to_vec());
        w.finish()
    }

    fn load_state(&mut self, bytes: &[u8]) -> SnapshotResult<()> {
        let r = SnapshotReader::parse(bytes, Self::DEVICE_ID)?;
        r.ensure_device_major(Self::DEVICE_VERSION.major)?;
        if let Some(regs) = r.bytes(1) {
            if !self.regs.load_bytes(regs) {
                return Err(SnapshotError::InvalidFieldEncoding("clock regs length"));
            }
        }
        Ok(())
    }
}

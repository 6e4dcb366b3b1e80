//! VLYNQ serial-bus port controller.
//!
//! Emulated at the register level only: the revision id reads back a fixed
//! value and the control register's reset bit is mirrored into the status
//! register's link bit. Everything else is plain storage.

use avalanche_io_snapshot::{
    IoSnapshot, SnapshotError, SnapshotReader, SnapshotResult, SnapshotVersion, SnapshotWriter,
};

use crate::regs::RegWindow;

pub const VLYNQ_SIZE: usize = 0x100;

pub const VLYNQ_REVID: u32 = 0x00;
pub const VLYNQ_CTRL: u32 = 0x04;
pub const VLYNQ_STAT: u32 = 0x08;

/// Revision 1.2.6, what the TNETD7300 reports.
pub const VLYNQ_REVISION: u32 = 0x0001_0206;

const CTRL_RESET: u32 = 1 << 0;
const STAT_LINK: u32 = 1 << 0;

const NAMES: [&str; 58] = [
    "Revision",
    "Control",
    "Status",
    "Interrupt Priority Vector Status/Clear",
    "Interrupt Status/Clear",
    "Interrupt Pending/Set",
    "Interrupt Pointer",
    "Tx Address Map",
    "Rx Address Map Size 1",
    "Rx Address Map Offset 1",
    "Rx Address Map Size 2",
    "Rx Address Map Offset 2",
    "Rx Address Map Size 3",
    "Rx Address Map Offset 3",
    "Rx Address Map Size 4",
    "Rx Address Map Offset 4",
    "Chip Version",
    "Auto Negotiation",
    "Manual Negotiation",
    "Negotiation Status",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Remote Revision",
    "Remote Control",
    "Remote Status",
    "Remote Interrupt Priority Vector Status/Clear",
    "Remote Interrupt Status/Clear",
    "Remote Interrupt Pending/Set",
    "Remote Interrupt Pointer",
    "Remote Tx Address Map",
    "Remote Rx Address Map Size 1",
    "Remote Rx Address Map Offset 1",
    "Remote Rx Address Map Size 2",
    "Remote Rx Address Map Offset 2",
    "Remote Rx Address Map Size 3",
    "Remote Rx Address Map Offset 3",
    "Remote Rx Address Map Size 4",
    "Remote Rx Address Map Offset 4",
    "Remote Chip Version",
    "Remote Auto Negotiation",
    "Remote Manual Negotiation",
    "Remote Negotiation Status",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Remote Interrupt Vector 3-0",
    "Remote Interrupt Vector 7-4",
];

fn reg_name(offset: u32) -> &'static str {
    NAMES.get((offset / 4) as usize).copied().unwrap_or("unknown")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vlynq {
    index: usize,
    regs: RegWindow,
}

impl Vlynq {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            regs: RegWindow::new(VLYNQ_SIZE),
        }
    }

    pub fn mmio_read(&self, offset: u32) -> u32 {
        let mut val = self.regs.read(offset);
        if offset == VLYNQ_REVID {
            val = VLYNQ_REVISION;
        }
        tracing::trace!(target: "avalanche::vlynq", index = self.index, reg = reg_name(offset), val = format_args!("{val:#010x}"), "read");
        val
    }

    pub fn mmio_write(&mut self, offset: u32, val: u32) {
        tracing::trace!(target: "avalanche::vlynq", index = self.index, reg = reg_name(offset), val = format_args!("{val:#010x}"), "write");
        if offset == VLYNQ_CTRL {
            if val & CTRL_RESET == 0 {
                // Normal operation: the link comes up.
                self.regs.set(VLYNQ_STAT, STAT_LINK);
            } else {
                self.regs.clear(VLYNQ_STAT, STAT_LINK);
            }
        }
        self.regs.write(offset, val);
    }

    pub fn reset(&mut self) {
        self.regs.fill_zero();
    }
}

impl IoSnapshot for Vlynq {
    const DEVICE_ID: [u8; 4] = *b"VLNQ";
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
                return Err(SnapshotError::InvalidFieldEncoding("vlynq regs length"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_is_constant() {
        let mut vlynq = Vlynq::new(0);
        assert_eq!(vlynq.mmio_read(VLYNQ_REVID), VLYNQ_REVISION);
        vlynq.mmio_write(VLYNQ_REVID, 0x1234_5678);
        assert_eq!(vlynq.mmio_read(VLYNQ_REVID), VLYNQ_REVISION);
    }

    #[test]
    fn clearing_the_reset_bit_raises_the_link() {
        let mut vlynq = Vlynq::new(1);
        vlynq.mmio_write(VLYNQ_CTRL, 0);
        assert_eq!(vlynq.mmio_read(VLYNQ_STAT) & 1, 1);

        vlynq.mmio_write(VLYNQ_CTRL, 1);
        assert_eq!(vlynq.mmio_read(VLYNQ_STAT) & 1, 0);
    }

    #[test]
    fn other_offsets_are_plain_storage() {
        let mut vlynq = Vlynq::new(0);
        vlynq.mmio_write(0x1c, 0xabcd_0123);
        assert_eq!(vlynq.mmio_read(0x1c), 0xabcd_0123);
    }
}

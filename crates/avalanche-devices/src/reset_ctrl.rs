//! Peripheral reset controller.
//!
//! Word 0 holds the per-peripheral enable bits (1 = enabled); writes trace
//! which devices changed state. A write to word 1 requests a full system
//! reset from the host. The rest of the block is plain storage.

use avalanche_io_snapshot::{
    IoSnapshot, SnapshotError, SnapshotReader, SnapshotResult, SnapshotVersion, SnapshotWriter,
};

use crate::regs::RegWindow;

pub const RESET_SIZE: usize = 0x200;

const REG_PERIPH_RESET: u32 = 0x00;
const REG_SYSTEM_RESET: u32 = 0x04;

/// Host-side handler for a guest-requested system reset.
pub trait SystemResetSink {
    fn request_system_reset(&mut self);
}

impl<F: FnMut()> SystemResetSink for F {
    fn request_system_reset(&mut self) {
        self()
    }
}

const RESET_DEVICES: [&str; 32] = [
    "uart0", "uart1", "i2c", "timer0",
    "timer1", "reserved05", "gpio", "adsl",
    "usb", "atm", "reserved10", "vdma",
    "fser", "reserved13", "reserved14", "reserved15",
    "vlynq1", "cpmac0", "mcdma", "bist",
    "vlynq0", "cpmac1", "mdio", "dsp",
    "reserved24", "reserved25", "ephy", "reserved27",
    "reserved28", "reserved29", "reserved30", "reserved31",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetCtrl {
    regs: RegWindow,
}

impl Default for ResetCtrl {
    fn default() -> Self {
        Self::new()
    }
}

impl ResetCtrl {
    pub fn new() -> Self {
        Self {
            regs: RegWindow::new(RESET_SIZE),
        }
    }

    pub fn mmio_read(&self, offset: u32) -> u32 {
        let val = self.regs.read(offset);
        tracing::trace!(target: "avalanche::reset", offset = format_args!("{offset:#x}"), val = format_args!("{val:#010x}"), "read");
        val
    }

    pub fn mmio_write(&mut self, offset: u32, val: u32, sink: &mut dyn SystemResetSink) {
        match offset {
            REG_PERIPH_RESET => {
                let changed = self.regs.read(REG_PERIPH_RESET) ^ val;
                let enabled = changed & val;
                for (bit, name) in RESET_DEVICES.iter().enumerate() {
                    if changed & (1 << bit) != 0 {
                        let state = if enabled & (1 << bit) != 0 {
                            "enabled"
                        } else {
                            "disabled"
                        };
                        tracing::trace!(target: "avalanche::reset", device = name, state, "peripheral reset change");
                    }
                }
            }
            REG_SYSTEM_RESET => {
                tracing::trace!(target: "avalanche::reset", "system reset requested");
                sink.request_system_reset();
            }
            _ => {
                tracing::trace!(target: "avalanche::reset", offset = format_args!("{offset:#x}"), val = format_args!("{val:#010x}"), "write");
            }
        }
        self.regs.write(offset, val);
    }

    pub fn reset(&mut self) {
        self.regs.fill_zero();
    }
}

impl IoSnapshot for ResetCtrl {
    const DEVICE_ID: [u8; 4] = *b"RSTC";
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
                return Err(SnapshotError::InvalidFieldEncoding("reset regs length"));
            }
        }
        Ok(())
    }
}

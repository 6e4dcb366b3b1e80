//! MDIO master and the embedded PHY it talks to.
//!
//! The register bank is 34 words; only `useraccess0` has real behavior. A
//! write with `GO` set performs the whole PHY transaction synchronously
//! (there is no bus to wait for, so `ACK` latency is not modeled). The
//! single integrated PHY answers at address 31 for its first six MII
//! registers and auto-completes negotiation on the reset/renegotiate
//! control bits.

use avalanche_io_snapshot::{
    Decoder, Encoder, IoSnapshot, SnapshotError, SnapshotReader, SnapshotResult, SnapshotVersion,
    SnapshotWriter,
};

use crate::regs::RegWindow;

pub const MDIO_SIZE: usize = 0x88;

// Word indexes.
const IDX_VER: u32 = 0;
const IDX_CONTROL: u32 = 1;
const IDX_LINK: u32 = 3;
const IDX_USERACCESS0: u32 = 0x20;

// useraccess0 bit fields.
pub const USERACCESS_GO: u32 = 1 << 31;
pub const USERACCESS_WRITE: u32 = 1 << 30;
pub const USERACCESS_ACK: u32 = 1 << 29;
pub const USERACCESS_REGADR: u32 = 0x1f << 21;
pub const USERACCESS_PHYADR: u32 = 0x1f << 16;
pub const USERACCESS_DATA: u32 = 0xffff;

// MII register numbers of the integrated PHY.
pub const PHY_CONTROL_REG: u32 = 0;
pub const PHY_STATUS_REG: u32 = 1;
pub const NWAY_ADVERTIZE_REG: u32 = 4;
pub const NWAY_REMADVERTISE_REG: u32 = 5;

// PHY control bits.
pub const PHY_RESET: u16 = 1 << 15;
pub const AUTO_NEGOTIATE_EN: u16 = 1 << 12;
pub const PHY_ISOLATE: u16 = 1 << 10;
pub const RENEGOTIATE: u16 = 1 << 9;

// PHY status bits.
pub const NWAY_CAPABLE: u16 = 1 << 3;

// Auto-negotiation advertisement bits.
pub const NWAY_FD100: u16 = 1 << 8;
pub const NWAY_HD100: u16 = 1 << 7;
pub const NWAY_FD10: u16 = 1 << 6;
pub const NWAY_HD10: u16 = 1 << 5;
pub const NWAY_AUTO: u16 = 1 << 0;

const PHY_COUNT: usize = 1;
const PHY_REG_COUNT: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mdio {
    regs: RegWindow,
    phy: [[u16; PHY_REG_COUNT]; PHY_COUNT],
    // Scratch from the last useraccess transaction, kept for diagnostics.
    regaddr: u32,
    phyaddr: u32,
    data: u32,
}

impl Default for Mdio {
    fn default() -> Self {
        Self::new()
    }
}

impl Mdio {
    pub fn new() -> Self {
        let mut regs = RegWindow::new(MDIO_SIZE);
        regs.write(IDX_VER * 4, 0x0007_0101);
        regs.write(IDX_CONTROL * 4, 0);
        regs.write(2 * 4, 0xffff_ffff);
        Self {
            regs,
            phy: [Self::phy_defaults()],
            regaddr: 0,
            phyaddr: 0,
            data: 0,
        }
    }

    fn phy_defaults() -> [u16; PHY_REG_COUNT] {
        [
            AUTO_NEGOTIATE_EN,
            0x7801 | NWAY_CAPABLE,
            0,
            0,
            NWAY_FD100 | NWAY_HD100 | NWAY_FD10 | NWAY_HD10 | NWAY_AUTO,
            NWAY_AUTO,
        ]
    }

    pub fn phy_reg(&self, phy: usize, reg: usize) -> u16 {
        self.phy[phy][reg]
    }

    pub fn mmio_read(&mut self, offset: u32) -> u32 {
        let index = offset / 4;
        let val = self.regs.read(offset);
        match index {
            IDX_VER => {
                tracing::trace!(target: "avalanche::mdio", val = format_args!("{val:#010x}"), "read MDIO_VER");
            }
            IDX_CONTROL => {
                tracing::trace!(target: "avalanche::mdio", val = format_args!("{val:#010x}"), "read MDIO_CONTROL");
            }
            IDX_USERACCESS0 => {
                self.data = val & USERACCESS_DATA;
                tracing::trace!(target: "avalanche::mdio", val = format_args!("{val:#010x}"), reg = self.regaddr, phy = self.phyaddr, data = format_args!("{:#06x}", self.data), "read useraccess0");
            }
            _ => {
                tracing::trace!(target: "avalanche::mdio", index, val = format_args!("{val:#010x}"), "read");
            }
        }
        val
    }

    pub fn mmio_write(&mut self, offset: u32, val: u32) {
        let index = offset / 4;
        let stored = match index {
            IDX_VER => {
                tracing::warn!(target: "avalanche::mdio", val = format_args!("{val:#010x}"), "unexpected write to MDIO_VER");
                val
            }
            IDX_CONTROL => {
                tracing::trace!(target: "avalanche::mdio", val = format_args!("{val:#010x}"), "write MDIO_CONTROL");
                val
            }
            IDX_USERACCESS0 if val & USERACCESS_GO != 0 => self.user_access(val),
            _ => {
                tracing::trace!(target: "avalanche::mdio", index, val = format_args!("{val:#010x}"), "write");
                val
            }
        };
        self.regs.write(offset, stored);
    }

    /// Runs one `useraccess0` transaction; returns the value left in the
    /// register (the `DATA` field for transactions the PHY answered, the
    /// raw value otherwise).
    fn user_access(&mut self, val: u32) -> u32 {
        let write = val & USERACCESS_WRITE != 0;
        self.regaddr = (val & USERACCESS_REGADR) >> 21;
        self.phyaddr = (val & USERACCESS_PHYADR) >> 16;
        self.data = val & USERACCESS_DATA;
        tracing::trace!(
            target: "avalanche::mdio",
            write,
            reg = self.regaddr,
            phy = self.phyaddr,
            data = format_args!("{:#06x}", self.data),
            "useraccess transaction"
        );

        if self.phyaddr != 31 || self.regaddr >= PHY_REG_COUNT as u32 {
            return val;
        }

        // Address 31 is the integrated PHY, register file slot 0.
        let reg = self.regaddr as usize;
        if write {
            self.phy[0][reg] = self.data as u16;
            return val & USERACCESS_DATA;
        }

        let mut out = self.phy[0][reg];
        if self.regaddr == PHY_CONTROL_REG && out & PHY_RESET != 0 {
            // Reset self-clears and leaves auto-negotiation enabled.
            self.phy[0][reg] = (out & !PHY_RESET) | AUTO_NEGOTIATE_EN;
        } else if self.regaddr == PHY_CONTROL_REG && out & RENEGOTIATE != 0 {
            // Negotiation completes instantly: link up, full remote
            // advertisement.
            out &= !RENEGOTIATE;
            self.phy[0][reg] = out;
            self.phy[0][PHY_STATUS_REG as usize] = 0x782d;
            self.phy[0][NWAY_REMADVERTISE_REG as usize] =
                self.phy[0][NWAY_ADVERTIZE_REG as usize] | PHY_ISOLATE | PHY_RESET;
            self.regs.write(IDX_LINK * 4, 0x8000_0000);
        }
        (out as u32) & USERACCESS_DATA
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl IoSnapshot for Mdio {
    const DEVICE_ID: [u8; 4] = *b"MDIO";
    const DEVICE_VERSION: SnapshotVersion = SnapshotVersion::new(0, 0);

    fn save_state(&self) -> Vec<u8> {
        let mut w = SnapshotWriter::new(Self::DEVICE_ID, Self::DEVICE_VERSION);
        w.field_bytes(1, self.regs.as_bytes().to_vec());
        let mut phy = Encoder::new();
        for bank in &self.phy {
            for reg in bank {
                phy = phy.u16(*reg);
            }
        }
        w.field_bytes(2, phy.finish());
        w.field_bytes(
            3,
            Encoder::new()
                .u32(self.regaddr)
                .u32(self.phyaddr)
                .u32(self.data)
                .finish(),
        );
        w.finish()
    }

    fn load_state(&mut self, bytes: &[u8]) -> SnapshotResult<()> {
        let r = SnapshotReader::parse(bytes, Self::DEVICE_ID)?;
        r.ensure_device_major(Self::DEVICE_VERSION.major)?;
        if let Some(regs) = r.bytes(1) {
            if !self.regs.load_bytes(regs) {
                return Err(SnapshotError::InvalidFieldEncoding("mdio regs length"));
            }
        }
        if let Some(phy) = r.bytes(2) {
            let mut d = Decoder::new(phy);
            for bank in &mut self.phy {
                for reg in bank.iter_mut() {
                    *reg = d.u16()?;
                }
            }
            d.finish()?;
        }
        if let Some(scratch) = r.bytes(3) {
            let mut d = Decoder::new(scratch);
            self.regaddr = d.u32()?;
            self.phyaddr = d.u32()?;
            self.data = d.u32()?;
            d.finish()?;
        }
        Ok(())
    }
}

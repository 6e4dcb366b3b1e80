//! Multi-stage locked watchdog timer.
//!
//! Eight consecutive words, alternating `*_lock` / value registers. Each
//! lock opens through a sequence of magic writes (two stages, three for
//! `disable`); the low two bits of the stored lock value encode the stage
//! reached. A value register only unlocks once its lock reads stage 3.
//!
//! The timer itself is never armed here — the device validates the unlock
//! protocol and traces the intent, which is all the guest driver observes.

use avalanche_io_snapshot::{
    IoSnapshot, SnapshotError, SnapshotReader, SnapshotResult, SnapshotVersion, SnapshotWriter,
};

use crate::regs::RegWindow;

pub const WATCHDOG_SIZE: usize = 0x80;

pub const REG_KICK_LOCK: u32 = 0x00;
pub const REG_KICK: u32 = 0x04;
pub const REG_CHANGE_LOCK: u32 = 0x08;
pub const REG_CHANGE: u32 = 0x0c;
pub const REG_DISABLE_LOCK: u32 = 0x10;
pub const REG_DISABLE: u32 = 0x14;
pub const REG_PRESCALE_LOCK: u32 = 0x18;
pub const REG_PRESCALE: u32 = 0x1c;

pub const KICK_LOCK_1ST_STAGE: u32 = 0x5555;
pub const KICK_LOCK_2ND_STAGE: u32 = 0xaaaa;
pub const PRESCALE_LOCK_1ST_STAGE: u32 = 0x5a5a;
pub const PRESCALE_LOCK_2ND_STAGE: u32 = 0xa5a5;
pub const CHANGE_LOCK_1ST_STAGE: u32 = 0x6666;
pub const CHANGE_LOCK_2ND_STAGE: u32 = 0xbbbb;
pub const DISABLE_LOCK_1ST_STAGE: u32 = 0x7777;
pub const DISABLE_LOCK_2ND_STAGE: u32 = 0xcccc;
pub const DISABLE_LOCK_3RD_STAGE: u32 = 0xdddd;

/// Stage encoding shared by all lock registers.
fn staged(val: u32, stage: u32) -> u32 {
    (val & !0x3) | stage
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watchdog {
    regs: RegWindow,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl Watchdog {
    pub fn new() -> Self {
        Self {
            regs: RegWindow::new(WATCHDOG_SIZE),
        }
    }

    pub fn mmio_read(&self, offset: u32) -> u32 {
        let val = self.regs.read(offset);
        tracing::trace!(target: "avalanche::wdog", offset = format_args!("{offset:#x}"), val = format_args!("{val:#010x}"), "read");
        val
    }

    /// Applies one staged lock write. `stages` lists
    /// `(magic, stage-it-sets, stage-it-requires)` in order; a non-initial
    /// stage only advances from its predecessor.
    fn lock_write(&mut self, name: &'static str, offset: u32, val: u32, stages: &[(u32, u32, u32)]) {
        let current = self.regs.read(offset) & 0x3;
        match stages.iter().find(|(magic, _, _)| val == *magic) {
            Some((_, stage, _)) if *stage == 1 => {
                tracing::trace!(target: "avalanche::wdog", lock = name, stage = *stage, "lock stage write");
                self.regs.write(offset, staged(val, *stage));
            }
            Some((_, stage, requires)) if current == *requires => {
                tracing::trace!(target: "avalanche::wdog", lock = name, stage = *stage, "lock stage write");
                self.regs.write(offset, staged(val, *stage));
            }
            Some((_, stage, _)) => {
                tracing::warn!(target: "avalanche::wdog", lock = name, stage = *stage, current, "unexpected out-of-order lock stage");
            }
            None => {
                tracing::warn!(target: "avalanche::wdog", lock = name, val = format_args!("{val:#010x}"), "unexpected lock value");
            }
        }
    }

    fn value_write(&mut self, name: &'static str, lock_offset: u32, terminal: u32, val: u32) {
        if self.regs.read(lock_offset) != staged(terminal, 3) {
            tracing::warn!(target: "avalanche::wdog", reg = name, val = format_args!("{val:#010x}"), "write while still locked");
        } else {
            // Accepted; no timer is actually programmed.
            tracing::trace!(target: "avalanche::wdog", reg = name, val = format_args!("{val:#010x}"), "value write");
        }
    }

    pub fn mmio_write(&mut self, offset: u32, val: u32) {
        match offset {
            REG_KICK_LOCK => self.lock_write(
                "kick",
                offset,
                val,
                &[(KICK_LOCK_1ST_STAGE, 1, 0), (KICK_LOCK_2ND_STAGE, 3, 1)],
            ),
            REG_KICK => self.value_write("kick", REG_KICK_LOCK, KICK_LOCK_2ND_STAGE, val),
            REG_CHANGE_LOCK => self.lock_write(
                "change",
                offset,
                val,
                &[(CHANGE_LOCK_1ST_STAGE, 1, 0), (CHANGE_LOCK_2ND_STAGE, 3, 1)],
            ),
            REG_CHANGE => self.value_write("change", REG_CHANGE_LOCK, CHANGE_LOCK_2ND_STAGE, val),
            REG_DISABLE_LOCK => self.lock_write(
                "disable",
                offset,
                val,
                &[
                    (DISABLE_LOCK_1ST_STAGE, 1, 0),
                    (DISABLE_LOCK_2ND_STAGE, 2, 1),
                    (DISABLE_LOCK_3RD_STAGE, 3, 2),
                ],
            ),
            REG_DISABLE => {
                self.value_write("disable", REG_DISABLE_LOCK, DISABLE_LOCK_3RD_STAGE, val)
            }
            REG_PRESCALE_LOCK => self.lock_write(
                "prescale",
                offset,
                val,
                &[(PRESCALE_LOCK_1ST_STAGE, 1, 0), (PRESCALE_LOCK_2ND_STAGE, 3, 1)],
            ),
            REG_PRESCALE => {
                self.value_write("prescale", REG_PRESCALE_LOCK, PRESCALE_LOCK_2ND_STAGE, val)
            }
            _ => {
                tracing::warn!(target: "avalanche::wdog", offset = format_args!("{offset:#x}"), val = format_args!("{val:#010x}"), "write to unknown watchdog offset");
            }
        }
    }

    /// Stage (0..=3) a lock register has reached. Test and trace helper.
    pub fn lock_stage(&self, lock_offset: u32) -> u32 {
        self.regs.read(lock_offset) & 0x3
    }

    pub fn reset(&mut self) {
        self.regs.fill_zero();
    }
}

impl IoSnapshot for Watchdog {
    const DEVICE_ID: [u8; 4] = *b"WDOG";
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
                return Err(SnapshotError::InvalidFieldEncoding("watchdog regs length"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kick_unlock_sequence_reaches_the_terminal_stage() {
        let mut wdog = Watchdog::new();
        wdog.mmio_write(REG_KICK_LOCK, KICK_LOCK_1ST_STAGE);
        assert_eq!(wdog.lock_stage(REG_KICK_LOCK), 1);
        wdog.mmio_write(REG_KICK_LOCK, KICK_LOCK_2ND_STAGE);
        assert_eq!(wdog.lock_stage(REG_KICK_LOCK), 3);
        assert_eq!(wdog.mmio_read(REG_KICK_LOCK), (KICK_LOCK_2ND_STAGE & !3) | 3);
    }

    #[test]
    fn skipping_the_first_stage_does_not_unlock() {
        let mut wdog = Watchdog::new();
        wdog.mmio_write(REG_KICK_LOCK, KICK_LOCK_2ND_STAGE);
        assert_eq!(wdog.lock_stage(REG_KICK_LOCK), 0);

        wdog.mmio_write(REG_CHANGE_LOCK, 0x1234);
        assert_eq!(wdog.lock_stage(REG_CHANGE_LOCK), 0);
    }

    #[test]
    fn first_stage_can_restart_the_sequence() {
        let mut wdog = Watchdog::new();
        wdog.mmio_write(REG_KICK_LOCK, KICK_LOCK_1ST_STAGE);
        wdog.mmio_write(REG_KICK_LOCK, KICK_LOCK_2ND_STAGE);
        wdog.mmio_write(REG_KICK_LOCK, KICK_LOCK_1ST_STAGE);
        assert_eq!(wdog.lock_stage(REG_KICK_LOCK), 1);
    }

    #[test]
    fn disable_takes_three_stages_in_order() {
        let mut wdog = Watchdog::new();
        wdog.mmio_write(REG_DISABLE_LOCK, DISABLE_LOCK_3RD_STAGE);
        assert_eq!(wdog.lock_stage(REG_DISABLE_LOCK), 0);

        wdog.mmio_write(REG_DISABLE_LOCK, DISABLE_LOCK_1ST_STAGE);
        wdog.mmio_write(REG_DISABLE_LOCK, DISABLE_LOCK_2ND_STAGE);
        assert_eq!(wdog.lock_stage(REG_DISABLE_LOCK), 2);
        wdog.mmio_write(REG_DISABLE_LOCK, DISABLE_LOCK_3RD_STAGE);
        assert_eq!(wdog.lock_stage(REG_DISABLE_LOCK), 3);
    }

    #[test]
    fn value_writes_do_not_disturb_the_lock() {
        let mut wdog = Watchdog::new();
        wdog.mmio_write(REG_PRESCALE_LOCK, PRESCALE_LOCK_1ST_STAGE);
        wdog.mmio_write(REG_PRESCALE_LOCK, PRESCALE_LOCK_2ND_STAGE);
        wdog.mmio_write(REG_PRESCALE, 0xffff);
        assert_eq!(wdog.lock_stage(REG_PRESCALE_LOCK), 3);
        // Value registers are not backed; reads return zero.
        assert_eq!(wdog.mmio_read(REG_PRESCALE), 0);
    }
}

//! Whole-aggregate checkpointing.
//!
//! The SoC serializes as one opaque blob at version 0: a nested device blob
//! per behavioral peripheral plus the raw bytes of every plain backing
//! store. Loading a blob with any other major version fails.

use avalanche_devices::regs::RegWindow;
use avalanche_io_snapshot::{
    IoSnapshot, SnapshotError, SnapshotReader, SnapshotResult, SnapshotVersion, SnapshotWriter,
};

use crate::soc::AvalancheSoc;

const TAG_CPMAC0: u16 = 1;
const TAG_CPMAC1: u16 = 2;
const TAG_INTC: u16 = 3;
const TAG_MDIO: u16 = 4;
const TAG_VLYNQ0: u16 = 5;
const TAG_VLYNQ1: u16 = 6;
const TAG_WATCHDOG: u16 = 7;
const TAG_CLOCK: u16 = 8;
const TAG_RESET: u16 = 9;

const TAG_EMIF: u16 = 20;
const TAG_GPIO: u16 = 21;
const TAG_TIMER0: u16 = 22;
const TAG_TIMER1: u16 = 23;
const TAG_UART0: u16 = 24;
const TAG_UART1: u16 = 25;
const TAG_USB_SLAVE: u16 = 26;
const TAG_DCL: u16 = 27;
const TAG_OHIO_WDT: u16 = 28;
const TAG_ADSL: u16 = 29;
const TAG_BBIF: u16 = 30;
const TAG_ATMSAR: u16 = 31;
const TAG_USB_MEM: u16 = 32;
const TAG_VLYNQ0_MEM: u16 = 33;

fn load_window(
    r: &SnapshotReader<'_>,
    tag: u16,
    window: &mut RegWindow,
    what: &'static str,
) -> SnapshotResult<()> {
    if let Some(bytes) = r.bytes(tag) {
        if !window.load_bytes(bytes) {
            return Err(SnapshotError::InvalidFieldEncoding(what));
        }
    }
    Ok(())
}

impl IoSnapshot for AvalancheSoc {
    const DEVICE_ID: [u8; 4] = *b"AVA7";
    const DEVICE_VERSION: SnapshotVersion = SnapshotVersion::new(0, 0);

    fn save_state(&self) -> Vec<u8> {
        let mut w = SnapshotWriter::new(Self::DEVICE_ID, Self::DEVICE_VERSION);

        w.field_bytes(TAG_CPMAC0, self.cpmac[0].save_state());
        w.field_bytes(TAG_CPMAC1, self.cpmac[1].save_state());
        w.field_bytes(TAG_INTC, self.intc.save_state());
        w.field_bytes(TAG_MDIO, self.mdio.save_state());
        w.field_bytes(TAG_VLYNQ0, self.vlynq[0].save_state());
        w.field_bytes(TAG_VLYNQ1, self.vlynq[1].save_state());
        w.field_bytes(TAG_WATCHDOG, self.watchdog.save_state());
        w.field_bytes(TAG_CLOCK, self.clock.save_state());
        w.field_bytes(TAG_RESET, self.reset_ctrl.save_state());

        w.field_bytes(TAG_EMIF, self.emif.as_bytes().to_vec());
        w.field_bytes(TAG_GPIO, self.gpio.as_bytes().to_vec());
        w.field_bytes(TAG_TIMER0, self.timer0.as_bytes().to_vec());
        w.field_bytes(TAG_TIMER1, self.timer1.as_bytes().to_vec());
        w.field_bytes(TAG_UART0, self.uart_shadow[0].as_bytes().to_vec());
        w.field_bytes(TAG_UART1, self.uart_shadow[1].as_bytes().to_vec());
        w.field_bytes(TAG_USB_SLAVE, self.usb_slave.as_bytes().to_vec());
        w.field_bytes(TAG_DCL, self.dcl.as_bytes().to_vec());
        w.field_bytes(TAG_OHIO_WDT, self.ohio_wdt.as_bytes().to_vec());
        w.field_bytes(TAG_ADSL, self.adsl.as_bytes().to_vec());
        w.field_bytes(TAG_BBIF, self.bbif.as_bytes().to_vec());
        w.field_bytes(TAG_ATMSAR, self.atmsar.as_bytes().to_vec());
        w.field_bytes(TAG_USB_MEM, self.usb_mem.as_bytes().to_vec());
        w.field_bytes(TAG_VLYNQ0_MEM, self.vlynq0_mem.as_bytes().to_vec());

        w.finish()
    }

    fn load_state(&mut self, bytes: &[u8]) -> SnapshotResult<()> {
        let r = SnapshotReader::parse(bytes, Self::DEVICE_ID)?;
        r.ensure_device_major(Self::DEVICE_VERSION.major)?;

        if let Some(blob) = r.bytes(TAG_CPMAC0) {
            self.cpmac[0].load_state(blob)?;
        }
        if let Some(blob) = r.bytes(TAG_CPMAC1) {
            self.cpmac[1].load_state(blob)?;
        }
        if let Some(blob) = r.bytes(TAG_INTC) {
            self.intc.load_state(blob)?;
        }
        if let Some(blob) = r.bytes(TAG_MDIO) {
            self.mdio.load_state(blob)?;
        }
        if let Some(blob) = r.bytes(TAG_VLYNQ0) {
            self.vlynq[0].load_state(blob)?;
        }
        if let Some(blob) = r.bytes(TAG_VLYNQ1) {
            self.vlynq[1].load_state(blob)?;
        }
        if let Some(blob) = r.bytes(TAG_WATCHDOG) {
            self.watchdog.load_state(blob)?;
        }
        if let Some(blob) = r.bytes(TAG_CLOCK) {
            self.clock.load_state(blob)?;
        }
        if let Some(blob) = r.bytes(TAG_RESET) {
            self.reset_ctrl.load_state(blob)?;
        }

        load_window(&r, TAG_EMIF, &mut self.emif, "emif window")?;
        load_window(&r, TAG_GPIO, &mut self.gpio, "gpio window")?;
        load_window(&r, TAG_TIMER0, &mut self.timer0, "timer0 window")?;
        load_window(&r, TAG_TIMER1, &mut self.timer1, "timer1 window")?;
        load_window(&r, TAG_UART0, &mut self.uart_shadow[0], "uart0 window")?;
        load_window(&r, TAG_UART1, &mut self.uart_shadow[1], "uart1 window")?;
        load_window(&r, TAG_USB_SLAVE, &mut self.usb_slave, "usb slave window")?;
        load_window(&r, TAG_DCL, &mut self.dcl, "dcl window")?;
        load_window(&r, TAG_OHIO_WDT, &mut self.ohio_wdt, "ohio wdt window")?;
        load_window(&r, TAG_ADSL, &mut self.adsl, "adsl window")?;
        load_window(&r, TAG_BBIF, &mut self.bbif, "bbif window")?;
        load_window(&r, TAG_ATMSAR, &mut self.atmsar, "atm sar window")?;
        load_window(&r, TAG_USB_MEM, &mut self.usb_mem, "usb mem window")?;
        load_window(&r, TAG_VLYNQ0_MEM, &mut self.vlynq0_mem, "vlynq0 mem window")?;

        Ok(())
    }
}

//! The device aggregate and its MMIO dispatch.

use avalanche_devices::clock::ClockCtrl;
use avalanche_devices::cpmac::{Cpmac, CPMAC_IRQS};
use avalanche_devices::intc::{Intc, IntcLine};
use avalanche_devices::irq::IrqLine;
use avalanche_devices::mdio::Mdio;
use avalanche_devices::net::NetworkBackend;
use avalanche_devices::regs::RegWindow;
use avalanche_devices::reset_ctrl::{ResetCtrl, SystemResetSink};
use avalanche_devices::Dma;
use avalanche_devices::vlynq::Vlynq;
use avalanche_devices::wdog::Watchdog;

use crate::io::PortIo;
use crate::map::{self, Block};

/// Construction-time configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SocConfig {
    /// Endianness the CPU core was built for. The peripheral fabric only
    /// exists in little-endian form; construction asserts this.
    pub big_endian: bool,
}

/// The AR7 on-chip peripheral complex.
///
/// Owns every register block and backing store; the host emulator reaches
/// in through [`read32`](Self::read32)/[`write32`](Self::write32) (plus the
/// narrower widths), the NIC receive path, and [`device_irq`](Self::device_irq)
/// for interrupt inputs raised by host-side device models (the UARTs).
///
/// Everything runs on the host's main thread; handlers never block and all
/// DMA completes synchronously within the call.
pub struct AvalancheSoc {
    pub(crate) cpmac: [Cpmac; 2],
    pub(crate) intc: Intc,
    pub(crate) mdio: Mdio,
    pub(crate) vlynq: [Vlynq; 2],
    pub(crate) watchdog: Watchdog,
    pub(crate) clock: ClockCtrl,
    pub(crate) reset_ctrl: ResetCtrl,

    pub(crate) emif: RegWindow,
    pub(crate) gpio: RegWindow,
    pub(crate) timer0: RegWindow,
    pub(crate) timer1: RegWindow,
    // The UART windows forward to the host model; these shadows only hold
    // the published line-status default for checkpoint parity.
    pub(crate) uart_shadow: [RegWindow; 2],
    pub(crate) usb_slave: RegWindow,
    pub(crate) dcl: RegWindow,
    pub(crate) ohio_wdt: RegWindow,

    pub(crate) adsl: RegWindow,
    pub(crate) bbif: RegWindow,
    pub(crate) atmsar: RegWindow,
    pub(crate) usb_mem: RegWindow,
    pub(crate) vlynq0_mem: RegWindow,

    cpu_irq: Box<dyn IrqLine>,
    reset_sink: Box<dyn SystemResetSink>,
    ports: Box<dyn PortIo>,
    nets: [Option<Box<dyn NetworkBackend>>; 2],
}

/// GPIO word 0 reads back this value while the reset button is idle; the
/// guest polls it constantly, so those reads are not traced.
const GPIO_IDLE: u32 = 0x0000_0800;

const DCL_BOOT_CONFIG: u32 = 0x025d_4291;

fn uart_port(addr: u32) -> u32 {
    (addr - map::UART0_BASE) / 4
}

impl AvalancheSoc {
    pub fn new(
        config: SocConfig,
        cpu_irq: Box<dyn IrqLine>,
        reset_sink: Box<dyn SystemResetSink>,
        ports: Box<dyn PortIo>,
    ) -> Self {
        assert!(
            !config.big_endian,
            "the peripheral fabric is little-endian only"
        );
        let mut soc = Self {
            cpmac: [Cpmac::new(0), Cpmac::new(1)],
            intc: Intc::new(),
            mdio: Mdio::new(),
            vlynq: [Vlynq::new(0), Vlynq::new(1)],
            watchdog: Watchdog::new(),
            clock: ClockCtrl::new(),
            reset_ctrl: ResetCtrl::new(),
            emif: RegWindow::new(map::EMIF_SIZE as usize),
            gpio: RegWindow::new(map::GPIO_SIZE as usize),
            timer0: RegWindow::new(map::TIMER_SIZE as usize),
            timer1: RegWindow::new(map::TIMER_SIZE as usize),
            uart_shadow: [
                RegWindow::new(map::UART_SIZE as usize),
                RegWindow::new(map::UART_SIZE as usize),
            ],
            usb_slave: RegWindow::new(map::USB_SLAVE_SIZE as usize),
            dcl: RegWindow::new(map::DCL_SIZE as usize),
            ohio_wdt: RegWindow::new(map::OHIO_WDT_SIZE as usize),
            adsl: RegWindow::new(map::ADSL_SIZE as usize),
            bbif: RegWindow::new(map::BBIF_SIZE as usize),
            atmsar: RegWindow::new(map::ATMSAR_SIZE as usize),
            usb_mem: RegWindow::new(map::USB_MEM_SIZE as usize),
            vlynq0_mem: RegWindow::new(map::VLYNQ0_MEM_SIZE as usize),
            cpu_irq,
            reset_sink,
            ports,
            nets: [None, None],
        };
        soc.program_defaults();
        soc
    }

    fn program_defaults(&mut self) {
        self.gpio.write(0, GPIO_IDLE);
        // Line-status shadow: transmitter empty.
        self.uart_shadow[0].write(5 * 4, 0x20);
        self.dcl.write(0, DCL_BOOT_CONFIG);
    }

    /// Attaches a network backend to CPMAC `index`. Without one the MAC
    /// still consumes TX descriptors but frames go nowhere.
    pub fn bind_nic(&mut self, index: usize, backend: Box<dyn NetworkBackend>) {
        self.nets[index] = Some(backend);
    }

    /// Station address the guest programmed into CPMAC `index`.
    pub fn nic_mac(&self, index: usize) -> [u8; 6] {
        self.cpmac[index].mac_addr()
    }

    fn storage(&self, block: Block) -> (&RegWindow, &'static str) {
        match block {
            Block::Adsl => (&self.adsl, "adsl"),
            Block::Bbif => (&self.bbif, "bbif"),
            Block::AtmSar => (&self.atmsar, "atm sar"),
            Block::UsbMem => (&self.usb_mem, "usb memory"),
            Block::Vlynq0Mem => (&self.vlynq0_mem, "vlynq0 memory"),
            Block::Emif => (&self.emif, "emif"),
            Block::Gpio => (&self.gpio, "gpio"),
            Block::Timer0 => (&self.timer0, "timer0"),
            Block::Timer1 => (&self.timer1, "timer1"),
            Block::UsbSlave => (&self.usb_slave, "usb slave"),
            Block::Dcl => (&self.dcl, "device config latch"),
            Block::OhioWdt => (&self.ohio_wdt, "ohio wdt"),
            _ => unreachable!("block {block:?} is not plain storage"),
        }
    }

    fn storage_mut(&mut self, block: Block) -> (&mut RegWindow, &'static str) {
        match block {
            Block::Adsl => (&mut self.adsl, "adsl"),
            Block::Bbif => (&mut self.bbif, "bbif"),
            Block::AtmSar => (&mut self.atmsar, "atm sar"),
            Block::UsbMem => (&mut self.usb_mem, "usb memory"),
            Block::Vlynq0Mem => (&mut self.vlynq0_mem, "vlynq0 memory"),
            Block::Emif => (&mut self.emif, "emif"),
            Block::Gpio => (&mut self.gpio, "gpio"),
            Block::Timer0 => (&mut self.timer0, "timer0"),
            Block::Timer1 => (&mut self.timer1, "timer1"),
            Block::UsbSlave => (&mut self.usb_slave, "usb slave"),
            Block::Dcl => (&mut self.dcl, "device config latch"),
            Block::OhioWdt => (&mut self.ohio_wdt, "ohio wdt"),
            _ => unreachable!("block {block:?} is not plain storage"),
        }
    }

    /// Word-wide MMIO read. The dispatch boundary only accepts 4-byte
    /// aligned addresses; narrower accesses are re-aligned by their
    /// wrappers.
    pub fn read32(&mut self, _dma: &mut dyn Dma, addr: u32) -> u32 {
        assert!(addr % 4 == 0, "unaligned mmio read at {addr:#010x}");
        let Some((block, offset)) = map::decode(addr) else {
            tracing::warn!(target: "avalanche::io", addr = format_args!("{addr:#010x}"), "read of unmapped address");
            return u32::MAX;
        };
        match block {
            Block::Cpmac(i) => self.cpmac[i].mmio_read(offset),
            Block::Clock => self.clock.mmio_read(offset),
            Block::Watchdog => self.watchdog.mmio_read(offset),
            Block::Reset => self.reset_ctrl.mmio_read(offset),
            Block::Vlynq(i) => self.vlynq[i].mmio_read(offset),
            Block::Mdio => self.mdio.mmio_read(offset),
            Block::Intc => self.intc.mmio_read(offset),
            Block::Uart(i) => {
                let val = self.ports.in8(uart_port(addr)) as u32;
                tracing::trace!(target: "avalanche::uart", uart = i, port = uart_port(addr), val = format_args!("{val:#04x}"), "read");
                val
            }
            Block::Vlynq0Mem if addr == map::VLYNQ0_MEM_DEVICE_ID_ADDR => {
                tracing::trace!(target: "avalanche::vlynq", "read of the remote device id");
                map::VLYNQ0_MEM_DEVICE_ID
            }
            Block::Gpio => {
                let val = self.gpio.read(offset);
                if offset != 0 || val != GPIO_IDLE {
                    tracing::trace!(target: "avalanche::io", block = "gpio", addr = format_args!("{addr:#010x}"), val = format_args!("{val:#010x}"), "read");
                }
                val
            }
            _ => {
                let (window, name) = self.storage(block);
                let val = window.read(offset);
                tracing::trace!(target: "avalanche::io", block = name, addr = format_args!("{addr:#010x}"), val = format_args!("{val:#010x}"), "read");
                val
            }
        }
    }

    /// Word-wide MMIO write.
    pub fn write32(&mut self, dma: &mut dyn Dma, addr: u32, val: u32) {
        assert!(addr % 4 == 0, "unaligned mmio write at {addr:#010x}");
        let Some((block, offset)) = map::decode(addr) else {
            tracing::warn!(target: "avalanche::io", addr = format_args!("{addr:#010x}"), val = format_args!("{val:#010x}"), "write to unmapped address");
            return;
        };
        match block {
            Block::Cpmac(i) => {
                let net = self.nets[i].as_deref_mut();
                let mut line = IntcLine {
                    intc: &mut self.intc,
                    cpu: &mut *self.cpu_irq,
                    irq: CPMAC_IRQS[i],
                };
                self.cpmac[i].mmio_write(offset, val, dma, net, &mut line);
            }
            Block::Clock => self.clock.mmio_write(offset, val),
            Block::Watchdog => self.watchdog.mmio_write(offset, val),
            Block::Reset => self.reset_ctrl.mmio_write(offset, val, &mut *self.reset_sink),
            Block::Vlynq(i) => self.vlynq[i].mmio_write(offset, val),
            Block::Mdio => self.mdio.mmio_write(offset, val),
            Block::Intc => self.intc.mmio_write(offset, val),
            Block::Uart(i) => {
                tracing::trace!(target: "avalanche::uart", uart = i, port = uart_port(addr), val = format_args!("{val:#04x}"), "write");
                self.ports.out8(uart_port(addr), val as u8);
            }
            _ => {
                let (window, name) = self.storage_mut(block);
                window.write(offset, val);
                tracing::trace!(target: "avalanche::io", block = name, addr = format_args!("{addr:#010x}"), val = format_args!("{val:#010x}"), "write");
            }
        }
    }

    /// Half-word read: the containing word is read and the half selected by
    /// the low address bits (offset 0 reports the high half).
    pub fn read16(&mut self, dma: &mut dyn Dma, addr: u32) -> u16 {
        let word = self.read32(dma, addr & !3);
        let val = match addr & 3 {
            0 => word >> 16,
            2 => word & 0xffff,
            _ => panic!("misaligned 16-bit mmio read at {addr:#010x}"),
        };
        tracing::trace!(target: "avalanche::io", addr = format_args!("{addr:#010x}"), val = format_args!("{val:#06x}"), "16-bit read");
        val as u16
    }

    /// Half-word writes are not a supported width on this fabric; they are
    /// logged and forwarded best-effort to the word handler for the
    /// containing word.
    pub fn write16(&mut self, dma: &mut dyn Dma, addr: u32, val: u16) {
        tracing::warn!(target: "avalanche::io", addr = format_args!("{addr:#010x}"), val = format_args!("{val:#06x}"), "unexpected 16-bit write");
        self.write32(dma, addr & !3, val as u32);
    }

    /// Byte read: returns the low byte of the containing word. Expected
    /// only in the UART windows.
    pub fn read8(&mut self, dma: &mut dyn Dma, addr: u32) -> u8 {
        let val = (self.read32(dma, addr & !3) & 0xff) as u8;
        if addr % 4 != 0 || !map::is_uart(addr) {
            tracing::warn!(target: "avalanche::io", addr = format_args!("{addr:#010x}"), val = format_args!("{val:#04x}"), "unexpected byte-wide read");
        }
        val
    }

    /// Byte write: re-aligned and forwarded to the word handler for the
    /// containing word with the byte preserved. Expected only in the UART
    /// windows; everywhere else it completes best-effort and is flagged.
    pub fn write8(&mut self, dma: &mut dyn Dma, addr: u32, val: u8) {
        if addr % 4 != 0 || !map::is_uart(addr) {
            tracing::warn!(target: "avalanche::io", addr = format_args!("{addr:#010x}"), val = format_args!("{val:#04x}"), "unexpected byte-wide write");
        }
        self.write32(dma, addr & !3, val as u32);
    }

    /// Whether CPMAC `index` has an RX buffer posted.
    pub fn nic_can_receive(&self, index: usize) -> bool {
        self.cpmac[index].can_receive()
    }

    /// Delivers a frame from the network backend to CPMAC `index`.
    pub fn nic_receive(&mut self, dma: &mut dyn Dma, index: usize, frame: &[u8]) {
        let mut line = IntcLine {
            intc: &mut self.intc,
            cpu: &mut *self.cpu_irq,
            irq: CPMAC_IRQS[index],
        };
        self.cpmac[index].receive(frame, dma, &mut line);
    }

    /// Interrupt input for host-side device models (the 16450 UARTs raise
    /// irqs 15 and 16 here).
    pub fn device_irq(&mut self, irq: u32, level: bool) {
        self.intc.set_irq(irq, level, &mut *self.cpu_irq);
    }

    /// Returns every register block to its power-on contents.
    pub fn reset_to_defaults(&mut self) {
        self.cpmac[0].reset();
        self.cpmac[1].reset();
        self.intc.reset();
        self.mdio.reset();
        self.vlynq[0].reset();
        self.vlynq[1].reset();
        self.watchdog.reset();
        self.clock.reset();
        self.reset_ctrl.reset();
        for window in [
            &mut self.emif,
            &mut self.gpio,
            &mut self.timer0,
            &mut self.timer1,
            &mut self.usb_slave,
            &mut self.dcl,
            &mut self.ohio_wdt,
            &mut self.adsl,
            &mut self.bbif,
            &mut self.atmsar,
            &mut self.usb_mem,
            &mut self.vlynq0_mem,
        ] {
            window.fill_zero();
        }
        self.uart_shadow[0].fill_zero();
        self.uart_shadow[1].fill_zero();
        self.program_defaults();
    }
}

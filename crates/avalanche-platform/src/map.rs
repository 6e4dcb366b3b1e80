//! Guest physical address map of the peripheral complex.
//!
//! The host registers the same handler for both MMIO windows; dispatch is
//! purely by absolute address against the block table below. Addresses
//! inside a window that match no block read `0xffff_ffff` and swallow
//! writes.

/// `(base, length)` of the physical windows the host must route here.
pub const MMIO_WINDOWS: [(u32, u32); 2] = [
    (0x0000_1000, 0x0fff_f000),
    (0x1e00_0000, 0x01c0_0000),
];

// Memory-like blocks.
pub const ADSL_BASE: u32 = 0x0100_0000;
pub const ADSL_SIZE: u32 = 0x2_0000;
pub const BBIF_BASE: u32 = 0x0200_0000;
pub const BBIF_SIZE: u32 = 0x4;
pub const ATMSAR_BASE: u32 = 0x0300_0000;
pub const ATMSAR_SIZE: u32 = 0x9000;
pub const USB_MEM_BASE: u32 = 0x0340_0000;
pub const USB_MEM_SIZE: u32 = 0x2000;
pub const VLYNQ0_MEM_BASE: u32 = 0x0400_0000;
pub const VLYNQ0_MEM_SIZE: u32 = 0x4_2000;

// Register blocks.
pub const CPMAC0_BASE: u32 = 0x0861_0000;
pub const EMIF_BASE: u32 = 0x0861_0800;
pub const EMIF_SIZE: u32 = 0x100;
pub const GPIO_BASE: u32 = 0x0861_0900;
pub const GPIO_SIZE: u32 = 0x20;
pub const CLOCK_BASE: u32 = 0x0861_0a00;
pub const WATCHDOG_BASE: u32 = 0x0861_0b00;
pub const TIMER0_BASE: u32 = 0x0861_0c00;
pub const TIMER_SIZE: u32 = 0x8;
pub const TIMER1_BASE: u32 = 0x0861_0d00;
pub const UART0_BASE: u32 = 0x0861_0e00;
pub const UART_SIZE: u32 = 0x20;
pub const UART1_BASE: u32 = 0x0861_0f00;
pub const USB_SLAVE_BASE: u32 = 0x0861_1200;
pub const USB_SLAVE_SIZE: u32 = 0x50;
pub const RESET_BASE: u32 = 0x0861_1600;
pub const VLYNQ0_BASE: u32 = 0x0861_1800;
pub const DCL_BASE: u32 = 0x0861_1a00;
pub const DCL_SIZE: u32 = 0x14;
pub const VLYNQ1_BASE: u32 = 0x0861_1c00;
pub const MDIO_BASE: u32 = 0x0861_1e00;
pub const OHIO_WDT_BASE: u32 = 0x0861_1f00;
pub const OHIO_WDT_SIZE: u32 = 0x20;
pub const INTC_BASE: u32 = 0x0861_2400;
pub const CPMAC1_BASE: u32 = 0x0861_2800;

/// Reads of this address inside the VLYNQ0 memory window return the PCI
/// device id of the wireless chip wired to the bus on reference boards.
pub const VLYNQ0_MEM_DEVICE_ID_ADDR: u32 = 0x0404_1000;
pub const VLYNQ0_MEM_DEVICE_ID: u32 = 0x9066_104c;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    Adsl,
    Bbif,
    AtmSar,
    UsbMem,
    Vlynq0Mem,
    Cpmac(usize),
    Emif,
    Gpio,
    Clock,
    Watchdog,
    Timer0,
    Timer1,
    Uart(usize),
    UsbSlave,
    Reset,
    Vlynq(usize),
    Dcl,
    Mdio,
    OhioWdt,
    Intc,
}

use avalanche_devices::cpmac::CPMAC_SIZE;
use avalanche_devices::clock::CLOCK_SIZE;
use avalanche_devices::intc::INTC_SIZE;
use avalanche_devices::mdio::MDIO_SIZE;
use avalanche_devices::reset_ctrl::RESET_SIZE;
use avalanche_devices::vlynq::VLYNQ_SIZE;
use avalanche_devices::wdog::WATCHDOG_SIZE;

const BLOCKS: [(u32, u32, Block); 23] = [
    (ADSL_BASE, ADSL_SIZE, Block::Adsl),
    (BBIF_BASE, BBIF_SIZE, Block::Bbif),
    (ATMSAR_BASE, ATMSAR_SIZE, Block::AtmSar),
    (USB_MEM_BASE, USB_MEM_SIZE, Block::UsbMem),
    (VLYNQ0_MEM_BASE, VLYNQ0_MEM_SIZE, Block::Vlynq0Mem),
    (CPMAC0_BASE, CPMAC_SIZE as u32, Block::Cpmac(0)),
    (EMIF_BASE, EMIF_SIZE, Block::Emif),
    (GPIO_BASE, GPIO_SIZE, Block::Gpio),
    (CLOCK_BASE, CLOCK_SIZE as u32, Block::Clock),
    (WATCHDOG_BASE, WATCHDOG_SIZE as u32, Block::Watchdog),
    (TIMER0_BASE, TIMER_SIZE, Block::Timer0),
    (TIMER1_BASE, TIMER_SIZE, Block::Timer1),
    (UART0_BASE, UART_SIZE, Block::Uart(0)),
    (UART1_BASE, UART_SIZE, Block::Uart(1)),
    (USB_SLAVE_BASE, USB_SLAVE_SIZE, Block::UsbSlave),
    (RESET_BASE, RESET_SIZE as u32, Block::Reset),
    (VLYNQ0_BASE, VLYNQ_SIZE as u32, Block::Vlynq(0)),
    (DCL_BASE, DCL_SIZE, Block::Dcl),
    (VLYNQ1_BASE, VLYNQ_SIZE as u32, Block::Vlynq(1)),
    (MDIO_BASE, MDIO_SIZE as u32, Block::Mdio),
    (OHIO_WDT_BASE, OHIO_WDT_SIZE, Block::OhioWdt),
    (INTC_BASE, INTC_SIZE as u32, Block::Intc),
    (CPMAC1_BASE, CPMAC_SIZE as u32, Block::Cpmac(1)),
];

/// First block whose range contains `addr`, with the block-relative offset.
pub fn decode(addr: u32) -> Option<(Block, u32)> {
    BLOCKS
        .iter()
        .find(|(base, size, _)| addr >= *base && addr - *base < *size)
        .map(|(base, _, block)| (*block, addr - *base))
}

/// Whether `addr` falls in one of the UART windows (where byte access is
/// the expected width).
pub fn is_uart(addr: u32) -> bool {
    matches!(decode(addr), Some((Block::Uart(_), _)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_maps_bases_and_offsets() {
        assert_eq!(decode(CPMAC0_BASE), Some((Block::Cpmac(0), 0)));
        assert_eq!(decode(CPMAC0_BASE + 0x600), Some((Block::Cpmac(0), 0x600)));
        assert_eq!(decode(CPMAC1_BASE + 0x7fc), Some((Block::Cpmac(1), 0x7fc)));
        assert_eq!(decode(INTC_BASE + 0x40), Some((Block::Intc, 0x40)));
        assert_eq!(decode(UART1_BASE + 4), Some((Block::Uart(1), 4)));
    }

    #[test]
    fn gaps_between_blocks_decode_to_none() {
        assert_eq!(decode(CPMAC0_BASE - 4), None);
        assert_eq!(decode(0x0861_1100), None);
        assert_eq!(decode(0x0861_3000), None);
    }

    #[test]
    fn block_ranges_do_not_overlap() {
        for (i, (base_a, size_a, _)) in BLOCKS.iter().enumerate() {
            for (base_b, size_b, _) in BLOCKS.iter().skip(i + 1) {
                let disjoint =
                    base_a + size_a <= *base_b || base_b + size_b <= *base_a;
                assert!(disjoint, "blocks at {base_a:#x} and {base_b:#x} overlap");
            }
        }
    }
}

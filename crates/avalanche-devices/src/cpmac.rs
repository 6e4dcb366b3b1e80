//! CPMAC Ethernet MAC with DMA descriptor rings.
//!
//! The AR7 carries two instances. Each is an 0x800-byte register window; a
//! handful of offsets have behavior on top of the backing store:
//!
//! - `MACADDRHI` writes reassemble the station address from the address
//!   register bytes.
//! - the statistics window is cleared by writing `0xffff_ffff`.
//! - `MAC_IN_VECTOR` is clear-on-read.
//! - `TXn_HDP` writes drain the transmit descriptor chain into the network
//!   backend; receive descriptors are filled from the backend side via
//!   [`Cpmac::receive`].
//!
//! Descriptors are 16 bytes in guest memory, little-endian words
//! `{next, buff, length, mode}`. The guest driver hands buffers to the
//! device by setting `OWNERSHIP`; the device returns them by clearing it
//! in place before any interrupt is raised.

use avalanche_io_snapshot::{
    IoSnapshot, SnapshotError, SnapshotReader, SnapshotResult, SnapshotVersion, SnapshotWriter,
};

use crate::dma::Dma;
use crate::intc::{IRQ_CPMAC0, IRQ_CPMAC1};
use crate::irq::IrqLine;
use crate::net::NetworkBackend;
use crate::regs::RegWindow;

pub const CPMAC_SIZE: usize = 0x800;

/// Device interrupt per instance.
pub const CPMAC_IRQS: [u32; 2] = [IRQ_CPMAC0, IRQ_CPMAC1];

/// Largest Ethernet payload the MAC will move (without FCS).
pub const MAX_FRAME_SIZE: usize = 1514;

/// Upper bound on descriptors visited per TX drain. A well-formed chain is
/// far shorter; a guest-constructed cycle would otherwise never terminate.
const TX_CHAIN_LIMIT: usize = 1024;

// Register offsets (subset with behavior; everything else is storage).
pub const REG_RX_MBP_ENABLE: u32 = 0x100;
pub const REG_RX_MAXLEN: u32 = 0x10c;
pub const REG_TX_INTMASK_SET: u32 = 0x178;
pub const REG_MAC_IN_VECTOR: u32 = 0x180;
pub const REG_MACADDRLO_0: u32 = 0x1b0;
pub const REG_MACADDRMID: u32 = 0x1d0;
pub const REG_MACADDRHI: u32 = 0x1d4;
pub const REG_RXGOODFRAMES: u32 = 0x200;
pub const REG_RXBROADCASTFRAMES: u32 = 0x204;
pub const REG_RXMULTICASTFRAMES: u32 = 0x208;
pub const REG_RXOVERSIZEDFRAMES: u32 = 0x218;
pub const REG_RXUNDERSIZEDFRAMES: u32 = 0x220;
pub const REG_TXGOODFRAMES: u32 = 0x234;
pub const REG_RXDMAOVERRUNS: u32 = 0x28c;
pub const REG_TX0_HDP: u32 = 0x600;
pub const REG_TX7_HDP: u32 = 0x61c;
pub const REG_RX0_HDP: u32 = 0x620;
pub const REG_RX7_HDP: u32 = 0x63c;

// MAC_IN_VECTOR bits.
pub const MAC_IN_VECTOR_STATUS_INT: u32 = 1 << 19;
pub const MAC_IN_VECTOR_HOST_INT: u32 = 1 << 18;
pub const MAC_IN_VECTOR_RX_INT_OR: u32 = 1 << 17;
pub const MAC_IN_VECTOR_TX_INT_OR: u32 = 1 << 16;

// Descriptor mode bits.
pub const CB_SOF: u32 = 1 << 31;
pub const CB_EOF: u32 = 1 << 30;
pub const CB_OWNERSHIP: u32 = 1 << 29;
pub const CB_EOQ: u32 = 1 << 28;
pub const CB_SIZE_MASK: u32 = 0x0000_ffff;

const STATISTICS: [&str; 36] = [
    "RXGOODFRAMES",
    "RXBROADCASTFRAMES",
    "RXMULTICASTFRAMES",
    "RXPAUSEFRAMES",
    "RXCRCERRORS",
    "RXALIGNCODEERRORS",
    "RXOVERSIZEDFRAMES",
    "RXJABBERFRAMES",
    "RXUNDERSIZEDFRAMES",
    "RXFRAGMENTS",
    "RXFILTEREDFRAMES",
    "RXQOSFILTEREDFRAMES",
    "RXOCTETS",
    "TXGOODFRAMES",
    "TXBROADCASTFRAMES",
    "TXMULTICASTFRAMES",
    "TXPAUSEFRAMES",
    "TXDEFERREDFRAMES",
    "TXCOLLISIONFRAMES",
    "TXSINGLECOLLFRAMES",
    "TXMULTCOLLFRAMES",
    "TXEXCESSIVECOLLISIONS",
    "TXLATECOLLISIONS",
    "TXUNDERRUN",
    "TXCARRIERSENSEERRORS",
    "TXOCTETS",
    "64OCTETFRAMES",
    "65T127OCTETFRAMES",
    "128T255OCTETFRAMES",
    "256T511OCTETFRAMES",
    "512T1023OCTETFRAMES",
    "1024TUPOCTETFRAMES",
    "NETOCTETS",
    "RXSOFOVERRUNS",
    "RXMOFOVERRUNS",
    "RXDMAOVERRUNS",
];

const TX_HDP: [&str; 8] = [
    "TX0_HDP", "TX1_HDP", "TX2_HDP", "TX3_HDP", "TX4_HDP", "TX5_HDP", "TX6_HDP", "TX7_HDP",
];
const RX_HDP: [&str; 8] = [
    "RX0_HDP", "RX1_HDP", "RX2_HDP", "RX3_HDP", "RX4_HDP", "RX5_HDP", "RX6_HDP", "RX7_HDP",
];

fn reg_name(offset: u32) -> &'static str {
    match offset {
        0x00 => "TX_IDVER",
        0x04 => "TX_CONTROL",
        0x08 => "TX_TEARDOWN",
        0x10 => "RX_IDVER",
        0x14 => "RX_CONTROL",
        0x18 => "RX_TEARDOWN",
        REG_RX_MBP_ENABLE => "RX_MBP_ENABLE",
        0x104 => "RX_UNICAST_SET",
        0x108 => "RX_UNICAST_CLEAR",
        REG_RX_MAXLEN => "RX_MAXLEN",
        0x160 => "MACCONTROL",
        0x174 => "TX_INTSTAT_MASKED",
        REG_TX_INTMASK_SET => "TX_INTMASK_SET",
        0x17c => "TX_INTMASK_CLEAR",
        REG_MAC_IN_VECTOR => "MAC_IN_VECTOR",
        0x184 => "MAC_EOI_VECTOR",
        0x198 => "RX_INTMASK_SET",
        0x19c => "RX_INTMASK_CLEAR",
        0x1a8 => "MAC_INTMASK_SET",
        REG_MACADDRLO_0..=0x1cc => "MACADDRLO",
        REG_MACADDRMID => "MACADDRMID",
        REG_MACADDRHI => "MACADDRHI",
        0x1d8 => "MACHASH1",
        0x1dc => "MACHASH2",
        REG_RXGOODFRAMES..=REG_RXDMAOVERRUNS => {
            STATISTICS[((offset - REG_RXGOODFRAMES) / 4) as usize]
        }
        REG_TX0_HDP..=REG_TX7_HDP => TX_HDP[((offset - REG_TX0_HDP) / 4) as usize],
        REG_RX0_HDP..=REG_RX7_HDP => RX_HDP[((offset - REG_RX0_HDP) / 4) as usize],
        _ => "?",
    }
}

/// Bounded hex dump of frame data for traces.
fn dump(buf: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::new();
    for byte in buf.iter().take(25) {
        let _ = write!(out, " {byte:02x}");
    }
    out
}

/// A TX or RX buffer descriptor as laid out in guest memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub next: u32,
    pub buff: u32,
    pub length: u32,
    pub mode: u32,
}

impl Descriptor {
    pub const LEN: usize = 16;
    const MODE_OFFSET: u32 = 12;

    pub fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self {
            next: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            buff: u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
            length: u32::from_le_bytes(bytes[8..12].try_into().unwrap()),
            mode: u32::from_le_bytes(bytes[12..16].try_into().unwrap()),
        }
    }

    pub fn to_bytes(self) -> [u8; Self::LEN] {
        let mut bytes = [0u8; Self::LEN];
        bytes[0..4].copy_from_slice(&self.next.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.buff.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.length.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.mode.to_le_bytes());
        bytes
    }

    fn dma_read(dma: &mut dyn Dma, paddr: u32) -> Self {
        let mut bytes = [0u8; Self::LEN];
        dma.read(paddr, &mut bytes);
        Self::from_bytes(bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cpmac {
    index: usize,
    regs: RegWindow,
    mac_addr: [u8; 6],
}

impl Cpmac {
    pub fn new(index: usize) -> Self {
        assert!(index < 2);
        Self {
            index,
            regs: RegWindow::new(CPMAC_SIZE),
            mac_addr: [0; 6],
        }
    }

    /// Station address as assembled from the address registers.
    pub fn mac_addr(&self) -> [u8; 6] {
        self.mac_addr
    }

    pub fn mmio_read(&mut self, offset: u32) -> u32 {
        let val = self.regs.read(offset);
        tracing::trace!(target: "avalanche::cpmac", index = self.index, reg = reg_name(offset), offset = format_args!("{offset:#x}"), val = format_args!("{val:#010x}"), "read");
        if offset == REG_MAC_IN_VECTOR {
            self.regs.write(REG_MAC_IN_VECTOR, 0);
        }
        val
    }

    pub fn mmio_write(
        &mut self,
        offset: u32,
        val: u32,
        dma: &mut dyn Dma,
        net: Option<&mut (dyn NetworkBackend + 'static)>,
        irq: &mut dyn IrqLine,
    ) {
        self.regs.write(offset, val);
        tracing::trace!(target: "avalanche::cpmac", index = self.index, reg = reg_name(offset), offset = format_args!("{offset:#x}"), val = format_args!("{val:#010x}"), "write");
        match offset {
            REG_RX_MBP_ENABLE => {}
            REG_RX_MAXLEN => {
                tracing::trace!(target: "avalanche::cpmac", index = self.index, maxlen = val, "rx max packet length");
            }
            REG_TX_INTMASK_SET => {
                if val != 0 {
                    let channel = val.trailing_zeros();
                    self.regs
                        .set(REG_MAC_IN_VECTOR, MAC_IN_VECTOR_TX_INT_OR | channel);
                    irq.set_level(true);
                }
            }
            REG_MACADDRHI => {
                self.mac_addr = [
                    self.regs.byte(REG_MACADDRHI),
                    self.regs.byte(REG_MACADDRHI + 1),
                    self.regs.byte(REG_MACADDRHI + 2),
                    self.regs.byte(REG_MACADDRHI + 3),
                    self.regs.byte(REG_MACADDRMID),
                    self.regs.byte(REG_MACADDRLO_0),
                ];
                let mac = self.mac_addr;
                tracing::trace!(
                    target: "avalanche::cpmac",
                    index = self.index,
                    "setting MAC {:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
                    mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
                );
            }
            REG_RXGOODFRAMES..=REG_RXDMAOVERRUNS => {
                // Statistics are read-only; the only legal write clears them.
                if val == u32::MAX {
                    self.regs.write(offset, 0);
                } else {
                    tracing::warn!(target: "avalanche::cpmac", index = self.index, reg = reg_name(offset), val = format_args!("{val:#010x}"), "unexpected write to statistics register");
                }
            }
            REG_TX0_HDP..=REG_TX7_HDP => {
                let channel = (offset - REG_TX0_HDP) / 4;
                self.drain_tx_chain(channel, val, dma, net, irq);
            }
            REG_RX0_HDP..=REG_RX7_HDP => {
                if val != 0 {
                    let desc = Descriptor::dma_read(dma, val);
                    tracing::trace!(
                        target: "avalanche::cpmac",
                        index = self.index,
                        reg = reg_name(offset),
                        next = format_args!("{:#010x}", desc.next),
                        buff = format_args!("{:#010x}", desc.buff),
                        length = desc.length,
                        mode = format_args!("{:#010x}", desc.mode),
                        "rx descriptor posted"
                    );
                }
            }
            _ => {}
        }
    }

    /// Walks the TX descriptor chain starting at `head` and emits one frame
    /// per descriptor. Ownership is returned to the driver in guest memory
    /// before the frame reaches the backend or the interrupt is raised.
    fn drain_tx_chain(
        &mut self,
        channel: u32,
        head: u32,
        dma: &mut dyn Dma,
        mut net: Option<&mut (dyn NetworkBackend + 'static)>,
        irq: &mut dyn IrqLine,
    ) {
        let mut val = head;
        let mut visited = 0usize;
        while val != 0 {
            visited += 1;
            if visited > TX_CHAIN_LIMIT {
                tracing::warn!(target: "avalanche::cpmac", index = self.index, channel, head = format_args!("{head:#010x}"), limit = TX_CHAIN_LIMIT, "tx descriptor chain too long, aborting drain");
                break;
            }

            let desc = Descriptor::dma_read(dma, val);
            tracing::trace!(
                target: "avalanche::cpmac",
                index = self.index,
                desc = format_args!("{val:#010x}"),
                next = format_args!("{:#010x}", desc.next),
                buff = format_args!("{:#010x}", desc.buff),
                length = desc.length,
                mode = format_args!("{:#010x}", desc.mode),
                "tx descriptor"
            );

            // The driver path only produces whole, owned frames; anything
            // else means the guest handed us garbage.
            assert_eq!(
                desc.mode & CB_SIZE_MASK,
                desc.length,
                "tx descriptor size field disagrees with length"
            );
            assert!(desc.mode & CB_SOF != 0, "tx descriptor without SOF");
            assert!(desc.mode & CB_EOF != 0, "tx descriptor without EOF");
            assert!(
                desc.mode & CB_OWNERSHIP != 0,
                "tx descriptor not owned by the device"
            );
            let len = desc.length as usize;
            assert!(len <= MAX_FRAME_SIZE + 4, "tx frame too large");

            let mut frame = vec![0u8; len];
            dma.read(desc.buff, &mut frame);

            dma.write_u32(val + Descriptor::MODE_OFFSET, desc.mode & !CB_OWNERSHIP);

            if let Some(net) = net.as_deref_mut() {
                tracing::trace!(target: "avalanche::cpmac", index = self.index, len, "sent frame:{}", dump(&frame));
                net.transmit(&frame);
                self.regs.inc(REG_TXGOODFRAMES);
                self.regs
                    .set(REG_MAC_IN_VECTOR, MAC_IN_VECTOR_TX_INT_OR | channel);
                irq.set_level(true);
            }

            val = desc.next;
        }
    }

    /// Whether an RX buffer is posted for channel 0.
    pub fn can_receive(&self) -> bool {
        self.regs.read(REG_RX0_HDP) != 0
    }

    /// Delivers a frame from the network backend into the posted RX
    /// descriptor. Drops silently (traced) when no owned buffer is
    /// available.
    pub fn receive(&mut self, frame: &[u8], dma: &mut dyn Dma, irq: &mut dyn IrqLine) {
        tracing::trace!(target: "avalanche::cpmac", index = self.index, len = frame.len(), "received frame:{}", dump(frame));

        match frame.get(..6) {
            Some(dst) if dst == [0xff; 6] => {
                self.regs.inc(REG_RXBROADCASTFRAMES);
            }
            Some(dst) if dst[0] & 0x01 != 0 => {
                self.regs.inc(REG_RXMULTICASTFRAMES);
            }
            Some(dst) if dst == self.mac_addr => {
                tracing::trace!(target: "avalanche::cpmac", index = self.index, "frame for our address");
            }
            _ => {
                tracing::trace!(target: "avalanche::cpmac", index = self.index, "frame for unknown address");
            }
        }

        if frame.len() < 64 {
            self.regs.inc(REG_RXUNDERSIZEDFRAMES);
        } else if frame.len() > MAX_FRAME_SIZE {
            self.regs.inc(REG_RXOVERSIZEDFRAMES);
        }
        self.regs.inc(REG_RXGOODFRAMES);

        let head = self.regs.read(REG_RX0_HDP);
        if head == 0 {
            tracing::trace!(target: "avalanche::cpmac", index = self.index, "no rx buffer available, frame dropped");
            return;
        }

        let mut desc = Descriptor::dma_read(dma, head);
        if desc.mode & CB_OWNERSHIP == 0 {
            tracing::trace!(target: "avalanche::cpmac", index = self.index, desc = format_args!("{head:#010x}"), "rx buffer not free, frame dropped");
            return;
        }

        let size = frame.len() as u32;
        let mut mode = desc.mode & !(CB_OWNERSHIP | CB_SIZE_MASK);
        mode |= size & CB_SIZE_MASK;
        mode |= CB_SOF | CB_EOF;
        if desc.next == 0 {
            mode |= CB_EOQ;
        }
        desc.length = size;
        desc.mode = mode;

        dma.write(head, &desc.to_bytes());
        dma.write(desc.buff, frame);
        self.regs.write(REG_RX0_HDP, desc.next);

        self.regs.set(REG_MAC_IN_VECTOR, MAC_IN_VECTOR_RX_INT_OR);
        irq.set_level(true);
    }

    pub fn reset(&mut self) {
        self.regs.fill_zero();
        self.mac_addr = [0; 6];
    }
}

impl IoSnapshot for Cpmac {
    const DEVICE_ID: [u8; 4] = *b"CPMC";
    const DEVICE_VERSION: SnapshotVersion = SnapshotVersion::new(0, 0);

    fn save_state(&self) -> Vec<u8> {
        let mut w = SnapshotWriter::new(Self::DEVICE_ID, Self::DEVICE_VERSION);
        w.field_bytes(1, self.regs.as_bytes().to_vec());
        w.field_bytes(2, self.mac_addr.to_vec());
        w.finish()
    }

    fn load_state(&mut self, bytes: &[u8]) -> SnapshotResult<()> {
        let r = SnapshotReader::parse(bytes, Self::DEVICE_ID)?;
        r.ensure_device_major(Self::DEVICE_VERSION.major)?;
        if let Some(regs) = r.bytes(1) {
            if !self.regs.load_bytes(regs) {
                return Err(SnapshotError::InvalidFieldEncoding("cpmac regs length"));
            }
        }
        if let Some(mac) = r.bytes(2) {
            if mac.len() != self.mac_addr.len() {
                return Err(SnapshotError::InvalidFieldEncoding("cpmac mac length"));
            }
            self.mac_addr.copy_from_slice(mac);
        }
        Ok(())
    }
}

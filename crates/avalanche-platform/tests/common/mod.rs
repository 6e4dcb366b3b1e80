#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use avalanche_devices::irq::IrqLine;
use avalanche_devices::net::NetworkBackend;
use avalanche_devices::Dma;
use avalanche_platform::io::PortIo;
use avalanche_platform::{AvalancheSoc, SocConfig};

/// Guest RAM stand-in covering `[base, base + size)`.
pub struct VecMemory {
    base: u32,
    data: Vec<u8>,
}

impl VecMemory {
    pub fn new(base: u32, size: usize) -> Self {
        Self {
            base,
            data: vec![0; size],
        }
    }

    fn range(&self, paddr: u32, len: usize) -> std::ops::Range<usize> {
        let start = paddr
            .checked_sub(self.base)
            .expect("dma below test memory") as usize;
        let end = start.checked_add(len).expect("dma range wraps");
        assert!(end <= self.data.len(), "dma past test memory");
        start..end
    }

    pub fn write_bytes(&mut self, paddr: u32, bytes: &[u8]) {
        let range = self.range(paddr, bytes.len());
        self.data[range].copy_from_slice(bytes);
    }

    pub fn read_bytes(&self, paddr: u32, len: usize) -> Vec<u8> {
        self.data[self.range(paddr, len)].to_vec()
    }

    pub fn read_word(&self, paddr: u32) -> u32 {
        u32::from_le_bytes(self.read_bytes(paddr, 4).try_into().unwrap())
    }
}

impl Dma for VecMemory {
    fn read(&mut self, paddr: u32, buf: &mut [u8]) {
        let range = self.range(paddr, buf.len());
        buf.copy_from_slice(&self.data[range]);
    }

    fn write(&mut self, paddr: u32, buf: &[u8]) {
        let range = self.range(paddr, buf.len());
        self.data[range].copy_from_slice(buf);
    }
}

/// CPU hardware-interrupt line 0, observable from the test.
#[derive(Clone, Default)]
pub struct CpuLine {
    level: Rc<Cell<bool>>,
    raises: Rc<Cell<usize>>,
}

impl CpuLine {
    pub fn level(&self) -> bool {
        self.level.get()
    }

    pub fn raises(&self) -> usize {
        self.raises.get()
    }
}

impl IrqLine for CpuLine {
    fn set_level(&mut self, level: bool) {
        if level {
            self.raises.set(self.raises.get() + 1);
        }
        self.level.set(level);
    }
}

/// Network backend recording transmitted frames.
#[derive(Clone, Default)]
pub struct RecordingNet {
    pub frames: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl NetworkBackend for RecordingNet {
    fn transmit(&mut self, frame: &[u8]) {
        self.frames.borrow_mut().push(frame.to_vec());
    }
}

/// I/O-port bus recording UART traffic; reads return a fixed byte.
#[derive(Clone, Default)]
pub struct RecordingPorts {
    pub writes: Rc<RefCell<Vec<(u32, u8)>>>,
    pub read_value: Rc<Cell<u8>>,
    pub reads: Rc<RefCell<Vec<u32>>>,
}

impl PortIo for RecordingPorts {
    fn in8(&mut self, port: u32) -> u8 {
        self.reads.borrow_mut().push(port);
        self.read_value.get()
    }

    fn out8(&mut self, port: u32, val: u8) {
        self.writes.borrow_mut().push((port, val));
    }
}

pub struct TestRig {
    pub soc: AvalancheSoc,
    pub cpu: CpuLine,
    pub resets: Rc<Cell<usize>>,
    pub tx_frames: Rc<RefCell<Vec<Vec<u8>>>>,
    pub ports: RecordingPorts,
}

/// Full platform with a NIC backend bound to CPMAC 0.
pub fn rig() -> TestRig {
    let cpu = CpuLine::default();
    let resets = Rc::new(Cell::new(0usize));
    let ports = RecordingPorts::default();
    let net = RecordingNet::default();
    let tx_frames = net.frames.clone();

    let reset_handle = resets.clone();
    let mut soc = AvalancheSoc::new(
        SocConfig::default(),
        Box::new(cpu.clone()),
        Box::new(move || reset_handle.set(reset_handle.get() + 1)),
        Box::new(ports.clone()),
    );
    soc.bind_nic(0, Box::new(net));

    TestRig {
        soc,
        cpu,
        resets,
        tx_frames,
        ports,
    }
}

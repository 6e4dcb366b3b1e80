mod common;

use common::{rig, VecMemory};

const MDIO_VER: u32 = 0x0861_1e00;
const MDIO_ALIVE: u32 = 0x0861_1e08;
const MDIO_LINK: u32 = 0x0861_1e0c;
const USERACCESS0: u32 = 0x0861_1e80;

const GO: u32 = 1 << 31;
const WRITE: u32 = 1 << 30;

fn read_op(reg: u32, phy: u32) -> u32 {
    GO | (reg << 21) | (phy << 16)
}

fn write_op(reg: u32, phy: u32, data: u32) -> u32 {
    GO | WRITE | (reg << 21) | (phy << 16) | data
}

#[test]
fn mdio_bank_power_on_values() {
    let mut t = rig();
    let mut mem = VecMemory::new(0, 0x100);

    assert_eq!(t.soc.read32(&mut mem, MDIO_VER), 0x0007_0101);
    assert_eq!(t.soc.read32(&mut mem, MDIO_VER + 4), 0);
    assert_eq!(t.soc.read32(&mut mem, MDIO_ALIVE), 0xffff_ffff);
}

#[test]
fn reading_the_advertisement_register_through_useraccess() {
    let mut t = rig();
    let mut mem = VecMemory::new(0, 0x100);

    t.soc.write32(&mut mem, USERACCESS0, GO | (4 << 21) | (31 << 16));
    assert_eq!(t.soc.read32(&mut mem, USERACCESS0), 0x0000_01e1);
}

#[test]
fn renegotiation_brings_the_link_up() {
    let mut t = rig();
    let mut mem = VecMemory::new(0, 0x100);

    t.soc.write32(&mut mem, USERACCESS0, write_op(0, 31, 1 << 9));
    t.soc.write32(&mut mem, USERACCESS0, read_op(0, 31));
    assert_eq!(t.soc.read32(&mut mem, USERACCESS0), 0);

    // Status now reports negotiation complete; the remote side advertises
    // everything we do.
    t.soc.write32(&mut mem, USERACCESS0, read_op(1, 31));
    assert_eq!(t.soc.read32(&mut mem, USERACCESS0), 0x782d);
    t.soc.write32(&mut mem, USERACCESS0, read_op(5, 31));
    assert_eq!(t.soc.read32(&mut mem, USERACCESS0), 0x85e1);

    assert_eq!(t.soc.read32(&mut mem, MDIO_LINK), 0x8000_0000);
}

#[test]
fn transactions_to_other_phys_leave_the_register_file_alone() {
    let mut t = rig();
    let mut mem = VecMemory::new(0, 0x100);

    t.soc.write32(&mut mem, USERACCESS0, write_op(0, 7, 0xffff));
    t.soc.write32(&mut mem, USERACCESS0, read_op(0, 31));
    assert_eq!(t.soc.read32(&mut mem, USERACCESS0), 0x1000);
}

mod common;

use common::{rig, VecMemory};

#[test]
fn programming_the_address_registers_publishes_the_station_address() {
    let mut t = rig();
    let mut mem = VecMemory::new(0, 0x1000);

    t.soc.write32(&mut mem, 0x0861_01b0, 0x0403_0201);
    t.soc.write32(&mut mem, 0x0861_01d0, 0x0000_0005);
    t.soc.write32(&mut mem, 0x0861_01d4, 0x0908_0706);

    assert_eq!(t.soc.nic_mac(0), [0x06, 0x07, 0x08, 0x09, 0x05, 0x01]);
}

#[test]
fn the_two_macs_hold_independent_addresses() {
    let mut t = rig();
    let mut mem = VecMemory::new(0, 0x1000);

    t.soc.write32(&mut mem, 0x0861_01b0, 0x0000_00aa);
    t.soc.write32(&mut mem, 0x0861_01d4, 0x0403_0201);

    t.soc.write32(&mut mem, 0x0861_29b0, 0x0000_00bb);
    t.soc.write32(&mut mem, 0x0861_29d4, 0x0807_0605);

    assert_eq!(t.soc.nic_mac(0), [0x01, 0x02, 0x03, 0x04, 0x00, 0xaa]);
    assert_eq!(t.soc.nic_mac(1), [0x05, 0x06, 0x07, 0x08, 0x00, 0xbb]);
}

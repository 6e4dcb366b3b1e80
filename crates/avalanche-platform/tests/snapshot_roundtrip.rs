mod common;

use avalanche_io_snapshot::{IoSnapshot, SnapshotError};
use common::{rig, VecMemory};

const INTESR1: u32 = 0x0861_2420;
const KICK_LOCK: u32 = 0x0861_0b00;
const GPIO0: u32 = 0x0861_0900;
const EMIF0: u32 = 0x0861_0800;
const USERACCESS0: u32 = 0x0861_1e80;

#[test]
fn saved_state_restores_into_a_fresh_platform() {
    let mut t = rig();
    let mut mem = VecMemory::new(0, 0x100);

    t.soc.write32(&mut mem, EMIF0, 0x1357_9bdf);
    t.soc.write32(&mut mem, GPIO0, 0x0000_0123);
    t.soc.write32(&mut mem, INTESR1, 1 << 7);
    t.soc.write32(&mut mem, KICK_LOCK, 0x5555);
    t.soc.write32(&mut mem, KICK_LOCK, 0xaaaa);
    t.soc
        .write32(&mut mem, 0x0861_01d4, 0x0403_0201);
    t.soc.write32(
        &mut mem,
        USERACCESS0,
        (1 << 31) | (1 << 30) | (4 << 21) | (31 << 16) | 0x00a1,
    );

    let blob = t.soc.save_state();

    let mut fresh = rig();
    fresh.soc.load_state(&blob).unwrap();

    assert_eq!(fresh.soc.read32(&mut mem, EMIF0), 0x1357_9bdf);
    assert_eq!(fresh.soc.read32(&mut mem, GPIO0), 0x0000_0123);
    assert_eq!(fresh.soc.read32(&mut mem, KICK_LOCK) & 3, 3);
    assert_eq!(fresh.soc.nic_mac(0), [0x01, 0x02, 0x03, 0x04, 0x00, 0x00]);

    // The restored PHY register file answers with the written value.
    fresh
        .soc
        .write32(&mut mem, USERACCESS0, (1 << 31) | (4 << 21) | (31 << 16));
    assert_eq!(fresh.soc.read32(&mut mem, USERACCESS0), 0x00a1);

    // The restored interrupt mask still gates delivery.
    fresh.soc.device_irq(15, true);
    assert!(fresh.cpu.level());
}

#[test]
fn other_versions_fail_to_load() {
    let mut t = rig();
    let mut blob = t.soc.save_state();

    // Bump the major version in the device header.
    blob[4..6].copy_from_slice(&1u16.to_le_bytes());

    assert_eq!(
        t.soc.load_state(&blob).unwrap_err(),
        SnapshotError::UnsupportedVersion {
            found: 1,
            supported: 0,
        }
    );
}

#[test]
fn truncated_blobs_fail_to_load() {
    let mut t = rig();
    let blob = t.soc.save_state();
    assert!(t.soc.load_state(&blob[..blob.len() - 3]).is_err());
}

#[test]
fn reset_returns_the_fabric_to_power_on_defaults() {
    let mut t = rig();
    let mut mem = VecMemory::new(0, 0x100);

    t.soc.write32(&mut mem, GPIO0, 0x0000_0123);
    t.soc.write32(&mut mem, EMIF0, 0xffff_0000);
    t.soc.write32(&mut mem, INTESR1, 1 << 7);

    t.soc.reset_to_defaults();

    assert_eq!(t.soc.read32(&mut mem, GPIO0), 0x0000_0800);
    assert_eq!(t.soc.read32(&mut mem, EMIF0), 0);
    assert_eq!(t.soc.read32(&mut mem, 0x0861_1a00), 0x025d_4291);

    // The interrupt mask was cleared with everything else.
    t.soc.device_irq(15, true);
    assert!(!t.cpu.level());
}

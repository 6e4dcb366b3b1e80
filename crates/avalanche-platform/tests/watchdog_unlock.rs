mod common;

use common::{rig, VecMemory};

const KICK_LOCK: u32 = 0x0861_0b00;
const KICK: u32 = 0x0861_0b04;
const DISABLE_LOCK: u32 = 0x0861_0b10;

#[test]
fn the_full_kick_sequence_unlocks_the_value_register() {
    let mut t = rig();
    let mut mem = VecMemory::new(0, 0x100);

    t.soc.write32(&mut mem, KICK_LOCK, 0x5555);
    assert_eq!(t.soc.read32(&mut mem, KICK_LOCK) & 3, 1);
    t.soc.write32(&mut mem, KICK_LOCK, 0xaaaa);
    assert_eq!(t.soc.read32(&mut mem, KICK_LOCK) & 3, 3);

    // With the lock in its terminal stage the kick is accepted.
    t.soc.write32(&mut mem, KICK, 1);
    assert_eq!(t.soc.read32(&mut mem, KICK_LOCK) & 3, 3);
}

#[test]
fn skipping_a_stage_leaves_the_register_locked() {
    let mut t = rig();
    let mut mem = VecMemory::new(0, 0x100);

    t.soc.write32(&mut mem, KICK_LOCK, 0xaaaa);
    assert_eq!(t.soc.read32(&mut mem, KICK_LOCK) & 3, 0);
}

#[test]
fn reordered_disable_stages_do_not_unlock() {
    let mut t = rig();
    let mut mem = VecMemory::new(0, 0x100);

    t.soc.write32(&mut mem, DISABLE_LOCK, 0x7777);
    t.soc.write32(&mut mem, DISABLE_LOCK, 0xdddd);
    assert_eq!(t.soc.read32(&mut mem, DISABLE_LOCK) & 3, 1);

    t.soc.write32(&mut mem, DISABLE_LOCK, 0xcccc);
    t.soc.write32(&mut mem, DISABLE_LOCK, 0xdddd);
    assert_eq!(t.soc.read32(&mut mem, DISABLE_LOCK) & 3, 3);
}

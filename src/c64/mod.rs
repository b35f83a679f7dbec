// The slice of a Commodore 64 that SID replay code expects to find:
// 64 KiB of flat RAM and the SID register window at $D400.
//
// There is no ROM, no banking and no I/O chip besides the SID. Tunes that
// program CIA1 only leave their timer latch in RAM, where the player reads
// it back to pace itself.

pub mod memory;
pub mod sid_port;

pub use memory::Memory;
pub use sid_port::{NullSid, SidPort, SidWrite};

/// Software IRQ vector ($0314/$0315). Tunes without a play address point it
/// at their replay routine during INIT.
pub const IRQ_VECTOR: u16 = 0x0314;

/// CIA1 timer A latch, low byte ($DC04) followed by the high byte ($DC05).
pub const CIA1_TIMER_A_LO: u16 = 0xDC04;
pub const CIA1_TIMER_A_HI: u16 = 0xDC05;

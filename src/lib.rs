// sidwire: plays C64 SID tunes on a real SID chip.
//
// The tune's own 6510 code runs on a small interpreter (`mos6510`) over
// a flat 64 KiB memory (`c64`). Writes to the SID window are forwarded
// register by register to an output device (`sid_device`) while the
// `player` thread calls the play routine at the tune's refresh rate.

pub mod c64;
pub mod config;
pub mod mos6510;
pub mod player;
pub mod sid_device;
pub mod sid_spi;

#[cfg(feature = "usb")]
pub mod sid_direct;

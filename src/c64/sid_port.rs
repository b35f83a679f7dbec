// Receiving end of the SID register window ($D400–$D7FF, mirrored every 32 bytes).

/// Number of SID registers behind the window.
pub const SID_REG_COUNT: u8 = 0x20;
/// Mode / volume register.
pub const SID_VOL_REG: u8 = 0x18;

/// A forwarded SID register write: (register, value).
pub type SidWrite = (u8, u8);

/// Anything the memory bus can hand SID register writes to.
///
/// The call is fire-and-forget: the CPU carries on as soon as `poke`
/// returns, so implementations that talk to hardware must keep their own
/// error state.
pub trait SidPort {
    fn poke(&mut self, reg: u8, value: u8);
}

/// Discards every write.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSid;

impl SidPort for NullSid {
    fn poke(&mut self, _reg: u8, _value: u8) {}
}

/// Records writes in order.
impl SidPort for Vec<SidWrite> {
    fn poke(&mut self, reg: u8, value: u8) {
        self.push((reg, value));
    }
}

impl<P: SidPort + ?Sized> SidPort for &mut P {
    fn poke(&mut self, reg: u8, value: u8) {
        (**self).poke(reg, value);
    }
}

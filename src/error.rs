use thiserror::Error;

/// Everything that can go wrong while driving the machine.
///
/// Success is the `Ok` arm of `Result`; these are the remaining outcome
/// codes. The enum is fieldless with pinned discriminants so hosts that
/// marshal outcomes across a language boundary get a stable integer set
/// (`SUCCESS` being 0).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Fault {
    /// The fetched word does not encode any of the 35 instructions.
    #[error("invalid opcode")]
    InvalidOpcode = 1,
    /// RET with no return address on the stack.
    #[error("return with an empty call stack")]
    StackEmpty = 2,
    /// CALL with all 16 stack slots in use.
    #[error("call stack overflow")]
    StackOverflow = 3,
    /// A fetch or an IR-relative access past the end of memory.
    #[error("memory access out of bounds")]
    MemOutOfBounds = 4,
    #[error("ROM file not found")]
    RomNotFound = 5,
    #[error("ROM file could not be opened")]
    RomOpenFailed = 6,
    #[error("ROM file could not be read")]
    RomReadFailed = 7,
    /// The ROM does not fit in the 3584 bytes above `PROG_START`.
    #[error("ROM exceeds available memory")]
    RomExceedsMaxMem = 8,
    /// A key index outside 0x0..=0xF.
    #[error("key index out of range")]
    IndexOutOfRange = 9,
}

impl Fault {
    /// The stable integer for this outcome. 0 is reserved for success.
    pub fn code(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(Fault::InvalidOpcode.code(), 1);
        assert_eq!(Fault::StackEmpty.code(), 2);
        assert_eq!(Fault::StackOverflow.code(), 3);
        assert_eq!(Fault::MemOutOfBounds.code(), 4);
        assert_eq!(Fault::IndexOutOfRange.code(), 9);
    }

    #[test]
    fn test_display_is_human_readable() {
        assert_eq!(Fault::StackEmpty.to_string(), "return with an empty call stack");
    }
}

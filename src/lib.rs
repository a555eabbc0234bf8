//! Core interpreter for the CHIP-8 virtual machine.
//!
//! The crate owns the fetch-decode-execute loop, the 35-opcode set, the
//! register/memory/stack model, the key latch, the two timers, and the 64x32
//! XOR-blitted frame buffer. Dialect differences between the 1977 COSMAC-VIP
//! interpreter and the CHIP-48/SUPER-CHIP line are selected per machine
//! through [`Quirks`].
//!
//! Hosts construct a [`Chip8`], load a ROM, and call [`Chip8::step`] at
//! whatever instruction rate they like; rendering, sound, and input event
//! translation stay on the host side of the boundary.

pub use chip8::Chip8;
pub use error::Fault;
pub use instruction::Instruction;
pub use keymap::keymap;
pub use opcode::Opcode;
pub use quirks::Quirks;
pub use state::FrameBuffer;

pub mod constants;

mod chip8;
mod error;
mod instruction;
mod keymap;
mod opcode;
mod operations;
mod quirks;
mod stack;
mod state;

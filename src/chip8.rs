use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::constants::{MAX_ROM_SIZE, MEM_SIZE, NUM_KEYS, NUM_REGISTERS, PROG_START, STACK_DEPTH};
use crate::error::Fault;
use crate::instruction::Instruction;
use crate::opcode::Opcode;
use crate::quirks::Quirks;
use crate::state::{FrameBuffer, State};

/// # Chip8
/// One emulated machine: the CPU aggregate plus the step driver.
///
/// Supplies interfaces for:
/// - loading ROMs from a byte slice or a file
/// - pressing and releasing keys
/// - stepping the CPU one instruction at a time
/// - inspecting registers, stack, timers, and the frame buffer
///
/// A faulting step halts the machine; further steps re-report the fault
/// until `reset` is called. The host owns pacing entirely — the core never
/// sleeps, blocks, or retries.
pub struct Chip8 {
    pub(crate) state: State,
    pub(crate) quirks: Quirks,
    pub(crate) rng: StdRng,
    status: Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Running,
    Halted(Fault),
}

impl Chip8 {
    pub fn new(quirks: Quirks) -> Self {
        Chip8 {
            state: State::new(),
            quirks,
            rng: StdRng::seed_from_u64(wall_clock_seed()),
            status: Status::Running,
        }
    }

    /// Back to the post-init state: registers, memory, and display cleared,
    /// fontset reseeded, PC at 0x200, RNG reseeded, any halt cleared. The
    /// configured quirks survive.
    pub fn reset(&mut self) {
        self.state = State::new();
        self.rng = StdRng::seed_from_u64(wall_clock_seed());
        self.status = Status::Running;
    }

    /// Copy a ROM image into memory at 0x200.
    ///
    /// Images over 3584 bytes are rejected without touching memory.
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<(), Fault> {
        if rom.len() > MAX_ROM_SIZE {
            return Err(Fault::RomExceedsMaxMem);
        }
        let start = PROG_START as usize;
        self.state.memory[start..start + rom.len()].copy_from_slice(rom);
        debug!("loaded {} byte ROM", rom.len());
        Ok(())
    }

    /// Read a ROM image from disk and load it.
    pub fn load_rom_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Fault> {
        let mut file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Fault::RomNotFound,
            _ => Fault::RomOpenFailed,
        })?;
        let mut rom = Vec::new();
        file.read_to_end(&mut rom).map_err(|_| Fault::RomReadFailed)?;
        self.load_rom(&rom)
    }

    /// Execute one instruction: fetch the word at PC, advance PC by 2,
    /// decode, execute, and tick both timers.
    ///
    /// Returns the executed instruction; its `Display` is the disassembled
    /// mnemonic. A fault halts the machine and is re-reported by every
    /// subsequent call.
    pub fn step(&mut self) -> Result<Instruction, Fault> {
        if let Status::Halted(fault) = self.status {
            return Err(fault);
        }
        self.step_running().map_err(|fault| {
            debug!("halting: {}", fault);
            self.status = Status::Halted(fault);
            fault
        })
    }

    fn step_running(&mut self) -> Result<Instruction, Fault> {
        let opcode = self.fetch()?;
        self.state.pc = self.state.pc.wrapping_add(2);
        trace!(
            "{:04X} v{:02X?} i{:04X} pc{:04X}",
            opcode.word(),
            self.state.v,
            self.state.ir,
            self.state.pc
        );
        let result = match Instruction::decode(opcode) {
            Some(instruction) => self.execute(instruction).map(|()| instruction),
            None => Err(Fault::InvalidOpcode),
        };
        // exactly one tick per fetched instruction, fault or not; FX07 reads
        // the pre-tick value because execution comes first
        self.state.tick_timers();
        result
    }

    /// Assemble the big-endian word at PC. Fetching with PC past 0xFFE is
    /// the one place a bad jump target surfaces.
    fn fetch(&self) -> Result<Opcode, Fault> {
        let pc = self.state.pc as usize;
        if pc + 1 >= MEM_SIZE {
            return Err(Fault::MemOutOfBounds);
        }
        let word = u16::from(self.state.memory[pc]) << 8 | u16::from(self.state.memory[pc + 1]);
        Ok(Opcode::new(word))
    }

    /// Latch a key down or up.
    pub fn set_key(&mut self, key: u8, down: bool) -> Result<(), Fault> {
        if key as usize >= NUM_KEYS {
            return Err(Fault::IndexOutOfRange);
        }
        if down {
            self.state.keys |= 1 << key;
        } else {
            self.state.keys &= !(1 << key);
        }
        Ok(())
    }

    /// Whether a key is currently latched down.
    pub fn get_key(&self, key: u8) -> Result<bool, Fault> {
        if key as usize >= NUM_KEYS {
            return Err(Fault::IndexOutOfRange);
        }
        Ok(self.state.key_down(key))
    }

    pub fn quirks(&self) -> Quirks {
        self.quirks
    }

    /// Enable every quirk set in `flags`; the rest are untouched.
    pub fn set_quirks(&mut self, flags: Quirks) {
        self.quirks = self.quirks.union(flags);
    }

    /// Disable every quirk set in `flags`; the rest are untouched.
    pub fn clear_quirks(&mut self, flags: Quirks) {
        self.quirks = self.quirks.difference(flags);
    }

    pub fn pc(&self) -> u16 {
        self.state.pc
    }

    pub fn ir(&self) -> u16 {
        self.state.ir
    }

    pub fn sp(&self) -> u8 {
        self.state.stack.sp()
    }

    pub fn delay_timer(&self) -> u8 {
        self.state.dt
    }

    pub fn sound_timer(&self) -> u8 {
        self.state.st
    }

    pub fn v(&self) -> &[u8; NUM_REGISTERS] {
        &self.state.v
    }

    pub fn stack(&self) -> &[u16; STACK_DEPTH] {
        self.state.stack.entries()
    }

    pub fn framebuffer(&self) -> &FrameBuffer {
        &self.state.framebuffer
    }

    pub fn is_halted(&self) -> bool {
        matches!(self.status, Status::Halted(_))
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new(Quirks::default())
    }
}

fn wall_clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_assembles_big_endian() {
        let mut chip8 = Chip8::default();
        chip8.state.memory[0x200..0x202].copy_from_slice(&[0xAA, 0xBB]);
        assert_eq!(chip8.fetch().unwrap().word(), 0xAABB);
    }

    #[test]
    fn test_step_advances_pc_and_reports_mnemonic() {
        let mut chip8 = Chip8::default();
        chip8.load_rom(&[0x00, 0xE0]).unwrap();
        let instruction = chip8.step().unwrap();
        assert_eq!(instruction.to_string(), "CLS");
        assert_eq!(chip8.pc(), 0x202);
    }

    #[test]
    fn test_step_halts_on_invalid_opcode_and_stays_halted() {
        let mut chip8 = Chip8::default();
        // memory is zeroed past the ROM; 0x0000 does not decode
        assert_eq!(chip8.step(), Err(Fault::InvalidOpcode));
        assert!(chip8.is_halted());
        let pc = chip8.pc();
        // a halted machine re-reports without touching state
        assert_eq!(chip8.step(), Err(Fault::InvalidOpcode));
        assert_eq!(chip8.pc(), pc);
    }

    #[test]
    fn test_fetch_past_memory_end_faults() {
        let mut chip8 = Chip8::default();
        chip8.state.pc = 0xFFF;
        assert_eq!(chip8.step(), Err(Fault::MemOutOfBounds));
        assert!(chip8.is_halted());
    }

    #[test]
    fn test_fetch_at_last_valid_address_succeeds() {
        let mut chip8 = Chip8::default();
        chip8.state.pc = 0xFFE;
        chip8.state.memory[0xFFE..0x1000].copy_from_slice(&[0x00, 0xE0]);
        assert!(chip8.step().is_ok());
    }

    #[test]
    fn test_timers_tick_once_per_step() {
        let mut chip8 = Chip8::default();
        chip8.load_rom(&[0x00, 0xE0, 0x00, 0xE0]).unwrap();
        chip8.state.dt = 2;
        chip8.state.st = 1;
        chip8.step().unwrap();
        assert_eq!(chip8.delay_timer(), 1);
        assert_eq!(chip8.sound_timer(), 0);
        chip8.step().unwrap();
        assert_eq!(chip8.delay_timer(), 0);
        assert_eq!(chip8.sound_timer(), 0);
    }

    #[test]
    fn test_timers_tick_even_when_execution_faults() {
        let mut chip8 = Chip8::default();
        chip8.state.dt = 5;
        assert_eq!(chip8.step(), Err(Fault::InvalidOpcode));
        assert_eq!(chip8.delay_timer(), 4);
    }

    #[test]
    fn test_set_key_and_get_key() {
        let mut chip8 = Chip8::default();
        chip8.set_key(0x5, true).unwrap();
        assert!(chip8.get_key(0x5).unwrap());
        chip8.set_key(0x5, false).unwrap();
        assert!(!chip8.get_key(0x5).unwrap());
    }

    #[test]
    fn test_key_release_does_not_toggle_an_up_key() {
        let mut chip8 = Chip8::default();
        chip8.set_key(0x3, false).unwrap();
        assert!(!chip8.get_key(0x3).unwrap());
    }

    #[test]
    fn test_key_index_out_of_range() {
        let mut chip8 = Chip8::default();
        assert_eq!(chip8.set_key(16, true), Err(Fault::IndexOutOfRange));
        assert_eq!(chip8.get_key(16), Err(Fault::IndexOutOfRange));
        assert_eq!(chip8.state.keys, 0);
    }

    #[test]
    fn test_load_rom_copies_at_prog_start() {
        let mut chip8 = Chip8::default();
        chip8.load_rom(&[0x12, 0x00]).unwrap();
        assert_eq!(chip8.state.memory[0x200..0x202], [0x12, 0x00]);
    }

    #[test]
    fn test_load_rom_respects_max_size() {
        let mut chip8 = Chip8::default();
        assert!(chip8.load_rom(&[0xFF; MAX_ROM_SIZE]).is_ok());
        chip8.reset();
        assert_eq!(
            chip8.load_rom(&[0xFF; MAX_ROM_SIZE + 1]),
            Err(Fault::RomExceedsMaxMem)
        );
        // rejected load leaves memory in the post-init state
        assert_eq!(chip8.state.memory[0x200..], [0; MEM_SIZE - 0x200]);
    }

    #[test]
    fn test_load_rom_file_not_found() {
        let mut chip8 = Chip8::default();
        assert_eq!(
            chip8.load_rom_file("/no/such/rom.ch8"),
            Err(Fault::RomNotFound)
        );
    }

    #[test]
    fn test_reset_clears_halt_and_keeps_quirks() {
        let quirks = Quirks::COSMAC_VIP;
        let mut chip8 = Chip8::new(quirks);
        assert_eq!(chip8.step(), Err(Fault::InvalidOpcode));
        chip8.reset();
        assert!(!chip8.is_halted());
        assert_eq!(chip8.pc(), 0x200);
        assert_eq!(chip8.quirks(), quirks);
    }

    #[test]
    fn test_set_and_clear_quirks_merge_flagwise() {
        let mut chip8 = Chip8::default();
        chip8.set_quirks(Quirks {
            shifts_use_vy: true,
            ..Quirks::default()
        });
        chip8.set_quirks(Quirks {
            fx_autoinc_i: true,
            ..Quirks::default()
        });
        assert!(chip8.quirks().shifts_use_vy);
        assert!(chip8.quirks().fx_autoinc_i);
        chip8.clear_quirks(Quirks {
            shifts_use_vy: true,
            ..Quirks::default()
        });
        assert!(!chip8.quirks().shifts_use_vy);
        assert!(chip8.quirks().fx_autoinc_i);
    }
}

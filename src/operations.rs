//! Execution of decoded instructions against the CPU aggregate.
//!
//! Every arm mutates state in place and reports faults as values. The flag
//! register is always computed into a local and written after the arithmetic
//! result lands in Vx, so the X == 0xF and Y == 0xF corners come out right.

use rand::Rng;

use crate::chip8::Chip8;
use crate::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH, FONT_GLYPH_SIZE, FONT_START, MEM_SIZE};
use crate::error::Fault;
use crate::instruction::Instruction;

impl Chip8 {
    pub(crate) fn execute(&mut self, instruction: Instruction) -> Result<(), Fault> {
        use Instruction::*;

        match instruction {
            Cls => self.state.framebuffer.clear(),
            Ret => self.state.pc = self.state.stack.pop()?,
            Jp { addr } => self.state.pc = addr,
            Call { addr } => {
                self.state.stack.push(self.state.pc)?;
                self.state.pc = addr;
            }
            SeByte { x, kk } => {
                if self.state.v[x as usize] == kk {
                    self.skip_next();
                }
            }
            SneByte { x, kk } => {
                if self.state.v[x as usize] != kk {
                    self.skip_next();
                }
            }
            SeReg { x, y } => {
                if self.state.v[x as usize] == self.state.v[y as usize] {
                    self.skip_next();
                }
            }
            SneReg { x, y } => {
                if self.state.v[x as usize] != self.state.v[y as usize] {
                    self.skip_next();
                }
            }
            LdByte { x, kk } => self.state.v[x as usize] = kk,
            AddByte { x, kk } => {
                let vx = &mut self.state.v[x as usize];
                // carry is dropped and VF stays untouched
                *vx = vx.wrapping_add(kk);
            }
            LdReg { x, y } => self.state.v[x as usize] = self.state.v[y as usize],
            Or { x, y } => self.state.v[x as usize] |= self.state.v[y as usize],
            And { x, y } => self.state.v[x as usize] &= self.state.v[y as usize],
            Xor { x, y } => self.state.v[x as usize] ^= self.state.v[y as usize],
            AddReg { x, y } => {
                let (sum, carry) = self.state.v[x as usize].overflowing_add(self.state.v[y as usize]);
                self.state.v[x as usize] = sum;
                self.state.v[0xF] = carry as u8;
            }
            Sub { x, y } => {
                let (vx, vy) = (self.state.v[x as usize], self.state.v[y as usize]);
                let not_borrow = (vx >= vy) as u8;
                self.state.v[x as usize] = vx.wrapping_sub(vy);
                self.state.v[0xF] = not_borrow;
            }
            Subn { x, y } => {
                let (vx, vy) = (self.state.v[x as usize], self.state.v[y as usize]);
                let not_borrow = (vy >= vx) as u8;
                self.state.v[x as usize] = vy.wrapping_sub(vx);
                self.state.v[0xF] = not_borrow;
            }
            Shr { x, y } => {
                if self.quirks.shifts_use_vy {
                    self.state.v[x as usize] = self.state.v[y as usize];
                }
                let lsb = self.state.v[x as usize] & 0x1;
                self.state.v[x as usize] >>= 1;
                self.state.v[0xF] = lsb;
            }
            Shl { x, y } => {
                if self.quirks.shifts_use_vy {
                    self.state.v[x as usize] = self.state.v[y as usize];
                }
                let msb = (self.state.v[x as usize] & 0x80) >> 7;
                self.state.v[x as usize] <<= 1;
                self.state.v[0xF] = msb;
            }
            LdI { addr } => self.state.ir = addr,
            JpOffset { x, addr } => {
                let offset = if self.quirks.bnnn_uses_vx {
                    self.state.v[x as usize]
                } else {
                    self.state.v[0x0]
                };
                self.state.pc = addr.wrapping_add(u16::from(offset));
            }
            Rnd { x, kk } => {
                let byte: u8 = self.rng.gen();
                self.state.v[x as usize] = byte & kk;
            }
            Drw { x, y, n } => self.draw(x, y, n)?,
            Skp { x } => {
                if self.state.key_down(self.state.v[x as usize]) {
                    self.skip_next();
                }
            }
            Sknp { x } => {
                if !self.state.key_down(self.state.v[x as usize]) {
                    self.skip_next();
                }
            }
            LdFromDt { x } => self.state.v[x as usize] = self.state.dt,
            LdKey { x } => self.wait_key(x),
            LdDt { x } => self.state.dt = self.state.v[x as usize],
            LdSt { x } => self.state.st = self.state.v[x as usize],
            AddI { x } => {
                let vx = u16::from(self.state.v[x as usize]);
                self.state.ir = self.state.ir.wrapping_add(vx) & 0x0FFF;
            }
            LdFont { x } => {
                let glyph = u16::from(self.state.v[x as usize] & 0x0F);
                self.state.ir = FONT_START + FONT_GLYPH_SIZE * glyph;
            }
            LdBcd { x } => self.store_bcd(x)?,
            Store { x } => self.store_registers(x)?,
            Load { x } => self.load_registers(x)?,
        }
        Ok(())
    }

    /// Skip over the next two-byte instruction.
    fn skip_next(&mut self) {
        self.state.pc = self.state.pc.wrapping_add(2);
    }

    /// DXYN: XOR an n-byte sprite from memory[I..] onto the display.
    ///
    /// The origin wraps (Vx mod 64, Vy mod 32); sprite bits past the right or
    /// bottom edge are clipped, never wrapped. VF records whether any lit
    /// pixel was turned off.
    fn draw(&mut self, x: u8, y: u8, n: u8) -> Result<(), Fault> {
        let ir = self.state.ir as usize;
        let n = n as usize;
        if ir + n > MEM_SIZE {
            return Err(Fault::MemOutOfBounds);
        }
        let px = (self.state.v[x as usize] & 63) as usize;
        let py = (self.state.v[y as usize] & 31) as usize;
        let mut collision = 0;
        for row in 0..n {
            let ty = py + row;
            if ty >= DISPLAY_HEIGHT {
                break;
            }
            let byte = self.state.memory[ir + row];
            for col in 0..8 {
                let tx = px + col;
                if tx >= DISPLAY_WIDTH {
                    break;
                }
                if byte & (0x80 >> col) == 0 {
                    continue;
                }
                let pixel = self.state.framebuffer.pixel_at(tx, ty);
                collision |= *pixel;
                *pixel ^= 1;
            }
        }
        self.state.v[0xF] = collision;
        Ok(())
    }

    /// FX0A: busy-wait for a key by re-pointing PC at this instruction until
    /// one is held, then latch the lowest-indexed held key into Vx.
    fn wait_key(&mut self, x: u8) {
        match self.state.first_key_down() {
            Some(key) => self.state.v[x as usize] = key,
            None => self.state.pc = self.state.pc.wrapping_sub(2),
        }
    }

    /// FX33: decimal digits of Vx into memory[I..I+3), hundreds first.
    fn store_bcd(&mut self, x: u8) -> Result<(), Fault> {
        let ir = self.state.ir as usize;
        if ir + 2 >= MEM_SIZE {
            return Err(Fault::MemOutOfBounds);
        }
        let value = self.state.v[x as usize];
        self.state.memory[ir] = value / 100;
        self.state.memory[ir + 1] = value / 10 % 10;
        self.state.memory[ir + 2] = value % 10;
        Ok(())
    }

    /// FX55: V0..=Vx into memory[I..]; I advances past the block under the
    /// autoincrement quirk.
    fn store_registers(&mut self, x: u8) -> Result<(), Fault> {
        let x = x as usize;
        let ir = self.state.ir as usize;
        if ir + x >= MEM_SIZE {
            return Err(Fault::MemOutOfBounds);
        }
        self.state.memory[ir..=ir + x].copy_from_slice(&self.state.v[..=x]);
        if self.quirks.fx_autoinc_i {
            self.state.ir = (self.state.ir + x as u16 + 1) & 0x0FFF;
        }
        Ok(())
    }

    /// FX65: memory[I..] into V0..=Vx; same quirk as FX55.
    fn load_registers(&mut self, x: u8) -> Result<(), Fault> {
        let x = x as usize;
        let ir = self.state.ir as usize;
        if ir + x >= MEM_SIZE {
            return Err(Fault::MemOutOfBounds);
        }
        self.state.v[..=x].copy_from_slice(&self.state.memory[ir..=ir + x]);
        if self.quirks.fx_autoinc_i {
            self.state.ir = (self.state.ir + x as u16 + 1) & 0x0FFF;
        }
        Ok(())
    }
}

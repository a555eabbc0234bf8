/// Dialect switches for the opcode families that historical interpreters
/// executed differently.
///
/// Each flag selects between the 1977 COSMAC-VIP behavior and the later
/// CHIP-48/SUPER-CHIP reading of the same encoding. All off (`Default`)
/// gives the modern dialect most test ROMs assume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Quirks {
    /// 8XY6/8XYE shift Vy into Vx before shifting instead of shifting Vx
    /// in place.
    pub shifts_use_vy: bool,
    /// BNNN jumps to NNN + Vx (x = second nibble) instead of NNN + V0.
    pub bnnn_uses_vx: bool,
    /// FX55/FX65 leave I incremented by X+1 after the transfer.
    pub fx_autoinc_i: bool,
}

impl Quirks {
    /// The dialect of the original COSMAC-VIP interpreter.
    pub const COSMAC_VIP: Quirks = Quirks {
        shifts_use_vy: true,
        bnnn_uses_vx: false,
        fx_autoinc_i: true,
    };

    /// Flagwise union: every quirk enabled in either operand.
    pub fn union(self, other: Quirks) -> Quirks {
        Quirks {
            shifts_use_vy: self.shifts_use_vy || other.shifts_use_vy,
            bnnn_uses_vx: self.bnnn_uses_vx || other.bnnn_uses_vx,
            fx_autoinc_i: self.fx_autoinc_i || other.fx_autoinc_i,
        }
    }

    /// Flagwise difference: quirks enabled in `self` and not in `other`.
    pub fn difference(self, other: Quirks) -> Quirks {
        Quirks {
            shifts_use_vy: self.shifts_use_vy && !other.shifts_use_vy,
            bnnn_uses_vx: self.bnnn_uses_vx && !other.bnnn_uses_vx,
            fx_autoinc_i: self.fx_autoinc_i && !other.fx_autoinc_i,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_all_off() {
        let q = Quirks::default();
        assert!(!q.shifts_use_vy && !q.bnnn_uses_vx && !q.fx_autoinc_i);
    }

    #[test]
    fn test_union_and_difference() {
        let q = Quirks::default().union(Quirks {
            shifts_use_vy: true,
            ..Quirks::default()
        });
        assert!(q.shifts_use_vy);
        let q = Quirks::COSMAC_VIP.difference(Quirks {
            fx_autoinc_i: true,
            ..Quirks::default()
        });
        assert!(q.shifts_use_vy);
        assert!(!q.fx_autoinc_i);
    }
}

use std::fmt;
use std::ops::{Mul, MulAssign};

use crate::types::{DataType, Operation};
use crate::value::Immediate;

bitflags::bitflags! {
    /// Source operand modifier bits.
    #[derive(Copy, Clone, PartialEq, Eq, Hash)]
    pub struct Modifier: u8 {
        const ABS = 0b0001;
        const NEG = 0b0010;
        const SAT = 0b0100;
        const NOT = 0b1000;
    }
}

impl Default for Modifier {
    fn default() -> Self {
        Modifier::empty()
    }
}

impl Modifier {
    pub const NONE: Modifier = Modifier::empty();

    pub fn from_op(op: Operation) -> Modifier {
        match op {
            Operation::Abs => Modifier::ABS,
            Operation::Neg => Modifier::NEG,
            Operation::Sat => Modifier::SAT,
            Operation::Not => Modifier::NOT,
            _ => Modifier::NONE,
        }
    }

    /// Unary operation with the same effect. Combinations need a conversion.
    pub fn op(self) -> Operation {
        if self.is_empty() {
            Operation::Mov
        } else if self == Modifier::ABS {
            Operation::Abs
        } else if self == Modifier::NEG {
            Operation::Neg
        } else if self == Modifier::SAT {
            Operation::Sat
        } else if self == Modifier::NOT {
            Operation::Not
        } else {
            Operation::Cvt
        }
    }

    pub fn is_none(self) -> bool {
        self.is_empty()
    }

    pub fn abs(self) -> bool {
        self.contains(Modifier::ABS)
    }

    pub fn neg(self) -> bool {
        self.contains(Modifier::NEG)
    }

    pub fn sat(self) -> bool {
        self.contains(Modifier::SAT)
    }

    pub fn not(self) -> bool {
        self.contains(Modifier::NOT)
    }

    /// Applies the modifier to an immediate in place.
    pub fn apply_to(self, imm: &mut Immediate) {
        if self.is_none() {
            return;
        }

        match imm.ty {
            DataType::F32 => {
                let mut f = imm.as_f32();
                if self.abs() {
                    f = f.abs();
                }
                if self.neg() {
                    f = -f;
                }
                if self.sat() {
                    f = f.clamp(0.0, 1.0);
                }
                debug_assert!(!self.not());
                imm.set_f32(f);
            }

            DataType::F64 => {
                let mut f = imm.as_f64();
                if self.abs() {
                    f = f.abs();
                }
                if self.neg() {
                    f = -f;
                }
                if self.sat() {
                    f = f.clamp(0.0, 1.0);
                }
                debug_assert!(!self.not());
                imm.set_f64(f);
            }

            // narrow unsigned types are treated as signed
            DataType::S8
            | DataType::S16
            | DataType::S32
            | DataType::U8
            | DataType::U16
            | DataType::U32 => {
                let mut i = imm.as_s32();
                if self.abs() {
                    i = i.wrapping_abs();
                }
                if self.neg() {
                    i = i.wrapping_neg();
                }
                if self.not() {
                    i = !i;
                }
                imm.set_s32(i);
            }

            ty => {
                debug_assert!(false, "modifier on immediate of type {}", ty.name());
                imm.set_u64(0);
            }
        }
    }
}

/// Composition: `a * b` is the modifier equivalent to applying `b`, then `a`.
/// An ABS in `a` swallows a NEG from `b`; NEG and NOT toggle; ABS and SAT
/// accumulate.
impl Mul for Modifier {
    type Output = Modifier;

    fn mul(self, other: Modifier) -> Modifier {
        let mut b = other;
        if self.abs() {
            b.remove(Modifier::NEG);
        }

        let toggled = (self ^ b) & (Modifier::NOT | Modifier::NEG);
        let sticky = (self | other) & (Modifier::ABS | Modifier::SAT);
        toggled | sticky
    }
}

impl MulAssign for Modifier {
    fn mul_assign(&mut self, other: Modifier) {
        *self = *self * other;
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for (set, name) in [
            (self.sat(), "sat"),
            (self.neg(), "neg"),
            (self.abs(), "abs"),
            (self.not(), "not"),
        ] {
            if set {
                if !first {
                    write!(f, " ")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Modifier({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neg_toggles() {
        assert_eq!(Modifier::NONE, Modifier::NEG * Modifier::NEG);
        assert_eq!(Modifier::NONE, Modifier::NOT * Modifier::NOT);
        assert_eq!(Modifier::NEG, Modifier::NONE * Modifier::NEG);
    }

    #[test]
    fn test_abs_swallows_inner_neg() {
        assert_eq!(Modifier::ABS, Modifier::ABS * Modifier::NEG);
        assert_eq!(Modifier::ABS | Modifier::NEG, Modifier::NEG * Modifier::ABS);
        assert_eq!(Modifier::ABS, Modifier::ABS * Modifier::ABS);
    }

    #[test]
    fn test_sat_accumulates() {
        let m = Modifier::SAT * (Modifier::NEG | Modifier::ABS);
        assert!(m.sat() && m.neg() && m.abs());
    }

    #[test]
    fn test_op_mapping() {
        assert_eq!(Operation::Neg, Modifier::NEG.op());
        assert_eq!(Operation::Mov, Modifier::NONE.op());
        assert_eq!(Operation::Cvt, (Modifier::NEG | Modifier::ABS).op());
        assert_eq!(Modifier::SAT, Modifier::from_op(Operation::Sat));
        assert_eq!(Modifier::NONE, Modifier::from_op(Operation::Add));
    }

    #[test]
    fn test_apply_to_immediates() {
        let mut imm = Immediate::f32(-2.5);
        (Modifier::NEG | Modifier::ABS).apply_to(&mut imm);
        assert_eq!(-2.5, imm.as_f32());

        let mut imm = Immediate::f32(3.0);
        Modifier::SAT.apply_to(&mut imm);
        assert_eq!(1.0, imm.as_f32());

        let mut imm = Immediate::s32(5);
        Modifier::NOT.apply_to(&mut imm);
        assert_eq!(!5, imm.as_s32());

        let mut imm = Immediate::u32(7);
        Modifier::NEG.apply_to(&mut imm);
        assert_eq!(-7, imm.as_s32());
    }

    #[test]
    fn test_display() {
        assert_eq!("neg abs", (Modifier::NEG | Modifier::ABS).to_string());
        assert_eq!("", Modifier::NONE.to_string());
    }
}

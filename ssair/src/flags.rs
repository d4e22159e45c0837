use std::env;
use std::path::PathBuf;

use crate::error::IrError;

bitflags::bitflags! {
    /// Verbosity switches read from `SSAIR_DEBUG`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct DebugFlags: u32 {
        const BASIC = 1 << 0;
        const VERBOSE = 1 << 1;
        const REG_ALLOC = 1 << 2;
    }
}

impl Default for DebugFlags {
    fn default() -> Self {
        DebugFlags::empty()
    }
}

/// Debug and optimization switches of a compilation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Flags {
    pub debug: DebugFlags,
    pub opt_level: u32,
    /// Graphviz file that receives the CFG of every function after each pass.
    pub cfg_dot: Option<PathBuf>,
    pub dump_after_pass: bool,
}

impl Flags {
    pub fn new() -> Flags {
        Flags::default()
    }

    /// Reads `SSAIR_DEBUG`, `SSAIR_OPTIMIZE` and `SSAIR_CFG_DOT`.
    pub fn from_env() -> Result<Flags, IrError> {
        let mut flags = Flags::new();

        if let Ok(value) = env::var("SSAIR_DEBUG") {
            flags.debug = DebugFlags::from_bits_truncate(parse_number("SSAIR_DEBUG", &value)?);
        }
        if let Ok(value) = env::var("SSAIR_OPTIMIZE") {
            flags.opt_level = parse_number("SSAIR_OPTIMIZE", &value)?;
        }
        if let Ok(value) = env::var("SSAIR_CFG_DOT") {
            if !value.is_empty() {
                flags.cfg_dot = Some(PathBuf::from(value));
            }
        }

        flags.dump_after_pass = flags.debug_verbose();
        Ok(flags)
    }

    pub fn debug_basic(&self) -> bool {
        self.debug.contains(DebugFlags::BASIC)
    }

    pub fn debug_verbose(&self) -> bool {
        self.debug.contains(DebugFlags::VERBOSE)
    }

    pub fn debug_reg_alloc(&self) -> bool {
        self.debug.contains(DebugFlags::REG_ALLOC)
    }
}

pub(crate) fn parse_number(name: &'static str, value: &str) -> Result<u32, IrError> {
    let trimmed = value.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => trimmed.parse::<u32>(),
    };

    parsed.map_err(|_| IrError::InvalidFlag {
        name,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(12, parse_number("X", "12").unwrap());
        assert_eq!(0x1f, parse_number("X", "0x1f").unwrap());
        assert_eq!(3, parse_number("X", " 3 ").unwrap());
    }

    #[test]
    fn test_parse_number_rejects_garbage() {
        match parse_number("SSAIR_DEBUG", "verbose") {
            Err(IrError::InvalidFlag { name, value }) => {
                assert_eq!("SSAIR_DEBUG", name);
                assert_eq!("verbose", value);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_debug_bits() {
        let flags = Flags {
            debug: DebugFlags::BASIC | DebugFlags::REG_ALLOC,
            ..Flags::default()
        };
        assert!(flags.debug_basic());
        assert!(!flags.debug_verbose());
        assert!(flags.debug_reg_alloc());
    }

    #[test]
    fn test_unknown_debug_bits_are_dropped() {
        let debug = DebugFlags::from_bits_truncate(0xff);
        assert_eq!(DebugFlags::all(), debug);
        assert_eq!(0x7, debug.bits());
    }
}

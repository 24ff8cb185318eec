use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::BufReader;

use crate::hooks::Hook;
use crate::session::Session;

/// Watchpoint hook configured from a YAML file: whenever the pc passes
/// one of the configured addresses, the named registers and memory
/// words are printed.
///
/// ```yaml
/// 0x0008:
///   regs: [0, 1]
///   address: [0x100, 0x104]
/// ```
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Dump {
    #[serde(flatten)]
    points: HashMap<String, Point>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Point {
    #[serde(default)]
    regs: BTreeSet<u8>,
    #[serde(default)]
    address: BTreeSet<u64>,
}

impl Dump {
    pub fn from_file(path: &str) -> Result<Self, String> {
        let file = File::open(path).map_err(|e| format!("{path}: {e}"))?;
        serde_yaml::from_reader(BufReader::new(file)).map_err(|e| format!("{path}: {e}"))
    }

    fn point_at(&self, pc: u64) -> Option<&Point> {
        self.points.iter().find_map(|(key, point)| {
            let addr = if let Some(hex) = key.strip_prefix("0x") {
                u64::from_str_radix(hex, 16).ok()
            } else {
                key.parse::<u64>().ok()
            };
            (addr == Some(pc)).then_some(point)
        })
    }
}

impl Hook for Dump {
    fn exec(&mut self, pc: u64, _word: u32, session: &Session) {
        let Some(point) = self.point_at(pc) else {
            return;
        };
        println!("Dump at {pc:#06x}:");
        for &reg in &point.regs {
            println!("  - x{}: {:#018x}", reg, session.reg(reg));
        }
        for &addr in &point.address {
            println!("  - {:#06x}: {:#010x}", addr, session.load(addr, 4));
        }
    }
}

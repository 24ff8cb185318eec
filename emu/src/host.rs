use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Instant;

/// Everything the VM needs from the outside world. Extended service
/// calls go through this trait, so tests can swap in a scripted host.
pub trait Host {
    fn write_byte(&mut self, byte: u8);
    fn write_str(&mut self, s: &str) {
        for b in s.bytes() {
            self.write_byte(b);
        }
    }
    /// Blocks until one byte of input is available.
    fn read_byte(&mut self) -> u8;
    fn sleep_ms(&mut self, ms: u64);
    /// Milliseconds since the host was created.
    fn now_ms(&mut self) -> u64;

    fn file_create(&mut self, name: &str) -> bool;
    fn file_write(&mut self, name: &str, data: &[u8]) -> bool;
    fn file_read(&mut self, name: &str, buf: &mut [u8]) -> usize;
    fn file_delete(&mut self, name: &str) -> bool;
    fn file_copy(&mut self, src: &str, dst: &str) -> bool;
    fn file_move(&mut self, src: &str, dst: &str) -> bool;
    fn file_exists(&mut self, name: &str) -> bool;
}

/// Real host: stdin/stdout and the local filesystem.
pub struct StdHost {
    start: Instant,
}

impl StdHost {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for StdHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for StdHost {
    fn write_byte(&mut self, byte: u8) {
        let mut out = std::io::stdout();
        let _ = out.write_all(&[byte]);
        let _ = out.flush();
    }

    fn write_str(&mut self, s: &str) {
        let mut out = std::io::stdout();
        let _ = out.write_all(s.as_bytes());
        let _ = out.flush();
    }

    fn read_byte(&mut self) -> u8 {
        let mut buf = [0u8; 1];
        match std::io::stdin().read_exact(&mut buf) {
            Ok(()) => buf[0],
            Err(_) => b'\n',
        }
    }

    fn sleep_ms(&mut self, ms: u64) {
        std::thread::sleep(std::time::Duration::from_millis(ms));
    }

    fn now_ms(&mut self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn file_create(&mut self, name: &str) -> bool {
        if Path::new(name).exists() {
            return false;
        }
        fs::File::create(name).is_ok()
    }

    fn file_write(&mut self, name: &str, data: &[u8]) -> bool {
        fs::write(name, data).is_ok()
    }

    fn file_read(&mut self, name: &str, buf: &mut [u8]) -> usize {
        match fs::read(name) {
            Ok(data) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                n
            }
            Err(_) => 0,
        }
    }

    fn file_delete(&mut self, name: &str) -> bool {
        fs::remove_file(name).is_ok()
    }

    fn file_copy(&mut self, src: &str, dst: &str) -> bool {
        fs::copy(src, dst).is_ok()
    }

    fn file_move(&mut self, src: &str, dst: &str) -> bool {
        fs::rename(src, dst).is_ok()
    }

    fn file_exists(&mut self, name: &str) -> bool {
        Path::new(name).exists()
    }
}

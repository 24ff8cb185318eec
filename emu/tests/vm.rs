//! End-to-end tests: assemble a source program with casm and run it on
//! a scripted host.

use std::collections::{HashMap, VecDeque};

use cvm::dispatch::{self, Exit};
use cvm::host::Host;
use cvm::session::{RunError, RunStats, Session, STEP_LIMIT};

// ----------------------------------------------------------------------------

#[derive(Default)]
struct MockHost {
    out: Vec<u8>,
    input: VecDeque<u8>,
    files: HashMap<String, Vec<u8>>,
    now: u64,
    slept: u64,
}

impl MockHost {
    fn new() -> Self {
        Self::default()
    }

    fn with_input(input: &str) -> Self {
        Self {
            input: input.bytes().collect(),
            ..Self::default()
        }
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.out).into_owned()
    }
}

impl Host for MockHost {
    fn write_byte(&mut self, byte: u8) {
        self.out.push(byte);
    }

    fn read_byte(&mut self) -> u8 {
        self.input.pop_front().unwrap_or(b'\n')
    }

    fn sleep_ms(&mut self, ms: u64) {
        self.slept += ms;
    }

    fn now_ms(&mut self) -> u64 {
        self.now
    }

    fn file_create(&mut self, name: &str) -> bool {
        if self.files.contains_key(name) {
            return false;
        }
        self.files.insert(name.to_string(), Vec::new());
        true
    }

    fn file_write(&mut self, name: &str, data: &[u8]) -> bool {
        self.files.insert(name.to_string(), data.to_vec());
        true
    }

    fn file_read(&mut self, name: &str, buf: &mut [u8]) -> usize {
        match self.files.get(name) {
            Some(data) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                n
            }
            None => 0,
        }
    }

    fn file_delete(&mut self, name: &str) -> bool {
        self.files.remove(name).is_some()
    }

    fn file_copy(&mut self, src: &str, dst: &str) -> bool {
        match self.files.get(src).cloned() {
            Some(data) => {
                self.files.insert(dst.to_string(), data);
                true
            }
            None => false,
        }
    }

    fn file_move(&mut self, src: &str, dst: &str) -> bool {
        match self.files.remove(src) {
            Some(data) => {
                self.files.insert(dst.to_string(), data);
                true
            }
            None => false,
        }
    }

    fn file_exists(&mut self, name: &str) -> bool {
        self.files.contains_key(name)
    }
}

// ----------------------------------------------------------------------------

fn run_with(src: &str, mut host: MockHost) -> (Session, MockHost, RunStats) {
    let image = casm::assemble(src).expect("assembly failed");
    let mut session = Session::new(&image).expect("image too large");
    let stats = session.run(&mut host, &mut []).expect("run failed");
    (session, host, stats)
}

fn run(src: &str) -> (Session, MockHost, RunStats) {
    run_with(src, MockHost::new())
}

fn run_err(src: &str) -> RunError {
    let image = casm::assemble(src).expect("assembly failed");
    let mut session = Session::new(&image).expect("image too large");
    let mut host = MockHost::new();
    session.run(&mut host, &mut []).expect_err("run succeeded")
}

// ----------------------------------------------------------------------------

#[test]
fn prints_one_character() {
    let (_, host, stats) = run("mov x0, #72\nprtc\nhalt\n");
    assert_eq!(host.text(), "H");
    // halt does not count as retired
    assert_eq!(stats.retired, 2);
}

#[test]
fn adds_and_prints_decimal() {
    let src = "\
        mov x1, #5\n\
        mov x2, #3\n\
        add x0, x1, x2\n\
        prtn\n\
        halt\n";
    let (_, host, _) = run(src);
    assert_eq!(host.text(), "8");
}

#[test]
fn prints_negative_decimal() {
    let (_, host, _) = run("mov x0, #-42\nprtn\nhalt\n");
    assert_eq!(host.text(), "-42");
}

#[test]
fn subs_sets_flags() {
    let (s, _, _) = run("mov x1, #5\nmov x2, #5\nsubs x0, x1, x2\nhalt\n");
    assert!(s.z);
    assert!(!s.n);
    assert!(s.c);
    assert!(!s.v);

    let (s, _, _) = run("mov x1, #0\nsubs x0, x1, #1\nhalt\n");
    assert!(!s.z);
    assert!(s.n);
    assert!(!s.c); // borrow
    assert_eq!(s.reg(0), u64::MAX);
}

#[test]
fn conditional_branch_takes_the_equal_path() {
    let src = "\
        mov x1, #7\n\
        cmp x1, #7\n\
        b.eq yes\n\
        mov x0, #78\n\
        prtc\n\
        halt\n\
        yes:\n\
        mov x0, #89\n\
        prtc\n\
        halt\n";
    let (_, host, _) = run(src);
    assert_eq!(host.text(), "Y");
}

#[test]
fn countdown_loop_with_cbnz() {
    let src = "\
        mov x1, #3\n\
        loop:\n\
        mov x0, #42\n\
        prtc\n\
        sub x1, x1, #1\n\
        cbnz x1, loop\n\
        halt\n";
    let (_, host, _) = run(src);
    assert_eq!(host.text(), "***");
}

#[test]
fn store_then_load_round_trips_through_memory() {
    let src = "\
        mov x0, #1234\n\
        mov x1, #4096\n\
        str x0, [x1]\n\
        mov x0, #0\n\
        ldr x0, [x1]\n\
        prtn\n\
        halt\n";
    let (_, host, _) = run(src);
    assert_eq!(host.text(), "1234");
}

#[test]
fn pair_store_and_load() {
    let src = "\
        mov x1, #100\n\
        mov x2, #200\n\
        mov x3, #4096\n\
        stp x1, x2, [x3]\n\
        ldp x4, x5, [x3]\n\
        add x0, x4, x5\n\
        prtn\n\
        halt\n";
    let (_, host, _) = run(src);
    assert_eq!(host.text(), "300");
}

#[test]
fn pre_index_writes_back_the_base() {
    let src = "\
        mov x0, #7\n\
        mov x1, #4104\n\
        str x0, [x1, #-8]!\n\
        halt\n";
    let (s, _, _) = run(src);
    assert_eq!(s.reg(1), 4096);
    assert_eq!(s.load(4096, 8), 7);
}

#[test]
fn subroutine_call_and_indirect_return_address() {
    // ret ends the run; the bl still records the return address
    let src = "\
        mov x0, #65\n\
        prtc\n\
        bl done\n\
        done:\n\
        ret\n";
    let (s, host, stats) = run(src);
    assert_eq!(host.text(), "A");
    assert_eq!(s.reg(30), 12);
    assert_eq!(stats.retired, 4);
}

#[test]
fn running_off_the_image_ends_the_run() {
    let (s, _, stats) = run("mov x0, #65\n");
    assert_eq!(stats.retired, 1);
    assert_eq!(s.pc, 4);
}

#[test]
fn branch_to_the_top_of_the_address_space_ends_the_run() {
    let (s, _, stats) = run("mov x0, #-1\nbr x0\nhalt\n");
    assert_eq!(stats.retired, 2);
    assert_eq!(s.pc, u64::MAX);
}

#[test]
fn w_registers_wrap_at_32_bits() {
    let (s, host, _) = run("mov w0, #0\nsub w0, w0, #1\nprtx\nhalt\n");
    assert_eq!(s.reg(0), 0xFFFF_FFFF);
    assert_eq!(host.text(), "0xffffffff");
}

#[test]
fn division_by_zero_yields_zero() {
    let (s, _, _) = run("mov x0, #9\nmov x1, #0\nudiv x2, x0, x1\nsdiv x3, x0, x1\nhalt\n");
    assert_eq!(s.reg(2), 0);
    assert_eq!(s.reg(3), 0);
}

#[test]
fn shifts_take_the_amount_modulo_width() {
    let src = "\
        mov x0, #1\n\
        mov x1, #65\n\
        lsl x2, x0, x1\n\
        mov w3, #1\n\
        mov w4, #33\n\
        lsl w5, w3, w4\n\
        halt\n";
    let (s, _, _) = run(src);
    assert_eq!(s.reg(2), 2);
    assert_eq!(s.reg(5), 2);
}

#[test]
fn string_length_of_embedded_data() {
    let src = "\
        b start\n\
        msg:\n\
        .asciz \"hello\"\n\
        .align 2\n\
        start:\n\
        mov x0, #4\n\
        strlen\n\
        prtn\n\
        halt\n";
    let (_, host, _) = run(src);
    assert_eq!(host.text(), "5");
}

#[test]
fn memset_and_memcpy() {
    let src = "\
        mov x0, #4096\n\
        mov x1, #65\n\
        mov x2, #3\n\
        memset\n\
        mov x0, #4200\n\
        mov x1, #4096\n\
        mov x2, #3\n\
        memcpy\n\
        mov x0, #4200\n\
        prt\n\
        halt\n";
    let (s, host, _) = run(src);
    assert_eq!(host.text(), "AAA");
    assert_eq!(s.load(4202, 1), 65);
    // byte after the copy untouched
    assert_eq!(s.load(4203, 1), 0);
}

#[test]
fn block_fill_stops_at_the_end_of_memory() {
    let src = "\
        mov x0, #5000\n\
        mov x1, #7\n\
        mov x2, #-1\n\
        memset\n\
        halt\n";
    let (s, _, _) = run(src);
    assert_eq!(s.load(5119, 1), 7);
    assert_eq!(s.load(4999, 1), 0);
}

#[test]
fn block_copy_stops_at_the_end_of_memory() {
    let src = "\
        mov x0, #4096\n\
        mov x1, #66\n\
        mov x2, #1\n\
        memset\n\
        mov x0, #5119\n\
        mov x1, #4096\n\
        mov x2, #-1\n\
        memcpy\n\
        halt\n";
    let (s, _, _) = run(src);
    assert_eq!(s.load(5119, 1), 66);
}

#[test]
fn absolute_value() {
    let (s, _, _) = run("mov x0, #-9\nabs\nhalt\n");
    assert_eq!(s.reg(0), 9);
}

#[test]
fn blocking_input_returns_one_byte() {
    let (_, host, _) = run_with("inp\nprtc\nhalt\n", MockHost::with_input("A"));
    assert_eq!(host.text(), "A");
}

#[test]
fn line_input_echoes_and_applies_backspace() {
    let src = "mov x0, #4096\nmov x1, #10\ninps\nprtn\nhalt\n";
    let (s, host, _) = run_with(src, MockHost::with_input("ab\x7fc\n"));
    // echo: a, b, rub-out, c, newline; then the final length
    assert_eq!(host.text(), "ab\x08 \x08c\n2");
    assert_eq!(s.load(4096, 1), b'a' as u64);
    assert_eq!(s.load(4097, 1), b'c' as u64);
    assert_eq!(s.load(4098, 1), 0);
    assert_eq!(s.reg(0), 2);
}

#[test]
fn line_input_respects_the_limit() {
    let src = "mov x0, #4096\nmov x1, #3\ninps\nhalt\n";
    let (s, _, _) = run_with(src, MockHost::with_input("abcdef\n"));
    assert_eq!(s.reg(0), 2);
    assert_eq!(s.load(4098, 1), 0);
}

#[test]
fn random_is_deterministic_and_bounded() {
    let (a, _, _) = run("mov x0, #10\nrnd\nhalt\n");
    let (b, _, _) = run("mov x0, #10\nrnd\nhalt\n");
    assert_eq!(a.reg(0), b.reg(0));
    assert!(a.reg(0) < 10);
}

#[test]
fn random_with_zero_bound_does_not_divide_by_zero() {
    let (s, _, _) = run("mov x0, #0\nrnd\nhalt\n");
    assert_eq!(s.reg(0), 0);
}

#[test]
fn tick_and_sleep_go_through_the_host() {
    let mut host = MockHost::new();
    host.now = 42;
    let (s, host, _) = run_with("tick\nmov x1, x0\nmov x0, #25\nsleep\nhalt\n", host);
    assert_eq!(s.reg(1), 42);
    assert_eq!(host.slept, 25);
}

#[test]
fn file_calls_round_trip_through_the_host() {
    let src = "\
        b start\n\
        name:\n\
        .asciz \"t.txt\"\n\
        .align 2\n\
        start:\n\
        mov x0, #4\n\
        fexist\n\
        mov x9, x0\n\
        mov x0, #4\n\
        fcreat\n\
        mov x10, x0\n\
        mov x0, #4\n\
        fexist\n\
        mov x11, x0\n\
        mov x0, #4\n\
        fdel\n\
        mov x12, x0\n\
        halt\n";
    let (s, _, _) = run(src);
    assert_eq!(s.reg(9), 0); // did not exist
    assert_eq!(s.reg(10), 1); // created
    assert_eq!(s.reg(11), 1); // now exists
    assert_eq!(s.reg(12), 1); // deleted
}

#[test]
fn file_write_and_read_move_bytes() {
    let src = "\
        b start\n\
        name:\n\
        .asciz \"d.bin\"\n\
        .align 2\n\
        start:\n\
        mov x0, #4096\n\
        mov x1, #72\n\
        mov x2, #2\n\
        memset\n\
        mov x0, #4\n\
        mov x1, #4096\n\
        mov x2, #2\n\
        fwrite\n\
        mov x9, x0\n\
        mov x0, #4\n\
        mov x1, #4200\n\
        mov x2, #16\n\
        fread\n\
        halt\n";
    let (s, host, _) = run(src);
    assert_eq!(s.reg(9), 2); // bytes written
    assert_eq!(s.reg(0), 2); // bytes read back
    assert_eq!(s.load(4200, 1), 72);
    assert_eq!(host.files.get("d.bin").map(Vec::len), Some(2));
}

#[test]
fn canvas_renders_once_at_end_of_run() {
    let src = "\
        mov x0, #5\n\
        mov x1, #2\n\
        canvas\n\
        mov x0, #1\n\
        mov x1, #0\n\
        mov x2, #88\n\
        plot\n\
        halt\n";
    let (_, host, _) = run(src);
    let text = host.text();
    assert!(text.contains('X'));
    // two rows, each ending with a color reset
    assert_eq!(text.matches("\x1b[0m\n").count(), 2);
}

#[test]
fn console_output_is_buffered_until_newline() {
    // without a newline or halt nothing reaches the host mid-run;
    // the flush happens when the run finishes
    let (_, host, _) = run("mov x0, #10\nprtc\nmov x0, #33\nprtc\nhalt\n");
    assert_eq!(host.text(), "\n!");
}

#[test]
fn unknown_service_call_is_fatal() {
    match run_err("svc #0x200\nhalt\n") {
        RunError::UnknownSvc { pc, imm } => {
            assert_eq!(pc, 0);
            assert_eq!(imm, 0x200);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn undecodable_word_is_fatal() {
    let mut session = Session::new(&[0xFF, 0xFF, 0xFF, 0xFF]).unwrap();
    let mut host = MockHost::new();
    match session.run(&mut host, &mut []) {
        Err(RunError::UnknownInsn { pc: 0, word: 0xFFFF_FFFF }) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn infinite_loop_hits_the_step_limit() {
    let err = run_err("loop:\nb loop\n");
    assert_eq!(err, RunError::StepLimit);
    let _ = STEP_LIMIT;
}

#[test]
fn trap_entry_dispatches_a_service_word() {
    let prtc = casm::assemble("prtc\n").unwrap();
    let halt = casm::assemble("halt\n").unwrap();
    let word = |b: &[u8]| u32::from_le_bytes([b[0], b[1], b[2], b[3]]);

    let mut session = Session::new(&[]).unwrap();
    let mut host = MockHost::new();
    session.set_reg(0, 66);
    let exit = dispatch::trap(&mut session, &mut host, word(&prtc)).unwrap();
    assert_eq!(exit, Exit::Continue);
    let exit = dispatch::trap(&mut session, &mut host, word(&halt)).unwrap();
    assert_eq!(exit, Exit::Halt);
    assert_eq!(host.text(), "B");
}

#[test]
fn trap_entry_rejects_non_service_words() {
    let mut session = Session::new(&[]).unwrap();
    let mut host = MockHost::new();
    // mov x0, #72 is a valid instruction but not a service call
    match dispatch::trap(&mut session, &mut host, 0xD2800900) {
        Err(RunError::UnknownInsn { word: 0xD2800900, .. }) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}

//! Shared helpers for driving the VM with captured output.

#![allow(dead_code)]

use std::{
    cell::RefCell,
    io::{self, Write},
    rc::Rc,
};

use loxvm::{InterpretResult, VM};

/// A `Write` sink whose contents stay readable after the VM takes ownership of a clone.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct Session {
    pub vm: VM,
    pub out: SharedBuffer,
    pub err: SharedBuffer,
}

impl Session {
    pub fn new() -> Self {
        let out = SharedBuffer::default();
        let err = SharedBuffer::default();
        Session { vm: VM::with_output(out.clone(), err.clone()), out, err }
    }

    /// Interprets `source` and returns the result with whatever it printed.
    pub fn run(&mut self, source: &str) -> Outcome {
        self.out.clear();
        self.err.clear();
        let result = self.vm.interpret(source);
        Outcome { result, stdout: self.out.contents(), stderr: self.err.contents() }
    }
}

#[derive(Debug)]
pub struct Outcome {
    pub result: InterpretResult,
    pub stdout: String,
    pub stderr: String,
}

impl Outcome {
    pub fn lines(&self) -> Vec<&str> {
        self.stdout.lines().collect()
    }
}

pub fn run(source: &str) -> Outcome {
    Session::new().run(source)
}

/// Runs `source` and asserts it succeeds, returning its printed lines.
pub fn run_ok(source: &str) -> Vec<String> {
    let outcome = run(source);
    assert_eq!(
        outcome.result,
        InterpretResult::InterpretOk,
        "script failed:\n{}\nstderr:\n{}",
        source,
        outcome.stderr
    );
    outcome.stdout.lines().map(str::to_string).collect()
}

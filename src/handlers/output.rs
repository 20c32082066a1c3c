//! Output capability: program-visible printed output

use crate::errors::RuntimeError;
use std::cell::RefCell;
use std::rc::Rc;

pub trait OutputApi {
    fn is_available(&self) -> bool;
    fn print(&self, text: &str) -> Result<(), RuntimeError>;
}

/* ===================== Default (stdout) ===================== */

pub struct DefaultOutputApi;

impl OutputApi for DefaultOutputApi {
    fn is_available(&self) -> bool {
        true
    }
    fn print(&self, text: &str) -> Result<(), RuntimeError> {
        println!("{}", text);
        Ok(())
    }
}

/* ===================== Deny ===================== */

pub struct DenyOutputApi;

impl OutputApi for DenyOutputApi {
    fn is_available(&self) -> bool {
        false
    }
    fn print(&self, _text: &str) -> Result<(), RuntimeError> {
        Err(RuntimeError::NotAllowed { line: 0 })
    }
}

/* ===================== Capture / Test ===================== */

/// Captures printed lines instead of writing them anywhere. `handle()`
/// returns a shared view that stays readable after the API is boxed into a
/// handler set.
pub struct CaptureOutputApi {
    lines: Rc<RefCell<Vec<String>>>,
}

impl CaptureOutputApi {
    pub fn new() -> Self {
        Self {
            lines: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn handle(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.lines)
    }
}

impl Default for CaptureOutputApi {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputApi for CaptureOutputApi {
    fn is_available(&self) -> bool {
        true
    }
    fn print(&self, text: &str) -> Result<(), RuntimeError> {
        self.lines.borrow_mut().push(text.to_string());
        Ok(())
    }
}

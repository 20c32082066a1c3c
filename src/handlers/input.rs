//! Input capability: interactive line input

use crate::errors::RuntimeError;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::BufRead;

pub trait InputApi {
    fn is_available(&self) -> bool;
    fn read_line(&self, prompt: &str) -> Result<String, RuntimeError>;
}

/* ===================== Default (stdin) ===================== */

pub struct DefaultInputApi;

impl InputApi for DefaultInputApi {
    fn is_available(&self) -> bool {
        true
    }

    fn read_line(&self, prompt: &str) -> Result<String, RuntimeError> {
        if !prompt.is_empty() {
            print!("{}", prompt);
            use std::io::Write;
            std::io::stdout()
                .flush()
                .map_err(|e| RuntimeError::unsupported(format!("input failed: {}", e), 0))?;
        }
        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| RuntimeError::unsupported(format!("input failed: {}", e), 0))?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/* ===================== Deny ===================== */

pub struct DenyInputApi;

impl InputApi for DenyInputApi {
    fn is_available(&self) -> bool {
        false
    }
    fn read_line(&self, _prompt: &str) -> Result<String, RuntimeError> {
        Err(RuntimeError::NotAllowed { line: 0 })
    }
}

/* ===================== Null / Test ===================== */

/// Serves queued responses; an exhausted queue yields empty strings.
#[derive(Default)]
pub struct NullInputApi {
    responses: RefCell<VecDeque<String>>,
}

impl NullInputApi {
    pub fn with_responses(responses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            responses: RefCell::new(responses.into_iter().map(Into::into).collect()),
        }
    }
}

impl InputApi for NullInputApi {
    fn is_available(&self) -> bool {
        true
    }
    fn read_line(&self, _prompt: &str) -> Result<String, RuntimeError> {
        Ok(self.responses.borrow_mut().pop_front().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_serves_queued_then_empty() {
        let api = NullInputApi::with_responses(["yes", "42"]);
        assert_eq!(api.read_line("? ").unwrap(), "yes");
        assert_eq!(api.read_line("? ").unwrap(), "42");
        assert_eq!(api.read_line("? ").unwrap(), "");
    }

    #[test]
    fn test_deny_not_allowed() {
        assert!(matches!(
            DenyInputApi.read_line(""),
            Err(RuntimeError::NotAllowed { .. })
        ));
    }
}

//! IO capability: plain file access outside the typed resource store

use crate::errors::RuntimeError;
use std::path::Path;

pub trait IoApi {
    fn is_available(&self) -> bool;
    fn read_text(&self, path: &str) -> Result<String, RuntimeError>;
    fn write_text(&self, path: &str, text: &str) -> Result<(), RuntimeError>;
    fn exists(&self, path: &str) -> Result<bool, RuntimeError>;
    fn list_dir(&self, path: &str) -> Result<Vec<String>, RuntimeError>;
}

/* ===================== Default (filesystem) ===================== */

pub struct DefaultIoApi;

impl IoApi for DefaultIoApi {
    fn is_available(&self) -> bool {
        true
    }

    fn read_text(&self, path: &str) -> Result<String, RuntimeError> {
        std::fs::read_to_string(path)
            .map_err(|e| RuntimeError::unsupported(format!("read '{}' failed: {}", path, e), 0))
    }

    fn write_text(&self, path: &str, text: &str) -> Result<(), RuntimeError> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RuntimeError::unsupported(format!("write '{}' failed: {}", path, e), 0)
            })?;
        }
        std::fs::write(path, text)
            .map_err(|e| RuntimeError::unsupported(format!("write '{}' failed: {}", path, e), 0))
    }

    fn exists(&self, path: &str) -> Result<bool, RuntimeError> {
        Ok(Path::new(path).exists())
    }

    fn list_dir(&self, path: &str) -> Result<Vec<String>, RuntimeError> {
        let entries = std::fs::read_dir(path)
            .map_err(|e| RuntimeError::unsupported(format!("list '{}' failed: {}", path, e), 0))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                RuntimeError::unsupported(format!("list '{}' failed: {}", path, e), 0)
            })?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}

/* ===================== Deny ===================== */

pub struct DenyIoApi;

impl IoApi for DenyIoApi {
    fn is_available(&self) -> bool {
        false
    }
    fn read_text(&self, _path: &str) -> Result<String, RuntimeError> {
        Err(RuntimeError::NotAllowed { line: 0 })
    }
    fn write_text(&self, _path: &str, _text: &str) -> Result<(), RuntimeError> {
        Err(RuntimeError::NotAllowed { line: 0 })
    }
    fn exists(&self, _path: &str) -> Result<bool, RuntimeError> {
        Err(RuntimeError::NotAllowed { line: 0 })
    }
    fn list_dir(&self, _path: &str) -> Result<Vec<String>, RuntimeError> {
        Err(RuntimeError::NotAllowed { line: 0 })
    }
}

/* ===================== Null / Test ===================== */

pub struct NullIoApi;

impl IoApi for NullIoApi {
    fn is_available(&self) -> bool {
        true
    }
    fn read_text(&self, _path: &str) -> Result<String, RuntimeError> {
        Ok(String::new())
    }
    fn write_text(&self, _path: &str, _text: &str) -> Result<(), RuntimeError> {
        Ok(())
    }
    fn exists(&self, _path: &str) -> Result<bool, RuntimeError> {
        Ok(false)
    }
    fn list_dir(&self, _path: &str) -> Result<Vec<String>, RuntimeError> {
        Ok(vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        let path = path.to_string_lossy().into_owned();

        let api = DefaultIoApi;
        assert!(!api.exists(&path).unwrap());
        api.write_text(&path, "hello").unwrap();
        assert!(api.exists(&path).unwrap());
        assert_eq!(api.read_text(&path).unwrap(), "hello");
    }

    #[test]
    fn test_deny_fails_every_operation() {
        let api = DenyIoApi;
        assert!(matches!(
            api.read_text("x"),
            Err(RuntimeError::NotAllowed { .. })
        ));
        assert!(matches!(
            api.exists("x"),
            Err(RuntimeError::NotAllowed { .. })
        ));
    }

    #[test]
    fn test_null_canned_results() {
        let api = NullIoApi;
        assert_eq!(api.read_text("anything").unwrap(), "");
        assert!(api.write_text("anything", "ignored").is_ok());
        assert!(!api.exists("anything").unwrap());
    }
}

use crate::base::neterror::NetError;
use dashmap::DashMap;
use std::ffi::{c_char, CString};
use tracing::trace;

/// Owner of every payload handed across the boundary.
///
/// A payload stays alive, at a fixed address, until its id is released.
/// Ids are fresh UUIDs, so a live id is never reused.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    entries: DashMap<String, CString>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retain `payload` under `id` and return a pointer to its NUL-terminated bytes.
    pub fn insert(&self, id: &str, payload: String) -> Result<*const c_char, NetError> {
        let payload = CString::new(payload)
            .map_err(|e| NetError::Internal(format!("payload contains NUL: {}", e)))?;
        // The heap buffer does not move when the CString moves into the map.
        let ptr = payload.as_ptr();
        self.entries.insert(id.to_string(), payload);
        trace!(id, "handle retained");
        Ok(ptr)
    }

    pub fn ptr(&self, id: &str) -> Option<*const c_char> {
        self.entries.get(id).map(|p| p.as_ptr())
    }

    /// The retained payload as text.
    pub fn payload(&self, id: &str) -> Option<String> {
        self.entries
            .get(id)
            .map(|p| p.to_string_lossy().into_owned())
    }

    /// Drop the payload under `id`. Unknown or already released ids fail
    /// with `HandleNotFound` and leave the registry untouched.
    pub fn release(&self, id: &str) -> Result<(), NetError> {
        match self.entries.remove(id) {
            Some(_) => {
                trace!(id, "handle released");
                Ok(())
            }
            None => Err(NetError::HandleNotFound(id.to_string())),
        }
    }

    pub fn release_all(&self) {
        self.entries.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;
    use std::sync::Arc;

    #[test]
    fn test_pointer_stays_valid_until_release() {
        let registry = HandleRegistry::new();
        let ptr = registry.insert("a", r#"{"id":"a"}"#.to_string()).unwrap();
        for i in 0..100 {
            registry.insert(&format!("filler-{}", i), "x".into()).unwrap();
        }
        let text = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap();
        assert_eq!(text, r#"{"id":"a"}"#);
        assert_eq!(registry.ptr("a"), Some(ptr));
    }

    #[test]
    fn test_double_release() {
        let registry = HandleRegistry::new();
        registry.insert("a", "{}".into()).unwrap();
        assert!(registry.release("a").is_ok());
        assert_eq!(registry.release("a"), Err(NetError::HandleNotFound("a".into())));
        assert!(!registry.contains("a"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_interior_nul_rejected() {
        let registry = HandleRegistry::new();
        assert!(matches!(
            registry.insert("a", "a\0b".into()),
            Err(NetError::Internal(_))
        ));
        assert!(!registry.contains("a"));
    }

    #[test]
    fn test_concurrent_insert_release() {
        let registry = Arc::new(HandleRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let id = format!("{}-{}", t, i);
                        registry.insert(&id, id.clone()).unwrap();
                        if i % 2 == 0 {
                            registry.release(&id).unwrap();
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(registry.len(), 8 * 25);
        registry.release_all();
        assert!(registry.is_empty());
    }
}

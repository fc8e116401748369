//! In-memory state store.

use crate::StateStore;
use dualstream_core::{state::MonitorState, Result};

/// Keeps the last saved state in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Option<MonitorState>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from previously persisted state
    pub fn with_state(state: MonitorState) -> Self {
        Self {
            state: Some(state),
            saves: 0,
        }
    }

    /// Number of `save` calls
    pub fn saves(&self) -> usize {
        self.saves
    }

    pub fn state(&self) -> Option<&MonitorState> {
        self.state.as_ref()
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<MonitorState>> {
        Ok(self.state.clone())
    }

    fn save(&mut self, state: &MonitorState) -> Result<()> {
        self.state = Some(state.clone());
        self.saves += 1;
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());

        let mut state = MonitorState::new();
        state.advance_batch();
        store.save(&state).unwrap();

        assert_eq!(store.load().unwrap(), Some(state));
        assert_eq!(store.saves(), 1);
    }
}

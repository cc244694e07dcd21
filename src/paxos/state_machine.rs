use crate::paxos::value::{Command, Value};
use std::collections::HashMap;
use std::sync::Mutex;

/// KvStateMachine is the replica's key-value map. It is only mutated by applying values the
/// cluster agreed on, and it is the only thing reads look at.
pub(crate) struct KvStateMachine {
    map: Mutex<HashMap<String, String>>,
}

impl KvStateMachine {
    pub(crate) fn new() -> Self {
        KvStateMachine {
            map: Mutex::new(HashMap::new()),
        }
    }

    /// Apply an agreed value. Applications are serialized against each other.
    pub(crate) fn execute_value(&self, value: &Value) {
        let mut map = self.map.lock().expect("KvStateMachine mutex guard poison");
        match (value.command(), value.key()) {
            (Command::Put, Some(key)) => {
                let new_value = value.new_value().unwrap_or_default();
                map.insert(key.to_string(), new_value.to_string());
            }
            (Command::Delete, Some(key)) => {
                map.remove(key);
            }
            (Command::Put, None) | (Command::Delete, None) | (Command::NoOp, _) => {
                // Nothing to apply.
            }
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<String> {
        self.map
            .lock()
            .expect("KvStateMachine mutex guard poison")
            .get(key)
            .cloned()
    }
}

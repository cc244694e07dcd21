/// Command is the kind of mutation a `Value` asks the cluster to apply.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Command {
    Put,
    Delete,
    NoOp,
}

/// Value is a proposed client command.
///
/// Equality is by content (command, key, new value), not by identity: two separately enqueued
/// proposals with the same content are interchangeable. This is what lets the learner recognise
/// "the proposal I'm waiting on" when consensus is reported for a value that arrived over the wire.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Value {
    command: Command,
    key: Option<String>,
    new_value: Option<String>,
}

impl Value {
    pub(crate) fn put(key: String, new_value: String) -> Self {
        Value {
            command: Command::Put,
            key: Some(key),
            new_value: Some(new_value),
        }
    }

    pub(crate) fn delete(key: String) -> Self {
        Value {
            command: Command::Delete,
            key: Some(key),
            new_value: None,
        }
    }

    pub(crate) fn no_op() -> Self {
        Value {
            command: Command::NoOp,
            key: None,
            new_value: None,
        }
    }

    /// Reassemble a value received from a peer. No validation: a PUT without a key is carried
    /// around like any other value, and applying it is a no-op.
    pub(crate) fn from_parts(command: Command, key: Option<String>, new_value: Option<String>) -> Self {
        Value {
            command,
            key,
            new_value,
        }
    }

    pub(crate) fn command(&self) -> Command {
        self.command
    }

    pub(crate) fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub(crate) fn new_value(&self) -> Option<&str> {
        self.new_value.as_deref()
    }
}

//! Proto <-> domain conversions shared by the gRPC service and the gRPC peer client.
//!
//! Decoding is strict: a missing required message field is an error, and the caller decides what
//! that means on its side of the wire.

use crate::grpc::{
    proto_granted_message, ProtoAcceptedProposal, ProtoCommand, ProtoGranted, ProtoGrantedMessage, ProtoNack,
    ProtoStateNack, ProtoSuggestionId, ProtoText, ProtoValue,
};
use crate::paxos::{AcceptedProposal, Command, GrantedMessage, ReplicaId, StateId, SuggestionId, Value};

pub(super) type DecodeError = String;

// ------- SuggestionId --------

pub(super) fn encode_suggestion_id(suggestion_id: SuggestionId) -> ProtoSuggestionId {
    ProtoSuggestionId {
        round: suggestion_id.round(),
        proposer_id: suggestion_id.proposer_id().as_str().to_string(),
    }
}

pub(super) fn decode_suggestion_id(
    field: &'static str,
    proto: Option<ProtoSuggestionId>,
) -> Result<SuggestionId, DecodeError> {
    let proto = proto.ok_or_else(|| format!("Missing {}", field))?;
    Ok(SuggestionId::new(proto.round, ReplicaId::new(proto.proposer_id)))
}

// ------- Value --------

pub(super) fn encode_value(value: Value) -> ProtoValue {
    let command = match value.command() {
        Command::Put => ProtoCommand::Put,
        Command::Delete => ProtoCommand::Delete,
        Command::NoOp => ProtoCommand::NoOp,
    };

    ProtoValue {
        command: command as i32,
        key: value.key().map(encode_text),
        new_value: value.new_value().map(encode_text),
    }
}

pub(super) fn decode_value(proto: Option<ProtoValue>) -> Result<Value, DecodeError> {
    let proto = proto.ok_or_else(|| "Missing value".to_string())?;
    let command = match ProtoCommand::from_i32(proto.command) {
        Some(ProtoCommand::Put) => Command::Put,
        Some(ProtoCommand::Delete) => Command::Delete,
        Some(ProtoCommand::NoOp) => Command::NoOp,
        None => return Err(format!("Unknown command {}", proto.command)),
    };

    Ok(Value::from_parts(
        command,
        proto.key.map(|text| text.text),
        proto.new_value.map(|text| text.text),
    ))
}

fn encode_text(text: &str) -> ProtoText {
    ProtoText { text: text.to_string() }
}

// ------- GrantedMessage --------

pub(super) fn encode_granted_message(message: GrantedMessage) -> ProtoGrantedMessage {
    let permission = match message {
        GrantedMessage::Granted { last_accepted } => proto_granted_message::Permission::Granted(ProtoGranted {
            last_accepted: last_accepted.map(|accepted| ProtoAcceptedProposal {
                id: Some(encode_suggestion_id(accepted.id)),
                value: Some(encode_value(accepted.value)),
            }),
        }),
        GrantedMessage::Nack { promised_id } => proto_granted_message::Permission::Nack(ProtoNack {
            promised_id: Some(encode_suggestion_id(promised_id)),
        }),
        GrantedMessage::StateNack => proto_granted_message::Permission::StateNack(ProtoStateNack {
            // Empty
        }),
    };

    ProtoGrantedMessage {
        permission: Some(permission),
    }
}

pub(super) fn decode_granted_message(proto: ProtoGrantedMessage) -> Result<GrantedMessage, DecodeError> {
    match proto.permission {
        Some(proto_granted_message::Permission::Granted(granted)) => {
            let last_accepted = match granted.last_accepted {
                Some(accepted) => Some(AcceptedProposal {
                    id: decode_suggestion_id("last_accepted.id", accepted.id)?,
                    value: decode_value(accepted.value)?,
                }),
                None => None,
            };
            Ok(GrantedMessage::Granted { last_accepted })
        }
        Some(proto_granted_message::Permission::Nack(nack)) => Ok(GrantedMessage::Nack {
            promised_id: decode_suggestion_id("promised_id", nack.promised_id)?,
        }),
        Some(proto_granted_message::Permission::StateNack(_)) => Ok(GrantedMessage::StateNack),
        None => Err("Malformed GrantedMessage".to_string()),
    }
}

// ------- StateId --------

pub(super) fn decode_state_id(state_id: u64) -> Result<StateId, DecodeError> {
    // Slots start at 1.
    if state_id == 0 {
        return Err("StateId 0".to_string());
    }
    Ok(StateId::new(state_id))
}

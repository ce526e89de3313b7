// ── Command API ──
//
// Inbound messages are decoded here into a `Command` before anything
// touches the store. Decoding is pure: topic classification comes from
// the topic layout and payload validation accepts exactly two tokens.

use crate::topics::{CommandTarget, TopicLayout};

/// A validated mutation requested over the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetGroup { name: String, enabled: bool },
    SetBlocking { enabled: bool },
}

impl Command {
    fn new(target: CommandTarget, enabled: bool) -> Self {
        match target {
            CommandTarget::Group(name) => Self::SetGroup { name, enabled },
            CommandTarget::Blocking => Self::SetBlocking { enabled },
        }
    }
}

/// Result of decoding one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Command(Command),
    /// Known topic, payload outside `"0"`/`"1"`.
    Rejected { topic: String, payload: String },
    /// Topic outside the command families.
    Ignored,
}

/// Decode `payload` on `topic` against `topics`.
pub fn decode(topics: &TopicLayout, topic: &str, payload: &[u8]) -> Inbound {
    let Some(target) = topics.classify(topic) else {
        return Inbound::Ignored;
    };

    match payload {
        b"1" => Inbound::Command(Command::new(target, true)),
        b"0" => Inbound::Command(Command::new(target, false)),
        other => Inbound::Rejected {
            topic: topic.to_owned(),
            payload: String::from_utf8_lossy(other).into_owned(),
        },
    }
}

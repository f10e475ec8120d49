pub mod telegram;

/// Kind of chat a message arrived in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
}

impl ChatKind {
    pub fn is_group(self) -> bool {
        matches!(self, ChatKind::Group | ChatKind::Supergroup)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChatKind::Private => "private",
            ChatKind::Group => "group",
            ChatKind::Supergroup => "supergroup",
        }
    }
}

/// Display fields of whoever sent the message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderMeta {
    pub first_name: Option<String>,
    pub username: Option<String>,
}

/// A text message received from the chat platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    /// The message text, if the message carried any
    pub text: Option<String>,
    pub chat_id: i64,
    pub chat_kind: ChatKind,
    pub message_id: i32,
    pub sender: SenderMeta,
}

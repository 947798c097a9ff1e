use crate::session::Message;

/// Flattens a conversation into the single prompt string the upstream takes.
///
/// Conversations without any `user` message keep their role prefixes
/// (`role: content`); otherwise only the contents are joined.
pub fn flatten_messages(messages: &[Message]) -> String {
    let has_user = messages.iter().any(|m| m.role == "user");
    let lines: Vec<String> = if has_user {
        messages.iter().map(|m| m.content.clone()).collect()
    } else {
        messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect()
    };
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_conversations_join_bare_contents() {
        let messages = [
            Message::new("system", "be brief"),
            Message::new("user", "hello"),
        ];
        assert_eq!(flatten_messages(&messages), "be brief\nhello");
    }

    #[test]
    fn role_prefixes_kept_without_user_message() {
        let messages = [
            Message::new("system", "be brief"),
            Message::new("assistant", "ok"),
        ];
        assert_eq!(flatten_messages(&messages), "system: be brief\nassistant: ok");
    }

    #[test]
    fn empty_conversation_is_empty_prompt() {
        assert_eq!(flatten_messages(&[]), "");
    }
}

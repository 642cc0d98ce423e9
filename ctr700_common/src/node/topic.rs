//! Topic building and matching.

/// Placeholder topic of an input channel whose configured topic is empty.
pub const UNDEFINED_TOPIC: &str = "undefined";

/// Wildcard accepted by output channels.
pub const WILDCARD_TOPIC: &str = "#";

/// Message direction of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Channel emits messages.
    Input,
    /// Channel consumes messages.
    Output,
}

/// Normalized topic of a channel.
///
/// The alternate topic replaces `default` when enabled. The result is
/// trimmed and lowercased; input channels never end up with an empty
/// topic, output channels may.
pub fn build_topic(default: &str, alternate: Option<&str>, direction: Direction) -> String {
    let topic = alternate.unwrap_or(default).trim().to_lowercase();
    if topic.is_empty() && direction == Direction::Input {
        UNDEFINED_TOPIC.to_string()
    } else {
        topic
    }
}

/// `true` if an inbound message topic addresses a channel.
///
/// An empty received topic never matches; `#` matches everything;
/// otherwise the received topic must equal the configured one as is.
pub fn topic_matches(configured: &str, received: &str) -> bool {
    if received.is_empty() {
        return false;
    }
    configured == WILDCARD_TOPIC || received == configured
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_topic_used_without_alternate() {
        assert_eq!(build_topic("/di/3", None, Direction::Input), "/di/3");
    }

    #[test]
    fn alternate_topic_is_normalized() {
        assert_eq!(
            build_topic("/do/1", Some("  Plant/Pump "), Direction::Output),
            "plant/pump"
        );
    }

    #[test]
    fn empty_input_topic_becomes_undefined() {
        assert_eq!(build_topic("/ai/0", Some("   "), Direction::Input), "undefined");
    }

    #[test]
    fn empty_output_topic_stays_empty() {
        assert_eq!(build_topic("/do/0", Some(""), Direction::Output), "");
    }

    #[test]
    fn matching_rules() {
        assert!(topic_matches("/do/5", "/do/5"));
        assert!(topic_matches("#", "anything"));
        assert!(!topic_matches("#", ""));
        assert!(!topic_matches("/do/5", "/DO/5"));
        assert!(!topic_matches("", ""));
    }
}

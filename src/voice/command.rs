//! Keyword commands recognized while idle

/// Command spotted in an idle utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceCommand {
    /// "stop" or "pause"
    Pause,
    /// "next" or "skip"
    Next,
    /// "back" or "previous"
    Previous,
    /// "party"
    Party,
    /// Exactly "play": start collecting a title
    PlayByTitle,
    /// "continue", "start" or "resume"
    Resume,
}

impl VoiceCommand {
    /// Classify a lowercase utterance
    ///
    /// Keywords are checked in a fixed order and the first hit wins, so
    /// "stop next" pauses and never skips.
    pub fn parse(utterance: &str) -> Option<Self> {
        let contains_any = |words: &[&str]| words.iter().any(|w| utterance.contains(w));

        if contains_any(&["stop", "pause"]) {
            Some(VoiceCommand::Pause)
        } else if contains_any(&["next", "skip"]) {
            Some(VoiceCommand::Next)
        } else if contains_any(&["back", "previous"]) {
            Some(VoiceCommand::Previous)
        } else if utterance.contains("party") {
            Some(VoiceCommand::Party)
        } else if utterance == "play" {
            Some(VoiceCommand::PlayByTitle)
        } else if contains_any(&["continue", "start", "resume"]) {
            Some(VoiceCommand::Resume)
        } else {
            None
        }
    }
}

impl std::fmt::Display for VoiceCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoiceCommand::Pause => write!(f, "Pause"),
            VoiceCommand::Next => write!(f, "Next"),
            VoiceCommand::Previous => write!(f, "Previous"),
            VoiceCommand::Party => write!(f, "Party"),
            VoiceCommand::PlayByTitle => write!(f, "PlayByTitle"),
            VoiceCommand::Resume => write!(f, "Resume"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords() {
        assert_eq!(VoiceCommand::parse("pause"), Some(VoiceCommand::Pause));
        assert_eq!(VoiceCommand::parse("please skip this"), Some(VoiceCommand::Next));
        assert_eq!(VoiceCommand::parse("go back"), Some(VoiceCommand::Previous));
        assert_eq!(VoiceCommand::parse("party time"), Some(VoiceCommand::Party));
        assert_eq!(VoiceCommand::parse("play"), Some(VoiceCommand::PlayByTitle));
        assert_eq!(VoiceCommand::parse("resume"), Some(VoiceCommand::Resume));
        assert_eq!(VoiceCommand::parse("hello there"), None);
    }

    #[test]
    fn test_first_match_wins() {
        assert_eq!(VoiceCommand::parse("stop and skip"), Some(VoiceCommand::Pause));
        assert_eq!(VoiceCommand::parse("skip back"), Some(VoiceCommand::Next));
        // "back" is checked before "start"
        assert_eq!(VoiceCommand::parse("back to start"), Some(VoiceCommand::Previous));
    }

    #[test]
    fn test_play_must_be_exact() {
        assert_eq!(VoiceCommand::parse("play espresso"), None);
        assert_eq!(VoiceCommand::parse("replay"), None);
        // "display" contains "play" but is not exactly "play"
        assert_eq!(VoiceCommand::parse("display"), None);
    }
}

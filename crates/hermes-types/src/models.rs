/// Message text together with the flags derived from it at write time.
///
/// Every write path goes through `MessageDraft::new`, so a stored message can
/// never carry a flag that disagrees with its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    pub text: String,
    pub palindrome: bool,
}

impl MessageDraft {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let palindrome = is_palindrome(&text);
        Self { text, palindrome }
    }
}

/// True when `text` reads the same forwards and backwards, compared by
/// Unicode scalar value. The empty string is a palindrome.
pub fn is_palindrome(text: &str) -> bool {
    text.chars().eq(text.chars().rev())
}

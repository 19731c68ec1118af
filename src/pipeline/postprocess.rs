//! Post-processing of model answers.
//!
//! Answers are shown and rendered as the model wrote them. The one change is
//! line endings: the summary PDF splits answers on `\n`, and a stray `\r`
//! would be drawn as a trailing space or fold two lines into one.

/// Normalise CRLF and lone CR line endings to LF. Nothing else is touched.
pub fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

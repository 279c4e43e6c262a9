//! Final-answer extraction.
//!
//! The model is instructed to write [`FINAL_ANSWER_DELIMITER`] on its own
//! line before the user-facing answer. Text before the delimiter is internal
//! and withheld from the client; text after it is the answer, re-emitted in
//! full as it grows so the client can simply replace what it shows.

use crate::prompt::{FINAL_ANSWER_CLOSE, FINAL_ANSWER_DELIMITER};

/// Incremental extractor for one streamed query.
#[derive(Debug, Default)]
pub struct FinalAnswerExtractor {
    /// Withheld text while the delimiter has not been seen.
    pending: String,
    /// Raw text after the delimiter. `Some` once emitting.
    answer: Option<String>,
}

impl FinalAnswerExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_emitting(&self) -> bool {
        self.answer.is_some()
    }

    /// Feed one fragment of model output.
    ///
    /// Returns the whole committed answer whenever there is one to show.
    /// While still searching for the delimiter nothing is returned.
    pub fn push(&mut self, fragment: &str) -> Option<String> {
        match &mut self.answer {
            Some(answer) => answer.push_str(fragment),
            None => {
                self.pending.push_str(fragment);
                let start = self.pending.find(FINAL_ANSWER_DELIMITER)?;
                let after = self.pending[start + FINAL_ANSWER_DELIMITER.len()..].to_string();
                self.pending.clear();
                self.answer = Some(after);
            }
        }
        self.committed().filter(|answer| !answer.is_empty())
    }

    /// The answer as it would be shown now.
    pub fn committed(&self) -> Option<String> {
        self.answer
            .as_deref()
            .map(|raw| raw.replace(FINAL_ANSWER_CLOSE, "").trim_start().to_string())
    }

    /// Forget everything seen so far. Called when a model turn turns out
    /// to end in capability calls: its text was deliberation, and only the
    /// last turn may supply the answer.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.answer = None;
    }

    /// End of stream. When the delimiter never appeared, the withheld text
    /// is returned as a best-effort answer.
    pub fn finish(self) -> Option<String> {
        if self.answer.is_some() {
            return None;
        }
        let flushed = self.pending.replace(FINAL_ANSWER_CLOSE, "").trim().to_string();
        (!flushed.is_empty()).then_some(flushed)
    }
}

/// Single-shot extraction on a complete message.
pub fn extract_final_answer(text: &str) -> String {
    let answer = match text.find(FINAL_ANSWER_DELIMITER) {
        Some(start) => &text[start + FINAL_ANSWER_DELIMITER.len()..],
        None => text,
    };
    answer.replace(FINAL_ANSWER_CLOSE, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_fragment_sequence() {
        let mut extractor = FinalAnswerExtractor::new();
        assert_eq!(extractor.push("internal thought "), None);
        assert_eq!(extractor.push("<FINAL_ANSWER>"), None);
        assert!(extractor.is_emitting());
        assert_eq!(extractor.push("Hello").as_deref(), Some("Hello"));
        assert_eq!(extractor.push(" world</FINAL_ANSWER>").as_deref(), Some("Hello world"));
        assert_eq!(extractor.finish(), None);
    }

    #[test]
    fn delimiter_split_across_fragments() {
        let mut extractor = FinalAnswerExtractor::new();
        assert_eq!(extractor.push("thinking <FINAL_"), None);
        assert_eq!(extractor.push("ANSWER>\n## Answer").as_deref(), Some("## Answer"));
    }

    #[test]
    fn closing_marker_split_across_fragments_is_stripped_on_replace() {
        let mut extractor = FinalAnswerExtractor::new();
        extractor.push("<FINAL_ANSWER>Done");
        extractor.push("</FINAL_");
        assert_eq!(extractor.push("ANSWER>").as_deref(), Some("Done"));
    }

    #[test]
    fn missing_delimiter_flushes_at_end() {
        let mut extractor = FinalAnswerExtractor::new();
        assert_eq!(extractor.push("The fee is "), None);
        assert_eq!(extractor.push("$19.50.</FINAL_ANSWER>\n"), None);
        assert_eq!(extractor.finish().as_deref(), Some("The fee is $19.50."));
    }

    #[test]
    fn empty_stream_flushes_nothing() {
        assert_eq!(FinalAnswerExtractor::new().finish(), None);

        let mut extractor = FinalAnswerExtractor::new();
        extractor.push("  \n");
        assert_eq!(extractor.finish(), None);
    }

    #[test]
    fn reasoning_never_leaks_into_answer() {
        let mut extractor = FinalAnswerExtractor::new();
        let mut frames = Vec::new();
        for fragment in ["Plan: call sql_fetch. ", "<FINAL_ANSWER>", "\nShipped", " today."] {
            frames.extend(extractor.push(fragment));
        }
        assert_eq!(frames, vec!["Shipped", "Shipped today."]);
        assert!(frames.iter().all(|f| !f.contains("Plan") && !f.contains('<')));
    }

    #[test]
    fn reset_discards_withheld_and_committed_text() {
        let mut ex = FinalAnswerExtractor::new();
        ex.push("Let me compute that first. ");
        ex.reset();
        ex.push("The answer is 4.");
        assert_eq!(ex.finish(), Some("The answer is 4.".to_string()));

        let mut ex = FinalAnswerExtractor::new();
        assert_eq!(ex.push("<FINAL_ANSWER> early"), Some("early".to_string()));
        ex.reset();
        assert!(!ex.is_emitting());
        assert_eq!(ex.push("<FINAL_ANSWER> late"), Some("late".to_string()));
    }

    #[test]
    fn single_shot_extraction() {
        assert_eq!(
            extract_final_answer("I looked it up.\n<FINAL_ANSWER>\nOrder shipped.\n</FINAL_ANSWER>"),
            "Order shipped."
        );
        assert_eq!(extract_final_answer("  No delimiter here. "), "No delimiter here.");
        assert_eq!(extract_final_answer(""), "");
    }
}

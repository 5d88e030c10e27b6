use crate::*;
use num_enum::TryFromPrimitive;
use std::collections::HashSet;
use std::convert::TryFrom;
use unicode_general_category::{get_general_category, GeneralCategory};

/// Kind of question in a poll.
///
/// Questions carry the type as a raw ordinal (see [`Question::kind`]), so a
/// schema coming off the wire can hold values outside this enumeration until it
/// is validated.
#[derive(Serialize, Deserialize, TryFromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum QuestionType {
    /// Free text answers
    Open = 0,
    /// Any number of options may be selected
    Checkbox = 1,
    /// Exactly one option must be selected
    Close = 2,
}

/// A single question of a poll
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub text: String,

    /// Ordinal of a [`QuestionType`]
    pub kind: i32,

    #[serde(default)]
    pub options: Vec<String>,
}

impl Question {
    pub fn new(text: &str, kind: QuestionType) -> Self {
        Question {
            text: text.to_owned(),
            kind: kind as i32,
            options: vec![],
        }
    }

    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|o| o.to_string()).collect();
        self
    }

    /// The question type, if the ordinal is in range
    pub fn question_type(&self) -> Result<QuestionType, ValidationError> {
        QuestionType::try_from(self.kind)
            .map_err(|_| ValidationError::InvalidQuestionType(self.kind))
    }
}

/// The ordered questions making up a poll
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PollSchema {
    pub questions: Vec<Question>,
}

impl PollSchema {
    pub fn new(questions: Vec<Question>) -> Self {
        PollSchema { questions }
    }

    /// Check all text is printable and all question types are known.
    ///
    /// Stops at the first problem found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for question in self.questions.iter() {
            if !is_printable(&question.text) {
                return Err(ValidationError::InvalidCharacters(TextField::Question));
            }
            if !question.options.iter().all(|o| is_printable(o)) {
                return Err(ValidationError::InvalidCharacters(TextField::Option));
            }
            question.question_type()?;
        }
        Ok(())
    }
}

/// A voter's answer to one question of a poll
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Answer {
    /// Index of the question being answered
    pub question: usize,

    /// Indexes of the selected options
    #[serde(default)]
    pub selected: Vec<usize>,

    /// Free text answers
    #[serde(default)]
    pub text: Vec<String>,
}

impl Answer {
    pub fn select(question: usize, selected: &[usize]) -> Self {
        Answer {
            question,
            selected: selected.to_vec(),
            text: vec![],
        }
    }

    pub fn text(question: usize, text: &str) -> Self {
        Answer {
            question,
            selected: vec![],
            text: vec![text.to_owned()],
        }
    }
}

/// Check a set of answers against the questions they answer.
///
/// Questions may be left unanswered, but each may be answered at most once.
/// Stops at the first problem found.
pub fn validate_answers(questions: &[Question], answers: &[Answer]) -> Result<(), ValidationError> {
    let mut answered = HashSet::new();

    for answer in answers.iter() {
        let index = answer.question;
        let question = questions
            .get(index)
            .ok_or(ValidationError::UnknownQuestion(index))?;

        if !answered.insert(index) {
            return Err(ValidationError::DuplicateAnswer(index));
        }

        if !answer.text.iter().all(|t| is_printable(t)) {
            return Err(ValidationError::InvalidCharacters(TextField::Answer));
        }

        let mut selected = HashSet::new();
        for &option in answer.selected.iter() {
            if option >= question.options.len() {
                return Err(ValidationError::UnknownOption(index, option));
            }
            if !selected.insert(option) {
                return Err(ValidationError::DuplicateOption(index, option));
            }
        }

        let kind = question.question_type()?;
        if kind != QuestionType::Open && !answer.text.is_empty() {
            return Err(ValidationError::UnexpectedText(index));
        }
        if kind == QuestionType::Close {
            match answer.selected.len() {
                0 => return Err(ValidationError::NotSelected(index)),
                1 => {}
                _ => return Err(ValidationError::MultipleSelected(index)),
            }
        }
    }

    Ok(())
}

/// True if every character is graphic or whitespace.
///
/// Control, format, surrogate, private use and unassigned code points are
/// rejected, as are line and paragraph separators that are not whitespace.
pub fn is_printable(s: &str) -> bool {
    s.chars().all(|c| c.is_whitespace() || is_graphic(c))
}

fn is_graphic(c: char) -> bool {
    !matches!(
        get_general_category(c),
        GeneralCategory::Control
            | GeneralCategory::Format
            | GeneralCategory::Surrogate
            | GeneralCategory::PrivateUse
            | GeneralCategory::Unassigned
            | GeneralCategory::LineSeparator
            | GeneralCategory::ParagraphSeparator
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn yes_no() -> PollSchema {
        PollSchema::new(vec![
            Question::new("Do you like this system?", QuestionType::Close)
                .with_options(&["yes", "no"]),
            Question::new("Why?", QuestionType::Open),
            Question::new("Check numbers you like", QuestionType::Checkbox)
                .with_options(&["1", "2", "5", "e", "74"]),
        ])
    }

    #[test]
    fn test_printable() {
        assert!(is_printable(""));
        assert!(is_printable("^&*()'\"\\ {}:<>?,./;[]+=-_"));
        assert!(is_printable("1234567890\t"));
        assert!(is_printable("Valid question\n!@#$%"));
        assert!(is_printable("Zażółć gęślą jaźń ✓"));

        assert!(!is_printable("Wrong\x01characters\x07\x00"));
        assert!(!is_printable("\u{e2}\u{3}"));
        assert!(!is_printable("zero\u{200b}width"));
        assert!(!is_printable("private\u{e000}use"));

        // Unassigned, tag and other format characters
        assert!(!is_printable("\u{378}"));
        assert!(!is_printable("hidden\u{e0041}tag"));
        assert!(!is_printable("\u{110bd}"));
        assert!(!is_printable("\u{1d173}"));
        assert!(!is_printable("soft\u{ad}hyphen"));
    }

    #[test]
    fn test_valid_schema() {
        yes_no().validate().unwrap();
        PollSchema::default().validate().unwrap();
    }

    #[test]
    fn test_wrong_question_type() {
        for kind in &[-1, 3, 5, i32::MIN, i32::MAX] {
            let mut schema = yes_no();
            schema.questions[1].kind = *kind;
            assert_eq!(schema.validate(), Err(ValidationError::InvalidQuestionType(*kind)));
        }
    }

    #[test]
    fn test_hidden_characters() {
        let question = Question::new("hidden\u{e0041}tag\u{378}", QuestionType::Open);
        let schema = PollSchema::new(vec![question]);
        assert_eq!(
            schema.validate(),
            Err(ValidationError::InvalidCharacters(TextField::Question))
        );
    }

    #[test]
    fn test_question_type_ordinals() {
        assert_eq!(QuestionType::try_from(0i32).ok(), Some(QuestionType::Open));
        assert_eq!(QuestionType::try_from(1i32).ok(), Some(QuestionType::Checkbox));
        assert_eq!(QuestionType::try_from(2i32).ok(), Some(QuestionType::Close));
    }

    #[test]
    fn test_invalid_characters() {
        let mut schema = yes_no();
        schema.questions[0].text = "\x00\x01\x02\u{ff}\u{e7}".to_owned();
        assert_eq!(
            schema.validate(),
            Err(ValidationError::InvalidCharacters(TextField::Question))
        );

        let mut schema = yes_no();
        schema.questions[2].options[3] = "e\x7f".to_owned();
        assert_eq!(
            schema.validate(),
            Err(ValidationError::InvalidCharacters(TextField::Option))
        );

        // First failure wins
        let mut schema = yes_no();
        schema.questions[0].kind = 7;
        schema.questions[1].text = "\x00".to_owned();
        assert_matches!(schema.validate(), Err(ValidationError::InvalidQuestionType(7)));
    }

    #[test]
    fn test_valid_answers() {
        let schema = yes_no();
        let answers = vec![
            Answer::select(0, &[1]),
            Answer::text(1, "Because"),
            Answer::select(2, &[0, 3, 4]),
        ];
        validate_answers(&schema.questions, &answers).unwrap();

        // Skipped questions and empty checkboxes are fine
        validate_answers(&schema.questions, &[]).unwrap();
        validate_answers(&schema.questions, &[Answer::select(2, &[])]).unwrap();
    }

    #[test]
    fn test_close_selection() {
        let questions = yes_no().questions;

        assert_eq!(
            validate_answers(&questions, &[Answer::select(0, &[])]),
            Err(ValidationError::NotSelected(0))
        );
        assert_eq!(
            validate_answers(&questions, &[Answer::select(0, &[0, 1])]),
            Err(ValidationError::MultipleSelected(0))
        );
    }

    #[test]
    fn test_invalid_answers() {
        let questions = yes_no().questions;

        assert_eq!(
            validate_answers(&questions, &[Answer::text(1, "\u{e2}\u{3}")]),
            Err(ValidationError::InvalidCharacters(TextField::Answer))
        );
        assert_eq!(
            validate_answers(&questions, &[Answer::text(3, "Nope")]),
            Err(ValidationError::UnknownQuestion(3))
        );
        assert_eq!(
            validate_answers(&questions, &[Answer::text(1, "a"), Answer::text(1, "b")]),
            Err(ValidationError::DuplicateAnswer(1))
        );
        assert_eq!(
            validate_answers(&questions, &[Answer::select(2, &[5])]),
            Err(ValidationError::UnknownOption(2, 5))
        );
        assert_eq!(
            validate_answers(&questions, &[Answer::select(2, &[1, 1])]),
            Err(ValidationError::DuplicateOption(2, 1))
        );

        // Free text only goes with open questions
        let mut close = Answer::select(0, &[1]);
        close.text = vec!["yes, but".to_owned()];
        assert_eq!(
            validate_answers(&questions, &[close]),
            Err(ValidationError::UnexpectedText(0))
        );
        assert_eq!(
            validate_answers(&questions, &[Answer::text(2, "5")]),
            Err(ValidationError::UnexpectedText(2))
        );
    }

    #[test]
    fn test_answers_to_bad_schema() {
        let mut questions = yes_no().questions;
        questions[1].kind = -1;
        assert_eq!(
            validate_answers(&questions, &[Answer::text(1, "Why not")]),
            Err(ValidationError::InvalidQuestionType(-1))
        );
    }
}

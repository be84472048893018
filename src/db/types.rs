use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "exam_section", rename_all = "snake_case")]
pub(crate) enum Section {
    SpeakingWriting,
    Reading,
    Listening,
}

impl Section {
    pub(crate) const ALL: [Section; 3] =
        [Section::SpeakingWriting, Section::Reading, Section::Listening];

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Section::SpeakingWriting => "speaking_writing",
            Section::Reading => "reading",
            Section::Listening => "listening",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "input_mode", rename_all = "snake_case")]
pub(crate) enum InputMode {
    McqSingle,
    McqMulti,
    FillBlanksDropdown,
    FillBlanksText,
    ReorderParagraphs,
    HighlightWords,
    ShortText,
    LongText,
    SpokenTranscript,
}

impl InputMode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            InputMode::McqSingle => "mcq_single",
            InputMode::McqMulti => "mcq_multi",
            InputMode::FillBlanksDropdown => "fill_blanks_dropdown",
            InputMode::FillBlanksText => "fill_blanks_text",
            InputMode::ReorderParagraphs => "reorder_paragraphs",
            InputMode::HighlightWords => "highlight_words",
            InputMode::ShortText => "short_text",
            InputMode::LongText => "long_text",
            InputMode::SpokenTranscript => "spoken_transcript",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "test_session_status", rename_all = "snake_case")]
pub(crate) enum SessionStatus {
    InProgress,
    Completed,
}

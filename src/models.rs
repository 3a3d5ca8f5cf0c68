use serde::{Deserialize, Serialize};

use crate::names;

/// Task kind, carried on the wire as one of the exact literals in
/// [`names::TASK_KINDS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    #[serde(rename = "Connect_Pairs_Text-Image")]
    ConnectPairsTextImage,
    #[serde(rename = "Connect_Pairs_Text-Text")]
    ConnectPairsTextText,
    #[serde(rename = "Four_Choices_Image-Texts")]
    FourChoicesImageTexts,
    #[serde(rename = "Four_Choices_Text-Images")]
    FourChoicesTextImages,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::ConnectPairsTextImage => names::KIND_CONNECT_PAIRS_TEXT_IMAGE,
            TaskKind::ConnectPairsTextText => names::KIND_CONNECT_PAIRS_TEXT_TEXT,
            TaskKind::FourChoicesImageTexts => names::KIND_FOUR_CHOICES_IMAGE_TEXTS,
            TaskKind::FourChoicesTextImages => names::KIND_FOUR_CHOICES_TEXT_IMAGES,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            names::KIND_CONNECT_PAIRS_TEXT_IMAGE => Some(TaskKind::ConnectPairsTextImage),
            names::KIND_CONNECT_PAIRS_TEXT_TEXT => Some(TaskKind::ConnectPairsTextText),
            names::KIND_FOUR_CHOICES_IMAGE_TEXTS => Some(TaskKind::FourChoicesImageTexts),
            names::KIND_FOUR_CHOICES_TEXT_IMAGES => Some(TaskKind::FourChoicesTextImages),
            _ => None,
        }
    }

    pub fn is_pair_matching(&self) -> bool {
        matches!(
            self,
            TaskKind::ConnectPairsTextImage | TaskKind::ConnectPairsTextText
        )
    }

    /// Distinct content items consumed by one question of this kind.
    pub fn items_per_question(&self) -> usize {
        if self.is_pair_matching() {
            names::ITEMS_PER_PAIR_QUESTION
        } else {
            names::ITEMS_PER_FOUR_CHOICE_QUESTION
        }
    }

    /// Minimum available pool size before automatic generation may start.
    pub fn min_pool(&self) -> usize {
        if self.is_pair_matching() {
            names::MIN_POOL_PAIRS
        } else {
            names::MIN_POOL_FOUR_CHOICES
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => names::DIFFICULTY_EASY,
            Difficulty::Hard => names::DIFFICULTY_HARD,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            names::DIFFICULTY_EASY => Some(Difficulty::Easy),
            names::DIFFICULTY_HARD => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Submission payloads (result recording)
// ---------------------------------------------------------------------------

pub type Submission = Vec<SubmittedQuestion>;

/// One per-question entry of a submission, in task question order. Which half
/// must be present depends on the task kind; the recorder rejects entries
/// missing the required one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedQuestion {
    #[serde(default)]
    pub pairings: Vec<SubmittedPairing>,
    #[serde(default)]
    pub four_choice: Option<SubmittedFourChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedPairing {
    pub data1: String,
    pub data2: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedFourChoice {
    pub chosen_option: String,
}

// ---------------------------------------------------------------------------
// Custom authoring payloads
// ---------------------------------------------------------------------------

/// One caller-authored question. Pair kinds fill `pairs`, four-choice kinds
/// fill `four_choice`; the generator checks the shape against the task kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomQuestion {
    #[serde(default)]
    pub heading: String,
    #[serde(default)]
    pub pairs: Vec<CustomPair>,
    #[serde(default)]
    pub four_choice: Option<CustomFourChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomPair {
    pub data1: String,
    pub data2: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFourChoice {
    pub prompt: String,
    pub correct_option: String,
    pub incorrect_options: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

// ---------------------------------------------------------------------------
// Content import
// ---------------------------------------------------------------------------

/// One entry of a content import file: the two sides of a reusable item plus
/// optional topic tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContentItem {
    pub text: String,
    pub counterpart: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

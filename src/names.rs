// Task kind wire literals. These are part of the exchange contract with
// existing clients and must not be renamed.
pub const KIND_CONNECT_PAIRS_TEXT_IMAGE: &str = "Connect_Pairs_Text-Image";
pub const KIND_CONNECT_PAIRS_TEXT_TEXT: &str = "Connect_Pairs_Text-Text";
pub const KIND_FOUR_CHOICES_IMAGE_TEXTS: &str = "Four_Choices_Image-Texts";
pub const KIND_FOUR_CHOICES_TEXT_IMAGES: &str = "Four_Choices_Text-Images";

pub const TASK_KINDS: &[&str] = &[
    KIND_CONNECT_PAIRS_TEXT_IMAGE,
    KIND_CONNECT_PAIRS_TEXT_TEXT,
    KIND_FOUR_CHOICES_IMAGE_TEXTS,
    KIND_FOUR_CHOICES_TEXT_IMAGES,
];

pub const DIFFICULTY_EASY: &str = "Easy";
pub const DIFFICULTY_HARD: &str = "Hard";

// Generation sizing
pub const QUESTIONS_PER_TASK: usize = 10;
pub const ITEMS_PER_PAIR_QUESTION: usize = 3;
pub const ITEMS_PER_FOUR_CHOICE_QUESTION: usize = 4;
pub const MIN_POOL_PAIRS: usize = QUESTIONS_PER_TASK * ITEMS_PER_PAIR_QUESTION;
pub const MIN_POOL_FOUR_CHOICES: usize = QUESTIONS_PER_TASK * ITEMS_PER_FOUR_CHOICE_QUESTION;

pub const THERAPIST_CODE_LEN: usize = 10;

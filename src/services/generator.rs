use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::db::models::{ContentItem, NewFourChoice, NewPairChoice, NewQuestion, Task};
use crate::db::Db;
use crate::errors::{AppError, Result};
use crate::models::{CustomQuestion, Difficulty, TaskKind};
use crate::names;

// ---------------------------------------------------------------------------
// GeneratorRepository trait (DIP: service defines the abstraction it needs)
// ---------------------------------------------------------------------------

/// Everything needed to persist one task graph atomically.
#[derive(Debug)]
pub struct NewTaskSpec {
    pub name: String,
    pub kind: TaskKind,
    pub difficulty: Difficulty,
    pub created_by: i64,
    pub is_custom: bool,
    pub tags: Vec<String>,
    pub questions: Vec<NewQuestion>,
    pub consumed_items: Vec<i64>,
}

#[cfg_attr(test, mockall::automock)]
pub trait GeneratorRepository: Send + Sync {
    fn list_available_content(
        &self,
        owner: i64,
        exclude_task: Option<i64>,
    ) -> impl std::future::Future<Output = Result<Vec<ContentItem>>> + Send;

    fn insert_task(
        &self,
        spec: NewTaskSpec,
    ) -> impl std::future::Future<Output = Result<i64>> + Send;

    fn replace_questions(
        &self,
        task_id: i64,
        is_custom: bool,
        tags: Vec<String>,
        questions: Vec<NewQuestion>,
        consumed_items: Vec<i64>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn get_task(&self, task_id: i64) -> impl std::future::Future<Output = Result<Task>> + Send;

    fn task_has_results(
        &self,
        task_id: i64,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;
}

impl GeneratorRepository for Db {
    fn list_available_content(
        &self,
        owner: i64,
        exclude_task: Option<i64>,
    ) -> impl std::future::Future<Output = Result<Vec<ContentItem>>> + Send {
        Db::list_available_content(self, owner, exclude_task)
    }

    fn insert_task(
        &self,
        spec: NewTaskSpec,
    ) -> impl std::future::Future<Output = Result<i64>> + Send {
        async move {
            self.create_task_with_questions(
                &spec.name,
                spec.kind.as_str(),
                spec.difficulty.as_str(),
                spec.created_by,
                spec.is_custom,
                &spec.tags,
                &spec.questions,
                &spec.consumed_items,
            )
            .await
        }
    }

    fn replace_questions(
        &self,
        task_id: i64,
        is_custom: bool,
        tags: Vec<String>,
        questions: Vec<NewQuestion>,
        consumed_items: Vec<i64>,
    ) -> impl std::future::Future<Output = Result<()>> + Send {
        async move {
            self.replace_task_questions(task_id, is_custom, &tags, &questions, &consumed_items)
                .await
        }
    }

    fn get_task(&self, task_id: i64) -> impl std::future::Future<Output = Result<Task>> + Send {
        Db::get_task(self, task_id)
    }

    fn task_has_results(
        &self,
        task_id: i64,
    ) -> impl std::future::Future<Output = Result<bool>> + Send {
        Db::task_has_results(self, task_id)
    }
}

// ---------------------------------------------------------------------------
// Question strategies, one per task kind
// ---------------------------------------------------------------------------

/// Builds one question from a sample of distinct content items. The sample
/// size is the kind's `items_per_question`.
trait QuestionStrategy: Sync {
    fn build(&self, items: &[ContentItem]) -> NewQuestion;
}

/// Both pair kinds: every item contributes its two sides as matchable
/// choices, one row per direction, so scoring does not depend on which side
/// the client lists first.
struct ConnectPairs;

impl QuestionStrategy for ConnectPairs {
    fn build(&self, items: &[ContentItem]) -> NewQuestion {
        let pair_choices = items
            .iter()
            .flat_map(|item| {
                [
                    NewPairChoice {
                        data1: item.text.clone(),
                        data2: item.counterpart.clone(),
                    },
                    NewPairChoice {
                        data1: item.counterpart.clone(),
                        data2: item.text.clone(),
                    },
                ]
            })
            .collect();

        NewQuestion {
            heading: String::new(),
            pair_choices,
            four_choice: None,
        }
    }
}

/// Image prompt, text options: the first sampled item supplies the prompt
/// (its counterpart side) and the correct option (its text side); the other
/// three items supply incorrect texts.
struct FourChoicesImageTexts;

impl QuestionStrategy for FourChoicesImageTexts {
    fn build(&self, items: &[ContentItem]) -> NewQuestion {
        NewQuestion {
            heading: String::new(),
            pair_choices: Vec::new(),
            four_choice: Some(NewFourChoice {
                prompt: items[0].counterpart.clone(),
                correct_option: items[0].text.clone(),
                incorrect1: items[1].text.clone(),
                incorrect2: items[2].text.clone(),
                incorrect3: items[3].text.clone(),
            }),
        }
    }
}

/// Text prompt, image options: the mirror mapping of `FourChoicesImageTexts`.
struct FourChoicesTextImages;

impl QuestionStrategy for FourChoicesTextImages {
    fn build(&self, items: &[ContentItem]) -> NewQuestion {
        NewQuestion {
            heading: String::new(),
            pair_choices: Vec::new(),
            four_choice: Some(NewFourChoice {
                prompt: items[0].text.clone(),
                correct_option: items[0].counterpart.clone(),
                incorrect1: items[1].counterpart.clone(),
                incorrect2: items[2].counterpart.clone(),
                incorrect3: items[3].counterpart.clone(),
            }),
        }
    }
}

fn strategy_for(kind: TaskKind) -> &'static dyn QuestionStrategy {
    match kind {
        TaskKind::ConnectPairsTextImage | TaskKind::ConnectPairsTextText => &ConnectPairs,
        TaskKind::FourChoicesImageTexts => &FourChoicesImageTexts,
        TaskKind::FourChoicesTextImages => &FourChoicesTextImages,
    }
}

/// Shuffle the pool and cut it into per-question samples: uniform without
/// replacement, so no item lands in two questions of the same task.
fn sample_questions(
    kind: TaskKind,
    mut pool: Vec<ContentItem>,
    rng: &mut StdRng,
) -> (Vec<NewQuestion>, Vec<i64>) {
    pool.shuffle(rng);

    let strategy = strategy_for(kind);
    let per_question = kind.items_per_question();
    let mut questions = Vec::with_capacity(names::QUESTIONS_PER_TASK);
    let mut consumed = Vec::with_capacity(names::QUESTIONS_PER_TASK * per_question);

    for chunk in pool
        .chunks_exact(per_question)
        .take(names::QUESTIONS_PER_TASK)
    {
        questions.push(strategy.build(chunk));
        consumed.extend(chunk.iter().map(|item| item.id));
    }

    (questions, consumed)
}

// ---------------------------------------------------------------------------
// TaskGenerator
// ---------------------------------------------------------------------------

/// Assembles tasks from the content pool. The pool drawn from is always the
/// configured default content owner's; which user the finished task belongs
/// to is the caller's business.
pub struct TaskGenerator<R: GeneratorRepository = Db> {
    repo: R,
    default_content_owner: i64,
}

impl<R: GeneratorRepository> TaskGenerator<R> {
    pub fn new(repo: R, default_content_owner: i64) -> Self {
        Self {
            repo,
            default_content_owner,
        }
    }

    /// Automatic generation: build a 10-question task of the given kind from
    /// the default owner's pool. Fails before any write if the pool holds
    /// fewer than the kind's minimum.
    pub async fn generate(
        &self,
        name: &str,
        kind: TaskKind,
        difficulty: Difficulty,
        created_by: i64,
        seed: Option<u64>,
    ) -> Result<i64> {
        if name.trim().is_empty() {
            return Err(AppError::Validation("task name must not be empty".into()));
        }

        let pool = self
            .repo
            .list_available_content(self.default_content_owner, None)
            .await?;
        let required = kind.min_pool();
        if pool.len() < required {
            return Err(AppError::InsufficientContent {
                kind,
                available: pool.len(),
                required,
            });
        }

        let mut rng = StdRng::seed_from_u64(seed.unwrap_or_else(rand::random));
        let (questions, consumed_items) = sample_questions(kind, pool, &mut rng);

        self.repo
            .insert_task(NewTaskSpec {
                name: name.to_string(),
                kind,
                difficulty,
                created_by,
                is_custom: false,
                tags: Vec::new(),
                questions,
                consumed_items,
            })
            .await
    }

    /// Custom authoring: store caller-supplied questions verbatim, with
    /// their tags created on demand for the authoring user.
    pub async fn create_custom(
        &self,
        name: &str,
        kind: TaskKind,
        difficulty: Difficulty,
        created_by: i64,
        questions: Vec<CustomQuestion>,
    ) -> Result<i64> {
        if name.trim().is_empty() {
            return Err(AppError::Validation("task name must not be empty".into()));
        }

        let (questions, tags) = build_custom_questions(kind, questions)?;

        self.repo
            .insert_task(NewTaskSpec {
                name: name.to_string(),
                kind,
                difficulty,
                created_by,
                is_custom: true,
                tags,
                questions,
                consumed_items: Vec::new(),
            })
            .await
    }

    /// Replace a task's generated question set with a fresh draw. Items the
    /// task currently uses are excluded from the draw; the replacement
    /// releases them again. Refused once results exist.
    pub async fn regenerate(&self, task_id: i64, seed: Option<u64>) -> Result<()> {
        let task = self.repo.get_task(task_id).await?;
        let kind = kind_of(&task)?;
        self.ensure_editable(task_id).await?;

        let pool = self
            .repo
            .list_available_content(self.default_content_owner, Some(task_id))
            .await?;
        let required = kind.min_pool();
        if pool.len() < required {
            return Err(AppError::InsufficientContent {
                kind,
                available: pool.len(),
                required,
            });
        }

        let mut rng = StdRng::seed_from_u64(seed.unwrap_or_else(rand::random));
        let (questions, consumed_items) = sample_questions(kind, pool, &mut rng);

        self.repo
            .replace_questions(task_id, false, Vec::new(), questions, consumed_items)
            .await
    }

    /// Replace a task's question set with caller-authored questions.
    /// Refused once results exist.
    pub async fn reauthor(&self, task_id: i64, questions: Vec<CustomQuestion>) -> Result<()> {
        let task = self.repo.get_task(task_id).await?;
        let kind = kind_of(&task)?;
        self.ensure_editable(task_id).await?;

        let (questions, tags) = build_custom_questions(kind, questions)?;

        self.repo
            .replace_questions(task_id, true, tags, questions, Vec::new())
            .await
    }

    async fn ensure_editable(&self, task_id: i64) -> Result<()> {
        if self.repo.task_has_results(task_id).await? {
            return Err(AppError::Validation(
                "task has recorded results and its questions can no longer be changed".into(),
            ));
        }

        Ok(())
    }
}

fn kind_of(task: &Task) -> Result<TaskKind> {
    TaskKind::from_str(&task.kind)
        .ok_or_else(|| AppError::Validation(format!("unknown task kind '{}'", task.kind)))
}

/// Check a custom payload against the kind's choice shape and turn it into
/// storable questions plus the union of supplied tag names.
fn build_custom_questions(
    kind: TaskKind,
    submitted: Vec<CustomQuestion>,
) -> Result<(Vec<NewQuestion>, Vec<String>)> {
    if submitted.is_empty() {
        return Err(AppError::Validation(
            "a custom task needs at least one question".into(),
        ));
    }

    let mut questions = Vec::with_capacity(submitted.len());
    let mut tags: Vec<String> = Vec::new();
    let mut collect_tags = |names: &[String]| {
        for name in names {
            if !tags.contains(name) {
                tags.push(name.clone());
            }
        }
    };

    for (idx, question) in submitted.into_iter().enumerate() {
        if kind.is_pair_matching() {
            if question.four_choice.is_some() {
                return Err(AppError::Validation(format!(
                    "question {idx}: pair-matching tasks take pair choices, not a four-choice payload"
                )));
            }
            if question.pairs.is_empty() {
                return Err(AppError::Validation(format!(
                    "question {idx}: pair-matching tasks need at least one pair choice"
                )));
            }

            let mut pair_choices = Vec::with_capacity(question.pairs.len());
            for pair in &question.pairs {
                collect_tags(&pair.tags);
                pair_choices.push(NewPairChoice {
                    data1: pair.data1.clone(),
                    data2: pair.data2.clone(),
                });
            }

            questions.push(NewQuestion {
                heading: question.heading,
                pair_choices,
                four_choice: None,
            });
        } else {
            if !question.pairs.is_empty() {
                return Err(AppError::Validation(format!(
                    "question {idx}: four-choice tasks take a four-choice payload, not pair choices"
                )));
            }
            let four = question.four_choice.ok_or_else(|| {
                AppError::Validation(format!(
                    "question {idx}: four-choice tasks need a four-choice payload"
                ))
            })?;
            if four.incorrect_options.len() != 3 {
                return Err(AppError::Validation(format!(
                    "question {idx}: exactly 3 incorrect options are required, got {}",
                    four.incorrect_options.len()
                )));
            }

            collect_tags(&four.tags);
            questions.push(NewQuestion {
                heading: question.heading,
                pair_choices: Vec::new(),
                four_choice: Some(NewFourChoice {
                    prompt: four.prompt,
                    correct_option: four.correct_option,
                    incorrect1: four.incorrect_options[0].clone(),
                    incorrect2: four.incorrect_options[1].clone(),
                    incorrect3: four.incorrect_options[2].clone(),
                }),
            });
        }
    }

    Ok((questions, tags))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::exam_module::ExamModule;

/// The accepted answer for a question: one value or a list of alternates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CanonicalAnswer {
    Single(String),
    Alternates(Vec<String>),
}

impl CanonicalAnswer {
    pub fn alternates(&self) -> Vec<&str> {
        match self {
            CanonicalAnswer::Single(value) => vec![value.as_str()],
            CanonicalAnswer::Alternates(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

/// Canonical answers keyed by question number.
pub type AnswerKey = BTreeMap<u32, CanonicalAnswer>;

/// One reconciled answer as kept on the candidate record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_number: u32,
    pub submitted: String,
    pub normalized: String,
    pub canonical: Option<CanonicalAnswer>,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WritingResponse {
    #[serde(default)]
    pub task1: String,
    #[serde(default)]
    pub task2: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerSheet {
    #[serde(default)]
    pub listening: Option<Vec<AnswerRecord>>,
    #[serde(default)]
    pub reading: Option<Vec<AnswerRecord>>,
    #[serde(default)]
    pub writing: Option<WritingResponse>,
}

/// Answers for a single module, as handed to admins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModuleAnswers {
    Objective(Vec<AnswerRecord>),
    Writing(WritingResponse),
}

impl AnswerSheet {
    pub fn has(&self, module: ExamModule) -> bool {
        match module {
            ExamModule::Listening => self.listening.is_some(),
            ExamModule::Reading => self.reading.is_some(),
            ExamModule::Writing => self.writing.is_some(),
        }
    }

    pub fn get(&self, module: ExamModule) -> Option<ModuleAnswers> {
        match module {
            ExamModule::Listening => self.listening.clone().map(ModuleAnswers::Objective),
            ExamModule::Reading => self.reading.clone().map(ModuleAnswers::Objective),
            ExamModule::Writing => self.writing.clone().map(ModuleAnswers::Writing),
        }
    }

    pub fn set(&mut self, module: ExamModule, answers: ModuleAnswers) {
        match answers {
            ModuleAnswers::Objective(records) => match module {
                ExamModule::Listening => self.listening = Some(records),
                ExamModule::Reading => self.reading = Some(records),
                ExamModule::Writing => self.writing = Some(WritingResponse::default()),
            },
            ModuleAnswers::Writing(response) => match module {
                ExamModule::Writing => self.writing = Some(response),
                objective => self.set(objective, ModuleAnswers::Objective(Vec::new())),
            },
        }
    }

    pub fn clear(&mut self, module: ExamModule) {
        match module {
            ExamModule::Listening => self.listening = None,
            ExamModule::Reading => self.reading = None,
            ExamModule::Writing => self.writing = None,
        }
    }
}

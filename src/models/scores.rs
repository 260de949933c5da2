use serde::{Deserialize, Serialize};

use super::band::Band;
use super::exam_module::ExamModule;

/// Listening or reading result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionScore {
    pub raw: u32,
    pub band: Band,
    pub correct_answers: u32,
    pub total_questions: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WritingScore {
    pub task1_band: Band,
    pub task2_band: Band,
    pub overall_band: Band,
}

impl WritingScore {
    pub fn uniform(band: Band) -> Self {
        Self {
            task1_band: band,
            task2_band: band,
            overall_band: band,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    #[serde(default)]
    pub listening: Option<SectionScore>,
    #[serde(default)]
    pub reading: Option<SectionScore>,
    #[serde(default)]
    pub writing: Option<WritingScore>,
    #[serde(default)]
    pub overall: Option<Band>,
}

impl Scores {
    pub fn has(&self, module: ExamModule) -> bool {
        self.band_of(module).is_some()
    }

    pub fn band_of(&self, module: ExamModule) -> Option<Band> {
        match module {
            ExamModule::Listening => self.listening.as_ref().map(|s| s.band),
            ExamModule::Reading => self.reading.as_ref().map(|s| s.band),
            ExamModule::Writing => self.writing.as_ref().map(|s| s.overall_band),
        }
    }

    pub fn clear(&mut self, module: ExamModule) {
        match module {
            ExamModule::Listening => self.listening = None,
            ExamModule::Reading => self.reading = None,
            ExamModule::Writing => self.writing = None,
        }
    }

    pub fn module_bands(&self) -> Vec<Band> {
        ExamModule::ALL
            .into_iter()
            .filter_map(|module| self.band_of(module))
            .collect()
    }

    /// Re-derives `overall` from whatever module bands are present.
    pub fn recompute_overall(&mut self) {
        self.overall = crate::services::aggregation::compute_overall(&self.module_bands());
    }
}

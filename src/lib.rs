pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::database::store::CandidateStore;
use crate::services::{
    account_service::AccountService, candidate_service::CandidateService,
    correction_service::CorrectionService, score_service::ScoreService,
    session_service::SessionService, test_bank::TestBank, violation_service::ViolationService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub session_service: SessionService,
    pub violation_service: ViolationService,
    pub score_service: ScoreService,
    pub correction_service: CorrectionService,
    pub candidate_service: CandidateService,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn CandidateStore>,
        test_bank: Arc<dyn TestBank>,
        accounts: Arc<dyn AccountService>,
    ) -> Self {
        Self {
            config,
            session_service: SessionService::new(store.clone()),
            violation_service: ViolationService::new(store.clone()),
            score_service: ScoreService::new(store.clone(), test_bank),
            correction_service: CorrectionService::new(store.clone()),
            candidate_service: CandidateService::new(store, accounts),
        }
    }
}

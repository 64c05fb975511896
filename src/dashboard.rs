use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::TransitionError;
use crate::models::{AnalysisData, Bimester, Quiz, QuizDifficulty, Student};
use crate::recommendation::RecommendationSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Home,
    Login,
    Dashboard,
}

/// Top-level page navigation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Navigator {
    view: View,
    dashboard_key: u64,
}

impl Default for Navigator {
    fn default() -> Self {
        Self {
            view: View::Home,
            dashboard_key: 0,
        }
    }
}

impl Navigator {
    pub fn view(&self) -> View {
        self.view
    }

    pub fn dashboard_key(&self) -> u64 {
        self.dashboard_key
    }

    /// Navigating to the dashboard while already there remounts it
    pub fn navigate(&mut self, view: View) {
        if view == View::Dashboard && self.view == View::Dashboard {
            self.dashboard_key += 1;
        }
        self.view = view;
    }

    pub fn logout(&mut self) {
        self.view = View::Home;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStep {
    Selection,
    Report,
    Reinforcement,
}

impl AnalysisStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStep::Selection => "selection",
            AnalysisStep::Report => "report",
            AnalysisStep::Reinforcement => "reinforcement",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SummaryState {
    NotRequested,
    Loading,
    Ready { text: String, fallback: bool },
}

/// Analysis flow for one student. `epoch` changes whenever the analysis is
/// replaced or cleared, so late summaries for an old analysis are dropped.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    step: AnalysisStep,
    analysis: Option<AnalysisData>,
    summary: SummaryState,
    recommendations: Option<RecommendationSet>,
    epoch: u64,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            step: AnalysisStep::Selection,
            analysis: None,
            summary: SummaryState::NotRequested,
            recommendations: None,
            epoch: 0,
        }
    }
}

impl DashboardState {
    pub fn step(&self) -> AnalysisStep {
        self.step
    }

    pub fn analysis(&self) -> Option<&AnalysisData> {
        self.analysis.as_ref()
    }

    pub fn summary(&self) -> &SummaryState {
        &self.summary
    }

    pub fn recommendations(&self) -> Option<&RecommendationSet> {
        self.recommendations.as_ref()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Selection → Report. Returns the epoch a summary must carry to be applied.
    pub fn start_analysis(&mut self, analysis: AnalysisData) -> Result<u64, TransitionError> {
        if self.step != AnalysisStep::Selection {
            return Err(TransitionError {
                action: "start an analysis",
                from: self.step.as_str(),
            });
        }

        self.epoch += 1;
        self.summary = if analysis.performance.is_empty() {
            SummaryState::NotRequested
        } else {
            SummaryState::Loading
        };
        self.analysis = Some(analysis);
        self.recommendations = None;
        self.step = AnalysisStep::Report;
        Ok(self.epoch)
    }

    /// Report → Reinforcement
    pub fn proceed_to_reinforcement(&mut self) -> Result<(), TransitionError> {
        if self.step != AnalysisStep::Report {
            return Err(TransitionError {
                action: "open reinforcement",
                from: self.step.as_str(),
            });
        }
        self.step = AnalysisStep::Reinforcement;
        Ok(())
    }

    /// Any step → Selection, discarding the analysis and everything derived from it
    pub fn back_to_selection(&mut self) {
        self.epoch += 1;
        self.step = AnalysisStep::Selection;
        self.analysis = None;
        self.summary = SummaryState::NotRequested;
        self.recommendations = None;
    }

    pub fn apply_summary(&mut self, epoch: u64, text: String, fallback: bool) -> bool {
        if epoch != self.epoch || self.analysis.is_none() {
            return false;
        }
        self.summary = SummaryState::Ready { text, fallback };
        true
    }

    pub fn apply_recommendations(&mut self, epoch: u64, set: RecommendationSet) -> bool {
        if epoch != self.epoch || self.step != AnalysisStep::Reinforcement {
            return false;
        }
        self.recommendations = Some(set);
        true
    }
}

/// Identifies one request; only the latest ticket's result is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ticket(u64);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QuizStatus {
    Idle,
    Loading {
        video_id: String,
        difficulty: QuizDifficulty,
    },
    Ready {
        video_id: String,
        quiz: Quiz,
    },
    Unavailable {
        video_id: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizPanel {
    status: QuizStatus,
    current: Option<Ticket>,
    #[serde(skip)]
    issued: u64,
}

impl Default for QuizPanel {
    fn default() -> Self {
        Self {
            status: QuizStatus::Idle,
            current: None,
            issued: 0,
        }
    }
}

impl QuizPanel {
    pub fn status(&self) -> &QuizStatus {
        &self.status
    }

    pub fn begin(&mut self, video_id: &str, difficulty: QuizDifficulty) -> Ticket {
        self.issued += 1;
        let ticket = Ticket(self.issued);
        self.current = Some(ticket);
        self.status = QuizStatus::Loading {
            video_id: video_id.to_string(),
            difficulty,
        };
        ticket
    }

    /// Apply a finished quiz request. Returns false when a newer request superseded it.
    pub fn complete(&mut self, ticket: Ticket, quiz: Option<Quiz>, reason: Option<String>) -> bool {
        if self.current != Some(ticket) {
            return false;
        }

        let video_id = match &self.status {
            QuizStatus::Loading { video_id, .. } => video_id.clone(),
            _ => return false,
        };

        self.status = match quiz {
            Some(quiz) => QuizStatus::Ready { video_id, quiz },
            None => QuizStatus::Unavailable {
                video_id,
                reason: reason.unwrap_or_else(|| "quiz unavailable".to_string()),
            },
        };
        self.current = None;
        true
    }

    pub fn reset(&mut self) {
        self.status = QuizStatus::Idle;
        self.current = None;
    }
}

/// Justification shown for the currently selected video
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JustificationPanel {
    selected_video: Option<String>,
    text: Option<String>,
    #[serde(skip)]
    current: Option<Ticket>,
    #[serde(skip)]
    issued: u64,
}

impl JustificationPanel {
    pub fn select(&mut self, video_id: &str) -> Ticket {
        self.issued += 1;
        let ticket = Ticket(self.issued);
        self.current = Some(ticket);
        self.selected_video = Some(video_id.to_string());
        self.text = None;
        ticket
    }

    pub fn complete(&mut self, ticket: Ticket, text: String) -> bool {
        if self.current != Some(ticket) {
            return false;
        }
        self.text = Some(text);
        self.current = None;
        true
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn selected_video(&self) -> Option<&str> {
        self.selected_video.as_deref()
    }
}

/// Everything the server keeps for one logged-in student
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSession {
    pub id: Uuid,
    pub student: Student,
    pub navigator: Navigator,
    pub dashboard: DashboardState,
    pub quiz: QuizPanel,
    pub justification: JustificationPanel,
    pub selected_bimester: Option<Bimester>,
    pub created_at: DateTime<Utc>,
}

impl StudentSession {
    pub fn new(student: Student) -> Self {
        let mut navigator = Navigator::default();
        navigator.navigate(View::Login);
        navigator.navigate(View::Dashboard);

        Self {
            id: Uuid::new_v4(),
            student,
            navigator,
            dashboard: DashboardState::default(),
            quiz: QuizPanel::default(),
            justification: JustificationPanel::default(),
            selected_bimester: None,
            created_at: Utc::now(),
        }
    }

    pub fn logout(&mut self) {
        self.navigator.logout();
        self.quiz.reset();
        self.dashboard.back_to_selection();
    }
}

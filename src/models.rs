use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Grades below this value (0-100 scale) mark a subject as needing reinforcement.
pub const DEFAULT_SUBJECT_PERFORMANCE_THRESHOLD: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SchoolGrade {
    #[serde(rename = "9º Ano EF")]
    Ano9Ef,
    #[serde(rename = "1ª Série EM")]
    Serie1Em,
    #[serde(rename = "2ª Série EM")]
    Serie2Em,
    #[serde(rename = "3ª Série EM")]
    Serie3Em,
}

/// Which regional channel publishes content for a grade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeBand {
    Fundamental,
    Medio,
}

impl SchoolGrade {
    pub const ALL: [SchoolGrade; 4] = [
        SchoolGrade::Ano9Ef,
        SchoolGrade::Serie1Em,
        SchoolGrade::Serie2Em,
        SchoolGrade::Serie3Em,
    ];

    pub const MEDIO: [SchoolGrade; 3] = [
        SchoolGrade::Serie1Em,
        SchoolGrade::Serie2Em,
        SchoolGrade::Serie3Em,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SchoolGrade::Ano9Ef => "9º Ano EF",
            SchoolGrade::Serie1Em => "1ª Série EM",
            SchoolGrade::Serie2Em => "2ª Série EM",
            SchoolGrade::Serie3Em => "3ª Série EM",
        }
    }

    /// Parse a grade label; unknown labels (e.g. grades the service does not cover) yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|grade| grade.label() == label)
    }

    pub fn band(&self) -> GradeBand {
        match self {
            SchoolGrade::Ano9Ef => GradeBand::Fundamental,
            _ => GradeBand::Medio,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bimester {
    #[serde(rename = "1º Bimestre")]
    First,
    #[serde(rename = "2º Bimestre")]
    Second,
    #[serde(rename = "3º Bimestre")]
    Third,
    #[serde(rename = "4º Bimestre")]
    Fourth,
}

impl Bimester {
    pub const ALL: [Bimester; 4] = [
        Bimester::First,
        Bimester::Second,
        Bimester::Third,
        Bimester::Fourth,
    ];

    pub fn number(&self) -> u8 {
        match self {
            Bimester::First => 1,
            Bimester::Second => 2,
            Bimester::Third => 3,
            Bimester::Fourth => 4,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|bimester| bimester.number() == number)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Bimester::First => "1º Bimestre",
            Bimester::Second => "2º Bimestre",
            Bimester::Third => "3º Bimestre",
            Bimester::Fourth => "4º Bimestre",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoSource {
    #[serde(rename = "GoiásTec")]
    GoiasTec,
    #[serde(rename = "Outro")]
    Other,
}

impl VideoSource {
    pub fn is_curated(&self) -> bool {
        matches!(self, VideoSource::GoiasTec)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub video_url: String,
    pub subject: String,
    pub grade_levels: Vec<SchoolGrade>,
    pub source: VideoSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
}

impl Video {
    pub fn with_justification(&self, justification: impl Into<String>) -> Self {
        Self {
            justification: Some(justification.into()),
            ..self.clone()
        }
    }

    pub fn matches_subject(&self, subject: &str) -> bool {
        self.subject.to_lowercase() == subject.to_lowercase()
    }
}

/// Outcome of checking whether a video can be embedded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub playable: bool,
    pub embed_url: Option<String>,
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn playable(embed_url: String) -> Self {
        Self {
            playable: true,
            embed_url: Some(embed_url),
            error: None,
        }
    }

    pub fn unplayable(reason: &str) -> Self {
        Self {
            playable: false,
            embed_url: None,
            error: Some(reason.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuizDifficulty {
    #[serde(rename = "Iniciante")]
    Beginner,
    #[serde(rename = "Intermediário")]
    Intermediate,
    #[serde(rename = "Avançado")]
    Advanced,
}

impl QuizDifficulty {
    pub fn label(&self) -> &'static str {
        match self {
            QuizDifficulty::Beginner => "Iniciante",
            QuizDifficulty::Intermediate => "Intermediário",
            QuizDifficulty::Advanced => "Avançado",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub difficulty: QuizDifficulty,
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectPerformance {
    pub subject: String,
    pub grade: f64, // 0-100
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisData {
    pub school_grade: SchoolGrade,
    pub bimester: Bimester,
    pub performance: Vec<SubjectPerformance>,
}

impl AnalysisData {
    /// Subjects graded below `threshold`, in roster order
    pub fn weak_subjects(&self, threshold: f64) -> Vec<String> {
        self.performance
            .iter()
            .filter(|p| p.grade < threshold)
            .map(|p| p.subject.clone())
            .collect()
    }

    pub fn has_low_grades(&self) -> bool {
        self.performance
            .iter()
            .any(|p| p.grade < DEFAULT_SUBJECT_PERFORMANCE_THRESHOLD)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub registration: String, // matrícula, also the login password
    pub name: String,
    pub school_grade: SchoolGrade,
    pub school: String,
    pub city: String,
    pub class_name: String,
    pub shift: String,
}

impl Student {
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentGradeRecord {
    pub registration: String,
    pub subject_code: String,
    pub subject: String,
    pub bimester: u8,
    pub score: f64, // 0-10, as published by the school system
}

/// User-submitted report that a video did not play
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueReport {
    pub video_id: String,
    pub issue_type: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectComparison {
    pub subject: String,
    pub first_bimester: f64,
    pub second_bimester: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BimesterComparison {
    pub first: Bimester,
    pub second: Bimester,
    pub subjects: Vec<SubjectComparison>,
    pub first_average: f64,
    pub second_average: f64,
    pub difference: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_labels_round_trip_through_serde() {
        let json = serde_json::to_string(&SchoolGrade::Serie3Em).unwrap();
        assert_eq!(json, "\"3ª Série EM\"");
        assert_eq!(SchoolGrade::from_label("9º Ano EF"), Some(SchoolGrade::Ano9Ef));
        assert_eq!(SchoolGrade::from_label("8º Ano EF"), None);
    }

    #[test]
    fn test_grade_band() {
        assert_eq!(SchoolGrade::Ano9Ef.band(), GradeBand::Fundamental);
        assert_eq!(SchoolGrade::Serie2Em.band(), GradeBand::Medio);
    }

    #[test]
    fn test_weak_subjects_uses_strict_threshold() {
        let analysis = AnalysisData {
            school_grade: SchoolGrade::Serie3Em,
            bimester: Bimester::First,
            performance: vec![
                SubjectPerformance { subject: "Matemática".to_string(), grade: 40.0 },
                SubjectPerformance { subject: "Física".to_string(), grade: 60.0 },
                SubjectPerformance { subject: "Português".to_string(), grade: 90.0 },
            ],
        };

        assert_eq!(analysis.weak_subjects(60.0), vec!["Matemática".to_string()]);
        assert!(analysis.has_low_grades());
    }

    #[test]
    fn test_video_serializes_with_display_source() {
        let video = Video {
            id: "v1".to_string(),
            title: "Título".to_string(),
            description: String::new(),
            thumbnail_url: String::new(),
            video_url: "https://www.youtube.com/watch?v=R088uR4N6lY".to_string(),
            subject: "Matemática".to_string(),
            grade_levels: vec![SchoolGrade::Ano9Ef],
            source: VideoSource::GoiasTec,
            justification: None,
        };

        let value = serde_json::to_value(&video).unwrap();
        assert_eq!(value["source"], "GoiásTec");
        assert_eq!(value["gradeLevels"][0], "9º Ano EF");
        assert!(value.get("justification").is_none());
    }

    #[test]
    fn test_first_name() {
        let student = Student {
            registration: "1".to_string(),
            name: "Ana Beatriz Souza".to_string(),
            school_grade: SchoolGrade::Serie3Em,
            school: String::new(),
            city: String::new(),
            class_name: String::new(),
            shift: String::new(),
        };
        assert_eq!(student.first_name(), "Ana");
    }
}

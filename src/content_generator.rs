use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::AiError;
use crate::llm_providers::JsonResponseParser;
use crate::llm_service::AiContext;
use crate::models::{
    AnalysisData, DEFAULT_SUBJECT_PERFORMANCE_THRESHOLD, Quiz, QuizDifficulty, QuizQuestion,
    Student, Video,
};

use crate::log_ai_operation;

pub const QUIZ_QUESTION_COUNT: usize = 3;
pub const QUIZ_OPTION_COUNT: usize = 4;

pub const ENRICHMENT_JUSTIFICATION: &str =
    "Este vídeo é recomendado para expandir seus conhecimentos sobre o tema!";

/// Output of an AI-backed operation: either model text or a deterministic stand-in
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum Generated<T> {
    Ai { value: T },
    Fallback { value: T, reason: String },
}

impl<T> Generated<T> {
    pub fn ai(value: T) -> Self {
        Generated::Ai { value }
    }

    pub fn fallback(value: T, reason: impl Into<String>) -> Self {
        Generated::Fallback {
            value,
            reason: reason.into(),
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Generated::Ai { value } | Generated::Fallback { value, .. } => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Generated::Ai { value } | Generated::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Generated::Fallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            Generated::Fallback { reason, .. } => Some(reason),
            Generated::Ai { .. } => None,
        }
    }
}

/// Quiz element exactly as the model is asked to return it
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuizQuestion {
    question: String,
    options: Vec<String>,
    correct_answer: String,
    explanation: String,
}

/// Quizzes, recommendation justifications and performance summaries.
///
/// None of these operations fail: when the model is unavailable or answers
/// with something unusable, a template built from the inputs is returned
/// as [`Generated::Fallback`].
#[derive(Clone)]
pub struct ContentGenerator {
    ai: AiContext,
    json_parser: JsonResponseParser,
}

impl ContentGenerator {
    pub fn new(ai: AiContext) -> Self {
        Self {
            ai,
            json_parser: JsonResponseParser,
        }
    }

    pub fn is_ai_configured(&self) -> bool {
        self.ai.is_configured()
    }

    pub async fn generate_quiz_for_video(
        &self,
        video_title: &str,
        video_subject: &str,
        difficulty: QuizDifficulty,
    ) -> Generated<Option<Quiz>> {
        let prompt = build_quiz_prompt(video_title, video_subject, difficulty);

        let result = match self.ai.generate("quiz", &prompt).await {
            Ok(text) => {
                debug!(response_length = text.len(), "Raw quiz response received");
                parse_quiz_response(&self.json_parser, &text)
            }
            Err(err) => Err(err),
        };

        match result {
            Ok(questions) => {
                info!(
                    video_title = %video_title,
                    difficulty = difficulty.label(),
                    question_count = questions.len(),
                    "Generated quiz"
                );
                Generated::ai(Some(Quiz { difficulty, questions }))
            }
            Err(err) => {
                log_ai_operation!(fallback, "quiz", reason = err);
                Generated::fallback(None, err.to_string())
            }
        }
    }

    pub async fn generate_video_justification(
        &self,
        video: &Video,
        analysis: &AnalysisData,
    ) -> Generated<String> {
        let weak_subjects = analysis.weak_subjects(DEFAULT_SUBJECT_PERFORMANCE_THRESHOLD);
        let weak_list = if weak_subjects.is_empty() {
            "Nenhuma dificuldade específica destacada, mas buscando aprendizado geral".to_string()
        } else {
            weak_subjects.join(", ")
        };

        let prompt = format!(
            r#"O aluno está na {}, {}.
Suas dificuldades identificadas (notas abaixo de {}/100) são em: {}.
O vídeo recomendado é "{}" sobre {}.
Gere uma justificativa curta e motivadora (2-3 frases) explicando por que este vídeo é uma boa recomendação para este aluno, conectando com suas possíveis dificuldades ou com a relevância do tema para sua série/ano.
Seja amigável e encorajador."#,
            analysis.school_grade.label(),
            analysis.bimester.label(),
            DEFAULT_SUBJECT_PERFORMANCE_THRESHOLD,
            weak_list,
            video.title,
            video.subject,
        );

        match self.ai.generate("justification", &prompt).await.and_then(non_blank) {
            Ok(text) => Generated::ai(text),
            Err(err) => {
                log_ai_operation!(fallback, "justification", reason = err);
                let is_weak = weak_subjects.iter().any(|s| video.matches_subject(s));
                Generated::fallback(fallback_justification(&video.subject, is_weak), err.to_string())
            }
        }
    }

    pub async fn generate_performance_summary(
        &self,
        student: &Student,
        analysis: &AnalysisData,
    ) -> Generated<String> {
        let grades_text = analysis
            .performance
            .iter()
            .map(|p| format!("{}: {:.1}/10", p.subject, p.grade / 10.0))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            r#"Aja como um conselheiro pedagógico amigável e motivador.
O(A) aluno(a) se chama {} e está na {}. Os resultados são do {}.

Aqui estão as notas do(a) aluno(a):
{}

Com base nessas notas (escala de 0 a 10), escreva um breve resumo de desempenho em 2 parágrafos:
1. Primeiro parágrafo: comece com um elogio, destacando as 2-3 disciplinas com as notas mais altas.
2. Segundo parágrafo: de forma construtiva e encorajadora, aponte as 1-2 disciplinas que precisam de mais atenção (especialmente abaixo de 6.0). Evite linguagem negativa e termine com uma frase motivacional.

Seja conciso, positivo e direto."#,
            student.first_name(),
            student.school_grade.label(),
            analysis.bimester.label(),
            grades_text,
        );

        match self.ai.generate("summary", &prompt).await.and_then(non_blank) {
            Ok(text) => Generated::ai(text),
            Err(err) => {
                log_ai_operation!(fallback, "summary", reason = err);
                Generated::fallback(fallback_summary(student, analysis), err.to_string())
            }
        }
    }
}

fn non_blank(text: String) -> Result<String, AiError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(AiError::InvalidResponse("empty text".to_string()))
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn build_quiz_prompt(video_title: &str, video_subject: &str, difficulty: QuizDifficulty) -> String {
    let mut prompt = format!(
        r#"Crie um quiz de nível {} sobre o tópico "{}" da disciplina de {}.
O quiz deve ter {} perguntas de múltipla escolha, cada uma com {} opções (A, B, C, D) e apenas uma correta.
Forneça a resposta correta e uma breve explicação para cada pergunta.
Responda APENAS com um array JSON de objetos, onde cada objeto tem os campos: "question" (string), "options" (array de 4 strings), "correctAnswer" (string, uma das opções), e "explanation" (string).
Exemplo de formato para uma pergunta:
{{
  "question": "Qual é a capital da França?",
  "options": ["Berlim", "Madri", "Paris", "Lisboa"],
  "correctAnswer": "Paris",
  "explanation": "Paris é a capital e maior cidade da França."
}}
"#,
        difficulty.label(),
        video_title,
        video_subject,
        QUIZ_QUESTION_COUNT,
        QUIZ_OPTION_COUNT,
    );

    match difficulty {
        QuizDifficulty::Advanced => prompt.push_str(
            "\nAs perguntas avançadas devem exigir um pensamento mais crítico ou conhecimento mais profundo sobre o tema.",
        ),
        QuizDifficulty::Beginner => prompt.push_str(
            "\nAs perguntas iniciantes devem ser sobre conceitos fundamentais do tema.",
        ),
        QuizDifficulty::Intermediate => {}
    }

    prompt
}

/// Parse and validate a quiz reply. Extra questions are dropped; an empty
/// list or a question without four options is rejected.
pub fn parse_quiz_response(parser: &JsonResponseParser, text: &str) -> Result<Vec<QuizQuestion>, AiError> {
    let raw: Vec<RawQuizQuestion> = parser.parse_json_response(text)?;

    if raw.is_empty() {
        return Err(AiError::InvalidResponse("quiz has no questions".to_string()));
    }

    raw.into_iter()
        .take(QUIZ_QUESTION_COUNT)
        .enumerate()
        .map(|(index, q)| {
            if q.options.len() != QUIZ_OPTION_COUNT {
                return Err(AiError::InvalidResponse(format!(
                    "question {} has {} options, expected {}",
                    index + 1,
                    q.options.len(),
                    QUIZ_OPTION_COUNT
                )));
            }
            if q.question.trim().is_empty() || q.correct_answer.trim().is_empty() {
                return Err(AiError::InvalidResponse(format!(
                    "question {} is missing text or answer",
                    index + 1
                )));
            }
            Ok(QuizQuestion {
                question: q.question,
                options: q.options,
                correct_answer: q.correct_answer,
                explanation: q.explanation,
            })
        })
        .collect()
}

pub fn fallback_justification(subject: &str, is_weak_subject: bool) -> String {
    if is_weak_subject {
        format!(
            "Este vídeo de {} foi escolhido para reforçar os pontos em que você pode melhorar. Assista com calma e refaça os exemplos, você consegue!",
            subject
        )
    } else {
        ENRICHMENT_JUSTIFICATION.to_string()
    }
}

/// Two-paragraph summary built only from the grades
pub fn fallback_summary(student: &Student, analysis: &AnalysisData) -> String {
    let first_name = student.first_name();
    let bimester = analysis.bimester.label();

    if analysis.performance.is_empty() {
        return format!(
            "Olá, {}! Ainda não há notas registradas para o {}.\n\nContinue se esforçando, você está no caminho certo!",
            first_name, bimester
        );
    }

    let mut ranked: Vec<_> = analysis.performance.iter().collect();
    ranked.sort_by(|a, b| b.grade.total_cmp(&a.grade));

    let top: Vec<String> = ranked
        .iter()
        .take(3)
        .map(|p| format!("{} ({:.1})", p.subject, p.grade / 10.0))
        .collect();

    let needs_attention: Vec<String> = ranked
        .iter()
        .rev()
        .filter(|p| p.grade < DEFAULT_SUBJECT_PERFORMANCE_THRESHOLD)
        .take(2)
        .map(|p| p.subject.clone())
        .collect();

    let first_paragraph = format!(
        "Olá, {}! No {}, seus destaques foram {}. Parabéns pelo empenho nessas disciplinas!",
        first_name,
        bimester,
        join_portuguese(&top)
    );

    let second_paragraph = if needs_attention.is_empty() {
        "Todas as suas notas estão acima de 6.0. Continue com essa dedicação, você está no caminho certo!"
            .to_string()
    } else {
        format!(
            "Vale a pena dedicar um pouco mais de atenção a {}. Focar nessas matérias pode trazer ótimos resultados. Continue se esforçando, você está no caminho certo!",
            join_portuguese(&needs_attention)
        )
    };

    format!("{}\n\n{}", first_paragraph, second_paragraph)
}

/// "A", "A e B", "A, B e C"
pub fn join_portuguese(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} e {}", init.join(", "), last),
    }
}

use std::sync::OnceLock;
use tracing::debug;

use crate::errors::LoginError;
use crate::models::{
    AnalysisData, Bimester, BimesterComparison, SchoolGrade, Student, StudentGradeRecord,
    SubjectComparison, SubjectPerformance,
};

/// Read-only students and their published grades (0-10 scale)
#[derive(Debug, Clone, Default)]
pub struct Roster {
    students: Vec<Student>,
    grades: Vec<StudentGradeRecord>,
}

fn student(
    registration: &str,
    name: &str,
    school_grade: SchoolGrade,
    class_name: &str,
    shift: &str,
) -> Student {
    Student {
        registration: registration.to_string(),
        name: name.to_string(),
        school_grade,
        school: "Colégio Estadual Professora Maria Aparecida".to_string(),
        city: "Goiânia".to_string(),
        class_name: class_name.to_string(),
        shift: shift.to_string(),
    }
}

fn report_card(registration: &str, bimester: u8, scores: &[(&str, &str, f64)]) -> Vec<StudentGradeRecord> {
    scores
        .iter()
        .map(|(code, subject, score)| StudentGradeRecord {
            registration: registration.to_string(),
            subject_code: code.to_string(),
            subject: subject.to_string(),
            bimester,
            score: *score,
        })
        .collect()
}

impl Roster {
    pub fn new(students: Vec<Student>, grades: Vec<StudentGradeRecord>) -> Self {
        Self { students, grades }
    }

    /// The school's published roster
    pub fn builtin() -> &'static Roster {
        static ROSTER: OnceLock<Roster> = OnceLock::new();
        ROSTER.get_or_init(|| {
            let students = vec![
                student("20231001", "Ana Beatriz Souza", SchoolGrade::Serie3Em, "3ª Série A", "Matutino"),
                student("20241002", "Carlos Eduardo Lima", SchoolGrade::Ano9Ef, "9º Ano B", "Vespertino"),
                student("20241003", "Mariana Costa Alves", SchoolGrade::Serie1Em, "1ª Série C", "Matutino"),
            ];

            let mut grades = Vec::new();
            grades.extend(report_card("20231001", 1, &[
                ("MAT", "Matemática", 4.0),
                ("POR", "Português", 9.0),
                ("FIS", "Física", 5.5),
                ("QUI", "Química", 7.0),
                ("BIO", "Biologia", 6.5),
                ("HIS", "História", 8.5),
                ("GEO", "Geografia", 7.5),
                ("FIL", "Filosofia", 8.0),
                ("SOC", "Sociologia", 8.0),
                ("ING", "Inglês", 7.0),
            ]));
            grades.extend(report_card("20231001", 2, &[
                ("MAT", "Matemática", 5.0),
                ("POR", "Português", 9.5),
                ("FIS", "Física", 6.0),
                ("QUI", "Química", 7.5),
                ("BIO", "Biologia", 7.0),
                ("HIS", "História", 8.0),
                ("GEO", "Geografia", 7.0),
                ("FIL", "Filosofia", 8.5),
                ("SOC", "Sociologia", 8.0),
                ("ING", "Inglês", 7.5),
            ]));
            grades.extend(report_card("20241002", 1, &[
                ("POR", "Português", 7.0),
                ("MAT", "Matemática", 5.0),
                ("CIE", "Ciências", 6.0),
                ("HIS", "História", 8.0),
                ("GEO", "Geografia", 5.5),
                ("ING", "Inglês", 9.0),
            ]));
            grades.extend(report_card("20241002", 2, &[
                ("POR", "Português", 7.5),
                ("MAT", "Matemática", 6.0),
                ("CIE", "Ciências", 6.5),
                ("HIS", "História", 8.0),
                ("ING", "Inglês", 9.0),
            ]));
            grades.extend(report_card("20241003", 1, &[
                ("POR", "Português", 8.0),
                ("MAT", "Matemática", 9.0),
                ("FIS", "Física", 8.5),
                ("QUI", "Química", 7.5),
                ("BIO", "Biologia", 8.0),
                ("HIS", "História", 7.0),
            ]));

            Roster::new(students, grades)
        })
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn find_student(&self, registration: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.registration == registration)
    }

    /// The password is the registration itself
    pub fn login(&self, registration: &str, password: &str) -> Result<&Student, LoginError> {
        let registration = registration.trim();
        let password = password.trim();

        if registration.is_empty() || password.is_empty() {
            return Err(LoginError::MissingCredentials);
        }
        if registration != password {
            return Err(LoginError::InvalidCredentials);
        }

        self.find_student(registration).ok_or(LoginError::InvalidCredentials)
    }

    /// Grades for one bimester on the 0-100 scale, in record order
    pub fn performance_for(&self, registration: &str, bimester: Bimester) -> Vec<SubjectPerformance> {
        self.grades
            .iter()
            .filter(|g| g.registration == registration && g.bimester == bimester.number())
            .map(|g| SubjectPerformance {
                subject: g.subject.clone(),
                grade: g.score * 10.0,
            })
            .collect()
    }

    pub fn analyze(&self, student: &Student, bimester: Bimester) -> AnalysisData {
        let performance = self.performance_for(&student.registration, bimester);
        debug!(
            registration = %student.registration,
            bimester = bimester.number(),
            subjects = performance.len(),
            "Built bimester analysis"
        );

        AnalysisData {
            school_grade: student.school_grade,
            bimester,
            performance,
        }
    }

    /// Side-by-side grades for two bimesters; a subject missing from one side counts as 0
    pub fn compare_bimesters(&self, student: &Student, first: Bimester, second: Bimester) -> BimesterComparison {
        let mut subjects: Vec<SubjectComparison> = Vec::new();

        for record in self.grades.iter().filter(|g| g.registration == student.registration) {
            let in_first = record.bimester == first.number();
            let in_second = record.bimester == second.number();
            if !in_first && !in_second {
                continue;
            }

            let index = match subjects.iter().position(|s| s.subject == record.subject) {
                Some(index) => index,
                None => {
                    subjects.push(SubjectComparison {
                        subject: record.subject.clone(),
                        first_bimester: 0.0,
                        second_bimester: 0.0,
                    });
                    subjects.len() - 1
                }
            };

            // Both sides are filled when the same bimester is compared with itself
            if in_first {
                subjects[index].first_bimester = record.score * 10.0;
            }
            if in_second {
                subjects[index].second_bimester = record.score * 10.0;
            }
        }

        let (first_average, second_average) = if subjects.is_empty() {
            (0.0, 0.0)
        } else {
            let count = subjects.len() as f64;
            (
                subjects.iter().map(|s| s.first_bimester).sum::<f64>() / count,
                subjects.iter().map(|s| s.second_bimester).sum::<f64>() / count,
            )
        };

        BimesterComparison {
            first,
            second,
            subjects,
            first_average,
            second_average,
            difference: second_average - first_average,
        }
    }
}

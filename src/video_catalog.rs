use std::sync::OnceLock;
use tracing::debug;

use crate::models::{SchoolGrade, Video, VideoSource};

/// Catalog entry as curated, with grade labels that may include grades the service does not cover
pub struct RawVideo {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub thumbnail_url: &'static str,
    pub video_url: &'static str,
    pub subject: &'static str,
    pub grade_labels: &'static [&'static str],
    pub source: VideoSource,
}

const SUBJECTS_FUNDAMENTAL: &[&str] = &[
    "Português", "Matemática", "Ciências", "História", "Geografia", "Inglês", "Física", "Química", "Biologia",
];

const SUBJECTS_MEDIO: &[&str] = &[
    "Português", "Matemática", "Física", "Química", "Biologia", "História", "Geografia", "Filosofia", "Sociologia", "Inglês",
];

pub const RAW_VIDEOS: &[RawVideo] = &[
    RawVideo {
        id: "gt9_mat_1",
        title: "Equações de 2º Grau - Aula Completa (10/02) (9º ANO)",
        description: "Aprenda tudo sobre equações do segundo grau, fórmula de Bhaskara e resolução de problemas.",
        thumbnail_url: "https://i.ytimg.com/vi/R088uR4N6lY/hqdefault.jpg",
        video_url: "https://www.youtube.com/watch?v=R088uR4N6lY&list=PLwBABA4s6M7fQc_v4qO5f7_Z9k8nJ6L5t",
        subject: "Matemática",
        grade_labels: &["9º Ano EF"],
        source: VideoSource::GoiasTec,
    },
    RawVideo {
        id: "gt9_port_1",
        title: "Orações Coordenadas e Subordinadas - Revisão (15/03) (9º ANO)",
        description: "Revise os tipos de orações e como identificá-las em textos.",
        thumbnail_url: "https://i.ytimg.com/vi/videoseries?list=PLwBABA4s6M7e-8w9xY5Z_zO9u7L4k3J7m&index=2&random=2",
        video_url: "https://www.youtube.com/watch?v=videoseries&list=PLwBABA4s6M7e-8w9xY5Z_zO9u7L4k3J7m",
        subject: "Português",
        grade_labels: &["9º Ano EF"],
        source: VideoSource::GoiasTec,
    },
    RawVideo {
        id: "gt8_cie_1",
        title: "Ciências - Sistema Solar (8º ANO)",
        description: "Planetas, satélites e os movimentos da Terra.",
        thumbnail_url: "https://i.ytimg.com/vi/5nYhKqV3Jt0/hqdefault.jpg",
        video_url: "https://www.youtube.com/watch?v=5nYhKqV3Jt0",
        subject: "Ciências",
        grade_labels: &["8º Ano EF"],
        source: VideoSource::GoiasTec,
    },
    RawVideo {
        id: "gt9_cie_1",
        title: "Ciências - Transformações da Matéria (8º e 9º ANO)",
        description: "Estados físicos, misturas e transformações químicas do dia a dia.",
        thumbnail_url: "https://i.ytimg.com/vi/qX3mVb0a2kE/hqdefault.jpg",
        video_url: "https://www.youtube.com/watch?v=qX3mVb0a2kE",
        subject: "Ciências",
        grade_labels: &["8º Ano EF", "9º Ano EF"],
        source: VideoSource::GoiasTec,
    },
    RawVideo {
        id: "gt1_fis_1",
        title: "Introdução à Cinemática - MRU e MRUV (25/04) (1ª SÉRIE EM)",
        description: "Conceitos básicos de cinemática, movimento retilíneo uniforme e uniformemente variado.",
        thumbnail_url: "https://i.ytimg.com/vi/gXWXkS2t0sM/hqdefault.jpg",
        video_url: "https://www.youtube.com/watch?v=gXWXkS2t0sM&list=PLwBABA4s6M7dPc0xR_T8fU_wI9yS5K_oP",
        subject: "Física",
        grade_labels: &["1ª Série EM"],
        source: VideoSource::GoiasTec,
    },
    RawVideo {
        id: "gt1_qui_1",
        title: "Modelos Atômicos - Dalton, Thomson, Rutherford, Bohr (10/05) (1ª SÉRIE EM)",
        description: "Evolução dos modelos atômicos e suas características.",
        thumbnail_url: "https://i.ytimg.com/vi/videoseries?list=PLwBABA4s6M7cK_l_m_nJ8hP_tQ_eR2Y_z&index=4&random=4",
        video_url: "https://www.youtube.com/watch?v=videoseries&list=PLwBABA4s6M7cK_l_m_nJ8hP_tQ_eR2Y_z",
        subject: "Química",
        grade_labels: &["1ª Série EM"],
        source: VideoSource::GoiasTec,
    },
    RawVideo {
        id: "gt2_bio_1",
        title: "Genética Mendeliana - Leis de Mendel (05/06) (2ª SÉRIE EM)",
        description: "Explore as leis fundamentais da hereditariedade propostas por Gregor Mendel.",
        thumbnail_url: "https://i.ytimg.com/vi/videoseries?list=PLwBABA4s6M7fG_h_J_kL9oP_x_T_wR_yQ&random=5",
        video_url: "https://www.youtube.com/watch?v=videoseries&list=PLwBABA4s6M7fG_h_J_kL9oP_x_T_wR_yQ",
        subject: "Biologia",
        grade_labels: &["2ª Série EM"],
        source: VideoSource::GoiasTec,
    },
    RawVideo {
        id: "gt2_qui_1",
        title: "QUÍMICA - SOLUÇÕES: CONCEITOS E CLASSIFICAÇÕES - AULA 01 (15/05) (2ª Série)",
        description: "Introdução ao estudo de soluções químicas, seus conceitos e classificações.",
        thumbnail_url: "https://i.ytimg.com/vi/7BMQn6nN0hM/hqdefault.jpg",
        video_url: "https://www.youtube.com/watch?v=7BMQn6nN0hM&list=PLwBABA4s6M7dE_X_yZ_wQ_v_Y_sP_l_K_j&index=1",
        subject: "Química",
        grade_labels: &["2ª Série EM"],
        source: VideoSource::GoiasTec,
    },
    RawVideo {
        id: "gt3_hist_1",
        title: "HISTÓRIA - A CRISE DE 1929 E SEUS REFLEXOS NO BRASIL - AULA 01 (05/08) (3ª Série)",
        description: "Análise da Crise de 1929 e como ela impactou o Brasil.",
        thumbnail_url: "https://i.ytimg.com/vi/3gZzY2qQwSs/hqdefault.jpg",
        video_url: "https://www.youtube.com/watch?v=3gZzY2qQwSs&list=PLwBABA4s6M7eP_q_R_tY_sW_z_X_l_I_u&index=1",
        subject: "História",
        grade_labels: &["3ª Série EM"],
        source: VideoSource::GoiasTec,
    },
    RawVideo {
        id: "gt3_qui_termoquimica",
        title: "QUÍMICA - TERMOQUÍMICA: ENTALPIA E LEI DE HESS - AULA 01 (12/08) (3ª Série)",
        description: "Aprenda sobre Termoquímica, incluindo conceitos de entalpia, reações exotérmicas, endotérmicas e a Lei de Hess. Conteúdo do GoiásTec para a 3ª Série do Ensino Médio.",
        thumbnail_url: "https://i.ytimg.com/vi/FqX3qLwN84Y/hqdefault.jpg",
        video_url: "https://www.youtube.com/watch?v=FqX3qLwN84Y",
        subject: "Química",
        grade_labels: &["3ª Série EM"],
        source: VideoSource::GoiasTec,
    },
    RawVideo {
        id: "gt3_qui_velocidade",
        title: "QUÍMICA - VELOCIDADE DAS REAÇÕES - AULA 02 (20/10) (3ª Série)",
        description: "Entenda os fatores que influenciam a velocidade das reações químicas. Conteúdo do GoiásTec para a 3ª Série do Ensino Médio.",
        thumbnail_url: "https://i.ytimg.com/vi/9_b3oY7s6c4/hqdefault.jpg",
        video_url: "https://www.youtube.com/watch?v=9_b3oY7s6c4",
        subject: "Química",
        grade_labels: &["3ª Série EM"],
        source: VideoSource::GoiasTec,
    },
    RawVideo {
        id: "gt3_qui_equilibrio",
        title: "QUÍMICA - EQUILÍBRIO QUÍMICO - AULA 03 (25/10) (3ª Série)",
        description: "Estude o conceito de equilíbrio químico e as constantes Kc e Kp. Conteúdo do GoiásTec para a 3ª Série do Ensino Médio.",
        thumbnail_url: "https://i.ytimg.com/vi/G8m1tq3h8y8/hqdefault.jpg",
        video_url: "https://www.youtube.com/watch?v=G8m1tq3h8y8",
        subject: "Química",
        grade_labels: &["3ª Série EM"],
        source: VideoSource::GoiasTec,
    },
    RawVideo {
        id: "gt3_bio_genetica_conceitos",
        title: "BIOLOGIA - GENÉTICA: CONCEITOS BÁSICOS - AULA 01 (10/09) (3ª Série)",
        description: "Introdução aos conceitos fundamentais da Genética. Conteúdo do GoiásTec para a 3ª Série do Ensino Médio.",
        thumbnail_url: "https://i.ytimg.com/vi/L2g_sM8rJ8g/hqdefault.jpg",
        video_url: "https://www.youtube.com/watch?v=L2g_sM8rJ8g",
        subject: "Biologia",
        grade_labels: &["3ª Série EM"],
        source: VideoSource::GoiasTec,
    },
    RawVideo {
        id: "yt_yfl5OSnLpSc",
        title: "Geopolítica Mundial e Conflitos Contemporâneos",
        description: "Uma análise aprofundada da geopolítica atual, globalização e os principais focos de tensão no mundo. Essencial para o 3º ano do Ensino Médio.",
        thumbnail_url: "https://i.ytimg.com/vi/yfl5OSnLpSc/hqdefault.jpg",
        video_url: "https://www.youtube.com/watch?v=yfl5OSnLpSc",
        subject: "Geografia",
        grade_labels: &["3ª Série EM"],
        source: VideoSource::Other,
    },
    RawVideo {
        id: "yt_2cBoGIraLgE",
        title: "Blocos Econômicos e a Nova Ordem Mundial",
        description: "Entenda a formação e o papel dos blocos econômicos como Mercosul, União Europeia e APEC na economia globalizada.",
        thumbnail_url: "https://i.ytimg.com/vi/2cBoGIraLgE/hqdefault.jpg",
        video_url: "https://www.youtube.com/watch?v=2cBoGIraLgE",
        subject: "Geografia",
        grade_labels: &["3ª Série EM"],
        source: VideoSource::Other,
    },
    RawVideo {
        id: "yt_Yln0xSwRVtQ",
        title: "Fontes de Energia (Vestibular) (18/02)",
        description: "Aprenda sobre fontes de energia renováveis e não renováveis, matriz energética brasileira e mundial e seus impactos ambientais.",
        thumbnail_url: "https://i.ytimg.com/vi/Yln0xSwRVtQ/hqdefault.jpg",
        video_url: "https://www.youtube.com/watch?v=Yln0xSwRVtQ",
        subject: "Geografia",
        grade_labels: &["3ª Série EM"],
        source: VideoSource::GoiasTec,
    },
    RawVideo {
        id: "yt_99tWmYj2Dn0",
        title: "Conflitos no Campo e Questão Agrária (Vestibular)",
        description: "Estude a estrutura fundiária no Brasil, os movimentos sociais no campo e os principais conflitos agrários da história.",
        thumbnail_url: "https://i.ytimg.com/vi/99tWmYj2Dn0/hqdefault.jpg",
        video_url: "https://www.youtube.com/watch?v=99tWmYj2Dn0",
        subject: "Geografia",
        grade_labels: &["3ª Série EM"],
        source: VideoSource::Other,
    },
    RawVideo {
        id: "yt_nnn0WieX35o",
        title: "Genética Molecular: DNA, RNA e Síntese Proteica",
        description: "Aprofunde-se no dogma central da biologia, entendendo a replicação do DNA, transcrição e tradução para a síntese de proteínas.",
        thumbnail_url: "https://i.ytimg.com/vi/nnn0WieX35o/hqdefault.jpg",
        video_url: "https://www.youtube.com/watch?v=nnn0WieX35o",
        subject: "Biologia",
        grade_labels: &["3ª Série EM"],
        source: VideoSource::Other,
    },
    RawVideo {
        id: "yt_RPFwM1aLycw",
        title: "1ª Lei de Mendel (Vestibular)",
        description: "Compreenda a Primeira Lei de Mendel (Lei da Segregação) e os conceitos básicos de hereditariedade, como alelos, genótipo e fenótipo.",
        thumbnail_url: "https://i.ytimg.com/vi/RPFwM1aLycw/hqdefault.jpg",
        video_url: "https://www.youtube.com/watch?v=RPFwM1aLycw",
        subject: "Biologia",
        grade_labels: &["3ª Série EM", "2ª Série EM"],
        source: VideoSource::Other,
    },
    RawVideo {
        id: "yt_joYg7Ff9Dtw",
        title: "Grupos Sanguíneos e Fator Rh (Vestibular)",
        description: "Estude os sistemas sanguíneos ABO e Rh, a genética envolvida, e a importância da compatibilidade para transfusões de sangue.",
        thumbnail_url: "https://i.ytimg.com/vi/joYg7Ff9Dtw/hqdefault.jpg",
        video_url: "https://www.youtube.com/watch?v=joYg7Ff9Dtw",
        subject: "Biologia",
        grade_labels: &["3ª Série EM", "2ª Série EM"],
        source: VideoSource::Other,
    },
    RawVideo {
        id: "yt_fWrY94eeqqo",
        title: "Herança Ligada ao Sexo (Vestibular)",
        description: "Aprenda como características são herdadas através dos cromossomos sexuais, estudando casos como daltonismo e hemofilia.",
        thumbnail_url: "https://i.ytimg.com/vi/fWrY94eeqqo/hqdefault.jpg",
        video_url: "https://www.youtube.com/watch?v=fWrY94eeqqo",
        subject: "Biologia",
        grade_labels: &["3ª Série EM"],
        source: VideoSource::Other,
    },
    RawVideo {
        id: "yt_wGR1IF93mz0",
        title: "Deslocamento de Equilíbrio: Le Chatelier (Vestibular)",
        description: "Estude o Princípio de Le Chatelier para prever como mudanças de concentração, pressão e temperatura afetam um sistema em equilíbrio.",
        thumbnail_url: "https://i.ytimg.com/vi/wGR1IF93mz0/hqdefault.jpg",
        video_url: "https://www.youtube.com/watch?v=wGR1IF93mz0",
        subject: "Química",
        grade_labels: &["3ª Série EM", "2ª Série EM"],
        source: VideoSource::Other,
    },
    RawVideo {
        id: "yt_GeT43CUA1Sg",
        title: "Equilíbrio Iônico da Água: pH e pOH (Vestibular)",
        description: "Aprenda sobre o produto iônico da água e como calcular o pH e o pOH para determinar a acidez ou basicidade de soluções.",
        thumbnail_url: "https://i.ytimg.com/vi/GeT43CUA1Sg/hqdefault.jpg",
        video_url: "https://www.youtube.com/watch?v=GeT43CUA1Sg",
        subject: "Química",
        grade_labels: &["3ª Série EM", "2ª Série EM"],
        source: VideoSource::Other,
    },
];

/// Keep only recognized grades on each entry; entries left without any grade are dropped
pub fn filter_by_allowed_grades(raw: &[RawVideo]) -> Vec<Video> {
    raw.iter()
        .filter_map(|entry| {
            let grade_levels: Vec<SchoolGrade> = entry
                .grade_labels
                .iter()
                .filter_map(|label| SchoolGrade::from_label(label))
                .collect();

            if grade_levels.is_empty() {
                debug!(video_id = entry.id, "Dropping catalog entry without a supported grade");
                return None;
            }

            Some(Video {
                id: entry.id.to_string(),
                title: entry.title.to_string(),
                description: entry.description.to_string(),
                thumbnail_url: entry.thumbnail_url.to_string(),
                video_url: entry.video_url.to_string(),
                subject: entry.subject.to_string(),
                grade_levels,
                source: entry.source,
                justification: None,
            })
        })
        .collect()
}

pub fn all_videos() -> &'static [Video] {
    static CATALOG: OnceLock<Vec<Video>> = OnceLock::new();
    CATALOG.get_or_init(|| filter_by_allowed_grades(RAW_VIDEOS))
}

/// Catalog videos for a grade, in catalog order
pub fn videos_for_grade(grade: SchoolGrade) -> Vec<Video> {
    all_videos()
        .iter()
        .filter(|video| video.grade_levels.contains(&grade))
        .cloned()
        .collect()
}

pub fn videos_for_subject(subject: &str, grade: Option<SchoolGrade>) -> Vec<Video> {
    all_videos()
        .iter()
        .filter(|video| video.matches_subject(subject))
        .filter(|video| grade.is_none_or(|g| video.grade_levels.contains(&g)))
        .cloned()
        .collect()
}

pub fn curated_videos() -> Vec<Video> {
    all_videos()
        .iter()
        .filter(|video| video.source.is_curated())
        .cloned()
        .collect()
}

pub fn find_by_id(id: &str) -> Option<&'static Video> {
    all_videos().iter().find(|video| video.id == id)
}

pub fn subjects_for_grade(grade: SchoolGrade) -> &'static [&'static str] {
    match grade {
        SchoolGrade::Ano9Ef => SUBJECTS_FUNDAMENTAL,
        _ => SUBJECTS_MEDIO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_video_has_a_recognized_grade() {
        assert!(!all_videos().is_empty());
        for video in all_videos() {
            assert!(!video.grade_levels.is_empty(), "{} has no grade", video.id);
        }
    }

    #[test]
    fn test_unsupported_grade_entries_are_dropped_or_trimmed() {
        assert!(find_by_id("gt8_cie_1").is_none());

        let mixed = find_by_id("gt9_cie_1").unwrap();
        assert_eq!(mixed.grade_levels, vec![SchoolGrade::Ano9Ef]);
        assert_eq!(all_videos().len(), RAW_VIDEOS.len() - 1);
    }

    #[test]
    fn test_lookups() {
        let ninth = videos_for_grade(SchoolGrade::Ano9Ef);
        assert!(ninth.iter().all(|v| v.grade_levels.contains(&SchoolGrade::Ano9Ef)));
        assert_eq!(ninth[0].id, "gt9_mat_1");

        let chemistry = videos_for_subject("química", Some(SchoolGrade::Serie2Em));
        assert!(chemistry.iter().any(|v| v.id == "gt2_qui_1"));
        assert!(chemistry.iter().all(|v| v.subject == "Química"));

        assert!(curated_videos().iter().all(|v| v.source == VideoSource::GoiasTec));
        assert!(videos_for_grade(SchoolGrade::Serie3Em).len() >= 9);
    }

    #[test]
    fn test_subjects_for_grade() {
        assert!(subjects_for_grade(SchoolGrade::Ano9Ef).contains(&"Ciências"));
        assert!(subjects_for_grade(SchoolGrade::Serie1Em).contains(&"Filosofia"));
        assert!(!subjects_for_grade(SchoolGrade::Serie1Em).contains(&"Ciências"));
    }
}

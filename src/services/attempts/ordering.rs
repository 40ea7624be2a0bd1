use rand::rngs::StdRng;
use rand::{seq::SliceRandom, SeedableRng};
use sha2::{Digest, Sha256};

use crate::repositories::attempt_store::SectionWithQuestions;

fn attempt_seed(attempt_id: &str) -> u64 {
    let digest = Sha256::digest(attempt_id.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Shuffles questions inside each section. Section order is kept, and the
/// same attempt id always yields the same order.
pub(crate) fn shuffle_questions(sections: &mut [SectionWithQuestions], attempt_id: &str) {
    let mut rng = StdRng::seed_from_u64(attempt_seed(attempt_id));
    for section in sections {
        section.questions.shuffle(&mut rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{ExamSection, Question, QuestionKind};

    fn section(id: &str, question_count: usize) -> SectionWithQuestions {
        let questions = (0..question_count)
            .map(|index| Question {
                id: format!("{id}-q{index}"),
                section_id: id.to_string(),
                exam_id: "e1".to_string(),
                content: format!("Question {index}"),
                points: 1.0,
                order_index: index as i32,
                kind: QuestionKind::OpenEnded { reference_answer: None },
            })
            .collect();
        SectionWithQuestions {
            section: ExamSection {
                id: id.to_string(),
                exam_id: "e1".to_string(),
                title: id.to_string(),
                description: None,
                order_index: 0,
            },
            questions,
        }
    }

    fn question_ids(sections: &[SectionWithQuestions]) -> Vec<Vec<String>> {
        sections
            .iter()
            .map(|item| item.questions.iter().map(|question| question.id.clone()).collect())
            .collect()
    }

    #[test]
    fn same_attempt_gets_same_order() {
        let mut first = vec![section("s1", 12), section("s2", 12)];
        let mut second = first.clone();

        shuffle_questions(&mut first, "attempt-1");
        shuffle_questions(&mut second, "attempt-1");

        assert_eq!(question_ids(&first), question_ids(&second));
    }

    #[test]
    fn questions_stay_in_their_section() {
        let mut sections = vec![section("s1", 8), section("s2", 8)];
        shuffle_questions(&mut sections, "attempt-2");

        assert_eq!(sections[0].section.id, "s1");
        assert!(sections[0].questions.iter().all(|question| question.section_id == "s1"));
        let mut ids = question_ids(&sections)[1].clone();
        ids.sort();
        let mut expected: Vec<String> = (0..8).map(|index| format!("s2-q{index}")).collect();
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn different_attempts_usually_differ() {
        let base = vec![section("s1", 20)];
        let orders: Vec<Vec<Vec<String>>> = ["a", "b", "c", "d"]
            .iter()
            .map(|attempt_id| {
                let mut sections = base.clone();
                shuffle_questions(&mut sections, attempt_id);
                question_ids(&sections)
            })
            .collect();

        assert!(orders.windows(2).any(|pair| pair[0] != pair[1]));
    }
}

use crate::models::Answer;
use crate::services::quiz::QuizError;

/// Final score of a completed session with its per-item breakdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSummary {
    pub correct_count: usize,
    pub total_count: usize,

    /// `round(100 * correct / total)`, halves rounded up
    pub percentage: u32,

    /// Every answer in the order the words were presented
    pub answers: Vec<Answer>,
}

impl QuizSummary {
    pub fn all_correct(&self) -> bool {
        self.correct_count == self.total_count
    }

    pub fn manual_count(&self) -> usize {
        self.answers.iter().filter(|a| a.manual_correction).count()
    }

    pub fn incorrect(&self) -> impl Iterator<Item = &Answer> {
        self.answers.iter().filter(|a| !a.correct)
    }
}

/// Aggregate a completed session's answers into a score.
///
/// Only meaningful after a non-empty session, so an empty slice is rejected.
pub fn summarize(answers: &[Answer]) -> Result<QuizSummary, QuizError> {
    if answers.is_empty() {
        return Err(QuizError::EmptyResult);
    }

    let total_count = answers.len();
    let correct_count = answers.iter().filter(|a| a.correct).count();
    let percentage = ((correct_count * 200 + total_count) / (total_count * 2)) as u32;

    Ok(QuizSummary {
        correct_count,
        total_count,
        percentage,
        answers: answers.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Word;

    fn answer(sv: &str, en: &str, user: &str, correct: bool, manual: bool) -> Answer {
        Answer {
            word: Word::new(sv, en),
            user_answer: user.to_string(),
            correct,
            manual_correction: manual,
        }
    }

    #[test]
    fn test_summarize_end_to_end_example() {
        let answers = vec![
            answer("hund", "dog", "dog", true, false),
            answer("katt", "cat", "horse", false, true),
        ];

        let summary = summarize(&answers).unwrap();

        assert_eq!(summary.correct_count, 1);
        assert_eq!(summary.total_count, 2);
        assert_eq!(summary.percentage, 50);
        assert!(!summary.all_correct());
        assert_eq!(summary.manual_count(), 1);
        assert!(summary.answers[1].manual_correction);
        assert_eq!(summary.incorrect().count(), 1);
    }

    #[test]
    fn test_percentage_rounding() {
        let two_of_three = vec![
            answer("a", "a", "a", true, false),
            answer("b", "b", "b", true, false),
            answer("c", "c", "x", false, false),
        ];
        assert_eq!(summarize(&two_of_three).unwrap().percentage, 67);

        let one_of_two = &two_of_three[1..];
        assert_eq!(summarize(one_of_two).unwrap().percentage, 50);

        let one_of_eight: Vec<Answer> = (0..8)
            .map(|i| answer("w", "w", "w", i == 0, false))
            .collect();
        // 12.5 rounds up
        assert_eq!(summarize(&one_of_eight).unwrap().percentage, 13);
    }

    #[test]
    fn test_all_correct() {
        let summary = summarize(&[answer("hund", "dog", "Dog", true, false)]).unwrap();
        assert!(summary.all_correct());
        assert_eq!(summary.percentage, 100);
    }

    #[test]
    fn test_empty_answers_rejected() {
        assert_eq!(summarize(&[]), Err(QuizError::EmptyResult));
    }
}

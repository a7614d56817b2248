use std::collections::HashSet;

use rand::SeedableRng;
use rand::rngs::StdRng;

use quiz_core::model::{BankParser, OptionKey, QuestionOptions, QuestionRecord, QuizMode};
use quiz_core::time::fixed_clock;
use services::{ExhaustionReset, QuizEngine, SessionState, SessionStore};

/// `question|a|b|c|d|answer` per line, answers given as 1-4.
struct PipeParser;

impl BankParser for PipeParser {
    fn parse(&self, raw: &str) -> Vec<QuestionRecord> {
        raw.lines()
            .filter_map(|line| {
                let parts: Vec<&str> = line.split('|').map(str::trim).collect();
                let [text, a, b, c, d, answer] = parts.as_slice() else {
                    return None;
                };
                let correct = OptionKey::ALL[answer.parse::<usize>().ok()?.checked_sub(1)?];
                Some((text.to_string(), [a, b, c, d].map(|s| s.to_string()), correct))
            })
            .enumerate()
            .map(|(i, (text, options, correct))| {
                QuestionRecord::new(text, QuestionOptions::from_texts(options), correct, i)
            })
            .collect()
    }

    fn title(&self, raw: &str) -> Option<String> {
        raw.lines()
            .next()
            .and_then(|l| l.strip_prefix("title:"))
            .map(str::to_string)
    }
}

fn bank(n: usize) -> String {
    let mut raw = String::from("title: Physics\n");
    for i in 0..n {
        raw.push_str(&format!("Q{i}|w|r|w|w|2\n"));
    }
    raw
}

#[test]
fn random_limited_covers_bank_before_repeating() {
    let engine = QuizEngine::new(fixed_clock());
    let mut rng = StdRng::seed_from_u64(21);
    let state = engine
        .load_bank(&SessionState::new(), &bank(12), &PipeParser)
        .unwrap();
    let state = engine.set_mode(&state, QuizMode::RandomLimited).unwrap();
    let mut state = engine.set_question_limit(&state, 5).unwrap();

    // Limits are re-derived after each batch: 5, then the remaining 7.
    let mut seen = HashSet::new();
    let mut resets = Vec::new();
    for _ in 0..2 {
        let start = engine.start_exam(&state, &mut rng).unwrap();
        resets.push(start.reset);
        for q in start.state.active().unwrap().questions() {
            assert!(seen.insert(q.original_index()), "question repeated early");
        }
        state = engine.submit(&start.state).unwrap().state;
    }
    assert_eq!(seen.len(), 12);
    assert!(resets.iter().all(Option::is_none));

    let next = engine.start_exam(&state, &mut rng).unwrap();
    assert_eq!(next.reset, Some(ExhaustionReset::RandomLimited));
}

#[test]
fn serial_batches_follow_bank_order() {
    let engine = QuizEngine::new(fixed_clock());
    let mut rng = StdRng::seed_from_u64(22);
    let state = engine
        .load_bank(&SessionState::new(), &bank(7), &PipeParser)
        .unwrap();
    let state = engine.set_shuffle_options(&state, false).unwrap();
    let state = engine.set_question_limit(&state, 3).unwrap();

    let first = engine.start_exam(&state, &mut rng).unwrap().state;
    let order: Vec<usize> = first
        .active()
        .unwrap()
        .questions()
        .iter()
        .map(QuestionRecord::original_index)
        .collect();
    assert_eq!(order, vec![0, 1, 2]);

    let state = engine.submit(&first).unwrap().state;
    // Progress changed, so the limit was re-derived from the remaining four.
    assert_eq!(state.config().question_limit, 4);
    let second = engine.start_exam(&state, &mut rng).unwrap().state;
    assert_eq!(second.active().unwrap().questions()[0].original_index(), 3);
}

#[test]
fn review_scores_follow_negative_mark_edits() {
    let engine = QuizEngine::new(fixed_clock());
    let mut rng = StdRng::seed_from_u64(23);
    let state = engine
        .load_bank(&SessionState::new(), &bank(4), &PipeParser)
        .unwrap();
    let state = engine.set_shuffle_options(&state, false).unwrap();
    let state = engine.start_exam(&state, &mut rng).unwrap().state;

    let state = engine.answer(&state, 0, OptionKey::Kha).unwrap();
    let state = engine.answer(&state, 1, OptionKey::Kha).unwrap();
    let state = engine.answer(&state, 2, OptionKey::Ka).unwrap();
    let state = engine.answer(&state, 3, OptionKey::Ga).unwrap();
    let submission = engine.submit(&state).unwrap();
    assert_eq!(submission.result.score(), 1.5);

    let state = engine
        .update_negative_mark(&submission.state, submission.result.id(), 0.5)
        .unwrap();
    let items = engine.history_items(&state);
    assert_eq!(items[0].score, 1.0);
    assert_eq!(items[0].exam_name.as_deref(), Some("Physics"));
}

#[tokio::test]
async fn state_survives_a_store_round_trip() {
    let engine = QuizEngine::new(fixed_clock());
    let store = SessionStore::new(fixed_clock(), storage::Storage::in_memory());
    let mut rng = StdRng::seed_from_u64(24);

    let state = engine
        .load_bank(&SessionState::new(), &bank(10), &PipeParser)
        .unwrap();
    let state = engine.set_mode(&state, QuizMode::RandomLimited).unwrap();
    let state = engine.start_exam(&state, &mut rng).unwrap().state;
    let state = engine.submit(&state).unwrap().state;
    store.save(&state).await.unwrap();

    let restored = store.restore(&PipeParser).await.unwrap();
    assert_eq!(restored.bank(), state.bank());
    assert_eq!(restored.config(), state.config());
    assert_eq!(restored.progress(), state.progress());
    assert_eq!(restored.history(), state.history());
    assert!(!restored.is_in_exam());
}

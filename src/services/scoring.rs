use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use serde_json::Value;

use crate::db::models::{Blank, CorrectAnswer, Question, Rubric};
use crate::db::types::InputMode;

pub(crate) const TRAIT_CONTENT: &str = "content";
pub(crate) const TRAIT_FORM: &str = "form";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ScoreOutcome {
    pub(crate) raw_score: f64,
    pub(crate) max_score: f64,
    pub(crate) trait_scores: BTreeMap<String, f64>,
}

impl ScoreOutcome {
    fn counted(raw: usize, max: usize) -> Self {
        Self { raw_score: raw as f64, max_score: max as f64, trait_scores: BTreeMap::new() }
    }

    fn binary(correct: bool) -> Self {
        Self::counted(usize::from(correct), 1)
    }
}

/// Grades one submitted answer. Never fails: answers of the wrong shape grade as empty.
pub(crate) fn score_response(
    question: &Question,
    answer: &Value,
    transcript: Option<&str>,
) -> ScoreOutcome {
    let correct = question.correct_answer.as_ref().map(|value| &value.0);

    match question.input_mode {
        InputMode::McqSingle => {
            let expected = correct.and_then(CorrectAnswer::as_text);
            ScoreOutcome::binary(matches!((answer.as_str(), expected), (Some(a), Some(e)) if a == e))
        }
        InputMode::McqMulti => {
            let expected = correct.map(CorrectAnswer::ids).unwrap_or_default();
            score_selection(&decode_list::<String>(answer), expected)
        }
        InputMode::FillBlanksDropdown | InputMode::FillBlanksText => {
            score_blanks(&decode_list::<String>(answer), &question.blanks.0)
        }
        InputMode::ReorderParagraphs => {
            let expected = correct.map(CorrectAnswer::ids).unwrap_or_default();
            score_order(&decode_list::<String>(answer), expected)
        }
        InputMode::HighlightWords => {
            let expected = correct.map(CorrectAnswer::indices).unwrap_or_default();
            score_selection(&decode_list::<u32>(answer), expected)
        }
        InputMode::ShortText | InputMode::LongText | InputMode::SpokenTranscript => {
            let text = text_answer(answer, transcript);
            match correct {
                Some(CorrectAnswer::Text(reference)) if !reference.is_empty() => {
                    score_overlap(reference, text)
                }
                Some(CorrectAnswer::Choices(variants)) => score_variants(variants.iter(), text),
                Some(CorrectAnswer::Indices(variants)) => {
                    score_variants(variants.iter().map(u32::to_string), text)
                }
                // An empty reference carries no key, so the rubric decides.
                Some(CorrectAnswer::Text(_)) | None => {
                    let rubric = question.rubric.as_ref().map(|value| &value.0);
                    score_rubric(rubric.unwrap_or(&Rubric::default()), text)
                }
            }
        }
    }
}

/// Lowercases, replaces anything but ASCII letters, digits, whitespace and apostrophes
/// with a space, then collapses runs of whitespace.
pub(crate) fn normalize_text(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch.is_whitespace() || ch == '\'' {
                ch
            } else {
                ' '
            }
        })
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn tokenize(text: &str) -> Vec<String> {
    normalize_text(text).split(' ').filter(|token| !token.is_empty()).map(str::to_owned).collect()
}

fn text_answer<'a>(answer: &'a Value, transcript: Option<&'a str>) -> &'a str {
    match answer.as_str() {
        Some(text) if !text.trim().is_empty() => text,
        _ => transcript.unwrap_or(""),
    }
}

fn decode_list<T: serde::de::DeserializeOwned>(answer: &Value) -> Vec<T> {
    match answer {
        Value::Array(_) => serde_json::from_value(answer.clone()).unwrap_or_default(),
        _ => Vec::new(),
    }
}

// +1 per correct pick, -1 per wrong pick, floored at zero. Repeated picks count once.
fn score_selection<T: Eq + std::hash::Hash>(selected: &[T], correct: &[T]) -> ScoreOutcome {
    let correct_set: HashSet<&T> = correct.iter().collect();
    let picked: HashSet<&T> = selected.iter().collect();

    let hits = picked.iter().filter(|item| correct_set.contains(*item)).count();
    let misses = picked.len() - hits;

    ScoreOutcome::counted(hits.saturating_sub(misses), correct.len())
}

fn score_blanks(answers: &[String], blanks: &[Blank]) -> ScoreOutcome {
    let raw = blanks
        .iter()
        .enumerate()
        .filter(|(index, blank)| {
            let expected = normalize_text(&blank.answer);
            let actual = answers.get(*index).map(|value| normalize_text(value)).unwrap_or_default();
            !expected.is_empty() && actual == expected
        })
        .count();

    ScoreOutcome::counted(raw, blanks.len())
}

fn score_order(answers: &[String], correct: &[String]) -> ScoreOutcome {
    let raw = correct
        .iter()
        .enumerate()
        .filter(|(index, expected)| answers.get(*index) == Some(*expected))
        .count();

    ScoreOutcome::counted(raw, correct.len())
}

fn score_overlap(reference: &str, answer: &str) -> ScoreOutcome {
    let reference_tokens = tokenize(reference);
    let mut remaining: HashMap<String, usize> = HashMap::new();
    for token in tokenize(answer) {
        *remaining.entry(token).or_default() += 1;
    }

    let mut matches = 0;
    for token in &reference_tokens {
        if let Some(count) = remaining.get_mut(token) {
            if *count > 0 {
                *count -= 1;
                matches += 1;
            }
        }
    }

    ScoreOutcome::counted(matches, reference_tokens.len().max(1))
}

fn score_variants<I, S>(variants: I, answer: &str) -> ScoreOutcome
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    let normalized = normalize_text(answer);
    let accepted = variants
        .map(|variant| normalize_text(variant.as_ref()))
        .any(|variant| !variant.is_empty() && variant == normalized);

    ScoreOutcome::binary(accepted)
}

fn score_rubric(rubric: &Rubric, answer: &str) -> ScoreOutcome {
    let normalized = normalize_text(answer);
    let word_count = normalized.split_whitespace().count();
    let mut outcome = ScoreOutcome::counted(0, 0);

    let phrases: Vec<&String> = rubric.keywords.iter().chain(rubric.keypoints.iter()).collect();
    if !phrases.is_empty() {
        let matches = phrases
            .iter()
            .map(|phrase| normalize_text(phrase))
            .filter(|phrase| !phrase.is_empty() && normalized.contains(phrase.as_str()))
            .count();
        outcome.raw_score += matches as f64;
        outcome.max_score += phrases.len() as f64;
        outcome
            .trait_scores
            .insert(TRAIT_CONTENT.to_string(), matches as f64 / phrases.len() as f64);
    }

    // A zero bound is treated the same as a missing one.
    let min_words = rubric.min_words.filter(|value| *value > 0);
    let max_words = rubric.max_words.filter(|value| *value > 0);
    if min_words.is_some() || max_words.is_some() {
        let within = word_count >= min_words.unwrap_or(0) as usize
            && max_words.map_or(true, |max| word_count <= max as usize);
        let form = if within { 1.0 } else { 0.0 };
        outcome.raw_score += form;
        outcome.max_score += 1.0;
        outcome.trait_scores.insert(TRAIT_FORM.to_string(), form);
    }

    if outcome.max_score == 0.0 {
        let present = if word_count > 0 { 1.0 } else { 0.0 };
        outcome.raw_score = present;
        outcome.max_score = 1.0;
        outcome.trait_scores.insert(TRAIT_CONTENT.to_string(), present);
    }

    outcome
}

use std::collections::{BTreeMap, HashMap};

use crate::db::models::{CategoryScore, Question, Response, ScoreBand, ScoreSummary};
use crate::db::types::Section;

pub(crate) const SCALE_MIN: i32 = 10;
pub(crate) const SCALE_MAX: i32 = 90;

/// Maps a raw/max ratio onto the 10..=90 reporting scale. An empty max reports the floor.
pub(crate) fn scaled_score(raw: f64, max: f64) -> i32 {
    if max <= 0.0 {
        return SCALE_MIN;
    }

    let span = f64::from(SCALE_MAX - SCALE_MIN);
    let scaled = (f64::from(SCALE_MIN) + (raw / max) * span).round();
    (scaled as i32).clamp(SCALE_MIN, SCALE_MAX)
}

#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    raw: f64,
    max: f64,
}

impl Totals {
    fn add(&mut self, raw: f64, max: f64) {
        self.raw += raw;
        self.max += max;
    }

    fn band(self) -> ScoreBand {
        ScoreBand { score: scaled_score(self.raw, self.max), raw: self.raw, max: self.max }
    }
}

/// Folds every response of a session into overall, per-section and per-category totals.
/// Responses whose question is no longer available are skipped.
pub(crate) fn summarize(
    responses: &[Response],
    questions: &HashMap<String, Question>,
) -> ScoreSummary {
    let mut overall = Totals::default();
    let mut sections: BTreeMap<Section, Totals> = BTreeMap::new();
    // Categories keep the order in which they were first seen.
    let mut categories: Vec<(String, Totals)> = Vec::new();
    let mut category_index: HashMap<String, usize> = HashMap::new();

    for response in responses {
        let Some(question) = questions.get(&response.question_id) else {
            tracing::warn!(
                session_id = %response.session_id,
                question_id = %response.question_id,
                "Skipping response for missing question"
            );
            continue;
        };

        overall.add(response.raw_score, response.max_score);
        sections.entry(question.section).or_default().add(response.raw_score, response.max_score);

        for category in question.categories.0.iter() {
            let index = *category_index.entry(category.slug.clone()).or_insert_with(|| {
                categories.push((category.slug.clone(), Totals::default()));
                categories.len() - 1
            });
            categories[index]
                .1
                .add(response.raw_score * category.weight, response.max_score * category.weight);
        }
    }

    ScoreSummary {
        overall: overall.band(),
        sections: sections.into_iter().map(|(section, totals)| (section, totals.band())).collect(),
        categories: categories
            .into_iter()
            .map(|(slug, totals)| {
                let band = totals.band();
                CategoryScore { slug, score: band.score, raw: band.raw, max: band.max }
            })
            .collect(),
    }
}

//! Opportunity scoring and alert detection over snapshots and diffs.
//!
//! Pure heuristics: per-product component scores (velocity, price-to-value,
//! novelty, copyability, saturation penalty) roll up into an explainable
//! 0-100 opportunity score, and run-over-run deltas produce alerts for
//! velocity spikes, pricing moves, and new entrants. No I/O here; the
//! persistence layer feeds this module and stores what comes back.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::diff::ProductDiff;
use crate::snapshot::{round2, ProductSnapshot};

// Component weights for the rolled-up score.
const WEIGHT_VELOCITY: f64 = 0.35;
const WEIGHT_COPYABILITY: f64 = 0.2;
const WEIGHT_NOVELTY: f64 = 0.15;
const WEIGHT_PRICE_TO_VALUE: f64 = 0.2;
const WEIGHT_SATURATION_PENALTY: f64 = 0.1;

const VELOCITY_MIN_HOURS: f64 = 6.0;
const RATING_PER_HOUR_FOR_MAX: f64 = 5.0;
const SALES_PER_HOUR_FOR_MAX: f64 = 20.0;
const SPIKE_RATING_DELTA: i32 = 12;
const SPIKE_SALES_DELTA: i32 = 50;

const PRICE_SWEET_SPOT: (f64, f64) = (15.0, 79.0);
const PRICE_ACCEPTABLE: (f64, f64) = (5.0, 149.0);
const PRICE_PENALTY_LOW: f64 = 20.0;
const PRICE_PENALTY_HIGH: f64 = 40.0;

const NOVELTY_MIN_TOKEN_LEN: usize = 4;

const FORMAT_KEYWORDS: [&str; 8] = [
    "template",
    "checklist",
    "playbook",
    "framework",
    "prompts",
    "swipe",
    "spreadsheet",
    "notion",
];
const BRAND_MARKERS: [&str; 2] = [" by ", "with "];
const CREATOR_PENALTY: f64 = 20.0;

const SATURATION_SIMILARITY_THRESHOLD: f64 = 0.55;
const SATURATION_PENALTY_PER_NEIGHBOR: f64 = 12.0;
const SATURATION_MAX_PENALTY: f64 = 60.0;

const CONFIDENCE_REVIEWS_HIGH: i32 = 25;
const CONFIDENCE_REVIEWS_MED: i32 = 5;
const CONFIDENCE_SALES_HIGH: i32 = 150;
const CONFIDENCE_SALES_MED: i32 = 25;

const ALERT_PRICE_PCT_MOVE: f64 = 0.25;
const ALERT_MIN_PRICE_CHANGE: f64 = 5.0;

const REASON_MAX_CHARS: usize = 280;

/// How much observed data backs a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreConfidence {
    Low,
    Med,
    High,
}

impl ScoreConfidence {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ScoreConfidence::Low => "low",
            ScoreConfidence::Med => "med",
            ScoreConfidence::High => "high",
        }
    }

    /// Maps a stored string back to the enum; unknown values degrade to `Low`.
    #[must_use]
    pub fn from_db_str(value: &str) -> Self {
        match value {
            "high" => ScoreConfidence::High,
            "med" => ScoreConfidence::Med,
            _ => ScoreConfidence::Low,
        }
    }
}

/// One product's opportunity view for one run: the rolled-up score, its
/// component scores, and the snapshot facts a reader needs alongside them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityScore {
    pub platform: String,
    pub product_id: String,
    pub run_id: Uuid,
    pub title: String,
    pub url: String,
    pub category: Option<String>,
    pub creator_name: Option<String>,
    pub price_amount: Option<f64>,
    pub price_currency: Option<String>,
    pub rating_avg: Option<f64>,
    pub rating_count: Option<i32>,
    pub rating_count_delta: Option<i32>,
    pub sales_count: Option<i32>,
    pub sales_count_delta: Option<i32>,
    pub opportunity_score: f64,
    pub velocity_score: f64,
    pub novelty_score: f64,
    pub copyability_score: f64,
    pub price_to_value_score: f64,
    pub saturation_penalty: f64,
    pub confidence: ScoreConfidence,
    pub reason_summary: String,
    /// Titles of the closest competing products found in the category.
    pub saturation_examples: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    NewEntrant,
    VelocitySpike,
    PricingMove,
}

impl AlertKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::NewEntrant => "new_entrant",
            AlertKind::VelocitySpike => "velocity_spike",
            AlertKind::PricingMove => "pricing_move",
        }
    }
}

/// A run-scoped notable event detected from snapshots and diffs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub run_id: Uuid,
    pub platform: String,
    pub product_id: Option<String>,
    pub kind: AlertKind,
    pub message: String,
    pub metadata: serde_json::Value,
}

/// Hours between two run starts, floored at one hour; 24h when there is no
/// previous run to compare against.
#[must_use]
pub fn hours_between_runs(
    current_started_at: DateTime<Utc>,
    previous_started_at: Option<DateTime<Utc>>,
) -> f64 {
    let Some(previous) = previous_started_at else {
        return 24.0;
    };
    let hours = (current_started_at - previous).num_seconds() as f64 / 3600.0;
    hours.max(1.0)
}

fn tokenize(title: &str) -> Vec<String> {
    title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(ToString::to_string)
        .collect()
}

fn velocity_score(diff: Option<&ProductDiff>, hours_delta: f64) -> (f64, Vec<String>) {
    let hours = hours_delta.max(VELOCITY_MIN_HOURS);
    let rating_delta = diff.and_then(|d| d.rating_count_delta).unwrap_or(0);
    let sales_delta = diff.and_then(|d| d.sales_count_delta).unwrap_or(0);

    let rating_rate = f64::from(rating_delta) / hours;
    let sales_rate = f64::from(sales_delta) / hours;
    let rating_score = (rating_rate / RATING_PER_HOUR_FOR_MAX).min(1.0);
    let sales_score = (sales_rate / SALES_PER_HOUR_FOR_MAX).min(1.0);
    let score = round2(((rating_score * 0.5 + sales_score * 0.5) * 100.0).max(0.0));

    let mut notes = Vec::new();
    if rating_delta != 0 {
        notes.push(format!("ratings {rating_delta:+} over {hours:.1}h"));
    }
    if sales_delta != 0 {
        notes.push(format!("sales {sales_delta:+} over {hours:.1}h"));
    }
    (score, notes)
}

fn price_to_value_score(price: Option<f64>) -> (f64, &'static str) {
    let Some(price) = price else {
        return (55.0, "no price");
    };

    if (PRICE_SWEET_SPOT.0..=PRICE_SWEET_SPOT.1).contains(&price) {
        return (95.0, "priced in sweet spot");
    }
    if (PRICE_ACCEPTABLE.0..=PRICE_ACCEPTABLE.1).contains(&price) {
        return (80.0, "priced within acceptable band");
    }
    if price < PRICE_ACCEPTABLE.0 {
        return ((80.0 - PRICE_PENALTY_LOW).max(40.0), "very low price");
    }
    ((80.0 - PRICE_PENALTY_HIGH).max(35.0), "premium priced")
}

fn novelty_score(title: &str, category_titles: &[String]) -> (f64, &'static str) {
    let tokens: Vec<String> = tokenize(title)
        .into_iter()
        .filter(|t| t.len() >= NOVELTY_MIN_TOKEN_LEN)
        .collect();
    if tokens.is_empty() {
        return (50.0, "plain title");
    }

    let mut document_frequency: HashMap<String, usize> = HashMap::new();
    for other in category_titles {
        for token in tokenize(other) {
            if token.len() >= NOVELTY_MIN_TOKEN_LEN {
                *document_frequency.entry(token).or_insert(0) += 1;
            }
        }
    }

    let total_docs = category_titles.len().max(1);
    let mut unique: Vec<&String> = tokens.iter().collect();
    unique.sort();
    unique.dedup();

    let idf_sum: f64 = unique
        .iter()
        .map(|token| {
            let freq = document_frequency.get(token.as_str()).copied().unwrap_or(0);
            ((1 + total_docs) as f64 / (1 + freq) as f64).ln() + 1.0
        })
        .sum();
    let avg_idf = idf_sum / unique.len() as f64;
    let normalized = (avg_idf / 3.0 * 100.0).min(100.0);

    let note = if normalized > 70.0 {
        "unique phrasing"
    } else {
        "common wording"
    };
    (round2(normalized), note)
}

fn copyability_score(title: &str) -> (f64, String) {
    let lower = title.to_lowercase();
    let tokens = tokenize(title);

    let keyword_hits: Vec<&str> = FORMAT_KEYWORDS
        .iter()
        .copied()
        .filter(|kw| lower.contains(kw))
        .collect();
    let has_audience = tokens.iter().any(|t| t == "for");
    let brand_signals = BRAND_MARKERS.iter().any(|m| lower.contains(m));

    let mut score = 60.0 + 10.0 * keyword_hits.len() as f64;
    if has_audience {
        score += 10.0;
    }
    if brand_signals {
        score -= CREATOR_PENALTY;
    }

    let mut parts = Vec::new();
    if !keyword_hits.is_empty() {
        parts.push(format!("clear format ({})", keyword_hits.join(", ")));
    }
    if has_audience {
        parts.push("targets a specific audience".to_string());
    }
    if brand_signals {
        parts.push("personal brand heavy".to_string());
    }
    let reason = if parts.is_empty() {
        "generic positioning".to_string()
    } else {
        parts.join("; ")
    };

    (score.clamp(10.0, 100.0), reason)
}

fn title_similarity(a: &str, b: &str) -> f64 {
    let ta: std::collections::HashSet<String> = tokenize(a).into_iter().collect();
    let tb: std::collections::HashSet<String> = tokenize(b).into_iter().collect();
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let overlap = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    overlap as f64 / union as f64
}

fn saturation_penalty(
    title: &str,
    category_titles: &[String],
) -> (f64, &'static str, Vec<String>) {
    let mut neighbors: Vec<(&String, f64)> = category_titles
        .iter()
        .filter(|other| other.as_str() != title)
        .map(|other| (other, title_similarity(title, other)))
        .filter(|(_, sim)| *sim >= SATURATION_SIMILARITY_THRESHOLD)
        .collect();
    neighbors.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let penalty =
        (neighbors.len() as f64 * SATURATION_PENALTY_PER_NEIGHBOR).min(SATURATION_MAX_PENALTY);
    let note = if neighbors.is_empty() {
        "few close comps"
    } else {
        "crowded niche"
    };
    let examples = neighbors.iter().take(5).map(|(t, _)| (*t).clone()).collect();
    (penalty, note, examples)
}

/// Confidence tiering from observed review and sales counts.
#[must_use]
pub fn infer_confidence(rating_count: Option<i32>, sales_count: Option<i32>) -> ScoreConfidence {
    let reviews = rating_count.unwrap_or(0);
    let sales = sales_count.unwrap_or(0);
    if reviews >= CONFIDENCE_REVIEWS_HIGH || sales >= CONFIDENCE_SALES_HIGH {
        return ScoreConfidence::High;
    }
    if reviews >= CONFIDENCE_REVIEWS_MED || sales >= CONFIDENCE_SALES_MED {
        return ScoreConfidence::Med;
    }
    ScoreConfidence::Low
}

/// Scores one snapshot against its diff and the titles of nearby products in
/// the same category. `hours_delta` is the spacing to the previous run, used
/// to rate velocity.
#[must_use]
pub fn score_snapshot(
    snapshot: &ProductSnapshot,
    diff: Option<&ProductDiff>,
    category_titles: &[String],
    hours_delta: f64,
) -> OpportunityScore {
    let (velocity, velocity_notes) = velocity_score(diff, hours_delta);
    let (price_score, price_reason) = price_to_value_score(snapshot.price_amount);
    let (novelty, novelty_reason) = novelty_score(&snapshot.title, category_titles);
    let (copyability, copy_reason) = copyability_score(&snapshot.title);
    let (saturation, saturation_reason, examples) =
        saturation_penalty(&snapshot.title, category_titles);

    let weighted = velocity * WEIGHT_VELOCITY
        + copyability * WEIGHT_COPYABILITY
        + novelty * WEIGHT_NOVELTY
        + price_score * WEIGHT_PRICE_TO_VALUE
        - saturation * WEIGHT_SATURATION_PENALTY;
    let opportunity = round2(weighted.clamp(0.0, 100.0));

    let confidence = infer_confidence(snapshot.rating_count, snapshot.sales_count);
    let reason_summary = reason_string(
        opportunity,
        &velocity_notes,
        price_reason,
        novelty_reason,
        &copy_reason,
        saturation_reason,
    );

    OpportunityScore {
        platform: snapshot.platform.clone(),
        product_id: snapshot.product_id.clone(),
        run_id: snapshot.run_id,
        title: snapshot.title.clone(),
        url: snapshot.url.clone(),
        category: snapshot.category.clone(),
        creator_name: snapshot.creator_name.clone(),
        price_amount: snapshot.price_amount,
        price_currency: snapshot.price_currency.clone(),
        rating_avg: snapshot.rating_avg,
        rating_count: snapshot.rating_count,
        rating_count_delta: diff.and_then(|d| d.rating_count_delta),
        sales_count: snapshot.sales_count,
        sales_count_delta: diff.and_then(|d| d.sales_count_delta),
        opportunity_score: opportunity,
        velocity_score: velocity,
        novelty_score: novelty,
        copyability_score: copyability,
        price_to_value_score: price_score,
        saturation_penalty: saturation,
        confidence,
        reason_summary,
        saturation_examples: examples,
    }
}

fn reason_string(
    score: f64,
    velocity_notes: &[String],
    price_reason: &str,
    novelty_reason: &str,
    copy_reason: &str,
    saturation_reason: &str,
) -> String {
    let mut parts = vec![format!("Score {score:.0}/100")];
    if !velocity_notes.is_empty() {
        parts.push(velocity_notes.join("; "));
    }
    parts.push(price_reason.to_string());
    parts.push(novelty_reason.to_string());
    parts.push(copy_reason.to_string());
    parts.push(saturation_reason.to_string());

    let joined = parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" | ");
    joined.chars().take(REASON_MAX_CHARS).collect()
}

/// Detects alerts for one run from its snapshots and diffs.
///
/// When `has_previous_run` is false every product is a new entrant and no
/// delta-based alert can fire. Otherwise products spike on large rating or
/// sales deltas, pricing moves fire on an absolute or relative price change,
/// and per-product first sightings are flagged as new entrants.
#[must_use]
pub fn detect_alerts(
    snapshots: &[ProductSnapshot],
    diffs: &[ProductDiff],
    has_previous_run: bool,
) -> Vec<Alert> {
    let diffs_by_product: HashMap<(&str, &str), &ProductDiff> = diffs
        .iter()
        .map(|d| ((d.platform.as_str(), d.product_id.as_str()), d))
        .collect();

    let mut alerts = Vec::new();
    for snap in snapshots {
        let diff = diffs_by_product
            .get(&(snap.platform.as_str(), snap.product_id.as_str()))
            .copied();

        if !has_previous_run {
            alerts.push(Alert {
                run_id: snap.run_id,
                platform: snap.platform.clone(),
                product_id: Some(snap.product_id.clone()),
                kind: AlertKind::NewEntrant,
                message: format!(
                    "New product in category {}: {}",
                    snap.category.as_deref().unwrap_or("-"),
                    snap.title
                ),
                metadata: json!({ "category": snap.category }),
            });
            continue;
        }

        let rating_delta = diff.and_then(|d| d.rating_count_delta).unwrap_or(0);
        let sales_delta = diff.and_then(|d| d.sales_count_delta).unwrap_or(0);
        if rating_delta >= SPIKE_RATING_DELTA || sales_delta >= SPIKE_SALES_DELTA {
            alerts.push(Alert {
                run_id: snap.run_id,
                platform: snap.platform.clone(),
                product_id: Some(snap.product_id.clone()),
                kind: AlertKind::VelocitySpike,
                message: format!(
                    "{} showing spike ({rating_delta:+} ratings, {sales_delta:+} sales)",
                    snap.title
                ),
                metadata: json!({ "rating_delta": rating_delta, "sales_delta": sales_delta }),
            });
        }

        if let Some(price_delta) = diff.and_then(|d| d.price_delta).filter(|d| *d != 0.0) {
            let previous_price = snap.price_amount.unwrap_or(0.0) - price_delta;
            let pct = if previous_price == 0.0 {
                None
            } else {
                Some(price_delta / previous_price)
            };
            let relative_move = pct.is_some_and(|p| p.abs() >= ALERT_PRICE_PCT_MOVE);
            if price_delta.abs() >= ALERT_MIN_PRICE_CHANGE || relative_move {
                alerts.push(Alert {
                    run_id: snap.run_id,
                    platform: snap.platform.clone(),
                    product_id: Some(snap.product_id.clone()),
                    kind: AlertKind::PricingMove,
                    message: format!("{} price changed by {price_delta:+.2}", snap.title),
                    metadata: json!({ "price_delta": price_delta, "pct": pct }),
                });
            }
        }

        if diff.is_none_or(|d| d.previous_run_id.is_none()) {
            alerts.push(Alert {
                run_id: snap.run_id,
                platform: snap.platform.clone(),
                product_id: Some(snap.product_id.clone()),
                kind: AlertKind::NewEntrant,
                message: format!("New entrant vs last run: {}", snap.title),
                metadata: json!({ "category": snap.category }),
            });
        }
    }
    alerts
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::diff::compute_product_diff;
    use crate::snapshot::RevenueConfidence;

    fn snapshot(title: &str, price: Option<f64>, sales: Option<i32>) -> ProductSnapshot {
        ProductSnapshot {
            platform: "gumroad".to_string(),
            product_id: title.to_lowercase().replace(' ', "-"),
            run_id: Uuid::new_v4(),
            url: format!("https://gumroad.com/l/{}", title.to_lowercase().replace(' ', "-")),
            title: title.to_string(),
            creator_name: None,
            creator_url: None,
            category: Some("design".to_string()),
            price_amount: price,
            price_currency: Some("USD".to_string()),
            price_is_pwyw: false,
            rating_avg: Some(4.5),
            rating_count: Some(40),
            sales_count: sales,
            revenue_estimate: None,
            revenue_confidence: RevenueConfidence::Low,
            tags: vec![],
            observed_at: Utc::now(),
            content_hash: String::new(),
        }
        .with_content_hash()
    }

    fn diff_with(rating_delta: Option<i32>, sales_delta: Option<i32>, price_delta: Option<f64>) -> ProductDiff {
        ProductDiff {
            platform: "gumroad".to_string(),
            product_id: "p".to_string(),
            run_id: Uuid::new_v4(),
            previous_run_id: Some(Uuid::new_v4()),
            price_delta,
            rating_count_delta: rating_delta,
            sales_count_delta: sales_delta,
            revenue_delta: None,
            raw_source_changed: false,
            computed_at: Utc::now(),
        }
    }

    #[test]
    fn hours_default_to_a_day_without_previous_run() {
        let now = Utc::now();
        assert!((hours_between_runs(now, None) - 24.0).abs() < f64::EPSILON);
    }

    #[test]
    fn hours_floor_at_one() {
        let now = Utc::now();
        let close = now - Duration::minutes(5);
        assert!((hours_between_runs(now, Some(close)) - 1.0).abs() < f64::EPSILON);

        let far = now - Duration::hours(48);
        assert!((hours_between_runs(now, Some(far)) - 48.0).abs() < 1e-9);
    }

    #[test]
    fn velocity_is_zero_without_deltas() {
        let (score, notes) = velocity_score(None, 24.0);
        assert!((score - 0.0).abs() < f64::EPSILON);
        assert!(notes.is_empty());
    }

    #[test]
    fn velocity_saturates_on_strong_sales() {
        // 480 sales over 24h = 20/hour, the rate that maxes the sales half.
        let diff = diff_with(None, Some(480), None);
        let (score, notes) = velocity_score(Some(&diff), 24.0);
        assert!((score - 50.0).abs() < f64::EPSILON);
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn price_bands() {
        assert_eq!(price_to_value_score(Some(29.0)).0, 95.0);
        assert_eq!(price_to_value_score(Some(120.0)).0, 80.0);
        assert_eq!(price_to_value_score(Some(2.0)).0, 60.0);
        assert_eq!(price_to_value_score(Some(400.0)).0, 40.0);
        assert_eq!(price_to_value_score(None).0, 55.0);
    }

    #[test]
    fn novelty_rewards_unseen_wording() {
        let crowd: Vec<String> = (0..10).map(|i| format!("Notion Template Pack {i}")).collect();
        let (common, common_note) = novelty_score("Notion Template Pack", &crowd);
        let (unique, _) = novelty_score("Quarterly Maintenance Ledger", &crowd);
        assert!(unique > common);
        assert_eq!(common_note, "common wording");
    }

    #[test]
    fn copyability_rewards_format_and_audience() {
        let (with_format, reason) = copyability_score("Notion template for freelancers");
        assert!(with_format > 80.0);
        assert!(reason.contains("clear format"));
        assert!(reason.contains("audience"));

        let (branded, _) = copyability_score("Mindset coaching with Alex");
        assert!(branded < with_format);
    }

    #[test]
    fn saturation_penalizes_crowded_niches() {
        let crowd: Vec<String> = (0..6)
            .map(|i| format!("Ultimate Notion Budget Template {i}"))
            .collect();
        let (penalty, note, examples) =
            saturation_penalty("Ultimate Notion Budget Template", &crowd);
        assert!((penalty - SATURATION_MAX_PENALTY).abs() < f64::EPSILON);
        assert_eq!(note, "crowded niche");
        assert_eq!(examples.len(), 5);

        let (clear, clear_note, _) = saturation_penalty("Watercolor Brush Course", &crowd);
        assert!((clear - 0.0).abs() < f64::EPSILON);
        assert_eq!(clear_note, "few close comps");
    }

    #[test]
    fn confidence_tiers_from_counts() {
        assert_eq!(infer_confidence(Some(30), None), ScoreConfidence::High);
        assert_eq!(infer_confidence(None, Some(200)), ScoreConfidence::High);
        assert_eq!(infer_confidence(Some(6), Some(10)), ScoreConfidence::Med);
        assert_eq!(infer_confidence(None, None), ScoreConfidence::Low);
    }

    #[test]
    fn score_stays_in_range_and_explains_itself() {
        let snap = snapshot("Notion template for freelancers", Some(29.0), Some(500));
        let diff = diff_with(Some(10), Some(100), None);
        let titles = vec!["Budget Spreadsheet".to_string()];

        let scored = score_snapshot(&snap, Some(&diff), &titles, 24.0);
        assert!((0.0..=100.0).contains(&scored.opportunity_score));
        assert!(scored.reason_summary.starts_with("Score "));
        assert!(scored.reason_summary.contains("sweet spot"));
        assert_eq!(scored.sales_count_delta, Some(100));
        assert_eq!(scored.confidence, ScoreConfidence::High);
    }

    #[test]
    fn score_without_diff_has_zero_velocity() {
        let snap = snapshot("Icon Pack", Some(25.0), Some(10));
        let scored = score_snapshot(&snap, None, &[], 24.0);
        assert!((scored.velocity_score - 0.0).abs() < f64::EPSILON);
        assert!(scored.rating_count_delta.is_none());
    }

    #[test]
    fn first_run_flags_every_product_as_new_entrant() {
        let snaps = vec![snapshot("A Product", Some(10.0), None), snapshot("B Product", None, None)];
        let alerts = detect_alerts(&snaps, &[], false);
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().all(|a| a.kind == AlertKind::NewEntrant));
    }

    #[test]
    fn velocity_spike_fires_on_large_sales_delta() {
        let snap = snapshot("Hot Item", Some(20.0), Some(600));
        let mut diff = diff_with(Some(2), Some(75), None);
        diff.platform = snap.platform.clone();
        diff.product_id = snap.product_id.clone();

        let alerts = detect_alerts(std::slice::from_ref(&snap), &[diff], true);
        assert!(alerts.iter().any(|a| a.kind == AlertKind::VelocitySpike));
    }

    #[test]
    fn pricing_move_fires_on_relative_change() {
        // 10 -> 13: below the absolute threshold but a 30% move.
        let snap = snapshot("Repriced", Some(13.0), None);
        let mut diff = diff_with(None, None, Some(3.0));
        diff.platform = snap.platform.clone();
        diff.product_id = snap.product_id.clone();

        let alerts = detect_alerts(std::slice::from_ref(&snap), &[diff], true);
        let pricing: Vec<_> = alerts
            .iter()
            .filter(|a| a.kind == AlertKind::PricingMove)
            .collect();
        assert_eq!(pricing.len(), 1);
        assert_eq!(pricing[0].metadata["price_delta"], 3.0);
    }

    #[test]
    fn small_price_wiggle_is_not_an_alert() {
        // 100 -> 102: under both thresholds.
        let snap = snapshot("Stable", Some(102.0), None);
        let mut diff = diff_with(None, None, Some(2.0));
        diff.platform = snap.platform.clone();
        diff.product_id = snap.product_id.clone();

        let alerts = detect_alerts(std::slice::from_ref(&snap), &[diff], true);
        assert!(alerts.iter().all(|a| a.kind != AlertKind::PricingMove));
    }

    #[test]
    fn per_product_first_sighting_is_new_entrant() {
        let snap = snapshot("Fresh Listing", Some(15.0), None);
        let mut diff = diff_with(None, None, None);
        diff.platform = snap.platform.clone();
        diff.product_id = snap.product_id.clone();
        diff.previous_run_id = None;

        let alerts = detect_alerts(std::slice::from_ref(&snap), &[diff], true);
        assert!(alerts.iter().any(|a| a.kind == AlertKind::NewEntrant));
    }

    #[test]
    fn alerts_round_trip_kind_strings() {
        assert_eq!(AlertKind::NewEntrant.as_str(), "new_entrant");
        assert_eq!(AlertKind::VelocitySpike.as_str(), "velocity_spike");
        assert_eq!(AlertKind::PricingMove.as_str(), "pricing_move");
        assert_eq!(ScoreConfidence::from_db_str("med"), ScoreConfidence::Med);
        assert_eq!(ScoreConfidence::from_db_str("weird"), ScoreConfidence::Low);
    }
}

//! The `calculate` pipeline.
//!
//! parse every formula -> resolve the reference graph -> evaluate in order
//! -> round and format -> drop zmanim hidden today -> sort.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use tracing::{debug, warn};
use zmanim_astro::PrimitiveProvider;
use zmanim_core::visibility::should_show;
use zmanim_core::{CalculatedZman, DayTagSet, Formula, Location, RoundingMode, TagAssociation, sort};
use zmanim_dsl::{EvalError, EvaluationContext, Node, parse, resolve};

use crate::error::EngineError;

/// Everything one calculation needs besides the provider.
#[derive(Debug, Clone)]
pub struct CalculationRequest {
    pub formulas: Vec<Formula>,
    pub date: NaiveDate,
    pub location: Location,
    /// Tags active on `date`, from the calendar.
    pub active_tags: DayTagSet,
    /// Associations supplied separately from the formulas, merged with
    /// each formula's own `tags`.
    pub tags_per_formula: BTreeMap<String, Vec<TagAssociation>>,
    /// Per-key rounding that replaces the formula's own mode.
    pub rounding_overrides: BTreeMap<String, RoundingMode>,
    /// Order by category first instead of by time.
    pub sort_by_category: bool,
}

impl CalculationRequest {
    pub fn new(formulas: Vec<Formula>, date: NaiveDate, location: Location) -> Self {
        Self {
            formulas,
            date,
            location,
            active_tags: DayTagSet::new(),
            tags_per_formula: BTreeMap::new(),
            rounding_overrides: BTreeMap::new(),
            sort_by_category: false,
        }
    }

    pub fn with_active_tags(mut self, tags: DayTagSet) -> Self {
        self.active_tags = tags;
        self
    }

    pub fn with_rounding_override(mut self, key: impl Into<String>, mode: RoundingMode) -> Self {
        self.rounding_overrides.insert(key.into(), mode);
        self
    }

    pub fn with_tags_for(mut self, key: impl Into<String>, tags: Vec<TagAssociation>) -> Self {
        self.tags_per_formula.entry(key.into()).or_default().extend(tags);
        self
    }

    pub fn sorted_by_category(mut self, yes: bool) -> Self {
        self.sort_by_category = yes;
        self
    }
}

/// A formula that failed to evaluate. Independent formulas are unaffected.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaFailure {
    pub key: String,
    pub error: EvalError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Calculation {
    /// Visible zmanim in display order.
    pub zmanim: Vec<CalculatedZman>,
    /// Formulas omitted because they could not be evaluated, in evaluation
    /// order.
    pub failures: Vec<FormulaFailure>,
}

/// Parse every formula, rejecting duplicate keys.
fn parse_all(formulas: &[Formula]) -> Result<BTreeMap<String, Node>, EngineError> {
    let mut parsed = BTreeMap::new();
    for formula in formulas {
        if parsed.contains_key(&formula.key) {
            return Err(EngineError::DuplicateKey {
                key: formula.key.clone(),
            });
        }
        let node = parse(&formula.source).map_err(|source| EngineError::Parse {
            key: formula.key.clone(),
            source,
        })?;
        parsed.insert(formula.key.clone(), node);
    }
    Ok(parsed)
}

/// The order `calculate` would evaluate `formulas` in.
pub fn evaluation_order(formulas: &[Formula]) -> Result<Vec<String>, EngineError> {
    let parsed = parse_all(formulas)?;
    Ok(resolve(&parsed)?)
}

/// Calculate one day of zmanim.
///
/// Parse and dependency errors abort the batch, as does a provider outage.
/// A formula that fails to evaluate (no crossing, type mismatch, division by
/// zero) is left out and reported in [`Calculation::failures`]; so is every
/// formula that references it.
pub fn calculate(request: &CalculationRequest, provider: &dyn PrimitiveProvider) -> Result<Calculation, EngineError> {
    let parsed = parse_all(&request.formulas)?;
    let order = resolve(&parsed)?;
    let by_key: BTreeMap<&str, &Formula> = request.formulas.iter().map(|f| (f.key.as_str(), f)).collect();

    let mut ctx = EvaluationContext::new(request.date, &request.location, provider);
    let mut zmanim = Vec::with_capacity(order.len());
    let mut failures = Vec::new();

    for key in &order {
        let (Some(node), Some(formula)) = (parsed.get(key), by_key.get(key.as_str())) else {
            continue;
        };
        let instant = match ctx.evaluate_formula(key, node) {
            Ok(instant) => instant,
            Err(EvalError::ProviderUnavailable(message)) => {
                return Err(EngineError::ProviderUnavailable {
                    key: key.clone(),
                    message,
                });
            }
            Err(source) if source.is_fatal() => {
                return Err(EngineError::Internal {
                    key: key.clone(),
                    source,
                });
            }
            Err(error) => {
                warn!(zman_key = %key, %error, "formula evaluation failed");
                failures.push(FormulaFailure {
                    key: key.clone(),
                    error,
                });
                continue;
            }
        };

        if !is_visible(formula, request) {
            debug!(zman_key = %key, "hidden by day tags");
            continue;
        }

        let mode = request
            .rounding_overrides
            .get(key)
            .copied()
            .unwrap_or(formula.rounding_mode);
        zmanim.push(CalculatedZman::new(
            key.clone(),
            instant,
            &request.location.timezone,
            mode,
            formula.category.clone(),
        ));
    }

    debug!(
        date = %request.date,
        shown = zmanim.len(),
        failed = failures.len(),
        "calculation finished"
    );
    Ok(Calculation {
        zmanim: sort::sort(zmanim, request.sort_by_category),
        failures,
    })
}

fn is_visible(formula: &Formula, request: &CalculationRequest) -> bool {
    match request.tags_per_formula.get(&formula.key) {
        Some(extra) => {
            let mut seen = HashSet::new();
            let tags: Vec<TagAssociation> = formula
                .tags
                .iter()
                .chain(extra)
                .filter(|t| seen.insert((t.tag.as_str(), t.is_negated)))
                .cloned()
                .collect();
            should_show(&tags, &request.active_tags)
        }
        None => should_show(&formula.tags, &request.active_tags),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FixedProvider, date, jerusalem, keys, utc};
    use pretty_assertions::assert_eq;
    use zmanim_core::TimeCategory;
    use zmanim_dsl::{DependencyError, ParseError};

    fn f(key: &str, src: &str) -> Formula {
        Formula::new(key, src)
    }

    fn request(formulas: Vec<Formula>) -> CalculationRequest {
        CalculationRequest::new(formulas, date(), jerusalem())
    }

    #[test]
    fn computes_and_orders_chronologically() {
        let req = request(vec![
            f("shkia", "sunset").with_category(TimeCategory::Sunset),
            f("alos", "solar(16.1, before_sunrise)").with_category(TimeCategory::Dawn),
            f("netz", "sunrise").with_category(TimeCategory::Sunrise),
            f("chatzos", "solar_noon").with_category(TimeCategory::Midday),
        ]);
        let calc = calculate(&req, &FixedProvider).unwrap();
        assert_eq!(keys(&calc.zmanim), vec!["alos", "netz", "chatzos", "shkia"]);
        assert!(calc.failures.is_empty());

        let netz = &calc.zmanim[1];
        // 03:45:31 UTC is 06:45:31 in Jerusalem (IDT).
        assert_eq!(netz.exact, "06:45:31");
        assert_eq!(netz.rounded, "06:46");
    }

    #[test]
    fn dependency_arithmetic_is_exact() {
        let req = request(vec![f("a", "sunrise"), f("b", "@a + 3h")]);
        let calc = calculate(&req, &FixedProvider).unwrap();
        let a = calc.zmanim.iter().find(|z| z.key == "a").unwrap();
        let b = calc.zmanim.iter().find(|z| z.key == "b").unwrap();
        assert_eq!(b.timestamp - a.timestamp, 10_800);
        assert_eq!((b.instant - a.instant).num_seconds(), 10_800);
    }

    #[test]
    fn rounding_overrides_apply_at_format_time() {
        let req = request(vec![f("netz", "sunrise"), f("shkia", "sunset").with_rounding(RoundingMode::Ceil)])
            .with_rounding_override("netz", RoundingMode::Floor);
        let calc = calculate(&req, &FixedProvider).unwrap();
        let netz = &calc.zmanim[0];
        assert_eq!(netz.rounding_mode, RoundingMode::Floor);
        assert_eq!(netz.rounded, "06:45");
        assert_eq!(netz.instant, utc(3, 45, 31));
        assert_eq!(calc.zmanim[1].rounding_mode, RoundingMode::Ceil);
    }

    #[test]
    fn negated_tag_hides_only_when_active() {
        let formulas = vec![
            f("candle_lighting", "sunset - 18min"),
            f("melacha_ends", "sunset + 42min")
                .with_tag(TagAssociation::negated("shabbos")),
        ];
        let weekday = calculate(&request(formulas.clone()), &FixedProvider).unwrap();
        assert_eq!(keys(&weekday.zmanim), vec!["candle_lighting", "melacha_ends"]);

        let shabbos: DayTagSet = ["shabbos"].into_iter().collect();
        let req = request(formulas).with_active_tags(shabbos);
        let calc = calculate(&req, &FixedProvider).unwrap();
        assert_eq!(keys(&calc.zmanim), vec!["candle_lighting"]);
    }

    #[test]
    fn separately_supplied_tags_are_honored() {
        let shabbos: DayTagSet = ["shabbos"].into_iter().collect();
        let req = request(vec![f("a", "sunrise"), f("b", "sunset")])
            .with_active_tags(shabbos)
            .with_tags_for("b", vec![TagAssociation::negated("shabbos")]);
        let calc = calculate(&req, &FixedProvider).unwrap();
        assert_eq!(keys(&calc.zmanim), vec!["a"]);
    }

    #[test]
    fn hidden_zman_still_feeds_dependents() {
        let shabbos: DayTagSet = ["shabbos"].into_iter().collect();
        let req = request(vec![
            f("base", "sunset").with_tag(TagAssociation::negated("shabbos")),
            f("derived", "@base + 1h"),
        ])
        .with_active_tags(shabbos);
        let calc = calculate(&req, &FixedProvider).unwrap();
        assert_eq!(keys(&calc.zmanim), vec!["derived"]);
    }

    #[test]
    fn no_crossing_isolated_to_its_formula_and_dependents() {
        let req = request(vec![
            f("deep", "solar(30, after_sunset)"),
            f("after_deep", "@deep + 10min"),
            f("netz", "sunrise"),
            f("shkia", "sunset"),
        ]);
        let calc = calculate(&req, &FixedProvider).unwrap();
        assert_eq!(keys(&calc.zmanim), vec!["netz", "shkia"]);
        let failed: Vec<&str> = calc.failures.iter().map(|x| x.key.as_str()).collect();
        assert_eq!(failed, vec!["deep", "after_deep"]);
        assert!(matches!(calc.failures[0].error, EvalError::NoPrimitiveCrossing { .. }));
        assert!(matches!(calc.failures[1].error, EvalError::DependencyFailed { .. }));
    }

    #[test]
    fn type_and_division_errors_are_per_formula() {
        let req = request(vec![
            f("dur", "sunset - sunrise"),
            f("div", "sunrise + 1h / 0"),
            f("ok", "solar_noon"),
        ]);
        let calc = calculate(&req, &FixedProvider).unwrap();
        assert_eq!(keys(&calc.zmanim), vec!["ok"]);
        assert_eq!(calc.failures.len(), 2);
    }

    #[test]
    fn cycle_aborts_before_evaluation() {
        let req = request(vec![f("a", "@b + 1h"), f("b", "@a - 1h"), f("c", "civil_dawn")]);
        // civil_dawn would make FixedProvider fail the batch; the cycle must win.
        let err = calculate(&req, &FixedProvider).unwrap_err();
        match err {
            EngineError::Dependency(DependencyError::Cycle { path }) => assert_eq!(path, vec!["a", "b", "a"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn parse_error_names_the_formula() {
        let req = request(vec![f("ok", "sunrise"), f("broken", "sunset - 18m")]);
        let err = calculate(&req, &FixedProvider).unwrap_err();
        assert_eq!(err.key(), "broken");
        assert!(matches!(
            err,
            EngineError::Parse {
                source: ParseError::MalformedDuration { .. },
                ..
            }
        ));
    }

    #[test]
    fn unknown_reference_aborts() {
        let req = request(vec![f("tzeis", "@shkia + 42min")]);
        assert!(matches!(
            calculate(&req, &FixedProvider).unwrap_err(),
            EngineError::Dependency(DependencyError::UnknownReference { .. })
        ));
    }

    #[test]
    fn duplicate_keys_rejected() {
        let req = request(vec![f("a", "sunrise"), f("a", "sunset")]);
        assert!(matches!(
            calculate(&req, &FixedProvider).unwrap_err(),
            EngineError::DuplicateKey { .. }
        ));
    }

    #[test]
    fn provider_outage_aborts_batch() {
        let req = request(vec![f("netz", "sunrise"), f("tzeis_civil", "civil_dusk")]);
        let err = calculate(&req, &FixedProvider).unwrap_err();
        assert!(err.is_provider_unavailable());
        assert_eq!(err.key(), "tzeis_civil");
    }

    #[test]
    fn deterministic_output() {
        let req = request(vec![
            f("alos", "solar(16.1, before_sunrise)"),
            f("sof_zman_shma", "proportional_hours(3, gra)"),
            f("plag", "proportional_hours(10.75, mga)"),
        ]);
        let a = calculate(&req, &FixedProvider).unwrap();
        let b = calculate(&req, &FixedProvider).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn category_first_ordering() {
        let req = request(vec![
            f("late", "sunset + 5h").with_category(TimeCategory::Midday),
            f("shkia", "sunset").with_category(TimeCategory::Sunset),
            f("netz", "sunrise").with_category(TimeCategory::Sunrise),
        ])
        .sorted_by_category(true);
        let calc = calculate(&req, &FixedProvider).unwrap();
        assert_eq!(keys(&calc.zmanim), vec!["netz", "late", "shkia"]);
    }

    #[test]
    fn evaluation_order_exposed() {
        let formulas = vec![f("tzeis", "@shkia + 42min"), f("shkia", "sunset")];
        assert_eq!(evaluation_order(&formulas).unwrap(), vec!["shkia", "tzeis"]);
    }
}

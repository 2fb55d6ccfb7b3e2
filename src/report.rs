use serde::Serialize;

use liftcheck::{
    Arm, BayesianResult, BayesianVerdict, FrequentistResult, FrequentistVerdict, PlanningInput,
    PlanningResult, VerdictPolicy,
};

/// Which arms were compared, for the report header.
pub struct Matchup {
    pub control: Arm,
    pub variant: Arm,
    pub variant_label: String,
    /// Number of variants submitted before the best one was picked.
    pub candidate_count: usize,
}

fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn format_pct(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

fn check_mark(ok: bool) -> &'static str {
    if ok { "ok  " } else { "MISS" }
}

fn print_header(m: &Matchup) {
    if m.candidate_count > 1 {
        println!(
            "Analyzing best performer: Variant {} vs Control A ({} conversion, {} variants)",
            m.variant_label,
            format_pct(m.variant.rate()),
            m.candidate_count
        );
    } else {
        println!("Analyzing: Variant {} vs Control A", m.variant_label);
    }
    println!(
        "  {:<12} {:>12} visitors {:>10} conversions  {:>7}",
        "Control A",
        format_count(m.control.visitors),
        format_count(m.control.conversions),
        format_pct(m.control.rate())
    );
    println!(
        "  {:<12} {:>12} visitors {:>10} conversions  {:>7}",
        format!("Variant {}", m.variant_label),
        format_count(m.variant.visitors),
        format_count(m.variant.conversions),
        format_pct(m.variant.rate())
    );
    println!();
}

pub fn print_plan(input: &PlanningInput, result: &PlanningResult) {
    println!(
        "Baseline {} -> expected variant {} ({:+.1}% MDE)",
        format_pct(input.baseline_rate),
        format_pct(result.expected_variant_rate),
        input.minimum_detectable_effect * 100.0
    );
    println!(
        "Confidence {:.0}%, power {:.0}%, {} variants, {} visitors/day",
        input.confidence_level * 100.0,
        input.power * 100.0,
        input.variant_count,
        format_count(input.daily_traffic)
    );
    println!();
    println!("  {:<24} {}", "Sample per variant", format_count(result.sample_per_variant));
    println!("  {:<24} {}", "Total sample", format_count(result.total_sample));
    println!("  {:<24} {} days", "Duration", result.duration_days);
    println!();

    let rec = &result.recommendations;
    if rec.all_met() {
        println!("Recommendations: all met");
    } else {
        println!("Recommendations:");
    }
    println!(
        "  [{}] at least {} visitors per variant",
        check_mark(rec.min_visitors_met),
        format_count(liftcheck::planner::MIN_VISITORS_PER_VARIANT)
    );
    println!(
        "  [{}] run for at least {} days",
        check_mark(rec.min_duration_met),
        liftcheck::planner::MIN_DURATION_DAYS
    );
    println!(
        "  [{}] finish within {} days",
        check_mark(rec.max_duration_met),
        liftcheck::planner::MAX_DURATION_DAYS
    );
}

pub fn print_frequentist(m: &Matchup, result: &FrequentistResult) {
    print_header(m);
    match result.relative_uplift {
        Some(u) => println!("  {:<24} {u:.2}%", "Relative uplift"),
        None => println!("  {:<24} n/a (control has no conversions)", "Relative uplift"),
    }
    println!(
        "  {:<24} {:.2} percentage points",
        "Absolute difference", result.absolute_difference
    );
    println!("  {:<24} {:.4}", "p-value", result.p_value);
    println!("  {:<24} {:.3}", "z-score", result.z_score);
    if let Some((lo, hi)) = result.confidence_interval {
        println!("  {:<24} [{lo:.2}%, {hi:.2}%]", "95% CI (uplift)");
    }
    println!();

    let label = &m.variant_label;
    match result.verdict() {
        FrequentistVerdict::Improvement => println!(
            "Statistically significant: Variant {label} performs better than Control A."
        ),
        FrequentistVerdict::Regression => println!(
            "Statistically significant: Variant {label} performs worse than Control A."
        ),
        FrequentistVerdict::Inconclusive => println!(
            "Not statistically significant. The difference could be due to chance; \
             consider running the test longer."
        ),
    }
}

pub fn print_bayesian(m: &Matchup, result: &BayesianResult, policy: &VerdictPolicy) {
    print_header(m);
    let p = result.probability_variant_beats_control;
    println!(
        "  {:<28} {} control, {} variant",
        "Posterior mean rate",
        format_pct(result.control_posterior.mean()),
        format_pct(result.variant_posterior.mean())
    );
    println!("  {:<28} {p:.2}%", "P(variant beats control)");
    println!(
        "  {:<28} {:.4} pp",
        "Expected loss (keep control)",
        result.expected_loss_choose_control * 100.0
    );
    println!(
        "  {:<28} {:.4} pp",
        "Expected loss (ship variant)",
        result.expected_loss_choose_variant * 100.0
    );
    match (result.median_uplift, result.credible_interval) {
        (Some(median), Some((lo, hi))) => {
            println!("  {:<28} {median:.2}%", "Median uplift");
            println!("  {:<28} [{lo:.2}%, {hi:.2}%]", "95% credible interval");
        }
        _ => println!(
            "  {:<28} n/a (control posterior draws reached zero)",
            "Median uplift"
        ),
    }
    println!(
        "  {:<28} {}",
        "Monte Carlo draws",
        format_count(result.samples as u64)
    );
    println!();

    let label = &m.variant_label;
    match result.verdict(policy) {
        BayesianVerdict::StrongEvidence => println!(
            "Strong evidence: {p:.1}% probability that Variant {label} is better than Control A."
        ),
        BayesianVerdict::ModerateEvidence => println!(
            "Moderate evidence: {p:.1}% probability that Variant {label} is better. \
             Consider collecting more data."
        ),
        BayesianVerdict::ControlLikelyBetter => println!(
            "Control A is likely better: only {p:.1}% probability that Variant {label} is better."
        ),
        BayesianVerdict::Inconclusive => println!(
            "Inconclusive: {p:.1}% probability that Variant {label} is better. \
             Collect more data for a clear decision."
        ),
    }
}

// JSON output types

#[derive(Serialize)]
struct JsonArm {
    visitors: u64,
    conversions: u64,
    rate_pct: f64,
}

impl From<&Arm> for JsonArm {
    fn from(arm: &Arm) -> Self {
        Self {
            visitors: arm.visitors,
            conversions: arm.conversions,
            rate_pct: arm.rate() * 100.0,
        }
    }
}

#[derive(Serialize)]
struct JsonPlan<'a> {
    input: &'a PlanningInput,
    sample_per_variant: u64,
    total_sample: u64,
    duration_days: u64,
    expected_variant_rate_pct: f64,
    recommendations: &'a liftcheck::Recommendations,
}

#[derive(Serialize)]
struct JsonFrequentist {
    method: &'static str,
    analyzed_variant: String,
    candidate_count: usize,
    control: JsonArm,
    variant: JsonArm,
    relative_uplift_pct: Option<f64>,
    absolute_difference_pp: f64,
    p_value: f64,
    z_score: f64,
    confidence_interval_pct: Option<[f64; 2]>,
    significant: bool,
    verdict: FrequentistVerdict,
}

#[derive(Serialize)]
struct JsonBayesian {
    method: &'static str,
    analyzed_variant: String,
    candidate_count: usize,
    control: JsonArm,
    variant: JsonArm,
    control_posterior: liftcheck::Posterior,
    variant_posterior: liftcheck::Posterior,
    probability_variant_beats_control_pct: f64,
    expected_loss_choose_control_pp: f64,
    expected_loss_choose_variant_pp: f64,
    control_posterior_mean_pct: f64,
    variant_posterior_mean_pct: f64,
    median_uplift_pct: Option<f64>,
    credible_interval_pct: Option<[f64; 2]>,
    samples: usize,
    verdict: BayesianVerdict,
}

fn emit_json<T: Serialize>(value: &T) {
    let text = serde_json::to_string_pretty(value).expect("report types always serialize");
    println!("{text}");
}

pub fn print_plan_json(input: &PlanningInput, result: &PlanningResult) {
    emit_json(&JsonPlan {
        input,
        sample_per_variant: result.sample_per_variant,
        total_sample: result.total_sample,
        duration_days: result.duration_days,
        expected_variant_rate_pct: result.expected_variant_rate * 100.0,
        recommendations: &result.recommendations,
    });
}

pub fn print_frequentist_json(m: &Matchup, result: &FrequentistResult) {
    emit_json(&JsonFrequentist {
        method: "frequentist",
        analyzed_variant: m.variant_label.clone(),
        candidate_count: m.candidate_count,
        control: (&m.control).into(),
        variant: (&m.variant).into(),
        relative_uplift_pct: result.relative_uplift,
        absolute_difference_pp: result.absolute_difference,
        p_value: result.p_value,
        z_score: result.z_score,
        confidence_interval_pct: result.confidence_interval.map(|(lo, hi)| [lo, hi]),
        significant: result.is_significant,
        verdict: result.verdict(),
    });
}

pub fn print_bayesian_json(m: &Matchup, result: &BayesianResult, policy: &VerdictPolicy) {
    emit_json(&JsonBayesian {
        method: "bayesian",
        analyzed_variant: m.variant_label.clone(),
        candidate_count: m.candidate_count,
        control: (&m.control).into(),
        variant: (&m.variant).into(),
        control_posterior: result.control_posterior,
        variant_posterior: result.variant_posterior,
        probability_variant_beats_control_pct: result.probability_variant_beats_control,
        expected_loss_choose_control_pp: result.expected_loss_choose_control * 100.0,
        expected_loss_choose_variant_pp: result.expected_loss_choose_variant * 100.0,
        control_posterior_mean_pct: result.control_posterior.mean() * 100.0,
        variant_posterior_mean_pct: result.variant_posterior.mean() * 100.0,
        median_uplift_pct: result.median_uplift,
        credible_interval_pct: result.credible_interval.map(|(lo, hi)| [lo, hi]),
        samples: result.samples,
        verdict: result.verdict(policy),
    });
}

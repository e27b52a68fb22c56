use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate};
use clap::Parser;
use hedge_engine::{aggregate, devaluation_percent, plan_salary_conversion, salary_conversion_amount};
use hedge_types::{
    Address, ConversionEvent, CurrencyCode, MarketSnapshot, ProtectionLimits, ProtectionRecord, UserConfiguration,
    SECONDS_PER_WEEK,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rust_decimal::Decimal;
use std::time::Instant;

const START: u64 = 1_704_067_200;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Hedge salary protection simulation runner")]
struct Args {
    /// Independent users, one random rate path each.
    #[arg(long, default_value_t = 200)]
    users: u64,
    /// Weekly salary deposits per user.
    #[arg(long, default_value_t = 52)]
    weeks: usize,
    /// Salary per deposit, in local currency.
    #[arg(long, default_value = "10000")]
    salary: Decimal,
    #[arg(long, default_value = "17.45")]
    start_rate: Decimal,
    /// Mean weekly devaluation, in basis points.
    #[arg(long, default_value_t = 50)]
    drift_bp: i64,
    /// Largest weekly deviation from the drift, in basis points.
    #[arg(long, default_value_t = 150)]
    volatility_bp: i64,
    #[arg(long, default_value_t = 25)]
    percentage: u32,
    #[arg(long, default_value = "2.0")]
    threshold: Decimal,
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Debug, Clone, PartialEq)]
struct UserOutcome {
    conversions: u32,
    usd_protected: Decimal,
    local_converted: Decimal,
    devaluation: Decimal,
    /// Local currency the USD is worth at the final rate, minus what it cost.
    gain: Decimal,
}

fn rate_path(rng: &mut StdRng, args: &Args) -> Vec<Decimal> {
    let mut rates = Vec::with_capacity(args.weeks);
    let mut rate = args.start_rate;
    for _ in 0..args.weeks {
        rates.push(rate);
        let noise = if args.volatility_bp > 0 {
            rng.gen_range(-args.volatility_bp..=args.volatility_bp)
        } else {
            0
        };
        let step = Decimal::from(10_000 + args.drift_bp + noise) / Decimal::from(10_000);
        rate = (rate * step).round_dp(6).max(Decimal::new(1, 6));
    }
    rates
}

fn date_of(ts: u64) -> NaiveDate {
    DateTime::from_timestamp(ts as i64, 0)
        .map(|d| d.date_naive())
        .unwrap_or_default()
}

fn simulate_user(index: u64, args: &Args, limits: &ProtectionLimits) -> Result<UserOutcome> {
    let mut rng = StdRng::seed_from_u64(args.seed.wrapping_add(index));
    let rates = rate_path(&mut rng, args);

    let mut record = ProtectionRecord::new(
        Address::new(&format!("GSIM{:08}", index)),
        UserConfiguration {
            currency: CurrencyCode::new("MXN"),
            target_percentage: args.percentage,
            threshold: args.threshold,
        },
    );
    let mut events: Vec<ConversionEvent> = Vec::new();

    for (week, current) in rates.iter().enumerate() {
        let snapshot = MarketSnapshot {
            current: *current,
            week_ago: rates[week.saturating_sub(1)],
            month_ago: rates[week.saturating_sub(4)],
            timestamp: START + week as u64 * SECONDS_PER_WEEK,
        };
        let plan = plan_salary_conversion(&record, args.salary, &snapshot, snapshot.timestamp, limits)
            .with_context(|| format!("user {} week {}", index, week))?;
        if let Some(plan) = plan {
            record.last_conversion = Some(snapshot.timestamp);
            events.push(plan.into_event(date_of(snapshot.timestamp)));
        }
    }

    let first = rates.first().copied().unwrap_or(args.start_rate);
    let last = rates.last().copied().unwrap_or(args.start_rate);
    let devaluation = devaluation_percent(last, first)?;
    let metrics = aggregate(&events, Decimal::ZERO, 0, devaluation);
    let local_converted: Decimal = events.iter().map(|e| e.local_amount).sum();

    Ok(UserOutcome {
        conversions: metrics.conversion_count,
        usd_protected: metrics.total_protected,
        local_converted,
        devaluation,
        gain: (metrics.total_protected * last - local_converted).round_dp(2),
    })
}

fn run_simulation(args: &Args) -> Result<Vec<UserOutcome>> {
    let limits = ProtectionLimits::default();
    (0..args.users)
        .into_par_iter()
        .map(|i| simulate_user(i, args, &limits))
        .collect()
}

fn main() -> Result<()> {
    let args = Args::parse();
    let start = Instant::now();
    let outcomes = run_simulation(&args)?;
    let elapsed = start.elapsed();

    let users = Decimal::from(outcomes.len().max(1));
    let conversions: u64 = outcomes.iter().map(|o| u64::from(o.conversions)).sum();
    let usd: Decimal = outcomes.iter().map(|o| o.usd_protected).sum();
    let gain: Decimal = outcomes.iter().map(|o| o.gain).sum();
    let devaluation: Decimal = outcomes.iter().map(|o| o.devaluation).sum();
    let winners = outcomes.iter().filter(|o| o.gain > Decimal::ZERO).count();

    println!("=== Hedge Simulation ===");
    println!("Users: {}  Weeks: {}  Seed: {}", outcomes.len(), args.weeks, args.seed);
    println!(
        "Salary: {}  Protect: {}%  Threshold: {}%",
        args.salary, args.percentage, args.threshold
    );
    println!(
        "Salary share converted when triggered: {}",
        salary_conversion_amount(args.salary, args.percentage)?
    );
    println!("Mean devaluation over run: {}%", (devaluation / users).round_dp(2));
    println!("Conversions: {} ({} per user)", conversions, (Decimal::from(conversions) / users).round_dp(2));
    println!("USD protected: {}", usd.round_dp(2));
    println!("Mean gain vs holding local: {}", (gain / users).round_dp(2));
    println!("Users ahead: {}/{}", winners, outcomes.len());
    println!("Elapsed: {:.2?}", elapsed);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn args() -> Args {
        Args {
            users: 8,
            weeks: 10,
            salary: dec!(10000),
            start_rate: dec!(17.45),
            drift_bp: 300,
            volatility_bp: 0,
            percentage: 25,
            threshold: dec!(2.0),
            seed: 7,
        }
    }

    #[test]
    fn steady_devaluation_converts_every_week_after_the_first() {
        let outcome = simulate_user(0, &args(), &ProtectionLimits::default()).unwrap();
        assert_eq!(outcome.conversions, 9);
        assert_eq!(outcome.local_converted, dec!(22500));
        assert!(outcome.devaluation > dec!(25));
        assert!(outcome.gain > Decimal::ZERO);
    }

    #[test]
    fn calm_market_never_converts() {
        let mut a = args();
        a.drift_bp = 50;
        let outcome = simulate_user(3, &a, &ProtectionLimits::default()).unwrap();
        assert_eq!(outcome.conversions, 0);
        assert_eq!(outcome.usd_protected, Decimal::ZERO);
    }

    #[test]
    fn runs_are_reproducible() {
        let mut a = args();
        a.volatility_bp = 400;
        let first = run_simulation(&a).unwrap();
        let second = run_simulation(&a).unwrap();
        assert_eq!(first.len(), 8);
        assert_eq!(first, second);
    }
}

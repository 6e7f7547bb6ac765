use chrono::Utc;
use finewatch_types::RawRecord;
use rand::Rng;
use rand::seq::IndexedRandom;
use rust_decimal::Decimal;

/// Violation types with their amount range in whole currency units.
const FINE_KINDS: &[(&str, i64, i64)] = &[
    ("Late delivery", 1000, 5000),
    ("Packaging mismatch", 500, 3000),
    ("Defective goods", 2000, 10000),
    ("Deadline violation", 1500, 8000),
    ("Document error", 300, 2000),
];

const STATUSES: &[&str] = &["charged", "disputed", "paid"];

/// Generate `count` fresh fines with ids that have never been issued before
/// (modulo collisions of the random suffix within one second).
pub fn generate_fines<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<RawRecord> {
    let now = Utc::now();

    (0..count)
        .map(|_| {
            let &(kind, min, max) = FINE_KINDS.choose(rng).unwrap_or(&FINE_KINDS[0]);
            let cents = rng.random_range(min * 100..=max * 100);
            let status = STATUSES.choose(rng).copied().unwrap_or("charged");

            RawRecord {
                id: Some(format!("FINE_{}_{}", now.timestamp(), rng.random_range(1000..=9999))),
                // Zone-less like the real marketplace feed
                date: Some(now.naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()),
                kind: Some(kind.to_string()),
                amount: Some(Decimal::new(cents, 2)),
                order_id: Some(format!("ORDER_{}", rng.random_range(100_000..=999_999))),
                status: Some(status.to_string()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_fines_are_complete_and_in_range() {
        let mut rng = rand::rng();
        let fines = generate_fines(&mut rng, 50);
        assert_eq!(fines.len(), 50);

        for fine in &fines {
            let kind = fine.kind.as_deref().unwrap();
            let &(_, min, max) = FINE_KINDS.iter().find(|(k, _, _)| *k == kind).unwrap();
            let amount = fine.amount.unwrap();
            assert!(amount >= Decimal::from(min) && amount <= Decimal::from(max));
            assert!(STATUSES.contains(&fine.status.as_deref().unwrap()));
            assert!(fine.id.as_deref().unwrap().starts_with("FINE_"));
            assert!(fine.order_id.as_deref().unwrap().starts_with("ORDER_"));
            assert!(fine.date.is_some());
        }
    }

    #[test]
    fn zero_count_is_empty() {
        assert!(generate_fines(&mut rand::rng(), 0).is_empty());
    }
}

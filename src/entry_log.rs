use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::store::{Entry, LocalStore};

/// How non-numeric measurements are handled when logging an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumberPolicy {
    /// Reject bad numbers and dates with a parse error.
    Strict,
    /// Store bad numbers as NaN and the date exactly as typed.
    Lenient,
}

/// Raw field values from the entry form. `None` means the field was cancelled.
#[derive(Debug, Clone, Default)]
pub struct EntryInput {
    pub date: Option<String>,
    pub weight: Option<String>,
    pub reps: Option<String>,
    pub sets: Option<String>,
}

impl EntryInput {
    pub fn new(date: &str, weight: &str, reps: &str, sets: &str) -> Self {
        Self {
            date: Some(date.to_string()),
            weight: Some(weight.to_string()),
            reps: Some(reps.to_string()),
            sets: Some(sets.to_string()),
        }
    }
}

/// Log a workout entry for `machine_id`.
///
/// Any missing or blank field aborts with `Ok(None)` before anything is
/// parsed or written.
pub fn add_entry(
    store: &LocalStore,
    machine_id: i64,
    input: &EntryInput,
    policy: NumberPolicy,
) -> Result<Option<i64>, AppError> {
    let (Some(date), Some(weight), Some(reps), Some(sets)) = (
        present(&input.date),
        present(&input.weight),
        present(&input.reps),
        present(&input.sets),
    ) else {
        return Ok(None);
    };

    let date = coerce_date(date, policy)?;
    let weight = coerce_number("Weight", weight, policy)?;
    let reps = coerce_number("Reps", reps, policy)?;
    let sets = coerce_number("Sets", sets, policy)?;

    let id = store.create_entry(machine_id, &date, weight, reps, sets)?;
    Ok(Some(id))
}

pub fn entries_for(store: &LocalStore, machine_id: i64) -> Result<Vec<Entry>, AppError> {
    Ok(store.list_entries_for_machine(machine_id)?)
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn coerce_date(raw: &str, policy: NumberPolicy) -> Result<String, AppError> {
    match policy {
        NumberPolicy::Lenient => Ok(raw.to_string()),
        NumberPolicy::Strict => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(|d| d.format("%Y-%m-%d").to_string())
            .map_err(|_| AppError::parse("Date", "a YYYY-MM-DD date", raw)),
    }
}

fn coerce_number(field: &'static str, raw: &str, policy: NumberPolicy) -> Result<f64, AppError> {
    let parsed = raw.parse::<f64>().ok().filter(|v| v.is_finite());
    match (parsed, policy) {
        (Some(v), _) => Ok(v),
        (None, NumberPolicy::Lenient) => Ok(f64::NAN),
        (None, NumberPolicy::Strict) => Err(AppError::parse(field, "a number", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_machine() -> (LocalStore, i64) {
        let store = LocalStore::open_in_memory().unwrap();
        let id = store.create_machine("Leg Press", "data:image/png;base64,").unwrap();
        (store, id)
    }

    #[test]
    fn adds_entry_with_parsed_numbers() {
        let (store, m) = store_with_machine();
        let id = add_entry(&store, m, &EntryInput::new("2024-01-10", "100", "10", "3"), NumberPolicy::Strict)
            .unwrap()
            .expect("entry created");

        let entries = entries_for(&store, m).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, id);
        assert_eq!(entries[0].date, "2024-01-10");
        assert_eq!((entries[0].weight, entries[0].reps, entries[0].sets), (100.0, 10.0, 3.0));
    }

    #[test]
    fn empty_date_is_a_no_op() {
        let (store, m) = store_with_machine();
        let result = add_entry(&store, m, &EntryInput::new("", "100", "10", "3"), NumberPolicy::Strict);
        assert_eq!(result.unwrap(), None);
        assert!(entries_for(&store, m).unwrap().is_empty());

        // The skipped attempt must not have consumed an id.
        let first = add_entry(&store, m, &EntryInput::new("2024-01-10", "1", "1", "1"), NumberPolicy::Strict)
            .unwrap()
            .unwrap();
        assert_eq!(first, 1);
    }

    #[test]
    fn cancelled_field_is_a_no_op() {
        let (store, m) = store_with_machine();
        let mut input = EntryInput::new("2024-01-10", "100", "10", "3");
        input.sets = None;
        assert_eq!(add_entry(&store, m, &input, NumberPolicy::Lenient).unwrap(), None);
        assert!(entries_for(&store, m).unwrap().is_empty());
    }

    #[test]
    fn strict_policy_rejects_non_numeric_input() {
        let (store, m) = store_with_machine();
        let err = add_entry(&store, m, &EntryInput::new("2024-01-10", "heavy", "10", "3"), NumberPolicy::Strict)
            .unwrap_err();
        match err {
            AppError::Parse { field, value, .. } => {
                assert_eq!(field, "Weight");
                assert_eq!(value, "heavy");
            }
            e => panic!("unexpected error: {e:?}"),
        }
        assert!(entries_for(&store, m).unwrap().is_empty());
    }

    #[test]
    fn strict_policy_rejects_bad_dates() {
        let (store, m) = store_with_machine();
        let err = add_entry(&store, m, &EntryInput::new("2024-02-30", "1", "1", "1"), NumberPolicy::Strict)
            .unwrap_err();
        assert!(matches!(err, AppError::Parse { field: "Date", .. }));
    }

    #[test]
    fn lenient_policy_stores_nan() {
        let (store, m) = store_with_machine();
        add_entry(&store, m, &EntryInput::new("2024-01-10", "100", "lots", "3"), NumberPolicy::Lenient)
            .unwrap()
            .unwrap();
        let entries = entries_for(&store, m).unwrap();
        assert_eq!(entries[0].weight, 100.0);
        assert!(entries[0].reps.is_nan());
    }

    #[test]
    fn zero_and_negative_values_are_accepted() {
        let (store, m) = store_with_machine();
        add_entry(&store, m, &EntryInput::new("2024-01-10", "-5", "0", " 2.5 "), NumberPolicy::Strict)
            .unwrap()
            .unwrap();
        let e = &entries_for(&store, m).unwrap()[0];
        assert_eq!((e.weight, e.reps, e.sets), (-5.0, 0.0, 2.5));
    }

    #[test]
    fn out_of_order_dates_come_back_sorted() {
        let (store, m) = store_with_machine();
        add_entry(&store, m, &EntryInput::new("2024-03-01", "1", "1", "1"), NumberPolicy::Strict).unwrap();
        add_entry(&store, m, &EntryInput::new("2024-01-15", "1", "1", "1"), NumberPolicy::Strict).unwrap();
        let dates: Vec<String> = entries_for(&store, m).unwrap().into_iter().map(|e| e.date).collect();
        assert_eq!(dates, vec!["2024-01-15", "2024-03-01"]);
    }
}

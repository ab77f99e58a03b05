use std::collections::HashMap;
use std::hash::Hash;

use crate::models::{Estimate, SurveyRow};

/// z-score for a 95% confidence interval.
const Z: f64 = 1.96;

/// Rolls rows up into one [`Estimate`] per distinct group key. Missing
/// counts sum as zero; derived fields are recomputed from the sums, so
/// split-then-merge equals a single pass. Output order is left to the
/// caller, and an empty input yields an empty vector.
pub fn aggregate<'a, K, I, F>(rows: I, key_fn: F) -> Vec<(K, Estimate)>
where
    I: IntoIterator<Item = &'a SurveyRow>,
    K: Eq + Hash,
    F: Fn(&SurveyRow) -> K,
{
    let mut groups: HashMap<K, (f64, f64)> = HashMap::new();

    for row in rows {
        let entry = groups.entry(key_fn(row)).or_insert((0.0, 0.0));
        entry.0 += row.sample_size.unwrap_or(0.0);
        entry.1 += row.persons.unwrap_or(0.0);
    }

    groups
        .into_iter()
        .map(|(key, (sample_size, persons))| (key, derive_estimate(sample_size, persons)))
        .collect()
}

/// Derives proportion, percentage, and the Wald 95% interval from summed
/// counts. A non-positive sample size leaves every derived field undefined;
/// a proportion outside [0, 1] leaves only the limits undefined, since the
/// standard error is not finite there.
pub fn derive_estimate(sample_size: f64, persons: f64) -> Estimate {
    if sample_size <= 0.0 {
        return Estimate {
            sample_size,
            persons,
            proportion: None,
            data_value: None,
            confidence_limit_low: None,
            confidence_limit_high: None,
        };
    }

    let proportion = persons / sample_size;
    let std_error = (proportion * (1.0 - proportion) / sample_size).sqrt();

    let (low, high) = if std_error.is_finite() {
        (
            Some(((proportion - Z * std_error) * 100.0).clamp(0.0, 100.0)),
            Some(((proportion + Z * std_error) * 100.0).clamp(0.0, 100.0)),
        )
    } else {
        (None, None)
    };

    Estimate {
        sample_size,
        persons,
        proportion: Some(proportion),
        data_value: Some(proportion * 100.0),
        confidence_limit_low: low,
        confidence_limit_high: high,
    }
}

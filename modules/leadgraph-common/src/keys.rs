//! Derived strategy identifiers.
//!
//! Strategy nodes are keyed by a string composed from the industry and the
//! set of signal or objection types that produced them. The derivation must
//! be deterministic because counters accumulate under the key.

/// How signal types are ordered inside a signal-strategy key.
///
/// `Observed` joins the types in the order they appeared on the call, which
/// means the same multiset of signals arriving in a different order lands on
/// a different Strategy node. That is the historical behavior and the
/// default. `Sorted` normalizes the set before joining so equivalent signal
/// combinations share one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyOrder {
    #[default]
    Observed,
    Sorted,
}

/// Key for a buying-signal strategy: industry, optional company size, and
/// the signal types joined by commas.
pub fn signal_strategy_key(
    industry: &str,
    company_size: Option<&str>,
    signal_types: &[String],
    order: KeyOrder,
) -> String {
    let joined = match order {
        KeyOrder::Observed => signal_types.join(","),
        KeyOrder::Sorted => {
            let mut sorted: Vec<&str> = signal_types.iter().map(String::as_str).collect();
            sorted.sort_unstable();
            sorted.join(",")
        }
    };
    match company_size {
        Some(size) => format!("buying-signals:{industry}:{size}:{joined}"),
        None => format!("buying-signals:{industry}:{joined}"),
    }
}

/// Key for an objection-handling strategy: industry plus the overcome
/// objection types. Always sorted.
pub fn objection_strategy_key(industry: &str, objection_types: &[String]) -> String {
    let mut sorted: Vec<&str> = objection_types.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    format!("objection-handling:{industry}:{}", sorted.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn observed_order_is_sensitive_to_input_order() {
        let a = signal_strategy_key(
            "fintech",
            None,
            &types(&["budget", "timeline"]),
            KeyOrder::Observed,
        );
        let b = signal_strategy_key(
            "fintech",
            None,
            &types(&["timeline", "budget"]),
            KeyOrder::Observed,
        );
        assert_ne!(a, b);
    }

    #[test]
    fn sorted_order_normalizes_equivalent_sets() {
        let a = signal_strategy_key(
            "fintech",
            None,
            &types(&["budget", "timeline"]),
            KeyOrder::Sorted,
        );
        let b = signal_strategy_key(
            "fintech",
            None,
            &types(&["timeline", "budget"]),
            KeyOrder::Sorted,
        );
        assert_eq!(a, b);
        assert_eq!(a, "buying-signals:fintech:budget,timeline");
    }

    #[test]
    fn company_size_is_part_of_the_key_when_present() {
        let with = signal_strategy_key(
            "fintech",
            Some("11-50"),
            &types(&["budget"]),
            KeyOrder::Observed,
        );
        let without =
            signal_strategy_key("fintech", None, &types(&["budget"]), KeyOrder::Observed);
        assert_ne!(with, without);
        assert_eq!(with, "buying-signals:fintech:11-50:budget");
    }

    #[test]
    fn objection_keys_always_sort() {
        let a = objection_strategy_key("fintech", &types(&["too_busy", "no_budget"]));
        let b = objection_strategy_key("fintech", &types(&["no_budget", "too_busy"]));
        assert_eq!(a, b);
        assert_eq!(a, "objection-handling:fintech:no_budget,too_busy");
    }
}

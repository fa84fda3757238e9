// Display units inferred from telemetry key names

/// Ordered rules, first match wins. Patterns are lowercase substrings.
const UNIT_RULES: &[(&[&str], &str)] = &[
    (&["volt"], "V"),
    (&["amp"], "A"),
    (&["watt", "power"], "W"),
    (&["hertz", "hz", "freq"], "Hz"),
    (&["temp", "celsius", "°"], "°C"),
    (&["humidity", "percent", "%"], "%"),
    (&["kwh", "energy", "unit"], "kWh"),
];

/// Unit symbol for a key, or the declared label (empty if none) when no rule matches.
pub fn detect_unit(key: &str, declared: Option<&str>) -> String {
    let key = key.to_lowercase();
    UNIT_RULES
        .iter()
        .find(|(patterns, _)| patterns.iter().any(|p| key.contains(p)))
        .map(|(_, unit)| (*unit).to_string())
        .unwrap_or_else(|| declared.unwrap_or_default().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_table() {
        assert_eq!(detect_unit("voltage_l1", None), "V");
        assert_eq!(detect_unit("current_amps", None), "A");
        assert_eq!(detect_unit("activePower", None), "W");
        assert_eq!(detect_unit("grid_frequency", None), "Hz");
        assert_eq!(detect_unit("temperature", None), "°C");
        assert_eq!(detect_unit("Humidity", None), "%");
        assert_eq!(detect_unit("total_energy", None), "kWh");
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(detect_unit("Temperature_C", None), detect_unit("temperature_c", None));
        assert_eq!(detect_unit("VOLTAGE", None), "V");
    }

    #[test]
    fn test_first_match_wins() {
        // "power" is checked before "energy"
        assert_eq!(detect_unit("power_energy", None), "W");
    }

    #[test]
    fn test_unrecognized_passes_through() {
        assert_eq!(detect_unit("pressure", None), "");
        assert_eq!(detect_unit("pressure", Some("bar")), "bar");
        assert_eq!(detect_unit("", None), "");
    }
}

//! Record Validation - Invariant checks on geolocation records
//!
//! Validation collects every violation in one pass instead of stopping
//! at the first, so a single response can report all of them. The only
//! exception is a record with neither `ip` nor `url`: without an
//! identity the remaining checks are meaningless, so that violation is
//! reported alone.
//!
//! Validation also canonicalizes: accepted `ip` values are reserialized
//! through the standard parser and accepted `url` values are reduced to
//! their bare host, so stored identities always match what the
//! normalizer produces for lookups.

use std::net::IpAddr;

use crate::domain::entities::{Geolocation, Location};
use crate::domain::errors::Violation;
use crate::domain::identifier::canonical_host;

/// Validate a geolocation record and return it in canonical form.
pub fn validate(mut record: Geolocation) -> Result<Geolocation, Vec<Violation>> {
    if record.ip.is_none() && record.url.is_none() {
        return Err(vec![Violation::new(
            "identity",
            "At least one of 'ip' or 'url' must not be null",
        )]);
    }

    let mut violations = Vec::new();

    if let Some(raw) = &record.ip {
        match raw.parse::<IpAddr>() {
            Ok(addr) => record.ip = Some(addr.to_string()),
            Err(_) => violations.push(Violation::new(
                "ip",
                "'ip' field must be either ipv4 or ipv6 standard",
            )),
        }
    }

    if let Some(raw) = &record.url {
        match canonical_host(raw) {
            Some(host) => record.url = Some(host),
            None => violations.push(Violation::new(
                "url",
                "'url' field must be a correct url address",
            )),
        }
    }

    if let Some(kind) = &record.kind {
        if kind != "ipv4" && kind != "ipv6" {
            violations.push(Violation::new(
                "type",
                "'type' field must be either 'ipv4' or 'ipv6'",
            ));
        }
    }

    let required = [
        ("continent_code", &record.continent_code),
        ("continent_name", &record.continent_name),
        ("country_code", &record.country_code),
        ("country_name", &record.country_name),
        ("region_code", &record.region_code),
        ("region_name", &record.region_name),
        ("city", &record.city),
    ];
    for (field, value) in required {
        check_blank(&mut violations, field, value);
    }

    if !(-90.0..=90.0).contains(&record.latitude) {
        violations.push(Violation::new(
            "latitude",
            "Latitude must be between -90 and 90",
        ));
    }
    if !(-180.0..=180.0).contains(&record.longitude) {
        violations.push(Violation::new(
            "longitude",
            "Longitude must be between -180 and 180",
        ));
    }

    if let Some(location) = &record.location {
        validate_location(&mut violations, location);
    }

    if violations.is_empty() {
        Ok(record)
    } else {
        Err(violations)
    }
}

fn validate_location(violations: &mut Vec<Violation>, location: &Location) {
    let required = [
        ("location.capital", &location.capital),
        ("location.country_flag", &location.country_flag),
        ("location.country_flag_emoji", &location.country_flag_emoji),
        (
            "location.country_flag_emoji_unicode",
            &location.country_flag_emoji_unicode,
        ),
        ("location.calling_code", &location.calling_code),
    ];
    for (field, value) in required {
        check_blank(violations, field, value);
    }

    for (index, language) in location.languages.iter().enumerate() {
        let code_field = format!("location.languages[{index}].code");
        if language.code.trim().is_empty() {
            violations.push(Violation::new(code_field, "cannot be empty or whitespace"));
        } else if language.code.chars().count() > 5 {
            violations.push(Violation::new(code_field, "must be at most 5 characters"));
        }

        check_blank(
            violations,
            format!("location.languages[{index}].name"),
            &language.name,
        );
        check_blank(
            violations,
            format!("location.languages[{index}].native"),
            &language.native,
        );
    }
}

fn check_blank(violations: &mut Vec<Violation>, field: impl Into<String>, value: &str) {
    if value.trim().is_empty() {
        violations.push(Violation::new(field, "cannot be empty or whitespace"));
    }
}

//! Request validation performed before any prompt is built or any
//! provider is contacted.

use landing_kit_core::{Brief, EditRequest, Error, Result, TextOrList};
use regex::Regex;
use std::sync::LazyLock;

/// Firebase Hosting site ids: 6-30 chars of lowercase letters, digits, hyphens.
pub const SITE_ID_PATTERN: &str = "^[a-z0-9-]{6,30}$";

static SITE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SITE_ID_PATTERN).expect("site id pattern is valid"));

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Names of the failing checks, joined for an error response.
    pub fn summary(&self) -> String {
        self.errors.join("; ")
    }
}

/// Check the fields every generated page depends on.
///
/// Errors name the wire key of each missing field. Warnings flag values
/// that will probably produce a broken page (a CTA that is not a URL,
/// image entries that are not links) but do not block generation.
pub fn validate_brief(brief: &Brief) -> ValidationReport {
    let mut report = ValidationReport::default();

    let required = [
        ("product-name", brief.product_name()),
        ("product-description", brief.product_description()),
        ("target-audience", brief.target_audience()),
        ("product-usp", brief.product_usp()),
        ("cta-link", brief.cta_link()),
    ];
    for (field, value) in required {
        if value.is_none() {
            report.errors.push(format!("missing field '{}'", field));
        }
    }

    if let Some(link) = brief.cta_link()
        && !is_link(link)
    {
        report
            .warnings
            .push(format!("cta-link '{}' is not an absolute URL", link));
    }

    let image_fields = [
        ("heroImage", brief.hero_image.clone().map(TextOrList::Text)),
        ("featureImages", brief.feature_images.clone()),
        ("testimonialImages", brief.testimonial_images.clone()),
    ];
    for (field, value) in image_fields {
        let Some(joined) = value.and_then(|v| v.joined("\n")) else {
            continue;
        };
        let bad = joined
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !is_link(line))
            .count();
        if bad > 0 {
            report
                .warnings
                .push(format!("{} has {} entr(ies) that are not URLs", field, bad));
        }
    }

    report
}

/// Validate an edit payload, returning `(current_code, edit_instruction)`.
///
/// Neither value is trimmed: the document is round-tripped verbatim.
pub fn validate_edit_request(request: &EditRequest) -> Result<(&str, &str)> {
    let code = request
        .current_code
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| Error::MissingField("currentCode".to_string()))?;
    let instruction = request
        .edit_instruction
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| Error::MissingField("editInstruction".to_string()))?;
    Ok((code, instruction))
}

pub fn is_valid_site_id(site_id: &str) -> bool {
    SITE_ID_RE.is_match(site_id)
}

/// Reject a Firebase site id that does not match [`SITE_ID_PATTERN`].
pub fn validate_site_id(site_id: &str) -> Result<()> {
    if is_valid_site_id(site_id) {
        Ok(())
    } else {
        Err(Error::InvalidData(format!(
            "Invalid site id \"{}\": must be 6-30 characters of lowercase letters, digits and hyphens",
            site_id
        )))
    }
}

fn is_link(value: &str) -> bool {
    value.starts_with("https://") || value.starts_with("http://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use serde_json::json;

    fn brief(value: serde_json::Value) -> Brief {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_complete_brief_is_valid() {
        let report = validate_brief(&brief(json!({
            "product-name": "Acme",
            "product-description": "Widgets",
            "target-audience": "Devs",
            "product-usp": "Fastest widgets",
            "cta-link": "https://x.test"
        })));
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_missing_fields_are_named() {
        let report = validate_brief(&brief(json!({
            "product-name": "Acme",
            "product-usp": "   "
        })));

        assert!(!report.is_valid());
        let summary = report.summary();
        assert!(summary.contains("product-description"));
        assert!(summary.contains("target-audience"));
        assert!(summary.contains("product-usp"));
        assert!(summary.contains("cta-link"));
        assert!(!summary.contains("product-name"));
    }

    #[test]
    fn test_suspicious_values_only_warn() {
        let report = validate_brief(&brief(json!({
            "product-name": "Acme",
            "product-description": "Widgets",
            "target-audience": "Devs",
            "product-usp": "Fast",
            "cta-link": "wa.me/62812",
            "featureImages": "https://img.test/a.png\nnot a link"
        })));

        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings[0].contains("cta-link"));
        assert!(report.warnings[1].contains("featureImages"));
    }

    #[test]
    fn test_edit_request_requires_both_fields() {
        let ok = EditRequest {
            current_code: Some("<html>\n</html>\n".into()),
            edit_instruction: Some("make the hero red".into()),
        };
        let (code, instruction) = validate_edit_request(&ok).unwrap();
        assert_eq!(code, "<html>\n</html>\n");
        assert_eq!(instruction, "make the hero red");

        let missing_code = EditRequest {
            current_code: None,
            edit_instruction: Some("x".into()),
        };
        let err = validate_edit_request(&missing_code).unwrap_err();
        assert!(err.to_string().contains("currentCode"));

        let blank_instruction = EditRequest {
            current_code: Some("<html></html>".into()),
            edit_instruction: Some("  ".into()),
        };
        let err = validate_edit_request(&blank_instruction).unwrap_err();
        assert!(err.to_string().contains("editInstruction"));
    }

    #[test]
    fn test_site_id_examples() {
        for ok in ["abcdef", "my-landing-01", "------", "a".repeat(30).as_str()] {
            assert!(is_valid_site_id(ok), "{ok} should be valid");
        }
        for bad in [
            "AB",
            "abcde",
            "a".repeat(31).as_str(),
            "Abcdef",
            "abc_def",
            "abc.def",
            "abc def",
            "abcdé1",
            "",
            "abcdef\n",
        ] {
            assert!(!is_valid_site_id(bad), "{bad:?} should be invalid");
            assert!(validate_site_id(bad).is_err());
        }
    }

    /// Reference predicate written out by hand, compared against the regex.
    fn expected_site_id(s: &str) -> bool {
        let len = s.chars().count();
        (6..=30).contains(&len)
            && s
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    }

    #[test]
    fn test_site_id_matches_reference_for_generated_strings() {
        const ALPHABET: &[char] = &['a', 'z', 'm', '0', '9', '-', 'A', 'Z', '_', '.', ' ', 'é', '/'];
        let mut rng = StdRng::seed_from_u64(0x5173_1d00);

        for _ in 0..5_000 {
            let len = rng.gen_range(0..34);
            // Bias toward the valid alphabet so both outcomes are exercised.
            let pool = if rng.gen_bool(0.5) { 6 } else { ALPHABET.len() };
            let s: String = (0..len).map(|_| ALPHABET[rng.gen_range(0..pool)]).collect();
            assert_eq!(is_valid_site_id(&s), expected_site_id(&s), "input {s:?}");
        }
    }
}

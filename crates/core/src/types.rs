use serde::{Deserialize, Deserializer, Serialize};

/// Landing-page brief submitted by the frontend form.
///
/// Keys follow the form's element ids (`product-name`), with camelCase
/// aliases for API clients. Every field is optional at this level; which
/// ones are required is decided by the validator and the prompt builder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Brief {
    #[serde(rename = "product-name", alias = "productName", default)]
    pub product_name: Option<String>,

    #[serde(rename = "product-description", alias = "productDescription", default)]
    pub product_description: Option<String>,

    #[serde(rename = "target-audience", alias = "targetAudience", default)]
    pub target_audience: Option<String>,

    #[serde(rename = "product-usp", alias = "productUsp", default)]
    pub product_usp: Option<String>,

    #[serde(rename = "product-price", alias = "productPrice", default)]
    pub product_price: Option<String>,

    #[serde(rename = "product-slashed-price", alias = "productSlashedPrice", default)]
    pub product_slashed_price: Option<String>,

    #[serde(rename = "finalGoal", alias = "final-goal", default)]
    pub final_goal: Option<String>,

    #[serde(rename = "cta-link", alias = "ctaLink", default)]
    pub cta_link: Option<String>,

    #[serde(rename = "product-offer", alias = "productOffer", default)]
    pub product_offer: Option<String>,

    #[serde(rename = "color-scheme", alias = "colorScheme", default)]
    pub color_scheme: Option<String>,

    #[serde(default)]
    pub mood: Option<String>,

    #[serde(rename = "language-style", alias = "languageStyle", default)]
    pub language_style: Option<String>,

    #[serde(rename = "requiredSections", alias = "required-sections", default)]
    pub required_sections: Option<TextOrList>,

    #[serde(rename = "reference-link", alias = "referenceLink", default)]
    pub reference_link: Option<String>,

    #[serde(rename = "heroImage", alias = "hero-image", default)]
    pub hero_image: Option<String>,

    #[serde(rename = "featureImages", alias = "feature-images", default)]
    pub feature_images: Option<TextOrList>,

    #[serde(
        rename = "featureSlider",
        alias = "feature-slider",
        default,
        deserialize_with = "deserialize_flag"
    )]
    pub feature_slider: bool,

    #[serde(rename = "testimonialImages", alias = "testimonial-images", default)]
    pub testimonial_images: Option<TextOrList>,

    #[serde(rename = "additional-details", alias = "additionalDetails", default)]
    pub additional_details: Option<String>,
}

impl Brief {
    pub fn product_name(&self) -> Option<&str> {
        present(&self.product_name)
    }

    pub fn product_description(&self) -> Option<&str> {
        present(&self.product_description)
    }

    pub fn target_audience(&self) -> Option<&str> {
        present(&self.target_audience)
    }

    pub fn product_usp(&self) -> Option<&str> {
        present(&self.product_usp)
    }

    pub fn cta_link(&self) -> Option<&str> {
        present(&self.cta_link)
    }
}

/// A form value that may arrive as one string or as a list of strings
/// (multi-select sections, one image URL per line vs. an array).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextOrList {
    Text(String),
    List(Vec<String>),
}

impl TextOrList {
    /// Join the non-blank entries with `separator`; `None` if nothing is left.
    pub fn joined(&self, separator: &str) -> Option<String> {
        let joined = match self {
            TextOrList::Text(text) => text.trim().to_string(),
            TextOrList::List(items) => items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(separator),
        };

        if joined.is_empty() { None } else { Some(joined) }
    }
}

/// Payload of an edit round-trip: the full current document plus a
/// free-text instruction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    #[serde(default)]
    pub current_code: Option<String>,
    #[serde(default)]
    pub edit_instruction: Option<String>,
}

/// Trimmed value of an optional form field, treating blank as absent.
pub fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Checkbox values arrive as booleans from JS clients and as strings
/// ("on", "true") from plain form serializers.
fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
        Number(i64),
        Null(()),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => {
            let s = s.trim();
            !s.is_empty() && !s.eq_ignore_ascii_case("false") && s != "0"
        }
        Flag::Number(n) => n != 0,
        Flag::Null(()) => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_brief_accepts_kebab_and_camel_keys() {
        let kebab: Brief = serde_json::from_value(json!({
            "product-name": "Acme",
            "cta-link": "https://x.test"
        }))
        .unwrap();
        let camel: Brief = serde_json::from_value(json!({
            "productName": "Acme",
            "ctaLink": "https://x.test"
        }))
        .unwrap();

        assert_eq!(kebab.product_name(), Some("Acme"));
        assert_eq!(camel.product_name(), Some("Acme"));
        assert_eq!(kebab.cta_link(), camel.cta_link());
    }

    #[test]
    fn test_blank_fields_are_absent() {
        let brief: Brief = serde_json::from_value(json!({
            "product-name": "   ",
            "product-usp": ""
        }))
        .unwrap();

        assert_eq!(brief.product_name(), None);
        assert_eq!(brief.product_usp(), None);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let brief: Brief = serde_json::from_value(json!({
            "product-name": "Acme",
            "some-new-field": 42
        }))
        .unwrap();
        assert_eq!(brief.product_name(), Some("Acme"));
    }

    #[test]
    fn test_text_or_list_joined() {
        let list = TextOrList::List(vec!["hero".into(), " ".into(), "faq".into()]);
        assert_eq!(list.joined(", ").as_deref(), Some("hero, faq"));

        let text = TextOrList::Text("  a\nb  ".into());
        assert_eq!(text.joined(", ").as_deref(), Some("a\nb"));

        assert_eq!(TextOrList::List(vec![]).joined(", "), None);
    }

    #[test]
    fn test_feature_slider_flag_forms() {
        for (value, expected) in [
            (json!(true), true),
            (json!(false), false),
            (json!("on"), true),
            (json!("false"), false),
            (json!(""), false),
            (json!(1), true),
            (json!(null), false),
        ] {
            let brief: Brief =
                serde_json::from_value(json!({ "featureSlider": value.clone() })).unwrap();
            assert_eq!(brief.feature_slider, expected, "value {value}");
        }

        let brief: Brief = serde_json::from_value(json!({})).unwrap();
        assert!(!brief.feature_slider);
    }

    #[test]
    fn test_edit_request_camel_case() {
        let req: EditRequest = serde_json::from_value(json!({
            "currentCode": "<html></html>",
            "editInstruction": "make it blue"
        }))
        .unwrap();
        assert_eq!(req.current_code.as_deref(), Some("<html></html>"));
        assert_eq!(req.edit_instruction.as_deref(), Some("make it blue"));
    }
}

//! Prompt templates for page generation and page editing.
//!
//! Both builders are pure: the same input always yields the same prompts.

use landing_kit_core::{Brief, Error, Result, TextOrList, present};

pub const DEFAULT_PRICE: &str = "Not specified (focus on leads).";
pub const DEFAULT_SLASHED_PRICE: &str = "None.";
pub const DEFAULT_OFFER: &str = "No special offer.";
pub const DEFAULT_REFERENCE: &str = "None.";
pub const DEFAULT_IMAGES: &str = "Use standard placeholders.";
pub const DEFAULT_ADDITIONAL: &str = "Focus on sales conversion.";
pub const DEFAULT_UNSPECIFIED: &str = "Not specified.";

/// System and user prompt sent together in one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

const GENERATION_SYSTEM_PROMPT: &str = r#"You are an expert direct-response marketer and an elite frontend developer. Your main mission is to sell the user's product.

Hard rules (technical):
1. ALWAYS use Tailwind CSS classes. Do NOT use custom <style> tags.
2. Build a mobile-first, fully responsive design.
3. Do NOT wrap the answer in ```html markdown. Return ONLY the complete HTML document, starting with `<!DOCTYPE html>`.
4. If the user supplies image links you MUST use them. Otherwise use the placeholder `https://placehold.co/600x400`.
5. Show the testimonial image assets as FULL images (screenshot proof), not as profile pictures.
6. ALWAYS use the CTA link for EVERY primary call-to-action button.
7. For every meaningful HTML element (div, h1, p, button, a, img, section) add a unique `data-id` attribute in the form `data-id="lp-el-{uuid}"`, replacing {uuid} with 8 random characters (for example `data-id="lp-el-a1b2c3d4"`). The visual editor depends on it."#;

const EDIT_SYSTEM_PROMPT: &str = r#"You are an HTML/Tailwind CSS code editor focused on conversion optimization.

Hard rules:
1. Return ONLY the complete, modified HTML document.
2. Do NOT wrap the answer in ```html markdown.
3. Do NOT add explanations outside the HTML code.
4. You MUST keep every existing `data-id` attribute in the code. Give any new element its own new `data-id`. Never remove an existing data-id."#;

/// Build the prompts for a fresh landing page.
///
/// Fails with [`Error::MissingField`] when the brief lacks a product name,
/// description, target audience or CTA link. Every other field falls back
/// to a default phrase.
pub fn build_generation_prompt(brief: &Brief) -> Result<PromptPair> {
    let name = required(brief.product_name(), "product-name")?;
    let description = required(brief.product_description(), "product-description")?;
    let audience = required(brief.target_audience(), "target-audience")?;
    let cta = required(brief.cta_link(), "cta-link")?;

    let or = |value: &Option<String>, default: &'static str| -> String {
        present(value).unwrap_or(default).to_string()
    };
    let list_or = |value: &Option<TextOrList>, separator: &str, default: &'static str| -> String {
        value
            .as_ref()
            .and_then(|v| v.joined(separator))
            .unwrap_or_else(|| default.to_string())
    };

    let layout = if brief.feature_slider { "Slider" } else { "Grid" };

    let lines = [
        format!("* Brand/Product Name: {}", name),
        format!("* Product Description: {}", description),
        format!("* Target Audience: {}", audience),
        format!(
            "* Unique Selling Proposition: {}",
            or(&brief.product_usp, DEFAULT_UNSPECIFIED)
        ),
        format!("* Selling Price: {}", or(&brief.product_price, DEFAULT_PRICE)),
        format!(
            "* Slashed (Normal) Price: {}",
            or(&brief.product_slashed_price, DEFAULT_SLASHED_PRICE)
        ),
        format!("* Main Goal: {}", or(&brief.final_goal, DEFAULT_UNSPECIFIED)),
        format!("* Call-To-Action (CTA) Link: {}", cta),
        format!(
            "* Offer/Urgency: {}",
            or(&brief.product_offer, DEFAULT_OFFER)
        ),
        format!(
            "* Brand Colors: {}",
            or(&brief.color_scheme, DEFAULT_UNSPECIFIED)
        ),
        format!("* Visual Style (Mood): {}", or(&brief.mood, DEFAULT_UNSPECIFIED)),
        format!(
            "* Language Style (Tone): {}",
            or(&brief.language_style, DEFAULT_UNSPECIFIED)
        ),
        format!(
            "* Required Sections: {}",
            list_or(&brief.required_sections, ", ", DEFAULT_UNSPECIFIED)
        ),
        format!(
            "* Inspiration (Optional): {}",
            or(&brief.reference_link, DEFAULT_REFERENCE)
        ),
        format!("* Hero Image Asset: {}", or(&brief.hero_image, DEFAULT_IMAGES)),
        format!(
            "* Feature Image Assets (one or more, one per line): {} (Display as: {})",
            list_or(&brief.feature_images, "\n", DEFAULT_IMAGES),
            layout
        ),
        format!(
            "* Testimonial Image Assets (one or more, one per line): {}",
            list_or(&brief.testimonial_images, "\n", DEFAULT_IMAGES)
        ),
        format!(
            "* Additional Notes: {}",
            or(&brief.additional_details, DEFAULT_ADDITIONAL)
        ),
    ];

    let user = format!(
        "\n### Client Brief ###\n{}\n\nGenerate one complete, single HTML document. Do not forget the main mission: make this page **sell**, and add a **data-id** to every element.",
        lines.join("\n")
    );

    Ok(PromptPair {
        system: GENERATION_SYSTEM_PROMPT.to_string(),
        user,
    })
}

/// Build the prompts for editing an existing page.
///
/// `current_code` and `instruction` are embedded verbatim; the whole
/// document travels through the model and comes back replaced.
pub fn build_edit_prompt(current_code: &str, instruction: &str) -> PromptPair {
    let user = format!(
        "\n### CURRENT HTML CODE:\n{}\n\n### EDIT INSTRUCTION:\n{}\n\nProduce the updated HTML code. Remember to keep every existing 'data-id' attribute.",
        current_code, instruction
    );

    PromptPair {
        system: EDIT_SYSTEM_PROMPT.to_string(),
        user,
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str> {
    value.ok_or_else(|| Error::MissingField(field.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_brief() -> Brief {
        Brief {
            product_name: Some("Acme".into()),
            product_description: Some("Widgets".into()),
            target_audience: Some("Devs".into()),
            cta_link: Some("https://x.test".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_minimal_brief_uses_defaults() {
        let prompts = build_generation_prompt(&minimal_brief()).unwrap();

        for value in ["Acme", "Widgets", "Devs", "https://x.test"] {
            assert!(prompts.user.contains(value), "missing {value}");
        }
        for default in [
            DEFAULT_OFFER,
            DEFAULT_SLASHED_PRICE,
            DEFAULT_PRICE,
            DEFAULT_REFERENCE,
            DEFAULT_IMAGES,
            DEFAULT_ADDITIONAL,
        ] {
            assert!(prompts.user.contains(default), "missing default {default}");
        }
        assert!(prompts.user.contains("* Offer/Urgency: No special offer."));
        assert!(prompts.user.contains("* Slashed (Normal) Price: None."));
        assert!(prompts.user.contains("(Display as: Grid)"));
        assert!(prompts.system.contains("<!DOCTYPE html>"));
        assert!(prompts.system.contains("data-id=\"lp-el-"));
    }

    #[test]
    fn test_provided_fields_replace_defaults() {
        let brief = Brief {
            product_usp: Some("Hand-made".into()),
            product_price: Some("Rp 99.000".into()),
            product_slashed_price: Some("Rp 150.000".into()),
            product_offer: Some("Free shipping today".into()),
            color_scheme: Some("navy and gold".into()),
            mood: Some("premium".into()),
            language_style: Some("casual".into()),
            final_goal: Some("sales".into()),
            required_sections: Some(TextOrList::List(vec!["FAQ".into(), "Pricing".into()])),
            reference_link: Some("https://inspo.test".into()),
            hero_image: Some("https://img.test/hero.png".into()),
            feature_images: Some(TextOrList::Text(
                "https://img.test/1.png\nhttps://img.test/2.png".into(),
            )),
            feature_slider: true,
            testimonial_images: Some(TextOrList::List(vec!["https://img.test/t.png".into()])),
            additional_details: Some("Mention the warranty".into()),
            ..minimal_brief()
        };

        let prompts = build_generation_prompt(&brief).unwrap();
        for value in [
            "Hand-made",
            "Rp 99.000",
            "Rp 150.000",
            "Free shipping today",
            "navy and gold",
            "premium",
            "casual",
            "sales",
            "FAQ, Pricing",
            "https://inspo.test",
            "https://img.test/hero.png",
            "https://img.test/1.png\nhttps://img.test/2.png",
            "(Display as: Slider)",
            "https://img.test/t.png",
            "Mention the warranty",
        ] {
            assert!(prompts.user.contains(value), "missing {value}");
        }
        for default in [DEFAULT_OFFER, DEFAULT_PRICE, DEFAULT_ADDITIONAL, DEFAULT_IMAGES] {
            assert!(!prompts.user.contains(default), "unexpected default {default}");
        }
    }

    #[test]
    fn test_one_labeled_line_per_field() {
        let prompts = build_generation_prompt(&minimal_brief()).unwrap();
        let labeled = prompts.user.lines().filter(|l| l.starts_with("* ")).count();
        assert_eq!(labeled, 18);
    }

    #[test]
    fn test_missing_required_field_is_named() {
        for field in ["product-name", "product-description", "target-audience", "cta-link"] {
            let mut brief = minimal_brief();
            match field {
                "product-name" => brief.product_name = None,
                "product-description" => brief.product_description = Some("  ".into()),
                "target-audience" => brief.target_audience = None,
                _ => brief.cta_link = None,
            }
            let err = build_generation_prompt(&brief).unwrap_err();
            assert!(
                matches!(&err, Error::MissingField(f) if f == field),
                "{field}: {err}"
            );
        }
    }

    #[test]
    fn test_generation_prompt_is_deterministic() {
        let a = build_generation_prompt(&minimal_brief()).unwrap();
        let b = build_generation_prompt(&minimal_brief()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_edit_prompt_embeds_document_verbatim() {
        let code = format!(
            "<!DOCTYPE html>\n<html><body data-id=\"lp-el-a1b2c3d4\">{}</body></html>\n",
            "<p>ünïcødé &amp; ``` fences</p>\n".repeat(2_000)
        );
        let instruction = "Change the headline to \"Buy now\"\nand keep the footer.";

        let prompts = build_edit_prompt(&code, instruction);
        assert!(prompts.user.contains(&code));
        assert!(prompts.user.contains(instruction));
        assert!(prompts.system.contains("data-id"));
    }
}

//! Response schema for the structured content request.
//!
//! Field names match [`crate::model::GeneratedContent`]'s wire names exactly;
//! every property is listed as required so the provider cannot omit sections.

use serde_json::{Value, json};

fn string(description: &str) -> Value {
    json!({ "type": "STRING", "description": description })
}

fn string_list(description: &str) -> Value {
    json!({ "type": "ARRAY", "items": { "type": "STRING" }, "description": description })
}

fn concept(description: &str) -> Value {
    json!({
        "type": "OBJECT",
        "description": description,
        "properties": {
            "explanation": string("What the scene shows."),
            "rationale": string("Why this scene converts buyers."),
            "prompt": string("Technical rendering prompt for the scene.")
        },
        "required": ["explanation", "rationale", "prompt"]
    })
}

/// Build the strict JSON schema for a [`crate::model::GeneratedContent`] response.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn generated_content_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "trendAndStrategy": {
                "type": "OBJECT",
                "properties": {
                    "visualTrends": string("In-depth analysis of relevant visual trends."),
                    "copywritingTrends": string("Copywriting trends and content angles."),
                    "actionableAdvice": string("Concrete advice to raise conversion.")
                },
                "required": ["visualTrends", "copywritingTrends", "actionableAdvice"]
            },
            "priceSuggestion": {
                "type": "OBJECT",
                "properties": {
                    "suggestedPriceRange": string("Suggested selling price range."),
                    "justification": string("Market data and product value analysis.")
                },
                "required": ["suggestedPriceRange", "justification"]
            },
            "titles": string_list("Three (3) optimal product titles (< 150 characters) with strong SEO."),
            "shortDescription": string(
                "Short persuasive hook (2-3 sentences) ending with a clear micro call to action."
            ),
            "shortHighlights": string_list("3-5 short bullet points."),
            "bulletFeatures": string_list("4-8 detailed key feature points."),
            "longDescription": string(
                "Full description (800+ words): usage scenarios, buyer pain points, key highlights, \
                 main features, technical specifications, a call to action wrapped in [CTA]...[/CTA], \
                 and 15+ hashtags."
            ),
            "whatsInTheBox": string("Package contents."),
            "seoKeywords": {
                "type": "OBJECT",
                "properties": {
                    "primary": string_list("5 primary keywords."),
                    "secondary": string_list("8 secondary keywords."),
                    "longTail": string_list("10 specific long-tail keywords."),
                    "backendTags": string_list("7 hidden search tags.")
                },
                "required": ["primary", "secondary", "longTail", "backendTags"]
            },
            "imageConcepts": {
                "type": "OBJECT",
                "properties": {
                    "hero": concept("Main hero image concept."),
                    "supporting": {
                        "type": "ARRAY",
                        "items": concept("Supporting image concept."),
                        "description": "Five (5) varied supporting image concepts."
                    },
                    "reasoning": string("Strategic reasoning behind the visual set.")
                },
                "required": ["hero", "supporting", "reasoning"]
            },
            "videoContent": {
                "type": "OBJECT",
                "properties": {
                    "hooks": string_list("3 viral hooks for the first 3 seconds."),
                    "storyboard": {
                        "type": "ARRAY",
                        "description": "Frame-by-frame storyboard.",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "scene": string("Scene number and title (e.g. Scene 1: Problem)."),
                                "visual": string("What is visible on screen."),
                                "audio": string("Sound, music, or voiceover."),
                                "duration": string("Scene duration in seconds.")
                            },
                            "required": ["scene", "visual", "audio", "duration"]
                        }
                    }
                },
                "required": ["hooks", "storyboard"]
            },
            "complianceReport": {
                "type": "OBJECT",
                "properties": {
                    "status": { "type": "STRING" },
                    "notes": { "type": "ARRAY", "items": { "type": "STRING" } }
                },
                "required": ["status", "notes"]
            }
        },
        "required": [
            "trendAndStrategy", "priceSuggestion", "titles", "shortDescription", "shortHighlights",
            "bulletFeatures", "longDescription", "whatsInTheBox", "seoKeywords", "imageConcepts",
            "videoContent", "complianceReport"
        ]
    })
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod tests;

use serde::Serialize;
use serde_json::Value;

/// Delimiter the prompt template ends with. Post-processing splits the generated text
/// on this exact string, so the template and [`extract_recipe`] must never drift apart.
pub const PROMPT_TERMINATOR: &str = "### PREPARACIÓN:\n";

/// Section marker of the checkpoint's training format. Anything the model emits after
/// the preparation section opens with this.
pub const SECTION_MARKER: &str = "###";

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRecipeRequest {
    pub dish_name: String,
    pub ingredients: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateRecipeResponse {
    pub recipe: String,
}

impl GenerateRecipeRequest {
    /// Validates the decoded request body. Messages are sent to the client as the 400
    /// response body, so they name the offending field.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let Some(body) = value.as_object() else {
            return Err("request body must be a JSON object".to_string());
        };

        let Some(entries) = body.get("ingredients").and_then(Value::as_array) else {
            return Err(
                "the 'ingredients' field is required and must be a list of strings".to_string(),
            );
        };
        if entries.is_empty() {
            return Err("the 'ingredients' list must not be empty".to_string());
        }
        let mut ingredients = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry.as_str() {
                Some(ingredient) => ingredients.push(ingredient.to_string()),
                None => {
                    return Err("the 'ingredients' field must contain only strings".to_string())
                }
            }
        }

        let dish_name = match body.get("dish_name").and_then(Value::as_str) {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => {
                return Err(
                    "the 'dish_name' field is required and must be a non-empty string".to_string(),
                )
            }
        };

        Ok(GenerateRecipeRequest {
            dish_name,
            ingredients,
        })
    }
}

/// Renders the fixed prompt the checkpoint was tuned on. The terminator is appended
/// last and appears nowhere else in the template.
pub fn build_prompt(request: &GenerateRecipeRequest) -> String {
    let mut prompt = format!("### RECETA: {}\n\n### INGREDIENTES:\n", request.dish_name);
    for ingredient in &request.ingredients {
        prompt.push_str("- ");
        prompt.push_str(ingredient);
        prompt.push('\n');
    }
    prompt.push('\n');
    prompt.push_str(PROMPT_TERMINATOR);
    prompt
}

/// Turns raw generated text into the user-facing recipe: drop everything up to and
/// including the first prompt terminator, cut the remainder at the next section
/// marker, trim surrounding whitespace.
pub fn extract_recipe(raw: &str) -> String {
    let continuation = match raw.split_once(PROMPT_TERMINATOR) {
        Some((_, rest)) => rest,
        None => raw,
    };
    let recipe = match continuation.find(SECTION_MARKER) {
        Some(pos) => &continuation[..pos],
        None => continuation,
    };
    recipe.trim().to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn tortilla_request() -> GenerateRecipeRequest {
        GenerateRecipeRequest {
            dish_name: "Tortilla".to_string(),
            ingredients: vec![
                "eggs".to_string(),
                "potato".to_string(),
                "onion".to_string(),
            ],
        }
    }

    #[test]
    fn prompt_lists_every_ingredient_and_ends_with_terminator() {
        let prompt = build_prompt(&tortilla_request());
        assert!(prompt.starts_with("### RECETA: Tortilla\n"));
        assert!(prompt.contains("- eggs\n"));
        assert!(prompt.contains("- potato\n"));
        assert!(prompt.contains("- onion\n"));
        assert!(prompt.ends_with(PROMPT_TERMINATOR));
    }

    #[test]
    fn prompt_emits_the_terminator_exactly_once() {
        let prompt = build_prompt(&tortilla_request());
        assert_eq!(prompt.matches(PROMPT_TERMINATOR).count(), 1);
    }

    #[test]
    fn extraction_strips_prompt_echo_and_trailing_section() {
        let raw = format!(
            "{}cook eggs and potato ### NOTES: optional",
            build_prompt(&tortilla_request())
        );
        assert_eq!(extract_recipe(&raw), "cook eggs and potato");
    }

    #[test]
    fn extraction_keeps_everything_when_no_trailing_marker() {
        let raw = format!(
            "{}Batir los huevos y freír las patatas.\n",
            build_prompt(&tortilla_request())
        );
        assert_eq!(extract_recipe(&raw), "Batir los huevos y freír las patatas.");
    }

    #[test]
    fn extraction_is_idempotent() {
        let raw = format!(
            "{}paso uno\npaso dos\n### CONSEJOS: ninguno",
            build_prompt(&tortilla_request())
        );
        let once = extract_recipe(&raw);
        assert_eq!(extract_recipe(&once), once);
    }

    #[test]
    fn extraction_without_terminator_falls_back_to_trimmed_input() {
        assert_eq!(extract_recipe("  plain text  "), "plain text");
    }

    #[test]
    fn valid_request_is_accepted() {
        let value = json!({"dish_name": "Tortilla", "ingredients": ["eggs", "potato", "onion"]});
        let request = GenerateRecipeRequest::from_value(&value).unwrap();
        assert_eq!(request, tortilla_request());
    }

    #[test]
    fn missing_ingredients_are_rejected() {
        let value = json!({"dish_name": "Tortilla"});
        let err = GenerateRecipeRequest::from_value(&value).unwrap_err();
        assert!(err.contains("'ingredients'"));
    }

    #[test]
    fn empty_ingredient_list_is_rejected() {
        let value = json!({"dish_name": "Tortilla", "ingredients": []});
        let err = GenerateRecipeRequest::from_value(&value).unwrap_err();
        assert!(err.contains("'ingredients'"));
    }

    #[test]
    fn non_list_ingredients_are_rejected() {
        let value = json!({"dish_name": "Tortilla", "ingredients": "eggs"});
        let err = GenerateRecipeRequest::from_value(&value).unwrap_err();
        assert!(err.contains("'ingredients'"));
    }

    #[test]
    fn non_string_ingredient_entries_are_rejected() {
        let value = json!({"dish_name": "Tortilla", "ingredients": ["eggs", 3]});
        let err = GenerateRecipeRequest::from_value(&value).unwrap_err();
        assert!(err.contains("'ingredients'"));
    }

    #[test]
    fn missing_dish_name_is_rejected_even_with_valid_ingredients() {
        let value = json!({"ingredients": ["eggs", "potato"]});
        let err = GenerateRecipeRequest::from_value(&value).unwrap_err();
        assert!(err.contains("'dish_name'"));
    }

    #[test]
    fn blank_dish_name_is_rejected() {
        let value = json!({"dish_name": "   ", "ingredients": ["eggs"]});
        let err = GenerateRecipeRequest::from_value(&value).unwrap_err();
        assert!(err.contains("'dish_name'"));
    }

    #[test]
    fn non_object_body_is_rejected() {
        let value = json!(["eggs", "potato"]);
        assert!(GenerateRecipeRequest::from_value(&value).is_err());
    }
}

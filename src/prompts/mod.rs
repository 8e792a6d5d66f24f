//! Prompt templates for the personalization pipeline
//!
//! Both prompts are fixed templates filled with the campaign's product subject
//! and target audience.

/// Image tag the model must leave untouched in the email body
pub const IMAGE_PLACEHOLDER: &str = r#"<img src="cid:sample_image"/>"#;

/// JSON shape the email reply must fit
pub const JSON_TEMPLATE: &str = "{subject: , content: }";

/// Default product subject
pub const DEFAULT_SUBJECT: &str = "Jackets";

/// Default audience description
pub const DEFAULT_AUDIENCE: &str = "young adult";

/// Builds the prompts for one campaign
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptComposer {
    /// Product category being promoted, e.g. "Jackets"
    pub subject: String,
    /// Audience the email and image should appeal to
    pub audience: String,
}

impl PromptComposer {
    pub fn new(subject: &str, audience: &str) -> Self {
        Self {
            subject: subject.to_string(),
            audience: audience.to_string(),
        }
    }

    /// Prompt asking for a short image-editing instruction
    pub fn edit_instruction(&self) -> String {
        format!(
            r#"Generate a prompt for an image generation model to modify an image of "{}" to make it more appealing to a {} audience. Limit it to 10 words.

Respond with ONLY the prompt, no explanations or preamble."#,
            self.subject, self.audience
        )
    }

    /// Prompt asking for the email as a single-line JSON object
    pub fn email_composition(&self) -> String {
        format!(
            r#"Generate a HTML email to sell "{subject}" to a {audience} audience and output ONLY a JSON object with subject, and content in HTML. Leave a space for the generated image as part of the content.

Do not try to fill the {placeholder} tag.

Fit the output in the provided JSON template {template}. Do not output any \n or newline characters.

Here's a sample email HTML that you can use to generate the email content:

<html><body><p>This is a test email with an embedded image:</p>{placeholder}</body></html>"#,
            subject = self.subject,
            audience = self.audience,
            placeholder = IMAGE_PLACEHOLDER,
            template = JSON_TEMPLATE,
        )
    }
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new(DEFAULT_SUBJECT, DEFAULT_AUDIENCE)
    }
}

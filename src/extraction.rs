use reqwest::Client;
use serde_json::{Value, json};

use crate::llm::{self, LlmConfig, LlmError};

pub const EXTRACTION_INSTRUCTION: &str = "\
Identify the main content of the text (i.e., the article or newsletter body). \
Provide the exact text for that main content verbatim, without summarizing or rewriting any part of it. \
Exclude all non-essential elements such as banners, headers, footers, calls to action, ads, or purely navigational text. \
Format this output as markdown using appropriate '#' characters as heading levels. \
Exclude any promotional or sponsored content on your output.

Additionally, you must identify and extract the image urls within this main content. \
These images must be inside the main content of the page so you must exclude small logo images, icons, avatars and other images which aren't a core part of the main content. \
The images you extract should at least have a width of 600 pixels (px) so it can be included on our content.";

const IMAGE_ITEM_DESCRIPTION: &str = "An image url that appears within the main content of the web page. \
This image must be inside the main content of the page so you must exclude small logo images, icons, avatars and other images which aren't a core part of the main content. \
The image should be at least 600px in width.";

/// JSON Schema the model is asked to fill. `content` and
/// `main_content_image_urls` are always required.
pub fn extraction_schema(include_metadata: bool, include_links: bool) -> Value {
    let mut properties = json!({
        "content": {
            "type": "string",
            "description": "The exact verbatim main text content of the web page in markdown format."
        },
        "main_content_image_urls": {
            "type": "array",
            "items": {
                "type": "string",
                "description": IMAGE_ITEM_DESCRIPTION
            },
            "description": "An array of the exact image urls that appear within the main content of the web page. Extra images such as icons and images not relevant to the main content MUST be excluded."
        }
    });

    if include_metadata {
        properties["metadata"] = json!({
            "type": "object",
            "description": "Metadata about the main content.",
            "properties": {
                "title": { "type": "string" },
                "author": { "type": "string" },
                "published_date": { "type": "string" },
                "description": { "type": "string" }
            }
        });
    }
    if include_links {
        properties["links"] = json!({
            "type": "array",
            "items": { "type": "string" },
            "description": "Absolute urls of links that appear within the main content of the web page."
        });
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": ["content", "main_content_image_urls"]
    })
}

/// Schema-constrained extraction over a page's markdown.
#[derive(Debug, Clone)]
pub struct LlmExtractionStrategy {
    pub llm: LlmConfig,
    pub schema: Value,
    pub instruction: String,
}

impl LlmExtractionStrategy {
    pub fn new(llm: LlmConfig, schema: Value) -> Self {
        Self {
            llm,
            schema,
            instruction: EXTRACTION_INSTRUCTION.to_string(),
        }
    }

    pub fn system_prompt(&self) -> String {
        let schema = serde_json::to_string_pretty(&self.schema).unwrap_or_default();
        let mut result = String::with_capacity(self.instruction.len() + schema.len() + 128);
        result.push_str(&self.instruction);
        result.push_str("\n\nRespond with a single JSON object that conforms to this JSON schema:\n");
        result.push_str(&schema);
        result
    }

    pub fn build_prompt(&self, markdown: &str) -> String {
        let mut result = String::with_capacity(markdown.len() + 64);
        result.push_str("The following is the content of a webpage in markdown:\n\n");
        result.push_str(markdown);
        result
    }

    /// Raw JSON text from the model; decoding happens in `normalize`.
    pub async fn extract(&self, client: &Client, markdown: &str) -> Result<String, LlmError> {
        llm::chat_json(
            client,
            &self.llm,
            &self.system_prompt(),
            &self.build_prompt(markdown),
        )
        .await
    }
}

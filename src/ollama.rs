use reqwest::Client;
use regex::Regex;
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};

use crate::project::{ChatRole, ChatTurn, FileNode};

const SYSTEM_INSTRUCTION: &str = "You are an expert web developer. You generate and modify the code for a small web project based on the conversation with the user and the current project files.

- If there are no existing files, act as a wireframe generator: output HTML and CSS for a simple black-and-white wireframe of the website the user describes. Use only boxes, outlined divs, nav bars, and placeholders such as [Logo], [Nav], [Hero Image], [Text Box]. No colors, no real content. Keep the HTML and CSS minimal and clean.
- If there are existing files, modify them according to the request. You may add new files, update existing ones, or remove files by omitting them from your response.
- If the user provides a JSON object of design tokens, update the CSS to use those values, preferably as CSS variables in a :root selector.

CRITICAL: Always return the COMPLETE, UPDATED list of ALL project files, including the ones you did not change. Your output represents the entire project state.

Respond with a single JSON object and nothing else, shaped exactly like this:
{\"explanation\": \"...\", \"files\": [{\"name\": \"index.html\", \"content\": \"...\"}]}

\"explanation\" is a short, friendly summary of what you changed. \"files\" holds every project file with its complete content. Make sure the HTML links to CSS and JS files with relative paths.";

const FOLLOW_UP_INSTRUCTION: &str = "You are a web development assistant helping the user grow a wireframe step by step. Given the user's last request and a summary of the work just completed, ask exactly one short follow-up question that suggests a logical next step for the layout or structure. Do not generate code. Do not repeat the summary. Respond with the question and nothing else.";

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

/// A parsed generation result: the model's summary plus the complete
/// replacement file set.
#[derive(Debug, Deserialize, PartialEq)]
pub struct GeneratedSite {
    pub explanation: String,
    pub files: Vec<FileNode>,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.to_string(),
        }
    }

    /// Runs one generation turn: the whole transcript and the current file
    /// set go out, a complete replacement file set comes back.
    pub async fn generate_site(
        &self,
        model: &str,
        temperature: f32,
        turns: &[ChatTurn],
        files: &[FileNode],
    ) -> Result<GeneratedSite> {
        let prompt = build_site_prompt(turns, files)?;
        let images = request_images(turns);

        let request = OllamaRequest {
            model: model.to_string(),
            prompt,
            stream: false,
            format: Some("json".to_string()),
            images,
            options: OllamaOptions { temperature },
        };

        let raw = self
            .generate(&request)
            .await
            .map_err(|e| anyhow!("Failed to generate code: {e}"))?;
        parse_site_response(&raw)
    }

    /// Asks for a single suggestion-style follow-up question after a
    /// recorded generation. Failures yield an empty string so they never
    /// surface in the transcript.
    pub async fn follow_up_question(
        &self,
        model: &str,
        temperature: f32,
        last_prompt: &str,
        explanation: &str,
    ) -> String {
        let prompt = format!(
            "{FOLLOW_UP_INSTRUCTION}\n\nCONTEXT:\n- The user's last request was: \"{last_prompt}\"\n- The summary of the work just completed is: \"{explanation}\"\n\nBased on this context, provide one follow-up question."
        );

        let request = OllamaRequest {
            model: model.to_string(),
            prompt,
            stream: false,
            format: None,
            images: Vec::new(),
            options: OllamaOptions { temperature },
        };

        match self.generate(&request).await {
            Ok(response) => response.trim().to_string(),
            Err(_) => String::new(),
        }
    }

    async fn generate(&self, request: &OllamaRequest) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Ollama request failed with status: {}. Make sure Ollama is running with: ollama serve",
                response.status()
            ));
        }

        let ollama_response: OllamaResponse = response.json().await?;
        Ok(ollama_response.response)
    }
}

fn build_site_prompt(turns: &[ChatTurn], files: &[FileNode]) -> Result<String> {
    let relevant: Vec<&ChatTurn> = turns
        .iter()
        .filter(|turn| turn.role != ChatRole::Error)
        .collect();
    if relevant.is_empty() {
        return Err(anyhow!("no conversation to send"));
    }

    let mut prompt = String::from(SYSTEM_INSTRUCTION);
    prompt.push_str("\n\nConversation so far:\n");
    for (index, turn) in relevant.iter().enumerate() {
        let is_last = index == relevant.len() - 1;
        let text = if is_last && turn.role == ChatRole::User {
            // Only the final user turn carries the file dump; repeating it
            // on every turn would fill the prompt with stale state.
            if files.is_empty() {
                format!("User request: \"{}\"", turn.content)
            } else {
                let dump = serde_json::to_string(files)?;
                format!(
                    "Here are the current files in the project:\n\n{}\n\nNow, please apply this change:\n\nUser request: \"{}\"",
                    dump, turn.content
                )
            }
        } else {
            turn.content.clone()
        };
        let speaker = match turn.role {
            ChatRole::User => "User",
            _ => "Assistant",
        };
        prompt.push_str(&format!("{speaker}: {text}\n"));
    }
    prompt.push_str("\nRespond with the JSON object now.");
    Ok(prompt)
}

fn parse_site_response(raw: &str) -> Result<GeneratedSite> {
    let json = strip_code_fence(raw.trim());
    serde_json::from_str(json).map_err(|_| {
        anyhow!("The model returned an invalid response. Please try rephrasing your prompt.")
    })
}

/// Only the newest user turn's attachment is sent. Earlier images were
/// already consumed by the generations they accompanied; resending them
/// would grow every request with stale payloads the prompt never mentions.
fn request_images(turns: &[ChatTurn]) -> Vec<String> {
    turns
        .iter()
        .rev()
        .find(|turn| turn.role == ChatRole::User)
        .and_then(|turn| turn.image.as_deref())
        .map(|image| vec![strip_data_uri(image).to_string()])
        .unwrap_or_default()
}

/// The API wants raw base64; attachments arrive as data-URIs.
fn strip_data_uri(image: &str) -> &str {
    match image.split_once(";base64,") {
        Some((prefix, payload)) if prefix.starts_with("data:") => payload,
        _ => image,
    }
}

/// Models sometimes wrap JSON in a markdown fence despite instructions.
fn strip_code_fence(raw: &str) -> &str {
    let pattern = match Regex::new(r"```json\s*([\s\S]*?)\s*```") {
        Ok(pattern) => pattern,
        Err(_) => return raw,
    };
    match pattern.captures(raw).and_then(|captures| captures.get(1)) {
        Some(inner) => inner.as_str(),
        None => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_newest_attachment_is_sent() {
        let mut first = ChatTurn::user("match this wireframe");
        first.image = Some("data:image/png;base64,OLD=".to_string());
        let mut last = ChatTurn::user("now add a footer");
        last.image = Some("data:image/png;base64,NEW=".to_string());
        let turns = [first, ChatTurn::model("Done."), last];
        assert_eq!(request_images(&turns), vec!["NEW=".to_string()]);
    }

    #[test]
    fn test_no_attachment_means_no_images() {
        let mut old = ChatTurn::user("match this wireframe");
        old.image = Some("data:image/png;base64,OLD=".to_string());
        let turns = [old, ChatTurn::model("Done."), ChatTurn::user("tweak the nav")];
        assert!(request_images(&turns).is_empty());
    }

    #[test]
    fn test_strip_data_uri() {
        assert_eq!(strip_data_uri("data:image/png;base64,AAAA"), "AAAA");
        assert_eq!(strip_data_uri("AAAA"), "AAAA");
        assert_eq!(strip_data_uri("not-a-uri;base64,AAAA"), "not-a-uri;base64,AAAA");
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(
            strip_code_fence("Here you go:\n```json\n{\"a\": 1}\n```\nDone."),
            "{\"a\": 1}"
        );
    }

    #[test]
    fn test_parse_valid_response() {
        let raw = "{\"explanation\": \"done\", \"files\": [{\"name\": \"index.html\", \"content\": \"<html></html>\"}]}";
        let site = parse_site_response(raw).unwrap();
        assert_eq!(site.explanation, "done");
        assert_eq!(site.files.len(), 1);
        assert_eq!(site.files[0].name, "index.html");
    }

    #[test]
    fn test_parse_fenced_response() {
        let raw = "```json\n{\"explanation\": \"ok\", \"files\": []}\n```";
        let site = parse_site_response(raw).unwrap();
        assert_eq!(site.explanation, "ok");
        assert!(site.files.is_empty());
    }

    #[test]
    fn test_malformed_response_asks_for_rephrase() {
        let err = parse_site_response("not json at all").unwrap_err();
        assert!(err.to_string().contains("rephrasing"));
        let err = parse_site_response("{\"explanation\": \"missing files\"}").unwrap_err();
        assert!(err.to_string().contains("rephrasing"));
    }

    #[test]
    fn test_prompt_wraps_only_final_user_turn() {
        let turns = [
            ChatTurn::user("build a landing page"),
            ChatTurn::model("Created index.html and style.css."),
            ChatTurn::user("make the hero taller"),
        ];
        let files = [FileNode {
            name: "index.html".to_string(),
            content: "<html></html>".to_string(),
        }];
        let prompt = build_site_prompt(&turns, &files).unwrap();
        assert!(prompt.contains("CRITICAL"));
        assert!(prompt.contains("User: build a landing page"));
        assert!(prompt.contains("Here are the current files in the project:"));
        assert!(prompt.contains("User request: \"make the hero taller\""));
        assert_eq!(prompt.matches("Here are the current files").count(), 1);
    }

    #[test]
    fn test_prompt_without_files_skips_dump() {
        let turns = [ChatTurn::user("build a blog")];
        let prompt = build_site_prompt(&turns, &[]).unwrap();
        assert!(!prompt.contains("Here are the current files"));
        assert!(prompt.contains("User request: \"build a blog\""));
    }

    #[test]
    fn test_error_turns_stay_out_of_prompt() {
        let turns = [
            ChatTurn::user("build a shop"),
            ChatTurn::error("Error: Ollama request failed"),
        ];
        let prompt = build_site_prompt(&turns, &[]).unwrap();
        assert!(!prompt.contains("Ollama request failed"));
    }

    #[test]
    fn test_empty_transcript_is_rejected() {
        assert!(build_site_prompt(&[], &[]).is_err());
    }
}

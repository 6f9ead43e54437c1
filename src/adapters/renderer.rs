use crate::domain::ports::PageRenderer;
use crate::utils::error::{EtlError, Result};
use reqwest::Client;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Language switch submitted through the page's own form before reading content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguagePreference {
    pub enabled: bool,
    pub form_id: String,
    pub field: String,
    pub value: String,
}

impl Default for LanguagePreference {
    fn default() -> Self {
        Self {
            enabled: true,
            form_id: "language_form".to_string(),
            field: "language_code".to_string(),
            value: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FormSubmission {
    action: String,
    method: String,
    fields: Vec<(String, String)>,
}

/// Reads the language form out of a page and fills in the wanted value.
fn language_submission(
    html: &str,
    page_url: &str,
    preference: &LanguagePreference,
) -> Result<Option<FormSubmission>> {
    let document = Html::parse_document(html);
    let form_css = format!("form#{}", preference.form_id);
    let form_sel = Selector::parse(&form_css).map_err(|e| EtlError::ParseError {
        url: page_url.to_string(),
        reason: format!("invalid form id '{}': {:?}", preference.form_id, e),
    })?;
    let input_sel = Selector::parse("input[name]").map_err(|e| EtlError::ParseError {
        url: page_url.to_string(),
        reason: format!("{:?}", e),
    })?;

    let Some(form) = document.select(&form_sel).next() else {
        return Ok(None);
    };

    let base = Url::parse(page_url).map_err(|e| EtlError::ParseError {
        url: page_url.to_string(),
        reason: format!("invalid page URL: {}", e),
    })?;
    let action = match form.value().attr("action") {
        Some(action) if !action.trim().is_empty() => base.join(action.trim()),
        _ => Ok(base.clone()),
    }
    .map_err(|e| EtlError::ParseError {
        url: page_url.to_string(),
        reason: format!("invalid form action: {}", e),
    })?;
    let method = form
        .value()
        .attr("method")
        .unwrap_or("get")
        .to_ascii_lowercase();

    let mut fields: Vec<(String, String)> = form
        .select(&input_sel)
        .filter_map(|input| {
            let name = input.value().attr("name")?;
            let value = input.value().attr("value").unwrap_or_default();
            Some((name.to_string(), value.to_string()))
        })
        .filter(|(name, _)| name != &preference.field)
        .collect();
    fields.push((preference.field.clone(), preference.value.clone()));

    Ok(Some(FormSubmission {
        action: action.to_string(),
        method,
        fields,
    }))
}

/// Plain-HTTP renderer: fetches the page, optionally switches the site
/// language through its form, then returns the page HTML.
///
/// Pages that need JavaScript to build their content are not supported.
pub struct HttpPageRenderer {
    client: Client,
    language: Option<LanguagePreference>,
}

impl HttpPageRenderer {
    pub fn new(language: Option<LanguagePreference>, timeout: Duration) -> Result<Self> {
        // session cookie 保存語言設定
        let client = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            language: language.filter(|l| l.enabled),
        })
    }

    async fn get_html(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    async fn submit(&self, submission: &FormSubmission) -> Result<()> {
        let request = if submission.method == "post" {
            self.client.post(&submission.action).form(&submission.fields)
        } else {
            self.client.get(&submission.action).query(&submission.fields)
        };
        request.send().await?.error_for_status()?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl PageRenderer for HttpPageRenderer {
    async fn render(&self, url: &str) -> Result<String> {
        let html = self.get_html(url).await?;

        let Some(preference) = &self.language else {
            return Ok(html);
        };

        match language_submission(&html, url, preference)? {
            Some(submission) => {
                tracing::debug!(
                    "Switching language to '{}' via {} {}",
                    preference.value,
                    submission.method,
                    submission.action
                );
                self.submit(&submission).await?;
                self.get_html(url).await
            }
            None => {
                tracing::debug!("No form#{} on {}, keeping page as is", preference.form_id, url);
                Ok(html)
            }
        }
    }
}

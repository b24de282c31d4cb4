use super::util::{look_after, notify_parse_fail};
use crate::error::PipelineError;
use crate::prelude::*;
use anyhow::{anyhow, Context};
use scraper::{Html, Selector};
use std::collections::HashMap;
use url::Url;

pub const DEFAULT_SOURCE_LINK: &str =
    "https://www.cia.gov/the-world-factbook/references/terrorist-organizations/";

const AOR_LABELS: [&str; 2] = ["areas of operation", "area(s) of operation"];

/// One entity's raw area-of-operation prose as found on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityAorText {
    pub entity_name: String,
    pub raw_text: String,
    pub source_link: String,
}

/// Reads the page from disk, or over HTTP when `location` is an http(s) URL.
pub async fn load_document(location: &str) -> Result<String> {
    match Url::parse(location) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
            let response = reqwest::get(url.clone()).await?;
            if !response.status().is_success() {
                let err = format!("Non-success response from {}: {}", url, response.status());
                tracing::error!(err);
                return Err(anyhow!(err));
            }

            Ok(response.text().await?)
        }
        _ => tokio::fs::read_to_string(location)
            .await
            .with_context(|| format!("scrape: reading {}", location)),
    }
}

/// Extracts one record per `div.pb30` section whose paragraphs carry an
/// area-of-operation label. A repeated title keeps its first position and
/// takes the text of its last section.
pub fn parse_aor_document(html: &str, source_link: &str) -> Result<Vec<EntityAorText>> {
    let document = Html::parse_document(html);
    let section_selector = parse_selector("div.pb30")?;
    let title_selector = parse_selector("h2")?;
    let paragraph_selector = parse_selector("p")?;

    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut entities: Vec<EntityAorText> = Vec::new();
    for (i, section) in document.select(&section_selector).enumerate() {
        let paragraphs: Vec<String> = section
            .select(&paragraph_selector)
            .map(|p| p.text().collect::<String>())
            .collect();

        for title in section.select(&title_selector) {
            let entity_name = title.text().collect::<String>().trim().to_string();
            if entity_name.is_empty() {
                notify_parse_fail("empty section title", i);
                continue;
            }

            let raw_text = paragraphs.iter().find_map(|text| {
                AOR_LABELS
                    .iter()
                    .find(|label| text.contains(*label))
                    .and_then(|label| look_after(text, label, &['–', '-', ':']))
            });
            let raw_text = match raw_text {
                Some(raw_text) => raw_text,
                None => continue,
            };

            if let Some(&position) = seen.get(&entity_name) {
                tracing::warn!("Duplicate section for {}; its text replaces the earlier one", entity_name);
                entities[position].raw_text = raw_text;
                continue;
            }

            seen.insert(entity_name.clone(), entities.len());
            entities.push(EntityAorText {
                entity_name,
                raw_text,
                source_link: source_link.to_string(),
            });
        }
    }

    if entities.is_empty() {
        return Err(PipelineError::InvalidDocument("no area-of-operation sections found".into()).into());
    }
    tracing::info!("Found {} entities with areas of operation", entities.len());

    Ok(entities)
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow!("Invalid selector {}: {:?}", selector, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <div class="pb30">
            <h2>Abu Sayyaf Group (ASG)</h2>
            <p>aka: Al Harakat al Islamiyya</p>
            <p>areas of operation – Philippines and Malaysia</p>
        </div>
        <div class="pb30">
            <h2>al-Shabaab</h2>
            <p>area(s) of operation – Somalia, Kenya</p>
        </div>
        <div class="pb30">
            <h2>No Region Group</h2>
            <p>history – founded long ago</p>
        </div>
        <div class="pb30">
            <h2>Abu Sayyaf Group (ASG)</h2>
            <p>areas of operation – Indonesia</p>
        </div>
        </body></html>
    "#;

    #[test]
    fn extracts_both_label_variants_and_lets_repeated_titles_overwrite() {
        let entities = parse_aor_document(PAGE, DEFAULT_SOURCE_LINK).unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].entity_name, "Abu Sayyaf Group (ASG)");
        assert_eq!(entities[0].raw_text, "Indonesia");
        assert_eq!(entities[1].entity_name, "al-Shabaab");
        assert_eq!(entities[1].raw_text, "Somalia, Kenya");
        assert!(entities.iter().all(|e| e.source_link == DEFAULT_SOURCE_LINK));
    }

    #[test]
    fn a_page_without_sections_is_invalid() {
        let err = parse_aor_document("<html><p>nothing</p></html>", DEFAULT_SOURCE_LINK).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::InvalidDocument(_))
        ));
    }

    #[tokio::test]
    async fn loads_documents_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, PAGE).unwrap();

        let html = load_document(path.to_str().unwrap()).await.unwrap();
        assert_eq!(parse_aor_document(&html, "link").unwrap().len(), 2);
    }
}

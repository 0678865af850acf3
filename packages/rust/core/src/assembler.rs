//! Context assembly: appends retrieved file and URL text to the prompt.

use std::path::PathBuf;

use tracing::{debug, info, instrument};

use heyi_crawler::Retriever;
use heyi_shared::{ContextSource, Result, RetrievedContent};

/// Separator placed between two context entries.
pub const ENTRY_SEPARATOR: &str = "\n\n---\n\n";

/// Retrieve every source and append it to `prompt`.
///
/// Files are read before URLs, each list in the order given, one at a time.
/// The first failing source aborts the whole assembly.
#[instrument(skip_all, fields(files = files.len(), urls = urls.len()))]
pub async fn assemble(
    prompt: &str,
    files: &[PathBuf],
    urls: &[String],
    retriever: &Retriever,
) -> Result<String> {
    let sources = collect_sources(files, urls);
    if sources.is_empty() {
        debug!("no context sources");
        return Ok(prompt.to_string());
    }

    let mut entries = Vec::with_capacity(sources.len());
    for source in &sources {
        let content = retriever.retrieve(source).await?;
        debug!(label = %content.label, chars = content.text.len(), "source retrieved");
        entries.push(content);
    }

    info!(sources = entries.len(), "context assembled");
    Ok(render_context(prompt, &entries))
}

/// Files first, then URLs.
pub fn collect_sources(files: &[PathBuf], urls: &[String]) -> Vec<ContextSource> {
    files
        .iter()
        .cloned()
        .map(ContextSource::File)
        .chain(urls.iter().cloned().map(ContextSource::Url))
        .collect()
}

/// Format already retrieved entries under `prompt`.
pub fn render_context(prompt: &str, entries: &[RetrievedContent]) -> String {
    if entries.is_empty() {
        return prompt.to_string();
    }

    let heading = if entries.len() == 1 {
        "Context from source:"
    } else {
        "Context from sources:"
    };
    let body = entries
        .iter()
        .map(|e| format!("Source: {}\n{}", e.label, e.text))
        .collect::<Vec<_>>()
        .join(ENTRY_SEPARATOR);

    format!("{prompt}\n\n{heading}\n{body}")
}

#[cfg(test)]
mod tests {
    use heyi_crawler::CrawlerStrategy;
    use heyi_shared::HeyiError;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn entry(label: &str, text: &str) -> RetrievedContent {
        RetrievedContent {
            label: label.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn empty_context_returns_prompt_unchanged() {
        let prompt = "  Summarize {{x}}\n";
        assert_eq!(render_context(prompt, &[]), prompt);
    }

    #[test]
    fn single_source_uses_singular_heading() {
        let out = render_context("<prompt>", &[entry("a.txt", "Hello")]);
        assert_eq!(out, "<prompt>\n\nContext from source:\nSource: a.txt\nHello");
    }

    #[test]
    fn multiple_sources_are_separated() {
        let out = render_context("P", &[entry("a.txt", "A"), entry("https://b.test/", "B")]);
        assert_eq!(
            out,
            "P\n\nContext from sources:\nSource: a.txt\nA\n\n---\n\nSource: https://b.test/\nB"
        );
    }

    #[test]
    fn files_come_before_urls() {
        let sources = collect_sources(
            &[PathBuf::from("one.md"), PathBuf::from("two.md")],
            &["https://x.test/".to_string()],
        );
        let labels: Vec<_> = sources.iter().map(ContextSource::label).collect();
        assert_eq!(labels, ["one.md", "two.md", "https://x.test/"]);
    }

    #[tokio::test]
    async fn assemble_without_sources_skips_retrieval() {
        let retriever = Retriever::new(CrawlerStrategy::Fetch).unwrap();
        let out = assemble("just this", &[], &[], &retriever).await.unwrap();
        assert_eq!(out, "just this");
    }

    #[tokio::test]
    async fn assemble_reads_file_then_fetches_url() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "Local notes").unwrap();

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body><p>Remote text</p></body></html>")
                    .insert_header("content-type", "text/html"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/page", server.uri());
        let retriever = Retriever::new(CrawlerStrategy::Fetch).unwrap();
        let out = assemble("Q", &[file.clone()], &[url.clone()], &retriever)
            .await
            .unwrap();

        let expected = format!(
            "Q\n\nContext from sources:\nSource: {}\nLocal notes\n\n---\n\nSource: {url}\nRemote text",
            file.display()
        );
        assert_eq!(out, expected);
    }

    #[tokio::test]
    async fn assemble_fails_on_first_bad_source() {
        let retriever = Retriever::new(CrawlerStrategy::Fetch).unwrap();
        let err = assemble(
            "Q",
            &[PathBuf::from("/definitely/not/here.txt")],
            &[],
            &retriever,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, HeyiError::Retrieval { .. }));
        assert!(err.to_string().contains("/definitely/not/here.txt"));
    }
}

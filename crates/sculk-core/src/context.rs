//! Explicit dependencies for pack operations.

use sculk_remote::{
    ApiConfig, CurseforgeApi, CurseforgeClient, Downloader, HttpClient, ModrinthApi,
    ModrinthClient, RemoteError,
};
use sculk_store::{ArtifactFetcher, StoreError};

/// User-facing decisions and progress reporting.
///
/// Implementations must be callable from worker threads.
pub trait Interaction: Sync {
    /// Pick one of `options`, or `None` to abort.
    fn select(&self, prompt: &str, options: &[String]) -> Option<usize>;

    fn confirm(&self, prompt: &str, default: bool) -> bool;

    fn progress(&self, _done: usize, _total: usize, _item: &str) {}
}

/// Answers every question without a terminal.
///
/// With `accept` set, confirmations are answered yes and a single search
/// result is taken as the selection. Otherwise confirmations take their
/// default and selections abort.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonInteractive {
    pub accept: bool,
}

impl Interaction for NonInteractive {
    fn select(&self, _prompt: &str, options: &[String]) -> Option<usize> {
        (self.accept && options.len() == 1).then_some(0)
    }

    fn confirm(&self, _prompt: &str, default: bool) -> bool {
        self.accept || default
    }
}

/// Everything an operation may reach outside the pack directory.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub modrinth: &'a dyn ModrinthApi,
    pub curseforge: &'a dyn CurseforgeApi,
    pub downloader: &'a dyn Downloader,
    pub ui: &'a dyn Interaction,
}

impl<'a> Context<'a> {
    pub fn download(&self, url: &str) -> Result<Vec<u8>, RemoteError> {
        self.downloader.download(url)
    }

    /// View the downloader through the store's fetch seam.
    pub fn fetcher(&self) -> impl ArtifactFetcher + 'a {
        DownloadFetcher(self.downloader)
    }
}

struct DownloadFetcher<'a>(&'a dyn Downloader);

impl ArtifactFetcher for DownloadFetcher<'_> {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, StoreError> {
        self.0.download(url).map_err(|e| StoreError::Fetch {
            url: url.to_owned(),
            reason: e.to_string(),
        })
    }
}

/// Live clients built once from the API configuration.
pub struct Services {
    http: HttpClient,
    modrinth: ModrinthClient,
    curseforge: CurseforgeClient,
}

impl Services {
    pub fn new(config: &ApiConfig) -> Self {
        let http = HttpClient::new(config);
        Self {
            modrinth: ModrinthClient::new(http.clone(), config),
            curseforge: CurseforgeClient::new(http.clone(), config),
            http,
        }
    }

    pub fn context<'a>(&'a self, ui: &'a dyn Interaction) -> Context<'a> {
        Context {
            modrinth: &self.modrinth,
            curseforge: &self.curseforge,
            downloader: &self.http,
            ui,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl Downloader for Failing {
        fn download(&self, url: &str) -> Result<Vec<u8>, RemoteError> {
            Err(RemoteError::NotFound(url.to_owned()))
        }
    }

    #[test]
    fn non_interactive_defaults() {
        let ui = NonInteractive::default();
        assert!(!ui.confirm("add optional?", false));
        assert!(ui.confirm("continue?", true));
        assert_eq!(ui.select("pick", &["a".to_owned()]), None);
    }

    #[test]
    fn non_interactive_accept() {
        let ui = NonInteractive { accept: true };
        assert!(ui.confirm("add optional?", false));
        assert_eq!(ui.select("pick", &["a".to_owned()]), Some(0));
        assert_eq!(ui.select("pick", &["a".to_owned(), "b".to_owned()]), None);
    }

    #[test]
    fn fetch_errors_map_to_store_fetch() {
        let fetcher = DownloadFetcher(&Failing);
        match fetcher.fetch("https://cdn.example/a.jar") {
            Err(StoreError::Fetch { url, reason }) => {
                assert_eq!(url, "https://cdn.example/a.jar");
                assert!(reason.contains("not found"));
            }
            other => panic!("expected fetch error, got {other:?}"),
        }
    }
}

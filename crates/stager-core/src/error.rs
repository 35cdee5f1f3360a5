/// Port pool exhaustion, surfaced to the client as HTTP 500.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("port pool exhausted: no free ports in [{base}, {base}+{max})")]
    Exhausted { base: u16, max: usize },
}

/// Errors from `Manager::get` / `Manager::lookup`.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("failed to render target URL template: {0}")]
    Template(#[from] minijinja::Error),

    #[error("rendered target URL is not a valid URL: {0}")]
    UrlParse(#[from] url::ParseError),
}

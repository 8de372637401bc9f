//! Collect command: log in, fetch every manufacturer listing, parse records.

use crate::config::{Config, Credentials, OutputFormat};
use crate::format::Formatter;
use crate::portal::models::slugify_key;
use crate::portal::{Parser, PortalClient, PortalError, PortalSession, PriceRecord};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Run options that are not part of the persistent config.
#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    /// Fetch listings anonymously; prices will be blank
    pub skip_login: bool,
    /// Directory for downloaded PDF price sheets
    pub price_sheet_dir: Option<PathBuf>,
}

/// A manufacturer whose listing or price sheet could not be collected.
#[derive(Debug, Clone)]
pub struct ManufacturerFailure {
    pub manufacturer: String,
    pub reason: String,
}

/// Outcome of a collect run.
#[derive(Debug, Default)]
pub struct Collection {
    /// Records from every manufacturer, in request order
    pub records: Vec<PriceRecord>,
    /// Manufacturers whose listing parsed to zero records
    pub empty_manufacturers: Vec<String>,
    /// Manufacturers that failed
    pub failures: Vec<ManufacturerFailure>,
    /// Number of manufacturers requested
    pub manufacturers: usize,
}

impl Collection {
    /// Returns true if every manufacturer was fetched.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Writes the records to `path`, then fails if any manufacturer failed.
    ///
    /// Nothing is written when no records were collected.
    pub fn write_output(&self, format: OutputFormat, path: &Path) -> Result<()> {
        if self.records.is_empty() {
            warn!("No data collected. Nothing will be written.");
        } else {
            Formatter::new(format).write_file(&self.records, path)?;
            info!("Wrote {} rows to {}", self.records.len(), path.display());
        }

        if !self.is_success() {
            let mut failed: Vec<&str> =
                self.failures.iter().map(|f| f.manufacturer.as_str()).collect();
            failed.dedup();
            anyhow::bail!(
                "Failed to collect {} of {} manufacturers: {}",
                failed.len(),
                self.manufacturers,
                failed.join(", ")
            );
        }

        Ok(())
    }
}

/// Executes a collect run.
pub struct CollectCommand {
    config: Config,
    credentials: Option<Credentials>,
    options: CollectOptions,
}

impl CollectCommand {
    /// Creates a new collect command.
    pub fn new(config: Config, credentials: Option<Credentials>, options: CollectOptions) -> Self {
        Self { config, credentials, options }
    }

    /// Builds a portal client and runs the collection.
    pub async fn execute(&self, manufacturers: &[String]) -> Result<Collection> {
        self.check_credentials()?;

        let mut client = PortalClient::new(&self.config, self.credentials.clone())
            .context("Failed to create HTTP client")?;

        self.execute_with_session(&mut client, manufacturers).await
    }

    /// Runs the collection with a provided session (for testing).
    pub async fn execute_with_session(
        &self,
        session: &mut impl PortalSession,
        manufacturers: &[String],
    ) -> Result<Collection> {
        self.check_credentials()?;

        if self.options.skip_login {
            info!("Skipping login; prices will not be visible");
        } else {
            session.login().await?;
        }

        let mut collection =
            Collection { manufacturers: manufacturers.len(), ..Collection::default() };

        for manufacturer in manufacturers {
            match self.collect_manufacturer(session, manufacturer).await {
                Ok(records) if records.is_empty() => {
                    warn!(
                        "No products parsed for {}. Check credentials or manufacturer spelling.",
                        manufacturer
                    );
                    collection.empty_manufacturers.push(manufacturer.clone());
                }
                Ok(records) => {
                    info!("Collected {} records for {}", records.len(), manufacturer);
                    collection.records.extend(records);
                }
                Err(err) => {
                    error!("Failed to fetch manufacturer page for {}: {}", manufacturer, err);
                    debug!("{:?}", err);
                    collection.failures.push(ManufacturerFailure {
                        manufacturer: manufacturer.clone(),
                        reason: err.to_string(),
                    });
                }
            }

            if let Some(dir) = &self.options.price_sheet_dir {
                if let Err(err) = self.save_price_sheet(session, manufacturer, dir).await {
                    error!("Failed to save price sheet for {}: {:#}", manufacturer, err);
                    collection.failures.push(ManufacturerFailure {
                        manufacturer: manufacturer.clone(),
                        reason: format!("{:#}", err),
                    });
                }
            }
        }

        info!(
            "Collected {} records ({} empty, {} failed)",
            collection.records.len(),
            collection.empty_manufacturers.len(),
            collection.failures.len()
        );

        Ok(collection)
    }

    /// Fails before any request when login is required but credentials are missing.
    fn check_credentials(&self) -> Result<(), PortalError> {
        if !self.options.skip_login && self.credentials.is_none() {
            return Err(PortalError::MissingCredentials);
        }
        Ok(())
    }

    /// Fetches and parses every listing page for one manufacturer.
    async fn collect_manufacturer(
        &self,
        session: &mut impl PortalSession,
        manufacturer: &str,
    ) -> Result<Vec<PriceRecord>, PortalError> {
        let mut fetched = session.fetch_manufacturer_page(manufacturer).await?;

        let mut records = Vec::new();
        let mut visited = HashSet::new();
        let mut page = 1;

        loop {
            let listing = Parser::new(fetched.url).parse_listing(&fetched.html, manufacturer);
            records.extend(listing.records);

            let Some(next) = listing.next_page else {
                break;
            };

            if page >= self.config.max_pages {
                debug!("Reached max pages ({}) for {}", self.config.max_pages, manufacturer);
                break;
            }

            if !visited.insert(next.clone()) {
                debug!("Next page {} already fetched, stopping", next);
                break;
            }

            page += 1;
            debug!("Fetching page {} for {}", page, manufacturer);
            fetched = session.fetch_page(&next).await?;
        }

        Ok(records)
    }

    /// Downloads a manufacturer's price sheet into `dir`.
    async fn save_price_sheet(
        &self,
        session: &mut impl PortalSession,
        manufacturer: &str,
        dir: &Path,
    ) -> Result<PathBuf> {
        let bytes = session.download_price_sheet(manufacturer).await?;

        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

        let path = dir.join(format!("{}.pdf", slugify_key(manufacturer)));
        std::fs::write(&path, &bytes)
            .with_context(|| format!("Failed to write price sheet: {}", path.display()))?;

        info!("Saved price sheet for {} to {}", manufacturer, path.display());
        Ok(path)
    }
}

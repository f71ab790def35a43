//
// config.rs
// XNAT-RTStruct-rs
//
// XNAT connection settings from command-line flags, environment variables or a .env file.
//

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use dicom::object::open_file;

use crate::dependencies::DependencyResolver;
use crate::error::RtStructError;
use crate::rtstruct::RtStruct;
use crate::xnat::XnatClient;

#[derive(Debug, Clone, Default, Args)]
pub struct XnatArgs {
    /// XNAT base URL; without it referenced images are not checked
    #[arg(long = "xnat-url", env = "XNAT_URL", global = true)]
    pub url: Option<String>,

    #[arg(long = "xnat-user", env = "XNAT_USER", global = true)]
    pub user: Option<String>,

    #[arg(long = "xnat-password", env = "XNAT_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// Project searched for the referenced studies
    #[arg(long, env = "XNAT_PROJECT", global = true)]
    pub project: Option<String>,

    /// Session ID or label to use when a study matches several sessions
    #[arg(long, env = "XNAT_SESSION", global = true)]
    pub session: Option<String>,

    /// Where downloaded scan files are kept
    #[arg(long = "cache-dir", env = "XNAT_CACHE_DIR", default_value = "xnat-cache", global = true)]
    pub cache_dir: PathBuf,
}

/// A connected client plus the project scope it resolves in.
pub struct XnatConnection {
    pub client: XnatClient,
    pub project: String,
    pub session: Option<String>,
}

impl XnatConnection {
    pub fn resolver(&self) -> DependencyResolver<'_> {
        DependencyResolver::new(&self.client, self.project.clone()).with_session(self.session.clone())
    }
}

impl XnatArgs {
    /// `None` when no server is configured. Call from a blocking thread.
    pub fn connect(&self) -> Result<Option<XnatConnection>> {
        let Some(url) = &self.url else {
            return Ok(None);
        };
        let Some(project) = &self.project else {
            bail!("--project (or XNAT_PROJECT) is required when an XNAT URL is set");
        };
        let client = XnatClient::new(
            url,
            self.user.clone(),
            self.password.clone(),
            self.cache_dir.clone(),
        )
        .context("Failed to create XNAT client")?;
        Ok(Some(XnatConnection {
            client,
            project: project.clone(),
            session: self.session.clone(),
        }))
    }

    /// Open and parse one file, resolving against XNAT when configured.
    ///
    /// The outer error is an I/O or connection problem; the inner one is the validation verdict.
    pub fn parse_file(&self, path: &Path) -> Result<Result<RtStruct, RtStructError>> {
        let connection = self.connect()?;
        let resolver = connection.as_ref().map(XnatConnection::resolver);
        let obj = open_file(path).context("Failed to open DICOM file")?;
        Ok(RtStruct::parse(&obj, resolver.as_ref()))
    }
}

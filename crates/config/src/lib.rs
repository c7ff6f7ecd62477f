//! Layered configuration.
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults,
//! 2. `haven.toml`, `haven.yaml` or `haven.json` in the platform config
//!    directory,
//! 3. an explicit file (format chosen by extension),
//! 4. `HAVEN_`-prefixed environment variables, with `__` separating nested
//!    keys (`HAVEN_STORAGE__ROOT=/data/offline`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use haven_rewrite::{BootstrapOptions, DEFAULT_TEMPLATE_PATTERN};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::instrument;
use url::Url;

pub const APPLICATION: &str = "haven";
pub const ENV_PREFIX: &str = "HAVEN_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network origin every manifest entry and the entry document resolve
    /// against. Required.
    pub origin: Option<Url>,
    /// Path of the application under the origin; the rewritten document's
    /// `<base>` points here.
    pub app_root: String,
    /// Root-relative path of the entry document.
    pub entry: String,
    pub storage: StorageConfig,
    pub manifest: ManifestConfig,
    pub templates: TemplateConfig,
    pub bootstrap: BootstrapOptions,
    pub user_agent: Option<String>,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            origin: None,
            app_root: "/".to_string(),
            entry: "/index.html".to_string(),
            storage: StorageConfig::default(),
            manifest: ManifestConfig::default(),
            templates: TemplateConfig::default(),
            bootstrap: BootstrapOptions::default(),
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Defaults to the platform data directory.
    pub root: Option<PathBuf>,
}

/// Either `url` (a published JSON manifest) or `version` + `assets`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    pub url: Option<Url>,
    pub version: Option<String>,
    pub assets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Regular expression recognizing template-relative names. Must also be
    /// valid JavaScript regex syntax; the runtime interceptor uses it too.
    pub pattern: String,
    /// Prefix template names are mapped under. Defaults to `app_root`.
    pub root: Option<String>,
}
impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_TEMPLATE_PATTERN.to_string(),
            root: None,
        }
    }
}

/// Where the manifest comes from, once validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSetting<'a> {
    Inline { version: &'a str, assets: &'a [String] },
    Remote(&'a Url),
}

impl Config {
    /// Load from every source and validate.
    #[instrument]
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let dirs = ProjectDirs::from("", "", APPLICATION);
        let figment = Self::figment(dirs.as_ref().map(ProjectDirs::config_dir), explicit)?;
        Self::from_figment(&figment)
    }

    /// The layered sources without extracting anything. `config_dir` is
    /// where `haven.{toml,yaml,json}` are looked for.
    pub fn figment(config_dir: Option<&Path>, explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(dir) = config_dir {
            tracing::debug!(dir = %dir.display(), "Looking for configuration files");
            figment = figment
                .merge(Toml::file(dir.join(format!("{APPLICATION}.toml"))))
                .merge(Yaml::file(dir.join(format!("{APPLICATION}.yaml"))))
                .merge(Json::file(dir.join(format!("{APPLICATION}.json"))));
        }
        if let Some(path) = explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::Invalid(format!("no such file: {}", path.display())));
            }
            let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
            figment = match extension.as_deref() {
                Some("toml") => figment.merge(Toml::file_exact(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
                Some("json") => figment.merge(Json::file_exact(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let origin = self.origin()?;
        if !matches!(origin.scheme(), "http" | "https") {
            exn::bail!(ErrorKind::Invalid(format!("origin must be http(s): {origin}")));
        }
        if self.entry.trim().trim_start_matches('/').is_empty() {
            exn::bail!(ErrorKind::Invalid("entry must name a document".to_string()));
        }
        if self.templates.pattern.is_empty() {
            exn::bail!(ErrorKind::Invalid("templates.pattern must not be empty".to_string()));
        }
        self.manifest_setting()?;
        Ok(())
    }

    pub fn origin(&self) -> Result<&Url> {
        self.origin.as_ref().ok_or_raise(|| ErrorKind::Invalid("origin is required".to_string()))
    }

    pub fn template_root(&self) -> &str {
        self.templates.root.as_deref().unwrap_or(&self.app_root)
    }

    /// A published manifest wins over an inline one.
    pub fn manifest_setting(&self) -> Result<ManifestSetting<'_>> {
        if let Some(url) = &self.manifest.url {
            return Ok(ManifestSetting::Remote(url));
        }
        match self.manifest.version.as_deref().map(str::trim) {
            Some(version) if !version.is_empty() => Ok(ManifestSetting::Inline {
                version,
                assets: &self.manifest.assets,
            }),
            _ => exn::bail!(ErrorKind::Invalid(
                "manifest needs either a url or a version and assets".to_string()
            )),
        }
    }

    /// Configured storage root, else `<platform data dir>/offline`.
    pub fn storage_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.storage.root {
            return Ok(root.clone());
        }
        let dirs = ProjectDirs::from("", "", APPLICATION).ok_or_raise(|| ErrorKind::NoHomeDirectory)?;
        Ok(dirs.data_dir().join("offline"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    const TOML: &str = r#"
origin = "https://x"
app_root = "/a/"
entry = "/a/index.html"

[manifest]
version = "v1"
assets = ["/a/index.html", "/a/app.js"]

[storage]
root = "/tmp/haven-test"
"#;

    #[test]
    fn test_defaults_need_an_origin() {
        let err = Config::from_figment(&Config::figment(None, None).unwrap()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_) | ErrorKind::Load));
    }

    #[test]
    fn test_explicit_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("offline.toml");
        fs::write(&path, TOML).unwrap();
        let config = Config::from_figment(&Config::figment(None, Some(&path)).unwrap()).unwrap();
        assert_eq!(config.origin().unwrap().as_str(), "https://x/");
        assert_eq!(config.template_root(), "/a/");
        assert_eq!(config.storage_root().unwrap(), PathBuf::from("/tmp/haven-test"));
        assert_eq!(
            config.manifest_setting().unwrap(),
            ManifestSetting::Inline {
                version: "v1",
                assets: &["/a/index.html".to_string(), "/a/app.js".to_string()]
            }
        );
        assert_eq!(config.bootstrap, BootstrapOptions::default());
    }

    #[test]
    fn test_explicit_yaml_with_remote_manifest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("offline.yml");
        fs::write(
            &path,
            "origin: https://x\nmanifest:\n  url: https://x/manifest.json\ntemplates:\n  root: /a/templates\n",
        )
        .unwrap();
        let config = Config::from_figment(&Config::figment(None, Some(&path)).unwrap()).unwrap();
        assert!(matches!(config.manifest_setting().unwrap(), ManifestSetting::Remote(url) if url.path() == "/manifest.json"));
        assert_eq!(config.template_root(), "/a/templates");
    }

    #[rstest]
    #[case("offline.ini")]
    #[case("offline")]
    fn test_unsupported_format(#[case] name: &str) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(name);
        fs::write(&path, "origin = 1").unwrap();
        let err = Config::figment(None, Some(&path)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = Config::figment(None, Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[rstest]
    #[case(r#"origin = "ftp://x""#)]
    #[case("origin = \"https://x\"\nentry = \"/\"\n[manifest]\nversion = \"v1\"")]
    #[case(r#"origin = "https://x""#)]
    #[case("origin = \"https://x\"\n[manifest]\nversion = \"  \"")]
    fn test_invalid(#[case] toml: &str) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("offline.toml");
        fs::write(&path, toml).unwrap();
        let err = Config::from_figment(&Config::figment(None, Some(&path)).unwrap()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[test]
    fn test_layering() {
        Jail::expect_with(|jail| {
            jail.create_file("haven.toml", TOML)?;
            jail.create_file("override.json", r#"{ "app_root": "/b/", "user_agent": "haven-test" }"#)?;
            jail.set_env("HAVEN_ORIGIN", "https://y");
            jail.set_env("HAVEN_MANIFEST__VERSION", "v9");
            let figment = Config::figment(Some(jail.directory()), Some(Path::new("override.json"))).unwrap();
            let config = Config::from_figment(&figment).unwrap();
            assert_eq!(config.origin().unwrap().as_str(), "https://y/");
            assert_eq!(config.app_root, "/b/");
            assert_eq!(config.entry, "/a/index.html");
            assert_eq!(config.user_agent.as_deref(), Some("haven-test"));
            assert!(matches!(config.manifest_setting().unwrap(), ManifestSetting::Inline { version: "v9", .. }));
            Ok(())
        });
    }
}

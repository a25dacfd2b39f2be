//! `[package.metadata.dashboard]` settings.
//!
//! ```toml
//! [package.metadata.dashboard]
//! dist = "dist"
//! port = 3000
//! public = "public"
//! index = "index.html"
//! ```
//!
//! Command line flags take precedence over the manifest, which takes
//! precedence over the defaults. Relative paths, from the manifest or the
//! command line, are resolved against the package root.

use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 3000;

/// The `metadata` table of a package, other tools' keys are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub dashboard: Option<Config>,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub dist: Option<PathBuf>,
    pub port: Option<u16>,
    pub public: Option<PathBuf>,
    pub index: Option<PathBuf>,
}

/// Values from the command line that can override the manifest.
#[derive(Debug, Default)]
pub struct Overrides<'a> {
    pub dist: Option<&'a Path>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub dist: PathBuf,
    pub port: u16,
    pub public: PathBuf,
    pub index: PathBuf,
}

impl Settings {
    pub fn resolve(root: &Path, metadata: &Metadata, overrides: Overrides) -> Self {
        let config = metadata.dashboard.as_ref();
        let path = |configured: Option<&PathBuf>, default: &str| match configured {
            Some(path) => root.join(path),
            None => root.join(default),
        };

        Settings {
            dist: match overrides.dist {
                Some(dist) => root.join(dist),
                None => path(config.and_then(|c| c.dist.as_ref()), "dist"),
            },
            port: overrides
                .port
                .or_else(|| config.and_then(|c| c.port))
                .unwrap_or(DEFAULT_PORT),
            public: path(config.and_then(|c| c.public.as_ref()), "public"),
            index: path(config.and_then(|c| c.index.as_ref()), "index.html"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(json: &str) -> Metadata {
        let config: Config = serde_json::from_str(json).unwrap();
        Metadata {
            dashboard: Some(config),
        }
    }

    #[test]
    fn defaults_without_metadata() {
        let settings = Settings::resolve(
            Path::new("/pkg"),
            &Metadata::default(),
            Overrides::default(),
        );

        assert_eq!(
            settings,
            Settings {
                dist: PathBuf::from("/pkg/dist"),
                port: DEFAULT_PORT,
                public: PathBuf::from("/pkg/public"),
                index: PathBuf::from("/pkg/index.html"),
            }
        );
    }

    #[test]
    fn manifest_beats_defaults() {
        let meta = metadata(r#"{ "dist": "out", "port": 4000, "index": "web/index.html" }"#);
        let settings = Settings::resolve(Path::new("/pkg"), &meta, Overrides::default());

        assert_eq!(settings.dist, PathBuf::from("/pkg/out"));
        assert_eq!(settings.port, 4000);
        assert_eq!(settings.index, PathBuf::from("/pkg/web/index.html"));
        assert_eq!(settings.public, PathBuf::from("/pkg/public"));
    }

    #[test]
    fn flags_beat_manifest() {
        let meta = metadata(r#"{ "dist": "out", "port": 4000 }"#);
        let settings = Settings::resolve(
            Path::new("/pkg"),
            &meta,
            Overrides {
                dist: Some(Path::new("elsewhere")),
                port: Some(5000),
            },
        );

        assert_eq!(settings.dist, PathBuf::from("/pkg/elsewhere"));
        assert_eq!(settings.port, 5000);
    }

    #[test]
    fn dist_flag_is_relative_to_package_not_cwd() {
        let settings = Settings::resolve(
            Path::new("/work/crates/dashboard"),
            &Metadata::default(),
            Overrides {
                dist: Some(Path::new("out")),
                port: None,
            },
        );

        assert_eq!(settings.dist, PathBuf::from("/work/crates/dashboard/out"));
        assert!(!settings.dist.starts_with("/work/crates/dashboard/src"));
    }

    #[test]
    fn absolute_dist_flag_is_kept() {
        let settings = Settings::resolve(
            Path::new("/pkg"),
            &Metadata::default(),
            Overrides {
                dist: Some(Path::new("/tmp/out")),
                port: None,
            },
        );

        assert_eq!(settings.dist, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn absolute_manifest_paths_are_kept() {
        let meta = metadata(r#"{ "dist": "/tmp/dist" }"#);
        let settings = Settings::resolve(Path::new("/pkg"), &meta, Overrides::default());

        assert_eq!(settings.dist, PathBuf::from("/tmp/dist"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let res = serde_json::from_str::<Config>(r#"{ "prot": 3000 }"#);

        assert!(res.is_err());
    }

    #[test]
    fn other_tools_metadata_is_ignored() {
        let meta: Metadata = serde_json::from_str(r#"{ "docs": { "rs": {} } }"#).unwrap();

        assert!(meta.dashboard.is_none());
    }
}

use std::borrow::Cow;
use std::fmt::{self, Display};
use std::fs;
use std::io;
use std::path::{absolute, Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use lol_html::html_content::ContentType;
use lol_html::{element, rewrite_str, RewriteStrSettings};

use crate::config::{Overrides, Settings};
use crate::log;
use crate::manifest::{manifest, Manifest};
use crate::report::{Error, ErrorExt, Report};
use crate::{js, Build, When};

/// Route polled by the auto-reload script, see `serve`.
pub const RELOAD_PATH: &str = "/__reload";

/// Everything needed to run a build, resolved once per invocation.
pub struct Plan {
    pub manifest: Manifest,
    pub settings: Settings,
    pub release: bool,
    pub autoreload: bool,
}

impl Plan {
    pub fn new(b: &Build, port: Option<u16>) -> Report<Self> {
        let manifest = manifest()?;
        let settings = Settings::resolve(
            &manifest.root,
            &manifest.metadata,
            Overrides {
                dist: b.dist.as_deref(),
                port,
            },
        );

        Ok(Plan {
            manifest,
            settings,
            release: b.release,
            autoreload: match b.autoreload {
                When::Auto => !b.release,
                When::Always => true,
                When::Never => false,
            },
        })
    }
}

pub fn build(b: &Build) -> Report<Plan> {
    let plan = Plan::new(b, None)?;

    run(&plan)?;

    Ok(plan)
}

pub fn run(plan: &Plan) -> Report<()> {
    let Plan {
        manifest,
        settings,
        release,
        autoreload,
    } = plan;

    log::building!("{} v{}", manifest.crate_name, manifest.crate_version);

    let start = Instant::now();

    build_wasm(&manifest.root, *release)?;

    let artifact = manifest.artifact_name();

    let mut target = manifest.target.join("wasm32-unknown-unknown");
    target.push(if *release { "release" } else { "debug" });
    target.push(&artifact);
    target.set_extension("wasm");

    if !target.exists() {
        return Err(Error::message(format!(
            "couldn't find compiled .wasm: {}",
            target.display(),
        )));
    }

    let dist = &settings.dist;

    fs::create_dir_all(dist).with_message(|| format!("failed to create {}", dist.display()))?;

    run_wasm_bindgen(&target, dist)?;

    let mut wasm = dist.join(format!("{artifact}_bg"));
    wasm.set_extension("wasm");

    let mut js = dist.join(&artifact);
    js.set_extension("js");

    if *release {
        let opt_start = Instant::now();

        optimize_wasm(&wasm)?;
        minify_js(&js)?;

        let elapsed = opt_start.elapsed();
        let wasm_path = absolute(&wasm).message("failed to get absolute path")?;
        log::optimized!("wasm `{}` in {elapsed:.2?}", wasm_path.display());
    }

    let copied = copy_public(&settings.public, dist)?;
    if copied > 0 {
        log::copying!("{copied} static asset(s) from {}", settings.public.display());
    }

    let snippets_dir = dist.join("snippets");
    let snippets = match read_file_paths(&snippets_dir) {
        Ok(snippets) => snippets,
        Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(err) => {
            return Err(Error::new(
                err,
                format!("failed to read {} directory", snippets_dir.display()),
            ))
        }
    };

    let dist = Dist(dist);
    let assets = Assets {
        js: dist.embed_path(&js).to_string(),
        wasm: dist.embed_path(&wasm).to_string(),
        snippets: snippets
            .iter()
            .filter(|s| s.extension().is_some_and(|ext| ext == "js"))
            .map(|s| dist.embed_path(s).to_string())
            .collect(),
    };

    let html = fs::read_to_string(&settings.index)
        .or_else(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                log::info!("no {} found, using built-in template", settings.index.display());
                Ok(include_str!("../assets/index.html").to_owned())
            } else {
                Err(err)
            }
        })
        .with_message(|| format!("failed to read {}", settings.index.display()))?;

    let html_new = make_index_html(&html, &assets, *autoreload)
        .map_err(|err| Error::message(format!("{}: {err}", settings.index.display())))?;

    let index = dist.0.join("index.html");
    fs::write(&index, html_new)
        .with_message(|| format!("failed to write {} file", index.display()))?;

    log::finished!(
        "`{}` profile in {:.2?}",
        if *release { "release" } else { "dev" },
        start.elapsed(),
    );

    Ok(())
}

fn build_wasm(root: &Path, release: bool) -> Report<()> {
    let mut cargo = Command::new("cargo");
    cargo
        .current_dir(root)
        .args(["build", "--target=wasm32-unknown-unknown"]);

    if release {
        cargo.arg("--release");
    }

    let status = cargo
        .spawn()
        .message("failed to run cargo")?
        .wait()
        .message("failed to build cargo crate")?;

    if status.success() {
        Ok(())
    } else {
        Err(Error::message("failed to build cargo crate"))
    }
}

fn run_wasm_bindgen(target: &Path, dist: &Path) -> Report<()> {
    let out = Command::new("wasm-bindgen")
        .arg(target)
        .arg("--out-dir")
        .arg(dist)
        .args(["--target=web", "--no-typescript"])
        .output()
        .message("failed to run wasm-bindgen")?;

    if out.status.success() {
        Ok(())
    } else {
        let err = String::from_utf8_lossy(&out.stderr);
        Err(Error::message(format!("failed to run wasm-bindgen\n{err}")))
    }
}

fn optimize_wasm(file: &Path) -> Report<()> {
    let status = Command::new("wasm-opt")
        .arg("-Os")
        .arg(file)
        .arg("-o")
        .arg(file)
        .args(["--enable-simd", "--low-memory-unused"])
        .spawn()
        .message("failed to run wasm-opt")?
        .wait()
        .message("failed to optimize wasm")?;

    if !status.success() {
        log::warning!("wasm-opt exited with {status}, keeping unoptimized wasm");
    }

    Ok(())
}

fn minify_js(file: &Path) -> Report<()> {
    let source =
        fs::read_to_string(file).with_message(|| format!("failed to read {}", file.display()))?;

    let code = js::minify(&source)?;

    log::info!(
        "minified {} from {} to {} bytes",
        file.display(),
        source.len(),
        code.len(),
    );

    fs::write(file, code).with_message(|| format!("failed to write {} file", file.display()))
}

/// Copy everything under `public` into `dist`, keeping relative paths.
fn copy_public(public: &Path, dist: &Path) -> Report<usize> {
    if !public.is_dir() {
        log::info!("no {} directory, skipping static assets", public.display());
        return Ok(0);
    }

    let files = read_file_paths(public)
        .with_message(|| format!("failed to read {} directory", public.display()))?;

    for file in &files {
        let relative = file
            .strip_prefix(public)
            .expect("walked paths must have the public prefix");
        let dest = dist.join(relative);

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_message(|| format!("failed to create {}", parent.display()))?;
        }

        fs::copy(file, &dest).with_message(|| format!("failed to copy {}", file.display()))?;

        log::info!("copied {} to {}", file.display(), dest.display());
    }

    Ok(files.len())
}

fn read_file_paths(path: &Path) -> io::Result<Vec<PathBuf>> {
    let mut paths = vec![];
    let mut to_visit = vec![Cow::Borrowed(path)];
    while let Some(dir) = to_visit.pop() {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_file() {
                paths.push(entry.path());
            } else if file_type.is_dir() {
                to_visit.push(Cow::Owned(entry.path()));
            }
        }
    }

    Ok(paths)
}

#[derive(Clone, Copy)]
struct Dist<'path>(&'path Path);

impl Dist<'_> {
    fn embed_path(self, path: &Path) -> impl Display + use<'_> {
        struct Show<'path>(&'path Path);

        impl Display for Show<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "/{}", self.0.display())
            }
        }

        Show(
            path.strip_prefix(self.0)
                .expect("the path must have dist prefix"),
        )
    }
}

/// URL paths of the generated files, relative to the server root.
struct Assets {
    js: String,
    wasm: String,
    snippets: Vec<String>,
}

fn make_index_html(html: &str, assets: &Assets, embed_autoreload_script: bool) -> Report<String> {
    let js_link = |href: &str| {
        format!(r#"<link rel="modulepreload" href="{href}" crossorigin=anonymous>"#)
    };

    let wasm_link = format!(
        r#"<link rel="preload" href="{}" crossorigin=anonymous as="fetch" type="application/wasm">"#,
        assets.wasm,
    );

    let js_script = format!(
        "<script type=\"module\">\n\
            import init, * as bindings from '{}';\n\
            window.wasmBindings = bindings;\n\
            await init({{ module_or_path: '{}' }});\n\
        </script>\n",
        assets.js, assets.wasm,
    );

    let reload_script = format!(
        "<script>\nconst RELOAD_PATH = '{RELOAD_PATH}';\n{}</script>\n",
        include_str!("../assets/reload.js"),
    );

    let mut head_found = false;
    let mut body_found = false;

    let settings = RewriteStrSettings {
        element_content_handlers: vec![
            element!("head", |el| {
                if !head_found {
                    head_found = true;
                    el.append(&js_link(&assets.js), ContentType::Html);
                    el.append(&wasm_link, ContentType::Html);
                    for snippet in &assets.snippets {
                        el.append(&js_link(snippet), ContentType::Html);
                    }
                }

                Ok(())
            }),
            element!("body", |el| {
                if !body_found {
                    body_found = true;
                    el.append(&js_script, ContentType::Html);

                    if embed_autoreload_script {
                        el.append(&reload_script, ContentType::Html);
                    }
                }

                Ok(())
            }),
        ],
        ..RewriteStrSettings::new()
    };

    let html_new = rewrite_str(html, settings)
        .map_err_into_io()
        .message("failed to rewrite html")?;

    if !head_found {
        return Err(Error::message("<head> tag not found"));
    }

    if !body_found {
        return Err(Error::message("<body> tag not found"));
    }

    Ok(html_new)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assets() -> Assets {
        Assets {
            js: "/dashboard.js".into(),
            wasm: "/dashboard_bg.wasm".into(),
            snippets: vec!["/snippets/kobold-1/inline0.js".into()],
        }
    }

    const INDEX: &str = "<!DOCTYPE html><html><head><title>t</title></head><body></body></html>";

    #[test]
    fn links_go_into_head_and_script_into_body() {
        let html = make_index_html(INDEX, &assets(), false).unwrap();

        let head_end = html.find("</head>").unwrap();
        let body_start = html.find("<body>").unwrap();

        let modulepreload = html.find(r#"rel="modulepreload" href="/dashboard.js""#).unwrap();
        let snippet = html.find("/snippets/kobold-1/inline0.js").unwrap();
        let preload = html.find(r#"href="/dashboard_bg.wasm" crossorigin"#).unwrap();
        let init = html.find("await init({ module_or_path: '/dashboard_bg.wasm' })").unwrap();

        assert!(modulepreload < head_end);
        assert!(snippet < head_end);
        assert!(preload < head_end);
        assert!(init > body_start);
        assert!(!html.contains(RELOAD_PATH));
    }

    #[test]
    fn autoreload_script_is_optional() {
        let html = make_index_html(INDEX, &assets(), true).unwrap();

        assert!(html.contains(RELOAD_PATH));
        assert!(html.find(RELOAD_PATH).unwrap() > html.find("<body>").unwrap());
    }

    #[test]
    fn missing_head_is_an_error() {
        let err = make_index_html("<body></body>", &assets(), false).unwrap_err();

        assert_eq!(err.to_string(), "<head> tag not found");
    }

    #[test]
    fn missing_body_is_an_error() {
        let err = make_index_html("<head></head>", &assets(), false).unwrap_err();

        assert_eq!(err.to_string(), "<body> tag not found");
    }

    #[test]
    fn builtin_template_is_usable() {
        let html = make_index_html(include_str!("../assets/index.html"), &assets(), true);

        assert!(html.is_ok());
    }

    #[test]
    fn embed_path_is_rooted_at_dist() {
        let dist = Dist(Path::new("/work/dist"));

        assert_eq!(
            dist.embed_path(Path::new("/work/dist/dashboard.js")).to_string(),
            "/dashboard.js",
        );
    }

    #[test]
    fn copies_nested_public_files() {
        let public = tempfile::tempdir().unwrap();
        let dist = tempfile::tempdir().unwrap();

        fs::create_dir_all(public.path().join("img/icons")).unwrap();
        fs::write(public.path().join("style.css"), "body {}").unwrap();
        fs::write(public.path().join("img/icons/logo.svg"), "<svg/>").unwrap();

        let copied = copy_public(public.path(), dist.path()).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(
            fs::read_to_string(dist.path().join("img/icons/logo.svg")).unwrap(),
            "<svg/>",
        );
        assert!(dist.path().join("style.css").is_file());
    }

    #[test]
    fn missing_public_dir_copies_nothing() {
        let dist = tempfile::tempdir().unwrap();

        let copied = copy_public(&dist.path().join("public"), dist.path()).unwrap();

        assert_eq!(copied, 0);
    }
}

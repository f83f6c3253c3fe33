//! The asset pipeline's task graph
//!
//! Leaf tasks wrap one external tool each. The composites wire them into the
//! production build (`default`) and the initial development build (`serve`).
//! `serve` leaves out image optimization on purpose; that only happens for
//! production builds.

pub mod clean;
pub mod html;
pub mod images;
pub mod layout;
pub mod lint;
pub mod scripts;
pub mod styles;

pub use clean::Clean;
pub use html::Html;
pub use images::Images;
pub use lint::Lint;
pub use scripts::Scripts;
pub use styles::Styles;

use crate::config::Config;
use crate::error::RegistryResult;
use crate::runner::{TaskDef, TaskRegistry};
use crate::watch::WatchBinding;

pub const CLEAN: &str = "clean";
pub const LINT_SCRIPTS: &str = "lintScripts";
pub const LINT_STYLES: &str = "lintStyles";
pub const SCRIPTS: &str = "scripts";
pub const STYLES: &str = "styles";
pub const IMAGES: &str = "images";
pub const HTML: &str = "html";
pub const BUILD_SCRIPTS: &str = "buildScripts";
pub const BUILD_STYLES: &str = "buildStyles";
pub const DEFAULT: &str = "default";
pub const SERVE: &str = "serve";
const DEFAULT_ASSETS: &str = "default:assets";
const SERVE_ASSETS: &str = "serve:assets";

/// Files whose change should reload connected browsers
pub const WATCHED_ASSETS: &[&str] = &[
    "**/*.html",
    "images/**/*",
    "styles/**/*.min.css",
    "scripts/**/*.min.js",
];

/// Register every pipeline task using the configured tools
pub fn register_pipeline(registry: &mut TaskRegistry, config: &Config) -> RegistryResult<()> {
    let tools = &config.tools;

    registry.register_with_usage(CLEAN, "Delete the dist directory", TaskDef::leaf(Clean))?;
    registry.register_with_usage(
        LINT_SCRIPTS,
        "Lint scripts (advisory)",
        TaskDef::leaf(Lint::scripts(tools.lint_scripts.clone())),
    )?;
    registry.register_with_usage(
        LINT_STYLES,
        "Lint stylesheets (advisory)",
        TaskDef::leaf(Lint::styles(tools.lint_styles.clone())),
    )?;
    registry.register_with_usage(
        SCRIPTS,
        "Bundle scripts/main.js",
        TaskDef::leaf(Scripts::new(
            tools.bundle_production.clone(),
            tools.bundle_development.clone(),
        )),
    )?;
    registry.register_with_usage(
        STYLES,
        "Process styles/main.css",
        TaskDef::leaf(Styles::from_templates(tools.style_stages.as_slice())),
    )?;
    registry.register_with_usage(
        IMAGES,
        "Optimize changed images in place",
        TaskDef::leaf(Images::new(
            tools.optimize_image.clone(),
            config.images.concurrency,
        )),
    )?;
    registry.register_with_usage(
        HTML,
        "Minify index-src.html into index.html",
        TaskDef::leaf(Html::new(tools.minify_html.clone())),
    )?;

    registry.register_with_usage(
        BUILD_SCRIPTS,
        "Lint then bundle scripts",
        TaskDef::series(&[LINT_SCRIPTS, SCRIPTS]),
    )?;
    registry.register_with_usage(
        BUILD_STYLES,
        "Lint then process styles",
        TaskDef::series(&[LINT_STYLES, STYLES]),
    )?;

    registry.register(
        DEFAULT_ASSETS,
        TaskDef::parallel(&[BUILD_SCRIPTS, BUILD_STYLES, IMAGES, HTML]),
    )?;
    registry.register_with_usage(
        DEFAULT,
        "Production build",
        TaskDef::series(&[CLEAN, DEFAULT_ASSETS]),
    )?;

    registry.register(
        SERVE_ASSETS,
        TaskDef::parallel(&[BUILD_SCRIPTS, BUILD_STYLES, HTML]),
    )?;
    registry.register_with_usage(
        SERVE,
        "Development build, then watch and serve",
        TaskDef::series(&[CLEAN, SERVE_ASSETS]),
    )?;

    Ok(())
}

/// A registry holding the whole pipeline
pub fn build_registry(config: &Config) -> RegistryResult<TaskRegistry> {
    let mut registry = TaskRegistry::new();
    register_pipeline(&mut registry, config)?;
    registry.validate()?;
    Ok(registry)
}

/// Source globs and the task each one re-runs during development
pub fn watch_bindings() -> Vec<WatchBinding> {
    vec![
        WatchBinding::new(&[layout::HTML_SOURCE], HTML),
        WatchBinding::new(&[layout::STYLE_ENTRY], BUILD_STYLES),
        WatchBinding::new(&[layout::SCRIPT_ENTRY], BUILD_SCRIPTS),
    ]
}

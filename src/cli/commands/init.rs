//! # Matrix Initialization Module / 矩阵初始化模块
//!
//! Writes a starter spec file (`testspecs.txt`) and settings file
//! (`ImageMatrix.toml`) in the current directory, either with defaults or
//! through an interactive wizard.
//!
//! 在当前目录写入初始的规格文件（`testspecs.txt`）和设置文件（`ImageMatrix.toml`），
//! 可以使用默认值，也可以通过交互式向导生成。

use anyhow::{Context, Result};
use colored::*;
use dialoguer::{Confirm, Input, theme::ColorfulTheme};
use std::fs;
use std::path::Path;

use crate::core::config::{SETTINGS_FILE_NAME, Settings};
use crate::core::spec::MatrixEntry;
use crate::infra::t;

const SPEC_HEADER: &str = "\
# image;tests;extras;pipreq;pipopts;label
# Only the image is required. Lines starting with # are ignored.
";

const DEFAULT_IMAGES: &[&str] = &["python:3.11-slim", "python:3.12-slim"];

/// Renders spec file content for a list of entries.
pub fn render_specs(entries: &[MatrixEntry]) -> String {
    let mut content = SPEC_HEADER.to_string();
    for entry in entries {
        content.push_str(&format!(
            "{};{};{};{};{};{}\n",
            entry.image, entry.tests, entry.extras, entry.pipreq, entry.pipopts, entry.label
        ));
    }
    content
}

/// Default starter entries: every default image with the default suite.
pub fn default_entries() -> Result<Vec<MatrixEntry>> {
    DEFAULT_IMAGES
        .iter()
        .map(|image| MatrixEntry::for_image(image).map_err(Into::into))
        .collect()
}

/// Runs the wizard that generates the starter files.
///
/// 运行生成初始文件的向导。
pub fn run_init_wizard(language: &str, non_interactive: bool) -> Result<()> {
    let specs_path = Settings::default().specs;
    let settings_path = Path::new(SETTINGS_FILE_NAME);

    if non_interactive {
        write_file(&specs_path, &render_specs(&default_entries()?), language)?;
        write_file(settings_path, &render_settings(&Settings::default())?, language)?;
        return Ok(());
    }

    let theme = ColorfulTheme::default();
    println!("\n{}", t!("init.welcome", locale = language).cyan().bold());
    println!("{}", t!("init.description", locale = language));

    for path in [specs_path.as_path(), settings_path] {
        if path.exists() {
            let confirmation = Confirm::with_theme(&theme)
                .with_prompt(t!("init.overwrite_prompt", locale = language, path = path.display()))
                .default(false)
                .interact()
                .context(t!("init.user_confirmation_failed", locale = language).to_string())?;
            if !confirmation {
                println!("{}", t!("init.aborted", locale = language));
                return Ok(());
            }
        }
    }

    let images: String = Input::with_theme(&theme)
        .with_prompt(t!("init.images_prompt", locale = language))
        .default(DEFAULT_IMAGES.join(","))
        .interact_text()
        .context(t!("init.user_confirmation_failed", locale = language).to_string())?;
    let tests: String = Input::with_theme(&theme)
        .with_prompt(t!("init.tests_prompt", locale = language))
        .allow_empty(true)
        .interact_text()
        .context(t!("init.user_confirmation_failed", locale = language).to_string())?;

    let entries = images
        .split(',')
        .map(str::trim)
        .filter(|image| !image.is_empty())
        .map(|image| MatrixEntry::from_fields(image, Some(tests.as_str()), None, None, None, None))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if entries.is_empty() {
        println!("{}", t!("init.no_images", locale = language).yellow());
    }

    write_file(&specs_path, &render_specs(&entries), language)?;
    write_file(settings_path, &render_settings(&Settings::default())?, language)?;
    println!("\n{}", t!("init.next_steps", locale = language).green());
    Ok(())
}

fn render_settings(settings: &Settings) -> Result<String> {
    toml::to_string_pretty(settings).context("Failed to serialize default settings")
}

fn write_file(path: &Path, content: &str, language: &str) -> Result<()> {
    fs::write(path, content).with_context(|| {
        t!("init.write_failed", locale = language, path = path.display()).to_string()
    })?;
    println!(
        "{}",
        t!("init.file_written", locale = language, path = path.display()).green()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spec::parse_specs;

    #[test]
    fn rendered_specs_parse_back_to_the_same_entries() {
        let entries = default_entries().unwrap();
        let parsed = parse_specs(&render_specs(&entries)).unwrap();
        assert_eq!(parsed, entries);
    }

    #[test]
    fn rendered_settings_load_as_defaults() {
        let text = render_settings(&Settings::default()).unwrap();
        assert_eq!(Settings::from_toml(&text).unwrap(), Settings::default());
    }
}

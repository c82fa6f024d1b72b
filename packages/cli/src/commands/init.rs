use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use remote_tree_core::DeliveryMode;
use std::fs;
use std::path::PathBuf;

pub const EXAMPLE_SCRIPT: &str = "example.script.json";

const EXAMPLE_SCRIPT_CONTENT: &str = r#"[
  { "op": "createComponent", "name": "card", "type": "Card", "props": { "elevated": true } },
  { "op": "createComponent", "name": "button", "type": "Button", "props": { "label": "Go" } },
  { "op": "appendChild", "parent": "card", "text": "Ready?" },
  { "op": "appendChild", "parent": "card", "child": "button" },
  { "op": "appendChild", "parent": "root", "child": "card" },
  { "op": "mount" },
  { "op": "updateProps", "target": "button", "patch": { "label": "Going" } },
  { "op": "removeChild", "parent": "card", "child": "button" }
]
"#;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Component types scripts may create (comma separated, empty allows any)
    #[arg(short, long, value_delimiter = ',')]
    pub components: Vec<String>,

    /// Await each remote delivery before applying locally
    #[arg(short, long)]
    pub strict: bool,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing remote tree project...".bright_blue().bold());

    let config = Config {
        components: args.components,
        delivery: if args.strict {
            DeliveryMode::Strict
        } else {
            DeliveryMode::Detached
        },
    };

    let config_json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, config_json)?;
    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);

    let example_path = PathBuf::from(cwd).join(EXAMPLE_SCRIPT);
    if !example_path.exists() {
        fs::write(&example_path, EXAMPLE_SCRIPT_CONTENT)?;
        println!("  {} Created {}", "✓".green(), EXAMPLE_SCRIPT);
    }

    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Edit {}", EXAMPLE_SCRIPT);
    println!("  2. Run: remote-tree replay {}", EXAMPLE_SCRIPT);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::parse_script;
    use tempfile::TempDir;

    fn args(force: bool) -> InitArgs {
        InitArgs {
            components: vec!["Card".to_string(), "Button".to_string()],
            strict: true,
            force,
        }
    }

    #[test]
    fn test_init_writes_config_and_example() {
        let dir = TempDir::new().unwrap();
        let cwd = dir.path().display().to_string();

        init(args(false), &cwd).unwrap();

        let config = Config::load(&cwd).unwrap();
        assert_eq!(config.components, vec!["Card", "Button"]);
        assert_eq!(config.delivery, DeliveryMode::Strict);

        let example = fs::read_to_string(dir.path().join(EXAMPLE_SCRIPT)).unwrap();
        assert_eq!(parse_script(&example).unwrap().len(), 8);
    }

    #[test]
    fn test_init_keeps_existing_config_without_force() {
        let dir = TempDir::new().unwrap();
        let cwd = dir.path().display().to_string();
        let config_path = dir.path().join(DEFAULT_CONFIG_NAME);
        fs::write(&config_path, "{}").unwrap();

        init(args(false), &cwd).unwrap();
        assert_eq!(fs::read_to_string(&config_path).unwrap(), "{}");

        init(args(true), &cwd).unwrap();
        assert_eq!(Config::load(&cwd).unwrap().delivery, DeliveryMode::Strict);
    }
}

use crate::config::Config;
use crate::script::{parse_script, validate, ScriptError, Session, Step};
use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use colored::Colorize;
use remote_tree_core::{
    create_root, DeliveryMode, Endpoint, RemoteReceiver, RootOptions, SerializedNode, Transport,
};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Script file: a JSON array of steps
    pub script: PathBuf,

    /// Config file to use instead of the one in the working directory
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

/// Outcome of one replay
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub steps: usize,
    pub delivery: DeliveryMode,
    pub mounts: usize,
    pub failures: Vec<String>,
    pub matches: bool,
    pub local: Vec<SerializedNode>,
    pub remote: Vec<SerializedNode>,
}

pub fn replay(args: ReplayArgs, cwd: &str) -> Result<()> {
    if !matches!(args.format.as_str(), "text" | "json") {
        bail!("Invalid format: {}. Use: text or json", args.format);
    }

    let config = match &args.config {
        Some(path) => Config::load_from(&PathBuf::from(cwd).join(path))?,
        None => Config::load(cwd)?,
    };

    let script_path = PathBuf::from(cwd).join(&args.script);
    let source = fs::read_to_string(&script_path)
        .with_context(|| format!("Failed to read script {}", script_path.display()))?;
    let steps = parse_script(&source)?;

    let options = config.root_options();
    validate(&steps, &options)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(run_script(steps, options))?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&script_path, &report);
    }

    if !report.failures.is_empty() {
        return Err(anyhow!("{} deliveries failed", report.failures.len()));
    }
    if !report.matches {
        bail!("Remote mirror does not match the local tree");
    }

    Ok(())
}

/// Run `steps` against a root whose channel is an endpoint connected to a
/// mirror receiver, then wait for every delivery
pub async fn run_script(
    steps: Vec<Step>,
    options: RootOptions,
) -> Result<ReplayReport, ScriptError> {
    let (local, remote) = Transport::pair();
    let local = Endpoint::new(local);
    let remote = Endpoint::new(remote);

    let receiver = RemoteReceiver::new();
    receiver.expose_on(&remote);

    let delivery = options.delivery;
    let step_count = steps.len();
    let mut session = Session::new(create_root(local.clone(), options));

    let mut dispatches = Vec::new();
    for (index, step) in steps.into_iter().enumerate() {
        if let Some(dispatch) = session.run(index + 1, step).await? {
            dispatches.push(dispatch);
        }
    }

    let mut failures = Vec::new();
    for dispatch in dispatches {
        if let Err(err) = dispatch.settled().await {
            warn!(error = %err, "delivery failed");
            failures.push(err.to_string());
        }
    }

    let local_tree = session.root().serialize();
    let remote_tree = receiver.snapshot();
    local.terminate();
    remote.terminate();

    info!(steps = step_count, failures = failures.len(), "replay finished");

    Ok(ReplayReport {
        steps: step_count,
        delivery,
        mounts: receiver.mount_count(),
        failures,
        matches: local_tree == remote_tree,
        local: local_tree,
        remote: remote_tree,
    })
}

fn print_report(script_path: &Path, report: &ReplayReport) {
    println!("🔁 {} {}", "Replayed".green().bold(), script_path.display());
    println!("   Steps: {}", report.steps);
    println!(
        "   Delivery: {}",
        match report.delivery {
            DeliveryMode::Detached => "detached",
            DeliveryMode::Strict => "strict",
        }
    );
    println!("   Mounts: {}", report.mounts);
    println!();

    println!("{}", "Local tree".bright_white().bold());
    print!("{}", render_tree(&report.local));
    println!("{}", "Remote mirror".bright_white().bold());
    print!("{}", render_tree(&report.remote));
    println!();

    for failure in &report.failures {
        println!("   {} {}", "✗".red(), failure);
    }

    if report.matches {
        println!("   {} Remote mirror matches the local tree", "✓".green());
    } else {
        println!("   {} Remote mirror diverged from the local tree", "✗".red());
    }
}

/// Indented outline of a serialized tree
pub fn render_tree(nodes: &[SerializedNode]) -> String {
    let mut out = String::new();
    if nodes.is_empty() {
        out.push_str("  (empty)\n");
    }
    render_nodes(nodes, 1, &mut out);
    out
}

fn render_nodes(nodes: &[SerializedNode], depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);

    for node in nodes {
        match node {
            SerializedNode::Component {
                id,
                kind,
                props,
                children,
            } => {
                out.push_str(&format!("{}{} #{}", indent, kind, id));
                if !props.is_empty() {
                    out.push_str(&format!(" {}", Value::Object(props.clone())));
                }
                out.push('\n');
                render_nodes(children, depth + 1, out);
            }
            SerializedNode::Text { id, text } => {
                out.push_str(&format!("{}{:?} #{}\n", indent, text, id));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::parse_script;

    const SCRIPT: &str = r#"[
        { "op": "createComponent", "name": "list", "type": "List" },
        { "op": "appendChild", "parent": "root", "child": "list" },
        { "op": "mount" },
        { "op": "createText", "name": "b", "text": "b" },
        { "op": "appendChild", "parent": "list", "child": "b" },
        { "op": "createText", "name": "a", "text": "a" },
        { "op": "insertChildBefore", "parent": "list", "child": "a", "before": "b" },
        { "op": "updateText", "target": "a", "text": "A" },
        { "op": "updateProps", "target": "list", "patch": { "ordered": true } }
    ]"#;

    #[test]
    fn test_render_tree_outline() {
        let value = serde_json::json!([
            { "id": "0", "type": "List", "props": { "ordered": true }, "children": [
                { "id": "1", "text": "a" }
            ]}
        ]);
        let nodes: Vec<SerializedNode> = serde_json::from_value(value).unwrap();

        assert_eq!(
            render_tree(&nodes),
            "  List #0 {\"ordered\":true}\n    \"a\" #1\n"
        );
        assert_eq!(render_tree(&[]), "  (empty)\n");
    }

    #[tokio::test]
    async fn test_replay_keeps_mirror_in_sync() {
        let steps = parse_script(SCRIPT).unwrap();

        let report = run_script(steps, RootOptions::default()).await.unwrap();

        assert_eq!(report.steps, 9);
        assert_eq!(report.mounts, 1);
        assert!(report.failures.is_empty());
        assert!(report.matches);
        assert_eq!(report.local.len(), 1);
        assert_eq!(report.local[0].children().len(), 2);
    }

    #[tokio::test]
    async fn test_replay_in_strict_mode() {
        let steps = parse_script(SCRIPT).unwrap();
        let options = RootOptions::new().with_delivery(DeliveryMode::Strict);

        let report = run_script(steps, options).await.unwrap();

        assert_eq!(report.delivery, DeliveryMode::Strict);
        assert!(report.matches);
    }

    #[tokio::test]
    async fn test_replay_stops_at_failing_step() {
        let steps = parse_script(
            r#"[
                { "op": "createText", "name": "t", "text": "x" },
                { "op": "removeChild", "parent": "root", "child": "t" }
            ]"#,
        )
        .unwrap();

        let err = run_script(steps, RootOptions::default()).await.unwrap_err();
        assert!(matches!(err, ScriptError::Tree { step: 2, .. }));
    }
}

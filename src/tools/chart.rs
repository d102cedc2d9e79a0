//! Chart Tool: renders an (x, y) series into a Plotly figure document.
//!
//! One artifact file per call, named with a fresh uuid so concurrent
//! generations never collide; prior artifacts are never read or
//! deleted. The returned markdown image token is the only thing the
//! model sees.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use uuid::Uuid;

const CHARTS_URL_PREFIX: &str = "/static/charts";

const PRIMARY_COLOR: &str = "#6366f1";
const ACCENT_COLOR: &str = "#2dd4bf";
const SCATTER_COLOR: &str = "#f472b6";
const TEXT_COLOR: &str = "#f8fafc";
const PIE_COLORS: [&str; 8] = [
    "#6366f1", "#ef4444", "#22c55e", "#eab308", "#f97316", "#ec4899", "#06b6d4", "#8b5cf6",
];

/// Render the chart described by `args` into `charts_dir` and return its
/// markdown image reference.
///
/// `y` is coerced element-wise to f64 with 0.0 substituted for anything
/// non-numeric. Unrecognized plot kinds fall back to bar. A structural
/// failure (missing series, mismatched lengths, unwritable directory) is
/// a true error for this single call.
pub fn generate_plot(args: &Value, charts_dir: &Path) -> Result<String> {
    let x = args
        .get("x")
        .and_then(|v| v.as_array())
        .context("generate_plot requires an 'x' array")?
        .clone();
    let y: Vec<f64> = args
        .get("y")
        .and_then(|v| v.as_array())
        .context("generate_plot requires a 'y' array")?
        .iter()
        .map(coerce_numeric)
        .collect();

    if x.len() != y.len() {
        anyhow::bail!(
            "generate_plot: x has {} entries but y has {}",
            x.len(),
            y.len()
        );
    }

    let plot_type = args
        .get("plot_type")
        .and_then(|v| v.as_str())
        .unwrap_or("bar");
    let title = args.get("title").and_then(|v| v.as_str()).unwrap_or("Chart");
    let xlabel = args.get("xlabel").and_then(|v| v.as_str()).unwrap_or("X");
    let ylabel = args.get("ylabel").and_then(|v| v.as_str()).unwrap_or("Y");

    let figure = build_figure(plot_type, &x, &y, title, xlabel, ylabel);

    fs::create_dir_all(charts_dir)
        .with_context(|| format!("creating charts dir {}", charts_dir.display()))?;
    let filename = format!("chart_{}.json", Uuid::new_v4());
    let path = charts_dir.join(&filename);
    fs::write(&path, serde_json::to_vec(&figure)?)
        .with_context(|| format!("writing chart artifact {}", path.display()))?;

    Ok(format!("![Plotly]({CHARTS_URL_PREFIX}/{filename})"))
}

fn coerce_numeric(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn build_figure(
    plot_type: &str,
    x: &[Value],
    y: &[f64],
    title: &str,
    xlabel: &str,
    ylabel: &str,
) -> Value {
    let trace = match plot_type {
        "line" => json!({
            "type": "scatter",
            "mode": "lines+markers",
            "x": x,
            "y": y,
            "line": { "color": ACCENT_COLOR },
        }),
        "scatter" => json!({
            "type": "scatter",
            "mode": "markers",
            "x": x,
            "y": y,
            "marker": { "size": 12, "color": SCATTER_COLOR },
        }),
        "pie" => json!({
            "type": "pie",
            "labels": x,
            "values": y,
            "marker": { "colors": PIE_COLORS },
            "textposition": "inside",
            "textinfo": "percent+label",
        }),
        // One color per category, like the bar path's categorical coloring.
        _ => json!({
            "type": "bar",
            "x": x,
            "y": y,
            "marker": {
                "color": (0..x.len())
                    .map(|i| PIE_COLORS[i % PIE_COLORS.len()])
                    .collect::<Vec<_>>()
            },
        }),
    };

    let mut layout = json!({
        "title": { "text": title, "font": { "size": 16 } },
        "paper_bgcolor": "rgba(0,0,0,0)",
        "plot_bgcolor": "rgba(0,0,0,0)",
        "font": { "family": "Inter, sans-serif", "color": TEXT_COLOR, "size": 11 },
        "margin": { "t": 40, "l": 10, "r": 10, "b": 10 },
        "colorway": [PRIMARY_COLOR, ACCENT_COLOR, SCATTER_COLOR],
        "showlegend": true,
        "autosize": true,
    });

    if plot_type != "pie" {
        layout["xaxis"] = json!({ "title": { "text": xlabel } });
        layout["yaxis"] = json!({ "title": { "text": ylabel } });
    }

    json!({ "data": [trace], "layout": layout })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart_args(plot_type: &str) -> Value {
        json!({
            "x": ["north", "south", "east"],
            "y": [10, 20, 7],
            "plot_type": plot_type,
            "title": "Sales by region",
        })
    }

    fn written_figure(dir: &Path, reference: &str) -> Value {
        let filename = reference
            .rsplit('/')
            .next()
            .unwrap()
            .trim_end_matches(')');
        serde_json::from_slice(&fs::read(dir.join(filename)).unwrap()).unwrap()
    }

    #[test]
    fn returns_markdown_reference_and_writes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let reference = generate_plot(&chart_args("bar"), dir.path()).unwrap();
        assert!(reference.starts_with("![Plotly](/static/charts/chart_"));
        assert!(reference.ends_with(".json)"));

        let figure = written_figure(dir.path(), &reference);
        assert_eq!(figure["data"][0]["type"], "bar");
        assert_eq!(figure["layout"]["title"]["text"], "Sales by region");
    }

    #[test]
    fn unknown_kind_falls_back_to_bar() {
        let dir = tempfile::tempdir().unwrap();
        let reference = generate_plot(&chart_args("hexbin"), dir.path()).unwrap();
        let figure = written_figure(dir.path(), &reference);
        assert_eq!(figure["data"][0]["type"], "bar");
    }

    #[test]
    fn identical_inputs_get_unique_filenames() {
        let dir = tempfile::tempdir().unwrap();
        let a = generate_plot(&chart_args("line"), dir.path()).unwrap();
        let b = generate_plot(&chart_args("line"), dir.path()).unwrap();
        assert_ne!(a, b);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn non_numeric_y_coerced_to_zero() {
        let dir = tempfile::tempdir().unwrap();
        let args = json!({
            "x": ["a", "b", "c"],
            "y": ["12.5", "oops", null],
        });
        let reference = generate_plot(&args, dir.path()).unwrap();
        let figure = written_figure(dir.path(), &reference);
        assert_eq!(figure["data"][0]["y"], json!([12.5, 0.0, 0.0]));
    }

    #[test]
    fn pie_uses_labels_and_values() {
        let dir = tempfile::tempdir().unwrap();
        let reference = generate_plot(&chart_args("pie"), dir.path()).unwrap();
        let figure = written_figure(dir.path(), &reference);
        assert_eq!(figure["data"][0]["type"], "pie");
        assert_eq!(figure["data"][0]["labels"], json!(["north", "south", "east"]));
    }

    #[test]
    fn mismatched_lengths_are_fatal_for_the_call() {
        let dir = tempfile::tempdir().unwrap();
        let args = json!({ "x": ["a", "b"], "y": [1] });
        assert!(generate_plot(&args, dir.path()).is_err());
    }
}

use std::path::Path;

use console::Style;
use driftcor_core::drift::CorrelationPolicy;
use driftcor_core::pipeline::{DriftConfig, DriftReport};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    warning: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            warning: Style::new().yellow().bold(),
            path: Style::new().underlined(),
        }
    }
}

fn policy_name(policy: &CorrelationPolicy) -> String {
    match policy {
        CorrelationPolicy::Direct => "DCC (consecutive frames)".to_string(),
        CorrelationPolicy::Windowed { window } => format!("MCC (window {window})"),
        CorrelationPolicy::Redundant => "RCC (all pairs)".to_string(),
    }
}

pub fn print_config_summary(config: &DriftConfig, input: &Path, frames: usize) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Drift Correction"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(16)));
    println!();

    println!("  {:<14}{}", s.label.apply_to("Input"), s.path.apply_to(input.display()));
    println!("  {:<14}{}", s.label.apply_to("Frames"), s.value.apply_to(frames));
    println!(
        "  {:<14}{}",
        s.label.apply_to("Workers"),
        if config.parallel {
            s.method.apply_to("pool".to_string())
        } else {
            s.disabled.apply_to("serial".to_string())
        }
    );
    println!();

    println!("  {}", s.header.apply_to("Correlation"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Method"),
        s.method.apply_to(policy_name(&config.policy))
    );
    if config.policy.prunes_outliers() {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Reject"),
            s.value.apply_to(format!("> {} nm", config.rejection_threshold))
        );
    }
    println!();

    if let Some(ref pre) = config.preprocess {
        println!("  {}", s.header.apply_to("Preprocessing"));
        if let Some(ref filter) = pre.filter {
            println!(
                "    {:<12}{}",
                s.label.apply_to("Filter"),
                s.value.apply_to(format!(
                    "median {}, clip [{}, {}], tukey {}",
                    filter.median_size,
                    filter.threshold_lower,
                    filter.threshold_upper,
                    filter.tukey_alpha
                ))
            );
        }
        if let Some(bin) = pre.binning {
            println!(
                "    {:<12}{}",
                s.label.apply_to("Binning"),
                s.value.apply_to(format!("{}x{}x{}", bin[0], bin[1], bin[2]))
            );
        }
        println!();
    }
}

pub fn print_drift_summary(report: &DriftReport) {
    let s = Styles::new();

    println!();
    println!("  {}", s.header.apply_to("Result"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Pairs"),
        s.value.apply_to(report.observations)
    );
    if report.discarded > 0 {
        println!(
            "    {:<12}{}",
            s.label.apply_to("No peak"),
            s.warning.apply_to(report.discarded)
        );
    }
    if let Some(prune) = report.prune {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Rejected"),
            s.value.apply_to(format!("{} of {}", prune.removed, prune.candidates))
        );
        if prune.retained > 0 {
            println!(
                "    {:<12}{}",
                s.label.apply_to("Kept"),
                s.warning.apply_to(format!(
                    "{} over threshold (needed for rank)",
                    prune.retained
                ))
            );
        }
    }

    if let Some(last) = report.trajectory.displacement.last() {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Final drift"),
            s.value.apply_to(format!(
                "{:.2}, {:.2}, {:.2} nm",
                last[0], last[1], last[2]
            ))
        );
    }
    println!();
}

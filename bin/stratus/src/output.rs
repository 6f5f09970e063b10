//! ---
//! srt_section: "05-networking-external-interfaces"
//! srt_subsection: "binary"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Terminal tables for technique listings and lifecycle states."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
use std::sync::Arc;

use crossterm::style::{Color, Stylize};
use crossterm::tty::IsTty;
use stratus_technique::{AttackTechnique, AttackTechniqueState};

const NO_COLOR_ENV: &str = "NO_COLOR";

fn colors_enabled() -> bool {
    std::env::var_os(NO_COLOR_ENV).is_none() && std::io::stdout().is_tty()
}

/// Cell text plus an optional colour applied after padding.
struct Cell {
    text: String,
    color: Option<Color>,
}

impl From<String> for Cell {
    fn from(text: String) -> Self {
        Self { text, color: None }
    }
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        text.to_owned().into()
    }
}

/// Bordered table rendered to a string.
struct Table {
    header: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    fn new(header: &[&str]) -> Self {
        Self {
            header: header.iter().map(|h| h.to_uppercase()).collect(),
            rows: Vec::new(),
        }
    }

    fn push(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    fn render(&self, colored: bool) -> String {
        let mut widths: Vec<usize> = self.header.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (index, cell) in row.iter().enumerate() {
                if let Some(width) = widths.get_mut(index) {
                    *width = (*width).max(cell.text.chars().count());
                }
            }
        }

        let separator = {
            let mut line = String::from("+");
            for width in &widths {
                line.push_str(&"-".repeat(width + 2));
                line.push('+');
            }
            line
        };
        let format_row = |cells: Vec<(String, Option<Color>)>| {
            let mut line = String::from("|");
            for ((text, color), width) in cells.into_iter().zip(&widths) {
                let padded = format!(" {text:<width$} ");
                match color {
                    Some(color) if colored => line.push_str(&padded.with(color).to_string()),
                    _ => line.push_str(&padded),
                }
                line.push('|');
            }
            line
        };

        let mut out = vec![separator.clone()];
        out.push(format_row(
            self.header.iter().map(|h| (h.clone(), None)).collect(),
        ));
        out.push(separator.clone());
        for row in &self.rows {
            out.push(format_row(
                row.iter().map(|c| (c.text.clone(), c.color)).collect(),
            ));
        }
        out.push(separator);
        out.join("\n")
    }
}

pub fn state_color(state: AttackTechniqueState) -> Color {
    match state {
        AttackTechniqueState::Cold => Color::Cyan,
        AttackTechniqueState::Warm => Color::Yellow,
        AttackTechniqueState::Detonated => Color::Magenta,
    }
}

fn tactics(technique: &AttackTechnique) -> String {
    technique
        .tactics()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn display_name(technique: &AttackTechnique) -> &str {
    match technique.friendly_name() {
        "" => technique.id(),
        name => name,
    }
}

fn techniques_table(techniques: &[Arc<AttackTechnique>]) -> Table {
    let mut table = Table::new(&["Technique ID", "Technique name", "Platform", "MITRE ATT&CK Tactic"]);
    for technique in techniques {
        table.push(vec![
            technique.id().into(),
            display_name(technique).into(),
            technique.platform().to_string().into(),
            tactics(technique).into(),
        ]);
    }
    table
}

fn status_table(rows: &[(Arc<AttackTechnique>, AttackTechniqueState)]) -> Table {
    let mut table = Table::new(&["ID", "Name", "Status"]);
    for (technique, state) in rows {
        table.push(vec![
            technique.id().into(),
            display_name(technique).into(),
            Cell {
                text: state.to_string(),
                color: Some(state_color(*state)),
            },
        ]);
    }
    table
}

pub fn print_techniques(techniques: &[Arc<AttackTechnique>]) {
    println!("{}", techniques_table(techniques).render(colors_enabled()));
}

pub fn print_status(rows: &[(Arc<AttackTechnique>, AttackTechniqueState)]) {
    println!("{}", status_table(rows).render(colors_enabled()));
}

pub fn print_details(technique: &AttackTechnique) {
    let colored = colors_enabled();
    let title = format!("{} ({})", display_name(technique), technique.id());
    if colored {
        println!("{}", title.bold());
    } else {
        println!("{title}");
    }
    println!("Platform: {}", technique.platform());
    println!("MITRE ATT&CK tactics: {}", tactics(technique));
    println!("Idempotent: {}", yes_no(technique.is_idempotent()));
    println!("Revertible: {}", yes_no(technique.can_revert()));
    println!("Prerequisites: {}", yes_no(technique.has_prerequisites()));
    if !technique.description().trim().is_empty() {
        println!("\n{}", technique.description().trim());
    }
    if !technique.detection().trim().is_empty() {
        println!("\nDetection:\n{}", technique.detection().trim());
    }
    println!();
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratus_technique::Platform;

    struct Noop;

    #[async_trait::async_trait]
    impl stratus_technique::Detonator for Noop {
        async fn detonate(
            &self,
            _: &stratus_technique::Outputs,
            _: &dyn stratus_technique::CloudProviders,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn technique(id: &str, name: &str) -> Arc<AttackTechnique> {
        Arc::new(
            AttackTechnique::builder(id, Platform::Aws, Arc::new(Noop))
                .friendly_name(name)
                .tactic(stratus_technique::Tactic::Discovery)
                .build(),
        )
    }

    #[test]
    fn status_table_aligns_columns() {
        let rendered = status_table(&[
            (technique("aws.discovery.a", "Short"), AttackTechniqueState::Cold),
            (technique("aws.discovery.longer-id", ""), AttackTechniqueState::Detonated),
        ])
        .render(false);

        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines.iter().all(|line| line.len() == lines[0].len()));
        assert!(lines[1].contains("STATUS"));
        assert!(lines[3].contains("| Short "));
        assert!(lines[4].contains("aws.discovery.longer-id | aws.discovery.longer-id"));
        assert!(lines[4].contains("DETONATED"));
    }

    #[test]
    fn colored_cells_keep_plain_text() {
        let rendered = status_table(&[(technique("id", "name"), AttackTechniqueState::Warm)])
            .render(true);
        assert!(rendered.contains("WARM"));
        assert!(rendered.contains('\u{1b}'));
    }
}
